/// Error types shared by the pipeline, the texture code and the octree.
///
/// Configuration problems surface as typed errors from the call that caused
/// them; numeric degeneracies (flat edges, axis-parallel rays) are handled
/// locally and never reach this enum.
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// The pipeline or octree was used before being set up correctly.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// A shader asked for an attribute or uniform that was never registered.
    #[error("attribute or uniform not found: {0}")]
    AttributeNotFound(String),

    #[error(
        "uniform arena full: '{name}' needs {requested} floats but only {available} remain"
    )]
    UniformCapacityExceeded {
        name: String,
        requested: usize,
        available: usize,
    },

    #[error("texture unit {unit} out of range ({units} units available)")]
    TextureUnitOutOfRange { unit: usize, units: usize },

    #[error("invalid texture: {0}")]
    InvalidTexture(String),

    /// Octree insertion before `set_aabb`.
    #[error("octree bounds have not been set")]
    BoundsNotSet,

    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("model error: {0}")]
    Model(#[from] gltf::Error),
}

/// Built-in shading stages
pub mod ambient_occlusion;
pub mod octree_builder;
pub mod raymarch;
pub mod standard;
pub mod surface;

pub use ambient_occlusion::{AmbientOcclusionShader, AoConfig};
pub use octree_builder::OctreeBuilderShader;
pub use raymarch::RayMarchShader;
pub use standard::{PassthroughShader, StandardShader};
pub use surface::{FlatShader, TexturedShader};

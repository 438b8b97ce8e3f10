/// Software graphic pipeline
/// Flat float buffers in, packed color and depth out
pub mod attributes;
pub mod framebuffer;
pub mod pipeline;
pub mod sampler;
pub mod shader;
pub mod texture;

pub use attributes::{Slot, SlotRegistry, UniformArena};
pub use framebuffer::{pack_rgba, quantize_color, unpack_rgba, Framebuffer, CLEAR_DEPTH};
pub use pipeline::{viewport_matrix, GraphicPipeline, PipelineConfig};
pub use sampler::{Filter, TextureSampler, WrapMode};
pub use shader::{Fragment, FragmentShader, ShaderContext, VertexShader};
pub use texture::Texture;

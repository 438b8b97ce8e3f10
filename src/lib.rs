/// voxel-raster - CPU graphic pipeline with a voxel octree
/// Rasterizes triangle soups through pluggable shading stages and answers
/// ray queries against voxelized geometry
pub mod camera;
pub mod error;
pub mod mesh;
pub mod octree;
pub mod perf;
pub mod rendering;
pub mod shaders;
pub mod voxelizer;

pub use camera::{Camera, CameraController};
pub use error::{Error, Result};
pub use mesh::MeshData;
pub use octree::{Aabb, Octree, OctreeConfig, Ray, RayHit};
pub use perf::{PerfTimer, RenderStats};
pub use rendering::{
    pack_rgba, viewport_matrix, Filter, Fragment, FragmentShader, Framebuffer, GraphicPipeline,
    PipelineConfig, ShaderContext, Texture, TextureSampler, VertexShader, WrapMode,
};
pub use shaders::{
    AmbientOcclusionShader, AoConfig, FlatShader, OctreeBuilderShader, PassthroughShader,
    RayMarchShader, StandardShader, TexturedShader,
};
pub use voxelizer::{Voxelizer, VoxelizerConfig};

/// Mesh to octree conversion by rasterization
///
/// The mesh is drawn orthographically along z, y and x into a square grid
/// matching the leaf resolution. Every fragment's world position is
/// inserted into the tree. Depth testing is off and both windings are
/// drawn, so hidden and back-facing surfaces are captured too.
use crate::error::{Error, Result};
use crate::mesh::MeshData;
use crate::octree::{Aabb, Octree, OctreeConfig};
use crate::perf_scope;
use crate::rendering::{viewport_matrix, Framebuffer, GraphicPipeline, PipelineConfig};
use crate::shaders::{OctreeBuilderShader, StandardShader};
use glam::{Mat4, Vec3};

#[derive(Debug, Clone, Copy)]
pub struct VoxelizerConfig {
    /// Side of the square render target for each view.
    pub grid: usize,
    pub max_depth: u32,
}

impl Default for VoxelizerConfig {
    fn default() -> Self {
        Self {
            grid: 128,
            max_depth: 8,
        }
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct Voxelizer {
    pub config: VoxelizerConfig,
}

/// (view direction, up)
const VIEWS: [(Vec3, Vec3); 3] = [
    (Vec3::Z, Vec3::Y), // XY plane
    (Vec3::Y, Vec3::Z), // XZ plane
    (Vec3::X, Vec3::Y), // YZ plane
];

impl Voxelizer {
    pub fn new(config: VoxelizerConfig) -> Self {
        Self { config }
    }

    /// World-space cube the tree will cover: the cubic extension of the
    /// transformed mesh bounds, padded by one grid cell on each side so
    /// boundary vertices stay inside the clip volume.
    pub fn world_bounds(&self, mesh: &MeshData, model: Mat4) -> Option<Aabb> {
        let b = Aabb::from_points(mesh.positions.iter().map(|&p| model.transform_point3(p)))?;
        let cube = b.cubic();
        let side = cube.size().x.max(1e-6);
        let pad = Vec3::splat(side / self.config.grid.max(1) as f32);
        let c = cube.center();
        let half = Vec3::splat(side * 0.5);
        Some(Aabb::new(c - half - pad, c + half + pad))
    }

    pub fn build(&self, mesh: &MeshData, model: Mat4) -> Result<Octree> {
        perf_scope!("voxelize");

        if self.config.grid == 0 {
            return Err(Error::InvalidConfiguration("voxel grid must be non-zero".into()));
        }
        let bounds = self.world_bounds(mesh, model).ok_or_else(|| {
            Error::InvalidConfiguration("cannot voxelize an empty mesh".into())
        })?;

        let mut tree = Octree::new(OctreeConfig {
            max_depth: self.config.max_depth,
        });
        tree.set_aabb(bounds.min, bounds.max)?;

        let grid = self.config.grid;
        let mut target = Framebuffer::new(grid, grid);
        let vertex_shader = StandardShader;
        let mut builder = OctreeBuilderShader::new(&mut tree);

        {
            let mut pipeline = GraphicPipeline::new(PipelineConfig::default());
            mesh.upload(&mut pipeline)?;
            pipeline.set_vertex_shader(&vertex_shader);
            pipeline.set_fragment_shader(&mut builder);
            pipeline.set_viewport(viewport_matrix(grid, grid));
            pipeline.depth_test = false;

            let side = bounds.size().x;
            let half = side * 0.5;
            let center = bounds.center();
            let proj = Mat4::orthographic_rh_gl(-half, half, -half, half, 0.0, 2.0 * side);

            for (dir, up) in VIEWS {
                let eye = center - dir * side;
                let view = Mat4::look_at_rh(eye, center, up);
                target.clear(0);

                for cull_back in [true, false] {
                    pipeline.upload_uniform_mat4("model", &model)?;
                    pipeline.upload_uniform_mat4("view", &view)?;
                    pipeline.upload_uniform_mat4("proj", &proj)?;
                    let stats = pipeline.render(&mut target, cull_back, true)?;
                    log::debug!(
                        "voxelizer view {dir}: {} triangles, {} fragments",
                        stats.triangles_rasterized,
                        stats.fragments_shaded
                    );
                }
            }
        }

        log::info!(
            "voxelized {} triangles: {} points inserted, {} outside bounds",
            mesh.triangle_count(),
            builder.inserted,
            builder.outside
        );
        drop(builder);

        log::info!(
            "octree: {} nodes, {} alive leaves",
            tree.node_count(),
            tree.leaf_count()
        );
        Ok(tree)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bounds_are_cubic_and_padded() {
        let mesh = MeshData::from_triangles(vec![
            Vec3::ZERO,
            Vec3::new(2.0, 0.0, 0.0),
            Vec3::new(0.0, 1.0, 0.0),
        ]);
        let v = Voxelizer::new(VoxelizerConfig {
            grid: 4,
            max_depth: 3,
        });
        let b = v.world_bounds(&mesh, Mat4::IDENTITY).unwrap();
        let size = b.size();
        assert!((size.x - 3.0).abs() < 1e-6);
        assert_eq!(size.x, size.y);
        assert_eq!(size.y, size.z);
        assert_eq!(b.center(), Vec3::new(1.0, 0.5, 0.0));
    }

    #[test]
    fn empty_mesh_is_rejected() {
        let v = Voxelizer::default();
        assert!(v.build(&MeshData::default(), Mat4::IDENTITY).is_err());
    }
}

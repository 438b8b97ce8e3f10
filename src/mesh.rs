/// Triangle soup geometry for the pipeline
///
/// Vertices are stored unindexed, three per triangle, and uploaded as
/// `pos(3) + normal(3)` floats.
use crate::error::{Error, Result};
use crate::octree::Aabb;
use crate::rendering::GraphicPipeline;
use glam::{Mat4, Vec3};
use std::path::Path;

/// Floats per uploaded vertex.
pub const VERTEX_SIZE: usize = 6;
pub const POS_OFFSET: usize = 0;
pub const NORMAL_OFFSET: usize = 3;

/// Camera-space depth `transform_to_center` places the mesh at.
const CENTER_DEPTH: f32 = -5.5;

#[derive(Debug, Clone, Default)]
pub struct MeshData {
    pub positions: Vec<Vec3>,
    pub normals: Vec<Vec3>,
}

impl MeshData {
    /// Flat-shaded mesh from triangle corners.
    pub fn from_triangles(positions: Vec<Vec3>) -> Self {
        let normals = flat_normals(&positions);
        Self { positions, normals }
    }

    /// Axis-aligned unit cube centered at the origin, counter-clockwise
    /// when seen from outside.
    pub fn cube() -> Self {
        // (normal, u axis, v axis); u x v == normal keeps the winding outward.
        let faces = [
            (Vec3::X, Vec3::NEG_Z, Vec3::Y),
            (Vec3::NEG_X, Vec3::Z, Vec3::Y),
            (Vec3::Y, Vec3::X, Vec3::NEG_Z),
            (Vec3::NEG_Y, Vec3::X, Vec3::Z),
            (Vec3::Z, Vec3::X, Vec3::Y),
            (Vec3::NEG_Z, Vec3::NEG_X, Vec3::Y),
        ];

        let mut positions = Vec::with_capacity(36);
        let mut normals = Vec::with_capacity(36);
        for (n, u, v) in faces {
            let c = n * 0.5;
            let (u, v) = (u * 0.5, v * 0.5);
            let quad = [c - u - v, c + u - v, c + u + v, c - u + v];
            for i in [0, 1, 2, 0, 2, 3] {
                positions.push(quad[i]);
                normals.push(n);
            }
        }
        Self { positions, normals }
    }

    /// Every triangle of every mesh primitive in a glTF/GLB file. Node
    /// transforms are not applied.
    pub fn load_gltf<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let (document, buffers, _images) = gltf::import(path)?;

        let mut mesh = MeshData::default();
        for gmesh in document.meshes() {
            for primitive in gmesh.primitives() {
                if primitive.mode() != gltf::mesh::Mode::Triangles {
                    log::warn!(
                        "skipping {:?} primitive in mesh {:?}",
                        primitive.mode(),
                        gmesh.name()
                    );
                    continue;
                }
                let reader = primitive.reader(|buffer| Some(&buffers[buffer.index()]));

                let Some(positions) = reader.read_positions() else {
                    log::warn!("primitive without POSITION in mesh {:?}", gmesh.name());
                    continue;
                };
                let positions: Vec<Vec3> = positions.map(Vec3::from).collect();
                let normals: Option<Vec<Vec3>> =
                    reader.read_normals().map(|it| it.map(Vec3::from).collect());
                let indices: Vec<u32> = match reader.read_indices() {
                    Some(it) => it.into_u32().collect(),
                    None => (0..positions.len() as u32).collect(),
                };

                let start = mesh.positions.len();
                for &i in &indices {
                    let i = i as usize;
                    let p = positions.get(i).copied().ok_or_else(|| {
                        Error::InvalidConfiguration(format!(
                            "{}: index {i} out of {} vertices",
                            path.display(),
                            positions.len()
                        ))
                    })?;
                    mesh.positions.push(p);
                    if let Some(n) = &normals {
                        mesh.normals.push(n.get(i).copied().unwrap_or(Vec3::Y));
                    }
                }
                if normals.is_none() {
                    let flat = flat_normals(&mesh.positions[start..]);
                    mesh.normals.extend(flat);
                }
            }
        }

        log::info!(
            "loaded {} ({} triangles)",
            path.display(),
            mesh.triangle_count()
        );
        Ok(mesh)
    }

    pub fn triangle_count(&self) -> usize {
        self.positions.len() / 3
    }

    pub fn bounds(&self) -> Option<Aabb> {
        Aabb::from_points(self.positions.iter().copied())
    }

    /// Interleaved `pos + normal` stream.
    pub fn interleaved(&self) -> Vec<f32> {
        let mut out = Vec::with_capacity(self.positions.len() * VERTEX_SIZE);
        for (p, n) in self.positions.iter().zip(&self.normals) {
            out.extend_from_slice(&p.to_array());
            out.extend_from_slice(&n.to_array());
        }
        out
    }

    /// Upload the vertex stream and register `pos` and `normal`.
    pub fn upload(&self, pipeline: &mut GraphicPipeline) -> Result<()> {
        pipeline.upload_data(&self.interleaved(), VERTEX_SIZE)?;
        pipeline.define_attribute("pos", 3, POS_OFFSET)?;
        pipeline.define_attribute("normal", 3, NORMAL_OFFSET)?;
        Ok(())
    }

    /// Model matrix that centers the mesh, scales its x extent to 1 and
    /// pushes it in front of a camera at the origin looking down -z.
    pub fn transform_to_center(&self) -> Mat4 {
        let Some(b) = self.bounds() else {
            return Mat4::IDENTITY;
        };
        let size = b.size();
        let width = if size.x > 0.0 { size.x } else { size.max_element() };
        let s = if width > 0.0 { 1.0 / width } else { 1.0 };

        Mat4::from_translation(Vec3::new(0.0, 0.0, CENTER_DEPTH))
            * Mat4::from_scale(Vec3::splat(s))
            * Mat4::from_translation(-b.center())
    }
}

fn flat_normals(positions: &[Vec3]) -> Vec<Vec3> {
    let mut normals = Vec::with_capacity(positions.len());
    for tri in positions.chunks(3) {
        let n = match tri {
            [a, b, c] => (*b - *a).cross(*c - *a).normalize_or_zero(),
            _ => Vec3::ZERO,
        };
        normals.extend(std::iter::repeat(n).take(tri.len()));
    }
    normals
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cube_winding_faces_outward() {
        let cube = MeshData::cube();
        assert_eq!(cube.triangle_count(), 12);
        for (tri, n) in cube.positions.chunks(3).zip(cube.normals.chunks(3)) {
            let face = (tri[1] - tri[0]).cross(tri[2] - tri[0]).normalize();
            assert!((face - n[0]).length() < 1e-6);
        }
        let b = cube.bounds().unwrap();
        assert_eq!(b.min, Vec3::splat(-0.5));
    }

    #[test]
    fn center_transform_scales_width_to_one() {
        let mesh = MeshData::from_triangles(vec![
            Vec3::new(2.0, 0.0, 0.0),
            Vec3::new(6.0, 0.0, 0.0),
            Vec3::new(2.0, 2.0, 0.0),
        ]);
        let m = mesh.transform_to_center();
        let a = m.transform_point3(Vec3::new(2.0, 0.0, 0.0));
        let b = m.transform_point3(Vec3::new(6.0, 0.0, 0.0));
        assert!((b.x - a.x - 1.0).abs() < 1e-6);
        assert!((a.z - CENTER_DEPTH).abs() < 1e-6);
        assert!((m.transform_point3(Vec3::new(4.0, 1.0, 0.0))).truncate().length() < 1e-6);
    }

    #[test]
    fn interleaved_layout() {
        let mesh = MeshData::from_triangles(vec![Vec3::ZERO, Vec3::X, Vec3::Y]);
        let data = mesh.interleaved();
        assert_eq!(data.len(), 3 * VERTEX_SIZE);
        assert_eq!(&data[6..12], &[1.0, 0.0, 0.0, 0.0, 0.0, 1.0]);
    }
}

use crate::error::Result;
use crate::octree::Octree;
use crate::rendering::{Fragment, FragmentShader, ShaderContext};
use glam::{Vec3, Vec4};

/// Octree preview drawn on a fullscreen quad.
///
/// Varyings: `pos` (NDC xy, from [`super::PassthroughShader`]).
/// Uniforms: `inv_view_proj` (mat4), `eye` (vec3).
pub struct RayMarchShader<'t> {
    tree: &'t Octree,
    pub background: Vec4,
}

impl<'t> RayMarchShader<'t> {
    pub fn new(tree: &'t Octree) -> Self {
        Self {
            tree,
            background: Vec4::new(0.05, 0.05, 0.08, 1.0),
        }
    }
}

impl FragmentShader for RayMarchShader<'_> {
    fn launch(&mut self, ctx: &ShaderContext, fragment: &Fragment) -> Result<Vec4> {
        let ndc = ctx.attribute_vec2("pos", fragment.varyings())?;
        let inv_view_proj = ctx.uniform_mat4("inv_view_proj")?;
        let eye = ctx.uniform_vec3("eye")?;

        let far = inv_view_proj.project_point3(Vec3::new(ndc.x, ndc.y, 1.0));
        let dir = (far - eye).normalize_or_zero();

        let Some(hit) = self.tree.closest_leaf(eye, dir) else {
            return Ok(self.background);
        };

        // Face tint, darkened by a headlight term and faded with distance.
        let tint = hit.normal * 0.5 + Vec3::splat(0.5);
        let k = hit.normal.dot(-dir).max(0.0);
        let fade = 1.0 / (1.0 + 0.1 * hit.distance);
        let lit = (tint * (0.3 + 0.7 * k)).extend(1.0);
        Ok(self.background.lerp(lit, fade))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::Camera;
    use crate::rendering::{SlotRegistry, UniformArena};

    #[test]
    fn center_pixel_hits_and_corner_misses() {
        let mut tree = Octree::default();
        tree.set_aabb(Vec3::ZERO, Vec3::ONE).unwrap();
        tree.add_point(Vec3::splat(0.7)).unwrap();

        let camera = Camera::new(Vec3::new(0.7, 0.7, 3.0), 1.0);
        let mut attributes = SlotRegistry::new();
        attributes.define("pos", 2, 0);
        let mut uniforms = UniformArena::with_capacity(32);
        uniforms
            .upload("inv_view_proj", &camera.inverse_view_projection().to_cols_array())
            .unwrap();
        uniforms.upload("eye", &camera.position.to_array()).unwrap();
        let ctx = ShaderContext::new(&attributes, &uniforms, &[]);

        let mut shader = RayMarchShader::new(&tree);
        let d = [0.0; 7];

        let center = [0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 1.0];
        let c = shader.launch(&ctx, &Fragment::new(0, 0, 0.0, &center, &d)).unwrap();
        assert_ne!(c, shader.background);

        let corner = [0.0, 0.0, 0.0, 1.0, 0.99, 0.99, 1.0];
        let c = shader.launch(&ctx, &Fragment::new(0, 0, 0.0, &corner, &d)).unwrap();
        assert_eq!(c, shader.background);
    }
}

/// Vertex stages.
use crate::error::Result;
use crate::rendering::{ShaderContext, VertexShader};
use glam::{Mat3, Vec4};

/// Model/view/projection transform of `pos`, forwarding the world-space
/// position and normal in place of the inputs.
///
/// Attributes: `pos` (3), `normal` (3).
/// Uniforms: `model`, `view`, `proj` (mat4).
#[derive(Debug, Default, Clone, Copy)]
pub struct StandardShader;

impl VertexShader for StandardShader {
    fn launch(&self, ctx: &ShaderContext, vertex_in: &[f32], vertex_out: &mut [f32]) -> Result<Vec4> {
        let pos = ctx.attribute_vec3("pos", vertex_in)?;
        let normal = ctx.attribute_vec3("normal", vertex_in)?;
        let model = ctx.uniform_mat4("model")?;
        let view = ctx.uniform_mat4("view")?;
        let proj = ctx.uniform_mat4("proj")?;

        let world = model.transform_point3(pos);
        let normal_matrix = Mat3::from_mat4(model).inverse().transpose();
        let world_normal = (normal_matrix * normal).normalize_or_zero();

        ctx.write_attribute("pos", vertex_out, &world.to_array())?;
        ctx.write_attribute("normal", vertex_out, &world_normal.to_array())?;

        Ok(proj * view * world.extend(1.0))
    }
}

/// Screen-space geometry: 2D `pos` already in NDC, forwarded unchanged.
#[derive(Debug, Default, Clone, Copy)]
pub struct PassthroughShader;

impl VertexShader for PassthroughShader {
    fn launch(&self, ctx: &ShaderContext, vertex_in: &[f32], vertex_out: &mut [f32]) -> Result<Vec4> {
        let pos = ctx.attribute_vec2("pos", vertex_in)?;
        ctx.write_attribute("pos", vertex_out, &pos.to_array())?;
        Ok(Vec4::new(pos.x, pos.y, 1.0, 1.0))
    }
}

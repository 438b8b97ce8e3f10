/// Plain surface fragment stages.
use crate::error::Result;
use crate::rendering::{Fragment, FragmentShader, ShaderContext};
use glam::Vec4;

/// Uniform `color` (4 floats) everywhere.
#[derive(Debug, Default, Clone, Copy)]
pub struct FlatShader;

impl FragmentShader for FlatShader {
    fn launch(&mut self, ctx: &ShaderContext, _fragment: &Fragment) -> Result<Vec4> {
        ctx.uniform_vec4("color")
    }
}

/// Samples texture unit 0 at the `texcoord` varying. The varying's
/// x-derivative drives mip selection.
#[derive(Debug, Default, Clone, Copy)]
pub struct TexturedShader;

impl FragmentShader for TexturedShader {
    fn launch(&mut self, ctx: &ShaderContext, fragment: &Fragment) -> Result<Vec4> {
        let uv = ctx.attribute_vec2("texcoord", fragment.varyings())?;
        let duv_dx = ctx.attribute_vec2("texcoord", fragment.derivatives())?;
        Ok(ctx.texture_unit(0)?.sample2d_grad(uv, duv_dx))
    }
}

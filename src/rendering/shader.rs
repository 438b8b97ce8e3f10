/// Programmable stages of the pipeline.
///
/// Both stages see the pipeline's state through a [`ShaderContext`]: the
/// attribute registry, the uniform arena and the bound texture units. All
/// lookups are by name and fail with [`Error::AttributeNotFound`] rather
/// than reading garbage.
use super::attributes::{SlotRegistry, UniformArena};
use super::sampler::TextureSampler;
use crate::error::{Error, Result};
use glam::{Mat4, Vec2, Vec3, Vec4};

/// Read-only view of the pipeline handed to each stage invocation.
pub struct ShaderContext<'a, 't> {
    attributes: &'a SlotRegistry,
    uniforms: &'a UniformArena,
    texture_units: &'a [TextureSampler<'t>],
}

impl<'a, 't> ShaderContext<'a, 't> {
    pub fn new(
        attributes: &'a SlotRegistry,
        uniforms: &'a UniformArena,
        texture_units: &'a [TextureSampler<'t>],
    ) -> Self {
        Self {
            attributes,
            uniforms,
            texture_units,
        }
    }

    /// Floats of attribute `name` inside `data`, which is either a raw input
    /// vertex or a fragment's varyings.
    #[inline]
    pub fn attribute<'d>(&self, name: &str, data: &'d [f32]) -> Result<&'d [f32]> {
        self.attributes.fetch(name, data)
    }

    pub fn attribute_vec2(&self, name: &str, data: &[f32]) -> Result<Vec2> {
        let [x, y] = fixed(name, self.attribute(name, data)?)?;
        Ok(Vec2::new(x, y))
    }

    pub fn attribute_vec3(&self, name: &str, data: &[f32]) -> Result<Vec3> {
        let [x, y, z] = fixed(name, self.attribute(name, data)?)?;
        Ok(Vec3::new(x, y, z))
    }

    /// Write `values` into the slot of `name` in a vertex output. Extra
    /// values beyond the slot size are ignored.
    pub fn write_attribute(&self, name: &str, out: &mut [f32], values: &[f32]) -> Result<()> {
        let slot = self.attributes.get(name)?;
        let dst = out
            .get_mut(slot.range())
            .ok_or_else(|| Error::AttributeNotFound(name.to_owned()))?;
        let n = dst.len().min(values.len());
        dst[..n].copy_from_slice(&values[..n]);
        Ok(())
    }

    #[inline]
    pub fn uniform(&self, name: &str) -> Result<&[f32]> {
        self.uniforms.get(name)
    }

    pub fn uniform_scalar(&self, name: &str) -> Result<f32> {
        let [v] = fixed(name, self.uniform(name)?)?;
        Ok(v)
    }

    pub fn uniform_vec3(&self, name: &str) -> Result<Vec3> {
        let [x, y, z] = fixed(name, self.uniform(name)?)?;
        Ok(Vec3::new(x, y, z))
    }

    pub fn uniform_vec4(&self, name: &str) -> Result<Vec4> {
        let v: [f32; 4] = fixed(name, self.uniform(name)?)?;
        Ok(Vec4::from_array(v))
    }

    /// Column-major 4x4 matrix.
    pub fn uniform_mat4(&self, name: &str) -> Result<Mat4> {
        let m: [f32; 16] = fixed(name, self.uniform(name)?)?;
        Ok(Mat4::from_cols_array(&m))
    }

    pub fn texture_unit(&self, unit: usize) -> Result<&TextureSampler<'t>> {
        self.texture_units
            .get(unit)
            .ok_or(Error::TextureUnitOutOfRange {
                unit,
                units: self.texture_units.len(),
            })
    }
}

/// First `N` floats of a slot. A slot shorter than `N` is treated as a
/// missing value.
#[inline]
fn fixed<const N: usize>(name: &str, values: &[f32]) -> Result<[f32; N]> {
    values
        .get(..N)
        .and_then(|v| <[f32; N]>::try_from(v).ok())
        .ok_or_else(|| Error::AttributeNotFound(format!("{name} (needs {N} floats)")))
}

/// One rasterized sample, after the perspective-correct divide.
#[derive(Copy, Clone, Debug)]
pub struct Fragment<'a> {
    pub x: usize,
    pub y: usize,
    /// NDC depth after the viewport transform.
    pub depth: f32,
    values: &'a [f32],
    derivatives: &'a [f32],
}

impl<'a> Fragment<'a> {
    /// `values` and `derivatives` are full vertex elements: position,
    /// varyings, then the 1/w sentinel.
    pub fn new(x: usize, y: usize, depth: f32, values: &'a [f32], derivatives: &'a [f32]) -> Self {
        Self {
            x,
            y,
            depth,
            values,
            derivatives,
        }
    }

    /// Interpolated attributes, addressed by the same offsets as the
    /// vertex stage output.
    #[inline]
    pub fn varyings(&self) -> &'a [f32] {
        strip(self.values)
    }

    /// d(varying)/dx along the scanline.
    #[inline]
    pub fn derivatives(&self) -> &'a [f32] {
        strip(self.derivatives)
    }

    /// Interpolated screen-space position (x, y, z).
    pub fn position(&self) -> Vec3 {
        match self.values {
            [x, y, z, ..] => Vec3::new(*x, *y, *z),
            _ => Vec3::ZERO,
        }
    }
}

#[inline]
fn strip(element: &[f32]) -> &[f32] {
    match element.len() {
        n if n > 5 => &element[4..n - 1],
        _ => &[],
    }
}

pub trait VertexShader {
    /// Transform one input vertex. `vertex_out` has `vertex_size` floats and
    /// is zeroed before the call; the returned vector is the clip position.
    fn launch(&self, ctx: &ShaderContext, vertex_in: &[f32], vertex_out: &mut [f32])
        -> Result<Vec4>;
}

pub trait FragmentShader {
    /// Shade one fragment. The RGBA result is clamped when written.
    fn launch(&mut self, ctx: &ShaderContext, fragment: &Fragment) -> Result<Vec4>;
}

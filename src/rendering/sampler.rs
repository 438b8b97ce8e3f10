/// Texture filtering.
///
/// A sampler borrows a texture for as long as it is bound to a pipeline
/// unit. Coordinates are wrapped or clamped into [0, 1] before any texel is
/// addressed, so no sample can index past a level.
use super::texture::Texture;
use glam::{Vec2, Vec4};

/// Returned when a unit is sampled with nothing bound.
pub const UNBOUND_COLOR: Vec4 = Vec4::new(1.0, 0.0, 0.0, 1.0);

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum Filter {
    Nearest,
    Bilinear,
    #[default]
    Trilinear,
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum WrapMode {
    #[default]
    ClampToEdge,
    Repeat,
}

impl WrapMode {
    #[inline]
    fn apply(self, t: f32) -> f32 {
        match self {
            WrapMode::ClampToEdge => t.clamp(0.0, 1.0),
            WrapMode::Repeat => t - t.floor(),
        }
    }
}

#[derive(Copy, Clone, Debug, Default)]
pub struct TextureSampler<'t> {
    texture: Option<&'t Texture>,
    pub filter: Filter,
    pub wrap: WrapMode,
}

impl<'t> TextureSampler<'t> {
    pub fn new(filter: Filter, wrap: WrapMode) -> Self {
        Self {
            texture: None,
            filter,
            wrap,
        }
    }

    pub fn bind(&mut self, texture: &'t Texture) {
        self.texture = Some(texture);
    }

    pub fn unbind(&mut self) {
        self.texture = None;
    }

    pub fn texture(&self) -> Option<&'t Texture> {
        self.texture
    }

    /// Sample without derivatives. Trilinear degrades to level 0.
    pub fn sample2d(&self, uv: Vec2) -> Vec4 {
        self.sample2d_grad(uv, Vec2::ZERO)
    }

    /// Sample with the screen-space x-derivative of `uv`, used to select
    /// the mip level.
    pub fn sample2d_grad(&self, uv: Vec2, duv_dx: Vec2) -> Vec4 {
        let Some(tex) = self.texture else {
            return UNBOUND_COLOR;
        };
        let u = self.wrap.apply(uv.x);
        let v = self.wrap.apply(uv.y);

        match self.filter {
            Filter::Nearest => self.nearest(tex, u, v, 0),
            Filter::Bilinear => self.bilinear(tex, u, v, 0),
            Filter::Trilinear => {
                let rho = duv_dx.length() * tex.side() as f32;
                if !(rho > 1.0) {
                    return self.nearest(tex, u, v, 0);
                }
                let last = (tex.level_count() - 1) as f32;
                let lod = rho.log2().min(last);
                let base = lod.floor();
                let lo = self.bilinear(tex, u, v, base as usize);
                if base >= last {
                    return lo;
                }
                let hi = self.bilinear(tex, u, v, base as usize + 1);
                lo.lerp(hi, lod - base)
            }
        }
    }

    fn nearest(&self, tex: &Texture, u: f32, v: f32, level: usize) -> Vec4 {
        let s = (tex.level_side(level) - 1) as f32;
        let i = (v * s + 0.5) as usize;
        let j = (u * s + 0.5) as usize;
        tex.texel(i, j, level)
    }

    fn bilinear(&self, tex: &Texture, u: f32, v: f32, level: usize) -> Vec4 {
        let side = tex.level_side(level);
        let y = v * (side - 1) as f32;
        let x = u * (side - 1) as f32;
        let (i0, j0) = (y.floor() as usize, x.floor() as usize);
        let (ty, tx) = (y - i0 as f32, x - j0 as f32);

        let next = |k: usize| match self.wrap {
            WrapMode::ClampToEdge => (k + 1).min(side - 1),
            WrapMode::Repeat => (k + 1) % side,
        };
        let (i1, j1) = (next(i0), next(j0));

        let top = tex.texel(i0, j0, level).lerp(tex.texel(i0, j1, level), tx);
        let bottom = tex.texel(i1, j0, level).lerp(tex.texel(i1, j1, level), tx);
        top.lerp(bottom, ty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn checker() -> Texture {
        // 2x2: black white / white black
        let px = [
            0, 0, 0, 255, 255, 255, 255, 255, //
            255, 255, 255, 255, 0, 0, 0, 255,
        ];
        let mut tex = Texture::from_raw(2, 4, &px).unwrap();
        tex.compute_mips();
        tex
    }

    #[test]
    fn unbound_sampler_returns_marker_color() {
        let s = TextureSampler::default();
        assert_eq!(s.sample2d(Vec2::splat(0.5)), UNBOUND_COLOR);
    }

    #[test]
    fn nearest_rounds_to_closest_texel() {
        let tex = checker();
        let mut s = TextureSampler::new(Filter::Nearest, WrapMode::ClampToEdge);
        s.bind(&tex);
        assert_eq!(s.sample2d(Vec2::new(0.2, 0.1)).x, 0.0);
        assert_eq!(s.sample2d(Vec2::new(0.8, 0.1)).x, 1.0);
    }

    #[test]
    fn bilinear_blends_center() {
        let tex = checker();
        let mut s = TextureSampler::new(Filter::Bilinear, WrapMode::ClampToEdge);
        s.bind(&tex);
        let c = s.sample2d(Vec2::splat(0.5));
        assert!((c.x - 0.5).abs() < 1e-5);
    }

    #[test]
    fn clamp_and_repeat_differ_outside_unit_square() {
        let tex = checker();
        let mut s = TextureSampler::new(Filter::Nearest, WrapMode::ClampToEdge);
        s.bind(&tex);
        assert_eq!(s.sample2d(Vec2::new(1.2, 0.0)).x, 1.0);
        s.wrap = WrapMode::Repeat;
        assert_eq!(s.sample2d(Vec2::new(1.2, 0.0)).x, 0.0);
    }

    #[test]
    fn trilinear_minification_reads_coarsest_level() {
        let tex = checker();
        let mut s = TextureSampler::new(Filter::Trilinear, WrapMode::ClampToEdge);
        s.bind(&tex);
        // Whole texture per pixel: lod clamps to the 1x1 level, the average.
        let c = s.sample2d_grad(Vec2::new(0.0, 0.0), Vec2::new(4.0, 0.0));
        assert!((c.x - 128.0 / 255.0).abs() < 1e-5);
    }
}

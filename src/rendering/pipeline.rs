/// Software graphic pipeline
///
/// Stages run in order over one working vertex buffer:
/// vertex processing -> clipping -> perspective division -> culling ->
/// scanline rasterization.
///
/// Every working element is `4 + vertex_size + 1` floats: the clip position,
/// the vertex stage outputs, then a `1.0` that becomes `1/w` after the
/// divide. Interpolating that last float and dividing by it recovers
/// perspective-correct attributes.
use super::attributes::{SlotRegistry, UniformArena};
use super::framebuffer::{quantize_color, Framebuffer};
use super::sampler::TextureSampler;
use super::shader::{Fragment, FragmentShader, ShaderContext, VertexShader};
use super::texture::Texture;
use crate::error::{Error, Result};
use crate::perf::RenderStats;
use crate::perf_scope;
use glam::{Mat4, Vec3, Vec4};

#[derive(Debug, Clone, Copy)]
pub struct PipelineConfig {
    /// Floats available for uniforms in one draw.
    pub uniform_capacity: usize,
    pub texture_units: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            uniform_capacity: 100,
            texture_units: 10,
        }
    }
}

/// NDC to pixel transform: x in [-1, 1] maps to [0, width], y is flipped
/// so +1 lands on row 0.
pub fn viewport_matrix(width: usize, height: usize) -> Mat4 {
    let (hw, hh) = (width as f32 * 0.5, height as f32 * 0.5);
    Mat4::from_cols(
        Vec4::new(hw, 0.0, 0.0, 0.0),
        Vec4::new(0.0, -hh, 0.0, 0.0),
        Vec4::new(0.0, 0.0, 1.0, 0.0),
        Vec4::new(hw, hh, 0.0, 1.0),
    )
}

pub struct GraphicPipeline<'s> {
    config: PipelineConfig,

    vertex_in: Vec<f32>,
    vertex_size: usize,
    vertex_count: usize,
    elem_size: usize,
    vbuffer: Vec<f32>,

    attributes: SlotRegistry,
    uniforms: UniformArena,
    texture_units: Vec<TextureSampler<'s>>,

    vertex_shader: Option<&'s dyn VertexShader>,
    fragment_shader: Option<&'s mut dyn FragmentShader>,

    viewport: Mat4,
    scratch: RasterScratch,

    /// When false every rasterized fragment is shaded and written.
    pub depth_test: bool,
}

impl<'s> GraphicPipeline<'s> {
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            config,
            vertex_in: Vec::new(),
            vertex_size: 0,
            vertex_count: 0,
            elem_size: 0,
            vbuffer: Vec::new(),
            attributes: SlotRegistry::new(),
            uniforms: UniformArena::with_capacity(config.uniform_capacity),
            texture_units: vec![TextureSampler::default(); config.texture_units],
            vertex_shader: None,
            fragment_shader: None,
            viewport: Mat4::IDENTITY,
            scratch: RasterScratch::default(),
            depth_test: true,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Copy a flat vertex stream of `vertex_size` floats per vertex.
    /// A trailing incomplete triangle is dropped.
    pub fn upload_data(&mut self, data: &[f32], vertex_size: usize) -> Result<()> {
        if vertex_size == 0 {
            return Err(Error::InvalidConfiguration(
                "vertex_size must be at least 1".into(),
            ));
        }
        if data.len() < vertex_size {
            return Err(Error::InvalidConfiguration(format!(
                "{} floats do not hold a single vertex of size {vertex_size}",
                data.len()
            )));
        }

        let vertices = data.len() / vertex_size;
        let kept = vertices - vertices % 3;
        if kept * vertex_size != data.len() {
            log::warn!(
                "vertex stream of {} floats is not whole triangles; dropping {} trailing floats",
                data.len(),
                data.len() - kept * vertex_size
            );
        }

        self.vertex_size = vertex_size;
        self.vertex_count = kept;
        self.elem_size = 4 + vertex_size + 1;

        self.vertex_in.clear();
        self.vertex_in.extend_from_slice(&data[..kept * vertex_size]);

        self.vbuffer.clear();
        self.vbuffer.resize(kept * self.elem_size, 0.0);
        self.scratch.resize(self.elem_size);

        log::debug!(
            "uploaded {} vertices ({} floats each, {} triangles)",
            kept,
            vertex_size,
            kept / 3
        );
        Ok(())
    }

    /// Name `count` floats at `offset` of each vertex. The same offsets
    /// address the vertex stage outputs and the fragment varyings.
    pub fn define_attribute(&mut self, name: &str, count: usize, offset: usize) -> Result<()> {
        if self.vertex_size == 0 {
            return Err(Error::InvalidConfiguration(format!(
                "attribute '{name}' defined before any vertex data was uploaded"
            )));
        }
        if offset + count > self.vertex_size {
            return Err(Error::InvalidConfiguration(format!(
                "attribute '{name}' ({count} floats at {offset}) exceeds vertex size {}",
                self.vertex_size
            )));
        }
        self.attributes.define(name, count, offset);
        Ok(())
    }

    pub fn upload_uniform(&mut self, name: &str, values: &[f32]) -> Result<()> {
        self.uniforms.upload(name, values)
    }

    pub fn upload_uniform_scalar(&mut self, name: &str, value: f32) -> Result<()> {
        self.uniforms.upload(name, &[value])
    }

    pub fn upload_uniform_vec3(&mut self, name: &str, value: Vec3) -> Result<()> {
        self.uniforms.upload(name, &value.to_array())
    }

    pub fn upload_uniform_vec4(&mut self, name: &str, value: Vec4) -> Result<()> {
        self.uniforms.upload(name, &value.to_array())
    }

    /// Stored column-major.
    pub fn upload_uniform_mat4(&mut self, name: &str, value: &Mat4) -> Result<()> {
        self.uniforms.upload(name, &value.to_cols_array())
    }

    pub fn set_vertex_shader(&mut self, shader: &'s dyn VertexShader) {
        self.vertex_shader = Some(shader);
    }

    pub fn set_fragment_shader(&mut self, shader: &'s mut dyn FragmentShader) {
        self.fragment_shader = Some(shader);
    }

    pub fn bind_tex_unit(&mut self, texture: &'s Texture, unit: usize) -> Result<()> {
        self.tex_unit_mut(unit)?.bind(texture);
        Ok(())
    }

    /// Sampler of `unit`, to change its filter or wrap mode.
    pub fn tex_unit_mut(&mut self, unit: usize) -> Result<&mut TextureSampler<'s>> {
        let units = self.texture_units.len();
        self.texture_units
            .get_mut(unit)
            .ok_or(Error::TextureUnitOutOfRange { unit, units })
    }

    pub fn set_viewport(&mut self, viewport: Mat4) {
        self.viewport = viewport;
    }

    pub fn vertex_size(&self) -> usize {
        self.vertex_size
    }

    pub fn vertex_count(&self) -> usize {
        self.vertex_count
    }

    pub fn attributes(&self) -> &SlotRegistry {
        &self.attributes
    }

    /// Working buffer after the last render. The first
    /// `stats.triangles_rasterized * 3` elements are the triangles that
    /// reached rasterization, in NDC.
    pub fn working_buffer(&self) -> &[f32] {
        &self.vbuffer
    }

    /// Draw the uploaded triangles into `target`.
    ///
    /// Uniform uploads for the next draw start over from the beginning of
    /// the arena, even when this call fails; the ones made for this draw
    /// stay readable until then.
    pub fn render(
        &mut self,
        target: &mut Framebuffer,
        cull_back: bool,
        fill: bool,
    ) -> Result<RenderStats> {
        perf_scope!("render");
        self.uniforms.rewind();

        if self.vertex_size == 0 {
            return Err(Error::InvalidConfiguration(
                "render called before upload_data".into(),
            ));
        }
        let vertex_shader = self.vertex_shader.ok_or_else(|| {
            Error::InvalidConfiguration("no vertex shader set".into())
        })?;
        let fragment_shader = self.fragment_shader.as_deref_mut().ok_or_else(|| {
            Error::InvalidConfiguration("no fragment shader set".into())
        })?;

        let ctx = ShaderContext::new(&self.attributes, &self.uniforms, &self.texture_units);
        let elem = self.elem_size;
        let tri = 3 * elem;

        let mut stats = RenderStats {
            vertices: self.vertex_count as u64,
            triangles_in: (self.vertex_count / 3) as u64,
            ..Default::default()
        };

        {
            perf_scope!("vertex_processing");
            vertex_processing(
                vertex_shader,
                &ctx,
                &self.vertex_in,
                self.vertex_size,
                &mut self.vbuffer,
                elem,
            )?;
        }

        let clipped_len = {
            perf_scope!("clipping");
            primitive_clipping(&mut self.vbuffer, tri, elem)
        };
        stats.triangles_clipped = stats.triangles_in - (clipped_len / tri) as u64;

        {
            perf_scope!("perspective_division");
            perspective_division(&mut self.vbuffer[..clipped_len], elem);
        }

        let culled_len = {
            perf_scope!("culling");
            primitive_culling(&mut self.vbuffer[..clipped_len], tri, elem, cull_back)
        };
        stats.triangles_culled = ((clipped_len - culled_len) / tri) as u64;
        stats.triangles_rasterized = (culled_len / tri) as u64;

        {
            perf_scope!("rasterization");
            let mut raster = Rasterizer {
                target,
                viewport: self.viewport,
                elem,
                fill,
                depth_test: self.depth_test,
                scratch: &mut self.scratch,
                stats: &mut stats,
            };
            for t in self.vbuffer[..culled_len].chunks_exact(tri) {
                raster.triangle(t, fragment_shader, &ctx)?;
            }
        }

        log::trace!("{stats:?}");
        Ok(stats)
    }
}

impl Default for GraphicPipeline<'_> {
    fn default() -> Self {
        Self::new(PipelineConfig::default())
    }
}

fn vertex_processing(
    shader: &dyn VertexShader,
    ctx: &ShaderContext,
    input: &[f32],
    vertex_size: usize,
    vbuffer: &mut [f32],
    elem: usize,
) -> Result<()> {
    for (vin, out) in input
        .chunks_exact(vertex_size)
        .zip(vbuffer.chunks_exact_mut(elem))
    {
        let varyings = &mut out[4..elem - 1];
        varyings.fill(0.0);
        let pos = shader.launch(ctx, vin, varyings)?;
        out[..4].copy_from_slice(&pos.to_array());
        out[elem - 1] = 1.0;
    }
    Ok(())
}

/// Whole triangles only: one vertex behind the eye or outside the clip
/// volume drops the triangle. Survivors are packed to the front in order.
/// Returns the length in floats of the surviving prefix.
fn primitive_clipping(vbuffer: &mut [f32], tri: usize, elem: usize) -> usize {
    let mut kept = 0;
    for t in (0..vbuffer.len()).step_by(tri) {
        let visible = (0..3).all(|k| {
            let v = &vbuffer[t + k * elem..];
            let w = v[3];
            w > 0.0 && v[0].abs() <= w && v[1].abs() <= w && v[2].abs() <= w
        });
        if visible {
            if kept != t {
                vbuffer.copy_within(t..t + tri, kept);
            }
            kept += tri;
        }
    }
    kept
}

/// Divide every float of every element by its w. The trailing 1.0
/// becomes 1/w.
fn perspective_division(vbuffer: &mut [f32], elem: usize) {
    for v in vbuffer.chunks_exact_mut(elem) {
        let inv_w = 1.0 / v[3];
        v.iter_mut().for_each(|x| *x *= inv_w);
    }
}

/// Counter-clockwise triangles in NDC are front facing.
fn primitive_culling(vbuffer: &mut [f32], tri: usize, elem: usize, cull_back: bool) -> usize {
    let mut kept = 0;
    for t in (0..vbuffer.len()).step_by(tri) {
        let (x0, y0) = (vbuffer[t], vbuffer[t + 1]);
        let (x1, y1) = (vbuffer[t + elem], vbuffer[t + elem + 1]);
        let (x2, y2) = (vbuffer[t + 2 * elem], vbuffer[t + 2 * elem + 1]);
        let cz = (x1 - x0) * (y2 - y0) - (y1 - y0) * (x2 - x0);

        if (cull_back && cz >= 0.0) || (!cull_back && cz <= 0.0) {
            if kept != t {
                vbuffer.copy_within(t..t + tri, kept);
            }
            kept += tri;
        }
    }
    kept
}

#[inline(always)]
fn round_px(x: f32) -> i32 {
    (x + 0.5).floor() as i32
}

/// Operand registers for the scanline loop, sized once per upload.
#[derive(Default)]
struct RasterScratch {
    v: [Vec<f32>; 3],
    dv_dy: [Vec<f32>; 3],
    start: Vec<f32>,
    end: Vec<f32>,
    dv_dx: Vec<f32>,
    f: Vec<f32>,
    frag: Vec<f32>,
    dv_dx_w: Vec<f32>,
}

impl RasterScratch {
    fn resize(&mut self, elem: usize) {
        for buf in self
            .v
            .iter_mut()
            .chain(self.dv_dy.iter_mut())
            .chain([
                &mut self.start,
                &mut self.end,
                &mut self.dv_dx,
                &mut self.f,
                &mut self.frag,
                &mut self.dv_dx_w,
            ])
        {
            buf.clear();
            buf.resize(elem, 0.0);
        }
    }
}

#[derive(Copy, Clone, PartialEq, Eq)]
enum Side {
    Start,
    End,
}

/// `out = (a - b) * k`
#[inline]
fn sub_scaled(out: &mut [f32], a: &[f32], b: &[f32], k: f32) {
    for ((o, a), b) in out.iter_mut().zip(a).zip(b) {
        *o = (a - b) * k;
    }
}

#[inline]
fn add_assign(out: &mut [f32], inc: &[f32]) {
    for (o, i) in out.iter_mut().zip(inc) {
        *o += i;
    }
}

#[inline]
fn scale_into(out: &mut [f32], v: &[f32], k: f32) {
    for (o, v) in out.iter_mut().zip(v) {
        *o = v * k;
    }
}

struct Rasterizer<'r> {
    target: &'r mut Framebuffer,
    viewport: Mat4,
    elem: usize,
    fill: bool,
    depth_test: bool,
    scratch: &'r mut RasterScratch,
    stats: &'r mut RenderStats,
}

impl Rasterizer<'_> {
    /// Scanline-fill one triangle of three NDC elements.
    fn triangle(
        &mut self,
        tri: &[f32],
        shader: &mut dyn FragmentShader,
        ctx: &ShaderContext,
    ) -> Result<()> {
        let elem = self.elem;
        let sc = &mut *self.scratch;

        // Pixel-snapped x, y; NDC z; 1/w in the w slot.
        for (k, v) in sc.v.iter_mut().enumerate() {
            let src = &tri[k * elem..(k + 1) * elem];
            let p = self.viewport * Vec4::new(src[0], src[1], 1.0, 1.0);
            v.copy_from_slice(src);
            v[0] = round_px(p.x) as f32;
            v[1] = round_px(p.y) as f32;
            v[3] = src[elem - 1];
        }

        if sc.v[0][1] > sc.v[1][1] {
            sc.v.swap(0, 1);
        }
        if sc.v[0][1] > sc.v[2][1] {
            sc.v.swap(0, 2);
        }
        if sc.v[1][1] > sc.v[2][1] {
            sc.v.swap(1, 2);
        }

        let [v0, v1, v2] = &sc.v;
        let inv = |dy: f32| if dy != 0.0 { 1.0 / dy } else { 0.0 };
        sub_scaled(&mut sc.dv_dy[0], v1, v0, inv(v1[1] - v0[1]));
        sub_scaled(&mut sc.dv_dy[1], v2, v0, inv(v2[1] - v0[1]));
        sub_scaled(&mut sc.dv_dy[2], v2, v1, inv(v2[1] - v1[1]));

        // v1 right of v0->v2: v0v1 bounds the end of each span.
        let right_side = (v1[0] - v0[0]) * (v2[1] - v0[1]) - (v1[1] - v0[1]) * (v2[0] - v0[0]);
        let (mut d_start, mut d_end, next) = if right_side > 0.0 {
            (1, 0, Side::End)
        } else {
            (0, 1, Side::Start)
        };

        if v0[1] == v1[1] {
            // Flat top: the v1v2 edge is active from the first row.
            if v0[0] < v1[0] {
                d_end = 2;
                sc.start.copy_from_slice(v0);
                sc.end.copy_from_slice(v1);
            } else {
                d_start = 2;
                sc.start.copy_from_slice(v1);
                sc.end.copy_from_slice(v0);
            }
        } else {
            sc.start.copy_from_slice(v0);
            sc.end.copy_from_slice(v0);
        }

        let (y_first, y_mid, y_last) = (v0[1] as i32, v1[1] as i32, v2[1] as i32);

        for y in y_first..=y_last {
            let s = round_px(sc.start[0]);
            let e = round_px(sc.end[0]);
            let span = if e != s { 1.0 / (e - s) as f32 } else { 0.0 };
            sub_scaled(&mut sc.dv_dx, &sc.end, &sc.start, span);
            sc.f.copy_from_slice(&sc.start);

            for x in s..=e {
                if (self.fill || x == s || x == e) && self.target.contains(x, y) {
                    let (px, py) = (x as usize, y as usize);
                    let z = sc.f[2];
                    self.stats.fragments_tested += 1;

                    let pass = !self.depth_test
                        || self.target.depth(px, py).is_some_and(|d| z < d);
                    if pass {
                        self.stats.fragments_passed += 1;

                        let inv_w = 1.0 / sc.f[3];
                        scale_into(&mut sc.frag, &sc.f, inv_w);
                        scale_into(&mut sc.dv_dx_w, &sc.dv_dx, inv_w);

                        let fragment = Fragment::new(px, py, z, &sc.frag, &sc.dv_dx_w);
                        let color = quantize_color(shader.launch(ctx, &fragment)?);
                        self.stats.fragments_shaded += 1;
                        if self.depth_test {
                            self.target.set_pixel(px, py, color, z);
                        } else {
                            self.target.set_depth(px, py, z);
                            self.target.set_color(px, py, color);
                        }
                    }
                }
                add_assign(&mut sc.f, &sc.dv_dx);
            }

            // Swap before stepping, or the span overshoots v1 for a row.
            if y == y_mid {
                match next {
                    Side::Start => d_start = 2,
                    Side::End => d_end = 2,
                }
            }

            add_assign(&mut sc.start, &sc.dv_dy[d_start]);
            add_assign(&mut sc.end, &sc.dv_dy[d_end]);
        }
        Ok(())
    }
}

/// Texture loading, mip generation and sampling through the pipeline
use glam::{Vec2, Vec4};
use voxel_raster::rendering::unpack_rgba;
use voxel_raster::*;

/// pos (2) + texcoord (2), both forwarded.
struct QuadShader;

impl VertexShader for QuadShader {
    fn launch(&self, ctx: &ShaderContext, vertex_in: &[f32], vertex_out: &mut [f32]) -> Result<Vec4> {
        let pos = ctx.attribute_vec2("pos", vertex_in)?;
        vertex_out.copy_from_slice(vertex_in);
        Ok(Vec4::new(pos.x, pos.y, 0.0, 1.0))
    }
}

const QUAD: [f32; 24] = [
    -1.0, -1.0, 0.0, 0.0, //
    1.0, -1.0, 1.0, 0.0, //
    1.0, 1.0, 1.0, 1.0, //
    -1.0, -1.0, 0.0, 0.0, //
    1.0, 1.0, 1.0, 1.0, //
    -1.0, 1.0, 0.0, 1.0,
];

fn draw_textured(texture: Option<&Texture>, fb: &mut Framebuffer) -> RenderStats {
    let vs = QuadShader;
    let mut fs = TexturedShader;
    let mut pipeline = GraphicPipeline::default();
    pipeline.upload_data(&QUAD, 4).unwrap();
    pipeline.define_attribute("pos", 2, 0).unwrap();
    pipeline.define_attribute("texcoord", 2, 2).unwrap();
    pipeline.set_vertex_shader(&vs);
    pipeline.set_fragment_shader(&mut fs);
    pipeline.set_viewport(viewport_matrix(fb.width, fb.height));
    if let Some(tex) = texture {
        pipeline.bind_tex_unit(tex, 0).unwrap();
    }
    pipeline.render(fb, true, true).unwrap()
}

fn checker(side: usize) -> Texture {
    let mut pixels = Vec::with_capacity(side * side * 4);
    for i in 0..side {
        for j in 0..side {
            let v = if (i + j) % 2 == 0 { 255 } else { 0 };
            pixels.extend([v, v, v, 255]);
        }
    }
    let mut tex = Texture::from_raw(side, 4, &pixels).unwrap();
    tex.compute_mips();
    tex
}

#[test]
fn checkerboard_mips_average_to_grey() {
    let tex = checker(16);
    assert_eq!(tex.level_count(), 5);
    for level in 1..tex.level_count() {
        let s = tex.level_side(level);
        for i in 0..s {
            for j in 0..s {
                let t = tex.texel(i, j, level);
                assert!((t.x - 128.0 / 255.0).abs() < 1e-6, "level {level}: {t}");
                assert_eq!(t.w, 1.0);
            }
        }
    }
}

#[test]
fn uniform_color_survives_every_mip_level() {
    let rgba = [37u8, 200, 1, 255];
    let tex = Texture::solid(16, rgba).unwrap();
    assert_eq!(tex.level_count(), 5);

    let expected = Vec4::new(37.0, 200.0, 1.0, 255.0) / 255.0;
    for level in 0..tex.level_count() {
        let s = tex.level_side(level);
        for i in 0..s {
            for j in 0..s {
                assert_eq!(tex.texel(i, j, level), expected, "level {level} texel {i},{j}");
            }
        }
    }
}

#[test]
fn minified_trilinear_sample_is_grey() {
    let tex = checker(16);
    let mut sampler = TextureSampler::new(Filter::Trilinear, WrapMode::ClampToEdge);
    sampler.bind(&tex);

    // One screen pixel spans four texels: lod 2.
    let c = sampler.sample2d_grad(Vec2::new(0.4, 0.6), Vec2::new(4.0 / 16.0, 0.0));
    assert!((c.x - 128.0 / 255.0).abs() < 1e-3, "{c}");

    // Magnified: plain level-0 lookup.
    let c = sampler.sample2d_grad(Vec2::new(0.0, 0.0), Vec2::new(0.01, 0.0));
    assert_eq!(c.x, 1.0);
}

#[test]
fn load_png_from_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("gradient.png");
    let img = image::RgbaImage::from_fn(8, 8, |x, y| {
        image::Rgba([(x * 32) as u8, (y * 32) as u8, 7, 255])
    });
    img.save(&path).unwrap();

    let tex = Texture::load_from_file(&path).unwrap();
    assert_eq!(tex.side(), 8);
    assert_eq!(tex.channels(), 4);
    assert_eq!(tex.level_count(), 4);

    // row 2, column 5
    let t = tex.texel(2, 5, 0);
    assert_eq!((t.x * 255.0).round() as u32, 160);
    assert_eq!((t.y * 255.0).round() as u32, 64);
}

#[test]
fn non_square_and_missing_files_fail() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("wide.png");
    image::RgbImage::new(8, 4).save(&path).unwrap();
    assert!(matches!(
        Texture::load_from_file(&path),
        Err(Error::InvalidTexture(_))
    ));

    assert!(matches!(
        Texture::load_from_file(dir.path().join("missing.png")),
        Err(Error::Image(_))
    ));
}

#[test]
fn textured_quad_covers_target() {
    let tex = Texture::solid(4, [0, 255, 0, 255]).unwrap();
    let mut fb = Framebuffer::new(24, 16);
    let stats = draw_textured(Some(&tex), &mut fb);
    assert_eq!(stats.triangles_rasterized, 2);

    for y in 0..fb.height {
        for x in 0..fb.width {
            let [r, g, b, _] = unpack_rgba(fb.color(x, y).unwrap());
            assert_eq!((r, b), (0, 0), "pixel {x},{y}");
            assert!(g >= 254, "pixel {x},{y}: {g}");
        }
    }
}

#[test]
fn unbound_unit_samples_red() {
    let mut fb = Framebuffer::new(8, 8);
    draw_textured(None, &mut fb);
    let [r, g, b, a] = unpack_rgba(fb.color(4, 4).unwrap());
    assert_eq!([r, g, b, a], [255, 0, 0, 255]);
}

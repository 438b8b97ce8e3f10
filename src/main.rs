/// Main application entry point
/// Loads a model, voxelizes it, then shows it with voxel ambient occlusion
/// or as a ray-marched octree preview.
use glam::Vec3;
use mimalloc::MiMalloc;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;
use std::error::Error;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Instant;
use voxel_raster::*;
use winit::{
    event::*,
    event_loop::{ControlFlow, EventLoop},
    keyboard::{KeyCode, PhysicalKey},
    window::WindowBuilder,
};

const BACKGROUND: u32 = pack_rgba(20, 20, 28, 255);

/// Two counter-clockwise triangles covering NDC.
const FULLSCREEN_QUAD: [f32; 12] = [
    -1.0, -1.0, 1.0, -1.0, 1.0, 1.0, //
    -1.0, -1.0, 1.0, 1.0, -1.0, 1.0,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ViewMode {
    AmbientOcclusion,
    RayMarch,
}

fn main() {
    env_logger::init();
    if let Err(e) = run() {
        log::error!("{e}");
        std::process::exit(1);
    }
}

fn run() -> std::result::Result<(), Box<dyn Error>> {
    let mesh = match std::env::args().nth(1) {
        Some(path) => MeshData::load_gltf(&path)?,
        None => {
            log::warn!("usage: voxel-raster <model.gltf|model.glb>; showing a cube");
            MeshData::cube()
        }
    };

    log::info!("Controls:");
    log::info!("  WASD - Move camera");
    log::info!("  Space/Shift - Up/Down");
    log::info!("  Mouse - Look around");
    log::info!("  1/2 - Ambient occlusion / octree preview");
    log::info!("  F - Toggle fill, C - Toggle back-face culling");
    log::info!("  ESC - Exit");

    let model = mesh.transform_to_center();
    let voxelize_start = Instant::now();
    let tree = Voxelizer::default().build(&mesh, model)?;
    log::info!(
        "Voxelization: {}ms",
        voxelize_start.elapsed().as_millis()
    );

    // Create event loop and window
    let event_loop = EventLoop::new()?;
    let window = Arc::new(
        WindowBuilder::new()
            .with_title("voxel-raster")
            .with_inner_size(winit::dpi::LogicalSize::new(640, 480))
            .build(&event_loop)?,
    );

    // Initialize software rendering context
    let context = softbuffer::Context::new(window.clone())?;
    let mut surface = softbuffer::Surface::new(&context, window.clone())?;

    let window_size = window.inner_size();
    let (width, height) = (window_size.width as usize, window_size.height as usize);
    let mut framebuffer = Framebuffer::new(width, height);

    let aspect_ratio = width as f32 / height.max(1) as f32;
    let mut camera = Camera::new(Vec3::ZERO, aspect_ratio);
    let mut camera_controller = CameraController::new();

    // Stages must outlive the pipelines that borrow them.
    let standard = StandardShader;
    let passthrough = PassthroughShader;
    let mut ao_shader = AmbientOcclusionShader::new(&tree, AoConfig::default());
    let mut march_shader = RayMarchShader::new(&tree);

    let mut scene = GraphicPipeline::default();
    mesh.upload(&mut scene)?;
    scene.set_vertex_shader(&standard);
    scene.set_fragment_shader(&mut ao_shader);
    scene.set_viewport(viewport_matrix(width, height));

    let mut quad = GraphicPipeline::default();
    quad.upload_data(&FULLSCREEN_QUAD, 2)?;
    quad.define_attribute("pos", 2, 0)?;
    quad.set_vertex_shader(&passthrough);
    quad.set_fragment_shader(&mut march_shader);
    quad.set_viewport(viewport_matrix(width, height));

    let mut mode = ViewMode::AmbientOcclusion;
    let mut fill = true;
    let mut cull_back = true;

    // Timing
    let mut last_frame = Instant::now();
    let mut frame_count = 0u32;
    let mut fps_timer = Instant::now();
    let mut last_stats = RenderStats::default();

    // Mouse state
    let mut mouse_captured = false;
    let mut last_mouse_pos: Option<(f64, f64)> = None;

    event_loop.run(move |event, elwt| {
        elwt.set_control_flow(ControlFlow::Poll);

        match event {
            Event::WindowEvent { event, .. } => match event {
                WindowEvent::CloseRequested => {
                    elwt.exit();
                }
                WindowEvent::Resized(new_size) => {
                    let (w, h) = (new_size.width as usize, new_size.height as usize);
                    framebuffer.resize(w, h);
                    scene.set_viewport(viewport_matrix(w, h));
                    quad.set_viewport(viewport_matrix(w, h));
                    if h > 0 {
                        camera.set_aspect_ratio(w as f32 / h as f32);
                    }
                }
                WindowEvent::KeyboardInput { event, .. } => {
                    let pressed = event.state == ElementState::Pressed;

                    if let PhysicalKey::Code(keycode) = event.physical_key {
                        match keycode {
                            KeyCode::KeyW => camera_controller.forward_pressed = pressed,
                            KeyCode::KeyS => camera_controller.backward_pressed = pressed,
                            KeyCode::KeyA => camera_controller.left_pressed = pressed,
                            KeyCode::KeyD => camera_controller.right_pressed = pressed,
                            KeyCode::Space => camera_controller.up_pressed = pressed,
                            KeyCode::ShiftLeft => camera_controller.down_pressed = pressed,
                            KeyCode::Digit1 if pressed => {
                                mode = ViewMode::AmbientOcclusion;
                                log::info!("View: ambient occlusion");
                            }
                            KeyCode::Digit2 if pressed => {
                                mode = ViewMode::RayMarch;
                                log::info!("View: octree preview");
                            }
                            KeyCode::KeyF if pressed => {
                                fill = !fill;
                                log::info!("Fill: {}", if fill { "ON" } else { "OFF (edges)" });
                            }
                            KeyCode::KeyC if pressed => {
                                cull_back = !cull_back;
                                log::info!(
                                    "Culling: {}",
                                    if cull_back { "back faces" } else { "front faces" }
                                );
                            }
                            KeyCode::Escape if pressed => {
                                if mouse_captured {
                                    mouse_captured = false;
                                    window.set_cursor_visible(true);
                                } else {
                                    elwt.exit();
                                }
                            }
                            _ => {}
                        }
                    }
                }
                WindowEvent::MouseInput { state, button, .. } => {
                    if button == MouseButton::Left && state == ElementState::Pressed {
                        mouse_captured = true;
                        window.set_cursor_visible(false);
                    }
                }
                WindowEvent::CursorMoved { position, .. } => {
                    if mouse_captured {
                        if let Some(last_pos) = last_mouse_pos {
                            let delta_x = position.x - last_pos.0;
                            let delta_y = position.y - last_pos.1;
                            camera.rotate(delta_x as f32, delta_y as f32);
                        }
                    }
                    last_mouse_pos = Some((position.x, position.y));
                }
                WindowEvent::RedrawRequested => {
                    let now = Instant::now();
                    let dt = (now - last_frame).as_secs_f32();
                    last_frame = now;
                    camera_controller.update_camera(&mut camera, dt);

                    framebuffer.clear(BACKGROUND);
                    let result = match mode {
                        ViewMode::AmbientOcclusion => {
                            draw_scene(&mut scene, &mut framebuffer, &camera, model, cull_back, fill)
                        }
                        ViewMode::RayMarch => draw_preview(&mut quad, &mut framebuffer, &camera),
                    };
                    match result {
                        Ok(stats) => last_stats = stats,
                        Err(e) => {
                            log::error!("render failed: {e}");
                            elwt.exit();
                            return;
                        }
                    }

                    if let Err(e) = present(&mut surface, &framebuffer) {
                        log::error!("present failed: {e}");
                        elwt.exit();
                        return;
                    }

                    // FPS counter with additional stats
                    frame_count += 1;
                    if fps_timer.elapsed().as_secs() >= 1 {
                        log::info!(
                            "FPS: {} | Triangles: {} | Fragments: {}",
                            frame_count,
                            last_stats.triangles_rasterized,
                            last_stats.fragments_shaded
                        );
                        last_stats.log_report();
                        frame_count = 0;
                        fps_timer = Instant::now();
                    }
                }
                _ => {}
            },
            Event::AboutToWait => {
                window.request_redraw();
            }
            _ => {}
        }
    })?;
    Ok(())
}

fn draw_scene(
    pipeline: &mut GraphicPipeline,
    framebuffer: &mut Framebuffer,
    camera: &Camera,
    model: glam::Mat4,
    cull_back: bool,
    fill: bool,
) -> Result<RenderStats> {
    pipeline.upload_uniform_mat4("model", &model)?;
    pipeline.upload_uniform_mat4("view", &camera.view_matrix())?;
    pipeline.upload_uniform_mat4("proj", &camera.projection_matrix())?;
    pipeline.render(framebuffer, cull_back, fill)
}

fn draw_preview(
    pipeline: &mut GraphicPipeline,
    framebuffer: &mut Framebuffer,
    camera: &Camera,
) -> Result<RenderStats> {
    pipeline.upload_uniform_mat4("inv_view_proj", &camera.inverse_view_projection())?;
    pipeline.upload_uniform_vec3("eye", camera.position)?;
    pipeline.render(framebuffer, true, true)
}

/// Copy framebuffer to window
fn present(
    surface: &mut softbuffer::Surface<Arc<winit::window::Window>, Arc<winit::window::Window>>,
    framebuffer: &Framebuffer,
) -> std::result::Result<(), Box<dyn Error>> {
    let (Some(w), Some(h)) = (
        NonZeroU32::new(framebuffer.width as u32),
        NonZeroU32::new(framebuffer.height as u32),
    ) else {
        return Ok(());
    };
    surface.resize(w, h)?;
    let mut buffer = surface.buffer_mut()?;
    buffer.copy_from_slice(framebuffer.color_buffer_slice());
    buffer.present()?;
    Ok(())
}

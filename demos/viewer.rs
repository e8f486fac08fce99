//! Demo viewer: a small scene rendered forward or deferred.
//!
//! Three instances of the main model above a ground plane, lit by three
//! directional and three point lights, with indicator markers at each light.
//! Hold the right mouse button to fly: W/S/A/D/E/Q move, mouse turns.
//! Press M to toggle between forward and deferred mode, Escape to quit.
//!
//! An optional command line argument names a `.obj` file to use as the main
//! model; without it the scene uses a procedural cube.

use std::{sync::Arc, time::Instant};

use cgmath::Vector3;
use shade_ngin::{
    context::{Context, RenderConfig},
    error::RenderError,
    render::RenderMode,
    resources::{mesh::load_model_obj, shapes, texture::Texture},
    scene::{Light, position_scale},
};
use winit::{
    application::ApplicationHandler,
    dpi::LogicalSize,
    event::{DeviceEvent, DeviceId, ElementState, KeyEvent, WindowEvent},
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    keyboard::{KeyCode, PhysicalKey},
    window::{Window, WindowId},
};

fn build_scene(ctx: &mut Context, render_config: &RenderConfig) -> anyhow::Result<()> {
    let device = ctx.device.clone();
    let queue = ctx.queue.clone();
    let material_layout = ctx.material_layout().clone();

    let main_model = match &render_config.model_path {
        Some(path) => load_model_obj(path, &device, &queue, &mut ctx.drawables, &material_layout)?,
        None => {
            let tan = ctx.drawables.add_texture(Texture::solid(
                &device,
                &queue,
                [210, 160, 110, 255],
                "tan",
            ));
            let material = ctx
                .drawables
                .add_material(&device, &material_layout, "tan", tan);
            let (vertices, indices) = shapes::cube();
            shapes::register_shape(
                &device,
                &mut ctx.drawables,
                "cube",
                &vertices,
                &indices,
                material,
            )
        }
    };

    let gray = ctx.drawables.add_texture(Texture::solid(
        &device,
        &queue,
        [120, 120, 130, 255],
        "gray",
    ));
    let ground_material = ctx
        .drawables
        .add_material(&device, &material_layout, "ground", gray);
    let (vertices, indices) = shapes::plane(10.0);
    let ground_model = shapes::register_shape(
        &device,
        &mut ctx.drawables,
        "ground",
        &vertices,
        &indices,
        ground_material,
    );

    let white = ctx.drawables.add_texture(Texture::solid(
        &device,
        &queue,
        [255, 255, 255, 255],
        "white",
    ));
    let indicator_material = ctx
        .drawables
        .add_material(&device, &material_layout, "indicator", white);
    let (vertices, indices) = shapes::quad();
    let quad_model = shapes::register_shape(
        &device,
        &mut ctx.drawables,
        "indicator quad",
        &vertices,
        &indices,
        indicator_material,
    );
    let (vertices, indices) = shapes::sphere(16, 24);
    let sphere_model = shapes::register_shape(
        &device,
        &mut ctx.drawables,
        "indicator sphere",
        &vertices,
        &indices,
        indicator_material,
    );

    let unit = Vector3::new(1.0, 1.0, 1.0);
    ctx.scene
        .push_entity(position_scale(Vector3::new(2.0, 0.0, -4.0), unit), main_model);
    ctx.scene
        .push_entity(position_scale(Vector3::new(0.0, 0.0, 0.0), unit), main_model);
    ctx.scene
        .push_entity(position_scale(Vector3::new(-2.0, 0.0, 4.0), unit), main_model);
    ctx.scene
        .push_entity(position_scale(Vector3::new(0.0, -1.0, 0.0), unit), ground_model);

    ctx.scene.push_light(Light::directional(
        Vector3::new(1.0, 1.0, 1.0),
        Vector3::new(-1.0, -1.0, 0.0),
        Vector3::new(0.0, 3.0, 0.0),
    ));
    ctx.scene.push_light(Light::directional(
        Vector3::new(1.0, 1.0, 1.0),
        Vector3::new(0.0, -1.0, 1.0),
        Vector3::new(0.0, 5.0, 0.0),
    ));
    ctx.scene.push_light(Light::directional(
        Vector3::new(1.0, 1.0, 1.0),
        Vector3::new(0.0, 0.0, -1.0),
        Vector3::new(0.0, 7.0, 0.0),
    ));
    ctx.scene.push_light(Light::point(
        Vector3::new(1.0, 0.0, 0.0),
        Vector3::new(1.0, 1.0, 1.0),
        Vector3::new(-7.0, 1.0, -2.0),
    ));
    ctx.scene.push_light(Light::point(
        Vector3::new(0.0, 1.0, 0.0),
        Vector3::new(1.0, 1.0, 1.0),
        Vector3::new(0.0, 2.0, -1.0),
    ));
    ctx.scene.push_light(Light::point(
        Vector3::new(0.0, 0.0, 1.0),
        Vector3::new(1.0, 1.0, 1.0),
        Vector3::new(3.0, 3.0, 5.0),
    ));

    ctx.scene.rebuild_indicators(quad_model, sphere_model);
    Ok(())
}

struct Viewer {
    render_config: RenderConfig,
    ctx: Option<Context>,
    last_frame: Instant,
}

impl Viewer {
    fn new(render_config: RenderConfig) -> Self {
        Self {
            render_config,
            ctx: None,
            last_frame: Instant::now(),
        }
    }
}

impl ApplicationHandler for Viewer {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        let attributes = Window::default_attributes()
            .with_title(self.render_config.title.clone())
            .with_inner_size(LogicalSize::new(
                self.render_config.width,
                self.render_config.height,
            ));
        let window = Arc::new(
            event_loop
                .create_window(attributes)
                .expect("window creation"),
        );

        let mut ctx = match pollster::block_on(Context::new(window, self.render_config.clone())) {
            Ok(ctx) => ctx,
            Err(e) => {
                log::error!("context creation failed: {e:#}");
                event_loop.exit();
                return;
            }
        };
        if let Err(e) = build_scene(&mut ctx, &self.render_config) {
            log::error!("scene setup failed: {e:#}");
            event_loop.exit();
            return;
        }
        ctx.window().request_redraw();
        self.ctx = Some(ctx);
        self.last_frame = Instant::now();
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        let Some(ctx) = self.ctx.as_mut() else {
            return;
        };
        match event {
            WindowEvent::CloseRequested => event_loop.exit(),
            WindowEvent::Resized(size) => {
                if let Err(e) = ctx.resize(size.width, size.height) {
                    log::error!("resize failed: {e}");
                    event_loop.exit();
                }
            }
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        physical_key: PhysicalKey::Code(code),
                        state,
                        ..
                    },
                ..
            } => {
                let pressed = state == ElementState::Pressed;
                ctx.input.set_key(code, pressed);
                if pressed {
                    match code {
                        KeyCode::Escape => event_loop.exit(),
                        KeyCode::KeyM => {
                            let mode = match ctx.mode {
                                RenderMode::Forward => RenderMode::Deferred,
                                RenderMode::Deferred => RenderMode::Forward,
                            };
                            ctx.set_mode(mode);
                            log::info!("render mode: {mode:?}");
                        }
                        _ => {}
                    }
                }
            }
            WindowEvent::MouseInput { state, button, .. } => {
                ctx.input.set_button(button, state == ElementState::Pressed);
            }
            WindowEvent::RedrawRequested => {
                let now = Instant::now();
                let dt = now - self.last_frame;
                self.last_frame = now;

                ctx.update(dt);
                match ctx.render() {
                    Ok(()) => {}
                    Err(RenderError::Surface(wgpu::SurfaceError::Lost))
                    | Err(RenderError::Surface(wgpu::SurfaceError::Outdated)) => {
                        let size = ctx.window().inner_size();
                        if let Err(e) = ctx.resize(size.width, size.height) {
                            log::error!("surface recovery failed: {e}");
                            event_loop.exit();
                        }
                    }
                    Err(RenderError::Surface(wgpu::SurfaceError::Timeout)) => {
                        log::warn!("surface timeout, skipping frame");
                    }
                    Err(e) => {
                        log::error!("render failed: {e}");
                        event_loop.exit();
                    }
                }
                ctx.window().request_redraw();
            }
            _ => {}
        }
    }

    fn device_event(
        &mut self,
        _event_loop: &ActiveEventLoop,
        _device_id: DeviceId,
        event: DeviceEvent,
    ) {
        if let (Some(ctx), DeviceEvent::MouseMotion { delta }) = (self.ctx.as_mut(), event) {
            ctx.input.accumulate_mouse_delta(delta.0, delta.1);
        }
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let render_config = RenderConfig {
        model_path: std::env::args().nth(1),
        ..Default::default()
    };

    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Poll);
    let mut viewer = Viewer::new(render_config);
    event_loop.run_app(&mut viewer)?;
    Ok(())
}

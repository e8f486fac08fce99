//! The central application context.
//!
//! One explicit, passed context owns every subsystem: device and queue,
//! surface configuration, the shared uniform arena, the resource registries,
//! the program registry and pipeline cache, the G-buffer, the camera and the
//! scene. Lifecycle is `new → per-frame (update, pack, render) → drop`; there
//! is no ambient or static state.

use std::sync::Arc;

use cgmath::Deg;
use wgpu::util::DeviceExt;
use winit::window::Window;

use crate::{
    camera::{Camera, CameraController, Projection},
    error::RenderError,
    frame::{GLOBAL_BLOCK_BIND_SIZE, LOCAL_BLOCK_SIZE},
    gbuffer::{GBuffer, GBufferChannel},
    input::Input,
    packing::{AlignedRegion, UniformArena},
    pipelines::mk_render_pipeline,
    render::{FrameStats, RenderMode},
    resources::{self, Drawables, shapes, texture::Texture},
    scene::Scene,
    shader::ProgramRegistry,
};

/// Startup configuration handed in by the embedder.
#[derive(Debug, Clone)]
pub struct RenderConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
    pub initial_mode: RenderMode,
    pub clear_color: wgpu::Color,
    /// Optional `.obj` file for the main scene model; the demo falls back to
    /// procedural geometry without it.
    pub model_path: Option<String>,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            title: "shade-ngin".to_string(),
            width: 1280,
            height: 720,
            initial_mode: RenderMode::Deferred,
            clear_color: wgpu::Color {
                r: 0.1,
                g: 0.1,
                b: 0.1,
                a: 1.0,
            },
            model_path: None,
        }
    }
}

#[derive(Debug)]
pub struct Context {
    pub(crate) window: Arc<Window>,
    pub surface: wgpu::Surface<'static>,
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub config: wgpu::SurfaceConfiguration,

    pub camera: Camera,
    pub projection: Projection,
    pub controller: CameraController,
    pub input: Input,

    pub arena: UniformArena,
    pub programs: ProgramRegistry,
    pub drawables: Drawables,
    pub pipelines: crate::pipelines::PipelineCache,
    pub scene: Scene,

    pub mode: RenderMode,
    pub shown_channel: GBufferChannel,
    pub stats: FrameStats,
    pub clear_color: wgpu::Color,

    pub(crate) depth_texture: Texture,
    pub(crate) gbuffer: GBuffer,
    pub(crate) gbuffer_layout: wgpu::BindGroupLayout,

    pub(crate) global_layout: wgpu::BindGroupLayout,
    pub(crate) local_layout: wgpu::BindGroupLayout,
    pub(crate) material_layout: wgpu::BindGroupLayout,
    pub(crate) global_bind_group: wgpu::BindGroup,
    pub(crate) local_bind_group: wgpu::BindGroup,
    pub(crate) global_region: AlignedRegion,

    pub(crate) forward_program: usize,
    pub(crate) geometry_program: usize,
    pub(crate) indicator_program: usize,

    pub(crate) compose_pipeline: Option<wgpu::RenderPipeline>,
    pub(crate) quad_vertex_buffer: wgpu::Buffer,
    pub(crate) quad_index_buffer: wgpu::Buffer,
}

impl Context {
    pub async fn new(window: Arc<Window>, render_config: RenderConfig) -> anyhow::Result<Self> {
        let size = window.inner_size();

        // The instance is a handle to our GPU
        log::info!("WGPU setup");
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::PRIMARY,
            ..Default::default()
        });

        let surface = instance.create_surface(window.clone())?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await?;
        log::info!("device and queue");
        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: None,
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::default(),
                memory_hints: Default::default(),
                trace: wgpu::Trace::Off,
            })
            .await?;

        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .copied()
            .find(|f| f.is_srgb())
            .unwrap_or(surface_caps.formats[0]);
        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: surface_caps.present_modes[0],
            alpha_mode: surface_caps.alpha_modes[0],
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };

        let camera = Camera::new((5.0, 5.0, 5.0), (-5.0, -5.0, -5.0));
        let projection = Projection::new(config.width, config.height, Deg(60.0), 0.1, 1000.0);
        let controller = CameraController::new(0.4);

        // The shared uniform arena, sized to the device's maximum uniform
        // binding and addressed through two dynamic-offset bind groups: one
        // for the frame globals, one rebound per entity.
        let arena = UniformArena::new(&device);
        log::info!(
            "uniform arena: {} bytes, {} byte offset alignment",
            arena.gpu_buffer().size(),
            arena.alignment()
        );

        let global_layout = uniform_block_layout(&device, GLOBAL_BLOCK_BIND_SIZE, "global_params");
        let local_layout = uniform_block_layout(&device, LOCAL_BLOCK_SIZE, "local_params");
        let material_layout = resources::material_layout(&device);
        let gbuffer_layout = GBuffer::layout(&device);

        let global_bind_group = uniform_block_bind_group(
            &device,
            &global_layout,
            arena.gpu_buffer(),
            GLOBAL_BLOCK_BIND_SIZE,
            "global_params_bind_group",
        );
        let local_bind_group = uniform_block_bind_group(
            &device,
            &local_layout,
            arena.gpu_buffer(),
            LOCAL_BLOCK_SIZE,
            "local_params_bind_group",
        );

        let mut programs = ProgramRegistry::new();
        let forward_program =
            programs.load(&device, include_str!("pipelines/forward.wgsl"), "forward");
        let geometry_program =
            programs.load(&device, include_str!("pipelines/geometry.wgsl"), "geometry");
        let compose_program =
            programs.load(&device, include_str!("pipelines/compose.wgsl"), "compose");
        let indicator_program = programs.load(
            &device,
            include_str!("pipelines/indicator.wgsl"),
            "indicator",
        );

        let depth_texture =
            Texture::create_depth_texture(&device, [config.width, config.height], "depth_texture");
        let gbuffer = GBuffer::configure(&device, &gbuffer_layout, config.width, config.height)?;

        // The composition quad is embedded geometry with a fixed layout, so
        // its pipeline is built once here instead of going through the
        // per-sub-mesh cache.
        let compose_pipeline = programs.get(compose_program).module.as_ref().map(|module| {
            let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("compose Pipeline Layout"),
                bind_group_layouts: &[&global_layout, &gbuffer_layout],
                push_constant_ranges: &[],
            });
            mk_render_pipeline(
                &device,
                &layout,
                &[Some(wgpu::ColorTargetState {
                    format: config.format,
                    blend: Some(wgpu::BlendState {
                        alpha: wgpu::BlendComponent::REPLACE,
                        color: wgpu::BlendComponent::REPLACE,
                    }),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                None,
                &[wgpu::VertexBufferLayout {
                    array_stride: 20,
                    step_mode: wgpu::VertexStepMode::Vertex,
                    attributes: &[
                        wgpu::VertexAttribute {
                            offset: 0,
                            shader_location: 0,
                            format: wgpu::VertexFormat::Float32x3,
                        },
                        wgpu::VertexAttribute {
                            offset: 12,
                            shader_location: 1,
                            format: wgpu::VertexFormat::Float32x2,
                        },
                    ],
                }],
                module,
                "compose",
            )
        });

        let quad_vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Screen Quad Vertex Buffer"),
            contents: bytemuck::cast_slice(&shapes::SCREEN_QUAD_VERTICES),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let quad_index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Screen Quad Index Buffer"),
            contents: bytemuck::cast_slice(&shapes::SCREEN_QUAD_INDICES),
            usage: wgpu::BufferUsages::INDEX,
        });

        Ok(Self {
            window,
            surface,
            device,
            queue,
            config,
            camera,
            projection,
            controller,
            input: Input::default(),
            arena,
            programs,
            drawables: Drawables::new(),
            pipelines: crate::pipelines::PipelineCache::new(),
            scene: Scene::new(),
            mode: render_config.initial_mode,
            shown_channel: GBufferChannel::Albedo,
            stats: FrameStats::default(),
            clear_color: render_config.clear_color,
            depth_texture,
            gbuffer,
            gbuffer_layout,
            global_layout,
            local_layout,
            material_layout,
            global_bind_group,
            local_bind_group,
            global_region: AlignedRegion::default(),
            forward_program,
            geometry_program,
            indicator_program,
            compose_pipeline,
            quad_vertex_buffer,
            quad_index_buffer,
        })
    }

    pub fn window(&self) -> &Window {
        &self.window
    }

    /// Bind group layout for material albedo textures; model loaders need it
    /// to register materials.
    pub fn material_layout(&self) -> &wgpu::BindGroupLayout {
        &self.material_layout
    }

    pub fn set_mode(&mut self, mode: RenderMode) {
        self.mode = mode;
    }

    /// Reconfigure the surface, depth texture and off-screen target for a new
    /// size. The rebuilt target is re-validated.
    pub fn resize(&mut self, width: u32, height: u32) -> Result<(), RenderError> {
        if width == 0 || height == 0 {
            return Ok(());
        }
        self.config.width = width;
        self.config.height = height;
        self.surface.configure(&self.device, &self.config);
        self.projection.resize(width, height);
        self.depth_texture =
            Texture::create_depth_texture(&self.device, [width, height], "depth_texture");
        self.gbuffer = GBuffer::configure(&self.device, &self.gbuffer_layout, width, height)?;
        Ok(())
    }

    /// Per-frame simulation step: apply the input snapshot to the camera and
    /// clear the per-frame input accumulators.
    pub fn update(&mut self, dt: std::time::Duration) {
        self.controller.update(&mut self.camera, &self.input);
        self.input.end_frame();
        self.stats.simulation_time = dt;
    }
}

fn uniform_block_layout(
    device: &wgpu::Device,
    block_size: u32,
    label: &str,
) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        entries: &[wgpu::BindGroupLayoutEntry {
            binding: 0,
            visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: true,
                min_binding_size: wgpu::BufferSize::new(block_size as u64),
            },
            count: None,
        }],
        label: Some(label),
    })
}

fn uniform_block_bind_group(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    buffer: &wgpu::Buffer,
    block_size: u32,
    label: &str,
) -> wgpu::BindGroup {
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        layout,
        entries: &[wgpu::BindGroupEntry {
            binding: 0,
            resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                buffer,
                offset: 0,
                size: wgpu::BufferSize::new(block_size as u64),
            }),
        }],
        label: Some(label),
    })
}

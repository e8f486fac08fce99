//! Draw plan preparation against a real headless device: draw order follows
//! pack order, pipeline caching is idempotent per (sub-mesh, program) pair,
//! and a shader/mesh location mismatch is fatal.
//!
//! Needs a GPU adapter, so it runs behind the `integration-tests` feature
//! like the other device-touching tests.
#![cfg(feature = "integration-tests")]

use cgmath::{Matrix4, Vector3};
use shade_ngin::{
    frame::pack_local_params,
    packing::{AlignedRegion, LinearBuffer},
    pipelines::PipelineCache,
    render::build_draw_plan,
    resources::{
        Drawables, MeshBuilder, Model, VertexBufferAttribute, VertexBufferLayout, shapes,
    },
    scene::{Scene, position_scale},
    shader::ProgramRegistry,
};

fn request_device() -> (wgpu::Device, wgpu::Queue) {
    let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor::default());
    let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
        power_preference: wgpu::PowerPreference::default(),
        compatible_surface: None,
        force_fallback_adapter: false,
    }))
    .expect("adapter");
    pollster::block_on(adapter.request_device(&wgpu::DeviceDescriptor::default()))
        .expect("device")
}

fn uniform_layout(device: &wgpu::Device, size: u32) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        entries: &[wgpu::BindGroupLayoutEntry {
            binding: 0,
            visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: true,
                min_binding_size: wgpu::BufferSize::new(size as u64),
            },
            count: None,
        }],
        label: None,
    })
}

#[test]
fn forward_plan_binds_each_entity_before_its_submesh_draws() {
    let (device, _queue) = request_device();

    let mut drawables = Drawables::new();
    let (vertices, indices) = shapes::cube();
    // No material bound: the indicator program draws without one.
    let cube = shapes::register_shape(&device, &mut drawables, "cube", &vertices, &indices, 0);

    let mut scene = Scene::new();
    let unit = Vector3::new(1.0, 1.0, 1.0);
    scene.push_entity(position_scale(Vector3::new(2.0, 0.0, -4.0), unit), cube);
    scene.push_entity(position_scale(Vector3::new(0.0, 0.0, 0.0), unit), cube);
    scene.push_entity(position_scale(Vector3::new(-2.0, 0.0, 4.0), unit), cube);

    let mut buf = LinearBuffer::new(64 * 1024);
    let alignment = device.limits().min_uniform_buffer_offset_alignment;
    buf.push_vec3(Vector3::new(0.0, 0.0, 0.0)).unwrap();
    buf.push_u32(0).unwrap();
    let global = AlignedRegion {
        offset: 0,
        size: buf.head(),
    };
    pack_local_params(&mut buf, alignment, Matrix4::from_scale(1.0), &mut scene.entities).unwrap();

    let mut programs = ProgramRegistry::new();
    let indicator = programs.load(
        &device,
        include_str!("../src/pipelines/indicator.wgsl"),
        "indicator",
    );

    let global_layout = uniform_layout(&device, 16 + 16 * 64);
    let local_layout = uniform_layout(&device, 128);
    let mut cache = PipelineCache::new();

    let plan = build_draw_plan(
        &device,
        &mut cache,
        &programs,
        indicator,
        &mut drawables,
        &scene.entities,
        global,
        &[&global_layout, &local_layout],
        &[wgpu::TextureFormat::Bgra8UnormSrgb],
        Some(wgpu::TextureFormat::Depth32Float),
        false,
    )
    .unwrap()
    .expect("plan");

    // Exactly one draw group per entity, in pack order, each carrying the
    // entity's own region offset ahead of its sub-mesh draws.
    assert_eq!(plan.entities.len(), 3);
    for (entity, draw) in scene.entities.iter().zip(&plan.entities) {
        assert_eq!(draw.local_offset, entity.local_region.offset);
        assert_eq!(draw.draws.len(), 1);
        assert!(draw.draws[0].material.is_none());
    }

    // The cube has one sub-mesh drawn with one program: one cached pipeline,
    // shared by all three entities.
    let pipeline = plan.entities[0].draws[0].pipeline;
    assert!(plan.entities.iter().all(|e| e.draws[0].pipeline == pipeline));

    // Idempotent per (sub-mesh, program): a second preparation reuses it.
    let plan_again = build_draw_plan(
        &device,
        &mut cache,
        &programs,
        indicator,
        &mut drawables,
        &scene.entities,
        global,
        &[&global_layout, &local_layout],
        &[wgpu::TextureFormat::Bgra8UnormSrgb],
        Some(wgpu::TextureFormat::Depth32Float),
        false,
    )
    .unwrap()
    .expect("plan");
    assert_eq!(plan_again.entities[0].draws[0].pipeline, pipeline);
}

#[test]
fn missing_attribute_location_is_fatal() {
    let (device, _queue) = request_device();

    // A position-only sub-mesh cannot satisfy the indicator program's
    // normal input at location 1.
    let mut builder = MeshBuilder::new("position only");
    builder.push_submesh(
        VertexBufferLayout {
            attributes: vec![VertexBufferAttribute {
                location: 0,
                components: 3,
                offset: 0,
            }],
            stride: 12,
        },
        bytemuck::cast_slice(&[0.0f32; 9]),
        &[0, 1, 2],
    );
    let mut drawables = Drawables::new();
    let mesh = drawables.add_mesh(builder.build(&device));
    let model = drawables.add_model(Model {
        mesh,
        materials: vec![0],
    });

    let mut scene = Scene::new();
    scene.push_entity(Matrix4::from_scale(1.0), model);

    let mut programs = ProgramRegistry::new();
    let indicator = programs.load(
        &device,
        include_str!("../src/pipelines/indicator.wgsl"),
        "indicator",
    );

    let global_layout = uniform_layout(&device, 16 + 16 * 64);
    let local_layout = uniform_layout(&device, 128);
    let mut cache = PipelineCache::new();

    let err = build_draw_plan(
        &device,
        &mut cache,
        &programs,
        indicator,
        &mut drawables,
        &scene.entities,
        AlignedRegion::default(),
        &[&global_layout, &local_layout],
        &[wgpu::TextureFormat::Bgra8UnormSrgb],
        Some(wgpu::TextureFormat::Depth32Float),
        false,
    )
    .unwrap_err();
    match err {
        shade_ngin::error::RenderError::AttributeMismatch { location, .. } => {
            assert_eq!(location, 1)
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn degraded_program_skips_the_pass() {
    let (device, _queue) = request_device();

    let mut programs = ProgramRegistry::new();
    let broken = programs.load(&device, "fn vs_main( {", "broken");
    assert!(programs.get(broken).is_degraded());

    let mut drawables = Drawables::new();
    let (vertices, indices) = shapes::quad();
    let quad = shapes::register_shape(&device, &mut drawables, "quad", &vertices, &indices, 0);
    let mut scene = Scene::new();
    scene.push_entity(Matrix4::from_scale(1.0), quad);

    let global_layout = uniform_layout(&device, 16 + 16 * 64);
    let local_layout = uniform_layout(&device, 128);
    let mut cache = PipelineCache::new();

    let plan = build_draw_plan(
        &device,
        &mut cache,
        &programs,
        broken,
        &mut drawables,
        &scene.entities,
        AlignedRegion::default(),
        &[&global_layout, &local_layout],
        &[wgpu::TextureFormat::Bgra8UnormSrgb],
        Some(wgpu::TextureFormat::Depth32Float),
        false,
    )
    .unwrap();
    assert!(plan.is_none());
}

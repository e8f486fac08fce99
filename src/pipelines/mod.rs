//! Render pipeline construction and the per-sub-mesh pipeline cache.
//!
//! wgpu folds the vertex-fetch configuration into the render pipeline, so
//! the pairing of a sub-mesh's vertex layout with a program's expected input
//! locations lives here: each sub-mesh caches one pipeline per program it
//! has ever been drawn with, found by linear scan and created lazily on
//! first use. Creation matches the program's reflected inputs against the
//! sub-mesh layout by attribute location; a shader input the layout cannot
//! satisfy is a fatal error, since it signals a mismatched asset/shader
//! pairing.

use crate::{
    error::RenderError,
    resources::{CachedPipeline, SubMesh, VertexBufferLayout},
    shader::{Program, ShaderAttribute},
};

/// Flat arena of created pipelines, referenced by index from sub-mesh
/// caches.
#[derive(Debug, Default)]
pub struct PipelineCache {
    pipelines: Vec<wgpu::RenderPipeline>,
}

impl PipelineCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, index: usize) -> &wgpu::RenderPipeline {
        &self.pipelines[index]
    }
}

/// Match a program's vertex inputs against a sub-mesh layout by location.
/// Every shader input must find a mesh attribute at the same location; mesh
/// attributes the shader does not read are simply not fetched.
pub fn match_layouts(
    inputs: &[ShaderAttribute],
    layout: &VertexBufferLayout,
    program_name: &str,
) -> Result<Vec<wgpu::VertexAttribute>, RenderError> {
    inputs
        .iter()
        .map(|input| {
            let attribute = layout
                .attributes
                .iter()
                .find(|a| a.location == input.location)
                .ok_or_else(|| RenderError::AttributeMismatch {
                    program: program_name.to_string(),
                    location: input.location,
                })?;
            Ok(wgpu::VertexAttribute {
                offset: attribute.offset as wgpu::BufferAddress,
                shader_location: attribute.location,
                format: vertex_format(attribute.components),
            })
        })
        .collect()
}

fn vertex_format(components: u32) -> wgpu::VertexFormat {
    match components {
        1 => wgpu::VertexFormat::Float32,
        2 => wgpu::VertexFormat::Float32x2,
        3 => wgpu::VertexFormat::Float32x3,
        _ => wgpu::VertexFormat::Float32x4,
    }
}

/// Locate the pipeline for a (sub-mesh, program) pair, creating and caching
/// it on first use. Idempotent per pair; the caller filters out degraded
/// programs beforehand and passes their module here.
#[allow(clippy::too_many_arguments)]
pub fn find_pipeline(
    cache: &mut PipelineCache,
    device: &wgpu::Device,
    submesh: &mut SubMesh,
    program_index: usize,
    program: &Program,
    module: &wgpu::ShaderModule,
    bind_group_layouts: &[&wgpu::BindGroupLayout],
    color_formats: &[wgpu::TextureFormat],
    depth_format: Option<wgpu::TextureFormat>,
) -> Result<usize, RenderError> {
    if let Some(cached) = submesh
        .pipelines
        .iter()
        .find(|c| c.program == program_index)
    {
        return Ok(cached.pipeline);
    }

    let attributes = match_layouts(&program.vertex_inputs, &submesh.layout, &program.name)?;
    let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some(&format!("{} Pipeline Layout", program.name)),
        bind_group_layouts,
        push_constant_ranges: &[],
    });
    let vertex_layout = wgpu::VertexBufferLayout {
        array_stride: submesh.layout.stride as wgpu::BufferAddress,
        step_mode: wgpu::VertexStepMode::Vertex,
        attributes: &attributes,
    };
    let targets: Vec<Option<wgpu::ColorTargetState>> = color_formats
        .iter()
        .map(|format| {
            Some(wgpu::ColorTargetState {
                format: *format,
                blend: Some(wgpu::BlendState {
                    alpha: wgpu::BlendComponent::REPLACE,
                    color: wgpu::BlendComponent::REPLACE,
                }),
                write_mask: wgpu::ColorWrites::ALL,
            })
        })
        .collect();

    let pipeline = mk_render_pipeline(
        device,
        &layout,
        &targets,
        depth_format,
        &[vertex_layout],
        module,
        &program.name,
    );

    let index = cache.pipelines.len();
    cache.pipelines.push(pipeline);
    submesh.pipelines.push(CachedPipeline {
        program: program_index,
        pipeline: index,
    });
    Ok(index)
}

pub fn mk_render_pipeline(
    device: &wgpu::Device,
    layout: &wgpu::PipelineLayout,
    color_targets: &[Option<wgpu::ColorTargetState>],
    depth_format: Option<wgpu::TextureFormat>,
    vertex_layouts: &[wgpu::VertexBufferLayout],
    module: &wgpu::ShaderModule,
    label: &str,
) -> wgpu::RenderPipeline {
    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        cache: None,
        label: Some(label),
        layout: Some(layout),
        vertex: wgpu::VertexState {
            module,
            entry_point: Some("vs_main"),
            buffers: vertex_layouts,
            compilation_options: Default::default(),
        },
        fragment: Some(wgpu::FragmentState {
            module,
            entry_point: Some("fs_main"),
            targets: color_targets,
            compilation_options: Default::default(),
        }),
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            strip_index_format: None,
            front_face: wgpu::FrontFace::Ccw,
            cull_mode: Some(wgpu::Face::Back),
            polygon_mode: wgpu::PolygonMode::Fill,
            unclipped_depth: false,
            conservative: false,
        },
        depth_stencil: depth_format.map(|format| wgpu::DepthStencilState {
            format,
            depth_write_enabled: true,
            depth_compare: wgpu::CompareFunction::Less,
            stencil: wgpu::StencilState::default(),
            bias: wgpu::DepthBiasState::default(),
        }),
        multisample: wgpu::MultisampleState {
            count: 1,
            mask: !0,
            alpha_to_coverage_enabled: false,
        },
        multiview: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::VertexBufferAttribute;

    fn mesh_layout() -> VertexBufferLayout {
        VertexBufferLayout {
            attributes: vec![
                VertexBufferAttribute {
                    location: 0,
                    components: 3,
                    offset: 0,
                },
                VertexBufferAttribute {
                    location: 1,
                    components: 3,
                    offset: 12,
                },
                VertexBufferAttribute {
                    location: 2,
                    components: 2,
                    offset: 24,
                },
            ],
            stride: 32,
        }
    }

    #[test]
    fn every_shader_input_resolves_by_location() {
        let inputs = [
            ShaderAttribute {
                location: 0,
                components: 3,
            },
            ShaderAttribute {
                location: 2,
                components: 2,
            },
        ];
        let matched = match_layouts(&inputs, &mesh_layout(), "test").unwrap();
        assert_eq!(matched.len(), 2);
        assert_eq!(matched[0].shader_location, 0);
        assert_eq!(matched[0].offset, 0);
        assert_eq!(matched[1].shader_location, 2);
        assert_eq!(matched[1].offset, 24);
        assert_eq!(matched[1].format, wgpu::VertexFormat::Float32x2);
    }

    #[test]
    fn unused_mesh_attributes_are_skipped() {
        let inputs = [ShaderAttribute {
            location: 0,
            components: 3,
        }];
        let matched = match_layouts(&inputs, &mesh_layout(), "test").unwrap();
        assert_eq!(matched.len(), 1);
    }

    #[test]
    fn missing_location_is_fatal() {
        let inputs = [ShaderAttribute {
            location: 7,
            components: 3,
        }];
        let err = match_layouts(&inputs, &mesh_layout(), "broken").unwrap_err();
        match err {
            RenderError::AttributeMismatch { program, location } => {
                assert_eq!(program, "broken");
                assert_eq!(location, 7);
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}

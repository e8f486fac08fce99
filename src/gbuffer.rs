//! Off-screen target for the deferred geometry pass.
//!
//! Four color attachments (albedo, normal, position, view direction) plus a
//! depth attachment, all sized to the surface. Rebuilt on resize. After all
//! attachments are created the combined target is validated; an incomplete
//! target is a fatal startup error, not something to limp along with.

use crate::{error::RenderError, resources::texture::Texture};

/// Attachment formats in G-buffer order: albedo, normal, position, view
/// direction. Albedo stays 8-bit; the world-space channels need float
/// precision.
pub const COLOR_FORMATS: [wgpu::TextureFormat; 4] = [
    wgpu::TextureFormat::Rgba8Unorm,
    wgpu::TextureFormat::Rgba16Float,
    wgpu::TextureFormat::Rgba16Float,
    wgpu::TextureFormat::Rgba16Float,
];

/// Visualization channel an overlay can select for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GBufferChannel {
    Albedo,
    Normal,
    Position,
    ViewDir,
    Depth,
}

#[derive(Debug)]
pub struct GBuffer {
    pub color_attachments: Vec<Texture>,
    pub depth: Texture,
    pub extent: [u32; 2],
    /// The four color views plus sampler, bound by the composition pass.
    pub bind_group: wgpu::BindGroup,
}

impl GBuffer {
    /// Bind group layout the composition pass samples the attachments
    /// through: four sequential texture bindings and one sampler.
    pub fn layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
        let texture_entry = |binding| wgpu::BindGroupLayoutEntry {
            binding,
            visibility: wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Texture {
                multisampled: false,
                view_dimension: wgpu::TextureViewDimension::D2,
                sample_type: wgpu::TextureSampleType::Float { filterable: true },
            },
            count: None,
        };
        device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            entries: &[
                texture_entry(0),
                texture_entry(1),
                texture_entry(2),
                texture_entry(3),
                wgpu::BindGroupLayoutEntry {
                    binding: 4,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
            label: Some("gbuffer_bind_group_layout"),
        })
    }

    /// Create all attachments for the given extent and validate the result.
    pub fn configure(
        device: &wgpu::Device,
        layout: &wgpu::BindGroupLayout,
        width: u32,
        height: u32,
    ) -> Result<Self, RenderError> {
        let names = ["albedo", "normal", "position", "view_dir"];
        let color_attachments: Vec<Texture> = COLOR_FORMATS
            .iter()
            .zip(names)
            .map(|(format, name)| {
                Texture::create_render_target(
                    device,
                    [width, height],
                    *format,
                    &format!("gbuffer {name}"),
                )
            })
            .collect();
        let depth = Texture::create_depth_texture(device, [width, height], "gbuffer depth");

        validate(&color_attachments, &depth, [width, height])?;

        let sampler = color_attachments[0]
            .sampler
            .as_ref()
            .expect("render target sampler");
        let entries: Vec<wgpu::BindGroupEntry> = color_attachments
            .iter()
            .enumerate()
            .map(|(i, tex)| wgpu::BindGroupEntry {
                binding: i as u32,
                resource: wgpu::BindingResource::TextureView(&tex.view),
            })
            .chain(std::iter::once(wgpu::BindGroupEntry {
                binding: 4,
                resource: wgpu::BindingResource::Sampler(sampler),
            }))
            .collect();
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout,
            entries: &entries,
            label: Some("gbuffer_bind_group"),
        });

        Ok(Self {
            color_attachments,
            depth,
            extent: [width, height],
            bind_group,
        })
    }
}

/// Completeness check over the assembled target: every attachment present,
/// equal non-zero extents, the declared formats, and a depth attachment.
fn validate(colors: &[Texture], depth: &Texture, extent: [u32; 2]) -> Result<(), RenderError> {
    if extent[0] == 0 || extent[1] == 0 {
        return Err(RenderError::IncompleteTarget {
            reason: format!("zero-sized extent {}x{}", extent[0], extent[1]),
        });
    }
    if colors.len() != COLOR_FORMATS.len() {
        return Err(RenderError::IncompleteTarget {
            reason: format!(
                "expected {} color attachments, have {}",
                COLOR_FORMATS.len(),
                colors.len()
            ),
        });
    }
    for (i, (tex, format)) in colors.iter().zip(COLOR_FORMATS).enumerate() {
        if tex.texture.format() != format {
            return Err(RenderError::IncompleteTarget {
                reason: format!("color attachment {i} has format {:?}", tex.texture.format()),
            });
        }
        if tex.texture.width() != extent[0] || tex.texture.height() != extent[1] {
            return Err(RenderError::IncompleteTarget {
                reason: format!(
                    "color attachment {i} is {}x{}, target is {}x{}",
                    tex.texture.width(),
                    tex.texture.height(),
                    extent[0],
                    extent[1]
                ),
            });
        }
    }
    if depth.texture.format() != Texture::DEPTH_FORMAT {
        return Err(RenderError::IncompleteTarget {
            reason: format!("depth attachment has format {:?}", depth.texture.format()),
        });
    }
    if depth.texture.width() != extent[0] || depth.texture.height() != extent[1] {
        return Err(RenderError::IncompleteTarget {
            reason: "depth attachment extent mismatch".to_string(),
        });
    }
    Ok(())
}

//! Drawable resource registries and mesh construction.
//!
//! All GPU-side assets live in flat `Vec`-backed registries keyed by integer
//! index and owned by the top-level context for its lifetime. The per-frame
//! core looks resources up by index and never mutates them mid-frame; the
//! only amortized mutation is the per-sub-mesh pipeline cache, which grows
//! lazily as programs are paired with sub-meshes.
//!
//! A [`Mesh`] owns one concatenated vertex buffer and one index buffer; its
//! [`SubMesh`]es are contiguous index ranges with their own vertex layout and
//! material index. Both the `.obj` import path and the procedural shapes go
//! through [`MeshBuilder`].

use wgpu::util::DeviceExt;

pub mod mesh;
pub mod shapes;
pub mod texture;

use texture::Texture;

/// One attribute of a sub-mesh vertex layout: shader location, float
/// component count, and byte offset within the vertex.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VertexBufferAttribute {
    pub location: u32,
    pub components: u32,
    pub offset: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VertexBufferLayout {
    pub attributes: Vec<VertexBufferAttribute>,
    pub stride: u32,
}

/// A pipeline the sub-mesh has already been drawn with: program registry
/// index paired with an index into the pipeline arena.
#[derive(Debug, Clone, Copy)]
pub struct CachedPipeline {
    pub program: usize,
    pub pipeline: usize,
}

/// A contiguous index range within a shared mesh buffer, drawn with one
/// material.
#[derive(Debug)]
pub struct SubMesh {
    pub layout: VertexBufferLayout,
    /// Byte offset of this sub-mesh's vertices in the mesh vertex buffer.
    pub vertex_offset: u64,
    /// First index in the mesh index buffer; indices are sub-mesh local.
    pub index_offset: u32,
    pub index_count: u32,
    /// One cached pipeline per program this sub-mesh has been drawn with.
    pub pipelines: Vec<CachedPipeline>,
}

#[derive(Debug)]
pub struct Mesh {
    pub name: String,
    pub vertex_buffer: wgpu::Buffer,
    pub index_buffer: wgpu::Buffer,
    pub submeshes: Vec<SubMesh>,
}

#[derive(Debug)]
pub struct Material {
    pub name: String,
    pub albedo: usize,
    pub bind_group: wgpu::BindGroup,
}

/// A drawable model: a mesh plus one material index per sub-mesh.
#[derive(Debug)]
pub struct Model {
    pub mesh: usize,
    pub materials: Vec<usize>,
}

/// The flat resource registries.
#[derive(Debug, Default)]
pub struct Drawables {
    pub textures: Vec<Texture>,
    pub materials: Vec<Material>,
    pub meshes: Vec<Mesh>,
    pub models: Vec<Model>,
}

impl Drawables {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_texture(&mut self, texture: Texture) -> usize {
        self.textures.push(texture);
        self.textures.len() - 1
    }

    pub fn add_material(
        &mut self,
        device: &wgpu::Device,
        layout: &wgpu::BindGroupLayout,
        name: &str,
        albedo: usize,
    ) -> usize {
        let texture = &self.textures[albedo];
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&texture.view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(
                        texture.sampler.as_ref().expect("material texture sampler"),
                    ),
                },
            ],
            label: Some(name),
        });
        self.materials.push(Material {
            name: name.to_string(),
            albedo,
            bind_group,
        });
        self.materials.len() - 1
    }

    pub fn add_mesh(&mut self, mesh: Mesh) -> usize {
        self.meshes.push(mesh);
        self.meshes.len() - 1
    }

    pub fn add_model(&mut self, model: Model) -> usize {
        self.models.push(model);
        self.models.len() - 1
    }
}

/// Bind group layout for material albedo textures.
pub fn material_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        entries: &[
            wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Texture {
                    multisampled: false,
                    view_dimension: wgpu::TextureViewDimension::D2,
                    sample_type: wgpu::TextureSampleType::Float { filterable: true },
                },
                count: None,
            },
            wgpu::BindGroupLayoutEntry {
                binding: 1,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                count: None,
            },
        ],
        label: Some("material_bind_group_layout"),
    })
}

/// Accumulates sub-mesh vertex/index data into one concatenated pair of
/// buffers, tracking per-sub-mesh offsets. CPU-side until [`build`](Self::build).
#[derive(Debug, Default)]
pub struct MeshBuilder {
    name: String,
    vertex_bytes: Vec<u8>,
    indices: Vec<u32>,
    submeshes: Vec<SubMesh>,
}

impl MeshBuilder {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Default::default()
        }
    }

    /// Append one sub-mesh. `vertices` is already interleaved according to
    /// `layout`; `indices` are local to this sub-mesh.
    pub fn push_submesh(
        &mut self,
        layout: VertexBufferLayout,
        vertices: &[u8],
        indices: &[u32],
    ) {
        debug_assert_eq!(vertices.len() as u32 % layout.stride.max(1), 0);
        let submesh = SubMesh {
            layout,
            vertex_offset: self.vertex_bytes.len() as u64,
            index_offset: self.indices.len() as u32,
            index_count: indices.len() as u32,
            pipelines: Vec::new(),
        };
        self.vertex_bytes.extend_from_slice(vertices);
        self.indices.extend_from_slice(indices);
        self.submeshes.push(submesh);
    }

    pub fn submeshes(&self) -> &[SubMesh] {
        &self.submeshes
    }

    pub fn build(self, device: &wgpu::Device) -> Mesh {
        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{:?} Vertex Buffer", self.name)),
            contents: &self.vertex_bytes,
            usage: wgpu::BufferUsages::VERTEX,
        });
        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{:?} Index Buffer", self.name)),
            contents: bytemuck::cast_slice(&self.indices),
            usage: wgpu::BufferUsages::INDEX,
        });
        Mesh {
            name: self.name,
            vertex_buffer,
            index_buffer,
            submeshes: self.submeshes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layout(stride: u32) -> VertexBufferLayout {
        VertexBufferLayout {
            attributes: vec![VertexBufferAttribute {
                location: 0,
                components: 3,
                offset: 0,
            }],
            stride,
        }
    }

    #[test]
    fn submesh_offsets_concatenate() {
        let mut builder = MeshBuilder::new("test");
        builder.push_submesh(layout(12), &[0u8; 36], &[0, 1, 2]);
        builder.push_submesh(layout(12), &[0u8; 72], &[0, 1, 2, 2, 1, 3]);

        let subs = builder.submeshes();
        assert_eq!(subs[0].vertex_offset, 0);
        assert_eq!(subs[0].index_offset, 0);
        assert_eq!(subs[0].index_count, 3);
        assert_eq!(subs[1].vertex_offset, 36);
        assert_eq!(subs[1].index_offset, 3);
        assert_eq!(subs[1].index_count, 6);
    }

    #[test]
    fn fresh_submesh_has_no_cached_pipelines() {
        let mut builder = MeshBuilder::new("test");
        builder.push_submesh(layout(12), &[0u8; 12], &[0]);
        assert!(builder.submeshes()[0].pipelines.is_empty());
    }
}

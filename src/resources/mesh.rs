//! Wavefront `.obj` import.
//!
//! Loads a model file into the resource registries: one mesh with one
//! sub-mesh per `.obj` object, materials resolved to albedo textures (file
//! texture, or a solid-color fallback built from the material's diffuse
//! color). The sub-mesh vertex layout is derived from the attribute streams
//! actually present in the file, so meshes without normals or texture
//! coordinates advertise smaller layouts and the pipeline cache matches
//! programs against what is really there.

use std::path::Path;

use anyhow::Context as _;

use super::{
    Drawables, MeshBuilder, Model, VertexBufferAttribute, VertexBufferLayout, texture::Texture,
};

/// Derive the interleaved vertex layout for the streams present in a file.
fn layout_for(has_normals: bool, has_uvs: bool) -> VertexBufferLayout {
    let mut attributes = vec![VertexBufferAttribute {
        location: 0,
        components: 3,
        offset: 0,
    }];
    let mut offset = 12;
    if has_normals {
        attributes.push(VertexBufferAttribute {
            location: 1,
            components: 3,
            offset,
        });
        offset += 12;
    }
    if has_uvs {
        attributes.push(VertexBufferAttribute {
            location: 2,
            components: 2,
            offset,
        });
        offset += 8;
    }
    VertexBufferLayout {
        attributes,
        stride: offset,
    }
}

/// Load `file_name` and register its mesh, materials and textures. Returns
/// the model registry index.
pub fn load_model_obj(
    file_name: &str,
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    drawables: &mut Drawables,
    material_layout: &wgpu::BindGroupLayout,
) -> anyhow::Result<usize> {
    let (models, materials) = tobj::load_obj(
        file_name,
        &tobj::LoadOptions {
            single_index: true,
            triangulate: true,
            ..Default::default()
        },
    )
    .with_context(|| format!("loading obj file {file_name}"))?;

    let base_dir = Path::new(file_name).parent().unwrap_or(Path::new("."));

    // Resolve the file's materials to registry indices up front; sub-meshes
    // reference them by position below.
    let mut material_indices = Vec::new();
    for m in materials.unwrap_or_default() {
        let albedo = match &m.diffuse_texture {
            Some(tex_path) => {
                let full = base_dir.join(tex_path);
                let img = image::open(&full)
                    .with_context(|| format!("loading texture {}", full.display()))?;
                drawables.add_texture(Texture::from_image(device, queue, &img, Some(tex_path))?)
            }
            None => {
                let diffuse = m.diffuse.unwrap_or([1.0, 1.0, 1.0]);
                let rgba = [
                    (diffuse[0].clamp(0.0, 1.0) * 255.0) as u8,
                    (diffuse[1].clamp(0.0, 1.0) * 255.0) as u8,
                    (diffuse[2].clamp(0.0, 1.0) * 255.0) as u8,
                    255,
                ];
                drawables.add_texture(Texture::solid(device, queue, rgba, &m.name))
            }
        };
        material_indices.push(drawables.add_material(device, material_layout, &m.name, albedo));
    }

    // Sub-meshes without a material fall back to plain white.
    let default_material = if material_indices.is_empty()
        || models.iter().any(|m| m.mesh.material_id.is_none())
    {
        let white = drawables.add_texture(Texture::solid(
            device,
            queue,
            [255, 255, 255, 255],
            "default white",
        ));
        Some(drawables.add_material(device, material_layout, "default", white))
    } else {
        None
    };

    let mut builder = MeshBuilder::new(file_name);
    let mut submesh_materials = Vec::new();
    for m in &models {
        let mesh = &m.mesh;
        let has_normals = !mesh.normals.is_empty();
        let has_uvs = !mesh.texcoords.is_empty();
        let layout = layout_for(has_normals, has_uvs);

        let vertex_count = mesh.positions.len() / 3;
        let mut vertices: Vec<f32> =
            Vec::with_capacity(vertex_count * (layout.stride as usize / 4));
        for i in 0..vertex_count {
            vertices.extend_from_slice(&mesh.positions[i * 3..i * 3 + 3]);
            if has_normals {
                vertices.extend_from_slice(&mesh.normals[i * 3..i * 3 + 3]);
            }
            if has_uvs {
                vertices.push(mesh.texcoords[i * 2]);
                vertices.push(1.0 - mesh.texcoords[i * 2 + 1]);
            }
        }

        builder.push_submesh(layout, bytemuck::cast_slice(&vertices), &mesh.indices);
        submesh_materials.push(
            mesh.material_id
                .and_then(|id| material_indices.get(id).copied())
                .or(default_material)
                .expect("sub-mesh material"),
        );
    }

    log::info!(
        "loaded {file_name}: {} sub-meshes, {} materials",
        models.len(),
        material_indices.len()
    );

    let mesh = drawables.add_mesh(builder.build(device));
    Ok(drawables.add_model(Model {
        mesh,
        materials: submesh_materials,
    }))
}

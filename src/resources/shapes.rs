//! Procedurally generated geometry.
//!
//! The demo scene runs without asset files: plane, cube, sphere and quad
//! meshes are generated here and fed through the same [`MeshBuilder`] path
//! the `.obj` importer uses. Vertices are interleaved position/normal/uv;
//! triangles wind counter-clockwise seen from outside.

use super::{Drawables, MeshBuilder, Model, VertexBufferAttribute, VertexBufferLayout};

/// Layout of the generated vertices: position (location 0), normal
/// (location 1), texture coordinates (location 2).
pub fn standard_layout() -> VertexBufferLayout {
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

/// Build a one-sub-mesh model from interleaved vertex data and register it.
/// Returns the model registry index.
pub fn register_shape(
    device: &wgpu::Device,
    drawables: &mut Drawables,
    name: &str,
    vertices: &[f32],
    indices: &[u32],
    material: usize,
) -> usize {
    let mut builder = MeshBuilder::new(name);
    builder.push_submesh(standard_layout(), bytemuck::cast_slice(vertices), indices);
    let mesh = drawables.add_mesh(builder.build(device));
    drawables.add_model(Model {
        mesh,
        materials: vec![material],
    })
}

/// A flat square in the XZ plane facing +Y, `extent` units from center to
/// edge.
pub fn plane(extent: f32) -> (Vec<f32>, Vec<u32>) {
    let e = extent;
    #[rustfmt::skip]
    let vertices = vec![
        -e, 0.0, -e,  0.0, 1.0, 0.0,  0.0, 0.0,
        -e, 0.0,  e,  0.0, 1.0, 0.0,  0.0, 1.0,
         e, 0.0,  e,  0.0, 1.0, 0.0,  1.0, 1.0,
         e, 0.0, -e,  0.0, 1.0, 0.0,  1.0, 0.0,
    ];
    (vertices, vec![0, 1, 2, 0, 2, 3])
}

/// A unit square in the XY plane facing +Z, centered at the origin.
pub fn quad() -> (Vec<f32>, Vec<u32>) {
    #[rustfmt::skip]
    let vertices = vec![
        -0.5, -0.5, 0.0,  0.0, 0.0, 1.0,  0.0, 1.0,
         0.5, -0.5, 0.0,  0.0, 0.0, 1.0,  1.0, 1.0,
         0.5,  0.5, 0.0,  0.0, 0.0, 1.0,  1.0, 0.0,
        -0.5,  0.5, 0.0,  0.0, 0.0, 1.0,  0.0, 0.0,
    ];
    (vertices, vec![0, 1, 2, 0, 2, 3])
}

/// A unit cube centered at the origin, one quad per face.
pub fn cube() -> (Vec<f32>, Vec<u32>) {
    // (normal, tangent u, tangent v) per face, with u x v = normal.
    const FACES: [([f32; 3], [f32; 3], [f32; 3]); 6] = [
        ([1.0, 0.0, 0.0], [0.0, 0.0, -1.0], [0.0, 1.0, 0.0]),
        ([-1.0, 0.0, 0.0], [0.0, 0.0, 1.0], [0.0, 1.0, 0.0]),
        ([0.0, 1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, -1.0]),
        ([0.0, -1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, 1.0]),
        ([0.0, 0.0, 1.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]),
        ([0.0, 0.0, -1.0], [-1.0, 0.0, 0.0], [0.0, 1.0, 0.0]),
    ];
    const CORNERS: [(f32, f32, [f32; 2]); 4] = [
        (-1.0, -1.0, [0.0, 1.0]),
        (1.0, -1.0, [1.0, 1.0]),
        (1.0, 1.0, [1.0, 0.0]),
        (-1.0, 1.0, [0.0, 0.0]),
    ];

    let mut vertices = Vec::with_capacity(6 * 4 * 8);
    let mut indices = Vec::with_capacity(6 * 6);
    for (face, (n, u, v)) in FACES.iter().enumerate() {
        let base = (face * 4) as u32;
        for (su, sv, uv) in CORNERS {
            for i in 0..3 {
                vertices.push(0.5 * (n[i] + su * u[i] + sv * v[i]));
            }
            vertices.extend_from_slice(n);
            vertices.extend_from_slice(&uv);
        }
        indices.extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
    }
    (vertices, indices)
}

/// A UV sphere of radius 0.5 centered at the origin.
pub fn sphere(stacks: u32, slices: u32) -> (Vec<f32>, Vec<u32>) {
    let mut vertices = Vec::new();
    let mut indices = Vec::new();

    for stack in 0..=stacks {
        let theta = std::f32::consts::PI * stack as f32 / stacks as f32;
        for slice in 0..=slices {
            let phi = std::f32::consts::TAU * slice as f32 / slices as f32;
            let dir = [
                theta.sin() * phi.cos(),
                theta.cos(),
                theta.sin() * phi.sin(),
            ];
            vertices.extend_from_slice(&[0.5 * dir[0], 0.5 * dir[1], 0.5 * dir[2]]);
            vertices.extend_from_slice(&dir);
            vertices.extend_from_slice(&[
                slice as f32 / slices as f32,
                stack as f32 / stacks as f32,
            ]);
        }
    }

    let ring = slices + 1;
    for stack in 0..stacks {
        for slice in 0..slices {
            let a = stack * ring + slice;
            let b = a + ring;
            indices.extend_from_slice(&[a, a + 1, b, a + 1, b + 1, b]);
        }
    }
    (vertices, indices)
}

/// The embedded full-screen quad used by the deferred composition pass:
/// clip-space positions with texture coordinates flipped so that the
/// bottom-left corner samples the bottom of the G-buffer attachments.
#[rustfmt::skip]
pub const SCREEN_QUAD_VERTICES: [f32; 20] = [
    -1.0, -1.0, 0.0,  0.0, 1.0,
     1.0, -1.0, 0.0,  1.0, 1.0,
     1.0,  1.0, 0.0,  1.0, 0.0,
    -1.0,  1.0, 0.0,  0.0, 0.0,
];

pub const SCREEN_QUAD_INDICES: [u16; 6] = [0, 1, 2, 0, 2, 3];

#[cfg(test)]
mod tests {
    use super::*;

    fn vertex_count(vertices: &[f32]) -> usize {
        vertices.len() / 8
    }

    #[test]
    fn plane_is_two_triangles() {
        let (vertices, indices) = plane(10.0);
        assert_eq!(vertex_count(&vertices), 4);
        assert_eq!(indices.len(), 6);
    }

    #[test]
    fn cube_has_per_face_normals() {
        let (vertices, indices) = cube();
        assert_eq!(vertex_count(&vertices), 24);
        assert_eq!(indices.len(), 36);
        // First face normal is +X for all four of its vertices.
        for v in 0..4 {
            assert_eq!(vertices[v * 8 + 3], 1.0);
            assert_eq!(vertices[v * 8 + 4], 0.0);
            assert_eq!(vertices[v * 8 + 5], 0.0);
        }
    }

    #[test]
    fn sphere_normals_are_unit_radial() {
        let (vertices, indices) = sphere(8, 12);
        assert_eq!(vertex_count(&vertices), (8 + 1) as usize * (12 + 1) as usize);
        assert_eq!(indices.len(), (8 * 12 * 6) as usize);
        for v in 0..vertex_count(&vertices) {
            let p = &vertices[v * 8..v * 8 + 3];
            let n = &vertices[v * 8 + 3..v * 8 + 6];
            let len = (n[0] * n[0] + n[1] * n[1] + n[2] * n[2]).sqrt();
            assert!((len - 1.0).abs() < 1e-5);
            // Position is the normal scaled to radius 0.5.
            for i in 0..3 {
                assert!((p[i] - 0.5 * n[i]).abs() < 1e-6);
            }
        }
    }

    #[test]
    fn indices_stay_in_bounds() {
        for (vertices, indices) in [plane(1.0), quad(), cube(), sphere(6, 6)] {
            let count = vertex_count(&vertices) as u32;
            assert!(indices.iter().all(|&i| i < count));
        }
    }
}

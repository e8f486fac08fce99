//! Per-frame parameter packing.
//!
//! Once per frame the scene is serialized into the shared uniform buffer:
//! one global block (camera position + light array) followed by one local
//! block per entity (world matrix + world-view-projection matrix). The
//! resulting offsets/sizes are recorded for the render passes to bind.
//!
//! The light-indicator collection goes through the identical local-block walk
//! as a logically separate pass sharing the same buffer and head.

use cgmath::{Matrix4, Vector3};

use crate::{
    error::PackError,
    packing::{AlignedRegion, LinearBuffer},
    scene::{Entity, Light},
};

/// Fixed light-array length declared by the shaders; the packer writes every
/// scene light and the shaders clamp to `min(light_count, MAX_LIGHTS)`.
pub const MAX_LIGHTS: u32 = 16;

/// Bytes of one light record in the global block: a 16-byte-aligned tag
/// followed by three self-aligned vec3 fields.
pub const LIGHT_RECORD_SIZE: u32 = 64;

/// Bytes of one local block: world and world-view-projection matrices.
pub const LOCAL_BLOCK_SIZE: u32 = 128;

/// Size of the global block as the shaders declare it (fixed-length light
/// array). Uniform bindings must cover this much even when fewer lights are
/// packed; the packed prefix is identical.
pub const GLOBAL_BLOCK_BIND_SIZE: u32 = 16 + MAX_LIGHTS * LIGHT_RECORD_SIZE;

/// Pack the global parameter block: camera world position, light count, then
/// one 16-byte-aligned record per light in scene order. Returns the packed
/// region. With zero lights the block is exactly the camera position plus the
/// count.
pub fn pack_global_params(
    buf: &mut LinearBuffer,
    camera_position: Vector3<f32>,
    lights: &[Light],
) -> Result<AlignedRegion, PackError> {
    let offset = buf.head();
    buf.push_vec3(camera_position)?;
    buf.push_u32(lights.len() as u32)?;
    for light in lights {
        buf.align_head(16)?;
        buf.push_u32(light.kind.tag())?;
        buf.push_vec3(light.color)?;
        buf.push_vec3(light.direction)?;
        buf.push_vec3(light.position)?;
    }
    Ok(AlignedRegion {
        offset,
        size: buf.head() - offset,
    })
}

/// Pack one local block per entity in collection order: align to the
/// device's uniform offset alignment, then push the world matrix and the
/// world-view-projection matrix computed fresh from the current camera. The
/// packed region is stored back on each entity.
pub fn pack_local_params(
    buf: &mut LinearBuffer,
    alignment: u32,
    view_projection: Matrix4<f32>,
    entities: &mut [Entity],
) -> Result<(), PackError> {
    for entity in entities {
        buf.align_head(alignment as usize)?;
        let offset = buf.head();
        buf.push_mat4(entity.world)?;
        buf.push_mat4(view_projection * entity.world)?;
        entity.local_region = AlignedRegion {
            offset,
            size: buf.head() - offset,
        };
    }
    Ok(())
}

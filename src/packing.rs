//! The shared uniform buffer and its typed writer.
//!
//! All per-frame shader parameters live in one GPU buffer. [`LinearBuffer`]
//! is its CPU staging twin: a fixed-capacity byte region with a write cursor
//! ("head") and self-aligning typed pushes, so the alignment rules of the
//! uniform address space are centralized here instead of being scattered
//! through the packing code. [`UniformArena`] pairs the staging buffer with
//! the GPU-resident buffer; [`ArenaWriter`] scopes write access and flushes
//! the staged bytes on every exit path.

use std::ops::{Deref, DerefMut};

use cgmath::{Matrix4, Vector3};

use crate::error::PackError;

/// A sub-range of the shared buffer produced by packing one logical group of
/// parameters (the frame globals, or one entity's locals). Metadata only.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AlignedRegion {
    pub offset: u32,
    pub size: u32,
}

/// Fixed-capacity byte buffer with a monotonically advancing write cursor.
///
/// The head only ever moves forward between [`reset`](Self::reset) calls, so
/// regions packed in sequence can never overlap. Writing past the capacity is
/// a fatal [`PackError::Overflow`].
#[derive(Debug)]
pub struct LinearBuffer {
    bytes: Vec<u8>,
    head: usize,
}

impl LinearBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            bytes: vec![0; capacity],
            head: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.bytes.len()
    }

    pub fn head(&self) -> u32 {
        self.head as u32
    }

    /// Rewind the head to the start of the buffer. Called exactly once per
    /// frame, before any pushes.
    pub fn reset(&mut self) {
        self.head = 0;
    }

    /// Advance the head to the next multiple of `alignment`; no-op when
    /// already aligned.
    pub fn align_head(&mut self, alignment: usize) -> Result<(), PackError> {
        debug_assert!(alignment.is_power_of_two());
        let aligned = self.head.next_multiple_of(alignment);
        if aligned > self.bytes.len() {
            return Err(PackError::Overflow {
                head: self.head,
                requested: aligned - self.head,
                capacity: self.bytes.len(),
            });
        }
        self.head = aligned;
        Ok(())
    }

    fn push_aligned(&mut self, data: &[u8], alignment: usize) -> Result<u32, PackError> {
        self.align_head(alignment)?;
        if self.head + data.len() > self.bytes.len() {
            return Err(PackError::Overflow {
                head: self.head,
                requested: data.len(),
                capacity: self.bytes.len(),
            });
        }
        let offset = self.head;
        self.bytes[offset..offset + data.len()].copy_from_slice(data);
        self.head += data.len();
        Ok(offset as u32)
    }

    pub fn push_u32(&mut self, value: u32) -> Result<u32, PackError> {
        self.push_aligned(bytemuck::bytes_of(&value), 4)
    }

    /// Three floats, self-aligned to 16 bytes as the uniform address space
    /// requires of `vec3` members.
    pub fn push_vec3(&mut self, value: Vector3<f32>) -> Result<u32, PackError> {
        let raw: [f32; 3] = value.into();
        self.push_aligned(bytemuck::bytes_of(&raw), 16)
    }

    pub fn push_mat4(&mut self, value: Matrix4<f32>) -> Result<u32, PackError> {
        let raw: [[f32; 4]; 4] = value.into();
        self.push_aligned(bytemuck::bytes_of(&raw), 16)
    }

    pub fn staged(&self) -> &[u8] {
        &self.bytes[..self.head]
    }
}

/// The CPU staging buffer paired with its GPU-resident twin.
///
/// Sized once at construction to the device's maximum uniform binding size
/// and never resized. The required offset alignment for per-entity regions is
/// captured from the device limits alongside it.
#[derive(Debug)]
pub struct UniformArena {
    buffer: LinearBuffer,
    gpu: wgpu::Buffer,
    alignment: u32,
}

impl UniformArena {
    pub fn new(device: &wgpu::Device) -> Self {
        let limits = device.limits();
        let capacity = limits.max_uniform_buffer_binding_size as usize;
        let gpu = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("shared uniform arena"),
            size: capacity as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        Self {
            buffer: LinearBuffer::new(capacity),
            gpu,
            alignment: limits.min_uniform_buffer_offset_alignment,
        }
    }

    /// The device-reported minimum uniform-buffer offset alignment. Every
    /// per-entity region starts at a multiple of this.
    pub fn alignment(&self) -> u32 {
        self.alignment
    }

    pub fn gpu_buffer(&self) -> &wgpu::Buffer {
        &self.gpu
    }

    /// Acquire write access for one pack walk. The returned writer flushes
    /// the staged bytes to the GPU buffer when it goes out of scope, on every
    /// exit path including early error returns.
    pub fn map<'a>(&'a mut self, queue: &'a wgpu::Queue) -> ArenaWriter<'a> {
        ArenaWriter { arena: self, queue }
    }
}

/// Scoped write access to a [`UniformArena`].
///
/// Dereferences to the staging [`LinearBuffer`]. Mapping does not reset the
/// head: several walks within one frame share the cursor, and only the first
/// calls [`LinearBuffer::reset`].
pub struct ArenaWriter<'a> {
    arena: &'a mut UniformArena,
    queue: &'a wgpu::Queue,
}

impl Deref for ArenaWriter<'_> {
    type Target = LinearBuffer;

    fn deref(&self) -> &LinearBuffer {
        &self.arena.buffer
    }
}

impl DerefMut for ArenaWriter<'_> {
    fn deref_mut(&mut self) -> &mut LinearBuffer {
        &mut self.arena.buffer
    }
}

impl Drop for ArenaWriter<'_> {
    fn drop(&mut self) {
        // Copy sizes must be 4-byte aligned; every push type already is.
        let len = self.arena.buffer.head.next_multiple_of(4);
        if len > 0 {
            self.queue
                .write_buffer(&self.arena.gpu, 0, &self.arena.buffer.bytes[..len]);
        }
    }
}

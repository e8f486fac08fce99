//! shade-ngin
//!
//! A compact forward/deferred shading demo engine built on wgpu. The crate
//! exists to teach graphics pipeline concepts: how many draw calls share one
//! GPU uniform buffer through aligned per-entity regions, and how the same
//! scene walks through a forward pipeline or a deferred geometry/composition
//! pipeline without changing its world-space transforms.
//!
//! High-level modules
//! - `camera`: free-flying camera, projection and input-driven controls
//! - `context`: central context owning device/queue, registries and scene
//! - `error`: fatal error taxonomy (overflow, attribute mismatch, bad target)
//! - `frame`: per-frame packing of global and per-entity uniform regions
//! - `gbuffer`: the off-screen target for the deferred geometry pass
//! - `input`: per-frame key/mouse snapshot
//! - `packing`: the shared uniform buffer and its typed, aligned writer
//! - `pipelines`: pipeline construction and the per-sub-mesh pipeline cache
//! - `render`: render pass orchestration (forward, deferred, indicators)
//! - `resources`: drawable registries, model import, procedural shapes
//! - `scene`: entities, lights and indicator derivation
//! - `shader`: WGSL program registry with vertex-input reflection
//!

pub mod camera;
pub mod context;
pub mod error;
pub mod frame;
pub mod gbuffer;
pub mod input;
pub mod packing;
pub mod pipelines;
pub mod render;
pub mod resources;
pub mod scene;
pub mod shader;

// Re-exports commonly used types for convenience in downstream code.
pub use cgmath::*;
pub use wgpu::*;
pub use winit::event::DeviceEvent;
pub use winit::event::WindowEvent;

//! Fatal error taxonomy.
//!
//! Every error in this crate's core is either fatal (a programming or
//! asset-configuration defect) or logged-and-degraded (shader compilation,
//! handled in [`crate::shader`]). There is no transient/retryable class.

use thiserror::Error;

/// Errors raised while packing frame parameters into the shared uniform
/// buffer. All variants are fatal: they indicate a sizing or configuration
/// bug, not a runtime condition to retry.
#[derive(Debug, Error)]
pub enum PackError {
    /// A push or alignment step would move the write cursor past the fixed
    /// buffer capacity.
    #[error(
        "uniform buffer overflow: {requested} bytes at head {head} exceeds capacity {capacity}"
    )]
    Overflow {
        head: usize,
        requested: usize,
        capacity: usize,
    },
}

/// Errors raised while preparing or recording render passes.
#[derive(Debug, Error)]
pub enum RenderError {
    /// A program reads a vertex input location the sub-mesh layout does not
    /// provide. Signals a mismatched asset/shader pairing; not recoverable.
    #[error("program `{program}` reads vertex location {location} but the sub-mesh does not provide it")]
    AttributeMismatch { program: String, location: u32 },

    /// The off-screen target failed validation after all attachments were
    /// created.
    #[error("off-screen target is incomplete: {reason}")]
    IncompleteTarget { reason: String },

    #[error(transparent)]
    Pack(#[from] PackError),

    #[error(transparent)]
    Surface(#[from] wgpu::SurfaceError),
}

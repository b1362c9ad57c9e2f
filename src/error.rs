//! Error types.
//!
//! Fallible constructors (opening a display backend, initializing a glyph provider)
//! return `anyhow::Result` and are expected to terminate the host process with a
//! diagnostic on failure (spec §7). Everything past initialization is either
//! infallible by design or reports through `DisplayError`, which is bounded to the
//! display-backend boundary per Design Notes §9.

use thiserror::Error;

/// Errors a `DisplayBackend` implementation may report from `do_lock`/`do_unlock`.
///
/// These are always recovered locally by `MemoryDisplay`/`MatrixRenderer`: a failed
/// lock degrades to an empty surface rectangle and the draw becomes a no-op for that
/// frame (spec §7). Nothing in this crate propagates a `DisplayError` as a panic or
/// process exit.
#[derive(Debug, Error)]
pub enum DisplayError {
    #[error("display backend has no surface available")]
    NoSurface,
    #[error("display backend changed size while locked (expected {expected_w}x{expected_h}, got {actual_w}x{actual_h})")]
    SizeChangedWhileLocked {
        expected_w: u32,
        expected_h: u32,
        actual_w: u32,
        actual_h: u32,
    },
    #[error("display backend I/O failed: {0}")]
    Io(String),
}

/// Crate-wide fallible-constructor result alias.
pub type Result<T> = anyhow::Result<T>;

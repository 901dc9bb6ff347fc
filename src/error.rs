//! Error taxonomy for window metadata resolution.
//!
//! Two layers:
//!   - [`FillError`] is what a native "fill this buffer" call reports. It keeps
//!     the insufficient-capacity signal separate from real failures so the
//!     growable reader can retry the former and propagate the latter.
//!   - [`Error`] is what the library surfaces. Insufficient capacity never
//!     escapes; it either resolves through a larger buffer or becomes
//!     [`Error::BufferTooLarge`] at the growth cap.
//!
//! Errors carry the OS error code rather than a live error source, which keeps
//! them `Clone` — memoized path lookups replay their outcome (success or
//! failure) to every later caller for the same pid.

use thiserror::Error;

/// Failure of a native buffer-fill call, as reported at the boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FillError {
    /// The buffer was too small for the data. The reader retries with a
    /// larger buffer; this variant is never observable outside the reader.
    InsufficientBuffer,
    /// Any other native failure, identified by the call name and OS code.
    Native { call: &'static str, code: i32 },
}

/// Errors surfaced by the library.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// A native call failed. `call` names the boundary operation, `code` is
    /// the OS error code it reported.
    #[error("{call} failed with OS error {code}")]
    Native { call: &'static str, code: i32 },

    /// A native call kept reporting insufficient capacity past the growth
    /// cap. Distinct from [`Error::Native`] so callers can tell a runaway
    /// capacity negotiation from a plain failure.
    #[error("{call} still reported insufficient capacity at {max} UTF-16 units")]
    BufferTooLarge { call: &'static str, max: usize },
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

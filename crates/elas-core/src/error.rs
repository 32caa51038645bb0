//! Error handling for the ELAS disparity pipeline.

use thiserror::Error;

/// Errors that can escape [`crate::Elas::process`].
///
/// Per the core's error taxonomy, data-dependent conditions (a degenerate
/// triangle, a pixel falling outside the warped search range, a dense match
/// with no surviving candidate) are never represented here — they are
/// encoded as sentinel values in the output disparity maps. Only the one
/// genuinely exceptional, caller-actionable condition is typed.
#[derive(Error, Debug)]
pub enum ElasError {
    /// Fewer than 3 support points survived filtering; triangulation and
    /// everything downstream of it cannot proceed.
    #[error("need at least 3 support points to triangulate, found {found}")]
    InsufficientSupportPoints { found: usize },

    /// Caller-supplied output buffer is the wrong size for the requested
    /// parameters (accounting for `subsampling`).
    #[error("output buffer has {got} elements, expected {expected}")]
    OutputBufferSize { got: usize, expected: usize },

    /// Caller-supplied `left`/`right` input buffer is too short for the
    /// claimed `width`/`height`/`src_bpl`.
    #[error("{side} input buffer has {got} bytes, expected at least {expected}")]
    InputBufferSize {
        side: &'static str,
        got: usize,
        expected: usize,
    },
}

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, ElasError>;

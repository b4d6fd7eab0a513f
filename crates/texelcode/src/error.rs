//! Error taxonomy for kernel composition and execution
//!
//! Probe failures are deliberately absent here: a failed capability probe is
//! an expected outcome that downgrades the selected encoding strategy, not an
//! error condition.

use crate::strategy::PixelType;
use thiserror::Error;

/// Errors surfaced by kernel composition and the graphics backend boundary
#[derive(Debug, Error)]
pub enum CoderError {
    /// A pseudo-kernel was invoked with the wrong number of input values
    #[error("kernel expects {expected} input values, got {got}")]
    ArityMismatch {
        /// Number of declared inputs
        expected: usize,
        /// Number of values the caller supplied
        got: usize,
    },

    /// A caller value does not match the kind of the input it is bound to
    #[error("input '{input}' expects a {expected} value")]
    KindMismatch {
        /// Name of the declared input
        input: String,
        /// Human-readable description of the expected value kind
        expected: &'static str,
    },

    /// A buffer's texel storage does not match what the kernel reads or writes
    #[error("buffer uses {got:?} texels but the kernel expects {expected:?}")]
    PixelMismatch {
        /// Storage the kernel was composed against
        expected: PixelType,
        /// Storage the supplied buffer was allocated with
        got: PixelType,
    },

    /// A buffer handle does not refer to a live backend resource
    #[error("unknown buffer handle {0}")]
    UnknownBuffer(u64),

    /// No GPU adapter is available on this host
    #[error("no compatible GPU adapter available")]
    NoAdapter,

    /// Failure reported by the graphics backend; propagated unchanged
    #[error("GPU backend error: {0}")]
    Backend(String),
}

//! Process-wide coder state
//!
//! The input and output encoding strategies may legitimately differ: a
//! platform can compute correctly in float while only byte read-back is
//! trustworthy. Both pointers travel together in a [`CodecContext`], which
//! every fragment resolution and kernel build receives explicitly; the
//! process-wide current context exists for ergonomic parity at the top-level
//! entry points.
//!
//! Strategy selection must complete before any fragment is resolved or any
//! kernel composed. The execution model is single-threaded cooperative; the
//! state cell uses a lock only because Rust statics require interior
//! mutability, and callers must treat "change strategy" and "build/execute a
//! kernel" as mutually exclusive phases.

use crate::backend::KernelBackend;
use crate::probe::CapabilityProbe;
use crate::strategy::{EncodingStrategy, FLOAT_STRATEGY, StrategyKind, strategy_for};
use std::sync::{LazyLock, RwLock};

/// The strategy pair a kernel build resolves against
///
/// `generation` increments on every strategy change; composed kernel sources
/// are cached against it, so stale kernels are recomposed instead of reused.
#[derive(Debug, Clone, Copy)]
pub struct CodecContext {
    /// Strategy used to resolve input fragment descriptions
    pub input: &'static EncodingStrategy,
    /// Strategy used to resolve output fragment descriptions
    pub output: &'static EncodingStrategy,
    /// Strategy-change counter the context was read at
    pub generation: u64,
}

impl CodecContext {
    /// Builds a context pinned to explicit strategies, outside the
    /// process-wide state
    ///
    /// Used by the capability probes, which must run against fixed
    /// strategies before any selection has been installed.
    pub fn fixed(input: &'static EncodingStrategy, output: &'static EncodingStrategy) -> Self {
        Self {
            input,
            output,
            generation: 0,
        }
    }
}

struct CoderState {
    input: &'static EncodingStrategy,
    output: &'static EncodingStrategy,
    generation: u64,
    float_testable: Option<bool>,
}

/// Holder for one coder state
///
/// The process uses the [`GLOBAL_CODER`] instance; tests construct their own
/// cells so they never interfere through shared state.
pub struct CoderCell {
    state: RwLock<CoderState>,
}

impl CoderCell {
    /// Creates a cell defaulting to the full-float strategy for both sides
    pub fn new() -> Self {
        Self {
            state: RwLock::new(CoderState {
                input: &FLOAT_STRATEGY,
                output: &FLOAT_STRATEGY,
                generation: 0,
                float_testable: None,
            }),
        }
    }

    /// Returns the current context
    pub fn context(&self) -> CodecContext {
        let state = self.state.read().unwrap();
        CodecContext {
            input: state.input,
            output: state.output,
            generation: state.generation,
        }
    }

    /// Returns the strategy output fragment descriptions resolve against
    pub fn output_strategy(&self) -> &'static EncodingStrategy {
        self.state.read().unwrap().output
    }

    /// Installs a probed strategy selection
    pub(crate) fn install(&self, input: &'static EncodingStrategy, output: &'static EncodingStrategy) {
        let mut state = self.state.write().unwrap();
        state.input = input;
        state.output = output;
        state.generation += 1;
    }

    /// Explicitly overrides the selection, switching both sides to `kind`
    ///
    /// Previously compiled kernels and buffers encode the old strategy's
    /// layout, so outstanding GPU resources are invalidated first.
    /// Invalidation is advisory cleanup: under an uninitialized or
    /// already-torn-down graphics context it may fail, and that failure is
    /// logged and swallowed rather than propagated. The generation bump
    /// forces every cached kernel source to recompose.
    pub fn change(&self, kind: StrategyKind, backend: Option<&dyn KernelBackend>) {
        if let Some(backend) = backend {
            if let Err(err) = backend.invalidate_all() {
                tracing::debug!("resource invalidation during strategy change failed: {err}");
            }
        }

        let strategy = strategy_for(kind);
        let mut state = self.state.write().unwrap();
        state.input = strategy;
        state.output = strategy;
        state.generation += 1;
    }

    /// Reports whether float kernels are testable at all on this platform
    ///
    /// Computed lazily from the float round-trip probe on first query and
    /// memoized; repeated calls never re-probe.
    pub fn float_testable(&self, probe: &dyn CapabilityProbe) -> bool {
        if let Some(cached) = self.state.read().unwrap().float_testable {
            return cached;
        }
        let outcome = probe.float_round_trip_ok();
        self.state.write().unwrap().float_testable = Some(outcome);
        outcome
    }
}

impl Default for CoderCell {
    fn default() -> Self {
        Self::new()
    }
}

/// The process-wide coder state
pub static GLOBAL_CODER: LazyLock<CoderCell> = LazyLock::new(CoderCell::new);

/// Returns the process-wide current context
pub fn current_shader_coder() -> CodecContext {
    GLOBAL_CODER.context()
}

/// Returns the process-wide output strategy
pub fn output_shader_coder() -> &'static EncodingStrategy {
    GLOBAL_CODER.output_strategy()
}

/// Explicitly overrides the process-wide strategy selection
pub fn change_shader_coder(kind: StrategyKind, backend: Option<&dyn KernelBackend>) {
    GLOBAL_CODER.change(kind, backend);
}

/// Memoized query for whether float kernels are testable on this platform
pub fn can_test_float_shaders(probe: &dyn CapabilityProbe) -> bool {
    GLOBAL_CODER.float_testable(probe)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::TexelBuffer;
    use crate::compose::KernelInvocation;
    use crate::error::CoderError;
    use crate::strategy::PixelType;
    use std::cell::Cell;

    /// Fake probe counting how often each method runs
    struct CountingProbe {
        round_trip: bool,
        calls: Cell<u32>,
    }

    impl CapabilityProbe for CountingProbe {
        fn float_round_trip_ok(&self) -> bool {
            self.calls.set(self.calls.get() + 1);
            self.round_trip
        }

        fn float_compute_byte_read_ok(&self) -> bool {
            false
        }
    }

    /// Fake backend whose invalidation always fails
    struct FailingBackend;

    impl KernelBackend for FailingBackend {
        fn allocate(&self, _width: u32, _height: u32, _pixel: PixelType) -> Result<TexelBuffer, CoderError> {
            Err(CoderError::Backend("unavailable".into()))
        }

        fn write(&self, _buffer: &TexelBuffer, _bytes: &[u8]) -> Result<(), CoderError> {
            Err(CoderError::Backend("unavailable".into()))
        }

        fn run(&self, _invocation: &KernelInvocation, _dest: &TexelBuffer) -> Result<(), CoderError> {
            Err(CoderError::Backend("unavailable".into()))
        }

        fn read_floats(&self, _buffer: &TexelBuffer) -> Result<Vec<f32>, CoderError> {
            Err(CoderError::Backend("unavailable".into()))
        }

        fn read_bytes(&self, _buffer: &TexelBuffer) -> Result<Vec<u8>, CoderError> {
            Err(CoderError::Backend("unavailable".into()))
        }

        fn invalidate_all(&self) -> Result<(), CoderError> {
            Err(CoderError::Backend("context already torn down".into()))
        }
    }

    #[test]
    fn test_change_switches_both_sides_and_bumps_generation() {
        let cell = CoderCell::new();
        let before = cell.context();
        assert_eq!(before.input.kind(), StrategyKind::Float);

        cell.change(StrategyKind::BytePacked, None);
        let after = cell.context();
        assert_eq!(after.input.kind(), StrategyKind::BytePacked);
        assert_eq!(after.output.kind(), StrategyKind::BytePacked);
        assert_eq!(after.generation, before.generation + 1);
    }

    #[test]
    fn test_change_swallows_invalidation_failure() {
        let cell = CoderCell::new();
        // Must not panic or propagate; the switch still happens.
        cell.change(StrategyKind::BytePacked, Some(&FailingBackend));
        assert_eq!(cell.context().input.kind(), StrategyKind::BytePacked);
    }

    #[test]
    fn test_float_testable_is_memoized() {
        let cell = CoderCell::new();
        let probe = CountingProbe {
            round_trip: true,
            calls: Cell::new(0),
        };

        assert!(cell.float_testable(&probe));
        assert!(cell.float_testable(&probe));
        assert!(cell.float_testable(&probe));
        assert_eq!(probe.calls.get(), 1);
    }
}

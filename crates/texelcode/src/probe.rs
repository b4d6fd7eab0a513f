//! Capability probing and strategy selection
//!
//! The host GPU is untrusted at startup. Two controlled round-trips decide,
//! empirically, which encoding strategies the platform actually supports:
//!
//! 1. float round-trip: render a known full-precision value into a float
//!    buffer and read it back; exact equality confirms both the write and
//!    read paths preserve float precision.
//! 2. float-compute/byte-read: render into a float buffer, then run a second
//!    kernel that samples it, compares against the expected values, and
//!    writes a derived byte pattern into a byte buffer; a matching byte
//!    read-back confirms float compute even though float read-back is not
//!    trustworthy.
//!
//! Probe failures are expected outcomes, recovered locally by downgrading
//! the selection, and reported only as diagnostic warnings.

use crate::backend::KernelBackend;
use crate::coder::{CodecContext, CoderCell, GLOBAL_CODER};
use crate::compose::PseudoKernel;
use crate::error::CoderError;
use crate::fragment::{Inputs, KernelValue, Outputs};
use crate::strategy::{BYTE_STRATEGY, FLOAT_STRATEGY, PixelType, StrategyKind};

/// Platform capability checks, injectable so tests can substitute a fake
/// without a real graphics context
pub trait CapabilityProbe {
    /// Whether a full-precision float value survives render plus read-back
    fn float_round_trip_ok(&self) -> bool;

    /// Whether float compute is correct when only bytes can be read back
    fn float_compute_byte_read_ok(&self) -> bool;
}

/// Components of the probe value, including a large-magnitude negative
/// component that requires genuine float precision
const PROBE_VALUE: [f32; 4] = [2.0, 3.5, 7.0, -7654321.0];

const WRITE_PROBE_VALUE: &str = r"
fn kernel_value(k: u32) -> vec4<f32> {
    return vec4<f32>(2.0, 3.5, 7.0, -7654321.0);
}
";

const COMPARE_PROBE_VALUE: &str = r"
fn kernel_value(k: u32) -> vec4<f32> {
    let expected = vec4<f32>(2.0, 3.5, 7.0, -7654321.0);
    if (all(read_probe(0u) == expected)) {
        return vec4<f32>(1.0, 1.0, 1.0, 1.0);
    }
    return vec4<f32>(0.0, 0.0, 0.0, 0.0);
}
";

/// Probe implementation running real kernels against a backend
///
/// Any backend error during a probe counts as probe failure: a platform that
/// cannot even build or run the test kernel certainly cannot be trusted with
/// the encoding under test.
pub struct BackendProbe<'a> {
    backend: &'a dyn KernelBackend,
}

impl<'a> BackendProbe<'a> {
    /// Wraps a backend for probing
    pub fn new(backend: &'a dyn KernelBackend) -> Self {
        Self { backend }
    }

    fn write_probe_value(&self, ctx: &CodecContext) -> Result<crate::backend::TexelBuffer, CoderError> {
        let kernel = PseudoKernel::new("write_probe_value", vec![], Outputs::vec4(), WRITE_PROBE_VALUE);
        let invocation = kernel.invoke_with(ctx, &[], vec![])?;
        let dest = self.backend.allocate(1, 1, PixelType::Float32)?;
        self.backend.run(&invocation, &dest)?;
        Ok(dest)
    }

    fn try_float_round_trip(&self) -> Result<bool, CoderError> {
        let ctx = CodecContext::fixed(&FLOAT_STRATEGY, &FLOAT_STRATEGY);
        let dest = self.write_probe_value(&ctx)?;
        let floats = self.backend.read_floats(&dest)?;
        Ok(floats == PROBE_VALUE)
    }

    fn try_float_compute_byte_read(&self) -> Result<bool, CoderError> {
        let float_ctx = CodecContext::fixed(&FLOAT_STRATEGY, &FLOAT_STRATEGY);
        let float_buffer = self.write_probe_value(&float_ctx)?;

        // Second kernel: sample the float buffer, compare, emit bytes.
        let ctx = CodecContext::fixed(&FLOAT_STRATEGY, &BYTE_STRATEGY);
        let kernel = PseudoKernel::new("compare_probe_value", vec![Inputs::vec4("probe")], Outputs::vec4(), COMPARE_PROBE_VALUE);
        let invocation = kernel.invoke_with(&ctx, &[KernelValue::Buffer(float_buffer)], vec![])?;

        let dest = self.backend.allocate(4, 1, PixelType::Byte8)?;
        self.backend.run(&invocation, &dest)?;

        let bytes = self.backend.read_bytes(&dest)?;
        let expected: Vec<u8> = 1.0f32.to_le_bytes().repeat(4);
        Ok(bytes == expected)
    }
}

impl CapabilityProbe for BackendProbe<'_> {
    fn float_round_trip_ok(&self) -> bool {
        self.try_float_round_trip().unwrap_or(false)
    }

    fn float_compute_byte_read_ok(&self) -> bool {
        self.try_float_compute_byte_read().unwrap_or(false)
    }
}

/// Chooses the (input, output) strategy pair from probe outcomes
///
/// Float round-trip pass selects float everywhere. Otherwise a passing
/// float-compute/byte-read probe keeps float inputs with byte-packed
/// output. If both fail, neither compute nor read-back is trusted in float
/// and byte-packed is used everywhere. Downgrades emit a warning.
pub fn select_shader_coders(probe: &dyn CapabilityProbe) -> (StrategyKind, StrategyKind) {
    if probe.float_round_trip_ok() {
        (StrategyKind::Float, StrategyKind::Float)
    } else if probe.float_compute_byte_read_ok() {
        tracing::warn!("float read-back is untrustworthy; using byte-packed output encoding");
        (StrategyKind::Float, StrategyKind::BytePacked)
    } else {
        tracing::warn!("float compute is untrustworthy; using byte-packed encoding everywhere");
        (StrategyKind::BytePacked, StrategyKind::BytePacked)
    }
}

/// Probes the platform and installs the selection into `cell`
pub fn init_shader_coders_in(cell: &CoderCell, probe: &dyn CapabilityProbe) -> CodecContext {
    let (input, output) = select_shader_coders(probe);
    cell.install(crate::strategy::strategy_for(input), crate::strategy::strategy_for(output));
    cell.context()
}

/// Probes the platform once at load time and installs the selection into the
/// process-wide state
pub fn init_shader_coders(probe: &dyn CapabilityProbe) -> CodecContext {
    init_shader_coders_in(&GLOBAL_CODER, probe)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coder::CoderCell;

    struct FakeProbe {
        round_trip: bool,
        byte_read: bool,
    }

    impl CapabilityProbe for FakeProbe {
        fn float_round_trip_ok(&self) -> bool {
            self.round_trip
        }

        fn float_compute_byte_read_ok(&self) -> bool {
            self.byte_read
        }
    }

    #[test]
    fn test_round_trip_pass_selects_float_everywhere() {
        let probe = FakeProbe {
            round_trip: true,
            byte_read: false,
        };
        assert_eq!(select_shader_coders(&probe), (StrategyKind::Float, StrategyKind::Float));
    }

    #[test]
    fn test_byte_read_pass_keeps_float_inputs() {
        let probe = FakeProbe {
            round_trip: false,
            byte_read: true,
        };
        assert_eq!(select_shader_coders(&probe), (StrategyKind::Float, StrategyKind::BytePacked));
    }

    #[test]
    fn test_both_failing_selects_byte_everywhere() {
        let probe = FakeProbe {
            round_trip: false,
            byte_read: false,
        };
        assert_eq!(select_shader_coders(&probe), (StrategyKind::BytePacked, StrategyKind::BytePacked));
    }

    #[test]
    fn test_init_installs_selection() {
        let cell = CoderCell::new();
        let probe = FakeProbe {
            round_trip: false,
            byte_read: true,
        };

        let ctx = init_shader_coders_in(&cell, &probe);
        assert_eq!(ctx.input.kind(), StrategyKind::Float);
        assert_eq!(ctx.output.kind(), StrategyKind::BytePacked);

        // Resolution now reflects the installed selection.
        let output = Outputs::vec4().resolve(&ctx, 0);
        assert_eq!(output.pixel(), PixelType::Byte8);
    }
}

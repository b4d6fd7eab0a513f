//! Kernel composition
//!
//! Links a list of fragments into one self-contained WGSL source: shared
//! helper libraries deduplicated and emitted first, then each fragment's own
//! source in list order, then a separator marker, then the caller's tail
//! code. The tail references the helper functions the fragments provide (the
//! `read_<name>(k)` convention for inputs, `kernel_value(k)` consumed by the
//! output fragment's entry point).

use crate::coder::CodecContext;
use crate::error::CoderError;
use crate::fragment::{FragmentDescription, KernelArg, KernelFragment, KernelValue};
use crate::strategy::StrategyKind;
use std::sync::Mutex;

/// Marker emitted between the linked fragments and the kernel tail
const BODY_SEPARATOR: &str = "// ---- kernel body ----\n";

/// Links resolved fragments and tail code into one kernel source
///
/// Library dependencies are deduplicated order-stable by first encounter, so
/// a library shared by several fragments appears exactly once. The result is
/// self-contained: no symbol is referenced beyond what the libraries,
/// fragments, and tail define.
pub fn combined_kernel_source(fragments: &[KernelFragment], tail: &str) -> String {
    let mut libraries: Vec<&'static str> = Vec::new();
    for fragment in fragments {
        for &library in fragment.libraries() {
            if !libraries.contains(&library) {
                libraries.push(library);
            }
        }
    }

    let mut source = String::new();
    for library in libraries {
        source.push_str(library);
    }
    for fragment in fragments {
        source.push_str(fragment.source());
    }
    source.push_str(BODY_SEPARATOR);
    source.push_str(tail);
    source
}

/// A configured, not-yet-executed kernel invocation
///
/// Produced by [`PseudoKernel::invoke`]; executed later by a
/// [`KernelBackend`](crate::backend::KernelBackend) against a concrete
/// destination buffer. Building an invocation performs no GPU work.
#[derive(Debug, Clone)]
pub struct KernelInvocation {
    /// Human-readable name for debugging
    pub label: String,
    /// Fully linked WGSL source
    pub source: String,
    /// Compute entry point within `source`
    pub entry_point: &'static str,
    /// Ordered group-0 binding arguments
    pub args: Vec<KernelArg>,
    /// The output fragment, carrying the destination's expected storage
    pub output: KernelFragment,
}

struct ComposedKernel {
    strategies: (StrategyKind, StrategyKind),
    generation: u64,
    source: String,
    inputs: Vec<KernelFragment>,
    output: KernelFragment,
}

/// A kernel built from input descriptions, one output description, and tail
/// code
///
/// Source construction is lazy: nothing is resolved or linked until the
/// first invocation, and the linked source is cached per strategy
/// generation. A strategy change bumps the context generation, which forces
/// recomposition, so an invocation can never mix fragments resolved against
/// different strategies.
pub struct PseudoKernel {
    label: String,
    inputs: Vec<FragmentDescription>,
    output: FragmentDescription,
    tail: String,
    composed: Mutex<Option<ComposedKernel>>,
}

impl PseudoKernel {
    /// Creates a kernel description from inputs, an output, and tail code
    pub fn new(label: impl Into<String>, inputs: Vec<FragmentDescription>, output: FragmentDescription, tail: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            inputs,
            output,
            tail: tail.into(),
            composed: Mutex::new(None),
        }
    }

    /// Returns the number of declared inputs
    pub fn arity(&self) -> usize {
        self.inputs.len()
    }

    /// Assembles an invocation against the process-wide current context
    pub fn invoke(&self, values: &[KernelValue], extra: Vec<KernelArg>) -> Result<KernelInvocation, CoderError> {
        self.invoke_with(&crate::coder::current_shader_coder(), values, extra)
    }

    /// Assembles an invocation against an explicit context
    ///
    /// Supplies one caller value per declared input, positionally, followed
    /// by any extra low-level arguments. This only builds the ordered
    /// argument list and captures the output fragment; nothing executes
    /// until a backend runs the returned invocation.
    pub fn invoke_with(&self, ctx: &CodecContext, values: &[KernelValue], extra: Vec<KernelArg>) -> Result<KernelInvocation, CoderError> {
        if values.len() != self.inputs.len() {
            return Err(CoderError::ArityMismatch {
                expected: self.inputs.len(),
                got: values.len(),
            });
        }

        let mut composed = self.composed.lock().unwrap();
        let key = (ctx.input.kind(), ctx.output.kind());
        let stale = match composed.as_ref() {
            Some(cached) => cached.strategies != key || cached.generation != ctx.generation,
            None => true,
        };
        if stale {
            let inputs: Vec<KernelFragment> = self.inputs.iter().enumerate().map(|(slot, description)| description.resolve(ctx, slot as u32)).collect();
            let output = self.output.resolve(ctx, 0);

            let mut fragments = inputs.clone();
            fragments.push(output.clone());
            let source = combined_kernel_source(&fragments, &self.tail);

            *composed = Some(ComposedKernel {
                strategies: key,
                generation: ctx.generation,
                source,
                inputs,
                output,
            });
        }
        let cached = composed.as_ref().unwrap();

        let mut args = Vec::new();
        for (fragment, value) in cached.inputs.iter().zip(values) {
            args.extend(fragment.build_args(value)?);
        }
        args.extend(extra);

        Ok(KernelInvocation {
            label: self.label.clone(),
            source: cached.source.clone(),
            entry_point: "main",
            args,
            output: cached.output.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::TexelBuffer;
    use crate::fragment::{Inputs, Outputs, VecKind};
    use crate::strategy::{BYTE_STRATEGY, FLOAT_STRATEGY, PACK_VEC2S_INTO_VEC4S, PixelType};

    fn float_ctx() -> CodecContext {
        CodecContext::fixed(&FLOAT_STRATEGY, &FLOAT_STRATEGY)
    }

    fn float_buffer(id: u64, width: u32) -> TexelBuffer {
        TexelBuffer {
            id,
            width,
            height: 1,
            pixel: PixelType::Float32,
        }
    }

    #[test]
    fn test_shared_libraries_appear_exactly_once() {
        let ctx = float_ctx();
        // Two float inputs both depend on the texel coordinate helper.
        let fragments = vec![
            Inputs::vec2("a").resolve(&ctx, 0),
            Inputs::vec2("b").resolve(&ctx, 1),
            Outputs::vec4().resolve(&ctx, 0),
        ];

        let source = combined_kernel_source(&fragments, "fn kernel_value(k: u32) -> vec4<f32> { return vec4<f32>(read_a(k), read_b(k)); }");
        assert_eq!(source.matches("fn texel_coord").count(), 1);
        assert_eq!(source.matches("fn read_a").count(), 1);
        assert_eq!(source.matches("fn read_b").count(), 1);
    }

    #[test]
    fn test_fragment_order_and_separator() {
        let ctx = float_ctx();
        let fragments = vec![Inputs::vec2("first").resolve(&ctx, 0), Inputs::vec4("second").resolve(&ctx, 1), Outputs::vec2().resolve(&ctx, 0)];

        let source = combined_kernel_source(&fragments, "fn kernel_value(k: u32) -> vec2<f32> { return read_first(k); }");
        let first = source.find("fn read_first").unwrap();
        let second = source.find("fn read_second").unwrap();
        let entry = source.find("fn main").unwrap();
        let separator = source.find("// ---- kernel body ----").unwrap();
        let tail = source.find("fn kernel_value").unwrap();

        assert!(first < second && second < entry && entry < separator && separator < tail);
    }

    #[test]
    fn test_invoke_assembles_args_in_declaration_order() {
        let ctx = float_ctx();
        let kernel = PseudoKernel::new(
            "two_inputs",
            vec![Inputs::vec2("a"), Inputs::vec2("b")],
            Outputs::vec4(),
            "fn kernel_value(k: u32) -> vec4<f32> { return vec4<f32>(read_a(k), read_b(k)); }",
        );

        let a = float_buffer(1, 4);
        let b = float_buffer(2, 4);
        let extra = KernelArg::uniform_f32(2, 0.5);
        let invocation = kernel
            .invoke_with(&ctx, &[KernelValue::Buffer(a.clone()), KernelValue::Buffer(b.clone())], vec![extra.clone()])
            .unwrap();

        assert_eq!(
            invocation.args,
            vec![KernelArg::Texture { slot: 0, buffer: a }, KernelArg::Texture { slot: 1, buffer: b }, extra]
        );
        assert_eq!(invocation.entry_point, "main");
        assert_eq!(invocation.output.kind(), VecKind::Vec4);
    }

    #[test]
    fn test_invoke_rejects_wrong_arity() {
        let ctx = float_ctx();
        let kernel = PseudoKernel::new("one_input", vec![Inputs::vec2("source")], Outputs::vec4(), PACK_VEC2S_INTO_VEC4S);

        let err = kernel.invoke_with(&ctx, &[], vec![]).unwrap_err();
        assert!(matches!(err, CoderError::ArityMismatch { expected: 1, got: 0 }));
    }

    #[test]
    fn test_strategy_change_forces_recomposition() {
        let kernel = PseudoKernel::new("switchable", vec![Inputs::vec2("source")], Outputs::vec4(), PACK_VEC2S_INTO_VEC4S);

        let float_ctx = CodecContext::fixed(&FLOAT_STRATEGY, &FLOAT_STRATEGY);
        let buffer = float_buffer(1, 8);
        let before = kernel.invoke_with(&float_ctx, &[KernelValue::Buffer(buffer)], vec![]).unwrap();
        assert!(before.source.contains("rgba32float"));

        // Same pseudo-kernel, new strategy generation: the linked source
        // must reflect the new strategy, not the cached one.
        let mut byte_ctx = CodecContext::fixed(&BYTE_STRATEGY, &BYTE_STRATEGY);
        byte_ctx.generation = float_ctx.generation + 1;
        let byte_buffer = TexelBuffer {
            id: 2,
            width: 16,
            height: 1,
            pixel: PixelType::Byte8,
        };
        let after = kernel.invoke_with(&byte_ctx, &[KernelValue::Buffer(byte_buffer)], vec![]).unwrap();

        assert!(after.source.contains("rgba8unorm"));
        assert!(after.source.contains("decode_f32_bytes"));
        assert_ne!(before.source, after.source);
    }
}

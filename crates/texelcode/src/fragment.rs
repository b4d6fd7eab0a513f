//! Kernel fragments and their lazily-resolved descriptions
//!
//! A [`KernelFragment`] is one atomic piece of WGSL source providing either a
//! named input binding or the single output binding of a kernel, together
//! with the helper libraries it depends on. The same semantic fragment (for
//! example "a vec2 input") compiles to different WGSL depending on the active
//! encoding strategy, so fragments are usually carried around as
//! [`FragmentDescription`]s and resolved late, once the strategy is known.

use crate::backend::TexelBuffer;
use crate::coder::CodecContext;
use crate::error::CoderError;
use crate::strategy::PixelType;

/// Semantic component width of an input or output
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VecKind {
    /// Two-component numeric vector
    Vec2,
    /// Four-component numeric vector
    Vec4,
    /// Single boolean flag
    Bool,
}

impl VecKind {
    /// Returns the WGSL-facing name of this kind
    pub fn label(&self) -> &'static str {
        match self {
            VecKind::Vec2 => "vec2",
            VecKind::Vec4 => "vec4",
            VecKind::Bool => "bool",
        }
    }
}

/// Whether a fragment provides a named input or the kernel's output binding
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FragmentRole {
    /// A named input; multiple inputs coexist in one kernel and each binds
    /// to a distinct caller-supplied value
    Input(String),
    /// The single output target of a kernel
    Output,
}

/// A caller-supplied value bound to one declared input
#[derive(Debug, Clone)]
pub enum KernelValue {
    /// A GPU-resident texel buffer, read through the input's decode helper
    Buffer(TexelBuffer),
    /// A boolean flag, passed as a uniform
    Bool(bool),
}

/// A concrete invocation argument produced by argument building
#[derive(Debug, Clone, PartialEq)]
pub enum KernelArg {
    /// Bind a texel buffer as a sampled texture at the given group-0 slot
    Texture {
        /// Binding slot within group 0
        slot: u32,
        /// The buffer to bind
        buffer: TexelBuffer,
    },
    /// Bind raw bytes as a uniform buffer at the given group-0 slot
    Uniform {
        /// Binding slot within group 0
        slot: u32,
        /// Little-endian uniform contents
        data: Vec<u8>,
    },
}

impl KernelArg {
    /// Builds a uniform argument holding one f32 scalar
    pub fn uniform_f32(slot: u32, value: f32) -> Self {
        KernelArg::Uniform {
            slot,
            data: value.to_le_bytes().to_vec(),
        }
    }

    /// Builds a uniform argument holding one u32 scalar
    pub fn uniform_u32(slot: u32, value: u32) -> Self {
        KernelArg::Uniform {
            slot,
            data: value.to_le_bytes().to_vec(),
        }
    }
}

/// An atomic, named piece of kernel source plus its library dependencies
///
/// Immutable once constructed. Owned by whichever description created it and
/// not shared beyond one kernel build.
#[derive(Debug, Clone)]
pub struct KernelFragment {
    role: FragmentRole,
    kind: VecKind,
    slot: u32,
    pixel: PixelType,
    source: String,
    libraries: Vec<&'static str>,
}

impl KernelFragment {
    pub(crate) fn input(kind: VecKind, name: &str, slot: u32, pixel: PixelType, source: String, libraries: Vec<&'static str>) -> Self {
        Self {
            role: FragmentRole::Input(name.to_string()),
            kind,
            slot,
            pixel,
            source,
            libraries,
        }
    }

    pub(crate) fn output(kind: VecKind, pixel: PixelType, source: &str, libraries: Vec<&'static str>) -> Self {
        Self {
            role: FragmentRole::Output,
            kind,
            slot: 0,
            pixel,
            source: source.to_string(),
            libraries,
        }
    }

    /// Returns whether this fragment is a named input or the output
    pub fn role(&self) -> &FragmentRole {
        &self.role
    }

    /// Returns the semantic component width of this fragment
    pub fn kind(&self) -> VecKind {
        self.kind
    }

    /// Returns the texel storage this fragment reads or writes
    pub fn pixel(&self) -> PixelType {
        self.pixel
    }

    /// Returns the WGSL source of this fragment
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Returns the helper libraries this fragment depends on
    pub fn libraries(&self) -> &[&'static str] {
        &self.libraries
    }

    /// Converts a caller value into the ordered invocation arguments this
    /// fragment requires
    ///
    /// A value of the wrong kind, or a buffer allocated with mismatching
    /// texel storage, is a programming error and fails immediately.
    pub fn build_args(&self, value: &KernelValue) -> Result<Vec<KernelArg>, CoderError> {
        let name = match &self.role {
            FragmentRole::Input(name) => name.as_str(),
            FragmentRole::Output => "output",
        };

        match (self.kind, value) {
            (VecKind::Bool, KernelValue::Bool(flag)) => Ok(vec![KernelArg::uniform_u32(self.slot, u32::from(*flag))]),
            (VecKind::Vec2 | VecKind::Vec4, KernelValue::Buffer(buffer)) => {
                if buffer.pixel != self.pixel {
                    return Err(CoderError::PixelMismatch {
                        expected: self.pixel,
                        got: buffer.pixel,
                    });
                }
                Ok(vec![KernelArg::Texture {
                    slot: self.slot,
                    buffer: buffer.clone(),
                }])
            }
            (VecKind::Bool, _) => Err(CoderError::KindMismatch {
                input: name.to_string(),
                expected: "boolean",
            }),
            (VecKind::Vec2 | VecKind::Vec4, _) => Err(CoderError::KindMismatch {
                input: name.to_string(),
                expected: "texel buffer",
            }),
        }
    }
}

/// A lazily-resolved wrapper around a fragment constructor
///
/// Resolution is deferred until the active encoding strategy is known. A
/// `Fixed` description passes its already-concrete fragment through
/// unchanged; a `Deferred` one materializes the fragment for the strategy it
/// is resolved against.
#[derive(Debug, Clone)]
pub enum FragmentDescription {
    /// An already-concrete fragment
    Fixed(KernelFragment),
    /// A fragment constructor awaiting a strategy
    Deferred {
        /// Semantic component width
        kind: VecKind,
        /// Input name or output marker
        role: FragmentRole,
    },
}

impl FragmentDescription {
    /// Resolves this description against the strategies in `ctx`
    ///
    /// Inputs resolve against the context's input strategy; outputs always
    /// resolve against the output strategy, uniformly for every kind, since
    /// input and output encodings may legitimately differ. `slot` is the
    /// group-0 binding index assigned by the composer from declaration order.
    pub fn resolve(&self, ctx: &CodecContext, slot: u32) -> KernelFragment {
        match self {
            FragmentDescription::Fixed(fragment) => fragment.clone(),
            FragmentDescription::Deferred {
                kind,
                role: FragmentRole::Input(name),
            } => ctx.input.input_fragment(*kind, name, slot),
            FragmentDescription::Deferred {
                kind,
                role: FragmentRole::Output,
            } => ctx.output.output_fragment(*kind),
        }
    }

    /// Returns the input name of this description, if it describes an input
    pub fn input_name(&self) -> Option<&str> {
        match self {
            FragmentDescription::Fixed(fragment) => match fragment.role() {
                FragmentRole::Input(name) => Some(name),
                FragmentRole::Output => None,
            },
            FragmentDescription::Deferred {
                role: FragmentRole::Input(name),
                ..
            } => Some(name),
            FragmentDescription::Deferred { role: FragmentRole::Output, .. } => None,
        }
    }
}

/// Constructors for named input descriptions
pub struct Inputs;

impl Inputs {
    /// Describes a two-component input named `name`
    pub fn vec2(name: impl Into<String>) -> FragmentDescription {
        FragmentDescription::Deferred {
            kind: VecKind::Vec2,
            role: FragmentRole::Input(name.into()),
        }
    }

    /// Describes a four-component input named `name`
    pub fn vec4(name: impl Into<String>) -> FragmentDescription {
        FragmentDescription::Deferred {
            kind: VecKind::Vec4,
            role: FragmentRole::Input(name.into()),
        }
    }

    /// Describes a boolean input named `name`
    pub fn boolean(name: impl Into<String>) -> FragmentDescription {
        FragmentDescription::Deferred {
            kind: VecKind::Bool,
            role: FragmentRole::Input(name.into()),
        }
    }
}

/// Constructors for the single unnamed output description
pub struct Outputs;

impl Outputs {
    /// Describes a two-component output
    pub fn vec2() -> FragmentDescription {
        FragmentDescription::Deferred {
            kind: VecKind::Vec2,
            role: FragmentRole::Output,
        }
    }

    /// Describes a four-component output
    pub fn vec4() -> FragmentDescription {
        FragmentDescription::Deferred {
            kind: VecKind::Vec4,
            role: FragmentRole::Output,
        }
    }

    /// Describes a boolean output
    pub fn boolean() -> FragmentDescription {
        FragmentDescription::Deferred {
            kind: VecKind::Bool,
            role: FragmentRole::Output,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coder::CodecContext;
    use crate::strategy::{BYTE_STRATEGY, FLOAT_STRATEGY};

    #[test]
    fn test_input_resolution_follows_input_strategy() {
        let ctx = CodecContext::fixed(&FLOAT_STRATEGY, &BYTE_STRATEGY);

        let input = Inputs::vec2("values").resolve(&ctx, 0);
        assert_eq!(input.kind(), VecKind::Vec2);
        assert_eq!(input.pixel(), PixelType::Float32);
        assert!(input.source().contains("read_values"));

        // The output side diverges: it always uses the output strategy.
        let output = Outputs::vec4().resolve(&ctx, 0);
        assert_eq!(output.pixel(), PixelType::Byte8);
        assert!(output.source().contains("rgba8unorm"));
    }

    #[test]
    fn test_fixed_description_passes_through() {
        let ctx = CodecContext::fixed(&FLOAT_STRATEGY, &FLOAT_STRATEGY);
        let concrete = FLOAT_STRATEGY.input_fragment(VecKind::Vec4, "fixed", 3);
        let source = concrete.source().to_string();

        let resolved = FragmentDescription::Fixed(concrete).resolve(&ctx, 7);
        assert_eq!(resolved.source(), source);
    }

    #[test]
    fn test_build_args_binds_buffer_at_declared_slot() {
        let fragment = FLOAT_STRATEGY.input_fragment(VecKind::Vec2, "a", 2);
        let buffer = TexelBuffer {
            id: 9,
            width: 4,
            height: 1,
            pixel: PixelType::Float32,
        };

        let args = fragment.build_args(&KernelValue::Buffer(buffer.clone())).unwrap();
        assert_eq!(args, vec![KernelArg::Texture { slot: 2, buffer }]);
    }

    #[test]
    fn test_build_args_rejects_mismatched_kinds() {
        let fragment = FLOAT_STRATEGY.input_fragment(VecKind::Vec2, "a", 0);
        let err = fragment.build_args(&KernelValue::Bool(true)).unwrap_err();
        assert!(matches!(err, CoderError::KindMismatch { .. }));

        let flag = FLOAT_STRATEGY.input_fragment(VecKind::Bool, "flag", 1);
        let args = flag.build_args(&KernelValue::Bool(true)).unwrap();
        assert_eq!(args, vec![KernelArg::uniform_u32(1, 1)]);
    }

    #[test]
    fn test_build_args_rejects_mismatched_pixel_storage() {
        let fragment = FLOAT_STRATEGY.input_fragment(VecKind::Vec4, "a", 0);
        let buffer = TexelBuffer {
            id: 1,
            width: 4,
            height: 1,
            pixel: PixelType::Byte8,
        };

        let err = fragment.build_args(&KernelValue::Buffer(buffer)).unwrap_err();
        assert!(matches!(err, CoderError::PixelMismatch { .. }));
    }
}

//! Probed texel-encoding strategies and composable WGSL compute kernels
//!
//! This crate builds executable GPU compute kernels from small reusable
//! input/output fragments, and abstracts over two incompatible ways of
//! moving numeric vectors between CPU memory and GPU textures. The host
//! GPU/driver is untrusted at startup: some platforms round-trip full
//! floating-point precision through render targets, some compute in float
//! but only read back bytes reliably, and some cannot use float targets at
//! all. Capability probes decide empirically which encoding strategy to
//! install, and kernel builders never need to know which one is active.

pub mod backend;

mod coder;
mod compose;
mod error;
mod fragment;
mod probe;
mod strategy;

pub use coder::{CodecContext, CoderCell, GLOBAL_CODER, can_test_float_shaders, change_shader_coder, current_shader_coder, output_shader_coder};
pub use compose::{KernelInvocation, PseudoKernel, combined_kernel_source};
pub use error::CoderError;
pub use fragment::{FragmentDescription, FragmentRole, Inputs, KernelArg, KernelFragment, KernelValue, Outputs, VecKind};
pub use probe::{BackendProbe, CapabilityProbe, init_shader_coders, init_shader_coders_in, select_shader_coders};
pub use strategy::{BYTE_STRATEGY, EncodingStrategy, FLOAT_STRATEGY, PACK_VEC2S_INTO_VEC4S, PixelType, StrategyKind, Vec2Codec, Vec4Codec, strategy_for};

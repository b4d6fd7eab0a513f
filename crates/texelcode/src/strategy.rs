//! Texel encoding strategies
//!
//! Exactly two strategies exist. The full-float strategy stores values
//! directly as IEEE-754 channels of `rgba32float` texels; packing and
//! unpacking are byte reinterpretations. The byte-packed strategy splits
//! every f32 into the four 8-bit channels of an `rgba8unorm` texel
//! (little-endian IEEE-754 bytes), trading extra texels for working on
//! platforms that cannot round-trip float render targets.
//!
//! Each strategy bundles the fragment constructors for vec2/vec4/bool inputs
//! and outputs, the CPU-side codecs, the storage-overhead accounting used for
//! capacity planning, the pixel storage tag consumed by buffer allocation,
//! and the vec2-into-vec4 buffer-compaction hook.

use crate::backend::{KernelBackend, TexelBuffer};
use crate::coder::CodecContext;
use crate::compose::PseudoKernel;
use crate::error::CoderError;
use crate::fragment::{Inputs, KernelFragment, KernelValue, Outputs, VecKind};
use std::sync::LazyLock;

/// Tag selecting one of the two encoding disciplines
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrategyKind {
    /// Values live directly in float texel channels
    Float,
    /// Values are split into 8-bit channels
    BytePacked,
}

/// Texel storage tag consumed by the buffer-allocation collaborator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelType {
    /// Four f32 channels per texel (`rgba32float`)
    Float32,
    /// Four 8-bit normalized channels per texel (`rgba8unorm`)
    Byte8,
}

impl PixelType {
    /// Returns the wgpu texture format buffers of this storage use
    pub fn texture_format(&self) -> wgpu::TextureFormat {
        match self {
            PixelType::Float32 => wgpu::TextureFormat::Rgba32Float,
            PixelType::Byte8 => wgpu::TextureFormat::Rgba8Unorm,
        }
    }

    /// Returns the byte width of one texel
    pub fn bytes_per_texel(&self) -> u32 {
        match self {
            PixelType::Float32 => 16,
            PixelType::Byte8 => 4,
        }
    }

    /// Returns the WGSL storage-texture format name
    pub fn storage_format(&self) -> &'static str {
        match self {
            PixelType::Float32 => "rgba32float",
            PixelType::Byte8 => "rgba8unorm",
        }
    }
}

/// Shared helper mapping a logical index to a texel coordinate
pub(crate) const LIB_TEXEL_COORD: &str = r"
fn texel_coord(k: u32, dims: vec2<u32>) -> vec2<u32> {
    return vec2<u32>(k % dims.x, k / dims.x);
}
";

/// Shared helper reassembling an f32 from four normalized byte channels
pub(crate) const LIB_BYTE_DECODE: &str = r"
fn decode_f32_bytes(t: vec4<f32>) -> f32 {
    let b = vec4<u32>(round(t * 255.0));
    return bitcast<f32>(b.x | (b.y << 8u) | (b.z << 16u) | (b.w << 24u));
}
";

/// Shared helper splitting an f32 into four normalized byte channels
pub(crate) const LIB_BYTE_ENCODE: &str = r"
fn encode_f32_bytes(x: f32) -> vec4<f32> {
    let bits = bitcast<u32>(x);
    let b = vec4<u32>(bits & 0xffu, (bits >> 8u) & 0xffu, (bits >> 16u) & 0xffu, (bits >> 24u) & 0xffu);
    return vec4<f32>(b) / 255.0;
}
";

/// Tail code of the vec2-into-vec4 repacking kernel
///
/// Reads two consecutive logical indices from the input named `source` and
/// writes them as one four-channel texel.
pub const PACK_VEC2S_INTO_VEC4S: &str = r"
fn kernel_value(k: u32) -> vec4<f32> {
    return vec4<f32>(read_source(2u * k), read_source(2u * k + 1u));
}
";

const FLOAT_OUT_VEC2_SRC: &str = r"
@group(1) @binding(0) var dest: texture_storage_2d<rgba32float, write>;

@compute @workgroup_size(8, 8)
fn main(@builtin(global_invocation_id) gid: vec3<u32>) {
    let dims = textureDimensions(dest);
    if (gid.x >= dims.x || gid.y >= dims.y) {
        return;
    }
    let k = gid.y * dims.x + gid.x;
    textureStore(dest, vec2<u32>(gid.xy), vec4<f32>(kernel_value(k), 0.0, 0.0));
}
";

const FLOAT_OUT_VEC4_SRC: &str = r"
@group(1) @binding(0) var dest: texture_storage_2d<rgba32float, write>;

@compute @workgroup_size(8, 8)
fn main(@builtin(global_invocation_id) gid: vec3<u32>) {
    let dims = textureDimensions(dest);
    if (gid.x >= dims.x || gid.y >= dims.y) {
        return;
    }
    let k = gid.y * dims.x + gid.x;
    textureStore(dest, vec2<u32>(gid.xy), kernel_value(k));
}
";

const FLOAT_OUT_BOOL_SRC: &str = r"
@group(1) @binding(0) var dest: texture_storage_2d<rgba32float, write>;

@compute @workgroup_size(8, 8)
fn main(@builtin(global_invocation_id) gid: vec3<u32>) {
    let dims = textureDimensions(dest);
    if (gid.x >= dims.x || gid.y >= dims.y) {
        return;
    }
    let k = gid.y * dims.x + gid.x;
    textureStore(dest, vec2<u32>(gid.xy), vec4<f32>(select(0.0, 1.0, kernel_value(k)), 0.0, 0.0, 0.0));
}
";

const BYTE_OUT_VEC2_SRC: &str = r"
@group(1) @binding(0) var dest: texture_storage_2d<rgba8unorm, write>;

@compute @workgroup_size(8, 8)
fn main(@builtin(global_invocation_id) gid: vec3<u32>) {
    let dims = textureDimensions(dest);
    if (gid.x >= dims.x || gid.y >= dims.y) {
        return;
    }
    let k = gid.y * dims.x + gid.x;
    var value = kernel_value(k / 2u);
    textureStore(dest, vec2<u32>(gid.xy), encode_f32_bytes(value[k % 2u]));
}
";

const BYTE_OUT_VEC4_SRC: &str = r"
@group(1) @binding(0) var dest: texture_storage_2d<rgba8unorm, write>;

@compute @workgroup_size(8, 8)
fn main(@builtin(global_invocation_id) gid: vec3<u32>) {
    let dims = textureDimensions(dest);
    if (gid.x >= dims.x || gid.y >= dims.y) {
        return;
    }
    let k = gid.y * dims.x + gid.x;
    var value = kernel_value(k / 4u);
    textureStore(dest, vec2<u32>(gid.xy), encode_f32_bytes(value[k % 4u]));
}
";

const BYTE_OUT_BOOL_SRC: &str = r"
@group(1) @binding(0) var dest: texture_storage_2d<rgba8unorm, write>;

@compute @workgroup_size(8, 8)
fn main(@builtin(global_invocation_id) gid: vec3<u32>) {
    let dims = textureDimensions(dest);
    if (gid.x >= dims.x || gid.y >= dims.y) {
        return;
    }
    let k = gid.y * dims.x + gid.x;
    textureStore(dest, vec2<u32>(gid.xy), encode_f32_bytes(select(0.0, 1.0, kernel_value(k))));
}
";

// Output fragments take no name parameter, so each strategy materializes
// them once rather than per call.
static FLOAT_OUT_VEC2: LazyLock<KernelFragment> = LazyLock::new(|| KernelFragment::output(VecKind::Vec2, PixelType::Float32, FLOAT_OUT_VEC2_SRC, vec![]));
static FLOAT_OUT_VEC4: LazyLock<KernelFragment> = LazyLock::new(|| KernelFragment::output(VecKind::Vec4, PixelType::Float32, FLOAT_OUT_VEC4_SRC, vec![]));
static FLOAT_OUT_BOOL: LazyLock<KernelFragment> = LazyLock::new(|| KernelFragment::output(VecKind::Bool, PixelType::Float32, FLOAT_OUT_BOOL_SRC, vec![]));
static BYTE_OUT_VEC2: LazyLock<KernelFragment> = LazyLock::new(|| KernelFragment::output(VecKind::Vec2, PixelType::Byte8, BYTE_OUT_VEC2_SRC, vec![LIB_BYTE_ENCODE]));
static BYTE_OUT_VEC4: LazyLock<KernelFragment> = LazyLock::new(|| KernelFragment::output(VecKind::Vec4, PixelType::Byte8, BYTE_OUT_VEC4_SRC, vec![LIB_BYTE_ENCODE]));
static BYTE_OUT_BOOL: LazyLock<KernelFragment> = LazyLock::new(|| KernelFragment::output(VecKind::Bool, PixelType::Byte8, BYTE_OUT_BOOL_SRC, vec![LIB_BYTE_ENCODE]));

/// One complete, self-consistent encoding discipline
///
/// Immutable after construction; the only two instances are
/// [`FLOAT_STRATEGY`] and [`BYTE_STRATEGY`].
#[derive(Debug)]
pub struct EncodingStrategy {
    kind: StrategyKind,
}

/// The full-float strategy: values stored directly as float texel channels
pub static FLOAT_STRATEGY: EncodingStrategy = EncodingStrategy { kind: StrategyKind::Float };

/// The byte-packed strategy: values split into 8-bit channels
pub static BYTE_STRATEGY: EncodingStrategy = EncodingStrategy { kind: StrategyKind::BytePacked };

/// Returns the strategy singleton for a kind tag
pub fn strategy_for(kind: StrategyKind) -> &'static EncodingStrategy {
    match kind {
        StrategyKind::Float => &FLOAT_STRATEGY,
        StrategyKind::BytePacked => &BYTE_STRATEGY,
    }
}

impl EncodingStrategy {
    /// Returns which discipline this strategy implements
    pub fn kind(&self) -> StrategyKind {
        self.kind
    }

    /// Returns the texel storage buffers under this strategy use
    pub fn pixel_type(&self) -> PixelType {
        match self.kind {
            StrategyKind::Float => PixelType::Float32,
            StrategyKind::BytePacked => PixelType::Byte8,
        }
    }

    /// Returns how many texels one logical element of `kind` occupies
    pub fn texels_per_element(&self, kind: VecKind) -> u32 {
        match (self.kind, kind) {
            (StrategyKind::Float, _) => 1,
            (StrategyKind::BytePacked, VecKind::Vec2) => 2,
            (StrategyKind::BytePacked, VecKind::Vec4) => 4,
            (StrategyKind::BytePacked, VecKind::Bool) => 1,
        }
    }

    /// Returns the log2 storage overhead this encoding imposes on
    /// array-backed buffers of `kind` elements
    pub fn power_size_overhead(&self, kind: VecKind) -> u32 {
        match (self.kind, kind) {
            (StrategyKind::Float, _) => 0,
            (StrategyKind::BytePacked, VecKind::Vec2) => 1,
            (StrategyKind::BytePacked, VecKind::Vec4) => 2,
            (StrategyKind::BytePacked, VecKind::Bool) => 0,
        }
    }

    /// Materializes the input fragment for `kind`, bound at group-0 `slot`
    ///
    /// The fragment declares the texture or uniform binding and a
    /// `read_<name>` helper following the "read value at index k" convention.
    pub fn input_fragment(&self, kind: VecKind, name: &str, slot: u32) -> KernelFragment {
        let (source, libraries) = match (self.kind, kind) {
            (_, VecKind::Bool) => (
                format!(
                    "\n@group(0) @binding({slot}) var<uniform> flag_{name}: u32;\n\nfn read_{name}() -> bool {{\n    return flag_{name} != 0u;\n}}\n"
                ),
                vec![],
            ),
            (StrategyKind::Float, VecKind::Vec2) => (
                format!(
                    "\n@group(0) @binding({slot}) var tex_{name}: texture_2d<f32>;\n\nfn read_{name}(k: u32) -> vec2<f32> {{\n    return textureLoad(tex_{name}, texel_coord(k, textureDimensions(tex_{name})), 0).xy;\n}}\n"
                ),
                vec![LIB_TEXEL_COORD],
            ),
            (StrategyKind::Float, VecKind::Vec4) => (
                format!(
                    "\n@group(0) @binding({slot}) var tex_{name}: texture_2d<f32>;\n\nfn read_{name}(k: u32) -> vec4<f32> {{\n    return textureLoad(tex_{name}, texel_coord(k, textureDimensions(tex_{name})), 0);\n}}\n"
                ),
                vec![LIB_TEXEL_COORD],
            ),
            (StrategyKind::BytePacked, VecKind::Vec2) => (
                format!(
                    "\n@group(0) @binding({slot}) var tex_{name}: texture_2d<f32>;\n\nfn read_{name}(k: u32) -> vec2<f32> {{\n    let dims = textureDimensions(tex_{name});\n    let lo = textureLoad(tex_{name}, texel_coord(2u * k, dims), 0);\n    let hi = textureLoad(tex_{name}, texel_coord(2u * k + 1u, dims), 0);\n    return vec2<f32>(decode_f32_bytes(lo), decode_f32_bytes(hi));\n}}\n"
                ),
                vec![LIB_TEXEL_COORD, LIB_BYTE_DECODE],
            ),
            (StrategyKind::BytePacked, VecKind::Vec4) => (
                format!(
                    "\n@group(0) @binding({slot}) var tex_{name}: texture_2d<f32>;\n\nfn read_{name}(k: u32) -> vec4<f32> {{\n    let dims = textureDimensions(tex_{name});\n    return vec4<f32>(\n        decode_f32_bytes(textureLoad(tex_{name}, texel_coord(4u * k, dims), 0)),\n        decode_f32_bytes(textureLoad(tex_{name}, texel_coord(4u * k + 1u, dims), 0)),\n        decode_f32_bytes(textureLoad(tex_{name}, texel_coord(4u * k + 2u, dims), 0)),\n        decode_f32_bytes(textureLoad(tex_{name}, texel_coord(4u * k + 3u, dims), 0)));\n}}\n"
                ),
                vec![LIB_TEXEL_COORD, LIB_BYTE_DECODE],
            ),
        };

        KernelFragment::input(kind, name, slot, self.pixel_type(), source, libraries)
    }

    /// Returns the output fragment for `kind`
    ///
    /// The fragment declares the group-1 destination binding and the compute
    /// entry point; the kernel tail supplies `kernel_value(k)`.
    pub fn output_fragment(&self, kind: VecKind) -> KernelFragment {
        let fragment: &LazyLock<KernelFragment> = match (self.kind, kind) {
            (StrategyKind::Float, VecKind::Vec2) => &FLOAT_OUT_VEC2,
            (StrategyKind::Float, VecKind::Vec4) => &FLOAT_OUT_VEC4,
            (StrategyKind::Float, VecKind::Bool) => &FLOAT_OUT_BOOL,
            (StrategyKind::BytePacked, VecKind::Vec2) => &BYTE_OUT_VEC2,
            (StrategyKind::BytePacked, VecKind::Vec4) => &BYTE_OUT_VEC4,
            (StrategyKind::BytePacked, VecKind::Bool) => &BYTE_OUT_BOOL,
        };
        (**fragment).clone()
    }

    /// Repacks a buffer of two-component values into four-component texels
    ///
    /// Under the float strategy this runs the [`PACK_VEC2S_INTO_VEC4S`]
    /// kernel, producing a new buffer with half the texels. Under the
    /// byte-packed strategy the representation is already channel-packed at
    /// the byte level and the buffer is returned unchanged.
    pub fn compact_vec2s(&'static self, backend: &dyn KernelBackend, buffer: &TexelBuffer) -> Result<TexelBuffer, CoderError> {
        match self.kind {
            StrategyKind::BytePacked => Ok(buffer.clone()),
            StrategyKind::Float => {
                let ctx = CodecContext::fixed(self, self);
                let kernel = PseudoKernel::new("pack_vec2s_into_vec4s", vec![Inputs::vec2("source")], Outputs::vec4(), PACK_VEC2S_INTO_VEC4S);
                let invocation = kernel.invoke_with(&ctx, &[KernelValue::Buffer(buffer.clone())], vec![])?;

                let dest = backend.allocate(buffer.texel_count().div_ceil(2), 1, PixelType::Float32)?;
                backend.run(&invocation, &dest)?;
                Ok(dest)
            }
        }
    }
}

/// CPU-side conversion between two-component vectors and buffer bytes
pub trait Vec2Codec {
    /// Packs scalars, two per logical element, into buffer bytes
    fn pack_vec2s(&self, values: &[f32]) -> Vec<u8>;
    /// Unpacks buffer bytes back into scalars
    fn unpack_vec2s(&self, bytes: &[u8]) -> Vec<f32>;
}

/// CPU-side conversion between four-component vectors and buffer bytes
pub trait Vec4Codec {
    /// Packs scalars, four per logical element, into buffer bytes
    fn pack_vec4s(&self, values: &[f32]) -> Vec<u8>;
    /// Unpacks buffer bytes back into scalars
    fn unpack_vec4s(&self, bytes: &[u8]) -> Vec<f32>;
}

impl Vec2Codec for EncodingStrategy {
    fn pack_vec2s(&self, values: &[f32]) -> Vec<u8> {
        match self.kind {
            // One logical vec2 per texel, stored in .xy with .zw zeroed.
            StrategyKind::Float => {
                let mut texels = Vec::with_capacity(values.len() * 2);
                for pair in values.chunks(2) {
                    texels.push(pair[0]);
                    texels.push(*pair.get(1).unwrap_or(&0.0));
                    texels.push(0.0);
                    texels.push(0.0);
                }
                texels.iter().flat_map(|f| f.to_le_bytes()).collect()
            }
            StrategyKind::BytePacked => pack_ieee_bytes(values),
        }
    }

    fn unpack_vec2s(&self, bytes: &[u8]) -> Vec<f32> {
        match self.kind {
            StrategyKind::Float => {
                let texels: Vec<f32> = bytemuck::pod_collect_to_vec(bytes);
                texels.chunks_exact(4).flat_map(|texel| [texel[0], texel[1]]).collect()
            }
            StrategyKind::BytePacked => unpack_ieee_bytes(bytes),
        }
    }
}

impl Vec4Codec for EncodingStrategy {
    fn pack_vec4s(&self, values: &[f32]) -> Vec<u8> {
        match self.kind {
            // Identity reinterpretation: one logical vec4 per texel.
            StrategyKind::Float => pack_ieee_bytes(values),
            StrategyKind::BytePacked => pack_ieee_bytes(values),
        }
    }

    fn unpack_vec4s(&self, bytes: &[u8]) -> Vec<f32> {
        match self.kind {
            StrategyKind::Float => bytemuck::pod_collect_to_vec(bytes),
            StrategyKind::BytePacked => unpack_ieee_bytes(bytes),
        }
    }
}

fn pack_ieee_bytes(values: &[f32]) -> Vec<u8> {
    values.iter().flat_map(|f| f.to_le_bytes()).collect()
}

fn unpack_ieee_bytes(bytes: &[u8]) -> Vec<f32> {
    bytes.chunks_exact(4).map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]])).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compose::KernelInvocation;
    use std::cell::{Cell, RefCell};

    /// Fake backend recording allocations and executed invocations
    struct RecordingBackend {
        next_id: Cell<u64>,
        allocations: RefCell<Vec<(u32, u32, PixelType)>>,
        runs: RefCell<Vec<(String, String, u64)>>,
    }

    impl RecordingBackend {
        fn new() -> Self {
            Self {
                next_id: Cell::new(100),
                allocations: RefCell::new(Vec::new()),
                runs: RefCell::new(Vec::new()),
            }
        }
    }

    impl KernelBackend for RecordingBackend {
        fn allocate(&self, width: u32, height: u32, pixel: PixelType) -> Result<TexelBuffer, CoderError> {
            let id = self.next_id.get();
            self.next_id.set(id + 1);
            self.allocations.borrow_mut().push((width, height, pixel));
            Ok(TexelBuffer { id, width, height, pixel })
        }

        fn write(&self, _buffer: &TexelBuffer, _bytes: &[u8]) -> Result<(), CoderError> {
            Ok(())
        }

        fn run(&self, invocation: &KernelInvocation, dest: &TexelBuffer) -> Result<(), CoderError> {
            self.runs.borrow_mut().push((invocation.label.clone(), invocation.source.clone(), dest.id));
            Ok(())
        }

        fn read_floats(&self, _buffer: &TexelBuffer) -> Result<Vec<f32>, CoderError> {
            Err(CoderError::Backend("recording backend holds no data".into()))
        }

        fn read_bytes(&self, _buffer: &TexelBuffer) -> Result<Vec<u8>, CoderError> {
            Err(CoderError::Backend("recording backend holds no data".into()))
        }

        fn invalidate_all(&self) -> Result<(), CoderError> {
            Ok(())
        }
    }

    #[test]
    fn test_float_compaction_runs_the_pack_kernel() {
        let backend = RecordingBackend::new();
        let input = TexelBuffer {
            id: 7,
            width: 8,
            height: 1,
            pixel: PixelType::Float32,
        };

        let compacted = FLOAT_STRATEGY.compact_vec2s(&backend, &input).unwrap();
        // Eight one-tuple-per-texel inputs repack into four full texels.
        assert_eq!(compacted.width, 4);
        assert_eq!(compacted.pixel, PixelType::Float32);
        assert_eq!(backend.allocations.borrow().as_slice(), &[(4, 1, PixelType::Float32)]);

        let runs = backend.runs.borrow();
        assert_eq!(runs.len(), 1);
        let (label, source, dest_id) = &runs[0];
        assert_eq!(label, "pack_vec2s_into_vec4s");
        assert!(source.contains("read_source(2u * k)"));
        assert!(source.contains("read_source(2u * k + 1u)"));
        assert_eq!(*dest_id, compacted.id);
    }

    #[test]
    fn test_byte_compaction_returns_the_buffer_unchanged() {
        let backend = RecordingBackend::new();
        let input = TexelBuffer {
            id: 3,
            width: 4,
            height: 1,
            pixel: PixelType::Byte8,
        };

        let compacted = BYTE_STRATEGY.compact_vec2s(&backend, &input).unwrap();
        assert_eq!(compacted, input);
        // Already channel-packed at the byte level: no allocation, no kernel.
        assert!(backend.allocations.borrow().is_empty());
        assert!(backend.runs.borrow().is_empty());
    }

    #[test]
    fn test_float_codecs_round_trip() {
        let values = [1.5f32, -2.25, 3.0, 4.125, 5.5, -6.75, 7.0, 8.5];

        let packed = FLOAT_STRATEGY.pack_vec2s(&values);
        // Four logical vec2s occupy four full texels.
        assert_eq!(packed.len(), 4 * 16);
        assert_eq!(FLOAT_STRATEGY.unpack_vec2s(&packed), values);

        let packed = FLOAT_STRATEGY.pack_vec4s(&values);
        assert_eq!(packed.len(), 2 * 16);
        assert_eq!(FLOAT_STRATEGY.unpack_vec4s(&packed), values);
    }

    #[test]
    fn test_byte_codecs_round_trip_losslessly() {
        // Values chosen to need genuine float precision.
        let values = [2.0f32, 3.5, 7.0, -7654321.0, f32::MIN_POSITIVE, 1.0e-38];

        let packed = BYTE_STRATEGY.pack_vec2s(&values);
        assert_eq!(packed.len(), values.len() * 4);
        assert_eq!(BYTE_STRATEGY.unpack_vec2s(&packed), values);

        let packed = BYTE_STRATEGY.pack_vec4s(&values[..4]);
        assert_eq!(BYTE_STRATEGY.unpack_vec4s(&packed), &values[..4]);
    }

    #[test]
    fn test_storage_overhead() {
        assert_eq!(FLOAT_STRATEGY.power_size_overhead(VecKind::Vec2), 0);
        assert_eq!(FLOAT_STRATEGY.power_size_overhead(VecKind::Vec4), 0);
        assert_eq!(BYTE_STRATEGY.power_size_overhead(VecKind::Vec2), 1);
        assert_eq!(BYTE_STRATEGY.power_size_overhead(VecKind::Vec4), 2);

        assert_eq!(BYTE_STRATEGY.texels_per_element(VecKind::Vec4), 4);
        assert_eq!(FLOAT_STRATEGY.texels_per_element(VecKind::Vec2), 1);
    }

    #[test]
    fn test_pixel_types() {
        assert_eq!(FLOAT_STRATEGY.pixel_type().texture_format(), wgpu::TextureFormat::Rgba32Float);
        assert_eq!(BYTE_STRATEGY.pixel_type().texture_format(), wgpu::TextureFormat::Rgba8Unorm);
        assert_eq!(PixelType::Float32.bytes_per_texel(), 16);
        assert_eq!(PixelType::Byte8.bytes_per_texel(), 4);
    }

    #[test]
    fn test_output_fragments_declare_matching_storage() {
        for kind in [VecKind::Vec2, VecKind::Vec4, VecKind::Bool] {
            let float_out = FLOAT_STRATEGY.output_fragment(kind);
            assert!(float_out.source().contains("rgba32float"));

            let byte_out = BYTE_STRATEGY.output_fragment(kind);
            assert!(byte_out.source().contains("rgba8unorm"));
            assert_eq!(byte_out.libraries(), &[LIB_BYTE_ENCODE]);
        }
    }
}

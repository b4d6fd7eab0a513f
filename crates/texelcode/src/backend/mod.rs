//! Graphics collaborator boundary
//!
//! Kernel composition never talks to the GPU directly; it goes through
//! [`KernelBackend`], the narrow capability this subsystem consumes:
//! allocate a typed buffer, execute a configured invocation into a
//! destination, read bytes or floats back, and best-effort invalidate
//! everything. Build, link, and execute failures at this boundary propagate
//! unchanged to the caller.

mod wgpu_backend;

pub use wgpu_backend::WgpuBackend;

use crate::compose::KernelInvocation;
use crate::error::CoderError;
use crate::strategy::PixelType;

/// Cheap handle to a backend-owned 2D texel buffer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TexelBuffer {
    /// Backend-assigned resource identifier
    pub id: u64,
    /// Width in texels
    pub width: u32,
    /// Height in texels
    pub height: u32,
    /// Texel storage the buffer was allocated with
    pub pixel: PixelType,
}

impl TexelBuffer {
    /// Returns the total number of texels
    pub fn texel_count(&self) -> u32 {
        self.width * self.height
    }

    /// Returns the payload size in bytes
    pub fn byte_len(&self) -> usize {
        (self.texel_count() * self.pixel.bytes_per_texel()) as usize
    }
}

/// The render-and-read-back capability consumed from the graphics layer
pub trait KernelBackend {
    /// Allocates a buffer of `width` by `height` texels with the given
    /// storage
    fn allocate(&self, width: u32, height: u32, pixel: PixelType) -> Result<TexelBuffer, CoderError>;

    /// Uploads packed bytes into a buffer
    fn write(&self, buffer: &TexelBuffer, bytes: &[u8]) -> Result<(), CoderError>;

    /// Binds the invocation's arguments plus the destination and renders the
    /// kernel output into `dest`, blocking until submission
    fn run(&self, invocation: &KernelInvocation, dest: &TexelBuffer) -> Result<(), CoderError>;

    /// Reads a float buffer back as f32 channel values
    fn read_floats(&self, buffer: &TexelBuffer) -> Result<Vec<f32>, CoderError>;

    /// Reads a buffer back as raw bytes
    fn read_bytes(&self, buffer: &TexelBuffer) -> Result<Vec<u8>, CoderError>;

    /// Best-effort release of every outstanding GPU resource
    fn invalidate_all(&self) -> Result<(), CoderError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buffer_sizing() {
        let buffer = TexelBuffer {
            id: 0,
            width: 8,
            height: 2,
            pixel: PixelType::Float32,
        };
        assert_eq!(buffer.texel_count(), 16);
        assert_eq!(buffer.byte_len(), 256);

        let bytes = TexelBuffer {
            pixel: PixelType::Byte8,
            ..buffer
        };
        assert_eq!(bytes.byte_len(), 64);
    }
}

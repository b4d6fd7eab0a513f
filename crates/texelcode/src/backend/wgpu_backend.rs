//! wgpu implementation of the kernel backend
//!
//! Binds a composed kernel invocation to wgpu resources and executes it:
//! group 0 carries the invocation's texture and uniform arguments, group 1
//! the destination storage texture. Read-back goes through a staging buffer
//! mapped synchronously. Shader build and dispatch failures are captured via
//! a validation error scope and propagated unchanged.

use crate::backend::{KernelBackend, TexelBuffer};
use crate::compose::KernelInvocation;
use crate::error::CoderError;
use crate::fragment::KernelArg;
use crate::strategy::PixelType;
use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use wgpu::util::DeviceExt;

/// Compute shader workgroup size in X dimension
const COMPUTE_WORKGROUP_SIZE_X: u32 = 8;
/// Compute shader workgroup size in Y dimension
const COMPUTE_WORKGROUP_SIZE_Y: u32 = 8;

/// Texture usage for texel buffers: sampled input, storage output, and both
/// copy directions
const TEXTURE_USAGE: wgpu::TextureUsages = wgpu::TextureUsages::TEXTURE_BINDING
    .union(wgpu::TextureUsages::STORAGE_BINDING)
    .union(wgpu::TextureUsages::COPY_SRC)
    .union(wgpu::TextureUsages::COPY_DST);

fn backend_err(err: impl std::fmt::Display) -> CoderError {
    CoderError::Backend(err.to_string())
}

enum BoundResource {
    View(wgpu::TextureView),
    Buffer(wgpu::Buffer),
}

/// The real graphics collaborator, owning a wgpu device and the texel
/// buffers allocated through it
pub struct WgpuBackend {
    device: wgpu::Device,
    queue: wgpu::Queue,
    textures: Mutex<HashMap<u64, wgpu::Texture>>,
    next_id: AtomicU64,
}

impl WgpuBackend {
    /// Wraps an existing device and queue
    pub fn new(device: wgpu::Device, queue: wgpu::Queue) -> Self {
        Self {
            device,
            queue,
            textures: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(0),
        }
    }

    /// Requests a default adapter and device
    ///
    /// # Returns
    /// A ready backend, or [`CoderError::NoAdapter`] when the host exposes
    /// no compatible GPU
    pub fn request() -> Result<Self, CoderError> {
        let instance = wgpu::Instance::default();
        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: None,
            force_fallback_adapter: false,
        }))
        .map_err(|_| CoderError::NoAdapter)?;

        let (device, queue) = pollster::block_on(adapter.request_device(&wgpu::DeviceDescriptor {
            label: Some("texelcode"),
            required_features: wgpu::Features::empty(),
            required_limits: wgpu::Limits::default(),
            memory_hints: wgpu::MemoryHints::default(),
            trace: Default::default(),
        }))
        .map_err(backend_err)?;

        Ok(Self::new(device, queue))
    }

    fn lookup(&self, buffer: &TexelBuffer) -> Result<wgpu::Texture, CoderError> {
        self.textures.lock().unwrap().get(&buffer.id).cloned().ok_or(CoderError::UnknownBuffer(buffer.id))
    }

    fn read_raw(&self, buffer: &TexelBuffer) -> Result<Vec<u8>, CoderError> {
        let texture = self.lookup(buffer)?;

        // Copy commands require 256-byte row alignment in the staging
        // buffer; the padding is stripped after mapping.
        let bytes_per_row = buffer.width * buffer.pixel.bytes_per_texel();
        let padded_bytes_per_row = bytes_per_row.div_ceil(wgpu::COPY_BYTES_PER_ROW_ALIGNMENT) * wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;

        let staging = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Readback Buffer"),
            size: u64::from(padded_bytes_per_row) * u64::from(buffer.height),
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });

        let mut encoder = self.device.create_command_encoder(&wgpu::CommandEncoderDescriptor { label: Some("Readback Encoder") });
        encoder.copy_texture_to_buffer(
            wgpu::TexelCopyTextureInfo {
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::TexelCopyBufferInfo {
                buffer: &staging,
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(padded_bytes_per_row),
                    rows_per_image: Some(buffer.height),
                },
            },
            wgpu::Extent3d {
                width: buffer.width,
                height: buffer.height,
                depth_or_array_layers: 1,
            },
        );
        self.queue.submit(std::iter::once(encoder.finish()));

        let slice = staging.slice(..);
        let (sender, receiver) = futures_intrusive::channel::shared::oneshot_channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = sender.send(result);
        });

        self.device.poll(wgpu::PollType::Wait).map_err(backend_err)?;
        pollster::block_on(receiver.receive())
            .ok_or_else(|| CoderError::Backend("readback channel closed".into()))?
            .map_err(backend_err)?;

        let data = slice.get_mapped_range();
        let mut out = Vec::with_capacity(buffer.byte_len());
        for row in 0..buffer.height {
            let start = (row * padded_bytes_per_row) as usize;
            out.extend_from_slice(&data[start..start + bytes_per_row as usize]);
        }
        drop(data);
        staging.unmap();

        Ok(out)
    }
}

impl KernelBackend for WgpuBackend {
    fn allocate(&self, width: u32, height: u32, pixel: PixelType) -> Result<TexelBuffer, CoderError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let texture = self.device.create_texture(&wgpu::TextureDescriptor {
            label: Some(&format!("Texel Buffer {id}")),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: pixel.texture_format(),
            usage: TEXTURE_USAGE,
            view_formats: &[],
        });

        self.textures.lock().unwrap().insert(id, texture);
        Ok(TexelBuffer { id, width, height, pixel })
    }

    fn write(&self, buffer: &TexelBuffer, bytes: &[u8]) -> Result<(), CoderError> {
        if bytes.len() != buffer.byte_len() {
            return Err(CoderError::Backend(format!("buffer {} expects {} bytes, got {}", buffer.id, buffer.byte_len(), bytes.len())));
        }
        let texture = self.lookup(buffer)?;

        self.queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            bytes,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(buffer.width * buffer.pixel.bytes_per_texel()),
                rows_per_image: Some(buffer.height),
            },
            wgpu::Extent3d {
                width: buffer.width,
                height: buffer.height,
                depth_or_array_layers: 1,
            },
        );
        Ok(())
    }

    fn run(&self, invocation: &KernelInvocation, dest: &TexelBuffer) -> Result<(), CoderError> {
        if invocation.output.pixel() != dest.pixel {
            return Err(CoderError::PixelMismatch {
                expected: invocation.output.pixel(),
                got: dest.pixel,
            });
        }
        let dest_texture = self.lookup(dest)?;

        // Malformed compositions surface as validation errors; capture and
        // propagate them instead of panicking in the uncaptured handler.
        self.device.push_error_scope(wgpu::ErrorFilter::Validation);

        let module = self.device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(&invocation.label),
            source: wgpu::ShaderSource::Wgsl(invocation.source.as_str().into()),
        });

        let mut layout_entries = Vec::new();
        for arg in &invocation.args {
            let entry = match arg {
                KernelArg::Texture { slot, .. } => wgpu::BindGroupLayoutEntry {
                    binding: *slot,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: false },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                KernelArg::Uniform { slot, .. } => wgpu::BindGroupLayoutEntry {
                    binding: *slot,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
            };
            layout_entries.push(entry);
        }
        layout_entries.sort_by_key(|entry| entry.binding);

        let args_layout = self.device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some(&invocation.label),
            entries: &layout_entries,
        });

        let output_layout = self.device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some(&invocation.label),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::COMPUTE,
                ty: wgpu::BindingType::StorageTexture {
                    access: wgpu::StorageTextureAccess::WriteOnly,
                    format: dest.pixel.texture_format(),
                    view_dimension: wgpu::TextureViewDimension::D2,
                },
                count: None,
            }],
        });

        let pipeline_layout = self.device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some(&invocation.label),
            bind_group_layouts: &[&args_layout, &output_layout],
            push_constant_ranges: &[],
        });

        let pipeline = self.device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
            label: Some(&invocation.label),
            layout: Some(&pipeline_layout),
            module: &module,
            entry_point: Some(invocation.entry_point),
            compilation_options: Default::default(),
            cache: None,
        });

        // Views and uniform buffers must outlive the bind group entries.
        let mut resources = Vec::new();
        for arg in &invocation.args {
            match arg {
                KernelArg::Texture { slot, buffer } => {
                    let texture = self.lookup(buffer)?;
                    resources.push((*slot, BoundResource::View(texture.create_view(&wgpu::TextureViewDescriptor::default()))));
                }
                KernelArg::Uniform { slot, data } => {
                    let uniform = self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                        label: Some(&invocation.label),
                        contents: data,
                        usage: wgpu::BufferUsages::UNIFORM,
                    });
                    resources.push((*slot, BoundResource::Buffer(uniform)));
                }
            }
        }
        let mut bind_group_entries = resources
            .iter()
            .map(|(slot, resource)| wgpu::BindGroupEntry {
                binding: *slot,
                resource: match resource {
                    BoundResource::View(view) => wgpu::BindingResource::TextureView(view),
                    BoundResource::Buffer(buffer) => buffer.as_entire_binding(),
                },
            })
            .collect::<Vec<_>>();
        bind_group_entries.sort_by_key(|entry| entry.binding);

        let args_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(&invocation.label),
            layout: &args_layout,
            entries: &bind_group_entries,
        });

        let dest_view = dest_texture.create_view(&wgpu::TextureViewDescriptor::default());
        let output_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(&invocation.label),
            layout: &output_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::TextureView(&dest_view),
            }],
        });

        let mut encoder = self.device.create_command_encoder(&wgpu::CommandEncoderDescriptor { label: Some(&invocation.label) });
        {
            let mut compute_pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some(&invocation.label),
                timestamp_writes: None,
            });
            compute_pass.set_pipeline(&pipeline);
            compute_pass.set_bind_group(0, &args_group, &[]);
            compute_pass.set_bind_group(1, &output_group, &[]);
            compute_pass.dispatch_workgroups(dest.width.div_ceil(COMPUTE_WORKGROUP_SIZE_X), dest.height.div_ceil(COMPUTE_WORKGROUP_SIZE_Y), 1);
        }
        self.queue.submit(std::iter::once(encoder.finish()));
        self.device.poll(wgpu::PollType::Wait).map_err(backend_err)?;

        if let Some(err) = pollster::block_on(self.device.pop_error_scope()) {
            return Err(CoderError::Backend(err.to_string()));
        }
        Ok(())
    }

    fn read_floats(&self, buffer: &TexelBuffer) -> Result<Vec<f32>, CoderError> {
        if buffer.pixel != PixelType::Float32 {
            return Err(CoderError::PixelMismatch {
                expected: PixelType::Float32,
                got: buffer.pixel,
            });
        }
        let bytes = self.read_raw(buffer)?;
        Ok(bytemuck::pod_collect_to_vec(&bytes))
    }

    fn read_bytes(&self, buffer: &TexelBuffer) -> Result<Vec<u8>, CoderError> {
        self.read_raw(buffer)
    }

    fn invalidate_all(&self) -> Result<(), CoderError> {
        self.textures.lock().unwrap().clear();
        self.device.poll(wgpu::PollType::Wait).map_err(backend_err)?;
        Ok(())
    }
}

//! [`GraphicsDevice`] implementation on top of wgpu.

mod context;
mod conversions;
mod pipeline_builder;
mod present;
mod push;

use std::collections::HashMap;
use std::ops::Range;
use std::sync::Arc;

use winit::window::Window;

use self::context::GpuContext;
use self::pipeline_builder::PipelineBuilder;
use self::present::Blitter;
use self::push::{PushConstantBuffer, MAX_PUSH_CONSTANT_SIZE};
use super::handle::HandleAllocator;
use super::{
    BufferDescriptor, BufferHandle, Descriptor, DescriptorSetBinding, DeviceError, DeviceResult,
    Format, GraphicsDevice, ImageLayout, RenderPassDescriptor, ShaderDescriptor, ShaderHandle,
    TextureDescriptor, TextureHandle,
};
use crate::settings::RenderSettings;

/// Outcome of the per-frame surface steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameStatus {
    Ready,
    /// The surface is not presentable right now (minimized, resized, timed
    /// out). Skip this frame's submission and try again next iteration.
    Skipped,
}

struct GpuBuffer {
    buffer: wgpu::Buffer,
    // Every write goes through the CPU, so reads are answered from here.
    shadow: Vec<u8>,
}

struct GpuTexture {
    texture: wgpu::Texture,
    view: wgpu::TextureView,
    sampler: wgpu::Sampler,
    width: u32,
    height: u32,
    format: Format,
    expected_len: u64,
}

struct GpuShader {
    pipeline: wgpu::RenderPipeline,
    set_layouts: Vec<wgpu::BindGroupLayout>,
    set_bindings: Vec<Vec<DescriptorSetBinding>>,
    push_constant_size: u32,
}

enum PassCommand {
    SetPipeline(wgpu::RenderPipeline),
    SetBindGroup {
        index: u32,
        group: wgpu::BindGroup,
    },
    Push {
        index: u32,
        offset: u32,
    },
    Draw {
        vertex: wgpu::Buffer,
        index: wgpu::Buffer,
        indices: Range<u32>,
    },
}

struct PassRecording {
    color: wgpu::TextureView,
    depth: Option<wgpu::TextureView>,
    clear_color: Option<[f32; 4]>,
    clear_depth: Option<f32>,
    shader: Option<ShaderHandle>,
    commands: Vec<PassCommand>,
}

/// Window-backed device.
///
/// Commands issued between `begin_renderpass` and `end_renderpass` are
/// recorded and replayed into one `wgpu::RenderPass`, which is submitted when
/// the pass ends.
pub struct WgpuDevice {
    context: GpuContext,
    handles: HandleAllocator,
    buffers: HashMap<BufferHandle, GpuBuffer>,
    textures: HashMap<TextureHandle, GpuTexture>,
    shaders: HashMap<ShaderHandle, GpuShader>,
    push: PushConstantBuffer,
    blitter: Blitter,
    pass: Option<PassRecording>,
    frame: Option<wgpu::SurfaceTexture>,
}

impl WgpuDevice {
    pub async fn new(window: Arc<Window>, settings: &RenderSettings) -> DeviceResult<Self> {
        let context = GpuContext::new(window, settings).await?;
        let push = PushConstantBuffer::new(&context.device);
        let blitter = Blitter::new(&context.device, context.config.format);

        Ok(Self {
            context,
            handles: HandleAllocator::default(),
            buffers: HashMap::new(),
            textures: HashMap::new(),
            shaders: HashMap::new(),
            push,
            blitter,
            pass: None,
            frame: None,
        })
    }

    pub fn surface_size(&self) -> (u32, u32) {
        (self.context.config.width, self.context.config.height)
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.context.resize(width, height);
    }

    /// Acquires the next surface image.
    pub fn begin_frame(&mut self) -> DeviceResult<FrameStatus> {
        match self.context.surface.get_current_texture() {
            Ok(frame) => {
                self.frame = Some(frame);
                Ok(FrameStatus::Ready)
            }
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                log::debug!("Surface lost or outdated; reconfiguring");
                self.context.reconfigure();
                Ok(FrameStatus::Skipped)
            }
            Err(wgpu::SurfaceError::Timeout) => Ok(FrameStatus::Skipped),
            Err(err) => Err(err.into()),
        }
    }

    /// Copies `target` onto the acquired surface image and presents it.
    pub fn end_frame(&mut self, target: TextureHandle) -> DeviceResult<FrameStatus> {
        let Some(frame) = self.frame.take() else {
            return Ok(FrameStatus::Skipped);
        };
        let source = self.texture(target)?.view.clone();
        let destination = frame
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder =
            self.context
                .device
                .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                    label: Some("PresentEncoder"),
                });
        self.blitter
            .blit(&self.context.device, &mut encoder, &source, &destination);
        self.context.queue.submit(Some(encoder.finish()));
        frame.present();

        Ok(FrameStatus::Ready)
    }

    fn buffer(&self, buffer: BufferHandle) -> DeviceResult<&GpuBuffer> {
        self.buffers.get(&buffer).ok_or(DeviceError::InvalidHandle {
            kind: "buffer",
            index: buffer.index(),
        })
    }

    fn texture(&self, texture: TextureHandle) -> DeviceResult<&GpuTexture> {
        self.textures.get(&texture).ok_or(DeviceError::InvalidHandle {
            kind: "texture",
            index: texture.index(),
        })
    }

    fn pass_mut(&mut self) -> DeviceResult<&mut PassRecording> {
        self.pass.as_mut().ok_or(DeviceError::NoActivePass)
    }

    fn bound_shader(&self) -> DeviceResult<&GpuShader> {
        let pass = self.pass.as_ref().ok_or(DeviceError::NoActivePass)?;
        pass.shader
            .and_then(|shader| self.shaders.get(&shader))
            .ok_or(DeviceError::NoShaderBound)
    }

    fn build_bind_group(
        &self,
        layout: &wgpu::BindGroupLayout,
        descriptors: &[Descriptor<'_>],
    ) -> DeviceResult<wgpu::BindGroup> {
        let mut entries = Vec::new();
        let mut slot = 0u32;

        for desc in descriptors {
            match desc {
                Descriptor::UniformBuffer(buffers) | Descriptor::StorageBuffer(buffers) => {
                    for &buffer in *buffers {
                        entries.push(wgpu::BindGroupEntry {
                            binding: slot,
                            resource: self.buffer(buffer)?.buffer.as_entire_binding(),
                        });
                        slot += 1;
                    }
                }
                Descriptor::SampledTexture(textures) => {
                    for &texture in *textures {
                        let texture = self.texture(texture)?;
                        entries.push(wgpu::BindGroupEntry {
                            binding: slot,
                            resource: wgpu::BindingResource::TextureView(&texture.view),
                        });
                        entries.push(wgpu::BindGroupEntry {
                            binding: slot + 1,
                            resource: wgpu::BindingResource::Sampler(&texture.sampler),
                        });
                        slot += 2;
                    }
                }
            }
        }

        Ok(self
            .context
            .device
            .create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("DescriptorSet"),
                layout,
                entries: &entries,
            }))
    }
}

impl GraphicsDevice for WgpuDevice {
    fn create_buffer(&mut self, desc: &BufferDescriptor<'_>) -> DeviceResult<BufferHandle> {
        let buffer = self.context.device.create_buffer(&wgpu::BufferDescriptor {
            label: desc.label,
            size: desc.size,
            usage: conversions::buffer_usages(desc.usage),
            mapped_at_creation: false,
        });

        let handle = self.handles.allocate();
        self.buffers.insert(
            handle,
            GpuBuffer {
                buffer,
                shadow: vec![0; desc.size as usize],
            },
        );
        Ok(handle)
    }

    fn write_buffer(
        &mut self,
        buffer: BufferHandle,
        offset: u64,
        data: &[u8],
    ) -> DeviceResult<()> {
        let entry = self
            .buffers
            .get_mut(&buffer)
            .ok_or(DeviceError::InvalidHandle {
                kind: "buffer",
                index: buffer.index(),
            })?;
        let size = entry.shadow.len() as u64;
        let len = data.len() as u64;
        if offset.checked_add(len).map_or(true, |end| end > size) {
            return Err(DeviceError::OutOfRange { offset, len, size });
        }

        let start = offset as usize;
        entry.shadow[start..start + data.len()].copy_from_slice(data);
        self.context.queue.write_buffer(&entry.buffer, offset, data);
        Ok(())
    }

    fn read_buffer(
        &mut self,
        buffer: BufferHandle,
        offset: u64,
        dst: &mut [u8],
    ) -> DeviceResult<()> {
        let shadow = &self.buffer(buffer)?.shadow;
        let size = shadow.len() as u64;
        let len = dst.len() as u64;
        if offset.checked_add(len).map_or(true, |end| end > size) {
            return Err(DeviceError::OutOfRange { offset, len, size });
        }

        let start = offset as usize;
        dst.copy_from_slice(&shadow[start..start + dst.len()]);
        Ok(())
    }

    fn destroy_buffer(&mut self, buffer: BufferHandle) {
        if let Some(entry) = self.buffers.remove(&buffer) {
            entry.buffer.destroy();
        }
    }

    fn create_texture(&mut self, desc: &TextureDescriptor<'_>) -> DeviceResult<TextureHandle> {
        let format = conversions::sampled_texture_format(
            desc.format,
            desc.usage,
            self.context.device.features(),
        )?;
        let (dimension, depth_or_array_layers) = if desc.depth > 1 {
            (wgpu::TextureDimension::D3, desc.depth)
        } else {
            (wgpu::TextureDimension::D2, desc.array_layers.max(1))
        };

        let texture = self.context.device.create_texture(&wgpu::TextureDescriptor {
            label: desc.label,
            size: wgpu::Extent3d {
                width: desc.width,
                height: desc.height,
                depth_or_array_layers,
            },
            mip_level_count: desc.mip_levels.max(1),
            sample_count: 1,
            dimension,
            format,
            usage: conversions::texture_usages(desc.usage),
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        let filter = if desc.bilinear_filter {
            wgpu::FilterMode::Linear
        } else {
            wgpu::FilterMode::Nearest
        };
        let address_mode = conversions::address_mode(desc.edge_mode);
        let sampler = self
            .context
            .device
            .create_sampler(&wgpu::SamplerDescriptor {
                label: desc.label,
                address_mode_u: address_mode,
                address_mode_v: address_mode,
                address_mode_w: address_mode,
                mag_filter: filter,
                min_filter: filter,
                ..Default::default()
            });

        let handle = self.handles.allocate();
        self.textures.insert(
            handle,
            GpuTexture {
                texture,
                view,
                sampler,
                width: desc.width,
                height: desc.height,
                format: desc.format,
                expected_len: desc.byte_size(),
            },
        );
        Ok(handle)
    }

    fn write_texture(
        &mut self,
        texture: TextureHandle,
        data: &[u8],
        _layout: ImageLayout,
    ) -> DeviceResult<()> {
        // wgpu tracks image layouts itself.
        let entry = self.texture(texture)?;
        let len = data.len() as u64;
        if len != entry.expected_len {
            return Err(DeviceError::TextureSizeMismatch {
                len,
                expected: entry.expected_len,
            });
        }

        let size = entry.texture.size();
        self.context.queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &entry.texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            data,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(entry.width * entry.format.size()),
                rows_per_image: Some(entry.height),
            },
            size,
        );
        Ok(())
    }

    fn destroy_texture(&mut self, texture: TextureHandle) {
        if let Some(entry) = self.textures.remove(&texture) {
            entry.texture.destroy();
        }
    }

    fn create_shader(&mut self, desc: &ShaderDescriptor<'_>) -> DeviceResult<ShaderHandle> {
        if desc.push_constant_size > MAX_PUSH_CONSTANT_SIZE {
            return Err(DeviceError::PushConstantTooLarge {
                len: desc.push_constant_size as usize,
                size: MAX_PUSH_CONSTANT_SIZE,
            });
        }

        let device = &self.context.device;
        let vertex_module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: desc.label,
            source: wgpu::ShaderSource::Wgsl(desc.vertex_source.into()),
        });
        let fragment_module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: desc.label,
            source: wgpu::ShaderSource::Wgsl(desc.fragment_source.into()),
        });

        let set_layouts: Vec<wgpu::BindGroupLayout> = desc
            .descriptor_sets
            .iter()
            .map(|set| {
                device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                    label: Some("DescriptorSetLayout"),
                    entries: &conversions::layout_entries(set.bindings),
                })
            })
            .collect();

        // Push payloads bind right after the declared sets.
        let mut group_layouts: Vec<&wgpu::BindGroupLayout> = set_layouts.iter().collect();
        if desc.push_constant_size > 0 {
            group_layouts.push(&self.push.bind_layout);
        }
        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: desc.label,
            bind_group_layouts: &group_layouts,
            push_constant_ranges: &[],
        });

        let mut attributes = Vec::with_capacity(desc.vertex_bindings.len());
        let mut location = 0u32;
        for binding in desc.vertex_bindings {
            let mut binding_attributes = Vec::with_capacity(binding.attributes.len());
            for attribute in binding.attributes {
                binding_attributes.push(wgpu::VertexAttribute {
                    format: conversions::vertex_format(attribute.format)?,
                    offset: u64::from(attribute.offset),
                    shader_location: location,
                });
                location += 1;
            }
            attributes.push(binding_attributes);
        }

        let blend = desc
            .enable_color_blend
            .then_some(wgpu::BlendState::ALPHA_BLENDING);
        let mut builder =
            PipelineBuilder::new(device, &pipeline_layout, &vertex_module, &fragment_module)
                .with_label(desc.label)
                .with_color_target(conversions::texture_format(desc.color_format)?, blend)
                .with_cull_mode(conversions::cull_face(desc.cull_mode))
                .with_topology(conversions::topology(desc.topology));
        for (binding, binding_attributes) in desc.vertex_bindings.iter().zip(&attributes) {
            builder = builder.with_vertex_buffer(wgpu::VertexBufferLayout {
                array_stride: u64::from(binding.stride),
                step_mode: wgpu::VertexStepMode::Vertex,
                attributes: binding_attributes,
            });
        }
        if desc.enable_depth_buffer {
            let depth_format = desc.depth_format.unwrap_or(Format::D32Sfloat);
            builder = builder.with_depth_buffer(conversions::texture_format(depth_format)?);
        }
        let pipeline = builder.build();

        let handle = self.handles.allocate();
        self.shaders.insert(
            handle,
            GpuShader {
                pipeline,
                set_layouts,
                set_bindings: desc
                    .descriptor_sets
                    .iter()
                    .map(|set| set.bindings.to_vec())
                    .collect(),
                push_constant_size: desc.push_constant_size,
            },
        );
        Ok(handle)
    }

    fn destroy_shader(&mut self, shader: ShaderHandle) {
        self.shaders.remove(&shader);
    }

    fn begin_renderpass(&mut self, desc: &RenderPassDescriptor) -> DeviceResult<()> {
        if self.pass.is_some() {
            return Err(DeviceError::PassAlreadyActive);
        }
        let color = self.texture(desc.target)?.view.clone();
        let depth = match desc.depth {
            Some(depth) => Some(self.texture(depth)?.view.clone()),
            None => None,
        };

        self.push.begin_pass();
        self.pass = Some(PassRecording {
            color,
            depth,
            clear_color: desc.clear_color,
            clear_depth: desc.clear_depth,
            shader: None,
            commands: Vec::new(),
        });
        Ok(())
    }

    fn end_renderpass(&mut self) -> DeviceResult<()> {
        let pass = self.pass.take().ok_or(DeviceError::NoActivePass)?;
        self.push.flush(&self.context.device, &self.context.queue);

        let color_load = match pass.clear_color {
            Some([r, g, b, a]) => wgpu::LoadOp::Clear(wgpu::Color {
                r: f64::from(r),
                g: f64::from(g),
                b: f64::from(b),
                a: f64::from(a),
            }),
            None => wgpu::LoadOp::Load,
        };
        let depth_load = pass
            .clear_depth
            .map_or(wgpu::LoadOp::Load, wgpu::LoadOp::Clear);

        let mut encoder =
            self.context
                .device
                .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                    label: Some("Encoder"),
                });

        {
            let mut rpass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("ModelPass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &pass.color,
                    depth_slice: None,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: color_load,
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: pass.depth.as_ref().map(|view| {
                    wgpu::RenderPassDepthStencilAttachment {
                        view,
                        depth_ops: Some(wgpu::Operations {
                            load: depth_load,
                            store: wgpu::StoreOp::Store,
                        }),
                        stencil_ops: None,
                    }
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            for command in &pass.commands {
                match command {
                    PassCommand::SetPipeline(pipeline) => rpass.set_pipeline(pipeline),
                    PassCommand::SetBindGroup { index, group } => {
                        rpass.set_bind_group(*index, group, &[]);
                    }
                    PassCommand::Push { index, offset } => {
                        rpass.set_bind_group(*index, &self.push.bind_group, &[*offset]);
                    }
                    PassCommand::Draw {
                        vertex,
                        index,
                        indices,
                    } => {
                        rpass.set_vertex_buffer(0, vertex.slice(..));
                        rpass.set_index_buffer(index.slice(..), wgpu::IndexFormat::Uint32);
                        rpass.draw_indexed(indices.clone(), 0, 0..1);
                    }
                }
            }
        }

        self.context.queue.submit(Some(encoder.finish()));
        Ok(())
    }

    fn bind_shader(&mut self, shader: ShaderHandle) -> DeviceResult<()> {
        let pipeline = self
            .shaders
            .get(&shader)
            .ok_or(DeviceError::InvalidHandle {
                kind: "shader",
                index: shader.index(),
            })?
            .pipeline
            .clone();
        let pass = self.pass_mut()?;
        pass.shader = Some(shader);
        pass.commands.push(PassCommand::SetPipeline(pipeline));
        Ok(())
    }

    fn bind_descriptor_set(
        &mut self,
        set: u32,
        descriptors: &[Descriptor<'_>],
    ) -> DeviceResult<()> {
        let shader = self.bound_shader()?;
        let layout = shader
            .set_layouts
            .get(set as usize)
            .ok_or(DeviceError::UnknownDescriptorSet { set })?;
        let bindings = &shader.set_bindings[set as usize];

        let matches_layout = bindings.len() == descriptors.len()
            && bindings.iter().zip(descriptors).all(|(binding, desc)| {
                binding.ty == desc.ty() && binding.count as usize == desc.count()
            });
        if !matches_layout {
            return Err(DeviceError::DescriptorMismatch { set });
        }

        let group = self.build_bind_group(layout, descriptors)?;
        self.pass_mut()?.commands.push(PassCommand::SetBindGroup {
            index: set,
            group,
        });
        Ok(())
    }

    fn bind_push_constant(&mut self, data: &[u8]) -> DeviceResult<()> {
        let shader = self.bound_shader()?;
        if data.len() > shader.push_constant_size as usize {
            return Err(DeviceError::PushConstantTooLarge {
                len: data.len(),
                size: shader.push_constant_size,
            });
        }
        let index = shader.set_layouts.len() as u32;

        let offset = self.push.stage(data);
        self.pass_mut()?
            .commands
            .push(PassCommand::Push { index, offset });
        Ok(())
    }

    fn draw(
        &mut self,
        vertex_buffer: BufferHandle,
        index_buffer: BufferHandle,
        first_index: u32,
    ) -> DeviceResult<()> {
        self.bound_shader()?;
        let vertex = self.buffer(vertex_buffer)?.buffer.clone();
        let index = self.buffer(index_buffer)?.buffer.clone();

        let index_count = (index.size() / 4) as u32;
        if first_index > index_count {
            return Err(DeviceError::OutOfRange {
                offset: u64::from(first_index) * 4,
                len: 0,
                size: index.size(),
            });
        }

        self.pass_mut()?.commands.push(PassCommand::Draw {
            vertex,
            index,
            indices: first_index..index_count,
        });
        Ok(())
    }

    fn wait_idle(&mut self) {
        if let Err(err) = self
            .context
            .device
            .poll(wgpu::PollType::wait_indefinitely())
        {
            log::warn!("Failed to wait for device idle: {:?}", err);
        }
    }
}

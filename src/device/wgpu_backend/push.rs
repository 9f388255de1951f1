use std::num::NonZeroU64;

/// Largest push payload a shader may declare.
pub(super) const MAX_PUSH_CONSTANT_SIZE: u32 = 256;

const INITIAL_PUSH_SLOTS: u32 = 1024;

/// Stands in for push constants on backends that lack them.
///
/// Each payload pushed during a pass is staged into its own aligned slot; at
/// the end of the pass the staged bytes are uploaded in one write and every
/// draw binds its slot through a dynamic offset.
pub(super) struct PushConstantBuffer {
    buffer: wgpu::Buffer,
    capacity: u32,
    slot_size: u64,
    pub(super) bind_group: wgpu::BindGroup,
    pub(super) bind_layout: wgpu::BindGroupLayout,
    scratch: Vec<u8>,
}

impl PushConstantBuffer {
    pub(super) fn new(device: &wgpu::Device) -> Self {
        let alignment = u64::from(device.limits().min_uniform_buffer_offset_alignment);
        let slot_size = u64::from(MAX_PUSH_CONSTANT_SIZE).max(alignment);

        let bind_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("PushConstantBindLayout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: true,
                    min_binding_size: NonZeroU64::new(slot_size),
                },
                count: None,
            }],
        });

        let (buffer, bind_group) =
            Self::allocate(device, &bind_layout, INITIAL_PUSH_SLOTS, slot_size);

        Self {
            buffer,
            capacity: INITIAL_PUSH_SLOTS,
            slot_size,
            bind_group,
            bind_layout,
            scratch: Vec::new(),
        }
    }

    pub(super) fn begin_pass(&mut self) {
        self.scratch.clear();
    }

    /// Stages `data` and returns the dynamic offset of its slot.
    pub(super) fn stage(&mut self, data: &[u8]) -> u32 {
        let offset = self.scratch.len();
        self.scratch.extend_from_slice(data);
        self.scratch.resize(offset + self.slot_size as usize, 0);
        offset as u32
    }

    pub(super) fn flush(&mut self, device: &wgpu::Device, queue: &wgpu::Queue) {
        let required = (self.scratch.len() as u64 / self.slot_size) as u32;
        if required > self.capacity {
            self.grow(device, required);
        }

        if !self.scratch.is_empty() {
            queue.write_buffer(&self.buffer, 0, &self.scratch);
        }
    }

    fn grow(&mut self, device: &wgpu::Device, required: u32) {
        let new_capacity = required.max(self.capacity * 2);
        log::debug!(
            "Growing push constant buffer: {} -> {}",
            self.capacity,
            new_capacity
        );

        let (buffer, bind_group) =
            Self::allocate(device, &self.bind_layout, new_capacity, self.slot_size);
        self.buffer = buffer;
        self.bind_group = bind_group;
        self.capacity = new_capacity;
    }

    fn allocate(
        device: &wgpu::Device,
        layout: &wgpu::BindGroupLayout,
        capacity: u32,
        slot_size: u64,
    ) -> (wgpu::Buffer, wgpu::BindGroup) {
        let buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("PushConstantBuffer"),
            size: u64::from(capacity) * slot_size,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("PushConstantBindGroup"),
            layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                    buffer: &buffer,
                    offset: 0,
                    size: NonZeroU64::new(slot_size),
                }),
            }],
        });

        (buffer, bind_group)
    }
}

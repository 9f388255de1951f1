use bytemuck::{Pod, Zeroable};
use glam::Vec3;
use std::mem;

use crate::device::{BufferDescriptor, BufferHandle, BufferUsages, DeviceResult, GraphicsDevice};

#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable, Debug, PartialEq)]
pub struct DirectionalLight {
    pub direction: [f32; 4],
    pub color_intensity: [f32; 4],
}

impl DirectionalLight {
    pub fn new(direction: Vec3, color: Vec3, intensity: f32) -> Self {
        Self {
            direction: direction.extend(1.0).to_array(),
            color_intensity: color.extend(intensity).to_array(),
        }
    }
}

#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable, Debug, PartialEq)]
pub struct PointLight {
    pub position: [f32; 4],
    pub color_intensity: [f32; 4],
}

impl PointLight {
    pub fn new(position: Vec3, color: Vec3, intensity: f32) -> Self {
        Self {
            position: position.extend(1.0).to_array(),
            color_intensity: color.extend(intensity).to_array(),
        }
    }
}

/// Frame-scoped light records mirrored into a storage buffer.
///
/// Records are staged on the CPU and written to the GPU in one flush per
/// frame. When the batch is full its capacity doubles and the storage buffer
/// is replaced by one of the new size; the old GPU contents are never read
/// again because the next flush rewrites the whole active range.
pub struct LightBatch<T> {
    label: &'static str,
    records: Vec<T>,
    capacity: u32,
    buffer: BufferHandle,
}

impl<T: Pod> LightBatch<T> {
    pub(crate) fn new<D: GraphicsDevice>(
        device: &mut D,
        label: &'static str,
        capacity: u32,
    ) -> DeviceResult<Self> {
        let capacity = capacity.max(1);
        let buffer = Self::create_buffer(device, label, capacity)?;

        Ok(Self {
            label,
            records: Vec::with_capacity(capacity as usize),
            capacity,
            buffer,
        })
    }

    pub(crate) fn push<D: GraphicsDevice>(&mut self, device: &mut D, record: T) -> DeviceResult<()> {
        if self.records.len() == self.capacity as usize {
            self.grow(device)?;
        }
        self.records.push(record);
        Ok(())
    }

    /// Writes the active records to the GPU. Empty batches are not written.
    pub(crate) fn flush<D: GraphicsDevice>(&self, device: &mut D) -> DeviceResult<bool> {
        if self.records.is_empty() {
            return Ok(false);
        }
        device.write_buffer(self.buffer, 0, bytemuck::cast_slice(&self.records))?;
        Ok(true)
    }

    pub(crate) fn clear(&mut self) {
        self.records.clear();
    }

    pub(crate) fn destroy<D: GraphicsDevice>(self, device: &mut D) {
        device.destroy_buffer(self.buffer);
    }

    pub fn len(&self) -> u32 {
        self.records.len() as u32
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    pub fn buffer(&self) -> BufferHandle {
        self.buffer
    }

    pub fn records(&self) -> &[T] {
        &self.records
    }

    fn grow<D: GraphicsDevice>(&mut self, device: &mut D) -> DeviceResult<()> {
        let new_capacity = self.capacity * 2;
        log::debug!(
            "Growing {}: {} -> {}",
            self.label,
            self.capacity,
            new_capacity
        );

        let buffer = Self::create_buffer(device, self.label, new_capacity)?;
        device.destroy_buffer(self.buffer);
        self.buffer = buffer;

        self.records
            .reserve_exact(new_capacity as usize - self.records.len());
        self.capacity = new_capacity;
        Ok(())
    }

    fn create_buffer<D: GraphicsDevice>(
        device: &mut D,
        label: &'static str,
        capacity: u32,
    ) -> DeviceResult<BufferHandle> {
        device.create_buffer(&BufferDescriptor {
            label: Some(label),
            size: u64::from(capacity) * mem::size_of::<T>() as u64,
            usage: BufferUsages::STORAGE | BufferUsages::READ_WRITE_DST,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::{Command, RecordingDevice};

    fn light(i: u32) -> PointLight {
        PointLight::new(Vec3::splat(i as f32), Vec3::ONE, i as f32)
    }

    #[test]
    fn light_records_are_32_bytes() {
        assert_eq!(mem::size_of::<DirectionalLight>(), 32);
        assert_eq!(mem::size_of::<PointLight>(), 32);
    }

    #[test]
    fn records_pack_homogeneous_one_and_intensity() {
        let light = DirectionalLight::new(Vec3::new(1.0, 2.0, 3.0), Vec3::new(0.5, 0.4, 0.3), 7.0);
        assert_eq!(light.direction, [1.0, 2.0, 3.0, 1.0]);
        assert_eq!(light.color_intensity, [0.5, 0.4, 0.3, 7.0]);
    }

    #[test]
    fn full_batch_doubles_and_replaces_buffer() {
        let mut device = RecordingDevice::new();
        let mut batch = LightBatch::<PointLight>::new(&mut device, "PointLightBuffer", 2).unwrap();
        let first_buffer = batch.buffer();

        for i in 0..3 {
            batch.push(&mut device, light(i)).unwrap();
        }

        assert_eq!(batch.capacity(), 4);
        assert_eq!(batch.len(), 3);
        assert_ne!(batch.buffer(), first_buffer);
        assert!(!device.is_live_buffer(first_buffer));
        assert_eq!(
            device.buffer_contents(batch.buffer()).map(|data| data.len()),
            Some(4 * 32)
        );
        assert_eq!(batch.records(), &[light(0), light(1), light(2)]);
    }

    #[test]
    fn flush_writes_only_active_range() {
        let mut device = RecordingDevice::new();
        let mut batch = LightBatch::<PointLight>::new(&mut device, "PointLightBuffer", 8).unwrap();
        batch.push(&mut device, light(1)).unwrap();
        device.clear_commands();

        assert!(batch.flush(&mut device).unwrap());
        assert_eq!(
            device.commands(),
            &[Command::WriteBuffer {
                buffer: batch.buffer(),
                offset: 0,
                len: 32,
            }]
        );
    }

    #[test]
    fn empty_batch_is_not_flushed() {
        let mut device = RecordingDevice::new();
        let batch = LightBatch::<DirectionalLight>::new(&mut device, "DirLightBuffer", 4).unwrap();
        device.clear_commands();

        assert!(!batch.flush(&mut device).unwrap());
        assert!(device.commands().is_empty());
    }

    #[test]
    fn clear_keeps_capacity() {
        let mut device = RecordingDevice::new();
        let mut batch = LightBatch::<PointLight>::new(&mut device, "PointLightBuffer", 1).unwrap();
        batch.push(&mut device, light(0)).unwrap();
        batch.push(&mut device, light(1)).unwrap();
        batch.clear();

        assert!(batch.is_empty());
        assert_eq!(batch.capacity(), 2);
    }
}

//! Dynamic uniform buffer for batched GPU writes.
//!
//! Every object drawn with a material pushes its uniforms here during the
//! prepare phase. The whole frame is then uploaded with a single
//! `write_buffer` call and objects select their slot with a dynamic offset.

use crate::context::Context;
use bytemuck::Pod;
use std::mem;

/// Size of one entry of `entry_size` bytes once padded to `alignment`.
#[inline]
pub fn aligned_stride(entry_size: u64, alignment: u64) -> u64 {
    let alignment = alignment.max(1);
    entry_size.div_ceil(alignment) * alignment
}

/// A uniform buffer holding one aligned `T` per drawn object.
///
/// ```ignore
/// let mut buffer = DynamicUniformBuffer::<ObjectUniforms>::new("surface_objects");
///
/// buffer.clear();
/// let offset = buffer.push(&uniforms);
/// buffer.flush();
/// pass.set_bind_group(1, &bind_group, &[offset]);
/// ```
pub struct DynamicUniformBuffer<T: Pod> {
    data: Vec<u8>,
    buffer: wgpu::Buffer,
    /// Capacity in bytes.
    capacity: u64,
    aligned_size: u64,
    count: usize,
    label: &'static str,
    _marker: std::marker::PhantomData<T>,
}

impl<T: Pod> DynamicUniformBuffer<T> {
    /// A buffer with room for 64 entries before its first reallocation.
    pub fn new(label: &'static str) -> Self {
        Self::with_capacity(label, 64)
    }

    pub fn with_capacity(label: &'static str, initial_capacity: usize) -> Self {
        let ctxt = Context::get();
        let alignment = ctxt.device.limits().min_uniform_buffer_offset_alignment as u64;
        let aligned_size = aligned_stride(mem::size_of::<T>() as u64, alignment);
        let capacity = aligned_size * initial_capacity.max(1) as u64;

        let buffer = ctxt.create_buffer(&wgpu::BufferDescriptor {
            label: Some(label),
            size: capacity,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        Self {
            data: Vec::with_capacity(capacity as usize),
            buffer,
            capacity,
            aligned_size,
            count: 0,
            label,
            _marker: std::marker::PhantomData,
        }
    }

    /// Number of entries pushed since the last [`DynamicUniformBuffer::clear`].
    #[inline]
    pub fn len(&self) -> usize {
        self.count
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Forgets the entries of the previous frame, keeping the allocation.
    pub fn clear(&mut self) {
        self.data.clear();
        self.count = 0;
    }

    /// Appends `value` and returns its byte offset in the buffer.
    ///
    /// The offset is only valid for drawing once [`DynamicUniformBuffer::flush`] ran.
    pub fn push(&mut self, value: &T) -> u32 {
        let offset = (self.count as u64 * self.aligned_size) as u32;
        let bytes = bytemuck::bytes_of(value);
        self.data.extend_from_slice(bytes);
        self.data
            .extend(std::iter::repeat_n(0u8, self.aligned_size as usize - bytes.len()));
        self.count += 1;
        offset
    }

    /// Uploads the pushed entries.
    ///
    /// Returns `true` if the GPU buffer was reallocated, in which case every
    /// bind group referencing it must be recreated.
    pub fn flush(&mut self) -> bool {
        if self.data.is_empty() {
            return false;
        }

        let required_size = self.data.len() as u64;
        let reallocated = required_size > self.capacity;
        if reallocated {
            self.grow(required_size);
        }

        Context::get().write_buffer(&self.buffer, 0, &self.data);
        reallocated
    }

    fn grow(&mut self, required_size: u64) {
        let mut new_capacity = self.capacity.max(self.aligned_size);
        while new_capacity < required_size {
            new_capacity *= 2;
        }

        log::debug!(
            "growing uniform buffer `{}` from {} to {} bytes",
            self.label,
            self.capacity,
            new_capacity
        );

        self.buffer = Context::get().create_buffer(&wgpu::BufferDescriptor {
            label: Some(self.label),
            size: new_capacity,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        self.capacity = new_capacity;
    }

    #[inline]
    pub fn buffer(&self) -> &wgpu::Buffer {
        &self.buffer
    }

    /// Size of one entry as seen by the shader.
    #[inline]
    pub fn binding_size() -> Option<wgpu::BufferSize> {
        wgpu::BufferSize::new(mem::size_of::<T>() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::aligned_stride;

    #[test]
    fn entries_are_padded_to_the_device_alignment() {
        assert_eq!(aligned_stride(176, 256), 256);
        assert_eq!(aligned_stride(256, 256), 256);
        assert_eq!(aligned_stride(257, 256), 512);
        assert_eq!(aligned_stride(48, 16), 48);
    }

    #[test]
    fn zero_alignment_is_treated_as_one() {
        assert_eq!(aligned_stride(13, 0), 13);
    }
}

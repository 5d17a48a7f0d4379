//! Wrapper for a wgpu buffer object.

use crate::context::Context;
use bytemuck::Pod;

/// A vector kept in RAM and mirrored to the GPU on first use.
///
/// Scene graphs are built before the window exists, so nothing touches the
/// device until [`GpuVec::ensure_on_gpu`] is called from the prepare phase.
pub struct GpuVec<T: Pod> {
    dirty: bool,
    usage: wgpu::BufferUsages,
    buffer: Option<wgpu::Buffer>,
    data: Vec<T>,
    label: &'static str,
}

impl<T: Pod> GpuVec<T> {
    /// Creates a vector that is not yet uploaded to the GPU.
    pub fn new(data: Vec<T>, buf_type: BufferType, label: &'static str) -> GpuVec<T> {
        GpuVec {
            dirty: true,
            usage: buf_type.to_wgpu(),
            buffer: None,
            data,
            label,
        }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[inline]
    pub fn data(&self) -> &[T] {
        &self.data
    }

    /// Mutable access to the RAM copy. Marks the vector for re-upload.
    #[inline]
    pub fn data_mut(&mut self) -> &mut Vec<T> {
        self.dirty = true;
        &mut self.data
    }

    #[inline]
    pub fn is_on_gpu(&self) -> bool {
        self.buffer.is_some()
    }

    /// Whether the RAM copy changed since the last upload.
    #[inline]
    pub fn dirty(&self) -> bool {
        self.dirty
    }

    /// The GPU buffer, if uploaded.
    #[inline]
    pub fn buffer(&self) -> Option<&wgpu::Buffer> {
        self.buffer.as_ref()
    }

    /// Uploads the RAM copy if it changed and returns the buffer.
    ///
    /// Returns `None` for empty vectors: wgpu rejects zero-sized vertex buffers.
    pub fn ensure_on_gpu(&mut self) -> Option<&wgpu::Buffer> {
        if self.dirty {
            self.dirty = false;

            if self.data.is_empty() {
                self.buffer = None;
                return None;
            }

            let ctxt = Context::get();
            let bytes: &[u8] = bytemuck::cast_slice(&self.data);
            match &self.buffer {
                Some(buffer) if buffer.size() >= bytes.len() as u64 => {
                    ctxt.write_buffer(buffer, 0, bytes)
                }
                _ => {
                    self.buffer = Some(ctxt.create_buffer_init(
                        Some(self.label),
                        bytes,
                        self.usage | wgpu::BufferUsages::COPY_DST,
                    ))
                }
            }
        }

        self.buffer.as_ref()
    }

    /// Drops the GPU copy. The next [`GpuVec::ensure_on_gpu`] uploads again.
    pub fn unload_from_gpu(&mut self) {
        self.buffer = None;
        self.dirty = true;
    }
}

/// Type of gpu buffer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BufferType {
    /// Bindable as vertex data.
    Vertex,
    /// Bindable as index data.
    Index,
}

impl BufferType {
    #[inline]
    pub fn to_wgpu(self) -> wgpu::BufferUsages {
        match self {
            BufferType::Vertex => wgpu::BufferUsages::VERTEX,
            BufferType::Index => wgpu::BufferUsages::INDEX,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stays_in_ram_until_requested() {
        let mut v = GpuVec::new(vec![[0.0f32; 3]; 4], BufferType::Vertex, "test");
        assert!(!v.is_on_gpu());
        assert!(v.dirty());
        assert_eq!(v.len(), 4);

        v.data_mut().push([1.0; 3]);
        assert_eq!(v.data().len(), 5);
        assert!(!v.is_on_gpu());
    }

    #[test]
    fn empty_vectors_never_allocate() {
        let mut v = GpuVec::<u32>::new(Vec::new(), BufferType::Index, "empty");
        assert!(v.ensure_on_gpu().is_none());
        assert!(!v.dirty());
    }
}

// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! A GPU buffer with a logical length, a physical capacity and grow-on-demand.
//!
//! [`GrowableGpuBuffer`] backs every vertex, index, instance and indirect-draw
//! array of the renderer. It tracks how many elements are in use (`len`)
//! separately from how many are allocated (`capacity`), so callers can reset
//! occupancy every frame without giving memory back.
//!
//! # Growth
//!
//! ```text
//! reserve(n)          grow now; contents 0..len are preserved
//! request_capacity(n) grow the CPU mirror now, flag the GPU buffer
//! apply_pending_resize() later, outside any render pass
//! apply_pending_resize_discarding()
//!                     same, for buffers whose contents the next flush rewrites
//! ```
//!
//! The buffer never shrinks. A failed reallocation or write leaves the
//! previous buffer, capacity and contents untouched.

use crate::renderer::{
    api::buffer::{BufferDescriptor, BufferId, BufferUsage},
    error::ResourceError,
    traits::GraphicsDevice,
};
use bytemuck::Pod;
use std::borrow::Cow;
use std::marker::PhantomData;

/// How much to allocate when a buffer has to grow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GrowthPolicy {
    /// Allocate exactly the requested number of elements.
    Exact,
    /// Allocate the requested number of elements plus this many more.
    Slack(usize),
}

impl GrowthPolicy {
    fn apply(&self, required: usize) -> usize {
        match self {
            GrowthPolicy::Exact => required,
            GrowthPolicy::Slack(slack) => required + slack,
        }
    }
}

/// A typed GPU buffer region that grows on demand and optionally keeps a CPU mirror.
///
/// When mirrored, the mirror is always exactly `capacity` elements long and
/// holds what the GPU buffer holds (or will hold after the next
/// [`flush`](Self::flush)).
#[derive(Debug)]
pub struct GrowableGpuBuffer<T: Pod> {
    label: Cow<'static, str>,
    usage: BufferUsage,
    buffer: Option<BufferId>,
    /// Elements allocated on the GPU.
    gpu_capacity: usize,
    /// Elements allocated logically. Greater than `gpu_capacity` only while a
    /// resize is pending.
    capacity: usize,
    /// Elements in use.
    len: usize,
    mirror: Option<Vec<T>>,
    _marker: PhantomData<T>,
}

impl<T: Pod> GrowableGpuBuffer<T> {
    /// Size of one element in bytes.
    pub const ELEMENT_SIZE: u64 = std::mem::size_of::<T>() as u64;

    /// Creates an empty buffer. Nothing is allocated until the first reserve.
    ///
    /// `COPY_SRC | COPY_DST` are always added to `usage` so the buffer can be
    /// written and its contents carried over when it grows.
    pub fn new(label: impl Into<Cow<'static, str>>, usage: BufferUsage, mirrored: bool) -> Self {
        Self {
            label: label.into(),
            usage: usage | BufferUsage::COPY_SRC | BufferUsage::COPY_DST,
            buffer: None,
            gpu_capacity: 0,
            capacity: 0,
            len: 0,
            mirror: mirrored.then(Vec::new),
            _marker: PhantomData,
        }
    }

    /// Creates a buffer and allocates `capacity` elements immediately.
    pub fn with_capacity(
        device: &dyn GraphicsDevice,
        label: impl Into<Cow<'static, str>>,
        usage: BufferUsage,
        mirrored: bool,
        capacity: usize,
    ) -> Result<Self, ResourceError> {
        let mut buffer = Self::new(label, usage, mirrored);
        buffer.reserve(device, capacity, GrowthPolicy::Exact)?;
        Ok(buffer)
    }

    /// Ensures room for `required` elements, growing immediately if needed.
    ///
    /// Returns `Ok(true)` if a new GPU buffer was allocated. Calling it again
    /// with the same or a smaller `required` is a no-op.
    pub fn reserve(
        &mut self,
        device: &dyn GraphicsDevice,
        required: usize,
        policy: GrowthPolicy,
    ) -> Result<bool, ResourceError> {
        if required <= self.capacity {
            if self.needs_resize() {
                self.apply_pending_resize(device)?;
                return Ok(true);
            }
            return Ok(false);
        }
        let new_capacity = policy.apply(required);
        self.reallocate(device, new_capacity, true)?;
        self.grow_mirror(new_capacity);
        self.capacity = new_capacity;
        Ok(true)
    }

    /// Ensures room for `required` elements without touching the GPU.
    ///
    /// The mirror (if any) grows right away so staging can continue; the GPU
    /// buffer is flagged and reallocated by
    /// [`apply_pending_resize`](Self::apply_pending_resize). Returns `true`
    /// if the capacity grew.
    pub fn request_capacity(&mut self, required: usize, policy: GrowthPolicy) -> bool {
        if required <= self.capacity {
            return false;
        }
        let new_capacity = policy.apply(required);
        self.grow_mirror(new_capacity);
        self.capacity = new_capacity;
        log::debug!(
            "GrowableGpuBuffer({}): Resize to {} elements pending",
            self.label,
            new_capacity
        );
        true
    }

    /// Returns `true` if the GPU buffer is smaller than the logical capacity.
    pub fn needs_resize(&self) -> bool {
        self.gpu_capacity < self.capacity
    }

    /// Reallocates the GPU buffer to the logical capacity if a resize is pending.
    ///
    /// Must be called outside of any render pass. Returns `Ok(true)` if a
    /// reallocation happened.
    pub fn apply_pending_resize(&mut self, device: &dyn GraphicsDevice) -> Result<bool, ResourceError> {
        if !self.needs_resize() {
            return Ok(false);
        }
        self.reallocate(device, self.capacity, true)?;
        Ok(true)
    }

    /// Like [`apply_pending_resize`](Self::apply_pending_resize), but the new
    /// GPU buffer starts empty instead of receiving elements `0..len`.
    ///
    /// For per-frame streams whose whole range is uploaded by the following
    /// [`flush`](Self::flush), so each frame writes the buffer once.
    pub fn apply_pending_resize_discarding(
        &mut self,
        device: &dyn GraphicsDevice,
    ) -> Result<bool, ResourceError> {
        if !self.needs_resize() {
            return Ok(false);
        }
        self.reallocate(device, self.capacity, false)?;
        Ok(true)
    }

    fn grow_mirror(&mut self, new_capacity: usize) {
        if let Some(mirror) = self.mirror.as_mut() {
            mirror.resize(new_capacity, T::zeroed());
        }
    }

    /// Allocates a GPU buffer of `new_capacity` elements, carries over the
    /// first `len` elements if `carry` is set and releases the old buffer.
    /// On failure nothing changes.
    fn reallocate(
        &mut self,
        device: &dyn GraphicsDevice,
        new_capacity: usize,
        carry: bool,
    ) -> Result<(), ResourceError> {
        let size = new_capacity as u64 * Self::ELEMENT_SIZE;
        let new_buffer = device.create_buffer(&BufferDescriptor {
            label: Some(Cow::Borrowed(self.label.as_ref())),
            size,
            usage: self.usage,
        })?;

        if carry && self.len > 0 {
            let carried = match (&self.mirror, self.buffer) {
                (Some(mirror), _) => {
                    device.write_buffer(new_buffer, 0, bytemuck::cast_slice(&mirror[..self.len]))
                }
                (None, Some(old_buffer)) => {
                    let mut encoder = device.create_command_encoder(Some("GrowableGpuBuffer Copy"));
                    encoder.copy_buffer_to_buffer(
                        old_buffer,
                        0,
                        new_buffer,
                        0,
                        self.len as u64 * Self::ELEMENT_SIZE,
                    );
                    device.submit_command_buffer(encoder.finish());
                    Ok(())
                }
                (None, None) => Ok(()),
            };
            if let Err(e) = carried {
                if let Err(destroy_err) = device.destroy_buffer(new_buffer) {
                    log::warn!(
                        "GrowableGpuBuffer({}): Failed to release replacement buffer: {:?}",
                        self.label,
                        destroy_err
                    );
                }
                return Err(e);
            }
        }

        if let Some(old_buffer) = self.buffer.replace(new_buffer) {
            if let Err(e) = device.destroy_buffer(old_buffer) {
                log::warn!(
                    "GrowableGpuBuffer({}): Failed to destroy old buffer: {:?}",
                    self.label,
                    e
                );
            }
        }
        log::debug!(
            "GrowableGpuBuffer({}): Grew from {} to {} elements ({} bytes)",
            self.label,
            self.gpu_capacity,
            new_capacity,
            size
        );
        self.gpu_capacity = new_capacity;
        Ok(())
    }

    /// Copies `data` into the CPU mirror at element `offset`. Nothing reaches
    /// the GPU until [`flush`](Self::flush).
    /// ## Errors
    /// * `ResourceError::InvalidHandle` - If the buffer has no mirror.
    /// * `ResourceError::OutOfBounds` - If the range exceeds the capacity.
    pub fn stage(&mut self, offset: usize, data: &[T]) -> Result<(), ResourceError> {
        let end = offset + data.len();
        if end > self.capacity {
            return Err(ResourceError::OutOfBounds);
        }
        let mirror = self.mirror.as_mut().ok_or(ResourceError::InvalidHandle)?;
        mirror[offset..end].copy_from_slice(data);
        Ok(())
    }

    /// Writes `data` at element `offset` to the GPU buffer and the mirror.
    ///
    /// `len` is not changed.
    /// ## Errors
    /// * `ResourceError::OutOfBounds` - If the range exceeds the GPU capacity.
    /// * Any error from the device write, in which case the mirror is untouched.
    pub fn write(
        &mut self,
        device: &dyn GraphicsDevice,
        offset: usize,
        data: &[T],
    ) -> Result<(), ResourceError> {
        if data.is_empty() {
            return Ok(());
        }
        let end = offset + data.len();
        let buffer = match self.buffer {
            Some(buffer) if end <= self.gpu_capacity => buffer,
            _ => return Err(ResourceError::OutOfBounds),
        };
        device.write_buffer(
            buffer,
            offset as u64 * Self::ELEMENT_SIZE,
            bytemuck::cast_slice(data),
        )?;
        if let Some(mirror) = self.mirror.as_mut() {
            mirror[offset..end].copy_from_slice(data);
        }
        Ok(())
    }

    /// Uploads the mirrored elements `0..len` in a single write. Returns the
    /// number of bytes written.
    /// ## Errors
    /// * `ResourceError::InvalidHandle` - If the buffer has no mirror.
    /// * `ResourceError::OutOfBounds` - If a resize is still pending.
    pub fn flush(&self, device: &dyn GraphicsDevice) -> Result<u64, ResourceError> {
        let mirror = self.mirror.as_ref().ok_or(ResourceError::InvalidHandle)?;
        if self.len == 0 {
            return Ok(0);
        }
        let buffer = match self.buffer {
            Some(buffer) if self.len <= self.gpu_capacity => buffer,
            _ => return Err(ResourceError::OutOfBounds),
        };
        let bytes: &[u8] = bytemuck::cast_slice(&mirror[..self.len]);
        device.write_buffer(buffer, 0, bytes)?;
        Ok(bytes.len() as u64)
    }

    /// Sets the number of elements in use.
    /// ## Errors
    /// * `ResourceError::OutOfBounds` - If `len` exceeds the capacity.
    pub fn set_len(&mut self, len: usize) -> Result<(), ResourceError> {
        if len > self.capacity {
            return Err(ResourceError::OutOfBounds);
        }
        self.len = len;
        Ok(())
    }

    /// Marks every element as unused. Capacity is kept.
    pub fn clear(&mut self) {
        self.len = 0;
    }

    /// Number of elements in use.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` if no element is in use.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of elements allocated.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Bytes in use.
    pub fn byte_len(&self) -> u64 {
        self.len as u64 * Self::ELEMENT_SIZE
    }

    /// Bytes allocated.
    pub fn byte_capacity(&self) -> u64 {
        self.capacity as u64 * Self::ELEMENT_SIZE
    }

    /// The current GPU buffer, if one has been allocated.
    pub fn buffer(&self) -> Option<BufferId> {
        self.buffer
    }

    /// The mirrored elements in use, or `None` if the buffer is not mirrored.
    pub fn as_slice(&self) -> Option<&[T]> {
        self.mirror.as_ref().map(|mirror| &mirror[..self.len])
    }

    /// The debug label.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Releases the GPU buffer. The object can be reused afterwards and will
    /// allocate again on the next reserve.
    pub fn destroy(&mut self, device: &dyn GraphicsDevice) {
        if let Some(buffer) = self.buffer.take() {
            if let Err(e) = device.destroy_buffer(buffer) {
                log::warn!(
                    "GrowableGpuBuffer({}): Failed to destroy buffer: {:?}",
                    self.label,
                    e
                );
            }
        }
        self.gpu_capacity = 0;
        self.capacity = 0;
        self.len = 0;
        if let Some(mirror) = self.mirror.as_mut() {
            mirror.clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockGraphicsDevice;

    fn vertex_buffer(mirrored: bool) -> GrowableGpuBuffer<u32> {
        GrowableGpuBuffer::new("Test", BufferUsage::VERTEX, mirrored)
    }

    #[test]
    fn test_reserve_is_idempotent() {
        let device = MockGraphicsDevice::new();
        let mut buffer = vertex_buffer(true);

        assert!(buffer.reserve(&device, 10, GrowthPolicy::Slack(16)).unwrap());
        let first = buffer.buffer();
        assert_eq!(buffer.capacity(), 26);

        assert!(!buffer.reserve(&device, 10, GrowthPolicy::Slack(16)).unwrap());
        assert!(!buffer.reserve(&device, 4, GrowthPolicy::Slack(16)).unwrap());
        assert_eq!(buffer.buffer(), first);
        assert_eq!(buffer.capacity(), 26);
        assert_eq!(device.created_buffer_count(), 1);
    }

    #[test]
    fn test_mirror_length_matches_capacity() {
        let device = MockGraphicsDevice::new();
        let mut buffer = vertex_buffer(true);
        buffer.reserve(&device, 3, GrowthPolicy::Exact).unwrap();
        buffer.request_capacity(9, GrowthPolicy::Exact);
        assert_eq!(buffer.mirror.as_ref().map(Vec::len), Some(9));
        assert_eq!(buffer.byte_capacity(), 36);
    }

    #[test]
    fn test_growth_preserves_mirrored_contents() {
        let device = MockGraphicsDevice::new();
        let mut buffer = vertex_buffer(true);
        buffer.reserve(&device, 3, GrowthPolicy::Exact).unwrap();
        buffer.write(&device, 0, &[1, 2, 3]).unwrap();
        buffer.set_len(3).unwrap();
        let old = buffer.buffer().unwrap();

        buffer.reserve(&device, 8, GrowthPolicy::Exact).unwrap();
        let new = buffer.buffer().unwrap();

        assert_ne!(old, new);
        assert!(device.is_destroyed(old));
        let bytes = device.buffer_contents(new).unwrap();
        let words: &[u32] = bytemuck::cast_slice(&bytes[..12]);
        assert_eq!(words, &[1, 2, 3]);
    }

    #[test]
    fn test_growth_copies_unmirrored_contents_on_the_gpu() {
        let device = MockGraphicsDevice::new();
        let mut buffer = vertex_buffer(false);
        buffer.reserve(&device, 2, GrowthPolicy::Exact).unwrap();
        buffer.write(&device, 0, &[7, 9]).unwrap();
        buffer.set_len(2).unwrap();

        buffer.reserve(&device, 4, GrowthPolicy::Exact).unwrap();
        buffer.write(&device, 2, &[11, 13]).unwrap();

        let bytes = device.buffer_contents(buffer.buffer().unwrap()).unwrap();
        let words: &[u32] = bytemuck::cast_slice(&bytes);
        assert_eq!(words, &[7, 9, 11, 13]);
        assert_eq!(device.submission_count(), 1);
    }

    #[test]
    fn test_failed_allocation_keeps_previous_state() {
        let device = MockGraphicsDevice::new();
        let mut buffer = vertex_buffer(true);
        buffer.reserve(&device, 2, GrowthPolicy::Exact).unwrap();
        buffer.write(&device, 0, &[5, 6]).unwrap();
        buffer.set_len(2).unwrap();
        let before = buffer.buffer();

        device.fail_next_buffer_creations(1);
        assert_eq!(
            buffer.reserve(&device, 64, GrowthPolicy::Exact),
            Err(ResourceError::OutOfMemory)
        );
        assert_eq!(buffer.buffer(), before);
        assert_eq!(buffer.capacity(), 2);
        assert_eq!(buffer.as_slice(), Some(&[5, 6][..]));
    }

    #[test]
    fn test_failed_write_keeps_mirror() {
        let device = MockGraphicsDevice::new();
        let mut buffer = vertex_buffer(true);
        buffer.reserve(&device, 2, GrowthPolicy::Exact).unwrap();
        buffer.write(&device, 0, &[1, 1]).unwrap();
        buffer.set_len(2).unwrap();

        device.fail_buffer_writes(true);
        assert!(buffer.write(&device, 0, &[9, 9]).is_err());
        assert_eq!(buffer.as_slice(), Some(&[1, 1][..]));
    }

    #[test]
    fn test_pending_resize_defers_gpu_allocation() {
        let device = MockGraphicsDevice::new();
        let mut buffer = vertex_buffer(true);
        buffer.reserve(&device, 4, GrowthPolicy::Exact).unwrap();

        assert!(buffer.request_capacity(6, GrowthPolicy::Slack(16)));
        assert!(buffer.needs_resize());
        assert_eq!(device.created_buffer_count(), 1);

        buffer.stage(0, &[1, 2, 3, 4, 5, 6]).unwrap();
        buffer.set_len(6).unwrap();
        assert_eq!(buffer.flush(&device), Err(ResourceError::OutOfBounds));

        assert!(buffer.apply_pending_resize(&device).unwrap());
        assert!(!buffer.needs_resize());
        assert!(!buffer.apply_pending_resize(&device).unwrap());
        assert_eq!(buffer.flush(&device), Ok(24));
    }

    #[test]
    fn test_discarding_resize_leaves_upload_to_flush() {
        let device = MockGraphicsDevice::new();
        let mut buffer = vertex_buffer(true);
        buffer.reserve(&device, 2, GrowthPolicy::Exact).unwrap();
        buffer.stage(0, &[1, 2]).unwrap();
        buffer.set_len(2).unwrap();

        buffer.request_capacity(5, GrowthPolicy::Exact);
        buffer.stage(2, &[3, 4, 5]).unwrap();
        buffer.set_len(5).unwrap();
        assert!(buffer.apply_pending_resize_discarding(&device).unwrap());
        let id = buffer.buffer().unwrap();
        assert!(device.writes_to(id).is_empty());

        assert_eq!(buffer.flush(&device), Ok(20));
        assert_eq!(device.writes_to(id).len(), 1);
        let words: Vec<u32> = bytemuck::pod_collect_to_vec(&device.buffer_contents(id).unwrap());
        assert_eq!(words, vec![1, 2, 3, 4, 5]);
        assert!(!buffer.apply_pending_resize_discarding(&device).unwrap());
    }

    #[test]
    fn test_clear_keeps_capacity() {
        let device = MockGraphicsDevice::new();
        let mut buffer = vertex_buffer(true);
        buffer.reserve(&device, 8, GrowthPolicy::Exact).unwrap();
        buffer.set_len(8).unwrap();
        buffer.clear();
        assert!(buffer.is_empty());
        assert_eq!(buffer.capacity(), 8);
        assert_eq!(buffer.flush(&device), Ok(0));
        assert_eq!(buffer.set_len(9), Err(ResourceError::OutOfBounds));
    }

    #[test]
    fn test_destroy_releases_buffer() {
        let device = MockGraphicsDevice::new();
        let mut buffer = vertex_buffer(false);
        buffer.reserve(&device, 8, GrowthPolicy::Exact).unwrap();
        let id = buffer.buffer().unwrap();
        buffer.destroy(&device);
        assert!(device.is_destroyed(id));
        assert!(buffer.buffer().is_none());
        assert_eq!(buffer.capacity(), 0);
    }
}

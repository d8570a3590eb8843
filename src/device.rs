//! Device-mapped buffers and the allocator seam they come from.
//!
//! The converter never talks to a GPU runtime directly. Everything it needs
//! (allocate a mapped RGB8 buffer, copy host→device, copy device→host,
//! release) goes through [`DeviceAllocator`], so a CUDA, Vulkan or
//! unified-memory backend can be plugged in, and tests can count every byte.

use alloc::vec::Vec;
use core::fmt;
use core::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};

use tracing::{trace, warn};

use crate::DeviceStatus;

/// Bytes per pixel of a device image (packed RGB8).
pub const DEVICE_BPP: usize = 3;

/// Allocator and transfer engine for device-mapped RGB8 buffers.
///
/// Every buffer returned by [`alloc_mapped`](Self::alloc_mapped) must come
/// back through [`release`](Self::release) on the same allocator.
/// [`DeviceImage`] does this on drop.
pub trait DeviceAllocator {
    /// Handle to one device-mapped allocation.
    type Buffer;

    /// Allocate `width × height` packed RGB8 pixels (`width * height * 3` bytes).
    fn alloc_mapped(&self, width: usize, height: usize) -> Result<Self::Buffer, DeviceStatus>;

    /// Copy `src` into the device buffer. Blocks until the copy completes.
    fn upload(&self, dst: &mut Self::Buffer, src: &[u8]) -> Result<(), DeviceStatus>;

    /// Copy the device buffer into `dst`. Blocks until the copy completes.
    fn download(&self, src: &Self::Buffer, dst: &mut [u8]) -> Result<(), DeviceStatus>;

    /// Return a buffer to the allocator.
    fn release(&self, buffer: Self::Buffer);
}

// ---------------------------------------------------------------------------
// DeviceImage
// ---------------------------------------------------------------------------

/// A device buffer together with its dimensions and the allocator that owns it.
///
/// Dropping a `DeviceImage` releases the buffer through that allocator.
/// Use [`into_raw`](Self::into_raw) to take over the release yourself.
pub struct DeviceImage<'a, A: DeviceAllocator + ?Sized> {
    alloc: &'a A,
    // `None` only after `into_raw`
    buffer: Option<A::Buffer>,
    width: usize,
    height: usize,
}

impl<'a, A: DeviceAllocator + ?Sized> DeviceImage<'a, A> {
    /// Adopt a buffer previously allocated by `alloc`.
    ///
    /// `buffer` must come from `alloc` itself. The guard releases it there on
    /// drop, and an allocator handed a buffer it did not produce may reject
    /// it ([`HostMappedAllocator`] logs and ignores the release). The
    /// dimensions are trusted; they are not checked against the allocation.
    pub fn from_raw(alloc: &'a A, buffer: A::Buffer, width: usize, height: usize) -> Self {
        Self {
            alloc,
            buffer: Some(buffer),
            width,
            height,
        }
    }

    /// Give up ownership. The caller must release the buffer through the
    /// same allocator.
    pub fn into_raw(mut self) -> (A::Buffer, usize, usize) {
        let buffer = self.buffer.take().expect("buffer present until into_raw");
        (buffer, self.width, self.height)
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    /// Size of the pixel data in bytes.
    #[inline]
    pub fn byte_len(&self) -> usize {
        self.width * self.height * DEVICE_BPP
    }

    #[inline]
    pub fn allocator(&self) -> &'a A {
        self.alloc
    }

    pub fn buffer(&self) -> &A::Buffer {
        self.buffer.as_ref().expect("buffer present until into_raw")
    }

    pub fn buffer_mut(&mut self) -> &mut A::Buffer {
        self.buffer.as_mut().expect("buffer present until into_raw")
    }

    /// Download into a new BGR processing image. See [`from_device`](crate::from_device).
    pub fn to_processing(&self) -> Result<crate::ProcessingImage, crate::ConvertError> {
        crate::from_device(self.alloc, self.buffer(), self.width, self.height)
    }
}

impl<A: DeviceAllocator + ?Sized> Drop for DeviceImage<'_, A> {
    fn drop(&mut self) {
        if let Some(buffer) = self.buffer.take() {
            self.alloc.release(buffer);
        }
    }
}

impl<A: DeviceAllocator + ?Sized> fmt::Debug for DeviceImage<'_, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeviceImage")
            .field("width", &self.width)
            .field("height", &self.height)
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// HostMappedAllocator
// ---------------------------------------------------------------------------

/// Driver code reported for injected transfer faults.
const INJECTED_FAULT: i32 = -1;

/// Source of [`HostMappedAllocator`] identities.
static NEXT_ALLOCATOR_ID: AtomicU64 = AtomicU64::new(1);

/// Mapped buffer backed by host memory, tagged with the allocator that made it.
pub struct MappedBuffer {
    data: Vec<u8>,
    owner: u64,
}

impl MappedBuffer {
    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Host view of the mapping.
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }
}

impl fmt::Debug for MappedBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MappedBuffer").field("len", &self.data.len()).finish()
    }
}

/// [`DeviceAllocator`] over host memory, for unified-memory devices and tests.
///
/// Keeps a byte budget and counts live allocations so callers can verify
/// that nothing leaks. Transfer faults can be injected with
/// [`fail_uploads`](Self::fail_uploads) and [`fail_downloads`](Self::fail_downloads).
#[derive(Debug)]
pub struct HostMappedAllocator {
    id: u64,
    capacity: usize,
    in_use: AtomicUsize,
    live: AtomicUsize,
    fail_uploads: AtomicBool,
    fail_downloads: AtomicBool,
}

impl HostMappedAllocator {
    /// Allocator that refuses requests beyond `capacity` live bytes.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            id: NEXT_ALLOCATOR_ID.fetch_add(1, Ordering::Relaxed),
            capacity,
            in_use: AtomicUsize::new(0),
            live: AtomicUsize::new(0),
            fail_uploads: AtomicBool::new(false),
            fail_downloads: AtomicBool::new(false),
        }
    }

    /// Allocator limited only by host memory.
    pub fn unbounded() -> Self {
        Self::with_capacity(usize::MAX)
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Bytes currently allocated and not yet released.
    pub fn bytes_in_use(&self) -> usize {
        self.in_use.load(Ordering::Acquire)
    }

    /// Buffers currently allocated and not yet released.
    pub fn live_buffers(&self) -> usize {
        self.live.load(Ordering::Acquire)
    }

    /// Make every subsequent upload fail (or succeed again).
    pub fn fail_uploads(&self, fail: bool) {
        self.fail_uploads.store(fail, Ordering::Release);
    }

    /// Make every subsequent download fail (or succeed again).
    pub fn fail_downloads(&self, fail: bool) {
        self.fail_downloads.store(fail, Ordering::Release);
    }

    fn reserve(&self, len: usize) -> Result<(), DeviceStatus> {
        self.in_use
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |used| {
                used.checked_add(len).filter(|&total| total <= self.capacity)
            })
            .map(|_| ())
            .map_err(|_| DeviceStatus::OutOfMemory)
    }

    fn unreserve(&self, len: usize) {
        let released = self
            .in_use
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |used| used.checked_sub(len));
        if released.is_err() {
            warn!(bytes = len, "released more bytes than were reserved");
        }
    }

    /// Whether `buffer` was allocated by this allocator.
    pub fn owns(&self, buffer: &MappedBuffer) -> bool {
        buffer.owner == self.id
    }

    fn check_owner(&self, buffer: &MappedBuffer) -> Result<(), DeviceStatus> {
        if self.owns(buffer) {
            Ok(())
        } else {
            warn!(bytes = buffer.len(), "buffer from another allocator");
            Err(DeviceStatus::ForeignBuffer)
        }
    }
}

impl Default for HostMappedAllocator {
    fn default() -> Self {
        Self::unbounded()
    }
}

impl DeviceAllocator for HostMappedAllocator {
    type Buffer = MappedBuffer;

    fn alloc_mapped(&self, width: usize, height: usize) -> Result<MappedBuffer, DeviceStatus> {
        let len = width
            .checked_mul(height)
            .and_then(|n| n.checked_mul(DEVICE_BPP))
            .ok_or(DeviceStatus::OutOfMemory)?;
        self.reserve(len)?;
        let mut data = Vec::new();
        if data.try_reserve_exact(len).is_err() {
            self.unreserve(len);
            return Err(DeviceStatus::OutOfMemory);
        }
        data.resize(len, 0);
        self.live.fetch_add(1, Ordering::AcqRel);
        trace!(width, height, bytes = len, "mapped buffer allocated");
        Ok(MappedBuffer {
            data,
            owner: self.id,
        })
    }

    fn upload(&self, dst: &mut MappedBuffer, src: &[u8]) -> Result<(), DeviceStatus> {
        self.check_owner(dst)?;
        if self.fail_uploads.load(Ordering::Acquire) {
            return Err(DeviceStatus::Driver(INJECTED_FAULT));
        }
        if dst.data.len() != src.len() {
            return Err(DeviceStatus::LengthMismatch);
        }
        dst.data.copy_from_slice(src);
        Ok(())
    }

    fn download(&self, src: &MappedBuffer, dst: &mut [u8]) -> Result<(), DeviceStatus> {
        self.check_owner(src)?;
        if self.fail_downloads.load(Ordering::Acquire) {
            return Err(DeviceStatus::Driver(INJECTED_FAULT));
        }
        if src.data.len() != dst.len() {
            return Err(DeviceStatus::LengthMismatch);
        }
        dst.copy_from_slice(&src.data);
        Ok(())
    }

    /// Buffers from another allocator are logged and freed without touching
    /// this allocator's accounting.
    fn release(&self, buffer: MappedBuffer) {
        if self.check_owner(&buffer).is_err() {
            return;
        }
        let len = buffer.data.len();
        drop(buffer);
        self.unreserve(len);
        let _ = self
            .live
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1));
        trace!(bytes = len, "mapped buffer released");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capacity_is_enforced() {
        let alloc = HostMappedAllocator::with_capacity(30);
        let a = alloc.alloc_mapped(2, 5).unwrap();
        assert_eq!(alloc.bytes_in_use(), 30);
        assert_eq!(alloc.alloc_mapped(1, 1).unwrap_err(), DeviceStatus::OutOfMemory);
        alloc.release(a);
        assert_eq!(alloc.bytes_in_use(), 0);
        assert_eq!(alloc.live_buffers(), 0);
    }

    #[test]
    fn test_overflowing_request_is_out_of_memory() {
        let alloc = HostMappedAllocator::unbounded();
        assert_eq!(
            alloc.alloc_mapped(usize::MAX, 2).unwrap_err(),
            DeviceStatus::OutOfMemory
        );
        assert_eq!(alloc.bytes_in_use(), 0);
    }

    #[test]
    fn test_transfer_length_mismatch() {
        let alloc = HostMappedAllocator::unbounded();
        let mut buf = alloc.alloc_mapped(2, 1).unwrap();
        assert_eq!(alloc.upload(&mut buf, &[0; 5]), Err(DeviceStatus::LengthMismatch));
        assert_eq!(alloc.download(&buf, &mut [0; 7]), Err(DeviceStatus::LengthMismatch));
        alloc.upload(&mut buf, &[1, 2, 3, 4, 5, 6]).unwrap();
        let mut back = [0u8; 6];
        alloc.download(&buf, &mut back).unwrap();
        assert_eq!(back, [1, 2, 3, 4, 5, 6]);
        alloc.release(buf);
    }

    #[test]
    fn test_device_image_releases_on_drop() {
        let alloc = HostMappedAllocator::unbounded();
        {
            let buf = alloc.alloc_mapped(4, 4).unwrap();
            let img = DeviceImage::from_raw(&alloc, buf, 4, 4);
            assert_eq!(img.byte_len(), 48);
            assert_eq!(alloc.live_buffers(), 1);
        }
        assert_eq!(alloc.live_buffers(), 0);
        assert_eq!(alloc.bytes_in_use(), 0);
    }

    #[test]
    fn test_foreign_buffer_leaves_accounting_alone() {
        let a = HostMappedAllocator::unbounded();
        let b = HostMappedAllocator::unbounded();
        let buf = a.alloc_mapped(2, 2).unwrap();
        assert!(a.owns(&buf));
        assert!(!b.owns(&buf));
        drop(DeviceImage::from_raw(&b, buf, 2, 2));
        assert_eq!((b.bytes_in_use(), b.live_buffers()), (0, 0));
        assert_eq!((a.bytes_in_use(), a.live_buffers()), (12, 1));
    }

    #[test]
    fn test_foreign_buffer_transfers_are_refused() {
        let a = HostMappedAllocator::unbounded();
        let b = HostMappedAllocator::unbounded();
        let mut buf = a.alloc_mapped(1, 1).unwrap();
        assert_eq!(b.upload(&mut buf, &[1, 2, 3]), Err(DeviceStatus::ForeignBuffer));
        assert_eq!(b.download(&buf, &mut [0; 3]), Err(DeviceStatus::ForeignBuffer));
        a.release(buf);
        assert_eq!(a.live_buffers(), 0);
    }

    #[test]
    fn test_into_raw_hands_over_release() {
        let alloc = HostMappedAllocator::unbounded();
        let buf = alloc.alloc_mapped(2, 2).unwrap();
        let img = DeviceImage::from_raw(&alloc, buf, 2, 2);
        let (raw, w, h) = img.into_raw();
        assert_eq!((w, h), (2, 2));
        assert_eq!(alloc.live_buffers(), 1);
        alloc.release(raw);
        assert_eq!(alloc.live_buffers(), 0);
    }
}

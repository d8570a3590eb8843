//! The four conversions between display, processing and device images.
//!
//! ```text
//!  Display ──from_display──▶ Processing ──to_device──▶ Device
//!     ▲                        │    ▲                    │
//!     └───────to_display───────┘    └────from_device─────┘
//! ```
//!
//! All four are synchronous and stateless. Every allocation they make is
//! either returned to the caller or released before they return, on success
//! and failure alike.

use alloc::vec::Vec;

use garb::bytes as kernels;
use tracing::{debug, warn};

use crate::image::packed_len;
use crate::{
    ChannelLayout, ConvertError, DEVICE_BPP, DeviceAllocator, DeviceImage, DisplayImage,
    ProcessingImage, ProcessingView, SizeError, TransferDirection, swizzle,
};

/// Zero-filled host buffer of exactly `len` bytes, or `Allocation` if the
/// host allocator refuses.
fn host_buffer(len: usize) -> Result<Vec<u8>, ConvertError> {
    let mut buf = Vec::new();
    if buf.try_reserve_exact(len).is_err() {
        warn!(bytes = len, "host allocation failed");
        return Err(ConvertError::Allocation {
            requested: len,
            source: None,
        });
    }
    buf.resize(len, 0);
    Ok(buf)
}

/// Write `src` into `dst` as packed RGB, `width * 3` bytes per row.
///
/// Gray is replicated, BGR(A) is reversed, alpha is dropped without blending.
fn normalize_into(src: ProcessingView<'_>, dst: &mut [u8]) -> Result<(), SizeError> {
    let (w, h, ss) = (src.width(), src.height(), src.stride());
    let ds = w * DEVICE_BPP;
    let bytes = src.as_bytes();
    let reordered = match src.layout() {
        ChannelLayout::Gray => return swizzle::gray_to_rgb_strided(bytes, dst, w, h, ss, ds),
        ChannelLayout::Rgb => return copy_rows(src, dst),
        ChannelLayout::Bgr => kernels::bgr_to_rgb_strided(bytes, dst, w, h, ss, ds),
        ChannelLayout::Bgra => kernels::bgra_to_rgb_strided(bytes, dst, w, h, ss, ds),
        ChannelLayout::Rgba => kernels::rgba_to_rgb_strided(bytes, dst, w, h, ss, ds),
    };
    reordered.map_err(SizeError::from)
}

/// Copy the pixel bytes of an RGB view row by row, dropping padding.
fn copy_rows(src: ProcessingView<'_>, dst: &mut [u8]) -> Result<(), SizeError> {
    let row_bytes = src.width() * DEVICE_BPP;
    if dst.len() < row_bytes * src.height() {
        return Err(SizeError::PixelCountMismatch);
    }
    for (y, row) in dst.chunks_exact_mut(row_bytes).take(src.height()).enumerate() {
        row.copy_from_slice(src.row(y));
    }
    Ok(())
}

/// Normalize a processing image into a fresh packed RGB host buffer.
fn normalized(src: ProcessingView<'_>) -> Result<Vec<u8>, ConvertError> {
    let len = packed_len(src.width(), src.height(), DEVICE_BPP)?;
    let mut rgb = host_buffer(len)?;
    normalize_into(src, &mut rgb)?;
    Ok(rgb)
}

/// Processing image → display image.
///
/// Any supported layout becomes packed RGB in a newly allocated buffer that
/// does not alias `src`. `src` is not modified.
///
/// ```rust
/// use pixferry::{ChannelLayout, ProcessingView, to_display};
///
/// let gray = [10u8, 20, 30, 40];
/// let view = ProcessingView::new(&gray, 2, 2, ChannelLayout::Gray).unwrap();
/// let display = to_display(view).unwrap();
/// assert_eq!(&display.as_bytes()[..6], &[10, 10, 10, 20, 20, 20]);
/// ```
pub fn to_display(src: ProcessingView<'_>) -> Result<DisplayImage, ConvertError> {
    let rgb = normalized(src)?;
    debug!(
        width = src.width(),
        height = src.height(),
        layout = %src.layout(),
        "processing image converted for display"
    );
    Ok(DisplayImage::from_packed(rgb, src.width(), src.height()))
}

/// Display image → processing image, reusing the display allocation.
///
/// The RGB bytes are reordered to BGR in place, no copy is made. The display
/// image is consumed because its contents are no longer RGB afterwards.
pub fn from_display(img: DisplayImage) -> Result<ProcessingImage, ConvertError> {
    let (mut data, width, height) = img.into_parts();
    kernels::rgb_to_bgr_inplace(&mut data).map_err(SizeError::from)?;
    debug!(width, height, "display image reinterpreted as bgr");
    Ok(ProcessingImage::from_packed(
        data,
        width,
        height,
        ChannelLayout::Bgr,
    ))
}

/// Reorder a borrowed packed RGB buffer to BGR in place and view it as a
/// processing image.
///
/// Use this for buffers owned by a GUI toolkit. `buf` must be exactly
/// `width * height * 3` bytes and holds BGR when this returns `Ok`.
pub fn from_display_in_place(
    buf: &mut [u8],
    width: usize,
    height: usize,
) -> Result<ProcessingView<'_>, ConvertError> {
    let len = packed_len(width, height, 3)?;
    if buf.len() != len {
        return Err(SizeError::PixelCountMismatch.into());
    }
    kernels::rgb_to_bgr_inplace(buf).map_err(SizeError::from)?;
    ProcessingView::new(buf, width, height, ChannelLayout::Bgr)
}

/// Processing image → device image.
///
/// Normalizes `src` to packed RGB on the host, allocates a mapped buffer from
/// `alloc` and uploads into it. If the allocation or the upload fails, any
/// device buffer already obtained is released before the error is returned.
pub fn to_device<'a, A>(
    alloc: &'a A,
    src: ProcessingView<'_>,
) -> Result<DeviceImage<'a, A>, ConvertError>
where
    A: DeviceAllocator + ?Sized,
{
    let (width, height) = (src.width(), src.height());
    let staging = normalized(src)?;
    let bytes = staging.len();

    let buffer = alloc.alloc_mapped(width, height).map_err(|status| {
        warn!(width, height, bytes, %status, "device allocation failed");
        ConvertError::Allocation {
            requested: bytes,
            source: Some(status),
        }
    })?;
    // From here on, the guard releases the buffer on every exit path.
    let mut image = DeviceImage::from_raw(alloc, buffer, width, height);

    alloc.upload(image.buffer_mut(), &staging).map_err(|status| {
        warn!(width, height, bytes, %status, "host-to-device transfer failed");
        ConvertError::Transfer {
            direction: TransferDirection::HostToDevice,
            bytes,
            source: status,
        }
    })?;

    debug!(width, height, layout = %src.layout(), "uploaded to device");
    Ok(image)
}

/// Device buffer → processing image.
///
/// `width` and `height` are trusted; a buffer of a different size surfaces as
/// a failed transfer from the allocator. The data is downloaded into a host
/// staging buffer and written as BGR into a new, separately owned buffer. The
/// staging buffer is released before returning.
pub fn from_device<A>(
    alloc: &A,
    buffer: &A::Buffer,
    width: usize,
    height: usize,
) -> Result<ProcessingImage, ConvertError>
where
    A: DeviceAllocator + ?Sized,
{
    let bytes = packed_len(width, height, DEVICE_BPP)?;
    let mut staging = host_buffer(bytes)?;
    alloc.download(buffer, &mut staging).map_err(|status| {
        warn!(width, height, bytes, %status, "device-to-host transfer failed");
        ConvertError::Transfer {
            direction: TransferDirection::DeviceToHost,
            bytes,
            source: status,
        }
    })?;

    let mut bgr = host_buffer(bytes)?;
    kernels::rgb_to_bgr(&staging, &mut bgr).map_err(SizeError::from)?;
    drop(staging);

    debug!(width, height, "downloaded from device");
    Ok(ProcessingImage::from_packed(
        bgr,
        width,
        height,
        ChannelLayout::Bgr,
    ))
}

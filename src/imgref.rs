//! Interop with [`imgref`] images of [`rgb`] pixel types.
//!
//! ```rust
//! use rgb::{Bgr, Rgb};
//! use ::imgref::ImgVec;
//! use pixferry::imgref;
//!
//! let bgr = ImgVec::new(vec![Bgr { b: 3u8, g: 2, r: 1 }; 4], 2, 2);
//! let view = imgref::view_bgr(bgr.as_ref()).unwrap();
//! let display = pixferry::to_display(view).unwrap();
//! let rgb: ImgVec<Rgb<u8>> = imgref::display_to_imgvec(display);
//! assert_eq!(rgb.buf()[0], Rgb::new(1, 2, 3));
//! ```

use alloc::vec::Vec;

use ::imgref::{ImgRef, ImgVec};
use rgb::{Bgr, Bgra, Gray, Rgb, Rgba};

use crate::image::strided_len;
use crate::{ChannelLayout, ConvertError, DisplayImage, ProcessingImage, ProcessingView};

// Reinterpret a byte vector as pixels, copying only when the allocation's
// capacity is not a whole number of pixels. `bytes.len()` must be.
fn bytes_to_pixels<P: bytemuck::Pod>(bytes: Vec<u8>) -> Vec<P> {
    bytemuck::allocation::try_cast_vec(bytes)
        .unwrap_or_else(|(_, bytes)| bytemuck::cast_slice(&bytes).to_vec())
}

fn pixels_to_bytes<P: bytemuck::Pod>(pixels: Vec<P>) -> Vec<u8> {
    bytemuck::allocation::try_cast_vec(pixels)
        .unwrap_or_else(|(_, pixels)| bytemuck::cast_slice(&pixels).to_vec())
}

// ---------------------------------------------------------------------------
// Typed images → processing views (zero-copy)
// ---------------------------------------------------------------------------

fn view_of<'a, P: bytemuck::Pod>(
    img: ImgRef<'a, P>,
    layout: ChannelLayout,
) -> Result<ProcessingView<'a>, ConvertError> {
    let bpp = core::mem::size_of::<P>();
    let bytes: &[u8] = bytemuck::cast_slice(img.buf());
    ProcessingView::with_stride(bytes, img.width(), img.height(), img.stride() * bpp, layout)
}

/// View an `ImgRef<Bgr<u8>>` as a `Bgr` processing image. Stride is kept.
pub fn view_bgr(img: ImgRef<'_, Bgr<u8>>) -> Result<ProcessingView<'_>, ConvertError> {
    view_of(img, ChannelLayout::Bgr)
}

/// View an `ImgRef<Bgra<u8>>` as a `Bgra` processing image.
pub fn view_bgra(img: ImgRef<'_, Bgra<u8>>) -> Result<ProcessingView<'_>, ConvertError> {
    view_of(img, ChannelLayout::Bgra)
}

/// View an `ImgRef<Gray<u8>>` as a `Gray` processing image.
pub fn view_gray(img: ImgRef<'_, Gray<u8>>) -> Result<ProcessingView<'_>, ConvertError> {
    view_of(img, ChannelLayout::Gray)
}

/// View an `ImgRef<Rgb<u8>>` as an `Rgb` processing image.
pub fn view_rgb(img: ImgRef<'_, Rgb<u8>>) -> Result<ProcessingView<'_>, ConvertError> {
    view_of(img, ChannelLayout::Rgb)
}

/// View an `ImgRef<Rgba<u8>>` as an `Rgba` processing image.
pub fn view_rgba(img: ImgRef<'_, Rgba<u8>>) -> Result<ProcessingView<'_>, ConvertError> {
    view_of(img, ChannelLayout::Rgba)
}

// ---------------------------------------------------------------------------
// Owned conversions
// ---------------------------------------------------------------------------

/// Reinterpret a display image as `ImgVec<Rgb<u8>>`.
///
/// Zero-copy unless the buffer's capacity is not a multiple of 3 bytes.
pub fn display_to_imgvec(img: DisplayImage) -> ImgVec<Rgb<u8>> {
    let (data, w, h) = img.into_parts();
    ImgVec::new(bytes_to_pixels(data), w, h)
}

/// Wrap an `ImgVec<Rgb<u8>>` as a display image.
///
/// Zero-copy when the image has no row padding; padded rows are compacted.
pub fn imgvec_to_display(img: ImgVec<Rgb<u8>>) -> Result<DisplayImage, ConvertError> {
    let (w, h) = (img.width(), img.height());
    let buf: Vec<Rgb<u8>> = if img.stride() == w {
        img.into_buf()
    } else {
        img.rows().flatten().copied().collect()
    };
    DisplayImage::new(pixels_to_bytes(buf), w, h)
}

/// Reinterpret a `Bgr` processing image as `ImgVec<Bgr<u8>>`.
///
/// Zero-copy when the allocation allows it. Bytes past the last row are
/// dropped. Returns the image unchanged if its layout is not `Bgr` or its
/// stride is not a whole number of pixels.
pub fn processing_to_bgr_imgvec(
    img: ProcessingImage,
) -> Result<ImgVec<Bgr<u8>>, ProcessingImage> {
    if img.layout() != ChannelLayout::Bgr || !img.stride().is_multiple_of(3) {
        return Err(img);
    }
    let (w, h, stride) = (img.width(), img.height(), img.stride());
    let Ok(used) = strided_len(w, h, stride, 3) else {
        return Err(img);
    };
    let mut data = img.into_vec();
    data.truncate(used);
    Ok(ImgVec::new_stride(bytes_to_pixels(data), w, h, stride / 3))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

//! Host-side image representations.
//!
//! [`DisplayImage`] is what a GUI toolkit draws: packed RGB, no padding.
//! [`ProcessingImage`] / [`ProcessingView`] are what an image-processing
//! library works on: 1, 3 or 4 channels with an explicit [`ChannelLayout`]
//! and a row stride.

use alloc::vec::Vec;
use core::fmt;

use crate::{ConvertError, SizeError};

/// Channel order of a processing-domain buffer.
///
/// Processing libraries in the OpenCV tradition store color as BGR(A), but
/// nothing in a bare byte buffer says so. The layout tag makes the order part
/// of the image instead of an assumption baked into each conversion.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum ChannelLayout {
    /// Single luminance channel.
    Gray,
    /// Blue, green, red.
    Bgr,
    /// Blue, green, red, alpha.
    Bgra,
    /// Red, green, blue.
    Rgb,
    /// Red, green, blue, alpha.
    Rgba,
}

impl ChannelLayout {
    /// Layout implied by a bare channel count: 1 → Gray, 3 → Bgr, 4 → Bgra.
    pub fn from_channels(channels: usize) -> Result<Self, ConvertError> {
        match channels {
            1 => Ok(Self::Gray),
            3 => Ok(Self::Bgr),
            4 => Ok(Self::Bgra),
            n => Err(ConvertError::UnsupportedChannels(n)),
        }
    }

    /// Bytes per pixel.
    #[inline]
    pub const fn channels(self) -> usize {
        match self {
            Self::Gray => 1,
            Self::Bgr | Self::Rgb => 3,
            Self::Bgra | Self::Rgba => 4,
        }
    }

    #[inline]
    pub const fn has_alpha(self) -> bool {
        matches!(self, Self::Bgra | Self::Rgba)
    }
}

impl fmt::Display for ChannelLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Gray => "gray",
            Self::Bgr => "bgr",
            Self::Bgra => "bgra",
            Self::Rgb => "rgb",
            Self::Rgba => "rgba",
        })
    }
}

/// Exact byte length of a packed `width × height × bpp` image.
pub(crate) fn packed_len(width: usize, height: usize, bpp: usize) -> Result<usize, SizeError> {
    if width == 0 || height == 0 {
        return Err(SizeError::EmptyImage);
    }
    width
        .checked_mul(height)
        .and_then(|n| n.checked_mul(bpp))
        .ok_or(SizeError::InvalidStride)
}

/// Minimum buffer length for `height` rows of `width` pixels whose starts are
/// `stride` bytes apart. The last row carries no padding.
pub(crate) fn strided_len(
    width: usize,
    height: usize,
    stride: usize,
    bpp: usize,
) -> Result<usize, SizeError> {
    if width == 0 || height == 0 {
        return Err(SizeError::EmptyImage);
    }
    let row = width
        .checked_mul(bpp)
        .filter(|&row| row <= stride)
        .ok_or(SizeError::InvalidStride)?;
    (height - 1)
        .checked_mul(stride)
        .and_then(|rows| rows.checked_add(row))
        .ok_or(SizeError::InvalidStride)
}

/// Check that a `len`-byte buffer holds the described strided image.
pub(crate) fn check_strided(
    len: usize,
    width: usize,
    height: usize,
    stride: usize,
    bpp: usize,
) -> Result<(), SizeError> {
    if len < strided_len(width, height, stride, bpp)? {
        return Err(SizeError::InvalidStride);
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// DisplayImage
// ---------------------------------------------------------------------------

/// Packed RGB image in host memory, `width × height × 3` bytes, no row padding.
///
/// The buffer comes from the Rust global allocator. A GUI toolkit that wants
/// to own the pixels must adopt the `Vec` from [`into_vec`](Self::into_vec)
/// (wrap it and drop it through Rust) or copy it; it must not free the
/// pointer with its own deallocator.
#[derive(Clone, PartialEq, Eq)]
pub struct DisplayImage {
    data: Vec<u8>,
    width: usize,
    height: usize,
}

impl DisplayImage {
    /// Wrap a packed RGB buffer. `data.len()` must equal `width * height * 3`.
    pub fn new(data: Vec<u8>, width: usize, height: usize) -> Result<Self, ConvertError> {
        let len = packed_len(width, height, 3)?;
        if data.len() != len {
            return Err(SizeError::PixelCountMismatch.into());
        }
        Ok(Self {
            data,
            width,
            height,
        })
    }

    pub(crate) fn from_packed(data: Vec<u8>, width: usize, height: usize) -> Self {
        debug_assert_eq!(data.len(), width * height * 3);
        Self {
            data,
            width,
            height,
        }
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    /// RGB bytes, row-major.
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    #[inline]
    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Hand the allocation to the caller.
    pub fn into_vec(self) -> Vec<u8> {
        self.data
    }

    /// Hand the allocation to the caller together with its dimensions.
    pub fn into_parts(self) -> (Vec<u8>, usize, usize) {
        (self.data, self.width, self.height)
    }
}

#[cfg(feature = "rgb")]
impl DisplayImage {
    /// Pixels as `rgb::Rgb<u8>`.
    pub fn as_pixels(&self) -> &[rgb::Rgb<u8>] {
        bytemuck::cast_slice(&self.data)
    }

    pub fn as_pixels_mut(&mut self) -> &mut [rgb::Rgb<u8>] {
        bytemuck::cast_slice_mut(&mut self.data)
    }
}

impl fmt::Debug for DisplayImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DisplayImage")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("bytes", &self.data.len())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// ProcessingView
// ---------------------------------------------------------------------------

/// Borrowed processing-domain image.
///
/// `stride` is the distance in bytes between the start of consecutive rows.
/// Padding bytes are never read.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct ProcessingView<'a> {
    data: &'a [u8],
    width: usize,
    height: usize,
    stride: usize,
    layout: ChannelLayout,
}

impl<'a> ProcessingView<'a> {
    /// View over a tightly packed buffer (`stride = width × channels`).
    pub fn new(
        data: &'a [u8],
        width: usize,
        height: usize,
        layout: ChannelLayout,
    ) -> Result<Self, ConvertError> {
        let stride = width
            .checked_mul(layout.channels())
            .ok_or(SizeError::InvalidStride)?;
        Self::with_stride(data, width, height, stride, layout)
    }

    /// View over a buffer whose rows are `stride` bytes apart.
    pub fn with_stride(
        data: &'a [u8],
        width: usize,
        height: usize,
        stride: usize,
        layout: ChannelLayout,
    ) -> Result<Self, ConvertError> {
        check_strided(data.len(), width, height, stride, layout.channels())?;
        Ok(Self {
            data,
            width,
            height,
            stride,
            layout,
        })
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    /// Row stride in bytes.
    #[inline]
    pub fn stride(&self) -> usize {
        self.stride
    }

    #[inline]
    pub fn layout(&self) -> ChannelLayout {
        self.layout
    }

    #[inline]
    pub fn channels(&self) -> usize {
        self.layout.channels()
    }

    /// Underlying bytes, including any row padding.
    #[inline]
    pub fn as_bytes(&self) -> &'a [u8] {
        self.data
    }

    /// Pixel bytes of row `y`, without padding.
    pub fn row(&self, y: usize) -> &'a [u8] {
        &self.data[y * self.stride..][..self.width * self.channels()]
    }

    /// Copy into an owned, tightly packed image.
    pub fn to_packed(&self) -> ProcessingImage {
        let row_bytes = self.width * self.channels();
        let mut data = Vec::with_capacity(row_bytes * self.height);
        for y in 0..self.height {
            data.extend_from_slice(self.row(y));
        }
        ProcessingImage::from_packed(data, self.width, self.height, self.layout)
    }
}

impl fmt::Debug for ProcessingView<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProcessingView")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("stride", &self.stride)
            .field("layout", &self.layout)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// ProcessingImage
// ---------------------------------------------------------------------------

/// Owned processing-domain image.
#[derive(Clone, PartialEq, Eq)]
pub struct ProcessingImage {
    data: Vec<u8>,
    width: usize,
    height: usize,
    stride: usize,
    layout: ChannelLayout,
}

impl ProcessingImage {
    /// Wrap a tightly packed buffer.
    pub fn new(
        data: Vec<u8>,
        width: usize,
        height: usize,
        layout: ChannelLayout,
    ) -> Result<Self, ConvertError> {
        let stride = width
            .checked_mul(layout.channels())
            .ok_or(SizeError::InvalidStride)?;
        Self::with_stride(data, width, height, stride, layout)
    }

    /// Wrap a buffer whose rows are `stride` bytes apart.
    pub fn with_stride(
        data: Vec<u8>,
        width: usize,
        height: usize,
        stride: usize,
        layout: ChannelLayout,
    ) -> Result<Self, ConvertError> {
        check_strided(data.len(), width, height, stride, layout.channels())?;
        Ok(Self {
            data,
            width,
            height,
            stride,
            layout,
        })
    }

    pub(crate) fn from_packed(
        data: Vec<u8>,
        width: usize,
        height: usize,
        layout: ChannelLayout,
    ) -> Self {
        let stride = width * layout.channels();
        debug_assert_eq!(data.len(), stride * height);
        Self {
            data,
            width,
            height,
            stride,
            layout,
        }
    }

    pub fn as_view(&self) -> ProcessingView<'_> {
        ProcessingView {
            data: &self.data,
            width: self.width,
            height: self.height,
            stride: self.stride,
            layout: self.layout,
        }
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    #[inline]
    pub fn stride(&self) -> usize {
        self.stride
    }

    #[inline]
    pub fn layout(&self) -> ChannelLayout {
        self.layout
    }

    #[inline]
    pub fn channels(&self) -> usize {
        self.layout.channels()
    }

    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    #[inline]
    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    pub fn into_vec(self) -> Vec<u8> {
        self.data
    }
}

impl<'a> From<&'a ProcessingImage> for ProcessingView<'a> {
    fn from(img: &'a ProcessingImage) -> Self {
        img.as_view()
    }
}

impl fmt::Debug for ProcessingImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProcessingImage")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("stride", &self.stride)
            .field("layout", &self.layout)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;

    #[test]
    fn test_layout_from_channels() {
        assert_eq!(ChannelLayout::from_channels(1), Ok(ChannelLayout::Gray));
        assert_eq!(ChannelLayout::from_channels(3), Ok(ChannelLayout::Bgr));
        assert_eq!(ChannelLayout::from_channels(4), Ok(ChannelLayout::Bgra));
        assert_eq!(
            ChannelLayout::from_channels(2),
            Err(ConvertError::UnsupportedChannels(2))
        );
    }

    #[test]
    fn test_display_image_len_must_match() {
        assert!(DisplayImage::new(vec![0; 12], 2, 2).is_ok());
        assert_eq!(
            DisplayImage::new(vec![0; 11], 2, 2),
            Err(ConvertError::InvalidInput(SizeError::PixelCountMismatch))
        );
        assert_eq!(
            DisplayImage::new(vec![], 0, 2),
            Err(ConvertError::InvalidInput(SizeError::EmptyImage))
        );
    }

    #[cfg(feature = "rgb")]
    #[test]
    fn test_display_pixels() {
        let mut img = DisplayImage::new(vec![1, 2, 3, 4, 5, 6], 2, 1).unwrap();
        assert_eq!(img.as_pixels()[1], rgb::Rgb::new(4, 5, 6));
        img.as_pixels_mut()[0].g = 9;
        assert_eq!(img.as_bytes(), &[1, 9, 3, 4, 5, 6]);
    }

    #[test]
    fn test_view_stride_validation() {
        let buf = [0u8; 20];
        // 3 BGR pixels = 9 bytes per row, stride 10: needs 10 + 9 bytes
        assert!(ProcessingView::with_stride(&buf, 3, 2, 10, ChannelLayout::Bgr).is_ok());
        assert_eq!(
            ProcessingView::with_stride(&buf, 3, 2, 8, ChannelLayout::Bgr),
            Err(ConvertError::InvalidInput(SizeError::InvalidStride))
        );
        assert_eq!(
            ProcessingView::with_stride(&buf[..18], 3, 2, 10, ChannelLayout::Bgr),
            Err(ConvertError::InvalidInput(SizeError::InvalidStride))
        );
    }

    #[test]
    fn test_strided_len() {
        assert_eq!(strided_len(3, 2, 10, 3), Ok(19));
        assert_eq!(strided_len(3, 1, 9, 3), Ok(9));
        assert_eq!(strided_len(0, 1, 9, 3), Err(SizeError::EmptyImage));
        assert_eq!(strided_len(4, 2, 10, 3), Err(SizeError::InvalidStride));
        assert_eq!(
            strided_len(1, usize::MAX, usize::MAX, 3),
            Err(SizeError::InvalidStride)
        );
    }

    #[test]
    fn test_view_to_packed_drops_padding() {
        let buf = [1u8, 2, 3, 0xEE, 4, 5, 6, 0xEE];
        let view = ProcessingView::with_stride(&buf, 1, 2, 4, ChannelLayout::Bgr).unwrap();
        let owned = view.to_packed();
        assert_eq!(owned.as_bytes(), &[1, 2, 3, 4, 5, 6]);
        assert_eq!(owned.stride(), 3);
    }
}

use archmage::prelude::*;

/// Replicate each gray byte of `src` into a pixel of `dst`.
///
/// Stops at whichever runs out first; a trailing partial pixel is left alone.
pub(super) fn fan_out_row(src: &[u8], dst: &mut [u8]) {
    let (pixels, _) = dst.as_chunks_mut::<3>();
    for (px, &v) in pixels.iter_mut().zip(src) {
        *px = [v; 3];
    }
}

// Strides and lengths are validated by the caller. Only the last row may be
// shorter than its stride.
pub(super) fn gray_rows_to_rgb_scalar(
    _token: ScalarToken,
    src: &[u8],
    dst: &mut [u8],
    width: usize,
    height: usize,
    src_stride: usize,
    dst_stride: usize,
) {
    let rows = src.chunks(src_stride).zip(dst.chunks_mut(dst_stride));
    for (s, d) in rows.take(height) {
        fan_out_row(&s[..width], &mut d[..width * 3]);
    }
}

use archmage::prelude::*;
use safe_unaligned_simd::x86_64::{_mm_loadu_si128, _mm_storeu_si128};

use super::scalar::fan_out_row;

/// pshufb indices for one 16-gray block: output byte `k` of the 48-byte RGB
/// block takes gray byte `k / 3`.
const FAN_OUT: [[i8; 16]; 3] = {
    let mut masks = [[0i8; 16]; 3];
    let mut k = 0;
    while k < 48 {
        masks[k / 16][k % 16] = (k / 3) as i8;
        k += 1;
    }
    masks
};

#[rite]
fn fan_out_row_v3(_token: X64V3Token, src: &[u8], dst: &mut [u8]) {
    let masks = [
        _mm_loadu_si128(&FAN_OUT[0]),
        _mm_loadu_si128(&FAN_OUT[1]),
        _mm_loadu_si128(&FAN_OUT[2]),
    ];
    let (blocks, tail) = src.as_chunks::<16>();
    let (out_blocks, out_tail) = dst.as_chunks_mut::<48>();
    for (grays, out) in blocks.iter().zip(out_blocks.iter_mut()) {
        let grays = _mm_loadu_si128(grays);
        let (lanes, _) = out.as_chunks_mut::<16>();
        for (lane, &mask) in lanes.iter_mut().zip(&masks) {
            _mm_storeu_si128(lane, _mm_shuffle_epi8(grays, mask));
        }
    }
    fan_out_row(tail, out_tail);
}

#[arcane]
pub(super) fn gray_rows_to_rgb_v3(
    token: X64V3Token,
    src: &[u8],
    dst: &mut [u8],
    width: usize,
    height: usize,
    src_stride: usize,
    dst_stride: usize,
) {
    let rows = src.chunks(src_stride).zip(dst.chunks_mut(dst_stride));
    for (s, d) in rows.take(height) {
        fan_out_row_v3(token, &s[..width], &mut d[..width * 3]);
    }
}

//! Gray → RGB fan-out for strided rows.
//!
//! Channel reordering between RGB, BGR and BGRA rows comes from [`garb`].
//! This module adds the 1 → 3 channel expansion that the display and
//! device paths need, dispatched at runtime between AVX2 and scalar code.

use archmage::incant;

use crate::SizeError;
use crate::image::check_strided;

mod scalar;
use scalar::*;

#[cfg(target_arch = "x86_64")]
mod avx2;
#[cfg(target_arch = "x86_64")]
use avx2::*;

#[cfg(test)]
mod tests;

/// Expand gray rows (1 byte/px) into RGB rows (3 bytes/px), R = G = B = gray.
///
/// `src_stride` / `dst_stride` are the distances in bytes between the start of
/// consecutive rows. Padding bytes are neither read nor written. The output
/// is symmetric, so it is equally valid as BGR.
pub fn gray_to_rgb_strided(
    src: &[u8],
    dst: &mut [u8],
    width: usize,
    height: usize,
    src_stride: usize,
    dst_stride: usize,
) -> Result<(), SizeError> {
    check_strided(src.len(), width, height, src_stride, 1)?;
    check_strided(dst.len(), width, height, dst_stride, 3)?;
    incant!(
        gray_rows_to_rgb(src, dst, width, height, src_stride, dst_stride),
        [v3, scalar]
    );
    Ok(())
}

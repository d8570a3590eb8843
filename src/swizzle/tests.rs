use super::*;
use alloc::{vec, vec::Vec};
use archmage::testing::{CompileTimePolicy, for_each_token_permutation};

fn policy() -> CompileTimePolicy {
    if std::env::var_os("CI").is_some() {
        CompileTimePolicy::Fail
    } else {
        CompileTimePolicy::WarnStderr
    }
}

const PAD: u8 = 0xCC;

/// Gray rows with `pad` junk bytes after each row.
fn gray_rows(width: usize, height: usize, pad: usize) -> Vec<u8> {
    let stride = width + pad;
    (0..stride * height)
        .map(|i| if i % stride < width { (i * 13 % 251) as u8 } else { 0xEE })
        .collect()
}

// Widths straddle the 16-pixel SIMD block: tail only, exact blocks, blocks + tail.
const WIDTHS: &[usize] = &[1, 2, 5, 15, 16, 17, 31, 32, 33, 48, 100, 257];

#[test]
fn permutation_gray_fan_out_packed() {
    let report = for_each_token_permutation(policy(), |perm| {
        for &w in WIDTHS {
            let src = gray_rows(w, 3, 0);
            let mut dst = vec![0u8; w * 3 * 3];
            gray_to_rgb_strided(&src, &mut dst, w, 3, w, w * 3).unwrap();
            for (px, &g) in dst.chunks_exact(3).zip(&src) {
                assert_eq!(px, [g, g, g], "w={w} tier={perm}");
            }
        }
    });
    std::eprintln!("gray_fan_out_packed: {report}");
}

#[test]
fn permutation_gray_fan_out_padded() {
    let report = for_each_token_permutation(policy(), |perm| {
        for &w in WIDTHS {
            let (h, src_pad, dst_pad) = (4, 7, 5);
            let src = gray_rows(w, h, src_pad);
            let (ss, ds) = (w + src_pad, w * 3 + dst_pad);
            let mut dst = vec![PAD; ds * h];
            gray_to_rgb_strided(&src, &mut dst, w, h, ss, ds).unwrap();
            for y in 0..h {
                let out = &dst[y * ds..][..ds];
                for x in 0..w {
                    let g = src[y * ss + x];
                    assert_eq!(out[x * 3..x * 3 + 3], [g, g, g], "w={w} y={y} tier={perm}");
                }
                assert!(
                    out[w * 3..].iter().all(|&b| b == PAD),
                    "padding written w={w} y={y} tier={perm}"
                );
            }
        }
    });
    std::eprintln!("gray_fan_out_padded: {report}");
}

#[test]
fn last_row_needs_no_padding() {
    // Three rows of 4 pixels, strides 6 and 14, buffers end right after row 3
    let src = gray_rows(4, 3, 2);
    let src = &src[..6 * 2 + 4];
    let mut dst = vec![0u8; 14 * 2 + 12];
    gray_to_rgb_strided(src, &mut dst, 4, 3, 6, 14).unwrap();
    assert_eq!(&dst[28..31], &[src[12]; 3]);
}

#[test]
fn extra_rows_are_ignored() {
    let src = vec![9u8; 4 * 4];
    let mut dst = vec![0u8; 4 * 3 * 4];
    gray_to_rgb_strided(&src, &mut dst, 4, 2, 4, 12).unwrap();
    assert!(dst[..24].iter().all(|&b| b == 9));
    assert!(dst[24..].iter().all(|&b| b == 0));
}

#[test]
fn geometry_errors() {
    let mut dst = [0u8; 64];
    assert_eq!(
        gray_to_rgb_strided(&[0; 8], &mut dst, 0, 1, 8, 24),
        Err(SizeError::EmptyImage)
    );
    assert_eq!(
        gray_to_rgb_strided(&[0; 8], &mut dst, 2, 0, 8, 24),
        Err(SizeError::EmptyImage)
    );
    // Source stride shorter than a row
    assert_eq!(
        gray_to_rgb_strided(&[0; 8], &mut dst, 4, 2, 3, 12),
        Err(SizeError::InvalidStride)
    );
    // Destination too short for the last row
    assert_eq!(
        gray_to_rgb_strided(&[0; 8], &mut dst[..20], 4, 2, 4, 12),
        Err(SizeError::InvalidStride)
    );
}

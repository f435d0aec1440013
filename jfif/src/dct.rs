// Copyright (c) the jfif-rs Project Authors. All rights reserved.
//
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

//! Dequantization and the 8x8 integer inverse DCT.
//!
//! The IDCT is the separable 11-multiply fixed-point formulation
//! (Loeffler/Ligtenberg/Moschytz) with 12-bit scaled constants. Rounding
//! offsets and shifts are part of the decoder's bit-exact contract and must
//! not be changed. All arithmetic wraps on overflow, matching 32-bit
//! integer semantics, so pathological coefficient/table combinations cannot
//! panic.

use std::num::Wrapping;

use crate::BLOCK_SIZE;
use crate::util::clamp_u8;

/// Natural (row-major) index of the k-th coefficient in zigzag scan order.
pub const UNZIGZAG: [usize; 64] = [
    0, 1, 8, 16, 9, 2, 3, 10, //
    17, 24, 32, 25, 18, 11, 4, 5, //
    12, 19, 26, 33, 40, 48, 41, 34, //
    27, 20, 13, 6, 7, 14, 21, 28, //
    35, 42, 49, 56, 57, 50, 43, 36, //
    29, 22, 15, 23, 30, 37, 44, 51, //
    58, 59, 52, 45, 38, 31, 39, 46, //
    53, 60, 61, 54, 47, 55, 62, 63,
];

// cos/sin(k*pi/16) and sqrt(2), sqrt(1/2), scaled by 4096.
const DCT_COS_1: Wrapping<i32> = Wrapping(4017);
const DCT_SIN_1: Wrapping<i32> = Wrapping(799);
const DCT_COS_3: Wrapping<i32> = Wrapping(3406);
const DCT_SIN_3: Wrapping<i32> = Wrapping(2276);
const DCT_COS_6: Wrapping<i32> = Wrapping(1567);
const DCT_SIN_6: Wrapping<i32> = Wrapping(3784);
const DCT_SQRT_2: Wrapping<i32> = Wrapping(5793);
const DCT_SQRT_1D2: Wrapping<i32> = Wrapping(2896);

#[inline]
fn w(x: i32) -> Wrapping<i32> {
    Wrapping(x)
}

/// Multiplies zigzag-ordered coefficients by a natural-order quantization
/// table, writing the products in natural order.
pub fn dequantize(coeffs: &[i32], qt: &[i32; 64], out: &mut [i32; 64]) {
    debug_assert!(coeffs.len() >= BLOCK_SIZE);
    for k in 0..BLOCK_SIZE {
        let n = UNZIGZAG[k];
        out[n] = coeffs[k].wrapping_mul(qt[n]);
    }
}

/// In-place 8x8 inverse DCT on dequantized, natural-order values.
pub fn inverse_dct(p: &mut [i32; 64]) {
    // Rows.
    for i in 0..8 {
        let row = 8 * i;
        if p[row + 1..row + 8] == [0; 7] {
            let t = ((DCT_SQRT_2 * w(p[row]) + w(512)) >> 10).0;
            for j in 0..8 {
                p[row + j] = t;
            }
            continue;
        }

        // stage 4
        let mut v0 = (DCT_SQRT_2 * w(p[row]) + w(128)) >> 8;
        let mut v1 = (DCT_SQRT_2 * w(p[row + 4]) + w(128)) >> 8;
        let mut v2 = w(p[row + 2]);
        let mut v3 = w(p[row + 6]);
        let mut v4 = (DCT_SQRT_1D2 * (w(p[row + 1]) - w(p[row + 7])) + w(128)) >> 8;
        let mut v7 = (DCT_SQRT_1D2 * (w(p[row + 1]) + w(p[row + 7])) + w(128)) >> 8;
        let mut v5 = w(p[row + 3]) << 4;
        let mut v6 = w(p[row + 5]) << 4;

        // stage 3
        v0 = (v0 + v1 + w(1)) >> 1;
        v1 = v0 - v1;
        let mut t = (v2 * DCT_SIN_6 + v3 * DCT_COS_6 + w(2048)) >> 12;
        v2 = (v2 * DCT_COS_6 - v3 * DCT_SIN_6 + w(2048)) >> 12;
        v3 = t;
        v4 = (v4 + v6 + w(1)) >> 1;
        v6 = v4 - v6;
        v7 = (v7 + v5 + w(1)) >> 1;
        v5 = v7 - v5;

        // stage 2
        v0 = (v0 + v3 + w(1)) >> 1;
        v3 = v0 - v3;
        v1 = (v1 + v2 + w(1)) >> 1;
        v2 = v1 - v2;
        t = (v4 * DCT_SIN_3 + v7 * DCT_COS_3 + w(2048)) >> 12;
        v4 = (v4 * DCT_COS_3 - v7 * DCT_SIN_3 + w(2048)) >> 12;
        v7 = t;
        t = (v5 * DCT_SIN_1 + v6 * DCT_COS_1 + w(2048)) >> 12;
        v5 = (v5 * DCT_COS_1 - v6 * DCT_SIN_1 + w(2048)) >> 12;
        v6 = t;

        // stage 1
        p[row] = (v0 + v7).0;
        p[row + 7] = (v0 - v7).0;
        p[row + 1] = (v1 + v6).0;
        p[row + 6] = (v1 - v6).0;
        p[row + 2] = (v2 + v5).0;
        p[row + 5] = (v2 - v5).0;
        p[row + 3] = (v3 + v4).0;
        p[row + 4] = (v3 - v4).0;
    }

    // Columns.
    for col in 0..8 {
        if (1..8).all(|j| p[col + 8 * j] == 0) {
            let t = ((DCT_SQRT_2 * w(p[col]) + w(8192)) >> 14).0;
            for j in 0..8 {
                p[col + 8 * j] = t;
            }
            continue;
        }

        // stage 4
        let mut v0 = (DCT_SQRT_2 * w(p[col]) + w(2048)) >> 12;
        let mut v1 = (DCT_SQRT_2 * w(p[col + 32]) + w(2048)) >> 12;
        let mut v2 = w(p[col + 16]);
        let mut v3 = w(p[col + 48]);
        let mut v4 = (DCT_SQRT_1D2 * (w(p[col + 8]) - w(p[col + 56])) + w(2048)) >> 12;
        let mut v7 = (DCT_SQRT_1D2 * (w(p[col + 8]) + w(p[col + 56])) + w(2048)) >> 12;
        let mut v5 = w(p[col + 24]);
        let mut v6 = w(p[col + 40]);

        // stage 3
        v0 = (v0 + v1 + w(1)) >> 1;
        v1 = v0 - v1;
        let mut t = (v2 * DCT_SIN_6 + v3 * DCT_COS_6 + w(2048)) >> 12;
        v2 = (v2 * DCT_COS_6 - v3 * DCT_SIN_6 + w(2048)) >> 12;
        v3 = t;
        v4 = (v4 + v6 + w(1)) >> 1;
        v6 = v4 - v6;
        v7 = (v7 + v5 + w(1)) >> 1;
        v5 = v7 - v5;

        // stage 2
        v0 = (v0 + v3 + w(1)) >> 1;
        v3 = v0 - v3;
        v1 = (v1 + v2 + w(1)) >> 1;
        v2 = v1 - v2;
        t = (v4 * DCT_SIN_3 + v7 * DCT_COS_3 + w(2048)) >> 12;
        v4 = (v4 * DCT_COS_3 - v7 * DCT_SIN_3 + w(2048)) >> 12;
        v7 = t;
        t = (v5 * DCT_SIN_1 + v6 * DCT_COS_1 + w(2048)) >> 12;
        v5 = (v5 * DCT_COS_1 - v6 * DCT_SIN_1 + w(2048)) >> 12;
        v6 = t;

        // stage 1
        p[col] = (v0 + v7).0;
        p[col + 56] = (v0 - v7).0;
        p[col + 8] = (v1 + v6).0;
        p[col + 48] = (v1 - v6).0;
        p[col + 16] = (v2 + v5).0;
        p[col + 40] = (v2 - v5).0;
        p[col + 24] = (v3 + v4).0;
        p[col + 32] = (v3 - v4).0;
    }
}

/// Full block reconstruction: dequantize, inverse DCT, level shift and clamp.
pub fn dequantize_and_idct(coeffs: &[i32], qt: &[i32; 64], out: &mut [u8; 64]) {
    let mut p = [0i32; BLOCK_SIZE];
    dequantize(coeffs, qt, &mut p);
    inverse_dct(&mut p);
    for i in 0..BLOCK_SIZE {
        out[i] = clamp_u8(128 + (p[i].wrapping_add(8) >> 4));
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn zigzag_index(natural: usize) -> usize {
        UNZIGZAG.iter().position(|&n| n == natural).unwrap()
    }

    #[test]
    fn unzigzag_is_a_permutation() {
        let mut seen = [false; 64];
        for &n in UNZIGZAG.iter() {
            assert!(!seen[n]);
            seen[n] = true;
        }
    }

    #[test]
    fn dequantize_maps_zigzag_to_natural() {
        let mut coeffs = [0i32; 64];
        for (k, c) in coeffs.iter_mut().enumerate() {
            *c = k as i32 + 1;
        }
        let mut qt = [0i32; 64];
        for (n, q) in qt.iter_mut().enumerate() {
            *q = (n as i32 % 7) + 2;
        }
        let mut out = [0i32; 64];
        dequantize(&coeffs, &qt, &mut out);
        for n in 0..64 {
            assert_eq!(out[n], coeffs[zigzag_index(n)] * qt[n]);
        }
    }

    #[test]
    fn flat_block_is_spatially_constant() {
        for dc in [-100, -1, 0, 1, 17, 100] {
            let mut coeffs = [0i32; 64];
            coeffs[0] = dc;
            let qt = [1i32; 64];
            let mut out = [0u8; 64];
            dequantize_and_idct(&coeffs, &qt, &mut out);
            let row = (5793 * dc + 512) >> 10;
            let col = (5793 * row + 8192) >> 14;
            let expected = clamp_u8(128 + ((col + 8) >> 4));
            assert!(out.iter().all(|&s| s == expected), "dc={dc}: {out:?}");
        }
    }

    #[test]
    fn zero_block_is_mid_gray() {
        let coeffs = [0i32; 64];
        let qt = [16i32; 64];
        let mut out = [0u8; 64];
        dequantize_and_idct(&coeffs, &qt, &mut out);
        assert!(out.iter().all(|&s| s == 128));
    }

    #[test]
    fn dc_saturates_to_sample_range() {
        let mut coeffs = [0i32; 64];
        coeffs[0] = 10_000;
        let qt = [16i32; 64];
        let mut out = [0u8; 64];
        dequantize_and_idct(&coeffs, &qt, &mut out);
        assert!(out.iter().all(|&s| s == 255));
        coeffs[0] = -10_000;
        dequantize_and_idct(&coeffs, &qt, &mut out);
        assert!(out.iter().all(|&s| s == 0));
    }

    #[test]
    fn extreme_inputs_do_not_panic() {
        let coeffs = [i32::MAX; 64];
        let qt = [65_535i32; 64];
        let mut out = [0u8; 64];
        dequantize_and_idct(&coeffs, &qt, &mut out);
    }
}

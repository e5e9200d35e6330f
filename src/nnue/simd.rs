//! SIMD-optimized accumulator updates.
//!
//! Supports:
//! - `x86_64`: `AVX2` (256-bit vectors, 16 i16 at a time)
//! - aarch64: NEON (128-bit vectors, 8 i16 at a time)
//! - Fallback: Scalar operations
//!
//! All paths use wrapping arithmetic, so an accumulator built incrementally
//! is bit-identical to one built from scratch regardless of update order.

// ============================================================================
// Public API - dispatches to platform-specific implementations
// ============================================================================

/// `acc[i] += weights[i]` (wrapping). Both slices must have equal length.
#[inline]
pub fn add_weights(acc: &mut [i16], weights: &[i16]) {
    debug_assert_eq!(acc.len(), weights.len());

    #[cfg(target_arch = "aarch64")]
    {
        // SAFETY: NEON is always available on aarch64; lengths checked inside.
        unsafe { add_weights_neon(acc, weights) }
    }

    #[cfg(target_arch = "x86_64")]
    {
        if is_x86_feature_detected!("avx2") {
            // SAFETY: feature detected at runtime; lengths checked inside.
            unsafe { add_weights_avx2(acc, weights) }
        } else {
            add_weights_scalar(acc, weights);
        }
    }

    #[cfg(not(any(target_arch = "x86_64", target_arch = "aarch64")))]
    {
        add_weights_scalar(acc, weights);
    }
}

/// `acc[i] -= weights[i]` (wrapping). Both slices must have equal length.
#[inline]
pub fn sub_weights(acc: &mut [i16], weights: &[i16]) {
    debug_assert_eq!(acc.len(), weights.len());

    #[cfg(target_arch = "aarch64")]
    {
        // SAFETY: NEON is always available on aarch64; lengths checked inside.
        unsafe { sub_weights_neon(acc, weights) }
    }

    #[cfg(target_arch = "x86_64")]
    {
        if is_x86_feature_detected!("avx2") {
            // SAFETY: feature detected at runtime; lengths checked inside.
            unsafe { sub_weights_avx2(acc, weights) }
        } else {
            sub_weights_scalar(acc, weights);
        }
    }

    #[cfg(not(any(target_arch = "x86_64", target_arch = "aarch64")))]
    {
        sub_weights_scalar(acc, weights);
    }
}

/// PSQT accumulators are only `PSQT_BUCKETS` wide; plain loops suffice.
#[inline]
pub fn add_psqt(acc: &mut [i32], weights: &[i32]) {
    for (a, &w) in acc.iter_mut().zip(weights) {
        *a = a.wrapping_add(w);
    }
}

#[inline]
pub fn sub_psqt(acc: &mut [i32], weights: &[i32]) {
    for (a, &w) in acc.iter_mut().zip(weights) {
        *a = a.wrapping_sub(w);
    }
}

// ============================================================================
// Scalar implementations (fallback, and the tail of the vector paths)
// ============================================================================

#[inline]
fn add_weights_scalar(acc: &mut [i16], weights: &[i16]) {
    for (a, &w) in acc.iter_mut().zip(weights) {
        *a = a.wrapping_add(w);
    }
}

#[inline]
fn sub_weights_scalar(acc: &mut [i16], weights: &[i16]) {
    for (a, &w) in acc.iter_mut().zip(weights) {
        *a = a.wrapping_sub(w);
    }
}

// ============================================================================
// NEON implementations (aarch64)
// ============================================================================

#[cfg(target_arch = "aarch64")]
unsafe fn add_weights_neon(acc: &mut [i16], weights: &[i16]) {
    use std::arch::aarch64::{vaddq_s16, vld1q_s16, vst1q_s16};

    let n = acc.len().min(weights.len());
    let chunks = n / 8 * 8;
    let acc_ptr = acc.as_mut_ptr();
    let weights_ptr = weights.as_ptr();

    for i in (0..chunks).step_by(8) {
        let a = vld1q_s16(acc_ptr.add(i));
        let w = vld1q_s16(weights_ptr.add(i));
        vst1q_s16(acc_ptr.add(i), vaddq_s16(a, w));
    }
    add_weights_scalar(&mut acc[chunks..n], &weights[chunks..n]);
}

#[cfg(target_arch = "aarch64")]
unsafe fn sub_weights_neon(acc: &mut [i16], weights: &[i16]) {
    use std::arch::aarch64::{vld1q_s16, vst1q_s16, vsubq_s16};

    let n = acc.len().min(weights.len());
    let chunks = n / 8 * 8;
    let acc_ptr = acc.as_mut_ptr();
    let weights_ptr = weights.as_ptr();

    for i in (0..chunks).step_by(8) {
        let a = vld1q_s16(acc_ptr.add(i));
        let w = vld1q_s16(weights_ptr.add(i));
        vst1q_s16(acc_ptr.add(i), vsubq_s16(a, w));
    }
    sub_weights_scalar(&mut acc[chunks..n], &weights[chunks..n]);
}

// ============================================================================
// AVX2 implementations (x86_64 only)
// ============================================================================

#[cfg(target_arch = "x86_64")]
#[target_feature(enable = "avx2")]
unsafe fn add_weights_avx2(acc: &mut [i16], weights: &[i16]) {
    use std::arch::x86_64::{__m256i, _mm256_add_epi16, _mm256_loadu_si256, _mm256_storeu_si256};

    let n = acc.len().min(weights.len());
    let chunks = n / 16 * 16;
    let acc_ptr = acc.as_mut_ptr();
    let weights_ptr = weights.as_ptr();

    for i in (0..chunks).step_by(16) {
        let a = _mm256_loadu_si256(acc_ptr.add(i) as *const __m256i);
        let w = _mm256_loadu_si256(weights_ptr.add(i) as *const __m256i);
        _mm256_storeu_si256(acc_ptr.add(i) as *mut __m256i, _mm256_add_epi16(a, w));
    }
    add_weights_scalar(&mut acc[chunks..n], &weights[chunks..n]);
}

#[cfg(target_arch = "x86_64")]
#[target_feature(enable = "avx2")]
unsafe fn sub_weights_avx2(acc: &mut [i16], weights: &[i16]) {
    use std::arch::x86_64::{__m256i, _mm256_loadu_si256, _mm256_storeu_si256, _mm256_sub_epi16};

    let n = acc.len().min(weights.len());
    let chunks = n / 16 * 16;
    let acc_ptr = acc.as_mut_ptr();
    let weights_ptr = weights.as_ptr();

    for i in (0..chunks).step_by(16) {
        let a = _mm256_loadu_si256(acc_ptr.add(i) as *const __m256i);
        let w = _mm256_loadu_si256(weights_ptr.add(i) as *const __m256i);
        _mm256_storeu_si256(acc_ptr.add(i) as *mut __m256i, _mm256_sub_epi16(a, w));
    }
    sub_weights_scalar(&mut acc[chunks..n], &weights[chunks..n]);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_weights() {
        let mut acc = [100i16; 64];
        let weights = [50i16; 64];
        add_weights(&mut acc, &weights);
        assert!(acc.iter().all(|&v| v == 150));
    }

    #[test]
    fn test_sub_weights() {
        let mut acc = [100i16; 64];
        let weights = [30i16; 64];
        sub_weights(&mut acc, &weights);
        assert!(acc.iter().all(|&v| v == 70));
    }

    #[test]
    fn test_add_then_sub_is_identity_even_on_overflow() {
        let original: Vec<i16> = (0..37).map(|i| i16::MAX - i).collect();
        let weights: Vec<i16> = (0..37).map(|i| 1000 + i).collect();
        let mut acc = original.clone();
        add_weights(&mut acc, &weights);
        assert_eq!(acc[0], i16::MAX.wrapping_add(1000));
        sub_weights(&mut acc, &weights);
        assert_eq!(acc, original);
    }

    #[test]
    fn test_vector_path_matches_scalar_with_tail() {
        let weights: Vec<i16> = (0..53).map(|i| (i * 37 % 200) as i16 - 100).collect();
        let mut fast: Vec<i16> = (0..53).map(|i| (i * 11) as i16).collect();
        let mut slow = fast.clone();
        add_weights(&mut fast, &weights);
        add_weights_scalar(&mut slow, &weights);
        assert_eq!(fast, slow);
    }

    #[test]
    fn test_psqt_updates() {
        let mut acc = [5i32; 8];
        add_psqt(&mut acc, &[1, 2, 3, 4, 5, 6, 7, 8]);
        sub_psqt(&mut acc, &[1; 8]);
        assert_eq!(acc, [5, 6, 7, 8, 9, 10, 11, 12]);
    }
}

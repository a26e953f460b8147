//! Page selection and the in-page probe kernels.
//!
//! Every key touches exactly one page. The page is picked from a rotate/xor
//! fold of all four hash words; the probes inside it come from the 16-bit
//! lanes, so page choice and bit choice do not share a single input bit
//! pattern. Bits are addressed least significant first within each byte.

use crate::hash::HashCode;
use std::sync::OnceLock;

/// Folds the four hash words into the page selector.
#[inline(always)]
pub(crate) fn page_code(code: &HashCode) -> u32 {
    code.word(0).rotate_left(8)
        ^ code.word(1).rotate_left(6)
        ^ code.word(2).rotate_left(4)
        ^ code.word(3).rotate_left(2)
}

/// Mask selecting a bit address inside a page of `2^page_level` bytes.
#[inline(always)]
pub(crate) fn bit_mask(page_level: u32) -> u16 {
    ((1_u32 << (page_level + 3)) - 1) as u16
}

/// Sets the `W` probe bits of `code` in `page`.
///
/// Returns `true` when at least one of them was clear before.
#[inline(always)]
pub(crate) fn set_bits<const W: usize>(
    page: &mut [u8],
    page_level: u32,
    code: &HashCode,
) -> bool {
    let mask = bit_mask(page_level);
    let mut hit = 1_u8;
    for i in 0..W {
        let idx = code.lane(i) & mask;
        let byte = usize::from(idx >> 3);
        let shift = idx & 7;
        hit &= page[byte] >> shift;
        page[byte] |= 1 << shift;
    }
    hit == 0
}

/// Scalar reference for [`test_bits`].
#[inline(always)]
pub(crate) fn test_bits_scalar<const W: usize>(
    page: &[u8],
    page_level: u32,
    code: &HashCode,
) -> bool {
    let mask = bit_mask(page_level);
    (0..W).all(|i| {
        let idx = code.lane(i) & mask;
        page[usize::from(idx >> 3)] & (1 << (idx & 7)) != 0
    })
}

/// Returns `true` when all `W` probe bits of `code` are set in `page`.
#[inline(always)]
pub(crate) fn test_bits<const W: usize>(
    page: &[u8],
    page_level: u32,
    code: &HashCode,
    strategy: ProbeStrategy,
) -> bool {
    debug_assert_eq!(page.len(), 1 << page_level);
    #[cfg(target_arch = "x86_64")]
    if W > 4 && strategy == ProbeStrategy::Avx2 {
        // SAFETY: an Avx2 strategy only exists after runtime detection and
        // the page holds 2^page_level >= 64 bytes, which bounds every
        // gathered word.
        return unsafe { avx2::test_bits::<W>(page, page_level, code) };
    }
    #[cfg(not(target_arch = "x86_64"))]
    let _ = strategy;
    test_bits_scalar::<W>(page, page_level, code)
}

/// How `test` checks the probe bits of a page.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum ProbeStrategy {
    /// One bit per iteration.
    #[default]
    Scalar,
    /// All probes gathered and masked in one AVX2 operation. Only used for
    /// five or more ways.
    Avx2,
}

impl ProbeStrategy {
    /// Best strategy for this CPU, detected once per process.
    pub fn detect() -> Self {
        static DETECTED: OnceLock<ProbeStrategy> = OnceLock::new();
        *DETECTED.get_or_init(|| {
            let strategy = if ProbeStrategy::Avx2.is_supported() {
                ProbeStrategy::Avx2
            } else {
                ProbeStrategy::Scalar
            };
            tracing::debug!(?strategy, "selected probe strategy");
            strategy
        })
    }

    pub fn is_supported(self) -> bool {
        match self {
            ProbeStrategy::Scalar => true,
            #[cfg(target_arch = "x86_64")]
            ProbeStrategy::Avx2 => std::arch::is_x86_feature_detected!("avx2"),
            #[cfg(not(target_arch = "x86_64"))]
            ProbeStrategy::Avx2 => false,
        }
    }

    /// `self` when the CPU supports it, `Scalar` otherwise.
    pub fn or_scalar(self) -> Self {
        if self.is_supported() {
            self
        } else {
            ProbeStrategy::Scalar
        }
    }
}

#[cfg(target_arch = "x86_64")]
mod avx2 {
    use super::bit_mask;
    use crate::hash::HashCode;
    use std::arch::x86_64::*;

    #[target_feature(enable = "avx2")]
    pub(super) unsafe fn test_bits<const W: usize>(
        page: &[u8],
        page_level: u32,
        code: &HashCode,
    ) -> bool {
        let lane = |i: usize| i32::from(code.lane(i));
        // lanes past W are masked out and read as all ones
        let live = |i: usize| if i < W { -1 } else { 0 };
        unsafe {
            let idx = _mm256_and_si256(
                _mm256_setr_epi32(
                    lane(0),
                    lane(1),
                    lane(2),
                    lane(3),
                    lane(4),
                    lane(5),
                    lane(6),
                    lane(7),
                ),
                _mm256_set1_epi32(i32::from(bit_mask(page_level))),
            );
            let holes = _mm256_setr_epi32(
                live(0),
                live(1),
                live(2),
                live(3),
                live(4),
                live(5),
                live(6),
                live(7),
            );
            let words = _mm256_mask_i32gather_epi32::<4>(
                _mm256_set1_epi32(-1),
                page.as_ptr().cast::<i32>(),
                _mm256_srli_epi32::<5>(idx),
                holes,
            );
            let bits = _mm256_sllv_epi32(
                _mm256_set1_epi32(1),
                _mm256_and_si256(idx, _mm256_set1_epi32(31)),
            );
            _mm256_testz_si256(_mm256_andnot_si256(words, bits), bits) != 0
        }
    }
}

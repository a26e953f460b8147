//! Division and modulo by a runtime constant without a hardware divide.
//!
//! Lemire, Kaser and Kurz: with `factor = floor((2^(2N) - 1) / d) + 1`
//! computed once, `m / d` is the high `N` bits of `m * factor` and
//! `m % d` is the high `N` bits of `d * low_2N(m * factor)`, exactly, for
//! every `N`-bit `m` and non-zero `d`.

mod sealed {
    pub trait Sealed {}
    impl Sealed for u8 {}
    impl Sealed for u16 {}
    impl Sealed for u32 {}
}

/// Unsigned word widths supported by [`FastDivisor`].
pub trait DivisorWord: sealed::Sealed + Copy + Eq + std::fmt::Debug {
    /// Twice the width of the word, holds the factor.
    type Factor: Copy + Eq + Default + std::fmt::Debug;

    fn factor(divisor: Self) -> Self::Factor;
    fn quotient(dividend: Self, factor: Self::Factor) -> Self;
    fn remainder(dividend: Self, divisor: Self, factor: Self::Factor) -> Self;
}

macro_rules! divisor_word {
    ($word:ty, $double:ty, $quad:ty) => {
        impl DivisorWord for $word {
            type Factor = $double;

            #[inline(always)]
            fn factor(divisor: Self) -> $double {
                if divisor == 0 {
                    0
                } else {
                    // wraps to 0 for a divisor of 1
                    (<$double>::MAX / <$double>::from(divisor)).wrapping_add(1)
                }
            }

            #[inline(always)]
            fn quotient(dividend: Self, factor: $double) -> Self {
                if factor == 0 {
                    return dividend;
                }
                let product = <$quad>::from(dividend) * <$quad>::from(factor);
                (product >> (2 * <$word>::BITS)) as $word
            }

            #[inline(always)]
            fn remainder(
                dividend: Self,
                divisor: Self,
                factor: $double,
            ) -> Self {
                let low = <$double>::from(dividend).wrapping_mul(factor);
                let product = <$quad>::from(divisor) * <$quad>::from(low);
                (product >> (2 * <$word>::BITS)) as $word
            }
        }
    };
}

divisor_word!(u8, u16, u32);
divisor_word!(u16, u32, u64);
divisor_word!(u32, u64, u128);

/// A divisor fixed at construction time.
///
/// A divisor of zero means "unset": [`div`](Self::div) then returns the
/// dividend unchanged and [`rem`](Self::rem) returns zero.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FastDivisor<W: DivisorWord> {
    value: W,
    factor: W::Factor,
}

impl<W: DivisorWord> FastDivisor<W> {
    pub fn new(value: W) -> Self {
        Self {
            value,
            factor: W::factor(value),
        }
    }

    pub fn value(&self) -> W {
        self.value
    }

    #[inline(always)]
    pub fn div(&self, dividend: W) -> W {
        W::quotient(dividend, self.factor)
    }

    #[inline(always)]
    pub fn rem(&self, dividend: W) -> W {
        W::remainder(dividend, self.value, self.factor)
    }
}

impl<W: DivisorWord + Default> Default for FastDivisor<W> {
    fn default() -> Self {
        Self::new(W::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{Rng, SeedableRng, rngs::StdRng};

    #[test]
    fn test_u8_exhaustive() {
        for d in 1..=u8::MAX {
            let divisor = FastDivisor::new(d);
            for m in 0..=u8::MAX {
                assert_eq!(divisor.div(m), m / d, "{m} / {d}");
                assert_eq!(divisor.rem(m), m % d, "{m} % {d}");
            }
        }
    }

    #[test]
    fn test_u16_every_divisor() {
        let mut rng = StdRng::seed_from_u64(16);
        for d in 1..=u16::MAX {
            let divisor = FastDivisor::new(d);
            for m in [0, 1, d - 1, d, u16::MAX - 1, u16::MAX] {
                assert_eq!(divisor.div(m), m / d, "{m} / {d}");
                assert_eq!(divisor.rem(m), m % d, "{m} % {d}");
            }
            for _ in 0..8 {
                let m: u16 = rng.random();
                assert_eq!(divisor.div(m), m / d, "{m} / {d}");
                assert_eq!(divisor.rem(m), m % d, "{m} % {d}");
            }
        }
    }

    #[test]
    fn test_u32_randomized() {
        let mut rng = StdRng::seed_from_u64(32);
        for _ in 0..20_000 {
            let d: u32 = rng.random_range(1..=u32::MAX);
            let divisor = FastDivisor::new(d);
            for _ in 0..16 {
                let m: u32 = rng.random();
                assert_eq!(divisor.div(m), m / d, "{m} / {d}");
                assert_eq!(divisor.rem(m), m % d, "{m} % {d}");
            }
            assert_eq!(divisor.rem(u32::MAX), u32::MAX % d);
            assert_eq!(divisor.div(u32::MAX), u32::MAX / d);
        }
        for d in [1, 2, 3, 7, 1 << 31, u32::MAX - 1, u32::MAX] {
            let divisor = FastDivisor::new(d);
            for m in [0, 1, d - 1, d, u32::MAX] {
                assert_eq!(divisor.div(m), m / d, "{m} / {d}");
                assert_eq!(divisor.rem(m), m % d, "{m} % {d}");
            }
        }
    }

    #[test]
    fn test_zero_divisor_is_unset() {
        let divisor = FastDivisor::<u32>::default();
        assert_eq!(divisor.value(), 0);
        assert_eq!(divisor.div(12345), 12345);
        assert_eq!(divisor.rem(12345), 0);

        let small = FastDivisor::new(0_u8);
        assert_eq!(small.div(200), 200);
    }
}

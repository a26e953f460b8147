//! Stateless probes over a caller-owned buffer.
//!
//! These run the same page selection and probe kernels as
//! [`PageBloomFilter`](crate::PageBloomFilter) but keep no state: no counter,
//! no validation, no precomputed divisor. The buffer must be exactly
//! `page_count << page_level` bytes and the shape must be one a filter would
//! accept; violating that panics on out-of-range indexing.

use crate::hash::key_hash;
use crate::page::{ProbeStrategy, page_code, set_bits, test_bits};

#[inline]
fn page_range(
    code: u32,
    page_level: u32,
    page_count: u32,
) -> std::ops::Range<usize> {
    let start = ((code % page_count) as usize) << page_level;
    start..start + (1 << page_level)
}

/// Sets the `W` probe bits of `key`; `true` when any of them was clear.
pub fn probe_set<const W: usize>(
    buffer: &mut [u8],
    page_level: u32,
    page_count: u32,
    key: &[u8],
) -> bool {
    debug_assert_eq!(buffer.len(), (page_count as usize) << page_level);
    let code = key_hash(key);
    let range = page_range(page_code(&code), page_level, page_count);
    let page = &mut buffer[range];
    set_bits::<W>(page, page_level, &code)
}

/// `true` when all `W` probe bits of `key` are set.
pub fn probe_test<const W: usize>(
    buffer: &[u8],
    page_level: u32,
    page_count: u32,
    key: &[u8],
) -> bool {
    debug_assert_eq!(buffer.len(), (page_count as usize) << page_level);
    let code = key_hash(key);
    let page = &buffer[page_range(page_code(&code), page_level, page_count)];
    test_bits::<W>(page, page_level, &code, ProbeStrategy::detect())
}

macro_rules! fixed_ways {
    ($($ways:literal => $set:ident, $test:ident;)*) => {
        $(
            #[doc = concat!("[`probe_set`], ", stringify!($ways), " ways.")]
            #[inline]
            pub fn $set(
                buffer: &mut [u8],
                page_level: u32,
                page_count: u32,
                key: &[u8],
            ) -> bool {
                probe_set::<$ways>(buffer, page_level, page_count, key)
            }

            #[doc = concat!("[`probe_test`], ", stringify!($ways), " ways.")]
            #[inline]
            pub fn $test(
                buffer: &[u8],
                page_level: u32,
                page_count: u32,
                key: &[u8],
            ) -> bool {
                probe_test::<$ways>(buffer, page_level, page_count, key)
            }
        )*
    };
}

fixed_ways! {
    4 => pbf4_set, pbf4_test;
    5 => pbf5_set, pbf5_test;
    6 => pbf6_set, pbf6_test;
    7 => pbf7_set, pbf7_test;
    8 => pbf8_set, pbf8_test;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::PageBloomFilter;

    #[test]
    fn test_same_bits_as_filter() {
        let mut bf = PageBloomFilter::<7>::new(8, 11);
        let mut buffer = vec![0_u8; 11 << 8];
        for i in 0..1_500_u32 {
            let key = i.to_be_bytes();
            let fresh = pbf7_set(&mut buffer, 8, 11, &key);
            assert_eq!(bf.set(&key), fresh, "key {i}");
        }
        assert_eq!(bf.data(), buffer.as_slice());
        for i in 0..3_000_u32 {
            let key = i.to_be_bytes();
            let found = pbf7_test(&buffer, 8, 11, &key);
            assert_eq!(bf.test(&key), found, "key {i}");
        }
    }

    #[test]
    fn test_fixed_ways_forward() {
        let mut buffer = vec![0_u8; 4 << 7];
        assert!(pbf4_set(&mut buffer, 7, 4, b"four"));
        assert!(pbf5_set(&mut buffer, 7, 4, b"five"));
        assert!(pbf6_set(&mut buffer, 7, 4, b"six"));
        assert!(pbf7_set(&mut buffer, 7, 4, b"seven"));
        assert!(pbf8_set(&mut buffer, 7, 4, b"eight"));
        assert!(pbf4_test(&buffer, 7, 4, b"four"));
        assert!(pbf5_test(&buffer, 7, 4, b"five"));
        assert!(pbf6_test(&buffer, 7, 4, b"six"));
        assert!(pbf7_test(&buffer, 7, 4, b"seven"));
        assert!(pbf8_test(&buffer, 7, 4, b"eight"));
        assert!(!pbf8_set(&mut buffer, 7, 4, b"eight"));
    }

    #[test]
    fn test_single_page() {
        let mut buffer = vec![0_u8; 64];
        for i in 0..40_u8 {
            pbf4_set(&mut buffer, 6, 1, &[i]);
        }
        assert!((0..40_u8).all(|i| pbf4_test(&buffer, 6, 1, &[i])));
    }
}

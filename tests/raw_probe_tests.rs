mod common;

use common::test_utils::random_keys;
use page_bloom_rs::{
    PageBloomFilter, pbf4_set, pbf4_test, pbf5_set, pbf5_test, pbf6_set,
    pbf6_test, pbf7_set, pbf7_test, pbf8_set, pbf8_test, probe_set,
    probe_test,
};

type SetFn = fn(&mut [u8], u32, u32, &[u8]) -> bool;
type TestFn = fn(&[u8], u32, u32, &[u8]) -> bool;

fn agrees_with_filter<const W: usize>(set: SetFn, test: TestFn) {
    let keys = random_keys(W as u64, 4_000, 24);
    let (level, pages) = (9, 7);
    let mut bf = PageBloomFilter::<W>::new(level, pages);
    let mut buffer = vec![0_u8; (pages as usize) << level];

    for key in keys.iter().take(2_000) {
        assert_eq!(bf.set(key), set(&mut buffer, level, pages, key));
    }
    assert_eq!(bf.data(), buffer.as_slice());
    for key in &keys {
        assert_eq!(bf.test(key), test(&buffer, level, pages, key));
    }
}

#[cfg(test)]
mod stateless_tests {
    use super::*;

    #[test]
    fn test_fixed_entry_points_match_filter() {
        agrees_with_filter::<4>(pbf4_set, pbf4_test);
        agrees_with_filter::<5>(pbf5_set, pbf5_test);
        agrees_with_filter::<6>(pbf6_set, pbf6_test);
        agrees_with_filter::<7>(pbf7_set, pbf7_test);
        agrees_with_filter::<8>(pbf8_set, pbf8_test);
    }

    #[test]
    fn test_generic_entry_points() {
        let mut buffer = vec![0_u8; 3 << 13];
        assert!(probe_set::<8>(&mut buffer, 13, 3, b"large page"));
        assert!(probe_test::<8>(&buffer, 13, 3, b"large page"));
        assert!(!probe_set::<8>(&mut buffer, 13, 3, b"large page"));
        let bits: u32 = buffer.iter().map(|b| b.count_ones()).sum();
        assert!((1..=8).contains(&bits));
    }

    #[test]
    fn test_buffer_is_caller_owned() {
        let mut buffer = vec![0_u8; 2 << 6];
        pbf4_set(&mut buffer, 6, 2, b"kept");
        let copy = buffer.clone();
        drop(buffer);
        assert!(pbf4_test(&copy, 6, 2, b"kept"));
    }
}

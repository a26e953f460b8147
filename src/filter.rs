use crate::divisor::FastDivisor;
use crate::error::{PbfError, Result};
use crate::hash::key_hash;
use crate::page::{ProbeStrategy, page_code, set_bits, test_bits};
use crate::planner::validate_shape;
use bitvec::{order::Lsb0, view::BitView};
use tracing::{debug, warn};

/// A bloom filter whose `W` probes per key all land in one page.
///
/// The buffer is `page_count` pages of `2^page_level` bytes. A key's page is
/// chosen by its hash, and the `W` probe bits are placed inside that page,
/// so `set` and `test` touch a single small memory region.
///
/// Constructors never panic: bad parameters produce an invalid, empty
/// instance, see [`is_valid`](Self::is_valid). The `try_` variants report
/// the reason instead.
#[derive(Clone)]
pub struct PageBloomFilter<const W: usize> {
    page_level: u32,
    pages: FastDivisor<u32>,
    unique_count: usize,
    data: Vec<u8>,
    strategy: ProbeStrategy,
}

impl<const W: usize> PageBloomFilter<W> {
    /// Clean filter of `page_count` pages of `2^page_level` bytes.
    ///
    /// `page_level` must be in `8 - 8/W ..= 13`.
    pub fn new(page_level: u32, page_count: u32) -> Self {
        Self::try_new(page_level, page_count).unwrap_or_else(Self::rejected)
    }

    pub fn try_new(page_level: u32, page_count: u32) -> Result<Self> {
        validate_shape(W, page_level, u64::from(page_count))?;
        let data = vec![0_u8; (page_count as usize) << page_level];
        debug!(
            ways = W,
            page_level,
            page_count,
            bytes = data.len(),
            "created page bloom filter"
        );
        Ok(Self::assemble(page_level, page_count, 0, data))
    }

    /// Filter over a copy of `data`, which must be exactly
    /// `page_count << page_level` bytes.
    pub fn with_data(
        page_level: u32,
        page_count: u32,
        unique_count: usize,
        data: &[u8],
    ) -> Self {
        Self::try_with_data(page_level, page_count, unique_count, data)
            .unwrap_or_else(Self::rejected)
    }

    pub fn try_with_data(
        page_level: u32,
        page_count: u32,
        unique_count: usize,
        data: &[u8],
    ) -> Result<Self> {
        validate_shape(W, page_level, u64::from(page_count))?;
        let expected = (page_count as usize) << page_level;
        if data.len() != expected {
            return Err(PbfError::DataSize {
                expected,
                actual: data.len(),
            });
        }
        Ok(Self::assemble(
            page_level,
            page_count,
            unique_count,
            data.to_vec(),
        ))
    }

    /// Filter over a copy of `data`, taking the page count from its length.
    pub fn from_data(
        page_level: u32,
        data: &[u8],
        unique_count: usize,
    ) -> Self {
        Self::try_from_data(page_level, data, unique_count)
            .unwrap_or_else(Self::rejected)
    }

    pub fn try_from_data(
        page_level: u32,
        data: &[u8],
        unique_count: usize,
    ) -> Result<Self> {
        let page_size = 1_usize.checked_shl(page_level).unwrap_or(0);
        if page_size == 0 || data.len() % page_size != 0 {
            return Err(PbfError::DataSize {
                expected: data.len().next_multiple_of(page_size.max(1)),
                actual: data.len(),
            });
        }
        let page_count = u32::try_from(data.len() / page_size).map_err(|_| {
            PbfError::InvalidPageCount {
                page_count: (data.len() / page_size) as u64,
            }
        })?;
        Self::try_with_data(page_level, page_count, unique_count, data)
    }

    fn assemble(
        page_level: u32,
        page_count: u32,
        unique_count: usize,
        data: Vec<u8>,
    ) -> Self {
        Self {
            page_level,
            pages: FastDivisor::new(page_count),
            unique_count,
            data,
            strategy: ProbeStrategy::detect(),
        }
    }

    fn rejected(err: PbfError) -> Self {
        warn!(ways = W, %err, "rejected page bloom filter parameters");
        Self {
            page_level: 0,
            pages: FastDivisor::new(0),
            unique_count: 0,
            data: Vec::new(),
            strategy: ProbeStrategy::Scalar,
        }
    }

    /// Forces a probe strategy for `test`. Strategies the CPU lacks fall
    /// back to scalar.
    pub fn with_strategy(mut self, strategy: ProbeStrategy) -> Self {
        self.strategy = strategy.or_scalar();
        self
    }

    pub fn strategy(&self) -> ProbeStrategy {
        self.strategy
    }

    pub fn is_valid(&self) -> bool {
        !self.data.is_empty()
    }

    pub const fn ways(&self) -> usize {
        W
    }

    pub fn page_level(&self) -> u32 {
        self.page_level
    }

    pub fn page_count(&self) -> u32 {
        self.pages.value()
    }

    /// Number of `set` calls that flipped at least one bit.
    pub fn unique_count(&self) -> usize {
        self.unique_count
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn data_size(&self) -> usize {
        self.data.len()
    }

    /// Nominal item count; keep `unique_count / capacity` within 50%-80%.
    pub fn capacity(&self) -> usize {
        self.data.len() * 8 / W
    }

    /// Items this filter can take while keeping the false positive rate at
    /// or below `fpr`.
    pub fn virtual_capacity(&self, fpr: f64) -> usize {
        if !self.is_valid() {
            return 0;
        }
        let bits = (self.data.len() * 8) as f64;
        let inserts =
            (-fpr.powf(1.0 / W as f64)).ln_1p() / (-1.0 / bits).ln_1p();
        inserts as usize / W
    }

    /// Number of set bits in the buffer.
    pub fn bits_set(&self) -> usize {
        self.data.view_bits::<Lsb0>().count_ones()
    }

    pub fn fill_ratio(&self) -> f64 {
        match self.capacity() {
            0 => 0.0,
            capacity => self.unique_count as f64 / capacity as f64,
        }
    }

    #[inline(always)]
    fn page_offset(&self, code: u32) -> usize {
        (self.pages.rem(code) as usize) << self.page_level
    }

    /// Inserts `key`; returns `true` when it was probably new.
    ///
    /// `false` means every probe bit was already set: a repeat, or a
    /// collision with other keys of the same page.
    pub fn set(&mut self, key: &[u8]) -> bool {
        if !self.is_valid() {
            return false;
        }
        let code = key_hash(key);
        let offset = self.page_offset(page_code(&code));
        let page_size = 1_usize << self.page_level;
        let page = &mut self.data[offset..offset + page_size];
        if set_bits::<W>(page, self.page_level, &code) {
            self.unique_count += 1;
            return true;
        }
        false
    }

    /// Returns `true` when `key` may have been inserted, `false` when it
    /// certainly was not.
    pub fn test(&self, key: &[u8]) -> bool {
        if !self.is_valid() {
            return false;
        }
        let code = key_hash(key);
        let offset = self.page_offset(page_code(&code));
        let page = &self.data[offset..offset + (1_usize << self.page_level)];
        test_bits::<W>(page, self.page_level, &code, self.strategy)
    }

    /// Zeroes every bit and the distinct counter, keeping the allocation.
    pub fn clear(&mut self) {
        self.data.fill(0);
        self.unique_count = 0;
    }
}

impl<const W: usize> std::fmt::Debug for PageBloomFilter<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PageBloomFilter")
            .field("ways", &W)
            .field("page_level", &self.page_level)
            .field("page_count", &self.page_count())
            .field("unique_count", &self.unique_count)
            .field("bytes", &self.data.len())
            .field("strategy", &self.strategy)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(i: u64) -> [u8; 8] {
        i.to_le_bytes()
    }

    fn scenario<const W: usize>() {
        let mut bf = PageBloomFilter::<W>::new(7, 3);
        assert!(bf.is_valid());
        assert!(bf.capacity() >= 384);
        for i in 0..200 {
            assert!(bf.set(&key(i)), "W={W} set {i}");
        }
        assert_eq!(bf.unique_count(), 200);
        for i in 0..200 {
            assert!(bf.test(&key(i)), "W={W} test {i}");
        }
        for i in 200..400 {
            assert!(!bf.test(&key(i)), "W={W} false positive {i}");
        }
    }

    #[cfg(not(feature = "murmur3-hash"))]
    #[test]
    fn test_scenario_every_way() {
        scenario::<4>();
        scenario::<5>();
        scenario::<6>();
        scenario::<7>();
        scenario::<8>();
    }

    #[test]
    fn test_invalid_shapes_are_sentinels() {
        assert!(!PageBloomFilter::<8>::new(6, 3).is_valid());
        assert!(!PageBloomFilter::<8>::new(14, 3).is_valid());
        assert!(!PageBloomFilter::<8>::new(7, 0).is_valid());
        assert!(!PageBloomFilter::<3>::new(7, 3).is_valid());
        assert!(!PageBloomFilter::<9>::new(7, 3).is_valid());
        assert!(PageBloomFilter::<4>::new(6, 1).is_valid());
        assert!(matches!(
            PageBloomFilter::<5>::try_new(6, 1),
            Err(PbfError::InvalidPageLevel { min: 7, .. })
        ));

        let mut bf = PageBloomFilter::<8>::new(7, 0);
        assert!(!bf.set(b"key"));
        assert!(!bf.test(b"key"));
        bf.clear();
        assert_eq!(bf.capacity(), 0);
        assert_eq!(bf.virtual_capacity(0.01), 0);
        assert_eq!(bf.unique_count(), 0);
    }

    #[test]
    fn test_existing_bytes_are_copied_and_checked() {
        let mut source = PageBloomFilter::<6>::new(8, 4);
        for i in 0..100 {
            source.set(&key(i));
        }
        let copy = PageBloomFilter::<6>::with_data(
            8,
            4,
            source.unique_count(),
            source.data(),
        );
        assert!(copy.is_valid());
        assert_eq!(copy.data(), source.data());
        assert_ne!(copy.data().as_ptr(), source.data().as_ptr());

        assert!(matches!(
            PageBloomFilter::<6>::try_with_data(8, 4, 0, &source.data()[1..]),
            Err(PbfError::DataSize {
                expected: 1024,
                actual: 1023
            })
        ));

        let derived = PageBloomFilter::<6>::from_data(8, source.data(), 100);
        assert_eq!(derived.page_count(), 4);
        assert!(!PageBloomFilter::<6>::from_data(8, &[], 0).is_valid());
        assert!(!PageBloomFilter::<6>::from_data(8, &[0; 300], 0).is_valid());
    }

    #[test]
    fn test_clear_keeps_allocation() {
        let mut bf = PageBloomFilter::<7>::new(9, 2);
        for i in 0..50 {
            bf.set(&key(i));
        }
        let ptr = bf.data().as_ptr();
        bf.clear();
        assert_eq!(bf.unique_count(), 0);
        assert_eq!(bf.bits_set(), 0);
        assert_eq!(bf.data().as_ptr(), ptr);
        assert_eq!(bf.data_size(), 1024);
        for i in 0..50 {
            assert!(!bf.test(&key(i)));
        }
    }

    #[test]
    fn test_repeat_set_is_not_counted() {
        let mut bf = PageBloomFilter::<5>::new(10, 8);
        assert!(bf.set(b"alpha"));
        assert!(!bf.set(b"alpha"));
        assert!(!bf.set(b"alpha"));
        assert_eq!(bf.unique_count(), 1);
        assert!(bf.bits_set() <= 5);
    }

    #[test]
    fn test_virtual_capacity_tracks_target() {
        let bf = PageBloomFilter::<7>::new(12, 16);
        let strict = bf.virtual_capacity(0.001);
        let loose = bf.virtual_capacity(0.05);
        assert!(strict < loose);
        assert!(bf.virtual_capacity(0.01) > bf.capacity() / 2);
        assert!(bf.virtual_capacity(0.01) < bf.capacity() * 2);
    }

    #[test]
    fn test_forced_strategies_agree() {
        let mut bf = PageBloomFilter::<8>::new(7, 8);
        for i in 0..600 {
            bf.set(&key(i));
        }
        let scalar = bf.clone().with_strategy(ProbeStrategy::Scalar);
        let vector = bf.clone().with_strategy(ProbeStrategy::Avx2);
        assert_eq!(scalar.strategy(), ProbeStrategy::Scalar);
        for i in 0..5_000 {
            assert_eq!(scalar.test(&key(i)), vector.test(&key(i)), "key {i}");
        }
    }

    #[test]
    fn test_debug_omits_buffer() {
        let bf = PageBloomFilter::<4>::new(6, 2);
        let text = format!("{bf:?}");
        assert!(text.contains("ways: 4"));
        assert!(text.contains("bytes: 128"));
    }
}

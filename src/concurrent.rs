//! A page bloom filter that many threads can `set` and `test` at once.
//!
//! Same layout and probe derivation as [`PageBloomFilter`]; bits are set
//! with one atomic `fetch_or` per probe byte, so no lock is needed. Memory
//! ordering is relaxed: a `test` is only guaranteed to see a `set` that
//! happens-before it.

use crate::divisor::FastDivisor;
use crate::error::{PbfError, Result};
use crate::filter::PageBloomFilter;
use crate::hash::{HashCode, key_hash};
use crate::page::{bit_mask, page_code};
use crate::planner::validate_shape;
use std::sync::atomic::{AtomicU8, AtomicUsize, Ordering};
use tracing::warn;

pub struct AtomicPageBloomFilter<const W: usize> {
    page_level: u32,
    pages: FastDivisor<u32>,
    unique_count: AtomicUsize,
    data: Vec<AtomicU8>,
}

impl<const W: usize> AtomicPageBloomFilter<W> {
    pub fn new(page_level: u32, page_count: u32) -> Self {
        Self::try_new(page_level, page_count).unwrap_or_else(|err| {
            warn!(ways = W, %err, "rejected page bloom filter parameters");
            Self::from_bytes(0, 0, 0, Vec::new())
        })
    }

    pub fn try_new(page_level: u32, page_count: u32) -> Result<Self> {
        validate_shape(W, page_level, u64::from(page_count))?;
        let size = (page_count as usize) << page_level;
        Ok(Self::from_bytes(page_level, page_count, 0, vec![0; size]))
    }

    /// Copies the bits and counter of a single-owner filter.
    pub fn from_filter(filter: &PageBloomFilter<W>) -> Self {
        Self::from_bytes(
            filter.page_level(),
            filter.page_count(),
            filter.unique_count(),
            filter.data().to_vec(),
        )
    }

    fn from_bytes(
        page_level: u32,
        page_count: u32,
        unique_count: usize,
        data: Vec<u8>,
    ) -> Self {
        Self {
            page_level,
            pages: FastDivisor::new(page_count),
            unique_count: AtomicUsize::new(unique_count),
            data: data.into_iter().map(AtomicU8::new).collect(),
        }
    }

    /// Converts back into a single-owner filter.
    pub fn into_filter(self) -> PageBloomFilter<W> {
        let page_level = self.page_level;
        let page_count = self.pages.value();
        let unique_count = self.unique_count.into_inner();
        let data: Vec<u8> =
            self.data.into_iter().map(AtomicU8::into_inner).collect();
        PageBloomFilter::with_data(page_level, page_count, unique_count, &data)
    }

    pub fn is_valid(&self) -> bool {
        !self.data.is_empty()
    }

    pub fn page_level(&self) -> u32 {
        self.page_level
    }

    pub fn page_count(&self) -> u32 {
        self.pages.value()
    }

    pub fn unique_count(&self) -> usize {
        self.unique_count.load(Ordering::Relaxed)
    }

    pub fn capacity(&self) -> usize {
        self.data.len() * 8 / W
    }

    fn page(&self, key: &[u8]) -> Option<(&[AtomicU8], HashCode)> {
        if !self.is_valid() {
            return None;
        }
        let code = key_hash(key);
        let page = self.pages.rem(page_code(&code)) as usize;
        let offset = page << self.page_level;
        Some((&self.data[offset..offset + (1 << self.page_level)], code))
    }

    /// Inserts `key`; returns `true` when it was probably new.
    pub fn set(&self, key: &[u8]) -> bool {
        let Some((page, code)) = self.page(key) else {
            return false;
        };
        let mask = bit_mask(self.page_level);
        let mut fresh = false;
        for i in 0..W {
            let idx = code.lane(i) & mask;
            let bit = 1_u8 << (idx & 7);
            let before =
                page[usize::from(idx >> 3)].fetch_or(bit, Ordering::Relaxed);
            fresh |= before & bit == 0;
        }
        if fresh {
            self.unique_count.fetch_add(1, Ordering::Relaxed);
        }
        fresh
    }

    pub fn test(&self, key: &[u8]) -> bool {
        let Some((page, code)) = self.page(key) else {
            return false;
        };
        let mask = bit_mask(self.page_level);
        (0..W).all(|i| {
            let idx = code.lane(i) & mask;
            let byte = page[usize::from(idx >> 3)].load(Ordering::Relaxed);
            byte & (1 << (idx & 7)) != 0
        })
    }

    /// Zeroes every bit and the counter. Needs exclusive access.
    pub fn clear(&mut self) {
        for byte in &mut self.data {
            *byte.get_mut() = 0;
        }
        *self.unique_count.get_mut() = 0;
    }
}

impl<const W: usize> TryFrom<&PageBloomFilter<W>>
    for AtomicPageBloomFilter<W>
{
    type Error = PbfError;

    fn try_from(filter: &PageBloomFilter<W>) -> Result<Self> {
        validate_shape(
            W,
            filter.page_level(),
            u64::from(filter.page_count()),
        )?;
        Ok(Self::from_filter(filter))
    }
}

//! Factories choosing the number of ways at runtime.
//!
//! The `ways` dispatch happens once here; the returned filter runs the
//! monomorphized `PageBloomFilter<W>` code for every key.

use crate::error::{PbfError, Result};
use crate::filter::PageBloomFilter;
use crate::planner::plan;
use crate::traits::BloomFilter;
use tracing::warn;

macro_rules! with_ways {
    ($ways:expr, $filter:ident => $make:expr) => {
        match $ways {
            4 => {
                type $filter = PageBloomFilter<4>;
                $make.map(|bf| Box::new(bf) as Box<dyn BloomFilter>)
            }
            5 => {
                type $filter = PageBloomFilter<5>;
                $make.map(|bf| Box::new(bf) as Box<dyn BloomFilter>)
            }
            6 => {
                type $filter = PageBloomFilter<6>;
                $make.map(|bf| Box::new(bf) as Box<dyn BloomFilter>)
            }
            7 => {
                type $filter = PageBloomFilter<7>;
                $make.map(|bf| Box::new(bf) as Box<dyn BloomFilter>)
            }
            8 => {
                type $filter = PageBloomFilter<8>;
                $make.map(|bf| Box::new(bf) as Box<dyn BloomFilter>)
            }
            ways => Err(PbfError::InvalidWays { ways }),
        }
    };
}

pub fn try_new_pbf(
    ways: usize,
    page_level: u32,
    page_count: u32,
) -> Result<Box<dyn BloomFilter>> {
    with_ways!(ways, Filter => Filter::try_new(page_level, page_count))
}

pub fn try_recover_pbf(
    ways: usize,
    page_level: u32,
    page_count: u32,
    unique_count: usize,
    data: &[u8],
) -> Result<Box<dyn BloomFilter>> {
    with_ways!(ways, Filter => Filter::try_with_data(
        page_level,
        page_count,
        unique_count,
        data
    ))
}

/// Clean filter with explicit shape, `None` when the shape is invalid.
pub fn new_pbf(
    ways: usize,
    page_level: u32,
    page_count: u32,
) -> Option<Box<dyn BloomFilter>> {
    try_new_pbf(ways, page_level, page_count)
        .inspect_err(|err| warn!(ways, %err, "rejected page bloom filter"))
        .ok()
}

/// Filter over a copy of previously exported bytes.
pub fn recover_pbf(
    ways: usize,
    page_level: u32,
    page_count: u32,
    unique_count: usize,
    data: &[u8],
) -> Option<Box<dyn BloomFilter>> {
    try_recover_pbf(ways, page_level, page_count, unique_count, data)
        .inspect_err(|err| warn!(ways, %err, "rejected page bloom filter data"))
        .ok()
}

/// Filter sized for `item_count` keys at false positive rate `fpr`.
pub fn new_bloom_filter(
    item_count: usize,
    fpr: f64,
) -> Option<Box<dyn BloomFilter>> {
    let params = plan(item_count, fpr)
        .inspect_err(|err| warn!(item_count, fpr, %err, "planning failed"))
        .ok()?;
    new_pbf(params.ways, params.page_level, params.page_count)
}

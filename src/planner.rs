//! Sizing: from an expected item count and a false positive target to the
//! shape of a paged filter.

use crate::error::{PbfError, Result};
use crate::traits::BloomFilter;
use crate::wrapper::new_pbf;
use derive_builder::Builder;
use serde::{Deserialize, Serialize};
use tracing::debug;

pub const MIN_FPR: f64 = 0.0005;
pub const MAX_FPR: f64 = 0.1;
pub const MIN_WAYS: usize = 4;
pub const MAX_WAYS: usize = 8;
pub const MAX_PAGE_LEVEL: u32 = 13;
pub const MAX_PAGE_COUNT: u64 = i32::MAX as u64;

/// Smallest page level able to host `ways` probes without systematic
/// collisions.
pub const fn min_page_level(ways: usize) -> u32 {
    (8 - 8 / ways) as u32
}

fn clamp_fpr(fpr: f64) -> f64 {
    if fpr.is_nan() {
        return MAX_FPR;
    }
    fpr.clamp(MIN_FPR, MAX_FPR)
}

/// Number of probes per key for a false positive target.
///
/// `round(log2(1 / fpr))` over the clamped target, kept within 4..=8.
pub fn best_ways(fpr: f64) -> usize {
    let w = -clamp_fpr(fpr).log2();
    (w.round() as usize).clamp(MIN_WAYS, MAX_WAYS)
}

/// Shape of a paged filter.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterParams {
    pub ways: usize,
    pub page_level: u32,
    pub page_count: u32,
}

impl FilterParams {
    pub fn page_size(&self) -> usize {
        1 << self.page_level
    }

    pub fn data_size(&self) -> usize {
        (self.page_count as usize) << self.page_level
    }

    /// Nominal item count: total bits over ways.
    pub fn capacity(&self) -> usize {
        self.data_size() * 8 / self.ways
    }

    pub fn validate(&self) -> Result<()> {
        validate_shape(self.ways, self.page_level, u64::from(self.page_count))
    }
}

pub(crate) fn validate_shape(
    ways: usize,
    page_level: u32,
    page_count: u64,
) -> Result<()> {
    if !(MIN_WAYS..=MAX_WAYS).contains(&ways) {
        return Err(PbfError::InvalidWays { ways });
    }
    let min = min_page_level(ways);
    if page_level < min || page_level > MAX_PAGE_LEVEL {
        return Err(PbfError::InvalidPageLevel {
            page_level,
            ways,
            min,
        });
    }
    if page_count == 0 || page_count > MAX_PAGE_COUNT {
        return Err(PbfError::InvalidPageCount { page_count });
    }
    Ok(())
}

/// Plans a filter for `item_count` keys at `fpr`.
///
/// Out of range targets are clamped into `[0.0005, 0.1]` and an item count
/// of zero is treated as one. Fails only when the page count would not fit.
pub fn plan(item_count: usize, fpr: f64) -> Result<FilterParams> {
    let item_count = item_count.max(1);
    let fpr = clamp_fpr(fpr);
    let ways = best_ways(fpr);

    let w = -fpr.log2();
    let mut bytes_per_item = w / (std::f64::consts::LN_2 * 8.0);
    // the paged layout loses accuracy against a flat bloom filter
    if w > 8.5 {
        let x = w - 7.0;
        bytes_per_item *= 1.0 + 0.0025 * x * x;
    } else if w > 3.0 {
        bytes_per_item *= 1.01;
    }

    // at least one byte so that tiny plans still get a page
    let n = ((bytes_per_item * item_count as f64) as u64).max(1);
    let mut page_level = (6..12)
        .find(|&i| n < (1_u64 << (i + 4)))
        .unwrap_or(12);
    if page_level < min_page_level(ways) {
        page_level += 1;
    }

    let page_count = n.div_ceil(1 << page_level);
    if page_count > MAX_PAGE_COUNT {
        return Err(PbfError::Planning(format!(
            "{} items at fpr {} need {} pages of {} bytes",
            item_count,
            fpr,
            page_count,
            1_u64 << page_level
        )));
    }

    let params = FilterParams {
        ways,
        page_level,
        page_count: page_count as u32,
    };
    debug!(
        item_count,
        fpr,
        ways,
        page_level,
        page_count,
        bytes = params.data_size(),
        "planned page bloom filter"
    );
    Ok(params)
}

/// Configuration for a planned filter
#[derive(Clone, Debug, Builder, Serialize, Deserialize)]
#[builder(pattern = "owned")]
pub struct FilterConfig {
    /// Expected number of distinct items
    #[builder(default = "1_000_000")]
    pub item_count: usize,

    /// Target false positive rate, clamped into 0.0005..=0.1
    #[builder(default = "0.01")]
    pub false_positive_rate: f64,
}

impl FilterConfig {
    pub fn params(&self) -> Result<FilterParams> {
        plan(self.item_count, self.false_positive_rate)
    }

    /// Plans and allocates a filter whose ways are picked at runtime.
    pub fn build(&self) -> Result<Box<dyn BloomFilter>> {
        let params = self.params()?;
        new_pbf(params.ways, params.page_level, params.page_count).ok_or_else(
            || PbfError::Planning(format!("unusable plan {params:?}")),
        )
    }
}

//! Page bloom filter: a bloom filter whose probes for one key all land in
//! a single small page of memory.
//!
//! Layout:
//!    * Pages: the bit buffer is `page_count` pages of `2^page_level` bytes,
//!      `page_level` in `6..=13` (64 B to 8 KiB).
//!    * Ways: every key sets or tests `W` bits, `W` in `4..=8`, chosen at
//!      compile time for [`PageBloomFilter`] or at runtime through
//!      [`new_pbf`] / [`new_bloom_filter`].
//!
//! Insertion:
//!     * The key is hashed once into 128 bits ([`key_hash`]).
//!     * A fold of the four 32-bit hash words picks the page.
//!     * The first `W` 16-bit lanes, masked to the page, pick the bits.
//!
//! Query:
//!     * Same derivation; the key may be present when all `W` bits are set.
//!       With AVX2 the probes are gathered and checked at once.
//!
//! Sizing:
//!     * [`plan`] turns an item count and target false positive rate into
//!       ways, page size and page count, see [`FilterConfig`] for a builder.
//!
//! Known trade-offs:
//!     * Confining probes to one page costs a slightly higher false
//!       positive rate than a classic bloom filter of the same size.
//!     * There is no removal; `clear` resets everything.

pub mod common;
mod concurrent;
mod divisor;
mod error;
mod filter;
mod hash;
mod page;
mod planner;
mod raw;
mod snapshot;
mod traits;
mod wrapper;

pub use common::{bytes2hr, ratio2hr};
pub use concurrent::AtomicPageBloomFilter;
pub use divisor::{DivisorWord, FastDivisor};
pub use error::{PbfError, Result};
pub use filter::PageBloomFilter;
#[cfg(feature = "murmur3-hash")]
pub use hash::murmur3_128;
pub use hash::{HashCode, hash128, hash128_with_seed, key_hash};
pub use page::ProbeStrategy;
pub use planner::{
    FilterConfig, FilterConfigBuilder, FilterConfigBuilderError, FilterParams,
    MAX_FPR, MAX_PAGE_COUNT, MAX_PAGE_LEVEL, MAX_WAYS, MIN_FPR, MIN_WAYS,
    best_ways, min_page_level, plan,
};
pub use raw::{
    pbf4_set, pbf4_test, pbf5_set, pbf5_test, pbf6_set, pbf6_test, pbf7_set,
    pbf7_test, pbf8_set, pbf8_test, probe_set, probe_test,
};
pub use snapshot::FilterSnapshot;
pub use traits::BloomFilter;
pub use wrapper::{
    new_bloom_filter, new_pbf, recover_pbf, try_new_pbf, try_recover_pbf,
};

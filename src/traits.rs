use crate::filter::PageBloomFilter;
use crate::snapshot::FilterSnapshot;

/// A page bloom filter whose number of ways is only known at runtime.
///
/// Every method forwards to the concrete [`PageBloomFilter`].
pub trait BloomFilter: Send + Sync {
    fn ways(&self) -> usize;
    fn page_level(&self) -> u32;
    fn page_count(&self) -> u32;
    fn unique_count(&self) -> usize;
    fn data(&self) -> &[u8];
    fn capacity(&self) -> usize;
    fn virtual_capacity(&self, fpr: f64) -> usize;
    /// `unique_count / capacity`, 0 for an invalid filter.
    fn fill_ratio(&self) -> f64;
    fn is_valid(&self) -> bool;

    /// Returns `true` when the key was probably new.
    fn set(&mut self, key: &[u8]) -> bool;
    /// Returns `true` when the key may be present.
    fn test(&self, key: &[u8]) -> bool;
    fn clear(&mut self);

    fn clone_box(&self) -> Box<dyn BloomFilter>;

    /// Everything needed to rebuild this filter elsewhere.
    fn snapshot(&self) -> FilterSnapshot {
        FilterSnapshot {
            ways: self.ways() as u8,
            page_level: self.page_level() as u8,
            page_count: self.page_count(),
            unique_count: self.unique_count() as u64,
            data: self.data().to_vec(),
        }
    }
}

impl<const W: usize> BloomFilter for PageBloomFilter<W> {
    fn ways(&self) -> usize {
        W
    }

    fn page_level(&self) -> u32 {
        PageBloomFilter::page_level(self)
    }

    fn page_count(&self) -> u32 {
        PageBloomFilter::page_count(self)
    }

    fn unique_count(&self) -> usize {
        PageBloomFilter::unique_count(self)
    }

    fn data(&self) -> &[u8] {
        PageBloomFilter::data(self)
    }

    fn capacity(&self) -> usize {
        PageBloomFilter::capacity(self)
    }

    fn virtual_capacity(&self, fpr: f64) -> usize {
        PageBloomFilter::virtual_capacity(self, fpr)
    }

    fn fill_ratio(&self) -> f64 {
        PageBloomFilter::fill_ratio(self)
    }

    fn is_valid(&self) -> bool {
        PageBloomFilter::is_valid(self)
    }

    fn set(&mut self, key: &[u8]) -> bool {
        PageBloomFilter::set(self, key)
    }

    fn test(&self, key: &[u8]) -> bool {
        PageBloomFilter::test(self, key)
    }

    fn clear(&mut self) {
        PageBloomFilter::clear(self)
    }

    fn clone_box(&self) -> Box<dyn BloomFilter> {
        Box::new(self.clone())
    }
}

impl Clone for Box<dyn BloomFilter> {
    fn clone(&self) -> Self {
        self.clone_box()
    }
}

impl std::fmt::Debug for dyn BloomFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BloomFilter")
            .field("ways", &self.ways())
            .field("page_level", &self.page_level())
            .field("page_count", &self.page_count())
            .field("unique_count", &self.unique_count())
            .finish()
    }
}

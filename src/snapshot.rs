//! Portable form of a filter.
//!
//! The byte buffer plus `(ways, page_level, page_count, unique_count)` is the
//! whole state of a filter; nothing else is needed to rebuild it.

use crate::error::{PbfError, Result};
use crate::planner::validate_shape;
use crate::traits::BloomFilter;
use crate::wrapper::try_recover_pbf;
use bincode::{BorrowDecode, Encode};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

#[derive(Clone, Debug, PartialEq, Eq, Encode, Serialize, Deserialize)]
pub struct FilterSnapshot {
    pub ways: u8,
    pub page_level: u8,
    pub page_count: u32,
    pub unique_count: u64,
    pub data: Vec<u8>,
}

/// Same wire layout as [`FilterSnapshot`], borrowing the buffer from the
/// input so a length prefix is checked against the bytes actually present
/// before anything is allocated.
#[derive(BorrowDecode)]
struct SnapshotView<'a> {
    ways: u8,
    page_level: u8,
    page_count: u32,
    unique_count: u64,
    data: &'a [u8],
}

impl FilterSnapshot {
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(bincode::encode_to_vec(self, bincode::config::standard())?)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let (view, read): (SnapshotView<'_>, usize) =
            bincode::borrow_decode_from_slice(
                bytes,
                bincode::config::standard(),
            )?;
        if read != bytes.len() {
            return Err(PbfError::Serialization(format!(
                "{} trailing bytes after snapshot",
                bytes.len() - read
            )));
        }
        Ok(Self {
            ways: view.ways,
            page_level: view.page_level,
            page_count: view.page_count,
            unique_count: view.unique_count,
            data: view.data.to_vec(),
        })
    }

    /// Checks shape and buffer length without building a filter.
    pub fn validate(&self) -> Result<()> {
        validate_shape(
            usize::from(self.ways),
            u32::from(self.page_level),
            u64::from(self.page_count),
        )?;
        let expected = (self.page_count as usize) << self.page_level;
        if self.data.len() != expected {
            return Err(PbfError::DataSize {
                expected,
                actual: self.data.len(),
            });
        }
        Ok(())
    }

    /// Rebuilds the filter, copying the buffer.
    pub fn restore(&self) -> Result<Box<dyn BloomFilter>> {
        self.validate()?;
        let unique_count = usize::try_from(self.unique_count).map_err(|_| {
            PbfError::Serialization(format!(
                "unique count {} does not fit in memory",
                self.unique_count
            ))
        })?;
        try_recover_pbf(
            usize::from(self.ways),
            u32::from(self.page_level),
            self.page_count,
            unique_count,
            &self.data,
        )
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let bytes = self.to_bytes()?;
        std::fs::write(path.as_ref(), &bytes)?;
        debug!(
            path = %path.as_ref().display(),
            bytes = bytes.len(),
            "saved filter snapshot"
        );
        Ok(())
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let bytes = std::fs::read(path.as_ref())?;
        let snapshot = Self::from_bytes(&bytes)?;
        debug!(
            path = %path.as_ref().display(),
            ways = snapshot.ways,
            "loaded filter snapshot"
        );
        Ok(snapshot)
    }
}

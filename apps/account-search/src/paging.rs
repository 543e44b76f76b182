//! Paged result envelope shared by listing operations

use serde::{Deserialize, Serialize};

/// A bounded slice of a larger result set plus the total count of all matches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PagedResult<T> {
    pub items: Vec<T>,
    /// Count of all matching rows, ignoring offset and page size.
    pub total: i64,
    pub offset_by: u32,
    pub page_size: u32,
}

impl<T> PagedResult<T> {
    pub fn new(items: Vec<T>, total: i64, offset_by: u32, page_size: u32) -> Self {
        debug_assert!(items.len() <= page_size as usize);
        Self {
            items,
            total,
            offset_by,
            page_size,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Offset of the following page, if any rows remain after this one.
    pub fn next_offset(&self) -> Option<u32> {
        let next = u64::from(self.offset_by) + self.items.len() as u64;
        if self.items.is_empty() || next >= self.total.max(0) as u64 {
            return None;
        }
        u32::try_from(next).ok()
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> PagedResult<U> {
        PagedResult {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            offset_by: self.offset_by,
            page_size: self.page_size,
        }
    }
}

//! Table-of-contents pagination.

use crate::types::{IndexEntry, IndexPage};

/// Default number of entries per index page (two columns of ten).
pub const DEFAULT_ENTRIES_PER_PAGE: usize = 20;

/// Default number of entries per column.
pub const DEFAULT_ENTRIES_PER_COLUMN: usize = 10;

/// How index entries are spread over pages and columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexLayout {
    per_page: usize,
    per_column: usize,
}

impl Default for IndexLayout {
    fn default() -> Self {
        Self {
            per_page: DEFAULT_ENTRIES_PER_PAGE,
            per_column: DEFAULT_ENTRIES_PER_COLUMN,
        }
    }
}

impl IndexLayout {
    /// Create the default 20-per-page, 10-per-column layout.
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a different page capacity, split evenly over two columns.
    pub fn with_capacity(capacity: usize) -> Self {
        let per_page = capacity.max(1);
        Self {
            per_page,
            per_column: per_page.div_ceil(2),
        }
    }

    /// Entries per page.
    pub fn per_page(&self) -> usize {
        self.per_page
    }

    /// Entries per column.
    pub fn per_column(&self) -> usize {
        self.per_column
    }

    /// Number of pages needed for `total` entries.
    pub fn page_count(&self, total: usize) -> usize {
        total.div_ceil(self.per_page)
    }

    /// Lay entries out over pages, filling the left column first.
    pub fn paginate(&self, entries: &[IndexEntry]) -> Vec<IndexPage> {
        let page_count = self.page_count(entries.len());

        entries
            .chunks(self.per_page)
            .enumerate()
            .map(|(page, chunk)| {
                let split = chunk.len().min(self.per_column);
                let (left, right) = chunk.split_at(split);
                IndexPage {
                    page,
                    page_count,
                    left: left.to_vec(),
                    right: right.to_vec(),
                }
            })
            .collect()
    }
}

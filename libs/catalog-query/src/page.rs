use std::fmt;

use crate::pagination::Pagination;

/// Content-range descriptor: `"{resource} {start}-{end}/{total}"` when the
/// page is limited, `"{resource} {start}/{total}"` when it is not.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ContentRange {
    pub resource: String,
    pub start: u64,
    pub end: Option<u64>,
    pub total: u64,
}

impl ContentRange {
    #[must_use]
    pub fn new(resource: impl Into<String>, pagination: Pagination, total: u64) -> Self {
        Self {
            resource: resource.into(),
            start: pagination.skip,
            end: (!pagination.is_unlimited()).then(|| pagination.range_end(total)),
            total,
        }
    }
}

impl fmt::Display for ContentRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.end {
            Some(end) => write!(f, "{} {}-{end}/{}", self.resource, self.start, self.total),
            None => write!(f, "{} {}/{}", self.resource, self.start, self.total),
        }
    }
}

/// One page of a list query plus the total size of the filtered set.
#[derive(Clone, Debug, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub range_start: u64,
    pub range_end: u64,
    pub total: u64,
    pub content_range: ContentRange,
}

impl<T> Page<T> {
    #[must_use]
    pub fn new(
        resource: impl Into<String>,
        items: Vec<T>,
        pagination: Pagination,
        total: u64,
    ) -> Self {
        Self {
            items,
            range_start: pagination.skip,
            range_end: pagination.range_end(total),
            total,
            content_range: ContentRange::new(resource, pagination, total),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Map items, keeping range metadata.
    pub fn map_items<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            range_start: self.range_start,
            range_end: self.range_end,
            total: self.total,
            content_range: self.content_range,
        }
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn test_limited_content_range() {
        let page = Page::new("products", vec![1, 2], Pagination::new(0, 2), 7);
        assert_eq!(page.range_start, 0);
        assert_eq!(page.range_end, 2);
        assert_eq!(page.content_range.to_string(), "products 0-2/7");
    }

    #[test]
    fn test_unlimited_content_range() {
        let page = Page::new("orders", vec![1, 2, 3], Pagination::new(4, 0), 7);
        assert_eq!(page.range_end, 7);
        assert_eq!(page.content_range.to_string(), "orders 4/7");
    }

    #[test]
    fn test_map_items_keeps_metadata() {
        let page = Page::new("tags", vec![1, 2], Pagination::new(0, 10), 2);
        let mapped = page.map_items(|n| n * 10);
        assert_eq!(mapped.items, vec![10, 20]);
        assert_eq!(mapped.content_range.to_string(), "tags 0-10/2");
    }
}

//! Fixed-size pages over an ordered listing.
//!
//! Pages are 1-based. The page size comes from configuration, never from
//! the caller, so every archive page renders the same way.

use serde::Serialize;

/// Page size used when the configuration doesn't set one.
pub const DEFAULT_PAGE_SIZE: usize = 20;

/// One bounded slice of an ordered listing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// 1-based page number that was requested.
    pub page: usize,
    /// Items in the whole listing, not just this page.
    pub total_items: usize,
    pub page_size: usize,
}

impl<T> Page<T> {
    pub fn total_pages(&self) -> usize {
        self.total_items.div_ceil(self.page_size)
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Any page after the first has a previous one while the listing is non-empty.
    pub fn has_previous(&self) -> bool {
        self.page > 1 && self.total_pages() > 0
    }

    pub fn has_next(&self) -> bool {
        self.page >= 1 && self.page < self.total_pages()
    }

    /// Past the end, this points back at the last page rather than `page - 1`.
    pub fn previous_page(&self) -> Option<usize> {
        self.has_previous()
            .then(|| (self.page - 1).min(self.total_pages()))
    }

    pub fn next_page(&self) -> Option<usize> {
        self.has_next().then(|| self.page + 1)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Paginator {
    page_size: usize,
}

impl Default for Paginator {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE_SIZE)
    }
}

impl Paginator {
    /// A page size of 0 is clamped to 1.
    pub fn new(page_size: usize) -> Self {
        Self {
            page_size: page_size.max(1),
        }
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Cut page `page` out of `items` without reordering.
    ///
    /// Page 0 and pages past the end are empty, not errors.
    pub fn paginate<T>(&self, items: Vec<T>, page: usize) -> Page<T> {
        let total_items = items.len();
        let start = page
            .checked_sub(1)
            .and_then(|p| p.checked_mul(self.page_size))
            .filter(|start| *start < total_items);

        let items = match start {
            Some(start) => items
                .into_iter()
                .skip(start)
                .take(self.page_size)
                .collect(),
            None => Vec::new(),
        };

        Page {
            items,
            page,
            total_items,
            page_size: self.page_size,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    #[test]
    fn test_first_page() {
        let page = Paginator::new(2).paginate(vec![1, 2, 3, 4, 5], 1);
        assert_eq!(page.items, vec![1, 2]);
        assert_eq!(page.total_items, 5);
        assert_eq!(page.total_pages(), 3);
        assert!(page.has_next());
        assert!(!page.has_previous());
        assert_eq!(page.next_page(), Some(2));
        assert_eq!(page.previous_page(), None);
    }

    #[test]
    fn test_last_partial_page() {
        let page = Paginator::new(2).paginate(vec![1, 2, 3, 4, 5], 3);
        assert_eq!(page.items, vec![5]);
        assert!(!page.has_next());
        assert_eq!(page.previous_page(), Some(2));
    }

    #[test]
    fn test_out_of_range_pages_are_empty() {
        let paginator = Paginator::new(2);
        let past_end = paginator.paginate(vec![1, 2, 3], 3);
        assert!(past_end.is_empty());
        assert_eq!(past_end.total_items, 3);
        assert!(!past_end.has_next());

        let zero = paginator.paginate(vec![1, 2, 3], 0);
        assert!(zero.is_empty());
        assert!(!zero.has_previous());
        assert!(!zero.has_next());

        let huge = paginator.paginate(vec![1, 2, 3], usize::MAX);
        assert!(huge.is_empty());
    }

    #[test]
    fn test_past_end_pages_link_back_to_last_page() {
        let paginator = Paginator::new(2);
        let items = vec![1, 2, 3, 4, 5];

        for page in [4, 5, 50] {
            let past_end = paginator.paginate(items.clone(), page);
            assert!(past_end.has_previous());
            assert_eq!(past_end.previous_page(), Some(3));
        }

        let empty = paginator.paginate(Vec::<u8>::new(), 3);
        assert!(!empty.has_previous());
        assert_eq!(empty.previous_page(), None);
    }

    #[test]
    fn test_empty_listing() {
        let page = Paginator::default().paginate(Vec::<u8>::new(), 1);
        assert!(page.is_empty());
        assert_eq!(page.total_pages(), 0);
        assert_eq!(page.page_size, DEFAULT_PAGE_SIZE);
    }

    #[test]
    fn test_zero_page_size_clamped() {
        let paginator = Paginator::new(0);
        assert_eq!(paginator.page_size(), 1);
        assert_eq!(paginator.paginate(vec!['a', 'b'], 2).items, vec!['b']);
    }

    proptest! {
        #[test]
        fn pages_partition_listing(len in 0usize..200, page_size in 1usize..30) {
            let items: Vec<usize> = (0..len).collect();
            let paginator = Paginator::new(page_size);
            let pages = len.div_ceil(page_size);

            let mut joined = Vec::new();
            for n in 1..=pages {
                let page = paginator.paginate(items.clone(), n);
                prop_assert!(page.items.len() <= page_size);
                prop_assert!(!page.is_empty());
                joined.extend(page.items);
            }
            prop_assert_eq!(joined, items.clone());
            prop_assert!(paginator.paginate(items, pages + 1).is_empty());
        }
    }
}

// src/pagination.rs

//! Page navigation over a known number of items.

use serde::Serialize;

/// Position of the current page within the items.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageInfo {
    /// 0-based index of the first item on the page
    pub start_index: usize,
    /// 0-based index of the last item on the page
    pub end_index: usize,
    /// `"{first}-{last} of {total}"`, 1-based
    pub showing: String,
}

/// 1-based page cursor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Paginator {
    items_per_page: usize,
    current_page: usize,
    total_items: usize,
    auto_reset: bool,
}

impl Paginator {
    /// A paginator on page 1 that resets to page 1 when the item count
    /// changes. A page size of 0 is treated as 1.
    pub fn new(items_per_page: usize) -> Self {
        Self {
            items_per_page: items_per_page.max(1),
            current_page: 1,
            total_items: 0,
            auto_reset: true,
        }
    }

    pub fn with_auto_reset(mut self, auto_reset: bool) -> Self {
        self.auto_reset = auto_reset;
        self
    }

    pub fn items_per_page(&self) -> usize {
        self.items_per_page
    }

    pub fn current_page(&self) -> usize {
        self.current_page
    }

    pub fn total_items(&self) -> usize {
        self.total_items
    }

    pub fn total_pages(&self) -> usize {
        self.total_items.div_ceil(self.items_per_page)
    }

    pub fn has_next_page(&self) -> bool {
        self.current_page < self.total_pages()
    }

    pub fn has_previous_page(&self) -> bool {
        self.current_page > 1
    }

    /// Update the item count, going back to page 1 if it changed and
    /// auto reset is on.
    pub fn set_total_items(&mut self, total_items: usize) {
        if total_items != self.total_items && self.auto_reset {
            self.current_page = 1;
        }
        self.total_items = total_items;
    }

    /// Move to `page` if it exists and is not the current one.
    ///
    /// Returns whether the page changed.
    pub fn go_to_page(&mut self, page: usize) -> bool {
        if page < 1 || page > self.total_pages() || page == self.current_page {
            return false;
        }
        self.current_page = page;
        true
    }

    pub fn next_page(&mut self) -> bool {
        self.has_next_page() && self.go_to_page(self.current_page + 1)
    }

    pub fn previous_page(&mut self) -> bool {
        self.has_previous_page() && self.go_to_page(self.current_page - 1)
    }

    pub fn first_page(&mut self) -> bool {
        self.go_to_page(1)
    }

    pub fn last_page(&mut self) -> bool {
        self.go_to_page(self.total_pages())
    }

    /// Reset to page 1 regardless of the item count.
    pub fn reset(&mut self) {
        self.current_page = 1;
    }

    pub fn page_info(&self) -> PageInfo {
        let first = (self.current_page - 1) * self.items_per_page + 1;
        let last = (self.current_page * self.items_per_page).min(self.total_items);
        PageInfo {
            start_index: first - 1,
            end_index: last.saturating_sub(1),
            showing: format!("{}-{} of {}", first, last, self.total_items),
        }
    }

    /// The items of the current page.
    pub fn page_slice<'a, T>(&self, items: &'a [T]) -> &'a [T] {
        let start = ((self.current_page - 1) * self.items_per_page).min(items.len());
        let end = (start + self.items_per_page).min(items.len());
        &items[start..end]
    }
}

impl Default for Paginator {
    fn default() -> Self {
        Self::new(crate::models::DEFAULT_PAGE_SIZE as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paginator(per_page: usize, total: usize) -> Paginator {
        let mut paginator = Paginator::new(per_page);
        paginator.set_total_items(total);
        paginator
    }

    #[test]
    fn test_total_pages() {
        assert_eq!(paginator(10, 0).total_pages(), 0);
        assert_eq!(paginator(10, 10).total_pages(), 1);
        assert_eq!(paginator(10, 25).total_pages(), 3);
        assert_eq!(Paginator::new(0).items_per_page(), 1);
    }

    #[test]
    fn test_go_to_page_bounds() {
        let mut p = paginator(10, 25);
        assert!(!p.go_to_page(0));
        assert!(!p.go_to_page(4));
        assert!(!p.go_to_page(1));
        assert!(p.go_to_page(3));
        assert_eq!(p.current_page(), 3);
        assert!(!p.has_next_page());
        assert!(p.has_previous_page());
    }

    #[test]
    fn test_navigation() {
        let mut p = paginator(10, 25);
        assert!(!p.previous_page());
        assert!(p.next_page());
        assert_eq!(p.current_page(), 2);
        assert!(p.last_page());
        assert_eq!(p.current_page(), 3);
        assert!(!p.next_page());
        assert!(p.first_page());
        assert_eq!(p.current_page(), 1);
    }

    #[test]
    fn test_page_info() {
        let mut p = paginator(10, 25);
        assert_eq!(
            p.page_info(),
            PageInfo {
                start_index: 0,
                end_index: 9,
                showing: "1-10 of 25".to_string(),
            }
        );

        p.last_page();
        assert_eq!(
            p.page_info(),
            PageInfo {
                start_index: 20,
                end_index: 24,
                showing: "21-25 of 25".to_string(),
            }
        );

        assert_eq!(paginator(10, 0).page_info().showing, "1-0 of 0");
    }

    #[test]
    fn test_page_slice() {
        let items: Vec<u32> = (1..=25).collect();
        let mut p = paginator(10, items.len());
        assert_eq!(p.page_slice(&items), &items[0..10]);

        p.last_page();
        assert_eq!(p.page_slice(&items), &[21, 22, 23, 24, 25]);
        assert!(p.page_slice(&items[..3]).is_empty());
    }

    #[test]
    fn test_auto_reset() {
        let mut p = paginator(10, 25);
        p.go_to_page(2);
        p.set_total_items(25);
        assert_eq!(p.current_page(), 2);
        p.set_total_items(24);
        assert_eq!(p.current_page(), 1);

        let mut p = paginator(10, 25).with_auto_reset(false);
        p.go_to_page(3);
        p.set_total_items(30);
        assert_eq!(p.current_page(), 3);
    }
}

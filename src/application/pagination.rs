//! Page-number pagination shared by every post listing.
//!
//! Out-of-range page numbers never fail: anything below 1 resolves to the first
//! page, anything past the end resolves to the last page, and unparsable input
//! resolves to the first page. An empty listing still has a (empty) first page.

use std::num::NonZeroU32;

use serde::Serialize;

/// Page number as requested by a client, before clamping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageNumber(i64);

impl PageNumber {
    pub const FIRST: PageNumber = PageNumber(1);

    pub fn new(value: i64) -> Self {
        Self(value)
    }

    /// Interpret a raw `page` query value. Missing or non-numeric values mean page 1.
    pub fn from_query(raw: Option<&str>) -> Self {
        raw.and_then(|value| value.trim().parse::<i64>().ok())
            .map(Self)
            .unwrap_or(Self::FIRST)
    }

    pub fn get(self) -> i64 {
        self.0
    }
}

impl Default for PageNumber {
    fn default() -> Self {
        Self::FIRST
    }
}

/// Resolved slice of a listing: which page is served and which rows it covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    pub number: u32,
    pub offset: u64,
    pub limit: u32,
}

impl PageWindow {
    /// Clamp `requested` into the valid range for `total` items split into `page_size` pages.
    pub fn resolve(total: u64, page_size: NonZeroU32, requested: PageNumber) -> Self {
        let size = u64::from(page_size.get());
        let last = page_count(total, page_size).max(1);
        let number = if requested.get() < 1 {
            1
        } else {
            (requested.get() as u64).min(last)
        };
        let number = u32::try_from(number).unwrap_or(u32::MAX);

        Self {
            number,
            offset: u64::from(number - 1) * size,
            limit: page_size.get(),
        }
    }
}

/// One page of an ordered listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub number: u32,
    pub page_size: u32,
    pub total: u64,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, window: PageWindow, total: u64) -> Self {
        Self {
            items,
            number: window.number,
            page_size: window.limit,
            total,
        }
    }

    /// Number of pages needed for `total` items (`0` for an empty listing).
    pub fn page_count(&self) -> u64 {
        NonZeroU32::new(self.page_size)
            .map(|size| page_count(self.total, size))
            .unwrap_or(0)
    }

    pub fn has_previous(&self) -> bool {
        self.number > 1
    }

    pub fn has_next(&self) -> bool {
        u64::from(self.number) < self.page_count()
    }

    pub fn previous_number(&self) -> Option<u32> {
        self.has_previous().then(|| self.number - 1)
    }

    pub fn next_number(&self) -> Option<u32> {
        self.has_next().then(|| self.number + 1)
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            number: self.number,
            page_size: self.page_size,
            total: self.total,
        }
    }
}

/// Fixed-size paginator; the page size is configuration, never client input.
#[derive(Debug, Clone, Copy)]
pub struct Paginator {
    page_size: NonZeroU32,
}

impl Paginator {
    pub fn new(page_size: NonZeroU32) -> Self {
        Self { page_size }
    }

    pub fn page_size(&self) -> NonZeroU32 {
        self.page_size
    }

    pub fn window(&self, total: u64, requested: PageNumber) -> PageWindow {
        PageWindow::resolve(total, self.page_size, requested)
    }

    /// Slice an already ordered, fully materialised sequence.
    pub fn page<T>(&self, sequence: Vec<T>, requested: PageNumber) -> Page<T> {
        let total = sequence.len() as u64;
        let window = self.window(total, requested);
        let start = usize::try_from(window.offset).unwrap_or(usize::MAX);
        let items = sequence
            .into_iter()
            .skip(start)
            .take(window.limit as usize)
            .collect();
        Page::new(items, window, total)
    }
}

fn page_count(total: u64, page_size: NonZeroU32) -> u64 {
    total.div_ceil(u64::from(page_size.get()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paginator(size: u32) -> Paginator {
        Paginator::new(NonZeroU32::new(size).expect("non-zero page size"))
    }

    #[test]
    fn thirteen_items_split_into_ten_and_three() {
        let paginator = paginator(10);
        let items: Vec<u32> = (0..13).collect();

        let first = paginator.page(items.clone(), PageNumber::new(1));
        assert_eq!(first.items.len(), 10);
        assert!(first.has_next());
        assert!(!first.has_previous());
        assert_eq!(first.page_count(), 2);

        let second = paginator.page(items, PageNumber::new(2));
        assert_eq!(second.items, vec![10, 11, 12]);
        assert!(!second.has_next());
        assert_eq!(second.previous_number(), Some(1));
    }

    #[test]
    fn page_past_the_end_clamps_to_last_page() {
        let paginator = paginator(10);
        let items: Vec<u32> = (0..13).collect();

        let page = paginator.page(items, PageNumber::new(3));
        assert_eq!(page.number, 2);
        assert_eq!(page.items, vec![10, 11, 12]);
    }

    #[test]
    fn page_below_one_clamps_to_first_page() {
        let paginator = paginator(4);
        let items: Vec<u32> = (0..10).collect();

        for requested in [0, -1, i64::MIN] {
            let page = paginator.page(items.clone(), PageNumber::new(requested));
            assert_eq!(page.number, 1);
            assert_eq!(page.items, vec![0, 1, 2, 3]);
        }
    }

    #[test]
    fn huge_page_numbers_do_not_overflow() {
        let window = PageWindow::resolve(25, NonZeroU32::MIN, PageNumber::new(i64::MAX));
        assert_eq!(window.number, 25);
        assert_eq!(window.offset, 24);
    }

    #[test]
    fn empty_sequence_serves_an_empty_first_page() {
        let page = paginator(10).page(Vec::<u32>::new(), PageNumber::new(5));
        assert_eq!(page.number, 1);
        assert!(page.items.is_empty());
        assert_eq!(page.page_count(), 0);
        assert!(!page.has_next());
        assert!(!page.has_previous());
    }

    #[test]
    fn concatenated_pages_reproduce_the_sequence() {
        for size in 1..=7u32 {
            for total in 0..=23u32 {
                let paginator = paginator(size);
                let sequence: Vec<u32> = (0..total).collect();
                let expected_pages = total.div_ceil(size) as u64;

                let probe = paginator.page(sequence.clone(), PageNumber::FIRST);
                assert_eq!(probe.page_count(), expected_pages);

                let mut rebuilt = Vec::new();
                for number in 1..=expected_pages {
                    let page = paginator.page(sequence.clone(), PageNumber::new(number as i64));
                    assert!(page.items.len() <= size as usize);
                    rebuilt.extend(page.items);
                }
                assert_eq!(rebuilt, sequence, "size={size} total={total}");
            }
        }
    }

    #[test]
    fn query_values_fall_back_to_first_page() {
        assert_eq!(PageNumber::from_query(None), PageNumber::FIRST);
        assert_eq!(PageNumber::from_query(Some("abc")), PageNumber::FIRST);
        assert_eq!(PageNumber::from_query(Some(" 2 ")), PageNumber::new(2));
        assert_eq!(PageNumber::from_query(Some("-4")), PageNumber::new(-4));
    }

    #[test]
    fn window_offsets_follow_page_number() {
        let window = paginator(10).window(13, PageNumber::new(2));
        assert_eq!(
            window,
            PageWindow {
                number: 2,
                offset: 10,
                limit: 10
            }
        );
    }
}

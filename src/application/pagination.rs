//! Page-number pagination shared by every listing.
//!
//! Page selection is forgiving: a missing or malformed `page` value selects
//! the first page and a number past either end selects the last page. An empty
//! listing still has one (empty) page.

use std::num::NonZeroU32;

use serde::Deserialize;

/// Raw `?page=` query parameter, kept as text so malformed values still
/// resolve to a page instead of rejecting the request.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<String>,
}

#[derive(Debug, Clone, Copy)]
pub struct Paginator {
    per_page: NonZeroU32,
}

/// Slice of a listing selected for one page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    pub number: u32,
    pub num_pages: u32,
    pub total: u64,
    pub limit: u32,
    pub offset: u64,
}

#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub number: u32,
    pub num_pages: u32,
    pub total: u64,
}

impl Paginator {
    pub const DEFAULT_PER_PAGE: u32 = 10;

    pub fn new(per_page: NonZeroU32) -> Self {
        Self { per_page }
    }

    pub fn per_page(&self) -> u32 {
        self.per_page.get()
    }

    pub fn num_pages(&self, total: u64) -> u32 {
        let per_page = u64::from(self.per_page.get());
        let pages = total.div_ceil(per_page).max(1);
        u32::try_from(pages).unwrap_or(u32::MAX)
    }

    /// Resolve the requested page against a listing of `total` items.
    pub fn window(&self, total: u64, requested: Option<&str>) -> PageWindow {
        let num_pages = self.num_pages(total);
        let number = match requested.map(str::trim) {
            None => 1,
            Some(raw) => match raw.parse::<i64>() {
                Ok(value) if value >= 1 && value <= i64::from(num_pages) => value as u32,
                Ok(_) => num_pages,
                // Integers too wide for i64 are still out of range.
                Err(_) if is_integer_literal(raw) => num_pages,
                Err(_) => 1,
            },
        };
        let limit = self.per_page.get();
        PageWindow {
            number,
            num_pages,
            total,
            limit,
            offset: u64::from(number - 1) * u64::from(limit),
        }
    }
}

fn is_integer_literal(raw: &str) -> bool {
    let digits = raw.strip_prefix(['+', '-']).unwrap_or(raw);
    !digits.is_empty() && digits.bytes().all(|byte| byte.is_ascii_digit())
}

impl Default for Paginator {
    fn default() -> Self {
        Self::new(NonZeroU32::new(Self::DEFAULT_PER_PAGE).unwrap_or(NonZeroU32::MIN))
    }
}

impl<T> Page<T> {
    pub fn new(window: PageWindow, items: Vec<T>) -> Self {
        Self {
            items,
            number: window.number,
            num_pages: window.num_pages,
            total: window.total,
        }
    }

    pub fn has_previous(&self) -> bool {
        self.number > 1
    }

    pub fn has_next(&self) -> bool {
        self.number < self.num_pages
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
            num_pages: self.num_pages,
            total: self.total,
        }
    }
}

//! Page windows over ordered post listings.
//!
//! Page numbers are resolved the forgiving way: a missing or non-numeric page
//! yields the first page, a number outside `1..=num_pages` (including one too
//! large for `i64`) yields the last page.
//! An empty listing still has one (empty) page.

use serde::Serialize;
use std::num::IntErrorKind;

pub const DEFAULT_PER_PAGE: i64 = 10;

/// Slice of the ordered sequence selected for one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    pub number: i64,
    pub num_pages: i64,
    pub offset: i64,
    pub limit: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Paginator {
    per_page: i64,
}

impl Default for Paginator {
    fn default() -> Self {
        Self::new(DEFAULT_PER_PAGE)
    }
}

impl Paginator {
    pub fn new(per_page: i64) -> Self {
        Self {
            per_page: per_page.max(1),
        }
    }

    pub fn per_page(&self) -> i64 {
        self.per_page
    }

    pub fn num_pages(&self, count: i64) -> i64 {
        if count <= 0 {
            1
        } else {
            (count + self.per_page - 1) / self.per_page
        }
    }

    /// Resolve the raw `page` query value against a listing of `count` items.
    pub fn window(&self, requested: Option<&str>, count: i64) -> PageWindow {
        let num_pages = self.num_pages(count);
        let number = match requested.map(str::trim).map(str::parse::<i64>) {
            Some(Ok(n)) if (1..=num_pages).contains(&n) => n,
            Some(Ok(_)) => num_pages,
            Some(Err(err))
                if matches!(err.kind(), IntErrorKind::PosOverflow | IntErrorKind::NegOverflow) =>
            {
                num_pages
            }
            Some(Err(_)) | None => 1,
        };

        PageWindow {
            number,
            num_pages,
            offset: (number - 1) * self.per_page,
            limit: self.per_page,
        }
    }
}

/// One page of a listing, shaped the way listing templates consume it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page<T> {
    pub object_list: Vec<T>,
    pub number: i64,
    pub num_pages: i64,
    pub count: i64,
    pub per_page: i64,
    pub has_next: bool,
    pub has_previous: bool,
    pub next_page_number: Option<i64>,
    pub previous_page_number: Option<i64>,
}

impl<T> Page<T> {
    pub fn new(object_list: Vec<T>, window: PageWindow, count: i64) -> Self {
        let has_next = window.number < window.num_pages;
        let has_previous = window.number > 1;

        Self {
            object_list,
            number: window.number,
            num_pages: window.num_pages,
            count,
            per_page: window.limit,
            has_next,
            has_previous,
            next_page_number: has_next.then(|| window.number + 1),
            previous_page_number: has_previous.then(|| window.number - 1),
        }
    }

    pub fn len(&self) -> usize {
        self.object_list.len()
    }

    pub fn is_empty(&self) -> bool {
        self.object_list.is_empty()
    }
}

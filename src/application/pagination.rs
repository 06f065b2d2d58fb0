//! Page and filter state for list views.
//!
//! The controller owns the current page and the active filters. Any filter
//! change resets the page to 1, even when the new value equals the old one.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

use crate::cache::{DEFAULT_PAGE_SIZE, ListQuery};
use crate::domain::entities::{NoteType, PageMeta};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PaginationError {
    #[error("page numbers start at 1")]
    ZeroPage,
    #[error("unknown empty-page policy `{0}` (expected `freeze` or `step_back`)")]
    UnknownPolicy(String),
}

/// What to do when the current page no longer holds any items
/// (for example after deleting the last record on the last page).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum EmptyPagePolicy {
    /// Keep the page; the next read requests the now-empty page.
    #[default]
    Freeze,
    /// Move to the last page that still holds items.
    StepBack,
}

impl EmptyPagePolicy {
    pub fn as_str(self) -> &'static str {
        match self {
            EmptyPagePolicy::Freeze => "freeze",
            EmptyPagePolicy::StepBack => "step_back",
        }
    }
}

impl fmt::Display for EmptyPagePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EmptyPagePolicy {
    type Err = PaginationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "freeze" => Ok(EmptyPagePolicy::Freeze),
            "step_back" => Ok(EmptyPagePolicy::StepBack),
            other => Err(PaginationError::UnknownPolicy(other.to_string())),
        }
    }
}

/// A single filter change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Filter {
    Search(Option<String>),
    NoteType(Option<NoteType>),
    Book(Option<i64>),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Filters {
    pub search: Option<String>,
    pub note_type: Option<NoteType>,
    pub book_id: Option<i64>,
}

/// Outcome of reconciling local state with server paging totals.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageAdjustment {
    None,
    /// The page moved; the list must be read again for this page.
    Refetch(u32),
}

#[derive(Debug, Clone)]
pub struct PaginationController {
    current_page: u32,
    per_page: u32,
    filters: Filters,
    total_pages: Option<u32>,
    total_items: Option<u64>,
    policy: EmptyPagePolicy,
}

impl Default for PaginationController {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE_SIZE, EmptyPagePolicy::default())
    }
}

impl PaginationController {
    pub fn new(per_page: u32, policy: EmptyPagePolicy) -> Self {
        Self {
            current_page: 1,
            per_page: per_page.max(1),
            filters: Filters::default(),
            total_pages: None,
            total_items: None,
            policy,
        }
    }

    pub fn current_page(&self) -> u32 {
        self.current_page
    }

    pub fn per_page(&self) -> u32 {
        self.per_page
    }

    pub fn filters(&self) -> &Filters {
        &self.filters
    }

    pub fn policy(&self) -> EmptyPagePolicy {
        self.policy
    }

    pub fn total_pages(&self) -> Option<u32> {
        self.total_pages
    }

    pub fn total_items(&self) -> Option<u64> {
        self.total_items
    }

    /// Apply a filter change and return to the first page. Totals from the
    /// previous filter are forgotten until the next response.
    pub fn set_filter(&mut self, filter: Filter) {
        match filter {
            Filter::Search(search) => {
                self.filters.search = search.filter(|term| !term.is_empty());
            }
            Filter::NoteType(note_type) => self.filters.note_type = note_type,
            Filter::Book(book_id) => self.filters.book_id = book_id,
        }
        self.current_page = 1;
        self.total_pages = None;
        self.total_items = None;
    }

    /// Select a page. Pages past the known last page are allowed.
    pub fn set_page(&mut self, page: u32) -> Result<(), PaginationError> {
        if page == 0 {
            return Err(PaginationError::ZeroPage);
        }
        self.current_page = page;
        Ok(())
    }

    pub fn next_page(&mut self) -> u32 {
        self.current_page = self.current_page.saturating_add(1);
        self.current_page
    }

    pub fn previous_page(&mut self) -> u32 {
        self.current_page = self.current_page.saturating_sub(1).max(1);
        self.current_page
    }

    pub fn current_query(&self) -> ListQuery {
        ListQuery::new()
            .with_page(self.current_page)
            .with_per_page(self.per_page)
            .with_search(self.filters.search.clone())
            .with_note_type(self.filters.note_type)
            .with_book(self.filters.book_id)
    }

    /// Record server totals and apply the empty-page policy.
    pub fn reconcile(&mut self, meta: &PageMeta) -> PageAdjustment {
        self.total_pages = Some(meta.total_pages);
        self.total_items = Some(meta.total);

        let last = meta.total_pages.max(1);
        if self.current_page <= last {
            return PageAdjustment::None;
        }
        match self.policy {
            EmptyPagePolicy::Freeze => PageAdjustment::None,
            EmptyPagePolicy::StepBack => {
                self.current_page = last;
                PageAdjustment::Refetch(last)
            }
        }
    }

    /// Page number to show, clamped to the known page range.
    pub fn displayed_page(&self) -> u32 {
        match self.total_pages {
            Some(total) => self.current_page.clamp(1, total.max(1)),
            None => self.current_page,
        }
    }
}

//! A paged, filterable list bound to one resource.
//!
//! Glues the pagination controller to the sync layer: the controller decides
//! which fingerprint to read, and the server's paging totals flow back into the
//! controller after each read.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use tracing::debug;

use crate::application::error::AppError;
use crate::application::pagination::{
    EmptyPagePolicy, Filter, PageAdjustment, PaginationController, PaginationError,
};
use crate::application::sync::ReadingSync;
use crate::cache::{Fingerprint, ListQuery};
use crate::domain::entities::{NoteType, QueryData};
use crate::infra::http::ApiError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListResource {
    Books,
    Notes,
    Tags,
    /// Notes attached to one book.
    BookNotes(i64),
}

impl ListResource {
    pub fn fingerprint(&self, query: ListQuery) -> Fingerprint {
        match self {
            ListResource::Books => {
                Fingerprint::BookList(query.with_note_type(None).with_book(None))
            }
            ListResource::Notes => Fingerprint::NoteList(query),
            ListResource::Tags => Fingerprint::TagList(query.with_note_type(None).with_book(None)),
            ListResource::BookNotes(book_id) => Fingerprint::BookNotes {
                book_id: *book_id,
                query: query.with_book(None),
            },
        }
    }

    pub fn supports_note_type(&self) -> bool {
        matches!(self, ListResource::Notes | ListResource::BookNotes(_))
    }
}

impl fmt::Display for ListResource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ListResource::Books => f.write_str("books"),
            ListResource::Notes => f.write_str("notes"),
            ListResource::Tags => f.write_str("tags"),
            ListResource::BookNotes(id) => write!(f, "books/{id}/notes"),
        }
    }
}

impl FromStr for ListResource {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "books" => Ok(ListResource::Books),
            "notes" => Ok(ListResource::Notes),
            "tags" => Ok(ListResource::Tags),
            other => Err(AppError::validation(format!(
                "unknown list `{other}` (expected books, notes or tags)"
            ))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ListSession {
    resource: ListResource,
    pagination: PaginationController,
}

impl ListSession {
    pub fn new(resource: ListResource, per_page: u32, policy: EmptyPagePolicy) -> Self {
        Self {
            resource,
            pagination: PaginationController::new(per_page, policy),
        }
    }

    pub fn resource(&self) -> ListResource {
        self.resource
    }

    pub fn pagination(&self) -> &PaginationController {
        &self.pagination
    }

    pub fn fingerprint(&self) -> Fingerprint {
        self.resource.fingerprint(self.pagination.current_query())
    }

    /// Apply a committed search term. The empty term removes the filter.
    pub fn apply_search(&mut self, term: &str) {
        self.pagination
            .set_filter(Filter::Search(Some(term.to_string())));
    }

    pub fn set_note_type(&mut self, note_type: Option<NoteType>) -> Result<(), AppError> {
        if !self.resource.supports_note_type() {
            return Err(AppError::validation(format!(
                "{} cannot be filtered by note type",
                self.resource
            )));
        }
        self.pagination.set_filter(Filter::NoteType(note_type));
        Ok(())
    }

    pub fn set_book(&mut self, book_id: Option<i64>) -> Result<(), AppError> {
        if self.resource != ListResource::Notes {
            return Err(AppError::validation(format!(
                "{} cannot be filtered by book",
                self.resource
            )));
        }
        self.pagination.set_filter(Filter::Book(book_id));
        Ok(())
    }

    pub fn set_page(&mut self, page: u32) -> Result<(), PaginationError> {
        self.pagination.set_page(page)
    }

    pub fn next_page(&mut self) -> u32 {
        self.pagination.next_page()
    }

    pub fn previous_page(&mut self) -> u32 {
        self.pagination.previous_page()
    }

    /// Read the current page and reconcile paging totals.
    ///
    /// When the empty-page policy moves the page, the new page is read once
    /// more before returning.
    pub async fn load(&mut self, sync: &ReadingSync) -> Result<Arc<QueryData>, ApiError> {
        let mut data = sync.query(&self.fingerprint()).await?;
        let adjustment = data
            .page_meta()
            .map(|meta| self.pagination.reconcile(meta));
        if let Some(PageAdjustment::Refetch(page)) = adjustment {
            debug!(resource = %self.resource, page, "current page emptied, stepping back");
            data = sync.query(&self.fingerprint()).await?;
            if let Some(meta) = data.page_meta() {
                self.pagination.reconcile(meta);
            }
        }
        Ok(data)
    }
}

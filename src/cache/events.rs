//! Mutation events.
//!
//! A `MutationEvent` describes a write the API has confirmed. It carries just
//! enough context for the planner to decide which cached reads are affected.

use std::fmt;

use crate::domain::types::{EntityKind, MutationOp};

/// Books a note mutation touched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BookRefs {
    /// The referenced books are known (possibly none).
    Known(Vec<i64>),
    /// The note was not cached and the API did not say which book it belonged to.
    Unknown,
}

impl BookRefs {
    pub fn none() -> Self {
        Self::Known(Vec::new())
    }

    /// Collect distinct book ids, ignoring absent references.
    pub fn from_ids(ids: impl IntoIterator<Item = Option<i64>>) -> Self {
        let mut books: Vec<i64> = ids.into_iter().flatten().collect();
        books.sort_unstable();
        books.dedup();
        Self::Known(books)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutationEvent {
    pub kind: EntityKind,
    pub operation: MutationOp,
    /// Record identifier; absent only for creates whose response was not inspected.
    pub id: Option<i64>,
    pub books: BookRefs,
}

impl MutationEvent {
    pub fn new(kind: EntityKind, operation: MutationOp, id: Option<i64>) -> Self {
        Self {
            kind,
            operation,
            id,
            books: BookRefs::none(),
        }
    }

    pub fn with_books(mut self, books: BookRefs) -> Self {
        self.books = books;
        self
    }
}

impl fmt::Display for MutationEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.id {
            Some(id) => write!(f, "{} {} #{id}", self.kind, self.operation),
            None => write!(f, "{} {}", self.kind, self.operation),
        }
    }
}

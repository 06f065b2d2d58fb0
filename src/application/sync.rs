//! Read and write entry point for consumers of the sync layer.
//!
//! Reads go through the query cache; writes go straight to the API and, once
//! the API confirms them, through the invalidation router.

use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};

use crate::cache::{
    BookRefs, CacheConfig, CacheSnapshot, Fingerprint, InvalidationRouter, MutationEvent,
    QueryCache, Subscription,
};
use crate::domain::entities::{
    Book, CreateBookRequest, CreateNoteRequest, CreateTagRequest, Note, QueryData, Tag,
    UpdateBookRequest, UpdateNoteRequest, UpdateTagRequest,
};
use crate::domain::types::{EntityKind, MutationOp};
use crate::infra::http::{ApiClient, ApiError};

/// A write against the remote API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mutation {
    CreateBook(CreateBookRequest),
    UpdateBook { id: i64, request: UpdateBookRequest },
    DeleteBook { id: i64 },
    CreateNote(CreateNoteRequest),
    UpdateNote { id: i64, request: UpdateNoteRequest },
    UpdateNoteTags { id: i64, tags: Vec<String> },
    DeleteNote { id: i64 },
    CreateTag(CreateTagRequest),
    UpdateTag { id: i64, request: UpdateTagRequest },
    DeleteTag { id: i64 },
}

impl Mutation {
    pub fn kind(&self) -> EntityKind {
        match self {
            Mutation::CreateBook(_) | Mutation::UpdateBook { .. } | Mutation::DeleteBook { .. } => {
                EntityKind::Book
            }
            Mutation::CreateNote(_)
            | Mutation::UpdateNote { .. }
            | Mutation::UpdateNoteTags { .. }
            | Mutation::DeleteNote { .. } => EntityKind::Note,
            Mutation::CreateTag(_) | Mutation::UpdateTag { .. } | Mutation::DeleteTag { .. } => {
                EntityKind::Tag
            }
        }
    }

    pub fn operation(&self) -> MutationOp {
        match self {
            Mutation::CreateBook(_) | Mutation::CreateNote(_) | Mutation::CreateTag(_) => {
                MutationOp::Create
            }
            Mutation::UpdateBook { .. }
            | Mutation::UpdateNote { .. }
            | Mutation::UpdateNoteTags { .. }
            | Mutation::UpdateTag { .. } => MutationOp::Update,
            Mutation::DeleteBook { .. } | Mutation::DeleteNote { .. } | Mutation::DeleteTag { .. } => {
                MutationOp::Delete
            }
        }
    }

    /// Identifier of the record being changed; `None` for creates.
    pub fn target_id(&self) -> Option<i64> {
        match self {
            Mutation::CreateBook(_) | Mutation::CreateNote(_) | Mutation::CreateTag(_) => None,
            Mutation::UpdateBook { id, .. }
            | Mutation::DeleteBook { id }
            | Mutation::UpdateNote { id, .. }
            | Mutation::UpdateNoteTags { id, .. }
            | Mutation::DeleteNote { id }
            | Mutation::UpdateTag { id, .. }
            | Mutation::DeleteTag { id } => Some(*id),
        }
    }

    /// Book a note write asks for, if the request names one.
    fn requested_book(&self) -> Option<i64> {
        match self {
            Mutation::CreateNote(request) => request.book_id,
            Mutation::UpdateNote { request, .. } => request.book_id,
            _ => None,
        }
    }
}

/// Confirmed result of a mutation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum MutationOutcome {
    Book(Book),
    Note(Note),
    Tag(Tag),
    Deleted { kind: EntityKind, id: i64 },
}

impl MutationOutcome {
    pub fn id(&self) -> i64 {
        match self {
            MutationOutcome::Book(book) => book.id,
            MutationOutcome::Note(note) => note.id,
            MutationOutcome::Tag(tag) => tag.id,
            MutationOutcome::Deleted { id, .. } => *id,
        }
    }
}

#[derive(Clone)]
pub struct ReadingSync {
    api: ApiClient,
    cache: QueryCache<QueryData>,
    router: InvalidationRouter<QueryData>,
}

impl ReadingSync {
    pub fn new(api: ApiClient, config: CacheConfig) -> Self {
        let cache = QueryCache::new(config);
        let router = InvalidationRouter::new(cache.clone());
        Self { api, cache, router }
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    pub fn cache(&self) -> &QueryCache<QueryData> {
        &self.cache
    }

    /// Read through the cache.
    pub async fn query(&self, fingerprint: &Fingerprint) -> Result<Arc<QueryData>, ApiError> {
        let api = self.api.clone();
        let target = fingerprint.clone();
        self.cache
            .resolve(fingerprint, move || {
                let api = api.clone();
                let target = target.clone();
                async move { api.fetch(&target).await }
            })
            .await
    }

    pub fn subscribe(&self, fingerprint: &Fingerprint) -> Subscription<QueryData> {
        self.cache.subscribe(fingerprint)
    }

    pub fn unsubscribe(&self, subscription: Subscription<QueryData>) -> bool {
        self.cache.unsubscribe(subscription)
    }

    pub fn snapshot(&self, fingerprint: &Fingerprint) -> Option<CacheSnapshot<QueryData>> {
        self.cache.snapshot(fingerprint)
    }

    /// Perform a write, then invalidate whatever it affected.
    ///
    /// Failures are returned as-is: no retry and no invalidation.
    pub async fn mutate(&self, mutation: Mutation) -> Result<MutationOutcome, ApiError> {
        let kind = mutation.kind();
        let operation = mutation.operation();
        let requested_book = mutation.requested_book();
        let cached_book = mutation
            .target_id()
            .filter(|_| kind == EntityKind::Note)
            .and_then(|id| self.cached_note_book(id));

        let outcome = match self.execute(mutation).await {
            Ok(outcome) => outcome,
            Err(err) => {
                warn!(
                    entity = %kind,
                    operation = %operation,
                    error = %err,
                    "mutation failed"
                );
                return Err(err);
            }
        };

        let books = match (&outcome, cached_book) {
            // An uncached note moving books: its old book is unknown.
            (MutationOutcome::Note(_), None)
                if operation == MutationOp::Update && requested_book.is_some() =>
            {
                BookRefs::Unknown
            }
            (MutationOutcome::Note(note), previous) => {
                BookRefs::from_ids([note.referenced_book(), requested_book, previous.flatten()])
            }
            (MutationOutcome::Deleted { .. }, Some(previous)) if kind == EntityKind::Note => {
                BookRefs::from_ids([previous])
            }
            (MutationOutcome::Deleted { .. }, None) if kind == EntityKind::Note => BookRefs::Unknown,
            _ => BookRefs::none(),
        };
        let event = MutationEvent::new(kind, operation, Some(outcome.id())).with_books(books);
        let invalidated = self.router.on_mutation_success(&event);
        info!(%event, invalidated, "mutation confirmed");

        Ok(outcome)
    }

    /// Book of a cached note: `None` when the note is not cached,
    /// `Some(None)` when it is cached without a book.
    fn cached_note_book(&self, id: i64) -> Option<Option<i64>> {
        let data = self.cache.snapshot(&Fingerprint::Note(id))?.data?;
        data.as_note().map(Note::referenced_book)
    }

    async fn execute(&self, mutation: Mutation) -> Result<MutationOutcome, ApiError> {
        let api = &self.api;
        let outcome = match mutation {
            Mutation::CreateBook(request) => MutationOutcome::Book(api.create_book(&request).await?),
            Mutation::UpdateBook { id, request } => {
                MutationOutcome::Book(api.update_book(id, &request).await?)
            }
            Mutation::DeleteBook { id } => {
                api.delete_book(id).await?;
                MutationOutcome::Deleted {
                    kind: EntityKind::Book,
                    id,
                }
            }
            Mutation::CreateNote(request) => MutationOutcome::Note(api.create_note(&request).await?),
            Mutation::UpdateNote { id, request } => {
                MutationOutcome::Note(api.update_note(id, &request).await?)
            }
            Mutation::UpdateNoteTags { id, tags } => {
                MutationOutcome::Note(api.update_note_tags(id, &tags).await?)
            }
            Mutation::DeleteNote { id } => {
                api.delete_note(id).await?;
                MutationOutcome::Deleted {
                    kind: EntityKind::Note,
                    id,
                }
            }
            Mutation::CreateTag(request) => MutationOutcome::Tag(api.create_tag(&request).await?),
            Mutation::UpdateTag { id, request } => {
                MutationOutcome::Tag(api.update_tag(id, &request).await?)
            }
            Mutation::DeleteTag { id } => {
                api.delete_tag(id).await?;
                MutationOutcome::Deleted {
                    kind: EntityKind::Tag,
                    id,
                }
            }
        };
        Ok(outcome)
    }
}

//! Request and response types for the Marginalia reading-notes API.
//!
//! These mirror the JSON contract of the remote service. Timestamps are RFC 3339.

mod books;
mod notes;
mod pagination;
mod tags;

pub use books::{Book, BookListResponse, CreateBookRequest, UpdateBookRequest};
pub use notes::{
    CreateNoteRequest, Note, NoteListResponse, NoteTagsRequest, NoteType, ParseNoteTypeError,
    UpdateNoteRequest,
};
pub use pagination::{ApiErrorBody, PageMeta};
pub use tags::{CreateTagRequest, Tag, TagListResponse, UpdateTagRequest};

//! Entities as the client sees them, plus the cached read payload.

pub use marginalia_api_types::{
    Book, BookListResponse, CreateBookRequest, CreateNoteRequest, CreateTagRequest, Note,
    NoteListResponse, NoteTagsRequest, NoteType, PageMeta, Tag, TagListResponse,
    UpdateBookRequest, UpdateNoteRequest, UpdateTagRequest,
};
use serde::Serialize;

/// Payload held by a cache entry: the decoded body of one read request.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum QueryData {
    Books(BookListResponse),
    Book(Book),
    Notes(NoteListResponse),
    Note(Note),
    Tags(TagListResponse),
    PopularTags(Vec<Tag>),
    Tag(Tag),
}

impl QueryData {
    /// Paging block for list payloads.
    pub fn page_meta(&self) -> Option<&PageMeta> {
        match self {
            QueryData::Books(list) => Some(&list.meta),
            QueryData::Notes(list) => Some(&list.meta),
            QueryData::Tags(list) => Some(&list.meta),
            QueryData::Book(_) | QueryData::Note(_) | QueryData::PopularTags(_) | QueryData::Tag(_) => {
                None
            }
        }
    }

    /// Number of records carried by the payload.
    pub fn item_count(&self) -> usize {
        match self {
            QueryData::Books(list) => list.books.len(),
            QueryData::Notes(list) => list.notes.len(),
            QueryData::Tags(list) => list.tags.len(),
            QueryData::PopularTags(tags) => tags.len(),
            QueryData::Book(_) | QueryData::Note(_) | QueryData::Tag(_) => 1,
        }
    }

    pub fn as_note(&self) -> Option<&Note> {
        match self {
            QueryData::Note(note) => Some(note),
            _ => None,
        }
    }
}

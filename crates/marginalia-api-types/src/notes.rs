use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::books::Book;
use crate::pagination::PageMeta;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoteType {
    Quote,
    Summary,
    Thought,
    General,
}

impl NoteType {
    pub const ALL: [NoteType; 4] = [
        NoteType::Quote,
        NoteType::Summary,
        NoteType::Thought,
        NoteType::General,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            NoteType::Quote => "quote",
            NoteType::Summary => "summary",
            NoteType::Thought => "thought",
            NoteType::General => "general",
        }
    }
}

impl fmt::Display for NoteType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseNoteTypeError(String);

impl fmt::Display for ParseNoteTypeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "unknown note type `{}` (expected quote, summary, thought or general)",
            self.0
        )
    }
}

impl std::error::Error for ParseNoteTypeError {}

impl FromStr for NoteType {
    type Err = ParseNoteTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        NoteType::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ParseNoteTypeError(s.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Note {
    pub id: i64,
    #[serde(default)]
    pub book_id: Option<i64>,
    pub note_type: NoteType,
    #[serde(default)]
    pub title: Option<String>,
    pub content: String,
    #[serde(default)]
    pub page_reference: Option<i32>,
    #[serde(default)]
    pub is_favorite: bool,
    /// Tag names, not identifiers.
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub book: Option<Book>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl Note {
    /// Book the note belongs to, from the id field or the embedded book.
    pub fn referenced_book(&self) -> Option<i64> {
        self.book_id.or_else(|| self.book.as_ref().map(|book| book.id))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateNoteRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub book_id: Option<i64>,
    pub note_type: NoteType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_reference: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_favorite: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateNoteRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub book_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note_type: Option<NoteType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_reference: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_favorite: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteTagsRequest {
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NoteListResponse {
    pub notes: Vec<Note>,
    #[serde(flatten)]
    pub meta: PageMeta,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn note_type_parses_case_insensitively() {
        assert_eq!("Quote".parse::<NoteType>(), Ok(NoteType::Quote));
        assert_eq!(" thought ".parse::<NoteType>(), Ok(NoteType::Thought));
        assert!("all".parse::<NoteType>().is_err());
    }

    #[test]
    fn note_reads_book_from_embedded_record() {
        let raw = r#"{
            "id": 11,
            "note_type": "quote",
            "content": "Fear is the mind-killer.",
            "is_favorite": true,
            "tags": ["fear", "litany"],
            "book": {
                "id": 7,
                "title": "Dune",
                "author": "Frank Herbert",
                "created_at": "2024-03-01T10:00:00Z",
                "updated_at": "2024-03-01T10:00:00Z"
            },
            "created_at": "2024-03-03T10:00:00Z",
            "updated_at": "2024-03-03T10:00:00Z"
        }"#;
        let note: Note = serde_json::from_str(raw).expect("valid note");
        assert_eq!(note.book_id, None);
        assert_eq!(note.referenced_book(), Some(7));
        assert_eq!(note.tags, vec!["fear", "litany"]);
    }

    #[test]
    fn create_request_skips_absent_optionals() {
        let request = CreateNoteRequest {
            book_id: Some(7),
            note_type: NoteType::Summary,
            title: None,
            content: "Chapter one".into(),
            page_reference: None,
            is_favorite: None,
            tags: None,
        };
        let json = serde_json::to_value(&request).expect("serializes");
        assert_eq!(
            json,
            serde_json::json!({ "book_id": 7, "note_type": "summary", "content": "Chapter one" })
        );
    }
}

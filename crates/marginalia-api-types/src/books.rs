use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::pagination::PageMeta;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Book {
    pub id: i64,
    pub title: String,
    pub author: String,
    #[serde(default)]
    pub isbn: Option<String>,
    #[serde(default)]
    pub publisher: Option<String>,
    #[serde(default)]
    pub page_count: Option<i32>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateBookRequest {
    pub title: String,
    pub author: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub isbn: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publisher: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_count: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Partial update; absent fields are left untouched by the server.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateBookRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub isbn: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publisher: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_count: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl UpdateBookRequest {
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookListResponse {
    pub books: Vec<Book>,
    #[serde(flatten)]
    pub meta: PageMeta,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn list_envelope_flattens_paging_fields() {
        let raw = r#"{
            "books": [{
                "id": 3,
                "title": "Dune",
                "author": "Frank Herbert",
                "isbn": null,
                "created_at": "2024-03-01T10:00:00Z",
                "updated_at": "2024-03-02T10:00:00Z"
            }],
            "total": 1,
            "page": 1,
            "per_page": 20,
            "total_pages": 1
        }"#;

        let parsed: BookListResponse = serde_json::from_str(raw).expect("valid envelope");
        assert_eq!(parsed.books.len(), 1);
        assert_eq!(parsed.books[0].title, "Dune");
        assert!(parsed.books[0].publisher.is_none());
        assert_eq!(parsed.meta.total_pages, 1);
    }

    #[test]
    fn update_request_omits_untouched_fields() {
        let request = UpdateBookRequest {
            title: Some("Dune Messiah".into()),
            ..Default::default()
        };
        let json = serde_json::to_value(&request).expect("serializes");
        assert_eq!(json, serde_json::json!({ "title": "Dune Messiah" }));
        assert!(!request.is_empty());
        assert!(UpdateBookRequest::default().is_empty());
    }
}

//! Request fingerprints.
//!
//! A `Fingerprint` identifies one read request against the remote API. Every
//! parameter is normalized when the key is built, so structural equality is the
//! only admission rule for cache reuse and request deduplication.

use std::fmt;

use marginalia_api_types::NoteType;

use crate::domain::types::EntityKind;

pub const DEFAULT_PAGE_SIZE: u32 = 20;
pub const MAX_PAGE_SIZE: u32 = 100;
pub const DEFAULT_POPULAR_LIMIT: u32 = 10;
pub const MAX_POPULAR_LIMIT: u32 = 50;

/// Normalized list parameters.
///
/// Absent values use a canonical default: page 1, twenty items per page, and no
/// search, type or book filter. An empty search string counts as absent.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ListQuery {
    page: u32,
    per_page: u32,
    search: Option<String>,
    note_type: Option<NoteType>,
    book_id: Option<i64>,
}

impl Default for ListQuery {
    fn default() -> Self {
        Self {
            page: 1,
            per_page: DEFAULT_PAGE_SIZE,
            search: None,
            note_type: None,
            book_id: None,
        }
    }
}

impl ListQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page(mut self, page: u32) -> Self {
        self.page = page.max(1);
        self
    }

    pub fn with_per_page(mut self, per_page: u32) -> Self {
        self.per_page = per_page.clamp(1, MAX_PAGE_SIZE);
        self
    }

    pub fn with_search(mut self, search: Option<String>) -> Self {
        self.search = search.filter(|term| !term.is_empty());
        self
    }

    pub fn with_note_type(mut self, note_type: Option<NoteType>) -> Self {
        self.note_type = note_type;
        self
    }

    pub fn with_book(mut self, book_id: Option<i64>) -> Self {
        self.book_id = book_id;
        self
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn per_page(&self) -> u32 {
        self.per_page
    }

    pub fn search(&self) -> Option<&str> {
        self.search.as_deref()
    }

    pub fn note_type(&self) -> Option<NoteType> {
        self.note_type
    }

    pub fn book_id(&self) -> Option<i64> {
        self.book_id
    }

    /// Query-string pairs in wire order. Unset filters are omitted.
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![
            ("page", self.page.to_string()),
            ("per_page", self.per_page.to_string()),
        ];
        if let Some(search) = &self.search {
            pairs.push(("search", search.clone()));
        }
        if let Some(note_type) = self.note_type {
            pairs.push(("note_type", note_type.as_str().to_string()));
        }
        if let Some(book_id) = self.book_id {
            pairs.push(("book_id", book_id.to_string()));
        }
        pairs
    }
}

impl fmt::Display for ListQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rendered: Vec<String> = self
            .query_pairs()
            .into_iter()
            .map(|(key, value)| format!("{key}={value}"))
            .collect();
        f.write_str(&rendered.join("&"))
    }
}

/// Identity of a cached read.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Fingerprint {
    BookList(ListQuery),
    Book(i64),
    /// Notes attached to one book (`books/{id}/notes`).
    BookNotes { book_id: i64, query: ListQuery },
    NoteList(ListQuery),
    Note(i64),
    TagList(ListQuery),
    PopularTags { limit: u32 },
    Tag(i64),
}

impl Fingerprint {
    pub fn popular_tags(limit: Option<u32>) -> Self {
        let limit = limit
            .unwrap_or(DEFAULT_POPULAR_LIMIT)
            .clamp(1, MAX_POPULAR_LIMIT);
        Self::PopularTags { limit }
    }

    pub fn kind(&self) -> EntityKind {
        match self {
            Self::BookList(_) | Self::Book(_) => EntityKind::Book,
            Self::BookNotes { .. } | Self::NoteList(_) | Self::Note(_) => EntityKind::Note,
            Self::TagList(_) | Self::PopularTags { .. } | Self::Tag(_) => EntityKind::Tag,
        }
    }

    pub fn is_list(&self) -> bool {
        !matches!(self, Self::Book(_) | Self::Note(_) | Self::Tag(_))
    }

    pub fn list_query(&self) -> Option<&ListQuery> {
        match self {
            Self::BookList(query)
            | Self::NoteList(query)
            | Self::TagList(query)
            | Self::BookNotes { query, .. } => Some(query),
            _ => None,
        }
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BookList(query) => write!(f, "books?{query}"),
            Self::Book(id) => write!(f, "books/{id}"),
            Self::BookNotes { book_id, query } => write!(f, "books/{book_id}/notes?{query}"),
            Self::NoteList(query) => write!(f, "notes?{query}"),
            Self::Note(id) => write!(f, "notes/{id}"),
            Self::TagList(query) => write!(f, "tags?{query}"),
            Self::PopularTags { limit } => write!(f, "tags/popular?limit={limit}"),
            Self::Tag(id) => write!(f, "tags/{id}"),
        }
    }
}

/// A class of fingerprints selected for invalidation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FingerprintPattern {
    /// Every book list, whatever its page or filters.
    AllBookLists,
    Book(i64),
    AllNoteLists,
    Note(i64),
    /// Every notes sub-list of one book.
    BookNotes(i64),
    /// Every notes sub-list of every book.
    AllBookNotes,
    /// Paged and popular tag lists.
    AllTagLists,
    Tag(i64),
}

impl FingerprintPattern {
    pub fn matches(&self, fingerprint: &Fingerprint) -> bool {
        match (self, fingerprint) {
            (Self::AllBookLists, Fingerprint::BookList(_)) => true,
            (Self::Book(id), Fingerprint::Book(other)) => id == other,
            (Self::AllNoteLists, Fingerprint::NoteList(_)) => true,
            (Self::Note(id), Fingerprint::Note(other)) => id == other,
            (Self::BookNotes(id), Fingerprint::BookNotes { book_id, .. }) => id == book_id,
            (Self::AllBookNotes, Fingerprint::BookNotes { .. }) => true,
            (Self::AllTagLists, Fingerprint::TagList(_) | Fingerprint::PopularTags { .. }) => true,
            (Self::Tag(id), Fingerprint::Tag(other)) => id == other,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_parameters_normalize_to_defaults() {
        let explicit = ListQuery::new()
            .with_page(1)
            .with_per_page(DEFAULT_PAGE_SIZE)
            .with_search(Some(String::new()))
            .with_note_type(None);

        assert_eq!(
            Fingerprint::BookList(explicit),
            Fingerprint::BookList(ListQuery::default())
        );
    }

    #[test]
    fn out_of_range_values_are_clamped() {
        let query = ListQuery::new().with_page(0).with_per_page(500);
        assert_eq!(query.page(), 1);
        assert_eq!(query.per_page(), MAX_PAGE_SIZE);

        assert_eq!(
            Fingerprint::popular_tags(Some(0)),
            Fingerprint::PopularTags { limit: 1 }
        );
        assert_eq!(
            Fingerprint::popular_tags(None),
            Fingerprint::PopularTags {
                limit: DEFAULT_POPULAR_LIMIT
            }
        );
    }

    #[test]
    fn differing_parameters_produce_distinct_fingerprints() {
        let plain = Fingerprint::NoteList(ListQuery::new());
        let searched = Fingerprint::NoteList(ListQuery::new().with_search(Some("dune".into())));
        let typed = Fingerprint::NoteList(ListQuery::new().with_note_type(Some(NoteType::Quote)));
        let books = Fingerprint::BookList(ListQuery::new());

        assert_ne!(plain, searched);
        assert_ne!(plain, typed);
        assert_ne!(plain, books);
    }

    #[test]
    fn query_pairs_skip_unset_filters() {
        let query = ListQuery::new()
            .with_page(2)
            .with_search(Some("stoic".into()))
            .with_book(Some(7));
        assert_eq!(
            query.query_pairs(),
            vec![
                ("page", "2".to_string()),
                ("per_page", "20".to_string()),
                ("search", "stoic".to_string()),
                ("book_id", "7".to_string()),
            ]
        );
    }

    #[test]
    fn patterns_select_only_their_family() {
        let book_list = Fingerprint::BookList(ListQuery::new().with_page(4));
        let book_seven = Fingerprint::Book(7);
        let notes_of_seven = Fingerprint::BookNotes {
            book_id: 7,
            query: ListQuery::new(),
        };
        let popular = Fingerprint::popular_tags(None);

        assert!(FingerprintPattern::AllBookLists.matches(&book_list));
        assert!(!FingerprintPattern::AllBookLists.matches(&book_seven));
        assert!(!FingerprintPattern::AllBookLists.matches(&notes_of_seven));
        assert!(FingerprintPattern::Book(7).matches(&book_seven));
        assert!(!FingerprintPattern::Book(8).matches(&book_seven));
        assert!(FingerprintPattern::BookNotes(7).matches(&notes_of_seven));
        assert!(!FingerprintPattern::BookNotes(8).matches(&notes_of_seven));
        assert!(FingerprintPattern::AllBookNotes.matches(&notes_of_seven));
        assert!(!FingerprintPattern::AllNoteLists.matches(&notes_of_seven));
        assert!(FingerprintPattern::AllTagLists.matches(&popular));
    }

    #[test]
    fn display_reads_like_a_request_path() {
        let fingerprint = Fingerprint::BookNotes {
            book_id: 3,
            query: ListQuery::new().with_note_type(Some(NoteType::Quote)),
        };
        assert_eq!(
            fingerprint.to_string(),
            "books/3/notes?page=1&per_page=20&note_type=quote"
        );
        assert_eq!(Fingerprint::Tag(5).to_string(), "tags/5");
        assert!(fingerprint.is_list());
        assert_eq!(fingerprint.kind(), EntityKind::Note);
    }
}

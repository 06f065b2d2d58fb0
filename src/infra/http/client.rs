use std::time::Duration;

use reqwest::{Client, Method, Response, Url};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::cache::{Fingerprint, ListQuery};
use crate::domain::entities::{
    Book, BookListResponse, CreateBookRequest, CreateNoteRequest, CreateTagRequest, Note,
    NoteListResponse, NoteTagsRequest, QueryData, Tag, TagListResponse, UpdateBookRequest,
    UpdateNoteRequest, UpdateTagRequest,
};

use super::ApiError;

/// Typed client for the reading-notes REST API.
#[derive(Clone, Debug)]
pub struct ApiClient {
    client: Client,
    base: Url,
}

impl ApiClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ApiError> {
        let mut base = Url::parse(base_url)?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        let client = Client::builder()
            .user_agent(Self::user_agent())
            .timeout(timeout)
            .build()?;
        Ok(Self { client, base })
    }

    pub fn user_agent() -> &'static str {
        concat!("marginalia/", env!("CARGO_PKG_VERSION"))
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    fn url(&self, path: &str, query: &[(&str, String)]) -> Result<Url, ApiError> {
        let mut url = self.base.join(path)?;
        if !query.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in query {
                pairs.append_pair(key, value);
            }
        }
        Ok(url)
    }

    async fn request<T, B>(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        body: Option<&B>,
    ) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let response = self.dispatch(method, path, query, body).await?;
        let bytes = response.bytes().await?;
        serde_json::from_slice(&bytes).map_err(|err| ApiError::decode(err.to_string()))
    }

    async fn request_unit(&self, method: Method, path: &str) -> Result<(), ApiError> {
        self.dispatch::<()>(method, path, &[], None).await?;
        Ok(())
    }

    async fn dispatch<B>(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        body: Option<&B>,
    ) -> Result<Response, ApiError>
    where
        B: Serialize + ?Sized,
    {
        let url = self.url(path, query)?;
        debug!(target: "marginalia::infra::http", %method, %url, "sending request");

        let mut request = self.client.request(method, url);
        if let Some(body) = body {
            request = request.json(body);
        }
        let response = request.send().await?;
        Self::check(response).await
    }

    async fn check(response: Response) -> Result<Response, ApiError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.bytes().await.unwrap_or_default();
        Err(ApiError::from_status(status, &body))
    }

    /// Execute the read identified by `fingerprint`.
    pub async fn fetch(&self, fingerprint: &Fingerprint) -> Result<QueryData, ApiError> {
        match fingerprint {
            Fingerprint::BookList(query) => self.list_books(query).await.map(QueryData::Books),
            Fingerprint::Book(id) => self.get_book(*id).await.map(QueryData::Book),
            Fingerprint::BookNotes { book_id, query } => self
                .list_book_notes(*book_id, query)
                .await
                .map(QueryData::Notes),
            Fingerprint::NoteList(query) => self.list_notes(query).await.map(QueryData::Notes),
            Fingerprint::Note(id) => self.get_note(*id).await.map(QueryData::Note),
            Fingerprint::TagList(query) => self.list_tags(query).await.map(QueryData::Tags),
            Fingerprint::PopularTags { limit } => self
                .popular_tags(*limit)
                .await
                .map(QueryData::PopularTags),
            Fingerprint::Tag(id) => self.get_tag(*id).await.map(QueryData::Tag),
        }
    }

    // ==== books ====

    pub async fn list_books(&self, query: &ListQuery) -> Result<BookListResponse, ApiError> {
        self.request::<_, ()>(Method::GET, "books", &query.query_pairs(), None)
            .await
    }

    pub async fn get_book(&self, id: i64) -> Result<Book, ApiError> {
        self.request::<_, ()>(Method::GET, &format!("books/{id}"), &[], None)
            .await
    }

    pub async fn create_book(&self, request: &CreateBookRequest) -> Result<Book, ApiError> {
        self.request(Method::POST, "books", &[], Some(request)).await
    }

    pub async fn update_book(
        &self,
        id: i64,
        request: &UpdateBookRequest,
    ) -> Result<Book, ApiError> {
        self.request(Method::PUT, &format!("books/{id}"), &[], Some(request))
            .await
    }

    pub async fn delete_book(&self, id: i64) -> Result<(), ApiError> {
        self.request_unit(Method::DELETE, &format!("books/{id}"))
            .await
    }

    pub async fn list_book_notes(
        &self,
        book_id: i64,
        query: &ListQuery,
    ) -> Result<NoteListResponse, ApiError> {
        self.request::<_, ()>(
            Method::GET,
            &format!("books/{book_id}/notes"),
            &query.query_pairs(),
            None,
        )
        .await
    }

    // ==== notes ====

    pub async fn list_notes(&self, query: &ListQuery) -> Result<NoteListResponse, ApiError> {
        self.request::<_, ()>(Method::GET, "notes", &query.query_pairs(), None)
            .await
    }

    pub async fn get_note(&self, id: i64) -> Result<Note, ApiError> {
        self.request::<_, ()>(Method::GET, &format!("notes/{id}"), &[], None)
            .await
    }

    pub async fn create_note(&self, request: &CreateNoteRequest) -> Result<Note, ApiError> {
        self.request(Method::POST, "notes", &[], Some(request)).await
    }

    pub async fn update_note(
        &self,
        id: i64,
        request: &UpdateNoteRequest,
    ) -> Result<Note, ApiError> {
        self.request(Method::PUT, &format!("notes/{id}"), &[], Some(request))
            .await
    }

    pub async fn update_note_tags(&self, id: i64, tags: &[String]) -> Result<Note, ApiError> {
        let body = NoteTagsRequest {
            tags: tags.to_vec(),
        };
        self.request(Method::PUT, &format!("notes/{id}/tags"), &[], Some(&body))
            .await
    }

    pub async fn delete_note(&self, id: i64) -> Result<(), ApiError> {
        self.request_unit(Method::DELETE, &format!("notes/{id}"))
            .await
    }

    // ==== tags ====

    pub async fn list_tags(&self, query: &ListQuery) -> Result<TagListResponse, ApiError> {
        self.request::<_, ()>(Method::GET, "tags", &query.query_pairs(), None)
            .await
    }

    pub async fn popular_tags(&self, limit: u32) -> Result<Vec<Tag>, ApiError> {
        self.request::<_, ()>(
            Method::GET,
            "tags/popular",
            &[("limit", limit.to_string())],
            None,
        )
        .await
    }

    pub async fn get_tag(&self, id: i64) -> Result<Tag, ApiError> {
        self.request::<_, ()>(Method::GET, &format!("tags/{id}"), &[], None)
            .await
    }

    pub async fn create_tag(&self, request: &CreateTagRequest) -> Result<Tag, ApiError> {
        self.request(Method::POST, "tags", &[], Some(request)).await
    }

    pub async fn update_tag(&self, id: i64, request: &UpdateTagRequest) -> Result<Tag, ApiError> {
        self.request(Method::PUT, &format!("tags/{id}"), &[], Some(request))
            .await
    }

    pub async fn delete_tag(&self, id: i64) -> Result<(), ApiError> {
        self.request_unit(Method::DELETE, &format!("tags/{id}"))
            .await
    }
}

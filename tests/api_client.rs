use std::time::Duration;

use httpmock::MockServer;
use marginalia::cache::{Fingerprint, ListQuery};
use marginalia::domain::entities::{NoteType, QueryData, UpdateTagRequest};
use marginalia::infra::http::{ApiClient, ApiError};

fn client(server: &MockServer) -> ApiClient {
    ApiClient::new(&server.url("/api"), Duration::from_secs(5)).expect("client")
}

#[tokio::test]
async fn note_list_sends_every_filter() -> Result<(), ApiError> {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method("GET")
            .path("/api/notes")
            .query_param("page", "2")
            .query_param("per_page", "10")
            .query_param("search", "stoic virtue")
            .query_param("note_type", "quote")
            .query_param("book_id", "4");
        then.status(200)
            .header("content-type", "application/json")
            .body(r#"{"notes":[],"total":12,"page":2,"per_page":10,"total_pages":2}"#);
    });

    let query = ListQuery::new()
        .with_page(2)
        .with_per_page(10)
        .with_search(Some("stoic virtue".into()))
        .with_note_type(Some(NoteType::Quote))
        .with_book(Some(4));
    let data = client(&server).fetch(&Fingerprint::NoteList(query)).await?;

    mock.assert();
    let meta = data.page_meta().expect("list payload");
    assert_eq!(meta.total, 12);
    assert_eq!(meta.total_pages, 2);
    Ok(())
}

#[tokio::test]
async fn book_notes_use_the_nested_route() -> Result<(), ApiError> {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method("GET")
            .path("/api/books/7/notes")
            .query_param("page", "1");
        then.status(200)
            .header("content-type", "application/json")
            .body(r#"{"notes":[],"total":0,"page":1,"per_page":20,"total_pages":0}"#);
    });

    let fingerprint = Fingerprint::BookNotes {
        book_id: 7,
        query: ListQuery::new(),
    };
    let data = client(&server).fetch(&fingerprint).await?;
    mock.assert();
    assert_eq!(data.item_count(), 0);
    Ok(())
}

#[tokio::test]
async fn popular_tags_decode_a_bare_array() -> Result<(), ApiError> {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method("GET")
            .path("/api/tags/popular")
            .query_param("limit", "10");
        then.status(200)
            .header("content-type", "application/json")
            .body(r#"[{"id":1,"name":"Stoicism","slug":"stoicism","usage_count":9,"created_at":"2024-01-01T00:00:00Z"}]"#);
    });

    let data = client(&server)
        .fetch(&Fingerprint::popular_tags(None))
        .await?;
    let QueryData::PopularTags(tags) = data else {
        panic!("expected popular tags, got {data:?}");
    };
    assert_eq!(tags.len(), 1);
    assert_eq!(tags[0].slug, "stoicism");
    assert_eq!(tags[0].updated_at, None);
    Ok(())
}

#[tokio::test]
async fn tag_update_sends_json_body() -> Result<(), ApiError> {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method("PUT")
            .path("/api/tags/3")
            .json_body_includes(r#"{"name":"Essays"}"#);
        then.status(200)
            .header("content-type", "application/json")
            .body(r#"{"id":3,"name":"Essays","slug":"essays","created_at":"2024-01-01T00:00:00Z","updated_at":"2024-02-01T00:00:00Z"}"#);
    });

    let tag = client(&server)
        .update_tag(
            3,
            &UpdateTagRequest {
                name: Some("Essays".into()),
            },
        )
        .await?;
    mock.assert();
    assert_eq!(tag.name, "Essays");
    Ok(())
}

#[tokio::test]
async fn error_statuses_are_classified() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method("GET").path("/api/books/404");
        then.status(404)
            .header("content-type", "application/json")
            .body(r#"{"error":"not_found","message":"Book not found"}"#);
    });
    server.mock(|when, then| {
        when.method("DELETE").path("/api/notes/5");
        then.status(502).body("");
    });

    let api = client(&server);
    let missing = api.get_book(404).await.expect_err("missing book");
    assert!(missing.is_not_found());
    assert_eq!(
        missing,
        ApiError::Client {
            status: 404,
            message: "Book not found".into()
        }
    );

    let failed = api.delete_note(5).await.expect_err("bad gateway");
    assert_eq!(failed.status(), Some(502));
    assert!(matches!(failed, ApiError::Server { ref message, .. } if message == "Bad Gateway"));
}

#[tokio::test]
async fn malformed_bodies_are_decode_errors() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method("GET").path("/api/tags/1");
        then.status(200)
            .header("content-type", "application/json")
            .body(r#"{"id":"one"}"#);
    });

    let err = client(&server).get_tag(1).await.expect_err("bad body");
    assert!(matches!(err, ApiError::Decode { .. }));
}

#[tokio::test]
async fn unreachable_server_is_a_network_error() {
    let api = ApiClient::new("http://127.0.0.1:9/api", Duration::from_secs(2)).expect("client");
    let err = api.list_tags(&ListQuery::new()).await.expect_err("refused");
    assert!(matches!(err, ApiError::Network { .. }));
}

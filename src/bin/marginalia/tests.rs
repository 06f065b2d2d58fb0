#![deny(clippy::all, clippy::pedantic)]

use std::time::Duration;

use httpmock::MockServer;
use serde_json::Value;
use tracing::level_filters::LevelFilter;
use url::Url;

use marginalia::application::error::AppError;
use marginalia::application::pagination::EmptyPagePolicy;
use marginalia::config::{
    ApiSettings, BookUpdateArgs, BooksCmd, BrowseArgs, BrowseTarget, CacheSettings, ListArgs,
    LogFormat, LoggingSettings, NoteCreateArgs, NoteListArgs, NotesCmd, PaginationSettings,
    SearchSettings, Settings, TagsCmd,
};
use marginalia::domain::entities::NoteType;
use marginalia::infra::http::ApiError;

use crate::context::Ctx;
use crate::handlers::{books, browse, notes, tags};

fn settings(server: &MockServer) -> Settings {
    Settings {
        api: ApiSettings {
            base_url: Url::parse(&server.base_url()).expect("mock url"),
            timeout: Duration::from_secs(5),
        },
        cache: CacheSettings {
            stale_time: Duration::from_secs(300),
            retry_count: 0,
            retry_delay: Duration::ZERO,
            gc_time: Duration::from_secs(300),
        },
        search: SearchSettings {
            debounce: Duration::from_millis(10),
        },
        pagination: PaginationSettings {
            per_page: 20,
            empty_page_policy: EmptyPagePolicy::Freeze,
        },
        logging: LoggingSettings {
            level: LevelFilter::OFF,
            format: LogFormat::Compact,
        },
    }
}

fn ctx(server: &MockServer) -> Ctx {
    Ctx::new(settings(server)).expect("ctx")
}

fn book_list(page: u32) -> String {
    format!(
        r#"{{"books":[{{"id":{page},"title":"Dune","author":"Frank Herbert","created_at":"2024-03-01T10:00:00Z","updated_at":"2024-03-01T10:00:00Z"}}],"total":25,"page":{page},"per_page":20,"total_pages":2}}"#
    )
}

const NOTE_LIST: &str = r#"{"notes":[],"total":0,"page":1,"per_page":20,"total_pages":0}"#;

const NOTE: &str = r#"{"id":41,"book_id":7,"note_type":"quote","content":"Fear is the mind-killer.","is_favorite":false,"tags":[],"created_at":"2024-03-03T10:00:00Z","updated_at":"2024-03-03T10:00:00Z"}"#;

fn documents(output: &[u8]) -> Vec<Value> {
    serde_json::Deserializer::from_slice(output)
        .into_iter::<Value>()
        .collect::<Result<_, _>>()
        .expect("json documents")
}

#[tokio::test]
async fn books_list_is_served_from_cache_on_repeat() -> Result<(), AppError> {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method("GET")
            .path("/books")
            .query_param("page", "1")
            .query_param("per_page", "20")
            .query_param("search", "dune");
        then.status(200)
            .header("content-type", "application/json")
            .body(book_list(1));
    });

    let ctx = ctx(&server);
    let args = ListArgs {
        page: None,
        search: Some("dune".into()),
    };
    books::handle(&ctx, BooksCmd::List(args.clone())).await?;
    books::handle(&ctx, BooksCmd::List(args)).await?;
    mock.assert_hits(1);
    Ok(())
}

#[tokio::test]
async fn note_create_invalidates_note_lists() -> Result<(), AppError> {
    let server = MockServer::start();
    let list = server.mock(|when, then| {
        when.method("GET").path("/notes");
        then.status(200)
            .header("content-type", "application/json")
            .body(NOTE_LIST);
    });
    let create = server.mock(|when, then| {
        when.method("POST")
            .path("/notes")
            .json_body_includes(r#"{"book_id":7,"note_type":"quote","content":"Fear is the mind-killer."}"#);
        then.status(201)
            .header("content-type", "application/json")
            .body(NOTE);
    });

    let ctx = ctx(&server);
    let list_cmd = || {
        NotesCmd::List(NoteListArgs {
            list: ListArgs::default(),
            note_type: None,
            book_id: None,
        })
    };
    notes::handle(&ctx, list_cmd()).await?;
    notes::handle(
        &ctx,
        NotesCmd::Create(NoteCreateArgs {
            content: "Fear is the mind-killer.".into(),
            book_id: Some(7),
            note_type: NoteType::Quote,
            title: None,
            page_reference: None,
            favorite: false,
            tags: Vec::new(),
        }),
    )
    .await?;
    notes::handle(&ctx, list_cmd()).await?;

    create.assert();
    list.assert_hits(2);
    Ok(())
}

#[tokio::test]
async fn popular_tags_send_limit() -> Result<(), AppError> {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method("GET")
            .path("/tags/popular")
            .query_param("limit", "5");
        then.status(200)
            .header("content-type", "application/json")
            .body("[]");
    });

    let ctx = ctx(&server);
    tags::handle(&ctx, TagsCmd::Popular { limit: Some(5) }).await?;
    mock.assert();
    Ok(())
}

#[tokio::test]
async fn empty_book_update_is_rejected_before_the_network() {
    let server = MockServer::start();
    let ctx = ctx(&server);
    let err = books::handle(
        &ctx,
        BooksCmd::Update(BookUpdateArgs {
            id: 3,
            title: None,
            author: None,
            isbn: None,
            publisher: None,
            page_count: None,
            description: None,
        }),
    )
    .await
    .expect_err("nothing to update");
    assert!(matches!(err, AppError::Validation(_)));
    assert_eq!(err.exit_code(), 2);
}

#[tokio::test]
async fn missing_book_maps_to_client_error() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method("GET").path("/books/99");
        then.status(404)
            .header("content-type", "application/json")
            .body(r#"{"error":"not_found","message":"Book not found"}"#);
    });

    let ctx = ctx(&server);
    let err = books::handle(&ctx, BooksCmd::Show { id: 99 })
        .await
        .expect_err("missing book");
    mock.assert();
    assert!(matches!(
        err,
        AppError::Api(ApiError::Client { status: 404, ref message }) if message == "Book not found"
    ));
    assert_eq!(err.exit_code(), 2);
}

#[tokio::test]
async fn browse_pages_and_quits() -> Result<(), AppError> {
    let server = MockServer::start();
    let first = server.mock(|when, then| {
        when.method("GET").path("/books").query_param("page", "1");
        then.status(200)
            .header("content-type", "application/json")
            .body(book_list(1));
    });
    let second = server.mock(|when, then| {
        when.method("GET").path("/books").query_param("page", "2");
        then.status(200)
            .header("content-type", "application/json")
            .body(book_list(2));
    });

    let ctx = ctx(&server);
    let args = BrowseArgs {
        target: BrowseTarget::Books,
        book_id: None,
    };
    let mut out = Vec::new();
    browse::run(&ctx, &args, &b":page 2\n:page 1\n:quit\n"[..], &mut out).await?;

    first.assert_hits(1);
    second.assert_hits(1);
    let pages: Vec<u64> = documents(&out)
        .iter()
        .filter_map(|doc| doc["page"].as_u64())
        .collect();
    assert_eq!(pages, vec![1, 2, 1]);
    Ok(())
}

#[tokio::test]
async fn browse_commits_pending_search_at_end_of_input() -> Result<(), AppError> {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method("GET").path("/books");
        then.status(200)
            .header("content-type", "application/json")
            .body(book_list(1));
    });

    let ctx = ctx(&server);
    let args = BrowseArgs {
        target: BrowseTarget::Books,
        book_id: None,
    };
    let mut out = Vec::new();
    browse::run(&ctx, &args, &b"du\ndune\n"[..], &mut out).await?;

    mock.assert_hits(2);
    let docs = documents(&out);
    assert_eq!(docs.len(), 2);
    assert_eq!(docs[0]["search"], Value::Null);
    assert_eq!(docs[1]["search"], "dune");
    assert_eq!(docs[1]["list"], "books?page=1&per_page=20&search=dune");
    Ok(())
}

#[tokio::test]
async fn browse_reports_read_failures_inline() -> Result<(), AppError> {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method("GET").path("/notes");
        then.status(500).body("database unavailable");
    });

    let ctx = ctx(&server);
    let args = BrowseArgs {
        target: BrowseTarget::Notes,
        book_id: None,
    };
    let mut out = Vec::new();
    browse::run(&ctx, &args, &b":type poem\n:quit\n"[..], &mut out).await?;

    mock.assert_hits(1);
    let text = String::from_utf8(out).expect("utf8 output");
    assert!(text.contains("error: server failed with status 500: database unavailable"));
    assert!(text.contains("error: invalid input"));
    Ok(())
}

use std::io::Write;

use clap::Parser;

use super::*;

#[test]
fn defaults_resolve_without_any_source() {
    let settings = Settings::from_raw(RawSettings::default()).expect("valid settings");

    assert_eq!(settings.api.base_url.as_str(), "http://localhost:8080/api");
    assert_eq!(settings.api.timeout, Duration::from_secs(10));
    assert_eq!(settings.cache.stale_time, Duration::from_secs(300));
    assert_eq!(settings.cache.retry_count, 1);
    assert_eq!(settings.cache.retry_delay, Duration::from_secs(1));
    assert_eq!(settings.search.debounce, Duration::from_millis(300));
    assert_eq!(settings.pagination.per_page, 20);
    assert_eq!(
        settings.pagination.empty_page_policy,
        EmptyPagePolicy::Freeze
    );
    assert!(matches!(settings.logging.format, LogFormat::Compact));
}

#[test]
fn cli_overrides_take_highest_precedence() {
    let mut raw = RawSettings::default();
    raw.pagination.per_page = Some(50);
    raw.logging.level = Some("info".to_string());

    let overrides = GlobalOverrides {
        per_page: Some(10),
        log_level: Some("debug".to_string()),
        ..Default::default()
    };

    raw.apply_overrides(&overrides);
    let settings = Settings::from_raw(raw).expect("valid settings");

    assert_eq!(settings.pagination.per_page, 10);
    assert_eq!(settings.logging.level, LevelFilter::DEBUG);
}

#[test]
fn cli_json_logging_enforces_format() {
    let mut raw = RawSettings::default();
    let overrides = GlobalOverrides {
        log_json: Some(true),
        ..Default::default()
    };

    raw.apply_overrides(&overrides);
    let settings = Settings::from_raw(raw).expect("valid settings");

    assert!(matches!(settings.logging.format, LogFormat::Json));
}

#[test]
fn invalid_values_name_their_key() {
    let mut raw = RawSettings::default();
    raw.pagination.per_page = Some(500);
    let err = Settings::from_raw(raw).expect_err("per_page too large");
    assert!(matches!(
        err,
        LoadError::Invalid {
            key: "pagination.per_page",
            ..
        }
    ));

    let mut raw = RawSettings::default();
    raw.api.base_url = Some("ftp://books.example".to_string());
    let err = Settings::from_raw(raw).expect_err("unsupported scheme");
    assert!(matches!(err, LoadError::Invalid { key: "api.base_url", .. }));

    let mut raw = RawSettings::default();
    raw.pagination.empty_page_policy = Some("rewind".to_string());
    let err = Settings::from_raw(raw).expect_err("unknown policy");
    assert!(matches!(
        err,
        LoadError::Invalid {
            key: "pagination.empty_page_policy",
            ..
        }
    ));
}

#[test]
fn config_file_layers_under_cli_flags() {
    let mut file = tempfile::Builder::new()
        .suffix(".toml")
        .tempfile()
        .expect("temp config file");
    writeln!(
        file,
        "[api]\nbase_url = \"http://books.example/api\"\n\n[pagination]\nper_page = 50\nempty_page_policy = \"step_back\"\n\n[search]\ndebounce_ms = 450"
    )
    .expect("write config");

    let path = file.path().to_string_lossy().into_owned();
    let cli = CliArgs::parse_from([
        "marginalia",
        "--config-file",
        path.as_str(),
        "--per-page",
        "10",
        "books",
        "list",
    ]);
    let settings = load(&cli).expect("settings load");

    assert_eq!(settings.api.base_url.as_str(), "http://books.example/api");
    assert_eq!(settings.pagination.per_page, 10);
    assert_eq!(
        settings.pagination.empty_page_policy,
        EmptyPagePolicy::StepBack
    );
    assert_eq!(settings.search.debounce, Duration::from_millis(450));
}

#[test]
fn missing_explicit_config_file_is_an_error() {
    let cli = CliArgs::parse_from([
        "marginalia",
        "--config-file",
        "/nonexistent/marginalia-settings.toml",
        "tags",
        "popular",
    ]);
    assert!(matches!(load(&cli), Err(LoadError::Build(_))));
}

#[test]
fn parse_note_create_arguments() {
    let args = CliArgs::parse_from([
        "marginalia",
        "notes",
        "create",
        "--content",
        "The map is not the territory.",
        "--book",
        "7",
        "--type",
        "quote",
        "--tag",
        "semantics",
        "--tag",
        "maps",
        "--favorite",
    ]);

    match args.command {
        Command::Notes(NotesCmd::Create(create)) => {
            assert_eq!(create.book_id, Some(7));
            assert_eq!(create.note_type, crate::domain::entities::NoteType::Quote);
            assert_eq!(create.tags, vec!["semantics".to_string(), "maps".to_string()]);
            assert!(create.favorite);
        }
        other => panic!("wrong command parsed: {other:?}"),
    }
}

#[test]
fn global_overrides_follow_the_subcommand() {
    let args = CliArgs::parse_from([
        "marginalia",
        "browse",
        "notes",
        "--book",
        "3",
        "--debounce-ms",
        "120",
    ]);

    assert_eq!(args.overrides.debounce_ms, Some(120));
    match args.command {
        Command::Browse(browse) => {
            assert_eq!(browse.target, BrowseTarget::Notes);
            assert_eq!(browse.book_id, Some(3));
        }
        other => panic!("wrong command parsed: {other:?}"),
    }
}

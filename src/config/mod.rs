//! Configuration layer: typed settings with layered precedence (file → env → CLI).

use std::{str::FromStr, time::Duration};

use clap::Parser;
use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;
use tracing::level_filters::LevelFilter;
use url::Url;

use crate::application::pagination::EmptyPagePolicy;
use crate::cache::MAX_PAGE_SIZE;

mod cli;

pub use cli::{
    BookCreateArgs, BookNotesArgs, BookUpdateArgs, BooksCmd, BrowseArgs, BrowseTarget, CliArgs,
    Command, GlobalOverrides, ListArgs, NoteCreateArgs, NoteListArgs, NoteTagsArgs,
    NoteUpdateArgs, NotesCmd, TagsCmd,
};

const DEFAULT_CONFIG_BASENAME: &str = "config/default";
const LOCAL_CONFIG_BASENAME: &str = "marginalia";
const DEFAULT_API_BASE_URL: &str = "http://localhost:8080/api";
const DEFAULT_TIMEOUT_SECS: u64 = 10;
const DEFAULT_STALE_SECS: u64 = 300;
const DEFAULT_RETRY_COUNT: u32 = 1;
const DEFAULT_RETRY_DELAY_MS: u64 = 1000;
const DEFAULT_GC_SECS: u64 = 300;
const DEFAULT_DEBOUNCE_MS: u64 = 300;
const DEFAULT_PER_PAGE: u32 = 20;
const MAX_RETRY_COUNT: u32 = 10;

/// Fully-resolved client settings after precedence resolution and validation.
#[derive(Debug, Clone)]
pub struct Settings {
    pub api: ApiSettings,
    pub cache: CacheSettings,
    pub search: SearchSettings,
    pub pagination: PaginationSettings,
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone)]
pub struct ApiSettings {
    pub base_url: Url,
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct CacheSettings {
    pub stale_time: Duration,
    pub retry_count: u32,
    pub retry_delay: Duration,
    pub gc_time: Duration,
}

#[derive(Debug, Clone)]
pub struct SearchSettings {
    pub debounce: Duration,
}

#[derive(Debug, Clone)]
pub struct PaginationSettings {
    pub per_page: u32,
    pub empty_page_policy: EmptyPagePolicy,
}

#[derive(Debug, Clone)]
pub struct LoggingSettings {
    pub level: LevelFilter,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy)]
pub enum LogFormat {
    Json,
    Compact,
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to build configuration: {0}")]
    Build(#[from] config::ConfigError),
    #[error("invalid configuration for `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}

impl LoadError {
    fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            reason: reason.into(),
        }
    }
}

/// Load settings using the configured precedence (file → environment → CLI).
pub fn load(cli: &CliArgs) -> Result<Settings, LoadError> {
    let mut builder = Config::builder()
        .add_source(File::with_name(DEFAULT_CONFIG_BASENAME).required(false))
        .add_source(File::with_name(LOCAL_CONFIG_BASENAME).required(false));

    if let Some(path) = cli.config_file.as_ref() {
        builder = builder.add_source(File::from(path.as_path()).required(true));
    }

    builder = builder.add_source(Environment::with_prefix("MARGINALIA").separator("__"));

    let mut raw: RawSettings = builder.build()?.try_deserialize()?;
    raw.apply_overrides(&cli.overrides);
    Settings::from_raw(raw)
}

pub fn load_with_cli() -> Result<(CliArgs, Settings), LoadError> {
    let cli = CliArgs::parse();
    let settings = load(&cli)?;
    Ok((cli, settings))
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSettings {
    api: RawApiSettings,
    cache: RawCacheSettings,
    search: RawSearchSettings,
    pagination: RawPaginationSettings,
    logging: RawLoggingSettings,
}

impl RawSettings {
    fn apply_overrides(&mut self, overrides: &GlobalOverrides) {
        if let Some(url) = overrides.api_url.as_ref() {
            self.api.base_url = Some(url.clone());
        }
        if let Some(seconds) = overrides.timeout_seconds {
            self.api.timeout_seconds = Some(seconds);
        }
        if let Some(level) = overrides.log_level.as_ref() {
            self.logging.level = Some(level.clone());
        }
        if let Some(json) = overrides.log_json {
            self.logging.json = Some(json);
        }
        if let Some(per_page) = overrides.per_page {
            self.pagination.per_page = Some(per_page);
        }
        if let Some(policy) = overrides.empty_page_policy.as_ref() {
            self.pagination.empty_page_policy = Some(policy.clone());
        }
        if let Some(millis) = overrides.debounce_ms {
            self.search.debounce_ms = Some(millis);
        }
        if let Some(seconds) = overrides.stale_seconds {
            self.cache.stale_seconds = Some(seconds);
        }
    }
}

impl Settings {
    fn from_raw(raw: RawSettings) -> Result<Self, LoadError> {
        let RawSettings {
            api,
            cache,
            search,
            pagination,
            logging,
        } = raw;

        let api = build_api_settings(api)?;
        let cache = build_cache_settings(cache)?;
        let search = build_search_settings(search);
        let pagination = build_pagination_settings(pagination)?;
        let logging = build_logging_settings(logging)?;

        Ok(Self {
            api,
            cache,
            search,
            pagination,
            logging,
        })
    }
}

fn build_api_settings(api: RawApiSettings) -> Result<ApiSettings, LoadError> {
    let raw_url = api
        .base_url
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string());
    let base_url = Url::parse(&raw_url)
        .map_err(|err| LoadError::invalid("api.base_url", format!("failed to parse: {err}")))?;
    if !matches!(base_url.scheme(), "http" | "https") {
        return Err(LoadError::invalid(
            "api.base_url",
            format!("unsupported scheme `{}`", base_url.scheme()),
        ));
    }

    let timeout_secs = api.timeout_seconds.unwrap_or(DEFAULT_TIMEOUT_SECS);
    if timeout_secs == 0 {
        return Err(LoadError::invalid(
            "api.timeout_seconds",
            "must be greater than zero",
        ));
    }

    Ok(ApiSettings {
        base_url,
        timeout: Duration::from_secs(timeout_secs),
    })
}

fn build_cache_settings(cache: RawCacheSettings) -> Result<CacheSettings, LoadError> {
    let retry_count = cache.retry_count.unwrap_or(DEFAULT_RETRY_COUNT);
    if retry_count > MAX_RETRY_COUNT {
        return Err(LoadError::invalid(
            "cache.retry_count",
            format!("must not exceed {MAX_RETRY_COUNT}"),
        ));
    }

    let gc_secs = cache.gc_seconds.unwrap_or(DEFAULT_GC_SECS);
    if gc_secs == 0 {
        return Err(LoadError::invalid(
            "cache.gc_seconds",
            "must be greater than zero",
        ));
    }

    Ok(CacheSettings {
        stale_time: Duration::from_secs(cache.stale_seconds.unwrap_or(DEFAULT_STALE_SECS)),
        retry_count,
        retry_delay: Duration::from_millis(
            cache.retry_delay_ms.unwrap_or(DEFAULT_RETRY_DELAY_MS),
        ),
        gc_time: Duration::from_secs(gc_secs),
    })
}

fn build_search_settings(search: RawSearchSettings) -> SearchSettings {
    SearchSettings {
        debounce: Duration::from_millis(search.debounce_ms.unwrap_or(DEFAULT_DEBOUNCE_MS)),
    }
}

fn build_pagination_settings(
    pagination: RawPaginationSettings,
) -> Result<PaginationSettings, LoadError> {
    let per_page = pagination.per_page.unwrap_or(DEFAULT_PER_PAGE);
    if per_page == 0 || per_page > MAX_PAGE_SIZE {
        return Err(LoadError::invalid(
            "pagination.per_page",
            format!("must be between 1 and {MAX_PAGE_SIZE}"),
        ));
    }

    let empty_page_policy = match pagination.empty_page_policy {
        Some(value) => EmptyPagePolicy::from_str(&value)
            .map_err(|err| LoadError::invalid("pagination.empty_page_policy", err.to_string()))?,
        None => EmptyPagePolicy::default(),
    };

    Ok(PaginationSettings {
        per_page,
        empty_page_policy,
    })
}

fn build_logging_settings(logging: RawLoggingSettings) -> Result<LoggingSettings, LoadError> {
    let level = match logging.level {
        Some(level) => LevelFilter::from_str(level.as_str()).map_err(|err| {
            LoadError::invalid("logging.level", format!("failed to parse: {err}"))
        })?,
        None => LevelFilter::WARN,
    };

    let format = if logging.json.unwrap_or(false) {
        LogFormat::Json
    } else {
        LogFormat::Compact
    };

    Ok(LoggingSettings { level, format })
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawApiSettings {
    base_url: Option<String>,
    timeout_seconds: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawCacheSettings {
    stale_seconds: Option<u64>,
    retry_count: Option<u32>,
    retry_delay_ms: Option<u64>,
    gc_seconds: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSearchSettings {
    debounce_ms: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawPaginationSettings {
    per_page: Option<u32>,
    empty_page_policy: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawLoggingSettings {
    level: Option<String>,
    json: Option<bool>,
}

#[cfg(test)]
mod tests;

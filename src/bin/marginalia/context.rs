use marginalia::application::error::AppError;
use marginalia::application::sync::ReadingSync;
use marginalia::cache::{CacheConfig, ListQuery};
use marginalia::config::{ListArgs, Settings};
use marginalia::infra::http::ApiClient;

/// Shared state for one command invocation.
#[derive(Clone)]
pub struct Ctx {
    pub sync: ReadingSync,
    pub settings: Settings,
}

impl Ctx {
    pub fn new(settings: Settings) -> Result<Self, AppError> {
        let api = ApiClient::new(settings.api.base_url.as_str(), settings.api.timeout)?;
        let sync = ReadingSync::new(api, CacheConfig::from(&settings.cache));
        Ok(Self { sync, settings })
    }

    /// Page query for a one-shot list command.
    pub fn list_query(&self, args: &ListArgs) -> ListQuery {
        ListQuery::new()
            .with_page(args.page.unwrap_or(1))
            .with_per_page(self.settings.pagination.per_page)
            .with_search(args.search.clone())
    }
}

use serde::{Deserialize, Serialize};

/// Paging block shared by every list envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageMeta {
    pub total: u64,
    pub page: u32,
    pub per_page: u32,
    pub total_pages: u32,
}

impl PageMeta {
    /// True when the reported page lies past the last page holding items.
    pub fn is_past_end(&self) -> bool {
        self.page > self.total_pages.max(1)
    }
}

/// Error payload returned by the API for non-success statuses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiErrorBody {
    pub error: String,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_past_end_accounts_for_empty_sets() {
        let meta = PageMeta {
            total: 0,
            page: 1,
            per_page: 20,
            total_pages: 0,
        };
        assert!(!meta.is_past_end());

        let meta = PageMeta {
            total: 40,
            page: 3,
            per_page: 20,
            total_pages: 2,
        };
        assert!(meta.is_past_end());
    }
}

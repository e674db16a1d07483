use once_cell::sync::Lazy;
use std::env;

pub static CONTENT_ROOT: Lazy<String> = Lazy::new(|| {
    env::var("WB_CONTENT_API_ROOT")
        .unwrap_or_else(|_| "https://content-api.wildberries.ru".to_string())
        .trim_end_matches('/')
        .to_string()
});

pub static MARKETPLACE_ROOT: Lazy<String> = Lazy::new(|| {
    env::var("WB_MARKETPLACE_API_ROOT")
        .unwrap_or_else(|_| "https://marketplace-api.wildberries.ru".to_string())
        .trim_end_matches('/')
        .to_string()
});

pub static CARDS_LIST_URL: Lazy<String> =
    Lazy::new(|| format!("{}/content/v2/get/cards/list", *CONTENT_ROOT));

pub fn stocks_url(warehouse_id: u64) -> String {
    format!("{}/api/v3/stocks/{warehouse_id}", *MARKETPLACE_ROOT)
}

/// Cards requested per listing page.
pub const CARDS_PAGE_LIMIT: u32 = 100;

/// Stock items per PUT request.
pub const STOCK_BATCH_SIZE: usize = 1000;

/// Stock API ceiling, in requests per minute.
pub const STOCK_REQUESTS_PER_MINUTE: u32 = 300;

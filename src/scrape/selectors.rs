//! CSS selectors for the two supplier page layouts.
//!
//! Update these when a supplier changes its markup, then refresh the HTML
//! fixtures in `scrape::tests`.

use once_cell::sync::Lazy;
use scraper::Selector;

fn selector(css: &str) -> Selector {
    Selector::parse(css).expect("static selector must parse")
}

/// Catalog product pages, addressed by product key.
pub mod catalog {
    use super::*;

    /// Single-unit price on the pickup tab.
    pub static PRICE: Lazy<Selector> = Lazy::new(|| selector(r#"li[data-min="1"] .price-val"#));

    /// One element per store that has the item.
    pub static AVAILABLE_STORE: Lazy<Selector> =
        Lazy::new(|| selector(".avail-item-status.avail"));
}

/// Bag supplier pages, addressed through the URL table.
pub mod bags {
    use super::*;

    pub static STOCK_LABEL: Lazy<Selector> = Lazy::new(|| selector("div.quantity span.stock"));

    /// Price button for a single pack.
    pub static PRICE: Lazy<Selector> =
        Lazy::new(|| selector(r#"button[data-count="1"] .col_right"#));

    pub const IN_STOCK_TEXT: &str = "В наличии";

    /// Availability level reported when the in-stock label is present.
    pub const IN_STOCK_LEVEL: u32 = 5;
}

use crate::models::{CardsCursor, CardsPage, ProductCard};
use std::fmt::Display;
use tracing::{info, warn};

/// One page of the card listing for a cursor position.
pub trait CardsSource {
    type Error: Display;

    async fn page(&self, cursor: &CardsCursor) -> Result<CardsPage, Self::Error>;
}

/// Walks the listing until an empty page or a terminal cursor.
///
/// A failed page stops pagination; cards gathered so far are still returned.
pub async fn fetch_all_cards<S: CardsSource>(source: &S) -> Vec<ProductCard> {
    let mut cards = Vec::new();
    let mut cursor = CardsCursor::default();
    loop {
        let page = match source.page(&cursor).await {
            Ok(page) => page,
            Err(err) => {
                warn!(target = "unitsync.catalog", error = %err, fetched = cards.len(), "cards_page_failed");
                break;
            }
        };
        if page.cards.is_empty() {
            info!(target = "unitsync.catalog", "cards_exhausted");
            break;
        }
        cards.extend(page.cards);
        if page.cursor.is_terminal() {
            break;
        }
        cursor = page.cursor;
        info!(target = "unitsync.catalog", fetched = cards.len(), "cards_page_loaded");
    }
    cards
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One product card as returned by the content listing API.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ProductCard {
    #[serde(rename = "nmID")]
    pub nm_id: u64,
    pub vendor_code: String,
    #[serde(default)]
    pub updated_at: String,
    #[serde(default)]
    pub sizes: Vec<ProductSize>,
}

impl ProductCard {
    /// All SKU codes across every size variant, in API order.
    pub fn skus(&self) -> Vec<&str> {
        self.sizes
            .iter()
            .flat_map(|size| size.skus.iter().map(String::as_str))
            .collect()
    }

    /// The card's SKU when exactly one resolves across all sizes.
    pub fn single_sku(&self) -> Result<&str, usize> {
        match self.skus().as_slice() {
            [only] => Ok(*only),
            other => Err(other.len()),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct ProductSize {
    #[serde(default)]
    pub skus: Vec<String>,
}

/// Pagination position in the card listing.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CardsCursor {
    #[serde(default)]
    pub updated_at: String,
    #[serde(rename = "nmID", default)]
    pub nm_id: u64,
    #[serde(default)]
    pub total: u64,
}

impl CardsCursor {
    /// An empty timestamp or a zero id means there is nothing after this page.
    pub fn is_terminal(&self) -> bool {
        self.updated_at.is_empty() || self.nm_id == 0
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct CardsPage {
    #[serde(default)]
    pub cards: Vec<ProductCard>,
    #[serde(default)]
    pub cursor: CardsCursor,
}

/// A persisted reconciliation result. `(product_key, pack_size)` is unique.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProductRecord {
    pub nm_id: u64,
    pub vendor_code: String,
    pub pack_size: u32,
    pub product_key: String,
    pub sku: String,
    pub available_count: u32,
    pub cost: i64,
}

/// Counters reported at the end of a reconciliation pass.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub started_at: DateTime<Utc>,
    pub cards: usize,
    pub persisted: usize,
    pub skipped: usize,
    pub unclassified: usize,
    pub cache_hits: usize,
}

impl RunSummary {
    pub fn new(cards: usize) -> Self {
        Self {
            started_at: Utc::now(),
            cards,
            persisted: 0,
            skipped: 0,
            unclassified: 0,
            cache_hits: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn card_deserializes_from_api_shape() {
        let raw = r#"{
            "nmID": 123456,
            "vendorCode": "box_77_20",
            "updatedAt": "2024-05-01T10:00:00Z",
            "sizes": [{"skus": ["2037171234567"]}, {"skus": []}]
        }"#;
        let card: ProductCard = serde_json::from_str(raw).expect("card");
        assert_eq!(card.nm_id, 123456);
        assert_eq!(card.vendor_code, "box_77_20");
        assert_eq!(card.single_sku(), Ok("2037171234567"));
    }

    #[test]
    fn single_sku_reports_cardinality() {
        let card = ProductCard {
            nm_id: 1,
            vendor_code: "box_1_1".into(),
            updated_at: String::new(),
            sizes: vec![
                ProductSize {
                    skus: vec!["a".into()],
                },
                ProductSize {
                    skus: vec!["b".into()],
                },
            ],
        };
        assert_eq!(card.single_sku(), Err(2));
        let empty = ProductCard {
            sizes: vec![],
            ..card
        };
        assert_eq!(empty.single_sku(), Err(0));
    }

    #[test]
    fn cursor_terminal_when_empty_or_zero() {
        assert!(CardsCursor::default().is_terminal());
        let only_time = CardsCursor {
            updated_at: "2024-01-01T00:00:00Z".into(),
            nm_id: 0,
            total: 0,
        };
        assert!(only_time.is_terminal());
        let live = CardsCursor {
            nm_id: 9,
            ..only_time
        };
        assert!(!live.is_terminal());
    }
}

use crate::classify::{Classification, Classifier, Strategy};
use crate::cost::{Offer, fixed_cost};
use crate::models::{ProductCard, ProductRecord, RunSummary};
use crate::reference::{PriceTable, UrlTable};
use crate::scrape::{PageScraper, ScrapeTarget};
use crate::store::ProductStore;
use std::{collections::HashMap, time::Instant};
use thiserror::Error;
use tracing::{debug, error, info, warn};

#[derive(Debug, Error)]
#[error("stage `{stage}` failed: {message}")]
pub struct PipelineError {
    stage: &'static str,
    message: String,
    kind: PipelineErrorKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineErrorKind {
    /// The card is dropped and the run continues.
    Skip,
    /// The whole run stops.
    Fatal,
}

impl PipelineError {
    pub fn skip(stage: &'static str, message: impl Into<String>) -> Self {
        Self {
            stage,
            message: message.into(),
            kind: PipelineErrorKind::Skip,
        }
    }

    pub fn fatal(stage: &'static str, message: impl Into<String>) -> Self {
        Self {
            stage,
            message: message.into(),
            kind: PipelineErrorKind::Fatal,
        }
    }

    pub fn stage(&self) -> &'static str {
        self.stage
    }

    pub fn kind(&self) -> PipelineErrorKind {
        self.kind
    }

    pub fn detail(&self) -> &str {
        &self.message
    }
}

/// Read-only lookup tables loaded at startup.
#[derive(Debug, Clone, Default)]
pub struct ReferenceData {
    pub urls: UrlTable,
    pub prices: PriceTable,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CardOutcome {
    Persisted(ProductRecord),
    Unclassified,
}

/// Reconciles product cards into stored records, one card at a time.
///
/// Scraped offers are memoised per source and product key for the lifetime
/// of the reconciler, so pack-size variants of one product share a page load.
pub struct Reconciler<S> {
    classifier: Classifier,
    references: ReferenceData,
    scraper: S,
    strict_sku: bool,
    cache: HashMap<(Strategy, String), Offer>,
    cache_hits: usize,
}

impl<S: PageScraper> Reconciler<S> {
    pub fn new(
        classifier: Classifier,
        references: ReferenceData,
        scraper: S,
        strict_sku: bool,
    ) -> Self {
        Self {
            classifier,
            references,
            scraper,
            strict_sku,
            cache: HashMap::new(),
            cache_hits: 0,
        }
    }

    /// Processes cards in order. Only a fatal error stops the pass.
    pub async fn run(
        &mut self,
        cards: &[ProductCard],
        store: &ProductStore,
    ) -> Result<RunSummary, PipelineError> {
        let mut summary = RunSummary::new(cards.len());
        let started = Instant::now();
        for card in cards {
            match self.reconcile(card, store).await {
                Ok(CardOutcome::Persisted(_)) => {
                    summary.persisted += 1;
                    crate::metrics::card_outcome("persisted");
                }
                Ok(CardOutcome::Unclassified) => {
                    summary.unclassified += 1;
                    crate::metrics::card_outcome("unclassified");
                    info!(
                        target = "unitsync.pipeline",
                        nm_id = card.nm_id,
                        vendor_code = %card.vendor_code,
                        "card_unclassified"
                    );
                }
                Err(err) if err.kind() == PipelineErrorKind::Skip => {
                    summary.skipped += 1;
                    crate::metrics::card_outcome("skipped");
                    warn!(
                        target = "unitsync.pipeline",
                        nm_id = card.nm_id,
                        vendor_code = %card.vendor_code,
                        stage = err.stage(),
                        detail = err.detail(),
                        "card_skipped"
                    );
                }
                Err(err) => {
                    error!(
                        target = "unitsync.pipeline",
                        nm_id = card.nm_id,
                        vendor_code = %card.vendor_code,
                        stage = err.stage(),
                        detail = err.detail(),
                        "run_aborted"
                    );
                    return Err(err);
                }
            }
        }
        summary.cache_hits = self.cache_hits;
        crate::metrics::stage_elapsed("reconcile", started.elapsed().as_millis());
        Ok(summary)
    }

    pub async fn reconcile(
        &mut self,
        card: &ProductCard,
        store: &ProductStore,
    ) -> Result<CardOutcome, PipelineError> {
        let classification = self
            .classifier
            .classify(&card.vendor_code)
            .map_err(|err| PipelineError::skip("identity", err.to_string()))?;
        if classification == Classification::Unclassified {
            return Ok(CardOutcome::Unclassified);
        }

        let sku = self.resolve_sku(card, &classification)?.to_string();
        let pack_size = classification.pack_size();

        let record = match &classification {
            Classification::FixedPrice { .. } => {
                let row = self.references.prices.get(card.nm_id).ok_or_else(|| {
                    PipelineError::skip("price_table", format!("no row for nm_id {}", card.nm_id))
                })?;
                ProductRecord {
                    nm_id: card.nm_id,
                    vendor_code: card.vendor_code.clone(),
                    pack_size,
                    product_key: card.nm_id.to_string(),
                    sku,
                    available_count: row.quantity,
                    cost: fixed_cost(row.price, pack_size)
                        .map_err(|err| PipelineError::skip("cost", err.to_string()))?,
                }
            }
            Classification::ScrapedA { product_key, .. }
            | Classification::Legacy { product_key, .. } => {
                let target = ScrapeTarget::Catalog {
                    product_key: product_key.clone(),
                };
                let offer = self
                    .acquire(classification.strategy(), product_key, || Ok(target))
                    .await?;
                scraped_record(card, product_key, pack_size, sku, offer)?
            }
            Classification::ScrapedB {
                product_key,
                lookup_key,
                ..
            } => {
                let urls = &self.references.urls;
                let target = urls
                    .get(lookup_key)
                    .map(|url| ScrapeTarget::Bags {
                        url: url.to_string(),
                    })
                    .ok_or_else(|| {
                        PipelineError::skip("url_table", format!("no url for {lookup_key}"))
                    });
                let offer = self
                    .acquire(classification.strategy(), product_key, || target)
                    .await?;
                scraped_record(card, product_key, pack_size, sku, offer)?
            }
            Classification::Unclassified => return Ok(CardOutcome::Unclassified),
        };

        store
            .upsert(&record)
            .map_err(|err| PipelineError::skip("persist", err.to_string()))?;
        info!(
            target = "unitsync.pipeline",
            nm_id = record.nm_id,
            family = classification.family().map(|family| family.as_str()),
            product_key = %record.product_key,
            pack_size = record.pack_size,
            available = record.available_count,
            cost = record.cost,
            "card_persisted"
        );
        Ok(CardOutcome::Persisted(record))
    }

    fn resolve_sku<'c>(
        &self,
        card: &'c ProductCard,
        classification: &Classification,
    ) -> Result<&'c str, PipelineError> {
        card.single_sku().map_err(|count| {
            let message = format!("expected exactly one sku, found {count}");
            if self.strict_sku && classification.requires_strict_sku() {
                PipelineError::fatal("sku", message)
            } else {
                PipelineError::skip("sku", message)
            }
        })
    }

    /// Cached offer for the product, scraping the target on first use.
    async fn acquire<F>(
        &mut self,
        strategy: Strategy,
        product_key: &str,
        target: F,
    ) -> Result<Offer, PipelineError>
    where
        F: FnOnce() -> Result<ScrapeTarget, PipelineError>,
    {
        let key = (strategy, product_key.to_string());
        if let Some(offer) = self.cache.get(&key) {
            self.cache_hits += 1;
            debug!(target = "unitsync.pipeline", product_key, "offer_cache_hit");
            return Ok(*offer);
        }
        let target = target()?;
        info!(target = "unitsync.pipeline", product_key, url = %target.url(), "page_scrape");
        let raw = self
            .scraper
            .scrape(&target)
            .await
            .map_err(|err| PipelineError::skip("scrape", err.to_string()))?;
        let offer = Offer::from_raw(&raw.price, &raw.available_count)
            .map_err(|err| PipelineError::skip("parse_offer", err.to_string()))?;
        debug!(
            target = "unitsync.pipeline",
            product_key,
            price = offer.price.value(),
            available = offer.available,
            "offer_parsed"
        );
        self.cache.insert(key, offer);
        Ok(offer)
    }
}

fn scraped_record(
    card: &ProductCard,
    product_key: &str,
    pack_size: u32,
    sku: String,
    offer: Offer,
) -> Result<ProductRecord, PipelineError> {
    let cost = offer
        .price
        .pack_cost(pack_size)
        .map_err(|err| PipelineError::skip("cost", err.to_string()))?;
    Ok(ProductRecord {
        nm_id: card.nm_id,
        vendor_code: card.vendor_code.clone(),
        pack_size,
        product_key: product_key.to_string(),
        sku,
        available_count: offer.available,
        cost,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FamilyPatterns;
    use crate::models::ProductSize;
    use crate::scrape::{RawOffer, ScrapeError};
    use std::io::Cursor;
    use std::sync::Mutex;

    /// Serves canned offers by URL and counts page loads.
    #[derive(Default)]
    struct FakeScraper {
        offers: HashMap<String, RawOffer>,
        loads: Mutex<Vec<String>>,
    }

    impl FakeScraper {
        fn with(mut self, url: String, price: &str, available: &str) -> Self {
            self.offers.insert(
                url,
                RawOffer {
                    price: price.into(),
                    available_count: available.into(),
                },
            );
            self
        }

        fn load_count(&self) -> usize {
            self.loads.lock().unwrap().len()
        }
    }

    impl PageScraper for FakeScraper {
        async fn scrape(&self, target: &ScrapeTarget) -> Result<RawOffer, ScrapeError> {
            let url = target.url();
            self.loads.lock().unwrap().push(url.clone());
            self.offers
                .get(&url)
                .cloned()
                .ok_or(ScrapeError::MissingElement {
                    url,
                    selector: "price",
                })
        }
    }

    fn catalog_url(key: &str) -> String {
        ScrapeTarget::Catalog {
            product_key: key.into(),
        }
        .url()
    }

    fn card(nm_id: u64, vendor_code: &str, skus: &[&str]) -> ProductCard {
        ProductCard {
            nm_id,
            vendor_code: vendor_code.into(),
            updated_at: "2024-05-01T10:00:00Z".into(),
            sizes: vec![ProductSize {
                skus: skus.iter().map(|s| s.to_string()).collect(),
            }],
        }
    }

    fn references() -> ReferenceData {
        ReferenceData {
            urls: UrlTable::from_reader(Cursor::new(
                "bubblebags_19336,https://packio.example/bag-19336\n",
            ))
            .unwrap(),
            prices: PriceTable::from_reader(Cursor::new("id,price,quantity\n500,40,12\n"))
                .unwrap(),
        }
    }

    fn reconciler(scraper: FakeScraper, strict_sku: bool) -> Reconciler<FakeScraper> {
        let classifier = Classifier::new(&FamilyPatterns::default(), true).unwrap();
        Reconciler::new(classifier, references(), scraper, strict_sku)
    }

    #[tokio::test]
    async fn scraped_card_cost_rounds_up_per_pack() {
        let scraper = FakeScraper::default().with(catalog_url("77"), "15.50", "3");
        let mut rec = reconciler(scraper, true);
        let store = ProductStore::in_memory().unwrap();

        let outcome = rec
            .reconcile(&card(1, "box_77_20", &["sku-1"]), &store)
            .await
            .expect("reconcile");
        let CardOutcome::Persisted(record) = outcome else {
            panic!("expected a persisted record");
        };
        assert_eq!(record.product_key, "77");
        assert_eq!(record.pack_size, 20);
        assert_eq!(record.available_count, 3);
        assert_eq!(record.cost, 320);
        assert_eq!(store.records().unwrap(), vec![record]);
    }

    #[tokio::test]
    async fn fixed_price_card_uses_price_table() {
        let mut rec = reconciler(FakeScraper::default(), true);
        let store = ProductStore::in_memory().unwrap();

        let outcome = rec
            .reconcile(&card(500, "soil_9_3", &["sku-500"]), &store)
            .await
            .expect("reconcile");
        let CardOutcome::Persisted(record) = outcome else {
            panic!("expected a persisted record");
        };
        assert_eq!(record.cost, 120);
        assert_eq!(record.available_count, 12);
        assert_eq!(record.pack_size, 3);
        assert_eq!(record.product_key, "500");
        assert_eq!(rec.scraper.load_count(), 0);
    }

    #[tokio::test]
    async fn fixed_price_without_table_row_is_skipped() {
        let mut rec = reconciler(FakeScraper::default(), true);
        let store = ProductStore::in_memory().unwrap();
        let err = rec
            .reconcile(&card(501, "soil_9_3", &["s"]), &store)
            .await
            .expect_err("skip");
        assert_eq!(err.kind(), PipelineErrorKind::Skip);
        assert_eq!(err.stage(), "price_table");
    }

    #[tokio::test]
    async fn pack_variants_share_one_page_load() {
        let scraper = FakeScraper::default().with(catalog_url("77"), "10.01", "5");
        let mut rec = reconciler(scraper, true);
        let store = ProductStore::in_memory().unwrap();
        let cards = vec![
            card(1, "box_77_10", &["a"]),
            card(2, "box_77_50", &["b"]),
            card(3, "box_77_10", &["c"]),
        ];

        let summary = rec.run(&cards, &store).await.expect("run");
        assert_eq!(summary.persisted, 3);
        assert_eq!(summary.cache_hits, 2);
        assert_eq!(rec.scraper.load_count(), 1);

        // same composite key twice: one row, latest card wins
        let rows = store.records().unwrap();
        assert_eq!(rows.len(), 2);
        let ten = rows.iter().find(|r| r.pack_size == 10).unwrap();
        assert_eq!(ten.nm_id, 3);
        assert_eq!(ten.sku, "c");
        assert_eq!(ten.cost, 110);
    }

    #[tokio::test]
    async fn bag_card_resolves_url_by_lookup_key() {
        let scraper = FakeScraper::default().with(
            "https://packio.example/bag-19336".into(),
            "23",
            "5",
        );
        let mut rec = reconciler(scraper, true);
        let store = ProductStore::in_memory().unwrap();
        let outcome = rec
            .reconcile(&card(7, "bubblebags_19336_100", &["bag"]), &store)
            .await
            .expect("reconcile");
        let CardOutcome::Persisted(record) = outcome else {
            panic!("expected a persisted record");
        };
        assert_eq!(record.product_key, "19336");
        assert_eq!(record.cost, 2300);
    }

    #[tokio::test]
    async fn bag_card_without_url_is_skipped_without_loading() {
        let mut rec = reconciler(FakeScraper::default(), true);
        let store = ProductStore::in_memory().unwrap();
        let err = rec
            .reconcile(&card(8, "bubblebags_10000_5", &["bag"]), &store)
            .await
            .expect_err("skip");
        assert_eq!(err.stage(), "url_table");
        assert_eq!(rec.scraper.load_count(), 0);
    }

    #[tokio::test]
    async fn wrong_sku_count_aborts_scraped_run_when_strict() {
        let scraper = FakeScraper::default().with(catalog_url("1"), "5", "5");
        let mut rec = reconciler(scraper, true);
        let store = ProductStore::in_memory().unwrap();
        let cards = vec![
            card(1, "box_1_1", &["a"]),
            card(2, "box_2_1", &["x", "y"]),
            card(3, "box_1_5", &["b"]),
        ];
        let err = rec.run(&cards, &store).await.expect_err("fatal");
        assert_eq!(err.kind(), PipelineErrorKind::Fatal);
        assert_eq!(err.stage(), "sku");
        assert_eq!(store.records().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn wrong_sku_count_skips_when_lenient() {
        let scraper = FakeScraper::default().with(catalog_url("1"), "5", "5");
        let mut rec = reconciler(scraper, false);
        let store = ProductStore::in_memory().unwrap();
        let cards = vec![card(2, "box_2_1", &[]), card(3, "box_1_5", &["b"])];
        let summary = rec.run(&cards, &store).await.expect("run");
        assert_eq!(summary.skipped, 1);
        assert_eq!(summary.persisted, 1);
    }

    #[tokio::test]
    async fn fixed_price_sku_mismatch_always_skips() {
        let mut rec = reconciler(FakeScraper::default(), true);
        let store = ProductStore::in_memory().unwrap();
        let summary = rec
            .run(&[card(500, "soil_9_3", &["a", "b"])], &store)
            .await
            .expect("run");
        assert_eq!(summary.skipped, 1);
        assert!(store.records().unwrap().is_empty());
    }

    #[tokio::test]
    async fn cost_overflow_skips_the_card() {
        let scraper = FakeScraper::default().with(catalog_url("77"), "3000000000", "5");
        let mut rec = reconciler(scraper, true);
        let store = ProductStore::in_memory().unwrap();
        let err = rec
            .reconcile(&card(9, "box_77_4000000000", &["big"]), &store)
            .await
            .expect_err("skip");
        assert_eq!(err.kind(), PipelineErrorKind::Skip);
        assert_eq!(err.stage(), "cost");
        assert!(store.records().unwrap().is_empty());
    }

    #[tokio::test]
    async fn unclassified_and_unparseable_cards_are_counted() {
        let scraper = FakeScraper::default().with(catalog_url("4"), "по запросу", "1");
        let mut rec = reconciler(scraper, true);
        let store = ProductStore::in_memory().unwrap();
        let cards = vec![
            card(1, "mystery_1_1", &["a"]),
            card(4, "box_4_10", &["b"]),
            card(5, "box_5_10", &["c"]),
        ];
        let summary = rec.run(&cards, &store).await.expect("run");
        assert_eq!(summary.cards, 3);
        assert_eq!(summary.unclassified, 1);
        assert_eq!(summary.skipped, 2);
        assert_eq!(summary.persisted, 0);
    }
}

mod catalog;
mod classify;
mod config;
mod cost;
mod export;
mod http;
mod identity;
mod metrics;
mod models;
mod ozon;
mod pipeline;
mod reference;
mod scrape;
mod stock;
mod store;
mod wildberries;

use classify::Classifier;
use config::SyncConfig;
use eyre::WrapErr;
use ozon::OzonClient;
use pipeline::{Reconciler, ReferenceData};
use reference::{PriceTable, UrlTable};
use scrape::HttpScraper;
use std::time::Instant;
use store::ProductStore;
use tracing::{Instrument, error, info, info_span, warn};
use tracing_subscriber::{EnvFilter, fmt};
use uuid::Uuid;
use wildberries::{ContentClient, StocksClient};

#[tokio::main(flavor = "current_thread")]
async fn main() -> eyre::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let run_id = Uuid::new_v4();
    let result = run().instrument(info_span!("sync_run", %run_id)).await;
    if let Err(err) = &result {
        error!(target = "unitsync.main", %run_id, "run failed: {err:#}");
    }
    result
}

async fn run() -> eyre::Result<()> {
    let cfg = SyncConfig::from_env().wrap_err("loading configuration")?;
    let classifier =
        Classifier::new(&cfg.patterns, cfg.use_pcs).wrap_err("compiling vendor code families")?;

    let references = ReferenceData {
        urls: UrlTable::load(&cfg.urls_csv)
            .wrap_err_with(|| format!("loading url table {}", cfg.urls_csv.display()))?,
        prices: PriceTable::load(&cfg.prices_csv)
            .wrap_err_with(|| format!("loading price table {}", cfg.prices_csv.display()))?,
    };
    info!(
        target = "unitsync.main",
        urls = references.urls.len(),
        prices = references.prices.len(),
        "reference_tables_loaded"
    );
    let store = ProductStore::recreate(&cfg.db_path)
        .wrap_err_with(|| format!("creating store {}", cfg.db_path.display()))?;

    let started = Instant::now();
    let content = ContentClient::new(cfg.wb_api_key.clone(), cfg.object_ids.clone());
    let cards = catalog::fetch_all_cards(&content).await;
    metrics::stage_elapsed("catalog", started.elapsed().as_millis());
    info!(target = "unitsync.main", cards = cards.len(), "catalog_fetched");

    let mut reconciler = Reconciler::new(
        classifier,
        references,
        HttpScraper::new(cfg.scrape_delay),
        cfg.strict_sku,
    );
    let summary = reconciler
        .run(&cards, &store)
        .await
        .wrap_err("reconciling product cards")?;
    info!(
        target = "unitsync.main",
        started_at = %summary.started_at,
        cards = summary.cards,
        persisted = summary.persisted,
        skipped = summary.skipped,
        unclassified = summary.unclassified,
        cache_hits = summary.cache_hits,
        "reconcile_finished"
    );

    if cfg.push_stocks || cfg.ozon.is_some() {
        let rows = store.stock_rows().wrap_err("reading stock rows")?;
        if cfg.push_stocks {
            let api = StocksClient::new(cfg.wb_api_key.clone(), cfg.wb_warehouse_id);
            let report = wildberries::stocks::push_rows(&api, &rows).await;
            info!(
                target = "unitsync.main",
                batches = report.batches,
                updated = report.updated_items,
                failed = report.failed_batches,
                "wb_stocks_pushed"
            );
        }
        if let Some(credentials) = cfg.ozon.clone() {
            let api = OzonClient::new(credentials);
            let updates = ozon::stocks::stock_updates(&rows, api.warehouse_id());
            match ozon::stocks::push_all(&api, &updates).await {
                Ok(sent) => info!(target = "unitsync.main", sent, "ozon_stocks_pushed"),
                Err(err) => warn!(target = "unitsync.main", error = %err, "ozon_stocks_aborted"),
            }
        }
    }

    if cfg.export_costs {
        let report = export::export_costs(&cfg.export_xlsx, &cfg.export_sheet, &store)
            .wrap_err("exporting costs")?;
        info!(
            target = "unitsync.main",
            updated = report.updated,
            skipped = report.skipped,
            "costs_exported"
        );
    }

    info!(
        target = "unitsync.main",
        elapsed_ms = started.elapsed().as_millis() as u64,
        "run_finished"
    );
    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt().with_env_filter(filter).try_init();
}

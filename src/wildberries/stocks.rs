use crate::http::build_client;
use crate::stock::shippable_amount;
use crate::store::StockRow;
use crate::wildberries::config::{STOCK_BATCH_SIZE, STOCK_REQUESTS_PER_MINUTE, stocks_url};
use reqwest::{Client, StatusCode};
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;
use tokio::time::sleep;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum StockPushError {
    #[error("request failed: {0}")]
    Request(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StockItem {
    pub sku: String,
    pub amount: u32,
}

#[derive(Debug, Serialize)]
struct StocksRequest<'a> {
    stocks: &'a [StockItem],
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchOutcome {
    Updated,
    Rejected { status: u16, body: String },
}

pub trait StockApi {
    async fn put_stocks(&self, items: &[StockItem]) -> Result<BatchOutcome, StockPushError>;
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PushReport {
    pub batches: usize,
    pub updated_items: usize,
    pub failed_batches: usize,
}

/// Stock items for every persisted row, amounts from the shipping table.
pub fn stock_items(rows: &[StockRow]) -> Vec<StockItem> {
    rows.iter()
        .map(|row| StockItem {
            sku: row.sku.clone(),
            amount: shippable_amount(row.pack_size, row.available_count),
        })
        .collect()
}

/// Pause between batches that keeps us under the per-minute ceiling.
pub fn request_interval(requests_per_minute: u32) -> Duration {
    Duration::from_secs(60) / requests_per_minute.max(1)
}

/// Sends every batch once; failures are logged and the next batch follows
/// after the same pause.
pub async fn push_all<A: StockApi>(
    api: &A,
    items: &[StockItem],
    batch_size: usize,
    interval: Duration,
) -> PushReport {
    let mut report = PushReport::default();
    info!(target = "unitsync.wb", total = items.len(), "stock_push_started");
    for batch in items.chunks(batch_size.max(1)) {
        report.batches += 1;
        match api.put_stocks(batch).await {
            Ok(BatchOutcome::Updated) => {
                report.updated_items += batch.len();
                crate::metrics::batch_pushed("wb_stocks", batch.len(), true);
                info!(target = "unitsync.wb", size = batch.len(), "stock_batch_updated");
            }
            Ok(BatchOutcome::Rejected { status, body }) => {
                report.failed_batches += 1;
                crate::metrics::batch_pushed("wb_stocks", batch.len(), false);
                warn!(target = "unitsync.wb", status, body = %body, "stock_batch_rejected");
            }
            Err(err) => {
                report.failed_batches += 1;
                crate::metrics::batch_pushed("wb_stocks", batch.len(), false);
                warn!(target = "unitsync.wb", error = %err, "stock_batch_failed");
            }
        }
        sleep(interval).await;
    }
    report
}

pub async fn push_rows<A: StockApi>(api: &A, rows: &[StockRow]) -> PushReport {
    push_all(
        api,
        &stock_items(rows),
        STOCK_BATCH_SIZE,
        request_interval(STOCK_REQUESTS_PER_MINUTE),
    )
    .await
}

#[derive(Debug, Clone)]
pub struct StocksClient {
    http: Client,
    api_key: String,
    warehouse_id: u64,
}

impl StocksClient {
    pub fn new(api_key: impl Into<String>, warehouse_id: u64) -> Self {
        Self {
            http: build_client(15),
            api_key: api_key.into(),
            warehouse_id,
        }
    }
}

impl StockApi for StocksClient {
    async fn put_stocks(&self, items: &[StockItem]) -> Result<BatchOutcome, StockPushError> {
        let response = self
            .http
            .put(stocks_url(self.warehouse_id))
            .bearer_auth(&self.api_key)
            .json(&StocksRequest { stocks: items })
            .send()
            .await
            .map_err(|err| StockPushError::Request(err.to_string()))?;

        let status = response.status();
        if status == StatusCode::NO_CONTENT {
            return Ok(BatchOutcome::Updated);
        }
        let body = response.text().await.unwrap_or_default();
        Ok(BatchOutcome::Rejected {
            status: status.as_u16(),
            body,
        })
    }
}

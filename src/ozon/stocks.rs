use crate::config::OzonCredentials;
use crate::http::build_client;
use crate::stock::shippable_amount;
use crate::store::StockRow;
use once_cell::sync::Lazy;
use reqwest::{Client, StatusCode};
use serde::Serialize;
use thiserror::Error;
use tracing::info;

pub static API_ROOT: Lazy<String> = Lazy::new(|| {
    std::env::var("OZON_API_ROOT")
        .unwrap_or_else(|_| "https://api-seller.ozon.ru".to_string())
        .trim_end_matches('/')
        .to_string()
});

/// Stock updates per POST request.
pub const BATCH_SIZE: usize = 100;

#[derive(Debug, Error)]
pub enum OzonError {
    #[error("request failed: {0}")]
    Request(String),
    #[error("stock update rejected: HTTP {status}: {body}")]
    Rejected { status: u16, body: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OzonStockUpdate {
    pub offer_id: String,
    pub stock: u32,
    pub warehouse_id: u64,
}

#[derive(Debug, Serialize)]
struct OzonStocksRequest<'a> {
    stocks: &'a [OzonStockUpdate],
}

pub trait OzonStockApi {
    async fn post_stocks(&self, updates: &[OzonStockUpdate]) -> Result<(), OzonError>;
}

/// Offers are addressed by vendor code.
pub fn stock_updates(rows: &[StockRow], warehouse_id: u64) -> Vec<OzonStockUpdate> {
    rows.iter()
        .map(|row| OzonStockUpdate {
            offer_id: row.vendor_code.clone(),
            stock: shippable_amount(row.pack_size, row.available_count),
            warehouse_id,
        })
        .collect()
}

/// Pushes all updates in batches, stopping at the first failed batch.
pub async fn push_all<A: OzonStockApi>(
    api: &A,
    updates: &[OzonStockUpdate],
) -> Result<usize, OzonError> {
    let mut sent = 0;
    for batch in updates.chunks(BATCH_SIZE) {
        api.post_stocks(batch).await?;
        sent += batch.len();
        crate::metrics::batch_pushed("ozon_stocks", batch.len(), true);
        info!(target = "unitsync.ozon", size = batch.len(), "stock_batch_updated");
    }
    Ok(sent)
}

#[derive(Debug, Clone)]
pub struct OzonClient {
    http: Client,
    credentials: OzonCredentials,
}

impl OzonClient {
    pub fn new(credentials: OzonCredentials) -> Self {
        Self {
            http: build_client(15),
            credentials,
        }
    }

    pub fn warehouse_id(&self) -> u64 {
        self.credentials.warehouse_id
    }
}

impl OzonStockApi for OzonClient {
    async fn post_stocks(&self, updates: &[OzonStockUpdate]) -> Result<(), OzonError> {
        let url = format!("{}/v2/products/stocks", *API_ROOT);
        let response = self
            .http
            .post(url)
            .header("Client-Id", &self.credentials.client_id)
            .header("Api-Key", &self.credentials.api_key)
            .json(&OzonStocksRequest { stocks: updates })
            .send()
            .await
            .map_err(|err| OzonError::Request(err.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|err| OzonError::Request(err.to_string()))?;
        if status != StatusCode::OK {
            return Err(OzonError::Rejected {
                status: status.as_u16(),
                body,
            });
        }
        Ok(())
    }
}

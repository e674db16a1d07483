use crate::models::ProductRecord;
use rusqlite::{Connection, OptionalExtension, params};
use std::path::Path;
use thiserror::Error;
use tracing::{debug, info};

const SCHEMA: &str = "
    DROP TABLE IF EXISTS products;
    CREATE TABLE products (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        nm_id INTEGER NOT NULL,
        vendor_code TEXT NOT NULL,
        pack_size INTEGER NOT NULL,
        product_key TEXT NOT NULL,
        sku TEXT,
        available_count INTEGER NOT NULL,
        cost INTEGER NOT NULL,
        UNIQUE (product_key, pack_size)
    );
";

const UPSERT: &str = "
    INSERT INTO products (nm_id, vendor_code, pack_size, product_key, sku, available_count, cost)
    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
    ON CONFLICT (product_key, pack_size) DO UPDATE SET
        nm_id = excluded.nm_id,
        vendor_code = excluded.vendor_code,
        sku = excluded.sku,
        available_count = excluded.available_count,
        cost = excluded.cost
";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("unable to reset store file {path}: {message}")]
    Reset { path: String, message: String },
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Stock fields of a persisted row, as read by the stock publishers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StockRow {
    pub vendor_code: String,
    pub sku: String,
    pub pack_size: u32,
    pub available_count: u32,
}

pub struct ProductStore {
    conn: Connection,
}

impl ProductStore {
    /// Deletes any previous database file and creates an empty one.
    pub fn recreate(path: &Path) -> Result<Self, StoreError> {
        match std::fs::remove_file(path) {
            Ok(()) => info!(target = "unitsync.store", path = %path.display(), "previous_store_removed"),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
            Err(err) => {
                return Err(StoreError::Reset {
                    path: path.display().to_string(),
                    message: err.to_string(),
                });
            }
        }
        Self::init(Connection::open(path)?)
    }

    /// Opens the store written by an earlier reconciliation pass.
    #[cfg(test)]
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        Ok(Self {
            conn: Connection::open(path)?,
        })
    }

    #[cfg(test)]
    pub fn in_memory() -> Result<Self, StoreError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch(SCHEMA)?;
        info!(target = "unitsync.store", "products_table_created");
        Ok(Self { conn })
    }

    /// Inserts the record, or overwrites the row with the same
    /// `(product_key, pack_size)`.
    pub fn upsert(&self, record: &ProductRecord) -> Result<(), StoreError> {
        self.conn.prepare_cached(UPSERT)?.execute(params![
            record.nm_id as i64,
            record.vendor_code,
            record.pack_size,
            record.product_key,
            record.sku,
            record.available_count,
            record.cost,
        ])?;
        debug!(
            target = "unitsync.store",
            product_key = %record.product_key,
            pack_size = record.pack_size,
            sku = %record.sku,
            cost = record.cost,
            "record_upserted"
        );
        Ok(())
    }

    pub fn stock_rows(&self) -> Result<Vec<StockRow>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT vendor_code, sku, pack_size, available_count
             FROM products WHERE sku IS NOT NULL ORDER BY id",
        )?;
        let rows = stmt
            .query_map([], |row| {
                Ok(StockRow {
                    vendor_code: row.get(0)?,
                    sku: row.get(1)?,
                    pack_size: row.get(2)?,
                    available_count: row.get(3)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Cost of the first row stored for a card id.
    pub fn cost_for(&self, nm_id: u64) -> Result<Option<i64>, StoreError> {
        let cost = self
            .conn
            .query_row(
                "SELECT cost FROM products WHERE nm_id = ?1 ORDER BY id LIMIT 1",
                params![nm_id as i64],
                |row| row.get(0),
            )
            .optional()?;
        Ok(cost)
    }

    #[cfg(test)]
    pub fn records(&self) -> Result<Vec<ProductRecord>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT nm_id, vendor_code, pack_size, product_key, sku, available_count, cost
             FROM products ORDER BY id",
        )?;
        let rows = stmt
            .query_map([], |row| {
                Ok(ProductRecord {
                    nm_id: row.get::<_, i64>(0)? as u64,
                    vendor_code: row.get(1)?,
                    pack_size: row.get(2)?,
                    product_key: row.get(3)?,
                    sku: row.get(4)?,
                    available_count: row.get(5)?,
                    cost: row.get(6)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}

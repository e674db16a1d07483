//! Flat-file reference tables loaded once at startup.

use std::{
    collections::HashMap,
    fs::File,
    io::{BufRead, BufReader},
    path::Path,
};
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum ReferenceError {
    #[error("unable to open {path}: {message}")]
    Open { path: String, message: String },
    #[error("read failed: {0}")]
    Read(String),
}

/// Bag lookup key -> product page URL.
#[derive(Debug, Clone, Default)]
pub struct UrlTable {
    urls: HashMap<String, String>,
}

impl UrlTable {
    pub fn load(path: &Path) -> Result<Self, ReferenceError> {
        Self::from_reader(open(path)?)
    }

    /// Lines are `key,url` without a header; anything else is ignored.
    pub fn from_reader<R: BufRead>(reader: R) -> Result<Self, ReferenceError> {
        let mut urls = HashMap::new();
        for line in reader.lines() {
            let line = line.map_err(|err| ReferenceError::Read(err.to_string()))?;
            let fields: Vec<&str> = line.split(',').collect();
            if let [key, url] = fields.as_slice() {
                urls.insert(key.trim().to_string(), url.trim().to_string());
            }
        }
        info!(target = "unitsync.reference", entries = urls.len(), "url_table_loaded");
        Ok(Self { urls })
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.urls.get(key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.urls.len()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PriceRow {
    pub price: i64,
    pub quantity: u32,
}

/// Card id -> fixed unit price and quantity.
#[derive(Debug, Clone, Default)]
pub struct PriceTable {
    rows: HashMap<u64, PriceRow>,
}

impl PriceTable {
    pub fn load(path: &Path) -> Result<Self, ReferenceError> {
        Self::from_reader(open(path)?)
    }

    /// Expects a header line followed by `id,price,quantity` rows.
    pub fn from_reader<R: BufRead>(reader: R) -> Result<Self, ReferenceError> {
        let mut rows = HashMap::new();
        for line in reader.lines().skip(1) {
            let line = line.map_err(|err| ReferenceError::Read(err.to_string()))?;
            match parse_price_line(&line) {
                Some((id, row)) => {
                    rows.insert(id, row);
                }
                None => {
                    warn!(target = "unitsync.reference", line = %line, "price_row_malformed");
                }
            }
        }
        info!(target = "unitsync.reference", entries = rows.len(), "price_table_loaded");
        Ok(Self { rows })
    }

    pub fn get(&self, nm_id: u64) -> Option<PriceRow> {
        self.rows.get(&nm_id).copied()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }
}

fn parse_price_line(line: &str) -> Option<(u64, PriceRow)> {
    let mut fields = line.split(',').map(str::trim);
    let id = fields.next()?.parse::<u64>().ok()?;
    let price = fields.next()?.parse::<i64>().ok()?;
    let quantity = fields.next()?.parse::<u32>().ok()?;
    Some((id, PriceRow { price, quantity }))
}

fn open(path: &Path) -> Result<BufReader<File>, ReferenceError> {
    File::open(path)
        .map(BufReader::new)
        .map_err(|err| ReferenceError::Open {
            path: path.display().to_string(),
            message: err.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Cursor, Write};

    #[test]
    fn url_table_ignores_wrong_field_counts() {
        let raw = "bubblebags_19323,https://packio.example/product/a\n\
                   broken-line\n\
                   a,b,c\n\
                   bubblebags_19336,https://packio.example/product/b\n";
        let table = UrlTable::from_reader(Cursor::new(raw)).expect("table");
        assert_eq!(table.len(), 2);
        assert_eq!(
            table.get("bubblebags_19336"),
            Some("https://packio.example/product/b")
        );
        assert_eq!(table.get("broken-line"), None);
    }

    #[test]
    fn price_table_skips_header_and_bad_rows() {
        let raw = "id,price,quantity\n500,40,12\n501,abc,3\n502,7\n503,9,1,extra\n";
        let table = PriceTable::from_reader(Cursor::new(raw)).expect("table");
        assert_eq!(table.len(), 2);
        assert_eq!(
            table.get(500),
            Some(PriceRow {
                price: 40,
                quantity: 12
            })
        );
        assert_eq!(table.get(501), None);
        assert_eq!(table.get(503).map(|r| r.price), Some(9));
    }

    #[test]
    fn header_only_file_is_empty() {
        let table = PriceTable::from_reader(Cursor::new("500,40,12\n")).expect("table");
        assert_eq!(table.len(), 0);
    }

    #[test]
    fn loads_from_disk() {
        let mut file = tempfile::NamedTempFile::new().expect("tmp");
        writeln!(file, "bubblebags_1,https://example.com/1").expect("write");
        let table = UrlTable::load(file.path()).expect("load");
        assert_eq!(table.get("bubblebags_1"), Some("https://example.com/1"));
    }

    #[test]
    fn missing_file_reports_path() {
        let err = PriceTable::load(Path::new("/nonexistent/download.csv")).expect_err("missing");
        assert!(err.to_string().contains("/nonexistent/download.csv"));
    }
}

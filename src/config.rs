use serde::Deserialize;
use std::{path::PathBuf, time::Duration};
use thiserror::Error;

pub const DEFAULT_WAREHOUSE_ID: u64 = 1_283_008;

const DEFAULT_OBJECT_IDS: &[u64] = &[
    802, 1349, 1385, 1673, 1736, 1763, 1881, 1884, 2191, 2192, 2348, 2447, 2798, 3148, 3900, 3979,
    3756, 4063, 4097, 5485, 7205, 7206, 7246, 7045, 7048, 7053,
];

const DEFAULT_FIXED_PRICE: &[&str] = &[
    r"^growme[cp]?t?_\d+$",
    r"^soil_\d+_\d+$",
    r"^yant_\d+_\d+$",
    r"^sunterra_\d+_\d+$",
    r"^kormilitsa_\d+_\d+$",
    r"^fertilizer_\d+_\d+$",
    r"^f_\d+_\d+$",
    r"^korennik_\d+_\d+$",
];

const DEFAULT_SCRAPED_A: &[&str] = &[r"^box_\d+_\d+$"];
const DEFAULT_SCRAPED_B: &[&str] = &[r"^bubblebags_1\d+_\d+$"];
const DEFAULT_LEGACY: &[&str] = &[r"^bubblebags_9\d+_\d+$"];

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("required environment variable `{0}` is not set")]
    Missing(&'static str),
    #[error("environment variable `{key}` has invalid value `{value}`")]
    Invalid { key: &'static str, value: String },
    #[error("unable to read config file {}: {message}", path.display())]
    File { path: PathBuf, message: String },
    #[error("invalid vendor code pattern `{pattern}`: {message}")]
    Pattern { pattern: String, message: String },
}

/// Vendor-code families, tested in the order fixed-price, source A, source B,
/// legacy. The first family with a matching pattern wins.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct FamilyPatterns {
    pub fixed_price: Vec<String>,
    pub scraped_a: Vec<String>,
    pub scraped_b: Vec<String>,
    pub legacy: Vec<String>,
}

impl Default for FamilyPatterns {
    fn default() -> Self {
        fn owned(patterns: &[&str]) -> Vec<String> {
            patterns.iter().map(|p| p.to_string()).collect()
        }
        Self {
            fixed_price: owned(DEFAULT_FIXED_PRICE),
            scraped_a: owned(DEFAULT_SCRAPED_A),
            scraped_b: owned(DEFAULT_SCRAPED_B),
            legacy: owned(DEFAULT_LEGACY),
        }
    }
}

/// Optional YAML overlay pointed to by `SYNC_CONFIG_FILE`.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct FileOverlay {
    object_ids: Option<Vec<u64>>,
    patterns: Option<FamilyPatterns>,
    use_pcs: Option<bool>,
    strict_sku: Option<bool>,
}

#[derive(Debug, Clone)]
pub struct SyncConfig {
    pub wb_api_key: String,
    pub object_ids: Vec<u64>,
    pub patterns: FamilyPatterns,
    pub use_pcs: bool,
    /// Abort the run when a scraped-family card does not resolve to exactly
    /// one SKU. Fixed-price cards are skipped either way.
    pub strict_sku: bool,
    pub db_path: PathBuf,
    pub urls_csv: PathBuf,
    pub prices_csv: PathBuf,
    pub export_xlsx: PathBuf,
    pub export_sheet: String,
    pub scrape_delay: Duration,
    pub wb_warehouse_id: u64,
    pub push_stocks: bool,
    /// Secondary marketplace push, enabled by `SYNC_PUSH_OZON_STOCKS`.
    pub ozon: Option<OzonCredentials>,
    pub export_costs: bool,
}

impl SyncConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let wb_api_key = get("WB_API_KEY").ok_or(ConfigError::Missing("WB_API_KEY"))?;

        let overlay = match get("SYNC_CONFIG_FILE") {
            Some(path) => load_overlay(PathBuf::from(path))?,
            None => FileOverlay::default(),
        };

        let use_pcs = match get("SYNC_USE_PCS") {
            Some(raw) => parse_bool("SYNC_USE_PCS", &raw)?,
            None => overlay.use_pcs.unwrap_or(true),
        };
        let strict_sku = match get("SYNC_STRICT_SKU") {
            Some(raw) => parse_bool("SYNC_STRICT_SKU", &raw)?,
            None => overlay.strict_sku.unwrap_or(true),
        };
        let scrape_delay_ms = match get("SYNC_SCRAPE_DELAY_MS") {
            Some(raw) => parse_number::<u64>("SYNC_SCRAPE_DELAY_MS", &raw)?,
            None => 2000,
        };
        let wb_warehouse_id = match get("WB_WAREHOUSE_ID") {
            Some(raw) => parse_number::<u64>("WB_WAREHOUSE_ID", &raw)?,
            None => DEFAULT_WAREHOUSE_ID,
        };
        let flag = |key: &'static str, default: bool| match get(key) {
            Some(raw) => parse_bool(key, &raw),
            None => Ok(default),
        };
        let ozon = if flag("SYNC_PUSH_OZON_STOCKS", false)? {
            Some(OzonCredentials::from_lookup(&lookup)?)
        } else {
            None
        };

        Ok(Self {
            wb_api_key,
            object_ids: overlay
                .object_ids
                .unwrap_or_else(|| DEFAULT_OBJECT_IDS.to_vec()),
            patterns: overlay.patterns.unwrap_or_default(),
            use_pcs,
            strict_sku,
            db_path: get("SYNC_DB_PATH").unwrap_or_else(|| "unit_ec.db".into()).into(),
            urls_csv: get("SYNC_URLS_CSV").unwrap_or_else(|| "urls.csv".into()).into(),
            prices_csv: get("SYNC_PRICES_CSV")
                .unwrap_or_else(|| "download.csv".into())
                .into(),
            export_xlsx: get("SYNC_EXPORT_XLSX")
                .unwrap_or_else(|| "export_product_cost_data.xlsx".into())
                .into(),
            export_sheet: get("SYNC_EXPORT_SHEET").unwrap_or_else(|| "Sheet 1".into()),
            scrape_delay: Duration::from_millis(scrape_delay_ms),
            wb_warehouse_id,
            push_stocks: flag("SYNC_PUSH_STOCKS", false)?,
            ozon,
            export_costs: flag("SYNC_EXPORT_COSTS", true)?,
        })
    }
}

/// Credentials for the secondary marketplace; only read when its push is
/// enabled.
#[derive(Debug, Clone)]
pub struct OzonCredentials {
    pub api_key: String,
    pub client_id: String,
    pub warehouse_id: u64,
}

impl OzonCredentials {
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &'static str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .ok_or(ConfigError::Missing(key))
        };
        let api_key = get("OZON_API_KEY")?;
        let client_id = get("OZON_CLIENT_ID")?;
        let warehouse_id = parse_number::<u64>("WAREHOUSE_ID", &get("WAREHOUSE_ID")?)?;
        Ok(Self {
            api_key,
            client_id,
            warehouse_id,
        })
    }
}

fn load_overlay(path: PathBuf) -> Result<FileOverlay, ConfigError> {
    let raw = std::fs::read_to_string(&path).map_err(|err| ConfigError::File {
        path: path.clone(),
        message: err.to_string(),
    })?;
    serde_yaml::from_str(&raw).map_err(|err| ConfigError::File {
        path,
        message: err.to_string(),
    })
}

fn parse_bool(key: &'static str, raw: &str) -> Result<bool, ConfigError> {
    match raw.to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::Invalid {
            key,
            value: raw.to_string(),
        }),
    }
}

fn parse_number<T: std::str::FromStr>(key: &'static str, raw: &str) -> Result<T, ConfigError> {
    raw.parse::<T>().map_err(|_| ConfigError::Invalid {
        key,
        value: raw.to_string(),
    })
}

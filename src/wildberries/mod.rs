pub mod config;
pub mod content;
pub mod stocks;

pub use content::ContentClient;
pub use stocks::StocksClient;

pub mod stocks;

pub use stocks::OzonClient;

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CostError {
    #[error("unable to parse {field} from `{raw}`")]
    Parse { field: &'static str, raw: String },
    #[error("cost of {unit} x {multiplier} does not fit in an i64")]
    Overflow { unit: String, multiplier: u32 },
}

/// Unit price as scraped from a source page.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Price(f64);

impl Price {
    pub fn parse(raw: &str) -> Result<Self, CostError> {
        raw.trim()
            .parse::<f64>()
            .ok()
            .filter(|value| value.is_finite())
            .map(Price)
            .ok_or_else(|| CostError::Parse {
                field: "price",
                raw: raw.to_string(),
            })
    }

    pub fn value(&self) -> f64 {
        self.0
    }

    /// Rounds the unit price up before multiplying: 10.01 x 3 costs 33.
    pub fn pack_cost(&self, multiplier: u32) -> Result<i64, CostError> {
        let unit = self.0.ceil();
        // i64::MAX as f64 rounds up to 2^63, which is already out of range
        if unit < i64::MIN as f64 || unit >= i64::MAX as f64 {
            return Err(CostError::Overflow {
                unit: unit.to_string(),
                multiplier,
            });
        }
        checked_cost(unit as i64, multiplier)
    }
}

/// Typed price and availability, validated once at the acquisition boundary.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Offer {
    pub price: Price,
    pub available: u32,
}

impl Offer {
    pub fn from_raw(price: &str, available_count: &str) -> Result<Self, CostError> {
        let price = Price::parse(price)?;
        let available = available_count
            .trim()
            .parse::<u32>()
            .map_err(|_| CostError::Parse {
                field: "available_count",
                raw: available_count.to_string(),
            })?;
        Ok(Self { price, available })
    }
}

/// Fixed-price table entries are already whole currency units.
pub fn fixed_cost(unit_price: i64, pack_size: u32) -> Result<i64, CostError> {
    checked_cost(unit_price, pack_size)
}

fn checked_cost(unit: i64, multiplier: u32) -> Result<i64, CostError> {
    unit.checked_mul(i64::from(multiplier))
        .ok_or_else(|| CostError::Overflow {
            unit: unit.to_string(),
            multiplier,
        })
}

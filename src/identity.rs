//! Vendor codes look like `family_key[_packsize]`, e.g. `box_4821_50`.

use thiserror::Error;

const DELIMITER: char = '_';

#[derive(Debug, Error, PartialEq, Eq)]
pub enum IdentityError {
    #[error("vendor code `{0}` has no product key segment")]
    MissingKey(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VendorIdentity {
    pub product_key: String,
    pub pack_size: u32,
}

/// Splits a vendor code into its product key and pack size.
///
/// The pack size is read from the third segment only when `use_pcs` is set;
/// a missing or unparseable segment falls back to a single unit.
pub fn extract(vendor_code: &str, use_pcs: bool) -> Result<VendorIdentity, IdentityError> {
    let mut segments = vendor_code.split(DELIMITER).skip(1);
    let product_key = segments
        .next()
        .filter(|key| !key.is_empty())
        .ok_or_else(|| IdentityError::MissingKey(vendor_code.to_string()))?;
    let pack_size = if use_pcs {
        parse_pack_size(segments.next())
    } else {
        1
    };
    Ok(VendorIdentity {
        product_key: product_key.to_string(),
        pack_size,
    })
}

/// Pack size for the fixed-price family, which always counts units.
pub fn pack_size(vendor_code: &str) -> u32 {
    parse_pack_size(vendor_code.split(DELIMITER).nth(2))
}

/// Reference-table key for bag family codes: the code without its trailing
/// `_<digits>` pack-size suffix (`bubblebags_19336_100` -> `bubblebags_19336`).
pub fn bag_lookup_key(vendor_code: &str) -> &str {
    match vendor_code.rsplit_once(DELIMITER) {
        Some((base, suffix))
            if !suffix.is_empty() && suffix.chars().all(|ch| ch.is_ascii_digit()) =>
        {
            base
        }
        _ => vendor_code,
    }
}

fn parse_pack_size(segment: Option<&str>) -> u32 {
    segment
        .and_then(|raw| raw.trim().parse::<u32>().ok())
        .unwrap_or(1)
}

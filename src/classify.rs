use crate::config::{ConfigError, FamilyPatterns};
use crate::identity::{self, IdentityError};
use regex::RegexSet;

/// Vendor-code family, in match priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Family {
    FixedPrice,
    ScrapedA,
    ScrapedB,
    Legacy,
}

impl Family {
    pub fn as_str(&self) -> &'static str {
        match self {
            Family::FixedPrice => "fixed_price",
            Family::ScrapedA => "scraped_a",
            Family::ScrapedB => "scraped_b",
            Family::Legacy => "legacy",
        }
    }
}

/// A classified card, carrying only what its acquisition strategy needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    FixedPrice {
        pack_size: u32,
    },
    ScrapedA {
        product_key: String,
        pack_size: u32,
    },
    ScrapedB {
        product_key: String,
        lookup_key: String,
        pack_size: u32,
    },
    Legacy {
        product_key: String,
        pack_size: u32,
    },
    Unclassified,
}

/// Where price and availability come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Strategy {
    PriceTable,
    CatalogPage,
    LookupPage,
    Skip,
}

impl Classification {
    pub fn strategy(&self) -> Strategy {
        match self {
            Classification::FixedPrice { .. } => Strategy::PriceTable,
            Classification::ScrapedA { .. } | Classification::Legacy { .. } => {
                Strategy::CatalogPage
            }
            Classification::ScrapedB { .. } => Strategy::LookupPage,
            Classification::Unclassified => Strategy::Skip,
        }
    }

    pub fn family(&self) -> Option<Family> {
        match self {
            Classification::FixedPrice { .. } => Some(Family::FixedPrice),
            Classification::ScrapedA { .. } => Some(Family::ScrapedA),
            Classification::ScrapedB { .. } => Some(Family::ScrapedB),
            Classification::Legacy { .. } => Some(Family::Legacy),
            Classification::Unclassified => None,
        }
    }

    pub fn pack_size(&self) -> u32 {
        match self {
            Classification::FixedPrice { pack_size }
            | Classification::ScrapedA { pack_size, .. }
            | Classification::ScrapedB { pack_size, .. }
            | Classification::Legacy { pack_size, .. } => *pack_size,
            Classification::Unclassified => 0,
        }
    }

    /// Scraped families treat a wrong SKU count as a data-integrity failure.
    pub fn requires_strict_sku(&self) -> bool {
        !matches!(
            self,
            Classification::FixedPrice { .. } | Classification::Unclassified
        )
    }
}

pub struct Classifier {
    families: Vec<(Family, RegexSet)>,
    use_pcs: bool,
}

impl Classifier {
    pub fn new(patterns: &FamilyPatterns, use_pcs: bool) -> Result<Self, ConfigError> {
        let families = [
            (Family::FixedPrice, &patterns.fixed_price),
            (Family::ScrapedA, &patterns.scraped_a),
            (Family::ScrapedB, &patterns.scraped_b),
            (Family::Legacy, &patterns.legacy),
        ]
        .into_iter()
        .map(|(family, list)| compile(list).map(|set| (family, set)))
        .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { families, use_pcs })
    }

    pub fn family_of(&self, vendor_code: &str) -> Option<Family> {
        self.families
            .iter()
            .find(|(_, set)| set.is_match(vendor_code))
            .map(|(family, _)| *family)
    }

    pub fn classify(&self, vendor_code: &str) -> Result<Classification, IdentityError> {
        let Some(family) = self.family_of(vendor_code) else {
            return Ok(Classification::Unclassified);
        };
        if family == Family::FixedPrice {
            return Ok(Classification::FixedPrice {
                pack_size: identity::pack_size(vendor_code),
            });
        }
        let id = identity::extract(vendor_code, self.use_pcs)?;
        Ok(match family {
            Family::ScrapedA => Classification::ScrapedA {
                product_key: id.product_key,
                pack_size: id.pack_size,
            },
            Family::ScrapedB => Classification::ScrapedB {
                lookup_key: identity::bag_lookup_key(vendor_code).to_string(),
                product_key: id.product_key,
                pack_size: id.pack_size,
            },
            Family::Legacy | Family::FixedPrice => Classification::Legacy {
                product_key: id.product_key,
                pack_size: id.pack_size,
            },
        })
    }
}

fn compile(patterns: &[String]) -> Result<RegexSet, ConfigError> {
    RegexSet::new(patterns).map_err(|err| ConfigError::Pattern {
        pattern: patterns.join(" | "),
        message: err.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classifier() -> Classifier {
        Classifier::new(&FamilyPatterns::default(), true).expect("classifier")
    }

    #[test]
    fn fixed_price_wins_first() {
        let c = classifier();
        assert_eq!(
            c.classify("soil_500_3").unwrap(),
            Classification::FixedPrice { pack_size: 3 }
        );
        assert_eq!(
            c.classify("growmect_17").unwrap(),
            Classification::FixedPrice { pack_size: 1 }
        );
    }

    #[test]
    fn fixed_price_short_circuits_overlapping_family() {
        let patterns = FamilyPatterns {
            scraped_a: vec![r"^soil_\d+_\d+$".into()],
            ..FamilyPatterns::default()
        };
        let c = Classifier::new(&patterns, true).unwrap();
        assert_eq!(c.family_of("soil_1_2"), Some(Family::FixedPrice));
    }

    #[test]
    fn scraped_families_carry_keys() {
        let c = classifier();
        assert_eq!(
            c.classify("box_77_20").unwrap(),
            Classification::ScrapedA {
                product_key: "77".into(),
                pack_size: 20,
            }
        );
        assert_eq!(
            c.classify("bubblebags_19336_100").unwrap(),
            Classification::ScrapedB {
                product_key: "19336".into(),
                lookup_key: "bubblebags_19336".into(),
                pack_size: 100,
            }
        );
        let legacy = c.classify("bubblebags_9001_10").unwrap();
        assert_eq!(legacy.family(), Some(Family::Legacy));
        assert_eq!(legacy.strategy(), Strategy::CatalogPage);
    }

    #[test]
    fn patterns_are_anchored() {
        let c = classifier();
        assert_eq!(c.classify("box_77").unwrap(), Classification::Unclassified);
        assert_eq!(
            c.classify("xbox_77_20").unwrap(),
            Classification::Unclassified
        );
        assert_eq!(c.classify("").unwrap().strategy(), Strategy::Skip);
    }

    #[test]
    fn strictness_follows_family() {
        let c = classifier();
        assert!(!c.classify("soil_1_1").unwrap().requires_strict_sku());
        assert!(c.classify("box_1_1").unwrap().requires_strict_sku());
        assert!(c.classify("bubblebags_12_5").unwrap().requires_strict_sku());
    }

    #[test]
    fn invalid_pattern_is_a_config_error() {
        let patterns = FamilyPatterns {
            legacy: vec!["^broken(".into()],
            ..FamilyPatterns::default()
        };
        assert!(matches!(
            Classifier::new(&patterns, true),
            Err(ConfigError::Pattern { .. })
        ));
    }
}

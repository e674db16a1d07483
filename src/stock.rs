/// Recognised `(pack_size, availability)` pairs and the units they ship.
const SHIPPABLE: &[(u32, u32, u32)] = &[
    (100, 5, 1),
    (50, 5, 1),
    (30, 5, 2),
    (10, 5, 5),
    (30, 4, 1),
    (10, 4, 3),
    (1, 5, 5),
    (3, 5, 3),
    (5, 5, 2),
];

/// Units to report as in stock. Unlisted pairs ship nothing.
pub fn shippable_amount(pack_size: u32, availability: u32) -> u32 {
    SHIPPABLE
        .iter()
        .find(|(pack, level, _)| *pack == pack_size && *level == availability)
        .map(|(_, _, amount)| *amount)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_entries() {
        assert_eq!(shippable_amount(50, 5), 1);
        assert_eq!(shippable_amount(10, 5), 5);
        assert_eq!(shippable_amount(30, 4), 1);
        assert_eq!(shippable_amount(10, 4), 3);
        assert_eq!(shippable_amount(100, 5), 1);
        assert_eq!(shippable_amount(5, 5), 2);
    }

    #[test]
    fn unlisted_pairs_ship_nothing() {
        assert_eq!(shippable_amount(7, 5), 0);
        assert_eq!(shippable_amount(50, 4), 0);
        assert_eq!(shippable_amount(10, 0), 0);
        assert_eq!(shippable_amount(1, 12), 0);
    }
}

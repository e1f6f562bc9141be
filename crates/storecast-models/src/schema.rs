//! The canonical feature schema shared by every store model.

use std::sync::LazyLock;

/// Ordered feature slots used when an artifact does not embed its own list.
pub const CANONICAL_FEATURES: [&str; 19] = [
    "wm_yr_wk",
    "wday",
    "snap",
    "year",
    "month",
    "day",
    "lag_1",
    "item_category",
    "item_subcategory",
    "item_number",
    "sell_price",
    "price_flag",
    "is_weekend",
    "snap_weekend",
    "wday_x_snap",
    "lag_7",
    "is_event",
    "event_count",
    "event_impact",
];

/// Column carrying the raw item identifier, consumed by the item encoder.
pub const ITEM_ID_COLUMN: &str = "item_id";

/// Auxiliary column the item encoder writes into.
pub const ITEM_ID_ENCODED_COLUMN: &str = "item_id_enc";

/// Column holding the partition key. Never passed to a scorer.
pub const STORE_ID_COLUMN: &str = "store_id";

static CANONICAL_OWNED: LazyLock<Vec<String>> =
    LazyLock::new(|| CANONICAL_FEATURES.iter().map(|s| (*s).to_string()).collect());

/// The canonical schema as owned strings.
#[must_use]
pub fn canonical_features() -> &'static [String] {
    &CANONICAL_OWNED
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_canonical_schema_is_unique_and_ordered() {
        let unique: HashSet<_> = CANONICAL_FEATURES.iter().collect();
        assert_eq!(unique.len(), CANONICAL_FEATURES.len());
        assert_eq!(canonical_features()[0], "wm_yr_wk");
        assert_eq!(canonical_features()[18], "event_impact");
        assert!(!CANONICAL_FEATURES.contains(&STORE_ID_COLUMN));
    }
}

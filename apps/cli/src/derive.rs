//! Caller-side feature derivation.
//!
//! The server expects a handful of features that are pure functions of the
//! raw inputs. They are computed here so the user never types them.

/// Stores the API ships models for.
pub const KNOWN_STORES: [&str; 10] =
    ["CA_1", "CA_2", "CA_3", "CA_4", "TX_1", "TX_2", "TX_3", "WI_1", "WI_2", "WI_3"];

/// Numeric decomposition of an item id of the form `CATEGORY_sub_number`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ItemParts {
    pub category: i64,
    pub subcategory: i64,
    pub number: i64,
}

fn char_code_hash(token: &str) -> i64 {
    i64::from(token.chars().map(u32::from).sum::<u32>() % 1000)
}

/// Splits an item id such as `FOODS_3_090`.
///
/// The category is a char-code hash of the first token. The subcategory is
/// the second token as an integer, or its hash. The number is the third
/// token as an integer, or 0. Missing tokens count as `"0"`.
#[must_use]
pub fn parse_item_id(item_id: &str) -> ItemParts {
    if item_id.is_empty() {
        return ItemParts::default();
    }
    let mut tokens = item_id.split('_');
    let category = tokens.next().unwrap_or("0");
    let subcategory = tokens.next().unwrap_or("0");
    let number = tokens.next().unwrap_or("0");

    ItemParts {
        category: char_code_hash(category),
        subcategory: subcategory.trim().parse().unwrap_or_else(|_| char_code_hash(subcategory)),
        number: number.trim().parse().unwrap_or(0),
    }
}

/// Saturday and Sunday are weekdays 1 and 2.
#[must_use]
pub fn is_weekend(wday: i64) -> i64 {
    i64::from(matches!(wday, 1 | 2))
}

#[must_use]
pub fn price_flag(sell_price: f64) -> i64 {
    i64::from(sell_price < 0.0)
}

/// Weekend and SNAP interaction terms: `(snap_weekend, wday_x_snap)`.
#[must_use]
pub fn snap_interactions(wday: i64, snap: i64) -> (i64, i64) {
    (snap * is_weekend(wday), wday * snap)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_item_id_numeric_tokens() {
        let parts = parse_item_id("FOODS_3_090");
        // F(70)+O(79)+O(79)+D(68)+S(83) = 379
        assert_eq!(parts, ItemParts { category: 379, subcategory: 3, number: 90 });
    }

    #[test]
    fn test_parse_item_id_non_numeric_tokens() {
        let parts = parse_item_id("HOBBIES_x_y");
        assert_eq!(parts.subcategory, i64::from(u32::from('x')));
        assert_eq!(parts.number, 0);
    }

    #[test]
    fn test_parse_item_id_missing_tokens() {
        assert_eq!(parse_item_id(""), ItemParts::default());
        let parts = parse_item_id("FOODS");
        assert_eq!(parts.subcategory, 0);
        assert_eq!(parts.number, 0);
    }

    #[test]
    fn test_weekend_and_interactions() {
        assert_eq!(is_weekend(1), 1);
        assert_eq!(is_weekend(2), 1);
        assert_eq!(is_weekend(3), 0);
        assert_eq!(snap_interactions(1, 1), (1, 1));
        assert_eq!(snap_interactions(5, 1), (0, 5));
        assert_eq!(snap_interactions(2, 0), (0, 0));
    }

    #[test]
    fn test_price_flag() {
        assert_eq!(price_flag(-0.5), 1);
        assert_eq!(price_flag(0.0), 0);
        assert_eq!(price_flag(3.2), 0);
    }
}

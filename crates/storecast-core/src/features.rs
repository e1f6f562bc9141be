//! Feature normalization: arbitrary named input values to the exact
//! numeric matrix an artifact's scorer expects.
//!
//! Normalization never fails. Missing columns are zero-filled and anything
//! that is not a number, a boolean or a numeric string becomes 0.

use serde_json::{Map, Value};
use storecast_abstraction::FeatureMatrix;
use storecast_models::{ITEM_ID_COLUMN, ITEM_ID_ENCODED_COLUMN, ModelArtifact};
use tracing::debug;

/// One input row: feature name → raw value.
pub type Record = Map<String, Value>;

/// Coerces one raw value to a number.
///
/// Numbers stay, booleans become 0/1, numeric strings parse, everything
/// else is 0. Non-finite results are 0 as well.
#[must_use]
pub fn coerce(value: &Value) -> f64 {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::Bool(b) => Some(f64::from(u8::from(*b))),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    };
    parsed.filter(|v| v.is_finite()).unwrap_or(0.0)
}

/// A column is boolean-typed when every row carries a boolean for it.
fn is_boolean_column(rows: &[Record], name: &str) -> bool {
    !rows.is_empty() && rows.iter().all(|row| matches!(row.get(name), Some(Value::Bool(_))))
}

fn item_key(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Builds the scorer input for `rows` under `artifact`'s active feature list.
///
/// Steps, in order: zero-fill and coerce every active column, project to
/// the active order, apply the fitted scaler to numeric-typed columns it
/// knows, then write the encoded item id into `item_id_enc` when that
/// column is active and the input carries `item_id`. Rows without an
/// `item_id` keep their own `item_id_enc`, or get the encoder's unknown
/// value if they have none.
#[must_use]
pub fn normalize(rows: &[Record], artifact: &ModelArtifact) -> FeatureMatrix {
    let active = artifact.active_features();
    let mut matrix = FeatureMatrix::zeros(active.to_vec(), rows.len());

    for (col, name) in active.iter().enumerate() {
        for (r, row) in rows.iter().enumerate() {
            if let Some(value) = row.get(name) {
                matrix.set(r, col, coerce(value));
            }
        }
    }

    if let Some(scaler) = artifact.scaler() {
        for (col, name) in active.iter().enumerate() {
            if is_boolean_column(rows, name) {
                debug!(feature = %name, "Skipping scaler on boolean column");
                continue;
            }
            if let Some((mean, scale)) = scaler.params(name) {
                matrix.map_column(col, |x| (x - mean) / scale);
            }
        }
    }

    if let Some(encoder) = artifact.item_encoder() {
        let has_item_id = rows.iter().any(|row| row.contains_key(ITEM_ID_COLUMN));
        if let (true, Some(col)) = (has_item_id, matrix.column_index(ITEM_ID_ENCODED_COLUMN)) {
            for (r, row) in rows.iter().enumerate() {
                match row.get(ITEM_ID_COLUMN) {
                    Some(value) => matrix.set(r, col, encoder.encode(&item_key(value))),
                    // A caller-supplied code stands when the row has no item id.
                    None if row.contains_key(ITEM_ID_ENCODED_COLUMN) => {}
                    None => matrix.set(r, col, encoder.unknown_value),
                }
            }
        }
    }

    matrix
}

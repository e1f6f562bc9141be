//! Single prediction with caller-side derived features.

use anyhow::Result;
use clap::Args;
use colored::Colorize;
use serde_json::{Map, Value, json};
use tracing::warn;

use crate::client::ApiClient;
use crate::derive::{KNOWN_STORES, is_weekend, parse_item_id, price_flag, snap_interactions};

/// Raw inputs for one prediction. Derived features are computed, not asked for.
#[derive(Args, Debug, Clone)]
pub struct PredictArgs {
    /// Store identifier (e.g. CA_1, TX_2, WI_3)
    #[arg(short, long)]
    pub store: String,

    /// Item identifier, CATEGORY_sub_number (e.g. FOODS_3_090)
    #[arg(short, long, default_value = "")]
    pub item_id: String,

    /// Sell price
    #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
    pub sell_price: f64,

    /// Weekday, 1 (Saturday) to 7
    #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(i64).range(1..=7))]
    pub wday: i64,

    /// Walmart week identifier
    #[arg(long, default_value_t = 1)]
    pub wm_yr_wk: i64,

    /// SNAP day (0 or 1)
    #[arg(long, default_value_t = 0, value_parser = clap::value_parser!(i64).range(0..=1))]
    pub snap: i64,

    #[arg(long, default_value_t = 2025)]
    pub year: i64,

    #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(i64).range(1..=12))]
    pub month: i64,

    #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(i64).range(1..=31))]
    pub day: i64,

    /// Units sold the previous day
    #[arg(long = "lag-1", default_value_t = 0.0)]
    pub lag_1: f64,

    /// Units sold a week earlier
    #[arg(long = "lag-7", default_value_t = 0.0)]
    pub lag_7: f64,

    /// Event today (0 or 1)
    #[arg(long, default_value_t = 0, value_parser = clap::value_parser!(i64).range(0..=1))]
    pub is_event: i64,

    #[arg(long, default_value_t = 0, value_parser = clap::value_parser!(i64).range(0..))]
    pub event_count: i64,

    #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
    pub event_impact: f64,

    /// Print the request payload and response as JSON
    #[arg(long)]
    pub json: bool,
}

/// Builds the request body: raw inputs plus every derived feature.
pub fn build_payload(args: &PredictArgs) -> Map<String, Value> {
    let item = parse_item_id(&args.item_id);
    let weekend = is_weekend(args.wday);
    let (snap_weekend, wday_x_snap) = snap_interactions(args.wday, args.snap);

    let fields = [
        ("store_id", json!(args.store)),
        ("wm_yr_wk", json!(args.wm_yr_wk)),
        ("wday", json!(args.wday)),
        ("snap", json!(args.snap)),
        ("year", json!(args.year)),
        ("month", json!(args.month)),
        ("day", json!(args.day)),
        ("lag_1", json!(args.lag_1)),
        ("item_category", json!(item.category)),
        ("item_subcategory", json!(item.subcategory)),
        ("item_number", json!(item.number)),
        ("sell_price", json!(args.sell_price)),
        ("price_flag", json!(price_flag(args.sell_price))),
        ("is_weekend", json!(weekend)),
        ("snap_weekend", json!(snap_weekend)),
        ("wday_x_snap", json!(wday_x_snap)),
        ("lag_7", json!(args.lag_7)),
        ("is_event", json!(args.is_event)),
        ("event_count", json!(args.event_count)),
        ("event_impact", json!(args.event_impact)),
    ];

    let mut map: Map<String, Value> =
        fields.into_iter().map(|(key, value)| (key.to_string(), value)).collect();
    if !args.item_id.is_empty() {
        map.insert("item_id".to_string(), Value::from(args.item_id.clone()));
    }
    map
}

/// Execute the predict command.
pub async fn execute(client: &ApiClient, args: &PredictArgs) -> Result<()> {
    if !KNOWN_STORES.contains(&args.store.as_str()) {
        warn!(store = %args.store, known = ?KNOWN_STORES, "Store is not one of the published models");
    }
    let payload = build_payload(args);
    let prediction = client.predict_single(&payload).await?;

    if args.json {
        let out = json!({ "request": payload, "prediction": prediction });
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else {
        println!("Prediction for {}: {}", args.store.cyan(), prediction.to_string().green().bold());
    }
    Ok(())
}

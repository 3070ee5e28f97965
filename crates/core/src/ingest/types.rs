use serde_json::Value;
use std::collections::BTreeMap;

/// Key under which the provider nests the per-day price map.
pub const TIME_SERIES_KEY: &str = "Time Series (Daily)";

/// Provider field label -> raw value for one trading day.
pub type RawFields = BTreeMap<String, Value>;

/// Date string -> provider fields, exactly as returned upstream.
pub type RawTimeSeries = BTreeMap<String, RawFields>;

// Keys the provider uses instead of the time series when it rejects a request.
pub(crate) const PROVIDER_MESSAGE_KEYS: [&str; 3] = ["Error Message", "Note", "Information"];

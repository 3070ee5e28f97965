use crate::ingest::types::{RawFields, RawTimeSeries};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;

const DATE_FORMAT: &str = "%Y-%m-%d";

const FIELD_OPEN: &str = "1. open";
const FIELD_HIGH: &str = "2. high";
const FIELD_LOW: &str = "3. low";
const FIELD_CLOSE: &str = "4. close";
const FIELD_ADJ_CLOSE: &str = "5. adjusted close";
const FIELD_VOLUME: &str = "6. volume";

/// One trading day with canonical column names.
///
/// A value the provider sent as something other than a finite number is kept
/// as `None` rather than rejecting the whole day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyBar {
    pub date: NaiveDate,
    pub open: Option<f64>,
    pub high: Option<f64>,
    pub low: Option<f64>,
    pub close: Option<f64>,
    pub adj_close: Option<f64>,
    /// Share count, serialised as a JSON integer.
    pub volume: Option<u64>,
}

impl DailyBar {
    fn from_fields(date: NaiveDate, fields: &RawFields) -> Self {
        let num = |label: &str| fields.get(label).and_then(parse_number);
        Self {
            date,
            open: num(FIELD_OPEN),
            high: num(FIELD_HIGH),
            low: num(FIELD_LOW),
            close: num(FIELD_CLOSE),
            adj_close: num(FIELD_ADJ_CLOSE),
            volume: fields.get(FIELD_VOLUME).and_then(parse_count),
        }
    }
}

/// Raw provider map -> date-ascending bars. Only the six known fields are
/// kept; dividend/split columns and anything else are dropped.
pub fn normalize(raw: &RawTimeSeries) -> Vec<DailyBar> {
    let mut bars: Vec<DailyBar> = raw
        .iter()
        .filter_map(|(key, fields)| match NaiveDate::parse_from_str(key.trim(), DATE_FORMAT) {
            Ok(date) => Some(DailyBar::from_fields(date, fields)),
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "skipping provider row with unparseable date");
                None
            }
        })
        .collect();

    // Keys are strings, so "2024-1-5" style keys can sort out of date order.
    bars.sort_by_key(|b| b.date);
    bars.dedup_by_key(|b| b.date);
    bars
}

fn parse_number(value: &Value) -> Option<f64> {
    let n = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    n.is_finite().then_some(n)
}

// "1000" and "1000.0" both count; fractional or negative volumes do not.
fn parse_count(value: &Value) -> Option<u64> {
    if let Some(n) = value.as_u64() {
        return Some(n);
    }
    if let Value::String(s) = value {
        if let Ok(n) = s.trim().parse::<u64>() {
            return Some(n);
        }
    }
    let n = parse_number(value)?;
    (n >= 0.0 && n.fract() == 0.0 && n <= u64::MAX as f64).then_some(n as u64)
}

//! Close-price forecasting.
//!
//! The model is an opaque capability behind [`Forecaster`]: fit it on a
//! `(ds, y)` series, then ask for rows covering the history plus a horizon of
//! calendar days.

pub mod additive;
mod linalg;

use crate::domain::DailyBar;
use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;

pub use additive::{AdditiveConfig, AdditiveForecaster, AdditiveModel};

pub const FORECAST_HORIZON_DAYS: u32 = 90;

/// One observation in the two-column form the model fits on.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SeriesPoint {
    pub ds: NaiveDate,
    pub y: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastRow {
    pub ds: NaiveDate,
    pub yhat: f64,
    pub yhat_lower: f64,
    pub yhat_upper: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ForecastError {
    InsufficientData { points: usize },
    Degenerate(String),
    Numerical(String),
}

impl fmt::Display for ForecastError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InsufficientData { points } => write!(
                f,
                "Forecast failed: not enough price history to fit a model ({points} usable points)"
            ),
            Self::Degenerate(detail) => write!(f, "Forecast failed: degenerate price series: {detail}"),
            Self::Numerical(detail) => write!(f, "Forecast failed: {detail}"),
        }
    }
}

impl std::error::Error for ForecastError {}

pub trait Forecaster: Send + Sync {
    type Model: Send;

    fn fit(&self, series: &[SeriesPoint]) -> Result<Self::Model, ForecastError>;

    /// Rows for every fitted date followed by `horizon_days` calendar days.
    fn predict(&self, model: &Self::Model, horizon_days: u32)
        -> Result<Vec<ForecastRow>, ForecastError>;
}

/// `(date, close)` pairs for every bar that has a close.
pub fn close_series<'a>(bars: impl IntoIterator<Item = &'a DailyBar>) -> Vec<SeriesPoint> {
    bars.into_iter()
        .filter_map(|b| b.close.map(|y| SeriesPoint { ds: b.date, y }))
        .collect()
}

/// History dates followed by `periods` consecutive calendar days after the
/// last one. Weekends and holidays are not skipped.
pub fn make_future_dates(history: &[NaiveDate], periods: u32) -> Vec<NaiveDate> {
    let mut out = history.to_vec();
    if let Some(&last) = history.last() {
        out.extend((1..=i64::from(periods)).map(|d| last + Duration::days(d)));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn future_dates_extend_by_calendar_days() {
        let history = vec![d(2024, 1, 2), d(2024, 1, 3), d(2024, 1, 5)];
        let dates = make_future_dates(&history, 90);

        assert_eq!(dates.len(), 93);
        assert_eq!(&dates[..3], history.as_slice());
        assert_eq!(dates[3], d(2024, 1, 6));
        assert_eq!(*dates.last().unwrap(), d(2024, 1, 5) + Duration::days(90));
        assert!(dates[3..].windows(2).all(|w| w[1] - w[0] == Duration::days(1)));
    }

    #[test]
    fn future_dates_of_empty_history_is_empty() {
        assert!(make_future_dates(&[], 90).is_empty());
    }

    #[test]
    fn close_series_skips_missing_closes() {
        let bar = |date, close| DailyBar {
            date,
            open: None,
            high: None,
            low: None,
            close,
            adj_close: None,
            volume: None,
        };
        let bars = vec![
            bar(d(2024, 1, 2), Some(11.0)),
            bar(d(2024, 1, 3), None),
            bar(d(2024, 1, 4), Some(12.0)),
        ];

        let series = close_series(&bars);
        assert_eq!(
            series,
            vec![
                SeriesPoint { ds: d(2024, 1, 2), y: 11.0 },
                SeriesPoint { ds: d(2024, 1, 4), y: 12.0 },
            ]
        );
    }
}

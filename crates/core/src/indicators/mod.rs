//! Technical indicators appended to the normalized bars.

pub mod ema;
pub mod macd;
pub mod rsi;

use crate::domain::DailyBar;
use serde::{Deserialize, Serialize};

pub use ema::ema;
pub use macd::{macd, Macd};
pub use rsi::rsi;

pub const RSI_PERIOD: usize = 14;
pub const MACD_FAST: usize = 12;
pub const MACD_SLOW: usize = 26;
pub const MACD_SIGNAL: usize = 9;

/// A normalized bar plus its indicator columns. Column names follow the usual
/// `NAME_params` convention so the JSON matches common charting front ends.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AugmentedBar {
    #[serde(flatten)]
    pub bar: DailyBar,
    #[serde(rename = "RSI_14")]
    pub rsi_14: Option<f64>,
    #[serde(rename = "MACD_12_26_9")]
    pub macd: Option<f64>,
    #[serde(rename = "MACDh_12_26_9")]
    pub macd_histogram: Option<f64>,
    #[serde(rename = "MACDs_12_26_9")]
    pub macd_signal: Option<f64>,
}

/// Adds RSI(14) and MACD(12,26,9) computed on the close column. Row count and
/// order are preserved.
pub fn augment(bars: Vec<DailyBar>) -> Vec<AugmentedBar> {
    let closes: Vec<Option<f64>> = bars.iter().map(|b| b.close).collect();
    let rsi_14 = rsi(&closes, RSI_PERIOD);
    let Macd {
        line,
        signal,
        histogram,
    } = macd(&closes, MACD_FAST, MACD_SLOW, MACD_SIGNAL);

    bars.into_iter()
        .enumerate()
        .map(|(i, bar)| AugmentedBar {
            bar,
            rsi_14: rsi_14[i],
            macd: line[i],
            macd_histogram: histogram[i],
            macd_signal: signal[i],
        })
        .collect()
}

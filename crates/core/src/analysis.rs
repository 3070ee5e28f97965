use crate::domain::normalize;
use crate::forecast::{close_series, ForecastError, ForecastRow, Forecaster, FORECAST_HORIZON_DAYS};
use crate::indicators::{augment, AugmentedBar};
use crate::ingest::{FetchError, MarketDataProvider, RawTimeSeries};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::Future;

/// Response body of a successful analysis: both lists or nothing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisResponse {
    pub historical_data: Vec<AugmentedBar>,
    pub forecast_data: Vec<ForecastRow>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AnalysisError {
    Fetch(FetchError),
    Forecast(ForecastError),
}

impl fmt::Display for AnalysisError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fetch(e) => fmt::Display::fmt(e, f),
            Self::Forecast(e) => fmt::Display::fmt(e, f),
        }
    }
}

impl std::error::Error for AnalysisError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Fetch(e) => Some(e),
            Self::Forecast(e) => Some(e),
        }
    }
}

impl From<FetchError> for AnalysisError {
    fn from(e: FetchError) -> Self {
        Self::Fetch(e)
    }
}

impl From<ForecastError> for AnalysisError {
    fn from(e: ForecastError) -> Self {
        Self::Forecast(e)
    }
}

/// Normalize, add indicators, forecast the close and assemble the response.
/// CPU-bound; callers on an async runtime should run it on a blocking thread.
pub fn build_response<F: Forecaster>(
    forecaster: &F,
    raw: &RawTimeSeries,
) -> Result<AnalysisResponse, ForecastError> {
    let historical_data = augment(normalize(raw));

    let series = close_series(historical_data.iter().map(|row| &row.bar));
    let model = forecaster.fit(&series)?;
    let forecast_data = forecaster.predict(&model, FORECAST_HORIZON_DAYS)?;

    Ok(AnalysisResponse {
        historical_data,
        forecast_data,
    })
}

/// Full pipeline for one ticker, inline on the current task.
pub async fn analyze<F: Forecaster>(
    provider: &dyn MarketDataProvider,
    forecaster: &F,
    ticker: &str,
) -> Result<AnalysisResponse, AnalysisError> {
    analyze_with(provider, ticker, |raw| async move {
        build_response(forecaster, &raw).map_err(AnalysisError::from)
    })
    .await
}

/// Fetch the series, then hand it to `run` for the CPU-bound part of the
/// pipeline (normally [`build_response`], possibly on a blocking thread).
pub async fn analyze_with<R, Fut, E>(
    provider: &dyn MarketDataProvider,
    ticker: &str,
    run: R,
) -> Result<AnalysisResponse, E>
where
    R: FnOnce(RawTimeSeries) -> Fut,
    Fut: Future<Output = Result<AnalysisResponse, E>>,
    E: From<FetchError>,
{
    let raw = provider.fetch_daily_series(ticker).await?;
    let response = run(raw).await?;

    tracing::info!(
        %ticker,
        provider = provider.provider_name(),
        historical_rows = response.historical_data.len(),
        forecast_rows = response.forecast_data.len(),
        "analysis complete"
    );
    Ok(response)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forecast::AdditiveForecaster;
    use crate::ingest::provider::extract_time_series;
    use chrono::{Duration, NaiveDate};
    use serde_json::{json, Value};

    struct StubProvider(Result<RawTimeSeries, FetchError>);

    #[async_trait::async_trait]
    impl MarketDataProvider for StubProvider {
        fn provider_name(&self) -> &'static str {
            "stub"
        }

        async fn fetch_daily_series(&self, _ticker: &str) -> Result<RawTimeSeries, FetchError> {
            self.0.clone()
        }
    }

    fn raw_days(closes: &[f64]) -> RawTimeSeries {
        let start = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        let mut series = serde_json::Map::new();
        for (i, close) in closes.iter().enumerate() {
            let date = start + Duration::days(i as i64);
            series.insert(
                date.format("%Y-%m-%d").to_string(),
                json!({
                    "1. open": format!("{}", close - 0.5),
                    "2. high": format!("{}", close + 1.0),
                    "3. low": format!("{}", close - 1.0),
                    "4. close": format!("{close}"),
                    "5. adjusted close": format!("{close}"),
                    "6. volume": "1000",
                    "7. dividend amount": "0.0000",
                    "8. split coefficient": "1.0",
                }),
            );
        }
        extract_time_series("TEST", json!({ "Time Series (Daily)": series })).unwrap()
    }

    fn wavy(n: usize) -> Vec<f64> {
        (0..n)
            .map(|i| 100.0 + (i as f64 * 0.4).sin() * 4.0 + i as f64 * 0.05)
            .collect()
    }

    #[tokio::test]
    async fn returns_both_lists() {
        let provider = StubProvider(Ok(raw_days(&wavy(60))));
        let res = analyze(&provider, &AdditiveForecaster::default(), "TEST")
            .await
            .unwrap();

        assert_eq!(res.historical_data.len(), 60);
        assert_eq!(res.forecast_data.len(), 60 + 90);
        assert_eq!(
            res.forecast_data.last().unwrap().ds,
            res.historical_data.last().unwrap().bar.date + Duration::days(90)
        );
    }

    #[tokio::test]
    async fn envelope_serializes_without_nan_tokens() {
        let provider = StubProvider(Ok(raw_days(&wavy(40))));
        let res = analyze(&provider, &AdditiveForecaster::default(), "TEST")
            .await
            .unwrap();

        let v = serde_json::to_value(&res).unwrap();
        let hist = v["historical_data"].as_array().unwrap();
        assert_eq!(hist[0]["RSI_14"], Value::Null);
        assert_eq!(hist[0]["date"], json!("2024-01-02"));
        assert!(hist[0].get("7. dividend amount").is_none());
        assert!(hist[39]["MACDs_12_26_9"].is_number());

        let fc = v["forecast_data"].as_array().unwrap();
        let keys: Vec<_> = fc[0].as_object().unwrap().keys().cloned().collect();
        assert_eq!(keys.len(), 4);
        for key in ["ds", "yhat", "yhat_lower", "yhat_upper"] {
            assert!(fc[0].get(key).is_some(), "missing {key}");
        }

        let text = serde_json::to_string(&res).unwrap();
        assert!(!text.contains("NaN"));
    }

    #[tokio::test]
    async fn fetch_errors_pass_through() {
        let err = FetchError::NotFound {
            ticker: "NOPE".to_string(),
            detail: "Invalid API call.".to_string(),
        };
        let provider = StubProvider(Err(err.clone()));
        let res = analyze(&provider, &AdditiveForecaster::default(), "NOPE").await;
        assert_eq!(res.unwrap_err(), AnalysisError::Fetch(err));
    }

    #[tokio::test]
    async fn three_days_of_history_forecasts() {
        let provider = StubProvider(Ok(raw_days(&[11.0, 12.0, 11.5])));
        let res = analyze(&provider, &AdditiveForecaster::default(), "NEW")
            .await
            .unwrap();
        assert_eq!(res.historical_data.len(), 3);
        assert_eq!(res.forecast_data.len(), 93);
        assert!(res.historical_data.iter().all(|r| r.rsi_14.is_none()));
    }

    #[tokio::test]
    async fn degenerate_history_is_a_forecast_error() {
        let provider = StubProvider(Ok(raw_days(&[5.0; 20])));
        let res = analyze(&provider, &AdditiveForecaster::default(), "FLAT").await;
        assert!(matches!(res, Err(AnalysisError::Forecast(ForecastError::Degenerate(_)))));
    }

    #[tokio::test]
    async fn runner_receives_the_fetched_series() {
        let raw = raw_days(&wavy(30));
        let provider = StubProvider(Ok(raw.clone()));
        let res = analyze_with(&provider, "TEST", |got| async move {
            assert_eq!(got, raw);
            Ok::<_, AnalysisError>(build_response(&AdditiveForecaster::default(), &got)?)
        })
        .await
        .unwrap();
        assert_eq!(res.historical_data.len(), 30);
    }

    #[tokio::test]
    async fn fetch_failure_skips_the_runner() {
        let provider = StubProvider(Err(FetchError::Unavailable("connection refused".into())));
        let mut ran = false;
        let res = analyze_with(&provider, "TEST", |_| {
            ran = true;
            async {
                Ok::<_, AnalysisError>(AnalysisResponse {
                    historical_data: Vec::new(),
                    forecast_data: Vec::new(),
                })
            }
        })
        .await;
        assert!(!ran);
        assert!(matches!(res, Err(AnalysisError::Fetch(FetchError::Unavailable(_)))));
    }

    #[test]
    fn empty_series_is_insufficient() {
        let res = build_response(&AdditiveForecaster::default(), &RawTimeSeries::new());
        assert_eq!(res.unwrap_err(), ForecastError::InsufficientData { points: 0 });
    }
}

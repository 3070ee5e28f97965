use crate::config::Settings;
use crate::ingest::error::FetchError;
use crate::ingest::types::{RawTimeSeries, PROVIDER_MESSAGE_KEYS, TIME_SERIES_KEY};
use anyhow::Context;
use serde_json::Value;

const QUERY_PATH: &str = "/query";
const SERIES_FUNCTION: &str = "TIME_SERIES_DAILY_ADJUSTED";
const OUTPUT_SIZE: &str = "full";

#[async_trait::async_trait]
pub trait MarketDataProvider: Send + Sync {
    fn provider_name(&self) -> &'static str;

    async fn fetch_daily_series(&self, ticker: &str) -> Result<RawTimeSeries, FetchError>;
}

#[derive(Debug, Clone)]
pub struct AlphaVantageClient {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl AlphaVantageClient {
    pub fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = settings.alpha_vantage_timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder
            .build()
            .context("failed to build Alpha Vantage http client")?;

        if settings.alpha_vantage_api_key.is_none() {
            tracing::warn!("ALPHA_VANTAGE_API_KEY is not set; provider calls will be rejected");
        }

        Ok(Self {
            http,
            base_url: settings.alpha_vantage_base_url.clone(),
            api_key: settings.alpha_vantage_api_key.clone(),
        })
    }

    fn url(&self) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), QUERY_PATH)
    }

    async fn fetch_body(&self, ticker: &str) -> Result<Value, FetchError> {
        let mut query = vec![
            ("function", SERIES_FUNCTION),
            ("symbol", ticker),
            ("outputsize", OUTPUT_SIZE),
        ];
        if let Some(api_key) = self.api_key.as_deref() {
            query.push(("apikey", api_key));
        }

        // without_url keeps the api key out of error messages.
        let res = self
            .http
            .get(self.url())
            .query(&query)
            .send()
            .await
            .map_err(|e| FetchError::Unavailable(e.without_url().to_string()))?;

        let status = res.status();
        if !status.is_success() {
            return Err(FetchError::Unavailable(format!("provider HTTP {status}")));
        }

        let text = res
            .text()
            .await
            .map_err(|e| FetchError::Unavailable(e.without_url().to_string()))?;
        serde_json::from_str::<Value>(&text)
            .map_err(|e| FetchError::Unavailable(format!("provider response is not valid JSON: {e}")))
    }
}

#[async_trait::async_trait]
impl MarketDataProvider for AlphaVantageClient {
    fn provider_name(&self) -> &'static str {
        "alpha_vantage"
    }

    async fn fetch_daily_series(&self, ticker: &str) -> Result<RawTimeSeries, FetchError> {
        let body = self.fetch_body(ticker).await?;
        let series = extract_time_series(ticker, body)?;
        tracing::debug!(%ticker, days = series.len(), "fetched daily series");
        Ok(series)
    }
}

/// Pulls the daily series out of a provider body. Any other shape means the
/// provider had nothing for this ticker (bad symbol, bad key, quota note).
pub fn extract_time_series(ticker: &str, mut body: Value) -> Result<RawTimeSeries, FetchError> {
    let not_found = |detail: String| FetchError::NotFound {
        ticker: ticker.to_string(),
        detail,
    };

    let Some(series) = body.get_mut(TIME_SERIES_KEY).map(Value::take) else {
        let detail = PROVIDER_MESSAGE_KEYS
            .iter()
            .find_map(|k| body.get(*k).and_then(Value::as_str))
            .map(str::to_string)
            .unwrap_or_else(|| format!("response has no {TIME_SERIES_KEY:?} key"));
        return Err(not_found(detail));
    };

    serde_json::from_value::<RawTimeSeries>(series)
        .map_err(|e| not_found(format!("unexpected {TIME_SERIES_KEY:?} shape: {e}")))
}

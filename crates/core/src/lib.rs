pub mod analysis;
pub mod domain;
pub mod forecast;
pub mod indicators;
pub mod ingest;

pub mod config {
    use anyhow::Context;
    use std::time::Duration;

    pub const DEFAULT_ALPHA_VANTAGE_BASE_URL: &str = "https://www.alphavantage.co";

    #[derive(Debug, Clone)]
    pub struct Settings {
        pub alpha_vantage_api_key: Option<String>,
        pub alpha_vantage_base_url: String,
        pub alpha_vantage_timeout: Option<Duration>,
        pub sentry_dsn: Option<String>,
    }

    impl Settings {
        pub fn from_env() -> anyhow::Result<Self> {
            let alpha_vantage_timeout = match std::env::var("ALPHA_VANTAGE_TIMEOUT_SECS") {
                Ok(s) => Some(Duration::from_secs(s.trim().parse::<u64>().with_context(
                    || format!("ALPHA_VANTAGE_TIMEOUT_SECS must be an integer (got {s:?})"),
                )?)),
                Err(_) => None,
            };

            Ok(Self {
                alpha_vantage_api_key: std::env::var("ALPHA_VANTAGE_API_KEY").ok(),
                alpha_vantage_base_url: std::env::var("ALPHA_VANTAGE_BASE_URL")
                    .ok()
                    .filter(|s| !s.trim().is_empty())
                    .unwrap_or_else(|| DEFAULT_ALPHA_VANTAGE_BASE_URL.to_string()),
                alpha_vantage_timeout,
                sentry_dsn: std::env::var("SENTRY_DSN").ok(),
            })
        }
    }
}

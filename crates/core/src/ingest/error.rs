use std::fmt;

/// Why the data fetcher could not hand back a daily time series.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    /// Transport failure, timeout, non-2xx status or an unreadable body.
    Unavailable(String),
    /// The provider answered, but not with a daily series for this ticker.
    NotFound { ticker: String, detail: String },
}

impl FetchError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unavailable(detail) => {
                write!(f, "Error fetching data from provider: {detail}")
            }
            Self::NotFound { ticker, .. } => write!(
                f,
                "Could not find data for ticker: {ticker}. Invalid ticker or API issue."
            ),
        }
    }
}

impl std::error::Error for FetchError {}

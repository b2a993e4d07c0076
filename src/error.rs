use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("rate limited by data source")]
    RateLimited,

    #[error("data source returned HTTP {status} for {ticker}")]
    Upstream { ticker: String, status: u16 },

    #[error("failed to fetch market cap for {ticker}: {reason}")]
    Fetch { ticker: String, reason: String },

    #[error("email delivery failed ({status}): {body}")]
    Delivery { status: u16, body: String },

    #[error("chart rendering failed: {0}")]
    Chart(String),

    #[error("no data rows in history")]
    EmptyHistory,
}

impl From<toml::de::Error> for Error {
    fn from(value: toml::de::Error) -> Self {
        Error::Config(value.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;

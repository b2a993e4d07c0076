use rand::Rng;
use serde::Deserialize;
use std::cell::RefCell;
use std::thread;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::config::FetchConfig;
use crate::error::{Error, Result};

/// Anything that can report a current market capitalization for a ticker.
pub trait MarketCapSource {
    fn market_cap(&self, ticker: &str) -> Result<f64>;
}

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub base_delay: Duration,
}

impl RetryPolicy {
    pub fn from_config(config: &FetchConfig) -> Self {
        RetryPolicy {
            attempts: config.retries.max(1),
            base_delay: Duration::from_millis(config.retry_delay_ms),
        }
    }

    /// Exponential backoff with up to 50% random jitter.
    fn delay_for(&self, attempt: u32) -> Duration {
        let base = (self.base_delay.as_millis() as u64)
            .saturating_mul(2u64.saturating_pow(attempt.saturating_sub(1)));
        let jitter = rand::thread_rng().gen_range(0..=base / 2);
        Duration::from_millis(base + jitter)
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Yahoo Finance quote endpoint
// ═══════════════════════════════════════════════════════════════════════

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QuoteEnvelope {
    quote_response: QuoteResponse,
}

#[derive(Debug, Deserialize)]
struct QuoteResponse {
    #[serde(default)]
    result: Vec<Quote>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Quote {
    pub symbol: String,
    pub market_cap: Option<f64>,
    pub regular_market_price: Option<f64>,
    pub shares_outstanding: Option<f64>,
}

impl Quote {
    /// Reported market cap, else price times shares outstanding.
    pub fn effective_market_cap(&self) -> Option<f64> {
        let cap = self.market_cap.or_else(|| {
            match (self.regular_market_price, self.shares_outstanding) {
                (Some(price), Some(shares)) => Some(price * shares),
                _ => None,
            }
        })?;
        (cap.is_finite() && cap > 0.0).then_some(cap)
    }
}

/// Yahoo quote client. The quote endpoint wants a crumb tied to a session
/// cookie, so the first request performs the handshake and later ones reuse it.
pub struct YahooQuoteSource {
    client: reqwest::blocking::Client,
    base_url: String,
    cookie_url: String,
    crumb: RefCell<Option<String>>,
}

impl YahooQuoteSource {
    pub fn new(config: &FetchConfig) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(config.timeout())
            .cookie_store(true)
            .user_agent(concat!("Mozilla/5.0 (compatible; wager-tracker/", env!("CARGO_PKG_VERSION"), ")"))
            .build()?;
        Ok(YahooQuoteSource {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            cookie_url: config.cookie_url.clone(),
            crumb: RefCell::new(None),
        })
    }

    fn fetch_crumb(&self, ticker: &str) -> Result<String> {
        // The cookie page answers 404 but still sets the cookie.
        let _ = self.client.get(&self.cookie_url).send()?;

        let resp = self
            .client
            .get(format!("{}/v1/test/getcrumb", self.base_url))
            .send()?;
        let status = resp.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(Error::RateLimited);
        }
        if !status.is_success() {
            return Err(Error::Upstream {
                ticker: ticker.to_string(),
                status: status.as_u16(),
            });
        }

        let crumb = resp.text()?.trim().to_string();
        if crumb.is_empty() || crumb.contains('<') {
            return Err(Error::Fetch {
                ticker: ticker.to_string(),
                reason: "no crumb in handshake response".into(),
            });
        }
        debug!("obtained quote crumb");
        Ok(crumb)
    }

    fn crumb(&self, ticker: &str) -> Result<String> {
        if let Some(crumb) = self.crumb.borrow().as_ref() {
            return Ok(crumb.clone());
        }
        let crumb = self.fetch_crumb(ticker)?;
        *self.crumb.borrow_mut() = Some(crumb.clone());
        Ok(crumb)
    }

    fn request(&self, ticker: &str, crumb: &str) -> Result<reqwest::blocking::Response> {
        let url = quote_url(&self.base_url, ticker, Some(crumb))?;
        debug!(%url, "requesting quote");
        Ok(self.client.get(url).send()?)
    }
}

/// Quote endpoint URL for `ticker`, with the crumb when one is known.
pub fn quote_url(base_url: &str, ticker: &str, crumb: Option<&str>) -> Result<reqwest::Url> {
    let endpoint = format!("{}/v7/finance/quote", base_url.trim_end_matches('/'));
    let mut params = vec![("symbols", ticker)];
    if let Some(crumb) = crumb {
        params.push(("crumb", crumb));
    }
    reqwest::Url::parse_with_params(&endpoint, &params)
        .map_err(|e| Error::Config(format!("invalid quote url '{}': {}", endpoint, e)))
}

/// Pull the market cap for `ticker` out of a quote response body.
pub fn parse_quote_body(ticker: &str, body: &str) -> Result<f64> {
    let envelope: QuoteEnvelope = serde_json::from_str(body).map_err(|e| Error::Fetch {
        ticker: ticker.to_string(),
        reason: format!("unexpected response: {}", e),
    })?;

    let quote = envelope
        .quote_response
        .result
        .into_iter()
        .find(|q| q.symbol.eq_ignore_ascii_case(ticker))
        .ok_or_else(|| Error::Fetch {
            ticker: ticker.to_string(),
            reason: "ticker missing from response".into(),
        })?;

    quote.effective_market_cap().ok_or_else(|| Error::Fetch {
        ticker: ticker.to_string(),
        reason: "no market cap or price/shares in quote".into(),
    })
}

impl MarketCapSource for YahooQuoteSource {
    fn market_cap(&self, ticker: &str) -> Result<f64> {
        let mut resp = self.request(ticker, &self.crumb(ticker)?)?;

        // stale crumb: redo the handshake once
        if resp.status() == reqwest::StatusCode::UNAUTHORIZED {
            warn!(ticker, "quote crumb rejected, refreshing");
            self.crumb.borrow_mut().take();
            resp = self.request(ticker, &self.crumb(ticker)?)?;
        }

        let status = resp.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(Error::RateLimited);
        }
        if !status.is_success() {
            return Err(Error::Upstream {
                ticker: ticker.to_string(),
                status: status.as_u16(),
            });
        }

        parse_quote_body(ticker, &resp.text()?)
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Retry helpers
// ═══════════════════════════════════════════════════════════════════════

/// Network failures, rate limiting and server-side errors. Client errors and
/// unusable payloads fail the same way on every attempt.
pub fn is_transient(err: &Error) -> bool {
    match err {
        Error::Http(_) | Error::RateLimited => true,
        Error::Upstream { status, .. } => *status >= 500,
        _ => false,
    }
}

pub fn fetch_with_retry<S: MarketCapSource + ?Sized>(
    source: &S,
    ticker: &str,
    policy: RetryPolicy,
) -> Result<f64> {
    let attempts = policy.attempts.max(1);
    let mut attempt = 1;

    loop {
        match source.market_cap(ticker) {
            Ok(cap) => return Ok(cap),
            Err(e) if attempt < attempts && is_transient(&e) => {
                let delay = policy.delay_for(attempt);
                warn!(ticker, attempt, error = %e, ?delay, "market cap fetch failed, retrying");
                thread::sleep(delay);
                attempt += 1;
            }
            Err(e @ Error::Fetch { .. }) => return Err(e),
            Err(other) => {
                return Err(Error::Fetch {
                    ticker: ticker.to_string(),
                    reason: other.to_string(),
                })
            }
        }
    }
}

/// Fetch both sides. Either both values come back or the call fails.
pub fn fetch_pair<S: MarketCapSource + ?Sized>(
    source: &S,
    ticker_a: &str,
    ticker_b: &str,
    policy: RetryPolicy,
) -> Result<(f64, f64)> {
    let a = fetch_with_retry(source, ticker_a, policy)?;
    let b = fetch_with_retry(source, ticker_b, policy)?;
    info!(ticker_a, value_a = a, ticker_b, value_b = b, "fetched market caps");
    Ok((a, b))
}

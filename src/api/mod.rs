use anyhow::Result;
use std::time::Duration;

use crate::models::{SnapshotPatch, SymbolPatch};

pub mod yahoo_client;
pub use yahoo_client::YahooClient;

/// Best-effort facts for one symbol from the external market-data
/// provider. Every field is optional: absence means the provider did not
/// have a usable value, never an error.
#[derive(Debug, Clone, Default)]
pub struct ProviderSnapshot {
    pub price: Option<f64>,
    pub trailing_eps: Option<f64>,
    pub symbol_patch: SymbolPatch,
    pub snapshot_patch: SnapshotPatch,
}

/// Boundary abstraction over the market-data source. One lookup returns
/// whatever subset of price, trailing EPS and fundamentals the provider
/// can supply; there is no availability guarantee.
#[async_trait::async_trait]
pub trait QuoteProvider: Send + Sync {
    async fn fetch_snapshot(&self, symbol: &str) -> Result<ProviderSnapshot>;
}

/// Simple rate limiter for provider requests.
pub struct ApiRateLimiter {
    delay_ms: u64,
}

impl ApiRateLimiter {
    pub fn new(requests_per_minute: u32) -> Self {
        let delay_ms = if requests_per_minute > 0 {
            60_000 / requests_per_minute as u64
        } else {
            1000 // Default 1 second delay
        };

        Self { delay_ms }
    }

    pub async fn wait(&self) {
        tokio::time::sleep(Duration::from_millis(self.delay_ms)).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_rate_limiter_delay() {
        let limiter = ApiRateLimiter::new(1200); // 50ms between requests

        let start = std::time::Instant::now();
        limiter.wait().await;
        limiter.wait().await;
        assert!(start.elapsed() >= Duration::from_millis(100));
    }
}

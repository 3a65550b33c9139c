use anyhow::{anyhow, Result};
use reqwest::Client;
use serde_json::Value;
use tracing::debug;
use url::Url;

use super::{ApiRateLimiter, ProviderSnapshot, QuoteProvider};
use crate::models::{SnapshotPatch, SymbolPatch};

/// HTTP adapter over a Yahoo-shaped quote API.
///
/// The provider-specific field mapping (which JSON paths feed which
/// fundamentals) lives entirely in this file; the rest of the service only
/// sees `ProviderSnapshot`.
pub struct YahooClient {
    client: Client,
    base_url: String,
    rate_limiter: ApiRateLimiter,
}

impl YahooClient {
    pub fn new(base_url: &str, rate_limit_per_minute: u32) -> Result<Self> {
        // Validate early so a bad PROVIDER_BASE_URL fails at startup, not
        // on the first refresh.
        Url::parse(base_url)?;

        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .user_agent("screener-api/0.1")
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            rate_limiter: ApiRateLimiter::new(rate_limit_per_minute),
        })
    }

    async fn make_request(&self, url: &str) -> Result<Value> {
        self.rate_limiter.wait().await;

        debug!("Making request to: {}", url);

        let response = self.client.get(url).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(anyhow!(
                "provider request failed with status {}: {}",
                status,
                error_text
            ));
        }

        let json: Value = response.json().await?;
        Ok(json)
    }

    /// One-day chart data; carries the fast last-price field and the
    /// daily closes used as fallback.
    async fn fetch_chart(&self, symbol: &str) -> Result<Value> {
        let url = format!(
            "{}/v8/finance/chart/{}?range=1d&interval=1d",
            self.base_url, symbol
        );
        self.make_request(&url).await
    }

    /// Quote-summary modules holding trailing EPS and the fundamentals
    /// fields.
    async fn fetch_summary(&self, symbol: &str) -> Result<Value> {
        let url = format!(
            "{}/v10/finance/quoteSummary/{}?modules=price,summaryProfile,defaultKeyStatistics,financialData,balanceSheetHistory",
            self.base_url, symbol
        );
        self.make_request(&url).await
    }
}

#[async_trait::async_trait]
impl QuoteProvider for YahooClient {
    async fn fetch_snapshot(&self, symbol: &str) -> Result<ProviderSnapshot> {
        let mut snapshot = ProviderSnapshot::default();

        match self.fetch_chart(symbol).await {
            Ok(chart) => snapshot.price = price_from_chart(&chart),
            Err(e) => debug!("chart lookup failed for {}: {}", symbol, e),
        }

        match self.fetch_summary(symbol).await {
            Ok(summary) => {
                let (eps, symbol_patch, snapshot_patch) = facts_from_summary(&summary);
                snapshot.trailing_eps = eps;
                snapshot.symbol_patch = symbol_patch;
                snapshot.snapshot_patch = snapshot_patch;
            }
            Err(e) => debug!("summary lookup failed for {}: {}", symbol, e),
        }

        Ok(snapshot)
    }
}

/// Accept a bare JSON number or Yahoo's `{ "raw": n, "fmt": "..." }` shape.
fn raw_num(value: Option<&Value>) -> Option<f64> {
    let value = value?;
    let n = match value {
        Value::Object(_) => value.get("raw")?.as_f64()?,
        _ => value.as_f64()?,
    };
    n.is_finite().then_some(n)
}

fn non_empty_str(value: Option<&Value>) -> Option<String> {
    let s = value?.as_str()?.trim();
    (!s.is_empty()).then(|| s.to_string())
}

/// Current price: prefer the fast `regularMarketPrice` field from the
/// chart metadata, fall back to the latest non-null daily close.
fn price_from_chart(data: &Value) -> Option<f64> {
    let result = data
        .get("chart")
        .and_then(|c| c.get("result"))
        .and_then(|r| r.get(0))?;

    if let Some(p) = raw_num(result.get("meta").and_then(|m| m.get("regularMarketPrice"))) {
        return Some(p);
    }

    result
        .get("indicators")
        .and_then(|i| i.get("quote"))
        .and_then(|q| q.get(0))
        .and_then(|q| q.get("close"))
        .and_then(|c| c.as_array())
        .and_then(|closes| closes.iter().rev().find_map(|v| raw_num(Some(v))))
}

/// Trailing EPS plus the fundamentals merge-patches. Every field is
/// extracted independently; a missing or wrongly-typed field is simply
/// absent from the patch.
fn facts_from_summary(data: &Value) -> (Option<f64>, SymbolPatch, SnapshotPatch) {
    let result = data
        .get("quoteSummary")
        .and_then(|q| q.get("result"))
        .and_then(|r| r.get(0));

    let Some(result) = result else {
        return (None, SymbolPatch::default(), SnapshotPatch::default());
    };

    let key_stats = result.get("defaultKeyStatistics");
    let financial = result.get("financialData");
    let profile = result.get("summaryProfile");
    let price = result.get("price");
    let balance = result
        .get("balanceSheetHistory")
        .and_then(|b| b.get("balanceSheetStatements"))
        .and_then(|s| s.get(0));

    let trailing_eps = raw_num(key_stats.and_then(|k| k.get("trailingEps")));

    let symbol_patch = SymbolPatch {
        name: non_empty_str(price.and_then(|p| p.get("longName")))
            .or_else(|| non_empty_str(price.and_then(|p| p.get("shortName")))),
        exchange: non_empty_str(price.and_then(|p| p.get("exchangeName"))),
        sector: non_empty_str(profile.and_then(|p| p.get("sector"))),
        industry: non_empty_str(profile.and_then(|p| p.get("industry"))),
        shares_out: raw_num(key_stats.and_then(|k| k.get("sharesOutstanding"))),
    };

    // Total debt can be missing; fall back to summing the long-term and
    // short/long-term components from the balance sheet.
    let debt = raw_num(financial.and_then(|f| f.get("totalDebt"))).or_else(|| {
        let long = raw_num(balance.and_then(|b| b.get("longTermDebt")));
        let short = raw_num(balance.and_then(|b| b.get("shortLongTermDebt")));
        match (long, short) {
            (None, None) => None,
            (l, s) => Some(l.unwrap_or(0.0) + s.unwrap_or(0.0)),
        }
    });

    let snapshot_patch = SnapshotPatch {
        asof: None, // stamped by the orchestrator
        ebitda_ttm: raw_num(financial.and_then(|f| f.get("ebitda"))),
        book_ttm: raw_num(balance.and_then(|b| b.get("totalStockholderEquity"))),
        debt,
        cash: raw_num(financial.and_then(|f| f.get("totalCash"))),
    };

    (trailing_eps, symbol_patch, snapshot_patch)
}

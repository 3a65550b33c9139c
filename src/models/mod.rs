use serde::{Deserialize, Serialize};

/// Identity and static metadata for a ticker symbol.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SymbolRecord {
    pub symbol: String,
    pub name: String,
    pub exchange: Option<String>,
    pub sector: Option<String>,
    pub industry: Option<String>,
    pub shares_out: Option<f64>,
}

/// Point-in-time fundamentals used for screening. At most one row per
/// symbol; numeric fields are independently nullable and ROIC is stored
/// as given, never recomputed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FactorSnapshot {
    pub symbol: String,
    pub asof: Option<String>,
    pub ttm_eps: Option<f64>,
    pub ebitda_ttm: Option<f64>,
    pub book_ttm: Option<f64>,
    pub invested_capital_ttm: Option<f64>,
    pub nopat_ttm: Option<f64>,
    pub roic: Option<f64>,
    pub debt: Option<f64>,
    pub cash: Option<f64>,
}

/// Cached last price with its refresh timestamp (unix seconds).
#[derive(Debug, Clone)]
pub struct PriceCacheEntry {
    pub symbol: String,
    pub price: f64,
    pub ts: Option<i64>,
}

/// Cached trailing-twelve-month EPS with its refresh timestamp.
#[derive(Debug, Clone)]
pub struct EpsCacheEntry {
    pub symbol: String,
    pub eps: f64,
    pub ts: Option<i64>,
}

/// Merge-patch for a symbol's identity row: only non-null fields are
/// applied over the stored record.
#[derive(Debug, Clone, Default)]
pub struct SymbolPatch {
    pub name: Option<String>,
    pub exchange: Option<String>,
    pub sector: Option<String>,
    pub industry: Option<String>,
    pub shares_out: Option<f64>,
}

impl SymbolPatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.exchange.is_none()
            && self.sector.is_none()
            && self.industry.is_none()
            && self.shares_out.is_none()
    }
}

/// Merge-patch for the factor snapshot fields a provider refresh can
/// touch. Screening-only factors (ROIC, NOPAT, invested capital) come
/// from seed data and are never patched here.
#[derive(Debug, Clone, Default)]
pub struct SnapshotPatch {
    pub asof: Option<String>,
    pub ebitda_ttm: Option<f64>,
    pub book_ttm: Option<f64>,
    pub debt: Option<f64>,
    pub cash: Option<f64>,
}

impl SnapshotPatch {
    pub fn is_empty(&self) -> bool {
        self.ebitda_ttm.is_none()
            && self.book_ttm.is_none()
            && self.debt.is_none()
            && self.cash.is_none()
    }
}

/// Filters for the screening read-model.
#[derive(Debug, Clone, Default)]
pub struct ScreenerFilter {
    /// Explicit symbol list; when set, every listed symbol appears in the
    /// result even without store rows.
    pub symbols: Option<Vec<String>>,
    /// Inclusive minimum ROIC; only applied when positive.
    pub roic_min: Option<f64>,
    /// Sector substring; rows with a NULL sector always pass.
    pub sector: Option<String>,
    /// Restrict to snapshots with positive trailing EPS.
    pub positive_eps: bool,
    pub limit: i64,
    pub offset: i64,
}

/// One screening result row: identity metadata joined with the latest
/// factor snapshot (factor fields NULL when no snapshot exists).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScreenerRow {
    pub symbol: String,
    pub name: String,
    pub roic: Option<f64>,
    pub ttm_eps: Option<f64>,
    pub ebitda_ttm: Option<f64>,
    pub book_ttm: Option<f64>,
    pub shares_out: Option<f64>,
    pub debt: Option<f64>,
    pub cash: Option<f64>,
    pub sector: Option<String>,
}

/// Merged fundamentals view returned by the price/fundamentals endpoints.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FundamentalsRow {
    pub symbol: String,
    pub name: String,
    pub sector: Option<String>,
    pub shares_out: Option<f64>,
    pub ttm_eps: Option<f64>,
    pub ebitda_ttm: Option<f64>,
    pub book_ttm: Option<f64>,
    pub debt: Option<f64>,
    pub cash: Option<f64>,
}

/// Configuration for the service.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_path: String,
    pub universe_dir: String,
    pub bind_addr: String,
    pub provider_base_url: String,
    pub rate_limit_per_minute: u32,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok(); // Load .env file if it exists

        Ok(Config {
            database_path: std::env::var("DATABASE_PATH")
                .unwrap_or_else(|_| "data/screener.db".to_string()),
            universe_dir: std::env::var("UNIVERSE_DIR")
                .unwrap_or_else(|_| "data/universe".to_string()),
            bind_addr: std::env::var("BIND_ADDR")
                .unwrap_or_else(|_| "127.0.0.1:8000".to_string()),
            provider_base_url: std::env::var("PROVIDER_BASE_URL")
                .unwrap_or_else(|_| "https://query1.finance.yahoo.com".to_string()),
            rate_limit_per_minute: std::env::var("RATE_LIMIT_PER_MINUTE")
                .unwrap_or_else(|_| "120".to_string())
                .parse()
                .unwrap_or(120),
        })
    }
}

/// Normalize a comma-separated symbol list: trim, uppercase, drop empties.
pub fn parse_symbol_csv(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_uppercase())
        .filter(|s| !s.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_symbol_csv() {
        assert_eq!(
            parse_symbol_csv(" aapl, MSFT ,,nvda "),
            vec!["AAPL", "MSFT", "NVDA"]
        );
        assert!(parse_symbol_csv("").is_empty());
        assert!(parse_symbol_csv(" , ,").is_empty());
    }

    #[test]
    fn test_patch_is_empty() {
        assert!(SymbolPatch::default().is_empty());
        let patch = SymbolPatch {
            sector: Some("Technology".to_string()),
            ..Default::default()
        };
        assert!(!patch.is_empty());
    }
}

use anyhow::Result;
use chrono::Utc;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use tracing::debug;

use crate::api::QuoteProvider;
use crate::database::Database;
use crate::models::FundamentalsRow;

/// A cached price older than this is stale.
pub const PRICE_MAX_AGE_SECS: i64 = 60;
/// A cached trailing EPS older than this is stale.
pub const EPS_MAX_AGE_SECS: i64 = 6 * 3600;

/// Live quote view for a set of symbols: cached-or-refreshed prices and
/// trailing EPS, the derived P/E map, and merged fundamentals. Symbols the
/// provider could not serve are simply absent from the maps.
#[derive(Debug, Clone)]
pub struct LiveQuotes {
    pub prices: HashMap<String, f64>,
    pub trailing_eps: HashMap<String, f64>,
    pub pe_live: HashMap<String, f64>,
    pub fundamentals: HashMap<String, FundamentalsRow>,
    pub asof: i64,
}

/// Result of a forced fundamentals refresh.
#[derive(Debug, Clone)]
pub struct FundamentalsReport {
    pub items: HashMap<String, FundamentalsRow>,
    pub asof: i64,
}

/// Read-through cache over the store and the external provider.
///
/// Reads serve fresh cached facts directly; stale or missing facts trigger
/// one provider lookup per distinct symbol, and whatever subset of facts
/// comes back is persisted. Provider failures are swallowed per symbol;
/// the next request retries naturally because the cache stays stale.
pub struct LiveQuoteService {
    db: Database,
    provider: Arc<dyn QuoteProvider>,
}

impl LiveQuoteService {
    pub fn new(db: Database, provider: Arc<dyn QuoteProvider>) -> Self {
        Self { db, provider }
    }

    /// Prices, trailing EPS and live P/E for the requested symbols.
    pub async fn live_quotes(&self, symbols: &[String]) -> Result<LiveQuotes> {
        let now = Utc::now().timestamp();

        // Serve whatever is fresh straight from the store.
        let mut prices: HashMap<String, f64> = HashMap::new();
        for s in symbols {
            if let Some(entry) = self.db.get_last_price(s).await? {
                if is_fresh(entry.ts, now, PRICE_MAX_AGE_SECS) {
                    prices.insert(s.clone(), entry.price);
                }
            }
        }

        let mut trailing_eps: HashMap<String, f64> = HashMap::new();
        for s in symbols {
            if let Some(entry) = self.db.get_trailing_eps(s).await? {
                if is_fresh(entry.ts, now, EPS_MAX_AGE_SECS) {
                    trailing_eps.insert(s.clone(), entry.eps);
                }
            }
        }

        let need_price: BTreeSet<&String> =
            symbols.iter().filter(|s| !prices.contains_key(*s)).collect();
        let need_eps: BTreeSet<&String> = symbols
            .iter()
            .filter(|s| !trailing_eps.contains_key(*s))
            .collect();

        // One combined lookup per distinct stale symbol.
        let need: BTreeSet<&String> = need_price.union(&need_eps).copied().collect();
        for s in need {
            let snapshot = match self.provider.fetch_snapshot(s).await {
                Ok(snapshot) => snapshot,
                Err(e) => {
                    debug!("provider lookup failed for {}: {}", s, e);
                    continue;
                }
            };

            if need_price.contains(s) {
                if let Some(price) = snapshot.price {
                    self.db.put_last_price(s, price, now).await?;
                    prices.insert(s.clone(), price);
                }
            }

            if need_eps.contains(s) {
                if let Some(eps) = snapshot.trailing_eps {
                    self.db.put_trailing_eps(s, eps, now).await?;
                    trailing_eps.insert(s.clone(), eps);
                }
            }

            // Best-effort enrichment, independent of the price/EPS outcome.
            self.apply_fundamentals(s, &snapshot).await?;
        }

        let pe_live = compose_pe(&prices, &trailing_eps);

        let mut fundamentals = HashMap::new();
        for s in symbols {
            fundamentals.insert(s.clone(), self.db.fundamentals_row(s).await?);
        }

        Ok(LiveQuotes {
            prices,
            trailing_eps,
            pe_live,
            fundamentals,
            asof: now,
        })
    }

    /// Force a fundamentals refresh for every requested symbol, ignoring
    /// cache freshness, and return the merged store values.
    pub async fn refresh_fundamentals(&self, symbols: &[String]) -> Result<FundamentalsReport> {
        let now = Utc::now().timestamp();

        let distinct: BTreeSet<&String> = symbols.iter().collect();
        for s in distinct {
            match self.provider.fetch_snapshot(s).await {
                Ok(snapshot) => self.apply_fundamentals(s, &snapshot).await?,
                Err(e) => debug!("fundamentals lookup failed for {}: {}", s, e),
            }
        }

        let mut items = HashMap::new();
        for s in symbols {
            items.insert(s.clone(), self.db.fundamentals_row(s).await?);
        }

        Ok(FundamentalsReport { items, asof: now })
    }

    /// Merge-patch the identity row and factor snapshot from a provider
    /// snapshot. Null fields preserve stored values; nothing is written
    /// when the provider supplied no fundamentals at all.
    async fn apply_fundamentals(
        &self,
        symbol: &str,
        snapshot: &crate::api::ProviderSnapshot,
    ) -> Result<()> {
        if !snapshot.symbol_patch.is_empty() {
            self.db.merge_symbol(symbol, &snapshot.symbol_patch).await?;
        }
        if !snapshot.snapshot_patch.is_empty() {
            let mut patch = snapshot.snapshot_patch.clone();
            patch.asof = Some(Utc::now().date_naive().to_string());
            self.db.merge_snapshot(symbol, &patch).await?;
        }
        Ok(())
    }
}

/// Freshness predicate: a cached fact with no timestamp counts as stale.
fn is_fresh(ts: Option<i64>, now: i64, max_age_secs: i64) -> bool {
    now - ts.unwrap_or(0) < max_age_secs
}

/// Derived valuation ratio: `price / eps` for every symbol holding both a
/// price and a nonzero EPS; everything else is omitted, never reported as
/// zero or error.
pub fn compose_pe(
    prices: &HashMap<String, f64>,
    trailing_eps: &HashMap<String, f64>,
) -> HashMap<String, f64> {
    let mut pe = HashMap::new();
    for (symbol, price) in prices {
        if let Some(eps) = trailing_eps.get(symbol) {
            if *eps != 0.0 {
                pe.insert(symbol.clone(), price / eps);
            }
        }
    }
    pe
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map(entries: &[(&str, f64)]) -> HashMap<String, f64> {
        entries.iter().map(|(s, v)| (s.to_string(), *v)).collect()
    }

    #[test]
    fn test_compose_pe() {
        let prices = map(&[("AAPL", 150.0), ("MSFT", 300.0), ("ZERO", 10.0)]);
        let eps = map(&[("AAPL", 6.0), ("ZERO", 0.0), ("NOPRICE", 5.0)]);

        let pe = compose_pe(&prices, &eps);
        assert_eq!(pe.get("AAPL"), Some(&25.0));
        // zero EPS and one-sided symbols are omitted
        assert!(!pe.contains_key("ZERO"));
        assert!(!pe.contains_key("MSFT"));
        assert!(!pe.contains_key("NOPRICE"));
    }

    #[test]
    fn test_compose_pe_negative_eps() {
        let pe = compose_pe(&map(&[("X", 100.0)]), &map(&[("X", -4.0)]));
        assert_eq!(pe.get("X"), Some(&-25.0));
    }

    #[test]
    fn test_freshness_windows() {
        let now = 1_700_000_000;
        assert!(is_fresh(Some(now - 59), now, PRICE_MAX_AGE_SECS));
        assert!(!is_fresh(Some(now - 60), now, PRICE_MAX_AGE_SECS));
        assert!(is_fresh(Some(now - 21_599), now, EPS_MAX_AGE_SECS));
        assert!(!is_fresh(Some(now - 21_600), now, EPS_MAX_AGE_SECS));
        // missing timestamp is always stale
        assert!(!is_fresh(None, now, PRICE_MAX_AGE_SECS));
    }
}

//! Shared fixtures for integration tests: a seeded in-memory store and a
//! scripted provider that records its lookups.

#![allow(dead_code)]

use anyhow::{anyhow, Result};
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use screener_api::api::{ProviderSnapshot, QuoteProvider};
use screener_api::database::Database;
use screener_api::models::{FactorSnapshot, SnapshotPatch, SymbolPatch, SymbolRecord};

/// Provider double: serves canned snapshots and records every lookup.
#[derive(Default)]
pub struct ScriptedProvider {
    snapshots: HashMap<String, ProviderSnapshot>,
    failing: HashSet<String>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_snapshot(mut self, symbol: &str, snapshot: ProviderSnapshot) -> Self {
        self.snapshots.insert(symbol.to_string(), snapshot);
        self
    }

    pub fn with_quote(self, symbol: &str, price: f64, eps: f64) -> Self {
        self.with_snapshot(
            symbol,
            ProviderSnapshot {
                price: Some(price),
                trailing_eps: Some(eps),
                ..Default::default()
            },
        )
    }

    pub fn with_failure(mut self, symbol: &str) -> Self {
        self.failing.insert(symbol.to_string());
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_for(&self, symbol: &str) -> usize {
        self.calls().iter().filter(|s| *s == symbol).count()
    }
}

#[async_trait::async_trait]
impl QuoteProvider for ScriptedProvider {
    async fn fetch_snapshot(&self, symbol: &str) -> Result<ProviderSnapshot> {
        self.calls.lock().unwrap().push(symbol.to_string());

        if self.failing.contains(symbol) {
            return Err(anyhow!("provider unavailable"));
        }
        Ok(self.snapshots.get(symbol).cloned().unwrap_or_default())
    }
}

pub fn symbol_record(symbol: &str, name: &str, sector: Option<&str>) -> SymbolRecord {
    SymbolRecord {
        symbol: symbol.to_string(),
        name: name.to_string(),
        exchange: Some("NASDAQ".to_string()),
        sector: sector.map(|s| s.to_string()),
        industry: None,
        shares_out: Some(1_000_000_000.0),
    }
}

pub fn snapshot(symbol: &str, roic: Option<f64>, ttm_eps: Option<f64>) -> FactorSnapshot {
    FactorSnapshot {
        symbol: symbol.to_string(),
        asof: Some("2025-09-30".to_string()),
        ttm_eps,
        ebitda_ttm: Some(1.0e9),
        book_ttm: Some(5.0e8),
        invested_capital_ttm: None,
        nopat_ttm: None,
        roic,
        debt: Some(2.0e8),
        cash: Some(3.0e8),
    }
}

pub fn fundamentals_patch(sector: Option<&str>, name: Option<&str>) -> (SymbolPatch, SnapshotPatch) {
    (
        SymbolPatch {
            name: name.map(|s| s.to_string()),
            sector: sector.map(|s| s.to_string()),
            shares_out: Some(2_000_000_000.0),
            ..Default::default()
        },
        SnapshotPatch {
            asof: None,
            ebitda_ttm: Some(4.0e9),
            book_ttm: None,
            debt: Some(1.0e9),
            cash: Some(5.0e8),
        },
    )
}

/// Store with the three seed symbols plus rows exercising null ROIC,
/// null sector and non-positive EPS.
pub async fn seeded_db() -> Database {
    let db = Database::connect_in_memory().await.unwrap();

    db.upsert_symbol(&symbol_record("AAPL", "Apple Inc.", Some("Technology")))
        .await
        .unwrap();
    db.upsert_symbol(&symbol_record("MSFT", "Microsoft Corp.", Some("Technology")))
        .await
        .unwrap();
    db.upsert_symbol(&symbol_record("XOM", "Exxon Mobil", Some("Energy")))
        .await
        .unwrap();
    db.upsert_symbol(&symbol_record("NULLS", "Null Sector Co.", None))
        .await
        .unwrap();
    // identity row without any snapshot
    db.upsert_symbol(&symbol_record("NOSNAP", "No Snapshot Inc.", Some("Energy")))
        .await
        .unwrap();

    db.upsert_snapshot(&snapshot("AAPL", Some(0.55), Some(6.4)))
        .await
        .unwrap();
    db.upsert_snapshot(&snapshot("MSFT", Some(0.45), Some(11.2)))
        .await
        .unwrap();
    db.upsert_snapshot(&snapshot("XOM", Some(0.12), Some(-2.0)))
        .await
        .unwrap();
    db.upsert_snapshot(&snapshot("NULLS", None, None))
        .await
        .unwrap();

    db
}

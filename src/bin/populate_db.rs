//! Seed the screener database and universe files with a small, deterministic
//! data set for local development.

use anyhow::Result;
use std::path::Path;

use screener_api::database::Database;
use screener_api::models::{Config, FactorSnapshot, SymbolRecord};

fn seed_symbols() -> Vec<SymbolRecord> {
    vec![
        SymbolRecord {
            symbol: "AAPL".into(),
            name: "Apple Inc.".into(),
            exchange: Some("NASDAQ".into()),
            sector: Some("Technology".into()),
            industry: Some("Consumer Electronics".into()),
            shares_out: Some(15_500_000_000.0),
        },
        SymbolRecord {
            symbol: "MSFT".into(),
            name: "Microsoft Corp.".into(),
            exchange: Some("NASDAQ".into()),
            sector: Some("Technology".into()),
            industry: Some("Software—Infrastructure".into()),
            shares_out: Some(7_450_000_000.0),
        },
        SymbolRecord {
            symbol: "NVDA".into(),
            name: "NVIDIA Corp.".into(),
            exchange: Some("NASDAQ".into()),
            sector: Some("Technology".into()),
            industry: Some("Semiconductors".into()),
            shares_out: Some(2_460_000_000.0),
        },
    ]
}

fn seed_snapshots() -> Vec<FactorSnapshot> {
    let snap = |symbol: &str,
                ttm_eps: f64,
                ebitda: f64,
                book: f64,
                invested: f64,
                nopat: f64,
                roic: f64,
                debt: f64,
                cash: f64| FactorSnapshot {
        symbol: symbol.into(),
        asof: Some("2025-09-30".into()),
        ttm_eps: Some(ttm_eps),
        ebitda_ttm: Some(ebitda),
        book_ttm: Some(book),
        invested_capital_ttm: Some(invested),
        nopat_ttm: Some(nopat),
        roic: Some(roic),
        debt: Some(debt),
        cash: Some(cash),
    };

    vec![
        snap("AAPL", 6.4, 140e9, 75e9, 200e9, 110e9, 0.55, 120e9, 70e9),
        snap("MSFT", 11.2, 130e9, 175e9, 220e9, 100e9, 0.45, 100e9, 90e9),
        snap("NVDA", 17.0, 80e9, 60e9, 70e9, 60e9, 0.86, 60e9, 40e9),
    ]
}

fn write_universes(dir: &Path) -> Result<()> {
    std::fs::create_dir_all(dir)?;

    let universes: &[(&str, &[&str])] = &[
        (
            "sp500",
            &["AAPL", "MSFT", "NVDA", "AMZN", "GOOGL", "META", "BRK-B", "LLY", "UNH", "XOM"],
        ),
        (
            "dow30",
            &["AAPL", "MSFT", "JPM", "V", "PG", "KO", "MCD", "DIS", "IBM", "CAT"],
        ),
        (
            "nasdaq100",
            &["AAPL", "MSFT", "NVDA", "AMZN", "GOOGL", "META", "AVGO", "COST", "ADBE", "PEP"],
        ),
        (
            "sp400",
            &["BLDR", "CROX", "ENPH", "DKS", "TXT", "MTZ", "UAL", "DECK", "ALGN", "NTRS"],
        ),
    ];

    // Overwrite existing files so reseeding stays deterministic.
    for (name, symbols) in universes {
        let path = dir.join(format!("{name}.json"));
        let content = serde_json::to_string_pretty(symbols)?;
        std::fs::write(&path, content)?;
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;

    let db = Database::connect(&config.database_path).await?;
    for record in seed_symbols() {
        db.upsert_symbol(&record).await?;
    }
    for snapshot in seed_snapshots() {
        db.upsert_snapshot(&snapshot).await?;
    }

    write_universes(Path::new(&config.universe_dir))?;

    println!("DB ready at {}", config.database_path);
    println!("Universes written under {}", config.universe_dir);
    Ok(())
}

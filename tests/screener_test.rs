//! Screening read-model behavior against a seeded in-memory store.

mod common;

use pretty_assertions::assert_eq;
use screener_api::models::ScreenerFilter;

fn base_filter() -> ScreenerFilter {
    ScreenerFilter {
        limit: 200,
        ..Default::default()
    }
}

#[tokio::test]
async fn all_symbols_listed_with_left_joined_snapshots() {
    let db = common::seeded_db().await;

    let rows = db.screener_rows(&base_filter()).await.unwrap();
    let symbols: Vec<&str> = rows.iter().map(|r| r.symbol.as_str()).collect();

    // every identity row appears, ordered by symbol, even without a snapshot
    assert_eq!(symbols, vec!["AAPL", "MSFT", "NOSNAP", "NULLS", "XOM"]);

    let nosnap = rows.iter().find(|r| r.symbol == "NOSNAP").unwrap();
    assert_eq!(nosnap.name, "No Snapshot Inc.");
    assert_eq!(nosnap.roic, None);
    assert_eq!(nosnap.ttm_eps, None);
}

#[tokio::test]
async fn explicit_unknown_symbol_yields_placeholder_row() {
    let db = common::seeded_db().await;

    let filter = ScreenerFilter {
        symbols: Some(vec!["ZZZZ".to_string()]),
        ..base_filter()
    };
    let rows = db.screener_rows(&filter).await.unwrap();

    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].symbol, "ZZZZ");
    assert_eq!(rows[0].name, "ZZZZ");
    assert_eq!(rows[0].roic, None);
    assert_eq!(rows[0].ttm_eps, None);
    assert_eq!(rows[0].sector, None);
}

#[tokio::test]
async fn explicit_list_mixes_known_and_unknown() {
    let db = common::seeded_db().await;

    let filter = ScreenerFilter {
        symbols: Some(vec!["AAPL".to_string(), "ZZZZ".to_string()]),
        ..base_filter()
    };
    let rows = db.screener_rows(&filter).await.unwrap();

    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].symbol, "AAPL");
    assert_eq!(rows[0].name, "Apple Inc.");
    assert_eq!(rows[0].roic, Some(0.55));
    assert_eq!(rows[1].symbol, "ZZZZ");
}

#[tokio::test]
async fn empty_explicit_list_is_empty_result() {
    let db = common::seeded_db().await;

    let filter = ScreenerFilter {
        symbols: Some(Vec::new()),
        ..base_filter()
    };
    assert!(db.screener_rows(&filter).await.unwrap().is_empty());
}

#[tokio::test]
async fn roic_threshold_is_inclusive() {
    let db = common::seeded_db().await;

    let filter = ScreenerFilter {
        roic_min: Some(0.55),
        ..base_filter()
    };
    let rows = db.screener_rows(&filter).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].symbol, "AAPL");

    let filter = ScreenerFilter {
        roic_min: Some(0.56),
        ..base_filter()
    };
    assert!(db.screener_rows(&filter).await.unwrap().is_empty());
}

#[tokio::test]
async fn roic_filter_excludes_null_roic_only_when_active() {
    let db = common::seeded_db().await;

    // active filter: NULLS (null ROIC) cannot satisfy the threshold
    let filter = ScreenerFilter {
        roic_min: Some(0.1),
        ..base_filter()
    };
    let rows = db.screener_rows(&filter).await.unwrap();
    assert!(rows.iter().all(|r| r.symbol != "NULLS"));

    // zero threshold adds no clause, null-ROIC rows stay visible
    let filter = ScreenerFilter {
        roic_min: Some(0.0),
        ..base_filter()
    };
    let rows = db.screener_rows(&filter).await.unwrap();
    assert!(rows.iter().any(|r| r.symbol == "NULLS"));
}

#[tokio::test]
async fn null_sector_rows_survive_any_sector_filter() {
    let db = common::seeded_db().await;

    let filter = ScreenerFilter {
        sector: Some("Energy".to_string()),
        ..base_filter()
    };
    let rows = db.screener_rows(&filter).await.unwrap();
    let symbols: Vec<&str> = rows.iter().map(|r| r.symbol.as_str()).collect();

    // Energy matches plus the null-sector row; Technology rows are gone
    assert!(symbols.contains(&"XOM"));
    assert!(symbols.contains(&"NOSNAP"));
    assert!(symbols.contains(&"NULLS"));
    assert!(!symbols.contains(&"AAPL"));
}

#[tokio::test]
async fn positive_earnings_soft_filter_excludes_negative_and_null_eps() {
    let db = common::seeded_db().await;

    let filter = ScreenerFilter {
        positive_eps: true,
        ..base_filter()
    };
    let rows = db.screener_rows(&filter).await.unwrap();
    let symbols: Vec<&str> = rows.iter().map(|r| r.symbol.as_str()).collect();

    assert_eq!(symbols, vec!["AAPL", "MSFT"]);
}

#[tokio::test]
async fn pagination_windows_the_ordered_result() {
    let db = common::seeded_db().await;

    let filter = ScreenerFilter {
        limit: 2,
        offset: 1,
        ..Default::default()
    };
    let rows = db.screener_rows(&filter).await.unwrap();
    let symbols: Vec<&str> = rows.iter().map(|r| r.symbol.as_str()).collect();

    assert_eq!(symbols, vec!["MSFT", "NOSNAP"]);
}

#[tokio::test]
async fn sectors_are_distinct_and_sorted() {
    let db = common::seeded_db().await;

    assert_eq!(db.sectors().await.unwrap(), vec!["Energy", "Technology"]);
}

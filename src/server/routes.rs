use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

use super::{error::ApiError, AppState};
use crate::models::{parse_symbol_csv, FundamentalsRow, ScreenerFilter, ScreenerRow};
use crate::universe::{list_universes, load_universe_symbols, UniverseInfo};

const DEFAULT_SCREENER_LIMIT: i64 = 200;
const DEFAULT_CSV_LIMIT: i64 = 1000;

const CSV_HEADER: [&str; 10] = [
    "symbol", "name", "sector", "roic", "ttm_eps", "ebitda_ttm", "book_ttm", "shares_out", "debt",
    "cash",
];

/// GET /health
pub async fn health() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

// ---------------------------------------------------------------------
// Universes
// ---------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub struct UniversesResponse {
    pub universes: Vec<UniverseInfo>,
}

/// GET /api/universes
pub async fn universes(State(state): State<Arc<AppState>>) -> Json<UniversesResponse> {
    Json(UniversesResponse {
        universes: list_universes(&state.universe_dir),
    })
}

#[derive(Debug, Deserialize)]
pub struct UniverseParams {
    pub name: String,
}

#[derive(Debug, Serialize)]
pub struct UniverseResponse {
    pub name: String,
    pub symbols: Vec<String>,
}

/// GET /api/universe?name=sp500
pub async fn universe(
    State(state): State<Arc<AppState>>,
    Query(params): Query<UniverseParams>,
) -> Json<UniverseResponse> {
    let symbols = load_universe_symbols(&state.universe_dir, &params.name);
    Json(UniverseResponse {
        name: params.name,
        symbols,
    })
}

// ---------------------------------------------------------------------
// Sectors
// ---------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub struct SectorsResponse {
    pub sectors: Vec<String>,
}

/// GET /api/sectors
pub async fn sectors(
    State(state): State<Arc<AppState>>,
) -> Result<Json<SectorsResponse>, ApiError> {
    Ok(Json(SectorsResponse {
        sectors: state.db.sectors().await?,
    }))
}

// ---------------------------------------------------------------------
// Screener
// ---------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct ScreenerParams {
    pub roic_min: Option<f64>,
    pub sector: Option<String>,
    /// Presence alone activates the positive-earnings soft filter; the
    /// actual P/E cap is computed client-side from live price/EPS.
    pub pe_max: Option<f64>,
    pub symbols: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl ScreenerParams {
    fn to_filter(&self, default_limit: i64) -> ScreenerFilter {
        let symbols = self
            .symbols
            .as_deref()
            .filter(|s| !s.is_empty())
            .map(parse_symbol_csv);

        ScreenerFilter {
            symbols,
            roic_min: self.roic_min,
            sector: self.sector.clone().filter(|s| !s.is_empty()),
            positive_eps: self.pe_max.is_some(),
            limit: self.limit.unwrap_or(default_limit),
            offset: self.offset.unwrap_or(0),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ScreenerResponse {
    pub items: Vec<ScreenerRow>,
}

/// GET /api/screener
pub async fn screener(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ScreenerParams>,
) -> Result<Json<ScreenerResponse>, ApiError> {
    let filter = params.to_filter(DEFAULT_SCREENER_LIMIT);
    let items = state.db.screener_rows(&filter).await?;
    Ok(Json(ScreenerResponse { items }))
}

/// GET /api/screener.csv — same filtering, delivered as a CSV attachment.
pub async fn screener_csv(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ScreenerParams>,
) -> Result<Response, ApiError> {
    let filter = params.to_filter(DEFAULT_CSV_LIMIT);
    let rows = state.db.screener_rows(&filter).await?;

    let bytes = rows_to_csv(&rows)?;

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=screener.csv",
            ),
        ],
        bytes,
    )
        .into_response())
}

fn rows_to_csv(rows: &[ScreenerRow]) -> anyhow::Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(CSV_HEADER)?;

    for row in rows {
        let record = [
            row.symbol.clone(),
            row.name.clone(),
            row.sector.clone().unwrap_or_default(),
            csv_num(row.roic),
            csv_num(row.ttm_eps),
            csv_num(row.ebitda_ttm),
            csv_num(row.book_ttm),
            csv_num(row.shares_out),
            csv_num(row.debt),
            csv_num(row.cash),
        ];
        writer.write_record(&record)?;
    }

    writer
        .into_inner()
        .map_err(|e| anyhow::anyhow!("csv buffer flush failed: {}", e))
}

fn csv_num(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

// ---------------------------------------------------------------------
// Live prices and fundamentals
// ---------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct SymbolsParams {
    pub symbols: Option<String>,
}

impl SymbolsParams {
    fn parsed(&self) -> Vec<String> {
        self.symbols.as_deref().map(parse_symbol_csv).unwrap_or_default()
    }
}

#[derive(Debug, Serialize)]
pub struct PriceResponse {
    pub prices: HashMap<String, f64>,
    pub trailing_eps: HashMap<String, f64>,
    pub pe_live: HashMap<String, f64>,
    pub fundamentals: HashMap<String, FundamentalsRow>,
    pub asof: i64,
}

/// GET /api/price?symbols=AAPL,MSFT
///
/// Fresh cached facts are served from the store; stale or missing facts go
/// through the refresh orchestrator. An empty symbol list is an empty 200,
/// not an error.
pub async fn price(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SymbolsParams>,
) -> Result<Json<PriceResponse>, ApiError> {
    let symbols = params.parsed();
    if symbols.is_empty() {
        return Ok(Json(PriceResponse {
            prices: HashMap::new(),
            trailing_eps: HashMap::new(),
            pe_live: HashMap::new(),
            fundamentals: HashMap::new(),
            asof: chrono::Utc::now().timestamp(),
        }));
    }

    let quotes = state.quotes.live_quotes(&symbols).await?;
    Ok(Json(PriceResponse {
        prices: quotes.prices,
        trailing_eps: quotes.trailing_eps,
        pe_live: quotes.pe_live,
        fundamentals: quotes.fundamentals,
        asof: quotes.asof,
    }))
}

#[derive(Debug, Serialize)]
pub struct FundamentalsResponse {
    pub items: HashMap<String, FundamentalsRow>,
    pub asof: i64,
}

/// GET /api/fundamentals?symbols=AAPL,MSFT — forced refresh/merge.
pub async fn fundamentals(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SymbolsParams>,
) -> Result<Json<FundamentalsResponse>, ApiError> {
    let symbols = params.parsed();
    if symbols.is_empty() {
        return Ok(Json(FundamentalsResponse {
            items: HashMap::new(),
            asof: chrono::Utc::now().timestamp(),
        }));
    }

    let report = state.quotes.refresh_fundamentals(&symbols).await?;
    Ok(Json(FundamentalsResponse {
        items: report.items,
        asof: report.asof,
    }))
}

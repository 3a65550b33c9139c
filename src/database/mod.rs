use anyhow::Result;
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    Row, SqlitePool,
};
use std::path::Path;

use crate::models::{
    EpsCacheEntry, FactorSnapshot, FundamentalsRow, PriceCacheEntry, ScreenerFilter, ScreenerRow,
    SnapshotPatch, SymbolPatch, SymbolRecord,
};

/// SQLite-backed store for symbols, factor snapshots and the two
/// timestamped fact caches. Owns all persistent state; callers only hold
/// transient per-request working sets.
#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Open (creating if missing) the database file and ensure the schema.
    pub async fn connect(database_path: &str) -> Result<Self> {
        if let Some(parent) = Path::new(database_path).parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .acquire_timeout(std::time::Duration::from_secs(30))
            .connect_with(
                SqliteConnectOptions::new()
                    .filename(database_path)
                    .create_if_missing(true),
            )
            .await?;

        // WAL for concurrent readers, NORMAL sync is enough for cache data
        sqlx::query("PRAGMA journal_mode = WAL").execute(&pool).await?;
        sqlx::query("PRAGMA synchronous = NORMAL").execute(&pool).await?;
        sqlx::query("PRAGMA foreign_keys = ON").execute(&pool).await?;

        Self::ensure_schema(&pool).await?;

        Ok(Self { pool })
    }

    /// In-memory database for tests. A single connection keeps all
    /// statements on the same memory store.
    pub async fn connect_in_memory() -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;
        Self::ensure_schema(&pool).await?;
        Ok(Self { pool })
    }

    async fn ensure_schema(pool: &SqlitePool) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS symbols (
                symbol TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                exchange TEXT,
                sector TEXT,
                industry TEXT,
                shares_out REAL
            )
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS factor_snapshot (
                symbol TEXT PRIMARY KEY,
                asof TEXT,
                ttm_eps REAL,
                ebitda_ttm REAL,
                book_ttm REAL,
                invested_capital_ttm REAL,
                nopat_ttm REAL,
                roic REAL,
                debt REAL,
                cash REAL
            )
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS last_price (
                symbol TEXT PRIMARY KEY,
                price REAL,
                ts INTEGER
            )
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS trailing_eps_cache (
                symbol TEXT PRIMARY KEY,
                eps REAL,
                ts INTEGER
            )
            "#,
        )
        .execute(pool)
        .await?;

        Ok(())
    }

    // ------------------------------------------------------------------
    // Fact caches
    // ------------------------------------------------------------------

    /// Read the cached last price for a symbol, if any. Pure read; the
    /// freshness decision belongs to the caller.
    pub async fn get_last_price(&self, symbol: &str) -> Result<Option<PriceCacheEntry>> {
        let row = sqlx::query("SELECT symbol, price, ts FROM last_price WHERE symbol = ?")
            .bind(symbol)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|r| PriceCacheEntry {
            symbol: r.get::<String, _>("symbol"),
            price: r.get::<f64, _>("price"),
            ts: r.get::<Option<i64>, _>("ts"),
        }))
    }

    /// Read the cached trailing EPS for a symbol, if any.
    pub async fn get_trailing_eps(&self, symbol: &str) -> Result<Option<EpsCacheEntry>> {
        let row = sqlx::query("SELECT symbol, eps, ts FROM trailing_eps_cache WHERE symbol = ?")
            .bind(symbol)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|r| EpsCacheEntry {
            symbol: r.get::<String, _>("symbol"),
            eps: r.get::<f64, _>("eps"),
            ts: r.get::<Option<i64>, _>("ts"),
        }))
    }

    /// Replace the price cache row for a symbol wholesale.
    pub async fn put_last_price(&self, symbol: &str, price: f64, ts: i64) -> Result<()> {
        sqlx::query("INSERT OR REPLACE INTO last_price (symbol, price, ts) VALUES (?, ?, ?)")
            .bind(symbol)
            .bind(price)
            .bind(ts)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Replace the trailing-EPS cache row for a symbol wholesale.
    pub async fn put_trailing_eps(&self, symbol: &str, eps: f64, ts: i64) -> Result<()> {
        sqlx::query("INSERT OR REPLACE INTO trailing_eps_cache (symbol, eps, ts) VALUES (?, ?, ?)")
            .bind(symbol)
            .bind(eps)
            .bind(ts)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Symbols
    // ------------------------------------------------------------------

    /// Full upsert of a symbol row (seed path, latest wins on every field).
    pub async fn upsert_symbol(&self, record: &SymbolRecord) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO symbols (symbol, name, exchange, sector, industry, shares_out)
            VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT(symbol) DO UPDATE SET
                name = excluded.name,
                exchange = excluded.exchange,
                sector = excluded.sector,
                industry = excluded.industry,
                shares_out = excluded.shares_out
            "#,
        )
        .bind(&record.symbol)
        .bind(&record.name)
        .bind(&record.exchange)
        .bind(&record.sector)
        .bind(&record.industry)
        .bind(record.shares_out)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Merge-patch a symbol row: non-null patch fields overwrite, null
    /// fields preserve whatever is stored. Creates the row on first
    /// discovery with the symbol itself as fallback display name.
    pub async fn merge_symbol(&self, symbol: &str, patch: &SymbolPatch) -> Result<()> {
        let fallback_name = patch.name.clone().unwrap_or_else(|| symbol.to_string());
        sqlx::query(
            "INSERT INTO symbols (symbol, name) VALUES (?, ?) ON CONFLICT(symbol) DO NOTHING",
        )
        .bind(symbol)
        .bind(&fallback_name)
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            UPDATE symbols SET
                name = COALESCE(?, name),
                exchange = COALESCE(?, exchange),
                sector = COALESCE(?, sector),
                industry = COALESCE(?, industry),
                shares_out = COALESCE(?, shares_out)
            WHERE symbol = ?
            "#,
        )
        .bind(&patch.name)
        .bind(&patch.exchange)
        .bind(&patch.sector)
        .bind(&patch.industry)
        .bind(patch.shares_out)
        .bind(symbol)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Get a symbol row by ticker.
    pub async fn get_symbol(&self, symbol: &str) -> Result<Option<SymbolRecord>> {
        let row = sqlx::query(
            "SELECT symbol, name, exchange, sector, industry, shares_out FROM symbols WHERE symbol = ?",
        )
        .bind(symbol)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| SymbolRecord {
            symbol: r.get::<String, _>("symbol"),
            name: r.get::<String, _>("name"),
            exchange: r.get::<Option<String>, _>("exchange"),
            sector: r.get::<Option<String>, _>("sector"),
            industry: r.get::<Option<String>, _>("industry"),
            shares_out: r.get::<Option<f64>, _>("shares_out"),
        }))
    }

    /// Distinct non-empty sector values, alphabetical.
    pub async fn sectors(&self) -> Result<Vec<String>> {
        let rows = sqlx::query(
            r#"
            SELECT DISTINCT sector
            FROM symbols
            WHERE sector IS NOT NULL AND sector <> ''
            ORDER BY sector
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|r| r.get::<String, _>("sector"))
            .collect())
    }

    // ------------------------------------------------------------------
    // Factor snapshots
    // ------------------------------------------------------------------

    /// Full upsert of a factor snapshot (seed path, latest wins).
    pub async fn upsert_snapshot(&self, snapshot: &FactorSnapshot) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO factor_snapshot
                (symbol, asof, ttm_eps, ebitda_ttm, book_ttm,
                 invested_capital_ttm, nopat_ttm, roic, debt, cash)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(symbol) DO UPDATE SET
                asof = excluded.asof,
                ttm_eps = excluded.ttm_eps,
                ebitda_ttm = excluded.ebitda_ttm,
                book_ttm = excluded.book_ttm,
                invested_capital_ttm = excluded.invested_capital_ttm,
                nopat_ttm = excluded.nopat_ttm,
                roic = excluded.roic,
                debt = excluded.debt,
                cash = excluded.cash
            "#,
        )
        .bind(&snapshot.symbol)
        .bind(&snapshot.asof)
        .bind(snapshot.ttm_eps)
        .bind(snapshot.ebitda_ttm)
        .bind(snapshot.book_ttm)
        .bind(snapshot.invested_capital_ttm)
        .bind(snapshot.nopat_ttm)
        .bind(snapshot.roic)
        .bind(snapshot.debt)
        .bind(snapshot.cash)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Merge-patch the refreshable snapshot fields for a symbol.
    pub async fn merge_snapshot(&self, symbol: &str, patch: &SnapshotPatch) -> Result<()> {
        sqlx::query(
            "INSERT INTO factor_snapshot (symbol) VALUES (?) ON CONFLICT(symbol) DO NOTHING",
        )
        .bind(symbol)
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            UPDATE factor_snapshot SET
                asof = COALESCE(?, asof),
                ebitda_ttm = COALESCE(?, ebitda_ttm),
                book_ttm = COALESCE(?, book_ttm),
                debt = COALESCE(?, debt),
                cash = COALESCE(?, cash)
            WHERE symbol = ?
            "#,
        )
        .bind(&patch.asof)
        .bind(patch.ebitda_ttm)
        .bind(patch.book_ttm)
        .bind(patch.debt)
        .bind(patch.cash)
        .bind(symbol)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Get the factor snapshot row for a symbol.
    pub async fn get_snapshot(&self, symbol: &str) -> Result<Option<FactorSnapshot>> {
        let row = sqlx::query(
            r#"
            SELECT symbol, asof, ttm_eps, ebitda_ttm, book_ttm,
                   invested_capital_ttm, nopat_ttm, roic, debt, cash
            FROM factor_snapshot
            WHERE symbol = ?
            "#,
        )
        .bind(symbol)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| FactorSnapshot {
            symbol: r.get::<String, _>("symbol"),
            asof: r.get::<Option<String>, _>("asof"),
            ttm_eps: r.get::<Option<f64>, _>("ttm_eps"),
            ebitda_ttm: r.get::<Option<f64>, _>("ebitda_ttm"),
            book_ttm: r.get::<Option<f64>, _>("book_ttm"),
            invested_capital_ttm: r.get::<Option<f64>, _>("invested_capital_ttm"),
            nopat_ttm: r.get::<Option<f64>, _>("nopat_ttm"),
            roic: r.get::<Option<f64>, _>("roic"),
            debt: r.get::<Option<f64>, _>("debt"),
            cash: r.get::<Option<f64>, _>("cash"),
        }))
    }

    /// Merged identity + snapshot view for a single symbol. Always returns
    /// a row; unknown symbols fall back to the ticker as display name with
    /// all other fields null.
    pub async fn fundamentals_row(&self, symbol: &str) -> Result<FundamentalsRow> {
        let row = sqlx::query(
            r#"
            WITH syms(symbol) AS ( VALUES (?) )
            SELECT
                syms.symbol AS symbol,
                COALESCE(s.name, syms.symbol) AS name,
                s.sector, s.shares_out,
                f.ttm_eps, f.ebitda_ttm, f.book_ttm, f.debt, f.cash
            FROM syms
            LEFT JOIN symbols s ON s.symbol = syms.symbol
            LEFT JOIN factor_snapshot f ON f.symbol = syms.symbol
            "#,
        )
        .bind(symbol)
        .fetch_one(&self.pool)
        .await?;

        Ok(FundamentalsRow {
            symbol: row.get::<String, _>("symbol"),
            name: row.get::<String, _>("name"),
            sector: row.get::<Option<String>, _>("sector"),
            shares_out: row.get::<Option<f64>, _>("shares_out"),
            ttm_eps: row.get::<Option<f64>, _>("ttm_eps"),
            ebitda_ttm: row.get::<Option<f64>, _>("ebitda_ttm"),
            book_ttm: row.get::<Option<f64>, _>("book_ttm"),
            debt: row.get::<Option<f64>, _>("debt"),
            cash: row.get::<Option<f64>, _>("cash"),
        })
    }

    // ------------------------------------------------------------------
    // Screening read-model
    // ------------------------------------------------------------------

    /// Screening query: identity LEFT JOIN latest snapshot, ordered by
    /// symbol, windowed by limit/offset.
    ///
    /// With an explicit symbol list the list itself drives the join, so
    /// every requested symbol appears even without store rows. Without one
    /// the identity table drives it, so symbols without a snapshot still
    /// appear with null factors.
    pub async fn screener_rows(&self, filter: &ScreenerFilter) -> Result<Vec<ScreenerRow>> {
        let mut sql;
        let explicit = match &filter.symbols {
            Some(syms) => {
                if syms.is_empty() {
                    return Ok(Vec::new());
                }
                let placeholders = vec!["(?)"; syms.len()].join(",");
                sql = format!(
                    r#"
                    WITH syms(symbol) AS ( VALUES {placeholders} )
                    SELECT
                        syms.symbol AS symbol,
                        COALESCE(s.name, syms.symbol) AS name,
                        f.roic, f.ttm_eps, f.ebitda_ttm, f.book_ttm,
                        s.shares_out, f.debt, f.cash, s.sector
                    FROM syms
                    LEFT JOIN symbols s ON s.symbol = syms.symbol
                    LEFT JOIN factor_snapshot f ON f.symbol = syms.symbol
                    WHERE 1=1
                    "#
                );
                syms.as_slice()
            }
            None => {
                sql = r#"
                    SELECT
                        s.symbol, s.name,
                        f.roic, f.ttm_eps, f.ebitda_ttm, f.book_ttm,
                        s.shares_out, f.debt, f.cash, s.sector
                    FROM symbols s
                    LEFT JOIN factor_snapshot f USING(symbol)
                    WHERE 1=1
                    "#
                .to_string();
                &[]
            }
        };

        // A zero or absent threshold adds no clause, so null-ROIC rows
        // stay visible.
        let roic_min = filter.roic_min.filter(|m| *m > 0.0);
        if roic_min.is_some() {
            sql.push_str(" AND f.roic IS NOT NULL AND f.roic >= ?");
        }
        if filter.sector.is_some() {
            sql.push_str(" AND (s.sector LIKE ? OR s.sector IS NULL)");
        }
        if filter.positive_eps {
            sql.push_str(" AND f.ttm_eps > 0");
        }
        sql.push_str(" ORDER BY 1 LIMIT ? OFFSET ?");

        let mut query = sqlx::query(&sql);
        for symbol in explicit {
            query = query.bind(symbol);
        }
        if let Some(min) = roic_min {
            query = query.bind(min);
        }
        if let Some(sector) = &filter.sector {
            query = query.bind(format!("%{sector}%"));
        }
        query = query.bind(filter.limit).bind(filter.offset);

        let rows = query.fetch_all(&self.pool).await?;

        Ok(rows
            .into_iter()
            .map(|r| ScreenerRow {
                symbol: r.get::<String, _>("symbol"),
                name: r.get::<String, _>("name"),
                roic: r.get::<Option<f64>, _>("roic"),
                ttm_eps: r.get::<Option<f64>, _>("ttm_eps"),
                ebitda_ttm: r.get::<Option<f64>, _>("ebitda_ttm"),
                book_ttm: r.get::<Option<f64>, _>("book_ttm"),
                shares_out: r.get::<Option<f64>, _>("shares_out"),
                debt: r.get::<Option<f64>, _>("debt"),
                cash: r.get::<Option<f64>, _>("cash"),
                sector: r.get::<Option<String>, _>("sector"),
            })
            .collect())
    }
}

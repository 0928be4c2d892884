use anyhow::{Context, Result};
use sqlx::{
    postgres::{PgConnectOptions, PgPoolOptions, PgSslMode},
    PgPool, Row,
};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use tracing::{info, instrument};

#[derive(Clone)]
pub struct Db {
    pub pool: PgPool,
}

impl Db {
    // SECURITY: never include raw DSNs in tracing spans (they may contain credentials).
    #[instrument(skip(database_url))]
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self> {
        let mut connect_options =
            PgConnectOptions::from_str(database_url).context("invalid database URL")?;

        // Ensure TLS is enabled when DSN contains sslmode=require
        if database_url.contains("sslmode=require") && !database_url.contains("sslmode=disable") {
            connect_options = connect_options.ssl_mode(PgSslMode::Require);
        }

        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(10))
            .idle_timeout(Duration::from_secs(600))
            .connect_with(connect_options)
            .await
            .context("connect to postgres")?;
        info!(max_connections, "connected to db");
        Ok(Self { pool })
    }

    /// Apply every `NNNN_description.sql` file in `dir` that is not yet recorded
    /// in `_migrations`, in numeric order. Non-numeric filenames are ignored.
    pub async fn run_migrations(&self, dir: &Path) -> Result<usize> {
        if !dir.exists() {
            info!(dir = %dir.display(), "no migrations directory; skipping");
            return Ok(0);
        }
        sqlx::raw_sql(
            "CREATE TABLE IF NOT EXISTS _migrations (
                version BIGINT PRIMARY KEY,
                description TEXT,
                installed_at TIMESTAMPTZ DEFAULT now()
             )",
        )
        .execute(&self.pool)
        .await?;

        let applied_rows = sqlx::raw_sql("SELECT version FROM _migrations")
            .fetch_all(&self.pool)
            .await?;
        let mut applied: HashSet<i64> = HashSet::new();
        for r in applied_rows {
            applied.insert(r.try_get::<i64, _>(0)?);
        }

        let mut applied_now = 0;
        for (version, desc, path) in migration_candidates(dir)? {
            if applied.contains(&version) {
                continue;
            }
            let sql = std::fs::read_to_string(&path)
                .with_context(|| format!("read migration {}", path.display()))?;
            info!(version, file = ?path, "applying migration");

            let mut tx = self.pool.begin().await?;
            sqlx::raw_sql(&sql).execute(&mut *tx).await?;
            sqlx::query("INSERT INTO _migrations (version, description) VALUES ($1, $2)")
                .bind(version)
                .bind(&desc)
                .execute(&mut *tx)
                .await?;
            tx.commit().await?;

            applied.insert(version);
            applied_now += 1;
        }
        info!(applied_now, "migrations up-to-date");
        Ok(applied_now)
    }
}

/// Parse `NNNN_description.sql` names; everything else is skipped.
fn parse_migration_name(fname: &str) -> Option<(i64, String)> {
    let stem = fname.strip_suffix(".sql")?;
    let digits: String = stem.chars().take_while(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        return None;
    }
    let rest = stem[digits.len()..].strip_prefix('_')?;
    Some((digits.parse().ok()?, rest.to_string()))
}

fn migration_candidates(dir: &Path) -> Result<Vec<(i64, String, PathBuf)>> {
    let mut candidates = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if !path.is_file() {
            continue;
        }
        let Some(fname) = path.file_name().and_then(|s| s.to_str()) else {
            continue;
        };
        if let Some((version, desc)) = parse_migration_name(fname) {
            candidates.push((version, desc, path));
        }
    }
    candidates.sort_by_key(|(v, _, _)| *v);
    Ok(candidates)
}

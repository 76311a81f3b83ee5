//! SQLite backend mirroring the `companies` table
//!
//! Used for offline runs against a local copy of the datastore.

use super::{CompanyStore, MatchTarget, TargetFilter};
use crate::error::{MatchError, MatchResult};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use std::path::Path;
use uuid::Uuid;

/// Local SQLite company store
#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open (creating if needed) a database file
    pub async fn open(db_path: &Path) -> MatchResult<Self> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| MatchError::Configuration(format!("Cannot create {}: {}", parent.display(), e)))?;
        }

        // Use proper SQLite URI with mode=rwc (read, write, create)
        let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
        tracing::debug!("Connecting to database: {}", db_url);

        let pool = SqlitePool::connect(&db_url).await?;
        let store = Self::from_pool(pool);
        store.init_tables().await?;

        Ok(store)
    }

    /// Wrap an existing pool (tables are not created)
    pub fn from_pool(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create the companies table if it doesn't exist
    pub async fn init_tables(&self) -> MatchResult<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS companies (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL UNIQUE,
                hq_city_name TEXT,
                hq_country TEXT NOT NULL DEFAULT 'France',
                siren TEXT,
                siret TEXT,
                updated_at TEXT
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Insert or update a company keyed by name; returns its id
    pub async fn upsert_company(&self, name: &str, city: Option<&str>, country: &str) -> MatchResult<String> {
        let (id,): (String,) = sqlx::query_as(
            r#"
            INSERT INTO companies (id, name, hq_city_name, hq_country, updated_at)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(name) DO UPDATE SET
                hq_city_name = excluded.hq_city_name,
                hq_country = excluded.hq_country,
                updated_at = excluded.updated_at
            RETURNING id
            "#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(name)
        .bind(city)
        .bind(country)
        .bind(Utc::now().to_rfc3339())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| MatchError::DatastoreWrite(e.to_string()))?;

        Ok(id)
    }

    /// Load a company's current identifiers
    pub async fn load_target(&self, id: &str) -> MatchResult<Option<MatchTarget>> {
        let row: Option<TargetRow> = sqlx::query_as(
            "SELECT id, name, hq_city_name, siren, siret FROM companies WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(into_target))
    }
}

/// Make `%`, `_` and the escape character itself match literally
fn escape_like(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

type TargetRow = (String, String, Option<String>, Option<String>, Option<String>);

fn into_target((id, name, city, siren, siret): TargetRow) -> MatchTarget {
    MatchTarget {
        id,
        name,
        city: city.filter(|c| !c.trim().is_empty()),
        registry_id: siren,
        establishment_id: siret,
    }
}

#[async_trait]
impl CompanyStore for SqliteStore {
    async fn find_unmatched_targets(&self, filter: &TargetFilter) -> MatchResult<Vec<MatchTarget>> {
        let mut query: QueryBuilder<Sqlite> = QueryBuilder::new(
            "SELECT id, name, hq_city_name, siren, siret FROM companies WHERE hq_country = ",
        );
        query.push_bind(filter.country.clone());

        if !filter.include_matched {
            query.push(" AND siren IS NULL");
        }

        if let Some(name) = &filter.name_contains {
            // LIKE is case-insensitive for ASCII in SQLite
            query.push(" AND name LIKE ");
            query.push_bind(format!("%{}%", escape_like(name)));
            query.push(" ESCAPE '\\'");
        }

        query.push(" ORDER BY name");

        if let Some(limit) = filter.limit {
            query.push(" LIMIT ");
            query.push_bind(limit as i64);
        }

        let rows: Vec<TargetRow> = query.build_query_as().fetch_all(&self.pool).await?;

        Ok(rows.into_iter().map(into_target).collect())
    }

    async fn write_identifiers(
        &self,
        target_id: &str,
        registry_id: &str,
        establishment_id: &str,
    ) -> MatchResult<()> {
        let result = sqlx::query(
            "UPDATE companies SET siren = ?, siret = ?, updated_at = ? WHERE id = ?",
        )
        .bind(registry_id)
        .bind(establishment_id)
        .bind(Utc::now().to_rfc3339())
        .bind(target_id)
        .execute(&self.pool)
        .await
        .map_err(|e| MatchError::DatastoreWrite(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(MatchError::DatastoreWrite(format!("no company with id {}", target_id)));
        }

        Ok(())
    }
}

//! Tenant-scoped account read interface

use crate::models::{AccountSummary, ExternalIdentifierInfo};
use crate::search::{BindValue, RenderedQuery};
use crate::{Error, Result};
use async_trait::async_trait;
use sqlx::postgres::PgArguments;
use sqlx::{Arguments, PgPool};

/// Executes rendered, parameterized account queries.
///
/// Implementations run each call as one round-trip and surface store errors
/// unchanged; they never retry.
#[async_trait]
pub trait AccountReader: Send + Sync {
    /// Run a `SELECT COUNT(*)` query.
    async fn count(&self, query: &RenderedQuery) -> Result<i64>;

    /// Run a query selecting the `AccountSummary` columns.
    async fn fetch_accounts(&self, query: &RenderedQuery) -> Result<Vec<AccountSummary>>;

    /// Run a query selecting the `ExternalIdentifierInfo` columns.
    async fn fetch_external_ids(&self, query: &RenderedQuery)
        -> Result<Vec<ExternalIdentifierInfo>>;
}

/// `AccountReader` over a Postgres pool.
#[derive(Clone)]
pub struct PostgresAccountReader {
    pool: PgPool,
}

impl PostgresAccountReader {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn arguments(params: &[BindValue]) -> Result<PgArguments> {
    let mut args = PgArguments::default();
    for value in params {
        let added = match value {
            BindValue::Text(v) => args.add(v.clone()),
            BindValue::Timestamp(ts) => args.add(*ts),
            BindValue::Int(n) => args.add(*n),
        };
        added.map_err(|e| Error::Database(sqlx::Error::Encode(e)))?;
    }
    Ok(args)
}

#[async_trait]
impl AccountReader for PostgresAccountReader {
    async fn count(&self, query: &RenderedQuery) -> Result<i64> {
        let total = sqlx::query_scalar_with::<_, i64, _>(&query.sql, arguments(&query.params)?)
            .fetch_one(&self.pool)
            .await?;
        Ok(total)
    }

    async fn fetch_accounts(&self, query: &RenderedQuery) -> Result<Vec<AccountSummary>> {
        let rows = sqlx::query_as_with::<_, AccountSummary, _>(&query.sql, arguments(&query.params)?)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn fetch_external_ids(
        &self,
        query: &RenderedQuery,
    ) -> Result<Vec<ExternalIdentifierInfo>> {
        let rows = sqlx::query_as_with::<_, ExternalIdentifierInfo, _>(
            &query.sql,
            arguments(&query.params)?,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}

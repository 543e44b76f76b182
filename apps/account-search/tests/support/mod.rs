
use account_search::{
    config::DatabaseConfig,
    db::{self, PostgresAccountReader},
    SearchExecutor,
};
use anyhow::Context as _;
use futures::FutureExt as _;
use sqlx::{Connection as _, PgPool};
use url::Url;
use uuid::Uuid;

pub use fixtures::*;

pub const APP_ID: &str = "api";
pub const OTHER_APP_ID: &str = "other-app";

pub struct TestDb {
    pub pool: PgPool,
    pub executor: SearchExecutor<PostgresAccountReader>,
    database: DatabaseConfig,
    schema: String,
    admin_database_url: String,
}

impl TestDb {
    /// Create a migrated, per-test schema. `None` when no test database is configured.
    pub async fn new() -> anyhow::Result<Option<Self>> {
        let shared = shared::shared().await?;
        let Some(admin_database_url) = shared.base_config.database.test_database_url.clone()
        else {
            return Ok(None);
        };

        let schema = format!("test_{}", Uuid::new_v4().simple());
        let mut admin_conn = sqlx::PgConnection::connect(&admin_database_url)
            .await
            .context("connect admin db for schema create")?;
        sqlx::query(&format!(r#"CREATE SCHEMA "{}""#, schema))
            .execute(&mut admin_conn)
            .await
            .context("create test schema")?;

        let mut database = shared.base_config.database.clone();
        database.url = with_search_path(&admin_database_url, &schema)?;
        database.pool_min_size = 0;
        database.pool_max_size = 2;

        let pool = db::connect(&database).await.context("connect test pool")?;
        db::run_migrations(&pool)
            .await
            .context("migrate test schema")?;

        Ok(Some(Self {
            executor: SearchExecutor::new(PostgresAccountReader::new(pool.clone())),
            pool,
            database,
            schema,
            admin_database_url,
        }))
    }

    /// Open an extra pool on this test's schema with adjusted settings.
    pub async fn connect_with(
        &self,
        configure: impl FnOnce(&mut DatabaseConfig),
    ) -> anyhow::Result<PgPool> {
        let mut database = self.database.clone();
        configure(&mut database);
        db::connect(&database).await.context("connect extra test pool")
    }

    pub async fn cleanup(self) -> anyhow::Result<()> {
        self.pool.close().await;

        let mut admin_conn = sqlx::PgConnection::connect(&self.admin_database_url)
            .await
            .context("connect admin db for schema drop")?;
        sqlx::query(&format!(r#"DROP SCHEMA "{}" CASCADE"#, self.schema))
            .execute(&mut admin_conn)
            .await
            .context("drop test schema")?;

        Ok(())
    }
}

/// Run `f` against a fresh schema, dropping it afterwards even if `f` panics.
///
/// Without a configured test database the test is skipped and passes.
pub async fn with_test_db<F>(f: F) -> anyhow::Result<()>
where
    F: for<'a> FnOnce(
        &'a TestDb,
    ) -> std::pin::Pin<
        Box<dyn std::future::Future<Output = anyhow::Result<()>> + 'a>,
    >,
{
    let Some(db) = TestDb::new().await? else {
        eprintln!("skipping: set TEST_DATABASE_URL to run database tests");
        return Ok(());
    };

    let result = std::panic::AssertUnwindSafe(f(&db)).catch_unwind().await;
    let cleanup_result = db.cleanup().await;

    if let Err(e) = cleanup_result {
        eprintln!("test schema cleanup failed: {e:?}");
    }

    match result {
        Ok(r) => r,
        Err(panic) => std::panic::resume_unwind(panic),
    }
}

fn with_search_path(database_url: &str, schema: &str) -> anyhow::Result<String> {
    let mut url = Url::parse(database_url).context("parse database URL")?;
    url.query_pairs_mut()
        .append_pair("options", &format!("-c search_path={}", schema));
    Ok(url.to_string())
}

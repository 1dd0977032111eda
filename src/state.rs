use std::{str::FromStr, sync::Arc};

use anyhow::Context;
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    SqlitePool,
};

use crate::config::AppConfig;

/// Open a pool for `database_url`, creating the database file and its
/// directory when missing.
pub async fn connect(database_url: &str) -> anyhow::Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str(database_url)
        .with_context(|| format!("parse DATABASE_URL {}", database_url))?
        .create_if_missing(true);
    let path = options.clone().get_filename();
    if let Some(dir) = path.parent() {
        if !dir.as_os_str().is_empty() {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("create database directory {}", dir.display()))?;
        }
    }
    SqlitePoolOptions::new()
        .max_connections(10)
        .connect_with(options)
        .await
        .context("open database")
}

#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = Arc::new(AppConfig::from_env()?);

        let db = connect(&config.database_url).await?;

        Ok(Self { db, config })
    }

    /// Apply embedded migrations to the pool.
    pub async fn migrate(&self) -> anyhow::Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.db)
            .await
            .context("run migrations")
    }

    /// Close the pool; pending statements finish first.
    pub async fn close(&self) {
        self.db.close().await;
    }

    /// In-memory database with migrations applied and a fixed JWT config.
    #[cfg(test)]
    pub async fn fake() -> Self {
        use crate::config::JwtConfig;

        // A single connection that never expires keeps the in-memory db alive.
        let db = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await
            .expect("in-memory sqlite");

        let config = Arc::new(AppConfig {
            database_url: "sqlite::memory:".into(),
            jwt: JwtConfig {
                secret: "test-secret".into(),
                issuer: "test-issuer".into(),
                audience: "test-aud".into(),
            },
            host: "127.0.0.1".into(),
            port: 0,
        });

        let state = Self { db, config };
        state.migrate().await.expect("migrations apply");
        state
    }
}

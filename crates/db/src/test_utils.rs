//! Throwaway `PostgreSQL` databases for the `#[ignore]`d integration tests.
//!
//! Server settings come from `TEST_DB_*` environment variables. Each
//! [`TestDatabase`] gets its own randomly named database, so tests can run
//! in parallel.

use std::sync::Arc;

use sea_orm::{ConnectionTrait, Database, DatabaseBackend, DatabaseConnection, DbErr, Statement};
use sea_orm_migration::MigratorTrait;
use tracing::info;

use crate::migrations::Migrator;

/// Where the test `PostgreSQL` server lives.
#[derive(Debug, Clone)]
pub struct TestDbConfig {
    /// Server host.
    pub host: String,
    /// Server port.
    pub port: u16,
    /// Role with `CREATEDB`.
    pub username: String,
    /// Password for `username`.
    pub password: String,
}

impl TestDbConfig {
    /// Read `TEST_DB_HOST`, `TEST_DB_PORT`, `TEST_DB_USER` and `TEST_DB_PASSWORD`.
    #[must_use]
    pub fn from_env() -> Self {
        let var = |key: &str, default: &str| std::env::var(key).unwrap_or_else(|_| default.to_string());

        Self {
            host: var("TEST_DB_HOST", "localhost"),
            port: var("TEST_DB_PORT", "5433").parse().unwrap_or(5433),
            username: var("TEST_DB_USER", "agora_test"),
            password: var("TEST_DB_PASSWORD", "agora_test"),
        }
    }

    /// Connection URL for `database` on this server.
    #[must_use]
    pub fn url(&self, database: &str) -> String {
        format!(
            "postgres://{}:{}@{}:{}/{database}",
            self.username, self.password, self.host, self.port
        )
    }

    async fn admin(&self, sql: String) -> Result<(), DbErr> {
        let conn = Database::connect(&self.url("postgres")).await?;
        let result = conn
            .execute(Statement::from_string(DatabaseBackend::Postgres, sql))
            .await;
        conn.close().await?;
        result.map(|_| ())
    }
}

/// A freshly created and migrated database.
pub struct TestDatabase {
    conn: Arc<DatabaseConnection>,
    name: String,
    config: TestDbConfig,
}

impl TestDatabase {
    /// Create a database named `agora_test_<random>` and run every migration on it.
    pub async fn create() -> Result<Self, DbErr> {
        let config = TestDbConfig::from_env();
        let name = format!(
            "agora_test_{}",
            &uuid::Uuid::new_v4().simple().to_string()[..8]
        );

        config.admin(format!("CREATE DATABASE \"{name}\"")).await?;

        let conn = Database::connect(&config.url(&name)).await?;
        Migrator::up(&conn, None).await?;
        info!(database = %name, "Created test database");

        Ok(Self {
            conn: Arc::new(conn),
            name,
            config,
        })
    }

    /// Shared connection, in the form repositories take it.
    #[must_use]
    pub fn connection(&self) -> Arc<DatabaseConnection> {
        self.conn.clone()
    }

    /// Drop the database, disconnecting any session still attached to it.
    pub async fn drop_database(self) -> Result<(), DbErr> {
        if let Ok(conn) = Arc::try_unwrap(self.conn) {
            conn.close().await?;
        }

        // Repositories may still hold connections.
        self.config
            .admin(format!(
                "SELECT pg_terminate_backend(pid) FROM pg_stat_activity WHERE datname = '{}'",
                self.name
            ))
            .await
            .ok();
        self.config
            .admin(format!("DROP DATABASE IF EXISTS \"{}\"", self.name))
            .await?;

        info!(database = %self.name, "Dropped test database");
        Ok(())
    }
}

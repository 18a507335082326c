//! Database module for the IPD service
//!
//! This module handles the connection pool, migrations and every read/write
//! the inpatient module performs. Operations are grouped per area as
//! `impl Database` blocks in the submodules.

use std::str::FromStr;
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::info;

use crate::config::{DatabaseConfig, NumberingConfig};
use crate::domain::billing::BillingPolicy;
use crate::error::{IpdError, Result};
use crate::models::BedAllocation;

mod admissions;
mod beds;
mod billing;
mod clinical;
mod discharge;
mod patients;
mod pharmacy;

/// Connection pool plus the numbering and billing rules writes depend on
#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
    numbering: NumberingConfig,
    billing: BillingPolicy,
}

impl Database {
    /// Create a new database connection
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(&config.url)?
            .create_if_missing(true)
            .foreign_keys(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(5));
        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .connect_with(options)
            .await?;
        info!(url = %config.url, "database connected");
        Ok(Self::from_pool(pool))
    }

    /// Migrated in-memory database on a single long-lived connection.
    /// Used by tests and local demos.
    pub async fn in_memory() -> Result<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;
        let db = Self::from_pool(pool);
        db.run_migrations().await?;
        Ok(db)
    }

    pub fn from_pool(pool: SqlitePool) -> Self {
        Self {
            pool,
            numbering: NumberingConfig::default(),
            billing: BillingPolicy::default(),
        }
    }

    pub fn with_numbering(mut self, numbering: NumberingConfig) -> Self {
        self.numbering = numbering;
        self
    }

    pub fn with_billing_policy(mut self, policy: BillingPolicy) -> Self {
        self.billing = policy;
        self
    }

    /// Get a reference to the connection pool
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn billing_policy(&self) -> &BillingPolicy {
        &self.billing
    }

    /// Run database migrations
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }
}

/// Bump a named counter and return its new value. Call inside the writing transaction.
async fn next_sequence(conn: &mut SqliteConnection, name: &str) -> Result<i64> {
    let value: i64 = sqlx::query_scalar("UPDATE sequences SET value = value + 1 WHERE name = ? RETURNING value")
        .bind(name)
        .fetch_one(&mut *conn)
        .await?;
    Ok(value)
}

async fn find_allocation(conn: &mut SqliteConnection, ip_number: &str) -> Result<BedAllocation> {
    sqlx::query_as::<_, BedAllocation>("SELECT * FROM bed_allocations WHERE ip_number = ?")
        .bind(ip_number)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| IpdError::not_found("admission", ip_number))
}

/// Clinical and billing writes are only accepted while the stay is open.
///
/// The no-op UPDATE takes SQLite's write lock before anything is read, so this
/// has to be the first statement of the writing transaction.
async fn claim_active_allocation(conn: &mut SqliteConnection, ip_number: &str) -> Result<BedAllocation> {
    let allocation = sqlx::query_as::<_, BedAllocation>(
        "UPDATE bed_allocations SET status = status WHERE ip_number = ? AND status = 'active' RETURNING *",
    )
    .bind(ip_number)
    .fetch_optional(&mut *conn)
    .await?;

    match allocation {
        Some(allocation) => Ok(allocation),
        None => Err(closed_or_missing(conn, ip_number).await),
    }
}

/// Why a guarded write on an open stay matched nothing
async fn closed_or_missing(conn: &mut SqliteConnection, ip_number: &str) -> IpdError {
    match find_allocation(conn, ip_number).await {
        Ok(allocation) => IpdError::AllocationClosed(allocation.ip_number),
        Err(e) => e,
    }
}

//! Database schema migrations for SQLite.
//!
//! We use a simple versioned migration system. Each migration is a SQL string
//! that transforms the schema from version N to N+1.

use rusqlite::Connection;

use crate::error::{Result, StoreError};

/// Current schema version.
pub const CURRENT_VERSION: u32 = 3;

/// Initialize or migrate the database schema.
///
/// This function is idempotent - it can be called multiple times safely.
pub fn migrate(conn: &mut Connection) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version INTEGER PRIMARY KEY,
            applied_at INTEGER NOT NULL
        )",
        [],
    )?;

    let current: u32 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
        [],
        |row| row.get(0),
    )?;

    if current > CURRENT_VERSION {
        return Err(StoreError::Migration(format!(
            "database schema version {} is newer than supported version {}",
            current, CURRENT_VERSION
        )));
    }

    if current < CURRENT_VERSION {
        let tx = conn.transaction()?;

        for version in (current + 1)..=CURRENT_VERSION {
            apply_migration(&tx, version)?;

            tx.execute(
                "INSERT INTO schema_migrations (version, applied_at) VALUES (?1, ?2)",
                rusqlite::params![version, now_millis()],
            )?;
        }

        tx.commit()?;
        tracing::debug!(from = current, to = CURRENT_VERSION, "migrated event log schema");
    }

    Ok(())
}

/// Apply a specific migration version.
fn apply_migration(conn: &Connection, version: u32) -> Result<()> {
    match version {
        1 => apply_v1(conn),
        2 => apply_v2(conn),
        3 => apply_v3(conn),
        _ => Err(StoreError::Migration(format!(
            "unknown migration version: {}",
            version
        ))),
    }
}

/// Migration v1: change event log and chain height.
fn apply_v1(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        -- Append-only log of name changes
        CREATE TABLE thorname_change_events (
            seq INTEGER PRIMARY KEY AUTOINCREMENT,  -- append order, tie-break for equal timestamps
            name TEXT NOT NULL,
            chain TEXT NOT NULL,                    -- chain identifier, compared as UPPER(chain)
            address TEXT NOT NULL,                  -- address bound on `chain`
            owner TEXT NOT NULL,
            expire_height INTEGER NOT NULL,         -- live while expire_height > current height
            block_timestamp INTEGER NOT NULL
        );

        -- Single-row table holding the current indexed height
        CREATE TABLE chain_height (
            id INTEGER PRIMARY KEY CHECK (id = 1),
            height INTEGER NOT NULL
        );

        INSERT INTO chain_height (id, height) VALUES (1, 0);

        CREATE INDEX idx_events_name_chain_ts
            ON thorname_change_events(name, chain, block_timestamp);
        "#,
    )?;

    Ok(())
}

/// Migration v2: reverse-lookup indexes.
fn apply_v2(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        CREATE INDEX idx_events_address ON thorname_change_events(address);
        CREATE INDEX idx_events_owner ON thorname_change_events(owner);
        "#,
    )?;

    Ok(())
}

/// Migration v3: index the normalized chain key.
///
/// Lookups compare and partition on `UPPER(chain)`, which the v1 index on
/// the raw column cannot serve.
fn apply_v3(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        CREATE INDEX idx_events_name_upper_chain_ts
            ON thorname_change_events(name, UPPER(chain), block_timestamp);
        "#,
    )?;

    Ok(())
}

/// Get current time in milliseconds.
fn now_millis() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

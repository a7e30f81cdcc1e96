use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::Utc;
use rusqlite::{Connection, OpenFlags};
use tracing::info;

use crate::errors::AppResult;

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

pub struct DatabaseContext {
    pub connection: Connection,
    pub path: PathBuf,
}

pub fn bootstrap<P: AsRef<Path>>(data_dir: P, database_file: &str) -> AppResult<DatabaseContext> {
    let data_dir = data_dir.as_ref();
    std::fs::create_dir_all(data_dir)?;
    let db_path = data_dir.join(database_file);

    let flags = OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_CREATE;
    let connection = Connection::open_with_flags(&db_path, flags)?;
    apply_pragmas(&connection)?;
    run_migrations(&connection)?;

    info!(
        target: "database_bootstrap",
        path = %db_path.display(),
        "review store ready"
    );
    Ok(DatabaseContext {
        connection,
        path: db_path,
    })
}

fn apply_pragmas(connection: &Connection) -> AppResult<()> {
    connection.busy_timeout(BUSY_TIMEOUT)?;
    connection.execute_batch("PRAGMA journal_mode = WAL;")?;
    Ok(())
}

/// Tables are created when absent and never altered afterwards.
fn run_migrations(connection: &Connection) -> AppResult<()> {
    connection.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS approvals (
            id INTEGER PRIMARY KEY,
            approved INTEGER NOT NULL,
            updated_at INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS place_mappings (
            listing TEXT PRIMARY KEY,
            place_id TEXT
        );

        CREATE TABLE IF NOT EXISTS google_cache (
            place_id TEXT PRIMARY KEY,
            payload TEXT,
            fetched_at INTEGER
        );
        "#,
    )?;
    Ok(())
}

/// Wall-clock epoch seconds used for `updated_at` and `fetched_at`.
pub fn now_timestamp() -> i64 {
    Utc::now().timestamp()
}

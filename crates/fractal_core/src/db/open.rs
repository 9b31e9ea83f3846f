//! Connection open helpers.
//!
//! Every open path emits a `db_open` start event and one ok/error event
//! carrying the elapsed time.

use super::DbResult;
use crate::config::{DbConfig, DbLocation};
use log::{error, info};
use rusqlite::Connection;
use std::path::Path;
use std::time::Instant;

/// Opens (or creates) a database file with default connection settings.
pub fn open_db(path: impl AsRef<Path>) -> DbResult<Connection> {
    open_with_config(&DbConfig::file(path.as_ref()))
}

/// Opens a private in-memory database with default connection settings.
pub fn open_db_in_memory() -> DbResult<Connection> {
    open_with_config(&DbConfig::memory())
}

/// Opens a connection described by `config` and applies its pragmas.
pub fn open_with_config(config: &DbConfig) -> DbResult<Connection> {
    let started_at = Instant::now();
    let mode = config.location.mode();
    info!("event=db_open module=db status=start mode={mode}");

    let opened = match &config.location {
        DbLocation::Memory => Connection::open_in_memory(),
        DbLocation::File(path) => Connection::open(path),
    };
    let conn = match opened {
        Ok(conn) => conn,
        Err(err) => {
            error!(
                "event=db_open module=db status=error mode={mode} duration_ms={} error_code=db_open_failed error={err}",
                started_at.elapsed().as_millis()
            );
            return Err(err.into());
        }
    };

    if let Err(err) = configure(&conn, config) {
        error!(
            "event=db_open module=db status=error mode={mode} duration_ms={} error_code=db_configure_failed error={err}",
            started_at.elapsed().as_millis()
        );
        return Err(err.into());
    }

    info!(
        "event=db_open module=db status=ok mode={mode} duration_ms={}",
        started_at.elapsed().as_millis()
    );
    Ok(conn)
}

fn configure(conn: &Connection, config: &DbConfig) -> rusqlite::Result<()> {
    let foreign_keys = if config.foreign_keys { "ON" } else { "OFF" };
    conn.execute_batch(&format!("PRAGMA foreign_keys = {foreign_keys};"))?;
    conn.busy_timeout(config.busy_timeout)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{open_db_in_memory, open_with_config};
    use crate::config::DbConfig;

    fn foreign_keys(conn: &rusqlite::Connection) -> i64 {
        conn.query_row("PRAGMA foreign_keys;", [], |row| row.get(0))
            .unwrap()
    }

    #[test]
    fn in_memory_connection_enables_foreign_keys() {
        let conn = open_db_in_memory().unwrap();
        assert_eq!(foreign_keys(&conn), 1);
    }

    #[test]
    fn foreign_keys_follow_config() {
        let config = DbConfig {
            foreign_keys: false,
            ..DbConfig::memory()
        };
        let conn = open_with_config(&config).unwrap();
        assert_eq!(foreign_keys(&conn), 0);
    }
}

use crate::Result;
use deadpool_sqlite::{Config, Pool, Runtime};
use rusqlite::Connection;

pub mod access_token;
pub mod admin;
pub mod audit_log;
pub mod conf;
pub mod document;
pub mod migration;

pub fn open_connection() -> Result<Connection> {
    let conn = Connection::open(crate::conf::db_path())?;
    conn.pragma_update(None, "journal_mode", "WAL")?;
    conn.pragma_update(None, "synchronous", "NORMAL")?;
    Ok(conn)
}

pub fn pool() -> Result<Pool> {
    Config::new(crate::conf::db_path())
        .create_pool(Runtime::Tokio1)
        .map_err(Into::into)
}

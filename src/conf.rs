use std::env;

const DEFAULT_DB_PATH: &str = "epi-admin.db";
const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8000";

/// Process level settings, domain settings live in the `conf` table
pub fn db_path() -> String {
    env::var("EPI_ADMIN_DB").unwrap_or_else(|_| DEFAULT_DB_PATH.into())
}

pub fn bind_addr() -> String {
    env::var("EPI_ADMIN_BIND").unwrap_or_else(|_| DEFAULT_BIND_ADDR.into())
}

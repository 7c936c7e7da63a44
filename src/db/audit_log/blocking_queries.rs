use super::schema::{self, AuditLogEntry, Columns};
use crate::Result;
use rusqlite::{params, Connection};
use serde_json::{Map, Value};

pub fn insert(
    action: &str,
    details: &Map<String, Value>,
    actor_email: &str,
    created_at: &str,
    conn: &Connection,
) -> Result<AuditLogEntry> {
    let sql = format!(
        r#"
            INSERT INTO {table} ({action}, {details}, {actor_email}, {created_at})
            VALUES (?1, json(?2), ?3, ?4)
            RETURNING {projection}
        "#,
        table = schema::NAME,
        action = Columns::Action.as_str(),
        details = Columns::Details.as_str(),
        actor_email = Columns::ActorEmail.as_str(),
        created_at = Columns::CreatedAt.as_str(),
        projection = AuditLogEntry::projection(),
    );
    conn.query_row(
        &sql,
        params![action, serde_json::to_string(details)?, actor_email, created_at],
        AuditLogEntry::mapper(),
    )
    .map_err(Into::into)
}

/// Newest first
pub fn select_latest(limit: i64, conn: &Connection) -> Result<Vec<AuditLogEntry>> {
    let sql = format!(
        r#"
            SELECT {projection}
            FROM {table}
            ORDER BY {id} DESC
            LIMIT ?1
        "#,
        projection = AuditLogEntry::projection(),
        table = schema::NAME,
        id = Columns::Id.as_str(),
    );
    conn.prepare(&sql)?
        .query_map(params![limit], AuditLogEntry::mapper())?
        .collect::<Result<Vec<_>, _>>()
        .map_err(Into::into)
}

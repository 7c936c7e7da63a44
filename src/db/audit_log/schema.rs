use rusqlite::Row;
use serde::Serialize;
use serde_json::{Map, Value};
use std::sync::OnceLock;

pub const NAME: &str = "audit_log";

pub enum Columns {
    Id,
    Action,
    Details,
    ActorEmail,
    CreatedAt,
}

impl Columns {
    pub fn as_str(&self) -> &'static str {
        match self {
            Columns::Id => "id",
            Columns::Action => "action",
            Columns::Details => "details",
            Columns::ActorEmail => "actor_email",
            Columns::CreatedAt => "created_at",
        }
    }
}

#[derive(Debug, PartialEq, Serialize)]
pub struct AuditLogEntry {
    pub id: i64,
    pub action: String,
    pub details: Map<String, Value>,
    pub actor_email: String,
    pub created_at: String,
}

impl AuditLogEntry {
    pub fn projection() -> &'static str {
        static PROJECTION: OnceLock<String> = OnceLock::new();
        PROJECTION.get_or_init(|| {
            [
                Columns::Id,
                Columns::Action,
                Columns::Details,
                Columns::ActorEmail,
                Columns::CreatedAt,
            ]
            .iter()
            .map(Columns::as_str)
            .collect::<Vec<_>>()
            .join(", ")
        })
    }

    pub const fn mapper() -> fn(&Row) -> rusqlite::Result<Self> {
        |row: &Row| -> rusqlite::Result<Self> {
            let details: Value = row.get(Columns::Details.as_str())?;
            Ok(AuditLogEntry {
                id: row.get(Columns::Id.as_str())?,
                action: row.get(Columns::Action.as_str())?,
                details: match details {
                    Value::Object(details) => details,
                    _ => Map::new(),
                },
                actor_email: row.get(Columns::ActorEmail.as_str())?,
                created_at: row.get(Columns::CreatedAt.as_str())?,
            })
        }
    }
}

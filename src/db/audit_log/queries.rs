use super::{blocking_queries, schema::AuditLogEntry};
use crate::Result;
use deadpool_sqlite::Pool;
use serde_json::{Map, Value};

pub async fn insert(
    action: impl Into<String>,
    details: Map<String, Value>,
    actor_email: impl Into<String>,
    created_at: impl Into<String>,
    pool: &Pool,
) -> Result<AuditLogEntry> {
    let action = action.into();
    let actor_email = actor_email.into();
    let created_at = created_at.into();
    pool.get()
        .await?
        .interact(move |conn| {
            blocking_queries::insert(&action, &details, &actor_email, &created_at, conn)
        })
        .await?
}

pub async fn select_latest(limit: i64, pool: &Pool) -> Result<Vec<AuditLogEntry>> {
    pool.get()
        .await?
        .interact(move |conn| blocking_queries::select_latest(limit, conn))
        .await?
}

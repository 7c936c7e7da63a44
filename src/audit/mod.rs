use crate::db;
use deadpool_sqlite::Pool;
use serde_json::{Map, Value};
use std::sync::Arc;
use strum::{AsRefStr, Display};
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;
use tracing::{info, warn};

#[derive(Clone, Copy, Debug, PartialEq, Eq, AsRefStr, Display)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditAction {
    AdminLogin,
    AdminLogout,
    DashboardFilterChange,
    Navigation,
    ExportCsv,
}

/// Append-only record of admin actions. Writing is best-effort: a failed write is logged
/// and otherwise ignored.
#[derive(Clone)]
pub struct AuditLog {
    pool: Arc<Pool>,
}

impl AuditLog {
    pub fn new(pool: &Arc<Pool>) -> Self {
        AuditLog { pool: pool.clone() }
    }

    pub async fn log(&self, action: AuditAction, details: Map<String, Value>, actor_email: &str) {
        let created_at = match OffsetDateTime::now_utc().format(&Rfc3339) {
            Ok(created_at) => created_at,
            Err(e) => {
                warn!(%action, error = %e, "Failed to format audit timestamp");
                return;
            }
        };
        match db::audit_log::queries::insert(
            action.as_ref(),
            details,
            actor_email,
            created_at,
            &self.pool,
        )
        .await
        {
            Ok(entry) => info!(%action, actor_email, id = entry.id, "Admin action"),
            Err(e) => warn!(%action, error = %e, "Failed to log admin action"),
        }
    }
}

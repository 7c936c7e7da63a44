use super::{blocking_queries, schema::Admin};
use crate::Result;
use deadpool_sqlite::Pool;

#[cfg(test)]
pub async fn upsert(
    email: impl Into<String>,
    password: impl Into<String>,
    pool: &Pool,
) -> Result<Admin> {
    let email = email.into();
    let password = password.into();
    pool.get()
        .await?
        .interact(move |conn| blocking_queries::upsert(&email, &password, conn))
        .await?
}

pub async fn select_by_id(id: i64, pool: &Pool) -> Result<Admin> {
    pool.get()
        .await?
        .interact(move |conn| blocking_queries::select_by_id(id, conn))
        .await?
}

pub async fn select_by_email(email: impl Into<String>, pool: &Pool) -> Result<Admin> {
    let email = email.into();
    pool.get()
        .await?
        .interact(move |conn| blocking_queries::select_by_email(&email, conn))
        .await?
}

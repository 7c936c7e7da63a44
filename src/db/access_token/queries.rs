use super::{blocking_queries, schema::AccessToken};
use crate::Result;
use deadpool_sqlite::Pool;

pub async fn insert(admin_id: i64, secret: impl Into<String>, pool: &Pool) -> Result<AccessToken> {
    let secret = secret.into();
    pool.get()
        .await?
        .interact(move |conn| blocking_queries::insert(admin_id, &secret, conn))
        .await?
}

pub async fn select_by_secret(secret: impl Into<String>, pool: &Pool) -> Result<AccessToken> {
    let secret = secret.into();
    pool.get()
        .await?
        .interact(move |conn| blocking_queries::select_by_secret(&secret, conn))
        .await?
}

pub async fn mark_deleted(secret: impl Into<String>, pool: &Pool) -> Result<usize> {
    let secret = secret.into();
    pool.get()
        .await?
        .interact(move |conn| blocking_queries::mark_deleted(&secret, conn))
        .await?
}

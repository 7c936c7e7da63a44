use super::{blocking_queries, schema::Conf};
use crate::Result;
use deadpool_sqlite::Pool;

pub async fn select(pool: &Pool) -> Result<Conf> {
    pool.get()
        .await?
        .interact(|conn| blocking_queries::select(conn))
        .await?
}

#[cfg(test)]
pub async fn set_admin_email(email: impl Into<String>, pool: &Pool) -> Result<()> {
    let email = email.into();
    pool.get()
        .await?
        .interact(move |conn| blocking_queries::set_admin_email(&email, conn))
        .await?
}

use super::schema::{self, AccessToken, Columns};
use crate::Result;
use rusqlite::{params, Connection};

pub fn insert(admin_id: i64, secret: &str, conn: &Connection) -> Result<AccessToken> {
    let sql = format!(
        r#"
            INSERT INTO {table} ({admin_id}, {secret})
            VALUES (?1, ?2)
            RETURNING {projection}
        "#,
        table = schema::NAME,
        admin_id = Columns::AdminId.as_str(),
        secret = Columns::Secret.as_str(),
        projection = AccessToken::projection(),
    );
    conn.query_row(&sql, params![admin_id, secret], AccessToken::mapper())
        .map_err(Into::into)
}

/// Deleted tokens are never returned
pub fn select_by_secret(secret: &str, conn: &Connection) -> Result<AccessToken> {
    let sql = format!(
        r#"
            SELECT {projection}
            FROM {table}
            WHERE {secret} = ?1 AND {deleted_at} IS NULL
        "#,
        projection = AccessToken::projection(),
        table = schema::NAME,
        secret = Columns::Secret.as_str(),
        deleted_at = Columns::DeletedAt.as_str(),
    );
    conn.query_row(&sql, params![secret], AccessToken::mapper())
        .map_err(Into::into)
}

pub fn mark_deleted(secret: &str, conn: &Connection) -> Result<usize> {
    let sql = format!(
        r#"
            UPDATE {table}
            SET {deleted_at} = strftime('%Y-%m-%dT%H:%M:%fZ'),
                {updated_at} = strftime('%Y-%m-%dT%H:%M:%fZ')
            WHERE {secret} = ?1 AND {deleted_at} IS NULL
        "#,
        table = schema::NAME,
        deleted_at = Columns::DeletedAt.as_str(),
        updated_at = Columns::UpdatedAt.as_str(),
        secret = Columns::Secret.as_str(),
    );
    conn.execute(&sql, params![secret]).map_err(Into::into)
}

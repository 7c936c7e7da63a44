use super::schema::{self, Admin, Columns};
use crate::Result;
use rusqlite::{params, Connection};

/// Inserts a new admin or replaces the password of an existing one
pub fn upsert(email: &str, password: &str, conn: &Connection) -> Result<Admin> {
    let sql = format!(
        r#"
            INSERT INTO {table} ({email}, {password})
            VALUES (?1, ?2)
            ON CONFLICT ({email}) DO UPDATE SET
                {password} = excluded.{password},
                {updated_at} = strftime('%Y-%m-%dT%H:%M:%fZ'),
                {deleted_at} = NULL
            RETURNING {projection}
        "#,
        table = schema::NAME,
        email = Columns::Email.as_str(),
        password = Columns::Password.as_str(),
        updated_at = Columns::UpdatedAt.as_str(),
        deleted_at = Columns::DeletedAt.as_str(),
        projection = Admin::projection(),
    );
    conn.query_row(&sql, params![email, password], Admin::mapper())
        .map_err(Into::into)
}

pub fn select_by_id(id: i64, conn: &Connection) -> Result<Admin> {
    let sql = format!(
        r#"
            SELECT {projection}
            FROM {table}
            WHERE {id} = ?1
        "#,
        projection = Admin::projection(),
        table = schema::NAME,
        id = Columns::Id.as_str(),
    );
    conn.query_row(&sql, params![id], Admin::mapper())
        .map_err(Into::into)
}

pub fn select_by_email(email: &str, conn: &Connection) -> Result<Admin> {
    let sql = format!(
        r#"
            SELECT {projection}
            FROM {table}
            WHERE {email} = ?1 AND {deleted_at} IS NULL
        "#,
        projection = Admin::projection(),
        table = schema::NAME,
        email = Columns::Email.as_str(),
        deleted_at = Columns::DeletedAt.as_str(),
    );
    conn.query_row(&sql, params![email], Admin::mapper())
        .map_err(Into::into)
}

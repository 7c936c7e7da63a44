use super::schema::{self, Columns, Conf};
use crate::Result;
use rusqlite::{params, Connection};

pub fn select(conn: &Connection) -> Result<Conf> {
    let sql = format!(
        r#"
            SELECT {projection}
            FROM {table}
        "#,
        projection = Conf::projection(),
        table = schema::TABLE_NAME,
    );
    conn.prepare(&sql)?
        .query_row((), Conf::mapper())
        .map_err(Into::into)
}

pub fn set_admin_email(email: &str, conn: &Connection) -> Result<()> {
    let sql = format!(
        r#"
            UPDATE {table}
            SET {admin_email} = ?1
        "#,
        table = schema::TABLE_NAME,
        admin_email = Columns::AdminEmail.as_str(),
    );
    conn.execute(&sql, params![email])?;
    Ok(())
}

use crate::{Error, Result};
use include_dir::{include_dir, Dir};
use rusqlite::Connection;
use tracing::{info, warn};

static MIGRATIONS_DIR: Dir<'_> = include_dir!("$CARGO_MANIFEST_DIR/migrations");

/// `N.sql` moves the schema to `user_version = N`
struct Migration {
    version: i32,
    sql: &'static str,
}

pub fn run(conn: &mut Connection) -> Result<()> {
    apply(&embedded()?, conn)
}

/// Files are picked up in order starting from `1.sql` until the first gap
fn embedded() -> Result<Vec<Migration>> {
    (1..)
        .map_while(|version| {
            MIGRATIONS_DIR
                .get_file(format!("{version}.sql"))
                .map(|file| (version, file))
        })
        .map(|(version, file)| {
            let sql = file
                .contents_utf8()
                .ok_or_else(|| Error::Generic(format!("{version}.sql is not valid UTF-8")))?;
            Ok(Migration { version, sql })
        })
        .collect()
}

fn schema_version(conn: &Connection) -> Result<i32> {
    conn.query_row("SELECT user_version FROM pragma_user_version", [], |row| {
        row.get(0)
    })
    .map_err(Into::into)
}

fn apply(migrations: &[Migration], conn: &mut Connection) -> Result<()> {
    let current = schema_version(conn)?;
    let pending: Vec<&Migration> = migrations
        .iter()
        .filter(|it| it.version > current)
        .collect();
    if pending.is_empty() {
        info!(schema_version = current, "Database schema is up to date");
        return Ok(());
    }
    for migration in pending {
        warn!(version = migration.version, "Applying migration");
        let tx = conn.transaction()?;
        tx.execute_batch(migration.sql)?;
        tx.pragma_update(None, "user_version", migration.version)?;
        tx.commit()?;
    }
    info!(
        schema_version = schema_version(conn)?,
        "Database schema migrated"
    );
    Ok(())
}

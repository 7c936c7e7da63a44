use rusqlite::Row;
use std::sync::OnceLock;

pub const TABLE_NAME: &str = "conf";

pub enum Columns {
    AdminEmail,
    CoverageDosesPerChild,
    RecentImmunizationsLimit,
}

impl Columns {
    pub fn as_str(&self) -> &'static str {
        match self {
            Columns::AdminEmail => "admin_email",
            Columns::CoverageDosesPerChild => "coverage_doses_per_child",
            Columns::RecentImmunizationsLimit => "recent_immunizations_limit",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Conf {
    pub admin_email: String,
    pub coverage_doses_per_child: i64,
    pub recent_immunizations_limit: i64,
}

impl Conf {
    pub fn projection() -> &'static str {
        static PROJECTION: OnceLock<String> = OnceLock::new();
        PROJECTION.get_or_init(|| {
            [
                Columns::AdminEmail,
                Columns::CoverageDosesPerChild,
                Columns::RecentImmunizationsLimit,
            ]
            .iter()
            .map(Columns::as_str)
            .collect::<Vec<_>>()
            .join(", ")
        })
    }

    pub const fn mapper() -> fn(&Row) -> rusqlite::Result<Self> {
        |row| {
            Ok(Self {
                admin_email: row.get(Columns::AdminEmail.as_str())?,
                coverage_doses_per_child: row.get(Columns::CoverageDosesPerChild.as_str())?,
                recent_immunizations_limit: row
                    .get(Columns::RecentImmunizationsLimit.as_str())?,
            })
        }
    }

    #[cfg(test)]
    pub fn mock() -> Conf {
        Conf {
            admin_email: "admin@example.org".into(),
            coverage_doses_per_child: 10,
            recent_immunizations_limit: 10,
        }
    }
}

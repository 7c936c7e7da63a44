use crate::{date, Error, Result};
use regex::Regex;
use rusqlite::Row;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::OnceLock;
use time::OffsetDateTime;

pub const NAME: &str = "document";

pub enum Columns {
    Collection,
    Id,
    Fields,
    CreatedAt,
    UpdatedAt,
}

impl Columns {
    pub fn as_str(&self) -> &'static str {
        match self {
            Columns::Collection => "collection",
            Columns::Id => "id",
            Columns::Fields => "fields",
            Columns::CreatedAt => "created_at",
            Columns::UpdatedAt => "updated_at",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct Document {
    pub collection: String,
    pub id: String,
    pub fields: Map<String, Value>,
    pub created_at: String,
    pub updated_at: String,
}

impl Document {
    pub fn projection() -> &'static str {
        static PROJECTION: OnceLock<String> = OnceLock::new();
        PROJECTION.get_or_init(|| {
            [
                Columns::Collection,
                Columns::Id,
                Columns::Fields,
                Columns::CreatedAt,
                Columns::UpdatedAt,
            ]
            .iter()
            .map(Columns::as_str)
            .collect::<Vec<_>>()
            .join(", ")
        })
    }

    pub const fn mapper() -> fn(&Row) -> rusqlite::Result<Self> {
        |row: &Row| -> rusqlite::Result<Self> {
            let fields: Value = row.get(Columns::Fields.as_str())?;
            Ok(Document {
                collection: row.get(Columns::Collection.as_str())?,
                id: row.get(Columns::Id.as_str())?,
                fields: match fields {
                    Value::Object(fields) => fields,
                    _ => Map::new(),
                },
                created_at: row.get(Columns::CreatedAt.as_str())?,
                updated_at: row.get(Columns::UpdatedAt.as_str())?,
            })
        }
    }

    #[cfg(test)]
    pub fn mock(collection: &str, id: &str, fields: Value) -> Document {
        Document {
            collection: collection.into(),
            id: id.into(),
            fields: match fields {
                Value::Object(fields) => fields,
                _ => Map::new(),
            },
            created_at: "2024-01-01T00:00:00.000Z".into(),
            updated_at: "2024-01-01T00:00:00.000Z".into(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Asc,
    Desc,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OrderBy {
    pub field: String,
    pub direction: Direction,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Query {
    pub collection: String,
    pub order_by: Option<OrderBy>,
    pub limit: Option<i64>,
}

impl Query {
    pub fn collection(collection: impl Into<String>) -> Self {
        Query {
            collection: collection.into(),
            order_by: None,
            limit: None,
        }
    }

    pub fn order_by(mut self, field: impl Into<String>, direction: Direction) -> Self {
        self.order_by = Some(OrderBy {
            field: field.into(),
            direction,
        });
        self
    }

    pub fn limit(mut self, limit: i64) -> Self {
        self.limit = Some(limit);
        self
    }
}

pub fn is_identifier(name: &str) -> bool {
    static IDENTIFIER: OnceLock<Regex> = OnceLock::new();
    IDENTIFIER
        .get_or_init(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").unwrap())
        .is_match(name)
}

pub fn check_identifier(name: &str) -> Result<()> {
    if is_identifier(name) {
        Ok(())
    } else {
        Err(Error::invalid_input(format!("Invalid identifier: {name}")))
    }
}

/// Ordering of one field across documents. Dates compare through [`date::normalize`] in any of
/// the shapes the store holds, so a value the dashboard shows as `Unknown` never outranks a
/// real date. Other values compare as text below every date, missing ones sort lowest.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum SortKey {
    Missing,
    Text(String),
    Date(OffsetDateTime),
}

impl SortKey {
    pub fn of(fields: &Map<String, Value>, field: &str) -> SortKey {
        match fields.get(field) {
            None | Some(Value::Null) => SortKey::Missing,
            Some(value) => match date::normalize(value) {
                Some(date) => SortKey::Date(date),
                None => match value {
                    Value::String(text) => SortKey::Text(text.clone()),
                    other => SortKey::Text(other.to_string()),
                },
            },
        }
    }
}

use crate::date;
use crate::store::{Direction, Document, Query, Snapshot};
use serde_json::{Map, Value};
use std::collections::HashMap;
use strum::{AsRefStr, Display, EnumIter};
use time::OffsetDateTime;

pub const UNKNOWN: &str = "Unknown";

/// Collections the dashboard keeps a live copy of
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, AsRefStr, Display, EnumIter)]
#[strum(serialize_all = "snake_case")]
pub enum Collection {
    Facilities,
    Users,
    Children,
    Immunizations,
}

impl Collection {
    /// Immunizations are watched as a window of the latest records, the rest in full
    pub fn query(&self, window: i64) -> Query {
        match self {
            Collection::Immunizations => Query::collection(self.as_ref())
                .order_by("date", Direction::Desc)
                .limit(window),
            _ => Query::collection(self.as_ref()),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Facility {
    pub id: String,
    pub name: Option<String>,
}

impl Facility {
    pub fn label(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.id)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct User {
    pub id: String,
    pub role: String,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Child {
    pub id: String,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Immunization {
    pub id: String,
    pub child_name: String,
    pub vaccine_name: String,
    pub facility_name: String,
    pub date: Option<OffsetDateTime>,
}

/// Conversion from a raw document. Missing or malformed fields never fail the conversion,
/// they fall back to [`UNKNOWN`] or `None`.
pub trait Record: Sized {
    fn from_document(doc: &Document) -> Self;
}

impl Record for Facility {
    fn from_document(doc: &Document) -> Self {
        Facility {
            id: doc.id.clone(),
            name: text(&doc.fields, "name"),
        }
    }
}

impl Record for User {
    fn from_document(doc: &Document) -> Self {
        User {
            id: doc.id.clone(),
            role: text_or_unknown(&doc.fields, "role"),
        }
    }
}

impl Record for Child {
    fn from_document(doc: &Document) -> Self {
        Child {
            id: doc.id.clone(),
        }
    }
}

impl Record for Immunization {
    fn from_document(doc: &Document) -> Self {
        Immunization {
            id: doc.id.clone(),
            child_name: text_or_unknown(&doc.fields, "childName"),
            vaccine_name: text_or_unknown(&doc.fields, "vaccineName"),
            facility_name: text_or_unknown(&doc.fields, "facilityName"),
            date: doc.fields.get("date").and_then(date::normalize),
        }
    }
}

fn text(fields: &Map<String, Value>, key: &str) -> Option<String> {
    match fields.get(key)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn text_or_unknown(fields: &Map<String, Value>, key: &str) -> String {
    text(fields, key).unwrap_or_else(|| UNKNOWN.into())
}

/// Local copy of one collection, always equal to the latest snapshot applied
#[derive(Debug)]
pub struct CollectionMirror<T> {
    revision: u64,
    items: Vec<T>,
}

impl<T> Default for CollectionMirror<T> {
    fn default() -> Self {
        CollectionMirror {
            revision: 0,
            items: vec![],
        }
    }
}

impl<T: Record> CollectionMirror<T> {
    /// Swaps the whole content for the snapshot. Snapshots older than the one already held
    /// are ignored, a repeated id keeps its first position and takes the later value.
    fn replace(&mut self, snapshot: &Snapshot) -> bool {
        if snapshot.revision <= self.revision {
            return false;
        }
        let mut positions: HashMap<&str, usize> = HashMap::new();
        let mut items: Vec<T> = Vec::with_capacity(snapshot.documents.len());
        for doc in &snapshot.documents {
            let record = T::from_document(doc);
            match positions.get(doc.id.as_str()) {
                Some(&pos) => items[pos] = record,
                None => {
                    positions.insert(&doc.id, items.len());
                    items.push(record);
                }
            }
        }
        self.items = items;
        self.revision = snapshot.revision;
        true
    }

    pub fn items(&self) -> &[T] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }
}

/// Client side copy of every watched collection. Only the dashboard that owns it writes to
/// it, everything else gets a shared reference.
#[derive(Debug, Default)]
pub struct Mirror {
    facilities: CollectionMirror<Facility>,
    users: CollectionMirror<User>,
    children: CollectionMirror<Child>,
    immunizations: CollectionMirror<Immunization>,
}

impl Mirror {
    /// Returns false when the snapshot was stale and nothing changed
    pub(super) fn apply(&mut self, collection: Collection, snapshot: &Snapshot) -> bool {
        match collection {
            Collection::Facilities => self.facilities.replace(snapshot),
            Collection::Users => self.users.replace(snapshot),
            Collection::Children => self.children.replace(snapshot),
            Collection::Immunizations => self.immunizations.replace(snapshot),
        }
    }

    pub fn facilities(&self) -> &CollectionMirror<Facility> {
        &self.facilities
    }

    pub fn users(&self) -> &CollectionMirror<User> {
        &self.users
    }

    pub fn children(&self) -> &CollectionMirror<Child> {
        &self.children
    }

    pub fn immunizations(&self) -> &CollectionMirror<Immunization> {
        &self.immunizations
    }
}

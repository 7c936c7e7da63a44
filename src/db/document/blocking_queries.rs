use super::schema::{self, check_identifier, Columns, Direction, Document, Query, SortKey};
use crate::Result;
use rusqlite::{params, Connection};
use serde_json::{Map, Value};
use std::cmp::Reverse;

pub fn insert(
    collection: &str,
    id: &str,
    fields: &Map<String, Value>,
    conn: &Connection,
) -> Result<Document> {
    let sql = format!(
        r#"
            INSERT INTO {table} ({collection}, {id}, {fields})
            VALUES (?1, ?2, json(?3))
            RETURNING {projection}
        "#,
        table = schema::NAME,
        collection = Columns::Collection.as_str(),
        id = Columns::Id.as_str(),
        fields = Columns::Fields.as_str(),
        projection = Document::projection(),
    );
    conn.query_row(
        &sql,
        params![collection, id, serde_json::to_string(fields)?],
        Document::mapper(),
    )
    .map_err(Into::into)
}

/// Replaces all fields of a document, creating it if needed
pub fn upsert(
    collection: &str,
    id: &str,
    fields: &Map<String, Value>,
    conn: &Connection,
) -> Result<Document> {
    let sql = format!(
        r#"
            INSERT INTO {table} ({collection}, {id}, {fields})
            VALUES (?1, ?2, json(?3))
            ON CONFLICT ({collection}, {id}) DO UPDATE SET
                {fields} = excluded.{fields},
                {updated_at} = strftime('%Y-%m-%dT%H:%M:%fZ')
            RETURNING {projection}
        "#,
        table = schema::NAME,
        collection = Columns::Collection.as_str(),
        id = Columns::Id.as_str(),
        fields = Columns::Fields.as_str(),
        updated_at = Columns::UpdatedAt.as_str(),
        projection = Document::projection(),
    );
    conn.query_row(
        &sql,
        params![collection, id, serde_json::to_string(fields)?],
        Document::mapper(),
    )
    .map_err(Into::into)
}

/// Merges `fields` into the stored ones, null values remove keys
pub fn patch(
    collection: &str,
    id: &str,
    fields: &Map<String, Value>,
    conn: &Connection,
) -> Result<Document> {
    let sql = format!(
        r#"
            UPDATE {table}
            SET {fields} = json_patch({fields}, ?1),
                {updated_at} = strftime('%Y-%m-%dT%H:%M:%fZ')
            WHERE {collection} = ?2 AND {id} = ?3
            RETURNING {projection}
        "#,
        table = schema::NAME,
        fields = Columns::Fields.as_str(),
        updated_at = Columns::UpdatedAt.as_str(),
        collection = Columns::Collection.as_str(),
        id = Columns::Id.as_str(),
        projection = Document::projection(),
    );
    conn.query_row(
        &sql,
        params![serde_json::to_string(fields)?, collection, id],
        Document::mapper(),
    )
    .map_err(Into::into)
}

pub fn delete(collection: &str, id: &str, conn: &Connection) -> Result<usize> {
    let sql = format!(
        r#"
            DELETE FROM {table}
            WHERE {collection} = ?1 AND {id} = ?2
        "#,
        table = schema::NAME,
        collection = Columns::Collection.as_str(),
        id = Columns::Id.as_str(),
    );
    conn.execute(&sql, params![collection, id])
        .map_err(Into::into)
}

pub fn select_by_id(collection: &str, id: &str, conn: &Connection) -> Result<Document> {
    let sql = format!(
        r#"
            SELECT {projection}
            FROM {table}
            WHERE {collection} = ?1 AND {id} = ?2
        "#,
        projection = Document::projection(),
        table = schema::NAME,
        collection = Columns::Collection.as_str(),
        id = Columns::Id.as_str(),
    );
    conn.query_row(&sql, params![collection, id], Document::mapper())
        .map_err(Into::into)
}

/// Without an explicit order documents come back in insertion order, ties keep it too
pub fn select(query: &Query, conn: &Connection) -> Result<Vec<Document>> {
    let sql = format!(
        r#"
            SELECT {projection}
            FROM {table}
            WHERE {collection} = ?1
            ORDER BY rowid
        "#,
        projection = Document::projection(),
        table = schema::NAME,
        collection = Columns::Collection.as_str(),
    );
    let mut documents = conn
        .prepare(&sql)?
        .query_map(params![query.collection], Document::mapper())?
        .collect::<Result<Vec<_>, _>>()?;
    if let Some(order_by) = &query.order_by {
        check_identifier(&order_by.field)?;
        match order_by.direction {
            Direction::Asc => {
                documents.sort_by_cached_key(|it| SortKey::of(&it.fields, &order_by.field))
            }
            Direction::Desc => documents
                .sort_by_cached_key(|it| Reverse(SortKey::of(&it.fields, &order_by.field))),
        }
    }
    if let Some(limit) = query.limit.and_then(|it| usize::try_from(it).ok()) {
        documents.truncate(limit);
    }
    Ok(documents)
}

#[cfg(test)]
mod test {
    use crate::db::document::schema::{Direction, Query};
    use crate::db::test::conn;
    use crate::{Error, Result};
    use serde_json::{json, Map, Value};

    fn fields(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => Map::new(),
        }
    }

    #[test]
    fn insert() -> Result<()> {
        let conn = conn();
        let doc = super::insert("facilities", "f1", &fields(json!({"name": "North"})), &conn)?;
        assert_eq!("facilities", doc.collection);
        assert_eq!("f1", doc.id);
        assert_eq!(json!("North"), doc.fields["name"]);
        assert_eq!(doc, super::select_by_id("facilities", "f1", &conn)?);
        Ok(())
    }

    #[test]
    fn insert_duplicate_id_fails() -> Result<()> {
        let conn = conn();
        super::insert("facilities", "f1", &Map::new(), &conn)?;
        assert!(super::insert("facilities", "f1", &Map::new(), &conn).is_err());
        super::insert("children", "f1", &Map::new(), &conn)?;
        Ok(())
    }

    #[test]
    fn upsert_replaces_in_place() -> Result<()> {
        let conn = conn();
        super::insert("facilities", "f1", &fields(json!({"name": "A"})), &conn)?;
        super::insert("facilities", "f2", &fields(json!({"name": "B"})), &conn)?;
        super::upsert("facilities", "f1", &fields(json!({"district": "X"})), &conn)?;
        let docs = super::select(&Query::collection("facilities"), &conn)?;
        assert_eq!(2, docs.len());
        assert_eq!("f1", docs[0].id);
        assert!(docs[0].fields.get("name").is_none());
        assert_eq!(json!("X"), docs[0].fields["district"]);
        Ok(())
    }

    #[test]
    fn patch() -> Result<()> {
        let conn = conn();
        super::insert(
            "children",
            "c1",
            &fields(json!({"name": "Asha", "village": "Kodi"})),
            &conn,
        )?;
        let doc = super::patch(
            "children",
            "c1",
            &fields(json!({"village": null, "sex": "F"})),
            &conn,
        )?;
        assert_eq!(json!({"name": "Asha", "sex": "F"}), Value::Object(doc.fields));
        assert!(matches!(
            super::patch("children", "c2", &Map::new(), &conn),
            Err(Error::NotFound(_)),
        ));
        Ok(())
    }

    #[test]
    fn delete() -> Result<()> {
        let conn = conn();
        super::insert("users", "u1", &Map::new(), &conn)?;
        assert_eq!(1, super::delete("users", "u1", &conn)?);
        assert_eq!(0, super::delete("users", "u1", &conn)?);
        assert!(super::select(&Query::collection("users"), &conn)?.is_empty());
        Ok(())
    }

    #[test]
    fn select_orders_mixed_date_shapes() -> Result<()> {
        let conn = conn();
        // 2024-01-02, 2024-01-04, 2024-01-03, 2024-01-01, missing
        super::insert(
            "immunizations",
            "ts",
            &fields(json!({"date": {"seconds": 1704153600, "nanoseconds": 0}})),
            &conn,
        )?;
        super::insert(
            "immunizations",
            "iso",
            &fields(json!({"date": "2024-01-04T00:00:00Z"})),
            &conn,
        )?;
        super::insert(
            "immunizations",
            "millis",
            &fields(json!({"date": 1704240000000_i64})),
            &conn,
        )?;
        super::insert(
            "immunizations",
            "plain",
            &fields(json!({"date": "2024-01-01"})),
            &conn,
        )?;
        super::insert("immunizations", "none", &Map::new(), &conn)?;
        let query = Query::collection("immunizations").order_by("date", Direction::Desc);
        let ids: Vec<String> = super::select(&query, &conn)?
            .into_iter()
            .map(|it| it.id)
            .collect();
        assert_eq!(vec!["iso", "millis", "ts", "plain", "none"], ids);
        let ids: Vec<String> = super::select(&query.limit(2), &conn)?
            .into_iter()
            .map(|it| it.id)
            .collect();
        assert_eq!(vec!["iso", "millis"], ids);
        Ok(())
    }

    #[test]
    fn select_ranks_unreadable_dates_below_real_ones() -> Result<()> {
        let conn = conn();
        super::insert("immunizations", "old", &fields(json!({"date": "2024-03-10"})), &conn)?;
        super::insert(
            "immunizations",
            "spaced",
            &fields(json!({"date": "2024-03-14 10:00:00"})),
            &conn,
        )?;
        super::insert("immunizations", "garbage", &fields(json!({"date": "pending"})), &conn)?;
        super::insert("immunizations", "none", &Map::new(), &conn)?;
        let query = Query::collection("immunizations")
            .order_by("date", Direction::Desc)
            .limit(1);
        let ids: Vec<String> = super::select(&query, &conn)?
            .into_iter()
            .map(|it| it.id)
            .collect();
        assert_eq!(vec!["old"], ids);
        let query = Query::collection("immunizations").order_by("date", Direction::Desc);
        let ids: Vec<String> = super::select(&query, &conn)?
            .into_iter()
            .map(|it| it.id)
            .collect();
        assert_eq!(vec!["old", "garbage", "spaced", "none"], ids);
        Ok(())
    }
}

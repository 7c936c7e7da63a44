use super::{
    blocking_queries,
    schema::{Document, Query},
};
use crate::Result;
use deadpool_sqlite::Pool;
use serde_json::{Map, Value};

pub async fn insert(
    collection: impl Into<String>,
    id: impl Into<String>,
    fields: Map<String, Value>,
    pool: &Pool,
) -> Result<Document> {
    let collection = collection.into();
    let id = id.into();
    pool.get()
        .await?
        .interact(move |conn| blocking_queries::insert(&collection, &id, &fields, conn))
        .await?
}

pub async fn upsert(
    collection: impl Into<String>,
    id: impl Into<String>,
    fields: Map<String, Value>,
    pool: &Pool,
) -> Result<Document> {
    let collection = collection.into();
    let id = id.into();
    pool.get()
        .await?
        .interact(move |conn| blocking_queries::upsert(&collection, &id, &fields, conn))
        .await?
}

pub async fn patch(
    collection: impl Into<String>,
    id: impl Into<String>,
    fields: Map<String, Value>,
    pool: &Pool,
) -> Result<Document> {
    let collection = collection.into();
    let id = id.into();
    pool.get()
        .await?
        .interact(move |conn| blocking_queries::patch(&collection, &id, &fields, conn))
        .await?
}

pub async fn delete(
    collection: impl Into<String>,
    id: impl Into<String>,
    pool: &Pool,
) -> Result<usize> {
    let collection = collection.into();
    let id = id.into();
    pool.get()
        .await?
        .interact(move |conn| blocking_queries::delete(&collection, &id, conn))
        .await?
}

pub async fn select(query: Query, pool: &Pool) -> Result<Vec<Document>> {
    pool.get()
        .await?
        .interact(move |conn| blocking_queries::select(&query, conn))
        .await?
}

pub async fn select_by_id(
    collection: impl Into<String>,
    id: impl Into<String>,
    pool: &Pool,
) -> Result<Document> {
    let collection = collection.into();
    let id = id.into();
    pool.get()
        .await?
        .interact(move |conn| blocking_queries::select_by_id(&collection, &id, conn))
        .await?
}

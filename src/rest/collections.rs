use crate::auth::AuthService;
use crate::store::{Direction, Document, DocumentStore, Query};
use crate::Result;
use actix_web::{
    delete, get, patch, post, put,
    web::{Data, Json, Path},
    HttpRequest,
};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tracing::info;

#[derive(Deserialize)]
pub struct GetArgs {
    pub order_by: Option<String>,
    pub direction: Option<Direction>,
    pub limit: Option<i64>,
}

#[get("{name}")]
pub async fn get(
    req: HttpRequest,
    name: Path<String>,
    args: actix_web::web::Query<GetArgs>,
    auth: Data<AuthService>,
    store: Data<DocumentStore>,
) -> Result<Json<Vec<Document>>> {
    auth.check(&req).await?;
    let mut query = Query::collection(name.into_inner());
    if let Some(order_by) = &args.order_by {
        query = query.order_by(order_by, args.direction.unwrap_or(Direction::Asc));
    }
    if let Some(limit) = args.limit {
        query = query.limit(limit);
    }
    Ok(Json(store.get(query).await?))
}

#[post("{name}")]
pub async fn post(
    req: HttpRequest,
    name: Path<String>,
    args: Json<Map<String, Value>>,
    auth: Data<AuthService>,
    store: Data<DocumentStore>,
) -> Result<Json<Document>> {
    let session = auth.check(&req).await?;
    let doc = store.add(&name, args.into_inner()).await?;
    info!(
        collection = %doc.collection,
        id = %doc.id,
        email = %session.email,
        "Document added",
    );
    Ok(Json(doc))
}

#[put("{name}/{id}")]
pub async fn put(
    req: HttpRequest,
    path: Path<(String, String)>,
    args: Json<Map<String, Value>>,
    auth: Data<AuthService>,
    store: Data<DocumentStore>,
) -> Result<Json<Document>> {
    auth.check(&req).await?;
    let (name, id) = path.into_inner();
    Ok(Json(store.set(&name, &id, args.into_inner()).await?))
}

#[patch("{name}/{id}")]
pub async fn patch(
    req: HttpRequest,
    path: Path<(String, String)>,
    args: Json<Map<String, Value>>,
    auth: Data<AuthService>,
    store: Data<DocumentStore>,
) -> Result<Json<Document>> {
    auth.check(&req).await?;
    let (name, id) = path.into_inner();
    Ok(Json(store.update(&name, &id, args.into_inner()).await?))
}

#[delete("{name}/{id}")]
pub async fn delete(
    req: HttpRequest,
    path: Path<(String, String)>,
    auth: Data<AuthService>,
    store: Data<DocumentStore>,
) -> Result<Json<Value>> {
    let session = auth.check(&req).await?;
    let (name, id) = path.into_inner();
    store.delete(&name, &id).await?;
    info!(
        collection = %name,
        id = %id,
        email = %session.email,
        "Document deleted",
    );
    Ok(Json(json!({ "message": format!("Document {name}/{id} has been deleted") })))
}

use crate::audit::{AuditAction, AuditLog};
use crate::auth::AuthService;
use crate::store::DocumentStore;
use crate::{export, Error, Result};
use actix_web::http::header::{ContentDisposition, DispositionParam, DispositionType};
use actix_web::{
    get,
    web::{Data, Path},
    HttpRequest, HttpResponse,
};
use serde_json::{json, Map};
use time::OffsetDateTime;

#[get("{name}")]
pub async fn get(
    req: HttpRequest,
    name: Path<String>,
    auth: Data<AuthService>,
    store: Data<DocumentStore>,
) -> Result<HttpResponse> {
    let session = auth.check(&req).await?;
    let documents = store.get_all(&name).await?;
    let today = OffsetDateTime::now_utc().date();
    let records = export::records(&name, &documents, today);
    let csv = export::to_csv(&records)
        .ok_or_else(|| Error::not_found(format!("Nothing to export in {name}")))?;
    let filename = export::filename(&name, today);
    let mut details = Map::new();
    details.insert("filename".into(), json!(filename));
    details.insert("recordCount".into(), json!(records.len()));
    AuditLog::new(store.pool())
        .log(AuditAction::ExportCsv, details, &session.email)
        .await;
    Ok(HttpResponse::Ok()
        .content_type(export::CONTENT_TYPE)
        .insert_header(ContentDisposition {
            disposition: DispositionType::Attachment,
            parameters: vec![DispositionParam::Filename(filename)],
        })
        .body(csv))
}

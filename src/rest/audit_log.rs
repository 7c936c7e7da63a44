use crate::auth::AuthService;
use crate::db::audit_log::schema::AuditLogEntry;
use crate::{db, Result};
use actix_web::{
    get,
    web::{Data, Json, Query},
    HttpRequest,
};
use deadpool_sqlite::Pool;
use serde::Deserialize;
use std::sync::Arc;

const DEFAULT_LIMIT: i64 = 100;
const MAX_LIMIT: i64 = 1000;

#[derive(Deserialize)]
pub struct GetArgs {
    pub limit: Option<i64>,
}

#[get("")]
pub async fn get(
    req: HttpRequest,
    args: Query<GetArgs>,
    auth: Data<AuthService>,
    pool: Data<Arc<Pool>>,
) -> Result<Json<Vec<AuditLogEntry>>> {
    auth.check(&req).await?;
    let limit = args.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
    Ok(Json(
        db::audit_log::queries::select_latest(limit, &pool).await?,
    ))
}

#[cfg(test)]
mod test {
    use crate::test::mock_state;
    use crate::Result;
    use actix_web::test::{self, TestRequest};
    use actix_web::web::{scope, Data};
    use actix_web::App;
    use serde_json::Value;

    #[actix_web::test]
    async fn get() -> Result<()> {
        let state = mock_state().await;
        let session = state.sign_in().await;
        let app = test::init_service(
            App::new()
                .app_data(Data::new(state.auth.clone()))
                .app_data(Data::new(state.pool.clone()))
                .service(scope("audit-logs").service(super::get)),
        )
        .await;
        let req = TestRequest::get()
            .uri("/audit-logs?limit=5")
            .append_header(("Authorization", format!("Bearer {}", session.token)))
            .to_request();
        let res: Vec<Value> = test::call_and_read_body_json(&app, req).await;
        assert_eq!(1, res.len());
        assert_eq!("ADMIN_LOGIN", res[0]["action"]);
        Ok(())
    }
}

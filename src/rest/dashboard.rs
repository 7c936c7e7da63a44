use crate::auth::AuthService;
use crate::dashboard::filter::{TimeRange, TrendType};
use crate::dashboard::render::Screen;
use crate::dashboard::{Dashboard, DashboardHost, Section};
use crate::date::{self, DateFormat};
use crate::Result;
use actix_web::{
    delete, get, post, put,
    web::{Data, Json},
    HttpRequest,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use time::OffsetDateTime;

#[derive(Serialize, Deserialize)]
pub struct DashboardView {
    pub current_date: String,
    pub filters: Value,
    pub screen: Value,
}

impl DashboardView {
    fn new(dashboard: &Dashboard<Screen>) -> Result<Self> {
        Ok(DashboardView {
            current_date: date::format(Some(OffsetDateTime::now_utc()), DateFormat::Long),
            filters: serde_json::to_value(dashboard.filter())?,
            screen: dashboard.with_sink(|screen| serde_json::to_value(screen))?,
        })
    }
}

#[get("")]
pub async fn get(
    req: HttpRequest,
    auth: Data<AuthService>,
    host: Data<DashboardHost>,
) -> Result<Json<DashboardView>> {
    auth.check(&req).await?;
    let dashboard = host.get_or_mount().await?;
    Ok(Json(DashboardView::new(&dashboard)?))
}

#[delete("")]
pub async fn delete(
    req: HttpRequest,
    auth: Data<AuthService>,
    host: Data<DashboardHost>,
) -> Result<Json<Value>> {
    auth.check(&req).await?;
    Ok(Json(json!({ "unmounted": host.unmount() })))
}

#[derive(Deserialize)]
pub struct FilterArgs {
    pub facilities: Option<Vec<String>>,
    pub time_range: Option<TimeRange>,
    pub trend_type: Option<TrendType>,
}

/// Each axis present in the body is applied in turn and audited on its own
#[put("filters")]
pub async fn put_filters(
    req: HttpRequest,
    args: Json<FilterArgs>,
    auth: Data<AuthService>,
    host: Data<DashboardHost>,
) -> Result<Json<DashboardView>> {
    let session = auth.check(&req).await?;
    let dashboard = host.get_or_mount().await?;
    if let Some(facilities) = &args.facilities {
        dashboard
            .select_facilities(facilities, &session.email)
            .await;
    }
    if let Some(time_range) = args.time_range {
        dashboard.set_time_range(time_range, &session.email).await;
    }
    if let Some(trend_type) = args.trend_type {
        dashboard.set_trend_type(trend_type, &session.email).await;
    }
    Ok(Json(DashboardView::new(&dashboard)?))
}

#[derive(Deserialize)]
pub struct NavigationArgs {
    pub section: Section,
}

#[post("navigation")]
pub async fn post_navigation(
    req: HttpRequest,
    args: Json<NavigationArgs>,
    auth: Data<AuthService>,
    host: Data<DashboardHost>,
) -> Result<Json<Value>> {
    let session = auth.check(&req).await?;
    let dashboard = host.get_or_mount().await?;
    let title = dashboard.navigate(args.section, &session.email).await;
    Ok(Json(json!({ "section": args.section, "title": title })))
}

#[cfg(test)]
mod test {
    use super::DashboardView;
    use crate::test::{fields, mock_state};
    use crate::{db, Result};
    use actix_web::http::StatusCode;
    use actix_web::test::{self, TestRequest};
    use actix_web::web::{scope, Data};
    use actix_web::App;
    use serde_json::json;

    #[actix_web::test]
    async fn get_requires_session() -> Result<()> {
        let state = mock_state().await;
        let app = test::init_service(
            App::new()
                .app_data(Data::new(state.auth))
                .app_data(Data::new(state.host))
                .service(scope("dashboard").service(super::get)),
        )
        .await;
        let req = TestRequest::get().uri("/dashboard").to_request();
        let res = test::call_service(&app, req).await;
        assert_eq!(StatusCode::UNAUTHORIZED, res.status());
        Ok(())
    }

    #[actix_web::test]
    async fn get() -> Result<()> {
        let state = mock_state().await;
        let session = state.sign_in().await;
        state
            .store
            .add("facilities", fields(json!({"name": "North"})))
            .await?;
        let app = test::init_service(
            App::new()
                .app_data(Data::new(state.auth.clone()))
                .app_data(Data::new(state.host.clone()))
                .service(scope("dashboard").service(super::get)),
        )
        .await;
        let req = TestRequest::get()
            .uri("/dashboard")
            .append_header(("Authorization", format!("Bearer {}", session.token)))
            .to_request();
        let res: DashboardView = test::call_and_read_body_json(&app, req).await;
        assert_eq!(json!("1"), res.screen["counters"]["total_facilities"]);
        assert_eq!(json!("0%"), res.screen["counters"]["coverage_rate"]);
        assert_eq!(json!(["all"]), res.filters["facilities"]);
        assert!(state.host.current().is_some());
        Ok(())
    }

    #[actix_web::test]
    async fn put_filters() -> Result<()> {
        let state = mock_state().await;
        let session = state.sign_in().await;
        let app = test::init_service(
            App::new()
                .app_data(Data::new(state.auth.clone()))
                .app_data(Data::new(state.host.clone()))
                .service(scope("dashboard").service(super::put_filters)),
        )
        .await;
        let req = TestRequest::put()
            .uri("/dashboard/filters")
            .append_header(("Authorization", format!("Bearer {}", session.token)))
            .set_json(json!({"time_range": "7d", "trend_type": "daily"}))
            .to_request();
        let res: DashboardView = test::call_and_read_body_json(&app, req).await;
        assert_eq!(json!("7d"), res.filters["time_range"]);
        assert_eq!(json!("daily"), res.filters["trend_type"]);
        let log = db::audit_log::queries::select_latest(2, &state.pool).await?;
        assert!(log.iter().all(|it| it.action == "DASHBOARD_FILTER_CHANGE"));
        assert_eq!(session.email, log[0].actor_email);
        Ok(())
    }

    #[actix_web::test]
    async fn post_navigation() -> Result<()> {
        let state = mock_state().await;
        let session = state.sign_in().await;
        let app = test::init_service(
            App::new()
                .app_data(Data::new(state.auth.clone()))
                .app_data(Data::new(state.host.clone()))
                .service(scope("dashboard").service(super::post_navigation)),
        )
        .await;
        let req = TestRequest::post()
            .uri("/dashboard/navigation")
            .append_header(("Authorization", format!("Bearer {}", session.token)))
            .set_json(json!({"section": "immunizations"}))
            .to_request();
        let res: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(json!("Immunizations"), res["title"]);
        let req = TestRequest::post()
            .uri("/dashboard/navigation")
            .append_header(("Authorization", format!("Bearer {}", session.token)))
            .set_json(json!({"section": "billing"}))
            .to_request();
        let res = test::call_service(&app, req).await;
        assert!(res.status().is_client_error());
        Ok(())
    }

    #[actix_web::test]
    async fn sign_out_unmounts() -> Result<()> {
        let state = mock_state().await;
        let session = state.sign_in().await;
        state.host.get_or_mount().await?;
        state.auth.sign_out(&session.token).await?;
        assert!(state.host.current().is_none());
        Ok(())
    }
}

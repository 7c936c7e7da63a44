use crate::auth::AuthService;
use crate::dashboard::DashboardHost;
use crate::store::DocumentStore;
use crate::{conf, db, error, rest, Result};
use actix_web::dev::Service;
use actix_web::web::{scope, JsonConfig, QueryConfig};
use actix_web::{
    middleware::{Compress, NormalizePath},
    web::Data,
    App, HttpServer,
};
use futures_util::future::FutureExt;
use std::sync::Arc;
use time::OffsetDateTime;
use tracing::{info, warn};

const SLOW_REQUEST_SEC: f64 = 1.0;

pub async fn run() -> Result<()> {
    // All the worker threads are sharing a single connection pool
    let pool = Arc::new(db::pool()?);

    // Sessions, subscriptions and the mounted dashboard live outside of the workers
    let auth = AuthService::new(&pool);
    let store = DocumentStore::new(&pool);
    let host = DashboardHost::new(&store);
    host.listen(&auth);

    let bind_addr = conf::bind_addr();
    info!(bind_addr, "Starting server");

    HttpServer::new(move || {
        App::new()
            .wrap_fn(|req, srv| {
                let req_method = req.method().as_str().to_string();
                let req_path = req.path().to_string();
                let req_time = OffsetDateTime::now_utc();
                srv.call(req).map(move |res| {
                    if let Ok(res) = res.as_ref() {
                        let res_status = res.status().as_u16();
                        let res_time_sec = (OffsetDateTime::now_utc() - req_time).as_seconds_f64();
                        if res_time_sec > SLOW_REQUEST_SEC {
                            warn!(req_method, req_path, res_status, res_time_sec, "Slow request");
                        }
                    }
                    res
                })
            })
            .wrap(NormalizePath::trim())
            .wrap(Compress::default())
            .app_data(Data::new(pool.clone()))
            .app_data(Data::new(auth.clone()))
            .app_data(Data::new(store.clone()))
            .app_data(Data::new(host.clone()))
            .app_data(QueryConfig::default().error_handler(error::query_error_handler))
            .app_data(JsonConfig::default().error_handler(error::json_error_handler))
            .service(rest::pages::index)
            .service(rest::pages::login)
            .service(rest::pages::admin)
            .service(
                scope("api")
                    .service(
                        scope("auth")
                            .service(rest::auth::login)
                            .service(rest::auth::logout),
                    )
                    .service(
                        scope("dashboard")
                            .service(rest::dashboard::get)
                            .service(rest::dashboard::delete)
                            .service(rest::dashboard::put_filters)
                            .service(rest::dashboard::post_navigation),
                    )
                    .service(
                        scope("collections")
                            .service(rest::collections::get)
                            .service(rest::collections::post)
                            .service(rest::collections::put)
                            .service(rest::collections::patch)
                            .service(rest::collections::delete),
                    )
                    .service(scope("export").service(rest::export::get))
                    .service(scope("audit-logs").service(rest::audit_log::get)),
            )
    })
    .bind(bind_addr)?
    .run()
    .await?;

    Ok(())
}

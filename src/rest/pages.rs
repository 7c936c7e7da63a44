use crate::auth::AuthService;
use actix_web::http::header;
use actix_web::{get, web::Data, HttpRequest, HttpResponse};

const LOGIN_PAGE: &str = include_str!("../../static/login.html");
const ADMIN_PAGE: &str = include_str!("../../static/admin.html");

pub const LOGIN_PATH: &str = "/login.html";
pub const ADMIN_PATH: &str = "/admin.html";

#[get("/")]
pub async fn index() -> HttpResponse {
    redirect(LOGIN_PATH)
}

#[get("/login.html")]
pub async fn login(req: HttpRequest, auth: Data<AuthService>) -> HttpResponse {
    match auth.check(&req).await {
        Ok(_) => redirect(ADMIN_PATH),
        Err(_) => html(LOGIN_PAGE),
    }
}

#[get("/admin.html")]
pub async fn admin(req: HttpRequest, auth: Data<AuthService>) -> HttpResponse {
    match auth.check(&req).await {
        Ok(_) => html(ADMIN_PAGE),
        Err(_) => redirect(LOGIN_PATH),
    }
}

fn html(page: &'static str) -> HttpResponse {
    HttpResponse::Ok()
        .content_type("text/html; charset=utf-8")
        .body(page)
}

fn redirect(location: &'static str) -> HttpResponse {
    HttpResponse::Found()
        .insert_header((header::LOCATION, location))
        .finish()
}

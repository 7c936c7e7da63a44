use crate::auth::service::SESSION_COOKIE;
use crate::auth::AuthService;
use crate::Result;
use actix_web::cookie::{Cookie, SameSite};
use actix_web::{
    post,
    web::{Data, Json},
    HttpRequest, HttpResponse,
};
use serde::Deserialize;
use serde_json::json;

#[derive(Deserialize)]
pub struct LoginArgs {
    pub email: String,
    pub password: String,
}

#[post("login")]
pub async fn login(args: Json<LoginArgs>, auth: Data<AuthService>) -> Result<HttpResponse> {
    let session = auth.sign_in(&args.email, &args.password).await?;
    let cookie = Cookie::build(SESSION_COOKIE, session.token.clone())
        .path("/")
        .http_only(true)
        .same_site(SameSite::Strict)
        .finish();
    Ok(HttpResponse::Ok().cookie(cookie).json(session))
}

#[post("logout")]
pub async fn logout(req: HttpRequest, auth: Data<AuthService>) -> Result<HttpResponse> {
    let session = auth.check(&req).await?;
    auth.sign_out(&session.token).await?;
    let mut cookie = Cookie::build(SESSION_COOKIE, "").path("/").finish();
    cookie.make_removal();
    Ok(HttpResponse::Ok()
        .cookie(cookie)
        .json(json!({ "message": "Signed out" })))
}

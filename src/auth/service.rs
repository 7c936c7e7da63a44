use super::{Session, SessionEvent};
use crate::audit::{AuditAction, AuditLog};
use crate::{db, Error, Result};
use actix_web::{http::header, HttpRequest};
use argon2::password_hash::SaltString;
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use deadpool_sqlite::Pool;
use regex::Regex;
use rusqlite::Connection;
use serde_json::{json, Map};
use std::sync::{Arc, Mutex, OnceLock, PoisonError};
use tracing::{info, warn};

pub const SESSION_COOKIE: &str = "session";

const ADMIN_ONLY: &str = "Unauthorized access. Admin only.";
const INVALID_CREDENTIALS: &str = "Invalid email or password";

type SessionListener = Box<dyn Fn(&SessionEvent) + Send + Sync>;

#[derive(Clone)]
pub struct AuthService {
    pool: Arc<Pool>,
    audit: AuditLog,
    listeners: Arc<Mutex<Vec<SessionListener>>>,
}

impl AuthService {
    pub fn new(pool: &Arc<Pool>) -> Self {
        Self {
            pool: pool.clone(),
            audit: AuditLog::new(pool),
            listeners: Arc::new(Mutex::new(vec![])),
        }
    }

    pub fn on_session_changed(&self, listener: impl Fn(&SessionEvent) + Send + Sync + 'static) {
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Box::new(listener));
    }

    /// Only the configured admin email may sign in, any other address is refused before the
    /// password is looked at
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<Session> {
        let email = email.trim();
        if !validate_email(email) {
            return Err(Error::invalid_input("Invalid email address"));
        }
        let conf = db::conf::queries::select(&self.pool).await?;
        if email != conf.admin_email {
            warn!(email, "Sign in attempt with a non-admin email");
            return Err(Error::unauthorized(ADMIN_ONLY));
        }
        let admin = match db::admin::queries::select_by_email(email, &self.pool).await {
            Ok(admin) => admin,
            Err(Error::NotFound(_)) => return Err(Error::unauthorized(INVALID_CREDENTIALS)),
            Err(e) => return Err(e),
        };
        if !verify_password(password, &admin.password) {
            warn!(email, "Sign in attempt with a wrong password");
            return Err(Error::unauthorized(INVALID_CREDENTIALS));
        }
        let token = uuid::Uuid::new_v4().to_string();
        db::access_token::queries::insert(admin.id, &token, &self.pool).await?;
        info!(email, "Admin signed in");
        self.audit
            .log(AuditAction::AdminLogin, details_email(email), email)
            .await;
        self.emit(&SessionEvent::SignedIn {
            email: email.to_string(),
        });
        Ok(Session::new(token, admin.email))
    }

    /// Resolves a live session. A session whose identity is no longer the configured admin is
    /// signed out on the spot.
    pub async fn current_session(&self, token: &str) -> Result<Session> {
        let access_token = match db::access_token::queries::select_by_secret(token, &self.pool)
            .await
        {
            Ok(access_token) => access_token,
            Err(Error::NotFound(_)) => return Err(Error::unauthorized("Session is not valid")),
            Err(e) => return Err(e),
        };
        let admin = db::admin::queries::select_by_id(access_token.admin_id, &self.pool).await?;
        let conf = db::conf::queries::select(&self.pool).await?;
        if admin.deleted_at.is_some() || admin.email != conf.admin_email {
            warn!(email = %admin.email, "Signing out a session that is not the admin");
            self.sign_out(token).await?;
            return Err(Error::unauthorized(ADMIN_ONLY));
        }
        Ok(Session::new(access_token.secret, admin.email))
    }

    pub async fn sign_out(&self, token: &str) -> Result<()> {
        let access_token = match db::access_token::queries::select_by_secret(token, &self.pool)
            .await
        {
            Ok(access_token) => access_token,
            Err(Error::NotFound(_)) => return Ok(()),
            Err(e) => return Err(e),
        };
        let admin = db::admin::queries::select_by_id(access_token.admin_id, &self.pool).await?;
        self.audit
            .log(AuditAction::AdminLogout, Map::new(), &admin.email)
            .await;
        db::access_token::queries::mark_deleted(token, &self.pool).await?;
        info!(email = %admin.email, "Admin signed out");
        self.emit(&SessionEvent::SignedOut { email: admin.email });
        Ok(())
    }

    /// Accepts the token either as a bearer token or as the session cookie
    pub async fn check(&self, req: &HttpRequest) -> Result<Session> {
        let token = request_token(req).ok_or(Error::unauthorized("Session is missing"))?;
        self.current_session(&token).await
    }

    fn emit(&self, event: &SessionEvent) {
        let listeners = self.listeners.lock().unwrap_or_else(PoisonError::into_inner);
        for listener in listeners.iter() {
            listener(event);
        }
    }
}

pub fn request_token(req: &HttpRequest) -> Option<String> {
    let bearer = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|it| it.to_str().ok())
        .and_then(|it| it.strip_prefix("Bearer "))
        .map(|it| it.trim().to_string())
        .filter(|it| !it.is_empty());
    bearer.or_else(|| req.cookie(SESSION_COOKIE).map(|it| it.value().to_string()))
}

pub fn validate_email(email: &str) -> bool {
    static EMAIL: OnceLock<Regex> = OnceLock::new();
    EMAIL
        .get_or_init(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").unwrap())
        .is_match(email)
}

/// Creates or resets the admin account and makes it the authorized identity
pub fn set_admin_password(email: &str, password: &str, conn: &Connection) -> Result<()> {
    let email = email.trim();
    if !validate_email(email) {
        return Err(Error::invalid_input("Invalid email address"));
    }
    if password.is_empty() {
        return Err(Error::invalid_input("Password can't be empty"));
    }
    let admin = db::admin::blocking_queries::upsert(email, &hash_password(password)?, conn)?;
    db::conf::blocking_queries::set_admin_email(email, conn)?;
    warn!(email = %admin.email, "Admin password has been set");
    Ok(())
}

fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::encode_b64(uuid::Uuid::new_v4().as_bytes())?;
    Ok(Argon2::default()
        .hash_password(password.as_bytes(), &salt)?
        .to_string())
}

fn verify_password(password: &str, hash: &str) -> bool {
    match PasswordHash::new(hash) {
        Ok(hash) => Argon2::default()
            .verify_password(password.as_bytes(), &hash)
            .is_ok(),
        Err(_) => false,
    }
}

fn details_email(email: &str) -> Map<String, serde_json::Value> {
    let mut details = Map::new();
    details.insert("email".into(), json!(email));
    details
}

#[cfg(test)]
mod test {
    use super::AuthService;
    use crate::auth::SessionEvent;
    use crate::db::test::pool;
    use crate::{db, Error, Result};
    use actix_web::test::TestRequest;
    use std::sync::{Arc, Mutex};

    async fn service_with_admin() -> Result<AuthService> {
        let pool = Arc::new(pool().await);
        pool.get()
            .await?
            .interact(|conn| super::set_admin_password("admin@example.org", "secret", conn))
            .await??;
        Ok(AuthService::new(&pool))
    }

    #[test]
    fn validate_email() {
        assert!(super::validate_email("admin@example.org"));
        assert!(!super::validate_email("admin@example"));
        assert!(!super::validate_email("ad min@example.org"));
        assert!(!super::validate_email(""));
    }

    #[test]
    fn password_hashes_verify() -> Result<()> {
        let hash = super::hash_password("pwd")?;
        assert_ne!("pwd", hash);
        assert!(super::verify_password("pwd", &hash));
        assert!(!super::verify_password("pwd2", &hash));
        assert!(!super::verify_password("pwd", "pwd"));
        Ok(())
    }

    #[actix_web::test]
    async fn sign_in() -> Result<()> {
        let auth = service_with_admin().await?;
        let session = auth.sign_in(" admin@example.org ", "secret").await?;
        assert_eq!("admin@example.org", session.email);
        assert_eq!("admin", session.name);
        assert_eq!(session, auth.current_session(&session.token).await?);
        let log = db::audit_log::queries::select_latest(1, &auth.pool).await?;
        assert_eq!("ADMIN_LOGIN", log[0].action);
        Ok(())
    }

    #[actix_web::test]
    async fn sign_in_rejects_other_identities() -> Result<()> {
        let auth = service_with_admin().await?;
        assert!(matches!(
            auth.sign_in("nurse@example.org", "secret").await,
            Err(Error::HttpUnauthorized(_)),
        ));
        assert!(matches!(
            auth.sign_in("admin@example.org", "wrong").await,
            Err(Error::HttpUnauthorized(_)),
        ));
        assert!(matches!(
            auth.sign_in("not-an-email", "secret").await,
            Err(Error::InvalidInput(_)),
        ));
        Ok(())
    }

    #[actix_web::test]
    async fn sign_out() -> Result<()> {
        let auth = service_with_admin().await?;
        let events = Arc::new(Mutex::new(vec![]));
        let sink = events.clone();
        auth.on_session_changed(move |event| sink.lock().unwrap().push(event.clone()));
        let session = auth.sign_in("admin@example.org", "secret").await?;
        auth.sign_out(&session.token).await?;
        assert!(matches!(
            auth.current_session(&session.token).await,
            Err(Error::HttpUnauthorized(_)),
        ));
        // signing out twice is a no-op
        auth.sign_out(&session.token).await?;
        let email = "admin@example.org".to_string();
        assert_eq!(
            vec![
                SessionEvent::SignedIn {
                    email: email.clone()
                },
                SessionEvent::SignedOut { email },
            ],
            *events.lock().unwrap(),
        );
        Ok(())
    }

    #[actix_web::test]
    async fn replaced_admin_is_signed_out() -> Result<()> {
        let auth = service_with_admin().await?;
        let session = auth.sign_in("admin@example.org", "secret").await?;
        db::conf::queries::set_admin_email("root@example.org", &auth.pool).await?;
        assert!(matches!(
            auth.current_session(&session.token).await,
            Err(Error::HttpUnauthorized(_)),
        ));
        db::conf::queries::set_admin_email("admin@example.org", &auth.pool).await?;
        assert!(auth.current_session(&session.token).await.is_err());
        Ok(())
    }

    #[actix_web::test]
    async fn check_reads_bearer_and_cookie() -> Result<()> {
        let auth = service_with_admin().await?;
        let session = auth.sign_in("admin@example.org", "secret").await?;
        let req = TestRequest::default()
            .insert_header(("Authorization", format!("Bearer {}", session.token)))
            .to_http_request();
        assert_eq!(session, auth.check(&req).await?);
        let req = TestRequest::default()
            .cookie(actix_web::cookie::Cookie::new(
                super::SESSION_COOKIE,
                session.token.clone(),
            ))
            .to_http_request();
        assert_eq!(session, auth.check(&req).await?);
        let req = TestRequest::default().to_http_request();
        assert!(matches!(
            auth.check(&req).await,
            Err(Error::HttpUnauthorized(_)),
        ));
        Ok(())
    }
}

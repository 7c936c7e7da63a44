pub use error::Error;
mod audit;
mod auth;
mod conf;
mod dashboard;
mod date;
mod db;
mod error;
mod export;
mod rest;
mod server;
mod store;
use std::env;
use tracing_subscriber::EnvFilter;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[actix_web::main]
async fn main() -> Result<()> {
    init_logging();

    let mut conn = db::open_connection()?;
    db::migration::run(&mut conn)?;

    let args: Vec<String> = env::args().collect();

    match args.get(1).map(String::as_str) {
        None | Some("server") => server::run().await?,
        Some("set-admin-password") => {
            let (Some(email), Some(password)) = (args.get(2), args.get(3)) else {
                return Err(Error::Cli(
                    "Usage: set-admin-password <email> <password>".into(),
                ));
            };
            auth::service::set_admin_password(email, password, &conn)?;
        }
        Some(first_arg) => Err(Error::Cli(format!("Unknown command: {first_arg}")))?,
    }

    Ok(())
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    if cfg!(debug_assertions) {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init();
    }
}

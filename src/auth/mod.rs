pub mod model;
pub mod service;

pub use model::{Session, SessionEvent};
pub use service::AuthService;

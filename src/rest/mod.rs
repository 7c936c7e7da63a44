pub mod audit_log;
pub mod auth;
pub mod collections;
pub mod dashboard;
pub mod export;
pub mod pages;

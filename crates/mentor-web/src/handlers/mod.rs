//! HTTP Request Handlers

pub mod chat;
pub mod health;
pub mod status;
pub mod tools;

/// User id for requests that do not name one
pub const DEFAULT_USER_ID: &str = "web_user";

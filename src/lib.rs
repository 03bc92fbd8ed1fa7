pub mod config;
pub mod degraded;
pub mod error;
pub mod execution;
pub mod extract;
pub mod grader;
pub mod routes;
pub mod template;
pub mod validator;
pub mod web_server;

pub fn create_timestamp() -> String {
    use chrono::{SecondsFormat, Utc};
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

use super::http_layers::{LOGIN_PER_MINUTE, REQUESTS_PER_MINUTE};
use super::RequestsLoggingLevel;
use crate::catalog_store::PageNumberPolicy;

#[derive(Clone)]
pub struct ServerConfig {
    pub requests_logging_level: RequestsLoggingLevel,
    pub port: u16,
    pub metrics_port: u16,
    pub frontend_dir_path: Option<String>,
    /// How page numbers in request bodies are interpreted.
    pub page_number_policy: PageNumberPolicy,
    /// Handle of the account that anonymous logins act as.
    pub service_account: Option<String>,
    /// Login and anonymous-login requests per minute per client IP. 0 disables the limit.
    pub login_per_minute: u32,
    /// API requests per minute per session token. 0 disables the limit.
    pub requests_per_minute: u32,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            requests_logging_level: RequestsLoggingLevel::Path,
            port: 3001,
            metrics_port: 9091,
            frontend_dir_path: None,
            page_number_policy: PageNumberPolicy::Strict,
            service_account: None,
            login_per_minute: LOGIN_PER_MINUTE,
            requests_per_minute: REQUESTS_PER_MINUTE,
        }
    }
}

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct FileConfig {
    // Core settings (can override CLI)
    pub db_dir: Option<String>,
    pub port: Option<u16>,
    pub metrics_port: Option<u16>,
    pub logging_level: Option<String>,
    pub frontend_dir_path: Option<String>,

    // Feature configs
    pub auth: Option<AuthConfig>,
    pub catalog: Option<CatalogConfig>,
    pub rate_limit: Option<RateLimitConfig>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct AuthConfig {
    pub token_expiry_hours: Option<u64>,
    /// Handle of the account used by anonymous logins.
    pub service_account: Option<String>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct CatalogConfig {
    /// "strict" or "lenient"
    pub page_number_policy: Option<String>,
    pub read_pool_size: Option<usize>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Per client IP, 0 disables the limit.
    pub login_per_minute: Option<u32>,
    /// Per session token, 0 disables the limit.
    pub requests_per_minute: Option<u32>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        toml::from_str(&content).with_context(|| format!("Failed to parse config file: {:?}", path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_nested_sections() {
        let config: FileConfig = toml::from_str(
            r#"
            db_dir = "/data/db"
            port = 8000

            [auth]
            token_expiry_hours = 12
            service_account = "anonymous"

            [catalog]
            page_number_policy = "lenient"

            [rate_limit]
            login_per_minute = 0
            "#,
        )
        .unwrap();

        assert_eq!(config.db_dir.as_deref(), Some("/data/db"));
        assert_eq!(config.port, Some(8000));
        assert_eq!(config.metrics_port, None);
        let auth = config.auth.unwrap();
        assert_eq!(auth.token_expiry_hours, Some(12));
        assert_eq!(auth.service_account.as_deref(), Some("anonymous"));
        let catalog = config.catalog.unwrap();
        assert_eq!(catalog.page_number_policy.as_deref(), Some("lenient"));
        assert_eq!(catalog.read_pool_size, None);
        let rate_limit = config.rate_limit.unwrap();
        assert_eq!(rate_limit.login_per_minute, Some(0));
        assert_eq!(rate_limit.requests_per_minute, None);
    }

    #[test]
    fn empty_file_is_all_defaults() {
        let config: FileConfig = toml::from_str("").unwrap();
        assert!(config.db_dir.is_none());
        assert!(config.auth.is_none());
    }

    #[test]
    fn load_reports_missing_file() {
        let err = FileConfig::load(Path::new("/nonexistent/songbook.toml")).unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }
}

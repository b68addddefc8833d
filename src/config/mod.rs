mod file_config;

pub use file_config::{AuthConfig, CatalogConfig, FileConfig, RateLimitConfig};

use crate::catalog_store::PageNumberPolicy;
use crate::server::{RequestsLoggingLevel, LOGIN_PER_MINUTE, REQUESTS_PER_MINUTE};
use anyhow::{bail, Result};
use clap::ValueEnum;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_TOKEN_EXPIRY_HOURS: u64 = 24 * 30;
pub const DEFAULT_READ_POOL_SIZE: usize = 4;

/// CLI arguments that can be used for config resolution.
/// This struct mirrors the CLI arguments that can be overridden by TOML config.
#[derive(Debug, Clone)]
pub struct CliConfig {
    pub db_dir: Option<PathBuf>,
    pub port: u16,
    pub metrics_port: u16,
    pub logging_level: RequestsLoggingLevel,
    pub page_number_policy: PageNumberPolicy,
    pub token_expiry_hours: u64,
    pub service_account: Option<String>,
    pub frontend_dir_path: Option<String>,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            db_dir: None,
            port: 3001,
            metrics_port: 9091,
            logging_level: RequestsLoggingLevel::default(),
            page_number_policy: PageNumberPolicy::default(),
            token_expiry_hours: DEFAULT_TOKEN_EXPIRY_HOURS,
            service_account: None,
            frontend_dir_path: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    // Core settings
    pub db_dir: PathBuf,
    pub port: u16,
    pub metrics_port: u16,
    pub logging_level: RequestsLoggingLevel,
    pub frontend_dir_path: Option<String>,

    pub auth: AuthSettings,
    pub catalog: CatalogSettings,
    pub rate_limit: RateLimitSettings,
}

#[derive(Debug, Clone)]
pub struct AuthSettings {
    pub token_lifetime: Duration,
    pub service_account: Option<String>,
}

#[derive(Debug, Clone)]
pub struct CatalogSettings {
    pub page_number_policy: PageNumberPolicy,
    pub read_pool_size: usize,
}

/// Requests per minute, 0 meaning unlimited.
#[derive(Debug, Clone)]
pub struct RateLimitSettings {
    pub login_per_minute: u32,
    pub requests_per_minute: u32,
}

impl AppConfig {
    /// Resolve configuration from CLI arguments and optional TOML file config.
    /// TOML values override CLI values where present.
    pub fn resolve(cli: &CliConfig, file_config: Option<FileConfig>) -> Result<Self> {
        let file = file_config.unwrap_or_default();

        let db_dir = file
            .db_dir
            .map(PathBuf::from)
            .or_else(|| cli.db_dir.clone())
            .ok_or_else(|| {
                anyhow::anyhow!("db_dir must be specified via --db-dir or in config file")
            })?;

        if !db_dir.exists() {
            bail!("Database directory does not exist: {:?}", db_dir);
        }
        if !db_dir.is_dir() {
            bail!("db_dir is not a directory: {:?}", db_dir);
        }

        let port = file.port.unwrap_or(cli.port);
        let metrics_port = file.metrics_port.unwrap_or(cli.metrics_port);
        if port == metrics_port && port != 0 {
            bail!("port and metrics_port must differ, both are {}", port);
        }

        let logging_level = match file.logging_level {
            Some(s) => parse_logging_level(&s)
                .ok_or_else(|| anyhow::anyhow!("Invalid logging_level '{}'", s))?,
            None => cli.logging_level.clone(),
        };

        let frontend_dir_path = file
            .frontend_dir_path
            .or_else(|| cli.frontend_dir_path.clone());

        let auth_file = file.auth.unwrap_or_default();
        let token_expiry_hours = auth_file
            .token_expiry_hours
            .unwrap_or(cli.token_expiry_hours);
        if token_expiry_hours == 0 {
            bail!("token_expiry_hours must be positive");
        }
        let auth = AuthSettings {
            token_lifetime: Duration::from_secs(token_expiry_hours * 3600),
            service_account: auth_file
                .service_account
                .or_else(|| cli.service_account.clone())
                .filter(|handle| !handle.trim().is_empty()),
        };

        let catalog_file = file.catalog.unwrap_or_default();
        let page_number_policy = match catalog_file.page_number_policy {
            Some(s) => PageNumberPolicy::from_str(&s, true)
                .map_err(|_| anyhow::anyhow!("Invalid page_number_policy '{}'", s))?,
            None => cli.page_number_policy,
        };
        let catalog = CatalogSettings {
            page_number_policy,
            read_pool_size: catalog_file
                .read_pool_size
                .unwrap_or(DEFAULT_READ_POOL_SIZE)
                .max(1),
        };

        let rate_limit_file = file.rate_limit.unwrap_or_default();
        let rate_limit = RateLimitSettings {
            login_per_minute: rate_limit_file
                .login_per_minute
                .unwrap_or(LOGIN_PER_MINUTE),
            requests_per_minute: rate_limit_file
                .requests_per_minute
                .unwrap_or(REQUESTS_PER_MINUTE),
        };

        Ok(Self {
            db_dir,
            port,
            metrics_port,
            logging_level,
            frontend_dir_path,
            auth,
            catalog,
            rate_limit,
        })
    }

    pub fn catalog_db_path(&self) -> PathBuf {
        self.db_dir.join("catalog.db")
    }

    pub fn user_db_path(&self) -> PathBuf {
        self.db_dir.join("user.db")
    }
}

/// Parses a logging level string into RequestsLoggingLevel.
/// Uses clap's ValueEnum trait for parsing.
fn parse_logging_level(s: &str) -> Option<RequestsLoggingLevel> {
    RequestsLoggingLevel::from_str(s, true).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn make_temp_db_dir() -> TempDir {
        TempDir::new().unwrap()
    }

    fn cli_with_db_dir(temp_dir: &TempDir) -> CliConfig {
        CliConfig {
            db_dir: Some(temp_dir.path().to_path_buf()),
            ..Default::default()
        }
    }

    #[test]
    fn test_parse_logging_level() {
        assert!(matches!(
            parse_logging_level("none"),
            Some(RequestsLoggingLevel::None)
        ));
        assert!(matches!(
            parse_logging_level("headers"),
            Some(RequestsLoggingLevel::Headers)
        ));
        assert!(matches!(
            parse_logging_level("PATH"),
            Some(RequestsLoggingLevel::Path)
        ));
        assert!(parse_logging_level("invalid").is_none());
    }

    #[test]
    fn test_resolve_cli_only() {
        let temp_dir = make_temp_db_dir();
        let cli = CliConfig {
            db_dir: Some(temp_dir.path().to_path_buf()),
            port: 3001,
            metrics_port: 9091,
            logging_level: RequestsLoggingLevel::Headers,
            page_number_policy: PageNumberPolicy::Lenient,
            token_expiry_hours: 2,
            service_account: Some("anonymous".to_string()),
            frontend_dir_path: Some("/frontend".to_string()),
        };

        let config = AppConfig::resolve(&cli, None).unwrap();

        assert_eq!(config.db_dir, temp_dir.path());
        assert_eq!(config.port, 3001);
        assert_eq!(config.metrics_port, 9091);
        assert_eq!(config.logging_level, RequestsLoggingLevel::Headers);
        assert_eq!(config.frontend_dir_path, Some("/frontend".to_string()));
        assert_eq!(config.auth.token_lifetime, Duration::from_secs(7200));
        assert_eq!(config.auth.service_account.as_deref(), Some("anonymous"));
        assert_eq!(config.catalog.page_number_policy, PageNumberPolicy::Lenient);
        assert_eq!(config.catalog.read_pool_size, DEFAULT_READ_POOL_SIZE);
        assert_eq!(config.rate_limit.login_per_minute, LOGIN_PER_MINUTE);
        assert_eq!(config.rate_limit.requests_per_minute, REQUESTS_PER_MINUTE);
    }

    #[test]
    fn test_resolve_toml_overrides_cli() {
        let temp_dir = make_temp_db_dir();
        let cli = CliConfig {
            db_dir: Some(PathBuf::from("/should/be/overridden")),
            port: 3001,
            metrics_port: 9091,
            logging_level: RequestsLoggingLevel::Path,
            service_account: Some("cli-account".to_string()),
            ..Default::default()
        };

        let file_config = FileConfig {
            db_dir: Some(temp_dir.path().to_string_lossy().to_string()),
            port: Some(4000),
            logging_level: Some("body".to_string()),
            auth: Some(AuthConfig {
                token_expiry_hours: Some(1),
                service_account: None,
            }),
            catalog: Some(CatalogConfig {
                page_number_policy: Some("lenient".to_string()),
                read_pool_size: Some(0),
            }),
            rate_limit: Some(RateLimitConfig {
                login_per_minute: Some(3),
                requests_per_minute: Some(0),
            }),
            ..Default::default()
        };

        let config = AppConfig::resolve(&cli, Some(file_config)).unwrap();

        assert_eq!(config.db_dir, temp_dir.path());
        assert_eq!(config.port, 4000);
        assert_eq!(config.logging_level, RequestsLoggingLevel::Body);
        assert_eq!(config.auth.token_lifetime, Duration::from_secs(3600));
        assert_eq!(config.catalog.page_number_policy, PageNumberPolicy::Lenient);
        assert_eq!(config.catalog.read_pool_size, 1);
        assert_eq!(config.rate_limit.login_per_minute, 3);
        assert_eq!(config.rate_limit.requests_per_minute, 0);
        // CLI value used when TOML doesn't specify
        assert_eq!(config.metrics_port, 9091);
        assert_eq!(config.auth.service_account.as_deref(), Some("cli-account"));
    }

    #[test]
    fn test_resolve_rejects_invalid_toml_values() {
        let temp_dir = make_temp_db_dir();
        let cli = cli_with_db_dir(&temp_dir);

        let bad_policy = FileConfig {
            catalog: Some(CatalogConfig {
                page_number_policy: Some("sloppy".to_string()),
                read_pool_size: None,
            }),
            ..Default::default()
        };
        assert!(AppConfig::resolve(&cli, Some(bad_policy)).is_err());

        let bad_level = FileConfig {
            logging_level: Some("verbose".to_string()),
            ..Default::default()
        };
        assert!(AppConfig::resolve(&cli, Some(bad_level)).is_err());
    }

    #[test]
    fn test_resolve_rejects_zero_token_expiry() {
        let temp_dir = make_temp_db_dir();
        let cli = CliConfig {
            token_expiry_hours: 0,
            ..cli_with_db_dir(&temp_dir)
        };
        assert!(AppConfig::resolve(&cli, None).is_err());
    }

    #[test]
    fn test_resolve_rejects_shared_ports() {
        let temp_dir = make_temp_db_dir();
        let cli = CliConfig {
            port: 8000,
            metrics_port: 8000,
            ..cli_with_db_dir(&temp_dir)
        };
        assert!(AppConfig::resolve(&cli, None).is_err());
    }

    #[test]
    fn test_blank_service_account_means_none() {
        let temp_dir = make_temp_db_dir();
        let cli = CliConfig {
            service_account: Some("  ".to_string()),
            ..cli_with_db_dir(&temp_dir)
        };
        let config = AppConfig::resolve(&cli, None).unwrap();
        assert!(config.auth.service_account.is_none());
    }

    #[test]
    fn test_resolve_missing_db_dir_error() {
        let cli = CliConfig::default();
        let result = AppConfig::resolve(&cli, None);
        assert!(result.is_err());
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("db_dir must be specified"));
    }

    #[test]
    fn test_resolve_nonexistent_db_dir_error() {
        let cli = CliConfig {
            db_dir: Some(PathBuf::from("/nonexistent/path/that/should/not/exist")),
            ..Default::default()
        };
        let result = AppConfig::resolve(&cli, None);
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("does not exist"));
    }

    #[test]
    fn test_resolve_db_dir_not_directory_error() {
        let temp_file = tempfile::NamedTempFile::new().unwrap();
        let cli = CliConfig {
            db_dir: Some(temp_file.path().to_path_buf()),
            ..Default::default()
        };
        let result = AppConfig::resolve(&cli, None);
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("not a directory"));
    }

    #[test]
    fn test_db_path_helpers() {
        let temp_dir = make_temp_db_dir();
        let config = AppConfig::resolve(&cli_with_db_dir(&temp_dir), None).unwrap();

        assert_eq!(config.catalog_db_path(), temp_dir.path().join("catalog.db"));
        assert_eq!(config.user_db_path(), temp_dir.path().join("user.db"));
    }
}

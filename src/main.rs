use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, level_filters::LevelFilter, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use songbook_server::catalog_store::{CatalogStore, PageNumberPolicy, SqliteCatalogStore};
use songbook_server::cli_style::get_styles;
use songbook_server::config::{self, AppConfig, FileConfig, DEFAULT_TOKEN_EXPIRY_HOURS};
use songbook_server::server::{metrics, run_server, RequestsLoggingLevel, ServerConfig};
use songbook_server::user::{SqliteUserStore, UserManager};

fn parse_path(s: &str) -> Result<PathBuf, String> {
    let path_buf = PathBuf::from(s);
    let original_path = match path_buf.canonicalize() {
        Ok(path) => path,
        Err(msg) => {
            if msg.kind() == std::io::ErrorKind::NotFound {
                path_buf
            } else {
                return Err(format!("Error resolving path '{}': {}", s, msg));
            }
        }
    };
    if original_path.is_absolute() {
        return Ok(original_path);
    }
    let cwd = std::env::current_dir().map_err(|e| format!("Failed to get current dir: {}", e))?;
    Ok(cwd.join(original_path))
}

#[derive(Parser, Debug)]
#[command(name = "songbook-server", styles = get_styles())]
struct CliArgs {
    /// Path to TOML configuration file. Values in the file override CLI arguments.
    #[clap(long, value_parser = parse_path)]
    pub config: Option<PathBuf>,

    /// Directory containing the database files (catalog.db, user.db).
    /// Can also be specified in config file.
    #[clap(long, value_parser = parse_path)]
    pub db_dir: Option<PathBuf>,

    /// The port to listen on.
    #[clap(short, long, default_value_t = 3001)]
    pub port: u16,

    /// The port for the metrics server (Prometheus scraping).
    #[clap(long, default_value_t = 9091)]
    pub metrics_port: u16,

    /// The level of logging to perform on each request.
    #[clap(long, default_value = "path")]
    pub logging_level: RequestsLoggingLevel,

    /// How page numbers sent to the API are interpreted.
    #[clap(long, default_value = "strict")]
    pub page_number_policy: PageNumberPolicy,

    /// Lifetime of issued auth tokens, in hours.
    #[clap(long, default_value_t = DEFAULT_TOKEN_EXPIRY_HOURS)]
    pub token_expiry_hours: u64,

    /// Handle of the account used by anonymous logins. Anonymous login is
    /// disabled when missing.
    #[clap(long)]
    pub service_account: Option<String>,

    /// Path to the frontend directory to be statically served.
    #[clap(long)]
    pub frontend_dir_path: Option<String>,
}

/// Convert CLI args to CliConfig for config resolution
impl From<&CliArgs> for config::CliConfig {
    fn from(args: &CliArgs) -> Self {
        config::CliConfig {
            db_dir: args.db_dir.clone(),
            port: args.port,
            metrics_port: args.metrics_port,
            logging_level: args.logging_level.clone(),
            page_number_policy: args.page_number_policy,
            token_expiry_hours: args.token_expiry_hours,
            service_account: args.service_account.clone(),
            frontend_dir_path: args.frontend_dir_path.clone(),
        }
    }
}

fn server_config(app_config: &AppConfig) -> ServerConfig {
    ServerConfig {
        requests_logging_level: app_config.logging_level.clone(),
        port: app_config.port,
        metrics_port: app_config.metrics_port,
        frontend_dir_path: app_config.frontend_dir_path.clone(),
        page_number_policy: app_config.catalog.page_number_policy,
        service_account: app_config.auth.service_account.clone(),
        login_per_minute: app_config.rate_limit.login_per_minute,
        requests_per_minute: app_config.rate_limit.requests_per_minute,
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli_args = CliArgs::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .with_env_var("LOG_LEVEL")
                .from_env_lossy(),
        )
        .try_init()
        .context("Could not install the tracing subscriber")?;

    let file_config = match &cli_args.config {
        Some(path) => {
            info!("Loading config file {:?}...", path);
            Some(FileConfig::load(path)?)
        }
        None => None,
    };
    let app_config = AppConfig::resolve(&config::CliConfig::from(&cli_args), file_config)?;

    let catalog_db_path = app_config.catalog_db_path();
    info!("Opening SQLite catalog database at {:?}...", catalog_db_path);
    let catalog_store: Arc<dyn CatalogStore> = Arc::new(SqliteCatalogStore::new(
        &catalog_db_path,
        app_config.catalog.read_pool_size,
    )?);

    info!("Initializing metrics...");
    metrics::init_metrics();
    metrics::set_catalog_items(&catalog_store.stats()?);

    let user_db_path = app_config.user_db_path();
    info!("Opening SQLite user database at {:?}...", user_db_path);
    let user_store = SqliteUserStore::new(&user_db_path)?;
    let user_manager = UserManager::new(Box::new(user_store), app_config.auth.token_lifetime);

    match user_manager.prune_expired_auth_tokens() {
        Ok(0) => {}
        Ok(count) => info!("Pruned {} expired auth tokens", count),
        Err(err) => warn!("Failed to prune expired auth tokens: {}", err),
    }

    if let Some(handle) = &app_config.auth.service_account {
        info!("Anonymous logins act as service account '{}'", handle);
    }
    info!(
        "Page numbers in requests use the {} policy",
        app_config.catalog.page_number_policy
    );

    run_server(server_config(&app_config), catalog_store, user_manager).await
}

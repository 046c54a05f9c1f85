use std::path::PathBuf;
use std::time::Duration;
use serde::{Deserialize, Serialize};
use directories::ProjectDirs;
use clap::Args;
use std::fs;
use tracing::{info, warn};

/// Configuration for the studyflow engine
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// URL for the database connection
    pub database_url: String,
    /// Whether the language-model advisor is consulted at all
    pub advisor_enabled: bool,
    /// Provider name: `mock`, `anthropic` or `openai`
    pub advisor_provider: String,
    /// API key for the selected provider
    pub advisor_credentials: Option<String>,
    /// Model identifier; empty means the provider's default
    pub advisor_model: String,
    /// Upper bound for a single advisor call
    pub advisor_timeout_seconds: u64,
    /// How long generated plans stay cached
    pub advisor_cache_ttl_seconds: u64,
    /// Output token budget passed to the provider
    pub advisor_max_output_tokens: u32,
    /// Capacity used for owners without stored preferences
    pub default_daily_capacity_minutes: i32,
    /// Focus mode used for owners without stored preferences
    pub default_focus_mode: String,
    /// Directory with prompt template overrides
    pub prompt_dir: Option<PathBuf>,
    /// Directory for the rolling log file
    pub log_dir: Option<PathBuf>,
}

/// Update structure for Config with all fields optional
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ConfigUpdate {
    #[serde(default)]
    pub database_url: Option<String>,
    #[serde(default)]
    pub advisor_enabled: Option<bool>,
    #[serde(default)]
    pub advisor_provider: Option<String>,
    #[serde(default)]
    pub advisor_credentials: Option<String>,
    #[serde(default)]
    pub advisor_model: Option<String>,
    #[serde(default)]
    pub advisor_timeout_seconds: Option<u64>,
    #[serde(default)]
    pub advisor_cache_ttl_seconds: Option<u64>,
    #[serde(default)]
    pub advisor_max_output_tokens: Option<u32>,
    #[serde(default)]
    pub default_daily_capacity_minutes: Option<i32>,
    #[serde(default)]
    pub default_focus_mode: Option<String>,
    #[serde(default)]
    pub prompt_dir: Option<PathBuf>,
    #[serde(default)]
    pub log_dir: Option<PathBuf>,
}

/// Configuration flags shared by every command of the CLI
#[derive(Args, Debug, Clone, Default)]
pub struct CliArgs {
    /// Database URL
    #[clap(long, env = "STUDYFLOW_DATABASE_URL", global = true)]
    pub database_url: Option<String>,

    /// Enable or disable the advisor
    #[clap(long, env = "STUDYFLOW_ADVISOR_ENABLED", global = true)]
    pub advisor_enabled: Option<bool>,

    /// Advisor provider (mock, anthropic, openai)
    #[clap(long, env = "STUDYFLOW_ADVISOR_PROVIDER", global = true)]
    pub advisor_provider: Option<String>,

    /// Advisor API key
    #[clap(long, env = "STUDYFLOW_ADVISOR_API_KEY", global = true, hide_env_values = true)]
    pub advisor_credentials: Option<String>,

    /// Advisor model identifier
    #[clap(long, env = "STUDYFLOW_ADVISOR_MODEL", global = true)]
    pub advisor_model: Option<String>,

    /// Advisor call timeout in seconds
    #[clap(long, env = "STUDYFLOW_ADVISOR_TIMEOUT_SECONDS", global = true)]
    pub advisor_timeout_seconds: Option<u64>,

    /// Directory with prompt template overrides
    #[clap(long, env = "STUDYFLOW_PROMPT_DIR", global = true)]
    pub prompt_dir: Option<PathBuf>,

    /// Directory for log files
    #[clap(long, env = "STUDYFLOW_LOG_DIR", global = true)]
    pub log_dir: Option<PathBuf>,

    /// Debug mode
    #[clap(long, env = "STUDYFLOW_DEBUG", default_value_t = false, global = true)]
    pub debug: bool,
}

impl Config {
    /// Applies a config update to the current configuration
    pub fn apply_update(self, update: ConfigUpdate) -> Self {
        Self {
            database_url: update.database_url.unwrap_or(self.database_url),
            advisor_enabled: update.advisor_enabled.unwrap_or(self.advisor_enabled),
            advisor_provider: update.advisor_provider.unwrap_or(self.advisor_provider),
            advisor_credentials: update.advisor_credentials.or(self.advisor_credentials),
            advisor_model: update.advisor_model.unwrap_or(self.advisor_model),
            advisor_timeout_seconds: update.advisor_timeout_seconds.unwrap_or(self.advisor_timeout_seconds),
            advisor_cache_ttl_seconds: update.advisor_cache_ttl_seconds.unwrap_or(self.advisor_cache_ttl_seconds),
            advisor_max_output_tokens: update.advisor_max_output_tokens.unwrap_or(self.advisor_max_output_tokens),
            default_daily_capacity_minutes: update
                .default_daily_capacity_minutes
                .unwrap_or(self.default_daily_capacity_minutes),
            default_focus_mode: update.default_focus_mode.unwrap_or(self.default_focus_mode),
            prompt_dir: update.prompt_dir.or(self.prompt_dir),
            log_dir: update.log_dir.or(self.log_dir),
        }
    }

    /// Returns the advisor timeout as a Duration
    pub fn advisor_timeout(&self) -> Duration {
        Duration::from_secs(self.advisor_timeout_seconds)
    }

    /// Returns the plan cache TTL as a Duration
    pub fn advisor_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.advisor_cache_ttl_seconds)
    }
}

/// Returns the base (default) configuration
pub fn base_config(config_path: Option<PathBuf>) -> Config {
    let database_url = config_path.map_or("studyflow.db".to_string(), |path| {
        path.join("studyflow.db").to_string_lossy().to_string()
    });

    Config {
        database_url,
        advisor_enabled: true,
        advisor_provider: "mock".to_string(),
        advisor_credentials: None,
        advisor_model: String::new(),
        advisor_timeout_seconds: 30,
        advisor_cache_ttl_seconds: 86_400,
        advisor_max_output_tokens: 2_048,
        default_daily_capacity_minutes: 480,
        default_focus_mode: "Pomodoro".to_string(),
        prompt_dir: None,
        log_dir: None,
    }
}

/// Loads configuration from a TOML file
pub fn config_from_file(config_path: Option<PathBuf>) -> Result<ConfigUpdate, String> {
    let Some(config_path) = config_path else {
        return Ok(ConfigUpdate::default());
    };

    if !config_path.exists() {
        info!("Config file not found at {:?}, using defaults", config_path);
        return Ok(ConfigUpdate::default());
    }

    match fs::read_to_string(&config_path) {
        Ok(content) => match toml::from_str::<ConfigUpdate>(&content) {
            Ok(config) => {
                info!("Loaded configuration from {:?}", config_path);
                Ok(config)
            },
            Err(e) => {
                warn!("Failed to parse config file: {}", e);
                Err(format!("Failed to parse config file: {}", e))
            }
        },
        Err(e) => {
            warn!("Failed to read config file: {}", e);
            Err(format!("Failed to read config file: {}", e))
        }
    }
}

/// Loads configuration from command line arguments
pub fn config_from_args(args: CliArgs) -> ConfigUpdate {
    ConfigUpdate {
        database_url: args.database_url,
        advisor_enabled: args.advisor_enabled,
        advisor_provider: args.advisor_provider,
        advisor_credentials: args.advisor_credentials,
        advisor_model: args.advisor_model,
        advisor_timeout_seconds: args.advisor_timeout_seconds,
        prompt_dir: args.prompt_dir,
        log_dir: args.log_dir,
        ..ConfigUpdate::default()
    }
}

/// Returns the XDG config directory for studyflow, if it can be determined
pub fn get_config_dir_path() -> Option<PathBuf> {
    match ProjectDirs::from("com", "studyflow", "studyflow") {
        Some(proj_dirs) => Some(PathBuf::from(proj_dirs.config_dir())),
        None => {
            warn!("Could not determine XDG config directory, skipping config file");
            None
        }
    }
}

/// Gets the complete configuration by combining defaults with
/// values from config file, environment variables, and command line arguments
/// in order of increasing precedence
pub fn get_config(args: CliArgs) -> Config {
    let config_path = get_config_dir_path().and_then(|path| {
        if !path.exists() {
            info!("Config path not found at {:?}, using defaults", path);
            None
        } else {
            Some(path)
        }
    });

    let base = base_config(config_path.clone());

    let config = base
        .apply_update(config_from_file(config_path.map(|p| p.join("config.toml"))).unwrap_or_default())
        .apply_update(config_from_args(args));

    info!(
        "Final configuration: database_url={}, advisor_provider={}, advisor_enabled={}",
        config.database_url, config.advisor_provider, config.advisor_enabled
    );

    config
}


#[cfg(test)]
mod prop_tests;

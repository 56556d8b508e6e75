use serde::Deserialize;
use std::fs;
use std::path::Path;

#[derive(Deserialize, Debug, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,
    pub database_url: String,
    /// Public origin of the web app. Login redirects are built from it.
    pub frontend_url: String,
    pub jwt_secret: String,
    #[serde(default)]
    pub jwt_audience: Option<String>,

    #[serde(default)]
    pub places_api_key: Option<String>,
    #[serde(default)]
    pub places_api_base_url: Option<String>,

    #[serde(default)]
    pub auth_token_url: Option<String>,
    #[serde(default)]
    pub auth_api_key: Option<String>,

    #[serde(default = "default_environment")]
    pub environment: String,

    #[serde(default = "default_log_dir")]
    pub log_dir: String,

    #[serde(default = "default_cache_cleanup_interval_secs")]
    pub cache_cleanup_interval_secs: u64,

    /// Search sessions untouched for this long are dropped.
    #[serde(default = "default_search_session_idle_secs")]
    pub search_session_idle_secs: u64,
}

// Partial config for layering
#[derive(Deserialize, Default, Debug)]
struct PartialServerConfig {
    listen_addr: Option<String>,
    database_url: Option<String>,
    frontend_url: Option<String>,
    jwt_secret: Option<String>,
    jwt_audience: Option<String>,
    places_api_key: Option<String>,
    places_api_base_url: Option<String>,
    auth_token_url: Option<String>,
    auth_api_key: Option<String>,
    environment: Option<String>,
    log_dir: Option<String>,
    cache_cleanup_interval_secs: Option<u64>,
    search_session_idle_secs: Option<u64>,
}

impl PartialServerConfig {
    fn from_env_with(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, String> {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        let secs = |name: &str| -> Result<Option<u64>, String> {
            match var(name) {
                Some(raw) => raw
                    .trim()
                    .parse::<u64>()
                    .map(Some)
                    .map_err(|e| format!("Invalid {name} '{raw}': {e}")),
                None => Ok(None),
            }
        };
        Ok(Self {
            listen_addr: var("LISTEN_ADDR"),
            database_url: var("DATABASE_URL"),
            frontend_url: var("FRONTEND_URL"),
            jwt_secret: var("JWT_SECRET"),
            jwt_audience: var("JWT_AUDIENCE"),
            places_api_key: var("GOOGLE_MAPS_API_KEY"),
            places_api_base_url: var("PLACES_API_BASE_URL"),
            auth_token_url: var("AUTH_TOKEN_URL"),
            auth_api_key: var("AUTH_API_KEY"),
            environment: var("APP_ENV"),
            log_dir: var("LOG_DIR"),
            cache_cleanup_interval_secs: secs("CACHE_CLEANUP_INTERVAL_SECS")?,
            search_session_idle_secs: secs("SEARCH_SESSION_IDLE_SECS")?,
        })
    }
}

fn default_listen_addr() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_environment() -> String {
    "production".to_string()
}

fn default_log_dir() -> String {
    "logs".to_string()
}

fn default_cache_cleanup_interval_secs() -> u64 {
    3600
}

fn default_search_session_idle_secs() -> u64 {
    1800
}

fn merge(env_config: PartialServerConfig, file_config: PartialServerConfig) -> Result<ServerConfig, String> {
    Ok(ServerConfig {
        listen_addr: env_config.listen_addr.or(file_config.listen_addr)
            .unwrap_or_else(default_listen_addr),
        database_url: env_config.database_url.or(file_config.database_url)
            .ok_or("DATABASE_URL is required")?,
        frontend_url: env_config.frontend_url.or(file_config.frontend_url)
            .ok_or("FRONTEND_URL is required")?,
        jwt_secret: env_config.jwt_secret.or(file_config.jwt_secret)
            .ok_or("JWT_SECRET is required")?,
        jwt_audience: env_config.jwt_audience.or(file_config.jwt_audience),
        places_api_key: env_config.places_api_key.or(file_config.places_api_key),
        places_api_base_url: env_config.places_api_base_url.or(file_config.places_api_base_url),
        auth_token_url: env_config.auth_token_url.or(file_config.auth_token_url),
        auth_api_key: env_config.auth_api_key.or(file_config.auth_api_key),
        environment: env_config.environment.or(file_config.environment)
            .unwrap_or_else(default_environment),
        log_dir: env_config.log_dir.or(file_config.log_dir)
            .unwrap_or_else(default_log_dir),
        cache_cleanup_interval_secs: env_config.cache_cleanup_interval_secs
            .or(file_config.cache_cleanup_interval_secs)
            .unwrap_or_else(default_cache_cleanup_interval_secs),
        search_session_idle_secs: env_config.search_session_idle_secs
            .or(file_config.search_session_idle_secs)
            .unwrap_or_else(default_search_session_idle_secs),
    })
}

impl ServerConfig {
    pub fn load(config_path: Option<&str>) -> Result<Self, String> {
        dotenv::dotenv().ok();

        // 1. Load from file (optional)
        let file_config: PartialServerConfig = match config_path.map(Path::new) {
            Some(path) if path.exists() => {
                let contents = fs::read_to_string(path)
                    .map_err(|e| format!("Failed to read config file at {path:?}: {e}"))?;
                toml::from_str(&contents)
                    .map_err(|e| format!("Failed to parse TOML from config file at {path:?}: {e}"))?
            }
            _ => PartialServerConfig::default(),
        };

        // 2. Load from environment variables
        let env_config = PartialServerConfig::from_env_with(|name| std::env::var(name).ok())?;

        // 3. Merge: environment overrides file
        merge(env_config, file_config)
    }

    pub fn is_local_env(&self) -> bool {
        matches!(self.environment.as_str(), "development" | "local")
    }

    /// Both pieces are needed to exchange authorization codes.
    pub fn auth_exchange(&self) -> Option<(&str, &str)> {
        match (self.auth_token_url.as_deref(), self.auth_api_key.as_deref()) {
            (Some(url), Some(key)) if !url.is_empty() && !key.is_empty() => Some((url, key)),
            _ => None,
        }
    }
}

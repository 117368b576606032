use serde::Deserialize;
use std::env;

/// Which [`crate::repository::Repository`] implementation backs the service.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Mongo,
    Memory,
}

impl StorageBackend {
    pub fn as_str(&self) -> &'static str {
        match self {
            StorageBackend::Mongo => "mongo",
            StorageBackend::Memory => "memory",
        }
    }

    fn parse(value: &str) -> Result<Self, config::ConfigError> {
        match value.trim().to_ascii_lowercase().as_str() {
            "mongo" | "mongodb" => Ok(StorageBackend::Mongo),
            "memory" => Ok(StorageBackend::Memory),
            other => Err(config::ConfigError::Message(format!(
                "Unknown storage backend '{}', expected 'mongo' or 'memory'",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub mongo_uri: String,
    pub mongo_database: String,
    /// Rate limiting is skipped when unset.
    pub redis_uri: Option<String>,
    pub jwt_secret: String,
    pub jwt_ttl_seconds: i64,
    pub bcrypt_cost: u32,
    pub bind_addr: String,
    pub storage_backend: StorageBackend,
    /// JSON file with an admin account and starter modules.
    pub seed_file: Option<String>,
}

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        // Root .env first (two levels up), then the local one.
        let skip_root_env = env::var("SKIP_ROOT_ENV").is_ok();
        if skip_root_env {
            dotenvy::dotenv().ok();
        } else if dotenvy::from_path("../../.env").is_err() {
            dotenvy::dotenv().ok();
        }

        let app_env = env::var("APP_ENV").unwrap_or_else(|_| "dev".to_string());

        let settings = config::Config::builder()
            .add_source(config::File::with_name(&format!("config/{}", app_env)).required(false))
            .add_source(config::Environment::with_prefix("APP").separator("__"))
            .build()?;

        Self::from_settings(&settings, &app_env)
    }

    /// Resolves each value from settings first, then the plain env var, then
    /// a default.
    fn from_settings(settings: &config::Config, app_env: &str) -> Result<Self, config::ConfigError> {
        let lookup = |key: &str, var: &str| -> Option<String> {
            settings
                .get_string(key)
                .ok()
                .or_else(|| env::var(var).ok())
                .filter(|v| !v.trim().is_empty())
        };

        let mongo_uri = lookup("database.mongo_uri", "MONGO_URI")
            .unwrap_or_else(|| "mongodb://localhost:27017/?replicaSet=rs0".to_string());

        let mongo_database =
            lookup("database.mongo_database", "MONGO_DATABASE").unwrap_or_else(|| "yett".to_string());

        let redis_uri = lookup("redis.uri", "REDIS_URI");

        let jwt_secret = match lookup("auth.jwt_secret", "JWT_SECRET") {
            Some(secret) => secret,
            None if app_env == "prod" => {
                return Err(config::ConfigError::Message(
                    "JWT_SECRET must be set in production".to_string(),
                ));
            }
            None => {
                tracing::warn!("Using default JWT_SECRET (dev mode only!)");
                "dev-secret-only-for-local-testing".to_string()
            }
        };

        let jwt_ttl_seconds = match lookup("auth.jwt_ttl_seconds", "JWT_TTL_SECONDS") {
            Some(raw) => raw.trim().parse::<i64>().map_err(|_| {
                config::ConfigError::Message(format!("Invalid JWT_TTL_SECONDS: {}", raw))
            })?,
            None => 86_400,
        };

        let bcrypt_cost = match lookup("auth.bcrypt_cost", "BCRYPT_COST") {
            Some(raw) => raw
                .trim()
                .parse::<u32>()
                .ok()
                .filter(|cost| (4..=31).contains(cost))
                .ok_or_else(|| {
                    config::ConfigError::Message(format!("Invalid BCRYPT_COST: {}", raw))
                })?,
            None => bcrypt::DEFAULT_COST,
        };

        let bind_addr =
            lookup("server.bind_addr", "BIND_ADDR").unwrap_or_else(|| "0.0.0.0:5000".to_string());

        let storage_backend = match lookup("storage.backend", "STORAGE_BACKEND") {
            Some(raw) => StorageBackend::parse(&raw)?,
            None => StorageBackend::default(),
        };

        let seed_file = lookup("seed.file", "SEED_FILE");

        Ok(Config {
            mongo_uri,
            mongo_database,
            redis_uri,
            jwt_secret,
            jwt_ttl_seconds,
            bcrypt_cost,
            bind_addr,
            storage_backend,
            seed_file,
        })
    }

    /// In-memory configuration for tests and local runs without MongoDB.
    pub fn for_memory(jwt_secret: &str) -> Self {
        Config {
            mongo_uri: String::new(),
            mongo_database: "yett".to_string(),
            redis_uri: None,
            jwt_secret: jwt_secret.to_string(),
            jwt_ttl_seconds: 86_400,
            bcrypt_cost: bcrypt::DEFAULT_COST,
            bind_addr: "127.0.0.1:0".to_string(),
            storage_backend: StorageBackend::Memory,
            seed_file: None,
        }
    }
}

use crate::config::{Config, StorageBackend};
use crate::middlewares::auth::JwtService;
use crate::repository::{MemoryRepository, MongoRepository, Repository};
use redis::aio::ConnectionManager;
use std::sync::Arc;

pub mod auth_service;
pub mod catalog;
pub mod mentorship_service;
pub mod module_service;
pub mod opportunity_service;
pub mod progress_service;
pub mod quiz_generator;
pub mod quiz_grader;
pub mod seed;

pub struct AppState {
    pub config: Config,
    pub repo: Arc<dyn Repository>,
    /// Only used for rate limiting; absent means no limits.
    pub redis: Option<ConnectionManager>,
    pub jwt: JwtService,
}

impl AppState {
    pub fn new(
        config: Config,
        repo: Arc<dyn Repository>,
        redis: Option<ConnectionManager>,
    ) -> Self {
        let jwt = JwtService::new(&config.jwt_secret);
        Self {
            config,
            repo,
            redis,
            jwt,
        }
    }

    /// State over a fresh in-memory store, no Redis.
    pub fn in_memory(config: Config) -> Self {
        Self::new(config, Arc::new(MemoryRepository::new()), None)
    }

    /// Connects the configured storage backend and, if configured, Redis.
    pub async fn connect(config: Config) -> anyhow::Result<Self> {
        let repo: Arc<dyn Repository> = match config.storage_backend {
            StorageBackend::Memory => {
                tracing::warn!("Using in-memory storage; data is lost on restart");
                Arc::new(MemoryRepository::new())
            }
            StorageBackend::Mongo => {
                let client = mongodb::Client::with_uri_str(&config.mongo_uri).await?;
                let mongo = MongoRepository::new(client, &config.mongo_database);
                mongo.ensure_indexes().await?;
                tracing::info!("MongoDB connected");
                Arc::new(mongo)
            }
        };

        let redis = match &config.redis_uri {
            Some(uri) => Some(connect_redis(uri).await?),
            None => {
                tracing::info!("REDIS_URI not set, rate limiting disabled");
                None
            }
        };

        Ok(Self::new(config, repo, redis))
    }
}

async fn connect_redis(uri: &str) -> anyhow::Result<ConnectionManager> {
    tracing::info!("Attempting to connect to Redis...");

    let client = redis::Client::open(uri)?;
    let redis = tokio::time::timeout(
        std::time::Duration::from_secs(30),
        ConnectionManager::new(client),
    )
    .await
    .map_err(|_| anyhow::anyhow!("Redis connection timeout after 30s"))??;

    let mut conn = redis.clone();
    tokio::time::timeout(
        std::time::Duration::from_secs(5),
        redis::cmd("PING").query_async::<String>(&mut conn),
    )
    .await
    .map_err(|_| anyhow::anyhow!("Redis PING timeout after 5s"))??;

    tracing::info!("Redis connection established successfully");
    Ok(redis)
}

use std::sync::Arc;

use config::Config;
use redis::Client as RedisClient;
use sqlx::PgPool;

pub mod cache;
pub mod common;
pub mod config;
pub mod error;
pub mod metrics;
pub mod middleware;
pub mod routes;
pub mod utils;

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: Config,
    pub redis: Arc<RedisClient>,
    pub metrics: Arc<metrics::Metrics>,
    pub response_cache: Arc<dyn cache::ResponseCacheStore>,
    pub health: Arc<routes::health::HealthChecker>,
}

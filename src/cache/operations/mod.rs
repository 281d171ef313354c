use std::fmt;

pub mod rate_limit;
pub mod response;

pub use rate_limit::{CounterStore, RedisCounterStore};
pub use response::{RedisResponseCache, ResponseCacheStore};

/// 共享存储访问错误：超时与连接错误同等对待
#[derive(Debug)]
pub enum StoreError {
    Redis(redis::RedisError),
    Timeout,
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::Redis(e) => write!(f, "redis error: {}", e),
            StoreError::Timeout => write!(f, "store operation timed out"),
        }
    }
}

impl std::error::Error for StoreError {}

impl From<redis::RedisError> for StoreError {
    fn from(e: redis::RedisError) -> Self {
        StoreError::Redis(e)
    }
}

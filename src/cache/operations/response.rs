use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use redis::{AsyncCommands, Client as RedisClient};

use super::StoreError;
use crate::cache::keys::namespace_version_key;
use crate::cache::models::response::CachedResponse;

/// 响应缓存存储。生产环境用 Redis，测试用内存实现
#[async_trait]
pub trait ResponseCacheStore: Send + Sync {
    /// 读取命名空间当前版本号，未设置时为 0
    async fn namespace_version(&self, namespace: &str) -> Result<u64, StoreError>;

    /// 读取缓存的响应
    async fn get_response(&self, key: &str) -> Result<Option<CachedResponse>, StoreError>;

    /// 写入响应缓存，过期由存储端保证
    async fn put_response(
        &self,
        key: &str,
        cached: &CachedResponse,
        ttl_secs: u64,
    ) -> Result<(), StoreError>;

    /// 按资源命名空间批量失效：递增版本号，旧条目不再可达，
    /// 到期后由存储端自行回收
    async fn invalidate_namespace(&self, namespace: &str) -> Result<u64, StoreError>;
}

pub struct RedisResponseCache {
    redis: Arc<RedisClient>,
    timeout: Duration,
}

impl RedisResponseCache {
    pub fn new(redis: Arc<RedisClient>, timeout: Duration) -> Self {
        Self { redis, timeout }
    }
}

#[async_trait]
impl ResponseCacheStore for RedisResponseCache {
    async fn namespace_version(&self, namespace: &str) -> Result<u64, StoreError> {
        let op = async {
            let mut conn = self.redis.get_multiplexed_async_connection().await?;
            let version: Option<u64> = conn.get(namespace_version_key(namespace)).await?;
            Ok::<_, StoreError>(version.unwrap_or(0))
        };

        tokio::time::timeout(self.timeout, op)
            .await
            .map_err(|_| StoreError::Timeout)?
    }

    async fn get_response(&self, key: &str) -> Result<Option<CachedResponse>, StoreError> {
        let op = async {
            let mut conn = self.redis.get_multiplexed_async_connection().await?;
            let result: Option<String> = conn.get(key).await?;

            match result {
                Some(json) => {
                    let cached = serde_json::from_str(&json).map_err(|e| {
                        redis::RedisError::from((
                            redis::ErrorKind::IoError,
                            "反序列化错误",
                            e.to_string(),
                        ))
                    })?;
                    Ok::<_, StoreError>(Some(cached))
                }
                None => Ok(None),
            }
        };

        tokio::time::timeout(self.timeout, op)
            .await
            .map_err(|_| StoreError::Timeout)?
    }

    async fn put_response(
        &self,
        key: &str,
        cached: &CachedResponse,
        ttl_secs: u64,
    ) -> Result<(), StoreError> {
        let json = serde_json::to_string(cached).map_err(|e| {
            redis::RedisError::from((redis::ErrorKind::IoError, "序列化错误", e.to_string()))
        })?;

        let op = async {
            let mut conn = self.redis.get_multiplexed_async_connection().await?;
            let _: () = conn.set_ex(key, json, ttl_secs).await?;
            Ok::<_, StoreError>(())
        };

        tokio::time::timeout(self.timeout, op)
            .await
            .map_err(|_| StoreError::Timeout)?
    }

    async fn invalidate_namespace(&self, namespace: &str) -> Result<u64, StoreError> {
        let op = async {
            let mut conn = self.redis.get_multiplexed_async_connection().await?;
            let version: u64 = conn.incr(namespace_version_key(namespace), 1).await?;
            Ok::<_, StoreError>(version)
        };

        tokio::time::timeout(self.timeout, op)
            .await
            .map_err(|_| StoreError::Timeout)?
    }
}

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use redis::{AsyncCommands, Client as RedisClient};

use super::StoreError;

/// 限流计数器存储。生产环境用 Redis，测试用内存实现
#[async_trait]
pub trait CounterStore: Send + Sync {
    /// 递增计数器并返回 (计数, 剩余过期秒数)。
    /// 键没有过期时间时设置 window_secs，形成固定窗口
    async fn incr_with_window(&self, key: &str, window_secs: u64) -> Result<(i64, i64), StoreError>;
}

pub struct RedisCounterStore {
    redis: Arc<RedisClient>,
    timeout: Duration,
}

impl RedisCounterStore {
    pub fn new(redis: Arc<RedisClient>, timeout: Duration) -> Self {
        Self { redis, timeout }
    }
}

#[async_trait]
impl CounterStore for RedisCounterStore {
    async fn incr_with_window(&self, key: &str, window_secs: u64) -> Result<(i64, i64), StoreError> {
        let op = async {
            let mut conn = self.redis.get_multiplexed_async_connection().await?;
            fixed_window_incr(&mut conn, key, window_secs).await
        };

        tokio::time::timeout(self.timeout, op)
            .await
            .map_err(|_| StoreError::Timeout)?
    }
}

/// INCR 后按 TTL 补设过期时间实现固定窗口。TTL 为负表示键没有过期时间：
/// 新键，或先前在 INCR 与 EXPIRE 之间断连残留的键，统一重设完整窗口，
/// 计数键不会无限期滞留
async fn fixed_window_incr<C>(
    conn: &mut C,
    key: &str,
    window_secs: u64,
) -> Result<(i64, i64), StoreError>
where
    C: AsyncCommands + Send,
{
    let count: i64 = conn.incr(key, 1).await?;
    let mut ttl: i64 = conn.ttl(key).await?;
    if ttl < 0 {
        let _: () = conn.expire(key, window_secs as i64).await?;
        ttl = window_secs as i64;
    }
    Ok((count, ttl))
}

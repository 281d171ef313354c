use serde::{Deserialize, Serialize};

use crate::config::RateLimitScope;

/// 一次限流判定的结果
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitDecision {
    pub allowed: bool,
    pub limit: u32,
    pub remaining: u32,
    // 距窗口边界的剩余秒数
    pub reset_secs: i64,
    pub window_secs: u64,
}

/// 429 响应体
#[derive(Debug, Serialize, Deserialize)]
pub struct RateLimitRejection {
    pub detail: String,
    pub retry_after: i64,
    pub limit: u32,
    pub window: u64,
}

impl RateLimitDecision {
    /// 固定窗口判定：count 为本次 INCR 之后的计数，
    /// ttl_secs 为计数器键的剩余过期时间
    pub fn evaluate(count: i64, ttl_secs: i64, scope: &RateLimitScope) -> Self {
        // TTL 缺失（键无过期时间）按完整窗口处理
        let reset_secs = if ttl_secs >= 0 {
            ttl_secs
        } else {
            scope.window_secs as i64
        };
        let remaining = (scope.limit as i64 - count).max(0) as u32;

        Self {
            allowed: count <= scope.limit as i64,
            limit: scope.limit,
            remaining,
            reset_secs,
            window_secs: scope.window_secs,
        }
    }

    pub fn retry_after(&self) -> i64 {
        self.reset_secs.max(0)
    }

    pub fn into_rejection(self) -> RateLimitRejection {
        RateLimitRejection {
            detail: format!("请求过于频繁，请在{}秒后重试", self.retry_after()),
            retry_after: self.retry_after(),
            limit: self.limit,
            window: self.window_secs,
        }
    }
}

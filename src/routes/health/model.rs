use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use redis::{AsyncCommands, Client as RedisClient};
use serde::Serialize;
use sqlx::PgPool;

use crate::config::Config;

// 心跳超过此时长未更新视为事件循环卡死
const HEARTBEAT_MAX_AGE: Duration = Duration::from_secs(5);
const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

/// 单个依赖的检查结果，每次探测重新计算，不跨重启持久化
#[derive(Debug, Clone, Serialize)]
pub struct ComponentHealth {
    pub component: String,
    pub status: HealthStatus,
    pub latency_ms: u64,
    pub last_checked_at: DateTime<Utc>,
    pub detail: serde_json::Value,
}

impl ComponentHealth {
    fn new(component: &str, status: HealthStatus, latency: Duration, detail: serde_json::Value) -> Self {
        Self {
            component: component.to_string(),
            status,
            latency_ms: latency.as_millis() as u64,
            last_checked_at: Utc::now(),
            detail,
        }
    }
}

/// 依赖响应了但超过延迟阈值时降级为 degraded
pub fn status_for_latency(latency: Duration, degraded_threshold: Duration) -> HealthStatus {
    if latency > degraded_threshold {
        HealthStatus::Degraded
    } else {
        HealthStatus::Healthy
    }
}

/// 就绪判定：仅 unhealthy 的必需依赖导致 not ready，并列出其名称
pub fn aggregate_readiness(checks: &[ComponentHealth]) -> (bool, Vec<String>) {
    let failing: Vec<String> = checks
        .iter()
        .filter(|c| c.status == HealthStatus::Unhealthy)
        .map(|c| c.component.clone())
        .collect();
    (failing.is_empty(), failing)
}

pub struct HealthChecker {
    pool: PgPool,
    redis: Arc<RedisClient>,
    http: reqwest::Client,
    probe_timeout: Duration,
    degraded_threshold: Duration,
    external_url: Option<String>,
    started_at: Instant,
    // 最近一次心跳的 Unix 毫秒时间戳
    heartbeat: Arc<AtomicI64>,
}

impl HealthChecker {
    pub fn new(pool: PgPool, redis: Arc<RedisClient>, config: &Config) -> Self {
        Self {
            pool,
            redis,
            http: reqwest::Client::new(),
            probe_timeout: config.health_probe_timeout(),
            degraded_threshold: Duration::from_millis(config.degraded_latency_ms),
            external_url: config.external_health_url.clone(),
            started_at: Instant::now(),
            heartbeat: Arc::new(AtomicI64::new(Utc::now().timestamp_millis())),
        }
    }

    /// 后台心跳任务，liveness 依据它判断进程是否还在正常调度
    pub fn spawn_heartbeat(&self) {
        let heartbeat = self.heartbeat.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(HEARTBEAT_INTERVAL);
            loop {
                ticker.tick().await;
                heartbeat.store(Utc::now().timestamp_millis(), Ordering::Relaxed);
            }
        });
    }

    /// 存活检查：只看进程自身，绝不触达外部依赖
    pub fn check_application(&self) -> ComponentHealth {
        let age_ms = (Utc::now().timestamp_millis()
            - self.heartbeat.load(Ordering::Relaxed))
        .max(0) as u64;
        let status = if age_ms > HEARTBEAT_MAX_AGE.as_millis() as u64 {
            HealthStatus::Unhealthy
        } else {
            HealthStatus::Healthy
        };

        ComponentHealth::new(
            "application",
            status,
            Duration::ZERO,
            serde_json::json!({
                "uptime_seconds": self.started_at.elapsed().as_secs(),
                "heartbeat_age_ms": age_ms,
            }),
        )
    }

    pub async fn check_database(&self) -> ComponentHealth {
        let started = Instant::now();
        let result = tokio::time::timeout(
            self.probe_timeout,
            sqlx::query_scalar::<_, i32>("SELECT 1").fetch_one(&self.pool),
        )
        .await;
        let latency = started.elapsed();

        match result {
            Ok(Ok(_)) => ComponentHealth::new(
                "database",
                status_for_latency(latency, self.degraded_threshold),
                latency,
                serde_json::json!({
                    "pool_size": self.pool.size(),
                    "pool_idle": self.pool.num_idle(),
                }),
            ),
            Ok(Err(e)) => ComponentHealth::new(
                "database",
                HealthStatus::Unhealthy,
                latency,
                serde_json::json!({ "error": e.to_string() }),
            ),
            Err(_) => ComponentHealth::new(
                "database",
                HealthStatus::Unhealthy,
                latency,
                serde_json::json!({ "error": "probe timed out" }),
            ),
        }
    }

    pub async fn check_redis(&self) -> ComponentHealth {
        let started = Instant::now();
        let probe = async {
            let mut conn = self.redis.get_multiplexed_async_connection().await?;
            let _: String = redis::cmd("PING").query_async(&mut conn).await?;

            // 写读删一轮，验证缓存真正可用而不只是连通
            let marker = Utc::now().timestamp_millis().to_string();
            let _: () = conn.set_ex("health:probe", &marker, 60).await?;
            let echoed: Option<String> = conn.get("health:probe").await?;
            let _: () = conn.del("health:probe").await?;

            if echoed.as_deref() == Some(marker.as_str()) {
                Ok(())
            } else {
                Err(redis::RedisError::from((
                    redis::ErrorKind::IoError,
                    "round trip mismatch",
                )))
            }
        };
        let result = tokio::time::timeout(self.probe_timeout, probe).await;
        let latency = started.elapsed();

        match result {
            Ok(Ok(())) => ComponentHealth::new(
                "redis",
                status_for_latency(latency, self.degraded_threshold),
                latency,
                serde_json::Value::Null,
            ),
            Ok(Err(e)) => ComponentHealth::new(
                "redis",
                HealthStatus::Unhealthy,
                latency,
                serde_json::json!({ "error": e.to_string() }),
            ),
            Err(_) => ComponentHealth::new(
                "redis",
                HealthStatus::Unhealthy,
                latency,
                serde_json::json!({ "error": "probe timed out" }),
            ),
        }
    }

    /// 非必需的外部服务探测，只出现在 detailed 报告里，不影响就绪判定
    pub async fn check_external(&self) -> Option<ComponentHealth> {
        let url = self.external_url.as_ref()?;
        let started = Instant::now();
        let result =
            tokio::time::timeout(self.probe_timeout, self.http.get(url.as_str()).send()).await;
        let latency = started.elapsed();

        let check = match result {
            Ok(Ok(resp)) if resp.status().is_success() => ComponentHealth::new(
                "external_service",
                status_for_latency(latency, self.degraded_threshold),
                latency,
                serde_json::json!({ "url": url }),
            ),
            Ok(Ok(resp)) => ComponentHealth::new(
                "external_service",
                HealthStatus::Unhealthy,
                latency,
                serde_json::json!({ "url": url, "status": resp.status().as_u16() }),
            ),
            Ok(Err(e)) => ComponentHealth::new(
                "external_service",
                HealthStatus::Unhealthy,
                latency,
                serde_json::json!({ "url": url, "error": e.to_string() }),
            ),
            Err(_) => ComponentHealth::new(
                "external_service",
                HealthStatus::Unhealthy,
                latency,
                serde_json::json!({ "url": url, "error": "probe timed out" }),
            ),
        };
        Some(check)
    }

    /// 必需依赖并发探测，各自独立超时，慢依赖不会拖住其它探测
    pub async fn readiness_checks(&self) -> Vec<ComponentHealth> {
        let (database, redis) = tokio::join!(self.check_database(), self.check_redis());
        vec![database, redis]
    }

    /// 就绪检查的超集：应用自身、必需依赖、非必需外部服务
    pub async fn detailed_checks(&self) -> Vec<ComponentHealth> {
        let (database, redis, external) =
            tokio::join!(self.check_database(), self.check_redis(), self.check_external());

        let mut checks = vec![self.check_application(), database, redis];
        if let Some(external) = external {
            checks.push(external);
        }
        checks
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn check(component: &str, status: HealthStatus) -> ComponentHealth {
        ComponentHealth::new(component, status, Duration::from_millis(5), serde_json::Value::Null)
    }

    #[test]
    fn latency_over_threshold_degrades() {
        let threshold = Duration::from_millis(250);
        assert_eq!(
            status_for_latency(Duration::from_millis(10), threshold),
            HealthStatus::Healthy
        );
        assert_eq!(
            status_for_latency(Duration::from_millis(300), threshold),
            HealthStatus::Degraded
        );
    }

    #[test]
    fn readiness_fails_only_on_unhealthy_and_names_the_failures() {
        let checks = vec![
            check("database", HealthStatus::Healthy),
            check("redis", HealthStatus::Unhealthy),
        ];
        let (ready, failing) = aggregate_readiness(&checks);
        assert!(!ready);
        assert_eq!(failing, vec!["redis"]);
    }

    #[test]
    fn degraded_dependency_is_still_ready() {
        let checks = vec![
            check("database", HealthStatus::Degraded),
            check("redis", HealthStatus::Healthy),
        ];
        let (ready, failing) = aggregate_readiness(&checks);
        assert!(ready);
        assert!(failing.is_empty());
    }

    #[test]
    fn status_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&HealthStatus::Degraded).unwrap(),
            "\"degraded\""
        );
    }
}

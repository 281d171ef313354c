use std::env;
use std::time::Duration;

/// 单个限流作用域的配置
#[derive(Debug, Clone)]
pub struct RateLimitScope {
    pub name: String,
    pub limit: u32,
    pub window_secs: u64,
    pub fail_open: bool,
}

impl RateLimitScope {
    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_secs)
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub redis_url: String,
    pub server_host: String,
    pub server_port: u16,
    pub api_base_uri: String,
    // 限流作用域：全局 / 登录 / 上传
    pub rate_limit_global: RateLimitScope,
    pub rate_limit_login: RateLimitScope,
    pub rate_limit_upload: RateLimitScope,
    pub cache_ttl_secs: u64,
    // 外部依赖调用超时（计数器、缓存存储）
    pub store_timeout_ms: u64,
    // 健康探测超时与降级延迟阈值
    pub health_probe_timeout_ms: u64,
    pub degraded_latency_ms: u64,
    pub external_health_url: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self, env::VarError> {
        dotenv::dotenv().ok();

        Ok(Config {
            database_url: env::var("DATABASE_URL")?,
            redis_url: env::var("REDIS_URL")?,
            server_host: env::var("SERVER_HOST")?,
            server_port: env::var("SERVER_PORT")?.parse().unwrap_or(3000),
            api_base_uri: env::var("API_BASE_URI").unwrap_or_else(|_| "/api".to_string()),
            rate_limit_global: RateLimitScope {
                name: "global".to_string(),
                limit: env_u32("RATE_LIMIT_REQUESTS", 100),
                window_secs: env_u64("RATE_LIMIT_WINDOW", 60),
                fail_open: env_bool("RATE_LIMIT_FAIL_OPEN", true),
            },
            rate_limit_login: RateLimitScope {
                name: "login".to_string(),
                limit: env_u32("RATE_LIMIT_LOGIN_REQUESTS", 5),
                window_secs: env_u64("RATE_LIMIT_LOGIN_WINDOW", 60),
                // 登录接口默认 fail-closed，避免限流失效时的暴力破解窗口
                fail_open: env_bool("RATE_LIMIT_LOGIN_FAIL_OPEN", false),
            },
            rate_limit_upload: RateLimitScope {
                name: "upload".to_string(),
                limit: env_u32("RATE_LIMIT_UPLOAD_REQUESTS", 10),
                window_secs: env_u64("RATE_LIMIT_UPLOAD_WINDOW", 60),
                fail_open: env_bool("RATE_LIMIT_UPLOAD_FAIL_OPEN", true),
            },
            cache_ttl_secs: env_u64("CACHE_TTL", 300),
            store_timeout_ms: env_u64("STORE_TIMEOUT_MS", 500),
            health_probe_timeout_ms: env_u64("HEALTH_PROBE_TIMEOUT_MS", 2000),
            degraded_latency_ms: env_u64("DEGRADED_LATENCY_MS", 250),
            external_health_url: env::var("EXTERNAL_HEALTH_URL").ok(),
        })
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    pub fn store_timeout(&self) -> Duration {
        Duration::from_millis(self.store_timeout_ms)
    }

    pub fn health_probe_timeout(&self) -> Duration {
        Duration::from_millis(self.health_probe_timeout_ms)
    }

    /// 根据请求路径选择限流作用域
    pub fn scope_for(&self, path: &str) -> &RateLimitScope {
        if path.ends_with("/auth/login") || path.ends_with("/auth/register") {
            &self.rate_limit_login
        } else if path.contains("/upload") {
            &self.rate_limit_upload
        } else {
            &self.rate_limit_global
        }
    }

    /// 健康检查与指标端点不参与限流
    pub fn is_exempt(&self, path: &str) -> bool {
        matches!(
            path,
            "/healthz" | "/liveness" | "/readiness" | "/health/detailed" | "/metrics"
        )
    }
}

fn env_u32(key: &str, default: u32) -> u32 {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_u64(key: &str, default: u64) -> u64 {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_bool(key: &str, default: bool) -> bool {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
pub(crate) fn test_config() -> Config {
    Config {
        database_url: "postgres://localhost/test".into(),
        redis_url: "redis://localhost".into(),
        server_host: "127.0.0.1".into(),
        server_port: 3000,
        api_base_uri: "/api".into(),
        rate_limit_global: RateLimitScope {
            name: "global".into(),
            limit: 100,
            window_secs: 60,
            fail_open: true,
        },
        rate_limit_login: RateLimitScope {
            name: "login".into(),
            limit: 5,
            window_secs: 60,
            fail_open: false,
        },
        rate_limit_upload: RateLimitScope {
            name: "upload".into(),
            limit: 10,
            window_secs: 60,
            fail_open: true,
        },
        cache_ttl_secs: 300,
        store_timeout_ms: 500,
        health_probe_timeout_ms: 2000,
        degraded_latency_ms: 250,
        external_health_url: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn login_paths_use_login_scope() {
        let config = test_config();
        assert_eq!(config.scope_for("/api/auth/login").name, "login");
        assert_eq!(config.scope_for("/api/auth/register").name, "login");
    }

    #[test]
    fn upload_paths_use_upload_scope() {
        let config = test_config();
        assert_eq!(config.scope_for("/api/images/upload").name, "upload");
    }

    #[test]
    fn other_paths_use_global_scope() {
        let config = test_config();
        assert_eq!(config.scope_for("/api/menu-items").name, "global");
        assert_eq!(config.scope_for("/api/menu-items/abc").name, "global");
    }

    #[test]
    fn health_and_metrics_are_exempt() {
        let config = test_config();
        assert!(config.is_exempt("/healthz"));
        assert!(config.is_exempt("/readiness"));
        assert!(config.is_exempt("/metrics"));
        assert!(!config.is_exempt("/api/menu-items"));
    }
}

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    Json,
    body::Body,
    extract::{ConnectInfo, State},
    http::{HeaderMap, HeaderName, HeaderValue, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::{
    cache::{CounterStore, RateLimitDecision},
    cache::keys::rate_limit_key,
    config::Config,
    error::ErrorResponse,
    metrics::Metrics,
    utils::client_ip,
};

#[derive(Clone)]
pub struct RateLimiter {
    store: Arc<dyn CounterStore>,
    config: Arc<Config>,
    metrics: Arc<Metrics>,
}

impl RateLimiter {
    pub fn new(store: Arc<dyn CounterStore>, config: Arc<Config>, metrics: Arc<Metrics>) -> Self {
        Self {
            store,
            config,
            metrics,
        }
    }

    pub async fn check_rate_limit(
        self: Arc<Self>,
        req: Request<Body>,
        next: Next,
    ) -> Result<Response, StatusCode> {
        let path = req.uri().path().to_string();
        if self.config.is_exempt(&path) {
            return Ok(next.run(req).await);
        }

        // 从连接信息获取原始IP，请求头可覆盖
        let remote_ip = req
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ci| ci.0.ip().to_string());
        let identity = client_ip(req.headers(), remote_ip.as_deref());

        let scope = self.config.scope_for(&path).clone();
        let key = rate_limit_key(&scope.name, &identity);

        match self.store.incr_with_window(&key, scope.window_secs).await {
            Ok((count, ttl)) => {
                let decision = RateLimitDecision::evaluate(count, ttl, &scope);

                if decision.allowed {
                    let mut response = next.run(req).await;
                    apply_rate_limit_headers(response.headers_mut(), &decision);
                    Ok(response)
                } else {
                    self.metrics.record_rate_limit_rejection();
                    tracing::info!(
                        identity = %identity,
                        scope = %scope.name,
                        count,
                        "rate limit exceeded"
                    );

                    let retry_after = decision.retry_after();
                    let mut response = (
                        StatusCode::TOO_MANY_REQUESTS,
                        Json(decision.clone().into_rejection()),
                    )
                        .into_response();
                    apply_rate_limit_headers(response.headers_mut(), &decision);
                    if let Ok(value) = HeaderValue::from_str(&retry_after.to_string()) {
                        response.headers_mut().insert("retry-after", value);
                    }
                    Ok(response)
                }
            }
            // 计数器存储不可用：按作用域配置 fail-open / fail-closed
            Err(e) if scope.fail_open => {
                tracing::warn!(
                    scope = %scope.name,
                    "counter store unavailable, failing open: {}",
                    e
                );
                Ok(next.run(req).await)
            }
            Err(e) => {
                tracing::error!(
                    scope = %scope.name,
                    "counter store unavailable, failing closed: {}",
                    e
                );
                Ok((
                    StatusCode::SERVICE_UNAVAILABLE,
                    Json(ErrorResponse {
                        detail: "限流服务暂不可用，请稍后重试".to_string(),
                        fields: None,
                    }),
                )
                    .into_response())
            }
        }
    }
}

fn apply_rate_limit_headers(headers: &mut HeaderMap, decision: &RateLimitDecision) {
    let pairs = [
        (
            HeaderName::from_static("x-ratelimit-limit"),
            decision.limit.to_string(),
        ),
        (
            HeaderName::from_static("x-ratelimit-remaining"),
            decision.remaining.to_string(),
        ),
        (
            HeaderName::from_static("x-ratelimit-reset"),
            decision.reset_secs.max(0).to_string(),
        ),
        (
            HeaderName::from_static("x-ratelimit-window"),
            decision.window_secs.to_string(),
        ),
    ];
    for (name, value) in pairs {
        if let Ok(value) = HeaderValue::from_str(&value) {
            headers.insert(name, value);
        }
    }
}

pub async fn rate_limit(
    State(limiter): State<Arc<RateLimiter>>,
    req: Request<Body>,
    next: Next,
) -> Result<Response, StatusCode> {
    limiter.check_rate_limit(req, next).await
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use axum::{Router, middleware, routing::get};
    use tower::ServiceExt;

    use super::*;
    use crate::cache::operations::rate_limit::memory::MemoryCounterStore;
    use crate::config::test_config;

    fn test_router(config: Config) -> Router {
        let limiter = Arc::new(RateLimiter::new(
            Arc::new(MemoryCounterStore::default()),
            Arc::new(config),
            Arc::new(Metrics::new()),
        ));
        Router::new()
            .route("/api/menu-items", get(|| async { "ok" }))
            .route("/healthz", get(|| async { "ok" }))
            .layer(middleware::from_fn_with_state(limiter, rate_limit))
    }

    fn request(path: &str) -> Request<Body> {
        Request::builder()
            .uri(path)
            .header("x-real-ip", "1.2.3.4")
            .body(Body::empty())
            .unwrap()
    }

    fn header_i64(response: &Response, name: &str) -> i64 {
        response
            .headers()
            .get(name)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse().ok())
            .unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn hundred_and_first_request_is_rejected() {
        let router = test_router(test_config());

        for i in 1..=100u32 {
            let response = router.clone().oneshot(request("/api/menu-items")).await.unwrap();
            assert_eq!(response.status(), StatusCode::OK, "request {}", i);
            assert_eq!(header_i64(&response, "x-ratelimit-limit"), 100);
            assert_eq!(
                header_i64(&response, "x-ratelimit-remaining"),
                100 - i as i64
            );
        }

        let response = router.clone().oneshot(request("/api/menu-items")).await.unwrap();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        let retry_after = header_i64(&response, "retry-after");
        assert!((1..=60).contains(&retry_after));

        let body = axum::body::to_bytes(response.into_body(), 4096).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["limit"], 100);
        assert_eq!(json["window"], 60);
        assert!(json["retry_after"].as_i64().unwrap() > 0);
        assert!(json["detail"].is_string());
    }

    #[tokio::test(start_paused = true)]
    async fn exhausted_identity_is_readmitted_after_the_window() {
        let router = test_router(test_config());

        for _ in 0..=100 {
            router.clone().oneshot(request("/api/menu-items")).await.unwrap();
        }
        tokio::time::advance(Duration::from_secs(61)).await;

        let response = router.clone().oneshot(request("/api/menu-items")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(header_i64(&response, "x-ratelimit-remaining"), 99);
    }

    #[tokio::test(start_paused = true)]
    async fn identities_are_limited_independently() {
        let router = test_router(test_config());

        for _ in 0..=100 {
            router.clone().oneshot(request("/api/menu-items")).await.unwrap();
        }

        let other = Request::builder()
            .uri("/api/menu-items")
            .header("x-real-ip", "5.6.7.8")
            .body(Body::empty())
            .unwrap();
        let response = router.clone().oneshot(other).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test(start_paused = true)]
    async fn health_endpoints_bypass_the_limiter() {
        let mut config = test_config();
        config.rate_limit_global.limit = 1;
        let router = test_router(config);

        for _ in 0..10 {
            let response = router.clone().oneshot(request("/healthz")).await.unwrap();
            assert_eq!(response.status(), StatusCode::OK);
            assert!(response.headers().get("x-ratelimit-limit").is_none());
        }
    }

    /// 存储不可用时的策略：fail-open 放行且不带限流头，fail-closed 返回 503
    mod fail_policy {
        use super::*;
        use crate::cache::StoreError;
        use async_trait::async_trait;

        struct BrokenStore;

        #[async_trait]
        impl CounterStore for BrokenStore {
            async fn incr_with_window(&self, _: &str, _: u64) -> Result<(i64, i64), StoreError> {
                Err(StoreError::Timeout)
            }
        }

        fn broken_router(config: Config) -> Router {
            let limiter = Arc::new(RateLimiter::new(
                Arc::new(BrokenStore),
                Arc::new(config),
                Arc::new(Metrics::new()),
            ));
            Router::new()
                .route("/api/menu-items", get(|| async { "ok" }))
                .route("/api/auth/login", get(|| async { "ok" }))
                .layer(middleware::from_fn_with_state(limiter, rate_limit))
        }

        #[tokio::test]
        async fn global_scope_fails_open_without_headers() {
            let router = broken_router(test_config());
            let response = router.oneshot(request("/api/menu-items")).await.unwrap();
            assert_eq!(response.status(), StatusCode::OK);
            assert!(response.headers().get("x-ratelimit-limit").is_none());
        }

        #[tokio::test]
        async fn login_scope_fails_closed() {
            let router = broken_router(test_config());
            let response = router.oneshot(request("/api/auth/login")).await.unwrap();
            assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        }
    }
}

use std::sync::Arc;

use axum::{
    body::{Body, HttpBody, to_bytes},
    extract::State,
    http::{Method, Request, StatusCode, header},
    middleware::Next,
    response::Response,
};

use crate::{
    cache::{CachedResponse, ResponseCacheStore},
    cache::keys::{request_fingerprint, response_cache_key},
    metrics::Metrics,
};

// 超过此大小的响应不进缓存
const MAX_CACHEABLE_BODY: usize = 1024 * 1024;

/// 挂在声明为可缓存的只读路由上的缓存策略
#[derive(Clone)]
pub struct CachePolicy {
    pub namespace: &'static str,
    pub ttl_secs: u64,
    pub store: Arc<dyn ResponseCacheStore>,
    pub metrics: Arc<Metrics>,
}

pub async fn response_cache(
    State(policy): State<CachePolicy>,
    req: Request<Body>,
    next: Next,
) -> Response {
    // 缓存只对声明过的 GET 路由生效
    if req.method() != Method::GET {
        return next.run(req).await;
    }

    let method = req.method().to_string();
    let path = req.uri().path().to_string();
    let query = req.uri().query().map(str::to_string);
    let fingerprint = request_fingerprint(&method, &path, query.as_deref());

    // 缓存存储不可用时退化为纯透传
    let version = match policy.store.namespace_version(policy.namespace).await {
        Ok(version) => version,
        Err(e) => {
            tracing::warn!(namespace = policy.namespace, "cache store unavailable: {}", e);
            return next.run(req).await;
        }
    };
    let key = response_cache_key(policy.namespace, version, &fingerprint);

    match policy.store.get_response(&key).await {
        Ok(Some(cached)) => {
            policy.metrics.record_cache_hit();
            tracing::debug!(key = %key, "cache hit");
            return serve_cached(cached);
        }
        Ok(None) => {}
        Err(e) => {
            tracing::warn!(key = %key, "cache lookup failed: {}", e);
            return next.run(req).await;
        }
    }

    policy.metrics.record_cache_miss();
    let response = next.run(req).await;

    // 只缓存成功的响应
    if response.status() != StatusCode::OK {
        return response;
    }

    let (mut parts, body) = response.into_parts();

    // 只缓冲体积已知且不超限的响应，流式或超大的响应体原样透传
    let exact_len = body.size_hint().exact();
    if exact_len.map_or(true, |len| len as usize > MAX_CACHEABLE_BODY) {
        return Response::from_parts(parts, body);
    }

    let bytes = match to_bytes(body, MAX_CACHEABLE_BODY).await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::error!("Failed to buffer response body for caching: {}", e);
            return Response::from_parts(parts, Body::empty());
        }
    };

    let content_type = parts
        .headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("application/json")
        .to_string();

    // 非 UTF-8 的响应体不缓存，直接透传
    if std::str::from_utf8(&bytes).is_ok() {
        let cached = CachedResponse {
            status: parts.status.as_u16(),
            content_type,
            body: bytes.to_vec(),
            created_at: chrono::Utc::now().timestamp(),
        };
        if let Err(e) = policy.store.put_response(&key, &cached, policy.ttl_secs).await {
            tracing::warn!(key = %key, "cache store failed: {}", e);
        } else {
            tracing::debug!(key = %key, "cache populated");
        }
    }

    parts.headers.remove(header::CONTENT_LENGTH);
    parts
        .headers
        .insert("x-cache", axum::http::HeaderValue::from_static("MISS"));
    Response::from_parts(parts, Body::from(bytes))
}

fn serve_cached(cached: CachedResponse) -> Response {
    let mut builder = Response::builder()
        .status(StatusCode::from_u16(cached.status).unwrap_or(StatusCode::OK))
        .header("x-cache", "HIT");
    if let Ok(content_type) = cached.content_type.parse::<axum::http::HeaderValue>() {
        builder = builder.header(header::CONTENT_TYPE, content_type);
    }
    builder
        .body(Body::from(cached.body))
        .unwrap_or_else(|_| Response::new(Body::empty()))
}

use axum::Json;
use axum::http::HeaderMap;
use serde::Serialize;

use crate::common::ApiResponse;

/// 所有 handler 的成功返回统一包装为 Json<ApiResponse<T>>
pub fn success_to_api_response<T: Serialize>(data: T) -> Json<ApiResponse<T>> {
    Json(ApiResponse {
        code: 0,
        msg: "success".into(),
        resp_data: Some(data),
    })
}

/// 从请求头解析客户端IP，依次尝试 x-real-ip、x-forwarded-for，
/// 最后降级使用连接对端地址
pub fn client_ip(headers: &HeaderMap, remote_ip: Option<&str>) -> String {
    headers
        .get("x-real-ip")
        .and_then(|h| h.to_str().ok())
        .or_else(|| {
            headers
                .get("x-forwarded-for")
                .and_then(|h| h.to_str().ok())
                .and_then(|s| s.split(',').find(|ip| !ip.trim().is_empty()))
        })
        .or(remote_ip)
        .unwrap_or("unknown")
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn prefers_x_real_ip() {
        let mut headers = HeaderMap::new();
        headers.insert("x-real-ip", HeaderValue::from_static("10.0.0.1"));
        headers.insert(
            "x-forwarded-for",
            HeaderValue::from_static("10.0.0.2, 10.0.0.3"),
        );
        assert_eq!(client_ip(&headers, Some("10.0.0.4")), "10.0.0.1");
    }

    #[test]
    fn falls_back_to_first_forwarded_entry() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-forwarded-for",
            HeaderValue::from_static("10.0.0.2, 10.0.0.3"),
        );
        assert_eq!(client_ip(&headers, None), "10.0.0.2");
    }

    #[test]
    fn falls_back_to_remote_addr_then_unknown() {
        let headers = HeaderMap::new();
        assert_eq!(client_ip(&headers, Some("192.168.1.9")), "192.168.1.9");
        assert_eq!(client_ip(&headers, None), "unknown");
    }
}

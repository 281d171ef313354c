use std::sync::Arc;
use std::time::Instant;

use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::Response,
};

use crate::metrics::Metrics;

/// 请求级指标采集：计数、时延直方图、在途请求数
pub async fn track_requests(
    State(metrics): State<Arc<Metrics>>,
    req: Request<Body>,
    next: Next,
) -> Response {
    let method = req.method().to_string();
    let path = req.uri().path().to_string();
    let start = Instant::now();

    metrics.http_in_flight.inc();
    let response = next.run(req).await;
    metrics.http_in_flight.dec();

    metrics.record_request(
        &method,
        &path,
        response.status().as_u16(),
        start.elapsed().as_secs_f64(),
    );

    response
}

#[cfg(test)]
mod tests {
    use axum::{Router, middleware, routing::get};
    use tower::ServiceExt;

    use super::*;

    #[tokio::test]
    async fn requests_are_counted_with_their_status() {
        let metrics = Arc::new(Metrics::new());
        let router = Router::new()
            .route("/ok", get(|| async { "ok" }))
            .layer(middleware::from_fn_with_state(
                metrics.clone(),
                track_requests,
            ));

        router
            .oneshot(
                Request::builder()
                    .uri("/ok")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        let output = metrics.encode();
        assert!(output.contains("http_requests_total"));
        assert!(output.contains("status=\"200\""));
        assert_eq!(metrics.http_in_flight.get(), 0);
    }
}

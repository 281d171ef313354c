use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post, put},
};
use menu_backend::{
    AppState,
    cache::{RedisCounterStore, RedisResponseCache},
    config::Config,
    metrics::Metrics,
    middleware::{CachePolicy, RateLimiter, log_errors, rate_limit, response_cache, track_requests},
    routes,
    routes::health::HealthChecker,
    routes::menu::MENU_CACHE_NAMESPACE,
};
use sqlx::Executor;
use sqlx::postgres::PgPoolOptions;
use tower_http::cors::CorsLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    // 初始化日志
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // 加载配置
    let config = Config::from_env().expect("Failed to load configuration");

    #[cfg(debug_assertions)]
    tracing::info!("Running in debug mode with CORS enabled");

    #[cfg(not(debug_assertions))]
    tracing::info!("Running in production mode with CORS disabled");

    // 设置数据库连接池
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .after_connect(|conn, _meta| {
            Box::pin(async move {
                conn.execute("SET application_name = 'menu_backend';")
                    .await?;
                Ok(())
            })
        })
        .connect(&config.database_url)
        .await
        .expect("Failed to connect to Postgres");

    // 设置 Redis 客户端
    let redis_client =
        redis::Client::open(config.redis_url.clone()).expect("Failed to create Redis client");
    let redis_arc = Arc::new(redis_client);

    // 指标注册表
    let metrics = Arc::new(Metrics::new());

    // 共享存储客户端：限流计数器与响应缓存
    let counter_store = Arc::new(RedisCounterStore::new(
        redis_arc.clone(),
        config.store_timeout(),
    ));
    let response_cache_store = Arc::new(RedisResponseCache::new(
        redis_arc.clone(),
        config.store_timeout(),
    ));

    // 健康检查器与心跳任务
    let health = Arc::new(HealthChecker::new(
        pool.clone(),
        redis_arc.clone(),
        &config,
    ));
    health.spawn_heartbeat();

    // 设置应用状态
    let state = AppState {
        pool,
        config: config.clone(),
        redis: redis_arc,
        metrics: metrics.clone(),
        response_cache: response_cache_store.clone(),
        health,
    };

    // 设置限流器
    let rate_limiter = Arc::new(RateLimiter::new(
        counter_store,
        Arc::new(config.clone()),
        metrics.clone(),
    ));

    // 声明为可缓存的只读路由，挂响应缓存中间件
    let cache_policy = CachePolicy {
        namespace: MENU_CACHE_NAMESPACE,
        ttl_secs: config.cache_ttl_secs,
        store: response_cache_store,
        metrics: metrics.clone(),
    };
    let menu_read_routes = Router::new()
        .route("/menu-items", get(routes::menu::list_menu_items))
        .route("/menu-items/{id}", get(routes::menu::get_menu_item))
        .layer(axum::middleware::from_fn_with_state(
            cache_policy,
            response_cache,
        ));

    // 写路由：业务成功后写审计、失效缓存命名空间
    let menu_write_routes = Router::new()
        .route("/menu-items", post(routes::menu::create_menu_item))
        .route(
            "/menu-items/{id}",
            put(routes::menu::update_menu_item).delete(routes::menu::delete_menu_item),
        );

    let audit_routes = Router::new().route("/audit-logs", get(routes::audit::list_audit_logs));

    let api_routes = Router::new()
        .merge(menu_read_routes)
        .merge(menu_write_routes)
        .merge(audit_routes);

    // 健康检查与指标端点挂在根路径，不参与限流
    let router = Router::new()
        .nest(&config.api_base_uri.clone(), api_routes)
        .route("/healthz", get(routes::health::healthz))
        .route("/liveness", get(routes::health::liveness))
        .route("/readiness", get(routes::health::readiness))
        .route("/health/detailed", get(routes::health::detailed))
        .route("/metrics", get(routes::metrics::metrics));

    // 中间件顺序（外到内）：指标 → 限流 → 错误日志 → 路由
    // 限流先于一切业务工作，拒绝路径最便宜
    let router = router
        .layer(axum::middleware::from_fn(log_errors))
        .layer(axum::middleware::from_fn_with_state(
            rate_limiter,
            rate_limit,
        ))
        .layer(axum::middleware::from_fn_with_state(
            metrics,
            track_requests,
        ));

    // 根据编译模式决定是否添加CORS
    #[cfg(debug_assertions)]
    let router = {
        tracing::debug!("Adding CORS layer for development mode");
        router.layer(CorsLayer::permissive())
    };

    // 添加应用状态
    let app = router.with_state(state.clone());

    // 启动服务器
    let addr = SocketAddr::new(
        state.config.server_host.parse().unwrap_or_else(|_| {
            tracing::warn!("Invalid server_host, falling back to dual-stack default");
            IpAddr::V6(std::net::Ipv6Addr::UNSPECIFIED)
        }),
        state.config.server_port,
    );
    tracing::info!("Server listening on {}", addr);
    axum::serve(
        tokio::net::TcpListener::bind(&addr)
            .await
            .expect("Failed to bind"),
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .expect("Failed to start server");
}

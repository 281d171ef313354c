use std::net::SocketAddr;

use axum::{
    extract::{ConnectInfo, Json, Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
};
use uuid::Uuid;

use crate::AppState;
use crate::error::AppError;
use crate::routes::audit::{AuditAction, AuditRecord, NewAuditRecord};
use crate::utils::{client_ip, success_to_api_response};

use super::model::{
    CreateMenuItemRequest, MENU_CACHE_NAMESPACE, MenuItem, MenuItemQuery, UpdateMenuItemRequest,
};

#[axum::debug_handler]
pub async fn list_menu_items(
    State(state): State<AppState>,
    Query(query): Query<MenuItemQuery>,
) -> Result<impl IntoResponse, AppError> {
    let items = MenuItem::list(&state.pool, &query).await?;
    Ok((StatusCode::OK, success_to_api_response(items)))
}

#[axum::debug_handler]
pub async fn get_menu_item(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    match MenuItem::find_by_id(&state.pool, id).await? {
        Some(item) => Ok((StatusCode::OK, success_to_api_response(item))),
        None => Err(AppError::NotFound("菜单项不存在".to_string())),
    }
}

#[axum::debug_handler]
pub async fn create_menu_item(
    State(state): State<AppState>,
    ConnectInfo(remote_addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Json(req): Json<CreateMenuItemRequest>,
) -> Result<impl IntoResponse, AppError> {
    req.validate()?;

    let item = MenuItem::create(&state.pool, req).await?;
    record_mutation(
        &state,
        &headers,
        remote_addr,
        AuditAction::Create,
        item.id,
        serde_json::json!({ "name": item.name, "category": item.category }),
    )
    .await;

    Ok((StatusCode::CREATED, success_to_api_response(item)))
}

#[axum::debug_handler]
pub async fn update_menu_item(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    ConnectInfo(remote_addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Json(req): Json<UpdateMenuItemRequest>,
) -> Result<impl IntoResponse, AppError> {
    req.validate()?;

    match MenuItem::update(&state.pool, id, req).await? {
        Some(item) => {
            record_mutation(
                &state,
                &headers,
                remote_addr,
                AuditAction::Update,
                item.id,
                serde_json::json!({ "name": item.name, "category": item.category }),
            )
            .await;
            Ok((StatusCode::OK, success_to_api_response(item)))
        }
        None => Err(AppError::NotFound("菜单项不存在".to_string())),
    }
}

#[axum::debug_handler]
pub async fn delete_menu_item(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    ConnectInfo(remote_addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, AppError> {
    if !MenuItem::delete(&state.pool, id).await? {
        return Err(AppError::NotFound("菜单项不存在".to_string()));
    }

    record_mutation(
        &state,
        &headers,
        remote_addr,
        AuditAction::Delete,
        id,
        serde_json::Value::Null,
    )
    .await;

    Ok((StatusCode::OK, success_to_api_response(())))
}

/// 写操作成功之后、响应返回之前：记录审计，并按命名空间失效响应缓存。
/// 两者失败都只记日志，不回滚已提交的业务结果
async fn record_mutation(
    state: &AppState,
    headers: &HeaderMap,
    remote_addr: SocketAddr,
    action: AuditAction,
    resource_id: Uuid,
    details: serde_json::Value,
) {
    // 身份由上游网关注入，认证不在本服务范围内
    let actor_id = headers
        .get("x-actor-id")
        .and_then(|h| h.to_str().ok())
        .map(String::from);
    let remote_ip = remote_addr.ip().to_string();
    let source_ip = client_ip(headers, Some(&remote_ip));

    let record = NewAuditRecord {
        actor_id,
        action,
        resource_type: "menu_item".to_string(),
        resource_id: resource_id.to_string(),
        details,
        source_ip: Some(source_ip),
    };

    match AuditRecord::record(&state.pool, record).await {
        Ok(_) => state.metrics.record_audit(),
        Err(e) => tracing::error!("Failed to write audit record: {}", e),
    }

    if let Err(e) = state
        .response_cache
        .invalidate_namespace(MENU_CACHE_NAMESPACE)
        .await
    {
        tracing::warn!("Failed to invalidate menu cache namespace: {}", e);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use sqlx::postgres::PgPoolOptions;

    use super::*;
    use crate::AppState;
    use crate::cache::ResponseCacheStore;
    use crate::cache::operations::response::memory::MemoryResponseCache;
    use crate::config::test_config;
    use crate::metrics::Metrics;
    use crate::routes::health::HealthChecker;

    /// 不触达真实依赖的应用状态：连接池懒初始化，审计写入会失败
    fn test_state(store: Arc<MemoryResponseCache>) -> AppState {
        let config = test_config();
        let pool = PgPoolOptions::new()
            .acquire_timeout(Duration::from_millis(200))
            .connect_lazy(&config.database_url)
            .unwrap();
        let redis = Arc::new(redis::Client::open(config.redis_url.clone()).unwrap());
        let health = Arc::new(HealthChecker::new(pool.clone(), redis.clone(), &config));

        AppState {
            pool,
            config,
            redis,
            metrics: Arc::new(Metrics::new()),
            response_cache: store,
            health,
        }
    }

    /// 写操作落盘后必须失效 menu 命名空间，否则读路由会继续命中旧缓存。
    /// 审计写入失败（此处数据库不可达）也不能跳过失效
    #[tokio::test]
    async fn mutation_invalidates_the_menu_cache_namespace() {
        let store = Arc::new(MemoryResponseCache::default());
        let state = test_state(store.clone());
        let peer: SocketAddr = "127.0.0.1:54321".parse().unwrap();

        let before = store.namespace_version(MENU_CACHE_NAMESPACE).await.unwrap();
        record_mutation(
            &state,
            &HeaderMap::new(),
            peer,
            AuditAction::Create,
            Uuid::new_v4(),
            serde_json::json!({ "name": "绿茶" }),
        )
        .await;

        let after = store.namespace_version(MENU_CACHE_NAMESPACE).await.unwrap();
        assert_eq!(after, before + 1);
    }
}

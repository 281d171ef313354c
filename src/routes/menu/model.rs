use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::error::AppError;

// 菜单缓存命名空间，读路由缓存与写路由失效共用
pub const MENU_CACHE_NAMESPACE: &str = "menu";

#[derive(Debug, Serialize, Deserialize, FromRow)]
pub struct MenuItem {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub price: f64,
    pub category: String,
    pub available: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct CreateMenuItemRequest {
    pub name: String,
    pub description: Option<String>,
    pub price: f64,
    pub category: String,
    #[serde(default = "default_available")]
    pub available: bool,
}

fn default_available() -> bool {
    true
}

#[derive(Debug, Deserialize)]
pub struct UpdateMenuItemRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<f64>,
    pub category: Option<String>,
    pub available: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct MenuItemQuery {
    pub category: Option<String>,
    pub available: Option<bool>,
}

impl CreateMenuItemRequest {
    /// 校验在触达任何依赖之前进行，一次性列出全部非法字段
    pub fn validate(&self) -> Result<(), AppError> {
        let mut fields = Vec::new();
        if self.name.trim().is_empty() {
            fields.push("name".to_string());
        }
        if self.category.trim().is_empty() {
            fields.push("category".to_string());
        }
        if !(self.price.is_finite() && self.price > 0.0) {
            fields.push("price".to_string());
        }

        if fields.is_empty() {
            Ok(())
        } else {
            Err(AppError::Validation {
                detail: "字段校验失败".to_string(),
                fields,
            })
        }
    }
}

impl UpdateMenuItemRequest {
    pub fn validate(&self) -> Result<(), AppError> {
        let mut fields = Vec::new();
        if let Some(name) = &self.name {
            if name.trim().is_empty() {
                fields.push("name".to_string());
            }
        }
        if let Some(category) = &self.category {
            if category.trim().is_empty() {
                fields.push("category".to_string());
            }
        }
        if let Some(price) = self.price {
            if !(price.is_finite() && price > 0.0) {
                fields.push("price".to_string());
            }
        }

        if fields.is_empty() {
            Ok(())
        } else {
            Err(AppError::Validation {
                detail: "字段校验失败".to_string(),
                fields,
            })
        }
    }
}

impl MenuItem {
    pub async fn list(pool: &PgPool, query: &MenuItemQuery) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Self>(
            r#"
            SELECT id, name, description, price, category, available, created_at, updated_at
            FROM menu_items
            WHERE ($1::text IS NULL OR category = $1)
              AND ($2::bool IS NULL OR available = $2)
            ORDER BY created_at DESC
            "#,
        )
        .bind(&query.category)
        .bind(query.available)
        .fetch_all(pool)
        .await
    }

    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Self>(
            r#"
            SELECT id, name, description, price, category, available, created_at, updated_at
            FROM menu_items
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    pub async fn create(pool: &PgPool, req: CreateMenuItemRequest) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Self>(
            r#"
            INSERT INTO menu_items (id, name, description, price, category, available, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, NOW(), NOW())
            RETURNING id, name, description, price, category, available, created_at, updated_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&req.name)
        .bind(&req.description)
        .bind(req.price)
        .bind(&req.category)
        .bind(req.available)
        .fetch_one(pool)
        .await
    }

    pub async fn update(
        pool: &PgPool,
        id: Uuid,
        req: UpdateMenuItemRequest,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Self>(
            r#"
            UPDATE menu_items
            SET name = COALESCE($2, name),
                description = COALESCE($3, description),
                price = COALESCE($4, price),
                category = COALESCE($5, category),
                available = COALESCE($6, available),
                updated_at = NOW()
            WHERE id = $1
            RETURNING id, name, description, price, category, available, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(&req.name)
        .bind(&req.description)
        .bind(req.price)
        .bind(&req.category)
        .bind(req.available)
        .fetch_optional(pool)
        .await
    }

    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM menu_items WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};

/// 审计动作类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AuditAction {
    Create,
    Update,
    Delete,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::Create => "CREATE",
            AuditAction::Update => "UPDATE",
            AuditAction::Delete => "DELETE",
        }
    }
}

/// 审计记录，只追加，系统自身从不更新或删除
#[derive(Debug, Serialize, FromRow)]
pub struct AuditRecord {
    pub id: i64,
    pub actor_id: Option<String>,
    pub action: String,
    pub resource_type: String,
    pub resource_id: String,
    // 序列化后的键值对，内容对本系统不透明
    pub details: String,
    pub source_ip: Option<String>,
    pub timestamp: DateTime<Utc>,
}

pub struct NewAuditRecord {
    pub actor_id: Option<String>,
    pub action: AuditAction,
    pub resource_type: String,
    pub resource_id: String,
    pub details: serde_json::Value,
    pub source_ip: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AuditQuery {
    pub resource_type: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl AuditRecord {
    pub async fn record(pool: &PgPool, new: NewAuditRecord) -> Result<i64, sqlx::Error> {
        let (id,): (i64,) = sqlx::query_as(
            r#"
            INSERT INTO audit_logs (actor_id, action, resource_type, resource_id, details, source_ip, "timestamp")
            VALUES ($1, $2, $3, $4, $5, $6, NOW())
            RETURNING id
            "#,
        )
        .bind(&new.actor_id)
        .bind(new.action.as_str())
        .bind(&new.resource_type)
        .bind(&new.resource_id)
        .bind(new.details.to_string())
        .bind(&new.source_ip)
        .fetch_one(pool)
        .await?;

        Ok(id)
    }

    pub async fn list(pool: &PgPool, query: &AuditQuery) -> Result<Vec<Self>, sqlx::Error> {
        let limit = query.limit.unwrap_or(50).clamp(1, 500);
        let offset = query.offset.unwrap_or(0).max(0);

        sqlx::query_as::<_, Self>(
            r#"
            SELECT id, actor_id, action, resource_type, resource_id, details, source_ip, "timestamp"
            FROM audit_logs
            WHERE ($1::text IS NULL OR resource_type = $1)
            ORDER BY id DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(&query.resource_type)
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn actions_serialize_uppercase() {
        assert_eq!(AuditAction::Create.as_str(), "CREATE");
        assert_eq!(
            serde_json::to_string(&AuditAction::Delete).unwrap(),
            "\"DELETE\""
        );
    }
}

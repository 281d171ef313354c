use serde::{Deserialize, Serialize};

/// 响应缓存数据模型
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct CachedResponse {
    pub status: u16,
    pub content_type: String,
    // 原始响应字节，命中时逐字节返回
    #[serde(with = "body_bytes")]
    pub body: Vec<u8>,
    pub created_at: i64, // Unix timestamp
}

// 响应体多为 JSON 文本，按 UTF-8 存储；非 UTF-8 内容不缓存
mod body_bytes {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&String::from_utf8_lossy(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<u8>, D::Error> {
        Ok(String::deserialize(d)?.into_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn body_survives_storage_byte_identical() {
        let payload = br#"{"code":0,"msg":"success","resp_data":[{"name":"tea"}]}"#.to_vec();
        let entry = CachedResponse {
            status: 200,
            content_type: "application/json".into(),
            body: payload.clone(),
            created_at: 1_700_000_000,
        };

        let stored = serde_json::to_string(&entry).unwrap();
        let restored: CachedResponse = serde_json::from_str(&stored).unwrap();
        assert_eq!(restored.body, payload);
        assert_eq!(restored.content_type, "application/json");
    }
}

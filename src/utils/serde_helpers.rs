//! 用于处理 SurrealDB 记录 ID 的序列化/反序列化辅助模块

use serde::{Deserialize, Deserializer, Serializer};

/// 记录ID统一输出为裸键 ("user-1")
/// 兼容纯字符串、"table:key" 字符串以及 Thing 对象 (`{"tb": "user", "id": {"String": "user-1"}}`)
pub mod record_key {
    use super::*;

    pub fn serialize<S>(id: &str, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(id)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<String, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum IdValue {
            String(String),
            // 表名不需要，只取 id 部分
            Thing { id: serde_json::Value },
        }

        match IdValue::deserialize(deserializer)? {
            IdValue::String(s) => Ok(strip_table(&s).to_string()),
            IdValue::Thing { id } => Ok(key_from_value(&id)),
        }
    }

    fn strip_table(id: &str) -> &str {
        match id.split_once(':') {
            Some((table, key)) if !table.is_empty() && !table.contains('-') => {
                key.trim_start_matches('⟨').trim_end_matches('⟩').trim_matches('`')
            }
            _ => id,
        }
    }

    fn key_from_value(value: &serde_json::Value) -> String {
        match value {
            serde_json::Value::String(s) => s.clone(),
            serde_json::Value::Number(n) => n.to_string(),
            serde_json::Value::Object(map) => match map.get("String").or_else(|| map.get("Number")) {
                Some(inner) => key_from_value(inner),
                None => value.to_string(),
            },
            other => other.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Deserialize)]
    struct Row {
        #[serde(with = "super::record_key")]
        id: String,
    }

    fn key(value: serde_json::Value) -> String {
        serde_json::from_value::<Row>(json!({ "id": value })).unwrap().id
    }

    #[test]
    fn test_record_key_forms() {
        assert_eq!(key(json!("user-1")), "user-1");
        assert_eq!(key(json!("user:⟨0b1c-4e⟩")), "0b1c-4e");
        assert_eq!(key(json!({ "tb": "course", "id": { "String": "course-1" } })), "course-1");
        assert_eq!(key(json!({ "tb": "course", "id": 7 })), "7");
    }
}

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;
use std::time::{Duration, Instant};
use parking_lot::RwLock;
use tokio::time::sleep;

use crate::models::progress::{ProgressKey, ProgressRecord};

/// 缓存项
#[derive(Debug, Clone)]
struct CacheItem<V> {
    value: V,
    expires_at: Instant,
}

/// 简单的内存缓存实现
#[derive(Debug, Clone)]
pub struct Cache<K, V> {
    data: Arc<RwLock<HashMap<K, CacheItem<V>>>>,
    default_ttl: Duration,
}

impl<K, V> Cache<K, V>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    /// 创建新的缓存实例，需在 tokio 运行时内调用
    pub fn new(default_ttl: Duration) -> Self {
        let cache = Self {
            data: Arc::new(RwLock::new(HashMap::new())),
            default_ttl,
        };

        // 启动后台清理任务；缓存被丢弃后任务自动退出
        let data_ref = Arc::downgrade(&cache.data);
        let sweep_every = default_ttl.max(Duration::from_secs(1));
        tokio::spawn(async move {
            loop {
                sleep(sweep_every).await;
                match data_ref.upgrade() {
                    Some(data) => Self::cleanup_expired(&data),
                    None => break,
                }
            }
        });

        cache
    }

    /// 设置缓存项
    pub fn set(&self, key: K, value: V) {
        self.set_with_ttl(key, value, self.default_ttl)
    }

    /// 设置带有自定义TTL的缓存项
    pub fn set_with_ttl(&self, key: K, value: V, ttl: Duration) {
        let item = CacheItem {
            value,
            expires_at: Instant::now() + ttl,
        };
        self.data.write().insert(key, item);
    }

    /// 获取缓存项，过期项视为不存在
    pub fn get(&self, key: &K) -> Option<V> {
        let data = self.data.read();
        data.get(key)
            .filter(|item| item.expires_at > Instant::now())
            .map(|item| item.value.clone())
    }

    /// 删除缓存项
    pub fn invalidate(&self, key: &K) -> bool {
        self.data.write().remove(key).is_some()
    }

    /// 删除满足条件的所有缓存项
    pub fn invalidate_where<F>(&self, predicate: F)
    where
        F: Fn(&K) -> bool,
    {
        self.data.write().retain(|key, _| !predicate(key));
    }

    /// 清理过期项
    fn cleanup_expired(data: &RwLock<HashMap<K, CacheItem<V>>>) {
        let now = Instant::now();
        data.write().retain(|_, item| item.expires_at > now);
    }
}

/// `user_progress` 的读穿缓存，键为 (用户 id, 课程 id)
pub type ProgressCache = Cache<ProgressKey, ProgressRecord>;

pub fn progress_key(user_id: &str, course_id: &str) -> ProgressKey {
    (user_id.to_string(), course_id.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_cache_basic_operations() {
        let cache: Cache<String, String> = Cache::new(Duration::from_secs(60));

        cache.set("key1".to_string(), "value1".to_string());
        assert_eq!(cache.get(&"key1".to_string()), Some("value1".to_string()));
        assert_eq!(cache.get(&"nonexistent".to_string()), None);

        assert!(cache.invalidate(&"key1".to_string()));
        assert_eq!(cache.get(&"key1".to_string()), None);
    }

    #[tokio::test]
    async fn test_cache_expiration() {
        let cache: Cache<String, String> = Cache::new(Duration::from_millis(100));

        cache.set("temp_key".to_string(), "temp_value".to_string());
        assert_eq!(cache.get(&"temp_key".to_string()), Some("temp_value".to_string()));

        sleep(Duration::from_millis(150)).await;
        assert_eq!(cache.get(&"temp_key".to_string()), None);
    }

    #[tokio::test]
    async fn test_invalidate_user_entries() {
        let cache: ProgressCache = Cache::new(Duration::from_secs(60));
        cache.set(progress_key("u1", "c1"), ProgressRecord::new("u1", "c1"));
        cache.set(progress_key("u1", "c2"), ProgressRecord::new("u1", "c2"));
        cache.set(progress_key("u2", "c1"), ProgressRecord::new("u2", "c1"));

        cache.invalidate_where(|(user_id, _)| user_id == "u1");
        assert!(cache.get(&progress_key("u1", "c1")).is_none());
        assert!(cache.get(&progress_key("u1", "c2")).is_none());
        assert!(cache.get(&progress_key("u2", "c1")).is_some());
    }
}

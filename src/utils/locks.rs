use dashmap::DashMap;
use std::hash::Hash;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// 按键划分的进程内异步锁
/// 没有持有者和等待者的键在守卫释放时移除，表不会无限增长
pub struct KeyedLocks<K>
where
    K: Eq + Hash + Clone,
{
    locks: DashMap<K, Arc<Mutex<()>>>,
}

impl<K> KeyedLocks<K>
where
    K: Eq + Hash + Clone,
{
    pub fn new() -> Self {
        Self {
            locks: DashMap::new(),
        }
    }

    /// 等待并获取某个键的锁
    pub async fn lock(&self, key: K) -> KeyGuard<'_, K> {
        let mutex = self
            .locks
            .entry(key.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        let guard = mutex.lock_owned().await;
        KeyGuard {
            locks: &self.locks,
            key,
            guard: Some(guard),
        }
    }

    /// 当前登记的键数
    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}

impl<K> Default for KeyedLocks<K>
where
    K: Eq + Hash + Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

pub struct KeyGuard<'a, K>
where
    K: Eq + Hash + Clone,
{
    locks: &'a DashMap<K, Arc<Mutex<()>>>,
    key: K,
    guard: Option<OwnedMutexGuard<()>>,
}

impl<K> Drop for KeyGuard<'_, K>
where
    K: Eq + Hash + Clone,
{
    fn drop(&mut self) {
        // 先释放互斥锁，此时只剩表中的引用则说明无人等待
        self.guard.take();
        self.locks
            .remove_if(&self.key, |_, mutex| Arc::strong_count(mutex) == 1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_entries_removed_after_release() {
        let locks: KeyedLocks<String> = KeyedLocks::new();
        {
            let _a = locks.lock("a".to_string()).await;
            let _b = locks.lock("b".to_string()).await;
            assert_eq!(locks.len(), 2);
        }
        assert!(locks.is_empty());
    }

    #[tokio::test]
    async fn test_same_key_is_serialised() {
        let locks = Arc::new(KeyedLocks::<String>::new());
        let counter = Arc::new(parking_lot::Mutex::new((0usize, 0usize)));

        let mut handles = Vec::new();
        for _ in 0..4 {
            let locks = locks.clone();
            let counter = counter.clone();
            handles.push(tokio::spawn(async move {
                let _guard = locks.lock("user-1".to_string()).await;
                {
                    let mut state = counter.lock();
                    state.0 += 1;
                    state.1 = state.1.max(state.0);
                }
                tokio::time::sleep(Duration::from_millis(5)).await;
                counter.lock().0 -= 1;
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(counter.lock().1, 1);
        assert!(locks.is_empty());
    }
}

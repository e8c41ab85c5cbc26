use serde::Serialize;
use std::collections::VecDeque;
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{debug, warn};

use crate::models::{notification::Notification, toast::Toast};

/// 实时推送中心
/// 所有新通知经由同一个广播通道推送，订阅方按用户过滤
#[derive(Clone)]
pub struct NotificationHub {
    tx: broadcast::Sender<Notification>,
}

impl NotificationHub {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// 推送通知，返回当前在线的订阅数
    pub fn publish(&self, notification: &Notification) -> usize {
        match self.tx.send(notification.clone()) {
            Ok(receivers) => {
                debug!(
                    "Pushed notification {} to {} subscriber(s)",
                    notification.id, receivers
                );
                receivers
            }
            // 无订阅者时发送失败是正常情况
            Err(_) => 0,
        }
    }

    pub fn subscribe(&self, user_id: &str) -> Subscription {
        Subscription {
            user_id: user_id.to_string(),
            rx: self.tx.subscribe(),
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

/// 单个用户的订阅，按接收顺序产出发给该用户的通知
pub struct Subscription {
    user_id: String,
    rx: broadcast::Receiver<Notification>,
}

impl Subscription {
    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// 推送中心关闭后返回 `None`
    pub async fn recv(&mut self) -> Option<Notification> {
        loop {
            match self.rx.recv().await {
                Ok(notification) if notification.user_id == self.user_id => return Some(notification),
                Ok(_) => continue,
                Err(RecvError::Lagged(skipped)) => {
                    warn!(
                        "Subscription for user {} lagged, skipped {} notification(s)",
                        self.user_id, skipped
                    );
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }
}

/// 单个会话的通知列表，最新的在前
#[derive(Debug, Default)]
pub struct NotificationFeed {
    items: VecDeque<Notification>,
}

impl NotificationFeed {
    pub fn new(mut initial: Vec<Notification>) -> Self {
        initial.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Self {
            items: initial.into(),
        }
    }

    /// 追加推送来的通知，返回要显示的提示；已存在时返回 `None`
    pub fn receive(&mut self, notification: Notification) -> Option<Toast> {
        if self.items.iter().any(|n| n.id == notification.id) {
            return None;
        }
        let toast = Toast::info(notification.message.clone());
        self.items.push_front(notification);
        Some(toast)
    }

    pub fn items(&self) -> impl Iterator<Item = &Notification> {
        self.items.iter()
    }

    pub fn unread_count(&self) -> usize {
        self.items.iter().filter(|n| !n.read).count()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// WebSocket 推送帧
#[derive(Debug, Clone, Serialize)]
pub struct PushFrame {
    pub notification: Notification,
    pub toast: Toast,
    pub unread: usize,
}

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    response::Response,
    routing::get,
    Router,
};
use futures::{sink::SinkExt, stream::StreamExt};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::{
    error::{AppError, Result},
    services::realtime::{NotificationFeed, PushFrame, Subscription},
    state::AppState,
};

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/", get(websocket_handler))
}

/// 浏览器无法为 WebSocket 设置请求头，令牌通过查询参数传递
#[derive(Debug, Deserialize)]
pub struct WsQuery {
    pub token: String,
}

/// WebSocket连接处理器
/// GET /api/learn/ws?token=...
async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(app_state): State<Arc<AppState>>,
    Query(query): Query<WsQuery>,
) -> Result<Response> {
    let claims = app_state.auth_service.verify_jwt(&query.token)?;
    let user = app_state
        .user_service
        .get_user(&claims.sub)
        .await?
        .ok_or_else(|| AppError::unauthorized("Account is not registered"))?;
    if !user.approved {
        return Err(AppError::forbidden("Your account is pending approval."));
    }

    // 先订阅再读取历史，避免两者之间的推送丢失；重复项由 feed 去重
    let subscription = app_state.notification_service.hub().subscribe(&user.id);
    let feed = NotificationFeed::new(app_state.notification_service.list(&user.id).await?);

    info!("WebSocket upgrade request from user: {}", user.id);
    Ok(ws.on_upgrade(move |socket| stream_notifications(socket, subscription, feed)))
}

async fn stream_notifications(socket: WebSocket, mut subscription: Subscription, mut feed: NotificationFeed) {
    let user_id = subscription.user_id().to_string();
    let (mut ws_tx, mut ws_rx) = socket.split();

    loop {
        tokio::select! {
            pushed = subscription.recv() => {
                let Some(notification) = pushed else { break };
                let Some(toast) = feed.receive(notification.clone()) else { continue };
                let frame = PushFrame {
                    notification,
                    toast,
                    unread: feed.unread_count(),
                };
                match serde_json::to_string(&frame) {
                    Ok(text) => {
                        if let Err(e) = ws_tx.send(Message::Text(text)).await {
                            warn!("Failed to push to user {}: {}", user_id, e);
                            break;
                        }
                    }
                    Err(e) => error!("Failed to serialize push frame: {}", e),
                }
            }
            incoming = ws_rx.next() => {
                match incoming {
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        warn!("WebSocket error for user {}: {}", user_id, e);
                        break;
                    }
                }
            }
        }
    }

    debug!(
        "WebSocket closed for user {} ({} notification(s) in feed)",
        user_id,
        feed.len()
    );
}

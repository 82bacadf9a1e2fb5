//! Hub HTTP endpoints.
//!
//! - `/health`              : store reachable (503 otherwise, or while draining)
//! - `/api/messages`        : conversation history
//! - `/api/unread`          : unread counter
//! - `/api/users`           : users with a live session
//! - `/api/admin/delete`    : erase a user's messages and drop their session

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use relayhub_core::error::RelayError;
use relayhub_core::protocol::{ChatMessage, PresenceStatus};

use crate::app_state::AppState;
use crate::error::ApiError;

type ApiResult<T> = std::result::Result<T, ApiError>;

pub async fn health(State(state): State<AppState>) -> Response {
    if state.is_shutting_down() {
        return (StatusCode::SERVICE_UNAVAILABLE, "draining").into_response();
    }
    match state.store().ping().await {
        Ok(()) => (StatusCode::OK, "OK").into_response(),
        Err(e) => {
            tracing::warn!(error = %e, "health check failed");
            (StatusCode::SERVICE_UNAVAILABLE, "store unavailable").into_response()
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationQuery {
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub other_user_id: String,
    #[serde(default)]
    pub limit: usize,
}

pub async fn messages(
    State(state): State<AppState>,
    Query(q): Query<ConversationQuery>,
) -> ApiResult<Json<Vec<ChatMessage>>> {
    if q.user_id.is_empty() || q.other_user_id.is_empty() {
        return Err(RelayError::BadRequest("userId and otherUserId are required".into()).into());
    }
    let msgs = state
        .store()
        .load_conversation(&q.user_id, &q.other_user_id, q.limit)
        .await?;
    Ok(Json(msgs))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserQuery {
    #[serde(default)]
    pub user_id: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UnreadCount {
    pub unread_count: usize,
}

pub async fn unread(
    State(state): State<AppState>,
    Query(q): Query<UserQuery>,
) -> ApiResult<Json<UnreadCount>> {
    if q.user_id.is_empty() {
        return Err(RelayError::BadRequest("userId is required".into()).into());
    }
    let unread_count = state.store().unread_count(&q.user_id).await?;
    Ok(Json(UnreadCount { unread_count }))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OnlineUser {
    pub id: String,
    pub name: String,
    pub status: PresenceStatus,
    pub last_seen: DateTime<Utc>,
}

pub async fn users(State(state): State<AppState>) -> Json<Vec<OnlineUser>> {
    let mut out: Vec<OnlineUser> = state
        .realtime()
        .online()
        .into_iter()
        .map(|(id, conn)| OnlineUser {
            id,
            name: conn.display_name.to_string(),
            status: PresenceStatus::Online,
            last_seen: conn.last_seen(),
        })
        .collect();
    out.sort_by(|a, b| a.id.cmp(&b.id));
    Json(out)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct DeleteUser {
    pub user_id: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteReport {
    pub user_id: String,
    pub deleted_messages: usize,
    pub disconnected: bool,
}

pub async fn admin_delete(
    State(state): State<AppState>,
    Json(req): Json<DeleteUser>,
) -> ApiResult<Json<DeleteReport>> {
    if req.user_id.trim().is_empty() {
        return Err(RelayError::BadRequest("userId is required".into()).into());
    }
    let deleted_messages = state.store().delete_user_messages(&req.user_id).await?;
    let disconnected = state.realtime().disconnect(&req.user_id);
    tracing::info!(user = %req.user_id, deleted_messages, disconnected, "user erased");

    Ok(Json(DeleteReport {
        user_id: req.user_id,
        deleted_messages,
        disconnected,
    }))
}

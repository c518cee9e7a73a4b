use std::sync::Arc;

use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::Json;
use common::types::{
    Conversation, DirectMessage, GroupId, GroupMessage, GroupUnread, MessageCreate, UserId,
};
use http::StatusCode;
use utoipa_axum::{router::OpenApiRouter, routes};

use super::util::Auth;
use crate::error::Result;
use crate::ServerState;

/// Dm send
///
/// Send a direct message to another user. The receiver's live connections
/// get the message pushed; everyone else catches up via history.
#[utoipa::path(
    post,
    path = "/dm/{user_id}/message",
    params(("user_id", description = "Receiving user's id")),
    tags = ["dm"],
    responses(
        (status = CREATED, body = DirectMessage, description = "message sent"),
    )
)]
async fn dm_send(
    Path(receiver_id): Path<UserId>,
    Auth(auth_user): Auth,
    State(s): State<Arc<ServerState>>,
    Json(json): Json<MessageCreate>,
) -> Result<impl IntoResponse> {
    let srv = s.services();
    let message = srv
        .messages
        .send_direct(auth_user.id, receiver_id, json)
        .await?;
    Ok((StatusCode::CREATED, Json(message)))
}

/// Dm history
///
/// Everything exchanged with the counterpart, oldest first. Merge with
/// live-pushed messages by id.
#[utoipa::path(
    get,
    path = "/dm/{user_id}/message",
    params(("user_id", description = "Counterpart user's id")),
    tags = ["dm"],
    responses(
        (status = OK, body = Vec<DirectMessage>, description = "success"),
    )
)]
async fn dm_history(
    Path(counterpart_id): Path<UserId>,
    Auth(auth_user): Auth,
    State(s): State<Arc<ServerState>>,
) -> Result<impl IntoResponse> {
    let srv = s.services();
    let messages = srv
        .messages
        .direct_history(auth_user.id, counterpart_id)
        .await?;
    Ok(Json(messages))
}

/// Dm list
///
/// List conversations: the latest message per counterpart, most recently
/// active first.
#[utoipa::path(
    get,
    path = "/dm",
    tags = ["dm"],
    responses(
        (status = OK, body = Vec<Conversation>, description = "success"),
    )
)]
async fn dm_list(
    Auth(auth_user): Auth,
    State(s): State<Arc<ServerState>>,
) -> Result<impl IntoResponse> {
    let srv = s.services();
    let conversations = srv.messages.conversations(auth_user.id).await?;
    Ok(Json(conversations))
}

/// Group send
///
/// Send a message to a group the caller is a member of.
#[utoipa::path(
    post,
    path = "/group/{group_id}/message",
    params(("group_id", description = "Group id")),
    tags = ["group"],
    responses(
        (status = CREATED, body = GroupMessage, description = "message sent"),
    )
)]
async fn group_send(
    Path(group_id): Path<GroupId>,
    Auth(auth_user): Auth,
    State(s): State<Arc<ServerState>>,
    Json(json): Json<MessageCreate>,
) -> Result<impl IntoResponse> {
    let srv = s.services();
    let message = srv.messages.send_group(auth_user.id, group_id, json).await?;
    Ok((StatusCode::CREATED, Json(message)))
}

/// Group history
///
/// Everything sent in the group, oldest first. Members only.
#[utoipa::path(
    get,
    path = "/group/{group_id}/message",
    params(("group_id", description = "Group id")),
    tags = ["group"],
    responses(
        (status = OK, body = Vec<GroupMessage>, description = "success"),
    )
)]
async fn group_history(
    Path(group_id): Path<GroupId>,
    Auth(auth_user): Auth,
    State(s): State<Arc<ServerState>>,
) -> Result<impl IntoResponse> {
    let srv = s.services();
    let messages = srv.messages.group_history(auth_user.id, group_id).await?;
    Ok(Json(messages))
}

/// Group ack
///
/// Acknowledge a group: reset the caller's unread counter to zero.
/// Idempotent.
#[utoipa::path(
    post,
    path = "/group/{group_id}/ack",
    params(("group_id", description = "Group id")),
    tags = ["group"],
    responses(
        (status = NO_CONTENT, description = "acknowledged"),
    )
)]
async fn group_ack(
    Path(group_id): Path<GroupId>,
    Auth(auth_user): Auth,
    State(s): State<Arc<ServerState>>,
) -> Result<impl IntoResponse> {
    let srv = s.services();
    srv.messages.reset_unread(group_id, auth_user.id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Group unread list
///
/// The caller's per-group unread counters.
#[utoipa::path(
    get,
    path = "/group/unread",
    tags = ["group"],
    responses(
        (status = OK, body = Vec<GroupUnread>, description = "success"),
    )
)]
async fn group_unread_list(
    Auth(auth_user): Auth,
    State(s): State<Arc<ServerState>>,
) -> Result<impl IntoResponse> {
    let srv = s.services();
    let unreads = srv.messages.unread_list(auth_user.id).await?;
    Ok(Json(unreads))
}

pub fn routes() -> OpenApiRouter<Arc<ServerState>> {
    OpenApiRouter::new()
        .routes(routes!(dm_send, dm_history))
        .routes(routes!(dm_list))
        .routes(routes!(group_send, group_history))
        .routes(routes!(group_ack))
        .routes(routes!(group_unread_list))
}

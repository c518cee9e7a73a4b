use std::sync::Arc;

use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::Json;
use common::types::{Notification, NotificationId};
use http::StatusCode;
use serde::Serialize;
use utoipa::ToSchema;
use utoipa_axum::{router::OpenApiRouter, routes};

use super::util::Auth;
use crate::error::Result;
use crate::ServerState;

#[derive(Debug, Serialize, ToSchema)]
struct UnreadCount {
    count: u64,
}

#[derive(Debug, Serialize, ToSchema)]
struct ViewedAll {
    updated: u64,
}

/// Notification list
///
/// The caller's notifications, newest first.
#[utoipa::path(
    get,
    path = "/notification",
    tags = ["notification"],
    responses(
        (status = OK, body = Vec<Notification>, description = "success"),
    )
)]
async fn notification_list(
    Auth(auth_user): Auth,
    State(s): State<Arc<ServerState>>,
) -> Result<impl IntoResponse> {
    let srv = s.services();
    let notifications = srv.notifications.list(auth_user.id).await?;
    Ok(Json(notifications))
}

/// Notification unread count
///
/// How many of the caller's notifications are not yet read.
#[utoipa::path(
    get,
    path = "/notification/unread-count",
    tags = ["notification"],
    responses(
        (status = OK, body = UnreadCount, description = "success"),
    )
)]
async fn notification_unread_count(
    Auth(auth_user): Auth,
    State(s): State<Arc<ServerState>>,
) -> Result<impl IntoResponse> {
    let srv = s.services();
    let count = srv.notifications.unread_count(auth_user.id).await?;
    Ok(Json(UnreadCount { count }))
}

/// Notification read
///
/// Mark a notification as acted upon. Idempotent.
#[utoipa::path(
    put,
    path = "/notification/{id}/read",
    params(("id", description = "Notification id")),
    tags = ["notification"],
    responses(
        (status = OK, body = Notification, description = "success"),
    )
)]
async fn notification_read(
    Path(id): Path<NotificationId>,
    Auth(auth_user): Auth,
    State(s): State<Arc<ServerState>>,
) -> Result<impl IntoResponse> {
    let srv = s.services();
    let notification = srv.notifications.mark_read(id, auth_user.id).await?;
    Ok(Json(notification))
}

/// Notification viewed
///
/// Mark a notification as seen in the list. Independent of read.
#[utoipa::path(
    put,
    path = "/notification/{id}/viewed",
    params(("id", description = "Notification id")),
    tags = ["notification"],
    responses(
        (status = OK, body = Notification, description = "success"),
    )
)]
async fn notification_viewed(
    Path(id): Path<NotificationId>,
    Auth(auth_user): Auth,
    State(s): State<Arc<ServerState>>,
) -> Result<impl IntoResponse> {
    let srv = s.services();
    let notification = srv.notifications.mark_viewed(id, auth_user.id).await?;
    Ok(Json(notification))
}

/// Notification mark all viewed
///
/// Mark everything the caller owns as viewed in one step.
#[utoipa::path(
    post,
    path = "/notification/mark-all-viewed",
    tags = ["notification"],
    responses(
        (status = OK, body = ViewedAll, description = "success"),
    )
)]
async fn notification_mark_all_viewed(
    Auth(auth_user): Auth,
    State(s): State<Arc<ServerState>>,
) -> Result<impl IntoResponse> {
    let srv = s.services();
    let updated = srv.notifications.mark_all_viewed(auth_user.id).await?;
    Ok(Json(ViewedAll { updated }))
}

/// Notification accept
///
/// Accept the friend request behind a notification. The request is
/// resolved and the requester is notified.
#[utoipa::path(
    post,
    path = "/notification/{id}/accept",
    params(("id", description = "Notification id")),
    tags = ["notification"],
    responses(
        (status = NO_CONTENT, description = "accepted"),
    )
)]
async fn notification_accept(
    Path(id): Path<NotificationId>,
    Auth(auth_user): Auth,
    State(s): State<Arc<ServerState>>,
) -> Result<impl IntoResponse> {
    let srv = s.services();
    srv.notifications
        .resolve_friend_request(id, auth_user.id, true)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Notification decline
///
/// Decline the friend request behind a notification.
#[utoipa::path(
    post,
    path = "/notification/{id}/decline",
    params(("id", description = "Notification id")),
    tags = ["notification"],
    responses(
        (status = NO_CONTENT, description = "declined"),
    )
)]
async fn notification_decline(
    Path(id): Path<NotificationId>,
    Auth(auth_user): Auth,
    State(s): State<Arc<ServerState>>,
) -> Result<impl IntoResponse> {
    let srv = s.services();
    srv.notifications
        .resolve_friend_request(id, auth_user.id, false)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Notification delete
#[utoipa::path(
    delete,
    path = "/notification/{id}",
    params(("id", description = "Notification id")),
    tags = ["notification"],
    responses(
        (status = NO_CONTENT, description = "deleted"),
    )
)]
async fn notification_delete(
    Path(id): Path<NotificationId>,
    Auth(auth_user): Auth,
    State(s): State<Arc<ServerState>>,
) -> Result<impl IntoResponse> {
    let srv = s.services();
    srv.notifications.delete(id, auth_user.id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub fn routes() -> OpenApiRouter<Arc<ServerState>> {
    OpenApiRouter::new()
        .routes(routes!(notification_list))
        .routes(routes!(notification_unread_count))
        .routes(routes!(notification_read))
        .routes(routes!(notification_viewed))
        .routes(routes!(notification_mark_all_viewed))
        .routes(routes!(notification_accept))
        .routes(routes!(notification_decline))
        .routes(routes!(notification_delete))
}

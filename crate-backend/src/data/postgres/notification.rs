use async_trait::async_trait;
use common::types::{
    Notification, NotificationBody, NotificationId, NotificationKind, Time, UserId,
};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::data::DataNotification;
use crate::error::{Error, Result};

use super::Postgres;

fn kind_str(kind: NotificationKind) -> &'static str {
    match kind {
        NotificationKind::Like => "like",
        NotificationKind::Comment => "comment",
        NotificationKind::NewMessage => "new_message",
        NotificationKind::NewGroupMessage => "new_group_message",
        NotificationKind::FriendRequest => "friend_request",
        NotificationKind::FriendRequestAccepted => "friend_request_accepted",
        NotificationKind::FriendRequestDeclined => "friend_request_declined",
    }
}

#[derive(sqlx::FromRow)]
struct NotificationRow {
    id: Uuid,
    recipient_id: Uuid,
    kind: String,
    related_id: Uuid,
    post_id: Option<Uuid>,
    comment_id: Option<Uuid>,
    message_id: Option<Uuid>,
    message: String,
    count: i32,
    read: bool,
    viewed: bool,
    created_at: OffsetDateTime,
}

impl NotificationRow {
    fn into_notification(self) -> Result<Notification> {
        let missing =
            |column: &str| Error::Internal(format!("notification row missing {column}"));
        let body = match self.kind.as_str() {
            "like" => NotificationBody::Like {
                user_id: self.related_id.into(),
                post_id: self.post_id.ok_or_else(|| missing("post_id"))?.into(),
            },
            "comment" => NotificationBody::Comment {
                user_id: self.related_id.into(),
                post_id: self.post_id.ok_or_else(|| missing("post_id"))?.into(),
                comment_id: self.comment_id.ok_or_else(|| missing("comment_id"))?.into(),
            },
            "new_message" => NotificationBody::NewMessage {
                sender_id: self.related_id.into(),
                message_id: self.message_id.ok_or_else(|| missing("message_id"))?.into(),
            },
            "new_group_message" => NotificationBody::NewGroupMessage {
                group_id: self.related_id.into(),
                message_id: self.message_id.ok_or_else(|| missing("message_id"))?.into(),
            },
            "friend_request" => NotificationBody::FriendRequest {
                requester_id: self.related_id.into(),
            },
            "friend_request_accepted" => NotificationBody::FriendRequestAccepted {
                user_id: self.related_id.into(),
            },
            "friend_request_declined" => NotificationBody::FriendRequestDeclined {
                user_id: self.related_id.into(),
            },
            other => {
                return Err(Error::Internal(format!(
                    "invalid notification kind in db: {other}"
                )))
            }
        };
        Ok(Notification {
            id: self.id.into(),
            recipient_id: self.recipient_id.into(),
            body,
            message: self.message,
            count: self.count.max(0) as u32,
            read: self.read,
            viewed: self.viewed,
            created_at: self.created_at.into(),
        })
    }
}

const COLUMNS: &str = "id, recipient_id, kind, related_id, post_id, comment_id, message_id, \
                       message, count, read, viewed, created_at";

#[async_trait]
impl DataNotification for Postgres {
    async fn notification_insert(&self, notification: Notification) -> Result<()> {
        let (post_id, comment_id, message_id) = match &notification.body {
            NotificationBody::Like { post_id, .. } => (Some(post_id.into_inner()), None, None),
            NotificationBody::Comment {
                post_id,
                comment_id,
                ..
            } => (
                Some(post_id.into_inner()),
                Some(comment_id.into_inner()),
                None,
            ),
            NotificationBody::NewMessage { message_id, .. }
            | NotificationBody::NewGroupMessage { message_id, .. } => {
                (None, None, Some(message_id.into_inner()))
            }
            _ => (None, None, None),
        };
        sqlx::query(
            r#"
            INSERT INTO notification (id, recipient_id, kind, related_id, post_id,
                comment_id, message_id, message, count, read, viewed, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            "#,
        )
        .bind(notification.id.into_inner())
        .bind(notification.recipient_id.into_inner())
        .bind(kind_str(notification.body.kind()))
        .bind(notification.body.related_id())
        .bind(post_id)
        .bind(comment_id)
        .bind(message_id)
        .bind(&notification.message)
        .bind(notification.count as i32)
        .bind(notification.read)
        .bind(notification.viewed)
        .bind(notification.created_at.into_inner())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn notification_get(&self, id: NotificationId) -> Result<Notification> {
        let row: NotificationRow =
            sqlx::query_as(&format!("SELECT {COLUMNS} FROM notification WHERE id = $1"))
                .bind(id.into_inner())
                .fetch_one(&self.pool)
                .await?;
        row.into_notification()
    }

    async fn notification_find_unread(
        &self,
        recipient_id: UserId,
        kind: NotificationKind,
        related_id: Uuid,
    ) -> Result<Option<Notification>> {
        let row: Option<NotificationRow> = sqlx::query_as(&format!(
            r#"
            SELECT {COLUMNS} FROM notification
            WHERE recipient_id = $1 AND kind = $2 AND related_id = $3 AND NOT read
            ORDER BY created_at DESC, id DESC
            LIMIT 1
            "#
        ))
        .bind(recipient_id.into_inner())
        .bind(kind_str(kind))
        .bind(related_id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(NotificationRow::into_notification).transpose()
    }

    async fn notification_bump(
        &self,
        id: NotificationId,
        message: &str,
        at: Time,
    ) -> Result<Notification> {
        let row: NotificationRow = sqlx::query_as(&format!(
            r#"
            UPDATE notification
            SET count = count + 1, message = $2, created_at = $3
            WHERE id = $1
            RETURNING {COLUMNS}
            "#
        ))
        .bind(id.into_inner())
        .bind(message)
        .bind(at.into_inner())
        .fetch_one(&self.pool)
        .await?;
        row.into_notification()
    }

    async fn notification_list(&self, recipient_id: UserId) -> Result<Vec<Notification>> {
        let rows: Vec<NotificationRow> = sqlx::query_as(&format!(
            r#"
            SELECT {COLUMNS} FROM notification
            WHERE recipient_id = $1
            ORDER BY created_at DESC, id DESC
            "#
        ))
        .bind(recipient_id.into_inner())
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter()
            .map(NotificationRow::into_notification)
            .collect()
    }

    async fn notification_mark_read(&self, id: NotificationId) -> Result<Notification> {
        let row: NotificationRow = sqlx::query_as(&format!(
            "UPDATE notification SET read = true WHERE id = $1 RETURNING {COLUMNS}"
        ))
        .bind(id.into_inner())
        .fetch_one(&self.pool)
        .await?;
        row.into_notification()
    }

    async fn notification_mark_viewed(&self, id: NotificationId) -> Result<Notification> {
        let row: NotificationRow = sqlx::query_as(&format!(
            "UPDATE notification SET viewed = true WHERE id = $1 RETURNING {COLUMNS}"
        ))
        .bind(id.into_inner())
        .fetch_one(&self.pool)
        .await?;
        row.into_notification()
    }

    async fn notification_mark_all_viewed(&self, recipient_id: UserId) -> Result<u64> {
        let result =
            sqlx::query("UPDATE notification SET viewed = true WHERE recipient_id = $1 AND NOT viewed")
                .bind(recipient_id.into_inner())
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected())
    }

    async fn notification_unread_count(&self, recipient_id: UserId) -> Result<u64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM notification WHERE recipient_id = $1 AND NOT read",
        )
        .bind(recipient_id.into_inner())
        .fetch_one(&self.pool)
        .await?;
        Ok(count.max(0) as u64)
    }

    async fn notification_delete(&self, id: NotificationId) -> Result<()> {
        let result = sqlx::query("DELETE FROM notification WHERE id = $1")
            .bind(id.into_inner())
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(Error::NotFound);
        }
        Ok(())
    }
}

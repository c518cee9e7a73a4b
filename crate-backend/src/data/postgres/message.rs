use async_trait::async_trait;
use common::types::{
    Conversation, DirectMessage, GroupId, GroupMessage, MessageId, Time, User, UserId,
};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::data::{DataMessage, DbDirectMessageCreate, DbGroupMessageCreate};
use crate::error::Result;

use super::Postgres;

#[derive(sqlx::FromRow)]
struct DirectMessageRow {
    id: Uuid,
    sender_id: Uuid,
    receiver_id: Uuid,
    content: String,
    created_at: OffsetDateTime,
}

impl From<DirectMessageRow> for DirectMessage {
    fn from(row: DirectMessageRow) -> Self {
        DirectMessage {
            id: row.id.into(),
            sender_id: row.sender_id.into(),
            receiver_id: row.receiver_id.into(),
            content: row.content,
            created_at: row.created_at.into(),
        }
    }
}

#[derive(sqlx::FromRow)]
struct GroupMessageRow {
    id: Uuid,
    group_id: Uuid,
    sender_id: Uuid,
    content: String,
    created_at: OffsetDateTime,
}

impl From<GroupMessageRow> for GroupMessage {
    fn from(row: GroupMessageRow) -> Self {
        GroupMessage {
            id: row.id.into(),
            group_id: row.group_id.into(),
            sender_id: row.sender_id.into(),
            content: row.content,
            created_at: row.created_at.into(),
        }
    }
}

#[derive(sqlx::FromRow)]
struct ConversationRow {
    counterpart_id: Uuid,
    counterpart_name: String,
    counterpart_email: String,
    counterpart_banned: bool,
    id: Uuid,
    sender_id: Uuid,
    receiver_id: Uuid,
    content: String,
    created_at: OffsetDateTime,
}

impl From<ConversationRow> for Conversation {
    fn from(row: ConversationRow) -> Self {
        Conversation {
            counterpart: User {
                id: row.counterpart_id.into(),
                name: row.counterpart_name,
                email: row.counterpart_email,
                banned: row.counterpart_banned,
            },
            latest_message: DirectMessage {
                id: row.id.into(),
                sender_id: row.sender_id.into(),
                receiver_id: row.receiver_id.into(),
                content: row.content,
                created_at: row.created_at.into(),
            },
        }
    }
}

#[async_trait]
impl DataMessage for Postgres {
    async fn direct_message_create(&self, create: DbDirectMessageCreate) -> Result<DirectMessage> {
        let row: DirectMessageRow = sqlx::query_as(
            r#"
            INSERT INTO direct_message (id, sender_id, receiver_id, content, created_at)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, sender_id, receiver_id, content, created_at
            "#,
        )
        .bind(MessageId::new().into_inner())
        .bind(create.sender_id.into_inner())
        .bind(create.receiver_id.into_inner())
        .bind(&create.content)
        .bind(Time::now_utc().into_inner())
        .fetch_one(&self.pool)
        .await?;
        Ok(row.into())
    }

    async fn group_message_create(&self, create: DbGroupMessageCreate) -> Result<GroupMessage> {
        let row: GroupMessageRow = sqlx::query_as(
            r#"
            INSERT INTO group_message (id, group_id, sender_id, content, created_at)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, group_id, sender_id, content, created_at
            "#,
        )
        .bind(MessageId::new().into_inner())
        .bind(create.group_id.into_inner())
        .bind(create.sender_id.into_inner())
        .bind(&create.content)
        .bind(Time::now_utc().into_inner())
        .fetch_one(&self.pool)
        .await?;
        Ok(row.into())
    }

    async fn direct_history(
        &self,
        user_a_id: UserId,
        user_b_id: UserId,
    ) -> Result<Vec<DirectMessage>> {
        let rows: Vec<DirectMessageRow> = sqlx::query_as(
            r#"
            SELECT id, sender_id, receiver_id, content, created_at
            FROM direct_message
            WHERE (sender_id = $1 AND receiver_id = $2)
               OR (sender_id = $2 AND receiver_id = $1)
            ORDER BY created_at, id
            "#,
        )
        .bind(user_a_id.into_inner())
        .bind(user_b_id.into_inner())
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn group_history(&self, group_id: GroupId) -> Result<Vec<GroupMessage>> {
        let rows: Vec<GroupMessageRow> = sqlx::query_as(
            r#"
            SELECT id, group_id, sender_id, content, created_at
            FROM group_message
            WHERE group_id = $1
            ORDER BY created_at, id
            "#,
        )
        .bind(group_id.into_inner())
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn conversation_list(&self, user_id: UserId) -> Result<Vec<Conversation>> {
        let rows: Vec<ConversationRow> = sqlx::query_as(
            r#"
            SELECT u.id AS counterpart_id, u.name AS counterpart_name,
                   u.email AS counterpart_email, u.banned AS counterpart_banned,
                   m.id, m.sender_id, m.receiver_id, m.content, m.created_at
            FROM (
                SELECT DISTINCT ON (counterpart_id) *
                FROM (
                    SELECT dm.*,
                           CASE WHEN dm.sender_id = $1 THEN dm.receiver_id
                                ELSE dm.sender_id END AS counterpart_id
                    FROM direct_message dm
                    WHERE dm.sender_id = $1 OR dm.receiver_id = $1
                ) with_counterpart
                ORDER BY counterpart_id, created_at DESC, id DESC
            ) m
            JOIN users u ON u.id = m.counterpart_id
            ORDER BY m.created_at DESC, m.id DESC
            "#,
        )
        .bind(user_id.into_inner())
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }
}

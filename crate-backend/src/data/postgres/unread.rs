use async_trait::async_trait;
use common::types::{GroupId, GroupUnread, UserId};
use uuid::Uuid;

use crate::data::DataUnread;
use crate::error::Result;

use super::Postgres;

#[derive(sqlx::FromRow)]
struct GroupUnreadRow {
    group_id: Uuid,
    user_id: Uuid,
    count: i64,
}

#[async_trait]
impl DataUnread for Postgres {
    async fn unread_increment_members(&self, group_id: GroupId, except: UserId) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO group_unread (group_id, user_id, count)
            SELECT gm.group_id, gm.user_id, 1
            FROM group_member gm
            WHERE gm.group_id = $1 AND gm.user_id <> $2
            ON CONFLICT ON CONSTRAINT group_unread_pkey DO UPDATE SET
                count = group_unread.count + 1
            "#,
        )
        .bind(group_id.into_inner())
        .bind(except.into_inner())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn unread_reset(&self, group_id: GroupId, user_id: UserId) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO group_unread (group_id, user_id, count)
            VALUES ($1, $2, 0)
            ON CONFLICT ON CONSTRAINT group_unread_pkey DO UPDATE SET count = 0
            "#,
        )
        .bind(group_id.into_inner())
        .bind(user_id.into_inner())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn unread_list(&self, user_id: UserId) -> Result<Vec<GroupUnread>> {
        let rows: Vec<GroupUnreadRow> = sqlx::query_as(
            "SELECT group_id, user_id, count FROM group_unread WHERE user_id = $1 ORDER BY group_id",
        )
        .bind(user_id.into_inner())
        .fetch_all(&self.pool)
        .await?;
        Ok(rows
            .into_iter()
            .map(|row| GroupUnread {
                group_id: row.group_id.into(),
                user_id: row.user_id.into(),
                count: row.count.max(0) as u64,
            })
            .collect())
    }
}

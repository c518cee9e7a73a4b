use async_trait::async_trait;
use common::types::{Group, GroupId, UserId};
use uuid::Uuid;

use crate::data::DataGroup;
use crate::error::Result;

use super::Postgres;

#[derive(sqlx::FromRow)]
struct GroupRow {
    id: Uuid,
    name: String,
    creator_id: Uuid,
}

impl From<GroupRow> for Group {
    fn from(row: GroupRow) -> Self {
        Group {
            id: row.id.into(),
            name: row.name,
            creator_id: row.creator_id.into(),
        }
    }
}

#[async_trait]
impl DataGroup for Postgres {
    async fn group_get(&self, group_id: GroupId) -> Result<Group> {
        let row: GroupRow =
            sqlx::query_as("SELECT id, name, creator_id FROM group_chat WHERE id = $1")
                .bind(group_id.into_inner())
                .fetch_one(&self.pool)
                .await?;
        Ok(row.into())
    }

    async fn group_members(&self, group_id: GroupId) -> Result<Vec<UserId>> {
        let rows: Vec<(Uuid,)> =
            sqlx::query_as("SELECT user_id FROM group_member WHERE group_id = $1")
                .bind(group_id.into_inner())
                .fetch_all(&self.pool)
                .await?;
        Ok(rows.into_iter().map(|(id,)| id.into()).collect())
    }

    async fn group_is_member(&self, group_id: GroupId, user_id: UserId) -> Result<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM group_member WHERE group_id = $1 AND user_id = $2)",
        )
        .bind(group_id.into_inner())
        .bind(user_id.into_inner())
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }
}

use async_trait::async_trait;
use common::types::{SessionToken, User, UserId};
use uuid::Uuid;

use crate::data::{DataAuth, DataUser};
use crate::error::Result;

use super::Postgres;

#[derive(sqlx::FromRow)]
pub(super) struct UserRow {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub banned: bool,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        User {
            id: row.id.into(),
            name: row.name,
            email: row.email,
            banned: row.banned,
        }
    }
}

fn ensure_canonical(a: UserId, b: UserId) -> (UserId, UserId) {
    if a < b {
        (a, b)
    } else {
        (b, a)
    }
}

#[async_trait]
impl DataAuth for Postgres {
    async fn session_user_by_token(&self, token: &SessionToken) -> Result<User> {
        let row: UserRow = sqlx::query_as(
            r#"
            SELECT u.id, u.name, u.email, u.banned
            FROM session s
            JOIN users u ON u.id = s.user_id
            WHERE s.token = $1
            "#,
        )
        .bind(&token.0)
        .fetch_one(&self.pool)
        .await?;
        Ok(row.into())
    }
}

#[async_trait]
impl DataUser for Postgres {
    async fn user_get(&self, user_id: UserId) -> Result<User> {
        let row: UserRow =
            sqlx::query_as("SELECT id, name, email, banned FROM users WHERE id = $1")
                .bind(user_id.into_inner())
                .fetch_one(&self.pool)
                .await?;
        Ok(row.into())
    }

    async fn acquaintance_put(&self, user_a_id: UserId, user_b_id: UserId) -> Result<()> {
        let (user_a_id, user_b_id) = ensure_canonical(user_a_id, user_b_id);
        sqlx::query(
            r#"
            INSERT INTO acquaintance (user_a_id, user_b_id)
            VALUES ($1, $2)
            ON CONFLICT ON CONSTRAINT acquaintance_pkey DO NOTHING
            "#,
        )
        .bind(user_a_id.into_inner())
        .bind(user_b_id.into_inner())
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

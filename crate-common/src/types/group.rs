use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::{GroupId, UserId};

/// A group chat. Membership is managed by the surrounding application;
/// this core only resolves the current member set when fanning out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Group {
    pub id: GroupId,
    pub name: String,
    pub creator_id: UserId,
}

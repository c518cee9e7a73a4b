use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::UserId;

/// The slice of a user account the messaging core reads. Profile data,
/// credentials, and role management live elsewhere.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub email: String,

    /// banned users cannot authenticate against any endpoint here
    pub banned: bool,
}

/// An opaque bearer credential, resolved to a [`User`] by the store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub struct SessionToken(pub String);

impl SessionToken {
    pub fn into_inner(self) -> String {
        self.0
    }
}

use std::fmt::Display;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

pub trait Identifier:
    From<Uuid> + Into<Uuid> + Display + Clone + Copy + PartialEq + Eq + PartialOrd + Ord
{
}

macro_rules! genid {
    ($name:ident, $example:expr) => {
        #[derive(
            Debug,
            Clone,
            Copy,
            Hash,
            PartialEq,
            Eq,
            PartialOrd,
            Ord,
            ToSchema,
            Serialize,
            Deserialize,
        )]
        #[schema(examples($example))]
        pub struct $name(pub Uuid);

        impl $name {
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            pub fn into_inner(self) -> Uuid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<Uuid> for $name {
            fn from(value: Uuid) -> Self {
                Self(value)
            }
        }

        impl From<$name> for Uuid {
            fn from(val: $name) -> Self {
                val.0
            }
        }

        impl Identifier for $name {}
    };
}

genid!(UserId, "00000000-0000-0000-0000-00000000user");
genid!(GroupId, "00000000-0000-0000-0000-0000000group");
genid!(MessageId, "00000000-0000-0000-0000-00000message");
genid!(NotificationId, "00000000-0000-0000-0000-000000notif");
genid!(PostId, "00000000-0000-0000-0000-00000000post");
genid!(CommentId, "00000000-0000-0000-0000-0000comment");
genid!(ConnectionId, "00000000-0000-0000-0000-00000000conn");

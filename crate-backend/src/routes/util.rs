use std::sync::Arc;

use axum::{extract::FromRequestParts, http::request::Parts};
use common::types::{SessionToken, User};
use headers::{authorization::Bearer, Authorization, HeaderMapExt};

use crate::{error::Error, ServerState};

/// extract the authenticated user for a request
pub struct Auth(pub User);

impl FromRequestParts<Arc<ServerState>> for Auth {
    type Rejection = Error;

    async fn from_request_parts(
        parts: &mut Parts,
        s: &Arc<ServerState>,
    ) -> Result<Self, Self::Rejection> {
        let auth: Authorization<Bearer> = parts
            .headers
            .typed_get()
            .ok_or(Error::MissingAuth)?;
        let user = s
            .data()
            .session_user_by_token(&SessionToken(auth.token().to_string()))
            .await
            .map_err(|err| match err {
                Error::NotFound => Error::MissingAuth,
                other => other,
            })?;
        if user.banned {
            return Err(Error::MissingPermissions);
        }
        Ok(Self(user))
    }
}

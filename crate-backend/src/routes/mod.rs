use std::sync::Arc;

use http::header::{AUTHORIZATION, CONTENT_TYPE};
use tower_http::cors::CorsLayer;
use utoipa_axum::router::OpenApiRouter;

use crate::ServerState;

mod message;
mod notification;
mod sync;
mod util;

pub use util::Auth;

pub fn routes() -> OpenApiRouter<Arc<ServerState>> {
    OpenApiRouter::new()
        .merge(message::routes())
        .merge(notification::routes())
        .merge(sync::routes())
}

pub fn cors() -> CorsLayer {
    CorsLayer::very_permissive()
        .expose_headers([CONTENT_TYPE])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE])
}

use axum::{extract::ws::Message, http::StatusCode, response::IntoResponse, Json};
use common::types::{MessageEnvelope, MessagePayload};
use serde_json::json;
use tracing::error;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("missing authentication")]
    MissingAuth,
    #[error("bad header")]
    BadHeader,
    #[error("connection not yet joined")]
    UnauthSession,
    #[error("not found")]
    NotFound,
    #[error("forbidden")]
    MissingPermissions,
    #[error("bad request: {0}")]
    BadStatic(&'static str),
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("validation error: {0}")]
    Validation(#[from] validator::ValidationErrors),
    #[error("internal error: {0}")]
    Internal(String),
    #[error("internal error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("serde error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("axum error")]
    Axum(#[from] axum::Error),
    #[error("migrate error: {0}")]
    SqlxMigrate(#[from] sqlx::migrate::MigrateError),
    #[error("tracing subscriber error: {0}")]
    TracingSubscriber(#[from] tracing::subscriber::SetGlobalDefaultError),
    #[error("log format parse error: {0}")]
    LogFormatParse(#[from] tracing_subscriber::filter::ParseError),
    #[error("figment error: {0}")]
    Figment(#[from] figment::Error),
}

impl From<sqlx::Error> for Error {
    fn from(value: sqlx::Error) -> Self {
        match value {
            sqlx::Error::RowNotFound => Error::NotFound,
            err => Error::Internal(err.to_string()),
        }
    }
}

impl From<axum::http::header::ToStrError> for Error {
    fn from(_value: axum::http::header::ToStrError) -> Self {
        Error::BadHeader
    }
}

impl Error {
    fn get_status(&self) -> StatusCode {
        match self {
            Error::NotFound => StatusCode::NOT_FOUND,
            Error::BadHeader => StatusCode::BAD_REQUEST,
            Error::BadStatic(_) => StatusCode::BAD_REQUEST,
            Error::BadRequest(_) => StatusCode::BAD_REQUEST,
            Error::Validation(_) => StatusCode::BAD_REQUEST,
            Error::Serde(_) => StatusCode::BAD_REQUEST,
            Error::MissingAuth => StatusCode::UNAUTHORIZED,
            Error::UnauthSession => StatusCode::UNAUTHORIZED,
            Error::MissingPermissions => StatusCode::FORBIDDEN,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> axum::response::Response {
        error!("Response error: status {}, message {:?}", self.get_status(), self);
        (
            self.get_status(),
            Json(json!({ "error": self.to_string() })),
        )
            .into_response()
    }
}

impl From<Error> for Message {
    fn from(val: Error) -> Self {
        Message::text(
            serde_json::to_string(&MessageEnvelope {
                payload: MessagePayload::Error {
                    error: val.to_string(),
                },
            })
            .expect("error should always be able to be serialized"),
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#![allow(non_snake_case)]

use axum::extract::multipart::{MultipartError, MultipartRejection};
use axum::http::{StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::Json;

use serde::Serialize;
use serde_json::json;

pub async fn handler404(path: Uri) -> Error {
    Error::NotFound {
        message: format!("Invalid path: {}", path),
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum Maybe<T> {
    Nothing(Error),
    Fine(Success<T>),
}

pub fn Fine<V>(v: V) -> Maybe<V>
where
    V: Serialize,
{
    Maybe::Fine(Success::of(v))
}

pub fn Nothing<V>(err: Error) -> Maybe<V> {
    Maybe::Nothing(err)
}

#[derive(Debug, Clone, Serialize)]
pub struct Success<V> {
    data: V,
}

impl<T> IntoResponse for Maybe<T>
where
    T: Serialize,
{
    fn into_response(self) -> Response {
        match self {
            Maybe::Nothing(err) => err.into_response(),
            Maybe::Fine(success) => (StatusCode::OK, Json(success)).into_response(),
        }
    }
}

impl<V: Serialize> Success<V> {
    pub fn of(value: V) -> Self {
        Self { data: value }
    }
}

#[derive(Debug, Clone, Serialize, thiserror::Error)]
#[serde(tag = "error")]
pub enum Error {
    #[error("request data empty: {message}")]
    RequestDataEmpty { message: String },
    #[error("validation failed: {message}")]
    ValidateFail { message: String },
    #[error("sql error: {message}")]
    SqlError { message: String },
    #[error("{message}")]
    CustomError { message: String },
    #[error("type mismatch: {message}")]
    TypeMismatch { message: String },
    #[error("unauthorized: {message}")]
    Unauthorized { message: String },
    #[error("forbidden: {message}")]
    Forbidden { message: String },
    #[error("not found: {message}")]
    NotFound { message: String },
    #[error("{kind}: {message}")]
    InternalError { kind: &'static str, message: String },
}

impl Error {
    pub fn custom<S: Into<String>>(msg: S) -> Error {
        Error::CustomError {
            message: msg.into(),
        }
    }

    pub fn empty<S: Into<String>>(msg: S) -> Error {
        Error::RequestDataEmpty {
            message: msg.into(),
        }
    }

    pub fn invalid<S: Into<String>>(msg: S) -> Error {
        Error::ValidateFail {
            message: msg.into(),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Error::Unauthorized { .. } => StatusCode::UNAUTHORIZED,
            Error::Forbidden { .. } => StatusCode::FORBIDDEN,
            Error::NotFound { .. } => StatusCode::NOT_FOUND,
            Error::InternalError { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        (self.status(), Json(json!({ "errors": [self] }))).into_response()
    }
}

impl From<sqlx::Error> for Error {
    fn from(err: sqlx::Error) -> Self {
        log::error!("database error: {:?}", err);
        Self::SqlError {
            message: err.to_string(),
        }
    }
}

impl From<jsonwebtoken::errors::Error> for Error {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        Self::Unauthorized {
            message: err.to_string(),
        }
    }
}

impl From<pbkdf2::password_hash::Error> for Error {
    fn from(err: pbkdf2::password_hash::Error) -> Self {
        Self::InternalError {
            kind: "HashError",
            message: err.to_string(),
        }
    }
}

impl From<MultipartError> for Error {
    fn from(err: MultipartError) -> Self {
        Self::ValidateFail {
            message: err.body_text(),
        }
    }
}

impl From<MultipartRejection> for Error {
    fn from(err: MultipartRejection) -> Self {
        Self::RequestDataEmpty {
            message: err.body_text(),
        }
    }
}

impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Self::InternalError {
            kind: "Unknown",
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn errors_serialize_with_their_kind() {
        let value = serde_json::to_value(Error::custom("Invalid student ID")).unwrap();
        assert_eq!(value["error"], "CustomError");
        assert_eq!(value["message"], "Invalid student ID");
    }

    #[test]
    fn domain_errors_map_to_bad_request() {
        assert_eq!(Error::empty("x").status(), StatusCode::BAD_REQUEST);
        assert_eq!(Error::invalid("x").status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            Error::SqlError { message: "x".into() }.status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            Error::Forbidden { message: "x".into() }.status(),
            StatusCode::FORBIDDEN
        );
    }

    #[test]
    fn success_wraps_value_in_data() {
        let value = serde_json::to_value(Success::of(json!({ "status": true }))).unwrap();
        assert_eq!(value, json!({ "data": { "status": true } }));
    }
}

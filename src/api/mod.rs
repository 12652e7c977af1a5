pub mod student;
pub mod upload;

use axum::async_trait;
use axum::body::Bytes;
use axum::extract::{FromRequest, Request};
use axum::handler::Handler;
use axum::middleware::{from_fn, from_fn_with_state};
use axum::routing::{get, post};
use axum::Router;
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::auth::{authenticate, require_full_admin, require_sub_admin};
use crate::models::PageRequest;
use crate::{AppState, Error};

/// Student routes. Every route needs a bearer token; writes need a
/// sub-admin and deleting a student needs a full admin.
pub fn routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route(
            "/students",
            get(student::list_students)
                .post(student::create_student.layer(from_fn(require_sub_admin))),
        )
        .route("/students/search", get(student::search_students))
        .route(
            "/students/:id",
            get(student::get_student)
                .put(student::update_student.layer(from_fn(require_sub_admin)))
                .delete(student::delete_student.layer(from_fn(require_full_admin))),
        )
        .route(
            "/student/upload",
            post(upload::upload_photo)
                .put(upload::replace_photo)
                .delete(upload::delete_photo)
                .route_layer(from_fn(require_sub_admin)),
        )
        .route_layer(from_fn_with_state(state, authenticate))
}

/// JSON body that reports an empty or `null` body as `RequestDataEmpty` and
/// malformed JSON as `ValidateFail`.
#[derive(Debug, Clone)]
pub struct JsonBody<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for JsonBody<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = Error;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let bytes = Bytes::from_request(req, state)
            .await
            .map_err(|err| Error::invalid(err.body_text()))?;
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Err(Error::empty("Request body is empty"));
        }
        match serde_json::from_slice::<Option<T>>(&bytes) {
            Ok(Some(value)) => Ok(JsonBody(value)),
            Ok(None) => Err(Error::empty("Request body is empty")),
            Err(err) => Err(Error::invalid(err.to_string())),
        }
    }
}

/// Query string of the list and search routes. Values stay strings so that
/// garbage falls back to the defaults instead of rejecting the request.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListQuery {
    pub page: Option<String>,
    pub per_page: Option<String>,
    pub query: Option<String>,
}

impl ListQuery {
    pub fn page_request(&self) -> PageRequest {
        PageRequest::parse(self.page.as_deref(), self.per_page.as_deref())
    }
}

pub fn parse_id(raw: &str) -> Result<i64, Error> {
    raw.trim().parse::<i64>().map_err(|_| Error::TypeMismatch {
        message: "Student ID must be integer".to_string(),
    })
}

/// Student id given as a JSON number or a numeric string.
pub fn coerce_id(value: &serde_json::Value) -> Result<i64, Error> {
    match value {
        serde_json::Value::Number(n) => n.as_i64().ok_or_else(|| Error::TypeMismatch {
            message: "Student ID must be integer".to_string(),
        }),
        serde_json::Value::String(s) => parse_id(s),
        _ => Err(Error::TypeMismatch {
            message: "Student ID must be integer".to_string(),
        }),
    }
}

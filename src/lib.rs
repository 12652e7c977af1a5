pub mod api;
pub mod auth;
pub mod config;
pub mod db;
pub mod err;
pub mod models;
pub mod service;
pub mod storage;

use std::sync::Arc;

use axum::routing::post;
use axum::Router;
use serde::Serialize;
use tower_http::cors::CorsLayer;

use crate::config::Config;
use crate::service::{AddressService, StudentService, UserService};
use crate::storage::PhotoStorage;

pub use crate::err::{Error, Fine, Maybe, Nothing};

pub type Payload<T> = Result<Maybe<T>, Error>;

pub fn proceeds<V>(value: V) -> Payload<V>
where
    V: Serialize,
{
    Ok(Fine(value))
}

pub fn breaks<V>(err: Error) -> Payload<V>
where
    V: Serialize,
{
    Ok(Nothing(err))
}

pub fn bails<V, S: Into<String>>(err: S) -> Payload<V>
where
    V: Serialize,
{
    Ok(Nothing(Error::custom(err)))
}

/// Services shared by every request, built once in `main`.
#[derive(Clone)]
pub struct AppState {
    pub students: Arc<dyn StudentService>,
    pub addresses: Arc<dyn AddressService>,
    pub users: Arc<dyn UserService>,
    pub photos: Arc<dyn PhotoStorage>,
    pub config: Arc<Config>,
}

pub fn app(state: AppState) -> Router {
    Router::new()
        .merge(api::routes(state.clone()))
        .route("/login", post(auth::login))
        .fallback(err::handler404)
        .layer(CorsLayer::permissive())
        .with_state(state)
}

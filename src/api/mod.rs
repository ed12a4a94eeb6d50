use std::sync::Arc;

use poem::{
    error::NotFoundError,
    get,
    http::StatusCode,
    middleware::{CatchPanic, Tracing},
    Endpoint, EndpointExt, Response, Route,
};

use crate::{config::Config, core::Upstream};

pub mod proxy;
pub mod params;

/// Shared by every request; never mutated after startup.
pub struct AppState {
    pub config: Config,
    pub upstream: Arc<dyn Upstream>,
}

pub fn not_found() -> Response {
    Response::builder().status(StatusCode::NOT_FOUND).finish()
}

pub fn build_app(state: Arc<AppState>) -> impl Endpoint {
    Route::new()
        .at("/:tenant/*path", get(proxy::serve_image))
        .catch_error(|_: NotFoundError| async move { not_found() })
        .with(Tracing)
        .with(CatchPanic::new())
        .data(state)
}

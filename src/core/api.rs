//! # HTTP surface serving each integration's own metrics.
//!
//! ```text
//! GET /integrations/{name}/metrics
//!   ├─ no running integration `name` ─► 404 "404 page not found"
//!   ├─ handler could not be built     ─► 500 "500 Internal Server Error"
//!   └─ otherwise                      ─► cached handler serves the request
//! ```
//!
//! Handlers are resolved per request through the manager's handler cache, so a
//! restarted integration is served by a handler built for the new instance.

use std::sync::Arc;

use axum::{
    Router,
    extract::{Path, Request, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};

use super::handler_cache::Lookup;
use super::manager::Manager;

impl Manager {
    /// Returns a router exposing `/integrations/:name/metrics`.
    ///
    /// The router keeps the manager alive; merge it into the agent's server.
    pub fn router(self: &Arc<Self>) -> Router {
        Router::new()
            .route("/integrations/:name/metrics", get(integration_metrics))
            .with_state(Arc::clone(self))
    }
}

async fn integration_metrics(
    State(manager): State<Arc<Manager>>,
    Path(name): Path<String>,
    req: Request,
) -> Response {
    match manager.load_handler(&name).await {
        Lookup::Found(handler) => handler.serve(req).await,
        Lookup::NotFound => (StatusCode::NOT_FOUND, "404 page not found").into_response(),
        Lookup::Failed => {
            (StatusCode::INTERNAL_SERVER_ERROR, "500 Internal Server Error").into_response()
        }
    }
}

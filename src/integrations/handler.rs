//! # HTTP handlers serving integration metrics.
//!
//! [`MetricsHandler`] is the object-safe handler an integration hands to the
//! manager. [`RegistryHandler`] renders a [`prometheus::Registry`] in the text
//! exposition format, which covers integrations keeping their own registry.

use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    extract::Request,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use prometheus::{Encoder, Registry, TextEncoder};

/// Shared handle to a metrics handler.
pub type HandlerRef = Arc<dyn MetricsHandler>;

/// Serves one scrape request.
#[async_trait]
pub trait MetricsHandler: Send + Sync + 'static {
    /// Produces the response for `req`.
    async fn serve(&self, req: Request) -> Response;
}

/// Serves the metrics gathered from a [`Registry`].
#[derive(Clone)]
pub struct RegistryHandler {
    registry: Registry,
}

impl RegistryHandler {
    /// Creates a handler over `registry`.
    pub fn new(registry: Registry) -> Self {
        Self { registry }
    }

    /// Wraps the handler into a [`HandlerRef`].
    pub fn into_ref(self) -> HandlerRef {
        Arc::new(self)
    }

    fn render(&self) -> Result<(String, Vec<u8>), prometheus::Error> {
        let encoder = TextEncoder::new();
        let mut buf = Vec::new();
        encoder.encode(&self.registry.gather(), &mut buf)?;
        Ok((encoder.format_type().to_string(), buf))
    }
}

#[async_trait]
impl MetricsHandler for RegistryHandler {
    async fn serve(&self, _req: Request) -> Response {
        match self.render() {
            Ok((content_type, body)) => {
                ([(header::CONTENT_TYPE, content_type)], body).into_response()
            }
            Err(err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("failed to encode metrics: {err}"),
            )
                .into_response(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{Body, to_bytes};
    use prometheus::IntCounter;

    #[tokio::test]
    async fn renders_registry_in_text_format() {
        let registry = Registry::new();
        let counter = IntCounter::new("demo_events_total", "Demo events.").unwrap();
        registry.register(Box::new(counter.clone())).unwrap();
        counter.inc_by(3);

        let handler = RegistryHandler::new(registry);
        let resp = handler.serve(Request::new(Body::empty())).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let ct = resp.headers().get(header::CONTENT_TYPE).unwrap();
        assert!(ct.to_str().unwrap().starts_with("text/plain"));

        let body = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let text = String::from_utf8(body.to_vec()).unwrap();
        assert!(text.contains("demo_events_total 3"));
    }
}

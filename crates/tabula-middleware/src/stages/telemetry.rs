//! Request completion telemetry stage.
//!
//! The only post-handler stage: wraps the handler and emits one
//! structured completion event per request that reached it. Requests
//! denied earlier in the pipeline are logged by the denying stage.

use crate::context::MiddlewareContext;
use crate::middleware::{BoxFuture, Middleware, Next};
use crate::types::{Request, Response};

/// Stage logging request completion.
#[derive(Debug, Clone, Default)]
pub struct TelemetryMiddleware;

impl TelemetryMiddleware {
    /// Creates the telemetry stage.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Middleware for TelemetryMiddleware {
    fn name(&self) -> &'static str {
        "telemetry"
    }

    fn process<'a>(
        &'a self,
        ctx: &'a mut MiddlewareContext,
        request: Request,
        next: Next<'a>,
    ) -> BoxFuture<'a, Response> {
        Box::pin(async move {
            let response = next.run(ctx, request).await;

            let (method, path) = ctx
                .vars()
                .map(|vars| (vars.method.to_string(), vars.raw_path.clone()))
                .unwrap_or_default();

            tracing::info!(
                request_id = %ctx.request_id(),
                caller = %ctx.caller().log_id(),
                http.method = %method,
                http.path = %path,
                http.status_code = response.status().as_u16(),
                duration_ms = ctx.elapsed().as_millis() as u64,
                "request completed"
            );

            response
        })
    }
}

//! Request-variable resolution stage.
//!
//! The first stage of the pipeline. Everything downstream — project
//! resolution, the gate, access checks, handlers — reads the
//! [`RequestVariables`] this stage derives from the raw HTTP request:
//!
//! - HTTP method and raw path
//! - return kind (forced by `?format=`, else `Accept` negotiation)
//! - tenant (`X-Tx-Tenant` header, defaulting for single-tenant setups)
//! - debug flag (`?debug=1`, honored later only for authenticated callers)
//! - page id, resolved by walking the site hierarchy with the path

use std::sync::Arc;

use crate::context::MiddlewareContext;
use crate::middleware::{BoxFuture, Middleware, Next};
use crate::stages::{header_str, query_params};
use crate::types::{Request, Response};

use tabula_core::{RequestVariables, ReturnKind, TenantId};
use tabula_hierarchy::HierarchyStore;

/// Header carrying the tenant id across internal service boundaries.
pub const TENANT_HEADER: &str = "x-tx-tenant";

/// Stage deriving [`RequestVariables`] from the incoming request.
pub struct RequestVarsMiddleware {
    hierarchy: Arc<HierarchyStore>,
}

impl RequestVarsMiddleware {
    /// Creates the stage over the shared hierarchy.
    #[must_use]
    pub fn new(hierarchy: Arc<HierarchyStore>) -> Self {
        Self { hierarchy }
    }
}

impl Middleware for RequestVarsMiddleware {
    fn name(&self) -> &'static str {
        "request_vars"
    }

    fn process<'a>(
        &'a self,
        ctx: &'a mut MiddlewareContext,
        request: Request,
        next: Next<'a>,
    ) -> BoxFuture<'a, Response> {
        Box::pin(async move {
            let params = query_params(request.uri().query().unwrap_or(""));

            let return_kind = ReturnKind::negotiate(
                params.get("format").map(String::as_str),
                header_str(&request, "accept"),
            );

            let tenant = header_str(&request, TENANT_HEADER)
                .map(TenantId::new)
                .unwrap_or_default();

            let debug = matches!(
                params.get("debug").map(String::as_str),
                Some("1" | "true")
            );

            let path = request.uri().path().to_string();
            let page_id = self
                .hierarchy
                .load()
                .resolve_path(&path)
                .map(|page| page.id.clone());

            let mut vars = RequestVariables::new(request.method().clone(), path);
            vars.return_kind = return_kind;
            vars.tenant = tenant;
            vars.debug = debug;
            vars.page_id = page_id;
            ctx.set_vars(vars);

            next.run(ctx, request).await
        })
    }
}

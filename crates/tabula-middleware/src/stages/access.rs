//! Hierarchy access stage.
//!
//! Runs after the gate. Strips the site hierarchy for the caller's
//! permission set and enforces it: a path that resolves to no page is
//! not-found, a page missing from the stripped tree is access-denied
//! (there is no path to it for this caller — a 403, never an internal
//! error), and a mutating request additionally requires edit rights on
//! the page. The stripped tree is left in the context for handlers to
//! render navigation from.

use std::sync::Arc;

use tracing::warn;

use crate::context::MiddlewareContext;
use crate::middleware::{BoxFuture, Middleware, Next};
use crate::types::{Request, Response, ResponseExt};

use tabula_hierarchy::{HierarchyStore, SiteHierarchy};

/// The caller-specific stripped hierarchy, stored as a context extension
/// for the request's lifetime only.
#[derive(Debug, Clone)]
pub struct StrippedHierarchy(pub SiteHierarchy);

/// Stage enforcing the stripped hierarchy.
pub struct AccessMiddleware {
    hierarchy: Arc<HierarchyStore>,
}

impl AccessMiddleware {
    /// Creates the stage over the shared hierarchy.
    #[must_use]
    pub fn new(hierarchy: Arc<HierarchyStore>) -> Self {
        Self { hierarchy }
    }
}

impl Middleware for AccessMiddleware {
    fn name(&self) -> &'static str {
        "access"
    }

    fn process<'a>(
        &'a self,
        ctx: &'a mut MiddlewareContext,
        request: Request,
        next: Next<'a>,
    ) -> BoxFuture<'a, Response> {
        Box::pin(async move {
            // Debug output is an authenticated-caller privilege; drop the
            // flag for anonymous requests instead of denying them.
            let authenticated = ctx.caller().is_authenticated();
            if let Some(vars) = ctx.vars_mut() {
                if vars.debug && !authenticated {
                    vars.debug = false;
                }
            }

            let Some(vars) = ctx.vars().cloned() else {
                return Response::error(
                    http::StatusCode::INTERNAL_SERVER_ERROR,
                    "request variables missing",
                );
            };
            let kind = vars.return_kind;
            let is_mutating = vars.is_mutating();

            let full = self.hierarchy.load();
            let perms = ctx.caller().permissions();
            let stripped = full.strip(&perms);

            let Some(page_id) = vars.page_id else {
                return Response::negotiated_error(
                    kind,
                    http::StatusCode::NOT_FOUND,
                    "unknown_page",
                    "no page matches the requested path",
                );
            };

            if !stripped.contains(&page_id) {
                warn!(
                    request_id = %ctx.request_id(),
                    caller = %ctx.caller().log_id(),
                    page_id = %page_id,
                    "no path to requested page"
                );
                return Response::negotiated_error(
                    kind,
                    http::StatusCode::FORBIDDEN,
                    "access_denied",
                    "no access to the requested page",
                );
            }

            if is_mutating {
                let may_edit = full
                    .find(&page_id)
                    .is_some_and(|page| page.editable_by(&perms));
                if !may_edit {
                    return Response::negotiated_error(
                        kind,
                        http::StatusCode::FORBIDDEN,
                        "access_denied",
                        "no edit access to the requested page",
                    );
                }
            }

            ctx.set_extension(StrippedHierarchy(stripped));
            next.run(ctx, request).await
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use http::{Request as HttpRequest, Response as HttpResponse, StatusCode};
    use http_body_util::Full;

    use tabula_core::{Caller, RequestVariables, UserIdentity};
    use tabula_hierarchy::PageNode;

    fn hierarchy() -> Arc<HierarchyStore> {
        Arc::new(HierarchyStore::new(SiteHierarchy::new(vec![
            PageNode::new("home", "", "Home"),
            PageNode::new("reports", "reports", "Reports")
                .with_view_roles(&["reviewer", "admin"])
                .with_edit_roles(&["admin"]),
        ])))
    }

    fn ok_handler() -> Next<'static> {
        Next::handler(|_ctx, _req| {
            Box::pin(async {
                HttpResponse::builder()
                    .status(StatusCode::OK)
                    .body(Full::new(Bytes::new()))
                    .unwrap()
            })
        })
    }

    fn request() -> Request {
        HttpRequest::builder()
            .uri("/x")
            .body(Full::new(Bytes::new()))
            .unwrap()
    }

    fn ctx_with(method: http::Method, page_id: Option<&str>, caller: Caller) -> MiddlewareContext {
        let mut ctx = MiddlewareContext::new();
        let mut vars = RequestVariables::new(method, "/x");
        vars.page_id = page_id.map(str::to_string);
        ctx.set_vars(vars);
        ctx.set_caller(caller);
        ctx
    }

    fn reviewer() -> Caller {
        Caller::user(UserIdentity::new("u-1", vec!["reviewer".to_string()]))
    }

    #[tokio::test]
    async fn test_public_page_for_anonymous() {
        let stage = AccessMiddleware::new(hierarchy());
        let mut ctx = ctx_with(http::Method::GET, Some("home"), Caller::Anonymous);

        let response = stage.process(&mut ctx, request(), ok_handler()).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(ctx.get_extension::<StrippedHierarchy>().is_some());
    }

    #[tokio::test]
    async fn test_restricted_page_denied_for_anonymous() {
        let stage = AccessMiddleware::new(hierarchy());
        let mut ctx = ctx_with(http::Method::GET, Some("reports"), Caller::Anonymous);

        let response = stage.process(&mut ctx, request(), ok_handler()).await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_restricted_page_allowed_for_role() {
        let stage = AccessMiddleware::new(hierarchy());
        let mut ctx = ctx_with(http::Method::GET, Some("reports"), reviewer());

        let response = stage.process(&mut ctx, request(), ok_handler()).await;
        assert_eq!(response.status(), StatusCode::OK);

        let stripped = ctx.get_extension::<StrippedHierarchy>().unwrap();
        assert!(stripped.0.contains("reports"));
    }

    #[tokio::test]
    async fn test_unresolved_page_is_not_found() {
        let stage = AccessMiddleware::new(hierarchy());
        let mut ctx = ctx_with(http::Method::GET, None, Caller::Anonymous);

        let response = stage.process(&mut ctx, request(), ok_handler()).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_edit_requires_edit_role() {
        let stage = AccessMiddleware::new(hierarchy());

        // A reviewer may view but not edit.
        let mut ctx = ctx_with(http::Method::POST, Some("reports"), reviewer());
        let response = stage.process(&mut ctx, request(), ok_handler()).await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let admin = Caller::user(UserIdentity::new("u-2", vec!["admin".to_string()]));
        let mut ctx = ctx_with(http::Method::POST, Some("reports"), admin);
        let response = stage.process(&mut ctx, request(), ok_handler()).await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_debug_dropped_for_anonymous() {
        let stage = AccessMiddleware::new(hierarchy());
        let mut ctx = ctx_with(http::Method::GET, Some("home"), Caller::Anonymous);
        ctx.vars_mut().unwrap().debug = true;

        let _ = stage.process(&mut ctx, request(), ok_handler()).await;
        assert!(!ctx.vars().unwrap().debug);
    }

    #[tokio::test]
    async fn test_debug_kept_for_authenticated() {
        let stage = AccessMiddleware::new(hierarchy());
        let mut ctx = ctx_with(http::Method::GET, Some("home"), reviewer());
        ctx.vars_mut().unwrap().debug = true;

        let _ = stage.process(&mut ctx, request(), ok_handler()).await;
        assert!(ctx.vars().unwrap().debug);
    }
}

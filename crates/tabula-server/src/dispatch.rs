//! Page dispatch.
//!
//! The pipeline resolves a page id; the dispatcher maps it to a
//! registered handler. Handlers receive the frozen [`RequestContext`]
//! and return a body string in the request's negotiated representation.
//! Pages without a registered handler get the default rendering: page
//! metadata plus the caller's stripped navigation tree.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use tracing::error;

use tabula_core::{ErrorCategory, RequestContext, ReturnKind, TabulaResult};
use tabula_hierarchy::PageNode;
use tabula_middleware::{
    BoxFuture, MiddlewareContext, Request, Response, ResponseExt, StrippedHierarchy,
};

/// A page handler.
pub type PageHandler =
    Arc<dyn Fn(RequestContext) -> BoxFuture<'static, TabulaResult<String>> + Send + Sync>;

/// Maps page ids to handlers.
#[derive(Default)]
pub struct PageDispatcher {
    handlers: HashMap<String, PageHandler>,
}

impl PageDispatcher {
    /// Creates an empty dispatcher.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a handler for a page id.
    pub fn register<F, Fut>(&mut self, page_id: impl Into<String>, handler: F)
    where
        F: Fn(RequestContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = TabulaResult<String>> + Send + 'static,
    {
        let handler: PageHandler = Arc::new(move |ctx| Box::pin(handler(ctx)));
        self.handlers.insert(page_id.into(), handler);
    }

    /// Number of registered handlers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    /// True when no handlers are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Terminal pipeline handler: dispatches to the page handler for the
    /// resolved page id.
    pub fn handle(&self, ctx: &mut MiddlewareContext, _request: Request) -> BoxFuture<'static, Response> {
        let Some(request_ctx) = ctx.to_request_context() else {
            return Box::pin(async {
                Response::error(
                    http::StatusCode::INTERNAL_SERVER_ERROR,
                    "request context missing",
                )
            });
        };
        let kind = request_ctx.vars().return_kind;
        let nav = ctx.get_extension::<StrippedHierarchy>().cloned();

        let handler = request_ctx
            .vars()
            .page_id
            .as_deref()
            .and_then(|id| self.handlers.get(id))
            .cloned();

        match handler {
            Some(handler) => Box::pin(async move {
                match handler(request_ctx).await {
                    Ok(body) => Response::with_body(kind, body),
                    Err(err) => {
                        error!(error = %err, "page handler failed");
                        Response::negotiated_error(
                            kind,
                            err.status_code(),
                            category_code(err.category()),
                            err.client_message(),
                        )
                    }
                }
            }),
            None => {
                let body = default_page_body(kind, &request_ctx, nav.as_ref());
                Box::pin(async move { Response::with_body(kind, body) })
            }
        }
    }
}

const fn category_code(category: ErrorCategory) -> &'static str {
    match category {
        ErrorCategory::Validation => "validation_error",
        ErrorCategory::Authentication => "authentication_failed",
        ErrorCategory::AccessDenied => "access_denied",
        ErrorCategory::NotFound => "not_found",
        ErrorCategory::Upstream => "upstream_unavailable",
        ErrorCategory::Internal => "internal_error",
    }
}

/// Renders the default page body: page metadata plus the navigation the
/// caller is allowed to see.
fn default_page_body(
    kind: ReturnKind,
    ctx: &RequestContext,
    nav: Option<&StrippedHierarchy>,
) -> String {
    let page_id = ctx.vars().page_id.as_deref().unwrap_or("");
    let title = nav
        .and_then(|n| n.0.find(page_id))
        .map(|page| page.title.clone())
        .unwrap_or_default();
    let pages = nav.map(|n| n.0.pages()).unwrap_or(&[]);

    match kind {
        ReturnKind::Json => serde_json::json!({
            "page": {
                "id": page_id,
                "title": title,
            },
            "navigation": nav_json(pages),
        })
        .to_string(),
        ReturnKind::Xml => {
            let mut out = format!(
                "<page id=\"{}\"><title>{}</title><navigation>",
                quick_xml::escape::escape(page_id),
                quick_xml::escape::escape(title.as_str())
            );
            nav_xml(pages, &mut out);
            out.push_str("</navigation></page>");
            out
        }
    }
}

fn nav_json(pages: &[PageNode]) -> serde_json::Value {
    serde_json::Value::Array(
        pages
            .iter()
            .map(|page| {
                serde_json::json!({
                    "id": page.id,
                    "slug": page.slug,
                    "title": page.title,
                    "children": nav_json(&page.children),
                })
            })
            .collect(),
    )
}

fn nav_xml(pages: &[PageNode], out: &mut String) {
    for page in pages {
        out.push_str(&format!(
            "<item id=\"{}\" slug=\"{}\" title=\"{}\">",
            quick_xml::escape::escape(page.id.as_str()),
            quick_xml::escape::escape(page.slug.as_str()),
            quick_xml::escape::escape(page.title.as_str())
        ));
        nav_xml(&page.children, out);
        out.push_str("</item>");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use http_body_util::Full;

    use tabula_core::{Caller, RequestId, RequestVariables, TabulaError};
    use tabula_hierarchy::SiteHierarchy;

    fn request() -> Request {
        http::Request::builder()
            .uri("/x")
            .body(Full::new(Bytes::new()))
            .unwrap()
    }

    fn ctx_for_page(page_id: &str, kind: ReturnKind) -> MiddlewareContext {
        let mut ctx = MiddlewareContext::new();
        let mut vars = RequestVariables::new(http::Method::GET, "/x");
        vars.page_id = Some(page_id.to_string());
        vars.return_kind = kind;
        ctx.set_vars(vars);
        ctx.set_extension(StrippedHierarchy(SiteHierarchy::new(vec![PageNode::new(
            "home", "", "Home",
        )])));
        ctx
    }

    #[tokio::test]
    async fn test_dispatch_to_registered_handler() {
        let mut dispatcher = PageDispatcher::new();
        dispatcher.register("home", |ctx: RequestContext| async move {
            Ok(format!("hello {}", ctx.caller().log_id()))
        });

        let mut ctx = ctx_for_page("home", ReturnKind::Json);
        let response = dispatcher.handle(&mut ctx, request()).await;
        assert_eq!(response.status(), http::StatusCode::OK);
    }

    #[tokio::test]
    async fn test_handler_error_is_mapped() {
        let mut dispatcher = PageDispatcher::new();
        dispatcher.register("home", |_ctx: RequestContext| async move {
            Err(TabulaError::not_found("document missing", None))
        });

        let mut ctx = ctx_for_page("home", ReturnKind::Json);
        let response = dispatcher.handle(&mut ctx, request()).await;
        assert_eq!(response.status(), http::StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_default_rendering_for_unregistered_page() {
        let dispatcher = PageDispatcher::new();
        let mut ctx = ctx_for_page("home", ReturnKind::Xml);
        let response = dispatcher.handle(&mut ctx, request()).await;
        assert_eq!(response.status(), http::StatusCode::OK);
        assert_eq!(
            response.headers().get(http::header::CONTENT_TYPE).unwrap(),
            "application/xml; charset=utf-8"
        );
    }

    #[test]
    fn test_default_body_includes_navigation() {
        let mut vars = RequestVariables::new(http::Method::GET, "/");
        vars.page_id = Some("home".to_string());
        vars.return_kind = ReturnKind::Json;
        let ctx = RequestContext::new(RequestId::new(), Caller::Anonymous, vars, None);
        let nav = StrippedHierarchy(SiteHierarchy::new(vec![
            PageNode::new("home", "", "Home"),
            PageNode::new("about", "about", "About"),
        ]));

        let body = default_page_body(ReturnKind::Json, &ctx, Some(&nav));
        let value: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(value["page"]["title"], "Home");
        assert_eq!(value["navigation"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn test_xml_body_escapes_titles() {
        let mut vars = RequestVariables::new(http::Method::GET, "/");
        vars.page_id = Some("a".to_string());
        let ctx = RequestContext::new(RequestId::new(), Caller::Anonymous, vars, None);
        let nav = StrippedHierarchy(SiteHierarchy::new(vec![PageNode::new(
            "a",
            "a",
            "Fish & Chips",
        )]));

        let body = default_page_body(ReturnKind::Xml, &ctx, Some(&nav));
        assert!(body.contains("Fish &amp; Chips"));
    }
}

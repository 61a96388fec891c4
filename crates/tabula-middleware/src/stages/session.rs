//! Authentication gate stage.
//!
//! Per-request state machine:
//!
//! ```text
//! Unauthenticated → SessionChecked → (Authenticated | TokenValidated | Denied)
//! ```
//!
//! Internal service requests present `X-Tx-Service` (optionally with
//! `X-Tx-User` for propagated identity) and reach `TokenValidated`
//! without any session handling. Browser requests present the session
//! cookie; on non-internal, non-exempt routes the stored fingerprint must
//! match the request's environment (session fixation check) and mutating
//! requests must echo the session's CSRF token in `X-Tx-Csrf`.
//!
//! A request without credentials stays `Unauthenticated` and continues as
//! the anonymous caller — whether it may see anything is the access
//! stage's decision. Any failed check is a terminal denial: 403 in the
//! request's negotiated representation, and nothing further runs.

use std::sync::Arc;

use tracing::warn;

use crate::context::MiddlewareContext;
use crate::middleware::{BoxFuture, Middleware, Next};
use crate::session::SessionStore;
use crate::stages::{cookie_value, header_str};
use crate::types::{Request, Response, ResponseExt};

use tabula_core::{Caller, ReturnKind};

/// Session cookie name.
pub const SESSION_COOKIE: &str = "tabula_session";

/// Header carrying the CSRF token on mutating requests.
pub const CSRF_HEADER: &str = "x-tx-csrf";

/// Header identifying an internal sibling service.
pub const SERVICE_HEADER: &str = "x-tx-service";

/// Header carrying the propagated user id on internal requests.
pub const USER_HEADER: &str = "x-tx-user";

/// Gate states, in the order the machine moves through them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateState {
    /// No credentials evaluated yet (also the terminal state for
    /// credential-less requests).
    Unauthenticated,
    /// A session cookie was presented and is being validated.
    SessionChecked,
    /// A session passed all checks.
    Authenticated,
    /// An internal service token passed validation.
    TokenValidated,
    /// A check failed; the request was rejected.
    Denied,
}

/// Gate configuration.
#[derive(Debug, Clone)]
pub struct GateConfig {
    /// Path prefixes exempt from fixation and CSRF checks.
    pub exempt_paths: Vec<String>,
    /// Service ids accepted in the `X-Tx-Service` header.
    pub trusted_services: Vec<String>,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            exempt_paths: vec!["/health".to_string(), "/login".to_string()],
            trusted_services: Vec::new(),
        }
    }
}

impl GateConfig {
    /// True when the path is exempt from fixation and CSRF checks.
    #[must_use]
    pub fn is_exempt(&self, path: &str) -> bool {
        self.exempt_paths.iter().any(|p| path.starts_with(p.as_str()))
    }
}

/// The authentication gate.
pub struct SessionMiddleware {
    store: Arc<SessionStore>,
    config: GateConfig,
}

impl SessionMiddleware {
    /// Creates the gate over the shared session store.
    #[must_use]
    pub fn new(store: Arc<SessionStore>, config: GateConfig) -> Self {
        Self { store, config }
    }

    fn deny(ctx: &mut MiddlewareContext, kind: ReturnKind, message: &str) -> Response {
        ctx.set_extension(GateState::Denied);
        warn!(request_id = %ctx.request_id(), reason = message, "gate denied request");
        Response::negotiated_error(
            kind,
            http::StatusCode::FORBIDDEN,
            "access_denied",
            message,
        )
    }
}

impl Middleware for SessionMiddleware {
    fn name(&self) -> &'static str {
        "session"
    }

    fn process<'a>(
        &'a self,
        ctx: &'a mut MiddlewareContext,
        request: Request,
        next: Next<'a>,
    ) -> BoxFuture<'a, Response> {
        Box::pin(async move {
            let Some(vars) = ctx.vars().cloned() else {
                return Response::error(
                    http::StatusCode::INTERNAL_SERVER_ERROR,
                    "request variables missing",
                );
            };
            let kind = vars.return_kind;

            // Internal service traffic: token validation, no session
            // handling at all.
            if let Some(service_id) = header_str(&request, SERVICE_HEADER) {
                if !self.config.trusted_services.iter().any(|s| s == service_id) {
                    return Self::deny(ctx, kind, "unknown internal service");
                }
                let on_behalf_of = header_str(&request, USER_HEADER).map(str::to_string);
                ctx.set_caller(Caller::service(service_id, on_behalf_of));
                ctx.set_extension(GateState::TokenValidated);
                return next.run(ctx, request).await;
            }

            let Some(session_id) = cookie_value(&request, SESSION_COOKIE) else {
                // No credentials: the access stage decides what an
                // anonymous caller may see.
                ctx.set_extension(GateState::Unauthenticated);
                return next.run(ctx, request).await;
            };

            ctx.set_extension(GateState::SessionChecked);
            let Some(record) = self.store.restore(&session_id) else {
                return Self::deny(ctx, kind, "invalid or expired session");
            };

            if !self.config.is_exempt(&vars.raw_path) {
                let user_agent = header_str(&request, "user-agent").unwrap_or("");
                let expected = self.store.fingerprint(user_agent, &vars.tenant);
                if expected != record.fingerprint {
                    return Self::deny(ctx, kind, "session fingerprint mismatch");
                }

                if vars.is_mutating()
                    && header_str(&request, CSRF_HEADER) != Some(record.csrf_token.as_str())
                {
                    return Self::deny(ctx, kind, "missing or invalid CSRF token");
                }
            }

            ctx.set_caller(Caller::user(record.user));
            ctx.set_extension(GateState::Authenticated);
            next.run(ctx, request).await
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use bytes::Bytes;
    use http::{Request as HttpRequest, Response as HttpResponse, StatusCode};
    use http_body_util::Full;

    use tabula_core::{RequestVariables, TenantId, UserIdentity};

    fn store() -> Arc<SessionStore> {
        Arc::new(SessionStore::new("test-secret", Duration::from_secs(60)))
    }

    fn gate(store: Arc<SessionStore>) -> SessionMiddleware {
        SessionMiddleware::new(
            store,
            GateConfig {
                exempt_paths: vec!["/login".to_string()],
                trusted_services: vec!["svc-pdf".to_string()],
            },
        )
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

    fn ctx_for(method: http::Method, path: &str) -> MiddlewareContext {
        let mut ctx = MiddlewareContext::new();
        ctx.set_vars(RequestVariables::new(method, path));
        ctx
    }

    fn login(store: &SessionStore) -> crate::session::SessionRecord {
        store.create(
            UserIdentity::new("u-1", vec!["editor".to_string()]),
            "Mozilla/5.0",
            &TenantId::default(),
        )
    }

    #[tokio::test]
    async fn test_no_credentials_stays_anonymous() {
        let gate = gate(store());
        let mut ctx = ctx_for(http::Method::GET, "/reports");
        let request = HttpRequest::builder()
            .uri("/reports")
            .body(Full::new(Bytes::new()))
            .unwrap();

        let response = gate.process(&mut ctx, request, ok_handler()).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(matches!(ctx.caller(), Caller::Anonymous));
        assert_eq!(
            ctx.get_extension::<GateState>(),
            Some(&GateState::Unauthenticated)
        );
    }

    #[tokio::test]
    async fn test_valid_session_authenticates() {
        let store = store();
        let record = login(&store);
        let gate = gate(store);

        let mut ctx = ctx_for(http::Method::GET, "/reports");
        let request = HttpRequest::builder()
            .uri("/reports")
            .header("cookie", format!("{SESSION_COOKIE}={}", record.session_id))
            .header("user-agent", "Mozilla/5.0")
            .body(Full::new(Bytes::new()))
            .unwrap();

        let response = gate.process(&mut ctx, request, ok_handler()).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(ctx.caller().log_id(), "user:u-1");
        assert_eq!(
            ctx.get_extension::<GateState>(),
            Some(&GateState::Authenticated)
        );
    }

    #[tokio::test]
    async fn test_unknown_session_denied() {
        let gate = gate(store());
        let mut ctx = ctx_for(http::Method::GET, "/reports");
        let request = HttpRequest::builder()
            .uri("/reports")
            .header("cookie", format!("{SESSION_COOKIE}=forged"))
            .body(Full::new(Bytes::new()))
            .unwrap();

        let response = gate.process(&mut ctx, request, ok_handler()).await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert_eq!(ctx.get_extension::<GateState>(), Some(&GateState::Denied));
    }

    #[tokio::test]
    async fn test_fingerprint_mismatch_denied() {
        let store = store();
        let record = login(&store);
        let gate = gate(store);

        let mut ctx = ctx_for(http::Method::GET, "/reports");
        // Same session id, different user agent: a fixated session.
        let request = HttpRequest::builder()
            .uri("/reports")
            .header("cookie", format!("{SESSION_COOKIE}={}", record.session_id))
            .header("user-agent", "curl/8.0")
            .body(Full::new(Bytes::new()))
            .unwrap();

        let response = gate.process(&mut ctx, request, ok_handler()).await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_mutating_request_requires_csrf_token() {
        let store = store();
        let record = login(&store);
        let gate = gate(store.clone());

        let mut ctx = ctx_for(http::Method::POST, "/reports");
        let request = HttpRequest::builder()
            .method(http::Method::POST)
            .uri("/reports")
            .header("cookie", format!("{SESSION_COOKIE}={}", record.session_id))
            .header("user-agent", "Mozilla/5.0")
            .body(Full::new(Bytes::new()))
            .unwrap();

        let response = gate.process(&mut ctx, request, ok_handler()).await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        // With the token echoed, the same request passes.
        let mut ctx = ctx_for(http::Method::POST, "/reports");
        let request = HttpRequest::builder()
            .method(http::Method::POST)
            .uri("/reports")
            .header("cookie", format!("{SESSION_COOKIE}={}", record.session_id))
            .header("user-agent", "Mozilla/5.0")
            .header(CSRF_HEADER, record.csrf_token.clone())
            .body(Full::new(Bytes::new()))
            .unwrap();

        let response = gate.process(&mut ctx, request, ok_handler()).await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_exempt_path_skips_checks() {
        let store = store();
        let record = login(&store);
        let gate = gate(store);

        let mut ctx = ctx_for(http::Method::POST, "/login");
        // Wrong user agent and no CSRF token, but the path is exempt.
        let request = HttpRequest::builder()
            .method(http::Method::POST)
            .uri("/login")
            .header("cookie", format!("{SESSION_COOKIE}={}", record.session_id))
            .header("user-agent", "curl/8.0")
            .body(Full::new(Bytes::new()))
            .unwrap();

        let response = gate.process(&mut ctx, request, ok_handler()).await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_trusted_service_token() {
        let gate = gate(store());
        let mut ctx = ctx_for(http::Method::POST, "/reports");
        let request = HttpRequest::builder()
            .method(http::Method::POST)
            .uri("/reports")
            .header(SERVICE_HEADER, "svc-pdf")
            .header(USER_HEADER, "u-42")
            .body(Full::new(Bytes::new()))
            .unwrap();

        let response = gate.process(&mut ctx, request, ok_handler()).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(ctx.caller().log_id(), "service:svc-pdf");
        assert_eq!(
            ctx.get_extension::<GateState>(),
            Some(&GateState::TokenValidated)
        );
    }

    #[tokio::test]
    async fn test_unknown_service_denied() {
        let gate = gate(store());
        let mut ctx = ctx_for(http::Method::GET, "/reports");
        let request = HttpRequest::builder()
            .uri("/reports")
            .header(SERVICE_HEADER, "svc-rogue")
            .body(Full::new(Bytes::new()))
            .unwrap();

        let response = gate.process(&mut ctx, request, ok_handler()).await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn test_exempt_prefix_matching() {
        let config = GateConfig::default();
        assert!(config.is_exempt("/health"));
        assert!(config.is_exempt("/login/callback"));
        assert!(!config.is_exempt("/reports"));
    }
}

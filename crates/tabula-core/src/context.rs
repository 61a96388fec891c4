//! Per-request resolved state.
//!
//! Two records are derived while a request moves through the pipeline:
//!
//! - [`RequestVariables`] — derived first, straight from the HTTP request:
//!   method, negotiated return kind, path, tenant, debug flag, and the page
//!   id resolved against the site hierarchy.
//! - [`ProjectVariables`] — derived second, from request parameters plus
//!   the configuration tree: project/version/editor/report identifiers,
//!   the output channel, and computed path fragments.
//!
//! Both are request-scoped: created once, read by downstream stages and the
//! handler, dropped when the response is written. [`RequestContext`] is the
//! immutable snapshot handed to page handlers.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::identity::Caller;

/// Unique identifier for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequestId(Uuid);

impl RequestId {
    /// Generates a new unique request ID (UUID v7, time-ordered).
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Returns the underlying UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Tenant identifier.
///
/// Derived per request from the `X-Tx-Tenant` header or the host name;
/// defaults to `"default"` for single-tenant deployments.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TenantId(String);

impl TenantId {
    /// Creates a tenant id.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The tenant id string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for TenantId {
    fn default() -> Self {
        Self("default".to_string())
    }
}

impl fmt::Display for TenantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The response representation requested by the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReturnKind {
    /// `application/xml` response bodies.
    Xml,
    /// `application/json` response bodies.
    Json,
}

impl ReturnKind {
    /// The `Content-Type` header value for this kind.
    #[must_use]
    pub const fn content_type(self) -> &'static str {
        match self {
            Self::Xml => "application/xml; charset=utf-8",
            Self::Json => "application/json",
        }
    }

    /// Negotiates the return kind from a forced `?format=` parameter and
    /// the `Accept` header.
    ///
    /// The query parameter wins over content negotiation; unknown values
    /// fall through to the `Accept` header; the platform default is XML.
    #[must_use]
    pub fn negotiate(format_param: Option<&str>, accept: Option<&str>) -> Self {
        match format_param.map(str::to_ascii_lowercase).as_deref() {
            Some("json") => return Self::Json,
            Some("xml") => return Self::Xml,
            _ => {}
        }
        match accept {
            Some(a) if a.contains("application/json") => Self::Json,
            _ => Self::Xml,
        }
    }
}

/// Per-request variables derived from the incoming HTTP request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestVariables {
    /// The HTTP method.
    pub method: http::Method,
    /// Negotiated or forced response representation.
    pub return_kind: ReturnKind,
    /// The raw URL path as received.
    pub raw_path: String,
    /// Page id resolved from the path against the site hierarchy, if any.
    pub page_id: Option<String>,
    /// Tenant the request belongs to.
    pub tenant: TenantId,
    /// Whether debug output was requested (honored for authenticated
    /// callers only).
    pub debug: bool,
}

impl RequestVariables {
    /// Creates request variables with defaults for the optional fields.
    #[must_use]
    pub fn new(method: http::Method, raw_path: impl Into<String>) -> Self {
        Self {
            method,
            return_kind: ReturnKind::Xml,
            raw_path: raw_path.into(),
            page_id: None,
            tenant: TenantId::default(),
            debug: false,
        }
    }

    /// True for methods that can change state (everything but GET/HEAD).
    #[must_use]
    pub fn is_mutating(&self) -> bool {
        !matches!(self.method, http::Method::GET | http::Method::HEAD)
    }
}

/// Output channel selection for rendered documents.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputChannel {
    /// Channel kind (e.g. `web`, `print`).
    pub kind: String,
    /// Channel variant, if the kind has more than one.
    pub variant: Option<String>,
    /// Output language code.
    pub language: Option<String>,
}

/// Computed filesystem path fragments for a project/version pair.
///
/// These are derived once per (tenant, project, version) and cached
/// process-wide; the strings are cheap to clone into each request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectPaths {
    /// Project root fragment, `{tenant}/{project}/{version}`.
    pub root: String,
    /// Content subtree fragment.
    pub content: String,
    /// Asset subtree fragment.
    pub assets: String,
}

impl ProjectPaths {
    /// Derives the canonical fragments for a project/version under a tenant.
    #[must_use]
    pub fn derive(tenant: &TenantId, project_id: &str, version_id: &str) -> Self {
        let root = format!("{tenant}/{project_id}/{version_id}");
        Self {
            content: format!("{root}/content"),
            assets: format!("{root}/assets"),
            root,
        }
    }
}

/// Per-request project context resolved from parameters and configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectVariables {
    /// Project identifier.
    pub project_id: String,
    /// Version identifier within the project.
    pub version_id: String,
    /// Editor registered for the project, from configuration.
    pub editor_id: Option<String>,
    /// Report type requested, if any.
    pub report_type: Option<String>,
    /// Output channel selection.
    pub channel: OutputChannel,
    /// Computed path fragments.
    pub paths: ProjectPaths,
}

impl ProjectVariables {
    /// Creates project variables for a project/version pair.
    #[must_use]
    pub fn new(
        tenant: &TenantId,
        project_id: impl Into<String>,
        version_id: impl Into<String>,
    ) -> Self {
        let project_id = project_id.into();
        let version_id = version_id.into();
        let paths = ProjectPaths::derive(tenant, &project_id, &version_id);
        Self {
            project_id,
            version_id,
            editor_id: None,
            report_type: None,
            channel: OutputChannel::default(),
            paths,
        }
    }
}

/// Immutable per-request snapshot handed to page handlers.
///
/// Built by the pipeline after all pre-handler stages have run.
#[derive(Debug, Clone)]
pub struct RequestContext {
    request_id: RequestId,
    caller: Caller,
    vars: RequestVariables,
    project: Option<ProjectVariables>,
}

impl RequestContext {
    /// Creates a context from its parts.
    #[must_use]
    pub fn new(
        request_id: RequestId,
        caller: Caller,
        vars: RequestVariables,
        project: Option<ProjectVariables>,
    ) -> Self {
        Self {
            request_id,
            caller,
            vars,
            project,
        }
    }

    /// The request ID.
    #[must_use]
    pub const fn request_id(&self) -> RequestId {
        self.request_id
    }

    /// The authenticated caller.
    #[must_use]
    pub const fn caller(&self) -> &Caller {
        &self.caller
    }

    /// The resolved request variables.
    #[must_use]
    pub const fn vars(&self) -> &RequestVariables {
        &self.vars
    }

    /// The resolved project variables, when the route carries them.
    #[must_use]
    pub const fn project(&self) -> Option<&ProjectVariables> {
        self.project.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_id_unique() {
        assert_ne!(RequestId::new(), RequestId::new());
    }

    #[test]
    fn test_negotiate_format_param_wins() {
        let kind = ReturnKind::negotiate(Some("json"), Some("application/xml"));
        assert_eq!(kind, ReturnKind::Json);
        let kind = ReturnKind::negotiate(Some("xml"), Some("application/json"));
        assert_eq!(kind, ReturnKind::Xml);
    }

    #[test]
    fn test_negotiate_accept_header() {
        let kind = ReturnKind::negotiate(None, Some("application/json"));
        assert_eq!(kind, ReturnKind::Json);
    }

    #[test]
    fn test_negotiate_defaults_to_xml() {
        assert_eq!(ReturnKind::negotiate(None, None), ReturnKind::Xml);
        assert_eq!(
            ReturnKind::negotiate(Some("yaml"), Some("text/html")),
            ReturnKind::Xml
        );
    }

    #[test]
    fn test_mutating_methods() {
        let get = RequestVariables::new(http::Method::GET, "/p");
        assert!(!get.is_mutating());
        let post = RequestVariables::new(http::Method::POST, "/p");
        assert!(post.is_mutating());
        let head = RequestVariables::new(http::Method::HEAD, "/p");
        assert!(!head.is_mutating());
    }

    #[test]
    fn test_project_paths_derivation() {
        let tenant = TenantId::new("acme");
        let paths = ProjectPaths::derive(&tenant, "handbook", "v3");
        assert_eq!(paths.root, "acme/handbook/v3");
        assert_eq!(paths.content, "acme/handbook/v3/content");
        assert_eq!(paths.assets, "acme/handbook/v3/assets");
    }

    #[test]
    fn test_project_variables_default_channel() {
        let vars = ProjectVariables::new(&TenantId::default(), "p1", "v1");
        assert_eq!(vars.channel, OutputChannel::default());
        assert_eq!(vars.paths.root, "default/p1/v1");
        assert!(vars.editor_id.is_none());
    }

    #[test]
    fn test_request_context_accessors() {
        let vars = RequestVariables::new(http::Method::GET, "/handbook");
        let ctx = RequestContext::new(RequestId::new(), Caller::Anonymous, vars, None);
        assert_eq!(ctx.vars().raw_path, "/handbook");
        assert!(ctx.project().is_none());
        assert!(!ctx.caller().is_authenticated());
    }
}

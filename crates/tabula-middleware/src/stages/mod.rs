//! Pipeline stages.
//!
//! Stages are listed here in their fixed execution order; see
//! [`crate::pipeline`] for the order contract.

mod access;
mod project;
mod request_vars;
mod session;
mod telemetry;

pub use access::{AccessMiddleware, StrippedHierarchy};
pub use project::ProjectMiddleware;
pub use request_vars::{RequestVarsMiddleware, TENANT_HEADER};
pub use session::{
    GateConfig, GateState, SessionMiddleware, CSRF_HEADER, SERVICE_HEADER, SESSION_COOKIE,
    USER_HEADER,
};
pub use telemetry::TelemetryMiddleware;

use std::collections::HashMap;

use crate::types::Request;

/// Parses a query string into a key/value map.
///
/// Later occurrences of a key override earlier ones, matching how the
/// platform's handlers read parameters.
pub(crate) fn query_params(query: &str) -> HashMap<String, String> {
    query
        .split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| match pair.split_once('=') {
            Some((k, v)) => (k.to_string(), v.to_string()),
            None => (pair.to_string(), String::new()),
        })
        .collect()
}

/// Returns a header value as a string slice, when present and valid UTF-8.
pub(crate) fn header_str<'a>(request: &'a Request, name: &str) -> Option<&'a str> {
    request.headers().get(name)?.to_str().ok()
}

/// Extracts a cookie value from the `Cookie` header.
pub(crate) fn cookie_value(request: &Request, name: &str) -> Option<String> {
    let cookies = header_str(request, "cookie")?;
    cookies.split(';').find_map(|pair| {
        let (key, value) = pair.trim().split_once('=')?;
        (key == name).then(|| value.to_string())
    })
}

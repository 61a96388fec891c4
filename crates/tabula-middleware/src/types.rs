//! Common types used throughout the request pipeline.

use bytes::Bytes;
use http_body_util::Full;

use tabula_core::ReturnKind;

/// The HTTP request type used in the pipeline.
pub type Request = http::Request<Full<Bytes>>;

/// The HTTP response type used in the pipeline.
pub type Response = http::Response<Full<Bytes>>;

/// Extension trait for building responses.
pub trait ResponseExt {
    /// Creates a plain-text error response.
    fn error(status: http::StatusCode, message: &str) -> Response;

    /// Creates an error response in the request's negotiated
    /// representation (XML or JSON).
    fn negotiated_error(
        kind: ReturnKind,
        status: http::StatusCode,
        code: &str,
        message: &str,
    ) -> Response;

    /// Creates a success response with the given body and content type.
    fn with_body(kind: ReturnKind, body: String) -> Response;
}

impl ResponseExt for Response {
    fn error(status: http::StatusCode, message: &str) -> Response {
        http::Response::builder()
            .status(status)
            .header(http::header::CONTENT_TYPE, "text/plain; charset=utf-8")
            .body(Full::new(Bytes::from(message.to_string())))
            .expect("failed to build error response")
    }

    fn negotiated_error(
        kind: ReturnKind,
        status: http::StatusCode,
        code: &str,
        message: &str,
    ) -> Response {
        let body = match kind {
            ReturnKind::Json => serde_json::json!({
                "error": {
                    "code": code,
                    "message": message
                }
            })
            .to_string(),
            ReturnKind::Xml => format!(
                "<error code=\"{}\"><message>{}</message></error>",
                quick_xml::escape::escape(code),
                quick_xml::escape::escape(message)
            ),
        };

        http::Response::builder()
            .status(status)
            .header(http::header::CONTENT_TYPE, kind.content_type())
            .body(Full::new(Bytes::from(body)))
            .expect("failed to build error response")
    }

    fn with_body(kind: ReturnKind, body: String) -> Response {
        http::Response::builder()
            .status(http::StatusCode::OK)
            .header(http::header::CONTENT_TYPE, kind.content_type())
            .body(Full::new(Bytes::from(body)))
            .expect("failed to build response")
    }
}

//! Error types for XMS API calls.
//!
//! Every call ends in exactly one of four failure kinds, or succeeds:
//!
//! * [`Error::Interrupted`] - the wait ended before the call produced an outcome,
//! * [`Error::Execution`] - the call machinery itself failed (transport, panics, ...),
//! * [`Error::Api`] - the server rejected the request with a structured `{code, text}` body,
//! * [`Error::UnexpectedResponse`] - anything else, with the raw response preserved.
//!
//! The blocking and the asynchronous call forms report failures through this same type.

use std::borrow::Cow;
use std::fmt;

use http::{HeaderMap, StatusCode};
use serde::{Deserialize, Serialize};

use crate::retry_hint::RetryHint;

/// The main error type for XMS API calls.
///
/// # Examples
///
/// ```no_run
/// use xms::{Client, Error};
///
/// # async fn example(client: Client) {
/// match client.fetch_tags(&"batch-1".into()).await {
///     Ok(tags) => println!("tags: {:?}", tags.tags),
///     Err(Error::Api(error)) => eprintln!("rejected: {} ({})", error.text, error.code),
///     Err(Error::UnexpectedResponse(response)) => {
///         eprintln!("HTTP {}: {}", response.status, response.body_text());
///     }
///     Err(e) => eprintln!("call failed: {}", e),
/// }
/// # }
/// ```
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// The call was cancelled, or the reactor running it shut down, before it
    /// produced an outcome.
    ///
    /// The caller may issue the call again or give up; nothing was swallowed.
    #[error("call interrupted before completion")]
    Interrupted,

    /// The asynchronous machinery failed in a way that is not a classified HTTP outcome.
    #[error("execution fault: {0}")]
    Execution(#[from] ExecutionFault),

    /// The server rejected the request with a structured error body.
    #[error("API error {}: {}", .0.code, .0.text)]
    Api(ApiError),

    /// The server answered with something the client does not model.
    ///
    /// The full raw response is kept for diagnosis.
    #[error("{0}")]
    UnexpectedResponse(Box<UnexpectedResponse>),

    /// Invalid client configuration was provided.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// An invalid endpoint URL was provided.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

impl Error {
    /// Returns the HTTP status code of an unexpected response or failed transfer.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Error::UnexpectedResponse(response) => Some(response.status),
            Error::Execution(ExecutionFault::Transport(e)) => e.status(),
            _ => None,
        }
    }

    /// Returns the raw response body preserved by an unexpected response.
    pub fn raw_body(&self) -> Option<&[u8]> {
        match self {
            Error::UnexpectedResponse(response) => Some(&response.body),
            _ => None,
        }
    }

    /// Returns the structured error if the server rejected the request.
    pub fn api_error(&self) -> Option<&ApiError> {
        match self {
            Error::Api(error) => Some(error),
            _ => None,
        }
    }

    /// Returns `true` if the call was cut short before producing an outcome.
    pub fn is_interrupted(&self) -> bool {
        matches!(self, Error::Interrupted)
    }

    pub(crate) fn unexpected(response: UnexpectedResponse) -> Self {
        Error::UnexpectedResponse(Box::new(response))
    }
}

/// Faults of the call machinery that are not HTTP outcomes.
#[derive(thiserror::Error, Debug)]
pub enum ExecutionFault {
    /// The transport failed (connection refused, DNS, TLS, timeout, broken body stream).
    #[error("transport failure: {0}")]
    Transport(#[from] reqwest::Error),

    /// A request body could not be serialized to JSON.
    #[error("request serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The task driving the call panicked.
    #[error("call task panicked: {0}")]
    Panicked(String),

    /// The client was closed before the call was dispatched.
    #[error("client is closed")]
    Closed,

    /// The result of the call was already taken from its handle.
    #[error("call result already taken")]
    ResultTaken,

    /// An internal invariant of the call pipeline was violated.
    #[error("internal error: {0}")]
    Internal(&'static str),
}

/// A structured error returned by the server for rejected requests
/// (status 400 or 403).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiError {
    /// Machine readable error code, e.g. `syntax_invalid_parameter_format`.
    pub code: String,
    /// Human readable description.
    pub text: String,
}

impl ApiError {
    /// Creates a new `ApiError`.
    pub fn new(code: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            text: text.into(),
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.text)
    }
}

/// An HTTP response the client did not recognize as success or as a modeled error.
///
/// Produced for unrecognized status codes, and for recognized status codes
/// whose body could not be decoded (see [`UnexpectedResponse::is_decode_failure`]).
/// The body is kept byte-for-byte as received.
#[derive(Debug, Clone)]
pub struct UnexpectedResponse {
    /// The HTTP status code.
    pub status: StatusCode,
    /// The response headers.
    pub headers: HeaderMap,
    /// The `Content-Type` of the response, if present.
    pub content_type: Option<String>,
    /// The raw response body.
    pub body: Vec<u8>,
    /// Why the body could not be decoded, if decoding was attempted and failed.
    pub decode_error: Option<String>,
}

impl UnexpectedResponse {
    /// Returns `true` if the status was recognized but its body failed to decode.
    pub fn is_decode_failure(&self) -> bool {
        self.decode_error.is_some()
    }

    /// The body as text, with invalid UTF-8 replaced.
    pub fn body_text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }

    /// Server pacing hints (`Retry-After` and friends) carried by the response.
    ///
    /// The client never retries on its own; this is for callers that do.
    pub fn retry_hint(&self) -> RetryHint {
        RetryHint::from_headers(&self.headers)
    }
}

impl fmt::Display for UnexpectedResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.decode_error {
            Some(reason) => write!(
                f,
                "undecodable response (status {}): {}: {}",
                self.status,
                reason,
                self.body_text()
            ),
            None => write!(
                f,
                "unexpected response (status {}): {}",
                self.status,
                self.body_text()
            ),
        }
    }
}

/// A specialized `Result` type for XMS API calls.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    fn unexpected(status: u16, body: &str, decode_error: Option<&str>) -> UnexpectedResponse {
        UnexpectedResponse {
            status: StatusCode::from_u16(status).unwrap(),
            headers: HeaderMap::new(),
            content_type: Some("text/plain".to_string()),
            body: body.as_bytes().to_vec(),
            decode_error: decode_error.map(str::to_string),
        }
    }

    #[test]
    fn accessors_expose_unexpected_response() {
        let err = Error::unexpected(unexpected(500, "oops", None));

        assert_eq!(err.status(), Some(StatusCode::INTERNAL_SERVER_ERROR));
        assert_eq!(err.raw_body(), Some(&b"oops"[..]));
        assert!(err.api_error().is_none());
        assert!(!err.is_interrupted());
    }

    #[test]
    fn api_error_display_keeps_code_and_text() {
        let err = Error::Api(ApiError::new("bad_param", "from missing"));

        assert_eq!(err.to_string(), "API error bad_param: from missing");
        assert_eq!(err.api_error().unwrap().code, "bad_param");
        assert_eq!(err.status(), None);
    }

    #[test]
    fn decode_failure_is_distinguishable() {
        let plain = unexpected(500, "oops", None);
        let undecodable = unexpected(200, "{", Some("EOF while parsing"));

        assert!(!plain.is_decode_failure());
        assert!(undecodable.is_decode_failure());
        assert!(undecodable.to_string().contains("undecodable"));
    }

    #[test]
    fn api_error_deserializes_from_wire_shape() {
        let error: ApiError =
            serde_json::from_str(r#"{"code":"bad_param","text":"from missing"}"#).unwrap();
        assert_eq!(error, ApiError::new("bad_param", "from missing"));
    }
}

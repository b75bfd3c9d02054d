//! Classification of a completed HTTP response into success, modeled error or
//! unexpected response.
//!
//! A [`Classifier`] is parameterized at the call site by a [`Decode`]
//! implementation for the exact expected success type, so no runtime casts
//! are involved in turning bytes into a typed value.

use std::marker::PhantomData;

use http::{header, HeaderMap, StatusCode};
use serde::de::DeserializeOwned;

use crate::error::{ApiError, Error, Result, UnexpectedResponse};

/// Status codes whose body is decoded as an [`ApiError`].
pub const MODELED_ERROR_CODES: &[StatusCode] = &[StatusCode::BAD_REQUEST, StatusCode::FORBIDDEN];

/// Success codes accepted by most calls.
pub const DEFAULT_SUCCESS_CODES: &[StatusCode] = &[StatusCode::OK, StatusCode::CREATED];

/// Success codes for calls that only accept `200 OK`, such as deletes.
pub const OK_ONLY: &[StatusCode] = &[StatusCode::OK];

/// Turns a success body into the expected value.
///
/// Implementations run on the reactor threads and must be fast; decoding a
/// small JSON document is fine.
pub trait Decode: Send + Sync + 'static {
    /// The decoded success value.
    type Output: Send + 'static;

    /// Decodes `body`, which arrived with a success status.
    fn decode(&self, body: &[u8]) -> serde_json::Result<Self::Output>;
}

/// Decodes a JSON body as `T`.
pub struct Json<T>(PhantomData<fn() -> T>);

impl<T> Json<T> {
    /// Creates a decoder for `T`.
    pub fn new() -> Self {
        Json(PhantomData)
    }
}

impl<T> Default for Json<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Decode for Json<T>
where
    T: DeserializeOwned + Send + 'static,
{
    type Output = T;

    fn decode(&self, body: &[u8]) -> serde_json::Result<T> {
        serde_json::from_slice(body)
    }
}

/// Accepts a success response that is expected to carry no content.
///
/// A non-empty body is logged as a protocol anomaly but still counts as success.
#[derive(Debug, Clone, Copy, Default)]
pub struct Empty;

impl Decode for Empty {
    type Output = ();

    fn decode(&self, body: &[u8]) -> serde_json::Result<()> {
        if !body.is_empty() {
            tracing::warn!(
                body = %String::from_utf8_lossy(body),
                "Expected empty body"
            );
        }
        Ok(())
    }
}

/// Interprets a status code and body as success, modeled error, or unexpected response.
pub struct Classifier<D> {
    decoder: D,
    success_codes: &'static [StatusCode],
}

impl<D: Decode> Classifier<D> {
    /// Creates a classifier accepting [`DEFAULT_SUCCESS_CODES`].
    pub fn new(decoder: D) -> Self {
        Self {
            decoder,
            success_codes: DEFAULT_SUCCESS_CODES,
        }
    }

    /// Replaces the accepted success codes.
    pub fn success_codes(mut self, codes: &'static [StatusCode]) -> Self {
        self.success_codes = codes;
        self
    }

    /// Classifies a fully received response.
    ///
    /// * success code: decode with `D`; a decoding failure yields an
    ///   [`UnexpectedResponse`] with `decode_error` set,
    /// * 400 or 403: decode an [`ApiError`] and fail with [`Error::Api`]; a body
    ///   that is not `{code, text}` yields an [`UnexpectedResponse`] with `decode_error` set,
    /// * anything else: [`Error::UnexpectedResponse`] carrying the untouched body.
    pub fn classify(&self, status: StatusCode, headers: HeaderMap, body: Vec<u8>) -> Result<D::Output> {
        if self.success_codes.contains(&status) {
            return match self.decoder.decode(&body) {
                Ok(value) => Ok(value),
                Err(e) => {
                    tracing::error!(
                        status = status.as_u16(),
                        error = %e,
                        body = %String::from_utf8_lossy(&body),
                        "Failed to decode success response"
                    );
                    Err(unexpected(status, headers, body, Some(e.to_string())))
                }
            };
        }

        if MODELED_ERROR_CODES.contains(&status) {
            return match serde_json::from_slice::<ApiError>(&body) {
                Ok(error) => {
                    tracing::error!(
                        status = status.as_u16(),
                        code = %error.code,
                        text = %error.text,
                        "Request rejected by server"
                    );
                    Err(Error::Api(error))
                }
                Err(e) => Err(unexpected(status, headers, body, Some(e.to_string()))),
            };
        }

        tracing::warn!(
            status = status.as_u16(),
            body = %String::from_utf8_lossy(&body),
            "Unexpected response"
        );
        Err(unexpected(status, headers, body, None))
    }
}

fn unexpected(
    status: StatusCode,
    headers: HeaderMap,
    body: Vec<u8>,
    decode_error: Option<String>,
) -> Error {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    Error::unexpected(UnexpectedResponse {
        status,
        headers,
        content_type,
        body,
        decode_error,
    })
}

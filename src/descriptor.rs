//! Request descriptors.

use http::Method;
use url::Url;

/// Everything needed to issue one call: method, fully qualified target and an
/// optional JSON body.
///
/// Descriptors are immutable once built and consumed by a single dispatch.
///
/// # Examples
///
/// ```
/// use http::Method;
/// use url::Url;
/// use xms::RequestDescriptor;
///
/// let url = Url::parse("https://api.mblox.com/xms/v1/jdoe/batches").unwrap();
/// let descriptor = RequestDescriptor::new(Method::POST, url).with_json_body(b"{}".to_vec());
///
/// assert_eq!(descriptor.method(), &Method::POST);
/// assert_eq!(descriptor.body(), Some(&b"{}"[..]));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestDescriptor {
    method: Method,
    url: Url,
    body: Option<Vec<u8>>,
}

impl RequestDescriptor {
    /// Creates a descriptor without a body.
    pub fn new(method: Method, url: Url) -> Self {
        Self {
            method,
            url,
            body: None,
        }
    }

    /// Attaches an already serialized JSON body.
    pub fn with_json_body(mut self, body: Vec<u8>) -> Self {
        self.body = Some(body);
        self
    }

    /// The HTTP method.
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// The request target.
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// The JSON body, if any.
    pub fn body(&self) -> Option<&[u8]> {
        self.body.as_deref()
    }

    pub(crate) fn into_parts(self) -> (Method, Url, Option<Vec<u8>>) {
        (self.method, self.url, self.body)
    }
}

//! The XMS client: configuration, reactor ownership and call execution.
//!
//! The [`Client`] type is the main entry point. Use [`ClientBuilder`] to
//! configure and create clients.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use http::{header, HeaderMap, HeaderName, HeaderValue, Method};
use serde::{de::DeserializeOwned, Serialize};
use tokio::runtime::{Handle, Runtime};
use tokio::sync::oneshot;
use url::Url;

use crate::callback::{Callback, CallbackWrapper, WrappedCallback};
use crate::classify::{Classifier, Decode, Json};
use crate::consumer::ResponseConsumer;
use crate::descriptor::RequestDescriptor;
use crate::handle::{Call, CallHandle};
use crate::{Error, ExecutionFault, Result};

/// The default XMS endpoint.
pub const DEFAULT_ENDPOINT: &str = "https://api.mblox.com/xms/v1";

/// Header carrying the client version on every request.
pub const SDK_VERSION_HEADER: &str = "X-CLX-SdkVersion";

const SDK_VERSION: &str = env!("CARGO_PKG_VERSION");

/// A client for the XMS REST API.
///
/// The client is cheap to clone; clones share the connection pool and the
/// reactor. Calls may be issued from any thread, and calls issued from
/// different threads are not ordered relative to each other.
///
/// # Examples
///
/// ```no_run
/// use xms::{Client, MtBatchTextSmsCreate};
///
/// # fn example() -> Result<(), xms::Error> {
/// let client = Client::builder()
///     .username("jdoe")
///     .token("secret")
///     .build()?;
///
/// let batch = MtBatchTextSmsCreate::new("12345", vec!["987654321".to_string()], "Hello");
/// let created = client.create_text_batch(&batch).blocking()?;
/// println!("created batch {}", created.id);
///
/// client.close();
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    transport: Arc<Transport>,
    reactor: Reactor,
    base: Url,
    callback_wrapper: CallbackWrapper,
    pretty_print_json: bool,
    closed: AtomicBool,
}

/// The connection pool plus what every request needs from the client.
struct Transport {
    http: reqwest::Client,
    standard_headers: HeaderMap,
    timeout: Option<Duration>,
}

/// The runtime calls are spawned on. Only an owned runtime is ever shut down.
struct Reactor {
    handle: Handle,
    owned: Mutex<Option<Runtime>>,
}

impl Reactor {
    fn shutdown(&self) -> bool {
        let runtime = match self.owned.lock() {
            Ok(mut owned) => owned.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };

        match runtime {
            Some(runtime) => {
                runtime.shutdown_background();
                true
            }
            None => false,
        }
    }

    fn is_owned(&self) -> bool {
        match self.owned.lock() {
            Ok(owned) => owned.is_some(),
            Err(poisoned) => poisoned.into_inner().is_some(),
        }
    }
}

impl Drop for ClientInner {
    fn drop(&mut self) {
        if self.reactor.shutdown() {
            tracing::debug!("Shut down owned reactor on client drop");
        }
    }
}

impl Client {
    /// Creates a new `ClientBuilder` for configuring a client.
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    /// Closes the client.
    ///
    /// An owned reactor is shut down, which interrupts calls still in flight.
    /// A reactor supplied through [`ClientBuilder::runtime`] is left running.
    /// Calls made after closing fail with [`ExecutionFault::Closed`].
    pub fn close(&self) {
        if self.inner.closed.swap(true, Ordering::SeqCst) {
            return;
        }

        tracing::debug!(endpoint = %self.inner.base, "Closing API client");
        if !self.inner.reactor.shutdown() {
            tracing::debug!("Not closing reactor since it was given externally");
        }
    }

    /// Returns `true` once [`close`](Client::close) has been called.
    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::SeqCst)
    }

    /// Returns `true` if this client started its own reactor and will shut it down.
    pub fn owns_reactor(&self) -> bool {
        self.inner.reactor.is_owned()
    }

    /// Builds a fully qualified target below the account's base path.
    ///
    /// `sub_path` is appended to `{endpoint}/{username}`; `params` become the
    /// query string, in order, when non-empty.
    ///
    /// # Examples
    ///
    /// ```
    /// # fn example() -> Result<(), xms::Error> {
    /// let client = xms::Client::builder()
    ///     .username("jdoe")
    ///     .token("secret")
    ///     .build()?;
    ///
    /// let url = client.url("/batches", &[("page".to_string(), "2".to_string())]);
    /// assert_eq!(url.as_str(), "https://api.mblox.com/xms/v1/jdoe/batches?page=2");
    /// # Ok(())
    /// # }
    /// ```
    pub fn url(&self, sub_path: &str, params: &[(String, String)]) -> Url {
        let mut url = self.inner.base.clone();
        let path = format!("{}{}", self.inner.base.path(), sub_path);
        url.set_path(&path);

        if !params.is_empty() {
            url.query_pairs_mut().extend_pairs(params);
        }

        url
    }

    /// Executes a call described by `descriptor`.
    ///
    /// Exactly one physical request is issued; nothing is retried. The
    /// classifier decides how the response is interpreted and `callback`, if
    /// any, is wrapped with the client's [`CallbackWrapper`] policy.
    pub fn execute<D: Decode>(
        &self,
        descriptor: RequestDescriptor,
        classifier: Classifier<D>,
        callback: Option<Box<dyn Callback<D::Output>>>,
    ) -> CallHandle<D::Output> {
        self.dispatch(Ok(descriptor), classifier, callback)
    }

    pub(crate) fn dispatch<D: Decode>(
        &self,
        descriptor: Result<RequestDescriptor>,
        classifier: Classifier<D>,
        callback: Option<Box<dyn Callback<D::Output>>>,
    ) -> CallHandle<D::Output> {
        let mut callback = self.inner.callback_wrapper.wrap(callback);
        let runtime = self.inner.reactor.handle.clone();

        if self.is_closed() {
            let error = Error::from(ExecutionFault::Closed);
            callback.failed(&error);
            callback.resume_panic();
            return CallHandle::ready(Err(error), runtime);
        }

        let (cancel_tx, cancel_rx) = oneshot::channel();
        let (result_tx, result_rx) = oneshot::channel();
        let transport = self.inner.transport.clone();
        let task = runtime.spawn(run(
            transport, descriptor, classifier, callback, cancel_rx, result_tx,
        ));

        CallHandle::running(result_rx, task, cancel_tx, runtime)
    }

    pub(crate) fn call<D: Decode>(
        &self,
        method: Method,
        url: Url,
        body: Option<Result<Vec<u8>>>,
        classifier: Classifier<D>,
    ) -> Call<D> {
        let descriptor = match body {
            None => Ok(RequestDescriptor::new(method, url)),
            Some(Ok(body)) => Ok(RequestDescriptor::new(method, url).with_json_body(body)),
            Some(Err(e)) => Err(e),
        };

        Call::new(self.clone(), descriptor, classifier)
    }

    pub(crate) fn get<T>(&self, url: Url) -> Call<Json<T>>
    where
        T: DeserializeOwned + Send + 'static,
    {
        self.call(Method::GET, url, None, Classifier::new(Json::new()))
    }

    pub(crate) fn post<B, T>(&self, url: Url, body: &B) -> Call<Json<T>>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned + Send + 'static,
    {
        let body = self.encode(body);
        self.call(Method::POST, url, Some(body), Classifier::new(Json::new()))
    }

    pub(crate) fn put<B, T>(&self, url: Url, body: &B) -> Call<Json<T>>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned + Send + 'static,
    {
        let body = self.encode(body);
        self.call(Method::PUT, url, Some(body), Classifier::new(Json::new()))
    }

    pub(crate) fn delete<D: Decode>(&self, url: Url, classifier: Classifier<D>) -> Call<D> {
        self.call(Method::DELETE, url, None, classifier)
    }

    /// Serializes a request body. The set of request types is closed and known
    /// to serialize, so a failure here is an internal fault.
    fn encode<B: Serialize + ?Sized>(&self, body: &B) -> Result<Vec<u8>> {
        let encoded = if self.inner.pretty_print_json {
            serde_json::to_vec_pretty(body)
        } else {
            serde_json::to_vec(body)
        };

        encoded.map_err(|e| {
            tracing::error!(error = %e, "Failed to serialize request body");
            ExecutionFault::Serialization(e).into()
        })
    }
}

/// Drives one call on the reactor: dispatch, consume, classify, notify, deliver.
///
/// The callback is notified before the outcome is delivered. A callback panic
/// held under [`CallbackWrapper::Propagate`] is resumed only after delivery, so
/// it ends this task without touching the outcome.
async fn run<D: Decode>(
    transport: Arc<Transport>,
    descriptor: Result<RequestDescriptor>,
    classifier: Classifier<D>,
    mut callback: WrappedCallback<D::Output>,
    mut cancel_rx: oneshot::Receiver<()>,
    result_tx: oneshot::Sender<Result<D::Output>>,
) {
    let outcome = match descriptor {
        Ok(descriptor) => {
            tokio::select! {
                biased;
                Ok(()) = &mut cancel_rx => None,
                result = transport.execute(descriptor, classifier) => Some(result),
            }
        }
        Err(e) => Some(Err(e)),
    };
    drop(cancel_rx);

    let result = match outcome {
        Some(Ok(value)) => {
            callback.completed(&value);
            Ok(value)
        }
        Some(Err(e)) => {
            callback.failed(&e);
            Err(e)
        }
        None => {
            tracing::debug!("Call cancelled");
            callback.cancelled();
            Err(Error::Interrupted)
        }
    };

    // A dropped handle detaches the call; the outcome is simply discarded.
    let _ = result_tx.send(result);
    callback.resume_panic();
}

impl Transport {
    async fn execute<D: Decode>(
        &self,
        descriptor: RequestDescriptor,
        classifier: Classifier<D>,
    ) -> Result<D::Output> {
        let start = Instant::now();
        let (method, url, body) = descriptor.into_parts();

        tracing::debug!(method = %method, url = %url, "Executing API call");

        let mut request = self
            .http
            .request(method.clone(), url.clone())
            .headers(self.standard_headers.clone());

        if let Some(timeout) = self.timeout {
            request = request.timeout(timeout);
        }

        if let Some(body) = body {
            request = request
                .header(header::CONTENT_TYPE, "application/json")
                .body(body);
        }

        let response = request.send().await.map_err(ExecutionFault::Transport)?;
        let status = response.status();

        let result = ResponseConsumer::new(classifier).consume(response).await;

        tracing::info!(
            method = %method,
            url = %url,
            status = status.as_u16(),
            latency_ms = start.elapsed().as_millis() as u64,
            success = result.is_ok(),
            "Call completed"
        );

        result
    }
}

/// Builder for configuring and creating a [`Client`].
///
/// # Examples
///
/// ```no_run
/// use xms::{CallbackWrapper, ClientBuilder};
/// use std::time::Duration;
///
/// # fn example() -> Result<(), xms::Error> {
/// let client = ClientBuilder::new()
///     .endpoint("https://eu.example.com/xms/v1")
///     .username("jdoe")
///     .token("secret")
///     .timeout(Duration::from_secs(30))
///     .callback_wrapper(CallbackWrapper::Propagate)
///     .build()?;
/// # Ok(())
/// # }
/// ```
pub struct ClientBuilder {
    endpoint: String,
    username: Option<String>,
    token: Option<String>,
    timeout: Option<Duration>,
    pretty_print_json: bool,
    callback_wrapper: CallbackWrapper,
    http_client: Option<reqwest::Client>,
    runtime: Option<Handle>,
    use_current_runtime: bool,
}

impl ClientBuilder {
    /// Creates a new `ClientBuilder` with default settings.
    pub fn new() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            username: None,
            token: None,
            timeout: None,
            pretty_print_json: false,
            callback_wrapper: CallbackWrapper::default(),
            http_client: None,
            runtime: None,
            use_current_runtime: false,
        }
    }

    /// Sets the base endpoint. It must not contain a query or a fragment.
    pub fn endpoint(mut self, url: impl Into<String>) -> Self {
        self.endpoint = url.into();
        self
    }

    /// Sets the service plan username. Required.
    pub fn username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    /// Sets the bearer token. Required.
    pub fn token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Sets a timeout applied to each request.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Indents the JSON bodies sent to the server. Off by default.
    pub fn pretty_print_json(mut self, enabled: bool) -> Self {
        self.pretty_print_json = enabled;
        self
    }

    /// Sets the policy applied to panicking callbacks.
    ///
    /// Defaults to [`CallbackWrapper::ExceptionDropper`].
    pub fn callback_wrapper(mut self, wrapper: CallbackWrapper) -> Self {
        self.callback_wrapper = wrapper;
        self
    }

    /// Uses an externally owned connection pool instead of a fresh one.
    pub fn http_client(mut self, client: reqwest::Client) -> Self {
        self.http_client = Some(client);
        self
    }

    /// Runs calls on an externally owned runtime. The client never shuts it down.
    pub fn runtime(mut self, handle: Handle) -> Self {
        self.runtime = Some(handle);
        self
    }

    /// Runs calls on the runtime `build` is called from.
    ///
    /// `build` fails if it is not called from within a Tokio runtime.
    pub fn use_current_runtime(mut self) -> Self {
        self.use_current_runtime = true;
        self
    }

    /// Builds the configured `Client`.
    ///
    /// Unless a runtime was supplied, this starts a multi-threaded reactor
    /// owned by the client.
    ///
    /// # Errors
    ///
    /// Returns an error if the username or token is missing, if the endpoint
    /// is not a valid base URL without query and fragment, or if the reactor
    /// or HTTP client cannot be created.
    pub fn build(self) -> Result<Client> {
        let username = required(self.username, "username")?;
        let token = required(self.token, "token")?;

        let endpoint = Url::parse(&self.endpoint)?;
        if endpoint.query().is_some() {
            return Err(Error::Configuration(
                "base endpoint has query component".to_string(),
            ));
        }
        if endpoint.fragment().is_some() {
            return Err(Error::Configuration(
                "base endpoint has fragment component".to_string(),
            ));
        }

        let mut base = endpoint;
        base.path_segments_mut()
            .map_err(|_| Error::Configuration("base endpoint cannot be a base URL".to_string()))?
            .pop_if_empty()
            .push(&username);

        let standard_headers = standard_headers(&token)?;

        let http = match self.http_client {
            Some(client) => client,
            None => reqwest::Client::builder().build().map_err(|e| {
                Error::Configuration(format!("Failed to build HTTP client: {}", e))
            })?,
        };

        let reactor = if let Some(handle) = self.runtime {
            Reactor {
                handle,
                owned: Mutex::new(None),
            }
        } else if self.use_current_runtime {
            let handle = Handle::try_current().map_err(|e| {
                Error::Configuration(format!("No current runtime: {}", e))
            })?;
            Reactor {
                handle,
                owned: Mutex::new(None),
            }
        } else {
            let runtime = tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .thread_name("xms-reactor")
                .build()
                .map_err(|e| Error::Configuration(format!("Failed to start reactor: {}", e)))?;
            Reactor {
                handle: runtime.handle().clone(),
                owned: Mutex::new(Some(runtime)),
            }
        };

        tracing::debug!(
            base = %base,
            owned_reactor = reactor.is_owned(),
            "Starting API client"
        );

        Ok(Client {
            inner: Arc::new(ClientInner {
                transport: Arc::new(Transport {
                    http,
                    standard_headers,
                    timeout: self.timeout,
                }),
                reactor,
                base,
                callback_wrapper: self.callback_wrapper,
                pretty_print_json: self.pretty_print_json,
                closed: AtomicBool::new(false),
            }),
        })
    }
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn required(value: Option<String>, name: &str) -> Result<String> {
    match value {
        Some(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(Error::Configuration(format!("{} is required", name))),
    }
}

fn standard_headers(token: &str) -> Result<HeaderMap> {
    let mut authorization = HeaderValue::try_from(format!("Bearer {}", token))
        .map_err(|e| Error::Configuration(format!("Invalid token: {}", e)))?;
    authorization.set_sensitive(true);

    let mut headers = HeaderMap::new();
    headers.insert(header::AUTHORIZATION, authorization);
    headers.insert(header::ACCEPT, HeaderValue::from_static("application/json"));
    headers.insert(
        HeaderName::from_static("x-clx-sdkversion"),
        HeaderValue::from_static(SDK_VERSION),
    );
    Ok(headers)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(endpoint: &str) -> Result<Client> {
        Client::builder()
            .endpoint(endpoint)
            .username("jdoe")
            .token("secret")
            .build()
    }

    #[test]
    fn url_appends_username_and_sub_path() {
        let client = client("https://api.example.com/xms/v1").unwrap();

        assert_eq!(
            client.url("/batches/b1", &[]).as_str(),
            "https://api.example.com/xms/v1/jdoe/batches/b1"
        );
        assert_eq!(
            client
                .url(
                    "/groups",
                    &[
                        ("page".to_string(), "0".to_string()),
                        ("tags".to_string(), "a,b".to_string())
                    ]
                )
                .as_str(),
            "https://api.example.com/xms/v1/jdoe/groups?page=0&tags=a%2Cb"
        );
    }

    #[test]
    fn username_is_percent_encoded() {
        let client = Client::builder()
            .endpoint("https://api.example.com/xms/v1/")
            .username("j doe/x")
            .token("secret")
            .build()
            .unwrap();

        assert_eq!(
            client.url("/batches", &[]).as_str(),
            "https://api.example.com/xms/v1/j%20doe%2Fx/batches"
        );
    }

    #[test]
    fn endpoint_with_query_or_fragment_is_rejected() {
        assert!(matches!(
            client("https://api.example.com/xms?x=1"),
            Err(Error::Configuration(_))
        ));
        assert!(matches!(
            client("https://api.example.com/xms#frag"),
            Err(Error::Configuration(_))
        ));
        assert!(matches!(client("not a url"), Err(Error::InvalidUrl(_))));
    }

    #[test]
    fn credentials_are_required() {
        assert!(Client::builder().token("t").build().is_err());
        assert!(Client::builder().username("u").build().is_err());
        assert!(Client::builder().username("u").token("  ").build().is_err());
    }

    #[test]
    fn standard_headers_carry_credentials_and_version() {
        let headers = standard_headers("secret").unwrap();

        assert_eq!(headers[header::AUTHORIZATION], "Bearer secret");
        assert!(headers[header::AUTHORIZATION].is_sensitive());
        assert_eq!(headers[header::ACCEPT], "application/json");
        assert_eq!(headers[SDK_VERSION_HEADER], SDK_VERSION);
    }

    #[test]
    fn owned_reactor_is_shut_down_once() {
        let client = client(DEFAULT_ENDPOINT).unwrap();
        assert!(client.owns_reactor());

        client.close();
        assert!(client.is_closed());
        assert!(!client.owns_reactor());

        client.close();
    }

    #[test]
    fn external_reactor_is_left_running() {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let client = Client::builder()
            .username("jdoe")
            .token("secret")
            .runtime(runtime.handle().clone())
            .build()
            .unwrap();
        assert!(!client.owns_reactor());

        client.close();
        drop(client);

        assert_eq!(runtime.block_on(async { 1 + 1 }), 2);
    }

    #[test]
    fn calls_after_close_fail_without_dispatch() {
        let client = client(DEFAULT_ENDPOINT).unwrap();
        client.close();

        let url = client.url("/batches", &[]);
        let result = client
            .execute(
                RequestDescriptor::new(Method::GET, url),
                Classifier::new(crate::classify::Empty),
                None,
            )
            .blocking_get();

        assert!(matches!(
            result,
            Err(Error::Execution(ExecutionFault::Closed))
        ));
    }

    #[test]
    fn use_current_runtime_requires_a_runtime() {
        let result = Client::builder()
            .username("jdoe")
            .token("secret")
            .use_current_runtime()
            .build();
        assert!(matches!(result, Err(Error::Configuration(_))));
    }
}

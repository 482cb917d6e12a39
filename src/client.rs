//! Client and submission pipeline
//!
use crate::{
    join_messages, AsMessage, Callback, Error, HttpTransport, InlineNotifier, Notifier, Result,
    TagStore, Transport,
};
use parking_lot::{const_mutex, Mutex};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::{Handle, Runtime};
use tracing::{debug, trace, warn};

/// Default ingestion endpoint
pub const API_URL: &str = "https://logs-01.loggly.com/";

/// Default request timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Worker threads in the shared background pool
const WORKER_THREADS: usize = 2;

/// The process-wide client, replaced when a different token is requested
static INSTANCE: Mutex<Option<Arc<LogglyClient>>> = const_mutex(None);

/// Background pool shared by all clients that were not given a runtime. Never dropped.
static WORKERS: Mutex<Option<Runtime>> = const_mutex(None);

/// Counter used to label submissions in diagnostics
static NEXT_SUBMISSION: AtomicU64 = AtomicU64::new(1);

/// Configuration parameters for the http transport
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// URL prefix for the service, e.g. `https://logs-01.loggly.com/`
    pub endpoint: String,
    /// Timeout for a single request, including reading the response
    pub timeout: Duration,
    /// Value of the User-Agent header
    pub user_agent: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            endpoint: API_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
            user_agent: concat!("loggly-client/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

/// Builds a [LogglyClient]
pub struct ClientBuilder {
    token: String,
    config: ClientConfig,
    runtime: Option<Handle>,
    notifier: Option<Arc<dyn Notifier>>,
    transport: Option<Arc<dyn Transport>>,
}

impl ClientBuilder {
    /// Replaces the whole transport configuration
    pub fn config(mut self, config: ClientConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the endpoint URL prefix
    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.config.endpoint = endpoint.into();
        self
    }

    /// Sets the request timeout
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    /// Runs submissions on the given runtime instead of the shared worker pool.
    ///
    /// If that runtime shuts down with submissions still pending, or before a
    /// submission is spawned, their callbacks receive `failure`.
    pub fn runtime(mut self, handle: Handle) -> Self {
        self.runtime = Some(handle);
        self
    }

    /// Delivers callbacks through the given notifier. Default: [InlineNotifier]
    pub fn notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    /// Uses a custom transport. The endpoint and timeout settings are then unused.
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Validates the token and constructs the client
    pub fn build(self) -> Result<LogglyClient> {
        if self.token.is_empty() {
            return Err(Error::EmptyToken);
        }
        let transport = match self.transport {
            Some(transport) => transport,
            None => Arc::new(HttpTransport::new(&self.config)?),
        };
        let runtime = match self.runtime {
            Some(handle) => handle,
            None => shared_workers()?,
        };
        Ok(LogglyClient {
            token: self.token,
            tags: TagStore::new(),
            transport,
            runtime,
            notifier: self
                .notifier
                .unwrap_or_else(|| Arc::new(InlineNotifier) as Arc<dyn Notifier>),
        })
    }
}

fn shared_workers() -> Result<Handle> {
    let mut workers = WORKERS.lock();
    if let Some(rt) = workers.as_ref() {
        return Ok(rt.handle().clone());
    }
    let rt = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(WORKER_THREADS)
        .thread_name("loggly-worker")
        .enable_all()
        .build()
        .map_err(Error::Runtime)?;
    let handle = rt.handle().clone();
    *workers = Some(rt);
    Ok(handle)
}

/// Client for the Loggly ingestion endpoint.
///
/// Submissions never block: [log](LogglyClient::log) and
/// [log_bulk](LogglyClient::log_bulk) return as soon as the request has been
/// handed to a background worker. The outcome is reported through an optional
/// [Callback], run on the client's [Notifier].
///
/// ```no_run
/// use loggly_client::LogglyClient;
///
/// let client = LogglyClient::instance("customer-token").expect("client");
/// client.add_tag("env", "prod");
/// client.log("service started");
/// client.log_bulk(vec!["first", "second\nstill second"]);
/// ```
pub struct LogglyClient {
    token: String,
    tags: TagStore,
    transport: Arc<dyn Transport>,
    runtime: Handle,
    notifier: Arc<dyn Notifier>,
}

impl fmt::Debug for LogglyClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LogglyClient")
            .field("tags", &self.tags)
            .finish_non_exhaustive()
    }
}

impl LogglyClient {
    /// Starts building a standalone client (not registered as the process-wide instance)
    pub fn builder(token: impl Into<String>) -> ClientBuilder {
        ClientBuilder {
            token: token.into(),
            config: ClientConfig::default(),
            runtime: None,
            notifier: None,
            transport: None,
        }
    }

    /// Returns the process-wide client for `token`.
    ///
    /// The existing client is returned if it was created with the same token.
    /// Otherwise a new client, with no tags, replaces it.
    /// Fails if the token is empty.
    pub fn instance(token: &str) -> Result<Arc<LogglyClient>> {
        Self::instance_with(Self::builder(token))
    }

    /// Like [instance](LogglyClient::instance), building a replacement client from `builder`.
    /// The builder is ignored if a client with the same token already exists.
    pub fn instance_with(builder: ClientBuilder) -> Result<Arc<LogglyClient>> {
        if builder.token.is_empty() {
            return Err(Error::EmptyToken);
        }
        let mut slot = INSTANCE.lock();
        if let Some(client) = slot.as_ref() {
            if client.token == builder.token {
                return Ok(Arc::clone(client));
            }
            debug!("token changed, replacing client");
        }
        let client = Arc::new(builder.build()?);
        *slot = Some(Arc::clone(&client));
        Ok(client)
    }

    /// Customer token this client submits with
    pub fn token(&self) -> &str {
        &self.token
    }

    /// Tags sent with every submission
    pub fn tag_store(&self) -> &TagStore {
        &self.tags
    }

    /// Current tag string, as it would be sent
    pub fn tags(&self) -> String {
        self.tags.render()
    }

    /// Adds or replaces a tag. Ignored if name or value is empty.
    pub fn add_tag(&self, name: &str, value: &str) {
        self.tags.add_tag(name, value)
    }

    /// Merges tags into the current set, replacing values of existing names.
    /// Entries are not validated.
    pub fn add_tags<I, K, V>(&self, tags: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.tags.add_tags(tags)
    }

    /// Removes a tag. Ignored if name is empty or unknown.
    pub fn remove_tag(&self, name: &str) {
        self.tags.remove_tag(name)
    }

    /// Posts a message asynchronously. A missing (`None`) message is ignored.
    pub fn log<M: AsMessage>(&self, message: M) {
        self.submit(message.as_message(), None)
    }

    /// Posts a message asynchronously, invoking `callback` once the post completes.
    /// A missing (`None`) message is ignored and the callback is never invoked.
    pub fn log_with_callback<M, C>(&self, message: M, callback: C)
    where
        M: AsMessage,
        C: Callback,
    {
        self.submit(message.as_message(), Some(Box::new(callback)))
    }

    /// Posts several messages in one request. See [join_messages](crate::join_messages).
    /// Nothing is sent if no message survives joining.
    pub fn log_bulk<I>(&self, messages: I)
    where
        I: IntoIterator,
        I::Item: AsMessage,
    {
        self.submit_bulk(messages, None)
    }

    /// Posts several messages in one request, invoking `callback` once the post completes.
    /// If no message survives joining, nothing is sent and the callback is never invoked.
    pub fn log_bulk_with_callback<I, C>(&self, messages: I, callback: C)
    where
        I: IntoIterator,
        I::Item: AsMessage,
        C: Callback,
    {
        self.submit_bulk(messages, Some(Box::new(callback)))
    }

    fn submit_bulk<I>(&self, messages: I, callback: Option<Box<dyn Callback>>)
    where
        I: IntoIterator,
        I::Item: AsMessage,
    {
        let parcel = join_messages(messages);
        if parcel.is_empty() {
            trace!("empty bulk submission dropped");
            return;
        }
        self.dispatch(parcel, callback)
    }

    fn submit(&self, message: Option<&str>, callback: Option<Box<dyn Callback>>) {
        match message {
            Some(body) => self.dispatch(body.to_string(), callback),
            None => trace!("missing message dropped"),
        }
    }

    fn dispatch(&self, body: String, callback: Option<Box<dyn Callback>>) {
        let id = NEXT_SUBMISSION.fetch_add(1, Ordering::Relaxed);
        let tags = self.tags.render();
        let token = self.token.clone();
        let transport = Arc::clone(&self.transport);
        let notifier = Arc::clone(&self.notifier);
        let runtime = self.runtime.clone();

        let completion = Completion {
            id,
            callback,
            notifier,
        };

        debug!(submission = id, bytes = body.len(), "dispatching");
        self.runtime.spawn(async move {
            let send = runtime.spawn(async move { transport.send(&token, &tags, body).await });
            // a panicking transport surfaces here as a JoinError
            let outcome = match send.await {
                Ok(result) => result,
                Err(e) => Err(Error::Worker(e.to_string())),
            };
            completion.finish(outcome);
        });
    }
}

/// Delivers the outcome of one submission to its callback.
///
/// If the submission task is dropped before finishing (its runtime shut down),
/// the callback is told so through `failure`.
struct Completion {
    id: u64,
    callback: Option<Box<dyn Callback>>,
    notifier: Arc<dyn Notifier>,
}

impl Completion {
    fn finish(mut self, outcome: Result<()>) {
        match &outcome {
            Ok(()) => debug!(submission = self.id, "submission succeeded"),
            Err(e) => warn!(submission = self.id, error = %e, "submission failed"),
        }
        self.deliver(outcome);
    }

    fn deliver(&mut self, outcome: Result<()>) {
        let Some(callback) = self.callback.take() else {
            return;
        };
        self.notifier.notify(Box::new(move || match outcome {
            Ok(()) => callback.success(),
            Err(e) => callback.failure(e.to_string()),
        }));
    }
}

impl Drop for Completion {
    fn drop(&mut self) {
        if self.callback.is_some() {
            warn!(submission = self.id, "submission abandoned by its runtime");
            self.deliver(Err(Error::Worker(
                "runtime shut down before the submission completed".to_string(),
            )));
        }
    }
}

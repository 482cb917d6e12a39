#![deny(missing_docs)]
//! Asynchronous client for the [Loggly](https://www.loggly.com/) http ingestion endpoint.
//!
//! A single process-wide [LogglyClient] is keyed by customer token and carries a set
//! of tags that is attached to every submission. Messages are posted on a
//! background worker, one request per call, and the outcome is reported through an
//! optional [Callback] run on a host-supplied [Notifier].
//!
//! ```no_run
//! use loggly_client::LogglyClient;
//!
//! let client = LogglyClient::instance("customer-token").expect("valid token");
//! client.add_tag("app", "billing");
//! client.log_with_callback("payment accepted", |outcome: Result<(), String>| {
//!     if let Err(e) = outcome {
//!         eprintln!("log delivery failed: {}", e);
//!     }
//! });
//! ```
//!
//! Several messages can be sent in one request with [log_bulk](LogglyClient::log_bulk).
//! Line breaks inside each message are escaped so that every message stays a single
//! event; see [join_messages].
mod client;
mod error;
mod message;
mod notify;
mod tags;
mod transport;

pub use client::{ClientBuilder, ClientConfig, LogglyClient, API_URL, DEFAULT_TIMEOUT};
pub use error::{Error, Result};
pub use message::{join_messages, AsMessage};
pub use notify::{
    Callback, ChannelNotifier, InlineNotifier, Notification, NotificationQueue, Notifier,
};
pub use tags::TagStore;
pub use transport::{HttpTransport, LogglyResponse, Transport, TAG_HEADER};

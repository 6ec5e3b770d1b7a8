//! Blocking client for the Zep memory API.
//!
//! # Overview
//! Two clients live here. [`Client`] covers the v2 REST surface through
//! per-resource clients (`memory`, `search`, `user`) that share one
//! [`Caller`]: the executor that retries transient failures and turns
//! error statuses into typed [`ZepError`]s. [`LegacyClient`] speaks the v1
//! API, checks the server's version on construction and maps raw responses
//! to typed results.
//!
//! # Design
//! - Requests and responses are plain data ([`HttpRequest`],
//!   [`HttpResponse`]); every operation has a `build_*` method that never
//!   touches the network.
//! - I/O happens behind the [`Transport`] trait. [`UreqTransport`] is the
//!   default; tests swap in scripted transports.
//! - Configuration never mutates: per-call [`RequestOptions`] are merged over
//!   a clone of the client defaults.

pub mod caller;
pub mod client;
pub mod error;
pub mod http;
pub mod legacy;
pub mod options;
pub mod query;
pub mod resources;
pub mod transport;
pub mod types;

pub use caller::{CallParams, Caller, ErrorDecoder, RetryPolicy};
pub use client::Client;
pub use error::{ApiError, Result, TransportError, ZepError};
pub use http::{HttpMethod, HttpRequest, HttpResponse};
pub use legacy::{LegacyClient, ServerStatus};
pub use options::{ClientOptions, RequestOptions};
pub use transport::{Transport, UreqTransport};

//! Per-resource clients for the v2 API.
//!
//! Every operation comes as a pair: `build_*` produces the `HttpRequest`
//! without touching the network, and the plain method runs it through the
//! shared [`Caller`] with the endpoint's [`ErrorDecoder`].

pub mod memory;
pub mod search;
pub mod user;

use serde::de::DeserializeOwned;
use serde::Serialize;
use url::Url;

use crate::caller::{CallParams, Caller, ErrorDecoder};
use crate::error::{Result, ZepError};
use crate::http::{merge_headers, HttpMethod, HttpRequest};
use crate::options::{ClientOptions, RequestOptions};

pub use memory::MemoryClient;
pub use search::SearchClient;
pub use user::UserClient;

/// State every resource client shares.
#[derive(Debug, Clone)]
pub(crate) struct Resource {
    base_url: String,
    caller: Caller,
    headers: Vec<(String, String)>,
}

impl Resource {
    pub(crate) fn new(options: &ClientOptions, caller: Caller) -> Self {
        Self {
            base_url: options.resolved_base_url(),
            caller,
            headers: options.to_headers(),
        }
    }

    /// Build a request for `segments` below the effective base URL.
    pub(crate) fn request(
        &self,
        method: HttpMethod,
        segments: &[&str],
        query: &[(String, String)],
        body: Option<String>,
        opts: &RequestOptions,
    ) -> Result<HttpRequest> {
        let base = opts
            .base_url
            .as_deref()
            .map(|url| url.trim_end_matches('/'))
            .unwrap_or(&self.base_url);
        let mut url = Url::parse(base).map_err(|e| ZepError::InvalidUrl(format!("{base}: {e}")))?;
        url.path_segments_mut()
            .map_err(|()| ZepError::InvalidUrl(format!("{base}: cannot be a base")))?
            .pop_if_empty()
            .extend(segments);
        crate::query::apply(&mut url, query);

        let mut headers = merge_headers(self.headers.clone(), &opts.to_headers());
        if body.is_some() {
            headers = merge_headers(
                headers,
                &[("Content-Type".to_string(), "application/json".to_string())],
            );
        }

        Ok(HttpRequest {
            method,
            url: url.into(),
            headers,
            body,
        })
    }

    pub(crate) fn execute<T: DeserializeOwned>(
        &self,
        request: HttpRequest,
        opts: &RequestOptions,
        error_decoder: ErrorDecoder,
    ) -> Result<T> {
        self.caller.call(CallParams {
            request,
            max_attempts: opts.max_attempts,
            error_decoder,
        })
    }
}

pub(crate) fn json_body<T: Serialize>(value: &T) -> Result<String> {
    serde_json::to_string(value).map_err(|e| ZepError::Serialization(e.to_string()))
}

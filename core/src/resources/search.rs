//! Semantic search over a session's memory.

use tracing::instrument;

use crate::caller::{Caller, ErrorDecoder};
use crate::error::Result;
use crate::http::{HttpMethod, HttpRequest};
use crate::options::{ClientOptions, RequestOptions};
use crate::query;
use crate::types::{MemorySearchPayload, MemorySearchResult, SearchQuery};

use super::{json_body, Resource};

#[derive(Debug, Clone)]
pub struct SearchClient {
    inner: Resource,
}

impl SearchClient {
    pub fn new(options: &ClientOptions) -> Self {
        Self::with_caller(options, options.caller())
    }

    pub(crate) fn with_caller(options: &ClientOptions, caller: Caller) -> Self {
        Self {
            inner: Resource::new(options, caller),
        }
    }

    pub fn build_get(
        &self,
        session_id: &str,
        request: &MemorySearchPayload,
        opts: &RequestOptions,
    ) -> Result<HttpRequest> {
        let query = query::values(&SearchQuery {
            limit: request.limit,
        })?;
        self.inner.request(
            HttpMethod::Post,
            &["sessions", session_id, "search"],
            &query,
            Some(json_body(request)?),
            opts,
        )
    }

    /// Search a session's messages or summaries.
    #[instrument(skip(self, request, opts))]
    pub fn get(
        &self,
        session_id: &str,
        request: &MemorySearchPayload,
        opts: &RequestOptions,
    ) -> Result<Vec<MemorySearchResult>> {
        let http = self.build_get(session_id, request, opts)?;
        self.inner.execute(http, opts, ErrorDecoder::STANDARD)
    }
}

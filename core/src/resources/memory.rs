//! Sessions and the chat memory attached to them.

use tracing::instrument;

use crate::caller::{Caller, ErrorDecoder};
use crate::error::Result;
use crate::http::{HttpMethod, HttpRequest};
use crate::options::{ClientOptions, RequestOptions};
use crate::query;
use crate::types::{
    AddMemoryRequest, CreateSessionRequest, GetMemoryRequest, ListMessagesRequest,
    ListSessionsRequest, Memory, MessageListResponse, Session, SessionListResponse,
    SuccessResponse, UpdateSessionRequest,
};

use super::{json_body, Resource};

#[derive(Debug, Clone)]
pub struct MemoryClient {
    inner: Resource,
}

impl MemoryClient {
    pub fn new(options: &ClientOptions) -> Self {
        Self::with_caller(options, options.caller())
    }

    pub(crate) fn with_caller(options: &ClientOptions, caller: Caller) -> Self {
        Self {
            inner: Resource::new(options, caller),
        }
    }

    // --- sessions ---

    pub fn build_add_session(
        &self,
        request: &CreateSessionRequest,
        opts: &RequestOptions,
    ) -> Result<HttpRequest> {
        self.inner
            .request(HttpMethod::Post, &["sessions"], &[], Some(json_body(request)?), opts)
    }

    #[instrument(skip(self, request, opts), fields(session_id = %request.session_id))]
    pub fn add_session(
        &self,
        request: &CreateSessionRequest,
        opts: &RequestOptions,
    ) -> Result<Session> {
        let http = self.build_add_session(request, opts)?;
        self.inner.execute(http, opts, ErrorDecoder::WITH_BAD_REQUEST)
    }

    pub fn build_get_session(&self, session_id: &str, opts: &RequestOptions) -> Result<HttpRequest> {
        self.inner
            .request(HttpMethod::Get, &["sessions", session_id], &[], None, opts)
    }

    #[instrument(skip(self, opts))]
    pub fn get_session(&self, session_id: &str, opts: &RequestOptions) -> Result<Session> {
        let http = self.build_get_session(session_id, opts)?;
        self.inner.execute(http, opts, ErrorDecoder::STANDARD)
    }

    pub fn build_update_session(
        &self,
        session_id: &str,
        request: &UpdateSessionRequest,
        opts: &RequestOptions,
    ) -> Result<HttpRequest> {
        self.inner.request(
            HttpMethod::Patch,
            &["sessions", session_id],
            &[],
            Some(json_body(request)?),
            opts,
        )
    }

    /// Replace the session's metadata.
    #[instrument(skip(self, request, opts))]
    pub fn update_session(
        &self,
        session_id: &str,
        request: &UpdateSessionRequest,
        opts: &RequestOptions,
    ) -> Result<Session> {
        let http = self.build_update_session(session_id, request, opts)?;
        self.inner.execute(http, opts, ErrorDecoder::WITH_BAD_REQUEST)
    }

    pub fn build_list_sessions(
        &self,
        request: &ListSessionsRequest,
        opts: &RequestOptions,
    ) -> Result<HttpRequest> {
        let query = query::values(request)?;
        self.inner
            .request(HttpMethod::Get, &["sessions-ordered"], &query, None, opts)
    }

    /// One page of sessions, ordered server-side.
    #[instrument(skip_all)]
    pub fn list_sessions(
        &self,
        request: &ListSessionsRequest,
        opts: &RequestOptions,
    ) -> Result<SessionListResponse> {
        let http = self.build_list_sessions(request, opts)?;
        self.inner.execute(http, opts, ErrorDecoder::WITH_BAD_REQUEST)
    }

    // --- memory ---

    pub fn build_get(
        &self,
        session_id: &str,
        request: &GetMemoryRequest,
        opts: &RequestOptions,
    ) -> Result<HttpRequest> {
        let query = query::values(request)?;
        self.inner
            .request(HttpMethod::Get, &["sessions", session_id, "memory"], &query, None, opts)
    }

    #[instrument(skip(self, request, opts))]
    pub fn get(
        &self,
        session_id: &str,
        request: &GetMemoryRequest,
        opts: &RequestOptions,
    ) -> Result<Memory> {
        let http = self.build_get(session_id, request, opts)?;
        self.inner.execute(http, opts, ErrorDecoder::STANDARD)
    }

    pub fn build_add(
        &self,
        session_id: &str,
        request: &AddMemoryRequest,
        opts: &RequestOptions,
    ) -> Result<HttpRequest> {
        self.inner.request(
            HttpMethod::Post,
            &["sessions", session_id, "memory"],
            &[],
            Some(json_body(request)?),
            opts,
        )
    }

    /// Append messages to the session's memory.
    #[instrument(skip(self, request, opts), fields(messages = request.messages.len()))]
    pub fn add(
        &self,
        session_id: &str,
        request: &AddMemoryRequest,
        opts: &RequestOptions,
    ) -> Result<SuccessResponse> {
        let http = self.build_add(session_id, request, opts)?;
        self.inner.execute(http, opts, ErrorDecoder::STANDARD)
    }

    pub fn build_delete(&self, session_id: &str, opts: &RequestOptions) -> Result<HttpRequest> {
        self.inner
            .request(HttpMethod::Delete, &["sessions", session_id, "memory"], &[], None, opts)
    }

    /// Drop all messages and derived data for the session.
    #[instrument(skip(self, opts))]
    pub fn delete(&self, session_id: &str, opts: &RequestOptions) -> Result<SuccessResponse> {
        let http = self.build_delete(session_id, opts)?;
        self.inner.execute(http, opts, ErrorDecoder::STANDARD)
    }

    pub fn build_get_session_messages(
        &self,
        session_id: &str,
        request: &ListMessagesRequest,
        opts: &RequestOptions,
    ) -> Result<HttpRequest> {
        let query = query::values(request)?;
        self.inner.request(
            HttpMethod::Get,
            &["sessions", session_id, "messages"],
            &query,
            None,
            opts,
        )
    }

    #[instrument(skip(self, request, opts))]
    pub fn get_session_messages(
        &self,
        session_id: &str,
        request: &ListMessagesRequest,
        opts: &RequestOptions,
    ) -> Result<MessageListResponse> {
        let http = self.build_get_session_messages(session_id, request, opts)?;
        self.inner.execute(http, opts, ErrorDecoder::STANDARD)
    }
}

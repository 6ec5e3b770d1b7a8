//! Users and the sessions they own.

use tracing::instrument;

use crate::caller::{Caller, ErrorDecoder};
use crate::error::Result;
use crate::http::{HttpMethod, HttpRequest};
use crate::options::{ClientOptions, RequestOptions};
use crate::query;
use crate::types::{
    CreateUserRequest, ListUsersRequest, Session, SuccessResponse, UpdateUserRequest, User,
    UserListResponse,
};

use super::{json_body, Resource};

#[derive(Debug, Clone)]
pub struct UserClient {
    inner: Resource,
}

impl UserClient {
    pub fn new(options: &ClientOptions) -> Self {
        Self::with_caller(options, options.caller())
    }

    pub(crate) fn with_caller(options: &ClientOptions, caller: Caller) -> Self {
        Self {
            inner: Resource::new(options, caller),
        }
    }

    pub fn build_add(&self, request: &CreateUserRequest, opts: &RequestOptions) -> Result<HttpRequest> {
        self.inner
            .request(HttpMethod::Post, &["users"], &[], Some(json_body(request)?), opts)
    }

    #[instrument(skip(self, request, opts), fields(user_id = %request.user_id))]
    pub fn add(&self, request: &CreateUserRequest, opts: &RequestOptions) -> Result<User> {
        let http = self.build_add(request, opts)?;
        self.inner.execute(http, opts, ErrorDecoder::WITH_BAD_REQUEST)
    }

    pub fn build_get(&self, user_id: &str, opts: &RequestOptions) -> Result<HttpRequest> {
        self.inner
            .request(HttpMethod::Get, &["users", user_id], &[], None, opts)
    }

    #[instrument(skip(self, opts))]
    pub fn get(&self, user_id: &str, opts: &RequestOptions) -> Result<User> {
        let http = self.build_get(user_id, opts)?;
        self.inner.execute(http, opts, ErrorDecoder::STANDARD)
    }

    pub fn build_update(
        &self,
        user_id: &str,
        request: &UpdateUserRequest,
        opts: &RequestOptions,
    ) -> Result<HttpRequest> {
        self.inner.request(
            HttpMethod::Patch,
            &["users", user_id],
            &[],
            Some(json_body(request)?),
            opts,
        )
    }

    #[instrument(skip(self, request, opts))]
    pub fn update(
        &self,
        user_id: &str,
        request: &UpdateUserRequest,
        opts: &RequestOptions,
    ) -> Result<User> {
        let http = self.build_update(user_id, request, opts)?;
        self.inner.execute(http, opts, ErrorDecoder::WITH_BAD_REQUEST)
    }

    pub fn build_delete(&self, user_id: &str, opts: &RequestOptions) -> Result<HttpRequest> {
        self.inner
            .request(HttpMethod::Delete, &["users", user_id], &[], None, opts)
    }

    #[instrument(skip(self, opts))]
    pub fn delete(&self, user_id: &str, opts: &RequestOptions) -> Result<SuccessResponse> {
        let http = self.build_delete(user_id, opts)?;
        self.inner.execute(http, opts, ErrorDecoder::STANDARD)
    }

    pub fn build_list_ordered(
        &self,
        request: &ListUsersRequest,
        opts: &RequestOptions,
    ) -> Result<HttpRequest> {
        let query = query::values(request)?;
        self.inner
            .request(HttpMethod::Get, &["users-ordered"], &query, None, opts)
    }

    #[instrument(skip_all)]
    pub fn list_ordered(
        &self,
        request: &ListUsersRequest,
        opts: &RequestOptions,
    ) -> Result<UserListResponse> {
        let http = self.build_list_ordered(request, opts)?;
        self.inner.execute(http, opts, ErrorDecoder::WITH_BAD_REQUEST)
    }

    pub fn build_get_sessions(&self, user_id: &str, opts: &RequestOptions) -> Result<HttpRequest> {
        self.inner
            .request(HttpMethod::Get, &["users", user_id, "sessions"], &[], None, opts)
    }

    #[instrument(skip(self, opts))]
    pub fn get_sessions(&self, user_id: &str, opts: &RequestOptions) -> Result<Vec<Session>> {
        let http = self.build_get_sessions(user_id, opts)?;
        self.inner.execute(http, opts, ErrorDecoder::STANDARD)
    }
}

//! The request executor every resource method goes through.
//!
//! # Design
//! `Caller` owns the transport and the retry policy. A call sends the
//! request, retries transport failures and retryable statuses with an
//! exponential backoff until the attempt budget is spent, then either
//! decodes the 2xx body into the expected type or hands the final response
//! to the endpoint's [`ErrorDecoder`].

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use backoff::{backoff::Backoff, ExponentialBackoff};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::error::{ApiError, Result, ZepError};
use crate::http::{HttpRequest, HttpResponse};
use crate::transport::Transport;

/// How many times, and how patiently, a call is attempted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first one. Zero is treated as one.
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(500),
            max_backoff: Duration::from_secs(5),
        }
    }
}

impl RetryPolicy {
    /// A single attempt, no retries.
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    fn backoff(&self) -> ExponentialBackoff {
        ExponentialBackoff {
            initial_interval: self.initial_backoff,
            current_interval: self.initial_backoff,
            max_interval: self.max_backoff,
            max_elapsed_time: None,
            ..Default::default()
        }
    }
}

/// Statuses worth another attempt.
pub fn is_retryable_status(status: u16) -> bool {
    matches!(status, 408 | 409 | 429) || status >= 500
}

/// Maps a non-2xx response to a typed error.
///
/// Only the statuses an endpoint documents get a typed variant; the rest
/// become [`ZepError::Api`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ErrorDecoder {
    known: &'static [u16],
}

impl ErrorDecoder {
    pub const STANDARD: ErrorDecoder = ErrorDecoder {
        known: &[401, 404, 500],
    };

    pub const WITH_BAD_REQUEST: ErrorDecoder = ErrorDecoder {
        known: &[400, 401, 404, 500],
    };

    pub const fn new(known: &'static [u16]) -> Self {
        Self { known }
    }

    pub fn decode(&self, status: u16, body: &str) -> ZepError {
        let error = ApiError::from_body(status, body);
        if !self.known.contains(&status) {
            return ZepError::Api(error);
        }
        match status {
            400 => ZepError::BadRequest(error),
            401 => ZepError::Unauthorized(error),
            404 => ZepError::NotFound(error),
            500 => ZepError::InternalServerError(error),
            _ => ZepError::Api(error),
        }
    }
}

impl Default for ErrorDecoder {
    fn default() -> Self {
        Self::STANDARD
    }
}

/// One call through the [`Caller`].
#[derive(Debug, Clone)]
pub struct CallParams {
    pub request: HttpRequest,
    /// Overrides the policy's attempt count for this call.
    pub max_attempts: Option<u32>,
    pub error_decoder: ErrorDecoder,
}

impl CallParams {
    pub fn new(request: HttpRequest) -> Self {
        Self {
            request,
            max_attempts: None,
            error_decoder: ErrorDecoder::STANDARD,
        }
    }
}

/// Decode a response the way [`Caller::call`] does.
pub fn parse_response<T: DeserializeOwned>(
    response: HttpResponse,
    decoder: ErrorDecoder,
) -> Result<T> {
    if !response.is_success() {
        return Err(decoder.decode(response.status, &response.body));
    }
    serde_json::from_str(&response.body).map_err(|e| ZepError::Deserialization(e.to_string()))
}

/// Shared request executor.
#[derive(Clone)]
pub struct Caller {
    transport: Arc<dyn Transport>,
    policy: RetryPolicy,
}

impl fmt::Debug for Caller {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Caller")
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

impl Caller {
    pub fn new(transport: Arc<dyn Transport>, policy: RetryPolicy) -> Self {
        Self { transport, policy }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Execute and decode into `T`.
    pub fn call<T: DeserializeOwned>(&self, params: CallParams) -> Result<T> {
        let decoder = params.error_decoder;
        let response = self.send(&params.request, params.max_attempts)?;
        parse_response(response, decoder)
    }

    /// Execute with retries and return the final response, whatever its status.
    pub fn send(&self, request: &HttpRequest, max_attempts: Option<u32>) -> Result<HttpResponse> {
        let max_attempts = max_attempts.unwrap_or(self.policy.max_attempts).max(1);
        let mut backoff = self.policy.backoff();
        let mut attempt = 0;

        loop {
            attempt += 1;
            debug!(
                method = %request.method,
                url = %request.url,
                attempt,
                max_attempts,
                "sending request"
            );

            let outcome = self.transport.execute(request);
            let last_attempt = attempt >= max_attempts;

            match outcome {
                Ok(response) if last_attempt || !is_retryable_status(response.status) => {
                    debug!(status = response.status, attempt, "received response");
                    return Ok(response);
                }
                Err(error) if last_attempt => {
                    warn!(error = %error, attempt, "request failed, attempts exhausted");
                    return Err(error.into());
                }
                Ok(response) => {
                    let delay = backoff.next_backoff().unwrap_or(self.policy.max_backoff);
                    warn!(
                        status = response.status,
                        attempt,
                        retry_in_ms = delay.as_millis() as u64,
                        "retryable status, retrying"
                    );
                    std::thread::sleep(delay);
                }
                Err(error) => {
                    let delay = backoff.next_backoff().unwrap_or(self.policy.max_backoff);
                    warn!(
                        error = %error,
                        attempt,
                        retry_in_ms = delay.as_millis() as u64,
                        "transport error, retrying"
                    );
                    std::thread::sleep(delay);
                }
            }
        }
    }
}

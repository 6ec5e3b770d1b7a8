//! Hand-written client for the v1 API.
//!
//! # Design
//! Unlike the v2 resource clients this one does no retries and no body
//! decoding: it checks the server once when constructed, then executes raw
//! requests and maps 200/404/401/other to a response or a typed error.
//! Callers decode the body themselves.

use std::fmt;
use std::sync::Arc;

use semver::{Comparator, Op, Prerelease, Version, VersionReq};
use tracing::{debug, error, warn};

use crate::error::{ApiError, Result, ZepError};
use crate::http::{merge_headers, HttpMethod, HttpRequest, HttpResponse};
use crate::transport::{Transport, UreqTransport};

pub const API_BASE_PATH: &str = "/api/v1";
pub const HEALTH_PATH: &str = "/healthz";
pub const VERSION_HEADER: &str = "X-Zep-Version";
pub const MIN_SERVER_VERSION: Version = Version::new(0, 16, 0);
pub const SERVER_ERROR_MESSAGE: &str = "Failed to connect to Zep server. Please check that the server is running, the API URL is correct, and no other process is using the same port";
pub const AUTHENTICATION_FAILED_MESSAGE: &str = "Authentication failed.";

/// Result of the health check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerStatus {
    pub version: Version,
    pub compatible: bool,
}

fn incompatible_version_warning() -> String {
    format!(
        "You are using an incompatible Zep server version. Please upgrade to {MIN_SERVER_VERSION} or later."
    )
}

/// Parse a server version. A leading `v` is tolerated and a short
/// `major` or `major.minor` is padded with zeros.
pub fn parse_server_version(raw: &str) -> Result<Version> {
    let trimmed = raw.trim();
    let trimmed = trimmed.strip_prefix('v').unwrap_or(trimmed);
    let split = trimmed.find(['-', '+']).unwrap_or(trimmed.len());
    let (core, suffix) = trimmed.split_at(split);
    let padded = match core.split('.').count() {
        1 => format!("{core}.0.0{suffix}"),
        2 => format!("{core}.0{suffix}"),
        _ => trimmed.to_string(),
    };
    Version::parse(&padded).map_err(|_| ZepError::Version(raw.to_string()))
}

/// `>= MIN_SERVER_VERSION`. Pre-releases never match, not even of newer
/// versions.
pub fn minimum_requirement() -> VersionReq {
    VersionReq {
        comparators: vec![Comparator {
            op: Op::GreaterEq,
            major: MIN_SERVER_VERSION.major,
            minor: Some(MIN_SERVER_VERSION.minor),
            patch: Some(MIN_SERVER_VERSION.patch),
            pre: Prerelease::EMPTY,
        }],
    }
}

pub fn meets_minimum_version(version: &Version) -> bool {
    minimum_requirement().matches(version)
}

/// Client for the v1 API with a server version gate.
#[derive(Clone)]
pub struct LegacyClient {
    server_url: String,
    headers: Vec<(String, String)>,
    transport: Arc<dyn Transport>,
}

impl fmt::Debug for LegacyClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LegacyClient")
            .field("server_url", &self.server_url)
            .field("authenticated", &!self.headers.is_empty())
            .finish_non_exhaustive()
    }
}

impl LegacyClient {
    /// Build a client and check the server. A failed check is logged, not
    /// returned; use [`LegacyClient::connect`] to fail fast instead.
    pub fn new(
        server_url: &str,
        api_key: Option<&str>,
        transport: Option<Arc<dyn Transport>>,
    ) -> Self {
        let client = Self::unchecked(server_url, api_key, transport);
        if let Err(e) = client.check_server() {
            error!(error = %e, server_url = %client.server_url, "Zep server check failed");
        }
        client
    }

    /// Build a client and return the health check's hard failures.
    pub fn connect(
        server_url: &str,
        api_key: Option<&str>,
        transport: Option<Arc<dyn Transport>>,
    ) -> Result<Self> {
        let client = Self::unchecked(server_url, api_key, transport);
        client.check_server()?;
        Ok(client)
    }

    fn unchecked(
        server_url: &str,
        api_key: Option<&str>,
        transport: Option<Arc<dyn Transport>>,
    ) -> Self {
        let mut headers = Vec::new();
        if let Some(key) = api_key.filter(|key| !key.is_empty()) {
            headers.push(("Authorization".to_string(), format!("Bearer {key}")));
        }
        let transport: Arc<dyn Transport> = match transport {
            Some(transport) => transport,
            None => Arc::new(UreqTransport::default()),
        };
        Self {
            server_url: server_url.trim_end_matches('/').to_string(),
            headers,
            transport,
        }
    }

    pub fn server_url(&self) -> &str {
        &self.server_url
    }

    /// `{server}/api/v1/{endpoint}`.
    pub fn full_url(&self, endpoint: &str) -> String {
        format!(
            "{}{API_BASE_PATH}/{}",
            self.server_url,
            endpoint.trim_start_matches('/')
        )
    }

    /// A request for `endpoint` carrying the client's headers.
    pub fn build_request(
        &self,
        method: HttpMethod,
        endpoint: &str,
        body: Option<String>,
    ) -> HttpRequest {
        let mut headers = self.headers.clone();
        if body.is_some() {
            headers = merge_headers(
                headers,
                &[("Content-Type".to_string(), "application/json".to_string())],
            );
        }
        HttpRequest {
            method,
            url: self.full_url(endpoint),
            headers,
            body,
        }
    }

    /// Fetch the health endpoint and compare the reported version against
    /// [`MIN_SERVER_VERSION`].
    ///
    /// An old version only warns; an unreachable server, a missing or
    /// unparseable version header or a non-200 status is an error.
    pub fn check_server(&self) -> Result<ServerStatus> {
        let request = HttpRequest {
            method: HttpMethod::Get,
            url: format!("{}{HEALTH_PATH}", self.server_url),
            headers: self.headers.clone(),
            body: None,
        };
        let response = self
            .transport
            .execute(&request)
            .map_err(|e| ZepError::Server(format!("{SERVER_ERROR_MESSAGE}: {e}")))?;

        let version = parse_server_version(response.header(VERSION_HEADER).unwrap_or_default())?;
        let compatible = meets_minimum_version(&version);
        if !compatible {
            warn!(server_version = %version, "{}", incompatible_version_warning());
        }

        if response.status != 200 {
            return Err(ZepError::Server(SERVER_ERROR_MESSAGE.to_string()));
        }

        debug!(server_version = %version, "Zep server is healthy");
        Ok(ServerStatus {
            version,
            compatible,
        })
    }

    /// Execute `request` once and map its status.
    pub fn handle_request(
        &self,
        request: &HttpRequest,
        not_found_message: &str,
    ) -> Result<HttpResponse> {
        let response = self
            .transport
            .execute(request)
            .map_err(|e| ZepError::Server(format!("{SERVER_ERROR_MESSAGE}: {e}")))?;

        match response.status {
            200 => Ok(response),
            404 => Err(ZepError::NotFound(ApiError::with_message(
                404,
                not_found_message,
                &response.body,
            ))),
            401 => Err(ZepError::Unauthorized(ApiError::with_message(
                401,
                AUTHENTICATION_FAILED_MESSAGE,
                &response.body,
            ))),
            status => Err(ZepError::Api(ApiError::with_message(
                status,
                format!("Got an unexpected status code: {status}"),
                &response.body,
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use tracing_test::traced_test;

    use super::*;
    use crate::caller::tests::ScriptedTransport;

    fn healthy(version: &str) -> ScriptedTransport {
        ScriptedTransport::new().respond_with_headers(
            200,
            vec![("x-zep-version".to_string(), version.to_string())],
            ".",
        )
    }

    fn shared(transport: &Arc<ScriptedTransport>) -> Option<Arc<dyn Transport>> {
        let transport: Arc<dyn Transport> = transport.clone();
        Some(transport)
    }

    fn owned(transport: ScriptedTransport) -> Option<Arc<dyn Transport>> {
        shared(&Arc::new(transport))
    }

    fn client_with(transport: ScriptedTransport) -> (LegacyClient, Arc<ScriptedTransport>) {
        let transport = Arc::new(transport);
        let client = LegacyClient::new("http://localhost:8000/", Some("z_key"), shared(&transport));
        (client, transport)
    }

    #[test]
    fn version_parsing() {
        assert_eq!(parse_server_version("0.17.2").unwrap(), Version::new(0, 17, 2));
        assert_eq!(parse_server_version("v0.16.0").unwrap(), Version::new(0, 16, 0));
        assert!(matches!(parse_server_version("latest"), Err(ZepError::Version(_))));
        assert!(matches!(parse_server_version(""), Err(ZepError::Version(_))));
    }

    #[test]
    fn short_versions_are_padded() {
        assert_eq!(parse_server_version("0.16").unwrap(), Version::new(0, 16, 0));
        assert_eq!(parse_server_version("v1").unwrap(), Version::new(1, 0, 0));
        let pre = parse_server_version("0.17-rc1").unwrap();
        assert_eq!((pre.major, pre.minor, pre.patch), (0, 17, 0));
        assert_eq!(pre.pre.as_str(), "rc1");
    }

    #[test]
    fn minimum_version_ordering() {
        assert!(meets_minimum_version(&Version::new(0, 16, 0)));
        assert!(meets_minimum_version(&Version::new(1, 0, 0)));
        assert!(!meets_minimum_version(&Version::new(0, 15, 9)));
        assert!(meets_minimum_version(&parse_server_version("0.16").unwrap()));
    }

    #[test]
    fn prereleases_do_not_meet_minimum() {
        assert!(!meets_minimum_version(&parse_server_version("0.16.0-rc1").unwrap()));
        assert!(!meets_minimum_version(&parse_server_version("0.17.0-beta.2").unwrap()));
        assert!(meets_minimum_version(&parse_server_version("0.16.0+build.7").unwrap()));
    }

    #[test]
    fn strips_trailing_slash_and_builds_urls() {
        let (client, _) = client_with(healthy("0.17.0"));
        assert_eq!(client.server_url(), "http://localhost:8000");
        assert_eq!(
            client.full_url("sessions/s1/memory"),
            "http://localhost:8000/api/v1/sessions/s1/memory"
        );
        assert_eq!(
            client.full_url("/sessions"),
            "http://localhost:8000/api/v1/sessions"
        );
    }

    #[test]
    fn health_check_hits_healthz_with_auth() {
        let (_, transport) = client_with(healthy("0.17.0"));
        let request = transport.last_request();
        assert_eq!(request.url, "http://localhost:8000/healthz");
        assert_eq!(request.header("authorization"), Some("Bearer z_key"));
    }

    #[test]
    fn no_auth_header_without_key() {
        let transport = Arc::new(healthy("0.17.0"));
        let client = LegacyClient::new("http://localhost:8000", None, shared(&transport));
        assert!(transport.last_request().headers.is_empty());
        let request = client.build_request(HttpMethod::Get, "sessions", None);
        assert!(request.headers.is_empty());
    }

    #[test]
    fn check_server_reports_compatible_version() {
        let client = LegacyClient::connect(
            "http://localhost:8000",
            None,
            owned(healthy("0.17.0").respond_with_headers(
                200,
                vec![("X-Zep-Version".to_string(), "0.17.0".to_string())],
                ".",
            )),
        )
        .unwrap();
        let status = client.check_server().unwrap();
        assert_eq!(status.version, Version::new(0, 17, 0));
        assert!(status.compatible);
    }

    #[traced_test]
    #[test]
    fn old_server_only_warns() {
        let client = LegacyClient::connect(
            "http://localhost:8000",
            None,
            owned(healthy("0.15.1")),
        );
        assert!(client.is_ok());
        assert!(logs_contain("incompatible Zep server version"));
    }

    #[test]
    fn missing_version_header_is_an_error() {
        let transport = ScriptedTransport::new().respond(200, ".");
        let err = LegacyClient::connect("http://localhost:8000", None, owned(transport))
            .unwrap_err();
        assert!(matches!(err, ZepError::Version(raw) if raw.is_empty()));
    }

    #[traced_test]
    #[test]
    fn prerelease_server_only_warns() {
        let client = LegacyClient::connect(
            "http://localhost:8000",
            None,
            owned(healthy("0.16.0-rc1").respond_with_headers(
                200,
                vec![("x-zep-version".to_string(), "0.16.0-rc1".to_string())],
                ".",
            )),
        )
        .unwrap();
        assert!(logs_contain("Please upgrade to 0.16.0 or later"));
        let status = client.check_server().unwrap();
        assert!(!status.compatible);
        assert_eq!(status.version.pre.as_str(), "rc1");
    }

    #[test]
    fn unhealthy_server_is_a_hard_failure() {
        let transport = ScriptedTransport::new().respond_with_headers(
            503,
            vec![("x-zep-version".to_string(), "0.17.0".to_string())],
            "starting",
        );
        let err = LegacyClient::connect("http://localhost:8000", None, owned(transport))
            .unwrap_err();
        match err {
            ZepError::Server(message) => assert_eq!(message, SERVER_ERROR_MESSAGE),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn garbage_version_header_is_an_error() {
        let err = LegacyClient::connect(
            "http://localhost:8000",
            None,
            owned(healthy("not-a-version")),
        )
        .unwrap_err();
        assert!(matches!(err, ZepError::Version(raw) if raw == "not-a-version"));
    }

    #[traced_test]
    #[test]
    fn new_logs_instead_of_failing() {
        let transport = ScriptedTransport::new().fail("connection refused");
        let client = LegacyClient::new("http://localhost:8000", None, owned(transport));
        assert_eq!(client.server_url(), "http://localhost:8000");
        assert!(logs_contain("Zep server check failed"));
    }

    #[test]
    fn handle_request_maps_statuses() {
        let transport = healthy("0.17.0")
            .respond(200, r#"{"messages":[]}"#)
            .respond(404, "")
            .respond(401, "")
            .respond(418, "teapot")
            .fail("connection reset");
        let (client, _) = client_with(transport);
        let request = client.build_request(HttpMethod::Get, "sessions/s1/memory", None);

        let ok = client.handle_request(&request, "session not found").unwrap();
        assert_eq!(ok.body, r#"{"messages":[]}"#);

        match client.handle_request(&request, "session not found").unwrap_err() {
            ZepError::NotFound(error) => {
                assert_eq!(error.message.as_deref(), Some("session not found"))
            }
            other => panic!("unexpected error: {other:?}"),
        }

        match client.handle_request(&request, "session not found").unwrap_err() {
            ZepError::Unauthorized(error) => {
                assert_eq!(error.message.as_deref(), Some(AUTHENTICATION_FAILED_MESSAGE))
            }
            other => panic!("unexpected error: {other:?}"),
        }

        match client.handle_request(&request, "session not found").unwrap_err() {
            ZepError::Api(error) => {
                assert_eq!(error.status, 418);
                assert_eq!(
                    error.message.as_deref(),
                    Some("Got an unexpected status code: 418")
                );
                assert_eq!(error.body, "teapot");
            }
            other => panic!("unexpected error: {other:?}"),
        }

        match client.handle_request(&request, "session not found").unwrap_err() {
            ZepError::Server(message) => {
                assert!(message.starts_with(SERVER_ERROR_MESSAGE));
                assert!(message.ends_with("connection reset"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn build_request_sets_json_content_type_for_bodies() {
        let (client, _) = client_with(healthy("0.17.0"));
        let request = client.build_request(HttpMethod::Post, "sessions", Some("{}".to_string()));
        assert_eq!(request.method, HttpMethod::Post);
        assert_eq!(request.header("content-type"), Some("application/json"));
        assert_eq!(request.header("authorization"), Some("Bearer z_key"));
    }
}

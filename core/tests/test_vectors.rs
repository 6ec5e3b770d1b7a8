//! Verify request building and error decoding against JSON test vectors
//! stored in `test-vectors/`.
//!
//! Bodies are compared as parsed JSON and query pairs as sorted lists, so
//! field ordering never causes false negatives.

use std::sync::Arc;

use zep_core::types::{
    AddMemoryRequest, GetMemoryRequest, ListSessionsRequest, MemorySearchPayload,
    UpdateUserRequest,
};
use zep_core::{
    Client, ClientOptions, ErrorDecoder, HttpMethod, HttpRequest, HttpResponse, RequestOptions,
    Transport, TransportError, ZepError,
};

const BASE_URL: &str = "http://localhost:8000/api/v2";

/// Never reached: vectors only exercise the `build_*` side.
struct Offline;

impl Transport for Offline {
    fn execute(&self, _request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        Err(TransportError("offline".to_string()))
    }
}

fn client() -> Client {
    Client::new(
        ClientOptions::new()
            .with_base_url(BASE_URL)
            .with_api_key("z_key")
            .with_transport(Arc::new(Offline)),
    )
}

/// Parse the method string from test vectors into `HttpMethod`.
fn parse_method(s: &str) -> HttpMethod {
    match s {
        "GET" => HttpMethod::Get,
        "POST" => HttpMethod::Post,
        "PUT" => HttpMethod::Put,
        "PATCH" => HttpMethod::Patch,
        "DELETE" => HttpMethod::Delete,
        other => panic!("unknown method: {other}"),
    }
}

fn build(c: &Client, case: &serde_json::Value) -> HttpRequest {
    let opts = RequestOptions::new();
    let input = case["input"].clone();
    let session_id = case["session_id"].as_str().unwrap_or_default();
    let user_id = case["user_id"].as_str().unwrap_or_default();

    match case["operation"].as_str().unwrap() {
        "search.get" => {
            let mut payload: MemorySearchPayload = serde_json::from_value(input).unwrap();
            payload.limit = case["limit"].as_u64().map(|limit| limit as u32);
            c.search.build_get(session_id, &payload, &opts)
        }
        "memory.get" => {
            let request: GetMemoryRequest = serde_json::from_value(input).unwrap();
            c.memory.build_get(session_id, &request, &opts)
        }
        "memory.add" => {
            let request: AddMemoryRequest = serde_json::from_value(input).unwrap();
            c.memory.build_add(session_id, &request, &opts)
        }
        "memory.list_sessions" => {
            let request: ListSessionsRequest = serde_json::from_value(input).unwrap();
            c.memory.build_list_sessions(&request, &opts)
        }
        "user.update" => {
            let request: UpdateUserRequest = serde_json::from_value(input).unwrap();
            c.user.build_update(user_id, &request, &opts)
        }
        "user.delete" => c.user.build_delete(user_id, &opts),
        other => panic!("unknown operation: {other}"),
    }
    .unwrap()
}

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

#[test]
fn request_test_vectors() {
    let raw = include_str!("../../test-vectors/requests.json");
    let vectors: serde_json::Value = serde_json::from_str(raw).unwrap();

    let c = client();
    for case in vectors["cases"].as_array().unwrap() {
        let name = case["name"].as_str().unwrap();
        let expected_req = &case["expected_request"];
        let req = build(&c, case);

        assert_eq!(req.method, parse_method(expected_req["method"].as_str().unwrap()), "{name}: method");

        let url = url::Url::parse(&req.url).unwrap();
        assert_eq!(
            url.path(),
            format!("/api/v2{}", expected_req["path"].as_str().unwrap()),
            "{name}: path"
        );

        let mut query: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        query.sort();
        let expected_query: Vec<(String, String)> = expected_req["query"]
            .as_array()
            .unwrap()
            .iter()
            .map(|pair| {
                let arr = pair.as_array().unwrap();
                (arr[0].as_str().unwrap().to_string(), arr[1].as_str().unwrap().to_string())
            })
            .collect();
        assert_eq!(query, expected_query, "{name}: query");
        if expected_query.is_empty() {
            assert!(url.query().is_none(), "{name}: no '?' without params");
        }

        assert_eq!(req.header("authorization"), Some("Api-Key z_key"), "{name}: auth");

        match &req.body {
            Some(body) => {
                let body: serde_json::Value = serde_json::from_str(body).unwrap();
                assert_eq!(body, expected_req["body"], "{name}: body");
                assert_eq!(req.header("content-type"), Some("application/json"), "{name}: content type");
            }
            None => assert!(expected_req["body"].is_null(), "{name}: body should be None"),
        }
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[test]
fn error_test_vectors() {
    let raw = include_str!("../../test-vectors/errors.json");
    let vectors: serde_json::Value = serde_json::from_str(raw).unwrap();

    for case in vectors["cases"].as_array().unwrap() {
        let name = case["name"].as_str().unwrap();
        let decoder = match case["decoder"].as_str().unwrap() {
            "standard" => ErrorDecoder::STANDARD,
            "with_bad_request" => ErrorDecoder::WITH_BAD_REQUEST,
            other => panic!("{name}: unknown decoder {other}"),
        };
        let response = HttpResponse {
            status: case["status"].as_u64().unwrap() as u16,
            headers: Vec::new(),
            body: case["body"].as_str().unwrap().to_string(),
        };

        let err = zep_core::caller::parse_response::<serde_json::Value>(response.clone(), decoder)
            .unwrap_err();
        let kind = match &err {
            ZepError::BadRequest(_) => "BadRequest",
            ZepError::Unauthorized(_) => "Unauthorized",
            ZepError::NotFound(_) => "NotFound",
            ZepError::InternalServerError(_) => "InternalServerError",
            ZepError::Api(_) => "Api",
            other => panic!("{name}: unexpected error {other:?}"),
        };
        assert_eq!(kind, case["expected_error"].as_str().unwrap(), "{name}: kind");

        let api_error = err.api_error().unwrap();
        assert_eq!(api_error.status, response.status, "{name}: status");
        assert_eq!(api_error.body, response.body, "{name}: raw body kept");
        assert_eq!(
            api_error.message.as_deref(),
            case["expected_message"].as_str(),
            "{name}: message"
        );
    }
}

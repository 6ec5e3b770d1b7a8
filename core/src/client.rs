//! Entry point bundling every resource client.
//!
//! # Design
//! `Client` holds no state of its own. It builds one [`Caller`] from the
//! options and hands clones of it to each resource, so all resources share
//! a single transport and its connection pool.

use crate::options::ClientOptions;
use crate::resources::{MemoryClient, SearchClient, UserClient};

/// Client for the Zep v2 API.
///
/// ```no_run
/// use zep_core::{Client, ClientOptions, RequestOptions};
/// use zep_core::types::GetMemoryRequest;
///
/// let client = Client::new(ClientOptions::from_env());
/// let memory = client
///     .memory
///     .get("session-1", &GetMemoryRequest { lastn: Some(10) }, &RequestOptions::new())?;
/// println!("{} messages", memory.messages.len());
/// # Ok::<(), zep_core::ZepError>(())
/// ```
#[derive(Debug, Clone)]
pub struct Client {
    pub memory: MemoryClient,
    pub search: SearchClient,
    pub user: UserClient,
}

impl Client {
    pub fn new(options: ClientOptions) -> Self {
        let caller = options.caller();
        Self {
            memory: MemoryClient::with_caller(&options, caller.clone()),
            search: SearchClient::with_caller(&options, caller.clone()),
            user: UserClient::with_caller(&options, caller),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::caller::tests::{instant_retries, ScriptedTransport};
    use crate::options::RequestOptions;
    use crate::types::{GetMemoryRequest, MemorySearchPayload};

    #[test]
    fn resources_share_one_transport() {
        let transport = Arc::new(
            ScriptedTransport::new()
                .respond(200, r#"{"user_id":"ada"}"#)
                .respond(200, r#"{"messages":[]}"#)
                .respond(200, "[]"),
        );
        let client = Client::new(
            ClientOptions::new()
                .with_base_url("http://localhost:8000/api/v2")
                .with_transport(transport.clone())
                .with_retry(instant_retries(1)),
        );
        let opts = RequestOptions::new();

        client.user.get("ada", &opts).unwrap();
        client.memory.get("s1", &GetMemoryRequest::default(), &opts).unwrap();
        client
            .search
            .get("s1", &MemorySearchPayload::default(), &opts)
            .unwrap();

        let urls: Vec<String> = transport
            .seen
            .lock()
            .unwrap()
            .iter()
            .map(|request| request.url.clone())
            .collect();
        assert_eq!(
            urls,
            vec![
                "http://localhost:8000/api/v2/users/ada",
                "http://localhost:8000/api/v2/sessions/s1/memory",
                "http://localhost:8000/api/v2/sessions/s1/search",
            ]
        );
    }

    #[test]
    fn defaults_to_production_base_url() {
        let transport = Arc::new(ScriptedTransport::new());
        let client = Client::new(ClientOptions::new().with_transport(transport));
        let request = client.user.build_get("ada", &RequestOptions::new()).unwrap();
        assert_eq!(request.url, "https://api.getzep.com/api/v2/users/ada");
    }
}

use std::sync::{Arc, Mutex, PoisonError};

use http::{header, HeaderValue, StatusCode};
use school_types::{LoginRequest, RefreshRequest, RefreshedAccess, RegisterRequest, TokenPair};
use tracing::{debug, info, warn};

use crate::endpoints;
use crate::error::{Result, SessionError, TransportError};
use crate::storage::{TokenStore, ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY};
use crate::transport::{ApiRequest, ApiResponse, Transport};

#[derive(Clone, Debug, Default, PartialEq)]
struct Tokens {
    access: Option<String>,
    refresh: Option<String>,
}

enum RefreshOutcome {
    Renewed(String),
    Rejected(StatusCode),
}

/// Client-held session: the access/refresh token pair plus the transport
/// every authorized request goes through.
///
/// Shared behind an `Arc`. Concurrent calls that each receive a 401 refresh
/// independently; the last token written wins.
pub struct SessionClient {
    transport: Arc<dyn Transport>,
    store: Arc<dyn TokenStore>,
    tokens: Mutex<Tokens>,
}

impl SessionClient {
    /// Creates a session with no tokens in memory, whatever the store holds.
    pub fn new(transport: Arc<dyn Transport>, store: Arc<dyn TokenStore>) -> Self {
        Self {
            transport,
            store,
            tokens: Mutex::new(Tokens::default()),
        }
    }

    /// Creates a session seeded with the tokens persisted in `store`.
    pub fn restore(transport: Arc<dyn Transport>, store: Arc<dyn TokenStore>) -> Result<Self> {
        let tokens = Tokens {
            access: store.get(ACCESS_TOKEN_KEY)?,
            refresh: store.get(REFRESH_TOKEN_KEY)?,
        };
        debug!(
            "restored session: access={} refresh={}",
            tokens.access.is_some(),
            tokens.refresh.is_some()
        );

        Ok(Self {
            transport,
            store,
            tokens: Mutex::new(tokens),
        })
    }

    pub fn access_token(&self) -> Option<String> {
        self.lock_tokens().access.clone()
    }

    pub fn refresh_token(&self) -> Option<String> {
        self.lock_tokens().refresh.clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.lock_tokens().access.is_some()
    }

    /// Exchanges credentials for a token pair and stores both tokens.
    ///
    /// Any non-success status yields [`SessionError::InvalidCredentials`] and
    /// leaves the current session as it was.
    pub async fn login(&self, username: &str, password: &str) -> Result<()> {
        let request = ApiRequest::post_json(
            endpoints::TOKEN,
            &LoginRequest {
                username: username.to_string(),
                password: password.to_string(),
            },
        )?;

        let response = self.transport.send(request).await?;
        if !response.is_success() {
            debug!("login for {username} rejected with {}", response.status);
            return Err(SessionError::InvalidCredentials);
        }

        let pair: TokenPair = response.json()?;

        self.store.set_all(&[
            (ACCESS_TOKEN_KEY, pair.access.as_str()),
            (REFRESH_TOKEN_KEY, pair.refresh.as_str()),
        ])?;
        *self.lock_tokens() = Tokens {
            access: Some(pair.access),
            refresh: Some(pair.refresh),
        };

        info!("logged in as {username}");
        Ok(())
    }

    /// Creates an account. Does not log in.
    pub async fn register(&self, username: &str, password: &str, email: &str) -> Result<()> {
        let request = ApiRequest::post_json(
            endpoints::REGISTER,
            &RegisterRequest {
                username: username.to_string(),
                password: password.to_string(),
                email: email.to_string(),
            },
        )?;

        let response = self.transport.send(request).await?;
        if response.is_success() {
            info!("registered {username}");
            return Ok(());
        }

        let text = response.text();
        let message = if text.trim().is_empty() {
            let reason = response.status.canonical_reason().unwrap_or("");
            format!("{} {reason}", response.status.as_u16())
        } else {
            text
        };
        Err(SessionError::RegistrationRejected(message))
    }

    /// Drops both tokens from memory and storage. Always succeeds.
    pub fn logout(&self) {
        self.clear_tokens();
        info!("logged out");
    }

    /// Issues `request` with the current bearer token.
    ///
    /// A 401 with a refresh token on hand triggers one refresh. On success
    /// the request is reissued once with the new access token and that
    /// response is returned; a second 401 comes back untouched. If the
    /// refresh is rejected the session is cleared and the original 401 is
    /// returned. Transport failures propagate.
    pub async fn authorized_fetch(&self, request: ApiRequest) -> Result<ApiResponse> {
        let access = self.access_token();
        let response = self.send_with_bearer(&request, access.as_deref()).await?;
        if response.status != StatusCode::UNAUTHORIZED {
            return Ok(response);
        }

        let Some(refresh) = self.refresh_token() else {
            debug!("401 on {} with no refresh token", request.path);
            return Ok(response);
        };

        match self.refresh_access(&refresh).await? {
            RefreshOutcome::Renewed(newAccess) => {
                debug!("retrying {} with refreshed token", request.path);
                self.send_with_bearer(&request, Some(newAccess.as_str())).await
            }
            RefreshOutcome::Rejected(status) => {
                warn!("token refresh rejected with {status}, session cleared");
                self.clear_tokens();
                Ok(response)
            }
        }
    }

    async fn send_with_bearer(
        &self,
        request: &ApiRequest,
        token: Option<&str>,
    ) -> Result<ApiResponse> {
        let mut outgoing = request.clone();
        match token {
            Some(token) => {
                let value = HeaderValue::from_str(&format!("Bearer {token}")).map_err(|e| {
                    TransportError::InvalidRequest(format!("unusable access token: {e}"))
                })?;
                outgoing.headers.insert(header::AUTHORIZATION, value);
            }
            None => {
                outgoing.headers.remove(header::AUTHORIZATION);
            }
        }

        Ok(self.transport.send(outgoing).await?)
    }

    async fn refresh_access(&self, refresh: &str) -> Result<RefreshOutcome> {
        let request = ApiRequest::post_json(
            endpoints::TOKEN_REFRESH,
            &RefreshRequest {
                refresh: refresh.to_string(),
            },
        )?;

        let response = self.transport.send(request).await?;
        if !response.is_success() {
            return Ok(RefreshOutcome::Rejected(response.status));
        }

        let renewed: RefreshedAccess = response.json()?;

        let mut updates = vec![(ACCESS_TOKEN_KEY, renewed.access.as_str())];
        if let Some(rotated) = &renewed.refresh {
            updates.push((REFRESH_TOKEN_KEY, rotated.as_str()));
        }
        self.store.set_all(&updates)?;

        let mut tokens = self.lock_tokens();
        tokens.access = Some(renewed.access.clone());
        if let Some(rotated) = renewed.refresh {
            tokens.refresh = Some(rotated);
        }
        drop(tokens);

        debug!("access token refreshed");
        Ok(RefreshOutcome::Renewed(renewed.access))
    }

    fn clear_tokens(&self) {
        *self.lock_tokens() = Tokens::default();

        for key in [ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY] {
            if let Err(e) = self.store.remove(key) {
                warn!("failed to remove {key} from token store: {e}");
            }
        }
    }

    fn lock_tokens(&self) -> std::sync::MutexGuard<'_, Tokens> {
        self.tokens.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for SessionClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let tokens = self.lock_tokens();
        f.debug_struct("SessionClient")
            .field("authenticated", &tokens.access.is_some())
            .field("can_refresh", &tokens.refresh.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;

    use async_trait::async_trait;
    use serde_json::json;

    use super::*;
    use crate::storage::MemoryStore;

    /// Replays canned responses in order and records every request sent.
    #[derive(Default)]
    struct ScriptedTransport {
        responses: Mutex<VecDeque<std::result::Result<ApiResponse, TransportError>>>,
        requests: Mutex<Vec<ApiRequest>>,
    }

    impl ScriptedTransport {
        fn with(responses: Vec<std::result::Result<ApiResponse, TransportError>>) -> Arc<Self> {
            Arc::new(Self {
                responses: Mutex::new(responses.into()),
                requests: Mutex::new(Vec::new()),
            })
        }

        fn sent(&self) -> Vec<ApiRequest> {
            self.requests.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Transport for ScriptedTransport {
        async fn send(
            &self,
            request: ApiRequest,
        ) -> std::result::Result<ApiResponse, TransportError> {
            self.requests.lock().unwrap().push(request);
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .expect("unexpected request")
        }
    }

    fn ok_json(body: serde_json::Value) -> std::result::Result<ApiResponse, TransportError> {
        Ok(ApiResponse::json_body(StatusCode::OK, &body).unwrap())
    }

    fn status(code: StatusCode) -> std::result::Result<ApiResponse, TransportError> {
        Ok(ApiResponse::new(code, format!("status {}", code.as_u16())))
    }

    fn seeded_store(access: Option<&str>, refresh: Option<&str>) -> Arc<MemoryStore> {
        let store = Arc::new(MemoryStore::new());
        if let Some(access) = access {
            store.set(ACCESS_TOKEN_KEY, access).unwrap();
        }
        if let Some(refresh) = refresh {
            store.set(REFRESH_TOKEN_KEY, refresh).unwrap();
        }
        store
    }

    fn session(
        transport: &Arc<ScriptedTransport>,
        store: &Arc<MemoryStore>,
    ) -> SessionClient {
        SessionClient::restore(transport.clone(), store.clone()).unwrap()
    }

    #[tokio::test]
    async fn login_stores_both_tokens_and_authorizes_next_fetch() {
        let transport = ScriptedTransport::with(vec![
            ok_json(json!({"access": "A1", "refresh": "R1"})),
            ok_json(json!([])),
        ]);
        let store = seeded_store(None, None);
        let client = session(&transport, &store);

        client.login("alice", "pw").await.unwrap();
        assert_eq!(store.get(ACCESS_TOKEN_KEY).unwrap().as_deref(), Some("A1"));
        assert_eq!(store.get(REFRESH_TOKEN_KEY).unwrap().as_deref(), Some("R1"));
        assert_eq!(client.access_token().as_deref(), Some("A1"));

        client
            .authorized_fetch(ApiRequest::get("/api/schools/"))
            .await
            .unwrap();

        let sent = transport.sent();
        assert_eq!(sent[0].path, endpoints::TOKEN);
        assert_eq!(
            sent[0].body.as_deref(),
            Some(br#"{"username":"alice","password":"pw"}"#.as_slice())
        );
        assert_eq!(sent[1].bearer_token(), Some("A1"));
    }

    #[tokio::test]
    async fn rejected_login_leaves_prior_session_untouched() {
        let transport = ScriptedTransport::with(vec![status(StatusCode::UNAUTHORIZED)]);
        let store = seeded_store(Some("A0"), Some("R0"));
        let client = session(&transport, &store);

        let err = client.login("alice", "wrong").await.unwrap_err();
        assert!(matches!(err, SessionError::InvalidCredentials));
        assert_eq!(client.access_token().as_deref(), Some("A0"));
        assert_eq!(store.get(REFRESH_TOKEN_KEY).unwrap().as_deref(), Some("R0"));
    }

    /// Memory store whose writes to one key always fail.
    struct FailingStore {
        inner: MemoryStore,
        failing_key: &'static str,
    }

    impl TokenStore for FailingStore {
        fn get(&self, key: &str) -> std::result::Result<Option<String>, crate::StorageError> {
            self.inner.get(key)
        }

        fn set(&self, key: &str, value: &str) -> std::result::Result<(), crate::StorageError> {
            if key == self.failing_key {
                return Err(crate::StorageError::Corrupt("disk full".into()));
            }
            self.inner.set(key, value)
        }

        fn remove(&self, key: &str) -> std::result::Result<(), crate::StorageError> {
            self.inner.remove(key)
        }
    }

    fn failing_store(access: Option<&str>, refresh: Option<&str>) -> Arc<FailingStore> {
        let inner = MemoryStore::new();
        if let Some(access) = access {
            inner.set(ACCESS_TOKEN_KEY, access).unwrap();
        }
        if let Some(refresh) = refresh {
            inner.set(REFRESH_TOKEN_KEY, refresh).unwrap();
        }
        Arc::new(FailingStore {
            inner,
            failing_key: REFRESH_TOKEN_KEY,
        })
    }

    #[tokio::test]
    async fn login_storage_failure_keeps_store_and_memory_in_step() {
        let transport = ScriptedTransport::with(vec![ok_json(
            json!({"access": "A1", "refresh": "R1"}),
        )]);
        let store = failing_store(None, None);
        let client = SessionClient::new(transport.clone(), store.clone());

        let err = client.login("alice", "pw").await.unwrap_err();
        assert!(matches!(err, SessionError::Storage(_)));

        assert_eq!(client.access_token(), None);
        assert_eq!(store.get(ACCESS_TOKEN_KEY).unwrap(), None);
        assert_eq!(store.get(REFRESH_TOKEN_KEY).unwrap(), None);
    }

    #[tokio::test]
    async fn refresh_storage_failure_keeps_previous_tokens() {
        let transport = ScriptedTransport::with(vec![
            status(StatusCode::UNAUTHORIZED),
            ok_json(json!({"access": "A2", "refresh": "R2"})),
        ]);
        let store = failing_store(Some("A1"), Some("R1"));
        let client = SessionClient::restore(transport.clone(), store.clone()).unwrap();

        let err = client
            .authorized_fetch(ApiRequest::get("/api/schools/"))
            .await
            .unwrap_err();
        assert!(matches!(err, SessionError::Storage(_)));

        assert_eq!(client.access_token().as_deref(), Some("A1"));
        assert_eq!(client.refresh_token().as_deref(), Some("R1"));
        assert_eq!(store.get(ACCESS_TOKEN_KEY).unwrap().as_deref(), Some("A1"));
        assert_eq!(store.get(REFRESH_TOKEN_KEY).unwrap().as_deref(), Some("R1"));
        assert_eq!(transport.sent().len(), 2);
    }

    #[tokio::test]
    async fn fetch_without_access_token_sends_no_authorization_header() {
        let transport = ScriptedTransport::with(vec![status(StatusCode::OK)]);
        let store = seeded_store(None, None);
        let client = session(&transport, &store);

        let request = ApiRequest::get("/api/schools/").with_header(
            header::AUTHORIZATION,
            HeaderValue::from_static("Bearer stale"),
        );
        client.authorized_fetch(request).await.unwrap();

        assert!(transport.sent()[0].headers.get(header::AUTHORIZATION).is_none());
    }

    #[tokio::test]
    async fn non_401_responses_pass_through_without_refresh() {
        for code in [StatusCode::OK, StatusCode::FORBIDDEN, StatusCode::INTERNAL_SERVER_ERROR] {
            let transport = ScriptedTransport::with(vec![status(code)]);
            let store = seeded_store(Some("A1"), Some("R1"));
            let client = session(&transport, &store);

            let response = client
                .authorized_fetch(ApiRequest::get("/api/schools/"))
                .await
                .unwrap();

            assert_eq!(response.status, code);
            assert_eq!(response.text(), format!("status {}", code.as_u16()));
            assert_eq!(transport.sent().len(), 1);
            assert_eq!(client.access_token().as_deref(), Some("A1"));
        }
    }

    #[tokio::test]
    async fn unauthorized_without_refresh_token_returns_original_response() {
        let transport = ScriptedTransport::with(vec![status(StatusCode::UNAUTHORIZED)]);
        let store = seeded_store(Some("A1"), None);
        let client = session(&transport, &store);

        let response = client
            .authorized_fetch(ApiRequest::get("/api/schools/"))
            .await
            .unwrap();

        assert_eq!(response.status, StatusCode::UNAUTHORIZED);
        assert_eq!(transport.sent().len(), 1);
    }

    #[tokio::test]
    async fn successful_refresh_retries_once_with_new_token() {
        let transport = ScriptedTransport::with(vec![
            status(StatusCode::UNAUTHORIZED),
            ok_json(json!({"access": "A2"})),
            ok_json(json!([{"id": 1, "name": "North"}])),
        ]);
        let store = seeded_store(Some("A1"), Some("R1"));
        let client = session(&transport, &store);

        let request = ApiRequest::post_json("/api/schools/", &json!({"name": "North"})).unwrap();
        let response = client.authorized_fetch(request).await.unwrap();
        assert_eq!(response.status, StatusCode::OK);

        let sent = transport.sent();
        assert_eq!(sent.len(), 3);
        assert_eq!(sent[0].bearer_token(), Some("A1"));
        assert_eq!(sent[1].path, endpoints::TOKEN_REFRESH);
        assert_eq!(sent[1].body.as_deref(), Some(br#"{"refresh":"R1"}"#.as_slice()));
        assert_eq!(sent[2].bearer_token(), Some("A2"));
        assert_eq!(sent[2].path, "/api/schools/");
        assert_eq!(sent[2].body, sent[0].body);
        assert_eq!(
            sent[2].headers.get(header::CONTENT_TYPE).unwrap(),
            "application/json"
        );

        assert_eq!(store.get(ACCESS_TOKEN_KEY).unwrap().as_deref(), Some("A2"));
        assert_eq!(store.get(REFRESH_TOKEN_KEY).unwrap().as_deref(), Some("R1"));
        assert_eq!(client.access_token().as_deref(), Some("A2"));
    }

    #[tokio::test]
    async fn rotated_refresh_token_is_stored() {
        let transport = ScriptedTransport::with(vec![
            status(StatusCode::UNAUTHORIZED),
            ok_json(json!({"access": "A2", "refresh": "R2"})),
            status(StatusCode::OK),
        ]);
        let store = seeded_store(Some("A1"), Some("R1"));
        let client = session(&transport, &store);

        client
            .authorized_fetch(ApiRequest::get("/api/profiles/"))
            .await
            .unwrap();

        assert_eq!(store.get(REFRESH_TOKEN_KEY).unwrap().as_deref(), Some("R2"));
        assert_eq!(client.refresh_token().as_deref(), Some("R2"));
    }

    #[tokio::test]
    async fn second_unauthorized_after_retry_is_returned_as_is() {
        let transport = ScriptedTransport::with(vec![
            status(StatusCode::UNAUTHORIZED),
            ok_json(json!({"access": "A2"})),
            Ok(ApiResponse::new(StatusCode::UNAUTHORIZED, "still no")),
        ]);
        let store = seeded_store(Some("A1"), Some("R1"));
        let client = session(&transport, &store);

        let response = client
            .authorized_fetch(ApiRequest::get("/api/schools/"))
            .await
            .unwrap();

        assert_eq!(response.status, StatusCode::UNAUTHORIZED);
        assert_eq!(response.text(), "still no");
        assert_eq!(transport.sent().len(), 3);
        assert_eq!(client.access_token().as_deref(), Some("A2"));
    }

    #[tokio::test]
    async fn rejected_refresh_clears_session_and_returns_original_401() {
        let transport = ScriptedTransport::with(vec![
            Ok(ApiResponse::new(StatusCode::UNAUTHORIZED, "original")),
            Ok(ApiResponse::new(StatusCode::BAD_REQUEST, "refresh failed")),
        ]);
        let store = seeded_store(Some("A1"), Some("R1"));
        let client = session(&transport, &store);

        let response = client
            .authorized_fetch(ApiRequest::get("/api/schools/"))
            .await
            .unwrap();

        assert_eq!(response.status, StatusCode::UNAUTHORIZED);
        assert_eq!(response.text(), "original");
        assert_eq!(transport.sent().len(), 2);
        assert_eq!(store.get(ACCESS_TOKEN_KEY).unwrap(), None);
        assert_eq!(store.get(REFRESH_TOKEN_KEY).unwrap(), None);
        assert!(!client.is_authenticated());
        assert_eq!(client.refresh_token(), None);
    }

    #[tokio::test]
    async fn transport_failure_during_refresh_propagates() {
        let transport = ScriptedTransport::with(vec![
            status(StatusCode::UNAUTHORIZED),
            Err(TransportError::Connection("connection reset".into())),
        ]);
        let store = seeded_store(Some("A1"), Some("R1"));
        let client = session(&transport, &store);

        let err = client
            .authorized_fetch(ApiRequest::get("/api/schools/"))
            .await
            .unwrap_err();

        assert!(matches!(err, SessionError::Transport(TransportError::Connection(_))));
        assert_eq!(client.access_token().as_deref(), Some("A1"));
        assert_eq!(store.get(REFRESH_TOKEN_KEY).unwrap().as_deref(), Some("R1"));
    }

    #[tokio::test]
    async fn transport_failure_on_primary_request_propagates() {
        let transport = ScriptedTransport::with(vec![Err(TransportError::Connection(
            "refused".into(),
        ))]);
        let store = seeded_store(Some("A1"), Some("R1"));
        let client = session(&transport, &store);

        let err = client
            .authorized_fetch(ApiRequest::get("/api/schools/"))
            .await
            .unwrap_err();
        assert!(matches!(err, SessionError::Transport(_)));
        assert_eq!(transport.sent().len(), 1);
    }

    #[tokio::test]
    async fn logout_then_fetch_behaves_as_unauthenticated() {
        let transport = ScriptedTransport::with(vec![status(StatusCode::UNAUTHORIZED)]);
        let store = seeded_store(Some("A1"), Some("R1"));
        let client = session(&transport, &store);

        client.logout();
        client.logout();
        assert_eq!(store.get(ACCESS_TOKEN_KEY).unwrap(), None);
        assert_eq!(store.get(REFRESH_TOKEN_KEY).unwrap(), None);

        let response = client
            .authorized_fetch(ApiRequest::get("/api/schools/"))
            .await
            .unwrap();

        assert_eq!(response.status, StatusCode::UNAUTHORIZED);
        let sent = transport.sent();
        assert_eq!(sent.len(), 1);
        assert!(sent[0].headers.get(header::AUTHORIZATION).is_none());
    }

    #[tokio::test]
    async fn register_reports_body_text_or_status_line() {
        let transport = ScriptedTransport::with(vec![
            Ok(ApiResponse::new(StatusCode::CREATED, "")),
            Ok(ApiResponse::new(StatusCode::BAD_REQUEST, r#"{"username":["taken"]}"#)),
            Ok(ApiResponse::new(StatusCode::INTERNAL_SERVER_ERROR, "")),
        ]);
        let store = seeded_store(None, None);
        let client = session(&transport, &store);

        client.register("bob", "pw", "bob@example.com").await.unwrap();
        assert!(!client.is_authenticated());

        let err = client.register("bob", "pw", "bob@example.com").await.unwrap_err();
        assert_eq!(err.to_string(), r#"{"username":["taken"]}"#);

        let err = client.register("bob", "pw", "bob@example.com").await.unwrap_err();
        assert_eq!(err.to_string(), "500 Internal Server Error");

        assert_eq!(transport.sent()[0].path, endpoints::REGISTER);
    }
}

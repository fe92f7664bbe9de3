// LuCI RPC session
//
// Owns the auth token and drives every call through the same pipeline:
// encode, send, classify, decode. A 401/403 on a UCI call triggers one
// login followed by exactly one retry of the original call.

use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, warn};
use url::Url;

use crate::auth::{AUTH_ENDPOINT, Credentials, METHOD_LOGIN, RPC_PATH, SessionConfig, UCI_ENDPOINT};
use crate::codec::{self, RpcRequest};
use crate::error::Error;
use crate::status;
use crate::transport::{HttpTransport, Transport};
use crate::uci::UciClient;

/// An authenticated LuCI RPC session.
///
/// The token starts empty and is filled lazily: the first UCI call goes out
/// unauthenticated, the device answers 401/403, and the session logs in and
/// retries. A stale token is handled the same way.
///
/// Login is single-flight. When several callers hit an auth failure at the
/// same time, the first one logs in and the others reuse its token.
#[derive(Debug)]
pub struct Session<T = HttpTransport> {
    transport: T,
    base_url: Url,
    credentials: Credentials,
    request_id: u32,
    token: RwLock<Option<SecretString>>,
    login_lock: Mutex<()>,
}

impl Session<HttpTransport> {
    /// Open a session over the reqwest transport described by `config`.
    pub fn from_config(config: &SessionConfig) -> Result<Self, Error> {
        let transport = HttpTransport::new(&config.transport)?;
        Self::new(
            config.base_url.clone(),
            config.credentials.clone(),
            config.request_id,
            transport,
        )
    }
}

impl<T: Transport> Session<T> {
    /// Create a session. `request_id` is sent with every request and must be
    /// greater than zero.
    pub fn new(
        base_url: Url,
        credentials: Credentials,
        request_id: u32,
        transport: T,
    ) -> Result<Self, Error> {
        if request_id == 0 {
            return Err(Error::InvalidRequestId);
        }
        Ok(Self {
            transport,
            base_url,
            credentials,
            request_id,
            token: RwLock::new(None),
            login_lock: Mutex::new(()),
        })
    }

    /// The device base URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// The underlying transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Whether a login has succeeded on this session.
    pub async fn has_token(&self) -> bool {
        self.token.read().await.is_some()
    }

    /// Perform a UCI call, logging in and retrying once on 401/403.
    ///
    /// Returns the result as a string: handles and tokens verbatim,
    /// structured answers (`get_all`) as compact JSON, and an empty string
    /// when the device answers with a `null` result.
    pub async fn uci(&self, method: &str, params: &[&str]) -> Result<String, Error> {
        let token = self.current_token().await;
        let result = match self.rpc(UCI_ENDPOINT, method, params, token.as_ref()).await {
            Err(e) if e.is_auth_rejected() => {
                warn!(method, error = %e, "UCI call rejected, logging in");
                self.relogin(token.as_ref()).await?;
                let fresh = self.current_token().await;
                self.rpc(UCI_ENDPOINT, method, params, fresh.as_ref())
                    .await?
            }
            other => other?,
        };

        match result {
            Some(value) => codec::result_to_string(&value),
            None => Ok(String::new()),
        }
    }

    /// Log in with the session credentials and store the returned token.
    ///
    /// `login` is sent to the auth endpoint without a token, even when one
    /// is held. A `null` result means the credentials were rejected; the
    /// held token is left untouched in that case.
    pub async fn login(&self) -> Result<(), Error> {
        let _guard = self.login_lock.lock().await;
        self.login_locked().await
    }

    // ── Internals ────────────────────────────────────────────────────

    async fn current_token(&self) -> Option<SecretString> {
        self.token.read().await.clone()
    }

    /// Log in unless another caller already replaced `stale` while we
    /// waited for the login lock.
    async fn relogin(&self, stale: Option<&SecretString>) -> Result<(), Error> {
        let _guard = self.login_lock.lock().await;
        let current = self.current_token().await;
        if !same_token(current.as_ref(), stale) {
            debug!("token refreshed by a concurrent caller");
            return Ok(());
        }
        self.login_locked().await
    }

    /// Caller must hold `login_lock`.
    async fn login_locked(&self) -> Result<(), Error> {
        debug!(username = %self.credentials.username, "logging in");

        let params = [
            self.credentials.username.as_str(),
            self.credentials.password.expose_secret(),
        ];
        let token = match self.rpc(AUTH_ENDPOINT, METHOD_LOGIN, &params, None).await? {
            None | Some(Value::Null) => return Err(Error::LoginFailed),
            Some(value) => codec::result_to_string(&value)?,
        };

        *self.token.write().await = Some(SecretString::from(token));
        debug!("login successful");
        Ok(())
    }

    /// One request/response exchange without any retry.
    async fn rpc(
        &self,
        endpoint: &str,
        method: &str,
        params: &[&str],
        token: Option<&SecretString>,
    ) -> Result<Option<Value>, Error> {
        let request = RpcRequest::new(self.request_id, method, params);
        let body = codec::encode(&request)?;
        let url = self.endpoint_url(endpoint, method, token)?;

        // The query string carries the token; keep it out of the logs.
        debug!(method, path = url.path(), "RPC call");

        let raw = self.transport.send(url, body).await?;
        status::classify(raw.status).check(&raw.body)?;
        codec::decode(&raw.body)?.into_result()
    }

    /// `{base}/cgi-bin/luci/rpc/{endpoint}`, plus `?auth=<token>` for
    /// every method except `login`.
    fn endpoint_url(
        &self,
        endpoint: &str,
        method: &str,
        token: Option<&SecretString>,
    ) -> Result<Url, Error> {
        let base = self.base_url.as_str().trim_end_matches('/');
        let mut url = Url::parse(&format!("{base}{RPC_PATH}{endpoint}"))?;

        if method != METHOD_LOGIN {
            if let Some(token) = token.filter(|t| !t.expose_secret().is_empty()) {
                url.query_pairs_mut()
                    .append_pair("auth", token.expose_secret());
            }
        }
        Ok(url)
    }
}

impl<T: Transport> UciClient for Session<T> {
    async fn call(&self, method: &str, params: &[&str]) -> Result<String, Error> {
        self.uci(method, params).await
    }
}

fn same_token(a: Option<&SecretString>, b: Option<&SecretString>) -> bool {
    match (a, b) {
        (None, None) => true,
        (Some(a), Some(b)) => a.expose_secret() == b.expose_secret(),
        _ => false,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::Mutex as StdMutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;
    use crate::transport::RawResponse;

    // ── Scripted transport ───────────────────────────────────────────

    /// Replays canned responses in order and records every request.
    #[derive(Default)]
    struct ScriptedTransport {
        replies: StdMutex<VecDeque<RawResponse>>,
        calls: StdMutex<Vec<(Url, Value)>>,
    }

    impl ScriptedTransport {
        fn with(replies: Vec<(u16, Value)>) -> Self {
            let replies = replies
                .into_iter()
                .map(|(status, body)| RawResponse {
                    status,
                    body: if body.is_null() {
                        Vec::new()
                    } else {
                        serde_json::to_vec(&body).unwrap()
                    },
                })
                .collect();
            Self {
                replies: StdMutex::new(replies),
                calls: StdMutex::default(),
            }
        }

        fn calls(&self) -> Vec<(Url, Value)> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl Transport for ScriptedTransport {
        async fn send(&self, url: Url, body: Vec<u8>) -> Result<RawResponse, Error> {
            let body: Value = serde_json::from_slice(&body).unwrap();
            self.calls.lock().unwrap().push((url, body));
            Ok(self
                .replies
                .lock()
                .unwrap()
                .pop_front()
                .expect("unexpected extra request"))
        }
    }

    fn session(replies: Vec<(u16, Value)>) -> Session<ScriptedTransport> {
        Session::new(
            Url::parse("http://router.lan").unwrap(),
            Credentials::new("root", "hunter2"),
            1,
            ScriptedTransport::with(replies),
        )
        .unwrap()
    }

    fn paths(calls: &[(Url, Value)]) -> Vec<String> {
        calls
            .iter()
            .map(|(url, _)| match url.query() {
                Some(q) => format!("{}?{q}", url.path()),
                None => url.path().to_owned(),
            })
            .collect()
    }

    // ── Tests ────────────────────────────────────────────────────────

    #[test]
    fn zero_request_id_is_rejected() {
        let result = Session::new(
            Url::parse("http://router.lan").unwrap(),
            Credentials::new("root", "pw"),
            0,
            ScriptedTransport::default(),
        );
        assert!(matches!(result, Err(Error::InvalidRequestId)));
    }

    #[tokio::test]
    async fn login_stores_token() {
        let s = session(vec![(200, json!({"id": 1, "result": "tok123", "error": null}))]);
        s.login().await.unwrap();
        assert!(s.has_token().await);

        let calls = s.transport().calls();
        assert_eq!(paths(&calls), vec!["/cgi-bin/luci/rpc/auth"]);
        assert_eq!(
            calls[0].1,
            json!({"id": 1, "method": "login", "params": ["root", "hunter2"]})
        );
    }

    #[tokio::test]
    async fn null_login_result_is_login_failed() {
        let s = session(vec![(200, json!({"id": 1, "result": null, "error": null}))]);
        assert!(matches!(s.login().await, Err(Error::LoginFailed)));
        assert!(!s.has_token().await);
    }

    #[tokio::test]
    async fn failed_login_keeps_previous_token() {
        let s = session(vec![
            (200, json!({"result": "first"})),
            (200, json!({"result": null})),
            (200, json!({"result": "ok"})),
        ]);
        s.login().await.unwrap();
        assert!(matches!(s.login().await, Err(Error::LoginFailed)));

        s.uci("get", &["network", "lan"]).await.unwrap();
        let calls = s.transport().calls();
        assert_eq!(calls[2].0.query(), Some("auth=first"));
    }

    #[tokio::test]
    async fn login_never_carries_a_token() {
        let s = session(vec![
            (200, json!({"result": "first"})),
            (200, json!({"result": "second"})),
        ]);
        s.login().await.unwrap();
        s.login().await.unwrap();
        let calls = s.transport().calls();
        assert!(calls.iter().all(|(url, _)| url.query().is_none()));
    }

    #[tokio::test]
    async fn unauthenticated_triggers_one_login_and_one_retry() {
        for code in [401, 403] {
            let s = session(vec![
                (code, Value::Null),
                (200, json!({"result": "tok"})),
                (200, json!({"result": "192.168.1.1"})),
            ]);
            let out = s.uci("get", &["network", "lan", "ipaddr"]).await.unwrap();
            assert_eq!(out, "192.168.1.1");

            let calls = s.transport().calls();
            assert_eq!(
                paths(&calls),
                vec![
                    "/cgi-bin/luci/rpc/uci",
                    "/cgi-bin/luci/rpc/auth",
                    "/cgi-bin/luci/rpc/uci?auth=tok",
                ],
                "status {code}"
            );
            assert_eq!(calls[0].1, calls[2].1);
        }
    }

    #[tokio::test]
    async fn second_auth_failure_is_not_retried() {
        let s = session(vec![
            (401, Value::Null),
            (200, json!({"result": "tok"})),
            (403, Value::Null),
        ]);
        let result = s.uci("get", &["dhcp"]).await;
        assert!(matches!(result, Err(Error::Forbidden)));
        assert_eq!(s.transport().calls().len(), 3);
    }

    #[tokio::test]
    async fn other_failures_are_not_retried() {
        for code in [400, 404, 500, 502] {
            let s = session(vec![(code, Value::Null)]);
            match s.uci("get", &["dhcp"]).await {
                Err(Error::Http { status, .. }) => assert_eq!(status, code),
                other => panic!("expected Http error, got: {other:?}"),
            }
            assert_eq!(s.transport().calls().len(), 1);
        }
    }

    #[tokio::test]
    async fn rejected_login_during_retry_surfaces_login_failed() {
        let s = session(vec![(401, Value::Null), (200, json!({"result": null}))]);
        assert!(matches!(s.uci("get", &["dhcp"]).await, Err(Error::LoginFailed)));
        assert_eq!(s.transport().calls().len(), 2);
        assert!(!s.has_token().await);
    }

    #[tokio::test]
    async fn in_band_error_is_rpc_error() {
        let s = session(vec![(200, json!({"result": null, "error": "Entry not found"}))]);
        match s.uci("delete", &["dhcp", "cfg01"]).await {
            Err(Error::Rpc { message }) => assert_eq!(message, "Entry not found"),
            other => panic!("expected Rpc error, got: {other:?}"),
        }
    }

    #[tokio::test]
    async fn null_uci_result_is_empty_string() {
        let s = session(vec![(200, json!({"id": 1, "result": null, "error": null}))]);
        assert_eq!(s.uci("commit", &["dhcp"]).await.unwrap(), "");
    }

    #[tokio::test]
    async fn structured_uci_result_is_json_text() {
        let s = session(vec![(200, json!({"result": {"cfg01": {".type": "domain"}}}))]);
        let out = s.uci("get_all", &["dhcp"]).await.unwrap();
        assert_eq!(out, r#"{"cfg01":{".type":"domain"}}"#);
    }

    #[tokio::test]
    async fn base_url_trailing_slash_is_tolerated() {
        let s = Session::new(
            Url::parse("http://router.lan:8080/").unwrap(),
            Credentials::new("root", "pw"),
            3,
            ScriptedTransport::with(vec![(200, json!({"result": "x"}))]),
        )
        .unwrap();
        s.uci("get", &["system"]).await.unwrap();
        let calls = s.transport().calls();
        assert_eq!(calls[0].0.as_str(), "http://router.lan:8080/cgi-bin/luci/rpc/uci");
        assert_eq!(calls[0].1["id"], json!(3));
    }

    // ── Single-flight login ──────────────────────────────────────────

    /// Answers 401 to any UCI call without the current token, yielding on
    /// every request so concurrent callers interleave.
    #[derive(Default)]
    struct DeviceTransport {
        logins: AtomicUsize,
    }

    impl Transport for DeviceTransport {
        async fn send(&self, url: Url, _body: Vec<u8>) -> Result<RawResponse, Error> {
            tokio::task::yield_now().await;
            let reply = if url.path().ends_with("/auth") {
                let n = self.logins.fetch_add(1, Ordering::SeqCst) + 1;
                RawResponse {
                    status: 200,
                    body: serde_json::to_vec(&json!({"result": format!("tok{n}")})).unwrap(),
                }
            } else if url.query() == Some("auth=tok1") {
                RawResponse {
                    status: 200,
                    body: br#"{"result":"ok"}"#.to_vec(),
                }
            } else {
                RawResponse {
                    status: 401,
                    body: Vec::new(),
                }
            };
            Ok(reply)
        }
    }

    #[tokio::test]
    async fn concurrent_auth_failures_log_in_once() {
        let s = Session::new(
            Url::parse("http://router.lan").unwrap(),
            Credentials::new("root", "pw"),
            1,
            DeviceTransport::default(),
        )
        .unwrap();

        let (a, b, c) = tokio::join!(
            s.uci("get", &["dhcp"]),
            s.uci("get", &["pbr"]),
            s.uci("get", &["network"]),
        );
        assert_eq!(a.unwrap(), "ok");
        assert_eq!(b.unwrap(), "ok");
        assert_eq!(c.unwrap(), "ok");
        assert_eq!(s.transport().logins.load(Ordering::SeqCst), 1);
    }
}

// ── Session connection settings ──
//
// These types describe *how* to reach a device. They carry credential data
// and transport tuning, but never touch disk; `openwrt-config` builds them.

use secrecy::SecretString;
use url::Url;

use crate::transport::TransportConfig;

/// LuCI RPC path prefix shared by every endpoint.
pub const RPC_PATH: &str = "/cgi-bin/luci/rpc/";
/// Authentication endpoint, under [`RPC_PATH`].
pub const AUTH_ENDPOINT: &str = "auth";
/// UCI endpoint, under [`RPC_PATH`].
pub const UCI_ENDPOINT: &str = "uci";
/// The only method sent to [`AUTH_ENDPOINT`]. Never carries a token.
pub const METHOD_LOGIN: &str = "login";

/// Username/password pair for the `login` call.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub username: String,
    pub password: SecretString,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: SecretString::from(password.into()),
        }
    }
}

/// Everything needed to open a [`Session`](crate::Session) over HTTP.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Device base URL (e.g. `https://192.168.1.1`).
    pub base_url: Url,
    pub credentials: Credentials,
    /// Session-scoped JSON-RPC id. Must be greater than zero.
    pub request_id: u32,
    pub transport: TransportConfig,
}

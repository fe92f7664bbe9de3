use thiserror::Error;

/// Top-level error type for the `openwrt-api` crate.
///
/// Covers every failure mode of a LuCI RPC exchange: transport, HTTP
/// status, authentication, in-band RPC errors, and envelope decoding.
/// `openwrt-core` wraps these unchanged so callers can match on them.
#[derive(Debug, Error)]
pub enum Error {
    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, timeout, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// TLS setup or certificate error.
    #[error("TLS error: {0}")]
    Tls(String),

    /// The session-scoped request id must be greater than zero.
    #[error("RPC request id must be greater than zero")]
    InvalidRequestId,

    // ── HTTP status ─────────────────────────────────────────────────
    /// HTTP 401 from the RPC endpoint.
    #[error("HTTP 401: unauthenticated")]
    Unauthenticated,

    /// HTTP 403 from the RPC endpoint.
    #[error("HTTP 403: forbidden")]
    Forbidden,

    /// Any other non-success HTTP status. `body` is a preview for diagnostics.
    #[error("HTTP status code: {status}")]
    Http { status: u16, body: String },

    // ── Authentication ──────────────────────────────────────────────
    /// The device answered the login call with a `null` result.
    #[error("RPC login failed: credentials rejected")]
    LoginFailed,

    // ── RPC ─────────────────────────────────────────────────────────
    /// The remote procedure reported an error in-band.
    #[error("RPC error: {message}")]
    Rpc { message: String },

    // ── Data ────────────────────────────────────────────────────────
    /// The response body is not a JSON-RPC envelope.
    #[error("Malformed RPC response: {message}")]
    MalformedResponse { message: String, body: String },

    /// A concrete result was required but the value was `null`.
    #[error("nil result cannot be converted to a string")]
    NilResult,

    /// The request envelope could not be serialized.
    #[error("Failed to encode RPC request: {0}")]
    Encode(#[source] serde_json::Error),

    /// A UCI result could not be read in the expected shape.
    #[error("Failed to decode {context}: {message}")]
    Decode { context: String, message: String },
}

impl Error {
    /// Returns `true` for 401 and 403, the two statuses that trigger a
    /// re-login followed by a single retry.
    pub fn is_auth_rejected(&self) -> bool {
        matches!(self, Self::Unauthenticated | Self::Forbidden)
    }

    /// Returns `true` if this is a transient transport error.
    ///
    /// The session never retries these itself; callers may.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_timeout() || e.is_connect(),
            _ => false,
        }
    }

    /// The HTTP status carried by this error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Unauthenticated => Some(401),
            Self::Forbidden => Some(403),
            Self::Http { status, .. } => Some(*status),
            Self::Transport(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_rejection_covers_401_and_403_only() {
        assert!(Error::Unauthenticated.is_auth_rejected());
        assert!(Error::Forbidden.is_auth_rejected());
        assert!(
            !Error::Http {
                status: 500,
                body: String::new()
            }
            .is_auth_rejected()
        );
        assert!(!Error::LoginFailed.is_auth_rejected());
    }

    #[test]
    fn status_is_exposed_for_http_failures() {
        assert_eq!(Error::Unauthenticated.status(), Some(401));
        assert_eq!(Error::Forbidden.status(), Some(403));
        let err = Error::Http {
            status: 502,
            body: "bad gateway".into(),
        };
        assert_eq!(err.status(), Some(502));
        assert_eq!(err.to_string(), "HTTP status code: 502");
        assert_eq!(Error::NilResult.status(), None);
    }
}

// openwrt-api: Async Rust client for the OpenWrt LuCI JSON-RPC API
//
// Leaf-first: `codec` (request/response envelope), `status` (HTTP status
// classification), `transport` (the byte pipe), `session` (token handling
// and lazy re-login), `uci` (typed UCI calls over any session).

pub mod auth;
pub mod codec;
pub mod error;
pub mod session;
pub mod status;
pub mod transport;
pub mod uci;

pub use auth::{Credentials, SessionConfig};
pub use codec::{RpcRequest, RpcResponse};
pub use error::Error;
pub use session::Session;
pub use status::StatusClass;
pub use transport::{HttpTransport, RawResponse, TlsMode, Transport, TransportConfig};
pub use uci::{UciClient, UciSection};

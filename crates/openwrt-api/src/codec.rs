// LuCI JSON-RPC envelope
//
// Requests are `{"id": N, "method": "...", "params": ["..."]}`; responses
// carry `result` and `error`, either of which may be `null`, a string, or
// an arbitrary JSON structure.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Error;

/// Longest body excerpt kept on decode errors.
const BODY_PREVIEW_LEN: usize = 200;

/// A JSON-RPC request envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RpcRequest {
    pub id: u32,
    pub method: String,
    pub params: Vec<String>,
}

impl RpcRequest {
    pub fn new(id: u32, method: &str, params: &[&str]) -> Self {
        Self {
            id,
            method: method.to_owned(),
            params: params.iter().map(|p| (*p).to_owned()).collect(),
        }
    }
}

/// A JSON-RPC response envelope.
///
/// Both `null` and a missing field deserialize to `None`; an empty string
/// stays `Some(Value::String(""))`.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct RpcResponse {
    #[serde(default)]
    pub id: i64,
    #[serde(default)]
    pub result: Option<Value>,
    #[serde(default)]
    pub error: Option<Value>,
}

impl RpcResponse {
    /// Split the envelope into the carried result or the carried error.
    ///
    /// A populated `error` wins over any `result`.
    pub fn into_result(self) -> Result<Option<Value>, Error> {
        match self.error {
            Some(error) => Err(Error::Rpc {
                message: result_to_string(&error)?,
            }),
            None => Ok(self.result),
        }
    }
}

/// Serialize a request envelope to wire bytes.
pub fn encode(request: &RpcRequest) -> Result<Vec<u8>, Error> {
    serde_json::to_vec(request).map_err(Error::Encode)
}

/// Parse wire bytes into a response envelope.
pub fn decode(body: &[u8]) -> Result<RpcResponse, Error> {
    serde_json::from_slice(body).map_err(|e| {
        let text = String::from_utf8_lossy(body);
        let preview: String = text.chars().take(BODY_PREVIEW_LEN).collect();
        Error::MalformedResponse {
            message: format!("{e} (body preview: {preview:?})"),
            body: text.into_owned(),
        }
    })
}

/// Render a result value as the string callers consume.
///
/// Strings come back verbatim (section handles, tokens). Structured values
/// such as a `get_all` answer are re-serialized to compact JSON so callers
/// can parse them into their own types.
pub fn result_to_string(value: &Value) -> Result<String, Error> {
    match value {
        Value::Null => Err(Error::NilResult),
        Value::String(s) => Ok(s.clone()),
        other => serde_json::to_string(other).map_err(Error::Encode),
    }
}

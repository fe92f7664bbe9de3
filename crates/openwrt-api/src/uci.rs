// UCI operations over any RPC session
//
// `UciClient` is the seam between reconciliation logic and the session:
// one required method for raw calls, typed helpers on top. Section handles
// returned by `add` are opaque and passed back verbatim.

use std::future::Future;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Error;

/// One section of a UCI config, as returned by `get_all`.
///
/// `get_all` also reports metadata such as `.name`, `.anonymous` and
/// `.index`; those land in `options` alongside the real option values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UciSection {
    #[serde(rename = ".type")]
    pub section_type: String,
    #[serde(flatten)]
    pub options: IndexMap<String, Value>,
}

impl UciSection {
    pub fn new(section_type: impl Into<String>) -> Self {
        Self {
            section_type: section_type.into(),
            options: IndexMap::new(),
        }
    }

    /// Builder-style option setter.
    pub fn with_option(mut self, key: &str, value: impl Into<String>) -> Self {
        self.options
            .insert(key.to_owned(), Value::String(value.into()));
        self
    }

    /// A string option. List options and other non-string values read as
    /// `None`.
    pub fn option(&self, key: &str) -> Option<&str> {
        self.options.get(key).and_then(Value::as_str)
    }

    /// A string option, or `""` when missing.
    pub fn option_or_empty(&self, key: &str) -> String {
        self.option(key).unwrap_or_default().to_owned()
    }
}

/// A client able to issue UCI calls.
///
/// Implemented by [`Session`](crate::Session); tests substitute recording
/// fakes.
pub trait UciClient: Send + Sync {
    /// Raw UCI call: `method` with positional string `params`.
    fn call(
        &self,
        method: &str,
        params: &[&str],
    ) -> impl Future<Output = Result<String, Error>> + Send;

    /// Like [`call`](Self::call), for methods whose answer is needed.
    ///
    /// A `null` result reaches `call` as `""`; here it fails with
    /// [`Error::NilResult`].
    fn call_required(
        &self,
        method: &str,
        params: &[&str],
    ) -> impl Future<Output = Result<String, Error>> + Send {
        async move {
            let value = self.call(method, params).await?;
            if value.is_empty() {
                return Err(Error::NilResult);
            }
            Ok(value)
        }
    }

    /// `get_all <config>`: every section of a config, keyed by handle, in
    /// the order the device reported them.
    fn get_all(
        &self,
        config: &str,
    ) -> impl Future<Output = Result<IndexMap<String, UciSection>, Error>> + Send {
        async move {
            let raw = self.call("get_all", &[config]).await?;
            if raw.is_empty() {
                return Ok(IndexMap::new());
            }
            serde_json::from_str(&raw).map_err(|e| Error::Decode {
                context: format!("UCI config '{config}'"),
                message: e.to_string(),
            })
        }
    }

    /// `add <config> <type>`: allocate a new anonymous section and return
    /// its handle. Fails with [`Error::NilResult`] if the device returns no
    /// handle.
    fn add(
        &self,
        config: &str,
        section_type: &str,
    ) -> impl Future<Output = Result<String, Error>> + Send {
        async move { self.call_required("add", &[config, section_type]).await }
    }

    /// `set <config> <handle> <option> <value>`.
    fn set(
        &self,
        config: &str,
        handle: &str,
        option: &str,
        value: &str,
    ) -> impl Future<Output = Result<(), Error>> + Send {
        async move {
            self.call("set", &[config, handle, option, value]).await?;
            Ok(())
        }
    }

    /// `delete <config> <handle>`.
    fn delete(&self, config: &str, handle: &str) -> impl Future<Output = Result<(), Error>> + Send {
        async move {
            self.call("delete", &[config, handle]).await?;
            Ok(())
        }
    }

    /// `commit <config>`: make staged changes durable.
    fn commit(&self, config: &str) -> impl Future<Output = Result<(), Error>> + Send {
        async move {
            self.call("commit", &[config]).await?;
            Ok(())
        }
    }
}

// In-memory UCI device for unit tests.

use std::collections::HashMap;
use std::sync::Mutex;

use indexmap::IndexMap;
use openwrt_api::{Error, UciClient, UciSection};

#[derive(Default)]
struct State {
    configs: HashMap<String, IndexMap<String, UciSection>>,
    calls: Vec<Vec<String>>,
    commits: HashMap<String, usize>,
    next_handle: u32,
    fail_on: Option<String>,
}

/// Applies UCI calls to an in-memory store and records every call.
#[derive(Default)]
pub(crate) struct FakeDevice {
    state: Mutex<State>,
}

#[allow(clippy::unwrap_used)]
impl FakeDevice {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a section without recording a call. Returns its handle.
    pub fn insert(&self, config: &str, section_type: &str, options: &[(&str, &str)]) -> String {
        let mut state = self.state.lock().unwrap();
        let handle = next_handle(&mut state);
        let section = options
            .iter()
            .fold(UciSection::new(section_type), |s, (k, v)| s.with_option(k, *v));
        state
            .configs
            .entry(config.to_owned())
            .or_default()
            .insert(handle.clone(), section);
        handle
    }

    /// Seed a section under a caller-chosen handle.
    pub fn insert_named(&self, config: &str, handle: &str, section: UciSection) {
        self.state
            .lock()
            .unwrap()
            .configs
            .entry(config.to_owned())
            .or_default()
            .insert(handle.to_owned(), section);
    }

    /// Make every call of `method` fail with an in-band RPC error.
    pub fn fail_on(&self, method: &str) {
        self.state.lock().unwrap().fail_on = Some(method.to_owned());
    }

    pub fn calls(&self) -> Vec<Vec<String>> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn methods(&self) -> Vec<String> {
        self.calls().into_iter().map(|c| c[0].clone()).collect()
    }

    pub fn commits(&self, config: &str) -> usize {
        self.state
            .lock()
            .unwrap()
            .commits
            .get(config)
            .copied()
            .unwrap_or_default()
    }

    pub fn sections(&self, config: &str) -> IndexMap<String, UciSection> {
        self.state
            .lock()
            .unwrap()
            .configs
            .get(config)
            .cloned()
            .unwrap_or_default()
    }
}

fn next_handle(state: &mut State) -> String {
    state.next_handle += 1;
    format!("cfg{:02x}{:04x}", state.next_handle, state.next_handle * 0x1f)
}

fn missing(what: &str) -> Error {
    Error::Rpc {
        message: format!("Entry not found: {what}"),
    }
}

#[allow(clippy::unwrap_used)]
impl UciClient for FakeDevice {
    async fn call(&self, method: &str, params: &[&str]) -> Result<String, Error> {
        let mut state = self.state.lock().unwrap();

        let mut call = vec![method.to_owned()];
        call.extend(params.iter().map(|p| (*p).to_owned()));
        state.calls.push(call);

        if state.fail_on.as_deref() == Some(method) {
            return Err(Error::Rpc {
                message: format!("injected failure: {method}"),
            });
        }

        match (method, params) {
            ("get_all", [config]) => {
                let sections = state.configs.get(*config).cloned().unwrap_or_default();
                Ok(serde_json::to_string(&sections).unwrap())
            }
            ("add", [config, section_type]) => {
                let handle = next_handle(&mut state);
                state
                    .configs
                    .entry((*config).to_owned())
                    .or_default()
                    .insert(handle.clone(), UciSection::new(*section_type));
                Ok(handle)
            }
            ("set", [config, handle, option, value]) => {
                let section = state
                    .configs
                    .get_mut(*config)
                    .and_then(|c| c.get_mut(*handle))
                    .ok_or_else(|| missing(handle))?;
                section
                    .options
                    .insert((*option).to_owned(), serde_json::Value::String((*value).to_owned()));
                Ok("true".into())
            }
            ("delete", [config, handle]) => {
                state
                    .configs
                    .get_mut(*config)
                    .and_then(|c| c.shift_remove(*handle))
                    .ok_or_else(|| missing(handle))?;
                Ok("true".into())
            }
            ("commit", [config]) => {
                *state.commits.entry((*config).to_owned()).or_default() += 1;
                Ok("true".into())
            }
            _ => Err(Error::Rpc {
                message: "Method not found".into(),
            }),
        }
    }
}

//! In-process implementation of [`Transport`].
//!
//! [`InMemoryBackend`] serves the code service's endpoints from a local
//! sample list with the same observable behavior as the HTTP service: ids
//! are assigned on create, unknown names and ids answer 404. It records every
//! call so tests can assert on network traffic, and it can inject failures
//! or hold requests to any endpoint until released, either all at once or
//! one call at a time in any order.

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};

use serde_json::{json, Map, Value};
use tokio::sync::{oneshot, Notify};

use monkeypad_core::{CodeSample, SampleId};

use crate::api::{COMPILE_PATH, HELLO_PATH, ID_BY_NAME_PATH, SAMPLES_PATH};
use crate::error::TransportError;
use crate::remote::Transport;

/// Endpoints served by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    ListSamples,
    IdByName,
    ContentById,
    CreateSample,
    Compile,
    Hello,
}

/// Shape in which the listing endpoint encodes the collection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ListingShape {
    /// `[record, ...]`
    #[default]
    Array,
    /// `{ "<id>": record, ... }`
    KeyedMap,
    /// `{ "Data": { "<id>": record, ... } }`
    Envelope,
}

/// One request seen by the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCall {
    pub endpoint: Endpoint,
    pub method: &'static str,
    pub path: String,
}

#[derive(Debug, Default)]
struct BackendState {
    samples: Vec<CodeSample>,
    next_id: u64,
    listing_shape: ListingShape,
    outputs: HashMap<String, String>,
    failing: HashSet<Endpoint>,
    paused: HashSet<Endpoint>,
    gated: HashSet<Endpoint>,
    gates: HashMap<(Endpoint, usize), oneshot::Sender<()>>,
    calls: Vec<RecordedCall>,
}

/// In-memory code service.
#[derive(Debug, Default)]
pub struct InMemoryBackend {
    state: Mutex<BackendState>,
    resumed: Notify,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a backend pre-populated with samples named `name` → `code`,
    /// with ids assigned in order starting at 1.
    pub fn with_samples<'a>(samples: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        let backend = Self::new();
        for (name, code) in samples {
            backend.insert(name, code);
        }
        backend
    }

    /// Adds a sample directly, bypassing call recording.
    pub fn insert(&self, name: &str, code: &str) -> SampleId {
        let mut state = self.state();
        insert_sample(&mut state, name, code)
    }

    /// Removes a sample directly, as another client of the service would.
    pub fn remove(&self, id: &SampleId) {
        self.state().samples.retain(|s| &s.id != id);
    }

    pub fn set_listing_shape(&self, shape: ListingShape) {
        self.state().listing_shape = shape;
    }

    /// Scripts the compile endpoint's output for `code`. Unscripted code
    /// answers 500.
    pub fn set_output(&self, code: &str, output: &str) {
        self.state()
            .outputs
            .insert(code.to_string(), output.to_string());
    }

    /// Makes `endpoint` answer 500 until [`recover`](Self::recover).
    pub fn fail(&self, endpoint: Endpoint) {
        self.state().failing.insert(endpoint);
    }

    pub fn recover(&self, endpoint: Endpoint) {
        self.state().failing.remove(&endpoint);
    }

    /// Holds requests to `endpoint` after they are recorded until
    /// [`resume`](Self::resume).
    pub fn pause(&self, endpoint: Endpoint) {
        self.state().paused.insert(endpoint);
    }

    pub fn resume(&self, endpoint: Endpoint) {
        self.state().paused.remove(&endpoint);
        self.resumed.notify_waiters();
    }

    /// Parks every later call to `endpoint` individually until released
    /// with [`release_call`](Self::release_call).
    pub fn gate_calls(&self, endpoint: Endpoint) {
        self.state().gated.insert(endpoint);
    }

    /// Lets the `nth` (zero-based) call to `endpoint` proceed. Returns
    /// `false` if that call is not parked.
    pub fn release_call(&self, endpoint: Endpoint, nth: usize) -> bool {
        let gate = self.state().gates.remove(&(endpoint, nth));
        gate.is_some_and(|tx| tx.send(()).is_ok())
    }

    pub fn samples(&self) -> Vec<CodeSample> {
        self.state().samples.clone()
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.state().calls.clone()
    }

    /// Number of calls made to `endpoint`.
    pub fn call_count(&self, endpoint: Endpoint) -> usize {
        self.state()
            .calls
            .iter()
            .filter(|c| c.endpoint == endpoint)
            .count()
    }

    fn state(&self) -> MutexGuard<'_, BackendState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Records the call, waits on its gate and while the endpoint is paused,
    /// then checks failure injection.
    async fn begin(
        &self,
        endpoint: Endpoint,
        method: &'static str,
        path: &str,
    ) -> Result<(), TransportError> {
        let gate = {
            let mut state = self.state();
            let nth = state.calls.iter().filter(|c| c.endpoint == endpoint).count();
            state.calls.push(RecordedCall {
                endpoint,
                method,
                path: path.to_string(),
            });
            state.gated.contains(&endpoint).then(|| {
                let (tx, rx) = oneshot::channel();
                state.gates.insert((endpoint, nth), tx);
                rx
            })
        };
        if let Some(gate) = gate {
            // A dropped sender only happens when the backend goes away.
            gate.await.ok();
        }
        loop {
            // Registered before the check so a concurrent resume is not missed.
            let resumed = self.resumed.notified();
            let paused = self.state().paused.contains(&endpoint);
            if !paused {
                break;
            }
            resumed.await;
        }
        let failing = self.state().failing.contains(&endpoint);
        if failing {
            return Err(TransportError::with_status(500, "injected failure"));
        }
        Ok(())
    }

    fn listing(&self) -> Value {
        let state = self.state();
        let records = state.samples.iter().map(|s| (s.id.to_string(), json!(s)));
        match state.listing_shape {
            ListingShape::Array => Value::Array(records.map(|(_, r)| r).collect()),
            ListingShape::KeyedMap => Value::Object(records.collect::<Map<_, _>>()),
            ListingShape::Envelope => {
                json!({ "Data": Value::Object(records.collect::<Map<_, _>>()) })
            }
        }
    }

    fn compile(&self, body: &Value) -> Result<Value, TransportError> {
        let code = body
            .get("code")
            .and_then(Value::as_str)
            .ok_or_else(|| TransportError::with_status(400, "missing code"))?;
        let state = self.state();
        state
            .outputs
            .get(code)
            .map(|output| json!({ "output": output }))
            .ok_or_else(|| TransportError::with_status(500, "evaluation failed"))
    }
}

fn insert_sample(state: &mut BackendState, name: &str, code: &str) -> SampleId {
    state.next_id += 1;
    let id = SampleId::from(state.next_id);
    state.samples.push(CodeSample {
        id: id.clone(),
        name: name.to_string(),
        code: code.to_string(),
    });
    id
}

fn not_found(what: &str) -> TransportError {
    TransportError::with_status(404, format!("{} not found", what))
}

impl Transport for InMemoryBackend {
    async fn get(&self, path: &str, params: &[(&str, &str)]) -> Result<Value, TransportError> {
        match path {
            SAMPLES_PATH => {
                self.begin(Endpoint::ListSamples, "GET", path).await?;
                Ok(self.listing())
            }
            ID_BY_NAME_PATH => {
                self.begin(Endpoint::IdByName, "GET", path).await?;
                let name = params
                    .iter()
                    .find(|(k, _)| *k == "name")
                    .map(|(_, v)| *v)
                    .unwrap_or_default();
                let state = self.state();
                state
                    .samples
                    .iter()
                    .find(|s| s.name == name)
                    .map(|s| Value::String(s.id.to_string()))
                    .ok_or_else(|| not_found("name"))
            }
            HELLO_PATH => {
                self.begin(Endpoint::Hello, "GET", path).await?;
                Ok(json!({ "message": "Hello from the monkeypad backend" }))
            }
            _ => match path.strip_prefix("/code/") {
                Some(segment) if !segment.is_empty() && !segment.contains('/') => {
                    self.begin(Endpoint::ContentById, "GET", path).await?;
                    let id = urlencoding::decode(segment)
                        .map_err(|_| TransportError::with_status(400, "malformed id"))?;
                    let state = self.state();
                    state
                        .samples
                        .iter()
                        .find(|s| s.id.as_str() == id.as_ref())
                        .map(|s| json!(s))
                        .ok_or_else(|| not_found("sample"))
                }
                _ => Err(not_found(path)),
            },
        }
    }

    async fn post(&self, path: &str, body: &Value) -> Result<Value, TransportError> {
        match path {
            SAMPLES_PATH => {
                self.begin(Endpoint::CreateSample, "POST", path).await?;
                let name = body.get("name").and_then(Value::as_str);
                let code = body.get("code").and_then(Value::as_str);
                let (Some(name), Some(code)) = (name, code) else {
                    return Err(TransportError::with_status(400, "name and code are required"));
                };
                let mut state = self.state();
                let id = insert_sample(&mut state, name, code);
                Ok(json!({ "id": id, "name": name, "code": code }))
            }
            COMPILE_PATH => {
                self.begin(Endpoint::Compile, "POST", path).await?;
                self.compile(body)
            }
            _ => Err(not_found(path)),
        }
    }
}

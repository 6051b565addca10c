//! Typed endpoints of the code service.
//!
//! | Operation          | Method | Path                    |
//! |--------------------|--------|-------------------------|
//! | List samples       | GET    | `/code/db_content`      |
//! | Resolve name → id  | GET    | `/code/id_by_name?name=`|
//! | Content by id      | GET    | `/code/{id}`            |
//! | Add sample         | POST   | `/code/db_content`      |
//! | Execute code       | POST   | `/code/compile`         |
//! | Greeting probe     | GET    | `/code/hello`           |

use std::sync::Arc;

use serde_json::{json, Value};

use monkeypad_core::wire::{extract_code, extract_output};
use monkeypad_core::{normalize_collection, resolve_id, CodeSample, NewSample, SampleId};

use crate::error::TransportError;
use crate::remote::Transport;

pub const SAMPLES_PATH: &str = "/code/db_content";
pub const ID_BY_NAME_PATH: &str = "/code/id_by_name";
pub const COMPILE_PATH: &str = "/code/compile";
pub const HELLO_PATH: &str = "/code/hello";

/// Path of the content-by-id endpoint. The id is percent-encoded so it
/// always stays a single path segment.
pub fn content_path(id: &SampleId) -> String {
    format!("/code/{}", urlencoding::encode(id.as_str()))
}

/// Typed wrapper around a shared [`Transport`].
pub struct CodeApi<T> {
    transport: Arc<T>,
}

impl<T> Clone for CodeApi<T> {
    fn clone(&self) -> Self {
        CodeApi {
            transport: Arc::clone(&self.transport),
        }
    }
}

impl<T: Transport> CodeApi<T> {
    pub fn new(transport: T) -> Self {
        Self::from_shared(Arc::new(transport))
    }

    pub fn from_shared(transport: Arc<T>) -> Self {
        CodeApi { transport }
    }

    pub fn transport(&self) -> &Arc<T> {
        &self.transport
    }

    /// Fetches and normalizes the whole sample collection.
    pub async fn list_samples(&self) -> Result<Vec<CodeSample>, TransportError> {
        let body = self.transport.get(SAMPLES_PATH, &[]).await?;
        normalize_collection(body).map_err(|err| TransportError::new(err.to_string()))
    }

    /// Resolves a sample name to its id. `Ok(None)` when the service answers
    /// with no usable id.
    pub async fn id_by_name(&self, name: &str) -> Result<Option<SampleId>, TransportError> {
        let body = self
            .transport
            .get(ID_BY_NAME_PATH, &[("name", name)])
            .await?;
        Ok(resolve_id(&body))
    }

    /// Fetches a sample's source text by id.
    pub async fn content_by_id(&self, id: &SampleId) -> Result<String, TransportError> {
        let body = self.transport.get(&content_path(id), &[]).await?;
        extract_code(&body).map_err(|err| TransportError::new(err.to_string()))
    }

    /// Creates a sample. Returns the created record as the service sent it.
    pub async fn create_sample(&self, sample: &NewSample) -> Result<Value, TransportError> {
        let body = serde_json::to_value(sample)
            .map_err(|err| TransportError::new(format!("encoding sample: {}", err)))?;
        self.transport.post(SAMPLES_PATH, &body).await
    }

    /// Runs source text remotely and returns its textual output.
    ///
    /// A 2xx answer without a string `output` is an error too.
    pub async fn compile(&self, code: &str) -> Result<String, TransportError> {
        let body = self.transport.post(COMPILE_PATH, &json!({ "code": code })).await?;
        extract_output(&body).ok_or_else(|| {
            TransportError::new(format!("compile response has no string `output`: {}", body))
        })
    }

    /// Backend greeting probe.
    pub async fn hello(&self) -> Result<Value, TransportError> {
        self.transport.get(HELLO_PATH, &[]).await
    }
}

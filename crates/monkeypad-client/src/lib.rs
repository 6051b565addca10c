//! Async client layer between an editor surface and the monkeypad code
//! service.
//!
//! [`SampleStore`] keeps a searchable copy of the service's code samples and
//! [`ExecutionSession`] runs user source text remotely. Both talk to the
//! service through a [`Transport`]: [`HttpTransport`] for a real backend or
//! [`InMemoryBackend`] for tests and offline use. Each component publishes a
//! snapshot of its state on every committed transition; UI code subscribes
//! and re-renders from those snapshots.

pub mod api;
pub mod config;
pub mod error;
pub mod memory;
pub mod remote;
pub mod session;
pub mod store;

pub use api::CodeApi;
pub use config::ClientConfig;
pub use error::{ClientError, TransportError};
pub use memory::InMemoryBackend;
pub use remote::{HttpTransport, Transport};
pub use session::{ExecutionSession, ExecutionSnapshot};
pub use store::{Lifecycle, SampleSnapshot, SampleStore};

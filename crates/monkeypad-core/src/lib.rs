//! Domain model for the monkeypad code-sample and execution client.
//!
//! Everything here is pure: no I/O, no async. The client crate drives these
//! types from network responses.
//!
//! # Modules
//!
//! - [`id`]: `SampleId` opaque identifier
//! - [`sample`]: `CodeSample`, `NewSample` validation, the filtered view
//! - [`wire`]: normalization of listing and id-lookup response shapes
//! - [`execution`]: the `ExecutionRequest` state machine
//! - [`error`]: `CoreError`

pub mod error;
pub mod execution;
pub mod id;
pub mod sample;
pub mod wire;

// Re-export commonly used types
pub use error::CoreError;
pub use execution::{ExecutionRequest, ExecutionStatus, EXECUTION_FAILED_MESSAGE};
pub use id::SampleId;
pub use sample::{filter_samples, name_matches, CodeSample, NewSample};
pub use wire::{normalize_collection, resolve_id};

//! [`SampleStore`]: the client's copy of the service's code samples.
//!
//! State lives in a `tokio::sync::watch` channel. Every committed transition
//! goes through `send_if_modified`, so subscribers see each transition exactly
//! once and never a half-applied one. No lock is held across an `.await`.
//!
//! Slots:
//! - `add_sample` allows one call in flight; a second returns
//!   [`ClientError::Busy`] without touching the network.
//! - `fetch_all` calls may overlap. Each is numbered when issued and its
//!   response is applied only if no later-issued fetch was applied first.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::watch;

use monkeypad_core::{filter_samples, CodeSample, NewSample};

use crate::api::CodeApi;
use crate::error::ClientError;
use crate::remote::Transport;

pub const FETCH_FAILED_MESSAGE: &str = "Something went wrong while loading code samples.";
pub const ADD_FAILED_MESSAGE: &str = "There was a problem adding the code sample.";
pub const CONTENT_FAILED_MESSAGE: &str = "Failed to load the code sample. Please try again later.";

pub fn not_found_message(name: &str) -> String {
    format!("No code sample named '{}' was found.", name)
}

/// Attachment state of a component.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Lifecycle {
    /// Constructed, initial fetch not yet triggered.
    #[default]
    Created,
    Attached,
    /// Terminal. Responses arriving after detach are dropped.
    Detached,
}

/// Everything the UI needs to render the sample list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SampleSnapshot {
    /// Collection in service order.
    pub samples: Vec<CodeSample>,
    /// `samples` filtered by `search_term`.
    pub filtered: Vec<CodeSample>,
    pub search_term: String,
    /// Last user-facing error; cleared by the next successful operation.
    pub error: Option<String>,
    /// True while any fetch is in flight.
    pub loading: bool,
    /// True while an add is in flight.
    pub adding: bool,
    pub add_form_open: bool,
    pub lifecycle: Lifecycle,
    fetches_in_flight: usize,
    applied_fetch: u64,
}

/// Shared handle to a sample collection synchronized with the service.
pub struct SampleStore<T> {
    api: CodeApi<T>,
    state: Arc<watch::Sender<SampleSnapshot>>,
    fetch_seq: Arc<AtomicU64>,
}

impl<T> Clone for SampleStore<T> {
    fn clone(&self) -> Self {
        SampleStore {
            api: self.api.clone(),
            state: Arc::clone(&self.state),
            fetch_seq: Arc::clone(&self.fetch_seq),
        }
    }
}

impl<T: Transport> SampleStore<T> {
    pub fn new(api: CodeApi<T>) -> Self {
        let (state, _) = watch::channel(SampleSnapshot::default());
        SampleStore {
            api,
            state: Arc::new(state),
            fetch_seq: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Receives a snapshot after every committed transition.
    pub fn subscribe(&self) -> watch::Receiver<SampleSnapshot> {
        self.state.subscribe()
    }

    pub fn snapshot(&self) -> SampleSnapshot {
        self.state.borrow().clone()
    }

    /// Triggers the initial fetch. Only the first call per store does
    /// anything; later calls (including after detach) return `Ok(())`.
    pub async fn on_attach(&self) -> Result<(), ClientError> {
        let first = self.state.send_if_modified(|s| {
            if s.lifecycle != Lifecycle::Created {
                return false;
            }
            s.lifecycle = Lifecycle::Attached;
            true
        });
        if !first {
            return Ok(());
        }
        tracing::info!("sample store attached");
        self.fetch_all().await
    }

    /// Stops notifications and drops any response still in flight.
    pub fn on_detach(&self) {
        self.state.send_if_modified(|s| {
            if s.lifecycle == Lifecycle::Detached {
                return false;
            }
            s.lifecycle = Lifecycle::Detached;
            s.loading = false;
            s.adding = false;
            true
        });
        tracing::info!("sample store detached");
    }

    /// Replaces the collection with the service's current listing.
    ///
    /// On failure the previous collection stays and the error message is
    /// set.
    pub async fn fetch_all(&self) -> Result<(), ClientError> {
        let seq = self.fetch_seq.fetch_add(1, Ordering::SeqCst) + 1;
        self.commit(|s| {
            s.fetches_in_flight += 1;
            s.loading = true;
        })?;

        let result = self.api.list_samples().await;

        let outcome = match &result {
            Ok(samples) => Ok(samples.len()),
            Err(err) => Err(err.clone()),
        };
        let applied = self.commit(|s| {
            s.fetches_in_flight = s.fetches_in_flight.saturating_sub(1);
            s.loading = s.fetches_in_flight > 0;
            if seq <= s.applied_fetch {
                return false;
            }
            s.applied_fetch = seq;
            match result {
                Ok(samples) => {
                    s.filtered = filter_samples(&samples, &s.search_term);
                    s.samples = samples;
                    s.error = None;
                }
                Err(_) => s.error = Some(FETCH_FAILED_MESSAGE.to_string()),
            }
            true
        })?;

        match outcome {
            Ok(count) => {
                tracing::debug!(seq, count, applied, "fetched code samples");
                Ok(())
            }
            Err(err) => {
                tracing::warn!(seq, applied, "fetching code samples failed: {}", err);
                Err(err.into())
            }
        }
    }

    /// Loads a sample's source text by name.
    ///
    /// Resolves the name to an id first. If that call fails or yields no id
    /// the result is [`ClientError::NotFound`] and the content endpoint is
    /// never called.
    pub async fn fetch_content_by_name(&self, name: &str) -> Result<String, ClientError> {
        self.ensure_live()?;

        let id = match self.api.id_by_name(name).await {
            Ok(Some(id)) => Some(id),
            Ok(None) => {
                tracing::warn!(name, "id lookup returned no id");
                None
            }
            Err(err) => {
                tracing::warn!(name, "id lookup failed: {}", err);
                None
            }
        };
        let Some(id) = id else {
            self.commit(|s| s.error = Some(not_found_message(name)))?;
            return Err(ClientError::NotFound {
                name: name.to_string(),
            });
        };

        self.ensure_live()?;
        match self.api.content_by_id(&id).await {
            Ok(code) => {
                self.commit(|s| s.error = None)?;
                tracing::debug!(name, %id, "loaded code sample");
                Ok(code)
            }
            Err(err) => {
                tracing::warn!(name, %id, "loading code sample failed: {}", err);
                self.commit(|s| s.error = Some(CONTENT_FAILED_MESSAGE.to_string()))?;
                Err(err.into())
            }
        }
    }

    /// Creates a sample on the service, then refetches the collection.
    ///
    /// Blank fields are rejected before any network call and leave the state
    /// untouched. On success the add form closes; the refetch's own failure
    /// surfaces through the error message rather than this result, since the
    /// sample was created either way.
    pub async fn add_sample(&self, name: &str, code: &str) -> Result<(), ClientError> {
        let sample = NewSample::new(name, code)?;

        let mut claim = Err(ClientError::Detached);
        self.state.send_if_modified(|s| {
            if s.lifecycle == Lifecycle::Detached {
                return false;
            }
            if s.adding {
                claim = Err(ClientError::Busy {
                    operation: "sample add",
                });
                return false;
            }
            s.adding = true;
            claim = Ok(());
            true
        });
        claim?;

        match self.api.create_sample(&sample).await {
            Ok(created) => {
                tracing::debug!(name = %sample.name, %created, "created code sample");
                self.commit(|s| {
                    s.adding = false;
                    s.add_form_open = false;
                    s.error = None;
                })?;
                if let Err(err) = self.fetch_all().await {
                    tracing::warn!("refresh after add failed: {}", err);
                }
                Ok(())
            }
            Err(err) => {
                tracing::warn!(name = %sample.name, "adding code sample failed: {}", err);
                self.commit(|s| {
                    s.adding = false;
                    s.error = Some(ADD_FAILED_MESSAGE.to_string());
                })?;
                Err(err.into())
            }
        }
    }

    /// Recomputes the filtered view for `term`. No network.
    pub fn set_search_term(&self, term: &str) {
        self.commit(|s| {
            s.search_term = term.to_string();
            s.filtered = filter_samples(&s.samples, term);
        })
        .ok();
    }

    pub fn open_add_form(&self) {
        self.commit(|s| s.add_form_open = true).ok();
    }

    pub fn close_add_form(&self) {
        self.commit(|s| s.add_form_open = false).ok();
    }

    /// Applies `f` and notifies subscribers, unless detached.
    fn commit<R>(&self, f: impl FnOnce(&mut SampleSnapshot) -> R) -> Result<R, ClientError> {
        let mut out = None;
        self.state.send_if_modified(|s| {
            if s.lifecycle == Lifecycle::Detached {
                return false;
            }
            out = Some(f(s));
            true
        });
        out.ok_or(ClientError::Detached)
    }

    fn ensure_live(&self) -> Result<(), ClientError> {
        if self.state.borrow().lifecycle == Lifecycle::Detached {
            return Err(ClientError::Detached);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{Endpoint, InMemoryBackend};

    fn store_with(backend: InMemoryBackend) -> (Arc<InMemoryBackend>, SampleStore<InMemoryBackend>) {
        let backend = Arc::new(backend);
        let store = SampleStore::new(CodeApi::from_shared(Arc::clone(&backend)));
        (backend, store)
    }

    fn names(samples: &[CodeSample]) -> Vec<&str> {
        samples.iter().map(|s| s.name.as_str()).collect()
    }

    async fn wait_for_call(backend: &InMemoryBackend, endpoint: Endpoint, count: usize) {
        while backend.call_count(endpoint) < count {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test]
    async fn attach_fetches_exactly_once() {
        let (backend, store) = store_with(InMemoryBackend::with_samples([("fib", "fn fib(){}")]));
        store.on_attach().await.unwrap();
        store.on_attach().await.unwrap();
        assert_eq!(backend.call_count(Endpoint::ListSamples), 1);
        let snap = store.snapshot();
        assert_eq!(snap.lifecycle, Lifecycle::Attached);
        assert_eq!(names(&snap.samples), vec!["fib"]);
        assert!(!snap.loading);
    }

    #[tokio::test]
    async fn failed_fetch_keeps_stale_collection_until_next_success() {
        let (backend, store) = store_with(InMemoryBackend::with_samples([("a", "1"), ("b", "2")]));
        store.fetch_all().await.unwrap();

        backend.fail(Endpoint::ListSamples);
        let err = store.fetch_all().await.unwrap_err();
        assert!(matches!(err, ClientError::Transport(_)));
        let snap = store.snapshot();
        assert_eq!(names(&snap.samples), vec!["a", "b"]);
        assert_eq!(snap.error.as_deref(), Some(FETCH_FAILED_MESSAGE));

        backend.recover(Endpoint::ListSamples);
        backend.insert("c", "3");
        store.fetch_all().await.unwrap();
        let snap = store.snapshot();
        assert_eq!(names(&snap.samples), vec!["a", "b", "c"]);
        assert_eq!(snap.error, None);
    }

    #[tokio::test]
    async fn refetch_drops_samples_removed_remotely() {
        let (backend, store) = store_with(InMemoryBackend::with_samples([("a", "1"), ("b", "2")]));
        store.fetch_all().await.unwrap();
        let first = store.snapshot().samples[0].id.clone();
        backend.remove(&first);
        store.fetch_all().await.unwrap();
        assert_eq!(names(&store.snapshot().samples), vec!["b"]);
    }

    #[tokio::test]
    async fn refetch_with_unchanged_remote_is_idempotent() {
        let (_backend, store) = store_with(InMemoryBackend::with_samples([
            ("Fibonacci", "1"),
            ("hello", "2"),
            ("fib-loop", "3"),
        ]));
        store.set_search_term("fib");
        store.fetch_all().await.unwrap();
        let before = store.snapshot().filtered;
        store.fetch_all().await.unwrap();
        assert_eq!(store.snapshot().filtered, before);
        assert_eq!(names(&before), vec!["Fibonacci", "fib-loop"]);
    }

    #[tokio::test]
    async fn search_term_recomputes_view_without_network() {
        let (backend, store) = store_with(InMemoryBackend::with_samples([("Alpha", "1"), ("beta", "2")]));
        store.fetch_all().await.unwrap();
        let mut rx = store.subscribe();
        rx.mark_unchanged();

        store.set_search_term("ALP");
        assert!(rx.has_changed().unwrap());
        assert_eq!(names(&store.snapshot().filtered), vec!["Alpha"]);

        store.set_search_term("");
        let snap = store.snapshot();
        assert_eq!(snap.filtered, snap.samples);
        assert_eq!(backend.call_count(Endpoint::ListSamples), 1);
    }

    #[tokio::test]
    async fn content_by_name_takes_two_hops() {
        let (backend, store) = store_with(InMemoryBackend::with_samples([
            ("hello", "puts(1)"),
            ("fib", "fn fib(){}"),
        ]));
        let code = store.fetch_content_by_name("fib").await.unwrap();
        assert_eq!(code, "fn fib(){}");
        let paths: Vec<String> = backend.calls().into_iter().map(|c| c.path).collect();
        assert_eq!(paths, vec!["/code/id_by_name", "/code/2"]);
    }

    #[tokio::test]
    async fn unknown_name_never_reaches_content_endpoint() {
        let (backend, store) = store_with(InMemoryBackend::new());
        let err = store.fetch_content_by_name("missing").await.unwrap_err();
        assert_eq!(
            err,
            ClientError::NotFound {
                name: "missing".into()
            }
        );
        assert_eq!(backend.call_count(Endpoint::ContentById), 0);
        assert_eq!(
            store.snapshot().error.as_deref(),
            Some("No code sample named 'missing' was found.")
        );
    }

    #[tokio::test]
    async fn failed_id_lookup_is_not_found() {
        let (backend, store) = store_with(InMemoryBackend::with_samples([("fib", "x")]));
        backend.fail(Endpoint::IdByName);
        let err = store.fetch_content_by_name("fib").await.unwrap_err();
        assert!(matches!(err, ClientError::NotFound { .. }));
        assert_eq!(backend.call_count(Endpoint::ContentById), 0);
    }

    #[tokio::test]
    async fn failed_content_fetch_is_transport_error() {
        let (backend, store) = store_with(InMemoryBackend::with_samples([("fib", "x")]));
        backend.fail(Endpoint::ContentById);
        let err = store.fetch_content_by_name("fib").await.unwrap_err();
        assert!(matches!(err, ClientError::Transport(_)));
        assert_eq!(store.snapshot().error.as_deref(), Some(CONTENT_FAILED_MESSAGE));
    }

    #[tokio::test]
    async fn blank_add_is_rejected_locally() {
        let (backend, store) = store_with(InMemoryBackend::new());
        backend.fail(Endpoint::ListSamples);
        let _ = store.fetch_all().await;
        let before = store.snapshot();
        let calls_before = backend.calls().len();

        let err = store.add_sample("", "let x = 1;").await.unwrap_err();
        assert!(matches!(err, ClientError::Validation(_)));
        let err = store.add_sample("name", "   ").await.unwrap_err();
        assert!(matches!(err, ClientError::Validation(_)));

        assert_eq!(backend.calls().len(), calls_before);
        // The unrelated fetch error is left as it was.
        assert_eq!(store.snapshot(), before);
    }

    #[tokio::test]
    async fn successful_add_refetches_and_closes_form() {
        let (backend, store) = store_with(InMemoryBackend::with_samples([("a", "1")]));
        store.on_attach().await.unwrap();
        store.open_add_form();

        store.add_sample("fib", "fn fib(){}").await.unwrap();

        assert_eq!(backend.call_count(Endpoint::CreateSample), 1);
        assert_eq!(backend.call_count(Endpoint::ListSamples), 2);
        let snap = store.snapshot();
        assert!(!snap.add_form_open);
        assert!(!snap.adding);
        assert_eq!(names(&snap.samples), vec!["a", "fib"]);
        assert_eq!(snap.samples[1].id.as_str(), "2");
    }

    #[tokio::test]
    async fn failed_add_keeps_collection_and_form() {
        let (backend, store) = store_with(InMemoryBackend::with_samples([("a", "1")]));
        store.on_attach().await.unwrap();
        store.open_add_form();
        backend.fail(Endpoint::CreateSample);

        let err = store.add_sample("fib", "fn fib(){}").await.unwrap_err();
        assert!(matches!(err, ClientError::Transport(_)));
        let snap = store.snapshot();
        assert!(snap.add_form_open);
        assert!(!snap.adding);
        assert_eq!(names(&snap.samples), vec!["a"]);
        assert_eq!(snap.error.as_deref(), Some(ADD_FAILED_MESSAGE));
        assert_eq!(backend.call_count(Endpoint::ListSamples), 1);
    }

    #[tokio::test]
    async fn second_add_while_first_in_flight_is_busy() {
        let (backend, store) = store_with(InMemoryBackend::new());
        backend.pause(Endpoint::CreateSample);

        let first = tokio::spawn({
            let store = store.clone();
            async move { store.add_sample("one", "1").await }
        });
        wait_for_call(&backend, Endpoint::CreateSample, 1).await;
        assert!(store.snapshot().adding);

        let err = store.add_sample("two", "2").await.unwrap_err();
        assert_eq!(
            err,
            ClientError::Busy {
                operation: "sample add"
            }
        );

        backend.resume(Endpoint::CreateSample);
        first.await.unwrap().unwrap();
        assert_eq!(backend.call_count(Endpoint::CreateSample), 1);
        assert_eq!(names(&store.snapshot().samples), vec!["one"]);
    }

    #[tokio::test]
    async fn stale_fetch_response_is_dropped() {
        let (backend, store) = store_with(InMemoryBackend::with_samples([("old", "1")]));
        backend.gate_calls(Endpoint::ListSamples);

        let spawn_fetch = |store: &SampleStore<InMemoryBackend>| {
            let store = store.clone();
            tokio::spawn(async move { store.fetch_all().await })
        };
        let earlier = spawn_fetch(&store);
        wait_for_call(&backend, Endpoint::ListSamples, 1).await;
        let later = spawn_fetch(&store);
        wait_for_call(&backend, Endpoint::ListSamples, 2).await;

        // The later fetch sees the newer listing and completes first.
        let old = backend.samples()[0].id.clone();
        backend.remove(&old);
        backend.insert("new", "2");
        assert!(backend.release_call(Endpoint::ListSamples, 1));
        later.await.unwrap().unwrap();
        let snap = store.snapshot();
        assert_eq!(names(&snap.samples), vec!["new"]);
        assert!(snap.loading);

        // The earlier fetch answers last with different data; it is ignored.
        backend.insert("stale", "3");
        assert!(backend.release_call(Endpoint::ListSamples, 0));
        earlier.await.unwrap().unwrap();
        let snap = store.snapshot();
        assert_eq!(names(&snap.samples), vec!["new"]);
        assert!(!snap.loading);
        assert_eq!(snap.error, None);
    }

    #[tokio::test]
    async fn stale_fetch_failure_does_not_set_error() {
        let (backend, store) = store_with(InMemoryBackend::with_samples([("a", "1")]));
        backend.gate_calls(Endpoint::ListSamples);

        let spawn_fetch = |store: &SampleStore<InMemoryBackend>| {
            let store = store.clone();
            tokio::spawn(async move { store.fetch_all().await })
        };
        let earlier = spawn_fetch(&store);
        wait_for_call(&backend, Endpoint::ListSamples, 1).await;
        let later = spawn_fetch(&store);
        wait_for_call(&backend, Endpoint::ListSamples, 2).await;

        assert!(backend.release_call(Endpoint::ListSamples, 1));
        later.await.unwrap().unwrap();

        backend.fail(Endpoint::ListSamples);
        assert!(backend.release_call(Endpoint::ListSamples, 0));
        // The caller still learns its own request failed.
        assert!(matches!(
            earlier.await.unwrap(),
            Err(ClientError::Transport(_))
        ));
        let snap = store.snapshot();
        assert_eq!(snap.error, None);
        assert_eq!(names(&snap.samples), vec!["a"]);
        assert!(!snap.loading);
    }

    #[tokio::test]
    async fn response_after_detach_is_dropped() {
        let (backend, store) = store_with(InMemoryBackend::with_samples([("a", "1")]));
        backend.pause(Endpoint::ListSamples);

        let pending = tokio::spawn({
            let store = store.clone();
            async move { store.on_attach().await }
        });
        wait_for_call(&backend, Endpoint::ListSamples, 1).await;
        assert!(store.snapshot().loading);

        store.on_detach();
        let mut rx = store.subscribe();
        rx.mark_unchanged();
        backend.resume(Endpoint::ListSamples);

        assert_eq!(pending.await.unwrap(), Err(ClientError::Detached));
        let snap = store.snapshot();
        assert!(snap.samples.is_empty());
        assert_eq!(snap.lifecycle, Lifecycle::Detached);
        assert!(!rx.has_changed().unwrap());
    }

    #[tokio::test]
    async fn ui_setters_after_detach_change_nothing() {
        let (_backend, store) = store_with(InMemoryBackend::with_samples([("fib", "1")]));
        store.on_attach().await.unwrap();
        store.on_detach();
        let before = store.snapshot();
        let mut rx = store.subscribe();
        rx.mark_unchanged();

        store.set_search_term("zzz");
        store.open_add_form();
        store.close_add_form();

        assert_eq!(store.snapshot(), before);
        assert!(!rx.has_changed().unwrap());
    }
}

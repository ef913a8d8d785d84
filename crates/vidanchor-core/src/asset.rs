//! Deferred loading of 3D renderables
//!
//! An [`AssetHandle`] is a small promise: it can be polled, read once ready,
//! and notifies completion callbacks exactly once. [`AsyncAssetLoader`] starts
//! loads on a tokio runtime and shares one handle per registry key, so every
//! proxy node that asks for the same model ends up with the same
//! [`RenderableAsset`] instance.
//!
//! Completion callbacks run on whichever thread resolves the handle (a tokio
//! worker for real loads). A callback registered after resolution runs
//! immediately on the registering thread.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tokio::runtime::Handle;
use tracing::{debug, info, warn};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AssetError {
    #[error("Failed to read asset {path}: {message}")]
    Io { path: String, message: String },
    #[error("Asset {0} is empty")]
    Empty(String),
    #[error("Load of {0} was dropped before it finished")]
    Aborted(String),
}

/// A loaded model, shared read-only by every node that displays it
#[derive(Debug)]
pub struct RenderableAsset {
    registry_key: String,
    source: String,
    sha256: String,
    data: Vec<u8>,
}

impl RenderableAsset {
    /// Validate and fingerprint raw model bytes
    pub fn from_bytes(
        registry_key: impl Into<String>,
        source: impl Into<String>,
        data: Vec<u8>,
    ) -> Result<Self, AssetError> {
        let source = source.into();
        if data.is_empty() {
            return Err(AssetError::Empty(source));
        }
        Ok(Self {
            registry_key: registry_key.into(),
            sha256: sha256_hex(&data),
            source,
            data,
        })
    }

    pub fn registry_key(&self) -> &str {
        &self.registry_key
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// SHA256 of the model bytes as lowercase hex
    pub fn sha256(&self) -> &str {
        &self.sha256
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }
}

/// Result delivered to completion callbacks
pub type AssetOutcome = Result<Arc<RenderableAsset>, AssetError>;

type Completion = Box<dyn FnOnce(&AssetOutcome) + Send + 'static>;

enum LoadState {
    Pending(Vec<Completion>),
    Done(AssetOutcome),
}

struct HandleInner {
    registry_key: String,
    state: Mutex<LoadState>,
}

/// Promise for a renderable that may still be loading
#[derive(Clone)]
pub struct AssetHandle {
    inner: Arc<HandleInner>,
}

impl std::fmt::Debug for AssetHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AssetHandle")
            .field("registry_key", &self.inner.registry_key)
            .field("ready", &self.is_ready())
            .finish()
    }
}

impl AssetHandle {
    /// Create an unresolved handle; resolve it with [`AssetHandle::complete`]
    pub fn pending(registry_key: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(HandleInner {
                registry_key: registry_key.into(),
                state: Mutex::new(LoadState::Pending(Vec::new())),
            }),
        }
    }

    pub fn registry_key(&self) -> &str {
        &self.inner.registry_key
    }

    /// True once the load has succeeded
    pub fn is_ready(&self) -> bool {
        matches!(*self.inner.state.lock(), LoadState::Done(Ok(_)))
    }

    /// True once the load has finished, successfully or not
    pub fn is_done(&self) -> bool {
        matches!(*self.inner.state.lock(), LoadState::Done(_))
    }

    /// The loaded asset, or `None` while pending or after a failure.
    /// Every call after success returns the same `Arc`.
    pub fn get_if_ready(&self) -> Option<Arc<RenderableAsset>> {
        match &*self.inner.state.lock() {
            LoadState::Done(Ok(asset)) => Some(Arc::clone(asset)),
            _ => None,
        }
    }

    /// The load error, if the load failed
    pub fn error(&self) -> Option<AssetError> {
        match &*self.inner.state.lock() {
            LoadState::Done(Err(e)) => Some(e.clone()),
            _ => None,
        }
    }

    /// Register a callback that fires exactly once with the load outcome
    pub fn on_complete<F>(&self, callback: F)
    where
        F: FnOnce(&AssetOutcome) + Send + 'static,
    {
        let outcome = {
            let mut state = self.inner.state.lock();
            match &mut *state {
                LoadState::Pending(callbacks) => {
                    callbacks.push(Box::new(callback));
                    return;
                }
                LoadState::Done(outcome) => outcome.clone(),
            }
        };
        callback(&outcome);
    }

    /// Resolve the handle and fire pending callbacks outside the lock.
    /// Returns false if the handle was already resolved.
    pub fn complete(&self, outcome: AssetOutcome) -> bool {
        let callbacks = {
            let mut state = self.inner.state.lock();
            if matches!(*state, LoadState::Done(_)) {
                return false;
            }
            match std::mem::replace(&mut *state, LoadState::Done(outcome.clone())) {
                LoadState::Pending(callbacks) => callbacks,
                LoadState::Done(_) => Vec::new(),
            }
        };

        for callback in callbacks {
            callback(&outcome);
        }
        true
    }
}

/// Resolves the handle with `Aborted` if the load task is dropped unfinished,
/// e.g. when the runtime shuts down first
struct AbortOnDrop {
    handle: AssetHandle,
}

impl AbortOnDrop {
    fn finish(self, outcome: AssetOutcome) {
        self.handle.complete(outcome);
    }
}

impl Drop for AbortOnDrop {
    fn drop(&mut self) {
        let key = self.handle.registry_key().to_string();
        if self.handle.complete(Err(AssetError::Aborted(key.clone()))) {
            warn!(key = %key, "Renderable load aborted");
        }
    }
}

/// Starts model loads on a tokio runtime, one shared handle per registry key
pub struct AsyncAssetLoader {
    runtime: Handle,
    base_dir: PathBuf,
    handles: Mutex<HashMap<String, AssetHandle>>,
}

impl AsyncAssetLoader {
    /// Create a loader resolving relative sources against `base_dir`
    pub fn new(runtime: Handle, base_dir: impl Into<PathBuf>) -> Self {
        Self {
            runtime,
            base_dir: base_dir.into(),
            handles: Mutex::new(HashMap::new()),
        }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Start loading `source` under `registry_key`. Never blocks.
    ///
    /// A key that was already requested returns the existing handle and
    /// does not start a second load.
    pub fn load(&self, source: &str, registry_key: &str) -> AssetHandle {
        let mut handles = self.handles.lock();
        if let Some(existing) = handles.get(registry_key) {
            debug!(key = %registry_key, "Reusing in-flight or loaded asset");
            return existing.clone();
        }

        let handle = AssetHandle::pending(registry_key);
        handles.insert(registry_key.to_string(), handle.clone());

        let path = self.base_dir.join(source);
        let source = source.to_string();
        let key = registry_key.to_string();
        let guard = AbortOnDrop {
            handle: handle.clone(),
        };

        info!(key = %key, path = %path.display(), "Loading renderable");
        self.runtime.spawn(async move {
            let outcome = fetch_renderable(&path, &key, &source).await.map(Arc::new);
            match &outcome {
                Ok(asset) => info!(
                    key = %key,
                    bytes = asset.len(),
                    sha = %&asset.sha256()[..8],
                    "Renderable loaded"
                ),
                Err(e) => warn!(key = %key, error = %e, "Renderable load failed"),
            }
            guard.finish(outcome);
        });

        handle
    }

    /// Handle previously returned for `registry_key`, if any
    pub fn get(&self, registry_key: &str) -> Option<AssetHandle> {
        self.handles.lock().get(registry_key).cloned()
    }
}

async fn fetch_renderable(
    path: &Path,
    registry_key: &str,
    source: &str,
) -> Result<RenderableAsset, AssetError> {
    let data = tokio::fs::read(path).await.map_err(|e| AssetError::Io {
        path: path.display().to_string(),
        message: e.to_string(),
    })?;
    RenderableAsset::from_bytes(registry_key, source, data)
}

/// Compute SHA256 hash of data and return as hex string
pub fn sha256_hex(data: &[u8]) -> String {
    use sha2::{Digest, Sha256};
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;
    use tokio::sync::oneshot;

    fn asset(bytes: &[u8]) -> Arc<RenderableAsset> {
        Arc::new(RenderableAsset::from_bytes("earth", "earth.sfb", bytes.to_vec()).unwrap())
    }

    #[test]
    fn test_get_if_ready_is_stable() {
        let handle = AssetHandle::pending("earth");
        assert!(!handle.is_ready());
        assert!(handle.get_if_ready().is_none());

        assert!(handle.complete(Ok(asset(b"model"))));

        let first = handle.get_if_ready().unwrap();
        let second = handle.get_if_ready().unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert!(handle.is_ready());
    }

    #[test]
    fn test_callbacks_fire_once() {
        let handle = AssetHandle::pending("earth");
        let fired = Arc::new(AtomicUsize::new(0));

        let counter = fired.clone();
        handle.on_complete(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        assert!(handle.complete(Ok(asset(b"model"))));
        assert!(!handle.complete(Ok(asset(b"other"))));
        assert_eq!(fired.load(Ordering::SeqCst), 1);

        // The first resolution wins
        assert_eq!(handle.get_if_ready().unwrap().data(), b"model");
    }

    #[test]
    fn test_late_registration_fires_immediately() {
        let handle = AssetHandle::pending("earth");
        handle.complete(Err(AssetError::Empty("earth.sfb".to_string())));

        let fired = Arc::new(AtomicUsize::new(0));
        let counter = fired.clone();
        handle.on_complete(move |outcome| {
            assert!(outcome.is_err());
            counter.fetch_add(1, Ordering::SeqCst);
        });

        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert!(handle.is_done());
        assert!(!handle.is_ready());
        assert_eq!(handle.error(), Some(AssetError::Empty("earth.sfb".to_string())));
    }

    #[test]
    fn test_empty_model_rejected() {
        let err = RenderableAsset::from_bytes("earth", "earth.sfb", Vec::new()).unwrap_err();
        assert_eq!(err, AssetError::Empty("earth.sfb".to_string()));
    }

    #[test]
    fn test_sha256() {
        let hash = sha256_hex(b"hello world");
        assert_eq!(hash, "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9");
    }

    #[tokio::test]
    async fn test_loader_reads_file_and_shares_handle() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(temp_dir.path().join("earth.sfb"), b"sfb-bytes").unwrap();

        let loader = AsyncAssetLoader::new(Handle::current(), temp_dir.path());
        let handle = loader.load("earth.sfb", "earth");
        let again = loader.load("earth.sfb", "earth");

        let (tx, rx) = oneshot::channel();
        handle.on_complete(move |outcome| {
            let _ = tx.send(outcome.clone());
        });
        let loaded = rx.await.unwrap().unwrap();

        assert_eq!(loaded.data(), b"sfb-bytes");
        assert_eq!(loaded.sha256(), sha256_hex(b"sfb-bytes"));
        assert!(Arc::ptr_eq(&loaded, &again.get_if_ready().unwrap()));
        assert!(loader.get("earth").is_some());
    }

    #[test]
    fn test_runtime_shutdown_aborts_pending_load() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(temp_dir.path().join("earth.sfb"), b"sfb-bytes").unwrap();
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();

        let loader = AsyncAssetLoader::new(runtime.handle().clone(), temp_dir.path());
        let handle = loader.load("earth.sfb", "earth");
        assert!(!handle.is_done());

        // The task never got polled
        drop(runtime);

        let fired = Arc::new(AtomicUsize::new(0));
        let counter = fired.clone();
        handle.on_complete(move |outcome| {
            assert_eq!(outcome.as_ref().unwrap_err(), &AssetError::Aborted("earth".to_string()));
            counter.fetch_add(1, Ordering::SeqCst);
        });

        assert!(handle.is_done());
        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert_eq!(handle.error(), Some(AssetError::Aborted("earth".to_string())));
    }

    #[tokio::test]
    async fn test_loader_reports_missing_file() {
        let temp_dir = TempDir::new().unwrap();
        let loader = AsyncAssetLoader::new(Handle::current(), temp_dir.path());
        let handle = loader.load("missing.sfb", "missing");

        let (tx, rx) = oneshot::channel();
        handle.on_complete(move |outcome| {
            let _ = tx.send(outcome.clone());
        });

        let err = rx.await.unwrap().unwrap_err();
        assert!(matches!(err, AssetError::Io { .. }));
        assert!(handle.get_if_ready().is_none());
    }
}

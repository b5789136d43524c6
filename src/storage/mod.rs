//! Storage layer abstraction.
//!
//! Vector-index engines are reached through the [`PointBackend`] trait.
//! [`connect`] resolves a connection target to a backend:
//!
//! ```text
//! connect(target)
//!   ├── ":memory:"              → InMemoryBackend
//!   ├── "http://…", "https://…" → RestBackend
//!   └── anything else           → InMemoryBackend persisted at that path
//! ```

pub mod traits;
pub mod vector;

pub use traits::PointBackend;
pub use vector::{InMemoryBackend, MEMORY_TARGET, RestBackend};

use crate::Result;
use secrecy::SecretString;
use std::sync::Arc;

/// Opens a backend for a connection target.
///
/// The API key is only used by the REST backend.
///
/// # Errors
///
/// Returns an error if a persisted snapshot exists but cannot be loaded.
pub fn connect(target: &str, api_key: Option<SecretString>) -> Result<Arc<dyn PointBackend>> {
    if target == MEMORY_TARGET {
        tracing::debug!("connecting to in-memory backend");
        return Ok(Arc::new(InMemoryBackend::new()));
    }

    if target.starts_with("http://") || target.starts_with("https://") {
        tracing::debug!(url = target, "connecting to REST backend");
        let backend = RestBackend::new(target);
        let backend = match api_key {
            Some(key) => backend.with_api_key(key),
            None => backend,
        };
        return Ok(Arc::new(backend));
    }

    tracing::debug!(path = target, "connecting to persisted in-memory backend");
    Ok(Arc::new(InMemoryBackend::open(target)?))
}

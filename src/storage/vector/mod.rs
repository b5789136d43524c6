//! Point backend implementations.

mod memory;
mod rest;

pub use memory::{InMemoryBackend, MEMORY_TARGET};
pub use rest::RestBackend;

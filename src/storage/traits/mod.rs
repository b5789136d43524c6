//! Storage backend traits.

mod vector;

pub use vector::PointBackend;

//! Storage layer (in-memory location history).

pub mod store;

pub use store::LocationStore;

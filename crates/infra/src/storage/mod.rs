//! Durable token storage

pub mod file_store;

pub use file_store::FileTokenStore;

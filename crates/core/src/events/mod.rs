//! Platform lifecycle events

pub mod handler;

pub use handler::{EventStatus, LifecycleEvent, LifecycleEventHandler, PlatformEvent};

//! mastery-store: event store adapters.
//!
//! Implements the `EventStore` trait for an in-memory map, per-user JSON
//! lines files, and a remote document API, plus the configuration that
//! selects between them.

pub mod config;
pub mod file;
pub mod http;
pub mod memory;

pub use config::{create_store, load_config, MasteryConfig, StoreConfig};
pub use file::FileEventStore;
pub use http::HttpEventStore;
pub use memory::MemoryEventStore;

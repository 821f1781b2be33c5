//! Atlas Store: batched persistence of the project graph
//!
//! `GraphStore` and `StatusSink` are the seams; `CypherHttpStore` talks to a
//! graph database over HTTP and `MemoryStore` keeps everything in-process.

pub mod http;
pub mod memory;
pub mod statements;
pub mod store;
pub mod writer;

#[cfg(test)]
pub mod tests;

pub use http::CypherHttpStore;
pub use memory::{GraphView, MemoryStore, StatusUpdate};
pub use store::{GraphStore, StatusSink, StoreError};
pub use writer::{GraphWriter, WriteReport};

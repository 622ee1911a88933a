//! In-memory graph storage.

mod index;
mod store;

pub use index::{PropertyIndex, TYPE_KEY, ValueRef, node_value};
pub use store::{
    DEFAULT_AUTOSAVE_INTERVAL, DEFAULT_INDEXED_PROPERTIES, DEFAULT_MAX_BATCH_SIZE, GraphStore,
    GraphStoreConfig, GraphView, StoreStats,
};

pub mod error;
pub mod memory;
pub mod sql;
pub mod store;

pub use error::{Result, StoreError};
pub use memory::MemoryStore;
pub use sql::SqlStore;
pub use store::{DocumentStore, SharedStore};

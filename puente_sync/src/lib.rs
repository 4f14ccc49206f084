mod store;
mod sync;

pub use store::{MemoryStore, RemoteStore};
pub use sync::{ComponentSync, SyncRef};

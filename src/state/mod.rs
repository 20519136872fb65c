pub mod snapshot;
pub mod store;

pub use snapshot::{ChatId, Snapshot, UserRecord, UserStatus};
pub use store::{JsonFileStore, RecordStore};

#[cfg(test)]
pub(crate) use store::memory::MemoryStore;

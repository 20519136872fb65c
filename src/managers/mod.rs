pub mod lifecycle_manager;

pub use lifecycle_manager::{create_shared_lifecycle_manager, Outcome, SharedLifecycleManager};

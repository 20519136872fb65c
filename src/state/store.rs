use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::snapshot::Snapshot;
use crate::error::{Result, RosterError};

/// Durable home of the snapshot. Every save replaces the whole thing.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Read the persisted snapshot; a store that was never written yields an empty one
    async fn load(&self) -> Result<Snapshot>;

    /// Replace the persisted snapshot
    async fn save(&self, snapshot: &Snapshot) -> Result<()>;
}

/// Snapshot kept as a pretty-printed JSON file
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn display_path(&self) -> String {
        self.path.display().to_string()
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self.path.as_os_str().to_owned();
        name.push(".tmp");
        PathBuf::from(name)
    }
}

#[async_trait]
impl RecordStore for JsonFileStore {
    async fn load(&self) -> Result<Snapshot> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => {
                let snapshot: Snapshot =
                    serde_json::from_str(&content).map_err(|e| RosterError::StateParse {
                        path: self.display_path(),
                        source: e,
                    })?;
                debug!(
                    "Loaded {} users from {}",
                    snapshot.users.len(),
                    self.path.display()
                );
                Ok(snapshot)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!(
                    "No snapshot at {}, starting with an empty roster",
                    self.path.display()
                );
                Ok(Snapshot::new())
            }
            Err(e) => Err(RosterError::StateLoad {
                path: self.display_path(),
                source: e,
            }),
        }
    }

    async fn save(&self, snapshot: &Snapshot) -> Result<()> {
        let content = serde_json::to_string_pretty(snapshot)?;

        // Write to temp file first, then rename for atomicity
        let temp_path = self.temp_path();
        tokio::fs::write(&temp_path, &content)
            .await
            .map_err(|e| RosterError::StateSave {
                path: self.display_path(),
                source: e,
            })?;

        tokio::fs::rename(&temp_path, &self.path)
            .await
            .map_err(|e| RosterError::StateSave {
                path: self.display_path(),
                source: e,
            })?;

        debug!(
            "Saved {} users to {}",
            snapshot.users.len(),
            self.path.display()
        );
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod memory {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    /// In-memory store for exercising the lifecycle without touching disk
    #[derive(Default)]
    pub struct MemoryStore {
        snapshot: Mutex<Option<Snapshot>>,
        fail_saves: AtomicBool,
        fail_loads: AtomicBool,
        saves: AtomicUsize,
        /// Yield to the scheduler between reading and returning, so that
        /// concurrent operations interleave their load and save
        yield_on_load: AtomicBool,
    }

    impl MemoryStore {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with_snapshot(snapshot: Snapshot) -> Self {
            let store = Self::default();
            *store.snapshot.lock() = Some(snapshot);
            store
        }

        pub fn current(&self) -> Option<Snapshot> {
            self.snapshot.lock().clone()
        }

        pub fn save_count(&self) -> usize {
            self.saves.load(Ordering::SeqCst)
        }

        pub fn fail_saves(&self, fail: bool) {
            self.fail_saves.store(fail, Ordering::SeqCst);
        }

        pub fn fail_loads(&self, fail: bool) {
            self.fail_loads.store(fail, Ordering::SeqCst);
        }

        pub fn yield_on_load(&self, enabled: bool) {
            self.yield_on_load.store(enabled, Ordering::SeqCst);
        }
    }

    #[async_trait]
    impl RecordStore for MemoryStore {
        async fn load(&self) -> Result<Snapshot> {
            if self.fail_loads.load(Ordering::SeqCst) {
                return Err(RosterError::Internal {
                    message: "load failure injected".to_string(),
                });
            }
            let snapshot = self.snapshot.lock().clone().unwrap_or_default();
            if self.yield_on_load.load(Ordering::SeqCst) {
                tokio::task::yield_now().await;
            }
            Ok(snapshot)
        }

        async fn save(&self, snapshot: &Snapshot) -> Result<()> {
            if self.fail_saves.load(Ordering::SeqCst) {
                return Err(RosterError::Internal {
                    message: "save failure injected".to_string(),
                });
            }
            *self.snapshot.lock() = Some(snapshot.clone());
            self.saves.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }
}

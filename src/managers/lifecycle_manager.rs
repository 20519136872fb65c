use chrono::NaiveDateTime;
use futures::future::join_all;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use crate::messages;
use crate::notify::{DeliveryReport, Dispatcher};
use crate::state::{RecordStore, Snapshot, UserStatus};

/// Result of one lifecycle operation
///
/// Callers in the admin panel redirect no matter what; this exists so the
/// engine can be inspected on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The state change was made
    Applied {
        /// False when the save failed; the change is lost on restart
        persisted: bool,
        delivery: DeliveryReport,
    },
    /// No record with that WhatsApp number
    NotFound,
    /// A record matched but is not in a state the operation applies to
    NotEligible,
    /// Nothing to do for the given input
    Ignored,
    /// The snapshot could not be read; nothing was changed
    StoreUnavailable,
}

impl Outcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, Outcome::Applied { .. })
    }

    /// Applied, but the save or at least one notification failed
    pub fn is_partial(&self) -> bool {
        match self {
            Outcome::Applied {
                persisted,
                delivery,
            } => !persisted || delivery.failed > 0,
            _ => false,
        }
    }
}

/// Applies administrator decisions to the roster and tells the applicant
pub struct LifecycleManager {
    store: Arc<dyn RecordStore>,
    dispatcher: Dispatcher,

    /// Held across load-mutate-save when single-writer mode is on
    write_lock: Option<Mutex<()>>,
}

impl LifecycleManager {
    pub fn new(store: Arc<dyn RecordStore>, dispatcher: Dispatcher) -> Self {
        Self {
            store,
            dispatcher,
            write_lock: None,
        }
    }

    /// Serialize every operation's load-mutate-save.
    ///
    /// Without this, two operations running at once can each load the same
    /// snapshot and the later save drops the earlier change.
    pub fn serialized(mut self) -> Self {
        self.write_lock = Some(Mutex::new(()));
        self
    }

    pub fn is_serialized(&self) -> bool {
        self.write_lock.is_some()
    }

    /// Read-only view of the current roster
    pub async fn snapshot(&self) -> crate::error::Result<Snapshot> {
        self.store.load().await
    }

    /// Set a user's status. `verified` restarts their day counter.
    pub async fn set_status(&self, whatsapp: &str, status: &str) -> Outcome {
        if status.is_empty() {
            debug!("Empty status for {}, ignoring", whatsapp);
            return Outcome::Ignored;
        }
        let status = UserStatus::from(status);

        let _guard = self.lock().await;
        let Some(mut snapshot) = self.load().await else {
            return Outcome::StoreUnavailable;
        };

        let now = now();
        let Some(user) = snapshot.find_mut(whatsapp) else {
            debug!("set_status: no user {}", whatsapp);
            return Outcome::NotFound;
        };

        let message = match &status {
            UserStatus::Verified => {
                user.mark_verified(now);
                Some(messages::verified_message(&user.name))
            }
            UserStatus::Rejected => {
                user.status = UserStatus::Rejected;
                Some(messages::rejected_message(&user.name))
            }
            other => {
                user.status = other.clone();
                None
            }
        };
        let chat_id = user.chat_id.clone();
        info!("User {} status set to {}", whatsapp, status);

        let persisted = self.persist(&snapshot).await;
        drop(_guard);

        let delivery = match message {
            Some(text) => self.dispatcher.notify(chat_id.as_ref(), &text).await.into(),
            None => DeliveryReport::default(),
        };

        Outcome::Applied {
            persisted,
            delivery,
        }
    }

    /// Remove every record with this number, telling the first one first
    pub async fn delete_user(&self, whatsapp: &str) -> Outcome {
        let _guard = self.lock().await;
        let Some(mut snapshot) = self.load().await else {
            return Outcome::StoreUnavailable;
        };

        let Some(user) = snapshot.find(whatsapp) else {
            debug!("delete_user: no user {}", whatsapp);
            return Outcome::NotFound;
        };

        // The applicant hears about it before the removal is on disk
        let text = messages::deleted_message(&user.name);
        let delivery: DeliveryReport = self
            .dispatcher
            .notify(user.chat_id.as_ref(), &text)
            .await
            .into();

        let removed = snapshot.remove_all(whatsapp);
        info!("Deleted {} record(s) for {}", removed, whatsapp);

        let persisted = self.persist(&snapshot).await;

        Outcome::Applied {
            persisted,
            delivery,
        }
    }

    /// Credit days to a verified user
    pub async fn renew(&self, whatsapp: &str, renewal_days: u32) -> Outcome {
        let _guard = self.lock().await;
        let Some(mut snapshot) = self.load().await else {
            return Outcome::StoreUnavailable;
        };

        let position = snapshot
            .users
            .iter()
            .position(|u| u.whatsapp == whatsapp && u.status == UserStatus::Verified);
        let Some(index) = position else {
            return if snapshot.find(whatsapp).is_some() {
                debug!("renew: user {} is not verified", whatsapp);
                Outcome::NotEligible
            } else {
                debug!("renew: no user {}", whatsapp);
                Outcome::NotFound
            };
        };

        let user = &mut snapshot.users[index];
        let total = user.renew(renewal_days, now());
        let chat_id = user.chat_id.clone();
        info!(
            "Renewed {} by {} days, {} days total",
            whatsapp, renewal_days, total
        );

        let persisted = self.persist(&snapshot).await;
        drop(_guard);

        let delivery = self
            .dispatcher
            .notify(chat_id.as_ref(), &messages::renewed_message(total))
            .await
            .into();

        Outcome::Applied {
            persisted,
            delivery,
        }
    }

    /// Store a new link and push it to every verified user with a chat
    pub async fn broadcast_link(&self, link: &str) -> Outcome {
        let _guard = self.lock().await;
        let Some(mut snapshot) = self.load().await else {
            return Outcome::StoreUnavailable;
        };

        snapshot.link = link.to_string();
        let persisted = self.persist(&snapshot).await;
        drop(_guard);

        let text = messages::broadcast_message(link);
        let recipients: Vec<_> = snapshot
            .verified()
            .filter_map(|u| u.chat_id.as_ref())
            .collect();
        info!("Broadcasting link to {} verified users", recipients.len());

        let delivery: DeliveryReport = join_all(
            recipients
                .into_iter()
                .map(|chat_id| self.dispatcher.notify(Some(chat_id), &text)),
        )
        .await
        .into_iter()
        .collect();

        if delivery.failed > 0 {
            warn!(
                "Link broadcast reached {} of {} users",
                delivery.sent,
                delivery.attempted()
            );
        }

        Outcome::Applied {
            persisted,
            delivery,
        }
    }

    async fn lock(&self) -> Option<tokio::sync::MutexGuard<'_, ()>> {
        match &self.write_lock {
            Some(lock) => Some(lock.lock().await),
            None => None,
        }
    }

    async fn load(&self) -> Option<Snapshot> {
        match self.store.load().await {
            Ok(snapshot) => Some(snapshot),
            Err(e) => {
                error!("Could not load snapshot, operation skipped: {}", e);
                None
            }
        }
    }

    /// Save, logging instead of failing
    async fn persist(&self, snapshot: &Snapshot) -> bool {
        match self.store.save(snapshot).await {
            Ok(()) => true,
            Err(e) => {
                error!("Error saving data: {}", e);
                false
            }
        }
    }
}

fn now() -> NaiveDateTime {
    chrono::Local::now().naive_local()
}

/// Shared lifecycle manager type
pub type SharedLifecycleManager = Arc<LifecycleManager>;

pub fn create_shared_lifecycle_manager(
    store: Arc<dyn RecordStore>,
    dispatcher: Dispatcher,
    serialize_writes: bool,
) -> SharedLifecycleManager {
    let manager = LifecycleManager::new(store, dispatcher);
    if serialize_writes {
        Arc::new(manager.serialized())
    } else {
        Arc::new(manager)
    }
}

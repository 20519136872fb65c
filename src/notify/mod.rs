//! Best-effort delivery of text messages to applicants
//!
//! The lifecycle manager talks to a [`Dispatcher`], which wraps any
//! [`Notifier`] transport and turns every failure into a log line.

mod dispatcher;
mod telegram;

pub use dispatcher::{DeliveryReport, Dispatcher};
pub use telegram::{DisabledNotifier, TelegramConfig, TelegramNotifier};

use async_trait::async_trait;

use crate::error::Result;
use crate::state::ChatId;

/// Transport that can put one message into one chat
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, chat_id: &ChatId, text: &str) -> Result<()>;
}

#[cfg(test)]
pub(crate) mod recording {
    use super::*;
    use crate::error::RosterError;
    use parking_lot::Mutex;
    use std::collections::HashSet;

    /// Notifier that remembers what it was asked to send
    #[derive(Default)]
    pub struct RecordingNotifier {
        sent: Mutex<Vec<(ChatId, String)>>,
        failing: Mutex<HashSet<ChatId>>,
    }

    impl RecordingNotifier {
        pub fn new() -> Self {
            Self::default()
        }

        /// Make every send to this chat fail
        pub fn fail_for(&self, chat_id: impl Into<ChatId>) {
            self.failing.lock().insert(chat_id.into());
        }

        pub fn sent(&self) -> Vec<(ChatId, String)> {
            self.sent.lock().clone()
        }
    }

    #[async_trait]
    impl Notifier for RecordingNotifier {
        async fn send(&self, chat_id: &ChatId, text: &str) -> Result<()> {
            self.sent.lock().push((chat_id.clone(), text.to_string()));
            if self.failing.lock().contains(chat_id) {
                return Err(RosterError::NotifyRejected {
                    status: 400,
                    body: "chat not found".to_string(),
                });
            }
            Ok(())
        }
    }
}

use std::sync::Arc;
use tracing::{debug, warn};

use super::Notifier;
use crate::state::ChatId;

/// What happened to a single notification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Sent,
    Failed,
    /// No usable chat id, nothing was attempted
    Skipped,
}

/// Tally of notification results for one lifecycle operation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeliveryReport {
    pub sent: usize,
    pub failed: usize,
    pub skipped: usize,
}

impl DeliveryReport {
    pub fn record(&mut self, delivery: Delivery) {
        match delivery {
            Delivery::Sent => self.sent += 1,
            Delivery::Failed => self.failed += 1,
            Delivery::Skipped => self.skipped += 1,
        }
    }

    pub fn attempted(&self) -> usize {
        self.sent + self.failed
    }
}

impl From<Delivery> for DeliveryReport {
    fn from(delivery: Delivery) -> Self {
        let mut report = Self::default();
        report.record(delivery);
        report
    }
}

impl FromIterator<Delivery> for DeliveryReport {
    fn from_iter<I: IntoIterator<Item = Delivery>>(iter: I) -> Self {
        let mut report = Self::default();
        for delivery in iter {
            report.record(delivery);
        }
        report
    }
}

/// Fire-and-forget front of a notifier. Never retries, never fails.
#[derive(Clone)]
pub struct Dispatcher {
    notifier: Arc<dyn Notifier>,
}

impl Dispatcher {
    pub fn new(notifier: Arc<dyn Notifier>) -> Self {
        Self { notifier }
    }

    pub async fn notify(&self, chat_id: Option<&ChatId>, text: &str) -> Delivery {
        let chat_id = match chat_id {
            Some(id) if id.is_addressable() => id,
            _ => {
                debug!("No chat id, skipping notification");
                return Delivery::Skipped;
            }
        };

        match self.notifier.send(chat_id, text).await {
            Ok(()) => {
                debug!("Notified chat {}", chat_id);
                Delivery::Sent
            }
            Err(e) => {
                warn!("Error notifying chat {}: {}", chat_id, e);
                Delivery::Failed
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::recording::RecordingNotifier;

    #[tokio::test]
    async fn test_absent_chat_is_skipped() {
        let notifier = Arc::new(RecordingNotifier::new());
        let dispatcher = Dispatcher::new(notifier.clone());

        assert_eq!(dispatcher.notify(None, "hi").await, Delivery::Skipped);
        assert_eq!(
            dispatcher.notify(Some(&ChatId::from("")), "hi").await,
            Delivery::Skipped
        );
        assert!(notifier.sent().is_empty());
    }

    #[tokio::test]
    async fn test_failure_is_swallowed() {
        let notifier = Arc::new(RecordingNotifier::new());
        notifier.fail_for("c1");
        let dispatcher = Dispatcher::new(notifier.clone());

        let delivery = dispatcher.notify(Some(&ChatId::from("c1")), "hi").await;
        assert_eq!(delivery, Delivery::Failed);
        assert_eq!(notifier.sent().len(), 1);
    }

    #[test]
    fn test_report_tally() {
        let report: DeliveryReport = [Delivery::Sent, Delivery::Failed, Delivery::Sent, Delivery::Skipped]
            .into_iter()
            .collect();
        assert_eq!(report.sent, 2);
        assert_eq!(report.failed, 1);
        assert_eq!(report.skipped, 1);
        assert_eq!(report.attempted(), 3);
    }
}

use thiserror::Error;

#[derive(Error, Debug)]
pub enum RosterError {
    // Snapshot errors
    #[error("Failed to load snapshot from '{path}': {source}")]
    StateLoad {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse snapshot '{path}': {source}")]
    StateParse {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to save snapshot to '{path}': {source}")]
    StateSave {
        path: String,
        #[source]
        source: std::io::Error,
    },

    // Notification errors
    #[error("Bot API request failed: {source}")]
    NotifyTransport {
        #[source]
        source: reqwest::Error,
    },

    #[error("Bot API rejected message ({status}): {body}")]
    NotifyRejected { status: u16, body: String },

    #[error("Notifier not configured (BOT_TOKEN missing)")]
    NotifierDisabled,

    // Generic errors
    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl From<reqwest::Error> for RosterError {
    fn from(err: reqwest::Error) -> Self {
        RosterError::NotifyTransport { source: err }
    }
}

impl From<serde_json::Error> for RosterError {
    fn from(err: serde_json::Error) -> Self {
        RosterError::Internal {
            message: err.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, RosterError>;

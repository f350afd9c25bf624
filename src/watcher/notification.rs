use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

/// A Trello list being watched
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Target {
    /// Opaque Trello list identifier
    pub id: String,

    /// Display name used in alarms and stats
    pub name: String,
}

/// Trello API credentials
#[derive(Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Credentials {
    pub api_key: String,
    pub token: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("api_key", &"<redacted>")
            .field("token", &"<redacted>")
            .finish()
    }
}

/// Payload of the `start` command
#[derive(Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StartPayload {
    pub api_key: String,
    pub token: String,
    pub targets: Vec<Target>,
}

impl std::fmt::Debug for StartPayload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StartPayload")
            .field("api_key", &"<redacted>")
            .field("token", &"<redacted>")
            .field("targets", &self.targets)
            .finish()
    }
}

impl StartPayload {
    /// Split the payload into credentials and targets
    pub fn into_parts(self) -> (Credentials, Vec<Target>) {
        (
            Credentials {
                api_key: self.api_key,
                token: self.token,
            },
            self.targets,
        )
    }
}

/// Inbound command from the host
///
/// Wire format: `{"cmd": "start", "payload": {...}}` or `{"cmd": "stop"}`.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(tag = "cmd", rename_all = "snake_case")]
pub enum Command {
    Start { payload: StartPayload },
    Stop {},
}

/// Per-list entry of a stats snapshot
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Bucket {
    pub id: String,
    pub name: String,
    pub count: usize,
}

/// Outbound notification to the host
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Notification {
    Log {
        msg: String,
        #[serde(rename = "isError", default, skip_serializing_if = "std::ops::Not::not")]
        is_error: bool,
    },
    Alarm {
        #[serde(rename = "cardName")]
        card_name: String,
        #[serde(rename = "listName")]
        list_name: String,
    },
    Stats {
        total: usize,
        buckets: Vec<Bucket>,
    },
    AuthFail,
}

impl Notification {
    pub fn info(msg: impl Into<String>) -> Self {
        Notification::Log {
            msg: msg.into(),
            is_error: false,
        }
    }

    pub fn error(msg: impl Into<String>) -> Self {
        Notification::Log {
            msg: msg.into(),
            is_error: true,
        }
    }
}

/// Destination for engine notifications
///
/// The engine never waits on the host; a sink that has gone away simply
/// drops what it is given.
pub trait NotificationSink: Send + Sync + 'static {
    fn notify(&self, notification: Notification);
}

impl NotificationSink for mpsc::UnboundedSender<Notification> {
    fn notify(&self, notification: Notification) {
        mirror_to_tracing(&notification);
        if self.send(notification).is_err() {
            tracing::debug!("Notification receiver closed, dropping notification");
        }
    }
}

fn mirror_to_tracing(notification: &Notification) {
    match notification {
        Notification::Log { msg, is_error: false } => tracing::info!("{}", msg),
        Notification::Log { msg, is_error: true } => tracing::error!("{}", msg),
        Notification::Alarm { card_name, list_name } => {
            tracing::info!(card = %card_name, list = %list_name, "New card detected");
        }
        Notification::Stats { total, buckets } => {
            tracing::debug!(total, lists = buckets.len(), "Stats snapshot");
        }
        Notification::AuthFail => tracing::error!("Trello rejected the credentials"),
    }
}

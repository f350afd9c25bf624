// Poll engine for Trello lists
//
// Each run fetches every watched list on a fixed interval, drops divider and
// placeholder cards, compares the remaining card ids with the previous pass,
// and reports stats plus at most one new-card alarm per pass.

mod client;
mod engine;
mod filter;
mod notification;
mod poller;

pub use client::{BoardClient, DEFAULT_API_BASE_URL, DEFAULT_TIMEOUT_SECS};
pub use engine::{Engine, EngineSettings, POLL_INTERVAL};
pub use notification::{Bucket, Command, Credentials, Notification, NotificationSink, Target};
pub use poller::{DEFAULT_FAILURE_WARN_THRESHOLD, PassOutcome, Poller};

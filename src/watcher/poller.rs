use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use super::client::{BoardClient, Card};
use super::filter::should_ignore;
use super::notification::{Bucket, Notification, NotificationSink, Target};

/// Consecutive per-list failures before a warning is logged
pub const DEFAULT_FAILURE_WARN_THRESHOLD: u32 = 5;

/// How a pass ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassOutcome {
    /// Every list was visited and a stats snapshot was sent
    Completed,
    /// Trello rejected the credentials; the run must end
    AuthFailed,
}

/// Per-run polling state: one fetch-filter-diff-report sweep at a time
pub struct Poller<S: NotificationSink> {
    client: BoardClient,
    targets: Vec<Target>,
    sink: Arc<S>,
    /// Active card ids per list id, as of the last successful fetch
    memberships: HashMap<String, HashSet<String>>,
    /// Consecutive transient failures per list id
    failures: HashMap<String, u32>,
    failure_warn_threshold: u32,
}

impl<S: NotificationSink> Poller<S> {
    pub fn new(client: BoardClient, targets: Vec<Target>, sink: Arc<S>) -> Self {
        Self {
            client,
            targets,
            sink,
            memberships: HashMap::new(),
            failures: HashMap::new(),
            failure_warn_threshold: DEFAULT_FAILURE_WARN_THRESHOLD,
        }
    }

    pub fn with_failure_warn_threshold(mut self, threshold: u32) -> Self {
        self.failure_warn_threshold = threshold.max(1);
        self
    }

    pub fn targets(&self) -> &[Target] {
        &self.targets
    }

    /// Active card ids recorded for a list, if it has been fetched successfully
    pub fn membership(&self, list_id: &str) -> Option<&HashSet<String>> {
        self.memberships.get(list_id)
    }

    pub fn consecutive_failures(&self, list_id: &str) -> u32 {
        self.failures.get(list_id).copied().unwrap_or(0)
    }

    /// Run one pass over every list, in order
    ///
    /// The first pass of a run only records a baseline and never alarms.
    /// At most one alarm is raised per pass.
    pub async fn run_pass(&mut self, is_first_run: bool) -> PassOutcome {
        let mut global_total = 0;
        let mut buckets = Vec::with_capacity(self.targets.len());
        let mut alarm_triggered = false;

        for index in 0..self.targets.len() {
            let target = &self.targets[index];

            let cards = match self.client.list_cards(&target.id).await {
                Ok(cards) => cards,
                Err(e) if e.is_unauthorized() => {
                    tracing::warn!("Unauthorized while fetching list {}", target.id);
                    self.sink.notify(Notification::AuthFail);
                    return PassOutcome::AuthFailed;
                }
                Err(e) => {
                    self.sink.notify(Notification::error(format!(
                        "Sync error on {}: {}",
                        target.name, e
                    )));
                    self.record_failure(index);
                    continue;
                }
            };

            let active: Vec<&Card> = cards
                .iter()
                .filter(|card| !should_ignore(card.name.as_deref()))
                .collect();
            let current: HashSet<String> = active.iter().map(|card| card.id.clone()).collect();

            if !is_first_run && !alarm_triggered {
                let previous = self.memberships.get(&target.id);
                let new_card = active
                    .iter()
                    .find(|card| previous.is_none_or(|set| !set.contains(&card.id)));

                if let Some(card) = new_card {
                    self.sink.notify(Notification::Alarm {
                        card_name: card.name.clone().unwrap_or_default(),
                        list_name: target.name.clone(),
                    });
                    alarm_triggered = true;
                }
            }

            let count = current.len();
            global_total += count;
            buckets.push(Bucket {
                id: target.id.clone(),
                name: target.name.clone(),
                count,
            });

            self.failures.remove(&target.id);
            self.memberships.insert(target.id.clone(), current);
        }

        self.sink.notify(Notification::Stats {
            total: global_total,
            buckets,
        });

        PassOutcome::Completed
    }

    fn record_failure(&mut self, index: usize) {
        let target = &self.targets[index];
        let streak = self.failures.entry(target.id.clone()).or_insert(0);
        *streak += 1;

        if *streak == self.failure_warn_threshold {
            tracing::warn!(
                "List {} ({}) has failed {} polls in a row",
                target.name,
                target.id,
                streak
            );
        }
    }
}

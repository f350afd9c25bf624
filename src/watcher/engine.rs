use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};

use super::client::{BoardClient, DEFAULT_API_BASE_URL, DEFAULT_TIMEOUT_SECS};
use super::notification::{Command, Credentials, Notification, NotificationSink, Target};
use super::poller::{DEFAULT_FAILURE_WARN_THRESHOLD, PassOutcome, Poller};

/// Fixed period between passes
pub const POLL_INTERVAL: Duration = Duration::from_millis(15_000);

/// Settings that outlive a single run
#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub api_base_url: String,
    pub fetch_timeout: Duration,
    pub failure_warn_threshold: u32,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            fetch_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            failure_warn_threshold: DEFAULT_FAILURE_WARN_THRESHOLD,
        }
    }
}

/// Poll engine lifecycle: Idle until started, Running until stopped or
/// until Trello rejects the credentials.
///
/// A run lives entirely inside one spawned task that owns the poller.
/// Passes execute one after another in that task, so a slow pass delays
/// the next tick instead of overlapping it. Aborting the task cancels the
/// timer and drops all membership state.
pub struct Engine<S: NotificationSink> {
    settings: EngineSettings,
    sink: Arc<S>,
    poll_interval: Duration,
    run: Option<JoinHandle<()>>,
}

impl<S: NotificationSink> Engine<S> {
    pub fn new(settings: EngineSettings, sink: S) -> Self {
        Self {
            settings,
            sink: Arc::new(sink),
            poll_interval: POLL_INTERVAL,
            run: None,
        }
    }

    #[cfg(test)]
    fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Whether a run is active (timer armed or first pass in flight)
    pub fn is_running(&self) -> bool {
        self.run.as_ref().is_some_and(|handle| !handle.is_finished())
    }

    /// Dispatch a host command. Failures are reported as notifications.
    pub fn handle(&mut self, command: Command) {
        match command {
            Command::Start { payload } => {
                let (credentials, targets) = payload.into_parts();
                if let Err(e) = self.start(credentials, targets) {
                    self.sink
                        .notify(Notification::error(format!("Failed to start worker: {:#}", e)));
                }
            }
            Command::Stop {} => self.stop(),
        }
    }

    /// Begin a new run, superseding any run already in progress
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(&mut self, credentials: Credentials, targets: Vec<Target>) -> Result<()> {
        self.cancel_run();

        let client = BoardClient::new(
            &self.settings.api_base_url,
            credentials,
            self.settings.fetch_timeout,
        )?;

        self.sink.notify(Notification::info(format!(
            "Worker started. Monitoring {} lists...",
            targets.len()
        )));

        let poller = Poller::new(client, targets, self.sink.clone())
            .with_failure_warn_threshold(self.settings.failure_warn_threshold);
        self.run = Some(tokio::spawn(run_loop(poller, self.poll_interval)));

        Ok(())
    }

    /// End the current run, if any
    pub fn stop(&mut self) {
        self.cancel_run();
        self.sink.notify(Notification::info("Worker stopped."));
    }

    fn cancel_run(&mut self) {
        if let Some(handle) = self.run.take() {
            tracing::debug!("Cancelling active run");
            handle.abort();
        }
    }
}

impl<S: NotificationSink> Drop for Engine<S> {
    fn drop(&mut self) {
        self.cancel_run();
    }
}

/// Baseline pass, then one pass per tick until credentials are rejected
async fn run_loop<S: NotificationSink>(mut poller: Poller<S>, period: Duration) {
    tracing::debug!("Running baseline pass over {} lists", poller.targets().len());
    if poller.run_pass(true).await == PassOutcome::AuthFailed {
        tracing::info!("Run ended during baseline pass: credentials rejected");
        return;
    }

    let mut ticker = time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        ticker.tick().await;
        if poller.run_pass(false).await == PassOutcome::AuthFailed {
            tracing::info!("Run ended: credentials rejected");
            return;
        }
    }
}

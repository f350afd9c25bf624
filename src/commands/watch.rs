use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;

use crate::config::WatcherConfig;
use crate::watcher::{BoardClient, Bucket, Engine, Notification, PassOutcome, Poller};

use super::utils::{init_logging, resolve_config_path};

/// Watch the configured lists until Ctrl-C or an auth failure
pub fn watch(config_path: Option<PathBuf>, verbose: bool) -> Result<()> {
    let config_path = resolve_config_path(config_path)?;
    let config = WatcherConfig::load(&config_path)?;
    init_logging(verbose, &config.logging.level);

    tracing::info!("Loaded configuration from {}", config_path.display());

    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(async {
        let (tx, mut rx) = mpsc::unbounded_channel::<Notification>();
        let mut engine = Engine::new(config.engine_settings(), tx);
        engine.start(config.credentials(), config.targets.clone())?;

        loop {
            tokio::select! {
                Some(notification) = rx.recv() => {
                    println!("{}", format_notification(&notification, Local::now()));
                    if notification == Notification::AuthFail {
                        anyhow::bail!(
                            "Trello rejected the API key/token. Update {} and start again.",
                            config_path.display()
                        );
                    }
                }
                result = tokio::signal::ctrl_c() => {
                    result.context("Failed to listen for Ctrl-C")?;
                    engine.stop();
                    break;
                }
            }
        }

        // Print the stop confirmation
        while let Ok(notification) = rx.try_recv() {
            println!("{}", format_notification(&notification, Local::now()));
        }

        Ok::<(), anyhow::Error>(())
    })
}

/// Fetch every list once and print the per-list counts
pub fn check(config_path: Option<PathBuf>, verbose: bool) -> Result<()> {
    let config_path = resolve_config_path(config_path)?;
    let config = WatcherConfig::load(&config_path)?;
    init_logging(verbose, &config.logging.level);

    let runtime = tokio::runtime::Runtime::new()?;
    let buckets = runtime.block_on(check_once(&config))?;

    println!("Active cards per list:");
    for bucket in &buckets {
        println!("  {:<30} {:>5}", bucket.name, bucket.count);
    }
    let total: usize = buckets.iter().map(|b| b.count).sum();
    println!("  {:<30} {:>5}", "Total", total);

    Ok(())
}

/// Run one baseline pass and return the stats buckets
///
/// Lists that fail to load are reported on stderr and left out.
pub async fn check_once(config: &WatcherConfig) -> Result<Vec<Bucket>> {
    let settings = config.engine_settings();
    let client = BoardClient::new(
        &settings.api_base_url,
        config.credentials(),
        settings.fetch_timeout,
    )?;

    let (tx, mut rx) = mpsc::unbounded_channel::<Notification>();
    let mut poller = Poller::new(client, config.targets.clone(), Arc::new(tx));

    if poller.run_pass(true).await == PassOutcome::AuthFailed {
        anyhow::bail!("Trello rejected the API key/token");
    }

    let mut buckets = Vec::new();
    while let Ok(notification) = rx.try_recv() {
        match notification {
            Notification::Stats { buckets: stats, .. } => buckets = stats,
            Notification::Log { msg, is_error: true } => eprintln!("Warning: {}", msg),
            _ => {}
        }
    }

    Ok(buckets)
}

/// Render a notification as a single human-readable line
pub fn format_notification(notification: &Notification, at: DateTime<Local>) -> String {
    let stamp = at.format("%H:%M:%S");
    match notification {
        Notification::Log { msg, is_error: false } => format!("[{}] {}", stamp, msg),
        Notification::Log { msg, is_error: true } => format!("[{}] ERROR: {}", stamp, msg),
        Notification::Alarm { card_name, list_name } => {
            format!("[{}] NEW CARD in {}: {}", stamp, list_name, card_name)
        }
        Notification::Stats { total, buckets } => {
            let per_list: Vec<String> = buckets
                .iter()
                .map(|b| format!("{}: {}", b.name, b.count))
                .collect();
            format!("[{}] {} active ({})", stamp, total, per_list.join(", "))
        }
        Notification::AuthFail => format!("[{}] ERROR: authentication failed", stamp),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::watcher::Target;
    use chrono::TimeZone;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn noon() -> DateTime<Local> {
        Local.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
    }

    fn config_for(server: &MockServer) -> WatcherConfig {
        let mut config = WatcherConfig::new(
            "key".to_string(),
            "token".to_string(),
            vec![
                Target {
                    id: "l1".to_string(),
                    name: "Inbox".to_string(),
                },
                Target {
                    id: "l2".to_string(),
                    name: "Broken".to_string(),
                },
            ],
        );
        config.trello.api_base_url = server.uri();
        config
    }

    #[test]
    fn formats_each_notification_kind() {
        assert_eq!(
            format_notification(&Notification::info("Worker stopped."), noon()),
            "[12:00:00] Worker stopped."
        );
        assert_eq!(
            format_notification(&Notification::error("Sync error on Inbox: API Error: 500"), noon()),
            "[12:00:00] ERROR: Sync error on Inbox: API Error: 500"
        );
        assert_eq!(
            format_notification(
                &Notification::Alarm {
                    card_name: "Reset password".to_string(),
                    list_name: "Inbox".to_string(),
                },
                noon()
            ),
            "[12:00:00] NEW CARD in Inbox: Reset password"
        );
        assert_eq!(
            format_notification(
                &Notification::Stats {
                    total: 4,
                    buckets: vec![
                        Bucket {
                            id: "l1".to_string(),
                            name: "Inbox".to_string(),
                            count: 3
                        },
                        Bucket {
                            id: "l2".to_string(),
                            name: "Escalations".to_string(),
                            count: 1
                        },
                    ],
                },
                noon()
            ),
            "[12:00:00] 4 active (Inbox: 3, Escalations: 1)"
        );
    }

    #[tokio::test]
    async fn check_once_skips_failing_lists() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/1/lists/l1/cards"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"id": "a", "name": "A"},
                {"id": "b", "name": "Out of Office"}
            ])))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/1/lists/l2/cards"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let buckets = check_once(&config_for(&server)).await.unwrap();
        assert_eq!(
            buckets,
            vec![Bucket {
                id: "l1".to_string(),
                name: "Inbox".to_string(),
                count: 1
            }]
        );
    }

    #[tokio::test]
    async fn check_once_fails_on_rejected_credentials() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        assert!(check_once(&config_for(&server)).await.is_err());
    }
}

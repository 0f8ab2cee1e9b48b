//! Leak Reaper (§4.4): a single long-lived task that reconciles the
//! leaked-tag table against the live driver pod inventory.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::client::ClusterClient;
use crate::config::Config;
use crate::retry::retry;

/// Tag -> the time it was recorded as leaked. Shared between every
/// [`crate::monitor::AppMonitor`] (which inserts on lookup-timeout) and the
/// reaper (which sweeps it). Snapshot-then-iterate keeps sweeps safe against
/// concurrent inserts from monitors timing out mid-sweep.
pub type LeakedTags = Arc<Mutex<HashMap<String, DateTime<Utc>>>>;

pub fn new_leaked_tags() -> LeakedTags {
    Arc::new(Mutex::new(HashMap::new()))
}

pub struct LeakReaper<C: ClusterClient> {
    client: Arc<C>,
    leaked_tags: LeakedTags,
    config: Arc<Config>,
    cancellation: CancellationToken,
}

impl<C: ClusterClient> LeakReaper<C> {
    pub fn new(
        client: Arc<C>,
        leaked_tags: LeakedTags,
        config: Arc<Config>,
        cancellation: CancellationToken,
    ) -> Self {
        Self {
            client,
            leaked_tags,
            config,
            cancellation,
        }
    }

    /// Runs the sweep loop until `cancellation` fires. Never returns early
    /// for a recoverable error; every per-cycle failure is logged and the
    /// loop continues.
    pub async fn run(self) {
        let mut interval = tokio::time::interval(self.config.leakage_check_interval);
        loop {
            tokio::select! {
                _ = interval.tick() => {
                    self.sweep_once().await;
                }
                _ = self.cancellation.cancelled() => {
                    info!("leak reaper shutting down");
                    return;
                }
            }
        }
    }

    async fn sweep_once(&self) {
        let now = Utc::now();
        let snapshot: Vec<(String, DateTime<Utc>)> = {
            let table = self.leaked_tags.lock().unwrap();
            table.iter().map(|(tag, at)| (tag.clone(), *at)).collect()
        };
        if snapshot.is_empty() {
            return;
        }

        let live_drivers = match retry(&self.cancellation, || self.client.list_applications()).await {
            Ok(apps) => apps,
            Err(err) => {
                warn!(%err, "leak reaper failed to list driver pods this cycle");
                return;
            }
        };

        for (tag, recorded_at) in snapshot {
            let matches: Vec<_> = live_drivers.iter().filter(|app| app.tag == tag).collect();
            if matches.is_empty() {
                if now - recorded_at > chrono::Duration::from_std(self.config.leakage_check_timeout).unwrap_or_default() {
                    self.leaked_tags.lock().unwrap().remove(&tag);
                    debug!(tag, "leaked tag expired with no matching pod");
                } else {
                    warn!(tag, "leaked tag has no matching driver pod yet");
                }
                continue;
            }

            let mut all_killed = true;
            for app in matches {
                match retry(&self.cancellation, || self.client.kill_application(app)).await {
                    Ok(true) => info!(tag = %app.tag, "killed leaked application"),
                    Ok(false) => {
                        all_killed = false;
                        warn!(tag = %app.tag, "cluster reported failure killing leaked application");
                    }
                    Err(err) => {
                        all_killed = false;
                        warn!(tag = %app.tag, %err, "failed to kill leaked application");
                    }
                }
            }
            if all_killed {
                self.leaked_tags.lock().unwrap().remove(&tag);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::*;
    use crate::client::mock::MockClusterClient;

    fn config() -> Arc<Config> {
        Arc::new(Config::parse_from([
            "spark-driver-monitor",
            "--leakage-check-interval",
            "10ms",
            "--leakage-check-timeout",
            "10ms",
        ]))
    }

    #[tokio::test]
    async fn sweep_does_nothing_when_table_empty() {
        let client = Arc::new(MockClusterClient::new());
        let leaked = new_leaked_tags();
        let reaper = LeakReaper::new(client, leaked, config(), CancellationToken::new());
        reaper.sweep_once().await;
    }

    #[tokio::test]
    async fn sweep_expires_tag_with_no_matching_pod() {
        let client = Arc::new(MockClusterClient::new());
        let leaked = new_leaked_tags();
        leaked
            .lock()
            .unwrap()
            .insert("gone".to_owned(), Utc::now() - chrono::Duration::hours(1));
        let reaper = LeakReaper::new(client, leaked.clone(), config(), CancellationToken::new());
        reaper.sweep_once().await;
        assert!(!leaked.lock().unwrap().contains_key("gone"));
    }
}

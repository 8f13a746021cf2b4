//! Periodic reachability probe
//!
//! Issues a HEAD request to a fixed URL every interval and flips the shared
//! [`ConnectionStatus`]. The first scheduled probe fires one interval after
//! `start`; callers that need an immediate answer use `check_now`.

use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};
use url::Url;

use super::ConnectionStatus;
use crate::origin::Origin;

/// Default probe interval
pub const DEFAULT_PROBE_INTERVAL: Duration = Duration::from_millis(10_000);

/// Default probe timeout
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_millis(5_000);

pub struct ConnectionMonitor {
    origin: Arc<dyn Origin>,
    probe_url: Url,
    interval: Duration,
    timeout: Duration,
    status: ConnectionStatus,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl ConnectionMonitor {
    /// Create a monitor. A timeout not shorter than the interval is cut to
    /// half the interval so probes never overlap.
    pub fn new(
        origin: Arc<dyn Origin>,
        probe_url: Url,
        interval: Duration,
        timeout: Duration,
        status: ConnectionStatus,
    ) -> Self {
        let timeout = if timeout >= interval {
            warn!(
                timeout_ms = timeout.as_millis() as u64,
                interval_ms = interval.as_millis() as u64,
                "Probe timeout not below interval, clamping"
            );
            interval / 2
        } else {
            timeout
        };

        Self {
            origin,
            probe_url,
            interval,
            timeout,
            status,
            task: Mutex::new(None),
        }
    }

    pub fn status(&self) -> &ConnectionStatus {
        &self.status
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Probe once and record the result
    pub async fn check_now(&self) -> bool {
        let online = match tokio::time::timeout(
            self.timeout,
            self.origin.probe(&self.probe_url, self.timeout),
        )
        .await
        {
            Ok(Ok(())) => true,
            Ok(Err(e)) => {
                debug!(url = %self.probe_url, error = %e, "Probe failed");
                false
            }
            Err(_) => {
                debug!(url = %self.probe_url, timeout_ms = self.timeout.as_millis() as u64, "Probe timed out");
                false
            }
        };

        let was_online = self.status.set_online(online);
        if was_online != online {
            info!(
                online,
                url = %self.probe_url,
                "Connection status changed to {}",
                self.status.label()
            );
        }
        online
    }

    /// Start the probe schedule, replacing any running one
    pub async fn start(self: &Arc<Self>) {
        let mut task = self.task.lock().await;
        if let Some(previous) = task.take() {
            debug!("Replacing running connection monitor");
            previous.abort();
        }

        info!(
            url = %self.probe_url,
            interval_ms = self.interval.as_millis() as u64,
            timeout_ms = self.timeout.as_millis() as u64,
            "Starting connection monitor"
        );

        let monitor: Weak<Self> = Arc::downgrade(self);
        let period = self.interval;
        *task = Some(tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let Some(monitor) = monitor.upgrade() else {
                    break;
                };
                monitor.check_now().await;
            }
        }));
    }

    /// Cancel the probe schedule
    pub async fn stop(&self) {
        if let Some(handle) = self.task.lock().await.take() {
            handle.abort();
            info!("Connection monitor stopped");
        }
    }

    pub async fn is_running(&self) -> bool {
        self.task
            .lock()
            .await
            .as_ref()
            .map(|handle| !handle.is_finished())
            .unwrap_or(false)
    }
}

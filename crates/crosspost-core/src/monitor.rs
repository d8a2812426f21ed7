//! LoginStatusMonitor: daily session sweep plus look-ahead pre-flight.
//!
//! The sweep verifies every cached session against the remote platform once
//! per calendar day. The pre-flight warns users whose soon-due tasks sit on
//! an already-invalid local session, one aggregated notice per (user,
//! platform) group.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use chrono::{Duration, NaiveDate, Timelike};
use tracing::{info, warn};

use crate::domain::{NotificationKind, Platform, ScheduledTask, StoreError, UserId};
use crate::ports::{ClientRegistry, Clock, Notifier, SessionStore, TaskStore};

#[derive(Debug, Clone)]
pub struct MonitorConfig {
    /// Hour of day (UTC) at which the daily sweep becomes due.
    pub sweep_hour: u32,

    /// How far ahead the pre-flight looks for pending tasks.
    pub preflight_horizon: Duration,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            sweep_hour: 8,
            preflight_horizon: Duration::hours(24),
        }
    }
}

/// Outcome summary of one sweep, for logging and tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct SweepReport {
    /// Sessions verified against the remote platform.
    pub checked: usize,

    /// Sessions found invalid and cleared.
    pub expired: usize,

    /// Aggregated pre-flight notices sent.
    pub preflight_notices: usize,
}

pub struct LoginStatusMonitor {
    tasks: Arc<dyn TaskStore>,
    sessions: Arc<dyn SessionStore>,
    clients: Arc<ClientRegistry>,
    notifier: Arc<dyn Notifier>,
    clock: Arc<dyn Clock>,
    config: MonitorConfig,

    /// Daily-sweep marker owned by this instance, so two monitors never
    /// share re-entrancy state.
    last_run: Mutex<Option<NaiveDate>>,
}

impl LoginStatusMonitor {
    pub fn new(
        tasks: Arc<dyn TaskStore>,
        sessions: Arc<dyn SessionStore>,
        clients: Arc<ClientRegistry>,
        notifier: Arc<dyn Notifier>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            tasks,
            sessions,
            clients,
            notifier,
            clock,
            config: MonitorConfig::default(),
            last_run: Mutex::new(None),
        }
    }

    pub fn with_config(mut self, config: MonitorConfig) -> Self {
        self.config = config;
        self
    }

    /// Evaluate the daily gate and sweep if due.
    ///
    /// Called every minute by the monitor loop. Returns `None` when the
    /// configured hour has not been reached or today's sweep already ran;
    /// the date marker makes a second same-day call a no-op, and a new
    /// calendar day re-arms the sweep.
    pub async fn poll(&self) -> Result<Option<SweepReport>, StoreError> {
        let now = self.clock.now();
        if now.hour() < self.config.sweep_hour {
            return Ok(None);
        }

        let today = now.date_naive();
        {
            let mut last_run = self.last_run.lock().expect("monitor mutex poisoned");
            if *last_run == Some(today) {
                return Ok(None);
            }
            // Mark before sweeping, so a failing sweep does not retry every
            // minute for the rest of the day.
            *last_run = Some(today);
        }

        let report = self.sweep().await?;
        Ok(Some(report))
    }

    /// Verify every cached session against its platform, then run the
    /// pre-flight. Invalid sessions are cleared and the user notified once.
    pub async fn sweep(&self) -> Result<SweepReport, StoreError> {
        let mut report = SweepReport::default();

        for (user, platform) in self.sessions.active_pairs().await? {
            let Some(client) = self.clients.get(platform) else {
                warn!(%platform, "no client registered, skipping session check");
                continue;
            };

            report.checked += 1;
            match client.check_session(user).await {
                Ok(true) => {}
                Ok(false) => {
                    self.sessions.invalidate(user, platform).await?;
                    report.expired += 1;
                    info!(user_id = %user, %platform, "cached session expired");

                    let payload = serde_json::json!({
                        "platform": platform,
                        "reason": "daily check found the session invalid",
                    });
                    if let Err(error) = self
                        .notifier
                        .notify(user, NotificationKind::SessionExpired, payload)
                        .await
                    {
                        warn!(user_id = %user, %error, "notification delivery failed");
                    }
                }
                Err(error) => {
                    // A transport failure says nothing about the session
                    // itself; leave it untouched and let tomorrow retry.
                    warn!(user_id = %user, %platform, %error,
                          "session check errored, leaving session untouched");
                }
            }
        }

        report.preflight_notices = self.preflight().await?;
        info!(checked = report.checked, expired = report.expired,
              preflight_notices = report.preflight_notices, "daily session sweep finished");
        Ok(report)
    }

    /// Warn about soon-due tasks whose local session is already invalid.
    ///
    /// Pending tasks inside the horizon are grouped by (user, platform) and
    /// each invalid group gets one aggregated notice, so a stale session
    /// with many scheduled posts produces a single notification instead of a
    /// storm. Overdue-but-still-pending tasks (a retry re-queued between
    /// ticks) count as inside the horizon. Runs as part of the daily sweep
    /// but is callable on its own.
    pub async fn preflight(&self) -> Result<usize, StoreError> {
        let now = self.clock.now();
        let pending = self
            .tasks
            .due_before(now + self.config.preflight_horizon)
            .await?;

        let mut groups: BTreeMap<(UserId, Platform), Vec<ScheduledTask>> = BTreeMap::new();
        for task in pending {
            groups
                .entry((task.user_id, task.platform))
                .or_default()
                .push(task);
        }

        let mut notices = 0;
        for ((user, platform), tasks) in groups {
            if self.sessions.is_valid(user, platform).await? {
                continue;
            }

            let documents: Vec<serde_json::Value> = tasks
                .iter()
                .map(|t| {
                    serde_json::json!({
                        "task_id": t.id.to_string(),
                        "document_id": t.document_id.to_string(),
                        "due_at": t.scheduled_at,
                    })
                })
                .collect();
            let payload = serde_json::json!({
                "platform": platform,
                "reason": "scheduled posts are due but the session is invalid",
                "documents": documents,
            });

            warn!(user_id = %user, %platform, tasks = tasks.len(),
                  "upcoming tasks lack a valid session");
            if let Err(error) = self
                .notifier
                .notify(user, NotificationKind::SessionExpired, payload)
                .await
            {
                warn!(user_id = %user, %error, "notification delivery failed");
            }
            notices += 1;
        }
        Ok(notices)
    }
}

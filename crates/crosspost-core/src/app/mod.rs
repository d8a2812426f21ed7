//! Background loops: the scheduler tick loop and the monitor poll loop.
//!
//! Two independent timers, one tokio task each, sharing nothing but the
//! shutdown channel. Shutdown stops the loops between iterations; an
//! in-flight publish call is never cancelled, it runs to completion.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{error, info};

use crate::monitor::LoginStatusMonitor;
use crate::scheduler::TaskScheduler;

#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// How often the scheduler looks for due tasks.
    pub tick_interval: Duration,

    /// How often the monitor evaluates its daily gate. Minute granularity
    /// is plenty for an hour-resolution gate.
    pub monitor_interval: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_secs(30),
            monitor_interval: Duration::from_secs(60),
        }
    }
}

/// Handle over the running engine loops.
/// - `request_shutdown()` stops both loops at their next iteration
/// - `shutdown_and_join()` waits for them to finish
pub struct EngineHandle {
    shutdown_tx: watch::Sender<bool>,
    joins: Vec<JoinHandle<()>>,
}

impl EngineHandle {
    /// Spawn the scheduler and monitor loops.
    pub fn spawn(
        scheduler: Arc<TaskScheduler>,
        monitor: Arc<LoginStatusMonitor>,
        config: EngineConfig,
    ) -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let mut joins = Vec::with_capacity(2);

        {
            let mut rx = shutdown_rx.clone();
            let tick_interval = config.tick_interval;
            joins.push(tokio::spawn(async move {
                scheduler_loop(scheduler, tick_interval, &mut rx).await;
            }));
        }
        {
            let mut rx = shutdown_rx;
            let monitor_interval = config.monitor_interval;
            joins.push(tokio::spawn(async move {
                monitor_loop(monitor, monitor_interval, &mut rx).await;
            }));
        }

        Self { shutdown_tx, joins }
    }

    /// Request shutdown for both loops.
    pub fn request_shutdown(&self) {
        // ignore send error: receivers may already be dropped
        let _ = self.shutdown_tx.send(true);
    }

    /// Shutdown and wait for both loops.
    pub async fn shutdown_and_join(self) {
        self.request_shutdown();
        for join in self.joins {
            let _ = join.await;
        }
    }
}

async fn scheduler_loop(
    scheduler: Arc<TaskScheduler>,
    tick_interval: Duration,
    shutdown_rx: &mut watch::Receiver<bool>,
) {
    let mut interval = tokio::time::interval(tick_interval);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    info!(interval = ?tick_interval, "scheduler loop started");

    loop {
        tokio::select! {
            _ = shutdown_rx.changed() => {
                if *shutdown_rx.borrow() {
                    break;
                }
            }
            _ = interval.tick() => {
                match scheduler.tick().await {
                    Ok(report) if report.executed > 0 => {
                        info!(executed = report.executed, succeeded = report.succeeded,
                              failed = report.failed, retried = report.retried, "tick finished");
                    }
                    Ok(_) => {}
                    // Storage failure. The loop must keep running; the next
                    // tick retries the whole pass.
                    Err(error) => error!(%error, "tick failed"),
                }
            }
        }
    }
    info!("scheduler loop stopped");
}

async fn monitor_loop(
    monitor: Arc<LoginStatusMonitor>,
    monitor_interval: Duration,
    shutdown_rx: &mut watch::Receiver<bool>,
) {
    let mut interval = tokio::time::interval(monitor_interval);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    info!(interval = ?monitor_interval, "monitor loop started");

    loop {
        tokio::select! {
            _ = shutdown_rx.changed() => {
                if *shutdown_rx.borrow() {
                    break;
                }
            }
            _ = interval.tick() => {
                match monitor.poll().await {
                    Ok(Some(report)) => {
                        info!(checked = report.checked, expired = report.expired,
                              preflight_notices = report.preflight_notices, "daily sweep ran");
                    }
                    Ok(None) => {}
                    Err(error) => error!(%error, "monitor poll failed"),
                }
            }
        }
    }
    info!("monitor loop stopped");
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use ulid::Ulid;

    use super::*;
    use crate::domain::{Document, DocumentId, Platform, PublishConfig, TaskStatus, UserId};
    use crate::ports::{ClientRegistry, FixedClock, SystemClock, TaskStore, UlidGenerator};
    use crate::scheduler::FixedBackoff;
    use crate::store::{
        InMemoryDocumentStore, InMemorySessionStore, InMemoryTaskStore, RecordingNotifier,
    };

    struct OkClient;

    #[async_trait::async_trait]
    impl crate::ports::PlatformClient for OkClient {
        fn platform(&self) -> Platform {
            Platform::Devto
        }

        async fn publish(
            &self,
            _user: UserId,
            _document: &Document,
            _config: &PublishConfig,
        ) -> Result<crate::ports::PublishReceipt, crate::domain::PublishError> {
            Ok(crate::ports::PublishReceipt {
                remote_id: "r-1".to_string(),
                remote_url: "https://example.dev/r-1".to_string(),
                raw_status: "in_review".to_string(),
            })
        }

        async fn fetch_listing(
            &self,
            _user: UserId,
            _page: u32,
            _page_size: u32,
        ) -> Result<Vec<crate::ports::RemoteEntry>, crate::domain::PublishError> {
            Ok(Vec::new())
        }

        async fn check_session(&self, _user: UserId) -> Result<bool, crate::domain::PublishError> {
            Ok(true)
        }
    }

    #[tokio::test]
    async fn loops_execute_due_tasks_and_shut_down() {
        let t0 = Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap();
        let clock = Arc::new(FixedClock::new(t0));
        let tasks = InMemoryTaskStore::new();
        let documents = InMemoryDocumentStore::new();
        let sessions = InMemorySessionStore::new();
        let notifier = RecordingNotifier::new();

        let user = UserId::from_ulid(Ulid::new());
        let doc = DocumentId::from_ulid(Ulid::new());
        documents.insert(Document::new(doc, user, "Loop Post", "body")).await;
        sessions.login(user, Platform::Devto).await;

        let mut registry = ClientRegistry::new();
        registry.register(Arc::new(OkClient)).unwrap();
        let registry = Arc::new(registry);

        let scheduler = Arc::new(
            crate::scheduler::TaskScheduler::new(
                Arc::new(tasks.clone()),
                Arc::new(documents.clone()),
                Arc::new(sessions.clone()),
                registry.clone(),
                Arc::new(notifier.clone()),
                clock.clone(),
                Arc::new(UlidGenerator::new(SystemClock)),
            )
            .with_backoff(Arc::new(FixedBackoff::default())),
        );
        let monitor = Arc::new(crate::monitor::LoginStatusMonitor::new(
            Arc::new(tasks.clone()),
            Arc::new(sessions.clone()),
            registry,
            Arc::new(notifier.clone()),
            clock.clone(),
        ));

        let task = scheduler
            .create_task(
                doc,
                user,
                Platform::Devto,
                t0 + chrono::Duration::hours(1),
                PublishConfig::Devto {
                    tags: vec![],
                    series: None,
                    canonical_url: None,
                    publish_now: true,
                },
            )
            .await
            .unwrap();
        clock.advance(chrono::Duration::hours(2));

        let handle = EngineHandle::spawn(
            scheduler,
            monitor,
            EngineConfig {
                tick_interval: Duration::from_millis(10),
                monitor_interval: Duration::from_millis(10),
            },
        );

        // Give the tick loop a few iterations.
        tokio::time::sleep(Duration::from_millis(100)).await;
        handle.shutdown_and_join().await;

        let task = tasks.get(task.id).await.unwrap().unwrap();
        assert_eq!(task.status, TaskStatus::Success);
        assert_eq!(notifier.sent().await.len(), 1);
    }
}

//! Pipeline Driver
//!
//! The driving loop: collect a snapshot batch, push every snapshot through
//! scoring -> classification -> enforcement independently, wait for the
//! whole batch, sleep, repeat. Batch N always completes (or times out)
//! before batch N+1 starts, so a slow capability layer cannot grow an
//! unbounded backlog.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinSet;
use tokio::time::MissedTickBehavior;

use crate::logic::audit::AuditStore;
use crate::logic::baseline::{PermissionBaseline, CAP_FILESYSTEM, CAP_NETWORK};
use crate::logic::config::ScoringConfig;
use crate::logic::enforce::{EnforcementMachine, EvalState, Evaluation};
use crate::logic::risk::{self, RiskAssessment, RiskLevel};
use crate::logic::snapshot::{ProcessSnapshot, SnapshotSource};

// ============================================================================
// BATCH SUMMARY
// ============================================================================

#[derive(Debug, Clone, Default)]
pub struct BatchSummary {
    pub evaluated: usize,
    pub alerts: usize,
    pub actions: usize,
    pub failures: usize,
}

// ============================================================================
// DRIVER
// ============================================================================

#[derive(Clone)]
pub struct PipelineDriver {
    scoring: ScoringConfig,
    poll_interval: Duration,
    baseline: Arc<PermissionBaseline>,
    machine: Arc<EnforcementMachine>,
    store: Arc<AuditStore>,
}

impl PipelineDriver {
    pub fn new(
        scoring: ScoringConfig,
        poll_interval: Duration,
        baseline: Arc<PermissionBaseline>,
        machine: Arc<EnforcementMachine>,
        store: Arc<AuditStore>,
    ) -> Self {
        Self {
            scoring,
            poll_interval,
            baseline,
            machine,
            store,
        }
    }

    /// The main loop. Runs until the shutdown channel flips; in-flight
    /// evaluations finish (or time out), no new batch starts afterwards.
    pub async fn run(
        &self,
        mut source: Box<dyn SnapshotSource>,
        mut shutdown: watch::Receiver<bool>,
    ) {
        let mut interval = tokio::time::interval(self.poll_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        log::info!(
            "Pipeline driver started ({}s polling interval)",
            self.poll_interval.as_secs_f64()
        );

        loop {
            tokio::select! {
                _ = shutdown.changed() => break,
                _ = interval.tick() => {}
            }
            if *shutdown.borrow() {
                break;
            }

            let snapshots = source.collect();
            let summary = self.run_batch(snapshots).await;

            if summary.alerts > 0 || summary.failures > 0 {
                log::warn!(
                    "Batch done: {} evaluated, {} alerts, {} actions, {} failures",
                    summary.evaluated,
                    summary.alerts,
                    summary.actions,
                    summary.failures
                );
            } else {
                log::debug!("Batch done: {} evaluated, all quiet", summary.evaluated);
            }
        }

        log::info!("Pipeline driver stopped");
    }

    /// Evaluate one batch. Per-process work is independent, so it fans out
    /// across workers; completion order within the batch is irrelevant.
    pub async fn run_batch(&self, snapshots: Vec<ProcessSnapshot>) -> BatchSummary {
        let mut summary = BatchSummary::default();
        if snapshots.is_empty() {
            return summary;
        }

        let mut set = JoinSet::new();
        for snapshot in snapshots {
            let driver = self.clone();
            set.spawn(async move { driver.evaluate_snapshot(snapshot).await });
        }

        while let Some(joined) = set.join_next().await {
            match joined {
                Ok((assessment, evaluation)) => {
                    summary.evaluated += 1;
                    if assessment.level >= RiskLevel::Suspicious {
                        summary.alerts += 1;
                    }
                    match evaluation.state {
                        EvalState::ActionSucceeded => summary.actions += 1,
                        EvalState::ActionFailed => summary.failures += 1,
                        _ => {}
                    }
                }
                Err(e) => {
                    // One bad evaluation must not sink the batch.
                    log::error!("Evaluation task panicked: {}", e);
                }
            }
        }

        summary
    }

    /// The per-process pipeline: observe accesses, score, classify, alert,
    /// enforce.
    pub async fn evaluate_snapshot(
        &self,
        snapshot: ProcessSnapshot,
    ) -> (RiskAssessment, Evaluation) {
        // Observed capability accesses feed the baseline before scoring.
        if snapshot.connections > 0 {
            self.baseline.observe_access(&snapshot.name, CAP_NETWORK);
        }
        if snapshot.open_files > 0 {
            self.baseline.observe_access(&snapshot.name, CAP_FILESYSTEM);
        }

        let profile = self.baseline.profile_for(&snapshot.name);
        let assessment = risk::score_with_config(&snapshot, Some(&profile), &self.scoring);

        log::debug!(
            "PID {} ({}) scored {:.1} -> {}",
            snapshot.pid,
            snapshot.name,
            assessment.score,
            assessment.level
        );

        if assessment.level >= RiskLevel::Suspicious {
            self.raise_alert(&snapshot, &assessment);
        }

        let evaluation = self.machine.evaluate(&snapshot, assessment.score).await;
        (assessment, evaluation)
    }

    /// Persist the app row and alert. A store failure here is loud but
    /// non-fatal - evaluation continues without the alert on record.
    fn raise_alert(&self, snapshot: &ProcessSnapshot, assessment: &RiskAssessment) {
        let app_id = if snapshot.executable.is_empty() {
            None
        } else {
            match self.store.upsert_app(
                &snapshot.name,
                &snapshot.executable,
                snapshot.hash_sha256.as_deref(),
                assessment.score,
            ) {
                Ok(id) => Some(id),
                Err(e) => {
                    log::error!("Audit store write failed (app row for PID {}): {}", snapshot.pid, e);
                    None
                }
            }
        };

        let message = risk::alert_message(snapshot, assessment);
        log::warn!("{}", message);

        if let Err(e) = self
            .store
            .insert_alert(snapshot.pid, &message, assessment.score, app_id)
        {
            log::error!("Audit store write failed (alert for PID {}): {}", snapshot.pid, e);
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::config::OperatingMode;
    use crate::logic::enforce::{
        Ack, CapabilityAction, CapabilityError, EnforcementCapability,
    };
    use crate::logic::policy::PolicyTable;
    use parking_lot::Mutex;

    struct RecordingCapability {
        calls: Mutex<Vec<(CapabilityAction, u32)>>,
        fail: bool,
    }

    impl RecordingCapability {
        fn new(fail: bool) -> Self {
            Self {
                calls: Mutex::new(Vec::new()),
                fail,
            }
        }
    }

    impl EnforcementCapability for RecordingCapability {
        fn invoke(&self, action: CapabilityAction, pid: u32) -> Result<Ack, CapabilityError> {
            self.calls.lock().push((action, pid));
            if self.fail {
                Err(CapabilityError::AccessDenied {
                    reason: "test".to_string(),
                })
            } else {
                Ok(Ack {
                    pid,
                    detail: "ok".to_string(),
                })
            }
        }
    }

    fn driver_with(
        mode: OperatingMode,
        capability: Arc<RecordingCapability>,
    ) -> (PipelineDriver, Arc<AuditStore>, Arc<PermissionBaseline>) {
        let store = Arc::new(AuditStore::open_in_memory().unwrap());
        let baseline = Arc::new(PermissionBaseline::new());
        let machine = Arc::new(EnforcementMachine::new(
            mode,
            PolicyTable::default_rules(),
            capability,
            Arc::clone(&store),
            Duration::from_secs(1),
        ));
        let driver = PipelineDriver::new(
            ScoringConfig::default(),
            Duration::from_millis(10),
            Arc::clone(&baseline),
            machine,
            Arc::clone(&store),
        );
        (driver, store, baseline)
    }

    fn benign_snapshot(pid: u32) -> ProcessSnapshot {
        ProcessSnapshot {
            pid,
            name: "notepad.exe".to_string(),
            executable: "C:\\Windows\\notepad.exe".to_string(),
            command_line: "C:\\Windows\\notepad.exe".to_string(),
            user_context: "User".to_string(),
            create_time: 2e9,
            num_threads: 2,
            ..Default::default()
        }
    }

    fn hostile_snapshot(pid: u32) -> ProcessSnapshot {
        ProcessSnapshot {
            pid,
            name: "svch0st_payload.scr".to_string(),
            command_line: String::new(),
            user_context: "NT AUTHORITY\\SYSTEM".to_string(),
            cpu_percent: 99.0,
            mem_percent: 99.0,
            connections: 200,
            open_files: 500,
            num_threads: 500,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_empty_batch_is_tolerated() {
        let capability = Arc::new(RecordingCapability::new(false));
        let (driver, _store, _baseline) = driver_with(OperatingMode::Enforce, capability);

        let summary = driver.run_batch(Vec::new()).await;
        assert_eq!(summary.evaluated, 0);
        assert_eq!(summary.alerts, 0);
    }

    #[tokio::test]
    async fn test_benign_process_passes_quietly() {
        let capability = Arc::new(RecordingCapability::new(false));
        let (driver, store, _baseline) =
            driver_with(OperatingMode::Enforce, Arc::clone(&capability));

        let summary = driver.run_batch(vec![benign_snapshot(100)]).await;

        assert_eq!(summary.evaluated, 1);
        assert_eq!(summary.alerts, 0);
        assert_eq!(summary.actions, 0);
        assert!(capability.calls.lock().is_empty());
        assert!(store.unresolved_alerts(10).unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_hostile_process_alerts_and_suspends() {
        let capability = Arc::new(RecordingCapability::new(false));
        let (driver, store, _baseline) =
            driver_with(OperatingMode::Enforce, Arc::clone(&capability));

        let summary = driver.run_batch(vec![hostile_snapshot(200)]).await;

        assert_eq!(summary.alerts, 1);
        assert_eq!(summary.actions, 1);

        let alerts = store.unresolved_alerts(10).unwrap();
        assert_eq!(alerts.len(), 1);
        assert!(alerts[0].message.contains("svch0st_payload.scr"));

        // Default table: the score lands in Suspend territory.
        assert!(capability
            .calls
            .lock()
            .contains(&(CapabilityAction::Suspend, 200)));
    }

    #[tokio::test]
    async fn test_monitor_batch_never_touches_capability() {
        let capability = Arc::new(RecordingCapability::new(false));
        let (driver, store, _baseline) =
            driver_with(OperatingMode::Monitor, Arc::clone(&capability));

        let summary = driver.run_batch(vec![hostile_snapshot(300)]).await;

        assert_eq!(summary.alerts, 1);
        assert_eq!(summary.actions, 0);
        assert!(capability.calls.lock().is_empty());

        let history = store.enforcement_history(10).unwrap();
        assert_eq!(history.len(), 1);
        assert!(history[0].simulated);
    }

    #[tokio::test]
    async fn test_failures_are_isolated_per_process() {
        let capability = Arc::new(RecordingCapability::new(true));
        let (driver, store, _baseline) =
            driver_with(OperatingMode::Enforce, Arc::clone(&capability));

        let summary = driver
            .run_batch(vec![hostile_snapshot(400), hostile_snapshot(401)])
            .await;

        // Both were attempted and both failures were recorded.
        assert_eq!(summary.evaluated, 2);
        assert_eq!(summary.failures, 2);
        assert_eq!(store.enforcement_history(10).unwrap().len(), 2);

        let pids: Vec<u32> = capability.calls.lock().iter().map(|(_, pid)| *pid).collect();
        assert!(pids.contains(&400));
        assert!(pids.contains(&401));
    }

    #[tokio::test]
    async fn test_baseline_profiles_created_and_accesses_counted() {
        let capability = Arc::new(RecordingCapability::new(false));
        let (driver, _store, baseline) =
            driver_with(OperatingMode::Monitor, Arc::clone(&capability));

        driver.run_batch(vec![hostile_snapshot(500)]).await;

        let profile = baseline.profile_for("svch0st_payload.scr");
        assert_eq!(profile.access_counts.get(CAP_NETWORK), Some(&1));
        assert_eq!(profile.access_counts.get(CAP_FILESYSTEM), Some(&1));
    }

    #[tokio::test]
    async fn test_run_stops_on_shutdown_signal() {
        struct EmptySource;
        impl SnapshotSource for EmptySource {
            fn collect(&mut self) -> Vec<ProcessSnapshot> {
                Vec::new()
            }
        }

        let capability = Arc::new(RecordingCapability::new(false));
        let (driver, _store, _baseline) = driver_with(OperatingMode::Monitor, capability);

        let (tx, rx) = watch::channel(false);
        let handle = tokio::spawn(async move { driver.run(Box::new(EmptySource), rx).await });

        tokio::time::sleep(Duration::from_millis(50)).await;
        tx.send(true).unwrap();

        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("driver did not stop after shutdown signal")
            .unwrap();
    }
}

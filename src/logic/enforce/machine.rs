//! Enforcement State Machine
//!
//! Consumes (snapshot, score) pairs, matches the policy table, and drives
//! the matched action through the injected capability - or simulates it in
//! monitor mode. Every attempted action leaves exactly one audit record,
//! written only after the capability call (or its timeout) resolves.
//!
//! Failures are isolated per process: a stuck or failing capability call
//! never aborts the rest of the batch, and the machine forgets failures
//! between cycles - the next cycle re-evaluates from scratch.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use crate::logic::audit::{AuditStore, EnforcementRecord};
use crate::logic::config::OperatingMode;
use crate::logic::policy::{EnforcementAction, PolicyTable};
use crate::logic::snapshot::ProcessSnapshot;

use super::capability::EnforcementCapability;
use super::types::{Ack, CapabilityAction, CapabilityError, EvalState, Evaluation};

// ============================================================================
// MACHINE
// ============================================================================

struct AppliedAction {
    action: EnforcementAction,
    reversible: bool,
}

pub struct EnforcementMachine {
    mode: OperatingMode,
    table: PolicyTable,
    capability: Arc<dyn EnforcementCapability>,
    store: Arc<AuditStore>,
    call_timeout: Duration,
    /// Last successfully applied action per pid, for resume validity checks
    applied: Mutex<HashMap<u32, AppliedAction>>,
}

impl EnforcementMachine {
    pub fn new(
        mode: OperatingMode,
        table: PolicyTable,
        capability: Arc<dyn EnforcementCapability>,
        store: Arc<AuditStore>,
        call_timeout: Duration,
    ) -> Self {
        log::info!(
            "Enforcement machine ready: mode={}, {} policy rules, {}ms capability timeout",
            mode,
            table.rules().len(),
            call_timeout.as_millis()
        );
        Self {
            mode,
            table,
            capability,
            store,
            call_timeout,
            applied: Mutex::new(HashMap::new()),
        }
    }

    /// Evaluate one scored snapshot against the policy table and, mode
    /// permitting, execute the matched action. Returns the action only
    /// when it actually succeeded.
    pub async fn evaluate_and_enforce(
        &self,
        snapshot: &ProcessSnapshot,
        score: f64,
    ) -> Option<EnforcementAction> {
        let evaluation = self.evaluate(snapshot, score).await;
        match evaluation.state {
            EvalState::ActionSucceeded => evaluation.action,
            _ => None,
        }
    }

    /// Full evaluation, exposing the terminal state.
    pub async fn evaluate(&self, snapshot: &ProcessSnapshot, score: f64) -> Evaluation {
        // Observed -> Scored happens upstream; selection is the first
        // transition this machine owns.
        let rule = match self.table.select(score) {
            Some(rule) => rule.clone(),
            None => return Evaluation::no_match(),
        };

        log::info!(
            "Policy matched for PID {}: {} (score={:.0})",
            snapshot.pid,
            rule.name,
            score
        );

        let reason = format!("{}: {}", rule.name, rule.description);

        if !self.mode.is_enforcing() {
            log::info!(
                "[MONITOR] Would execute {} on PID {}",
                rule.action,
                snapshot.pid
            );
            self.record(EnforcementRecord::simulated(rule.action, snapshot.pid, &reason));
            return Evaluation {
                state: EvalState::PolicyMatched,
                matched_rule: Some(rule.name),
                action: None,
            };
        }

        // ActionRequested
        let (success, error) = self.execute(rule.action, snapshot.pid).await;

        self.record(EnforcementRecord::new(
            rule.action,
            snapshot.pid,
            &reason,
            success,
            error.clone(),
        ));

        if success {
            log::warn!(
                "Executed {} on PID {} ({})",
                rule.action,
                snapshot.pid,
                rule.name
            );
            self.applied.lock().insert(
                snapshot.pid,
                AppliedAction {
                    action: rule.action,
                    reversible: rule.reversible,
                },
            );
            Evaluation {
                state: EvalState::ActionSucceeded,
                matched_rule: Some(rule.name),
                action: Some(rule.action),
            }
        } else {
            log::error!(
                "Failed to execute {} on PID {}: {}",
                rule.action,
                snapshot.pid,
                error.as_deref().unwrap_or("unknown")
            );
            Evaluation {
                state: EvalState::ActionFailed,
                matched_rule: Some(rule.name),
                action: Some(rule.action),
            }
        }
    }

    /// Reverse a suspension. User-triggered, never policy-driven; only
    /// valid while the pid's last recorded action is reversible.
    pub async fn resume_process(&self, pid: u32) -> Result<Ack, CapabilityError> {
        let reversible = {
            let applied = self.applied.lock();
            match applied.get(&pid) {
                Some(entry) => entry.reversible,
                None => {
                    return Err(CapabilityError::Invalid {
                        reason: format!("no recorded action for PID {}", pid),
                    })
                }
            }
        };

        if !reversible {
            return Err(CapabilityError::Invalid {
                reason: format!("last action for PID {} is not reversible", pid),
            });
        }

        let ack = self.invoke_with_timeout(CapabilityAction::Resume, pid).await?;
        self.applied.lock().remove(&pid);
        log::info!("Resumed PID {}", pid);
        Ok(ack)
    }

    // ------------------------------------------------------------------
    // Execution
    // ------------------------------------------------------------------

    /// Run one policy action through the capability. Returns (success,
    /// error detail); it never propagates - the caller records either way.
    async fn execute(&self, action: EnforcementAction, pid: u32) -> (bool, Option<String>) {
        match action {
            EnforcementAction::Terminate => {
                self.single_call(CapabilityAction::Terminate, pid).await
            }
            EnforcementAction::Suspend => self.single_call(CapabilityAction::Suspend, pid).await,
            EnforcementAction::BlockNetwork => {
                self.single_call(CapabilityAction::BlockNetwork, pid).await
            }
            EnforcementAction::Quarantine => self.quarantine(pid).await,
            EnforcementAction::RevokePermissions | EnforcementAction::Whitelist => {
                let err = CapabilityError::Unsupported {
                    action: action.as_str().to_string(),
                };
                log::warn!("{}", err);
                (false, Some(err.to_string()))
            }
        }
    }

    async fn single_call(&self, action: CapabilityAction, pid: u32) -> (bool, Option<String>) {
        match self.invoke_with_timeout(action, pid).await {
            Ok(_) => (true, None),
            Err(e) => (false, Some(e.to_string())),
        }
    }

    /// Suspend + BlockNetwork. Both legs are always attempted; the
    /// composite succeeds only when both do, and either failure is
    /// reported, never swallowed.
    async fn quarantine(&self, pid: u32) -> (bool, Option<String>) {
        let suspend = self.invoke_with_timeout(CapabilityAction::Suspend, pid).await;
        let block = self
            .invoke_with_timeout(CapabilityAction::BlockNetwork, pid)
            .await;

        let mut failures = Vec::new();
        if let Err(e) = &suspend {
            failures.push(format!("suspend: {}", e));
        }
        if let Err(e) = &block {
            failures.push(format!("block_network: {}", e));
        }

        if failures.is_empty() {
            (true, None)
        } else {
            (false, Some(failures.join("; ")))
        }
    }

    /// One capability call under the bounded timeout. Expiry is a
    /// CapabilityError, not a crash.
    async fn invoke_with_timeout(
        &self,
        action: CapabilityAction,
        pid: u32,
    ) -> Result<Ack, CapabilityError> {
        let capability = Arc::clone(&self.capability);
        let handle = tokio::task::spawn_blocking(move || capability.invoke(action, pid));

        match tokio::time::timeout(self.call_timeout, handle).await {
            Err(_) => Err(CapabilityError::Timeout {
                ms: self.call_timeout.as_millis() as u64,
            }),
            Ok(Err(join_err)) => Err(CapabilityError::Other {
                message: join_err.to_string(),
            }),
            Ok(Ok(result)) => result,
        }
    }

    /// Append an audit record. A store failure must not take the loop
    /// down, but it is logged loudly and distinctly from action failures.
    fn record(&self, record: EnforcementRecord) {
        if let Err(e) = self.store.append_enforcement(&record) {
            log::error!(
                "AUDIT WRITE FAILED for {} on PID {} - the action outcome was NOT persisted: {}",
                record.action,
                record.pid,
                e
            );
        }
    }
}

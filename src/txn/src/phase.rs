// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use std::fmt;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::participant::{ParticipantAction, ParticipantOutcome};
use crate::pool::WorkerPool;

/// One of the three phases applied uniformly to all participants of a
/// transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Prepare,
    Commit,
    Rollback,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Prepare => "prepare",
            Phase::Commit => "commit",
            Phase::Rollback => "rollback",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The aggregate decision for one phase across all participants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhaseResult {
    /// Every participant completed without error before the deadline.
    Success,
    /// At least one participant completed with an error before the deadline.
    Failed,
    /// The deadline elapsed before all participants reported.
    Running,
}

impl PhaseResult {
    pub fn as_str(&self) -> &'static str {
        match self {
            PhaseResult::Success => "success",
            PhaseResult::Failed => "failed",
            PhaseResult::Running => "running",
        }
    }
}

/// The outcome of running one phase, including the per-participant detail
/// retained for diagnostics.
#[derive(Debug)]
pub struct PhaseReport {
    phase: Phase,
    result: PhaseResult,
    outcomes: Vec<(String, ParticipantOutcome)>,
}

impl PhaseReport {
    /// The phase this report describes.
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// The aggregate decision for the phase.
    pub fn result(&self) -> PhaseResult {
        self.result
    }

    /// Whether every participant succeeded before the deadline.
    pub fn succeeded(&self) -> bool {
        self.result == PhaseResult::Success
    }

    /// Per-participant outcomes, in participant order, as of the moment the
    /// phase resolved.
    pub fn outcomes(&self) -> &[(String, ParticipantOutcome)] {
        &self.outcomes
    }

    /// The recorded outcome for the first participant named `node_id`.
    pub fn outcome(&self, node_id: &str) -> Option<&ParticipantOutcome> {
        self.outcomes
            .iter()
            .find(|(id, _)| id == node_id)
            .map(|(_, outcome)| outcome)
    }
}

/// Runs one phase across a set of participants, concurrently, under a single
/// deadline.
///
/// Every action is launched on the shared worker pool. Completions count down
/// a barrier; the runner resolves when the barrier reaches zero or the
/// deadline passes. It deliberately never exits early on the first failure:
/// the aggregate decision is always compiled from the full set of outcomes
/// recorded so far, so a slow straggler cannot be silently dropped from it.
#[derive(Debug)]
pub(crate) struct PhaseRunner {
    pool: WorkerPool,
}

impl PhaseRunner {
    pub(crate) fn new(pool: WorkerPool) -> PhaseRunner {
        PhaseRunner { pool }
    }

    pub(crate) async fn run(
        &self,
        phase: Phase,
        actions: Vec<(String, ParticipantAction)>,
        timeout: Duration,
    ) -> PhaseReport {
        let total = actions.len();
        let outcomes = Arc::new(Mutex::new(
            actions
                .iter()
                .map(|(node_id, _)| (node_id.clone(), ParticipantOutcome::Inited))
                .collect::<Vec<_>>(),
        ));
        let (done_tx, mut done_rx) = mpsc::unbounded_channel();

        for (index, (node_id, action)) in actions.into_iter().enumerate() {
            let outcomes = Arc::clone(&outcomes);
            let done_tx = done_tx.clone();
            let semaphore = self.pool.semaphore();
            tokio::spawn(async move {
                let _permit = semaphore
                    .acquire_owned()
                    .await
                    .expect("worker pool semaphore is never closed");
                record(&outcomes, index, ParticipantOutcome::Running);
                let outcome = match action.await {
                    Ok(()) => ParticipantOutcome::Succeeded,
                    Err(e) => {
                        warn!(%phase, node_id = %node_id, error = %e, "participant phase action failed");
                        ParticipantOutcome::Failed(Arc::new(e))
                    }
                };
                record(&outcomes, index, outcome);
                // The receiver goes away once the phase resolves; a straggler
                // completing after the deadline has nobody left to notify.
                let _ = done_tx.send(());
            });
        }
        drop(done_tx);

        let deadline = Instant::now() + timeout;
        let mut reported = 0;
        while reported < total {
            match tokio::time::timeout_at(deadline, done_rx.recv()).await {
                Ok(Some(())) => reported += 1,
                // All senders dropped without sending, i.e. a task panicked.
                // The unreported participant surfaces as `Running`.
                Ok(None) => break,
                Err(_) => {
                    warn!(%phase, reported, total, "phase deadline elapsed");
                    break;
                }
            }
        }

        let outcomes = outcomes.lock().expect("lock poisoned").clone();
        let mut any_failed = false;
        let mut any_pending = false;
        for (_, outcome) in &outcomes {
            match outcome {
                ParticipantOutcome::Failed(_) => any_failed = true,
                ParticipantOutcome::Inited | ParticipantOutcome::Running => any_pending = true,
                ParticipantOutcome::Succeeded => {}
            }
        }
        let result = if any_failed {
            PhaseResult::Failed
        } else if any_pending {
            PhaseResult::Running
        } else {
            PhaseResult::Success
        };
        debug!(%phase, result = result.as_str(), participants = total, "phase resolved");

        PhaseReport {
            phase,
            result,
            outcomes,
        }
    }
}

fn record(
    outcomes: &Mutex<Vec<(String, ParticipantOutcome)>>,
    index: usize,
    outcome: ParticipantOutcome,
) {
    let mut outcomes = outcomes.lock().expect("lock poisoned");
    outcomes[index].1 = outcome;
}

#[cfg(test)]
mod tests {
    use std::future;
    use std::time::Duration;

    use anyhow::anyhow;
    use futures::FutureExt;

    use super::*;

    fn runner() -> PhaseRunner {
        PhaseRunner::new(WorkerPool::new(10))
    }

    fn ok_action() -> ParticipantAction {
        async { Ok(()) }.boxed()
    }

    fn failing_action(msg: &'static str) -> ParticipantAction {
        async move { Err(anyhow!(msg)) }.boxed()
    }

    #[tokio::test]
    async fn all_successes_aggregate_to_success() {
        let actions = vec![
            ("node-0".to_string(), ok_action()),
            ("node-1".to_string(), ok_action()),
            ("node-2".to_string(), ok_action()),
        ];
        let report = runner()
            .run(Phase::Prepare, actions, Duration::from_secs(10))
            .await;
        assert_eq!(report.result(), PhaseResult::Success);
        assert_eq!(report.outcomes().len(), 3);
        assert!(
            report
                .outcomes()
                .iter()
                .all(|(_, o)| matches!(o, ParticipantOutcome::Succeeded))
        );
    }

    #[tokio::test]
    async fn one_failure_aggregates_to_failed() {
        let actions = vec![
            ("node-0".to_string(), ok_action()),
            ("node-1".to_string(), failing_action("connection refused")),
        ];
        let report = runner()
            .run(Phase::Prepare, actions, Duration::from_secs(10))
            .await;
        assert_eq!(report.result(), PhaseResult::Failed);
        assert!(matches!(
            report.outcome("node-1"),
            Some(ParticipantOutcome::Failed(_))
        ));
        assert!(matches!(
            report.outcome("node-0"),
            Some(ParticipantOutcome::Succeeded)
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn hung_participant_aggregates_to_running_at_deadline() {
        let actions = vec![
            ("node-0".to_string(), ok_action()),
            ("node-1".to_string(), future::pending().boxed()),
        ];
        let report = runner()
            .run(Phase::Prepare, actions, Duration::from_secs(10))
            .await;
        assert_eq!(report.result(), PhaseResult::Running);
        assert!(matches!(
            report.outcome("node-0"),
            Some(ParticipantOutcome::Succeeded)
        ));
        assert!(!report.outcome("node-1").unwrap().is_terminal());
    }

    #[tokio::test]
    async fn failure_wins_over_pending() {
        let actions = vec![
            ("node-0".to_string(), failing_action("boom")),
            ("node-1".to_string(), future::pending().boxed()),
        ];
        let report = runner()
            .run(Phase::Commit, actions, Duration::from_millis(50))
            .await;
        assert_eq!(report.result(), PhaseResult::Failed);
    }

    #[tokio::test]
    async fn empty_phase_is_a_trivial_success() {
        let report = runner()
            .run(Phase::Prepare, Vec::new(), Duration::from_secs(10))
            .await;
        assert_eq!(report.result(), PhaseResult::Success);
        assert!(report.outcomes().is_empty());
    }

    #[tokio::test]
    async fn pool_narrower_than_participants_still_completes() {
        let runner = PhaseRunner::new(WorkerPool::new(1));
        let actions = (0..16)
            .map(|i| (format!("node-{i}"), ok_action()))
            .collect();
        let report = runner
            .run(Phase::Prepare, actions, Duration::from_secs(10))
            .await;
        assert_eq!(report.result(), PhaseResult::Success);
        assert_eq!(report.outcomes().len(), 16);
    }
}

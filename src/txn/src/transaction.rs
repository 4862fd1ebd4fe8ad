// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::metrics::Metrics;
use crate::participant::Participant;
use crate::phase::{Phase, PhaseReport, PhaseRunner};
use crate::pool::WorkerPool;

/// A unique identifier for one distributed transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TransactionId(Uuid);

impl TransactionId {
    fn new() -> TransactionId {
        TransactionId(Uuid::new_v4())
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// The lifecycle state of a [`Transaction`].
///
/// States are monotonic: a transaction never revisits an earlier state. The
/// two possible paths are `Init → PreparingCommit → Committing → Committed`
/// and `Init → PreparingCommit → Aborting → Aborted`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionStatus {
    Init,
    PreparingCommit,
    Committing,
    Committed,
    Aborting,
    Aborted,
}

impl TransactionStatus {
    /// Whether the transaction has reached one of its two terminal states.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TransactionStatus::Committed | TransactionStatus::Aborted
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionStatus::Init => "init",
            TransactionStatus::PreparingCommit => "preparing_commit",
            TransactionStatus::Committing => "committing",
            TransactionStatus::Committed => "committed",
            TransactionStatus::Aborting => "aborting",
            TransactionStatus::Aborted => "aborted",
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TransactionError {
    #[error("transaction {0} has already been started")]
    AlreadyStarted(TransactionId),
}

/// Configuration for driving distributed transactions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionConfig {
    /// How long each phase may take before the coordinator stops waiting for
    /// unreported participants.
    #[serde(default = "TransactionConfig::default_phase_timeout")]
    pub phase_timeout: Duration,
    /// How many participant calls may run at once across all transactions
    /// sharing one worker pool.
    #[serde(default = "TransactionConfig::default_worker_pool_width")]
    pub worker_pool_width: usize,
}

impl TransactionConfig {
    fn default_phase_timeout() -> Duration {
        Duration::from_secs(10)
    }

    fn default_worker_pool_width() -> usize {
        10
    }
}

impl Default for TransactionConfig {
    fn default() -> TransactionConfig {
        TransactionConfig {
            phase_timeout: TransactionConfig::default_phase_timeout(),
            worker_pool_width: TransactionConfig::default_worker_pool_width(),
        }
    }
}

/// One logical distributed operation, applied to every participant with
/// two-phase commit.
///
/// Participants may be added only while the transaction is in `Init`;
/// [`Transaction::start`] drives the full phase sequence to its bounded
/// conclusion and returns the terminal status. Prepare failures and prepare
/// timeouts both send the transaction to rollback. A commit-phase failure
/// after a successful prepare does not change the terminal status: it is
/// reported as an operational incident and never retried, because retrying a
/// non-idempotent commit without participant-side idempotency guarantees is
/// unsafe.
#[derive(Debug)]
pub struct Transaction {
    id: TransactionId,
    created: DateTime<Utc>,
    status: TransactionStatus,
    participants: Vec<Participant>,
    runner: PhaseRunner,
    phase_timeout: Duration,
    metrics: Arc<Metrics>,
}

impl Transaction {
    /// Creates an empty transaction that will run its phases on `pool`.
    pub fn new(config: &TransactionConfig, pool: WorkerPool, metrics: Arc<Metrics>) -> Transaction {
        Transaction {
            id: TransactionId::new(),
            created: Utc::now(),
            status: TransactionStatus::Init,
            participants: Vec::new(),
            runner: PhaseRunner::new(pool),
            phase_timeout: config.phase_timeout,
            metrics,
        }
    }

    pub fn id(&self) -> TransactionId {
        self.id
    }

    pub fn created(&self) -> DateTime<Utc> {
        self.created
    }

    pub fn status(&self) -> TransactionStatus {
        self.status
    }

    /// Adds a participant. Fails once the transaction has started: the
    /// participant set is immutable from that point on.
    pub fn add_participant(&mut self, participant: Participant) -> Result<(), TransactionError> {
        if self.status != TransactionStatus::Init {
            return Err(TransactionError::AlreadyStarted(self.id));
        }
        self.participants.push(participant);
        Ok(())
    }

    /// Drives the transaction through prepare and then commit or rollback,
    /// returning the terminal status.
    ///
    /// All participant calls underneath run concurrently, but `start` itself
    /// returns only after the full sequence has run to its bounded
    /// conclusion. A transaction with no participants trivially commits.
    pub async fn start(&mut self) -> Result<TransactionStatus, TransactionError> {
        if self.status != TransactionStatus::Init {
            return Err(TransactionError::AlreadyStarted(self.id));
        }
        self.metrics.transaction_started();
        self.status = TransactionStatus::PreparingCommit;
        let prepare = self.run_phase(Phase::Prepare).await;

        if prepare.succeeded() {
            info!(txn = %self.id, "global commit");
            self.status = TransactionStatus::Committing;
            let commit = self.run_phase(Phase::Commit).await;
            if !commit.succeeded() {
                // Prepared participants that did not acknowledge the commit
                // are in an unknown state; resolving them requires operator
                // intervention.
                error!(
                    txn = %self.id,
                    result = commit.result().as_str(),
                    "commit phase did not fully succeed after a successful prepare"
                );
            }
            self.status = TransactionStatus::Committed;
        } else {
            warn!(
                txn = %self.id,
                result = prepare.result().as_str(),
                "global rollback"
            );
            self.status = TransactionStatus::Aborting;
            let rollback = self.run_phase(Phase::Rollback).await;
            if !rollback.succeeded() {
                warn!(
                    txn = %self.id,
                    result = rollback.result().as_str(),
                    "rollback phase did not fully succeed"
                );
            }
            self.status = TransactionStatus::Aborted;
        }

        self.metrics.transaction_finished(self.status);
        Ok(self.status)
    }

    async fn run_phase(&mut self, phase: Phase) -> PhaseReport {
        let actions = self
            .participants
            .iter_mut()
            .map(|p| {
                let action = p
                    .take_action(phase)
                    .expect("each phase action is taken at most once");
                (p.node_id().to_string(), action)
            })
            .collect();
        let start = Instant::now();
        let report = self.runner.run(phase, actions, self.phase_timeout).await;
        self.metrics
            .phase_resolved(phase, report.result(), start.elapsed());
        report
    }
}

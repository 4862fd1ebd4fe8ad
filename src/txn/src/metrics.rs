// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Prometheus metrics for transaction coordination.

use std::fmt;
use std::time::Duration;

use prometheus::{HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts, Registry};

use crate::phase::{Phase, PhaseResult};
use crate::transaction::TransactionStatus;

/// Metrics tracked for all transactions sharing one coordinator.
///
/// Collectors are created eagerly and are usable unregistered, which keeps
/// tests free of a metrics registry; production callers register them with
/// [`Metrics::register`].
#[derive(Clone)]
pub struct Metrics {
    transactions_started: IntCounter,
    transactions_finished: IntCounterVec,
    phase_seconds: HistogramVec,
}

impl fmt::Debug for Metrics {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Metrics").finish_non_exhaustive()
    }
}

impl Metrics {
    pub fn new() -> Metrics {
        let transactions_started = IntCounter::new(
            "skiff_txn_transactions_started_total",
            "Number of distributed transactions started.",
        )
        .expect("collector is well formed");
        let transactions_finished = IntCounterVec::new(
            Opts::new(
                "skiff_txn_transactions_finished_total",
                "Number of distributed transactions that reached a terminal status.",
            ),
            &["status"],
        )
        .expect("collector is well formed");
        let phase_seconds = HistogramVec::new(
            HistogramOpts::new(
                "skiff_txn_phase_seconds",
                "Wall-clock time each phase took to resolve.",
            ),
            &["phase", "result"],
        )
        .expect("collector is well formed");
        Metrics {
            transactions_started,
            transactions_finished,
            phase_seconds,
        }
    }

    /// Registers all collectors with `registry`.
    pub fn register(&self, registry: &Registry) -> Result<(), prometheus::Error> {
        registry.register(Box::new(self.transactions_started.clone()))?;
        registry.register(Box::new(self.transactions_finished.clone()))?;
        registry.register(Box::new(self.phase_seconds.clone()))?;
        Ok(())
    }

    pub(crate) fn transaction_started(&self) {
        self.transactions_started.inc();
    }

    pub(crate) fn transaction_finished(&self, status: TransactionStatus) {
        self.transactions_finished
            .with_label_values(&[status.as_str()])
            .inc();
    }

    pub(crate) fn phase_resolved(&self, phase: Phase, result: PhaseResult, elapsed: Duration) {
        self.phase_seconds
            .with_label_values(&[phase.as_str(), result.as_str()])
            .observe(elapsed.as_secs_f64());
    }
}

impl Default for Metrics {
    fn default() -> Metrics {
        Metrics::new()
    }
}

// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Two-phase commit coordination for cluster-wide metadata mutations.
//!
//! A [`Transaction`] owns one [`Participant`] per cooperating node and drives
//! all of them through `prepare` and then either `commit` or `rollback`. Each
//! phase fans out concurrently over a shared, bounded [`WorkerPool`] and
//! blocks on a completion barrier with a deadline: the phase resolves once
//! every participant has reported a terminal outcome or the deadline elapses,
//! whichever comes first. Participants that outlive the deadline are never
//! cancelled; they finish in the background and their late outcomes are
//! ignored by the aggregate decision.
//!
//! The aggregate decision for a phase is pessimistic: any participant failure
//! makes the phase `Failed`, any participant still unreported at the deadline
//! makes it `Running`, and only a full slate of successes makes it `Success`.
//! A prepare phase that is anything other than `Success` sends the whole
//! transaction to rollback, because an uncertain participant must never be
//! assumed committed.
//!
//! Coordination state lives only in process memory. There is no durable
//! decision log and no participant-side idempotency tracking, so a crash
//! between phases can leave participants inconsistent; a recovery log would
//! be required to resolve that.

mod participant;
mod phase;
mod pool;
mod registry;
mod transaction;

pub mod metrics;

pub use crate::participant::{Participant, ParticipantAction, ParticipantOutcome};
pub use crate::phase::{Phase, PhaseReport, PhaseResult};
pub use crate::pool::WorkerPool;
pub use crate::registry::TransactionRegistry;
pub use crate::transaction::{
    Transaction, TransactionConfig, TransactionError, TransactionId, TransactionStatus,
};

// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use std::future::Future;
use std::sync::Arc;

use derivative::Derivative;
use futures::FutureExt;
use futures::future::BoxFuture;

use crate::phase::Phase;

/// One asynchronous unit of work a participant performs for one phase.
///
/// Actions have no side effects until polled and are consumed at most once
/// over the lifetime of their transaction.
pub type ParticipantAction = BoxFuture<'static, Result<(), anyhow::Error>>;

/// One node's view of a distributed operation.
///
/// A participant is owned exclusively by the transaction that created it and
/// carries the three phase actions the caller supplied for its node. The
/// transaction takes each action out exactly once when it runs the
/// corresponding phase; the rollback action of a committed transaction (and
/// vice versa) is simply dropped unpolled.
#[derive(Derivative)]
#[derivative(Debug)]
pub struct Participant {
    node_id: String,
    #[derivative(Debug = "ignore")]
    prepare: Option<ParticipantAction>,
    #[derivative(Debug = "ignore")]
    commit: Option<ParticipantAction>,
    #[derivative(Debug = "ignore")]
    rollback: Option<ParticipantAction>,
}

impl Participant {
    /// Creates a participant for the node identified by `node_id` with the
    /// given phase actions.
    pub fn new<P, C, R>(node_id: impl Into<String>, prepare: P, commit: C, rollback: R) -> Participant
    where
        P: Future<Output = Result<(), anyhow::Error>> + Send + 'static,
        C: Future<Output = Result<(), anyhow::Error>> + Send + 'static,
        R: Future<Output = Result<(), anyhow::Error>> + Send + 'static,
    {
        Participant {
            node_id: node_id.into(),
            prepare: Some(prepare.boxed()),
            commit: Some(commit.boxed()),
            rollback: Some(rollback.boxed()),
        }
    }

    /// Returns the stable identifier of the node this participant stands for.
    pub fn node_id(&self) -> &str {
        &self.node_id
    }

    pub(crate) fn take_action(&mut self, phase: Phase) -> Option<ParticipantAction> {
        match phase {
            Phase::Prepare => self.prepare.take(),
            Phase::Commit => self.commit.take(),
            Phase::Rollback => self.rollback.take(),
        }
    }
}

/// A participant's outcome for the phase currently being run.
///
/// Outcomes are created fresh at the start of each phase and are not carried
/// over between phases.
#[derive(Debug, Clone)]
pub enum ParticipantOutcome {
    /// The participant's action has not been scheduled yet.
    Inited,
    /// The action is running but has not reported a terminal outcome.
    Running,
    /// The action completed without error.
    Succeeded,
    /// The action completed with the given error.
    Failed(Arc<anyhow::Error>),
}

impl ParticipantOutcome {
    /// Whether this outcome is terminal for the phase.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ParticipantOutcome::Succeeded | ParticipantOutcome::Failed(_)
        )
    }
}

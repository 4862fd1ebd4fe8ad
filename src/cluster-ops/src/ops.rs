// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use std::sync::Arc;

use skiff_txn::metrics::Metrics;
use skiff_txn::{
    Participant, Transaction, TransactionConfig, TransactionError, TransactionRegistry,
    TransactionStatus, WorkerPool,
};
use tracing::{info, warn};

use crate::client::{MetadataOp, NodeClient};

/// Applies metadata operations to the whole cluster with two-phase commit.
///
/// One transaction is created per executed operation, with one participant
/// per node client; the operation's caller observes only the terminal
/// transaction status.
#[derive(Debug)]
pub struct MetadataOps {
    nodes: Vec<Arc<dyn NodeClient>>,
    pool: WorkerPool,
    registry: Arc<TransactionRegistry>,
    config: TransactionConfig,
    metrics: Arc<Metrics>,
}

impl MetadataOps {
    pub fn new(
        nodes: Vec<Arc<dyn NodeClient>>,
        config: TransactionConfig,
        registry: Arc<TransactionRegistry>,
        metrics: Arc<Metrics>,
    ) -> MetadataOps {
        let pool = WorkerPool::new(config.worker_pool_width);
        MetadataOps {
            nodes,
            pool,
            registry,
            config,
            metrics,
        }
    }

    /// Drives `op` through prepare and commit-or-rollback on every node and
    /// returns the terminal transaction status.
    pub async fn execute(&self, op: MetadataOp) -> Result<TransactionStatus, TransactionError> {
        let mut txn = Transaction::new(
            &self.config,
            self.pool.clone(),
            Arc::clone(&self.metrics),
        );
        for node in &self.nodes {
            txn.add_participant(participant_for(Arc::clone(node), op.clone()))?;
        }

        info!(
            op = op.kind(),
            txn = %txn.id(),
            nodes = self.nodes.len(),
            "executing cluster metadata operation"
        );
        self.registry.register(txn.id());
        let result = txn.start().await;
        self.registry.unregister(&txn.id());

        let status = result?;
        match status {
            TransactionStatus::Aborted => {
                warn!(op = op.kind(), txn = %txn.id(), "cluster metadata operation aborted");
            }
            _ => {
                info!(op = op.kind(), txn = %txn.id(), "cluster metadata operation committed");
            }
        }
        Ok(status)
    }
}

fn participant_for(node: Arc<dyn NodeClient>, op: MetadataOp) -> Participant {
    let node_id = node.node_id().to_string();
    let prepare = {
        let node = Arc::clone(&node);
        let op = op.clone();
        async move { node.prepare(&op).await }
    };
    let commit = {
        let node = Arc::clone(&node);
        let op = op.clone();
        async move { node.commit(&op).await }
    };
    let rollback = async move { node.rollback(&op).await };
    Participant::new(node_id, prepare, commit, rollback)
}

// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use std::collections::BTreeSet;
use std::sync::Mutex;

use crate::transaction::TransactionId;

/// Process-wide bookkeeping of in-flight transactions.
///
/// Purely observational: transactions are registered when created and
/// unregistered once their terminal phase completes. No protocol logic lives
/// here.
#[derive(Debug, Default)]
pub struct TransactionRegistry {
    live: Mutex<BTreeSet<TransactionId>>,
}

impl TransactionRegistry {
    pub fn new() -> TransactionRegistry {
        TransactionRegistry::default()
    }

    /// Records `id` as in flight. Returns false if it was already present.
    pub fn register(&self, id: TransactionId) -> bool {
        self.live.lock().expect("lock poisoned").insert(id)
    }

    /// Removes `id`. Returns false if it was not present.
    pub fn unregister(&self, id: &TransactionId) -> bool {
        self.live.lock().expect("lock poisoned").remove(id)
    }

    pub fn contains(&self, id: &TransactionId) -> bool {
        self.live.lock().expect("lock poisoned").contains(id)
    }

    pub fn len(&self) -> usize {
        self.live.lock().expect("lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The ids of all in-flight transactions at the moment of the call.
    pub fn snapshot(&self) -> Vec<TransactionId> {
        self.live
            .lock()
            .expect("lock poisoned")
            .iter()
            .copied()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::metrics::Metrics;
    use crate::transaction::{Transaction, TransactionConfig};
    use crate::WorkerPool;

    #[tokio::test]
    async fn tracks_registration_lifecycle() {
        let registry = TransactionRegistry::new();
        let txn = Transaction::new(
            &TransactionConfig::default(),
            WorkerPool::new(2),
            Arc::new(Metrics::new()),
        );

        assert!(registry.is_empty());
        assert!(registry.register(txn.id()));
        assert!(!registry.register(txn.id()));
        assert!(registry.contains(&txn.id()));
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.snapshot(), vec![txn.id()]);
        assert!(registry.unregister(&txn.id()));
        assert!(!registry.unregister(&txn.id()));
        assert!(registry.is_empty());
    }
}

// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use std::sync::Arc;

use tokio::sync::Semaphore;

/// A fixed-width pool bounding how many participant calls run at once.
///
/// The pool is shared across all concurrently active transactions: cloning a
/// `WorkerPool` clones a handle to the same underlying capacity. Each
/// participant call holds one slot for the duration of its phase action.
#[derive(Debug, Clone)]
pub struct WorkerPool {
    semaphore: Arc<Semaphore>,
    width: usize,
}

impl WorkerPool {
    /// Creates a pool that runs at most `width` participant calls at a time.
    /// A width of zero is treated as one.
    pub fn new(width: usize) -> WorkerPool {
        let width = width.max(1);
        WorkerPool {
            semaphore: Arc::new(Semaphore::new(width)),
            width,
        }
    }

    /// Returns the configured width of the pool.
    pub fn width(&self) -> usize {
        self.width
    }

    pub(crate) fn semaphore(&self) -> Arc<Semaphore> {
        Arc::clone(&self.semaphore)
    }
}

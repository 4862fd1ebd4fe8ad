// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, Mutex};

use tracing::debug;

use crate::catalog::GlobalFunctionCatalog;
use crate::error::FunctionCatalogError;
use crate::metadata::{
    BoundSignature, FunctionId, InvocationConvention, ScalarFunctionImplementation,
};

/// Resolves and memoizes specialized function implementations.
///
/// Specialization is a pure function of the catalog snapshot and the cache
/// key, so concurrent misses for the same key may race to compute and insert;
/// the last writer wins. The manager subscribes itself to the catalog's
/// eviction notifications, which arrive only after a superseding snapshot has
/// been published: a re-resolution triggered by an eviction therefore can
/// never repopulate the cache with the superseded implementation.
pub struct FunctionManager {
    catalog: Arc<GlobalFunctionCatalog>,
    specialized_scalar: Arc<SpecializedScalarCache>,
}

impl fmt::Debug for FunctionManager {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("FunctionManager")
            .field("catalog", &self.catalog)
            .field("specialized_scalar", &self.specialized_scalar.len())
            .finish()
    }
}

impl FunctionManager {
    /// Creates a manager over `catalog` and installs it as the catalog's
    /// eviction listener.
    pub fn new(catalog: Arc<GlobalFunctionCatalog>) -> FunctionManager {
        let specialized_scalar = Arc::new(SpecializedScalarCache::default());
        let cache = Arc::clone(&specialized_scalar);
        catalog.set_eviction_listener(Box::new(move |id| cache.evict(id)));
        FunctionManager {
            catalog,
            specialized_scalar,
        }
    }

    /// Returns the specialized scalar implementation for the given resolved
    /// function, computing and caching it on a miss.
    pub fn scalar_function_implementation(
        &self,
        id: &FunctionId,
        bound: &BoundSignature,
        convention: &InvocationConvention,
    ) -> Result<ScalarFunctionImplementation, FunctionCatalogError> {
        let key = SpecializationKey {
            function_id: id.clone(),
            bound: bound.clone(),
            convention: convention.clone(),
        };
        if let Some(hit) = self.specialized_scalar.get(&key) {
            return Ok(hit);
        }
        let bundle = self.catalog.get_function_bundle(id)?;
        let implementation = bundle.specialize_scalar(id, bound, convention)?;
        self.specialized_scalar
            .insert(key, Arc::clone(&implementation));
        Ok(implementation)
    }

    /// Drops every cached specialization backed by `id`.
    pub fn evict(&self, id: &FunctionId) {
        self.specialized_scalar.evict(id);
    }

    /// How many specialized scalar implementations are currently cached.
    pub fn specialized_scalar_count(&self) -> usize {
        self.specialized_scalar.len()
    }
}

/// The identity of one specialized implementation.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
struct SpecializationKey {
    function_id: FunctionId,
    bound: BoundSignature,
    convention: InvocationConvention,
}

#[derive(Default)]
struct SpecializedScalarCache {
    entries: Mutex<BTreeMap<SpecializationKey, ScalarFunctionImplementation>>,
}

impl SpecializedScalarCache {
    fn get(&self, key: &SpecializationKey) -> Option<ScalarFunctionImplementation> {
        self.entries
            .lock()
            .expect("lock poisoned")
            .get(key)
            .map(Arc::clone)
    }

    fn insert(&self, key: SpecializationKey, implementation: ScalarFunctionImplementation) {
        self.entries
            .lock()
            .expect("lock poisoned")
            .insert(key, implementation);
    }

    fn evict(&self, id: &FunctionId) {
        let mut entries = self.entries.lock().expect("lock poisoned");
        let before = entries.len();
        entries.retain(|key, _| key.function_id != *id);
        debug!(%id, dropped = before - entries.len(), "evicted specialized scalar implementations");
    }

    fn len(&self) -> usize {
        self.entries.lock().expect("lock poisoned").len()
    }
}

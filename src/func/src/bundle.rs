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

use itertools::Itertools;

use crate::error::FunctionCatalogError;
use crate::metadata::{
    BoundSignature, FunctionId, FunctionKind, FunctionMetadata, InvocationConvention,
    ScalarFunctionImplementation,
};

/// A set of functions registered with the catalog as one atomic unit.
///
/// A bundle carries the metadata for each of its functions together with the
/// means to produce their runtime implementations. How the bundle came to be
/// (a dynamically loaded plugin, a statically linked module) is not the
/// catalog's concern.
pub trait FunctionBundle: fmt::Debug + Send + Sync {
    /// The metadata of every function in this bundle.
    fn functions(&self) -> &[FunctionMetadata];

    /// Produces the specialized scalar implementation of `id` for the given
    /// call-site binding and invocation convention.
    fn specialize_scalar(
        &self,
        id: &FunctionId,
        bound: &BoundSignature,
        convention: &InvocationConvention,
    ) -> Result<ScalarFunctionImplementation, FunctionCatalogError>;
}

/// A [`FunctionBundle`] assembled from in-process implementations.
#[derive(Default)]
pub struct SimpleFunctionBundle {
    functions: Vec<FunctionMetadata>,
    scalar_implementations: BTreeMap<FunctionId, ScalarFunctionImplementation>,
}

impl SimpleFunctionBundle {
    pub fn new() -> SimpleFunctionBundle {
        SimpleFunctionBundle::default()
    }

    /// Adds a scalar function backed by `implementation`.
    pub fn with_scalar(
        mut self,
        metadata: FunctionMetadata,
        implementation: ScalarFunctionImplementation,
    ) -> SimpleFunctionBundle {
        self.scalar_implementations
            .insert(metadata.id().clone(), implementation);
        self.functions.push(metadata);
        self
    }

    /// Adds a function whose implementation the engine provides elsewhere;
    /// the bundle contributes metadata only.
    pub fn with_metadata(mut self, metadata: FunctionMetadata) -> SimpleFunctionBundle {
        self.functions.push(metadata);
        self
    }
}

impl fmt::Debug for SimpleFunctionBundle {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "SimpleFunctionBundle[{}]",
            self.functions.iter().map(|f| f.id()).join(", ")
        )
    }
}

impl FunctionBundle for SimpleFunctionBundle {
    fn functions(&self) -> &[FunctionMetadata] {
        &self.functions
    }

    fn specialize_scalar(
        &self,
        id: &FunctionId,
        _bound: &BoundSignature,
        _convention: &InvocationConvention,
    ) -> Result<ScalarFunctionImplementation, FunctionCatalogError> {
        let metadata = self
            .functions
            .iter()
            .find(|m| m.id() == id)
            .ok_or_else(|| FunctionCatalogError::UnknownFunction(id.clone()))?;
        if metadata.kind() != FunctionKind::Scalar {
            return Err(FunctionCatalogError::NotScalar(id.clone()));
        }
        self.scalar_implementations
            .get(id)
            .cloned()
            .ok_or_else(|| FunctionCatalogError::UnknownFunction(id.clone()))
    }
}

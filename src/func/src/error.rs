// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use crate::metadata::FunctionId;
use crate::operators::OperatorKind;

/// Errors surfaced by the function catalog.
///
/// Validation variants are reported before any mutation becomes visible:
/// a failed registration leaves the published snapshot untouched.
#[derive(Debug, thiserror::Error)]
pub enum FunctionCatalogError {
    #[error("function name cannot contain '{separator}' character: {signature}")]
    InvalidFunctionName { separator: char, signature: String },
    #[error("'{0}' is both an aggregation and a scalar function")]
    MixedAggregateAndScalar(String),
    #[error("cannot register {operator:?} function: {signature}")]
    InvalidOperatorSignature {
        operator: OperatorKind,
        signature: String,
    },
    #[error("unknown operator name: {0}")]
    UnknownOperator(String),
    #[error("function already registered: {0}")]
    AlreadyRegistered(String),
    #[error("unknown function implementation: {0}")]
    UnknownFunction(FunctionId),
    #[error("function is not scalar: {0}")]
    NotScalar(FunctionId),
}

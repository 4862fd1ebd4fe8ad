// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Copy-on-write global function catalog and specialization caches.
//!
//! The [`GlobalFunctionCatalog`] holds every known function's metadata and
//! its owning [`FunctionBundle`] in one immutable snapshot. Registering a
//! bundle validates it, builds a brand-new snapshot, and swaps it in place of
//! the old one: readers that captured the previous snapshot keep a fully
//! consistent view, and no reader ever observes a half-applied registration.
//!
//! Under the replace-capable registration policy a bundle may supersede
//! functions that share its function ids. The catalog announces each
//! superseded id to its eviction listener *after* publishing the new
//! snapshot, so a cache that reacts to the notification and re-queries the
//! catalog is guaranteed to see the new state. The [`FunctionManager`] uses
//! exactly that wiring to keep its memoized specialized implementations from
//! ever returning an implementation whose backing function is gone.

mod bundle;
mod catalog;
mod config;
mod error;
mod manager;
mod metadata;
mod operators;

pub use crate::bundle::{FunctionBundle, SimpleFunctionBundle};
pub use crate::catalog::{EvictionListener, GlobalFunctionCatalog, RegistrationPolicy};
pub use crate::config::FunctionCatalogConfig;
pub use crate::error::FunctionCatalogError;
pub use crate::manager::FunctionManager;
pub use crate::metadata::{
    ArgumentConvention, BoundSignature, Datum, FunctionId, FunctionKind, FunctionMetadata,
    InvocationConvention, ReturnConvention, ScalarFunction, ScalarFunctionImplementation,
    Signature, SignatureBuilder, TypeSignature, TypeVariable, TypeVariableConstraint,
};
pub use crate::operators::{OperatorKind, is_operator_name, unmangle_operator};

// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Cluster-wide administrative metadata operations.
//!
//! An administrative statement (create a catalog, load a function plugin)
//! must take effect on every node of the cluster or on none of them. The
//! [`MetadataOps`] runner turns one [`MetadataOp`] into a two-phase-commit
//! transaction with one participant per node, delegating the actual remote
//! calls to a caller-supplied [`NodeClient`]; this crate neither discovers
//! nodes nor speaks any wire protocol itself.
//!
//! The local complement lives in [`FunctionInstaller`], which applies a
//! function bundle to this node's catalog, and in the announcement helpers,
//! which republish the set of catalog ids other nodes should know about.

mod announce;
mod client;
mod install;
mod ops;

pub use crate::announce::{
    Announcer, CATALOG_IDS_PROPERTY, ServiceAnnouncement, refresh_catalog_ids,
};
pub use crate::client::{MetadataOp, NodeClient};
pub use crate::install::FunctionInstaller;
pub use crate::ops::MetadataOps;

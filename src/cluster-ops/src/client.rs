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

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// One administrative mutation of cluster-shared metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MetadataOp {
    CreateCatalog {
        name: String,
        connector: String,
        properties: BTreeMap<String, String>,
    },
    DropCatalog {
        name: String,
    },
    LoadFunctions {
        plugin: String,
    },
    LoadPlugin {
        plugin: String,
    },
}

impl MetadataOp {
    /// A stable label for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            MetadataOp::CreateCatalog { .. } => "create_catalog",
            MetadataOp::DropCatalog { .. } => "drop_catalog",
            MetadataOp::LoadFunctions { .. } => "load_functions",
            MetadataOp::LoadPlugin { .. } => "load_plugin",
        }
    }
}

/// A handle for applying metadata operations to one cluster node.
///
/// Implementations wrap whatever transport reaches the node. Each method is
/// one phase of the node's participation: `prepare` must stage the operation
/// without making it effective, `commit` makes it effective, and `rollback`
/// discards whatever `prepare` staged. All three must be safe to call when
/// the node never saw the preceding phase, since a coordinator deadline may
/// fire before the node was reached.
#[async_trait]
pub trait NodeClient: fmt::Debug + Send + Sync {
    /// The stable identifier of the node this client reaches.
    fn node_id(&self) -> &str;

    async fn prepare(&self, op: &MetadataOp) -> Result<(), anyhow::Error>;

    async fn commit(&self, op: &MetadataOp) -> Result<(), anyhow::Error>;

    async fn rollback(&self, op: &MetadataOp) -> Result<(), anyhow::Error>;
}

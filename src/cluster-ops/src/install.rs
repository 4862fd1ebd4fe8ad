// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use std::sync::Arc;

use skiff_func::{FunctionBundle, FunctionCatalogError, GlobalFunctionCatalog};
use tracing::info;

/// Installs function bundles into this node's catalog.
///
/// This is the local half of a cluster-wide plugin load: the remote half is
/// a [`crate::MetadataOp::LoadFunctions`] fan-out driven by
/// [`crate::MetadataOps`]. Eviction notifications for any superseded
/// functions are published by the catalog itself, so by the time `install`
/// returns, downstream specialization caches no longer serve the replaced
/// implementations.
#[derive(Debug)]
pub struct FunctionInstaller {
    catalog: Arc<GlobalFunctionCatalog>,
}

impl FunctionInstaller {
    pub fn new(catalog: Arc<GlobalFunctionCatalog>) -> FunctionInstaller {
        FunctionInstaller { catalog }
    }

    /// Registers every function in `bundle`, returning how many were
    /// installed.
    pub fn install(
        &self,
        plugin: &str,
        bundle: Arc<dyn FunctionBundle>,
    ) -> Result<usize, FunctionCatalogError> {
        info!(plugin, "loading function plugin");
        let installed = bundle.functions().len();
        self.catalog.add_functions(bundle)?;
        info!(plugin, functions = installed, "finished loading function plugin");
        Ok(installed)
    }
}

#[cfg(test)]
mod tests {
    use skiff_func::{
        FunctionId, FunctionKind, FunctionMetadata, RegistrationPolicy, Signature,
        SimpleFunctionBundle, TypeSignature,
    };

    use super::*;

    fn metadata(name: &str) -> FunctionMetadata {
        FunctionMetadata::new(
            Signature::builder()
                .name(name)
                .return_type(TypeSignature::varchar())
                .argument_type(TypeSignature::varchar())
                .build(),
            FunctionKind::Scalar,
        )
    }

    #[test]
    fn installs_bundles_into_the_catalog() {
        let catalog = Arc::new(GlobalFunctionCatalog::with_policy(
            RegistrationPolicy::Replace,
        ));
        let installer = FunctionInstaller::new(Arc::clone(&catalog));

        let bundle = SimpleFunctionBundle::new()
            .with_metadata(metadata("reverse"))
            .with_metadata(metadata("shuffle"));
        let installed = installer.install("text-plugin", Arc::new(bundle)).unwrap();

        assert_eq!(installed, 2);
        assert_eq!(catalog.list_functions().len(), 2);
        assert!(
            catalog
                .get_function_metadata(&FunctionId::from_signature(
                    metadata("reverse").signature()
                ))
                .is_ok()
        );
    }

    #[test]
    fn a_rejected_bundle_installs_nothing() {
        let catalog = Arc::new(GlobalFunctionCatalog::with_policy(
            RegistrationPolicy::AppendOnly,
        ));
        let installer = FunctionInstaller::new(Arc::clone(&catalog));
        installer
            .install("text-plugin", Arc::new(
                SimpleFunctionBundle::new().with_metadata(metadata("reverse")),
            ))
            .unwrap();

        let duplicate = SimpleFunctionBundle::new().with_metadata(metadata("reverse"));
        assert!(installer.install("text-plugin", Arc::new(duplicate)).is_err());
        assert_eq!(catalog.list_functions().len(), 1);
    }
}

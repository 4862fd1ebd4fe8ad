// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::{Arc, Mutex};

use arc_swap::ArcSwap;
use tracing::{debug, info};

use crate::bundle::FunctionBundle;
use crate::config::FunctionCatalogConfig;
use crate::error::FunctionCatalogError;
use crate::metadata::{FunctionId, FunctionKind, FunctionMetadata};
use crate::operators::check_not_specialized_type_operator;

/// Characters reserved for encoding catalog lookup keys; function names may
/// not contain them.
const NAME_SEPARATORS: &[char] = &['|', '@'];

/// How the catalog treats a bundle whose functions already exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistrationPolicy {
    /// Reject a bundle if any of its function ids or signatures is already
    /// registered.
    AppendOnly,
    /// Silently supersede existing functions that share an incoming
    /// function id, announcing each superseded id to the eviction listener.
    Replace,
}

/// Called once per superseded function id, after the new snapshot has been
/// published.
pub type EvictionListener = Box<dyn Fn(&FunctionId) + Send + Sync>;

/// The process-wide catalog of registered functions.
///
/// The catalog's contents live in one immutable snapshot. Readers load the
/// current snapshot without locking and observe a fully consistent view even
/// while a registration is in flight; writers serialize on an internal lock,
/// build a new snapshot copy-on-write, and swap it in. Because the swap
/// happens before eviction notifications go out, a listener that re-queries
/// the catalog always sees the new contents.
pub struct GlobalFunctionCatalog {
    policy: RegistrationPolicy,
    snapshot: ArcSwap<FunctionMap>,
    write_lock: Mutex<()>,
    eviction_listener: Mutex<Option<EvictionListener>>,
}

impl fmt::Debug for GlobalFunctionCatalog {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("GlobalFunctionCatalog")
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

impl GlobalFunctionCatalog {
    pub fn new(config: &FunctionCatalogConfig) -> GlobalFunctionCatalog {
        GlobalFunctionCatalog::with_policy(config.registration_policy())
    }

    pub fn with_policy(policy: RegistrationPolicy) -> GlobalFunctionCatalog {
        GlobalFunctionCatalog {
            policy,
            snapshot: ArcSwap::from_pointee(FunctionMap::empty()),
            write_lock: Mutex::new(()),
            eviction_listener: Mutex::new(None),
        }
    }

    pub fn policy(&self) -> RegistrationPolicy {
        self.policy
    }

    /// Installs the single eviction listener, replacing any previous one.
    pub fn set_eviction_listener(&self, listener: EvictionListener) {
        *self.eviction_listener.lock().expect("lock poisoned") = Some(listener);
    }

    /// Registers every function in `bundle` as one atomic unit.
    ///
    /// The bundle is validated in full before any of it becomes visible; on
    /// a validation error the published snapshot is unchanged. On success
    /// the new snapshot is published first and one eviction notification is
    /// then emitted, synchronously, for each function id the bundle
    /// superseded (never any under the append-only policy).
    pub fn add_functions(
        &self,
        bundle: Arc<dyn FunctionBundle>,
    ) -> Result<(), FunctionCatalogError> {
        let _guard = self.write_lock.lock().expect("lock poisoned");
        let current = self.snapshot.load_full();

        for metadata in bundle.functions() {
            for &separator in NAME_SEPARATORS {
                if metadata.signature().name().contains(separator) {
                    return Err(FunctionCatalogError::InvalidFunctionName {
                        separator,
                        signature: metadata.signature().to_string(),
                    });
                }
            }
            check_not_specialized_type_operator(metadata.signature())?;
            if self.policy == RegistrationPolicy::AppendOnly {
                current.check_function_exists(metadata)?;
            }
        }

        let (next, evicted) = current.with_bundle(Arc::clone(&bundle), self.policy)?;
        self.snapshot.store(Arc::new(next));
        info!(
            functions = bundle.functions().len(),
            superseded = evicted.len(),
            "registered function bundle"
        );

        // Announce only after publication so that a reacting cache can never
        // repopulate itself from the superseded snapshot.
        let listener = self.eviction_listener.lock().expect("lock poisoned");
        if let Some(listener) = listener.as_ref() {
            for id in &evicted {
                debug!(%id, "evicting superseded function");
                listener(id);
            }
        }
        Ok(())
    }

    /// All functions in the current snapshot, in no particular order.
    pub fn list_functions(&self) -> Vec<FunctionMetadata> {
        self.snapshot.load().list()
    }

    pub fn get_function_metadata(
        &self,
        id: &FunctionId,
    ) -> Result<FunctionMetadata, FunctionCatalogError> {
        self.snapshot.load().metadata(id)
    }

    pub fn get_function_bundle(
        &self,
        id: &FunctionId,
    ) -> Result<Arc<dyn FunctionBundle>, FunctionCatalogError> {
        self.snapshot.load().bundle(id)
    }

    /// All overloads registered under `name`, case-insensitively.
    pub fn lookup_by_name(&self, name: &str) -> Vec<FunctionMetadata> {
        self.snapshot.load().get_by_name(name)
    }
}

/// One immutable version of the catalog's contents.
struct FunctionMap {
    bundles_by_id: BTreeMap<FunctionId, Arc<dyn FunctionBundle>>,
    functions_by_id: BTreeMap<FunctionId, FunctionMetadata>,
    functions_by_lowercase_name: BTreeMap<String, Vec<FunctionMetadata>>,
}

impl FunctionMap {
    fn empty() -> FunctionMap {
        FunctionMap {
            bundles_by_id: BTreeMap::new(),
            functions_by_id: BTreeMap::new(),
            functions_by_lowercase_name: BTreeMap::new(),
        }
    }

    /// Builds the successor snapshot that additionally contains `bundle`,
    /// returning it along with the ids of any superseded functions.
    fn with_bundle(
        &self,
        bundle: Arc<dyn FunctionBundle>,
        policy: RegistrationPolicy,
    ) -> Result<(FunctionMap, Vec<FunctionId>), FunctionCatalogError> {
        let mut incoming = BTreeSet::new();
        for metadata in bundle.functions() {
            if !incoming.insert(metadata.id().clone()) {
                return Err(FunctionCatalogError::AlreadyRegistered(
                    metadata.id().to_string(),
                ));
            }
        }

        let evicted: Vec<FunctionId> = match policy {
            RegistrationPolicy::AppendOnly => Vec::new(),
            RegistrationPolicy::Replace => self
                .functions_by_id
                .keys()
                .filter(|id| incoming.contains(*id))
                .cloned()
                .collect(),
        };

        let mut bundles_by_id = self.bundles_by_id.clone();
        let mut functions_by_id = self.functions_by_id.clone();
        let mut functions_by_lowercase_name = self.functions_by_lowercase_name.clone();

        // Superseded entries leave all three maps before the incoming ones
        // land, so a replaced overload does not linger under its old name.
        for id in &evicted {
            bundles_by_id.remove(id);
            functions_by_id.remove(id);
        }
        if !evicted.is_empty() {
            for overloads in functions_by_lowercase_name.values_mut() {
                overloads.retain(|m| !incoming.contains(m.id()));
            }
            functions_by_lowercase_name.retain(|_, overloads| !overloads.is_empty());
        }

        for metadata in bundle.functions() {
            bundles_by_id.insert(metadata.id().clone(), Arc::clone(&bundle));
            functions_by_id.insert(metadata.id().clone(), metadata.clone());
            functions_by_lowercase_name
                .entry(metadata.signature().name().to_lowercase())
                .or_default()
                .push(metadata.clone());
        }

        let map = FunctionMap {
            bundles_by_id,
            functions_by_id,
            functions_by_lowercase_name,
        };
        map.verify()?;
        Ok((map, evicted))
    }

    /// All functions with the same name must be aggregations, or none of
    /// them may be.
    fn verify(&self) -> Result<(), FunctionCatalogError> {
        for (name, overloads) in &self.functions_by_lowercase_name {
            let aggregations = overloads
                .iter()
                .filter(|m| m.kind() == FunctionKind::Aggregate)
                .count();
            if aggregations != 0 && aggregations != overloads.len() {
                return Err(FunctionCatalogError::MixedAggregateAndScalar(name.clone()));
            }
        }
        Ok(())
    }

    fn check_function_exists(
        &self,
        metadata: &FunctionMetadata,
    ) -> Result<(), FunctionCatalogError> {
        if self.functions_by_id.contains_key(metadata.id()) {
            return Err(FunctionCatalogError::AlreadyRegistered(
                metadata.id().to_string(),
            ));
        }
        for existing in self.functions_by_id.values() {
            if existing.signature() == metadata.signature() {
                return Err(FunctionCatalogError::AlreadyRegistered(
                    metadata.signature().to_string(),
                ));
            }
        }
        Ok(())
    }

    fn list(&self) -> Vec<FunctionMetadata> {
        self.functions_by_lowercase_name
            .values()
            .flatten()
            .cloned()
            .collect()
    }

    fn get_by_name(&self, name: &str) -> Vec<FunctionMetadata> {
        self.functions_by_lowercase_name
            .get(&name.to_lowercase())
            .cloned()
            .unwrap_or_default()
    }

    fn metadata(&self, id: &FunctionId) -> Result<FunctionMetadata, FunctionCatalogError> {
        self.functions_by_id
            .get(id)
            .cloned()
            .ok_or_else(|| FunctionCatalogError::UnknownFunction(id.clone()))
    }

    fn bundle(&self, id: &FunctionId) -> Result<Arc<dyn FunctionBundle>, FunctionCatalogError> {
        self.bundles_by_id
            .get(id)
            .map(Arc::clone)
            .ok_or_else(|| FunctionCatalogError::UnknownFunction(id.clone()))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::bundle::SimpleFunctionBundle;
    use crate::metadata::{Datum, Signature, TypeSignature};
    use crate::operators::OperatorKind;

    fn scalar_metadata(name: &str) -> FunctionMetadata {
        FunctionMetadata::new(
            Signature::builder()
                .name(name)
                .return_type(TypeSignature::bigint())
                .argument_type(TypeSignature::bigint())
                .argument_type(TypeSignature::bigint())
                .build(),
            FunctionKind::Scalar,
        )
    }

    fn aggregate_metadata(name: &str) -> FunctionMetadata {
        FunctionMetadata::new(
            Signature::builder()
                .name(name)
                .return_type(TypeSignature::bigint())
                .argument_type(TypeSignature::bigint())
                .build(),
            FunctionKind::Aggregate,
        )
    }

    fn bundle_of(functions: Vec<FunctionMetadata>) -> Arc<dyn FunctionBundle> {
        let mut bundle = SimpleFunctionBundle::new();
        for metadata in functions {
            let implementation: crate::metadata::ScalarFunctionImplementation =
                Arc::new(|args: &[Datum]| -> Result<Datum, anyhow::Error> {
                    match args {
                        [Datum::Int64(a), Datum::Int64(b)] => Ok(Datum::Int64(a + b)),
                        _ => Ok(Datum::Null),
                    }
                });
            bundle = bundle.with_scalar(metadata, implementation);
        }
        Arc::new(bundle)
    }

    #[test]
    fn registered_functions_are_listed_and_resolvable() {
        let catalog = GlobalFunctionCatalog::with_policy(RegistrationPolicy::AppendOnly);
        let add = scalar_metadata("custom_add");
        let mul = scalar_metadata("custom_mul");
        catalog
            .add_functions(bundle_of(vec![add.clone(), mul.clone()]))
            .unwrap();

        let mut listed = catalog.list_functions();
        listed.sort_by(|a, b| a.id().cmp(b.id()));
        assert_eq!(listed.len(), 2);
        assert_eq!(catalog.get_function_metadata(add.id()).unwrap(), add);
        assert_eq!(catalog.get_function_metadata(mul.id()).unwrap(), mul);
        catalog.get_function_bundle(add.id()).unwrap();
    }

    #[test]
    fn lookup_by_name_is_case_insensitive() {
        let catalog = GlobalFunctionCatalog::with_policy(RegistrationPolicy::AppendOnly);
        catalog
            .add_functions(bundle_of(vec![scalar_metadata("Custom_Add")]))
            .unwrap();
        assert_eq!(catalog.lookup_by_name("CUSTOM_ADD").len(), 1);
        assert_eq!(catalog.lookup_by_name("custom_add").len(), 1);
        assert!(catalog.lookup_by_name("other").is_empty());
    }

    #[test]
    fn unknown_id_is_a_not_found_error() {
        let catalog = GlobalFunctionCatalog::with_policy(RegistrationPolicy::AppendOnly);
        let id = FunctionId::new("nope");
        assert!(matches!(
            catalog.get_function_metadata(&id),
            Err(FunctionCatalogError::UnknownFunction(_))
        ));
        assert!(matches!(
            catalog.get_function_bundle(&id),
            Err(FunctionCatalogError::UnknownFunction(_))
        ));
    }

    #[test]
    fn separator_characters_in_names_are_rejected() {
        let catalog = GlobalFunctionCatalog::with_policy(RegistrationPolicy::AppendOnly);
        for name in ["bad|name", "bad@name"] {
            assert!(matches!(
                catalog.add_functions(bundle_of(vec![scalar_metadata(name)])),
                Err(FunctionCatalogError::InvalidFunctionName { .. })
            ));
        }
        assert!(catalog.list_functions().is_empty());
    }

    #[test]
    fn mixed_aggregate_and_scalar_names_are_rejected_atomically() {
        let catalog = GlobalFunctionCatalog::with_policy(RegistrationPolicy::AppendOnly);
        catalog
            .add_functions(bundle_of(vec![scalar_metadata("tally")]))
            .unwrap();
        let before = catalog.list_functions().len();

        let mut bundle = SimpleFunctionBundle::new();
        bundle = bundle.with_metadata(aggregate_metadata("tally"));
        assert!(matches!(
            catalog.add_functions(Arc::new(bundle)),
            Err(FunctionCatalogError::MixedAggregateAndScalar(name)) if name == "tally"
        ));
        assert_eq!(catalog.list_functions().len(), before);
    }

    #[test]
    fn append_only_rejects_duplicate_ids_and_signatures() {
        let catalog = GlobalFunctionCatalog::with_policy(RegistrationPolicy::AppendOnly);
        let add = scalar_metadata("custom_add");
        catalog.add_functions(bundle_of(vec![add.clone()])).unwrap();
        assert!(matches!(
            catalog.add_functions(bundle_of(vec![add])),
            Err(FunctionCatalogError::AlreadyRegistered(_))
        ));
        assert_eq!(catalog.list_functions().len(), 1);
    }

    #[test]
    fn replace_supersedes_and_notifies_once_per_id() {
        let catalog = Arc::new(GlobalFunctionCatalog::with_policy(
            RegistrationPolicy::Replace,
        ));
        let evicted = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&evicted);
        catalog.set_eviction_listener(Box::new(move |id| {
            sink.lock().unwrap().push(id.clone());
        }));

        let v1 = scalar_metadata("add").with_id(FunctionId::new("f1"));
        catalog.add_functions(bundle_of(vec![v1])).unwrap();
        assert!(evicted.lock().unwrap().is_empty());

        let v2 = scalar_metadata("add_v2").with_id(FunctionId::new("f1"));
        catalog.add_functions(bundle_of(vec![v2.clone()])).unwrap();

        let listed = catalog.list_functions();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].signature().name(), "add_v2");
        assert_eq!(listed[0].id(), &FunctionId::new("f1"));
        assert!(catalog.lookup_by_name("add").is_empty());
        assert_eq!(catalog.lookup_by_name("add_v2").len(), 1);
        assert_eq!(*evicted.lock().unwrap(), vec![FunctionId::new("f1")]);
        assert_eq!(
            catalog.get_function_metadata(&FunctionId::new("f1")).unwrap(),
            v2
        );
    }

    #[test]
    fn duplicate_ids_within_one_bundle_are_rejected() {
        let catalog = GlobalFunctionCatalog::with_policy(RegistrationPolicy::Replace);
        let a = scalar_metadata("add").with_id(FunctionId::new("dup"));
        let b = scalar_metadata("sub").with_id(FunctionId::new("dup"));
        assert!(matches!(
            catalog.add_functions(bundle_of(vec![a, b])),
            Err(FunctionCatalogError::AlreadyRegistered(_))
        ));
        assert!(catalog.list_functions().is_empty());
    }

    #[test]
    fn operator_registrations_are_canonicalized() {
        let catalog = GlobalFunctionCatalog::with_policy(RegistrationPolicy::AppendOnly);
        let specialized = FunctionMetadata::new(
            Signature::builder()
                .name(OperatorKind::HashCode.mangled_name())
                .return_type(TypeSignature::bigint())
                .argument_type(TypeSignature::varchar())
                .build(),
            FunctionKind::Scalar,
        );
        assert!(matches!(
            catalog.add_functions(bundle_of(vec![specialized])),
            Err(FunctionCatalogError::InvalidOperatorSignature { .. })
        ));

        let canonical = FunctionMetadata::new(
            Signature::builder()
                .name(OperatorKind::HashCode.mangled_name())
                .comparable_type_variable("T")
                .return_type(TypeSignature::bigint())
                .argument_type(TypeSignature::new("T"))
                .build(),
            FunctionKind::Scalar,
        );
        catalog.add_functions(bundle_of(vec![canonical])).unwrap();
    }

    #[test]
    fn readers_keep_their_snapshot_across_a_replacement() {
        let catalog = GlobalFunctionCatalog::with_policy(RegistrationPolicy::Replace);
        let v1 = scalar_metadata("add").with_id(FunctionId::new("f1"));
        catalog.add_functions(bundle_of(vec![v1.clone()])).unwrap();

        let before = catalog.snapshot.load_full();
        let v2 = scalar_metadata("add_v2").with_id(FunctionId::new("f1"));
        catalog.add_functions(bundle_of(vec![v2])).unwrap();

        // The captured snapshot still resolves the old declaration.
        assert_eq!(before.metadata(&FunctionId::new("f1")).unwrap(), v1);
        assert_eq!(
            catalog
                .get_function_metadata(&FunctionId::new("f1"))
                .unwrap()
                .signature()
                .name(),
            "add_v2"
        );
    }
}

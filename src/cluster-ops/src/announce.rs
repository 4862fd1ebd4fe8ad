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

use anyhow::anyhow;
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// The announcement property other nodes read to learn which catalogs this
/// node serves.
pub const CATALOG_IDS_PROPERTY: &str = "catalog_ids";

/// One service-discovery announcement: a service kind plus its advertised
/// properties.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceAnnouncement {
    kind: String,
    properties: BTreeMap<String, String>,
}

impl ServiceAnnouncement {
    pub fn new(kind: impl Into<String>) -> ServiceAnnouncement {
        ServiceAnnouncement {
            kind: kind.into(),
            properties: BTreeMap::new(),
        }
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn property(&self, name: &str) -> Option<&str> {
        self.properties.get(name).map(String::as_str)
    }

    pub fn set_property(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.properties.insert(name.into(), value.into());
    }

    pub fn properties(&self) -> &BTreeMap<String, String> {
        &self.properties
    }
}

/// The service-discovery boundary: whatever mechanism publishes this node's
/// announcements to the rest of the cluster.
pub trait Announcer: fmt::Debug + Send + Sync {
    /// The currently published announcement of the given kind, if any.
    fn current(&self, kind: &str) -> Option<ServiceAnnouncement>;

    /// Replaces the published announcement of `announcement.kind()`.
    fn update(&self, announcement: ServiceAnnouncement);
}

/// Republishes the `kind` announcement with its catalog-id property rebuilt
/// from `catalog_ids`.
///
/// The ids are deduplicated and sorted so the advertised value is stable
/// across nodes regardless of the order catalogs were created in.
pub fn refresh_catalog_ids<I, S>(
    announcer: &dyn Announcer,
    kind: &str,
    catalog_ids: I,
) -> Result<(), anyhow::Error>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let mut announcement = announcer
        .current(kind)
        .ok_or_else(|| anyhow!("no '{kind}' announcement found"))?;
    let ids = catalog_ids
        .into_iter()
        .map(Into::into)
        .sorted()
        .dedup()
        .join(",");
    debug!(kind, catalog_ids = %ids, "refreshing catalog id announcement");
    announcement.set_property(CATALOG_IDS_PROPERTY, ids);
    announcer.update(announcement);
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    #[derive(Debug, Default)]
    struct MemoryAnnouncer {
        announcements: Mutex<BTreeMap<String, ServiceAnnouncement>>,
    }

    impl Announcer for MemoryAnnouncer {
        fn current(&self, kind: &str) -> Option<ServiceAnnouncement> {
            self.announcements.lock().unwrap().get(kind).cloned()
        }

        fn update(&self, announcement: ServiceAnnouncement) {
            self.announcements
                .lock()
                .unwrap()
                .insert(announcement.kind().to_string(), announcement);
        }
    }

    #[test]
    fn rebuilds_the_catalog_id_property_sorted_and_deduplicated() {
        let announcer = MemoryAnnouncer::default();
        let mut announcement = ServiceAnnouncement::new("skiff");
        announcement.set_property("http", "http://node-0:8080");
        announcer.update(announcement);

        refresh_catalog_ids(&announcer, "skiff", ["c2", "c1", "c2", "c3"]).unwrap();

        let published = announcer.current("skiff").unwrap();
        assert_eq!(published.property(CATALOG_IDS_PROPERTY), Some("c1,c2,c3"));
        // Unrelated properties survive the refresh.
        assert_eq!(published.property("http"), Some("http://node-0:8080"));
    }

    #[test]
    fn refreshing_an_unpublished_kind_is_an_error() {
        let announcer = MemoryAnnouncer::default();
        assert!(refresh_catalog_ids(&announcer, "skiff", ["c1"]).is_err());
    }
}

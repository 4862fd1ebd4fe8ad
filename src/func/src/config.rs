// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use serde::{Deserialize, Serialize};

use crate::catalog::RegistrationPolicy;

/// Configuration for the global function catalog.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FunctionCatalogConfig {
    /// Whether function registrations may replace previously registered
    /// functions that share a function id. Off by default: a statically
    /// assembled catalog treats any collision as a deployment error.
    #[serde(default)]
    pub dynamic_function_loading: bool,
}

impl FunctionCatalogConfig {
    pub fn registration_policy(&self) -> RegistrationPolicy {
        if self.dynamic_function_loading {
            RegistrationPolicy::Replace
        } else {
            RegistrationPolicy::AppendOnly
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dynamic_loading_selects_the_replace_policy() {
        let config = FunctionCatalogConfig::default();
        assert_eq!(config.registration_policy(), RegistrationPolicy::AppendOnly);
        let config = FunctionCatalogConfig {
            dynamic_function_loading: true,
        };
        assert_eq!(config.registration_policy(), RegistrationPolicy::Replace);
    }
}

// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Operator function names and their canonical signatures.
//!
//! Operator functions (equality, hashing, ordering, arithmetic) are invoked
//! by the engine through mangled names of the form `$operator$<kind>`. The
//! comparison, hashing, and ordering kinds are handled generically by the
//! engine, so only their exact canonical signature may be registered; since a
//! given signature can be registered once, that blocks any custom
//! implementation from shadowing them.

use crate::error::FunctionCatalogError;
use crate::metadata::{Signature, TypeSignature};

const OPERATOR_PREFIX: &str = "$operator$";

/// The operator kinds a function name can mangle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum OperatorKind {
    Equal,
    IsDistinctFrom,
    Indeterminate,
    HashCode,
    XxHash64,
    ComparisonUnorderedFirst,
    ComparisonUnorderedLast,
    LessThan,
    LessThanOrEqual,
    Add,
    Subtract,
    Multiply,
    Divide,
    Negate,
    Cast,
}

impl OperatorKind {
    const ALL: &'static [OperatorKind] = &[
        OperatorKind::Equal,
        OperatorKind::IsDistinctFrom,
        OperatorKind::Indeterminate,
        OperatorKind::HashCode,
        OperatorKind::XxHash64,
        OperatorKind::ComparisonUnorderedFirst,
        OperatorKind::ComparisonUnorderedLast,
        OperatorKind::LessThan,
        OperatorKind::LessThanOrEqual,
        OperatorKind::Add,
        OperatorKind::Subtract,
        OperatorKind::Multiply,
        OperatorKind::Divide,
        OperatorKind::Negate,
        OperatorKind::Cast,
    ];

    fn token(&self) -> &'static str {
        match self {
            OperatorKind::Equal => "equal",
            OperatorKind::IsDistinctFrom => "is_distinct_from",
            OperatorKind::Indeterminate => "indeterminate",
            OperatorKind::HashCode => "hash_code",
            OperatorKind::XxHash64 => "xx_hash_64",
            OperatorKind::ComparisonUnorderedFirst => "comparison_unordered_first",
            OperatorKind::ComparisonUnorderedLast => "comparison_unordered_last",
            OperatorKind::LessThan => "less_than",
            OperatorKind::LessThanOrEqual => "less_than_or_equal",
            OperatorKind::Add => "add",
            OperatorKind::Subtract => "subtract",
            OperatorKind::Multiply => "multiply",
            OperatorKind::Divide => "divide",
            OperatorKind::Negate => "negate",
            OperatorKind::Cast => "cast",
        }
    }

    /// The mangled function name for this operator kind.
    pub fn mangled_name(&self) -> String {
        format!("{OPERATOR_PREFIX}{}", self.token())
    }

    /// How many arguments the operator takes.
    pub fn argument_count(&self) -> usize {
        match self {
            OperatorKind::Equal
            | OperatorKind::IsDistinctFrom
            | OperatorKind::ComparisonUnorderedFirst
            | OperatorKind::ComparisonUnorderedLast
            | OperatorKind::LessThan
            | OperatorKind::LessThanOrEqual
            | OperatorKind::Add
            | OperatorKind::Subtract
            | OperatorKind::Multiply
            | OperatorKind::Divide => 2,
            OperatorKind::Indeterminate
            | OperatorKind::HashCode
            | OperatorKind::XxHash64
            | OperatorKind::Negate
            | OperatorKind::Cast => 1,
        }
    }
}

/// Whether `name` is a mangled operator name.
pub fn is_operator_name(name: &str) -> bool {
    name.starts_with(OPERATOR_PREFIX)
}

/// Recovers the operator kind from a mangled name.
pub fn unmangle_operator(name: &str) -> Result<OperatorKind, FunctionCatalogError> {
    let token = name
        .strip_prefix(OPERATOR_PREFIX)
        .ok_or_else(|| FunctionCatalogError::UnknownOperator(name.to_string()))?;
    OperatorKind::ALL
        .iter()
        .copied()
        .find(|kind| kind.token() == token)
        .ok_or_else(|| FunctionCatalogError::UnknownOperator(name.to_string()))
}

/// Rejects registrations that would shadow an engine-generic type operator.
///
/// Returns `Ok` for non-operator names and for operator kinds the engine does
/// not handle generically.
pub(crate) fn check_not_specialized_type_operator(
    signature: &Signature,
) -> Result<(), FunctionCatalogError> {
    if !is_operator_name(signature.name()) {
        return Ok(());
    }
    let operator = unmangle_operator(signature.name())?;

    let generic = TypeSignature::new("T");
    let expected = Signature::builder()
        .name(signature.name())
        .argument_types(vec![generic; operator.argument_count()]);
    let expected = match operator {
        OperatorKind::Equal | OperatorKind::IsDistinctFrom | OperatorKind::Indeterminate => {
            expected
                .return_type(TypeSignature::boolean())
                .comparable_type_variable("T")
        }
        OperatorKind::HashCode | OperatorKind::XxHash64 => expected
            .return_type(TypeSignature::bigint())
            .comparable_type_variable("T"),
        OperatorKind::ComparisonUnorderedFirst | OperatorKind::ComparisonUnorderedLast => expected
            .return_type(TypeSignature::integer())
            .orderable_type_variable("T"),
        OperatorKind::LessThan | OperatorKind::LessThanOrEqual => expected
            .return_type(TypeSignature::boolean())
            .orderable_type_variable("T"),
        _ => return Ok(()),
    };

    let expected = expected.build();
    if *signature != expected {
        return Err(FunctionCatalogError::InvalidOperatorSignature {
            operator,
            signature: signature.to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn canonical_equal() -> Signature {
        Signature::builder()
            .name(OperatorKind::Equal.mangled_name())
            .comparable_type_variable("T")
            .return_type(TypeSignature::boolean())
            .argument_type(TypeSignature::new("T"))
            .argument_type(TypeSignature::new("T"))
            .build()
    }

    #[test]
    fn mangling_round_trips() {
        for kind in OperatorKind::ALL {
            assert!(is_operator_name(&kind.mangled_name()));
            assert_eq!(unmangle_operator(&kind.mangled_name()).unwrap(), *kind);
        }
        assert!(!is_operator_name("custom_add"));
        assert!(unmangle_operator("$operator$frobnicate").is_err());
    }

    #[test]
    fn canonical_operator_signature_is_accepted() {
        check_not_specialized_type_operator(&canonical_equal()).unwrap();
    }

    #[test]
    fn specialized_operator_signature_is_rejected() {
        // A bigint-specific equality must not shadow the generic one.
        let signature = Signature::builder()
            .name(OperatorKind::Equal.mangled_name())
            .return_type(TypeSignature::boolean())
            .argument_type(TypeSignature::bigint())
            .argument_type(TypeSignature::bigint())
            .build();
        assert!(matches!(
            check_not_specialized_type_operator(&signature),
            Err(FunctionCatalogError::InvalidOperatorSignature { .. })
        ));
    }

    #[test]
    fn unrestricted_operator_kinds_pass_through() {
        let signature = Signature::builder()
            .name(OperatorKind::Add.mangled_name())
            .return_type(TypeSignature::bigint())
            .argument_type(TypeSignature::bigint())
            .argument_type(TypeSignature::bigint())
            .build();
        check_not_specialized_type_operator(&signature).unwrap();
    }

    #[test]
    fn non_operator_names_pass_through() {
        let signature = Signature::builder()
            .name("lower")
            .return_type(TypeSignature::varchar())
            .argument_type(TypeSignature::varchar())
            .build();
        check_not_specialized_type_operator(&signature).unwrap();
    }
}

// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! The function metadata model shared across the cluster.

use std::fmt;
use std::sync::Arc;

use itertools::Itertools;
use serde::{Deserialize, Serialize};

/// A stable identifier for one function implementation.
///
/// Ids are opaque to the catalog; by convention they are derived from the
/// function's declared signature so that re-registering the same declaration
/// produces the same id.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct FunctionId(String);

impl FunctionId {
    pub fn new(id: impl Into<String>) -> FunctionId {
        FunctionId(id.into())
    }

    /// Derives the conventional id for a declared signature.
    pub fn from_signature(signature: &Signature) -> FunctionId {
        FunctionId(signature.to_string().to_lowercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FunctionId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// What kind of callable a function is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum FunctionKind {
    Scalar,
    Aggregate,
    Window,
}

/// A possibly parameterized type name, e.g. `bigint` or `array(T)`.
///
/// A bare uppercase base with no parameters is a generic type variable.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TypeSignature {
    base: String,
    parameters: Vec<TypeSignature>,
}

impl TypeSignature {
    pub fn new(base: impl Into<String>) -> TypeSignature {
        TypeSignature {
            base: base.into(),
            parameters: Vec::new(),
        }
    }

    pub fn with_parameters(
        base: impl Into<String>,
        parameters: Vec<TypeSignature>,
    ) -> TypeSignature {
        TypeSignature {
            base: base.into(),
            parameters,
        }
    }

    pub fn boolean() -> TypeSignature {
        TypeSignature::new("boolean")
    }

    pub fn bigint() -> TypeSignature {
        TypeSignature::new("bigint")
    }

    pub fn integer() -> TypeSignature {
        TypeSignature::new("integer")
    }

    pub fn double() -> TypeSignature {
        TypeSignature::new("double")
    }

    pub fn varchar() -> TypeSignature {
        TypeSignature::new("varchar")
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    pub fn parameters(&self) -> &[TypeSignature] {
        &self.parameters
    }
}

impl fmt::Display for TypeSignature {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.base)?;
        if !self.parameters.is_empty() {
            write!(f, "({})", self.parameters.iter().join(","))?;
        }
        Ok(())
    }
}

/// The constraint a generic type variable places on the types it binds to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum TypeVariableConstraint {
    /// Any bindable type.
    Unconstrained,
    /// Types with an equality relation.
    Comparable,
    /// Types with a total order.
    Orderable,
}

/// A generic type variable declared by a signature.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TypeVariable {
    name: String,
    constraint: TypeVariableConstraint,
}

impl TypeVariable {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn constraint(&self) -> TypeVariableConstraint {
        self.constraint
    }
}

/// A function's declared signature.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Signature {
    name: String,
    type_variables: Vec<TypeVariable>,
    return_type: TypeSignature,
    argument_types: Vec<TypeSignature>,
}

impl Signature {
    pub fn builder() -> SignatureBuilder {
        SignatureBuilder::default()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn type_variables(&self) -> &[TypeVariable] {
        &self.type_variables
    }

    pub fn return_type(&self) -> &TypeSignature {
        &self.return_type
    }

    pub fn argument_types(&self) -> &[TypeSignature] {
        &self.argument_types
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{}({}):{}",
            self.name,
            self.argument_types.iter().join(","),
            self.return_type
        )
    }
}

/// Builds a [`Signature`].
#[derive(Debug, Default)]
pub struct SignatureBuilder {
    name: String,
    type_variables: Vec<TypeVariable>,
    return_type: Option<TypeSignature>,
    argument_types: Vec<TypeSignature>,
}

impl SignatureBuilder {
    pub fn name(mut self, name: impl Into<String>) -> SignatureBuilder {
        self.name = name.into();
        self
    }

    pub fn type_variable(mut self, name: impl Into<String>) -> SignatureBuilder {
        self.type_variables.push(TypeVariable {
            name: name.into(),
            constraint: TypeVariableConstraint::Unconstrained,
        });
        self
    }

    pub fn comparable_type_variable(mut self, name: impl Into<String>) -> SignatureBuilder {
        self.type_variables.push(TypeVariable {
            name: name.into(),
            constraint: TypeVariableConstraint::Comparable,
        });
        self
    }

    pub fn orderable_type_variable(mut self, name: impl Into<String>) -> SignatureBuilder {
        self.type_variables.push(TypeVariable {
            name: name.into(),
            constraint: TypeVariableConstraint::Orderable,
        });
        self
    }

    pub fn return_type(mut self, return_type: TypeSignature) -> SignatureBuilder {
        self.return_type = Some(return_type);
        self
    }

    pub fn argument_type(mut self, argument_type: TypeSignature) -> SignatureBuilder {
        self.argument_types.push(argument_type);
        self
    }

    pub fn argument_types(mut self, argument_types: Vec<TypeSignature>) -> SignatureBuilder {
        self.argument_types = argument_types;
        self
    }

    pub fn build(self) -> Signature {
        Signature {
            name: self.name,
            type_variables: self.type_variables,
            return_type: self.return_type.expect("return type is required"),
            argument_types: self.argument_types,
        }
    }
}

/// Everything the catalog knows about one registered function.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionMetadata {
    id: FunctionId,
    signature: Signature,
    kind: FunctionKind,
    deterministic: bool,
}

impl FunctionMetadata {
    /// Creates metadata with the conventional id derived from `signature`.
    pub fn new(signature: Signature, kind: FunctionKind) -> FunctionMetadata {
        FunctionMetadata {
            id: FunctionId::from_signature(&signature),
            signature,
            kind,
            deterministic: true,
        }
    }

    pub fn with_id(mut self, id: FunctionId) -> FunctionMetadata {
        self.id = id;
        self
    }

    pub fn with_deterministic(mut self, deterministic: bool) -> FunctionMetadata {
        self.deterministic = deterministic;
        self
    }

    pub fn id(&self) -> &FunctionId {
        &self.id
    }

    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    pub fn kind(&self) -> FunctionKind {
        self.kind
    }

    pub fn deterministic(&self) -> bool {
        self.deterministic
    }
}

/// A concrete (name, return type, argument types) binding at a call site.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BoundSignature {
    name: String,
    return_type: TypeSignature,
    argument_types: Vec<TypeSignature>,
}

impl BoundSignature {
    pub fn new(
        name: impl Into<String>,
        return_type: TypeSignature,
        argument_types: Vec<TypeSignature>,
    ) -> BoundSignature {
        BoundSignature {
            name: name.into(),
            return_type,
            argument_types,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn return_type(&self) -> &TypeSignature {
        &self.return_type
    }

    pub fn argument_types(&self) -> &[TypeSignature] {
        &self.argument_types
    }
}

/// How one argument is passed to a specialized implementation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ArgumentConvention {
    /// The argument is never null; null inputs short-circuit the call.
    NeverNull,
    /// The argument may be null and the implementation observes it.
    BoxedNullable,
}

/// How a specialized implementation returns its result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ReturnConvention {
    /// The implementation never returns null.
    FailOnNull,
    /// The implementation may return null.
    NullableReturn,
}

/// The calling convention a call site requires from a specialized
/// implementation.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct InvocationConvention {
    arguments: Vec<ArgumentConvention>,
    return_convention: ReturnConvention,
}

impl InvocationConvention {
    pub fn new(
        arguments: Vec<ArgumentConvention>,
        return_convention: ReturnConvention,
    ) -> InvocationConvention {
        InvocationConvention {
            arguments,
            return_convention,
        }
    }

    pub fn arguments(&self) -> &[ArgumentConvention] {
        &self.arguments
    }

    pub fn return_convention(&self) -> ReturnConvention {
        self.return_convention
    }
}

/// A runtime value passed to or returned from a scalar function.
#[derive(Debug, Clone, PartialEq)]
pub enum Datum {
    Null,
    Boolean(bool),
    Int64(i64),
    Float64(f64),
    String(String),
}

/// A specialized, directly invocable scalar implementation.
pub trait ScalarFunction: Send + Sync {
    fn invoke(&self, args: &[Datum]) -> Result<Datum, anyhow::Error>;
}

impl<F> ScalarFunction for F
where
    F: Fn(&[Datum]) -> Result<Datum, anyhow::Error> + Send + Sync,
{
    fn invoke(&self, args: &[Datum]) -> Result<Datum, anyhow::Error> {
        (self)(args)
    }
}

pub type ScalarFunctionImplementation = Arc<dyn ScalarFunction>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn function_id_derivation_is_stable_and_lowercase() {
        let signature = Signature::builder()
            .name("Custom_Add")
            .return_type(TypeSignature::bigint())
            .argument_type(TypeSignature::bigint())
            .argument_type(TypeSignature::bigint())
            .build();
        let id = FunctionId::from_signature(&signature);
        assert_eq!(id.as_str(), "custom_add(bigint,bigint):bigint");
        assert_eq!(id, FunctionId::from_signature(&signature));
    }

    #[test]
    fn parameterized_types_render_with_parameters() {
        let ty = TypeSignature::with_parameters("array", vec![TypeSignature::new("T")]);
        assert_eq!(ty.to_string(), "array(T)");
    }
}

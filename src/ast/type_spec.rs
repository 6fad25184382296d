//! Crux type specifications, as resolved by the type checker.
use std::fmt::{self, Display, Formatter};

use serde::{Deserialize, Serialize};

/// Width in bytes of every scalar value (integers, booleans and addresses).
pub const SCALAR_WIDTH: i64 = 8;

/// A Crux type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TypeSpec {
    Void,
    Int,
    Bool,
    /// The type of a location holding a value of the inner type.
    Address(Box<TypeSpec>),
    Array {
        extent: u64,
        base: Box<TypeSpec>,
    },
    Function {
        params: Vec<TypeSpec>,
        ret: Box<TypeSpec>,
    },
}
impl TypeSpec {
    pub fn address_of(inner: TypeSpec) -> Self {
        TypeSpec::Address(Box::new(inner))
    }

    pub fn array(extent: u64, base: TypeSpec) -> Self {
        TypeSpec::Array {
            extent,
            base: Box::new(base),
        }
    }

    pub fn function(params: Vec<TypeSpec>, ret: TypeSpec) -> Self {
        TypeSpec::Function {
            params,
            ret: Box::new(ret),
        }
    }

    pub fn is_void(&self) -> bool {
        matches!(self, TypeSpec::Void)
    }

    /// The return type, if this is a function type.
    pub fn return_type(&self) -> Option<&TypeSpec> {
        match self {
            TypeSpec::Function { ret, .. } => Some(ret),
            _ => None,
        }
    }

    /// The number of scalar elements needed to store a value of this type.
    pub fn element_count(&self) -> u64 {
        match self {
            TypeSpec::Array { extent, .. } => *extent,
            _ => 1,
        }
    }

    /// The type of the value stored behind a location of this type. Arrays yield their element
    /// type, addresses their pointee; scalars yield themselves.
    pub fn element_type(&self) -> &TypeSpec {
        match self {
            TypeSpec::Address(inner) => inner.element_type(),
            TypeSpec::Array { base, .. } => base,
            other => other,
        }
    }
}
impl Display for TypeSpec {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self {
            TypeSpec::Void => f.write_str("void"),
            TypeSpec::Int => f.write_str("int"),
            TypeSpec::Bool => f.write_str("bool"),
            TypeSpec::Address(inner) => write!(f, "Address({})", inner),
            TypeSpec::Array { extent, base } => write!(f, "array[{}, {}]", extent, base),
            TypeSpec::Function { params, ret } => {
                let params = params
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join(", ");
                write!(f, "func({}) -> {}", params, ret)
            }
        }
    }
}

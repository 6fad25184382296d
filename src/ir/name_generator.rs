use std::collections::HashMap;

use crate::ast::TypeSpec;

use super::{AddressVar, LocalVar, Variable};

#[derive(Debug, Clone)]
struct LocalInfo {
    ty: TypeSpec,
    name: String,
}

#[derive(Debug, Clone)]
struct AddressInfo {
    ty: TypeSpec,
    name: String,
}

/// Issues fresh temporaries for a single function. Every temporary gets a distinct identity,
/// even if it shares its type and display name with another.
#[derive(Debug, Default)]
pub struct NameGenerator {
    locals: Vec<LocalInfo>,
    addresses: Vec<AddressInfo>,
    temp_index: usize,
    seen_subscripts: HashMap<String, usize>,
}

impl NameGenerator {
    pub fn new() -> Self {
        Default::default()
    }

    /// Generates a new unnamed scalar temporary.
    pub fn next_temp(&mut self, ty: TypeSpec) -> LocalVar {
        let name = format!("$t{}", self.temp_index);
        self.temp_index += 1;
        self.push_local(ty, name)
    }

    /// Generates a scalar temporary standing for a source-level variable. If the same name was
    /// used before, the new temporary is subscripted to keep listings readable.
    pub fn next_named(&mut self, ty: TypeSpec, id: &str) -> LocalVar {
        let current_subscript = self.seen_subscripts.entry(id.to_string()).or_insert(0);
        *current_subscript += 1;
        let name = match *current_subscript {
            1 => format!("${}", id),
            n => format!("${}^{}", id, n),
        };
        self.push_local(ty, name)
    }

    /// Generates a new address temporary pointing at a value of type `ty`.
    pub fn next_address(&mut self, ty: TypeSpec) -> AddressVar {
        let name = format!("%a{}", self.addresses.len());
        self.addresses.push(AddressInfo { ty, name });
        AddressVar(self.addresses.len() - 1)
    }

    fn push_local(&mut self, ty: TypeSpec, name: String) -> LocalVar {
        self.locals.push(LocalInfo { ty, name });
        LocalVar(self.locals.len() - 1)
    }

    pub fn name_of<V: Into<Variable>>(&self, var: V) -> &str {
        match var.into() {
            Variable::Local(LocalVar(idx)) => &self.locals[idx].name,
            Variable::Address(AddressVar(idx)) => &self.addresses[idx].name,
        }
    }

    pub fn type_of<V: Into<Variable>>(&self, var: V) -> &TypeSpec {
        match var.into() {
            Variable::Local(LocalVar(idx)) => &self.locals[idx].ty,
            Variable::Address(AddressVar(idx)) => &self.addresses[idx].ty,
        }
    }

    /// Total number of temporaries issued so far.
    pub fn count(&self) -> usize {
        self.locals.len() + self.addresses.len()
    }
}

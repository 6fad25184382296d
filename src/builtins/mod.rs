//! Functions provided by the Crux runtime. They are predeclared in the global scope and linked in
//! from the runtime library, so calls to them are ordinary external calls.
use crate::ast::{typed::Symbol, TypeSpec};

#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq)]
pub enum Builtin {
    ReadInt,
    ReadChar,
    PrintBool,
    PrintInt,
    PrintChar,
    Println,
}
impl Builtin {
    pub const ALL: [Builtin; 6] = [
        Builtin::ReadInt,
        Builtin::ReadChar,
        Builtin::PrintBool,
        Builtin::PrintInt,
        Builtin::PrintChar,
        Builtin::Println,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Builtin::ReadInt => "readInt",
            Builtin::ReadChar => "readChar",
            Builtin::PrintBool => "printBool",
            Builtin::PrintInt => "printInt",
            Builtin::PrintChar => "printChar",
            Builtin::Println => "println",
        }
    }

    pub fn type_spec(&self) -> TypeSpec {
        match self {
            Builtin::ReadInt | Builtin::ReadChar => TypeSpec::function(vec![], TypeSpec::Int),
            Builtin::PrintBool => TypeSpec::function(vec![TypeSpec::Bool], TypeSpec::Void),
            Builtin::PrintInt | Builtin::PrintChar => {
                TypeSpec::function(vec![TypeSpec::Int], TypeSpec::Void)
            }
            Builtin::Println => TypeSpec::function(vec![], TypeSpec::Void),
        }
    }

    /// The symbol under which the type checker exposes this builtin. Builtins occupy the
    /// lowest symbol ids, in declaration order.
    pub fn symbol(&self) -> Symbol {
        let id = Builtin::ALL
            .iter()
            .position(|b| b == self)
            .unwrap_or_default();
        Symbol::new(id, self.name(), self.type_spec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_symbols_are_indexed_by_id() {
        for builtin in Builtin::ALL {
            assert_eq!(Some(&builtin), Builtin::ALL.get(builtin.symbol().id.0));
        }
    }

    #[test]
    fn builtin_symbols_have_distinct_ids() {
        let ids: Vec<_> = Builtin::ALL.iter().map(|b| b.symbol().id).collect();
        for (idx, id) in ids.iter().enumerate() {
            assert!(!ids[idx + 1..].contains(id));
        }
    }

    #[test]
    fn read_int_returns_int() {
        assert_eq!(
            Some(&TypeSpec::Int),
            Builtin::ReadInt.type_spec().return_type()
        );
    }
}

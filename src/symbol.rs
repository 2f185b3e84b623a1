use std::collections::HashMap;

use crate::{token::Span, util::intern::Interned, value::ValueTag};

/// A declared variable or function.
#[derive(Clone, Debug, PartialEq)]
pub enum Symbol {
    Variable(Variable),
    Function(Function),
}

#[derive(Clone, Debug, PartialEq)]
pub struct Variable {
    pub name: Interned<str>,
    pub ty: ValueTag,
    /// Declaration site.
    pub span: Span,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Function {
    pub name: Interned<str>,
    pub param_types: Vec<ValueTag>,
    pub param_names: Vec<Interned<str>>,
    pub return_ty: ValueTag,
    /// Declaration site.
    pub span: Span,
}

impl Symbol {
    pub fn name(&self) -> Interned<str> {
        match self {
            Symbol::Variable(v) => v.name,
            Symbol::Function(f) => f.name,
        }
    }

    pub fn span(&self) -> Span {
        match self {
            Symbol::Variable(v) => v.span,
            Symbol::Function(f) => f.span,
        }
    }
}

/// The flat global namespace of the program.
///
/// Symbols are kept in declaration order, which is also the order in which
/// global storage is laid out.
pub struct SymbolTable {
    symbols: Vec<Symbol>,
    index: HashMap<Interned<str>, usize>,
}

impl SymbolTable {
    pub fn with_capacity(capacity: usize) -> SymbolTable {
        SymbolTable {
            symbols: Vec::with_capacity(capacity),
            index: HashMap::with_capacity(capacity),
        }
    }

    /// Declares a global variable.
    ///
    /// Fails with the span of the previous definition if the name is already
    /// taken.
    pub fn add_variable(
        &mut self,
        name: Interned<str>,
        ty: ValueTag,
        span: Span,
    ) -> Result<(), Span> {
        self.insert(Symbol::Variable(Variable { name, ty, span }))
    }

    /// Declares a function.
    ///
    /// Fails with the span of the previous definition if the name is already
    /// taken.
    pub fn add_function(
        &mut self,
        name: Interned<str>,
        param_types: Vec<ValueTag>,
        param_names: Vec<Interned<str>>,
        return_ty: ValueTag,
        span: Span,
    ) -> Result<(), Span> {
        debug_assert_eq!(param_types.len(), param_names.len());
        self.insert(Symbol::Function(Function {
            name,
            param_types,
            param_names,
            return_ty,
            span,
        }))
    }

    pub fn lookup(&self, name: Interned<str>) -> Option<&Symbol> {
        self.index.get(&name).map(|&i| &self.symbols[i])
    }

    pub fn exists(&self, name: Interned<str>) -> bool {
        self.index.contains_key(&name)
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    /// Iterates over all global variables, in declaration order.
    pub fn variables(&self) -> impl Iterator<Item = &Variable> {
        self.symbols.iter().filter_map(|symbol| match symbol {
            Symbol::Variable(v) => Some(v),
            Symbol::Function(_) => None,
        })
    }

    fn insert(&mut self, symbol: Symbol) -> Result<(), Span> {
        if let Some(other) = self.lookup(symbol.name()) {
            return Err(other.span());
        }
        self.index.insert(symbol.name(), self.symbols.len());
        self.symbols.push(symbol);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::util::intern::Interner;

    use super::*;

    #[test]
    fn add_and_lookup() {
        let i = &mut Interner::with_capacity(4);
        let mut table = SymbolTable::with_capacity(4);

        let x = i.intern("x");
        let f = i.intern("f");
        let a = i.intern("a");
        let missing = i.intern("missing");

        table.add_variable(x, ValueTag::Int, span(0)).unwrap();
        table
            .add_function(f, vec![ValueTag::Bool], vec![a], ValueTag::Int, span(10))
            .unwrap();

        assert!(table.exists(x));
        assert!(table.exists(f));
        assert!(!table.exists(missing));
        assert!(table.lookup(missing).is_none());

        let Some(Symbol::Function(func)) = table.lookup(f) else {
            panic!("expected function");
        };
        assert_eq!(func.param_types, [ValueTag::Bool]);
        assert_eq!(func.param_names, [a]);
        assert_eq!(func.return_ty, ValueTag::Int);
    }

    #[test]
    fn redefinition_reports_previous_span() {
        let i = &mut Interner::with_capacity(4);
        let mut table = SymbolTable::with_capacity(4);
        let x = i.intern("x");

        table.add_variable(x, ValueTag::Int, span(3)).unwrap();
        let err = table
            .add_function(x, vec![], vec![], ValueTag::Int, span(20))
            .unwrap_err();
        assert_eq!(err, span(3));
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn variables_keep_declaration_order() {
        let i = &mut Interner::with_capacity(4);
        let mut table = SymbolTable::with_capacity(4);
        let names = ["zeta", "main", "alpha", "mid"].map(|n| i.intern(n));

        table.add_variable(names[0], ValueTag::Int, span(0)).unwrap();
        table
            .add_function(names[1], vec![], vec![], ValueTag::Int, span(1))
            .unwrap();
        table.add_variable(names[2], ValueTag::Bool, span(2)).unwrap();
        table.add_variable(names[3], ValueTag::String, span(3)).unwrap();

        let vars: Vec<_> = table.variables().map(|v| i.get(v.name)).collect();
        assert_eq!(vars, ["zeta", "alpha", "mid"]);
    }

    fn span(lo: u32) -> Span {
        Span::new_of_length(lo, 1)
    }
}

#![forbid(unsafe_code)]

use std::collections::{BTreeMap, HashMap};

use quivela_ast::{AxiomDecl, FuncDecl, NewExpr};

use crate::obligation::Equiv;

/// Declared functions in declaration order. Redeclaring a name replaces the
/// earlier declaration in place.
#[derive(Clone, Debug, Default)]
pub struct Functions {
    decls: Vec<FuncDecl>,
    index: HashMap<String, usize>,
}

impl Functions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, decl: FuncDecl) {
        match self.index.get(&decl.name.node) {
            Some(&i) => self.decls[i] = decl,
            None => {
                self.index.insert(decl.name.node.clone(), self.decls.len());
                self.decls.push(decl);
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&FuncDecl> {
        self.index.get(name).map(|&i| &self.decls[i])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &FuncDecl> {
        self.decls.iter()
    }

    pub fn len(&self) -> usize {
        self.decls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.decls.is_empty()
    }
}

/// Everything declared so far in a check run.
#[derive(Debug, Default)]
pub struct Context {
    pub functions: Functions,
    pub axioms: Vec<AxiomDecl>,
    /// Named object templates, keyed by class name.
    pub classes: BTreeMap<String, NewExpr>,
    /// Proven and assumed facts.
    pub theorems: HashMap<String, Equiv>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use quivela_ast::ident;

    fn decl(name: &str, arity: usize) -> FuncDecl {
        FuncDecl {
            span: quivela_ast::synthetic(),
            name: ident(name),
            pure: false,
            is_static: false,
            params: (0..arity)
                .map(|i| quivela_ast::FormalParam::untyped(format!("x{i}")))
                .collect(),
            ret: None,
            body: None,
        }
    }

    #[test]
    fn redeclaration_keeps_position() {
        let mut fs = Functions::new();
        fs.insert(decl("f", 1));
        fs.insert(decl("g", 0));
        fs.insert(decl("f", 2));
        let names: Vec<_> = fs.iter().map(|f| f.name.node.as_str()).collect();
        assert_eq!(names, ["f", "g"]);
        assert_eq!(fs.get("f").map(|f| f.params.len()), Some(2));
        assert!(!fs.contains("h"));
    }
}

#![forbid(unsafe_code)]

use std::collections::HashSet;

use quivela_ast::Type;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FrameKind {
    /// Symbols that can never be reassigned.
    Constant,
    Mutable,
    /// Variables bound by a fact or theorem.
    Logical,
}

#[derive(Clone, Debug)]
struct Frame {
    kind: FrameKind,
    symbols: Vec<(String, Type)>,
}

impl Frame {
    fn get(&self, name: &str) -> Option<Type> {
        self.symbols
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, ty)| *ty)
    }
}

/// Lexically scoped name and type resolution.
#[derive(Clone, Debug, Default)]
pub struct SymbolTable {
    frames: Vec<Frame>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_frame(&mut self, kind: FrameKind) {
        self.frames.push(Frame {
            kind,
            symbols: Vec::new(),
        });
    }

    /// Pops the innermost frame, returning the names it declared.
    pub fn pop_frame(&mut self) -> Vec<String> {
        self.frames
            .pop()
            .map(|f| f.symbols.into_iter().map(|(n, _)| n).collect())
            .unwrap_or_default()
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    pub fn truncate(&mut self, depth: usize) {
        self.frames.truncate(depth);
    }

    /// Declares `name` in the innermost frame, replacing an earlier type.
    pub fn add_symbol(&mut self, name: &str, ty: Type) {
        let Some(frame) = self.frames.last_mut() else {
            return;
        };
        match frame.symbols.iter_mut().find(|(n, _)| n == name) {
            Some(entry) => entry.1 = ty,
            None => frame.symbols.push((name.to_string(), ty)),
        }
    }

    pub fn get_type(&self, name: &str) -> Option<Type> {
        self.frames.iter().rev().find_map(|f| f.get(name))
    }

    pub fn declaration_allowed(&self, name: &str) -> bool {
        self.frames
            .last()
            .is_none_or(|f| f.get(name).is_none())
    }

    pub fn reference_allowed(&self, name: &str) -> bool {
        self.get_type(name).is_some()
    }

    pub fn symbol_modifiable(&self, name: &str) -> bool {
        self.frames
            .iter()
            .rev()
            .find(|f| f.get(name).is_some())
            .is_some_and(|f| f.kind != FrameKind::Constant)
    }

    /// Every visible symbol with its resolved type, outermost frame first and
    /// in declaration order. Shadowed names appear once.
    pub fn all_symbols(&self) -> Vec<(String, Type)> {
        let mut seen = HashSet::new();
        let mut out = Vec::new();
        for frame in &self.frames {
            for (name, _) in &frame.symbols {
                if seen.insert(name.as_str()) {
                    if let Some(ty) = self.get_type(name) {
                        out.push((name.clone(), ty));
                    }
                }
            }
        }
        out
    }

    pub fn names(&self) -> HashSet<String> {
        self.frames
            .iter()
            .flat_map(|f| f.symbols.iter().map(|(n, _)| n.clone()))
            .collect()
    }
}

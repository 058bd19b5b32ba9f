#![forbid(unsafe_code)]

//! Per-program name tables. Every table interns on first use and answers
//! the same name afterwards; conflicting registrations are internal errors.

use std::collections::{HashMap, HashSet};

use quivela_ast::{Expr, ExprKind, NewExpr};
use quivela_core::CheckError;
use quivela_parse::format_expr;

use crate::writer::BoogieWriter;

pub fn field_attr(field: &str) -> String {
    format!("internal.attribute.field.{field}")
}

pub fn checkpoint_id(label: &str) -> String {
    format!("internal.checkpointid.{label}")
}

/// `map[internal.attribute.field.f]` for every field.
pub fn scoped_fields<'a>(
    fields: impl IntoIterator<Item = &'a String>,
    map: &str,
) -> HashMap<String, String> {
    fields
        .into_iter()
        .map(|f| (f.clone(), format!("{map}[{}]", field_attr(f))))
        .collect()
}

/// Unique constants declared once per program.
#[derive(Debug, Default)]
pub struct Constants {
    fields: HashSet<String>,
    checkpoints: HashSet<String>,
    class_ids: HashSet<String>,
    exprs: HashMap<String, String>,
}

impl Constants {
    pub fn add_fields<'a>(
        &mut self,
        fields: impl IntoIterator<Item = &'a String>,
        out: &mut BoogieWriter,
    ) {
        for field in fields {
            if self.fields.insert(field.clone()) {
                out.line(&format!("const unique {} : Bitstring;", field_attr(field)));
            }
        }
    }

    pub fn add_checkpoint(&mut self, label: &str, out: &mut BoogieWriter) {
        if self.checkpoints.insert(label.to_string()) {
            out.line(&format!("const unique {} : CheckpointId;", checkpoint_id(label)));
        }
    }

    pub fn add_class_id(&mut self, class: &str, out: &mut BoogieWriter) {
        if self.class_ids.insert(class.to_string()) {
            out.line(&format!("const unique {class} : ClassId;"));
        }
    }

    pub fn has_class_id(&self, class: &str) -> bool {
        self.class_ids.contains(class)
    }

    /// The constant standing for the expression text `key`.
    pub fn intern_expr(&mut self, key: &str, out: &mut BoogieWriter) -> String {
        if let Some(existing) = self.exprs.get(key) {
            return existing.clone();
        }
        let taken: HashSet<&String> = self.exprs.values().collect();
        let id = (0..)
            .map(|i| format!("internal.expr{i}"))
            .find(|name| !taken.contains(name))
            .unwrap_or_default();
        out.line(&format!("const unique {id}:Expr;"));
        self.exprs.insert(key.to_string(), id.clone());
        id
    }
}

/// Class identities: one procedure family per distinct object template.
#[derive(Debug, Default)]
pub struct Classes {
    by_def: HashMap<String, String>,
    by_id: HashMap<String, String>,
}

impl Classes {
    /// The template of `new`: its text with every constructor argument erased.
    pub fn template(new: &NewExpr) -> String {
        let mut erased = new.clone();
        for param in &mut erased.params {
            param.value = Expr::int(0);
        }
        format_expr(&Expr::synthetic(ExprKind::New(erased)))
    }

    pub fn get(&self, new: &NewExpr) -> Option<&str> {
        self.by_def.get(&Self::template(new)).map(String::as_str)
    }

    pub fn insert(&mut self, new: &NewExpr, id: &str) -> Result<(), CheckError> {
        let def = Self::template(new);
        if let Some(existing) = self.by_id.get(id) {
            if *existing != def {
                return Err(CheckError::internal(format!(
                    "Redefinition of class with name: {id}"
                )));
            }
        }
        if let Some(existing) = self.by_def.get(&def) {
            if existing != id {
                return Err(CheckError::internal(format!(
                    "Renaming of class with definition: {def}"
                )));
            }
        }
        self.by_def.insert(def.clone(), id.to_string());
        self.by_id.insert(id.to_string(), def);
        Ok(())
    }

    pub fn fresh_id(&self) -> String {
        (0..)
            .map(|i| format!("internal.cls{i}"))
            .find(|id| !self.by_id.contains_key(id))
            .unwrap_or_default()
    }
}

/// Abstract dispatch procedures for invoked method names.
#[derive(Debug, Default)]
pub struct Methods {
    procs: HashMap<String, String>,
}

impl Methods {
    pub fn get(&self, method: &str) -> Option<&str> {
        self.procs.get(method).map(String::as_str)
    }

    pub fn fresh_proc(&self, method: &str) -> String {
        let taken: HashSet<&String> = self.procs.values().collect();
        (0..)
            .map(|i| format!("{method}.proc.{i}"))
            .find(|name| !taken.contains(name))
            .unwrap_or_default()
    }

    pub fn insert(&mut self, method: &str, proc_name: String) {
        self.procs.insert(method.to_string(), proc_name);
    }
}

/// Procedure-local variables in declaration order.
#[derive(Clone, Debug, Default)]
pub struct Locals {
    vars: Vec<(String, String)>,
}

impl Locals {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.vars.iter().any(|(n, _)| n == name)
    }

    pub fn declare(&mut self, name: &str, ty: &str) {
        if !self.contains(name) {
            self.vars.push((name.to_string(), ty.to_string()));
        }
    }

    /// A new `internal.tmpN` of type `ty`.
    pub fn fresh(&mut self, ty: &str) -> String {
        let name = (0..)
            .map(|i| format!("internal.tmp{i}"))
            .find(|n| !self.contains(n))
            .unwrap_or_default();
        self.vars.push((name.clone(), ty.to_string()));
        name
    }

    pub fn extend(&mut self, other: &Locals) {
        for (name, ty) in &other.vars {
            self.declare(name, ty);
        }
    }

    pub fn write_decls(&self, out: &mut BoogieWriter) {
        for (name, ty) in &self.vars {
            out.line(&format!("var {name}:{ty};"));
        }
    }

    /// Opaque locals start out as the default value.
    pub fn write_defaults(&self, out: &mut BoogieWriter) {
        for (name, ty) in &self.vars {
            if ty == "T" {
                out.line(&format!("{name} := defaultValue;"));
            }
        }
    }
}

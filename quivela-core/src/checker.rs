#![forbid(unsafe_code)]

//! Walks a development: declares its names, checks its expressions and
//! runs the proof of every theorem.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use quivela_ast::{
    span_between, ArithOp, AxiomDecl, BisimProp, Bounds, ConstDecl, Development, Expr, ExprKind,
    FactDecl, FormalParam, FuncDecl, Ident, ImportDecl, Item, MethodDef, NewExpr, NewParam, Prop,
    PropKind, RewriteTerm, Span, Subgoal, SubgoalTarget, Tactic, TacticKind, TheoremDecl, Type,
};
use quivela_parse::{format_expr, parse_development};
use tracing::{debug, info};

use crate::backend::{ProofBackend, ProofEnv};
use crate::bounds::{self, add, is_zero, mul, or_zero, sub};
use crate::context::Context;
use crate::error::{CheckError, Location, SourceFile};
use crate::inline::inline;
use crate::obligation::{Builder, Equiv, Goal, Obligation, ObligationStack};
use crate::rewrite::{Rewrite, Rewriter};
use crate::simplify::{simplify, structurally_equal};
use crate::subst::{substitute, Substitution};
use crate::symbols::{FrameKind, SymbolTable};
use crate::tree::{bounds_references, children, local_decls};
use crate::unfold::unfold;

#[derive(Clone, Debug, Default)]
pub struct CheckOptions {
    /// Directories searched for imports after the importing file's own.
    pub search_paths: Vec<PathBuf>,
}

pub struct Checker<B> {
    backend: B,
    options: CheckOptions,
    symbols: SymbolTable,
    context: Context,
    obligations: ObligationStack,
    files: Vec<SourceFile>,
    imported: HashSet<String>,
}

impl<B: ProofBackend> Checker<B> {
    pub fn new(backend: B) -> Self {
        Self::with_options(backend, CheckOptions::default())
    }

    pub fn with_options(backend: B, options: CheckOptions) -> Self {
        let mut symbols = SymbolTable::new();
        symbols.push_frame(FrameKind::Constant);
        Self {
            backend,
            options,
            symbols,
            context: Context::default(),
            obligations: ObligationStack::new(),
            files: Vec::new(),
            imported: HashSet::new(),
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn into_backend(self) -> B {
        self.backend
    }

    pub fn context(&self) -> &Context {
        &self.context
    }

    pub fn check_file(&mut self, path: &Path) -> Result<(), CheckError> {
        let text = fs::read_to_string(path)?;
        self.check_source(SourceFile::new(path, text))
    }

    pub fn check_source(&mut self, file: SourceFile) -> Result<(), CheckError> {
        info!("Checking {}...", file.name());
        let development =
            parse_development(&file.text).map_err(|e| file.locate(e.span).error(e.message))?;
        self.files.push(file);
        let result = self.check_development(&development);
        self.files.pop();
        result
    }

    fn check_development(&mut self, development: &Development) -> Result<(), CheckError> {
        for item in &development.items {
            match item {
                Item::Import(decl) => self.check_import(decl)?,
                Item::Const(decl) => self.check_const(decl)?,
                Item::Function(decl) => self.check_function(decl)?,
                Item::Axiom(decl) => self.check_axiom(decl)?,
                Item::Theorem(decl) => self.check_theorem(decl)?,
                Item::Assume(fact) => {
                    let (name, equiv) = self.check_fact(fact)?;
                    self.symbols.pop_frame();
                    self.context.theorems.insert(name, equiv);
                }
            }
        }
        Ok(())
    }

    fn at(&self, span: Span) -> Location {
        match self.files.last() {
            Some(file) => file.locate(span),
            None => Location::detached("<input>"),
        }
    }

    fn error(&self, span: Span, message: impl Into<String>) -> CheckError {
        self.at(span).error(message)
    }

    // ---------------------------------------------------------------------
    // Declarations
    // ---------------------------------------------------------------------

    fn check_import(&mut self, decl: &ImportDecl) -> Result<(), CheckError> {
        let module = decl.module_name();
        if !self.imported.insert(module.clone()) {
            return Ok(());
        }
        let mut relative: PathBuf = decl.path.iter().map(|s| s.node.as_str()).collect();
        relative.set_extension("qvl");

        let here = self
            .files
            .last()
            .and_then(|f| f.path.parent().map(Path::to_path_buf))
            .unwrap_or_default();
        let found = std::iter::once(here)
            .chain(self.options.search_paths.iter().cloned())
            .map(|dir| dir.join(&relative))
            .find(|p| p.is_file());
        let text = found
            .as_ref()
            .and_then(|p| fs::read_to_string(p).ok())
            .ok_or_else(|| {
                self.error(
                    decl.span,
                    format!("Unable to read file: {}", relative.display()),
                )
            })?;
        let path = found.unwrap_or(relative);
        debug!(module = %module, path = %path.display(), "importing");
        self.check_source(SourceFile::new(path, text))
    }

    fn check_const(&mut self, decl: &ConstDecl) -> Result<(), CheckError> {
        let name = &decl.name.node;
        if !self.symbols.declaration_allowed(name) {
            return Err(self.error(decl.name.span, format!("{name} already declared.")));
        }
        self.symbols
            .add_symbol(name, decl.ty.unwrap_or(Type::Bitstring));
        Ok(())
    }

    fn check_function(&mut self, decl: &FuncDecl) -> Result<(), CheckError> {
        if decl.pure && decl.body.is_some() {
            return Err(self.error(decl.span, "Function body is not pure."));
        }
        let default = if decl.pure { Type::Bitstring } else { Type::Opaque };
        self.symbols.push_frame(FrameKind::Mutable);
        self.declare_params(&decl.params, default)?;
        if let Some(body) = &decl.body {
            self.check_expr(body)?;
        }
        self.symbols.pop_frame();
        self.context.functions.insert(decl.clone());
        Ok(())
    }

    fn check_axiom(&mut self, decl: &AxiomDecl) -> Result<(), CheckError> {
        self.check_prop(&decl.prop)?;
        self.context.axioms.push(decl.clone());
        Ok(())
    }

    fn declare_params(&mut self, params: &[FormalParam], default: Type) -> Result<(), CheckError> {
        for p in params {
            let name = &p.name.node;
            if !self.symbols.declaration_allowed(name) {
                return Err(self.error(p.name.span, format!("{name} already declared.")));
            }
            self.symbols.add_symbol(name, p.ty.unwrap_or(default));
        }
        Ok(())
    }

    /// Declares the parameters of a fact in a new logical frame, which the
    /// caller pops once the fact is no longer needed.
    fn check_fact(&mut self, fact: &FactDecl) -> Result<(String, Equiv), CheckError> {
        self.symbols.push_frame(FrameKind::Logical);
        self.declare_params(&fact.params, Type::Opaque)?;
        let name = fact.name.node.clone();
        if self.context.theorems.contains_key(&name) {
            return Err(self.error(
                fact.name.span,
                format!("theorem identifier already declared: {name}"),
            ));
        }
        for side in [&fact.left, &fact.right] {
            self.symbols.push_frame(FrameKind::Mutable);
            self.check_expr(side)?;
            self.symbols.pop_frame();
        }
        let equiv = Equiv {
            left: fact.left.clone(),
            right: fact.right.clone(),
            vars: fact.params.iter().map(|p| p.name.node.clone()).collect(),
            distance: or_zero(fact.bound.as_ref()),
        };
        Ok((name, equiv))
    }

    /// Number of goals and builders still open. Zero between theorems.
    pub fn pending_obligations(&self) -> usize {
        self.obligations.len()
    }

    /// A failed proof leaves the obligation stack and the symbol table as
    /// they were before the theorem.
    fn check_theorem(&mut self, decl: &TheoremDecl) -> Result<(), CheckError> {
        let (pending, frames) = (self.obligations.len(), self.symbols.depth());
        let result = self.prove_theorem(decl);
        if result.is_err() {
            self.obligations.truncate(pending);
            self.symbols.truncate(frames);
        }
        result
    }

    fn prove_theorem(&mut self, decl: &TheoremDecl) -> Result<(), CheckError> {
        let (name, equiv) = self.check_fact(&decl.fact)?;
        debug!(theorem = %name, "checking proof");
        self.obligations
            .push(Obligation::Goal(Goal::new(equiv.clone())));
        self.run_proof(&decl.proof, closing(decl.span))?;
        let end = self.at(closing(decl.span));
        self.obligations.pop_goal(&end)?;
        self.obligations.ensure_empty(&end)?;
        self.symbols.pop_frame();
        self.context.theorems.insert(name, equiv);
        Ok(())
    }

    // ---------------------------------------------------------------------
    // Expressions
    // ---------------------------------------------------------------------

    fn check_expr(&mut self, expr: &Expr) -> Result<(), CheckError> {
        match &expr.kind {
            ExprKind::Lookup(id) => {
                if !self.symbols.reference_allowed(&id.node) {
                    return Err(self.error(id.span, format!("{} not declared.", id.node)));
                }
            }
            ExprKind::Assign { target, value } => {
                self.check_expr(value)?;
                let name = &target.node;
                if self.symbols.reference_allowed(name) {
                    if !self.symbols.symbol_modifiable(name) {
                        return Err(self.error(target.span, format!("{name} is constant.")));
                    }
                } else {
                    self.symbols.add_symbol(name, Type::Opaque);
                }
            }
            ExprKind::Call { name, args } => {
                for a in args {
                    self.check_expr(a)?;
                }
                if !self.context.functions.contains(&name.node) {
                    return Err(self.error(
                        name.span,
                        format!("Function not declared: {}", name.node),
                    ));
                }
            }
            ExprKind::New(new) => self.check_new(new)?,
            ExprKind::Assert(prop) | ExprKind::Admit(prop) => self.check_prop(prop)?,
            _ => {
                for child in children(expr) {
                    self.check_expr(child)?;
                }
            }
        }
        Ok(())
    }

    fn check_new(&mut self, new: &NewExpr) -> Result<(), CheckError> {
        self.symbols.push_frame(FrameKind::Mutable);
        for p in &new.params {
            self.check_new_param(p)?;
        }
        for m in &new.methods {
            self.check_method(m)?;
        }
        self.symbols.pop_frame();
        if let Some(class) = &new.class {
            self.context
                .classes
                .insert(class.node.clone(), new.clone());
        }
        Ok(())
    }

    fn check_new_param(&mut self, param: &NewParam) -> Result<(), CheckError> {
        self.symbols.push_frame(FrameKind::Mutable);
        self.declare_locals(&param.value);
        self.check_expr(&param.value)?;
        self.symbols.pop_frame();
        let name = &param.name.node;
        if !self.symbols.declaration_allowed(name) {
            return Err(self.error(param.name.span, format!("{name} already defined.")));
        }
        self.symbols.add_symbol(name, Type::Opaque);
        Ok(())
    }

    fn check_method(&mut self, method: &MethodDef) -> Result<(), CheckError> {
        self.symbols.push_frame(FrameKind::Mutable);
        self.declare_params(&method.params, Type::Bitstring)?;
        self.declare_locals(&method.body);
        self.check_expr(&method.body)?;
        self.symbols.pop_frame();
        Ok(())
    }

    fn declare_locals(&mut self, body: &Expr) {
        let locals = local_decls(body, |n| self.symbols.reference_allowed(n));
        for name in locals {
            self.symbols.add_symbol(&name, Type::Opaque);
        }
    }

    fn check_prop(&mut self, prop: &Prop) -> Result<(), CheckError> {
        match &prop.kind {
            PropKind::Quant { params, body, .. } => {
                self.symbols.push_frame(FrameKind::Constant);
                self.declare_params(params, Type::Bitstring)?;
                self.check_prop(body)?;
                self.symbols.pop_frame();
            }
            PropKind::Paren(p) | PropKind::Not(p) | PropKind::Tobits(p) | PropKind::IsBits(p) => {
                self.check_prop(p)?
            }
            PropKind::Logic { left, right, .. }
            | PropKind::Compare { left, right, .. }
            | PropKind::Arith { left, right, .. }
            | PropKind::Index {
                map: left,
                index: right,
            }
            | PropKind::Independence { left, right, .. }
            | PropKind::Frame { left, right }
            | PropKind::FrameHeap { left, right, .. } => {
                self.check_prop(left)?;
                self.check_prop(right)?;
            }
            PropKind::Update { map, index, value } => {
                self.check_prop(map)?;
                self.check_prop(index)?;
                self.check_prop(value)?;
            }
            PropKind::Call { args, .. } => {
                for a in args {
                    self.check_prop(a)?;
                }
            }
            _ => {}
        }
        Ok(())
    }

    // ---------------------------------------------------------------------
    // Proofs
    // ---------------------------------------------------------------------

    /// Runs `tactics` against the goal on top of the stack, then closes it:
    /// both sides must agree and the charged distance must fit the bound.
    fn run_proof(&mut self, tactics: &[Tactic], close: Span) -> Result<(), CheckError> {
        for tactic in tactics {
            self.apply(tactic)?;
        }
        let loc = self.at(close);
        let goal = self.obligations.goal_mut(&loc)?;
        check_equal(&goal.left, &goal.right, &loc)?;
        let (actual, required) = (goal.distance.clone(), goal.equiv.distance.clone());
        let env = ProofEnv::new(&self.symbols, &self.context, &loc);
        self.backend.bounds(&env, &actual, &required)
    }

    fn apply(&mut self, tactic: &Tactic) -> Result<(), CheckError> {
        debug!(tactic = tactic_name(&tactic.kind), "applying tactic");
        let loc = self.at(tactic.span);
        match &tactic.kind {
            TacticKind::Subgoal(subgoal) => self.subgoal(tactic.span, subgoal),
            TacticKind::Symmetry => {
                let goal = self.obligations.goal_mut(&loc)?;
                std::mem::swap(&mut goal.left, &mut goal.right);
                Ok(())
            }
            TacticKind::Admit => {
                let goal = self.obligations.goal_mut(&loc)?;
                goal.left = goal.right.clone();
                Ok(())
            }
            TacticKind::Trivial => {
                let goal = self.obligations.goal_mut(&loc)?;
                check_equal(&goal.left, &goal.right, &loc)?;
                goal.left = goal.right.clone();
                Ok(())
            }
            TacticKind::Auto => {
                self.symbols.push_frame(FrameKind::Constant);
                let goal = self.obligations.goal_mut(&loc)?;
                let env = ProofEnv::new(&self.symbols, &self.context, &loc);
                self.backend
                    .auto(&env, &goal.left, &goal.right, "Checking auto")?;
                goal.left = goal.right.clone();
                self.symbols.pop_frame();
                Ok(())
            }
            TacticKind::Bisim(props) => self.bisim(props.as_deref(), &loc),
            TacticKind::Rewrite(fact) => self.rewrite(fact, &loc),
            TacticKind::Hybrid { fact, start, end } => self.hybrid(fact, start, end, &loc),
            TacticKind::Unfold(ids) => {
                let goal = self.obligations.goal_mut(&loc)?;
                let original = goal.left.clone();
                unfold(&mut goal.left, ids, &self.context.functions, &loc)?;
                let env = ProofEnv::bare(&self.symbols, &self.context.functions, &loc);
                self.backend
                    .auto(&env, &original, &goal.left, "Checking unfold equivalence")
            }
            TacticKind::Inline(ids) => {
                let goal = self.obligations.goal_mut(&loc)?;
                inline(&mut goal.left, &self.symbols, ids, &loc)
            }
        }
    }

    fn subgoal(&mut self, span: Span, subgoal: &Subgoal) -> Result<(), CheckError> {
        let loc = self.at(span);
        let bound = or_zero(subgoal.bound.as_ref());
        let top = self.obligations.goal_mut(&loc)?;
        let builder = Builder {
            left: top.left.clone(),
            right: top.left.clone(),
            vars: top.equiv.vars.clone(),
            distance: bound.clone(),
        };
        self.obligations.push(Obligation::Builder(builder));
        match &subgoal.target {
            SubgoalTarget::Expr(target) => {
                self.check_expr(target)?;
                self.obligations.builder_mut(&loc)?.right = target.clone();
            }
            SubgoalTarget::Rewrite(terms) => self.rewrite_target(terms, &loc)?,
        }
        self.obligations.finish_builder(&loc)?;

        self.run_proof(&subgoal.proof, closing(span))?;
        let child = self.obligations.pop_goal(&loc)?;
        let parent = self.obligations.goal_mut(&loc)?;
        parent.left = child.equiv.right;
        parent.distance = add(&parent.distance, &bound);
        Ok(())
    }

    /// Builds the right side of a subgoal by editing the object on the left:
    /// replacing its constructor arguments or some of its methods.
    fn rewrite_target(&mut self, terms: &[RewriteTerm], loc: &Location) -> Result<(), CheckError> {
        let left = self.obligations.builder_mut(loc)?.left.clone();
        let Some(object) = left.unparen().as_new() else {
            return Err(loc.error(format!("Not a new expression: {}", format_expr(&left))));
        };
        self.symbols.push_frame(FrameKind::Mutable);
        for p in &object.params {
            let name = &p.name.node;
            if !self.symbols.declaration_allowed(name) {
                return Err(loc.error(format!("Already declared: {name}")));
            }
            self.symbols.add_symbol(name, Type::Opaque);
        }
        for term in terms {
            match term {
                RewriteTerm::New { params, .. } => {
                    self.symbols.pop_frame();
                    self.symbols.push_frame(FrameKind::Mutable);
                    for p in params {
                        self.check_new_param(p)?;
                    }
                    let builder = self.obligations.builder_mut(loc)?;
                    let mut new = target_object(&builder.right, loc)?;
                    new.params = params.clone();
                    builder.right = Expr::new(builder.right.span, ExprKind::New(new));
                }
                RewriteTerm::Method(method) => {
                    self.check_method(method)?;
                    let builder = self.obligations.builder_mut(loc)?;
                    let mut new = target_object(&builder.right, loc)?;
                    for existing in new
                        .methods
                        .iter_mut()
                        .filter(|m| m.name.node == method.name.node)
                    {
                        let mut replacement = method.clone();
                        fill_ellipsis(&mut replacement.body, &existing.body);
                        *existing = replacement;
                    }
                    builder.right = Expr::new(builder.right.span, ExprKind::New(new));
                }
            }
        }
        self.symbols.pop_frame();
        Ok(())
    }

    fn bisim(&mut self, props: Option<&[BisimProp]>, loc: &Location) -> Result<(), CheckError> {
        self.symbols.push_frame(FrameKind::Constant);
        let goal = self.obligations.goal_mut(loc)?;
        let left = goal.left.unparen().as_new().ok_or_else(|| {
            loc.error(format!("not a new expression: {}", format_expr(&goal.left)))
        })?;
        let right = goal.right.unparen().as_new().ok_or_else(|| {
            loc.error(format!("not a new expression: {}", format_expr(&goal.right)))
        })?;
        let env = ProofEnv::new(&self.symbols, &self.context, loc);
        self.backend.bisim(&env, left, right, props)?;
        goal.left = goal.right.clone();
        self.symbols.pop_frame();
        Ok(())
    }

    fn rewrite(&mut self, fact: &Ident, loc: &Location) -> Result<(), CheckError> {
        let equiv = self.fact(fact)?;
        let goal = self.obligations.goal_mut(loc)?;
        let rewrites = Rewriter::new(
            &equiv.left,
            &equiv.vars,
            &equiv.right,
            &equiv.distance,
            is_zero(&equiv.distance),
        )
        .rewrite(&mut goal.left)?;
        if rewrites.is_empty() {
            return Err(self.error(fact.span, "Nothing to rewrite"));
        }
        charge(goal, &rewrites);
        Ok(())
    }

    /// A hybrid argument over `fact(x): e(x) ~[d] e(x + 1)`, stepping `x`
    /// from `start` to `end` at a cost of `(end - start) * d`.
    fn hybrid(
        &mut self,
        fact: &Ident,
        start: &Bounds,
        end: &Bounds,
        loc: &Location,
    ) -> Result<(), CheckError> {
        let equiv = self.fact(fact)?;
        let [var] = equiv.vars.as_slice() else {
            return Err(loc.error("Hybrid argument facts must take a single parameter"));
        };
        let left_arg = single_argument(&equiv.left).ok_or_else(|| {
            loc.error(
                "A hybrid argument fact expressions must be a function call with a single parameter.",
            )
        })?;
        if format_expr(left_arg) != *var {
            return Err(loc.error(format!(
                "The parameter of the left hybrid fact expression must be {var}"
            )));
        }
        let right_arg = single_argument(&equiv.right).ok_or_else(|| {
            loc.error("A hybrid argument fact expressions must be a function with a single parameter.")
        })?;
        let successor = format_expr(&Expr::synthetic(ExprKind::Arith {
            left: Box::new(Expr::lookup(var.clone())),
            op: ArithOp::Add,
            right: Box::new(Expr::int(1)),
        }));
        if format_expr(right_arg) != successor {
            return Err(loc.error(format!(
                "The parameter of the right hybrid fact expression must be {successor}"
            )));
        }
        if bounds_references(&equiv.distance).contains(var) {
            return Err(loc.error(format!(
                "{var} may not appear in the distance of the hybrid fact."
            )));
        }

        let at = |b: &Bounds| -> Result<Expr, CheckError> {
            let subs = Substitution::from([(var.clone(), bounds::to_expr(b)?)]);
            let mut e = equiv.left.clone();
            substitute(&mut e, &subs);
            Ok(e)
        };
        let left = at(start)?;
        let right = at(end)?;
        let distance = mul(&sub(end, start), &equiv.distance);

        let goal = self.obligations.goal_mut(loc)?;
        let rewrites =
            Rewriter::new(&left, &equiv.vars, &right, &distance, true).rewrite(&mut goal.left)?;
        if rewrites.is_empty() {
            return Err(self.error(
                fact.span,
                format!("Found no occurences of {} to rewrite.", format_expr(&left)),
            ));
        }
        charge(goal, &rewrites);
        Ok(())
    }

    fn fact(&self, name: &Ident) -> Result<Equiv, CheckError> {
        self.context
            .theorems
            .get(&name.node)
            .cloned()
            .ok_or_else(|| self.error(name.span, format!("Undeclared symbol: {}", name.node)))
    }
}

fn check_equal(left: &Expr, right: &Expr, loc: &Location) -> Result<(), CheckError> {
    if structurally_equal(left, right) {
        return Ok(());
    }
    Err(loc.error(format!(
        "{}\n != \n{}",
        format_expr(&simplify(left.clone())),
        format_expr(&simplify(right.clone()))
    )))
}

fn charge(goal: &mut Goal, rewrites: &[Rewrite]) {
    for r in rewrites {
        goal.distance = add(&goal.distance, &r.distance);
    }
}

fn target_object(right: &Expr, loc: &Location) -> Result<NewExpr, CheckError> {
    right
        .unparen()
        .as_new()
        .cloned()
        .ok_or_else(|| loc.error(format!("Not a new expression: {}", format_expr(right))))
}

/// Replaces `...` in a new method body by the body it replaces.
fn fill_ellipsis(body: &mut Expr, previous: &Expr) {
    if matches!(body.kind, ExprKind::Ellipsis) {
        *body = previous.clone();
        return;
    }
    for child in crate::tree::children_mut(body) {
        fill_ellipsis(child, previous);
    }
}

fn single_argument(expr: &Expr) -> Option<&Expr> {
    match &expr.unparen().kind {
        ExprKind::Call { args, .. } if args.len() == 1 => args.first(),
        _ => None,
    }
}

/// The closing character of a block.
fn closing(span: Span) -> Span {
    let end = span.offset() + span.len();
    span_between(end.saturating_sub(1), end)
}

fn tactic_name(kind: &TacticKind) -> &'static str {
    match kind {
        TacticKind::Subgoal(_) => "subgoal",
        TacticKind::Symmetry => "symmetry",
        TacticKind::Admit => "admit",
        TacticKind::Trivial => "trivial",
        TacticKind::Auto => "auto",
        TacticKind::Bisim(_) => "bisim",
        TacticKind::Rewrite(_) => "rewrite",
        TacticKind::Hybrid { .. } => "hybrid",
        TacticKind::Unfold(_) => "unfold",
        TacticKind::Inline(_) => "inline",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::RecordingBackend;

    #[test]
    fn stray_obligations_fail_the_theorem() {
        let mut checker = Checker::new(RecordingBackend::new());
        checker.obligations.push(Obligation::Goal(Goal::new(Equiv {
            left: Expr::lookup("a"),
            right: Expr::lookup("a"),
            vars: vec![],
            distance: Bounds::zero(),
        })));
        let src = "const a; theorem T(): a ~ a { trivial; }";
        let err = checker
            .check_source(SourceFile::new("test.qvl", src))
            .unwrap_err();
        assert_eq!(err.message(), "Proof obligations remain.");
        assert_eq!(checker.pending_obligations(), 1);
        assert!(!checker.context().theorems.contains_key("T"));
    }
}

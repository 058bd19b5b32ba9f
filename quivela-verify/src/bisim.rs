#![forbid(unsafe_code)]

//! Bisimulation of two objects: construction establishes the invariants and
//! every pair of same-named methods preserves them while returning equal
//! results.

use std::collections::{BTreeSet, HashMap, HashSet};

use quivela_ast::{BisimProp, BisimScope, Expr, ExprKind, NewExpr};
use quivela_core::{CheckError, ProofEnv};

use crate::expr::{save_checkpoint_line, ExprConverter};
use crate::names::{checkpoint_id, field_attr, Locals};
use crate::object::ObjectShape;
use crate::program::Generator;
use crate::prop::{ObjectScope, PropConverter};
use crate::writer::BoogieWriter;

const SHARED_STATE: [&str; 10] = [
    "functionState",
    "heap1",
    "heap2",
    "heap",
    "objectMemory1",
    "objectMemory2",
    "objectMemory",
    "checkpoints",
    "checkpoints1",
    "checkpoints2",
];

pub fn bisimulation_program(
    env: &ProofEnv<'_>,
    left: &NewExpr,
    right: &NewExpr,
    props: Option<&[BisimProp]>,
) -> Result<String, CheckError> {
    let left_shape = ObjectShape::of(left);
    let right_shape = ObjectShape::of(right);
    let left_names: HashSet<&str> = left_shape.methods.iter().map(|m| m.name.as_str()).collect();
    let right_names: HashSet<&str> = right_shape.methods.iter().map(|m| m.name.as_str()).collect();
    if left_names != right_names {
        return Err(env
            .location
            .error("Objects in bisimulation must have identical method signatures."));
    }

    let mut generator = Generator::new(env);
    generator.write_header()?;
    generator.declare_classes(&Expr::synthetic(ExprKind::New(left.clone())))?;
    generator.declare_classes(&Expr::synthetic(ExprKind::New(right.clone())))?;
    generator.out.blank();

    let scope = ObjectScope::current(&left_shape.fields, &right_shape.fields);
    let invariants = invariants(&mut generator, &scope, props)?;
    let bisim = Bisimulation {
        left: &left_shape,
        right: &right_shape,
        scope,
        invariants,
        props: props.unwrap_or_default(),
    };

    let constructor = bisim.write_constructor(&mut generator, left, right)?;
    generator.out.append(&constructor);
    for method in &left_shape.methods {
        let procedure = bisim.write_method(&mut generator, &method.name)?;
        generator.out.append(&procedure);
    }
    Ok(generator.finish())
}

fn is_invariant(prop: &BisimProp) -> bool {
    prop.scopes.is_empty() || prop.scopes.contains(&BisimScope::Invariant)
}

/// The invariant terms. Without a `bisim` block these are equal heaps and
/// equal fields position by position; an empty block has none.
fn invariants(
    generator: &mut Generator<'_>,
    scope: &ObjectScope,
    props: Option<&[BisimProp]>,
) -> Result<Vec<String>, CheckError> {
    let Some(props) = props else {
        let mut term = "heap1==heap2".to_string();
        for (l, r) in scope.left_fields.iter().zip(&scope.right_fields) {
            term.push_str(&format!(
                " && objectMemory1[{}]==objectMemory2[{}]",
                field_attr(l),
                field_attr(r)
            ));
        }
        return Ok(vec![term]);
    };
    let mut terms = Vec::new();
    for prop in props.iter().filter(|p| is_invariant(p)) {
        terms.push(PropConverter::scoped(generator, scope.clone()).convert_bool(&prop.prop)?);
    }
    Ok(terms)
}

struct Bisimulation<'s, 'e> {
    left: &'s ObjectShape<'e>,
    right: &'s ObjectShape<'e>,
    scope: ObjectScope,
    invariants: Vec<String>,
    props: &'s [BisimProp],
}

impl Bisimulation<'_, '_> {
    fn write_constructor(
        &self,
        generator: &mut Generator<'_>,
        left: &NewExpr,
        right: &NewExpr,
    ) -> Result<BoogieWriter, CheckError> {
        let mut locals = Locals::new();
        let mut sides = Vec::with_capacity(2);
        for new in [left, right] {
            let mut body = BoogieWriter::new();
            let mut checkpoints = BTreeSet::new();
            for param in &new.params {
                let converter = ExprConverter::with_locals(generator, HashMap::new(), locals);
                let (value, converted) = converter.convert_body(&param.value)?;
                body.append(&converted.body);
                body.line(&format!(
                    "objectMemory[{}] := {};",
                    field_attr(&param.name.node),
                    value.to_opaque()?
                ));
                locals = converted.locals;
                checkpoints.extend(converted.checkpoints);
            }
            sides.push((body, checkpoints));
        }
        let (right_body, right_checkpoints) = sides.pop().unwrap_or_default();
        let (left_body, left_checkpoints) = sides.pop().unwrap_or_default();

        let mut out = BoogieWriter::new();
        out.line("procedure both.new(internal.objectId : ObjectId) returns (functionState1 : FunctionState, functionState2 : FunctionState)");
        for invariant in &self.invariants {
            out.line(&format!("ensures ({invariant});"));
        }
        for state in SHARED_STATE {
            out.line(&format!("modifies {state};"));
        }
        out.line("{");
        out.indent();
        out.line("var initFunctionState : FunctionState;");
        out.line("var initHeap : Heap;");
        locals.write_decls(&mut out);
        locals.write_defaults(&mut out);
        out.line("initFunctionState := functionState;");
        out.line("initHeap := heap;");

        out.line("// left new");
        out.line("checkpoints := initCheckpoints;");
        out.line("objectMemory := toMemory(defaultValue);");
        out.append(&left_body);
        save_side(&mut out, "1");
        out.line("functionState := initFunctionState;");
        out.line("heap := initHeap;");

        out.line("// right new");
        out.line("checkpoints := initCheckpoints;");
        out.line("objectMemory := toMemory(defaultValue);");
        out.append(&right_body);
        save_side(&mut out, "2");

        self.write_checkpoint_asserts(generator, &left_checkpoints, &right_checkpoints, &mut out)?;
        out.dedent();
        out.line("}");
        out.blank();
        Ok(out)
    }

    fn write_method(&self, generator: &mut Generator<'_>, name: &str) -> Result<BoogieWriter, CheckError> {
        let (Some(left), Some(right)) = (self.left.method(name), self.right.method(name)) else {
            return Err(generator
                .location
                .error("Objects in bisimulation must have identical method signatures."));
        };
        let arity = left.params.len().max(right.params.len());
        let args = |count: usize| (0..count).map(|i| format!("a{i}"));

        let vars = self.left.method_vars("objectMemory", left, args(arity));
        self.left.enter_method(generator, left);
        let converted = ExprConverter::with_vars(generator, vars).convert_body(left.body);
        self.left.leave_method(generator);
        let (left_value, left_code) = converted?;

        let vars = self.right.method_vars("objectMemory", right, args(arity));
        self.right.enter_method(generator, right);
        let converted = ExprConverter::with_locals(generator, vars, left_code.locals.clone())
            .convert_body(right.body);
        self.right.leave_method(generator);
        let (right_value, right_code) = converted?;
        let locals = &right_code.locals;

        let mut out = BoogieWriter::new();
        let formals: String = args(arity).map(|a| format!(",{a}:T")).collect();
        out.line(&format!(
            "procedure both.{name}(internal.objectId : ObjectId{formals}) returns (internal.r1:T, internal.r2:T, functionState1:FunctionState, functionState2:FunctionState)"
        ));
        for invariant in &self.invariants {
            out.line(&format!("requires ({invariant});"));
        }
        for state in SHARED_STATE {
            out.line(&format!("modifies {state};"));
        }
        for invariant in &self.invariants {
            out.line(&format!("ensures ({invariant});"));
        }
        out.line("ensures functionState1==functionState2;");
        out.line("ensures internal.r1==internal.r2; {");
        out.indent();
        locals.write_decls(&mut out);
        out.line("var initFunctionState : FunctionState;");
        out.blank();
        out.line("initFunctionState := functionState;");

        out.line("heap := heap1;");
        out.line("objectMemory := objectMemory1;");
        out.line("checkpoints := initCheckpoints;");
        save_initial_checkpoints(&mut out, &left_code.checkpoints);
        out.line("// left method");
        locals.write_defaults(&mut out);
        out.append(&left_code.body);
        out.line(&format!("internal.r1 := {};", left_value.to_opaque()?));
        save_side(&mut out, "1");

        out.line("functionState := initFunctionState;");
        out.line("heap := heap2;");
        out.line("objectMemory := objectMemory2;");
        out.line("checkpoints := initCheckpoints;");
        save_initial_checkpoints(&mut out, &right_code.checkpoints);
        out.line("// right method");
        locals.write_defaults(&mut out);
        out.append(&right_code.body);
        out.line(&format!("internal.r2 := {};", right_value.to_opaque()?));
        save_side(&mut out, "2");

        self.write_checkpoint_asserts(
            generator,
            &left_code.checkpoints,
            &right_code.checkpoints,
            &mut out,
        )?;
        out.dedent();
        out.line("}");
        out.blank();
        Ok(out)
    }

    /// Checkpoint-scoped invariants must hold between the saved states of
    /// every pair of labels both sides reached.
    fn write_checkpoint_asserts(
        &self,
        generator: &mut Generator<'_>,
        left: &BTreeSet<String>,
        right: &BTreeSet<String>,
        out: &mut BoogieWriter,
    ) -> Result<(), CheckError> {
        for prop in self.props {
            for scope in &prop.scopes {
                let BisimScope::Checkpoint { left: l, right: r } = scope else {
                    continue;
                };
                if !left.contains(&l.node) || !right.contains(&r.node) {
                    continue;
                }
                let saved = self.scope.at_checkpoints(&l.node, &r.node);
                let term = PropConverter::scoped(generator, saved).convert_bool(&prop.prop)?;
                out.line(&format!("assert ({term});"));
                out.line(&format!(
                    "assert (checkpoints1[{}][checkpointFunctionState]==checkpoints2[{}][checkpointFunctionState]);",
                    checkpoint_id(&l.node),
                    checkpoint_id(&r.node)
                ));
            }
        }
        Ok(())
    }
}

fn save_side(out: &mut BoogieWriter, side: &str) {
    out.line(&format!("checkpoints{side} := checkpoints;"));
    out.line(&format!("objectMemory{side} := objectMemory;"));
    out.line(&format!("functionState{side} := functionState;"));
    out.line(&format!("heap{side} := heap;"));
}

/// Labels the body may skip still name the state on entry.
fn save_initial_checkpoints(out: &mut BoogieWriter, labels: &BTreeSet<String>) {
    for label in labels {
        out.line(&format!("// saving checkpoint for label {label}"));
        out.line(&save_checkpoint_line(label));
    }
}

#![forbid(unsafe_code)]

//! Imperative translation of expressions into procedure bodies.

use std::collections::{BTreeSet, HashMap};

use quivela_ast::{ArithOp, CmpOp, Expr, ExprKind, LogicOp, NewExpr, Prop, Type};
use quivela_core::{CheckError, FrameKind};

use crate::names::{checkpoint_id, Locals};
use crate::program::{param_type, return_type, Converted, Generator};
use crate::prop::PropConverter;
use crate::value::{BoogieType, Value};
use crate::writer::BoogieWriter;

/// The sort both operands of a comparison are coerced to.
pub fn comparison_type(op: CmpOp, left: BoogieType, right: BoogieType) -> BoogieType {
    match op {
        CmpOp::Same => BoogieType::Opaque,
        CmpOp::Eq | CmpOp::Ne => {
            if left == BoogieType::Integer && right == BoogieType::Integer {
                BoogieType::Integer
            } else {
                BoogieType::Bitstring
            }
        }
        CmpOp::Lt | CmpOp::Le | CmpOp::Gt | CmpOp::Ge => {
            if left == BoogieType::Real || right == BoogieType::Real {
                BoogieType::Real
            } else {
                BoogieType::Integer
            }
        }
    }
}

pub fn comparison_op(op: CmpOp) -> &'static str {
    match op {
        CmpOp::Eq | CmpOp::Same => "==",
        CmpOp::Ne => "!=",
        CmpOp::Lt => "<",
        CmpOp::Le => "<=",
        CmpOp::Gt => ">",
        CmpOp::Ge => ">=",
    }
}

pub fn arith_op(op: ArithOp) -> &'static str {
    match op {
        ArithOp::Add => "+",
        ArithOp::Sub => "-",
        ArithOp::Mul => "*",
        ArithOp::Div => " div ",
        ArithOp::Mod => " mod ",
    }
}

pub struct ExprConverter<'g, 'a> {
    generator: &'g mut Generator<'a>,
    vars: HashMap<String, String>,
    locals: Locals,
    out: BoogieWriter,
    checkpoints: BTreeSet<String>,
}

impl<'g, 'a> ExprConverter<'g, 'a> {
    pub fn new(generator: &'g mut Generator<'a>) -> Self {
        Self::with_vars(generator, HashMap::new())
    }

    /// Names in `vars` are replaced by their mapped text on lookup and
    /// assignment.
    pub fn with_vars(generator: &'g mut Generator<'a>, vars: HashMap<String, String>) -> Self {
        Self::with_locals(generator, vars, Locals::new())
    }

    /// Continues numbering temporaries after `locals`.
    pub fn with_locals(
        generator: &'g mut Generator<'a>,
        vars: HashMap<String, String>,
        locals: Locals,
    ) -> Self {
        Self {
            generator,
            vars,
            locals,
            out: BoogieWriter::new(),
            checkpoints: BTreeSet::new(),
        }
    }

    pub fn convert_body(mut self, expr: &Expr) -> Result<(Value, Converted), CheckError> {
        let value = self.convert(expr)?;
        Ok((value, self.finish()))
    }

    pub fn finish(self) -> Converted {
        Converted {
            body: self.out,
            locals: self.locals,
            checkpoints: self.checkpoints,
        }
    }

    fn lookup(&self, name: &str) -> String {
        self.vars
            .get(name)
            .cloned()
            .unwrap_or_else(|| name.to_string())
    }

    fn temp(&mut self, ty: BoogieType) -> String {
        self.locals.fresh(ty.name())
    }

    pub fn convert(&mut self, expr: &Expr) -> Result<Value, CheckError> {
        match &expr.kind {
            ExprKind::Int(n) => Ok(Value::integer(n.to_string())),
            ExprKind::Bool(b) => Ok(Value::boolean(b.to_string())),
            ExprKind::Lookup(name) => {
                let ty = self
                    .generator
                    .symbols
                    .get_type(&name.node)
                    .map(BoogieType::of)
                    .unwrap_or(BoogieType::Opaque);
                Ok(Value::new(ty, self.lookup(&name.node)))
            }
            ExprKind::Paren { label, expr } => {
                let value = self.convert(expr)?;
                if let Some(label) = label {
                    self.save_checkpoint(&label.node);
                }
                Ok(value)
            }
            ExprKind::Seq { head, tail } => {
                self.convert(head)?;
                self.convert(tail)
            }
            ExprKind::Assign { target, value } => {
                let value = self.convert(value)?;
                let name = &target.node;
                if !self.vars.contains_key(name) {
                    self.locals.declare(name, BoogieType::Opaque.name());
                }
                let lhs = self.lookup(name);
                self.out.line(&format!("{lhs}:={};", value.to_opaque()?));
                self.generator.symbols.add_symbol(name, Type::Opaque);
                Ok(value)
            }
            ExprKind::Ternary {
                cond,
                then,
                otherwise,
            } => {
                let test = self.convert(cond)?;
                let tmp = self.temp(BoogieType::Opaque);
                self.out.line(&format!("if ({}) {{", test.to_boolean()?));
                self.out.indent();
                let so = self.convert(then)?;
                self.out.line(&format!("{tmp} := {};", so.to_opaque()?));
                self.out.dedent();
                self.out.line("} else {");
                self.out.indent();
                let not = self.convert(otherwise)?;
                self.out.line(&format!("{tmp} := {};", not.to_opaque()?));
                self.out.dedent();
                self.out.line("}");
                Ok(Value::opaque(tmp))
            }
            ExprKind::Logic { left, op, right } => {
                let left = self.convert(left)?;
                let test = match op {
                    LogicOp::And => left.to_boolean()?,
                    LogicOp::Or => format!("!({})", left.to_boolean()?),
                };
                let tmp = self.temp(BoogieType::Opaque);
                self.out.line(&format!("{tmp} := {};", left.to_opaque()?));
                self.out.line(&format!("if ({test}) {{"));
                self.out.indent();
                let right = self.convert(right)?;
                self.out.line(&format!("{tmp} := {};", right.to_opaque()?));
                self.out.dedent();
                self.out.line("}");
                Ok(Value::opaque(tmp))
            }
            ExprKind::Not(inner) => {
                let inner = self.convert(inner)?;
                Ok(Value::boolean(format!("!({})", inner.to_boolean()?)))
            }
            ExprKind::Compare { left, op, right } => {
                let left = self.convert(left)?;
                let right = self.convert(right)?;
                let ty = comparison_type(*op, left.ty, right.ty);
                Ok(Value::boolean(format!(
                    "({}){}({})",
                    left.as_type(ty)?,
                    comparison_op(*op),
                    right.as_type(ty)?
                )))
            }
            ExprKind::Arith { left, op, right } => {
                let left = self.convert(left)?;
                let right = self.convert(right)?;
                Ok(Value::integer(format!(
                    "({}{}{})",
                    left.to_integer()?,
                    arith_op(*op),
                    right.to_integer()?
                )))
            }
            ExprKind::Call { name, args } => self.convert_call(&name.node, args),
            ExprKind::Invoke {
                target,
                method,
                classes,
                args,
            } => {
                let classes: Vec<&str> = classes.iter().map(|c| c.node.as_str()).collect();
                self.convert_invoke(target, &method.node, &classes, args)
            }
            ExprKind::New(new) => self.convert_new(new),
            ExprKind::Index { map, index } => {
                let map = self.convert(map)?;
                let index = self.convert(index)?;
                Ok(Value::opaque(format!(
                    "{}[{}]",
                    map.to_memory()?,
                    index.to_bitstring()?
                )))
            }
            ExprKind::Update { map, index, value } => {
                let map = self.convert(map)?;
                let index = self.convert(index)?;
                let value = self.convert(value)?;
                Ok(Value::new(
                    BoogieType::Memory,
                    format!(
                        "{}[{} := {}]",
                        map.to_memory()?,
                        index.to_bitstring()?,
                        value.to_opaque()?
                    ),
                ))
            }
            ExprKind::Ref(inner) => {
                let value = self.convert(inner)?;
                let id = value.to_object_id()?;
                self.out.line(&format!("if (!objectValid(heap, {id})) {{"));
                self.out.indent();
                self.out.line(&format!(
                    "heap := addObject(heap, emptyObject[objectIdAttr := {id}]);"
                ));
                self.out.dedent();
                self.out.line("}");
                Ok(value)
            }
            ExprKind::Tobits(inner) => {
                let inner = self.convert(inner)?;
                Ok(Value::new(BoogieType::Bitstring, inner.to_bitstring()?))
            }
            ExprKind::Assert(prop) => self.convert_assertion("assert", prop),
            ExprKind::Admit(prop) => self.convert_assertion("assume", prop),
            ExprKind::Ellipsis => Err(CheckError::internal(
                "... not rewritten to previous expression.",
            )),
            ExprKind::Hole => Err(CheckError::internal(
                "rewrite context marker left in expression",
            )),
        }
    }

    fn save_checkpoint(&mut self, label: &str) {
        self.generator.add_checkpoint(label);
        self.checkpoints.insert(label.to_string());
        self.out
            .line(&format!("// saving checkpoint for label {label}"));
        self.out.line(&save_checkpoint_line(label));
    }

    fn convert_assertion(&mut self, keyword: &str, prop: &Prop) -> Result<Value, CheckError> {
        self.generator.symbols.push_frame(FrameKind::Logical);
        let converted = PropConverter::with_vars(self.generator, self.vars.clone()).convert_bool(prop);
        self.generator.symbols.pop_frame();
        self.out.line(&format!("{keyword} ({});", converted?));
        Ok(Value::new(BoogieType::Bitstring, "nil"))
    }

    fn convert_call(&mut self, name: &str, args: &[Expr]) -> Result<Value, CheckError> {
        let functions = self.generator.functions;
        let decl = functions
            .get(name)
            .ok_or_else(|| CheckError::internal(format!("Function not declared: {name}")))?;
        let mut actuals = Vec::with_capacity(args.len());
        for (i, arg) in args.iter().enumerate() {
            let value = self.convert(arg)?;
            actuals.push(value.as_type(param_type(decl, i))?);
        }
        let ret = return_type(decl);
        if decl.pure {
            return Ok(Value::new(ret, format!("{name}({})", actuals.join(","))));
        }
        let tmp = self.temp(ret);
        let actuals: String = actuals.iter().map(|a| format!(",{a}")).collect();
        self.out
            .line(&format!("call {tmp}:={name}(internal.objectId{actuals});"));
        Ok(Value::new(ret, tmp))
    }

    /// Runs `method` on the target's slice of the heap with the target's
    /// memory installed, then reassembles the heap.
    fn convert_invoke(
        &mut self,
        target: &Expr,
        method: &str,
        classes: &[&str],
        args: &[Expr],
    ) -> Result<Value, CheckError> {
        let target = self.convert(target)?;
        let mut values = Vec::with_capacity(args.len());
        for arg in args {
            values.push(self.convert(arg)?);
        }

        // Arguments may read the current object memory, which is swapped below.
        let mut params = String::new();
        for value in &values {
            let tmp = self.temp(BoogieType::Opaque);
            self.out.line(&format!("{tmp} := {};", value.to_opaque()?));
            params.push_str(&format!(",{tmp}"));
        }

        let oid = self.temp(BoogieType::ObjectId);
        self.out.line(&format!("{oid} := {};", target.to_object_id()?));
        let result = self.temp(BoogieType::Opaque);
        self.out.line(&format!("{result} := defaultValue;"));

        let fallback = match self.generator.methods.get(method) {
            Some(name) => name.to_string(),
            None => self.generator.declare_target_method(method, args.len()),
        };
        let mut dispatch = Vec::with_capacity(classes.len());
        for class in classes {
            dispatch.push(self.generator.require_class(class)?);
        }

        self.out.line(&format!("if(objectValid(heap, {oid})) {{"));
        self.out.indent();
        let saved = self.temp(BoogieType::Memory);
        self.out.line(&format!("{saved}:= objectMemory;"));
        let split = self.locals.fresh("SplitHeap");
        self.out
            .line(&format!("{split} := invokeSplit(heap, {oid});"));
        self.out.line(&format!("heap := {split}[heapRight];"));
        self.out.line(&format!(
            "objectMemory := {split}[targetObject][objectMemoryAttr];"
        ));

        let class_of = format!("{split}[targetObject][objectClassIdAttr]");
        for (i, class) in dispatch.iter().enumerate() {
            let prefix = if i == 0 { "" } else { "else " };
            self.out
                .line(&format!("{prefix}if ({class_of} == {class}) {{"));
            self.out.indent();
            self.out.line(&format!(
                "call {result}:= {class}.{method}({class_of}, {oid}{params});"
            ));
            self.out.dedent();
            self.out.line("}");
        }
        if !dispatch.is_empty() {
            self.out.line("else {");
            self.out.indent();
        }
        self.out.line(&format!(
            "call {result}:={fallback}({class_of}, {oid}{params});"
        ));
        if !dispatch.is_empty() {
            self.out.dedent();
            self.out.line("}");
        }

        self.out.line(&format!(
            "{split}[targetObject][objectMemoryAttr] := objectMemory;"
        ));
        self.out.line(&format!("{split}[heapRight] := heap;"));
        self.out.line(&format!("objectMemory := {saved};"));
        self.out.line(&format!("heap := assembleHeap({split});"));
        self.out.dedent();
        self.out.line("}");

        Ok(Value::opaque(result))
    }

    fn convert_new(&mut self, new: &NewExpr) -> Result<Value, CheckError> {
        let mut actuals = Vec::with_capacity(new.params.len());
        for param in &new.params {
            actuals.push(self.convert(&param.value)?.to_opaque()?);
        }
        let class = self
            .generator
            .classes
            .get(new)
            .map(str::to_string)
            .ok_or_else(|| CheckError::internal("object constructed before its class was declared"))?;
        let object = self.locals.fresh(BoogieType::Object.name());
        self.out.line(&format!(
            "call {object} := {class}.new({});",
            actuals.join(",")
        ));
        self.out.line(&format!(
            "{object}[objectIdAttr] := freshObjectId(internal.objectId, heap);"
        ));
        self.out
            .line(&format!("heap := addObject(heap, {object});"));
        Ok(Value::new(
            BoogieType::ObjectId,
            format!("{object}[objectIdAttr]"),
        ))
    }
}

/// Records the current state under `label`.
pub fn save_checkpoint_line(label: &str) -> String {
    format!(
        "checkpoints[{}] := emptyCheckpoint[checkpointFunctionState := functionState][checkpointHeap := heap][checkpointMemory := objectMemory];",
        checkpoint_id(label)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn comparisons_pick_the_narrowest_common_sort() {
        use BoogieType::*;
        assert_eq!(comparison_type(CmpOp::Same, Integer, Integer), Opaque);
        assert_eq!(comparison_type(CmpOp::Eq, Integer, Integer), Integer);
        assert_eq!(comparison_type(CmpOp::Ne, Integer, Opaque), Bitstring);
        assert_eq!(comparison_type(CmpOp::Le, Integer, Real), Real);
        assert_eq!(comparison_type(CmpOp::Gt, Opaque, Integer), Integer);
    }

    #[test]
    fn checkpoints_capture_the_whole_state() {
        let line = save_checkpoint_line("L");
        assert!(line.starts_with("checkpoints[internal.checkpointid.L] := "));
        assert!(line.contains("checkpointHeap := heap"));
        assert!(line.contains("checkpointMemory := objectMemory"));
    }
}

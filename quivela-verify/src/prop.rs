#![forbid(unsafe_code)]

//! Propositions become pure boolean terms.

use std::collections::HashMap;

use quivela_ast::{
    ClassRef, HeapProp, ObjectProp, Prop, PropKind, PropLogicOp, Quantifier, Side, Type,
};
use quivela_core::{CheckError, FrameKind};
use quivela_parse::format_prop;

use crate::expr::{arith_op, comparison_op, comparison_type};
use crate::names::field_attr;
use crate::program::{param_type, return_type, Generator};
use crate::value::{BoogieType, Value};

/// The pair of objects a bisimulation invariant talks about.
#[derive(Clone, Debug)]
pub struct ObjectScope {
    pub left_heap: String,
    pub right_heap: String,
    pub left_memory: String,
    pub right_memory: String,
    pub left_fields: Vec<String>,
    pub right_fields: Vec<String>,
}

impl ObjectScope {
    /// Both objects as they are between method calls.
    pub fn current(left_fields: &[String], right_fields: &[String]) -> Self {
        Self {
            left_heap: "heap1".to_string(),
            right_heap: "heap2".to_string(),
            left_memory: "objectMemory1".to_string(),
            right_memory: "objectMemory2".to_string(),
            left_fields: left_fields.to_vec(),
            right_fields: right_fields.to_vec(),
        }
    }

    /// Both objects as saved at the checkpoints `left` and `right`.
    pub fn at_checkpoints(&self, left: &str, right: &str) -> Self {
        let left = crate::names::checkpoint_id(left);
        let right = crate::names::checkpoint_id(right);
        Self {
            left_heap: format!("checkpoints1[{left}][checkpointHeap]"),
            right_heap: format!("checkpoints2[{right}][checkpointHeap]"),
            left_memory: format!("checkpoints1[{left}][checkpointMemory]"),
            right_memory: format!("checkpoints2[{right}][checkpointMemory]"),
            left_fields: self.left_fields.clone(),
            right_fields: self.right_fields.clone(),
        }
    }
}

pub struct PropConverter<'g, 'a> {
    generator: &'g mut Generator<'a>,
    vars: HashMap<String, String>,
    scope: Option<ObjectScope>,
}

impl<'g, 'a> PropConverter<'g, 'a> {
    pub fn new(generator: &'g mut Generator<'a>) -> Self {
        Self::with_vars(generator, HashMap::new())
    }

    pub fn with_vars(generator: &'g mut Generator<'a>, vars: HashMap<String, String>) -> Self {
        Self {
            generator,
            vars,
            scope: None,
        }
    }

    pub fn scoped(generator: &'g mut Generator<'a>, scope: ObjectScope) -> Self {
        Self {
            generator,
            vars: HashMap::new(),
            scope: Some(scope),
        }
    }

    pub fn convert_bool(&mut self, prop: &Prop) -> Result<String, CheckError> {
        self.convert(prop)?.to_boolean()
    }

    fn scope(&self) -> Result<&ObjectScope, CheckError> {
        self.scope.as_ref().ok_or_else(|| {
            self.generator
                .location
                .error("Objects and heaps can only be referenced in bisimulation invariants.")
        })
    }

    fn convert(&mut self, prop: &Prop) -> Result<Value, CheckError> {
        match &prop.kind {
            PropKind::Int(n) => Ok(Value::integer(n.to_string())),
            PropKind::Bool(b) => Ok(Value::boolean(b.to_string())),
            PropKind::Lookup(name) => {
                let name = &name.node;
                let ty = self
                    .generator
                    .symbols
                    .get_type(name)
                    .ok_or_else(|| self.generator.location.error(format!("{name} not declared.")))?;
                let text = self.vars.get(name).cloned().unwrap_or_else(|| name.clone());
                Ok(Value::new(BoogieType::of(ty), text))
            }
            PropKind::Paren(inner) => {
                let inner = self.convert(inner)?;
                Ok(Value::new(inner.ty, format!("({})", inner.text)))
            }
            PropKind::Quant {
                quantifier,
                params,
                body,
            } => {
                let bound: Vec<(String, Type)> = params
                    .iter()
                    .map(|p| (p.name.node.clone(), p.ty.unwrap_or(Type::Bitstring)))
                    .collect();
                self.generator.symbols.push_frame(FrameKind::Logical);
                for (name, ty) in &bound {
                    self.generator.symbols.add_symbol(name, *ty);
                }
                let body = self.convert_bool(body);
                self.generator.symbols.pop_frame();

                let keyword = match quantifier {
                    Quantifier::Forall => "forall",
                    Quantifier::Exists => "exists",
                };
                let params = bound
                    .iter()
                    .map(|(name, ty)| format!("{name}:{}", BoogieType::of(*ty).name()))
                    .collect::<Vec<_>>()
                    .join(",");
                Ok(Value::boolean(format!("({keyword} {params} :: {})", body?)))
            }
            PropKind::Logic { left, op, right } => {
                let left = self.convert_bool(left)?;
                let right = self.convert_bool(right)?;
                let op = match op {
                    PropLogicOp::And => "&&",
                    PropLogicOp::Or => "||",
                    PropLogicOp::Implies => "==>",
                };
                Ok(Value::boolean(format!("({left}){op}({right})")))
            }
            PropKind::Not(inner) => {
                let inner = self.convert_bool(inner)?;
                Ok(Value::boolean(format!("!({inner})")))
            }
            PropKind::Compare { left, op, right } => {
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
            PropKind::Arith { left, op, right } => {
                let left = self.convert(left)?;
                let right = self.convert(right)?;
                Ok(Value::integer(format!(
                    "({}){}({})",
                    left.to_integer()?,
                    arith_op(*op),
                    right.to_integer()?
                )))
            }
            PropKind::Call { name, args } => {
                let functions = self.generator.functions;
                let name = &name.node;
                let decl = functions.get(name).ok_or_else(|| {
                    self.generator
                        .location
                        .error(format!("Function not declared: {name}"))
                })?;
                if !decl.pure {
                    return Err(self
                        .generator
                        .location
                        .error("Only pure functions allowed in propositions."));
                }
                let mut actuals = Vec::with_capacity(args.len());
                for (i, arg) in args.iter().enumerate() {
                    actuals.push(self.convert(arg)?.as_type(param_type(decl, i))?);
                }
                Ok(Value::new(
                    return_type(decl),
                    format!("{name}({})", actuals.join(",")),
                ))
            }
            PropKind::Index { map, index } => {
                let map = self.convert(map)?;
                let index = self.convert(index)?;
                Ok(Value::opaque(format!(
                    "{}[{}]",
                    map.to_memory()?,
                    index.to_bitstring()?
                )))
            }
            PropKind::Update { map, index, value } => {
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
            PropKind::Tobits(inner) => {
                let inner = self.convert(inner)?;
                Ok(Value::new(BoogieType::Bitstring, inner.to_bitstring()?))
            }
            PropKind::IsBits(inner) => {
                let inner = self.convert(inner)?;
                Ok(Value::boolean(format!("isBits({})", inner.to_opaque()?)))
            }
            PropKind::Env(_) => {
                let id = self.generator.intern_expr(&format_prop(prop));
                Ok(Value::new(BoogieType::Expr, id))
            }
            PropKind::SameObject(left, right) => {
                let left = self.convert_object(left)?;
                let right = self.convert_object(right)?;
                Ok(Value::boolean(format!("{}=={}", left.text, right.text)))
            }
            PropKind::Independence { heap, left, right } => {
                let heap = self.convert_heap(heap)?;
                let left = self.convert(left)?.to_object_id()?;
                let right = self.convert(right)?.to_object_id()?;
                Ok(Value::boolean(format!(
                    "(objectValid({heap}, {left}) ==> objectValid(invokeSplit({heap}, {right})[heapLeft],{left}))"
                )))
            }
            PropKind::ObjectIs { object, class } => {
                let object = self.convert_object(object)?;
                let class = match class {
                    ClassRef::Named(name) => self.generator.require_class(&name.node)?,
                    ClassRef::Invalid => "internal.invalidClassId".to_string(),
                };
                Ok(Value::boolean(format!(
                    "{}[objectClassIdAttr] == {class}",
                    object.text
                )))
            }
            PropKind::Field { object, field } => {
                let object = self.convert_object(object)?;
                Ok(Value::opaque(format!(
                    "{}[{}]",
                    object.to_memory()?,
                    field_attr(&field.node)
                )))
            }
            PropKind::FrameAll => {
                let scope = self.scope()?;
                Ok(Value::boolean(format!(
                    "{}=={}",
                    scope.left_heap, scope.right_heap
                )))
            }
            PropKind::Frame { left, right } => {
                let (left_heap, right_heap) = {
                    let scope = self.scope()?;
                    (scope.left_heap.clone(), scope.right_heap.clone())
                };
                self.convert_frame(&left_heap, &right_heap, left, right)
            }
            PropKind::FrameHeap {
                left_heap,
                right_heap,
                left,
                right,
            } => {
                let left_heap = self.convert_heap(left_heap)?;
                let right_heap = self.convert_heap(right_heap)?;
                self.convert_frame(&left_heap, &right_heap, left, right)
            }
            PropKind::FieldsEqual => {
                let scope = self.scope()?;
                let pairs: Vec<String> = scope
                    .left_fields
                    .iter()
                    .zip(&scope.right_fields)
                    .map(|(l, r)| {
                        format!(
                            "{}[{}] == {}[{}]",
                            scope.left_memory,
                            field_attr(l),
                            scope.right_memory,
                            field_attr(r)
                        )
                    })
                    .collect();
                if pairs.is_empty() {
                    return Ok(Value::boolean("true"));
                }
                Ok(Value::boolean(pairs.join(" && ")))
            }
            PropKind::FieldsEqualExcept(excluded) => {
                let scope = self.scope()?;
                let pairs: Vec<String> = scope
                    .left_fields
                    .iter()
                    .filter(|f| scope.right_fields.contains(*f))
                    .filter(|f| !excluded.iter().any(|x| &x.node == *f))
                    .map(|f| {
                        format!(
                            "{}[{}] == {}[{}]",
                            scope.left_memory,
                            field_attr(f),
                            scope.right_memory,
                            field_attr(f)
                        )
                    })
                    .collect();
                if pairs.is_empty() {
                    return Err(self.generator.location.error("No common fields remain."));
                }
                Ok(Value::boolean(pairs.join(" && ")))
            }
        }
    }

    fn convert_frame(
        &mut self,
        left_heap: &str,
        right_heap: &str,
        left: &Prop,
        right: &Prop,
    ) -> Result<Value, CheckError> {
        let left = self.convert(left)?.to_object_id()?;
        let right = self.convert(right)?.to_object_id()?;
        Ok(Value::boolean(format!(
            "frame({left_heap},{right_heap}, {left},{right})"
        )))
    }

    fn convert_object(&mut self, object: &ObjectProp) -> Result<Value, CheckError> {
        match object {
            ObjectProp::Side(side) => {
                let scope = self.scope()?;
                let memory = match side {
                    Side::Left => &scope.left_memory,
                    Side::Right => &scope.right_memory,
                };
                Ok(Value::new(BoogieType::Memory, memory.clone()))
            }
            ObjectProp::FromHeap { heap, reference } => {
                let heap = self.convert_heap(heap)?;
                let id = self.convert(reference)?.to_object_id()?;
                Ok(Value::new(
                    BoogieType::Object,
                    format!("invokeSplit({heap},{id})[targetObject]"),
                ))
            }
        }
    }

    fn convert_heap(&mut self, heap: &HeapProp) -> Result<String, CheckError> {
        match heap {
            HeapProp::Side(side) => {
                let scope = self.scope()?;
                Ok(match side {
                    Side::Left => scope.left_heap.clone(),
                    Side::Right => scope.right_heap.clone(),
                })
            }
            HeapProp::FromHeap { heap, reference } => {
                let heap = self.convert_heap(heap)?;
                let id = self.convert(reference)?.to_object_id()?;
                Ok(format!("invokeSplit({heap},{id})[heapRight]"))
            }
        }
    }
}

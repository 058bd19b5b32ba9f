#![forbid(unsafe_code)]

//! Distance expressions as real-valued terms.

use quivela_ast::{Bounds, BoundsKind, BoundsOp};
use quivela_core::CheckError;
use quivela_parse::format_bounds;

use crate::program::{param_type, return_type, Generator};
use crate::value::{BoogieType, Value};

pub struct BoundsConverter<'g, 'a> {
    generator: &'g mut Generator<'a>,
    /// Identifiers seen in bounds that no declaration covers.
    pub adversaries: Vec<String>,
}

impl<'g, 'a> BoundsConverter<'g, 'a> {
    pub fn new(generator: &'g mut Generator<'a>) -> Self {
        Self {
            generator,
            adversaries: Vec::new(),
        }
    }

    pub fn convert_real(&mut self, bounds: &Bounds) -> Result<String, CheckError> {
        numeric(self.convert(bounds)?)?.to_real()
    }

    fn convert(&mut self, bounds: &Bounds) -> Result<Value, CheckError> {
        match &bounds.kind {
            BoundsKind::Int(n) => Ok(Value::integer(n.to_string())),
            BoundsKind::Lookup(name) => {
                let name = &name.node;
                match self.generator.symbols.get_type(name) {
                    Some(ty) => Ok(Value::new(BoogieType::of(ty), name.clone())),
                    None => {
                        if !self.adversaries.contains(name) {
                            self.adversaries.push(name.clone());
                        }
                        Ok(Value::new(BoogieType::Real, name.clone()))
                    }
                }
            }
            BoundsKind::Paren(inner) => self.convert(inner),
            BoundsKind::Call { name, args } => {
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
                        .error("Only pure functions allowed in bounds expressions."));
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
            BoundsKind::Env(_) => {
                let id = self.generator.intern_expr(&format_bounds(bounds));
                Ok(Value::new(BoogieType::Expr, id))
            }
            BoundsKind::Binary { left, op, right } => {
                let left = numeric(self.convert(left)?)?;
                let right = numeric(self.convert(right)?)?;
                if *op == BoundsOp::Pow {
                    return Ok(Value::new(
                        BoogieType::Real,
                        format!("real_pow({},{})", left.to_real()?, right.to_real()?),
                    ));
                }
                let promoted = left.ty == BoogieType::Real || right.ty == BoogieType::Real;
                let ty = if *op == BoundsOp::Div || promoted {
                    BoogieType::Real
                } else {
                    BoogieType::Integer
                };
                Ok(Value::new(
                    ty,
                    format!(
                        "({}{}{})",
                        left.as_type(ty)?,
                        op.symbol(),
                        right.as_type(ty)?
                    ),
                ))
            }
        }
    }
}

/// Context terms take part in arithmetic through their opaque encoding.
fn numeric(value: Value) -> Result<Value, CheckError> {
    match value.ty {
        BoogieType::Expr => Ok(Value::opaque(value.to_opaque()?)),
        _ => Ok(value),
    }
}

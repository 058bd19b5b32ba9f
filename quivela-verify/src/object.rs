#![forbid(unsafe_code)]

use std::collections::HashMap;

use quivela_ast::{Expr, NewExpr, Type};
use quivela_core::{CheckError, FrameKind};

use crate::expr::ExprConverter;
use crate::names::{field_attr, scoped_fields};
use crate::program::{Generator, CLASS_PRESERVED};
use crate::writer::BoogieWriter;

#[derive(Debug)]
pub struct MethodShape<'e> {
    pub name: String,
    pub params: Vec<String>,
    pub body: &'e Expr,
}

/// Fields and methods of an object literal, in source order.
#[derive(Debug)]
pub struct ObjectShape<'e> {
    pub fields: Vec<String>,
    pub methods: Vec<MethodShape<'e>>,
}

impl<'e> ObjectShape<'e> {
    pub fn of(new: &'e NewExpr) -> Self {
        Self {
            fields: new.params.iter().map(|p| p.name.node.clone()).collect(),
            methods: new
                .methods
                .iter()
                .map(|m| MethodShape {
                    name: m.name.node.clone(),
                    params: m.params.iter().map(|p| p.name.node.clone()).collect(),
                    body: &m.body,
                })
                .collect(),
        }
    }

    pub fn method(&self, name: &str) -> Option<&MethodShape<'e>> {
        self.methods.iter().find(|m| m.name == name)
    }

    /// Fields resolve into `memory`, parameters to `params`.
    pub fn method_vars(
        &self,
        memory: &str,
        method: &MethodShape<'_>,
        params: impl IntoIterator<Item = String>,
    ) -> HashMap<String, String> {
        let mut vars = scoped_fields(&self.fields, memory);
        for (name, mapped) in method.params.iter().zip(params) {
            vars.insert(name.clone(), mapped);
        }
        vars
    }

    /// Pushes one frame for the fields and one for the parameters of `method`.
    pub fn enter_method(&self, generator: &mut Generator<'_>, method: &MethodShape<'_>) {
        generator.symbols.push_frame(FrameKind::Mutable);
        for field in &self.fields {
            generator.symbols.add_symbol(field, Type::Opaque);
        }
        generator.symbols.push_frame(FrameKind::Mutable);
        for param in &method.params {
            generator.symbols.add_symbol(param, Type::Opaque);
        }
    }

    pub fn leave_method(&self, generator: &mut Generator<'_>) {
        generator.symbols.pop_frame();
        generator.symbols.pop_frame();
    }
}

/// The method procedures and the constructor of class `class`.
pub fn write_class(
    generator: &mut Generator<'_>,
    shape: &ObjectShape<'_>,
    class: &str,
) -> Result<BoogieWriter, CheckError> {
    let mut out = BoogieWriter::new();
    for method in &shape.methods {
        write_method(generator, shape, method, class, &mut out)?;
    }
    write_constructor(shape, class, &mut out);
    Ok(out)
}

fn write_method(
    generator: &mut Generator<'_>,
    shape: &ObjectShape<'_>,
    method: &MethodShape<'_>,
    class: &str,
    out: &mut BoogieWriter,
) -> Result<(), CheckError> {
    let vars = shape.method_vars("objectMemory", method, method.params.iter().cloned());
    shape.enter_method(generator, method);
    let converted = ExprConverter::with_vars(generator, vars).convert_body(method.body);
    shape.leave_method(generator);
    let (value, converted) = converted?;

    let params: String = method.params.iter().map(|p| format!(", {p}:T")).collect();
    out.line(&format!(
        "procedure {{:inline 1}} {class}.{}(internal.classId : ClassId, internal.objectId : ObjectId{params}) returns (internal.result : T)",
        method.name
    ));
    out.line("modifies objectMemory;");
    out.line("modifies functionState;");
    out.line("modifies heap;");
    out.line("modifies checkpoints;");
    out.line(CLASS_PRESERVED);
    out.line("{");
    out.indent();
    converted.locals.write_decls(out);
    out.blank();
    converted.locals.write_defaults(out);
    out.append(&converted.body);
    out.line(&format!("internal.result := {};", value.to_opaque()?));
    out.dedent();
    out.line("}");
    out.blank();
    Ok(())
}

fn write_constructor(shape: &ObjectShape<'_>, class: &str, out: &mut BoogieWriter) {
    let params = shape
        .fields
        .iter()
        .map(|f| format!("{f}:T"))
        .collect::<Vec<_>>()
        .join(",");
    out.line(&format!(
        "procedure {{:inline 1}} {class}.new({params}) returns (internal.result: Object) {{"
    ));
    out.indent();
    out.line("var internal.tmp0:Object;");
    out.line("var internal.tmp1:Memory;");
    out.line("internal.tmp0 := emptyObject;");
    out.line("internal.tmp1 := toMemory(defaultValue);");
    for field in &shape.fields {
        out.line(&format!("internal.tmp1[{}] := {field};", field_attr(field)));
    }
    out.line("internal.tmp0[objectMemoryAttr] := internal.tmp1;");
    out.line(&format!("internal.tmp0[objectClassIdAttr] := {class};"));
    out.line("internal.result := internal.tmp0;");
    out.dedent();
    out.line("}");
    out.blank();
}

#[cfg(test)]
mod tests {
    use super::*;
    use quivela_parse::parse_expr;

    #[test]
    fn constructor_stores_every_field() {
        let expr = parse_expr("new (k = 0, n = 1) { method get() { k } }").unwrap();
        let shape = ObjectShape::of(expr.as_new().unwrap());
        let mut out = BoogieWriter::new();
        write_constructor(&shape, "C", &mut out);
        let text = out.finish();
        assert!(text.starts_with(
            "procedure {:inline 1} C.new(k:T,n:T) returns (internal.result: Object) {"
        ));
        assert!(text.contains("\tinternal.tmp1[internal.attribute.field.k] := k;\n"));
        assert!(text.contains("\tinternal.tmp1[internal.attribute.field.n] := n;\n"));
        assert!(text.contains("\tinternal.tmp0[objectClassIdAttr] := C;\n"));
    }

    #[test]
    fn method_parameters_shadow_fields() {
        let expr = parse_expr("new (x = 0) { method set(x) { x } }").unwrap();
        let shape = ObjectShape::of(expr.as_new().unwrap());
        let method = shape.method("set").unwrap();
        let vars = shape.method_vars("objectMemory", method, ["a0".to_string()]);
        assert_eq!(vars["x"], "a0");
    }
}

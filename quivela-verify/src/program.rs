#![forbid(unsafe_code)]

//! Shared state and declarations of one generated verification program.

use std::collections::BTreeMap;

use quivela_ast::{AxiomDecl, Expr, ExprKind, FuncDecl, NewExpr, Type};
use quivela_core::tree::children;
use quivela_core::{CheckError, FrameKind, Functions, Location, ProofEnv, SymbolTable};
use tracing::debug;

use crate::expr::ExprConverter;
use crate::names::{Classes, Constants, Locals, Methods};
use crate::object::{self, ObjectShape};
use crate::prop::PropConverter;
use crate::value::BoogieType;
use crate::writer::BoogieWriter;

pub const PRELUDE: &str = include_str!("prelude.bpl");

/// Every class procedure keeps the class of existing objects fixed.
pub const CLASS_PRESERVED: &str = "ensures (forall id:ObjectId :: objectValid(old(heap), id) ==> (objectValid(heap, id) && invokeSplit(heap, id)[targetObject][objectClassIdAttr] == invokeSplit(old(heap), id)[targetObject][objectClassIdAttr]));";

pub fn return_type(decl: &FuncDecl) -> BoogieType {
    BoogieType::of(decl.ret.unwrap_or(default_param_type(decl)))
}

pub fn param_type(decl: &FuncDecl, index: usize) -> BoogieType {
    let declared = decl.params.get(index).and_then(|p| p.ty);
    BoogieType::or_default(declared, default_param_type(decl))
}

fn default_param_type(decl: &FuncDecl) -> Type {
    if decl.pure { Type::Bitstring } else { Type::Opaque }
}

pub struct Generator<'a> {
    pub(crate) functions: &'a Functions,
    axioms: &'a [AxiomDecl],
    known_classes: &'a BTreeMap<String, NewExpr>,
    pub(crate) location: &'a Location,
    pub(crate) symbols: SymbolTable,
    pub(crate) constants: Constants,
    pub(crate) classes: Classes,
    pub(crate) methods: Methods,
    pub(crate) out: BoogieWriter,
}

impl<'a> Generator<'a> {
    pub fn new(env: &ProofEnv<'a>) -> Self {
        Self {
            functions: env.functions,
            axioms: env.axioms,
            known_classes: env.classes,
            location: env.location,
            symbols: env.symbols.clone(),
            constants: Constants::default(),
            classes: Classes::default(),
            methods: Methods::default(),
            out: BoogieWriter::new(),
        }
    }

    /// Prelude, global constants, functions and axioms.
    pub fn write_header(&mut self) -> Result<(), CheckError> {
        self.out.write(PRELUDE);
        if !PRELUDE.ends_with('\n') {
            self.out.blank();
        }
        self.write_symbols();
        self.write_functions()?;
        self.write_axioms()
    }

    fn write_symbols(&mut self) {
        for (name, ty) in self.symbols.all_symbols() {
            self.out
                .line(&format!("const {name}:{};", BoogieType::of(ty).name()));
        }
        self.out.blank();
    }

    fn write_functions(&mut self) -> Result<(), CheckError> {
        let functions = self.functions;
        for decl in functions.iter() {
            if decl.pure {
                self.write_pure_function(decl);
            } else if let Some(body) = &decl.body {
                self.write_function_procedure(decl, body)?;
            } else {
                self.write_abstract_function(decl);
            }
            self.out.blank();
        }
        Ok(())
    }

    fn write_pure_function(&mut self, decl: &FuncDecl) {
        let params = decl
            .params
            .iter()
            .enumerate()
            .map(|(i, p)| format!("{}: {}", p.name.node, param_type(decl, i).name()))
            .collect::<Vec<_>>()
            .join(", ");
        self.out.line(&format!(
            "function {}({params}) : {};",
            decl.name.node,
            return_type(decl).name()
        ));
    }

    /// Uninterpreted state transformers standing in for an undefined function.
    fn write_abstract_function(&mut self, decl: &FuncDecl) {
        let name = &decl.name.node;
        let ret = return_type(decl).name();
        let context = if decl.is_static { "" } else { ", ObjectId, Heap" };
        let types: String = (0..decl.params.len())
            .map(|i| format!(", {}", param_type(decl, i).name()))
            .collect();
        let formals: String = (0..decl.params.len())
            .map(|i| format!(", a{i}:{}", param_type(decl, i).name()))
            .collect();
        let actuals: String = (0..decl.params.len()).map(|i| format!(", a{i}")).collect();
        let old_context = if decl.is_static {
            ""
        } else {
            ", internal.objectId, old(heap)"
        };

        let out = &mut self.out;
        out.line(&format!(
            "function {name}#State(FunctionState{context}{types}) : FunctionState;"
        ));
        out.line(&format!(
            "function {name}#Value(FunctionState{context}{types}) : {ret};"
        ));
        if !decl.is_static {
            out.line(&format!(
                "function {name}#Heap(FunctionState{context}{types}) : Heap;"
            ));
        }
        out.line(&format!(
            "procedure {name}(internal.objectId : ObjectId{formals}) returns (r: {ret});"
        ));
        out.line("modifies functionState;");
        if !decl.is_static {
            out.line("modifies heap;");
        }
        out.line(&format!(
            "ensures functionState == {name}#State(old(functionState){old_context}{actuals});"
        ));
        out.line(&format!(
            "ensures r == {name}#Value(old(functionState){old_context}{actuals});"
        ));
        if !decl.is_static {
            out.line(&format!(
                "ensures heap == {name}#Heap(old(functionState){old_context}{actuals});"
            ));
        }
    }

    fn write_function_procedure(&mut self, decl: &FuncDecl, body: &Expr) -> Result<(), CheckError> {
        self.declare_classes(body)?;

        self.symbols.push_frame(FrameKind::Mutable);
        for p in &decl.params {
            self.symbols.add_symbol(&p.name.node, p.ty.unwrap_or(Type::Opaque));
        }
        let converted = ExprConverter::new(self).convert_body(body);
        self.symbols.pop_frame();
        let (value, converted) = converted?;

        let params: String = decl
            .params
            .iter()
            .map(|p| {
                let ty = BoogieType::or_default(p.ty, Type::Opaque);
                format!(", {}: {}", p.name.node, ty.name())
            })
            .collect();
        let ret = return_type(decl);
        let out = &mut self.out;
        out.line(&format!(
            "procedure {{:inline 1}} {}(internal.objectId : ObjectId{params}) returns (result : {})",
            decl.name.node,
            ret.name()
        ));
        out.line("modifies checkpoints;");
        out.line("modifies functionState;");
        out.line("modifies heap; {");
        out.indent();
        converted.locals.write_decls(out);
        out.blank();
        converted.locals.write_defaults(out);
        out.append(&converted.body);
        out.line(&format!("result := {};", value.as_type(ret)?));
        out.dedent();
        out.line("}");
        Ok(())
    }

    fn write_axioms(&mut self) -> Result<(), CheckError> {
        let axioms = self.axioms;
        for axiom in axioms {
            let prop = PropConverter::new(self).convert_bool(&axiom.prop)?;
            self.out.line(&format!("axiom ({prop});"));
        }
        self.out.blank();
        Ok(())
    }

    pub(crate) fn add_checkpoint(&mut self, label: &str) {
        self.constants.add_checkpoint(label, &mut self.out);
    }

    pub(crate) fn intern_expr(&mut self, key: &str) -> String {
        self.constants.intern_expr(key, &mut self.out)
    }

    /// Declares every class constructed and every method invoked in `expr`,
    /// innermost first.
    pub fn declare_classes(&mut self, expr: &Expr) -> Result<(), CheckError> {
        for child in children(expr) {
            self.declare_classes(child)?;
        }
        match &expr.kind {
            ExprKind::Invoke { method, args, .. } => {
                self.declare_target_method(&method.node, args.len());
                Ok(())
            }
            ExprKind::New(new) => self.declare_class(new).map(|_| ()),
            _ => Ok(()),
        }
    }

    /// The identifier of a named class, declaring its template when this
    /// program has not seen it yet.
    pub(crate) fn require_class(&mut self, class: &str) -> Result<String, CheckError> {
        if !self.constants.has_class_id(class) {
            let known_classes = self.known_classes;
            if let Some(template) = known_classes.get(class) {
                self.declare_classes(&Expr::synthetic(ExprKind::New(template.clone())))?;
            }
            self.constants.add_class_id(class, &mut self.out);
        }
        Ok(class.to_string())
    }

    fn declare_class(&mut self, new: &NewExpr) -> Result<String, CheckError> {
        if let Some(existing) = self.classes.get(new) {
            return Ok(existing.to_string());
        }
        let id = match &new.class {
            Some(name) => name.node.clone(),
            None => self.classes.fresh_id(),
        };
        debug!("Declaring class {id}");
        self.constants.add_class_id(&id, &mut self.out);

        let shape = ObjectShape::of(new);
        let procedures = object::write_class(self, &shape, &id)?;

        // Checkpoints labelled inside constructor arguments need constants too.
        for param in &new.params {
            ExprConverter::new(self).convert_body(&param.value)?;
        }

        self.classes.insert(new, &id)?;
        self.constants.add_fields(&shape.fields, &mut self.out);
        self.out.append(&procedures);
        Ok(id)
    }

    /// An abstract procedure for invocations of `method` whose target class
    /// is not known statically.
    pub(crate) fn declare_target_method(&mut self, method: &str, arity: usize) -> String {
        if let Some(existing) = self.methods.get(method) {
            return existing.to_string();
        }
        let name = self.methods.fresh_proc(method);
        let formals: String = (0..arity).map(|i| format!(", a{i}:T")).collect();
        let actuals: String = (0..arity).map(|i| format!(", a{i}")).collect();
        let args = "h: Heap, o: Memory, f : FunctionState, id : ClassId, oid : ObjectId";
        let olds = "old(heap), old(objectMemory), old(functionState), internal.classId, internal.objectId";

        let out = &mut self.out;
        out.line(&format!("function {name}#Heap({args}{formals}): Heap;"));
        out.line(&format!("function {name}#Memory({args}{formals}): Memory;"));
        out.line(&format!("function {name}#Value({args}{formals}): T;"));
        out.line(&format!(
            "function {name}#FunctionState({args}{formals}): FunctionState;"
        ));
        out.line(&format!(
            "procedure {name}(internal.classId : ClassId, internal.objectId : ObjectId{formals}) returns (r: T);"
        ));
        out.line("modifies heap;");
        out.line("modifies objectMemory;");
        out.line("modifies functionState;");
        out.line(&format!("ensures heap == {name}#Heap({olds}{actuals});"));
        out.line(&format!(
            "ensures objectMemory == {name}#Memory({olds}{actuals});"
        ));
        out.line(&format!("ensures r == {name}#Value({olds}{actuals});"));
        out.line(&format!(
            "ensures functionState == {name}#FunctionState({olds}{actuals});"
        ));
        out.line(CLASS_PRESERVED);
        out.blank();
        self.methods.insert(method, name.clone());
        name
    }

    /// Writes `procedure {:inline 1} name(...) returns (internal.r : T)` for
    /// one side of an equivalence.
    pub fn write_side(&mut self, name: &str, expr: &Expr) -> Result<(), CheckError> {
        self.declare_classes(expr)?;
        self.symbols.push_frame(FrameKind::Mutable);
        let converted = ExprConverter::new(self).convert_body(expr);
        self.symbols.pop_frame();
        let (value, converted) = converted?;

        let out = &mut self.out;
        out.line(&format!(
            "procedure {{:inline 1}} {name}(internal.objectId : ObjectId) returns (internal.r : T)"
        ));
        out.line("modifies checkpoints;");
        out.line("modifies functionState;");
        out.line("modifies heap; {");
        out.indent();
        converted.locals.write_decls(out);
        converted.locals.write_defaults(out);
        out.append(&converted.body);
        out.line(&format!("internal.r := {};", value.to_opaque()?));
        out.dedent();
        out.line("}");
        Ok(())
    }

    pub fn finish(self) -> String {
        self.out.finish()
    }
}

/// Body text, locals and checkpoint labels produced by converting code.
#[derive(Debug, Default)]
pub struct Converted {
    pub body: BoogieWriter,
    pub locals: Locals,
    pub checkpoints: std::collections::BTreeSet<String>,
}

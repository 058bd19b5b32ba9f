#![forbid(unsafe_code)]

//! Equivalence of two closed expressions.

use quivela_ast::Expr;
use quivela_core::{CheckError, ProofEnv};

use crate::program::Generator;

/// Runs both sides from the same state; results, heaps and function
/// states must agree.
pub fn equivalence_program(
    env: &ProofEnv<'_>,
    left: &Expr,
    right: &Expr,
) -> Result<String, CheckError> {
    let mut generator = Generator::new(env);
    generator.write_header()?;
    generator.write_side("left", left)?;
    generator.write_side("right", right)?;

    let out = &mut generator.out;
    out.line("procedure both(internal.objectId : ObjectId) returns (internal.r1:T, internal.r2:T, functionState1 : FunctionState, functionState2 : FunctionState)");
    out.line("ensures functionState1==functionState2;");
    out.line("ensures heap1==heap2;");
    out.line("ensures internal.r1==internal.r2;");
    out.line("modifies checkpoints;");
    out.line("modifies functionState;");
    out.line("modifies heap1;");
    out.line("modifies heap2;");
    out.line("modifies heap; {");
    out.indent();
    out.line("var functionState_sav : FunctionState;");
    out.line("var heap_sav : Heap;");
    out.line("functionState_sav := functionState;");
    out.line("heap_sav := heap;");
    out.line("call internal.r1 := left(internal.objectId);");
    out.line("functionState1 := functionState;");
    out.line("heap1 := heap;");
    out.line("functionState := functionState_sav;");
    out.line("heap := heap_sav;");
    out.line("call internal.r2 := right(internal.objectId);");
    out.line("functionState2 := functionState;");
    out.line("heap2 := heap;");
    out.dedent();
    out.line("}");
    out.blank();
    Ok(generator.finish())
}

#[cfg(test)]
mod tests {
    use super::*;
    use quivela_core::{Functions, Location, SymbolTable};
    use quivela_parse::parse_expr;

    #[test]
    fn both_sides_run_from_the_saved_state() {
        let symbols = SymbolTable::new();
        let functions = Functions::new();
        let location = Location::detached("test.qvl");
        let env = ProofEnv::bare(&symbols, &functions, &location);
        let left = parse_expr("1 + 1").unwrap();
        let right = parse_expr("2").unwrap();
        let program = equivalence_program(&env, &left, &right).unwrap();

        assert!(program.contains(
            "procedure {:inline 1} left(internal.objectId : ObjectId) returns (internal.r : T)"
        ));
        assert!(program.contains("\tinternal.r := fromBitstring(fromInt((1+1)));\n"));
        assert!(program.contains("\tinternal.r := fromBitstring(fromInt(2));\n"));
        let both = program.find("procedure both(").unwrap();
        let left_call = program.find("call internal.r1 := left").unwrap();
        let restore = program.find("heap := heap_sav;").unwrap();
        let right_call = program.find("call internal.r2 := right").unwrap();
        assert!(both < left_call && left_call < restore && restore < right_call);
    }
}

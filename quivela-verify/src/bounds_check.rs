#![forbid(unsafe_code)]

use quivela_ast::Bounds;
use quivela_core::{CheckError, ProofEnv};

use crate::bounds::BoundsConverter;
use crate::program::Generator;

/// `actual <= required` over the reals.
pub fn bounds_program(
    env: &ProofEnv<'_>,
    actual: &Bounds,
    required: &Bounds,
) -> Result<String, CheckError> {
    let mut generator = Generator::new(env);
    generator.write_header()?;

    let mut converter = BoundsConverter::new(&mut generator);
    let left = converter.convert_real(actual)?;
    let right = converter.convert_real(required)?;
    let adversaries = std::mem::take(&mut converter.adversaries);

    let out = &mut generator.out;
    for name in &adversaries {
        out.line(&format!("const {name}:real;"));
    }
    if !adversaries.is_empty() {
        out.blank();
    }
    for (name, value) in [("left", &left), ("right", &right)] {
        out.line(&format!(
            "procedure {{:inline 1}} {name}() returns (internal.r : real)"
        ));
        out.line("{");
        out.indent();
        out.line(&format!("internal.r := {value};"));
        out.dedent();
        out.line("}");
    }
    out.line("procedure both() returns (internal.r1:real, internal.r2:real)");
    out.line("ensures internal.r1<=internal.r2;");
    out.line("{");
    out.indent();
    out.line("call internal.r1 := left();");
    out.line("call internal.r2 := right();");
    out.dedent();
    out.line("}");
    out.blank();
    Ok(generator.finish())
}

#[cfg(test)]
mod tests {
    use super::*;
    use quivela_core::{Functions, Location, SymbolTable};
    use quivela_parse::parse_bounds;

    fn program(actual: &str, required: &str) -> String {
        let symbols = SymbolTable::new();
        let functions = Functions::new();
        let location = Location::detached("test.qvl");
        let env = ProofEnv::bare(&symbols, &functions, &location);
        bounds_program(
            &env,
            &parse_bounds(actual).unwrap(),
            &parse_bounds(required).unwrap(),
        )
        .unwrap()
    }

    #[test]
    fn free_names_become_real_constants() {
        let text = program("adv + adv", "2 * adv");
        assert_eq!(text.matches("const adv:real;").count(), 1);
        assert!(text.contains("internal.r := (adv+adv);"));
        assert!(text.contains("internal.r := (real(2)*adv);"));
        assert!(text.contains("ensures internal.r1<=internal.r2;"));
    }

    #[test]
    fn division_and_powers_are_real() {
        let text = program("1 / 2", "2 ^ 3");
        assert!(text.contains("internal.r := (real(1)/real(2));"));
        assert!(text.contains("internal.r := real_pow(real(2),real(3));"));
    }
}

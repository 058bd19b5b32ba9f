#![forbid(unsafe_code)]

use std::collections::BTreeMap;

use quivela_ast::{AxiomDecl, BisimProp, Bounds, Expr, NewExpr};
use quivela_parse::{format_bounds, format_expr};

use crate::context::{Context, Functions};
use crate::error::{CheckError, Location};
use crate::symbols::SymbolTable;

static NO_CLASSES: BTreeMap<String, NewExpr> = BTreeMap::new();

/// What a proof step may refer to when it is handed to a backend.
pub struct ProofEnv<'a> {
    pub symbols: &'a SymbolTable,
    pub functions: &'a Functions,
    pub axioms: &'a [AxiomDecl],
    pub classes: &'a BTreeMap<String, NewExpr>,
    pub location: &'a Location,
}

impl<'a> ProofEnv<'a> {
    pub fn new(symbols: &'a SymbolTable, context: &'a Context, location: &'a Location) -> Self {
        Self {
            symbols,
            functions: &context.functions,
            axioms: &context.axioms,
            classes: &context.classes,
            location,
        }
    }

    /// An environment without axioms or class templates.
    pub fn bare(symbols: &'a SymbolTable, functions: &'a Functions, location: &'a Location) -> Self {
        Self {
            symbols,
            functions,
            axioms: &[],
            classes: &NO_CLASSES,
            location,
        }
    }
}

/// Discharges the obligations the checker cannot decide syntactically.
pub trait ProofBackend {
    /// Both programs produce the same result.
    fn auto(
        &mut self,
        env: &ProofEnv<'_>,
        left: &Expr,
        right: &Expr,
        message: &str,
    ) -> Result<(), CheckError>;

    /// `actual <= required` as real numbers.
    fn bounds(
        &mut self,
        env: &ProofEnv<'_>,
        actual: &Bounds,
        required: &Bounds,
    ) -> Result<(), CheckError>;

    /// The objects are bisimilar under the supplied invariants, or under
    /// field-by-field equality when no `bisim` block was given.
    fn bisim(
        &mut self,
        env: &ProofEnv<'_>,
        left: &NewExpr,
        right: &NewExpr,
        props: Option<&[BisimProp]>,
    ) -> Result<(), CheckError>;
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ProofRequest {
    Auto {
        left: String,
        right: String,
        message: String,
        location: String,
    },
    Bounds {
        actual: String,
        required: String,
        location: String,
    },
    Bisim {
        left: String,
        right: String,
        props: Option<usize>,
        location: String,
    },
}

/// Accepts every request and remembers it.
#[derive(Debug, Default)]
pub struct RecordingBackend {
    pub requests: Vec<ProofRequest>,
}

impl RecordingBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ProofBackend for RecordingBackend {
    fn auto(
        &mut self,
        env: &ProofEnv<'_>,
        left: &Expr,
        right: &Expr,
        message: &str,
    ) -> Result<(), CheckError> {
        self.requests.push(ProofRequest::Auto {
            left: format_expr(left),
            right: format_expr(right),
            message: message.to_string(),
            location: env.location.to_string(),
        });
        Ok(())
    }

    fn bounds(
        &mut self,
        env: &ProofEnv<'_>,
        actual: &Bounds,
        required: &Bounds,
    ) -> Result<(), CheckError> {
        self.requests.push(ProofRequest::Bounds {
            actual: format_bounds(actual),
            required: format_bounds(required),
            location: env.location.to_string(),
        });
        Ok(())
    }

    fn bisim(
        &mut self,
        env: &ProofEnv<'_>,
        left: &NewExpr,
        right: &NewExpr,
        props: Option<&[BisimProp]>,
    ) -> Result<(), CheckError> {
        self.requests.push(ProofRequest::Bisim {
            left: format_expr(&Expr::synthetic(quivela_ast::ExprKind::New(left.clone()))),
            right: format_expr(&Expr::synthetic(quivela_ast::ExprKind::New(right.clone()))),
            props: props.map(<[_]>::len),
            location: env.location.to_string(),
        });
        Ok(())
    }
}

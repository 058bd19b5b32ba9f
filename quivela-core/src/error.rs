#![forbid(unsafe_code)]
#![allow(unused_assignments)]

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use miette::{Diagnostic, NamedSource};
use quivela_ast::{span, Span};
use thiserror::Error;

/// A source file taking part in a check run.
#[derive(Clone, Debug)]
pub struct SourceFile {
    pub path: PathBuf,
    pub text: Arc<str>,
}

impl SourceFile {
    pub fn new(path: impl Into<PathBuf>, text: impl Into<Arc<str>>) -> Self {
        Self {
            path: path.into(),
            text: text.into(),
        }
    }

    pub fn name(&self) -> String {
        self.path.display().to_string()
    }

    pub fn locate(&self, span: Span) -> Location {
        Location::new(self, span)
    }
}

/// A resolved position in a source file. Lines and columns are 1-based.
#[derive(Clone, Debug)]
pub struct Location {
    pub file: String,
    pub line: usize,
    pub column: usize,
    pub span: Span,
    text: Arc<str>,
}

impl Location {
    pub fn new(file: &SourceFile, span: Span) -> Self {
        let offset = span.offset().min(file.text.len());
        let before = &file.text[..offset];
        let line = before.matches('\n').count() + 1;
        let column = match before.rfind('\n') {
            Some(nl) => offset - nl,
            None => offset + 1,
        };
        Self {
            file: file.name(),
            line,
            column,
            span,
            text: file.text.clone(),
        }
    }

    /// Location for work that did not come from a file.
    pub fn detached(name: impl Into<String>) -> Self {
        Self {
            file: name.into(),
            line: 1,
            column: 1,
            span: span(0, 0),
            text: Arc::from(""),
        }
    }

    pub fn error(&self, message: impl Into<String>) -> CheckError {
        CheckError::Located {
            file: self.file.clone(),
            line: self.line,
            column: self.column,
            message: message.into(),
            span: self.span,
            source_code: NamedSource::new(&self.file, self.text.to_string()),
        }
    }

    pub fn file_name(&self) -> &str {
        Path::new(&self.file)
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or(&self.file)
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({}:{})", self.file_name(), self.line, self.column)
    }
}

#[derive(Debug, Error, Diagnostic)]
pub enum CheckError {
    #[error("error at {file}({line},{column}):\n{message}")]
    #[diagnostic(code(quivela::check))]
    Located {
        file: String,
        line: usize,
        column: usize,
        message: String,
        #[label]
        span: Span,
        #[source_code]
        source_code: NamedSource<String>,
    },

    #[error("internal error: {0}")]
    #[diagnostic(code(quivela::internal))]
    Internal(String),

    #[error("I/O error: {0}")]
    #[diagnostic(code(quivela::io))]
    Io(#[from] std::io::Error),
}

impl CheckError {
    pub fn internal(message: impl Into<String>) -> Self {
        CheckError::Internal(message.into())
    }

    /// The message without its location prefix.
    pub fn message(&self) -> String {
        match self {
            CheckError::Located { message, .. } => message.clone(),
            CheckError::Internal(message) => message.clone(),
            CheckError::Io(err) => err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn location_counts_lines_and_columns_from_one() {
        let file = SourceFile::new("dir/a.qvl", "const x;\n  const y;\n");
        let loc = file.locate(span(17, 1));
        assert_eq!((loc.line, loc.column), (2, 9));
        assert_eq!(loc.to_string(), "a.qvl(2:9)");
    }

    #[test]
    fn located_error_renders_path_line_and_column() {
        let file = SourceFile::new("a.qvl", "x");
        let err = file.locate(span(0, 1)).error("x not declared.");
        assert_eq!(err.to_string(), "error at a.qvl(1,1):\nx not declared.");
        assert_eq!(err.message(), "x not declared.");
    }
}

//! Diagnostic collection.
//!
//! Resolution reports through the [`DiagnosticSink`] contract; [`Diagnostics`]
//! is the collecting implementation used by the driver and the tests.
//!
//! ```
//! use sable_core::{CompilationError, Diagnostics, DiagnosticSink, Span};
//!
//! let mut diagnostics = Diagnostics::new();
//! let err = CompilationError::NegativeArraySize { span: Span::new(4, 9, 2) };
//! diagnostics.error(&err);
//!
//! assert!(diagnostics.has_errors());
//! assert_eq!(diagnostics.errors().next().map(|d| d.code), Some(248));
//! ```

use std::fmt;

use crate::{CompilationError, Span, Warning};

/// How serious a diagnostic is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    Info,
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Error => "error",
        })
    }
}

/// A single reported message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub code: u16,
    pub severity: Severity,
    pub span: Span,
    pub message: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} CS{:04}: {}",
            self.span, self.severity, self.code, self.message
        )
    }
}

/// Receiver of diagnostics for one compilation run.
pub trait DiagnosticSink {
    fn report(&mut self, code: u16, severity: Severity, span: Span, message: &str);

    /// Report a resolution error.
    fn error(&mut self, err: &CompilationError) {
        let text = err.to_string();
        let message = strip_location(&text, err.span());
        self.report(err.code(), Severity::Error, err.span(), message);
    }

    /// Report a warning.
    fn warning(&mut self, warning: &Warning) {
        let text = warning.to_string();
        let message = strip_location(&text, warning.span());
        self.report(warning.code(), Severity::Warning, warning.span(), message);
    }
}

/// Error and warning messages begin with `at {span}: `; the sink carries the
/// span separately.
fn strip_location(text: &str, span: Span) -> &str {
    text.strip_prefix(&format!("at {span}: ")).unwrap_or(text)
}

/// Collects diagnostics in report order.
#[derive(Debug, Clone, Default)]
pub struct Diagnostics {
    items: Vec<Diagnostic>,
    error_count: usize,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has_errors(&self) -> bool {
        self.error_count > 0
    }

    pub fn error_count(&self) -> usize {
        self.error_count
    }

    pub fn warning_count(&self) -> usize {
        self.warnings().count()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.items.iter()
    }

    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.items
            .iter()
            .filter(|d| d.severity == Severity::Error)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Diagnostic> {
        self.items
            .iter()
            .filter(|d| d.severity == Severity::Warning)
    }

    /// Codes of every diagnostic, in report order.
    pub fn codes(&self) -> Vec<u16> {
        self.items.iter().map(|d| d.code).collect()
    }

    /// Whether a diagnostic with this code was reported.
    pub fn contains(&self, code: u16) -> bool {
        self.items.iter().any(|d| d.code == code)
    }

    pub fn clear(&mut self) {
        self.items.clear();
        self.error_count = 0;
    }
}

impl DiagnosticSink for Diagnostics {
    fn report(&mut self, code: u16, severity: Severity, span: Span, message: &str) {
        if severity == Severity::Error {
            self.error_count += 1;
        }
        self.items.push(Diagnostic {
            code,
            severity,
            span,
            message: message.to_string(),
        });
    }
}

impl fmt::Display for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for item in &self.items {
            writeln!(f, "{item}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_errors_and_warnings_separately() {
        let mut diagnostics = Diagnostics::new();
        diagnostics.warning(&Warning::SelfComparison {
            span: Span::new(1, 1, 5),
        });
        diagnostics.error(&CompilationError::ThisUnavailable {
            span: Span::new(2, 1, 4),
        });

        assert!(diagnostics.has_errors());
        assert_eq!(diagnostics.error_count(), 1);
        assert_eq!(diagnostics.warning_count(), 1);
        assert_eq!(diagnostics.codes(), vec![1718, 27]);
    }

    #[test]
    fn warnings_alone_are_not_errors() {
        let mut diagnostics = Diagnostics::new();
        diagnostics.warning(&Warning::UnreachableExpression {
            span: Span::new(1, 1, 1),
        });
        assert!(!diagnostics.has_errors());
        assert!(diagnostics.contains(429));
    }

    #[test]
    fn reported_message_drops_location_prefix() {
        let mut diagnostics = Diagnostics::new();
        diagnostics.error(&CompilationError::NegativeArraySize {
            span: Span::new(4, 9, 2),
        });
        let item = diagnostics.iter().next().map(|d| d.message.clone());
        assert_eq!(item.as_deref(), Some("cannot create an array with a negative size"));
    }

    #[test]
    fn display_includes_code_and_location() {
        let mut diagnostics = Diagnostics::new();
        diagnostics.report(22, Severity::Error, Span::new(3, 7, 1), "wrong index count");
        assert_eq!(diagnostics.to_string(), "3:7: error CS0022: wrong index count\n");
    }

    #[test]
    fn clear_resets_error_state() {
        let mut diagnostics = Diagnostics::new();
        diagnostics.report(1, Severity::Error, Span::default(), "x");
        diagnostics.clear();
        assert!(diagnostics.is_empty());
        assert!(!diagnostics.has_errors());
    }
}

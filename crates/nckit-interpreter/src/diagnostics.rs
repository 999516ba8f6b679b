//! Per-line diagnostics collected while processing a program

use nckit_core::{JobError, LexError, ParseError, SimulationError};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Stage that produced a diagnostic
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiagnosticKind {
    Lex,
    Parse,
    Simulation,
    Cancellation,
    Io,
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiagnosticKind::Lex => write!(f, "lex"),
            DiagnosticKind::Parse => write!(f, "parse"),
            DiagnosticKind::Simulation => write!(f, "simulation"),
            DiagnosticKind::Cancellation => write!(f, "cancellation"),
            DiagnosticKind::Io => write!(f, "io"),
        }
    }
}

/// Diagnostic severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Warning => write!(f, "warning"),
            Severity::Error => write!(f, "error"),
        }
    }
}

/// One reported problem
///
/// `line` is the 0-based source line, absent for problems that concern the
/// whole program (unreadable file, cancelled run).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub line: Option<usize>,
    pub kind: DiagnosticKind,
    pub severity: Severity,
    pub message: String,
}

impl Diagnostic {
    pub fn new(
        line: Option<usize>,
        kind: DiagnosticKind,
        severity: Severity,
        message: impl Into<String>,
    ) -> Self {
        Self {
            line,
            kind,
            severity,
            message: message.into(),
        }
    }

    pub fn lex(line: usize, err: &LexError) -> Self {
        Self::new(Some(line), DiagnosticKind::Lex, Severity::Error, err.to_string())
    }

    /// Lex errors wrapped in a `ParseError` keep their lex kind
    pub fn parse(line: usize, err: &ParseError) -> Self {
        match err {
            ParseError::Lex(lex) => Self::lex(line, lex),
            other => Self::new(
                Some(line),
                DiagnosticKind::Parse,
                Severity::Error,
                other.to_string(),
            ),
        }
    }

    pub fn parse_warning(line: usize, message: impl Into<String>) -> Self {
        Self::new(Some(line), DiagnosticKind::Parse, Severity::Warning, message)
    }

    pub fn simulation(line: usize, err: &SimulationError) -> Self {
        Self::new(
            Some(line),
            DiagnosticKind::Simulation,
            Severity::Error,
            err.to_string(),
        )
    }

    pub fn simulation_warning(line: usize, message: impl Into<String>) -> Self {
        Self::new(
            Some(line),
            DiagnosticKind::Simulation,
            Severity::Warning,
            message,
        )
    }

    /// Program-level diagnostic for a failed job
    pub fn job(err: &JobError) -> Self {
        let kind = match err {
            JobError::Unreadable { .. } => DiagnosticKind::Io,
            _ => DiagnosticKind::Cancellation,
        };
        Self::new(None, kind, Severity::Error, err.to_string())
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.line {
            // 1-based for people reading it
            Some(line) => write!(
                f,
                "line {}: {} {}: {}",
                line + 1,
                self.kind,
                self.severity,
                self.message
            ),
            None => write!(f, "{} {}: {}", self.kind, self.severity, self.message),
        }
    }
}

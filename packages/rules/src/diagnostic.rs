use serde::{Deserialize, Serialize};
use std::ops::Range;

/// Severity level of a diagnostic
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DiagnosticLevel {
    Error,
    Warning,
    Info,
}

/// A complaint about a literal or parameter that did not stop evaluation
///
/// Rule outcomes never change because of a diagnostic; they are the side channel
/// that tells an ERROR literal apart from one that legitimately did not hold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub level: DiagnosticLevel,

    /// Rule the subject belongs to, once known
    pub rule: Option<String>,

    /// The literal or parameter path the diagnostic is about
    pub subject: String,

    pub message: String,

    /// Byte range inside `subject`
    pub span: Option<Range<usize>>,

    pub suggestion: Option<String>,
}

impl Diagnostic {
    pub fn error(subject: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(DiagnosticLevel::Error, subject, message)
    }

    pub fn warning(subject: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(DiagnosticLevel::Warning, subject, message)
    }

    fn new(level: DiagnosticLevel, subject: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            level,
            rule: None,
            subject: subject.into(),
            message: message.into(),
            span: None,
            suggestion: None,
        }
    }

    pub fn with_span(mut self, span: Option<Range<usize>>) -> Self {
        self.span = span;
        self
    }

    pub fn with_rule(mut self, rule: impl Into<String>) -> Self {
        self.rule = Some(rule.into());
        self
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }
}

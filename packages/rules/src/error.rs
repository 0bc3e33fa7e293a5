//! Error types for the rule language and rule files

use std::ops::Range;
use thiserror::Error;
use xsdedit_dom::DomError;

/// Result type for parsing a literal
pub type ParseResult<T> = Result<T, ParseError>;

#[derive(Debug, Clone, PartialEq, Error)]
#[error("Lexer error at {span:?}: {message}")]
pub struct LexError {
    pub span: Range<usize>,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseError {
    #[error("Unexpected token at {span:?}: expected {expected}, found {found}")]
    UnexpectedToken {
        span: Range<usize>,
        expected: String,
        found: String,
    },

    #[error("Unexpected end of input: expected {expected}")]
    UnexpectedEof { expected: String },

    #[error("Invalid syntax at {span:?}: {message}")]
    InvalidSyntax { span: Range<usize>, message: String },

    #[error(transparent)]
    Lex(#[from] LexError),
}

impl ParseError {
    pub fn span(&self) -> Option<Range<usize>> {
        match self {
            ParseError::UnexpectedToken { span, .. } => Some(span.clone()),
            ParseError::UnexpectedEof { .. } => None,
            ParseError::InvalidSyntax { span, .. } => Some(span.clone()),
            ParseError::Lex(error) => Some(error.span.clone()),
        }
    }
}

/// Reasons a parsed literal cannot produce a value
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvalError {
    #[error("{operation} cannot take {found}")]
    OperandKind {
        operation: &'static str,
        found: &'static str,
    },

    #[error("{function} takes {expected} argument(s), got {found}")]
    Arity {
        function: &'static str,
        expected: usize,
        found: usize,
    },

    #[error("{function} is missing argument {position}")]
    MissingArgument {
        function: &'static str,
        position: usize,
    },

    #[error("Literal did not reduce to a boolean (got {found})")]
    NotBoolean { found: &'static str },
}

/// Problems in a rule definition document
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RuleFileError {
    #[error(transparent)]
    Xml(#[from] DomError),

    #[error("Root element must be <edlRules>, found <{0}>")]
    UnexpectedRoot(String),

    #[error("Rule is missing the ruleID attribute")]
    MissingRuleId,

    #[error("Rule '{rule}': {message}")]
    Malformed { rule: String, message: String },
}

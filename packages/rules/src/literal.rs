use crate::diagnostic::Diagnostic;
use crate::error::{EvalError, LexError, ParseError};
use crate::evaluator::{evaluate, Value};
use crate::parser::parse;
use crate::tokenizer::{tokenize, Token};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::ops::Range;
use tracing::trace;

/// Three-valued result of a literal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LiteralValue {
    True,
    False,
    /// The literal could not be reduced to a single boolean
    Error,
}

impl LiteralValue {
    pub fn is_true(self) -> bool {
        self == LiteralValue::True
    }
}

impl From<bool> for LiteralValue {
    fn from(value: bool) -> Self {
        if value {
            LiteralValue::True
        } else {
            LiteralValue::False
        }
    }
}

impl fmt::Display for LiteralValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LiteralValue::True => write!(f, "TRUE"),
            LiteralValue::False => write!(f, "FALSE"),
            LiteralValue::Error => write!(f, "ERROR"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LiteralOutcome {
    pub value: LiteralValue,
    pub diagnostics: Vec<Diagnostic>,
}

/// One infix expression of a rule, tokenized once on construction
#[derive(Debug, Clone)]
pub struct Literal {
    source: String,
    tokens: Result<Vec<(Token, Range<usize>)>, LexError>,
}

impl Literal {
    pub fn new(source: impl Into<String>) -> Self {
        let source = source.into();
        let tokens = tokenize(&source);
        Self { source, tokens }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Words that are neither function names nor part of a string
    pub fn parameter_names(&self) -> Vec<&str> {
        let Ok(tokens) = &self.tokens else {
            return Vec::new();
        };
        tokens
            .iter()
            .filter_map(|(token, _)| match token {
                Token::Word(word) if crate::ast::Function::from_name(word).is_none() => {
                    Some(word.as_str())
                }
                _ => None,
            })
            .collect()
    }

    /// Evaluate against parameter values keyed by parameter id
    pub fn evaluate(&self, values: &HashMap<String, String>) -> LiteralOutcome {
        let result = match &self.tokens {
            Ok(tokens) => parse(tokens, values)
                .map_err(Failure::Parse)
                .and_then(|expr| evaluate(&expr).map_err(Failure::Eval)),
            Err(error) => Err(Failure::Parse(ParseError::Lex(error.clone()))),
        };

        let outcome = match result {
            Ok(Value::Boolean(holds)) => LiteralOutcome {
                value: holds.into(),
                diagnostics: Vec::new(),
            },
            Ok(other) => self.error(
                EvalError::NotBoolean {
                    found: other.kind_name(),
                }
                .to_string(),
                None,
            ),
            Err(Failure::Parse(error)) => self.error(error.to_string(), error.span()),
            Err(Failure::Eval(error)) => self.error(error.to_string(), None),
        };
        trace!(literal = %self.source, value = %outcome.value, "literal evaluated");
        outcome
    }

    fn error(&self, message: String, span: Option<Range<usize>>) -> LiteralOutcome {
        LiteralOutcome {
            value: LiteralValue::Error,
            diagnostics: vec![Diagnostic::error(&self.source, message).with_span(span)],
        }
    }
}

enum Failure {
    Parse(ParseError),
    Eval(EvalError),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn values(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_bigger_than() {
        let literal = Literal::new("edlValidation_biggerThan(A,5)");
        assert_eq!(literal.evaluate(&values(&[("A", "7")])).value, LiteralValue::True);
        assert_eq!(literal.evaluate(&values(&[("A", "3")])).value, LiteralValue::False);

        let unresolved = literal.evaluate(&values(&[]));
        assert_eq!(unresolved.value, LiteralValue::Error);
        assert_eq!(unresolved.diagnostics.len(), 1);
    }

    #[test]
    fn test_non_boolean_result_is_error() {
        let outcome = Literal::new("A + 1").evaluate(&values(&[("A", "1")]));
        assert_eq!(outcome.value, LiteralValue::Error);
        assert!(outcome.diagnostics[0].message.contains("number"));
    }

    #[test]
    fn test_lex_error_is_reported_once_per_evaluation() {
        let literal = Literal::new("A = 5");
        let outcome = literal.evaluate(&values(&[("A", "5")]));
        assert_eq!(outcome.value, LiteralValue::Error);
        assert!(outcome.diagnostics[0].span.is_some());
    }

    #[test]
    fn test_parameter_names() {
        let literal = Literal::new("edlValidation_strIsEqual(mode, 'x') ");
        assert_eq!(literal.parameter_names(), vec!["mode"]);
    }
}

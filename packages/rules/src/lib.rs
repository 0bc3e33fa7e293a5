//! # Rules
//!
//! Cross-field business rules checked against a live document.
//!
//! A rule names parameters (dotted references into the document), a premise and
//! a conclusion, both conjunctions of [`Literal`]s. Literals are small infix
//! expressions over parameters, numbers and strings, arithmetic, `==` and the
//! `edlValidation_*` predicates. A literal evaluates to TRUE, FALSE or ERROR and
//! a rule whose premise is not TRUE holds.

pub mod ast;
mod diagnostic;
mod error;
pub mod evaluator;
mod literal;
mod parameter;
pub mod parser;
mod rule;
mod rule_set;
pub mod tokenizer;

pub use diagnostic::{Diagnostic, DiagnosticLevel};
pub use error::{EvalError, LexError, ParseError, ParseResult, RuleFileError};
pub use literal::{Literal, LiteralOutcome, LiteralValue};
pub use parameter::{ParameterKind, ResolvedParameter, RuleParameter, ValueSource};
pub use rule::{ResolutionSignal, Rule, RuleEvaluation, RuleId, SubscriptionId};
pub use rule_set::RuleSet;

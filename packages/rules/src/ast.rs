use serde::{Deserialize, Serialize};
use std::fmt;

/// A literal parsed into an expression tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expression {
    /// Number literal
    Number(f64),

    /// Quoted string literal
    Text(String),

    /// Resolved parameter value, still untyped text
    Parameter(String),

    /// Unary minus
    Negate(Box<Expression>),

    Binary {
        left: Box<Expression>,
        operator: BinaryOp,
        right: Box<Expression>,
    },

    /// Predicate call; `None` marks an empty argument slot such as in `f(, 5)`
    Call {
        function: Function,
        arguments: Vec<Option<Expression>>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinaryOp {
    Add,
    Subtract,
    Multiply,
    Divide,
    Equals,
}

impl BinaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Subtract => "-",
            BinaryOp::Multiply => "*",
            BinaryOp::Divide => "/",
            BinaryOp::Equals => "==",
        }
    }
}

/// The built-in predicate functions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Function {
    BiggerThan,
    LowerThan,
    EqualOrBiggerThan,
    EqualOrLowerThan,
    Exists,
    StrIsEqual,
}

impl Function {
    pub const ALL: [Function; 6] = [
        Function::BiggerThan,
        Function::LowerThan,
        Function::EqualOrBiggerThan,
        Function::EqualOrLowerThan,
        Function::Exists,
        Function::StrIsEqual,
    ];

    /// The name rule files call the function by
    pub fn name(self) -> &'static str {
        match self {
            Function::BiggerThan => "edlValidation_biggerThan",
            Function::LowerThan => "edlValidation_lowerThan",
            Function::EqualOrBiggerThan => "edlValidation_equalOrBiggerThan",
            Function::EqualOrLowerThan => "edlValidation_equalOrLowerThan",
            Function::Exists => "edlValidation_exists",
            Function::StrIsEqual => "edlValidation_strIsEqual",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|function| function.name() == name)
    }
}

impl fmt::Display for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

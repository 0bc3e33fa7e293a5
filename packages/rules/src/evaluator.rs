//! Functional evaluation of a parsed literal

use crate::ast::{BinaryOp, Expression, Function};
use crate::error::EvalError;
use tracing::trace;

/// Intermediate result of evaluating an expression
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Number(f64),
    Text(String),
    /// A parameter value; numeric or textual depending on where it is used
    Parameter(String),
    Boolean(bool),
}

impl Value {
    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Number(_) => "number",
            Value::Text(_) => "string",
            Value::Parameter(_) => "parameter",
            Value::Boolean(_) => "boolean",
        }
    }

    /// Numeric reading for arithmetic; text that does not parse gives `None`
    fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            Value::Text(s) | Value::Parameter(s) => s.trim().parse().ok(),
            Value::Boolean(_) => None,
        }
    }
}

pub fn evaluate(expr: &Expression) -> Result<Value, EvalError> {
    let value = match expr {
        Expression::Number(n) => Value::Number(*n),
        Expression::Text(s) => Value::Text(s.clone()),
        Expression::Parameter(s) => Value::Parameter(s.clone()),
        Expression::Negate(operand) => negate(evaluate(operand)?)?,
        Expression::Binary {
            left,
            operator,
            right,
        } => binary(evaluate(left)?, *operator, evaluate(right)?)?,
        Expression::Call {
            function,
            arguments,
        } => call(*function, arguments)?,
    };
    trace!(value = ?value, "evaluated");
    Ok(value)
}

fn negate(value: Value) -> Result<Value, EvalError> {
    match value {
        Value::Number(n) => Ok(Value::Number(-n)),
        Value::Parameter(s) => Ok(match s.trim().parse::<f64>() {
            Ok(n) => Value::Number(-n),
            Err(_) => Value::Boolean(false),
        }),
        other => Err(EvalError::OperandKind {
            operation: "unary -",
            found: other.kind_name(),
        }),
    }
}

fn binary(left: Value, operator: BinaryOp, right: Value) -> Result<Value, EvalError> {
    if operator == BinaryOp::Equals {
        let (a, b) = match (numeric_operand("==", &left)?, numeric_operand("==", &right)?) {
            (Some(a), Some(b)) => (a, b),
            _ => return Ok(Value::Boolean(false)),
        };
        return Ok(Value::Boolean(a == b));
    }

    let (a, b) = match (left.as_number(), right.as_number()) {
        (Some(a), Some(b)) => (a, b),
        _ => return Ok(Value::Boolean(false)),
    };
    Ok(Value::Number(match operator {
        BinaryOp::Add => a + b,
        BinaryOp::Subtract => a - b,
        BinaryOp::Multiply => a * b,
        BinaryOp::Divide => a / b,
        BinaryOp::Equals => unreachable!("handled above"),
    }))
}

/// Operand of a comparison: only numbers and parameters qualify.
/// A parameter that is not numeric reads as `None`.
fn numeric_operand(operation: &'static str, value: &Value) -> Result<Option<f64>, EvalError> {
    match value {
        Value::Number(n) => Ok(Some(*n)),
        Value::Parameter(s) => Ok(s.trim().parse().ok()),
        other => Err(EvalError::OperandKind {
            operation,
            found: other.kind_name(),
        }),
    }
}

fn textual_operand(operation: &'static str, value: &Value) -> Result<String, EvalError> {
    match value {
        Value::Text(s) | Value::Parameter(s) => Ok(s.clone()),
        other => Err(EvalError::OperandKind {
            operation,
            found: other.kind_name(),
        }),
    }
}

fn call(function: Function, arguments: &[Option<Expression>]) -> Result<Value, EvalError> {
    let name = function.name();

    if function == Function::Exists {
        return match arguments {
            [] | [None] => Ok(Value::Boolean(false)),
            [Some(argument)] => match evaluate(argument)? {
                Value::Boolean(_) => Err(EvalError::OperandKind {
                    operation: name,
                    found: "boolean",
                }),
                _ => Ok(Value::Boolean(true)),
            },
            _ => Err(EvalError::Arity {
                function: name,
                expected: 1,
                found: arguments.len(),
            }),
        };
    }

    let (left, right) = match arguments {
        [left, right] => (left, right),
        _ => {
            return Err(EvalError::Arity {
                function: name,
                expected: 2,
                found: arguments.len(),
            })
        }
    };
    let left = left.as_ref().ok_or(EvalError::MissingArgument {
        function: name,
        position: 1,
    })?;
    let right = right.as_ref().ok_or(EvalError::MissingArgument {
        function: name,
        position: 2,
    })?;
    let (left, right) = (evaluate(left)?, evaluate(right)?);

    if function == Function::StrIsEqual {
        let a = textual_operand(name, &left)?;
        let b = textual_operand(name, &right)?;
        return Ok(Value::Boolean(a == b));
    }

    let (a, b) = match (numeric_operand(name, &left)?, numeric_operand(name, &right)?) {
        (Some(a), Some(b)) => (a, b),
        _ => return Ok(Value::Boolean(false)),
    };
    let holds = match function {
        Function::BiggerThan => a > b,
        Function::LowerThan => a < b,
        Function::EqualOrBiggerThan => a >= b,
        Function::EqualOrLowerThan => a <= b,
        Function::Exists | Function::StrIsEqual => unreachable!("handled above"),
    };
    Ok(Value::Boolean(holds))
}

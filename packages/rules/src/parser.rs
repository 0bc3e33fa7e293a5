use crate::ast::{BinaryOp, Expression, Function};
use crate::error::{ParseError, ParseResult};
use crate::tokenizer::Token;
use std::collections::HashMap;
use std::ops::Range;

/// Parser for one literal, run against a fixed set of parameter values
///
/// Words that are not function names are parameter references. A reference with
/// no value is removed from the token stream before parsing starts, so
/// `biggerThan(A, 5)` with `A` unresolved parses as `biggerThan(, 5)`.
pub struct Parser<'a> {
    tokens: Vec<(Token, Range<usize>)>,
    pos: usize,
    values: &'a HashMap<String, String>,
}

impl<'a> Parser<'a> {
    pub fn new(tokens: &[(Token, Range<usize>)], values: &'a HashMap<String, String>) -> Self {
        let tokens = tokens
            .iter()
            .filter(|(token, _)| match token {
                Token::Word(word) => {
                    Function::from_name(word).is_some() || values.contains_key(word)
                }
                _ => true,
            })
            .cloned()
            .collect();
        Self {
            tokens,
            pos: 0,
            values,
        }
    }

    /// Parse the whole token stream as a single expression
    pub fn parse_literal(&mut self) -> ParseResult<Expression> {
        if self.is_at_end() {
            return Err(ParseError::UnexpectedEof {
                expected: "expression".to_string(),
            });
        }

        let expr = self.parse_expression()?;

        if !self.is_at_end() {
            return Err(ParseError::UnexpectedToken {
                span: self.peek_span(),
                expected: "end of literal".to_string(),
                found: Self::format_token(self.peek()),
            });
        }

        Ok(expr)
    }

    fn parse_expression(&mut self) -> ParseResult<Expression> {
        self.parse_equality_expression()
    }

    /// Parse equality (==); it does not chain
    fn parse_equality_expression(&mut self) -> ParseResult<Expression> {
        let left = self.parse_additive_expression()?;

        if self.match_token(Token::EqEq) {
            let right = self.parse_additive_expression()?;
            return Ok(Expression::Binary {
                left: Box::new(left),
                operator: BinaryOp::Equals,
                right: Box::new(right),
            });
        }

        Ok(left)
    }

    fn parse_additive_expression(&mut self) -> ParseResult<Expression> {
        let mut left = self.parse_multiplicative_expression()?;

        while let Some(op) = self.match_additive_op() {
            let right = self.parse_multiplicative_expression()?;
            left = Expression::Binary {
                left: Box::new(left),
                operator: op,
                right: Box::new(right),
            };
        }

        Ok(left)
    }

    fn parse_multiplicative_expression(&mut self) -> ParseResult<Expression> {
        let mut left = self.parse_unary_expression()?;

        while let Some(op) = self.match_multiplicative_op() {
            let right = self.parse_unary_expression()?;
            left = Expression::Binary {
                left: Box::new(left),
                operator: op,
                right: Box::new(right),
            };
        }

        Ok(left)
    }

    fn parse_unary_expression(&mut self) -> ParseResult<Expression> {
        if self.match_token(Token::Minus) {
            let operand = self.parse_unary_expression()?;
            return Ok(Expression::Negate(Box::new(operand)));
        }
        self.parse_primary_expression()
    }

    fn parse_primary_expression(&mut self) -> ParseResult<Expression> {
        match self.peek() {
            Some((Token::Number(n), span)) => {
                let value = n.parse::<f64>().map_err(|_| ParseError::InvalidSyntax {
                    span: span.clone(),
                    message: format!("'{}' is not a number", n),
                })?;
                self.advance();
                Ok(Expression::Number(value))
            }
            Some((Token::String(s), _)) => {
                let value = s.clone();
                self.advance();
                Ok(Expression::Text(value))
            }
            Some((Token::Word(word), span)) => {
                let span = span.clone();
                if let Some(function) = Function::from_name(word) {
                    self.advance();
                    return self.parse_function_call(function);
                }
                let value = self.values.get(word).cloned().ok_or_else(|| {
                    ParseError::InvalidSyntax {
                        span,
                        message: format!("parameter '{}' has no value", word),
                    }
                })?;
                self.advance();
                Ok(Expression::Parameter(value))
            }
            Some((Token::LParen, _)) => {
                self.advance();
                let expr = self.parse_expression()?;
                self.expect(Token::RParen)?;
                Ok(expr)
            }
            None => Err(ParseError::UnexpectedEof {
                expected: "expression".to_string(),
            }),
            _ => Err(ParseError::UnexpectedToken {
                span: self.peek_span(),
                expected: "expression".to_string(),
                found: Self::format_token(self.peek()),
            }),
        }
    }

    /// Parse `(arg, arg)` after a function name; empty slots become `None`
    fn parse_function_call(&mut self, function: Function) -> ParseResult<Expression> {
        self.expect(Token::LParen)?;

        let mut arguments = Vec::new();
        if !self.match_token(Token::RParen) {
            loop {
                if self.check(Token::Comma) || self.check(Token::RParen) {
                    arguments.push(None);
                } else {
                    arguments.push(Some(self.parse_expression()?));
                }

                if !self.match_token(Token::Comma) {
                    break;
                }
            }
            self.expect(Token::RParen)?;
        }

        Ok(Expression::Call {
            function,
            arguments,
        })
    }

    // Helper methods for matching operators

    fn match_additive_op(&mut self) -> Option<BinaryOp> {
        if self.match_token(Token::Plus) {
            Some(BinaryOp::Add)
        } else if self.match_token(Token::Minus) {
            Some(BinaryOp::Subtract)
        } else {
            None
        }
    }

    fn match_multiplicative_op(&mut self) -> Option<BinaryOp> {
        if self.match_token(Token::Star) {
            Some(BinaryOp::Multiply)
        } else if self.match_token(Token::Slash) {
            Some(BinaryOp::Divide)
        } else {
            None
        }
    }

    // Helper methods

    fn peek(&self) -> Option<&(Token, Range<usize>)> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> Option<&(Token, Range<usize>)> {
        let token = self.tokens.get(self.pos);
        self.pos += 1;
        token
    }

    fn is_at_end(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    fn check(&self, token: Token) -> bool {
        if let Some((t, _)) = self.peek() {
            std::mem::discriminant(t) == std::mem::discriminant(&token)
        } else {
            false
        }
    }

    fn match_token(&mut self, token: Token) -> bool {
        if self.check(token) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, token: Token) -> ParseResult<()> {
        if self.check(token.clone()) {
            self.advance();
            Ok(())
        } else if self.is_at_end() {
            Err(ParseError::UnexpectedEof {
                expected: format!("'{}'", token),
            })
        } else {
            Err(ParseError::UnexpectedToken {
                span: self.peek_span(),
                expected: format!("'{}'", token),
                found: Self::format_token(self.peek()),
            })
        }
    }

    /// Span of the next token, or an empty span after the last one at EOF
    fn peek_span(&self) -> Range<usize> {
        self.tokens
            .get(self.pos)
            .map(|(_, span)| span.clone())
            .unwrap_or_else(|| {
                let end = self.tokens.last().map(|(_, span)| span.end).unwrap_or(0);
                end..end
            })
    }

    fn format_token(token: Option<&(Token, Range<usize>)>) -> String {
        match token {
            None => "end of file".to_string(),
            Some((t @ (Token::Word(_) | Token::Number(_) | Token::String(_)), _)) => t.to_string(),
            Some((t, _)) => format!("'{}'", t),
        }
    }
}

/// Parse a tokenized literal against parameter values
pub fn parse(
    tokens: &[(Token, Range<usize>)],
    values: &HashMap<String, String>,
) -> ParseResult<Expression> {
    Parser::new(tokens, values).parse_literal()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tokenizer::tokenize;

    fn parse_with(source: &str, values: &[(&str, &str)]) -> ParseResult<Expression> {
        let tokens = tokenize(source)?;
        let values = values
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        parse(&tokens, &values)
    }

    #[test]
    fn test_precedence() {
        let expr = parse_with("1 + 2 * 3 == 7", &[]).unwrap();
        assert_eq!(
            expr,
            Expression::Binary {
                left: Box::new(Expression::Binary {
                    left: Box::new(Expression::Number(1.0)),
                    operator: BinaryOp::Add,
                    right: Box::new(Expression::Binary {
                        left: Box::new(Expression::Number(2.0)),
                        operator: BinaryOp::Multiply,
                        right: Box::new(Expression::Number(3.0)),
                    }),
                }),
                operator: BinaryOp::Equals,
                right: Box::new(Expression::Number(7.0)),
            }
        );
    }

    #[test]
    fn test_parameters_are_substituted() {
        let expr = parse_with("-A", &[("A", "4")]).unwrap();
        assert_eq!(
            expr,
            Expression::Negate(Box::new(Expression::Parameter("4".to_string())))
        );
    }

    #[test]
    fn test_unresolved_parameter_leaves_empty_slot() {
        let expr = parse_with("edlValidation_biggerThan(A, 5)", &[]).unwrap();
        assert_eq!(
            expr,
            Expression::Call {
                function: Function::BiggerThan,
                arguments: vec![None, Some(Expression::Number(5.0))],
            }
        );

        let expr = parse_with("edlValidation_exists(A)", &[]).unwrap();
        assert_eq!(
            expr,
            Expression::Call {
                function: Function::Exists,
                arguments: vec![],
            }
        );
    }

    #[test]
    fn test_unresolved_operand_starves_operator() {
        assert!(parse_with("A + 5", &[]).is_err());
        assert!(parse_with("A", &[]).is_err());
    }

    #[test]
    fn test_syntax_errors() {
        assert!(parse_with("1 == 2 == 3", &[]).is_err());
        assert!(parse_with("(1, 2)", &[]).is_err());
        assert!(parse_with("edlValidation_exists", &[]).is_err());
        assert!(parse_with("(1 + 2", &[]).is_err());
        assert!(parse_with("()", &[]).is_err());
    }
}

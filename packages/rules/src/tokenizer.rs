use crate::error::LexError;
use logos::Logos;
use std::fmt;
use std::ops::Range;

/// Tokens of the rule literal language
///
/// Characters outside the language (whitespace, underscores and dots between
/// words, stray punctuation) separate tokens and are otherwise ignored.
#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[^+\-*/(),='0-9A-Za-z]+")]
pub enum Token {
    #[token("+")]
    Plus,

    #[token("-")]
    Minus,

    #[token("*")]
    Star,

    #[token("/")]
    Slash,

    #[token("==")]
    EqEq,

    #[token("(")]
    LParen,

    #[token(")")]
    RParen,

    #[token(",")]
    Comma,

    /// A parameter id or a predicate function name
    #[regex(r"[A-Za-z][A-Za-z0-9_]*", |lex| lex.slice().to_string())]
    Word(String),

    #[regex(r"[0-9]+(\.[0-9]+)?", |lex| lex.slice().to_string())]
    Number(String),

    /// A quoted string with `\'` already unescaped
    #[regex(r"'([^'\\]|\\.)*'", |lex| unescape(lex.slice()))]
    String(String),

    #[regex(r"[0-9]+\.")]
    MalformedNumber,

    #[regex(r"'([^'\\]|\\.)*")]
    UnterminatedString,
}

fn unescape(quoted: &str) -> String {
    let inner = &quoted[1..quoted.len() - 1];
    inner.replace("\\'", "'")
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Plus => write!(f, "+"),
            Token::Minus => write!(f, "-"),
            Token::Star => write!(f, "*"),
            Token::Slash => write!(f, "/"),
            Token::EqEq => write!(f, "=="),
            Token::LParen => write!(f, "("),
            Token::RParen => write!(f, ")"),
            Token::Comma => write!(f, ","),
            Token::Word(w) => write!(f, "word '{}'", w),
            Token::Number(n) => write!(f, "number {}", n),
            Token::String(s) => write!(f, "string '{}'", s),
            Token::MalformedNumber => write!(f, "malformed number"),
            Token::UnterminatedString => write!(f, "unterminated string"),
        }
    }
}

/// Tokenize a literal, failing on the first character sequence outside the language
pub fn tokenize(source: &str) -> Result<Vec<(Token, Range<usize>)>, LexError> {
    Token::lexer(source)
        .spanned()
        .map(|(result, span)| match result {
            Ok(Token::MalformedNumber) => Err(LexError {
                span,
                message: "Number has no digits after the decimal point".to_string(),
            }),
            Ok(Token::UnterminatedString) => Err(LexError {
                span,
                message: "String is not terminated".to_string(),
            }),
            Ok(token) => Ok((token, span)),
            Err(_) => Err(LexError {
                message: format!("Unexpected character '{}'", &source[span.clone()]),
                span,
            }),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<Token> {
        tokenize(source)
            .expect("tokenizes")
            .into_iter()
            .map(|(token, _)| token)
            .collect()
    }

    #[test]
    fn test_function_call() {
        assert_eq!(
            kinds("edlValidation_biggerThan(A, 5)"),
            vec![
                Token::Word("edlValidation_biggerThan".to_string()),
                Token::LParen,
                Token::Word("A".to_string()),
                Token::Comma,
                Token::Number("5".to_string()),
                Token::RParen,
            ]
        );
    }

    #[test]
    fn test_operators_and_numbers() {
        assert_eq!(
            kinds("-2.5*x==10"),
            vec![
                Token::Minus,
                Token::Number("2.5".to_string()),
                Token::Star,
                Token::Word("x".to_string()),
                Token::EqEq,
                Token::Number("10".to_string()),
            ]
        );
    }

    #[test]
    fn test_strings_unescape_quotes_only() {
        assert_eq!(
            kinds(r"'it\'s' 'a\nb'"),
            vec![
                Token::String("it's".to_string()),
                Token::String(r"a\nb".to_string()),
            ]
        );
    }

    #[test]
    fn test_lex_errors() {
        assert!(tokenize("A = 5").is_err());
        assert!(tokenize("5. + 1").is_err());
        let error = tokenize("'open").unwrap_err();
        assert_eq!(error.span, 0..5);
    }

    #[test]
    fn test_separators_are_skipped() {
        assert_eq!(kinds("  a\t.\n"), vec![Token::Word("a".to_string())]);
    }
}

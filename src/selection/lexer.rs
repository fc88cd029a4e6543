// In: src/selection/lexer.rs

//! Tokenizer for selection expressions, built from nom combinators.

use nom::{
    branch::alt,
    bytes::complete::{tag, take_while, take_while1},
    character::complete::{char, multispace0},
    combinator::{recognize, value},
    number::complete::recognize_float,
    sequence::{delimited, pair, preceded},
    IResult,
};

use super::error::ParseError;

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    LParen,
    RParen,
    /// `==` or `=`
    Equals,
    NotEquals,
    LessThan,
    LessOrEqual,
    GreaterThan,
    GreaterOrEqual,
    /// `and` or `&&`
    And,
    /// `or` or `||`
    Or,
    /// `not` or `!`
    Not,
    Number(f64),
    Ident(String),
    QuotedString(String),
    Eof,
}

type LexResult<'a, T> = IResult<&'a str, T>;

fn ws(input: &str) -> LexResult<'_, ()> {
    value((), multispace0)(input)
}

/// Multi-char operators are tried before their one-char prefixes.
fn comparison(input: &str) -> LexResult<'_, Token> {
    alt((
        value(Token::NotEquals, tag("!=")),
        value(Token::LessOrEqual, tag("<=")),
        value(Token::GreaterOrEqual, tag(">=")),
        value(Token::Equals, alt((tag("=="), tag("=")))),
        value(Token::LessThan, char('<')),
        value(Token::GreaterThan, char('>')),
    ))(input)
}

fn logical(input: &str) -> LexResult<'_, Token> {
    alt((
        value(Token::And, tag("&&")),
        value(Token::Or, tag("||")),
        value(Token::Not, char('!')),
    ))(input)
}

fn paren(input: &str) -> LexResult<'_, Token> {
    alt((value(Token::LParen, char('(')), value(Token::RParen, char(')'))))(input)
}

fn quoted_string(input: &str) -> LexResult<'_, Token> {
    let (input, s) = alt((
        delimited(char('"'), take_while(|c| c != '"'), char('"')),
        delimited(char('\''), take_while(|c| c != '\''), char('\'')),
    ))(input)?;
    Ok((input, Token::QuotedString(s.to_string())))
}

/// Numbers may carry a sign and an exponent: `-1.5`, `2e-3`.
fn number(input: &str) -> LexResult<'_, &str> {
    recognize_float(input)
}

fn ident(input: &str) -> LexResult<'_, Token> {
    let (input, s) = recognize(pair(
        take_while1(|c: char| c.is_alphabetic() || c == '_'),
        take_while(|c: char| c.is_alphanumeric() || c == '_'),
    ))(input)?;

    let token = match s.to_ascii_lowercase().as_str() {
        "and" => Token::And,
        "or" => Token::Or,
        "not" => Token::Not,
        _ => Token::Ident(s.to_string()),
    };
    Ok((input, token))
}

/// Tokenizes a whole expression; the result always ends with `Token::Eof`.
pub fn tokenize(input: &str) -> Result<Vec<Token>, ParseError> {
    let mut tokens = Vec::new();
    let mut remaining = input;

    loop {
        let (rest, _) = ws(remaining).map_err(|_| ParseError::UnexpectedEof)?;
        remaining = rest;

        if remaining.is_empty() {
            tokens.push(Token::Eof);
            break;
        }

        if let Ok((rest, literal)) = preceded(ws, number)(remaining) {
            let parsed = literal
                .parse::<f64>()
                .map_err(|_| ParseError::InvalidNumber(literal.to_string()))?;
            tokens.push(Token::Number(parsed));
            remaining = rest;
            continue;
        }

        match alt((comparison, logical, paren, quoted_string, ident))(remaining) {
            Ok((rest, tok)) => {
                tokens.push(tok);
                remaining = rest;
            }
            Err(_) if remaining.starts_with(['"', '\'']) => {
                return Err(ParseError::UnterminatedString);
            }
            Err(_) => {
                return Err(ParseError::UnexpectedToken(
                    remaining.chars().take(10).collect(),
                ));
            }
        }
    }

    Ok(tokens)
}

/// A cursor over a token vector, for the recursive-descent parser.
#[derive(Debug, Clone)]
pub struct TokenStream {
    tokens: Vec<Token>,
    pos: usize,
}

impl TokenStream {
    pub fn new(tokens: Vec<Token>) -> Self {
        TokenStream { tokens, pos: 0 }
    }

    pub fn from_str(input: &str) -> Result<Self, ParseError> {
        Ok(TokenStream::new(tokenize(input)?))
    }

    pub fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    pub fn next(&mut self) -> Option<Token> {
        let tok = self.tokens.get(self.pos).cloned()?;
        self.pos += 1;
        Some(tok)
    }

    pub fn is_eof(&self) -> bool {
        matches!(self.peek(), Some(Token::Eof) | None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokenize_comparison() {
        let tokens = tokenize("element == 'H'").unwrap();
        assert_eq!(
            tokens,
            vec![
                Token::Ident("element".to_string()),
                Token::Equals,
                Token::QuotedString("H".to_string()),
                Token::Eof
            ]
        );
    }

    #[test]
    fn test_single_equals_is_equality() {
        assert_eq!(tokenize("x = 1").unwrap()[1], Token::Equals);
    }

    #[test]
    fn test_keywords_and_symbols_are_interchangeable() {
        let words = tokenize("NOT x > 1 And y < 2 or z >= 0").unwrap();
        let symbols = tokenize("! x > 1 && y < 2 || z >= 0").unwrap();
        assert_eq!(words, symbols);
    }

    #[test]
    fn test_signed_and_exponent_numbers() {
        let tokens = tokenize("x > -1.5e1").unwrap();
        assert_eq!(tokens[2], Token::Number(-15.0));
    }

    #[test]
    fn test_double_quoted_strings() {
        let tokens = tokenize("element != \"C\"").unwrap();
        assert_eq!(tokens[2], Token::QuotedString("C".to_string()));
    }

    #[test]
    fn test_unterminated_string() {
        assert_eq!(tokenize("element == 'H"), Err(ParseError::UnterminatedString));
    }

    #[test]
    fn test_stray_character() {
        assert!(matches!(tokenize("x # 1"), Err(ParseError::UnexpectedToken(_))));
    }
}

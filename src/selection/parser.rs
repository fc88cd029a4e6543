// In: src/selection/parser.rs

//! Recursive-descent parser with precedence climbing for `and` / `or`.
//!
//! Binding, tightest first: `not`, comparison, `and`, `or`.

use super::ast::{CompareOp, Expr, Operand, Variable};
use super::error::ParseError;
use super::lexer::{Token, TokenStream};

/// Parses a selection expression such as `element == 'H' and x > 0`.
pub fn parse_expression(input: &str) -> Result<Expr, ParseError> {
    let mut stream = TokenStream::from_str(input)?;
    if stream.is_eof() {
        return Err(ParseError::Empty);
    }
    let expr = parse_expr(&mut stream, 0)?;

    match stream.peek() {
        None | Some(Token::Eof) => Ok(expr),
        Some(Token::RParen) => Err(ParseError::UnmatchedParen),
        Some(other) => Err(ParseError::UnexpectedToken(format!("{:?}", other))),
    }
}

#[derive(Debug, Clone, Copy)]
enum BinOp {
    And,
    Or,
}

impl BinOp {
    fn precedence(self) -> u8 {
        match self {
            BinOp::Or => 1,
            BinOp::And => 2,
        }
    }

    fn build(self, left: Expr, right: Expr) -> Expr {
        match self {
            BinOp::And => Expr::And(Box::new(left), Box::new(right)),
            BinOp::Or => Expr::Or(Box::new(left), Box::new(right)),
        }
    }
}

fn parse_expr(stream: &mut TokenStream, min_prec: u8) -> Result<Expr, ParseError> {
    let mut left = parse_unary(stream)?;

    loop {
        let op = match stream.peek() {
            Some(Token::And) => BinOp::And,
            Some(Token::Or) => BinOp::Or,
            _ => break,
        };
        if op.precedence() < min_prec {
            break;
        }
        stream.next();
        let right = parse_expr(stream, op.precedence() + 1)?;
        left = op.build(left, right);
    }

    Ok(left)
}

fn parse_unary(stream: &mut TokenStream) -> Result<Expr, ParseError> {
    if matches!(stream.peek(), Some(Token::Not)) {
        stream.next();
        let inner = parse_unary(stream)?;
        return Ok(Expr::Not(Box::new(inner)));
    }
    parse_primary(stream)
}

fn parse_primary(stream: &mut TokenStream) -> Result<Expr, ParseError> {
    if matches!(stream.peek(), Some(Token::LParen)) {
        stream.next();
        let inner = parse_expr(stream, 0)?;
        return match stream.next() {
            Some(Token::RParen) => Ok(inner),
            Some(Token::Eof) | None => Err(ParseError::UnmatchedParen),
            Some(other) => Err(ParseError::Expected {
                expected: "')'".to_string(),
                found: format!("{:?}", other),
            }),
        };
    }

    let lhs = parse_operand(stream)?;
    let op = parse_compare_op(stream)?;
    let rhs = parse_operand(stream)?;
    Ok(Expr::Compare { lhs, op, rhs })
}

fn parse_operand(stream: &mut TokenStream) -> Result<Operand, ParseError> {
    match stream.next() {
        Some(Token::Number(n)) => Ok(Operand::Number(n)),
        Some(Token::QuotedString(s)) => Ok(Operand::Str(s)),
        Some(Token::Ident(name)) => Variable::lookup(&name)
            .map(Operand::Var)
            .ok_or(ParseError::UnknownIdentifier(name)),
        Some(Token::Eof) | None => Err(ParseError::UnexpectedEof),
        Some(other) => Err(ParseError::Expected {
            expected: "identifier or literal".to_string(),
            found: format!("{:?}", other),
        }),
    }
}

fn parse_compare_op(stream: &mut TokenStream) -> Result<CompareOp, ParseError> {
    match stream.next() {
        Some(Token::Equals) => Ok(CompareOp::Eq),
        Some(Token::NotEquals) => Ok(CompareOp::Ne),
        Some(Token::LessThan) => Ok(CompareOp::Lt),
        Some(Token::LessOrEqual) => Ok(CompareOp::Le),
        Some(Token::GreaterThan) => Ok(CompareOp::Gt),
        Some(Token::GreaterOrEqual) => Ok(CompareOp::Ge),
        Some(Token::Eof) | None => Err(ParseError::UnexpectedEof),
        Some(other) => Err(ParseError::Expected {
            expected: "comparison operator".to_string(),
            found: format!("{:?}", other),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cmp(var: Variable, op: CompareOp, rhs: Operand) -> Expr {
        Expr::Compare {
            lhs: Operand::Var(var),
            op,
            rhs,
        }
    }

    #[test]
    fn test_parse_simple_comparison() {
        let expr = parse_expression("element == 'H'").unwrap();
        assert_eq!(
            expr,
            cmp(Variable::Element, CompareOp::Eq, Operand::Str("H".to_string()))
        );
    }

    #[test]
    fn test_and_binds_tighter_than_or() {
        let expr = parse_expression("x > 0 or y > 0 and z > 0").unwrap();
        let Expr::Or(left, right) = expr else {
            panic!("expected an or at the root");
        };
        assert_eq!(*left, cmp(Variable::X, CompareOp::Gt, Operand::Number(0.0)));
        assert!(matches!(*right, Expr::And(_, _)));
    }

    #[test]
    fn test_not_applies_to_the_next_comparison() {
        let expr = parse_expression("not element == 'H' and x < 1").unwrap();
        let Expr::And(left, _) = expr else {
            panic!("expected an and at the root");
        };
        assert!(matches!(*left, Expr::Not(_)));
    }

    #[test]
    fn test_parentheses_override_precedence() {
        let expr = parse_expression("(x > 0 or y > 0) and index < 2").unwrap();
        assert!(matches!(expr, Expr::And(_, _)));
    }

    #[test]
    fn test_incomplete_comparison_is_an_error() {
        assert_eq!(parse_expression("element =="), Err(ParseError::UnexpectedEof));
    }

    #[test]
    fn test_unknown_identifier_is_an_error() {
        assert_eq!(
            parse_expression("mass > 12"),
            Err(ParseError::UnknownIdentifier("mass".to_string()))
        );
    }

    #[test]
    fn test_unbalanced_parentheses() {
        assert_eq!(parse_expression("(x > 0"), Err(ParseError::UnmatchedParen));
        assert_eq!(parse_expression("x > 0)"), Err(ParseError::UnmatchedParen));
    }

    #[test]
    fn test_empty_expression() {
        assert_eq!(parse_expression("   "), Err(ParseError::Empty));
    }

    #[test]
    fn test_bare_identifier_needs_an_operator() {
        assert!(matches!(
            parse_expression("element"),
            Err(ParseError::UnexpectedEof)
        ));
        assert!(matches!(
            parse_expression("element 'H'"),
            Err(ParseError::Expected { .. })
        ));
    }
}

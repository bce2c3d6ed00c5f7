//! nom grammar for logical expressions.
//!
//! ```text
//! expression := and_term (OR and_term)*
//! and_term   := unary (AND unary)*
//! unary      := NOT unary | primary
//! primary    := '(' expression ')' | operand
//! operand    := [A-Za-z0-9_]+ excluding the reserved words AND, OR, NOT
//! ```
//!
//! Precedence is NOT > AND > OR; parentheses override. Reserved words are
//! matched boundary-aware so that operand names such as `ANDY` or `NOTIFY`
//! are not mistaken for operators.

use nom::{
    branch::alt,
    bytes::complete::{tag, take_while1},
    character::complete::multispace0,
    combinator::{all_consuming, map, not, peek, verify},
    multi::many0,
    sequence::{delimited, pair, preceded, terminated},
    IResult,
};

use super::ExprNode;

/// Parses a complete expression body (negation already stripped by the caller).
pub(super) fn parse(input: &str) -> Result<ExprNode, String> {
    match all_consuming(delimited(multispace0, expression, multispace0))(input) {
        Ok((_, node)) => Ok(node),
        Err(err) => Err(err.to_string()),
    }
}

fn expression(input: &str) -> IResult<&str, ExprNode> {
    map(
        pair(and_term, many0(preceded(operator("OR"), and_term))),
        |(first, rest)| {
            rest.into_iter().fold(first, |left, right| {
                ExprNode::Or(Box::new(left), Box::new(right))
            })
        },
    )(input)
}

fn and_term(input: &str) -> IResult<&str, ExprNode> {
    map(
        pair(unary, many0(preceded(operator("AND"), unary))),
        |(first, rest)| {
            rest.into_iter().fold(first, |left, right| {
                ExprNode::And(Box::new(left), Box::new(right))
            })
        },
    )(input)
}

fn unary(input: &str) -> IResult<&str, ExprNode> {
    alt((
        map(preceded(operator("NOT"), unary), |inner| {
            ExprNode::Not(Box::new(inner))
        }),
        primary,
    ))(input)
}

fn primary(input: &str) -> IResult<&str, ExprNode> {
    alt((
        delimited(symbol("("), expression, symbol(")")),
        operand,
    ))(input)
}

fn operand(input: &str) -> IResult<&str, ExprNode> {
    map(
        delimited(
            multispace0,
            verify(take_while1(is_word_char), |name: &str| {
                !matches!(name, "AND" | "OR" | "NOT")
            }),
            multispace0,
        ),
        |name: &str| ExprNode::Operand(name.to_string()),
    )(input)
}

fn operator(word: &'static str) -> impl Fn(&str) -> IResult<&str, &str> {
    move |input| {
        delimited(
            multispace0,
            terminated(tag(word), not(peek(take_while1(is_word_char)))),
            multispace0,
        )(input)
    }
}

fn symbol(token: &'static str) -> impl Fn(&str) -> IResult<&str, &str> {
    move |input| delimited(multispace0, tag(token), multispace0)(input)
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

use crate::parser::{LedgerParser, Rule};
use num_bigint::BigInt;
use num_rational::BigRational;
use num_traits::Zero;
use pest::iterators::Pairs;
use pest::pratt_parser::{Assoc, Op, PrattParser};
use pest::Parser;

/// Largest decimal exponent accepted in a literal, `1e5000` is not an amount.
const MAX_EXPONENT: i64 = 4096;

/// Evaluates a trimmed amount token.
///
/// `None` means the token is not an amount at all, the caller then treats the whole
/// posting line as an account name. Tokens containing a parenthesis are arithmetic
/// expressions, those are folded in `f64` and so lose the exactness plain literals have.
pub fn evaluate(token: &str) -> Option<BigRational> {
    if token.contains('(') {
        evaluate_expression(token)
    } else {
        parse_literal(token)
    }
}

/// Parses an exact literal such as `123.45`, `-10`, `2.5e3` or `1/3`.
pub fn parse_literal(token: &str) -> Option<BigRational> {
    let value = LedgerParser::parse(Rule::literal, token)
        .ok()?
        .next()?
        .into_inner()
        .next()?;

    match value.as_rule() {
        Rule::decimal => decimal(value.as_str()),
        Rule::fraction => {
            let mut parts = value.into_inner();
            let numer: BigInt = parts.next()?.as_str().parse().ok()?;
            let denom: BigInt = parts.next()?.as_str().parse().ok()?;
            if denom.is_zero() {
                return None;
            }
            Some(BigRational::new(numer, denom))
        }
        _ => None,
    }
}

fn decimal(text: &str) -> Option<BigRational> {
    let (mantissa, exponent) = match text.find(['e', 'E']) {
        Some(idx) => (&text[..idx], text[idx + 1..].parse::<i64>().ok()?),
        None => (text, 0),
    };
    let (whole, fraction) = mantissa.split_once('.').unwrap_or((mantissa, ""));
    let digits = format!("{}{}", whole.trim_start_matches(['+', '-']), fraction);
    let mut numer: BigInt = digits.parse().ok()?;
    if whole.starts_with('-') {
        numer = -numer;
    }

    let scale = exponent.checked_sub(fraction.len() as i64)?;
    if scale.abs() > MAX_EXPONENT {
        return None;
    }
    let factor = num_traits::pow(BigInt::from(10), scale.unsigned_abs() as usize);
    if scale >= 0 {
        Some(BigRational::from_integer(numer * factor))
    } else {
        Some(BigRational::new(numer, factor))
    }
}

fn evaluate_expression(token: &str) -> Option<BigRational> {
    let expr = LedgerParser::parse(Rule::expression, token)
        .ok()?
        .next()?
        .into_inner()
        .next()?;
    BigRational::from_float(fold(expr.into_inner(), &pratt()))
}

fn pratt() -> PrattParser<Rule> {
    PrattParser::new()
        .op(Op::infix(Rule::add, Assoc::Left) | Op::infix(Rule::sub, Assoc::Left))
        .op(Op::infix(Rule::mul, Assoc::Left) | Op::infix(Rule::div, Assoc::Left))
        .op(Op::prefix(Rule::neg))
}

// NaN marks anything the grammar let through but we can't fold, from_float rejects it.
fn fold(pairs: Pairs<Rule>, pratt: &PrattParser<Rule>) -> f64 {
    pratt
        .map_primary(|primary| match primary.as_rule() {
            Rule::number => primary.as_str().parse::<f64>().unwrap_or(f64::NAN),
            Rule::expr => fold(primary.into_inner(), pratt),
            _ => f64::NAN,
        })
        .map_prefix(|op, rhs| match op.as_rule() {
            Rule::neg => -rhs,
            _ => f64::NAN,
        })
        .map_infix(|lhs, op, rhs| match op.as_rule() {
            Rule::add => lhs + rhs,
            Rule::sub => lhs - rhs,
            Rule::mul => lhs * rhs,
            Rule::div => lhs / rhs,
            _ => f64::NAN,
        })
        .parse(pairs)
}

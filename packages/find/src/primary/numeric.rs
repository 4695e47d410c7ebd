//! Numeric comparisons: `+N` greater, `-N` less, bare `N` equal.

use lazy_static::lazy_static;
use regex::Regex;

use crate::parser::ParseResult;
use crate::{ParseError, Predicate};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Comparison {
    Greater,
    Less,
    Equal,
}

impl Comparison {
    fn split(token: &str) -> (Comparison, &str) {
        if let Some(rest) = token.strip_prefix('+') {
            (Comparison::Greater, rest)
        } else if let Some(rest) = token.strip_prefix('-') {
            (Comparison::Less, rest)
        } else {
            (Comparison::Equal, token)
        }
    }

    pub fn holds<N: PartialOrd>(&self, value: N, bound: N) -> bool {
        match self {
            Comparison::Greater => value > bound,
            Comparison::Less => value < bound,
            Comparison::Equal => value == bound,
        }
    }
}

lazy_static! {
    static ref NUMBER: Regex = Regex::new(r"^(\d+(?:\.\d+)?|\.\d+)$").unwrap();
    static ref SIZE: Regex = Regex::new(r"^(\d+)([ckMGTP]?)$").unwrap();
}

/// `[+-]?N` with an optional decimal part, compared against JSON numbers.
/// Anything that isn't a number is a mismatch so that callers can try
/// other interpretations of the token.
pub fn parse_numeric<'a>(tokens: &'a [String]) -> ParseResult<'a, serde_json::Value> {
    let token = tokens
        .first()
        .ok_or_else(|| ParseError::mismatch("expected a number"))?;
    let (comparison, digits) = Comparison::split(token);
    if !NUMBER.is_match(digits) {
        return Err(ParseError::mismatch("expected a number"));
    }
    let bound: f64 = digits
        .parse()
        .map_err(|_| ParseError::syntax(format!("{:?} is not a number", token)))?;
    let predicate = Predicate::atomic(move |v: &serde_json::Value| {
        v.as_f64().is_some_and(|n| comparison.holds(n, bound))
    });
    Ok((predicate, &tokens[1..]))
}

fn size_unit(suffix: &str) -> u64 {
    match suffix {
        "k" => 1 << 10,
        "M" => 1 << 20,
        "G" => 1 << 30,
        "T" => 1 << 40,
        "P" => 1 << 50,
        // "" and "c" are bytes.
        _ => 1,
    }
}

/// The `-size` argument: `[+-]N[ckMGTP]`, in bytes by default.
pub fn parse_size<'a>(tokens: &'a [String]) -> ParseResult<'a, u64> {
    let token = tokens
        .first()
        .ok_or_else(|| ParseError::mismatch("expected a size"))?;
    let (comparison, rest) = Comparison::split(token);
    let caps = SIZE
        .captures(rest)
        .ok_or_else(|| ParseError::syntax(format!("{:?} is not a valid size", token)))?;
    let bound = caps[1]
        .parse::<u64>()
        .ok()
        .and_then(|n| n.checked_mul(size_unit(&caps[2])))
        .ok_or_else(|| ParseError::syntax(format!("size {} is too large", token)))?;
    let predicate = Predicate::atomic(move |size: &u64| comparison.holds(*size, bound));
    Ok((predicate, &tokens[1..]))
}

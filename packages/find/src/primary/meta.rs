//! `-meta .KEY[.KEY...] VALUE`: match a value inside an entry's metadata.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use entryfs_plugin::MetadataMap;
use lazy_static::lazy_static;
use regex::Regex;
use serde_json::Value;

use super::numeric::parse_numeric;
use super::time::{ReferenceInstant, TimePrimary};
use super::EntrySnapshot;
use crate::parser::{FirstMatch, ParseResult, PrimaryParser};
use crate::{ParseError, Predicate};

lazy_static! {
    static ref KEY_PATH: Regex = Regex::new(r"^(\.[^.\s]+)+$").unwrap();
}

/// Follow `keys` through nested objects.
pub fn lookup<'m>(metadata: &'m MetadataMap, keys: &[String]) -> Option<&'m Value> {
    let (first, rest) = keys.split_first()?;
    let mut value = metadata.get(first)?;
    for key in rest {
        value = value.as_object()?.get(key)?;
    }
    Some(value)
}

fn parse_literal<'a>(tokens: &'a [String]) -> ParseResult<'a, Value> {
    let literal = match tokens.first().map(String::as_str) {
        Some("true") => Value::Bool(true),
        Some("false") => Value::Bool(false),
        Some("null") => Value::Null,
        _ => return Err(ParseError::mismatch("expected true, false or null")),
    };
    Ok((Predicate::atomic(move |v: &Value| *v == literal), &tokens[1..]))
}

fn parse_string<'a>(tokens: &'a [String]) -> ParseResult<'a, Value> {
    let expected = tokens
        .first()
        .cloned()
        .ok_or_else(|| ParseError::mismatch("expected a value"))?;
    let predicate = Predicate::atomic(move |v: &Value| v.as_str() == Some(expected.as_str()));
    Ok((predicate, &tokens[1..]))
}

/// Parses the `-meta` arguments. Compiling one marks the query as needing
/// metadata.
pub struct MetaPrimary {
    value: FirstMatch<Value>,
    used: Arc<AtomicBool>,
}

impl MetaPrimary {
    pub fn new(reference: ReferenceInstant, used: Arc<AtomicBool>) -> Self {
        let value = FirstMatch::new("expected a value")
            .or_try(TimePrimary::new(reference))
            .or_try(parse_numeric)
            .or_try(parse_literal)
            .or_try(parse_string);
        Self { value, used }
    }
}

impl PrimaryParser<EntrySnapshot> for MetaPrimary {
    fn parse<'a>(&self, tokens: &'a [String]) -> ParseResult<'a, EntrySnapshot> {
        let path = tokens
            .first()
            .ok_or_else(|| ParseError::mismatch("expected a key path such as .labels.app"))?;
        if !KEY_PATH.is_match(path) {
            return Err(ParseError::syntax(format!(
                "{:?} is not a key path; expected something like .labels.app",
                path
            )));
        }
        let keys: Vec<String> = path[1..].split('.').map(String::from).collect();
        let (value, rest) = self
            .value
            .parse(&tokens[1..])
            .map_err(|e| e.committed().shifted(1))?;
        self.used.store(true, Ordering::Relaxed);
        let predicate = Predicate::atomic(move |entry: &EntrySnapshot| {
            entry
                .metadata
                .as_ref()
                .and_then(|m| lookup(m, &keys))
                .is_some_and(|v| value.eval(v))
        });
        Ok((predicate, rest))
    }
}

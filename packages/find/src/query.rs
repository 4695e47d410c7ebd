use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::parser;
use crate::primary::time::ReferenceInstant;
use crate::primary::{entry_primaries, EntrySnapshot};
use crate::{Predicate, Result};

/// A compiled query. Compilation happens once; evaluation is pure and
/// cannot fail.
#[derive(Clone, Debug)]
pub struct Query {
    predicate: Predicate<EntrySnapshot>,
    reference: ReferenceInstant,
    needs_metadata: bool,
}

impl Query {
    /// Compile `tokens` with every temporal primary measured from
    /// `reference`.
    pub fn compile<S: AsRef<str>>(tokens: &[S], reference: ReferenceInstant) -> Result<Self> {
        let tokens: Vec<String> = tokens.iter().map(|t| t.as_ref().to_string()).collect();
        let needs_metadata = Arc::new(AtomicBool::new(false));
        let table = entry_primaries(reference, needs_metadata.clone());
        let predicate = parser::compile(&table, &tokens)?;
        log::debug!("compiled query {:?}", tokens);
        Ok(Self {
            predicate,
            reference,
            needs_metadata: needs_metadata.load(Ordering::Relaxed),
        })
    }

    /// Compile `tokens` against the current time.
    pub fn parse<S: AsRef<str>>(tokens: &[S]) -> Result<Self> {
        Self::compile(tokens, ReferenceInstant::now())
    }

    pub fn matches(&self, entry: &EntrySnapshot) -> bool {
        self.predicate.eval(entry)
    }

    pub fn reference(&self) -> ReferenceInstant {
        self.reference
    }

    /// Whether any primary looks at entry metadata.
    pub fn needs_metadata(&self) -> bool {
        self.needs_metadata
    }

    pub fn predicate(&self) -> &Predicate<EntrySnapshot> {
        &self.predicate
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use chrono::{TimeZone, Utc};

    fn reference() -> ReferenceInstant {
        ReferenceInstant::at(Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap())
    }

    #[test]
    fn empty_query_matches_everything() {
        let query = Query::compile::<&str>(&[], reference()).unwrap();
        assert!(query.matches(&EntrySnapshot::new("/", "", 0)));
        assert!(!query.needs_metadata());
    }

    #[test]
    fn reference_is_fixed_at_compile_time() {
        let query = Query::compile(&["-mtime", "-1h"], reference()).unwrap();
        assert_eq!(query.reference(), reference());
    }

    #[test]
    fn meta_queries_need_metadata() {
        let query = Query::parse(&["-name", "x", "-o", "-meta", ".a", "1"]).unwrap();
        assert!(query.needs_metadata());
    }

    #[test]
    fn parse_errors_are_reported_with_one_based_position() {
        let err = Query::parse(&["-name", "x", "-mtime", "+{2h"]).unwrap_err();
        assert!(matches!(err, Error::Parse(_)));
        assert_eq!(
            err.to_string(),
            "invalid expression at token 4: -mtime: expected a closing brace"
        );
    }

    #[test]
    fn unknown_primary() {
        let err = Query::parse(&["-bogus"]).unwrap_err();
        assert!(err.to_string().starts_with("invalid expression at token 1"));
    }
}

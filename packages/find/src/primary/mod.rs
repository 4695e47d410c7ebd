//! Primaries over entries.
//!
//! Each primary is registered under its flag in [`entry_primaries`]. They
//! evaluate against an [`EntrySnapshot`], which the walker builds once per
//! visited entry so that evaluation never touches a backend.

use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use entryfs_plugin::{action, Attributes, Entry, MetadataMap};

use crate::parser::{ParseResult, PrimaryParser, PrimaryTable};
use crate::{ParseError, Predicate};

pub mod meta;
pub mod name;
pub mod numeric;
pub mod time;

use meta::MetaPrimary;
use time::{ReferenceInstant, TimePrimary};

/// What the primaries can see of an entry.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct EntrySnapshot {
    pub path: String,
    pub name: String,
    pub depth: usize,
    pub attributes: Attributes,
    /// `None` unless metadata was fetched.
    pub metadata: Option<MetadataMap>,
    pub actions: Vec<&'static str>,
}

impl EntrySnapshot {
    pub fn new(path: impl Into<String>, name: impl Into<String>, depth: usize) -> Self {
        Self {
            path: path.into(),
            name: name.into(),
            depth,
            ..Default::default()
        }
    }

    /// Capture `entry` as found at `path`. Supported actions come from the
    /// process-wide registry.
    pub fn of(entry: &dyn Entry, path: impl Into<String>, depth: usize) -> Self {
        Self {
            path: path.into(),
            name: entry.name().to_string(),
            depth,
            attributes: entry.attributes(),
            metadata: None,
            actions: action::registry().supported_actions_of(entry),
        }
    }

    pub fn with_metadata(mut self, metadata: MetadataMap) -> Self {
        self.metadata = Some(metadata);
        self
    }
}

fn parse_true<'a>(tokens: &'a [String]) -> ParseResult<'a, EntrySnapshot> {
    Ok((Predicate::always(true), tokens))
}

fn parse_false<'a>(tokens: &'a [String]) -> ParseResult<'a, EntrySnapshot> {
    Ok((Predicate::always(false), tokens))
}

fn glob_argument<'a>(
    tokens: &'a [String],
) -> Result<(globset::GlobMatcher, &'a [String]), ParseError> {
    let glob = tokens
        .first()
        .ok_or_else(|| ParseError::mismatch("expected a pattern"))?;
    Ok((name::glob_matcher(glob)?, &tokens[1..]))
}

fn parse_name<'a>(tokens: &'a [String]) -> ParseResult<'a, EntrySnapshot> {
    let (pattern, rest) = glob_argument(tokens)?;
    Ok((Predicate::atomic(move |e: &EntrySnapshot| pattern.is_match(&e.name)), rest))
}

fn parse_path<'a>(tokens: &'a [String]) -> ParseResult<'a, EntrySnapshot> {
    let (pattern, rest) = glob_argument(tokens)?;
    Ok((Predicate::atomic(move |e: &EntrySnapshot| pattern.is_match(&e.path)), rest))
}

fn parse_action<'a>(tokens: &'a [String]) -> ParseResult<'a, EntrySnapshot> {
    let name = tokens
        .first()
        .ok_or_else(|| ParseError::mismatch("expected an action name"))?;
    let registry = action::registry();
    let Some(action) = registry.get(name) else {
        let known: Vec<_> = registry.names().collect();
        return Err(ParseError::syntax(format!(
            "unknown action {:?}; expected one of {}",
            name,
            known.join(", ")
        )));
    };
    let wanted = action.name();
    let predicate = Predicate::atomic(move |e: &EntrySnapshot| e.actions.contains(&wanted));
    Ok((predicate, &tokens[1..]))
}

fn parse_size<'a>(tokens: &'a [String]) -> ParseResult<'a, EntrySnapshot> {
    let (size, rest) = numeric::parse_size(tokens)?;
    Ok((size.lift(|e: &EntrySnapshot| e.attributes.size), rest))
}

/// `-atime` and friends: the temporal primary applied to one timestamp
/// attribute.
struct AttributeTime {
    primary: TimePrimary,
    attribute: fn(&Attributes) -> Option<DateTime<Utc>>,
}

impl PrimaryParser<EntrySnapshot> for AttributeTime {
    fn parse<'a>(&self, tokens: &'a [String]) -> ParseResult<'a, EntrySnapshot> {
        let (time, rest) = PrimaryParser::<DateTime<Utc>>::parse(&self.primary, tokens)?;
        let attribute = self.attribute;
        Ok((time.lift(move |e: &EntrySnapshot| attribute(&e.attributes)), rest))
    }
}

/// Every entry-level primary. Temporal primaries measure from `reference`;
/// compiling a `-meta` primary sets `needs_metadata`.
pub fn entry_primaries(
    reference: ReferenceInstant,
    needs_metadata: Arc<AtomicBool>,
) -> PrimaryTable<EntrySnapshot> {
    let time = TimePrimary::new(reference);
    let attribute_time = |attribute: fn(&Attributes) -> Option<DateTime<Utc>>| AttributeTime {
        primary: time,
        attribute,
    };

    let mut table = PrimaryTable::new();
    table
        .register("-true", parse_true)
        .register("-false", parse_false)
        .register("-name", parse_name)
        .register("-path", parse_path)
        .register("-action", parse_action)
        .register("-size", parse_size)
        .register("-atime", attribute_time(|a| a.atime))
        .register("-mtime", attribute_time(|a| a.mtime))
        .register("-ctime", attribute_time(|a| a.ctime))
        .register("-crtime", attribute_time(|a| a.crtime))
        .register("-meta", MetaPrimary::new(reference, needs_metadata));
    table
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::compile;
    use chrono::TimeZone;
    use entryfs_plugin::testing::MockEntry;
    use std::sync::atomic::Ordering;

    fn reference() -> ReferenceInstant {
        ReferenceInstant::at(Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap())
    }

    fn tokens(s: &str) -> Vec<String> {
        s.split_whitespace().map(String::from).collect()
    }

    fn try_compile(s: &str) -> Result<Predicate<EntrySnapshot>, ParseError> {
        let table = entry_primaries(reference(), Arc::new(AtomicBool::new(false)));
        compile(&table, &tokens(s))
    }

    fn matches(s: &str, entry: &EntrySnapshot) -> bool {
        try_compile(s).unwrap().eval(entry)
    }

    fn log_file() -> EntrySnapshot {
        let mut e = EntrySnapshot::new("/var/log/app.log", "app.log", 2);
        e.attributes = Attributes::new()
            .with_size(4096)
            .with_mtime(reference().instant() - chrono::Duration::hours(3));
        e.actions = vec!["read", "stream"];
        e
    }

    #[test]
    fn booleans() {
        assert!(matches("-true", &log_file()));
        assert!(!matches("-false", &log_file()));
        assert!(matches("-false -o -true", &log_file()));
    }

    #[test]
    fn name_and_path() {
        assert!(matches("-name *.log", &log_file()));
        assert!(!matches("-name *.txt", &log_file()));
        assert!(matches("-path /var/*/app.*", &log_file()));
        assert!(!matches("-path app.log", &log_file()));
    }

    #[test]
    fn action() {
        assert!(matches("-action stream", &log_file()));
        assert!(!matches("-action exec", &log_file()));
        let e = try_compile("-action fly").unwrap_err();
        assert_eq!(e.position, 1);
        assert!(e.message.contains("unknown action"));
    }

    #[test]
    fn size() {
        assert!(matches("-size +4095", &log_file()));
        assert!(matches("-size 4k", &log_file()));
        assert!(matches("-size -1M", &log_file()));
        assert!(!matches("-size +1", &EntrySnapshot::new("/x", "x", 0)));
    }

    #[test]
    fn attribute_times() {
        assert!(matches("-mtime +2h", &log_file()));
        assert!(matches("-mtime -1d", &log_file()));
        assert!(!matches("-mtime +{1h}", &log_file()));
        assert!(!matches("-atime -1d", &log_file()));
    }

    #[test]
    fn attribute_time_errors_are_committed() {
        let e = try_compile("-name x -mtime").unwrap_err();
        assert!(!e.is_mismatch());
        assert_eq!(e.position, 3);
        assert_eq!(e.message, "-mtime: expected a sign or a digit");

        let e = try_compile("-mtime +{2h").unwrap_err();
        assert_eq!(e.message, "-mtime: expected a closing brace");
        assert_eq!(e.position, 1);
    }

    #[test]
    fn meta_sets_flag() {
        let flag = Arc::new(AtomicBool::new(false));
        let table = entry_primaries(reference(), flag.clone());
        compile(&table, &tokens("-name x")).unwrap();
        assert!(!flag.load(Ordering::Relaxed));
        compile(&table, &tokens("-name x -o -meta .a b")).unwrap();
        assert!(flag.load(Ordering::Relaxed));
    }

    #[test]
    fn snapshot_of_entry_uses_registry() {
        let entry = MockEntry::builder("pod")
            .content("hello")
            .deletable()
            .build();
        let snapshot = EntrySnapshot::of(&entry, "/pods/pod", 1);
        assert_eq!(snapshot.name, "pod");
        assert_eq!(snapshot.actions, vec!["delete", "read"]);
        assert!(snapshot.metadata.is_none());
    }
}

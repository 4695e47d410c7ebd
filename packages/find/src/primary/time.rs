//! The temporal primary.
//!
//! ```text
//! TimePredicate := Sign (UnitMagnitude | '{' Duration '}')
//! Sign          := '+' | '-'
//! UnitMagnitude := digits ('s' | 'm' | 'h' | 'd' | 'w')
//! ```
//!
//! The unbraced form asks how long ago the subject happened and is rounded
//! to whole units. The braced form asks how soon the subject will happen and
//! compares exact durations. A subject on the wrong side of the reference
//! instant for the chosen form never matches.

use std::time::Duration;

use chrono::{DateTime, NaiveDateTime, Utc};
use lazy_static::lazy_static;
use regex::Regex;

use crate::parser::{ParseResult, PrimaryParser};
use crate::{ParseError, Predicate};

/// The instant every temporal predicate of one query is measured from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct ReferenceInstant(DateTime<Utc>);

impl ReferenceInstant {
    pub fn now() -> Self {
        Self(Utc::now())
    }

    pub fn at(instant: DateTime<Utc>) -> Self {
        Self(instant)
    }

    pub fn instant(&self) -> DateTime<Utc> {
        self.0
    }
}

impl From<DateTime<Utc>> for ReferenceInstant {
    fn from(instant: DateTime<Utc>) -> Self {
        Self(instant)
    }
}

/// Values that may be interpreted as a point in time. Values that can't
/// return `None` and fail any temporal predicate.
pub trait ToTime {
    fn to_time(&self) -> Option<DateTime<Utc>>;
}

impl ToTime for DateTime<Utc> {
    fn to_time(&self) -> Option<DateTime<Utc>> {
        Some(*self)
    }
}

impl ToTime for str {
    fn to_time(&self) -> Option<DateTime<Utc>> {
        parse_timestamp(self)
    }
}

impl ToTime for String {
    fn to_time(&self) -> Option<DateTime<Utc>> {
        parse_timestamp(self)
    }
}

impl ToTime for serde_json::Value {
    fn to_time(&self) -> Option<DateTime<Utc>> {
        self.as_str().and_then(parse_timestamp)
    }
}

const OFFSET_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S%.f %z", "%Y-%m-%dT%H:%M:%S%.f%z"];
const NAIVE_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"];

/// RFC 3339, `2024-01-02 03:04:05.678 +0000` (optionally followed by a zone
/// abbreviation), or a naive timestamp suffixed with `UTC`.
fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(t) = DateTime::parse_from_rfc3339(s) {
        return Some(t.with_timezone(&Utc));
    }
    if let Some(naive) = s.strip_suffix(" UTC") {
        if let Some(t) = NAIVE_FORMATS
            .iter()
            .find_map(|f| NaiveDateTime::parse_from_str(naive, f).ok())
        {
            return Some(t.and_utc());
        }
    }
    let without_zone = match s.rsplit_once(' ') {
        Some((head, zone)) if zone.chars().all(|c| c.is_ascii_alphabetic()) => head,
        _ => s,
    };
    OFFSET_FORMATS
        .iter()
        .find_map(|f| DateTime::parse_from_str(without_zone, f).ok())
        .map(|t| t.with_timezone(&Utc))
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TimeMode {
    /// `+2h`: measured backwards from the reference instant.
    PastMagnitude,
    /// `+{2h}`: measured forwards from the reference instant.
    FutureBracket,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Comparator {
    MoreThan,
    LessThan,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TimeUnit {
    Second,
    Minute,
    Hour,
    Day,
    Week,
}

impl TimeUnit {
    fn from_suffix(suffix: &str) -> Option<Self> {
        Some(match suffix {
            "s" => TimeUnit::Second,
            "m" => TimeUnit::Minute,
            "h" => TimeUnit::Hour,
            "d" => TimeUnit::Day,
            "w" => TimeUnit::Week,
            _ => return None,
        })
    }

    pub fn seconds(&self) -> u64 {
        match self {
            TimeUnit::Second => 1,
            TimeUnit::Minute => 60,
            TimeUnit::Hour => 60 * 60,
            TimeUnit::Day => 24 * 60 * 60,
            TimeUnit::Week => 7 * 24 * 60 * 60,
        }
    }

    pub fn duration(&self) -> Duration {
        Duration::from_secs(self.seconds())
    }
}

/// One compiled temporal primary.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TimePredicate {
    mode: TimeMode,
    comparator: Comparator,
    magnitude: Duration,
    /// Set for the past form only.
    unit: Option<TimeUnit>,
    /// `magnitude` with the past form's rounding applied.
    threshold: Duration,
    reference: ReferenceInstant,
}

impl TimePredicate {
    pub fn past(
        comparator: Comparator,
        count: u64,
        unit: TimeUnit,
        reference: ReferenceInstant,
    ) -> Result<Self, ParseError> {
        let too_large = || ParseError::syntax(format!("magnitude {} is too large", count));
        let units = match comparator {
            // A partial extra unit still counts as more than N.
            Comparator::MoreThan => count.checked_add(1).ok_or_else(too_large)?,
            Comparator::LessThan => count,
        };
        let seconds = |n: u64| {
            unit.seconds()
                .checked_mul(n)
                .map(Duration::from_secs)
                .ok_or_else(too_large)
        };
        let threshold = seconds(units)?;
        let magnitude = seconds(count)?;
        Ok(Self {
            mode: TimeMode::PastMagnitude,
            comparator,
            magnitude,
            unit: Some(unit),
            threshold,
            reference,
        })
    }

    pub fn future(comparator: Comparator, duration: Duration, reference: ReferenceInstant) -> Self {
        Self {
            mode: TimeMode::FutureBracket,
            comparator,
            magnitude: duration,
            unit: None,
            threshold: duration,
            reference,
        }
    }

    pub fn mode(&self) -> TimeMode {
        self.mode
    }

    pub fn comparator(&self) -> Comparator {
        self.comparator
    }

    pub fn magnitude(&self) -> Duration {
        self.magnitude
    }

    pub fn unit(&self) -> Option<TimeUnit> {
        self.unit
    }

    pub fn matches(&self, subject: DateTime<Utc>) -> bool {
        let reference = self.reference.instant();
        match self.mode {
            TimeMode::PastMagnitude => {
                // to_std fails on negative deltas: the subject is in the future.
                let Ok(elapsed) = (reference - subject).to_std() else {
                    return false;
                };
                match self.comparator {
                    Comparator::MoreThan => elapsed >= self.threshold,
                    Comparator::LessThan => elapsed < self.threshold,
                }
            }
            TimeMode::FutureBracket => {
                let remaining = match (subject - reference).to_std() {
                    Ok(d) if !d.is_zero() => d,
                    _ => return false,
                };
                match self.comparator {
                    Comparator::MoreThan => remaining > self.threshold,
                    Comparator::LessThan => remaining < self.threshold,
                }
            }
        }
    }

    /// Parse one temporal predicate off the front of `tokens`.
    pub fn parse(
        tokens: &[String],
        reference: ReferenceInstant,
    ) -> Result<(TimePredicate, &[String]), ParseError> {
        let token = tokens.first().map(String::as_str).unwrap_or("");
        let (comparator, rest) = match token.chars().next() {
            Some('+') => (Comparator::MoreThan, &token[1..]),
            Some('-') => (Comparator::LessThan, &token[1..]),
            Some(c) if c.is_ascii_digit() => {
                return Err(match split_magnitude(token) {
                    Some(_) => ParseError::syntax(format!(
                        "expected a + or - before {}",
                        token
                    )),
                    None => ParseError::mismatch("expected a duration"),
                });
            }
            _ => return Err(ParseError::mismatch("expected a sign or a digit")),
        };

        if let Some(opened) = rest.strip_prefix('{') {
            let (text, consumed) = braced(opened, &tokens[1..])?;
            let text = text.trim();
            if text.is_empty() {
                return Err(ParseError::syntax("expected a duration inside the braces"));
            }
            let duration = parse_duration(text).map_err(ParseError::syntax)?;
            return Ok((
                TimePredicate::future(comparator, duration, reference),
                &tokens[1 + consumed..],
            ));
        }

        let (count, unit) =
            split_magnitude(rest).ok_or_else(|| ParseError::mismatch("expected a duration"))?;
        let count: u64 = count
            .parse()
            .map_err(|_| ParseError::syntax(format!("{} is too large", count)))?;
        let predicate = TimePredicate::past(comparator, count, unit, reference)?;
        Ok((predicate, &tokens[1..]))
    }
}

/// `2h` -> ("2", Hour). Anything else is `None`.
fn split_magnitude(s: &str) -> Option<(&str, TimeUnit)> {
    let digits = s.find(|c: char| !c.is_ascii_digit()).unwrap_or(s.len());
    if digits == 0 {
        return None;
    }
    let (count, suffix) = s.split_at(digits);
    TimeUnit::from_suffix(suffix).map(|unit| (count, unit))
}

/// Collect the text between `{` and `}`. The brace may close in a later
/// token; tokens are rejoined with a single space. Returns the text and how
/// many tokens after the first were used.
fn braced<'a>(first: &'a str, more: &'a [String]) -> Result<(String, usize), ParseError> {
    let mut text = String::new();
    let pieces = std::iter::once(first).chain(more.iter().map(String::as_str));
    for (i, piece) in pieces.enumerate() {
        if i > 0 {
            text.push(' ');
        }
        if let Some(close) = piece.find('}') {
            if close + 1 != piece.len() {
                let trailing = &piece[close + 1..];
                return Err(
                    ParseError::syntax(format!("unexpected {:?} after closing brace", trailing))
                        .at(i),
                );
            }
            text.push_str(&piece[..close]);
            return Ok((text, i));
        }
        text.push_str(piece);
    }
    Err(ParseError::syntax("expected a closing brace"))
}

lazy_static! {
    static ref DURATION_COMPONENT: Regex =
        Regex::new(r"^\s*(\d+(?:\.\d*)?|\.\d+)\s*(ns|us|µs|μs|ms|s|m|h|d|w)").unwrap();
}

fn unit_nanos(unit: &str) -> u128 {
    const SECOND: u128 = 1_000_000_000;
    match unit {
        "ns" => 1,
        "us" | "µs" | "μs" => 1_000,
        "ms" => 1_000_000,
        "s" => SECOND,
        "m" => 60 * SECOND,
        "h" => 60 * 60 * SECOND,
        "d" => 24 * 60 * 60 * SECOND,
        _ => 7 * 24 * 60 * 60 * SECOND,
    }
}

/// Compound durations such as `1h30m`, `1.5h`, `2h 30m`, `250ms`.
pub fn parse_duration(s: &str) -> Result<Duration, String> {
    let invalid = || format!("invalid duration {:?}", s);
    let mut rest = s.trim();
    if rest == "0" {
        return Ok(Duration::ZERO);
    }
    if rest.is_empty() {
        return Err(invalid());
    }
    let mut total: u128 = 0;
    while !rest.is_empty() {
        let caps = DURATION_COMPONENT.captures(rest).ok_or_else(invalid)?;
        let number = &caps[1];
        let scale = unit_nanos(&caps[2]);
        let (whole, fraction) = number.split_once('.').unwrap_or((number, ""));
        let whole: u128 = if whole.is_empty() {
            0
        } else {
            whole.parse().map_err(|_| format!("duration {:?} is too large", s))?
        };
        let mut nanos = whole
            .checked_mul(scale)
            .ok_or_else(|| format!("duration {:?} is too large", s))?;
        if !fraction.is_empty() {
            let fraction: f64 = format!("0.{}", fraction).parse().map_err(|_| invalid())?;
            nanos += (fraction * scale as f64).round() as u128;
        }
        total = total
            .checked_add(nanos)
            .ok_or_else(|| format!("duration {:?} is too large", s))?;
        rest = rest[caps[0].len()..].trim_start();
    }
    let nanos = u64::try_from(total).map_err(|_| format!("duration {:?} is too large", s))?;
    Ok(Duration::from_nanos(nanos))
}

/// The temporal primary, usable on any subject that converts to a time.
#[derive(Clone, Copy, Debug)]
pub struct TimePrimary {
    reference: ReferenceInstant,
}

impl TimePrimary {
    pub fn new(reference: ReferenceInstant) -> Self {
        Self { reference }
    }
}

impl<T> PrimaryParser<T> for TimePrimary
where
    T: ToTime + ?Sized + 'static,
{
    fn parse<'a>(&self, tokens: &'a [String]) -> ParseResult<'a, T> {
        let (time, rest) = TimePredicate::parse(tokens, self.reference)?;
        let predicate = Predicate::atomic(move |subject: &T| {
            subject.to_time().is_some_and(|t| time.matches(t))
        });
        Ok((predicate, rest))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn reference() -> ReferenceInstant {
        ReferenceInstant::at(Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap())
    }

    fn hours(n: i64) -> DateTime<Utc> {
        reference().instant() + chrono::Duration::hours(n)
    }

    fn tokens(s: &str) -> Vec<String> {
        s.split_whitespace().map(String::from).collect()
    }

    fn compile(s: &str) -> (Predicate<DateTime<Utc>>, usize) {
        let tokens = tokens(s);
        let (p, rest) = PrimaryParser::<DateTime<Utc>>::parse(&TimePrimary::new(reference()), &tokens)
            .unwrap();
        (p, rest.len())
    }

    fn matches(s: &str, subject: DateTime<Utc>) -> bool {
        compile(s).0.eval(&subject)
    }

    fn parse_error(s: &str) -> ParseError {
        TimePredicate::parse(&tokens(s), reference()).unwrap_err()
    }

    #[test]
    fn past_magnitude() {
        assert!(matches("+2h", hours(-3)));
        assert!(!matches("+2h", hours(-1)));
        assert!(matches("-2h", hours(-1)));
        assert!(!matches("-2h", hours(-3)));
    }

    #[test]
    fn past_magnitude_rounds_up_for_more_than() {
        // 2h30m ago is not "more than 2 hours" at whole-hour granularity.
        let subject = hours(-2) - chrono::Duration::minutes(30);
        assert!(!matches("+2h", subject));
        assert!(matches("+2h", hours(-3)));
        assert!(matches("-3h", subject));
    }

    #[test]
    fn past_magnitude_beyond_u32_units() {
        let (p, _) = TimePredicate::parse(&tokens("+5000000000s"), reference()).unwrap();
        assert_eq!(p.magnitude(), Duration::from_secs(5_000_000_000));

        let at = |secs: i64| reference().instant() - chrono::Duration::seconds(secs);
        assert!(matches("+5000000000s", at(5_000_000_001)));
        assert!(!matches("+5000000000s", at(5_000_000_000)));
        assert!(matches("-5000000000s", at(4_999_999_999)));

        // u64 seconds overflow is still rejected.
        let e = parse_error("+9999999999999999999w");
        assert!(!e.is_mismatch());
        assert!(e.message.contains("too large"));
    }

    #[test]
    fn future_bracket() {
        assert!(matches("+{2h}", hours(3)));
        assert!(!matches("+{2h}", hours(1)));
        assert!(matches("-{2h}", hours(1)));
        assert!(!matches("-{2h}", hours(3)));
    }

    #[test]
    fn direction_mismatch_is_false() {
        for expr in ["+2h", "-2h", "+0s", "-9999w"] {
            assert!(!matches(expr, hours(5)), "{} matched a future subject", expr);
        }
        for expr in ["+{2h}", "-{2h}", "-{9999h}"] {
            assert!(!matches(expr, hours(-5)), "{} matched a past subject", expr);
            assert!(!matches(expr, reference().instant()), "{} matched the reference", expr);
        }
    }

    #[test]
    fn leaves_following_tokens() {
        assert_eq!(compile("+2h -size").1, 1);
        assert_eq!(compile("+{2h} -size").1, 1);
        assert_eq!(compile("-{1h 30m} -size +1").1, 2);
    }

    #[test]
    fn braces_span_tokens() {
        let (p, rest) = compile("+{1h 30m}");
        assert_eq!(rest, 0);
        assert!(p.eval(&(hours(1) + chrono::Duration::minutes(31))));
        assert!(!p.eval(&(hours(1) + chrono::Duration::minutes(29))));
    }

    #[test]
    fn parse_errors() {
        let e = parse_error("");
        assert!(e.is_mismatch());
        assert_eq!(e.message, "expected a sign or a digit");

        let e = parse_error("200");
        assert!(e.is_mismatch());
        assert_eq!(e.message, "expected a duration");

        let e = parse_error("+{");
        assert!(!e.is_mismatch());
        assert_eq!(e.message, "expected a closing brace");

        assert!(parse_error("{2h}").is_mismatch());
        assert!(parse_error("+2x").is_mismatch());
        assert!(parse_error("+").is_mismatch());
        assert!(!parse_error("2h").is_mismatch());
        assert!(!parse_error("+{}").is_mismatch());
        assert!(!parse_error("+{2q}").is_mismatch());
        assert!(!parse_error("+{2h}x").is_mismatch());
        assert!(!parse_error("+99999999999999999999h").is_mismatch());
    }

    #[test]
    fn string_subjects_are_converted() {
        let (p, _) = compile("+2h");
        let lifted: Predicate<str> = p.lift(|s: &str| s.to_time());
        assert!(lifted.eval(&hours(-3).to_rfc3339()));
        assert!(lifted.eval(&hours(-3).to_string()));
        assert!(!lifted.eval("not_a_valid_time_value"));

        let tokens = tokens("+2h");
        let (p, _) = PrimaryParser::<serde_json::Value>::parse(&TimePrimary::new(reference()), &tokens)
            .unwrap();
        assert!(p.eval(&serde_json::json!(hours(-3).to_rfc3339())));
        assert!(!p.eval(&serde_json::json!(42)));
    }

    #[test]
    fn go_style_timestamps() {
        let t = "2024-06-01 09:00:00.5 +0000 UTC".to_time().unwrap();
        assert_eq!(t, hours(-3) + chrono::Duration::milliseconds(500));
    }

    #[test]
    fn durations() {
        assert_eq!(parse_duration("2h"), Ok(Duration::from_secs(7200)));
        assert_eq!(parse_duration("1h30m"), Ok(Duration::from_secs(5400)));
        assert_eq!(parse_duration("1h 30m"), Ok(Duration::from_secs(5400)));
        assert_eq!(parse_duration("1.5h"), Ok(Duration::from_secs(5400)));
        assert_eq!(parse_duration("250ms"), Ok(Duration::from_millis(250)));
        assert_eq!(parse_duration("1d"), Ok(Duration::from_secs(86400)));
        assert_eq!(parse_duration("0"), Ok(Duration::ZERO));
        assert!(parse_duration("").is_err());
        assert!(parse_duration("h").is_err());
        assert!(parse_duration("2").is_err());
        assert!(parse_duration("2h bogus").is_err());
    }

    #[test]
    fn records_mode_and_unit() {
        let (p, _) = TimePredicate::parse(&tokens("-3d"), reference()).unwrap();
        assert_eq!(p.mode(), TimeMode::PastMagnitude);
        assert_eq!(p.comparator(), Comparator::LessThan);
        assert_eq!(p.unit(), Some(TimeUnit::Day));
        assert_eq!(p.magnitude(), Duration::from_secs(3 * 86400));

        let (p, _) = TimePredicate::parse(&tokens("+{90s}"), reference()).unwrap();
        assert_eq!(p.mode(), TimeMode::FutureBracket);
        assert_eq!(p.unit(), None);
    }
}

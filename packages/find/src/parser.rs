//! Primary parsers and the boolean expression compiler.
//!
//! A primary parser consumes a prefix of the token stream and returns a
//! predicate plus whatever it didn't consume. How many tokens it takes is
//! up to the parser. [`compile`] strings primaries together left to right:
//!
//! ```text
//! expr   := term (("-o" | "-or") term)*
//! term   := factor (["-a" | "-and"] factor)*      adjacent factors are AND-ed
//! factor := ("!" | "-not") factor | "(" expr ")" | primary
//! ```

use std::collections::BTreeMap;

use crate::{ParseError, Predicate};

/// How deeply `!` and `(` may nest.
pub const MAX_NESTING: usize = 256;

pub type ParseResult<'a, T> = Result<(Predicate<T>, &'a [String]), ParseError>;

pub trait PrimaryParser<T: ?Sized>: Send + Sync {
    fn parse<'a>(&self, tokens: &'a [String]) -> ParseResult<'a, T>;
}

impl<T: ?Sized, F> PrimaryParser<T> for F
where
    F: for<'a> Fn(&'a [String]) -> ParseResult<'a, T> + Send + Sync,
{
    fn parse<'a>(&self, tokens: &'a [String]) -> ParseResult<'a, T> {
        self(tokens)
    }
}

/// Pins a closure to the primary parser signature so its input and output
/// lifetimes are inferred as linked.
pub fn primary_fn<T, F>(f: F) -> F
where
    T: ?Sized,
    F: for<'a> Fn(&'a [String]) -> ParseResult<'a, T> + Send + Sync,
{
    f
}

/// Named primaries (`-name`, `-mtime`, ...). The leading token selects the
/// parser, which then sees the tokens after it.
pub struct PrimaryTable<T: ?Sized> {
    primaries: BTreeMap<&'static str, Box<dyn PrimaryParser<T>>>,
}

impl<T: ?Sized> Default for PrimaryTable<T> {
    fn default() -> Self {
        Self {
            primaries: BTreeMap::new(),
        }
    }
}

impl<T: ?Sized> PrimaryTable<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// # Panics
    ///
    /// If `name` is already registered.
    pub fn register<P>(&mut self, name: &'static str, parser: P) -> &mut Self
    where
        P: PrimaryParser<T> + 'static,
    {
        let previous = self.primaries.insert(name, Box::new(parser));
        assert!(previous.is_none(), "primary {} registered twice", name);
        self
    }

    pub fn contains(&self, name: &str) -> bool {
        self.primaries.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.primaries.keys().copied()
    }
}

impl<T: ?Sized> PrimaryParser<T> for PrimaryTable<T> {
    fn parse<'a>(&self, tokens: &'a [String]) -> ParseResult<'a, T> {
        let Some(name) = tokens.first() else {
            return Err(ParseError::mismatch("expected a primary"));
        };
        let Some(parser) = self.primaries.get(name.as_str()) else {
            return Err(ParseError::mismatch(format!(
                "unknown primary or operator {:?}",
                name
            )));
        };
        parser.parse(&tokens[1..]).map_err(|e| {
            let message = format!("{}: {}", name, e.message);
            ParseError {
                message,
                ..e.committed().shifted(1)
            }
        })
    }
}

/// Tries each parser in turn and takes the first that doesn't mismatch.
pub struct FirstMatch<T: ?Sized> {
    parsers: Vec<Box<dyn PrimaryParser<T>>>,
    expected: &'static str,
}

impl<T: ?Sized> FirstMatch<T> {
    /// `expected` describes the accepted inputs when nothing matches.
    pub fn new(expected: &'static str) -> Self {
        Self {
            parsers: Vec::new(),
            expected,
        }
    }

    pub fn or_try<P>(mut self, parser: P) -> Self
    where
        P: PrimaryParser<T> + 'static,
    {
        self.parsers.push(Box::new(parser));
        self
    }
}

impl<T: ?Sized> PrimaryParser<T> for FirstMatch<T> {
    fn parse<'a>(&self, tokens: &'a [String]) -> ParseResult<'a, T> {
        for parser in &self.parsers {
            match parser.parse(tokens) {
                Err(e) if e.is_mismatch() => continue,
                result => return result,
            }
        }
        Err(ParseError::mismatch(self.expected))
    }
}

/// Compile a whole token stream into one predicate.
///
/// Every token must be consumed. An empty stream matches everything.
pub fn compile<T>(atoms: &dyn PrimaryParser<T>, tokens: &[String]) -> Result<Predicate<T>, ParseError>
where
    T: ?Sized + 'static,
{
    if tokens.is_empty() {
        return Ok(Predicate::always(true));
    }
    let mut expr = Expression {
        atoms,
        tokens,
        pos: 0,
        depth: 0,
    };
    let predicate = expr.parse_or()?;
    if let Some(token) = expr.peek() {
        return Err(ParseError::syntax(format!("unexpected {:?}", token)).at(expr.pos));
    }
    Ok(predicate)
}

struct Expression<'p, 't, T: ?Sized> {
    atoms: &'p dyn PrimaryParser<T>,
    tokens: &'t [String],
    pos: usize,
    depth: usize,
}

impl<'p, 't, T: ?Sized + 'static> Expression<'p, 't, T> {
    fn peek(&self) -> Option<&'t str> {
        self.tokens.get(self.pos).map(String::as_str)
    }

    fn at_operand_boundary(&self) -> bool {
        matches!(
            self.peek(),
            None | Some(")") | Some("-o") | Some("-or") | Some("-a") | Some("-and")
        )
    }

    fn parse_or(&mut self) -> Result<Predicate<T>, ParseError> {
        let mut left = self.parse_and()?;
        while let Some(op @ ("-o" | "-or")) = self.peek() {
            let op_pos = self.pos;
            self.pos += 1;
            if self.at_operand_boundary() {
                return Err(
                    ParseError::syntax(format!("expected an expression after {}", op)).at(op_pos)
                );
            }
            let right = self.parse_and()?;
            left = left.or(right);
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Predicate<T>, ParseError> {
        let mut left = self.parse_factor()?;
        loop {
            match self.peek() {
                None | Some("-o") | Some("-or") | Some(")") => break,
                Some(op @ ("-a" | "-and")) => {
                    let op_pos = self.pos;
                    self.pos += 1;
                    if self.at_operand_boundary() {
                        return Err(ParseError::syntax(format!(
                            "expected an expression after {}",
                            op
                        ))
                        .at(op_pos));
                    }
                }
                Some(_) => {}
            }
            let right = self.parse_factor()?;
            left = left.and(right);
        }
        Ok(left)
    }

    fn nested<F>(&mut self, at: usize, parse: F) -> Result<Predicate<T>, ParseError>
    where
        F: FnOnce(&mut Self) -> Result<Predicate<T>, ParseError>,
    {
        if self.depth >= MAX_NESTING {
            return Err(ParseError::syntax(format!(
                "expressions nest deeper than {}",
                MAX_NESTING
            ))
            .at(at));
        }
        self.depth += 1;
        let result = parse(self);
        self.depth -= 1;
        result
    }

    fn parse_factor(&mut self) -> Result<Predicate<T>, ParseError> {
        match self.peek() {
            None => Err(ParseError::syntax("expected an expression").at(self.pos)),
            Some(op @ ("!" | "-not")) => {
                let op_pos = self.pos;
                self.pos += 1;
                if self.at_operand_boundary() {
                    return Err(
                        ParseError::syntax(format!("expected an expression after {}", op))
                            .at(op_pos),
                    );
                }
                Ok(!self.nested(op_pos, Self::parse_factor)?)
            }
            Some("(") => {
                let open = self.pos;
                self.pos += 1;
                if self.peek() == Some(")") {
                    return Err(ParseError::syntax("empty parentheses").at(open));
                }
                let inner = self.nested(open, Self::parse_or)?;
                if self.peek() != Some(")") {
                    return Err(ParseError::syntax("expected a closing parenthesis").at(open));
                }
                self.pos += 1;
                Ok(inner)
            }
            Some(")") => Err(ParseError::syntax("unexpected \")\"").at(self.pos)),
            Some(op @ ("-o" | "-or" | "-a" | "-and")) => {
                Err(ParseError::syntax(format!("expected an expression before {}", op)).at(self.pos))
            }
            Some(_) => {
                let rest = &self.tokens[self.pos..];
                let (predicate, remaining) = self
                    .atoms
                    .parse(rest)
                    .map_err(|e| e.committed().shifted(self.pos))?;
                let consumed = rest.len() - remaining.len();
                if consumed == 0 {
                    return Err(ParseError::syntax("primary consumed no tokens").at(self.pos));
                }
                self.pos += consumed;
                Ok(predicate)
            }
        }
    }
}

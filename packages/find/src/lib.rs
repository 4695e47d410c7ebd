//! # entryfs-find
//!
//! Boolean predicate expressions over entries, compiled from a token stream
//! in the style of `find(1)`, and a traversal driver that applies them.
//!
//! ```rust,ignore
//! use entryfs_find::{walk, FindConfig, Query};
//!
//! let query = Query::parse(&["-name", "*.log", "-mtime", "+2h"])?;
//! let report = walk::find(&ctx, root, &FindConfig::default(), &query).await?;
//! for entry in &report.matches {
//!     println!("{}", entry.path);
//! }
//! ```
//!
//! Primaries are parsers that consume as many tokens as they need and
//! produce a [`Predicate`]. New primaries plug in through
//! [`parser::PrimaryParser`] and [`parser::PrimaryTable`].

mod config;
mod error;
pub mod parser;
mod predicate;
pub mod primary;
mod query;
pub mod walk;

pub use config::FindConfig;
pub use error::{Error, ParseError, ParseErrorKind, Result};
pub use predicate::Predicate;
pub use primary::time::{ReferenceInstant, TimePredicate, ToTime};
pub use primary::EntrySnapshot;
pub use query::Query;
pub use walk::{find, FindReport, WalkError, WalkOp};

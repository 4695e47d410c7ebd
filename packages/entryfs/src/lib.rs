//! entryfs: heterogeneous resources as a uniform tree of named entries.
//!
//! Each entry supports some subset of a fixed set of capabilities (listing,
//! reading, exec, ...). [`plugin`] defines the entries and the actions
//! callers may take on them; [`find`] filters a tree with `find(1)`-style
//! predicate expressions.

pub use entryfs_find as find;
pub use entryfs_plugin as plugin;

pub use entryfs_find::{FindConfig, FindReport, Query};
pub use entryfs_plugin::{Action, Context, Entry, Error, ExternalEntry, Result};

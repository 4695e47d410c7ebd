//! # entryfs-plugin
//!
//! The entry model: a tree of named [`Entry`] values, each satisfying some
//! subset of the capability contracts ([`Group`], [`Readable`],
//! [`Execable`], ...), and the [`Action`] vocabulary that tells callers what
//! they may do with an entry.
//!
//! ```rust,ignore
//! use entryfs_plugin::{action, Action, Context};
//!
//! let supported = action::supported_actions_of(entry.as_ref());
//! if Action::LIST.is_supported_on(entry.as_ref()) {
//!     let children = entry.as_group().unwrap().list(&Context::new()).await?;
//! }
//! ```
//!
//! Entries backed by code that can't implement the traits directly are
//! wrapped in an [`ExternalEntry`], which carries a declared action table.

pub use bytes::Bytes;

pub mod action;
mod attributes;
mod cache;
mod context;
mod entry;
mod error;
pub mod exec;
mod external;

#[cfg(any(test, feature = "test-utils"))]
pub mod testing;

pub use action::{Action, ActionRegistry, MethodSignature, SignatureResolver};
pub use attributes::Attributes;
pub use cache::{cache_config_of, CacheConfig, CachedOp};
pub use context::Context;
pub use entry::{
    capabilities_of, BlockReadable, ByteStream, Cached, Capability, Deletable, Entry, ExecOptions,
    Execable, Group, MetadataMap, Readable, Resource, Signalable, SizedReader, Streamable,
    Writable,
};
pub use error::{Error, Result};
pub use exec::{ExecOutput, ExecOutputChunk, ExecResult, ExitCode, StreamId};
pub use external::ExternalEntry;

//! Entries and the capability contracts they may satisfy.
//!
//! An [`Entry`] only has to be named. Everything else is optional: a type
//! opts into a contract by implementing the contract trait and overriding
//! the matching `as_*` accessor to return `Some(self)`:
//!
//! ```rust,ignore
//! struct Container { name: String }
//!
//! impl Entry for Container {
//!     fn name(&self) -> &str { &self.name }
//!     fn as_execable(&self) -> Option<&dyn Execable> { Some(self) }
//! }
//!
//! #[async_trait]
//! impl Execable for Container {
//!     async fn exec(&self, ctx: &Context, cmd: &str, args: &[String], opts: ExecOptions)
//!         -> Result<ExecResult> { /* ... */ }
//! }
//! ```
//!
//! The accessors are the capability query. They must give the same answer
//! for the whole lifetime of the entry.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::io;
use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::io::AsyncRead;

use crate::{Attributes, CacheConfig, Context, ExecResult, ExternalEntry, Result};

/// Structured attributes returned by [`Resource::metadata`].
pub type MetadataMap = BTreeMap<String, serde_json::Value>;

/// A stream of bytes consumed by [`Writable::save`] or produced by
/// [`Streamable::stream`].
pub type ByteStream = Pin<Box<dyn AsyncRead + Send>>;

/// A named node in the entry tree.
pub trait Entry: Send + Sync {
    fn name(&self) -> &str;

    fn attributes(&self) -> Attributes {
        Attributes::default()
    }

    fn as_group(&self) -> Option<&dyn Group> {
        None
    }

    fn as_resource(&self) -> Option<&dyn Resource> {
        None
    }

    fn as_readable(&self) -> Option<&dyn Readable> {
        None
    }

    fn as_block_readable(&self) -> Option<&dyn BlockReadable> {
        None
    }

    fn as_writable(&self) -> Option<&dyn Writable> {
        None
    }

    fn as_execable(&self) -> Option<&dyn Execable> {
        None
    }

    fn as_streamable(&self) -> Option<&dyn Streamable> {
        None
    }

    fn as_deletable(&self) -> Option<&dyn Deletable> {
        None
    }

    fn as_signalable(&self) -> Option<&dyn Signalable> {
        None
    }

    fn as_cached(&self) -> Option<&dyn Cached> {
        None
    }

    /// `Some` only for entries whose capabilities are declared rather than
    /// typed. Action resolution consults the declaration instead of the
    /// accessors above.
    fn as_external(&self) -> Option<&ExternalEntry> {
        None
    }
}

impl<'a> fmt::Debug for dyn Entry + 'a {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Entry").field("name", &self.name()).finish()
    }
}

/// An entry that can list its children.
#[async_trait]
pub trait Group: Entry {
    async fn list(&self, ctx: &Context) -> Result<Vec<Arc<dyn Entry>>>;
}

/// An entry with structured metadata.
#[async_trait]
pub trait Resource: Entry {
    async fn metadata(&self, ctx: &Context) -> Result<MetadataMap>;
}

/// Random-access content with a known size.
pub trait SizedReader: Send + Sync {
    fn size(&self) -> u64;

    /// Read into `buf` starting at `offset`. Returns 0 at or past the end.
    fn read_at(&self, buf: &mut [u8], offset: u64) -> io::Result<usize>;

    fn read_to_end(&self) -> io::Result<Vec<u8>> {
        let size = usize::try_from(self.size())
            .map_err(|_| io::Error::new(io::ErrorKind::InvalidData, "content too large"))?;
        let mut out = vec![0u8; size];
        let mut filled = 0;
        while filled < size {
            let n = self.read_at(&mut out[filled..], filled as u64)?;
            if n == 0 {
                break;
            }
            filled += n;
        }
        out.truncate(filled);
        Ok(out)
    }
}

impl SizedReader for Bytes {
    fn size(&self) -> u64 {
        self.len() as u64
    }

    fn read_at(&self, buf: &mut [u8], offset: u64) -> io::Result<usize> {
        let Ok(start) = usize::try_from(offset) else {
            return Ok(0);
        };
        if start >= self.len() {
            return Ok(0);
        }
        let n = buf.len().min(self.len() - start);
        buf[..n].copy_from_slice(&self[start..start + n]);
        Ok(n)
    }
}

/// An entry with a fixed amount of content that is opened as a whole.
#[async_trait]
pub trait Readable: Entry {
    async fn open(&self, ctx: &Context) -> Result<Box<dyn SizedReader>>;
}

/// An entry whose content is read block by block at arbitrary offsets.
///
/// Serves the same "read" action as [`Readable`], under the
/// [`MethodSignature::BlockAddressable`](crate::MethodSignature::BlockAddressable)
/// convention.
#[async_trait]
pub trait BlockReadable: Entry {
    fn size(&self) -> u64;

    async fn read(&self, ctx: &Context, size: usize, offset: u64) -> Result<Bytes>;
}

#[async_trait]
pub trait Writable: Entry {
    async fn save(&self, ctx: &Context, data: ByteStream) -> Result<()>;
}

/// Options for [`Execable::exec`].
#[derive(Default)]
pub struct ExecOptions {
    /// Fed to the command's standard input when present.
    pub stdin: Option<ByteStream>,
    pub tty: bool,
    pub elevate: bool,
}

/// An entry that can run a command.
#[async_trait]
pub trait Execable: Entry {
    /// Launch `cmd` and return immediately. Output and exit status arrive
    /// through the returned [`ExecResult`].
    async fn exec(
        &self,
        ctx: &Context,
        cmd: &str,
        args: &[String],
        opts: ExecOptions,
    ) -> Result<ExecResult>;
}

/// An entry that produces a live feed of updates.
#[async_trait]
pub trait Streamable: Entry {
    async fn stream(&self, ctx: &Context) -> Result<ByteStream>;
}

#[async_trait]
pub trait Deletable: Entry {
    async fn delete(&self, ctx: &Context) -> Result<()>;
}

#[async_trait]
pub trait Signalable: Entry {
    async fn signal(&self, ctx: &Context, signal: &str) -> Result<()>;
}

/// An entry that brings its own cache policy.
pub trait Cached: Entry {
    /// `None` means "use the default policy".
    fn cache_config(&self) -> Option<CacheConfig>;
}

/// The capability contracts an entry may satisfy.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Capability {
    Group,
    Resource,
    Readable,
    BlockReadable,
    Writable,
    Execable,
    Streamable,
    Deletable,
    Signalable,
    Cached,
}

impl Capability {
    pub const ALL: [Capability; 10] = [
        Capability::Group,
        Capability::Resource,
        Capability::Readable,
        Capability::BlockReadable,
        Capability::Writable,
        Capability::Execable,
        Capability::Streamable,
        Capability::Deletable,
        Capability::Signalable,
        Capability::Cached,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Capability::Group => "Group",
            Capability::Resource => "Resource",
            Capability::Readable => "Readable",
            Capability::BlockReadable => "BlockReadable",
            Capability::Writable => "Writable",
            Capability::Execable => "Execable",
            Capability::Streamable => "Streamable",
            Capability::Deletable => "Deletable",
            Capability::Signalable => "Signalable",
            Capability::Cached => "Cached",
        }
    }

    /// Whether `entry` implements this contract natively.
    pub fn is_satisfied_by(&self, entry: &dyn Entry) -> bool {
        match self {
            Capability::Group => entry.as_group().is_some(),
            Capability::Resource => entry.as_resource().is_some(),
            Capability::Readable => entry.as_readable().is_some(),
            Capability::BlockReadable => entry.as_block_readable().is_some(),
            Capability::Writable => entry.as_writable().is_some(),
            Capability::Execable => entry.as_execable().is_some(),
            Capability::Streamable => entry.as_streamable().is_some(),
            Capability::Deletable => entry.as_deletable().is_some(),
            Capability::Signalable => entry.as_signalable().is_some(),
            Capability::Cached => entry.as_cached().is_some(),
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub fn capabilities_of(entry: &dyn Entry) -> BTreeSet<Capability> {
    Capability::ALL
        .into_iter()
        .filter(|c| c.is_satisfied_by(entry))
        .collect()
}

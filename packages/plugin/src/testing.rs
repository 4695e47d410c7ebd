//! In-memory entries for tests.
//!
//! Enabled for this crate's own tests and, for downstream crates, with the
//! `test-utils` feature.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::Bytes;
use tokio::io::AsyncReadExt;

use crate::{
    Attributes, BlockReadable, ByteStream, CacheConfig, Cached, Context, Deletable, Entry, Error,
    ExecOptions, ExecResult, Execable, Group, MetadataMap, Readable, Resource, Result, Signalable,
    SizedReader, Streamable, Writable,
};

/// An entry whose capability set is chosen at build time.
///
/// A contract is satisfied iff the builder configured it.
pub struct MockEntry {
    name: String,
    attributes: Attributes,
    children: Option<Vec<Arc<dyn Entry>>>,
    list_error: Option<String>,
    metadata: Option<MetadataMap>,
    metadata_error: Option<String>,
    content: Option<Bytes>,
    block: bool,
    saved: Option<Mutex<Vec<u8>>>,
    exec: Option<(i32, Bytes)>,
    stream: Option<Bytes>,
    deletable: bool,
    deleted: AtomicBool,
    signals: Option<Mutex<Vec<String>>>,
    cache: Option<Option<CacheConfig>>,
}

impl MockEntry {
    pub fn builder(name: impl Into<String>) -> MockEntryBuilder {
        MockEntryBuilder {
            entry: MockEntry {
                name: name.into(),
                attributes: Attributes::default(),
                children: None,
                list_error: None,
                metadata: None,
                metadata_error: None,
                content: None,
                block: false,
                saved: None,
                exec: None,
                stream: None,
                deletable: false,
                deleted: AtomicBool::new(false),
                signals: None,
                cache: None,
            },
        }
    }

    /// Everything written through [`Writable::save`] so far.
    pub fn saved(&self) -> Vec<u8> {
        self.saved
            .as_ref()
            .and_then(|s| s.lock().ok().map(|s| s.clone()))
            .unwrap_or_default()
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted.load(Ordering::SeqCst)
    }

    pub fn signals(&self) -> Vec<String> {
        self.signals
            .as_ref()
            .and_then(|s| s.lock().ok().map(|s| s.clone()))
            .unwrap_or_default()
    }
}

pub struct MockEntryBuilder {
    entry: MockEntry,
}

impl MockEntryBuilder {
    pub fn attributes(mut self, attributes: Attributes) -> Self {
        self.entry.attributes = attributes;
        self
    }

    pub fn children(mut self, children: Vec<Arc<dyn Entry>>) -> Self {
        self.entry.children = Some(children);
        self
    }

    /// A group whose listing always fails.
    pub fn failing_list(mut self, message: impl Into<String>) -> Self {
        self.entry.children = Some(Vec::new());
        self.entry.list_error = Some(message.into());
        self
    }

    /// Metadata from a JSON object. Non-object values give empty metadata.
    pub fn metadata(mut self, metadata: serde_json::Value) -> Self {
        let map = match metadata {
            serde_json::Value::Object(map) => map.into_iter().collect(),
            _ => MetadataMap::new(),
        };
        self.entry.metadata = Some(map);
        self
    }

    /// A resource whose metadata always fails to load.
    pub fn failing_metadata(mut self, message: impl Into<String>) -> Self {
        self.entry.metadata = Some(MetadataMap::new());
        self.entry.metadata_error = Some(message.into());
        self
    }

    pub fn content(mut self, content: impl Into<Bytes>) -> Self {
        self.entry.content = Some(content.into());
        self.entry.block = false;
        self
    }

    pub fn block_content(mut self, content: impl Into<Bytes>) -> Self {
        self.entry.content = Some(content.into());
        self.entry.block = true;
        self
    }

    pub fn writable(mut self) -> Self {
        self.entry.saved = Some(Mutex::new(Vec::new()));
        self
    }

    pub fn exec_output(mut self, exit_code: i32, stdout: impl Into<Bytes>) -> Self {
        self.entry.exec = Some((exit_code, stdout.into()));
        self
    }

    pub fn stream_content(mut self, content: impl Into<Bytes>) -> Self {
        self.entry.stream = Some(content.into());
        self
    }

    pub fn deletable(mut self) -> Self {
        self.entry.deletable = true;
        self
    }

    pub fn signalable(mut self) -> Self {
        self.entry.signals = Some(Mutex::new(Vec::new()));
        self
    }

    pub fn cached(mut self, config: Option<CacheConfig>) -> Self {
        self.entry.cache = Some(config);
        self
    }

    pub fn build(self) -> MockEntry {
        self.entry
    }
}

impl Entry for MockEntry {
    fn name(&self) -> &str {
        &self.name
    }

    fn attributes(&self) -> Attributes {
        self.attributes.clone()
    }

    fn as_group(&self) -> Option<&dyn Group> {
        self.children.as_ref().map(|_| self as &dyn Group)
    }

    fn as_resource(&self) -> Option<&dyn Resource> {
        self.metadata.as_ref().map(|_| self as &dyn Resource)
    }

    fn as_readable(&self) -> Option<&dyn Readable> {
        match (&self.content, self.block) {
            (Some(_), false) => Some(self),
            _ => None,
        }
    }

    fn as_block_readable(&self) -> Option<&dyn BlockReadable> {
        match (&self.content, self.block) {
            (Some(_), true) => Some(self),
            _ => None,
        }
    }

    fn as_writable(&self) -> Option<&dyn Writable> {
        self.saved.as_ref().map(|_| self as &dyn Writable)
    }

    fn as_execable(&self) -> Option<&dyn Execable> {
        self.exec.as_ref().map(|_| self as &dyn Execable)
    }

    fn as_streamable(&self) -> Option<&dyn Streamable> {
        self.stream.as_ref().map(|_| self as &dyn Streamable)
    }

    fn as_deletable(&self) -> Option<&dyn Deletable> {
        self.deletable.then_some(self as &dyn Deletable)
    }

    fn as_signalable(&self) -> Option<&dyn Signalable> {
        self.signals.as_ref().map(|_| self as &dyn Signalable)
    }

    fn as_cached(&self) -> Option<&dyn Cached> {
        self.cache.as_ref().map(|_| self as &dyn Cached)
    }
}

impl MockEntry {
    fn missing(&self, action: &str) -> Error {
        Error::not_supported(self.name.clone(), action)
    }
}

#[async_trait]
impl Group for MockEntry {
    async fn list(&self, ctx: &Context) -> Result<Vec<Arc<dyn Entry>>> {
        ctx.check()?;
        if let Some(message) = &self.list_error {
            return Err(Error::backend(message.clone()));
        }
        self.children.clone().ok_or_else(|| self.missing("list"))
    }
}

#[async_trait]
impl Resource for MockEntry {
    async fn metadata(&self, ctx: &Context) -> Result<MetadataMap> {
        ctx.check()?;
        if let Some(message) = &self.metadata_error {
            return Err(Error::backend(message.clone()));
        }
        self.metadata.clone().ok_or_else(|| self.missing("metadata"))
    }
}

#[async_trait]
impl Readable for MockEntry {
    async fn open(&self, ctx: &Context) -> Result<Box<dyn SizedReader>> {
        ctx.check()?;
        let content = self.content.clone().ok_or_else(|| self.missing("read"))?;
        Ok(Box::new(content))
    }
}

#[async_trait]
impl BlockReadable for MockEntry {
    fn size(&self) -> u64 {
        self.content.as_ref().map_or(0, |c| c.len() as u64)
    }

    async fn read(&self, ctx: &Context, size: usize, offset: u64) -> Result<Bytes> {
        ctx.check()?;
        let content = self.content.as_ref().ok_or_else(|| self.missing("read"))?;
        let start = usize::try_from(offset).unwrap_or(usize::MAX).min(content.len());
        let end = start.saturating_add(size).min(content.len());
        Ok(content.slice(start..end))
    }
}

#[async_trait]
impl Writable for MockEntry {
    async fn save(&self, ctx: &Context, mut data: ByteStream) -> Result<()> {
        let saved = self.saved.as_ref().ok_or_else(|| self.missing("write"))?;
        let mut buf = Vec::new();
        ctx.run(async {
            data.read_to_end(&mut buf).await?;
            Ok::<(), Error>(())
        })
        .await?;
        let mut saved = saved
            .lock()
            .map_err(|_| Error::backend("saved content lock poisoned"))?;
        *saved = buf;
        Ok(())
    }
}

#[async_trait]
impl Execable for MockEntry {
    async fn exec(
        &self,
        ctx: &Context,
        _cmd: &str,
        _args: &[String],
        _opts: ExecOptions,
    ) -> Result<ExecResult> {
        ctx.check()?;
        let (exit_code, stdout) = self.exec.clone().ok_or_else(|| self.missing("exec"))?;
        Ok(ExecResult::completed(ctx, stdout, exit_code).await)
    }
}

#[async_trait]
impl Streamable for MockEntry {
    async fn stream(&self, ctx: &Context) -> Result<ByteStream> {
        ctx.check()?;
        let content = self.stream.clone().ok_or_else(|| self.missing("stream"))?;
        Ok(Box::pin(std::io::Cursor::new(content)))
    }
}

#[async_trait]
impl Deletable for MockEntry {
    async fn delete(&self, ctx: &Context) -> Result<()> {
        ctx.check()?;
        if !self.deletable {
            return Err(self.missing("delete"));
        }
        self.deleted.store(true, Ordering::SeqCst);
        Ok(())
    }
}

#[async_trait]
impl Signalable for MockEntry {
    async fn signal(&self, ctx: &Context, signal: &str) -> Result<()> {
        ctx.check()?;
        let signals = self.signals.as_ref().ok_or_else(|| self.missing("signal"))?;
        signals
            .lock()
            .map_err(|_| Error::backend("signal log lock poisoned"))?
            .push(signal.to_string());
        Ok(())
    }
}

impl Cached for MockEntry {
    fn cache_config(&self) -> Option<CacheConfig> {
        self.cache.clone().flatten()
    }
}

//! Cache policy contract.
//!
//! The policy is produced by entries and consumed by an external cache
//! layer. Nothing in this workspace interprets the TTLs beyond storing them.

use std::collections::BTreeMap;
use std::time::Duration;

use crate::Entry;

const DEFAULT_TTL: Duration = Duration::from_secs(15);

/// Operations whose results a cache layer may keep.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CachedOp {
    List,
    Open,
    Metadata,
}

impl CachedOp {
    pub const ALL: [CachedOp; 3] = [CachedOp::List, CachedOp::Open, CachedOp::Metadata];
}

/// Per-operation cache TTLs. A TTL of zero means "don't cache".
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CacheConfig {
    ttl: BTreeMap<CachedOp, Duration>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl: CachedOp::ALL.iter().map(|op| (*op, DEFAULT_TTL)).collect(),
        }
    }
}

impl CacheConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ttl_of(&self, op: CachedOp) -> Duration {
        self.ttl.get(&op).copied().unwrap_or(DEFAULT_TTL)
    }

    pub fn set_ttl(&mut self, op: CachedOp, ttl: Duration) -> &mut Self {
        self.ttl.insert(op, ttl);
        self
    }

    pub fn disable(&mut self, op: CachedOp) -> &mut Self {
        self.set_ttl(op, Duration::ZERO)
    }

    pub fn is_cached(&self, op: CachedOp) -> bool {
        !self.ttl_of(op).is_zero()
    }
}

/// The entry's own policy, or `None` when the default policy applies
/// (either because the entry isn't `Cached` or because it asked for the
/// default).
pub fn cache_config_of(entry: &dyn Entry) -> Option<CacheConfig> {
    entry.as_cached().and_then(|c| c.cache_config())
}

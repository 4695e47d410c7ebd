//! Filesystem-like attributes an entry may report.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Attributes of an entry. Every field is optional; backends fill in what
/// they know.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attributes {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub atime: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mtime: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ctime: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub crtime: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
}

impl Attributes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_atime(mut self, t: DateTime<Utc>) -> Self {
        self.atime = Some(t);
        self
    }

    pub fn with_mtime(mut self, t: DateTime<Utc>) -> Self {
        self.mtime = Some(t);
        self
    }

    pub fn with_ctime(mut self, t: DateTime<Utc>) -> Self {
        self.ctime = Some(t);
        self
    }

    pub fn with_crtime(mut self, t: DateTime<Utc>) -> Self {
        self.crtime = Some(t);
        self
    }

    pub fn with_mode(mut self, mode: u32) -> Self {
        self.mode = Some(mode);
        self
    }

    pub fn with_size(mut self, size: u64) -> Self {
        self.size = Some(size);
        self
    }
}

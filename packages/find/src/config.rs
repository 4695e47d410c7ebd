//! Traversal configuration.

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Limits and options for [`crate::walk::find`].
///
/// ```json
/// { "mindepth": 1, "maxdepth": 3, "fetch_metadata": false }
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FindConfig {
    /// Entries shallower than this are walked but not matched. The root is
    /// at depth 0.
    pub mindepth: usize,
    /// Entries deeper than this are not visited.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub maxdepth: Option<usize>,
    /// Fetch metadata for every entry even if the query doesn't need it.
    pub fetch_metadata: bool,
}

impl FindConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        let config: FindConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if let Some(maxdepth) = self.maxdepth {
            if self.mindepth > maxdepth {
                return Err(Error::Config {
                    message: format!(
                        "mindepth ({}) is greater than maxdepth ({})",
                        self.mindepth, maxdepth
                    ),
                });
            }
        }
        Ok(())
    }

    pub fn with_mindepth(mut self, mindepth: usize) -> Self {
        self.mindepth = mindepth;
        self
    }

    pub fn with_maxdepth(mut self, maxdepth: usize) -> Self {
        self.maxdepth = Some(maxdepth);
        self
    }

    pub fn with_fetch_metadata(mut self, fetch: bool) -> Self {
        self.fetch_metadata = fetch;
        self
    }

    /// Whether entries at `depth` are matched against the query.
    pub fn matches_at(&self, depth: usize) -> bool {
        depth >= self.mindepth && self.maxdepth.map_or(true, |max| depth <= max)
    }

    /// Whether children of an entry at `depth` are visited.
    pub fn descends_from(&self, depth: usize) -> bool {
        self.maxdepth.map_or(true, |max| depth < max)
    }
}

//! Depth-first traversal of an entry tree.

use std::fmt;
use std::sync::Arc;

use entryfs_plugin::{Action, Context, Entry};

use crate::primary::EntrySnapshot;
use crate::{FindConfig, Query, Result};

/// The operation a [`WalkError`] came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WalkOp {
    List,
    Metadata,
}

impl fmt::Display for WalkOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WalkOp::List => f.write_str("list"),
            WalkOp::Metadata => f.write_str("metadata"),
        }
    }
}

/// A failure on one entry. The walk skips past it.
#[derive(thiserror::Error, Debug)]
#[error("{op} {path}: {source}")]
pub struct WalkError {
    pub path: String,
    pub op: WalkOp,
    #[source]
    pub source: entryfs_plugin::Error,
}

#[derive(Debug, Default)]
pub struct FindReport {
    /// Matching entries in visit order.
    pub matches: Vec<EntrySnapshot>,
    pub visited: usize,
    pub errors: Vec<WalkError>,
}

fn child_path(parent: &str, name: &str) -> String {
    if parent.ends_with('/') {
        format!("{}{}", parent, name)
    } else {
        format!("{}/{}", parent, name)
    }
}

/// Walk the tree under `root` in pre-order, children in listing order,
/// and collect the entries that satisfy `query`.
///
/// The root is at path `/` and depth 0. Only entries the action registry says
/// support `list` are descended into. Listing and metadata failures are
/// recorded in the report and the walk moves on. Cancelling `ctx` stops the
/// walk with [`entryfs_plugin::Error::Cancelled`].
pub async fn find(
    ctx: &Context,
    root: Arc<dyn Entry>,
    config: &FindConfig,
    query: &Query,
) -> Result<FindReport> {
    config.validate()?;
    let fetch_metadata = config.fetch_metadata || query.needs_metadata();
    log::debug!(
        "walking from {:?} (mindepth {}, maxdepth {:?}, metadata {})",
        root.name(),
        config.mindepth,
        config.maxdepth,
        fetch_metadata
    );

    let mut report = FindReport::default();
    let mut stack: Vec<(Arc<dyn Entry>, String, usize)> = vec![(root, "/".to_string(), 0)];

    while let Some((entry, path, depth)) = stack.pop() {
        ctx.check()?;
        report.visited += 1;

        if config.matches_at(depth) {
            let mut snapshot = EntrySnapshot::of(entry.as_ref(), path.as_str(), depth);
            if fetch_metadata {
                if let Some(resource) = entry.as_resource() {
                    match ctx.run(resource.metadata(ctx)).await {
                        Ok(metadata) => snapshot.metadata = Some(metadata),
                        Err(e) if e.is_cancelled() => return Err(e.into()),
                        Err(e) => {
                            log::warn!("skipping metadata for {}: {}", path, e);
                            report.errors.push(WalkError {
                                path: path.clone(),
                                op: WalkOp::Metadata,
                                source: e,
                            });
                        }
                    }
                }
            }
            if query.matches(&snapshot) {
                report.matches.push(snapshot);
            }
        }

        if !config.descends_from(depth) || !Action::LIST.is_supported_on(entry.as_ref()) {
            continue;
        }
        let Some(group) = entry.as_group() else {
            continue;
        };
        match ctx.run(group.list(ctx)).await {
            Ok(children) => {
                // Reversed so that the first child is popped first.
                for child in children.into_iter().rev() {
                    let child_path = child_path(&path, child.name());
                    stack.push((child, child_path, depth + 1));
                }
            }
            Err(e) if e.is_cancelled() => return Err(e.into()),
            Err(e) => {
                log::warn!("skipping children of {}: {}", path, e);
                report.errors.push(WalkError {
                    path,
                    op: WalkOp::List,
                    source: e,
                });
            }
        }
    }

    log::debug!(
        "walk visited {} entries, {} matched, {} errors",
        report.visited,
        report.matches.len(),
        report.errors.len()
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn child_paths() {
        assert_eq!(child_path("/", "pods"), "/pods");
        assert_eq!(child_path("/pods", "web"), "/pods/web");
    }

    #[test]
    fn walk_error_display() {
        let e = WalkError {
            path: "/pods".to_string(),
            op: WalkOp::List,
            source: entryfs_plugin::Error::backend("timed out"),
        };
        assert!(e.to_string().starts_with("list /pods: "));
    }
}

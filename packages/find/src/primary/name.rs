//! Shell glob matching for `-name` and `-path`.

use globset::{GlobBuilder, GlobMatcher};

use crate::ParseError;

/// Compile a glob (`*`, `?`, `[...]`, `[!...]`, `{a,b}`) that must match the
/// whole subject. `*` and `?` also match `/`, and a backslash escapes the
/// next character.
pub fn glob_matcher(glob: &str) -> Result<GlobMatcher, ParseError> {
    let glob = GlobBuilder::new(glob)
        .literal_separator(false)
        .backslash_escape(true)
        .build()
        .map_err(|e| ParseError::syntax(format!("invalid pattern {:?}: {}", glob, e.kind())))?;
    Ok(glob.compile_matcher())
}

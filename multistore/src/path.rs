//! Query path parsing

use canopy_core::{StoreError, StoreResult};

/// Separator between path segments
pub const PATH_SEPARATOR: char = '/';

/// Split `path` into its first segment and the remainder.
///
/// `"/fizz/bang/baz"` → `("fizz", "/bang/baz")`, `"/foo"` → `("foo", "")`.
/// The remainder keeps its leading separator, so it can be parsed again to
/// walk nested paths.
pub fn parse_path(path: &str) -> StoreResult<(&str, &str)> {
    let rest = path
        .strip_prefix(PATH_SEPARATOR)
        .ok_or_else(|| StoreError::MalformedPath(format!("invalid path: {}", path)))?;

    Ok(match rest.find(PATH_SEPARATOR) {
        Some(idx) => rest.split_at(idx),
        None => (rest, ""),
    })
}

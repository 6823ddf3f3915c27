//! Source registry: loads all source definitions from embedded TOML configs.
//!
//! Each `.toml` file in `packages/source/sources/` is baked into the binary
//! at compile time via [`include_str!`]. Adding a new source is as simple as
//! creating a new TOML file and adding it to the list below.

use std::path::Path;

use crate::SourceError;
use crate::source_def::{SourceDefinition, load_source_file, parse_source_toml};

/// TOML configs embedded at compile time.
const SOURCE_TOMLS: &[(&str, &str)] = &[("yale", include_str!("../sources/yale.toml"))];

/// Source used when none is named.
pub const DEFAULT_SOURCE: &str = "yale";

/// Returns all configured source definitions, parsed from embedded TOML.
///
/// # Panics
///
/// Panics if any TOML config is malformed (this is a compile-time guarantee
/// since the configs are embedded).
#[must_use]
pub fn all_sources() -> Vec<SourceDefinition> {
    SOURCE_TOMLS
        .iter()
        .map(|(name, toml)| {
            parse_source_toml(toml).unwrap_or_else(|e| panic!("Failed to parse {name}.toml: {e}"))
        })
        .collect()
}

/// Looks up an embedded source by id.
#[must_use]
pub fn find_source(id: &str) -> Option<SourceDefinition> {
    all_sources().into_iter().find(|source| source.id == id)
}

/// Picks the source for a run: a definition file wins over an embedded id,
/// and [`DEFAULT_SOURCE`] is used when neither is given.
///
/// # Errors
///
/// * [`SourceError::UnknownSource`] if no embedded source has the id.
/// * Any error from [`load_source_file`].
pub fn resolve_source(id: Option<&str>, config: Option<&Path>) -> Result<SourceDefinition, SourceError> {
    if let Some(path) = config {
        log::debug!("Loading source definition from {}", path.display());
        return load_source_file(path);
    }

    let id = id.unwrap_or(DEFAULT_SOURCE);
    find_source(id).ok_or_else(|| SourceError::UnknownSource(id.to_owned()))
}

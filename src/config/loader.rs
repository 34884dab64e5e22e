// src/config/loader.rs

use std::path::Path;

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::Result;
use crate::fs::{FileSystem, RealFileSystem};

/// Parse workflow TOML without semantic validation.
pub fn parse_raw(contents: &str) -> Result<RawConfigFile> {
    Ok(toml::from_str(contents)?)
}

/// Parse and validate workflow TOML held in memory.
pub fn parse_and_validate(contents: &str) -> Result<ConfigFile> {
    ConfigFile::try_from(parse_raw(contents)?)
}

/// Load a workflow file from disk and run validation.
///
/// This is the recommended entry point:
///
/// - Reads TOML.
/// - Applies defaults (handled by `serde` + `Default` impls).
/// - Checks for:
///   - unknown `after` references,
///   - cycles (including self-dependencies),
///   - durations and `[config]` sanity.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<ConfigFile> {
    load_and_validate_with(&RealFileSystem, path)
}

/// Same as [`load_and_validate`], reading through the given [`FileSystem`].
pub fn load_and_validate_with(fs: &dyn FileSystem, path: impl AsRef<Path>) -> Result<ConfigFile> {
    let contents = fs.read_to_string(path.as_ref())?;
    parse_and_validate(&contents)
}

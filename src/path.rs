//! Path and name validation.
//!
//! `mount`/`unmount` use the strict [`validate_mount_path`]: no empty path,
//! must start with `/`, no internal `//`. Lookup (`Storage::get_node`) is
//! deliberately more permissive — see [`split_segments_lenient`] — per the
//! asymmetry called out as resolved in the specification's open questions.

use crate::error::{NameError, PathError};

pub const SEPARATOR: char = '/';

pub fn validate_name(name: &str) -> Result<(), NameError> {
    if name.is_empty() {
        return Err(NameError::Empty);
    }
    if name.contains(SEPARATOR) {
        return Err(NameError::ContainsSeparator);
    }
    Ok(())
}

/// Validates a path for `mount`/`unmount` and returns the segment string with
/// the leading separator and at most one trailing separator stripped.
pub fn validate_mount_path(path: &str) -> Result<&str, PathError> {
    if path.is_empty() {
        return Err(PathError::Empty);
    }
    if !path.starts_with(SEPARATOR) {
        return Err(PathError::MissingLeadingSlash);
    }
    let body = &path[1..];
    let trimmed = body.strip_suffix(SEPARATOR).unwrap_or(body);
    if trimmed.contains("//") || trimmed.starts_with(SEPARATOR) || trimmed.ends_with(SEPARATOR) {
        return Err(PathError::DoubleSeparator);
    }
    Ok(trimmed)
}

/// Splits an already-validated mount path body into its segments.
pub fn mount_segments(body: &str) -> Vec<&str> {
    if body.is_empty() {
        Vec::new()
    } else {
        body.split(SEPARATOR).collect()
    }
}

/// Splits a lookup path leniently: requires the leading separator, trims at
/// most one trailing separator, but does not reject interior double
/// separators — an interior empty segment simply fails to resolve later,
/// since no child is ever named the empty string.
pub fn split_segments_lenient(path: &str) -> Result<Vec<&str>, PathError> {
    if path.is_empty() {
        return Err(PathError::Empty);
    }
    if !path.starts_with(SEPARATOR) {
        return Err(PathError::MissingLeadingSlash);
    }
    let body = &path[1..];
    let trimmed = body.strip_suffix(SEPARATOR).unwrap_or(body);
    if trimmed.is_empty() {
        return Ok(Vec::new());
    }
    Ok(trimmed.split(SEPARATOR).collect())
}

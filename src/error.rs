//! Internal error types used during validation.
//!
//! These are never exposed across the public API: callers see `bool` or
//! `Option` as described by the crate's error-handling philosophy. Keeping
//! them as proper `std::error::Error` impls internally lets validation code
//! stay composable and testable with `?` instead of threading booleans by
//! hand through every helper.

use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq, Clone, Copy)]
pub enum NameError {
    #[error("child name must not be empty")]
    Empty,
    #[error("child name must not contain the path separator")]
    ContainsSeparator,
}

#[derive(Error, Debug, PartialEq, Eq, Clone, Copy)]
pub enum PathError {
    #[error("path must not be empty")]
    Empty,
    #[error("path must start with '/'")]
    MissingLeadingSlash,
    #[error("path must not contain consecutive separators")]
    DoubleSeparator,
}

//! Core types and error handling for dcgen
//!
//! This module holds the pieces every other module depends on: the [`GenError`]
//! type and the user-facing [`ErrorContext`] reporting, plus the
//! [`ArgumentDictionary`] alias used from resolution through rendering.
//!
//! The argument dictionary is a `BTreeMap` so iteration order is the sorted key
//! order. Two runs over identical inputs therefore serialize byte-for-byte the same.

pub mod error;

pub use error::{ErrorContext, GenError, user_friendly_error};

use std::collections::BTreeMap;

/// Mapping from variable name to its final string value.
pub type ArgumentDictionary = BTreeMap<String, String>;

/// Result alias for engine operations.
pub type GenResult<T> = std::result::Result<T, GenError>;

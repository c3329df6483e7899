//! Validation for namespace names, keys and values
//!
//! Limits follow the conventions of page-based embedded stores: keys must be
//! non-empty and fit in half a page chain, values are capped below 2 GiB.

use crate::error::{NestboxError, Result};

/// Maximum key (and namespace name) size in bytes
pub const MAX_KEY_SIZE: usize = 32_768;

/// Maximum value size in bytes
pub const MAX_VALUE_SIZE: usize = (1 << 31) - 2;

/// Validate a namespace name
///
/// # Errors
///
/// Returns `NameRequired` for an empty name and `KeyTooLarge` when the name
/// exceeds [`MAX_KEY_SIZE`].
pub fn validate_name(name: &[u8]) -> Result<()> {
    if name.is_empty() {
        return Err(NestboxError::NameRequired);
    }
    check_key_len(name.len())
}

/// Validate a key before it is written
pub fn validate_key(key: &[u8]) -> Result<()> {
    if key.is_empty() {
        return Err(NestboxError::KeyRequired);
    }
    check_key_len(key.len())
}

/// Validate a value before it is written
pub fn validate_value(value: &[u8]) -> Result<()> {
    if value.len() > MAX_VALUE_SIZE {
        return Err(NestboxError::ValueTooLarge {
            max: MAX_VALUE_SIZE,
            actual: value.len(),
        });
    }
    Ok(())
}

fn check_key_len(len: usize) -> Result<()> {
    if len > MAX_KEY_SIZE {
        return Err(NestboxError::KeyTooLarge {
            max: MAX_KEY_SIZE,
            actual: len,
        });
    }
    Ok(())
}

/// Render a namespace path for diagnostics (`a/b/c`)
pub fn display_path<'a, I>(names: I) -> String
where
    I: IntoIterator<Item = &'a [u8]>,
{
    names
        .into_iter()
        .map(|n| String::from_utf8_lossy(n).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

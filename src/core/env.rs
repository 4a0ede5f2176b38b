//! Environment variable helpers shared by the `from_env` constructors

use anyhow::{Context, Result};
use std::env;
use std::str::FromStr;

/// Read `name`, treating unset and blank values as absent.
pub fn var(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Read and parse `name`. Absent is `Ok(None)`; a value that does not parse
/// is an error naming the variable.
pub fn parse_var<T>(name: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    var(name)
        .map(|raw| {
            raw.parse::<T>()
                .with_context(|| format!("{} has an invalid value: {:?}", name, raw))
        })
        .transpose()
}

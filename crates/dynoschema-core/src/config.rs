//! Builder configuration.
//!
//! Provides [`BuilderConfig`], the knobs shared by every scan, query and put
//! builder. Values can be set in code through the typed builder or loaded
//! from environment variables via [`BuilderConfig::from_env`].

use std::env;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use typed_builder::TypedBuilder;

/// Upper bound the store documents for the operand list of an `IN` comparison.
pub const DEFAULT_MAX_IN_OPERANDS: usize = 100;

/// How attribute names are written into expression text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NamePolicy {
    /// Every name segment goes through a `#nN` placeholder.
    #[default]
    Always,
    /// Plain identifiers are inlined; reserved words and names with
    /// characters outside `[A-Za-z0-9_]` still go through a placeholder.
    ReservedOnly,
}

impl fmt::Display for NamePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Always => f.write_str("always"),
            Self::ReservedOnly => f.write_str("reserved-only"),
        }
    }
}

impl FromStr for NamePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "always" => Ok(Self::Always),
            "reserved-only" | "reserved_only" => Ok(Self::ReservedOnly),
            other => Err(format!("unknown name policy: {other}")),
        }
    }
}

/// Configuration shared by the request builders.
///
/// # Examples
///
/// ```
/// use dynoschema_core::config::{BuilderConfig, NamePolicy};
///
/// let config = BuilderConfig::builder().page_size(Some(25)).build();
/// assert_eq!(config.max_in_operands, 100);
/// assert_eq!(config.name_policy, NamePolicy::Always);
/// assert_eq!(config.page_size, Some(25));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TypedBuilder)]
#[serde(rename_all = "camelCase")]
pub struct BuilderConfig {
    /// Maximum number of operands accepted by `IN`.
    #[builder(default = DEFAULT_MAX_IN_OPERANDS)]
    pub max_in_operands: usize,

    /// Placeholder policy for attribute names.
    #[builder(default)]
    pub name_policy: NamePolicy,

    /// Default `Limit` for scans and queries.
    #[builder(default)]
    pub page_size: Option<u32>,

    /// Whether reads ask for strong consistency by default.
    #[builder(default = false)]
    pub consistent_read: bool,
}

impl Default for BuilderConfig {
    fn default() -> Self {
        Self {
            max_in_operands: DEFAULT_MAX_IN_OPERANDS,
            name_policy: NamePolicy::Always,
            page_size: None,
            consistent_read: false,
        }
    }
}

impl BuilderConfig {
    /// Load configuration from environment variables.
    ///
    /// | Variable | Default |
    /// |----------|---------|
    /// | `DYNOSCHEMA_MAX_IN_OPERANDS` | `100` |
    /// | `DYNOSCHEMA_NAME_POLICY` | `always` |
    /// | `DYNOSCHEMA_PAGE_SIZE` | unset |
    /// | `DYNOSCHEMA_CONSISTENT_READ` | `false` |
    ///
    /// Unparseable values fall back to the default.
    #[must_use]
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Some(v) = env_parse("DYNOSCHEMA_MAX_IN_OPERANDS") {
            config.max_in_operands = v;
        }
        if let Some(v) = env_parse("DYNOSCHEMA_NAME_POLICY") {
            config.name_policy = v;
        }
        if let Some(v) = env_parse("DYNOSCHEMA_PAGE_SIZE") {
            config.page_size = Some(v);
        }
        config.consistent_read = env_bool("DYNOSCHEMA_CONSISTENT_READ", config.consistent_read);

        config
    }
}

fn env_parse<T: FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|v| v.trim().parse().ok())
}

fn env_bool(key: &str, default: bool) -> bool {
    env::var(key).map_or(default, |v| {
        matches!(v.as_str(), "1" | "true" | "yes" | "TRUE" | "YES")
    })
}

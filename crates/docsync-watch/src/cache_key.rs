//! Cache key construction.
//!
//! Keys have the shape `type:rootPath:discriminator...`. Discriminator lists
//! are normalized so that configurations which only differ in order,
//! duplication or surrounding whitespace share one entry.

use std::collections::BTreeSet;
use std::path::Path;

/// Trim, drop empty values, dedupe and sort.
pub fn normalize_discriminators<I, S>(values: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    values
        .into_iter()
        .map(|v| v.as_ref().trim().to_string())
        .filter(|v| !v.is_empty())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Backslash-escape the list and part separators.
fn escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '\\' | ',' | ':') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Builder for `type:root:...` keys.
#[derive(Debug, Clone)]
pub struct CacheKey {
    parts: Vec<String>,
}

impl CacheKey {
    /// Start a key for the given entry type and root.
    pub fn new(kind: &str, root: &Path) -> Self {
        Self {
            parts: vec![kind.to_string(), root.to_string_lossy().into_owned()],
        }
    }

    /// Append a single discriminator verbatim.
    pub fn part(mut self, value: impl ToString) -> Self {
        self.parts.push(value.to_string());
        self
    }

    /// Append a list discriminator after normalizing it.
    pub fn list<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let escaped: Vec<String> = normalize_discriminators(values)
            .iter()
            .map(|v| escape(v))
            .collect();
        self.parts.push(escaped.join(","));
        self
    }

    /// Prefix shared by every key of this type and root.
    pub fn prefix(kind: &str, root: &Path) -> String {
        format!("{}:{}:", kind, root.to_string_lossy())
    }

    /// Render the key.
    pub fn build(self) -> String {
        self.parts.join(":")
    }
}

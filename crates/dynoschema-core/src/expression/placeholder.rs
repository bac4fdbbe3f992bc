//! Placeholder allocation for expression attribute names and values.

use crate::config::NamePolicy;
use crate::schema::is_plain_identifier;

/// Hands out `#nN` and `:vN` placeholders with strictly increasing,
/// zero-based indices.
///
/// One allocator shared across several compilations keeps their index ranges
/// disjoint, so their name and value maps can be merged into one request.
#[derive(Debug, Clone, Default)]
pub struct PlaceholderAllocator {
    policy: NamePolicy,
    next_name: usize,
    next_value: usize,
}

impl PlaceholderAllocator {
    /// A fresh allocator using `policy` for attribute names.
    #[must_use]
    pub fn new(policy: NamePolicy) -> Self {
        Self {
            policy,
            next_name: 0,
            next_value: 0,
        }
    }

    /// The name policy in force.
    #[must_use]
    pub fn policy(&self) -> NamePolicy {
        self.policy
    }

    /// Whether `segment` must be written through a name placeholder.
    /// Reserved words and non-identifiers always are.
    #[must_use]
    pub fn needs_placeholder(&self, segment: &str) -> bool {
        match self.policy {
            NamePolicy::Always => true,
            NamePolicy::ReservedOnly => !is_plain_identifier(segment),
        }
    }

    /// Next attribute-name placeholder.
    pub fn next_name(&mut self) -> String {
        let placeholder = format!("#n{}", self.next_name);
        self.next_name += 1;
        placeholder
    }

    /// Next attribute-value placeholder.
    pub fn next_value(&mut self) -> String {
        let placeholder = format!(":v{}", self.next_value);
        self.next_value += 1;
        placeholder
    }

    /// Name placeholders handed out so far.
    #[must_use]
    pub fn names_allocated(&self) -> usize {
        self.next_name
    }

    /// Value placeholders handed out so far.
    #[must_use]
    pub fn values_allocated(&self) -> usize {
        self.next_value
    }
}

//! Document paths into an item.
//!
//! A path is a sequence of named attributes and list indices, written
//! `address.city` or `tags[0]` in dotted form.

use std::fmt;
use std::str::FromStr;

use crate::error::SchemaError;

/// A single element in an attribute path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PathElement {
    /// A named attribute.
    Attribute(String),
    /// A list index dereference (e.g., `[0]`).
    Index(usize),
}

/// A document path consisting of one or more elements.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AttributePath {
    /// The path elements in order. The first element is always an attribute.
    pub elements: Vec<PathElement>,
}

impl AttributePath {
    /// A path naming one top-level attribute. The name is taken verbatim,
    /// so it may contain dots or brackets.
    #[must_use]
    pub fn attribute(name: impl Into<String>) -> Self {
        Self {
            elements: vec![PathElement::Attribute(name.into())],
        }
    }

    /// A path of named segments taken verbatim.
    #[must_use]
    pub fn from_segments<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            elements: segments
                .into_iter()
                .map(|s| PathElement::Attribute(s.into()))
                .collect(),
        }
    }

    /// Parse a dotted path such as `address.city` or `orders[2].total`.
    ///
    /// # Errors
    ///
    /// Returns `SchemaError::InvalidPath` for empty segments, unbalanced
    /// brackets, non-numeric indices, or a path that starts with an index.
    pub fn parse(input: &str) -> Result<Self, SchemaError> {
        let invalid = |reason: &str| SchemaError::InvalidPath {
            path: input.to_owned(),
            reason: reason.to_owned(),
        };

        let mut elements = Vec::new();
        for segment in input.split('.') {
            let (name, mut rest) = match segment.find('[') {
                Some(pos) => segment.split_at(pos),
                None => (segment, ""),
            };
            if name.is_empty() {
                return Err(invalid("empty segment"));
            }
            if name.contains(']') {
                return Err(invalid("unbalanced ']'"));
            }
            elements.push(PathElement::Attribute(name.to_owned()));

            while !rest.is_empty() {
                let Some(inner) = rest.strip_prefix('[') else {
                    return Err(invalid("unexpected characters after index"));
                };
                let Some(close) = inner.find(']') else {
                    return Err(invalid("unclosed '['"));
                };
                let index = inner[..close]
                    .parse::<usize>()
                    .map_err(|_| invalid("list index must be a non-negative integer"))?;
                elements.push(PathElement::Index(index));
                rest = &inner[close + 1..];
            }
        }

        Ok(Self { elements })
    }

    /// The top-level attribute this path starts from.
    #[must_use]
    pub fn root(&self) -> Option<&str> {
        match self.elements.first() {
            Some(PathElement::Attribute(name)) => Some(name),
            _ => None,
        }
    }

    /// Returns `true` if the path names a single top-level attribute.
    #[must_use]
    pub fn is_top_level(&self) -> bool {
        self.elements.len() == 1
    }

    /// Returns `true` if `prefix` is a leading run of this path's elements.
    #[must_use]
    pub fn starts_with(&self, prefix: &AttributePath) -> bool {
        self.elements.starts_with(&prefix.elements)
    }

    /// Returns `true` if any named segment is empty.
    #[must_use]
    pub fn has_empty_segment(&self) -> bool {
        self.elements
            .iter()
            .any(|e| matches!(e, PathElement::Attribute(name) if name.is_empty()))
    }
}

impl FromStr for AttributePath {
    type Err = SchemaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for AttributePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, elem) in self.elements.iter().enumerate() {
            match elem {
                PathElement::Attribute(name) => {
                    if i > 0 {
                        write!(f, ".{name}")?;
                    } else {
                        write!(f, "{name}")?;
                    }
                }
                PathElement::Index(idx) => write!(f, "[{idx}]")?,
            }
        }
        Ok(())
    }
}

//! Attribute type model: the declared shape of a table.
//!
//! A [`SchemaDescriptor`] is built once, validated eagerly, and then shared
//! read-only (usually behind an `Arc`) by every marshaler and builder for that
//! table.

pub mod reserved;

use std::collections::{HashMap, HashSet};
use std::fmt;

use dynoschema_model::WireType;
use sha2::{Digest, Sha256};

use crate::error::SchemaError;
use crate::path::AttributePath;

pub use reserved::{is_plain_identifier, is_reserved_word};

/// Number of hex characters kept from the schema hash.
const FINGERPRINT_LEN: usize = 16;

/// One declared attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeSpec {
    /// Logical name, unique within the schema. For top-level attributes this
    /// is also the attribute name on the wire.
    pub name: String,
    /// Store-side type.
    pub wire_type: WireType,
    /// Document path for nested attributes; empty for top-level ones.
    pub path: Vec<String>,
    /// Whether the attribute may be absent or null.
    pub nullable: bool,
    /// Whether any segment of the name is a reserved word. Computed by the
    /// schema builder.
    pub reserved: bool,
}

impl AttributeSpec {
    /// A required top-level attribute.
    #[must_use]
    pub fn new(name: impl Into<String>, wire_type: WireType) -> Self {
        let name = name.into();
        Self {
            reserved: is_reserved_word(&name),
            name,
            wire_type,
            path: Vec::new(),
            nullable: false,
        }
    }

    /// A typed attribute nested inside a Map or List attribute.
    #[must_use]
    pub fn nested<I, S>(name: impl Into<String>, wire_type: WireType, path: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let path: Vec<String> = path.into_iter().map(Into::into).collect();
        Self {
            reserved: path.iter().any(|s| is_reserved_word(s)),
            name: name.into(),
            wire_type,
            path,
            nullable: true,
        }
    }

    /// Marks the attribute as nullable.
    #[must_use]
    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    /// Returns `true` for attributes stored at the top level of an item.
    #[must_use]
    pub fn is_top_level(&self) -> bool {
        self.path.is_empty()
    }

    /// The document path of this attribute.
    #[must_use]
    pub fn document_path(&self) -> AttributePath {
        if self.is_top_level() {
            AttributePath::attribute(self.name.clone())
        } else {
            AttributePath::from_segments(self.path.iter().cloned())
        }
    }
}

/// Partition key and optional sort key of a table or index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeySchema {
    /// Partition (HASH) key attribute name.
    pub partition_key: String,
    /// Optional sort (RANGE) key attribute name.
    pub sort_key: Option<String>,
}

impl KeySchema {
    /// Returns `true` if `name` is one of these keys.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.partition_key == name || self.sort_key.as_deref() == Some(name)
    }
}

/// A global or local secondary index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecondaryIndex {
    /// The index name.
    pub name: String,
    /// The index's own key attributes.
    pub keys: KeySchema,
}

impl SecondaryIndex {
    /// An index keyed on `partition_key` only.
    #[must_use]
    pub fn new(name: impl Into<String>, partition_key: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            keys: KeySchema {
                partition_key: partition_key.into(),
                sort_key: None,
            },
        }
    }

    /// Adds a sort key to the index.
    #[must_use]
    pub fn with_sort_key(mut self, sort_key: impl Into<String>) -> Self {
        self.keys.sort_key = Some(sort_key.into());
        self
    }
}

/// Result of resolving a document path against the schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolvedPath<'a> {
    /// The path matches a declared attribute exactly.
    Declared(&'a AttributeSpec),
    /// The path descends into a declared Map or List whose inner shape is not
    /// declared; operand types cannot be checked.
    Untyped {
        /// The deepest declared container on the path.
        container: &'a AttributeSpec,
    },
}

/// The immutable, validated description of one table.
#[derive(Debug, Clone)]
pub struct SchemaDescriptor {
    table_name: String,
    attributes: Vec<AttributeSpec>,
    by_name: HashMap<String, usize>,
    keys: KeySchema,
    indexes: Vec<SecondaryIndex>,
    fingerprint: String,
}

impl SchemaDescriptor {
    /// Start describing the table `table_name`.
    #[must_use]
    pub fn builder(table_name: impl Into<String>) -> SchemaBuilder {
        SchemaBuilder {
            table_name: table_name.into(),
            attributes: Vec::new(),
            partition_key: None,
            sort_key: None,
            indexes: Vec::new(),
        }
    }

    /// The table name.
    #[must_use]
    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    /// All attributes in declaration order.
    pub fn attributes(&self) -> impl Iterator<Item = &AttributeSpec> {
        self.attributes.iter()
    }

    /// Top-level attributes in declaration order.
    pub fn top_level_attributes(&self) -> impl Iterator<Item = &AttributeSpec> {
        self.attributes.iter().filter(|a| a.is_top_level())
    }

    /// The table's primary key.
    #[must_use]
    pub fn keys(&self) -> &KeySchema {
        &self.keys
    }

    /// The partition key attribute.
    #[must_use]
    pub fn partition_key(&self) -> &AttributeSpec {
        &self.attributes[self.by_name[&self.keys.partition_key]]
    }

    /// The sort key attribute, if the table has one.
    #[must_use]
    pub fn sort_key(&self) -> Option<&AttributeSpec> {
        self.keys
            .sort_key
            .as_ref()
            .map(|name| &self.attributes[self.by_name[name]])
    }

    /// Declared secondary indexes.
    #[must_use]
    pub fn indexes(&self) -> &[SecondaryIndex] {
        &self.indexes
    }

    /// Look up a secondary index by name.
    ///
    /// # Errors
    ///
    /// Returns `SchemaError::IndexNotFound` if no index has that name.
    pub fn index(&self, name: &str) -> Result<&SecondaryIndex, SchemaError> {
        self.indexes
            .iter()
            .find(|i| i.name == name)
            .ok_or_else(|| SchemaError::IndexNotFound {
                name: name.to_owned(),
            })
    }

    /// Look up an attribute by its logical name.
    ///
    /// # Errors
    ///
    /// Returns `SchemaError::NotFound` if the name is not declared.
    pub fn attribute(&self, name: &str) -> Result<&AttributeSpec, SchemaError> {
        self.by_name
            .get(name)
            .map(|&i| &self.attributes[i])
            .ok_or_else(|| SchemaError::NotFound {
                path: name.to_owned(),
            })
    }

    /// Resolve a document path to the attribute it addresses.
    ///
    /// An exact match on a declared path wins. Otherwise the deepest declared
    /// Map or List on the path is returned as [`ResolvedPath::Untyped`].
    ///
    /// # Errors
    ///
    /// Returns `SchemaError::NotFound` if the path does not start at a
    /// declared attribute.
    pub fn attribute_by_path(&self, path: &AttributePath) -> Result<ResolvedPath<'_>, SchemaError> {
        let mut container: Option<(usize, &AttributeSpec)> = None;

        for spec in &self.attributes {
            let declared = spec.document_path();
            if declared == *path {
                return Ok(ResolvedPath::Declared(spec));
            }
            let is_container = matches!(spec.wire_type, WireType::Map | WireType::List);
            if is_container && path.starts_with(&declared) {
                let depth = declared.elements.len();
                if container.is_none_or(|(d, _)| depth > d) {
                    container = Some((depth, spec));
                }
            }
        }

        container
            .map(|(_, spec)| ResolvedPath::Untyped { container: spec })
            .ok_or_else(|| SchemaError::NotFound {
                path: path.to_string(),
            })
    }

    /// Names of every key attribute: table keys first, then index keys, each
    /// listed once.
    #[must_use]
    pub fn key_attribute_names(&self) -> Vec<&str> {
        let mut seen = HashSet::new();
        let table = std::iter::once(&self.keys);
        let index = self.indexes.iter().map(|i| &i.keys);
        table
            .chain(index)
            .flat_map(|k| std::iter::once(k.partition_key.as_str()).chain(k.sort_key.as_deref()))
            .filter(|name| seen.insert(*name))
            .collect()
    }

    /// Stable hash of the table name and every key schema. Cursors embed it so
    /// tokens cannot cross tables.
    #[must_use]
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    fn compute_fingerprint(&self) -> String {
        let mut canonical = format!("table={}", self.table_name);
        let mut push_keys = |label: &str, keys: &KeySchema| {
            canonical.push_str(&format!("|{label}:pk={}", self.key_descriptor(&keys.partition_key)));
            if let Some(sk) = &keys.sort_key {
                canonical.push_str(&format!(",sk={}", self.key_descriptor(sk)));
            }
        };
        push_keys("table", &self.keys);
        for index in &self.indexes {
            push_keys(&format!("index={}", index.name), &index.keys);
        }

        let mut digest = hex::encode(Sha256::digest(canonical.as_bytes()));
        digest.truncate(FINGERPRINT_LEN);
        digest
    }

    fn key_descriptor(&self, name: &str) -> String {
        let wire = self
            .by_name
            .get(name)
            .map_or("?", |&i| self.attributes[i].wire_type.descriptor());
        format!("{name}:{wire}")
    }
}

impl fmt::Display for SchemaDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "table '{}'", self.table_name)
    }
}

/// Accumulates a table description; [`SchemaBuilder::build`] validates it.
#[derive(Debug, Clone)]
pub struct SchemaBuilder {
    table_name: String,
    attributes: Vec<AttributeSpec>,
    partition_key: Option<String>,
    sort_key: Option<String>,
    indexes: Vec<SecondaryIndex>,
}

impl SchemaBuilder {
    /// Declare an attribute.
    #[must_use]
    pub fn attribute(mut self, spec: AttributeSpec) -> Self {
        self.attributes.push(spec);
        self
    }

    /// Name the partition key attribute.
    #[must_use]
    pub fn partition_key(mut self, name: impl Into<String>) -> Self {
        self.partition_key = Some(name.into());
        self
    }

    /// Name the sort key attribute.
    #[must_use]
    pub fn sort_key(mut self, name: impl Into<String>) -> Self {
        self.sort_key = Some(name.into());
        self
    }

    /// Declare a secondary index.
    #[must_use]
    pub fn index(mut self, index: SecondaryIndex) -> Self {
        self.indexes.push(index);
        self
    }

    /// Validate and freeze the schema.
    ///
    /// # Errors
    ///
    /// Returns a `SchemaError` if names repeat, keys reference undeclared or
    /// unsuitable attributes, a path has an empty segment, or a nested
    /// attribute does not sit under a declared Map or List.
    pub fn build(self) -> Result<SchemaDescriptor, SchemaError> {
        if self.table_name.is_empty() {
            return Err(SchemaError::EmptyTableName);
        }

        let mut attributes = self.attributes;
        let mut by_name = HashMap::with_capacity(attributes.len());
        for (i, spec) in attributes.iter_mut().enumerate() {
            if spec.name.is_empty() || spec.path.iter().any(String::is_empty) {
                return Err(SchemaError::EmptyPathSegment {
                    name: spec.name.clone(),
                });
            }
            if by_name.insert(spec.name.clone(), i).is_some() {
                return Err(SchemaError::DuplicateAttribute {
                    name: spec.name.clone(),
                });
            }
            spec.reserved = if spec.is_top_level() {
                is_reserved_word(&spec.name)
            } else {
                spec.path.iter().any(|s| is_reserved_word(s))
            };
        }

        validate_nesting(&attributes)?;

        let Some(partition_key) = self.partition_key else {
            return Err(SchemaError::MissingPartitionKey {
                table: self.table_name,
            });
        };
        let keys = KeySchema {
            partition_key,
            sort_key: self.sort_key,
        };
        validate_keys(&keys, &attributes, &by_name)?;

        let mut index_names = HashSet::new();
        for index in &self.indexes {
            if !index_names.insert(index.name.as_str()) {
                return Err(SchemaError::DuplicateIndex {
                    name: index.name.clone(),
                });
            }
            validate_keys(&index.keys, &attributes, &by_name)?;
        }

        let mut schema = SchemaDescriptor {
            table_name: self.table_name,
            attributes,
            by_name,
            keys,
            indexes: self.indexes,
            fingerprint: String::new(),
        };
        schema.fingerprint = schema.compute_fingerprint();
        Ok(schema)
    }
}

fn validate_keys(
    keys: &KeySchema,
    attributes: &[AttributeSpec],
    by_name: &HashMap<String, usize>,
) -> Result<(), SchemaError> {
    for name in std::iter::once(&keys.partition_key).chain(keys.sort_key.as_ref()) {
        let Some(&i) = by_name.get(name) else {
            return Err(SchemaError::UndeclaredKey { name: name.clone() });
        };
        let spec = &attributes[i];
        if !spec.is_top_level() || spec.nullable || !spec.wire_type.is_key_type() {
            return Err(SchemaError::InvalidKeyAttribute { name: name.clone() });
        }
    }
    Ok(())
}

/// Every nested attribute must start at a declared top-level Map or List.
fn validate_nesting(attributes: &[AttributeSpec]) -> Result<(), SchemaError> {
    for spec in attributes.iter().filter(|a| !a.is_top_level()) {
        let root_ok = spec.path.first().is_some_and(|root| {
            attributes.iter().any(|a| {
                a.is_top_level()
                    && a.name == *root
                    && matches!(a.wire_type, WireType::Map | WireType::List)
            })
        });
        if !root_ok || spec.path.len() < 2 {
            return Err(SchemaError::InvalidNesting {
                name: spec.name.clone(),
            });
        }
    }
    Ok(())
}

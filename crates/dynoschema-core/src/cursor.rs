//! Pagination cursors.
//!
//! A cursor is the key-attribute subset of the last item a page returned. As
//! a token it travels as URL-safe base64 (no padding) of a small JSON
//! envelope:
//!
//! ```json
//! {"v":1,"fp":"<schema fingerprint>","key":{"user_id":{"S":"u1"}}}
//! ```
//!
//! The fingerprint binds the token to one table and key schema, so a token
//! issued for one table is rejected by another.

use std::collections::BTreeMap;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use dynoschema_model::{AttributeValue, Item};
use serde::{Deserialize, Serialize};

use crate::error::CursorError;
use crate::schema::SchemaDescriptor;

/// Envelope format version.
pub const CURSOR_VERSION: u32 = 1;

/// Where the next page starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaginationCursor {
    key: Item,
}

impl PaginationCursor {
    /// Build a cursor from a store `LastEvaluatedKey`, keeping only key
    /// attributes. Returns `None` when nothing remains, meaning no further
    /// pages.
    #[must_use]
    pub fn from_last_evaluated_key(schema: &SchemaDescriptor, mut key: Item) -> Option<Self> {
        let keys = schema.key_attribute_names();
        key.retain(|name, _| keys.contains(&name.as_str()));
        (!key.is_empty()).then_some(Self { key })
    }

    /// The exclusive start key for the next request.
    #[must_use]
    pub fn key(&self) -> &Item {
        &self.key
    }

    /// Consume the cursor, returning its key.
    #[must_use]
    pub fn into_key(self) -> Item {
        self.key
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct Envelope {
    v: u32,
    fp: String,
    key: BTreeMap<String, AttributeValue>,
}

/// Encodes and decodes cursor tokens for one schema.
#[derive(Debug, Clone, Copy)]
pub struct CursorCodec<'a> {
    schema: &'a SchemaDescriptor,
}

impl<'a> CursorCodec<'a> {
    /// A codec bound to `schema`.
    #[must_use]
    pub fn new(schema: &'a SchemaDescriptor) -> Self {
        Self { schema }
    }

    /// Serialize a cursor into an opaque, URL-safe token.
    pub fn encode(&self, cursor: &PaginationCursor) -> Result<String, CursorError> {
        let envelope = Envelope {
            v: CURSOR_VERSION,
            fp: self.schema.fingerprint().to_owned(),
            key: cursor
                .key
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        };
        let json = serde_json::to_vec(&envelope).map_err(CursorError::Encode)?;
        Ok(URL_SAFE_NO_PAD.encode(json))
    }

    /// Parse a token produced by [`CursorCodec::encode`].
    ///
    /// # Errors
    ///
    /// Returns `CursorError::InvalidCursor` for malformed tokens, unknown
    /// versions, non-key attributes, mistyped keys or a missing partition
    /// key, and `CursorError::CursorMismatch` for tokens issued under a
    /// different schema.
    pub fn decode(&self, token: &str) -> Result<PaginationCursor, CursorError> {
        let bytes = URL_SAFE_NO_PAD
            .decode(token.trim())
            .map_err(|e| CursorError::invalid(format!("token is not valid base64: {e}")))?;
        let envelope: Envelope = serde_json::from_slice(&bytes)
            .map_err(|e| CursorError::invalid(format!("malformed envelope: {e}")))?;

        if envelope.v != CURSOR_VERSION {
            return Err(CursorError::invalid(format!(
                "unsupported cursor version {}",
                envelope.v
            )));
        }
        if envelope.fp != self.schema.fingerprint() {
            return Err(CursorError::CursorMismatch {
                expected: self.schema.fingerprint().to_owned(),
                actual: envelope.fp,
            });
        }

        let keys = self.schema.key_attribute_names();
        for (name, value) in &envelope.key {
            if !keys.contains(&name.as_str()) {
                return Err(CursorError::invalid(format!(
                    "'{name}' is not a key attribute of {}",
                    self.schema
                )));
            }
            let declared = self
                .schema
                .attribute(name)
                .map_err(|e| CursorError::invalid(e.to_string()))?;
            if value.wire_type() != declared.wire_type {
                return Err(CursorError::invalid(format!(
                    "key '{name}' must be {}, got {}",
                    declared.wire_type,
                    value.wire_type()
                )));
            }
        }

        let partition_key = &self.schema.keys().partition_key;
        if !envelope.key.contains_key(partition_key) {
            return Err(CursorError::invalid(format!(
                "missing partition key '{partition_key}'"
            )));
        }

        Ok(PaginationCursor {
            key: envelope.key.into_iter().collect(),
        })
    }
}

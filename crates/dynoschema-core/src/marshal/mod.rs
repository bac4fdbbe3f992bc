//! Typed record <-> wire item conversion.
//!
//! Records are any `Serialize + DeserializeOwned` type whose field names match
//! the schema's top-level attribute names. Marshaling goes through
//! `serde_json::Value`, with the schema deciding the wire type of every
//! declared field. Unmarshaling deserializes straight from the wire values,
//! so number text reaches the record without a detour through `f64`.

use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use dynoschema_model::number::validate_number;
use dynoschema_model::{AttributeValue, Item, PutItemInput, WireType};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::error::{MarshalError, UnmarshalError};
use crate::schema::{AttributeSpec, SchemaDescriptor};

mod de;

/// A record type bound to the schema of its table.
///
/// # Examples
///
/// ```
/// use std::sync::{Arc, LazyLock};
///
/// use dynoschema_core::marshal::Record;
/// use dynoschema_core::schema::{AttributeSpec, SchemaDescriptor};
/// use dynoschema_model::WireType;
/// use serde::{Deserialize, Serialize};
///
/// static SCHEMA: LazyLock<Arc<SchemaDescriptor>> = LazyLock::new(|| {
///     Arc::new(
///         SchemaDescriptor::builder("sessions")
///             .attribute(AttributeSpec::new("session_id", WireType::String))
///             .attribute(AttributeSpec::new("expires_at", WireType::Number))
///             .partition_key("session_id")
///             .build()
///             .expect("valid schema"),
///     )
/// });
///
/// #[derive(Serialize, Deserialize)]
/// struct Session {
///     session_id: String,
///     expires_at: u64,
/// }
///
/// impl Record for Session {
///     fn schema() -> Arc<SchemaDescriptor> {
///         Arc::clone(&SCHEMA)
///     }
/// }
/// ```
pub trait Record: Serialize + DeserializeOwned {
    /// The shared schema of the record's table.
    fn schema() -> Arc<SchemaDescriptor>;
}

/// Converts records of type `T` to and from wire items.
pub struct Marshaler<T> {
    schema: Arc<SchemaDescriptor>,
    _record: PhantomData<fn() -> T>,
}

impl<T> fmt::Debug for Marshaler<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Marshaler")
            .field("table", &self.schema.table_name())
            .finish_non_exhaustive()
    }
}

impl<T> Clone for Marshaler<T> {
    fn clone(&self) -> Self {
        Self {
            schema: Arc::clone(&self.schema),
            _record: PhantomData,
        }
    }
}

impl<T: Record> Default for Marshaler<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Record> Marshaler<T> {
    /// A marshaler using the record's own schema.
    #[must_use]
    pub fn new() -> Self {
        Self::with_schema(T::schema())
    }
}

impl<T: Serialize + DeserializeOwned> Marshaler<T> {
    /// A marshaler using an explicit schema.
    #[must_use]
    pub fn with_schema(schema: Arc<SchemaDescriptor>) -> Self {
        Self {
            schema,
            _record: PhantomData,
        }
    }

    /// The schema this marshaler converts against.
    #[must_use]
    pub fn schema(&self) -> &Arc<SchemaDescriptor> {
        &self.schema
    }

    /// Convert a record into a wire item.
    pub fn to_wire_item(&self, record: &T) -> Result<Item, MarshalError> {
        let Value::Object(fields) = serde_json::to_value(record).map_err(MarshalError::Serialize)?
        else {
            return Err(MarshalError::NotAnObject);
        };

        for name in fields.keys() {
            let declared = self
                .schema
                .attribute(name)
                .is_ok_and(AttributeSpec::is_top_level);
            if !declared {
                return Err(MarshalError::UndeclaredField { name: name.clone() });
            }
        }

        let mut item = Item::new();
        for spec in self.schema.top_level_attributes() {
            match fields.get(&spec.name) {
                Some(value) if !value.is_null() || spec.wire_type == WireType::Null => {
                    item.insert(spec.name.clone(), to_wire_value(&spec.name, spec.wire_type, value)?);
                }
                _ if spec.nullable => {}
                _ => {
                    return Err(MarshalError::MissingField {
                        name: spec.name.clone(),
                    });
                }
            }
        }

        for spec in self.schema.attributes().filter(|a| !a.is_top_level()) {
            apply_nested(&mut item, &fields, spec)?;
        }

        Ok(item)
    }

    /// Convert a wire item back into a record. Attributes the schema does not
    /// declare are ignored.
    pub fn from_wire_item(&self, item: &Item) -> Result<T, UnmarshalError> {
        let mut fields = Vec::new();
        for spec in self.schema.top_level_attributes() {
            let value = match item.get(&spec.name) {
                Some(av) if spec.wire_type == WireType::Null || !av.is_null() => {
                    if av.wire_type() != spec.wire_type {
                        return Err(UnmarshalError::TypeMismatch {
                            name: spec.name.clone(),
                            expected: spec.wire_type,
                            actual: av.wire_type(),
                        });
                    }
                    check_numbers(&spec.name, av)?;
                    av
                }
                _ if spec.nullable => &de::ABSENT,
                _ => {
                    return Err(UnmarshalError::MissingAttribute {
                        name: spec.name.clone(),
                    });
                }
            };
            fields.push((spec.name.as_str(), value));
        }

        for spec in self.schema.attributes().filter(|a| !a.is_top_level()) {
            if let Some(av) = wire_at(item, &spec.path) {
                if !av.is_null() && av.wire_type() != spec.wire_type {
                    return Err(UnmarshalError::TypeMismatch {
                        name: spec.name.clone(),
                        expected: spec.wire_type,
                        actual: av.wire_type(),
                    });
                }
            }
        }

        de::from_fields(fields).map_err(UnmarshalError::Deserialize)
    }

    /// Project the table's primary key out of a record.
    pub fn key_of(&self, record: &T) -> Result<Item, MarshalError> {
        let mut item = self.to_wire_item(record)?;
        let keys = self.schema.keys();
        item.retain(|name, _| keys.contains(name));
        Ok(item)
    }

    /// An unconditional put of the whole record.
    pub fn put_item_input(&self, record: &T) -> Result<PutItemInput, MarshalError> {
        Ok(PutItemInput {
            table_name: self.schema.table_name().to_owned(),
            item: self.to_wire_item(record)?,
            ..PutItemInput::default()
        })
    }
}

// ---------------------------------------------------------------------------
// JSON -> wire
// ---------------------------------------------------------------------------

fn to_wire_value(
    name: &str,
    wire_type: WireType,
    value: &Value,
) -> Result<AttributeValue, MarshalError> {
    let mismatch = || MarshalError::TypeMismatch {
        name: name.to_owned(),
        expected: wire_type,
        actual: json_kind(value).to_owned(),
    };

    match (wire_type, value) {
        (WireType::String, Value::String(s)) => Ok(AttributeValue::S(s.clone())),
        (WireType::Number, Value::Number(n)) => number_value(name, n.to_string()),
        // Decimal strings keep precision beyond what f64 holds.
        (WireType::Number, Value::String(s)) => number_value(name, s.clone()),
        (WireType::Bool, Value::Bool(b)) => Ok(AttributeValue::Bool(*b)),
        (WireType::Binary, Value::Array(elems)) => elems
            .iter()
            .map(|e| e.as_u64().and_then(|b| u8::try_from(b).ok()))
            .collect::<Option<Vec<u8>>>()
            .map(AttributeValue::from)
            .ok_or_else(mismatch),
        (WireType::Binary, Value::String(s)) => BASE64
            .decode(s)
            .map(AttributeValue::from)
            .map_err(|_| mismatch()),
        (WireType::List, Value::Array(_)) | (WireType::Map, Value::Object(_)) => {
            json_to_attribute(name, value)
        }
        (WireType::Null, Value::Null) => Ok(AttributeValue::Null(true)),
        _ => Err(mismatch()),
    }
}

fn number_value(name: &str, n: String) -> Result<AttributeValue, MarshalError> {
    validate_number(&n).map_err(|source| MarshalError::InvalidNumber {
        name: name.to_owned(),
        source,
    })?;
    Ok(AttributeValue::N(n))
}

/// Untyped conversion used inside List and Map attributes.
fn json_to_attribute(name: &str, value: &Value) -> Result<AttributeValue, MarshalError> {
    Ok(match value {
        Value::Null => AttributeValue::Null(true),
        Value::Bool(b) => AttributeValue::Bool(*b),
        Value::Number(n) => number_value(name, n.to_string())?,
        Value::String(s) => AttributeValue::S(s.clone()),
        Value::Array(elems) => AttributeValue::L(
            elems
                .iter()
                .map(|e| json_to_attribute(name, e))
                .collect::<Result<_, _>>()?,
        ),
        Value::Object(map) => AttributeValue::M(
            map.iter()
                .map(|(k, v)| Ok((k.clone(), json_to_attribute(name, v)?)))
                .collect::<Result<_, MarshalError>>()?,
        ),
    })
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Re-type a declared nested attribute inside an already converted Map.
fn apply_nested(
    item: &mut Item,
    fields: &Map<String, Value>,
    spec: &AttributeSpec,
) -> Result<(), MarshalError> {
    let Some((_, parent)) = spec.path.split_last() else {
        return Ok(());
    };
    if !json_at(fields, parent).is_some_and(Value::is_object) {
        return Ok(());
    }

    match json_at(fields, &spec.path) {
        Some(value) if !value.is_null() => {
            let typed = to_wire_value(&spec.name, spec.wire_type, value)?;
            if let Some(slot) = wire_at_mut(item, &spec.path) {
                *slot = typed;
            }
            Ok(())
        }
        _ if spec.nullable => Ok(()),
        _ => Err(MarshalError::MissingField {
            name: spec.name.clone(),
        }),
    }
}

fn json_at<'a>(fields: &'a Map<String, Value>, path: &[String]) -> Option<&'a Value> {
    let (first, rest) = path.split_first()?;
    let mut current = fields.get(first)?;
    for segment in rest {
        current = current.as_object()?.get(segment)?;
    }
    Some(current)
}

fn wire_at<'a>(item: &'a Item, path: &[String]) -> Option<&'a AttributeValue> {
    let (first, rest) = path.split_first()?;
    let mut current = item.get(first)?;
    for segment in rest {
        current = current.as_m()?.get(segment)?;
    }
    Some(current)
}

fn wire_at_mut<'a>(item: &'a mut Item, path: &[String]) -> Option<&'a mut AttributeValue> {
    let (first, rest) = path.split_first()?;
    let mut current = item.get_mut(first)?;
    for segment in rest {
        current = match current {
            AttributeValue::M(map) => map.get_mut(segment)?,
            _ => return None,
        };
    }
    Some(current)
}

// ---------------------------------------------------------------------------
// wire -> record
// ---------------------------------------------------------------------------

/// Reject number text the store would not have produced, anywhere in `av`.
fn check_numbers(name: &str, av: &AttributeValue) -> Result<(), UnmarshalError> {
    match av {
        AttributeValue::N(n) => validate_number(n).map_err(|_| UnmarshalError::InvalidNumber {
            name: name.to_owned(),
            value: n.clone(),
        }),
        AttributeValue::L(elems) => elems.iter().try_for_each(|e| check_numbers(name, e)),
        AttributeValue::M(map) => map.values().try_for_each(|v| check_numbers(name, v)),
        _ => Ok(()),
    }
}

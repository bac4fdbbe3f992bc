//! Fluent request builders.
//!
//! [`ScanBuilder`] and [`QueryBuilder`] accumulate filters through the
//! [`FilterChain`] methods and execute against a [`StoreClient`], one page
//! per call. [`PutBuilder`] writes a single record, optionally guarded by
//! [`ConditionChain`] predicates.
//!
//! Every chained call validates its path and operands against the schema
//! before the predicate is recorded, so an invalid chain fails at the call
//! that made it invalid.
//!
//! [`StoreClient`]: crate::client::StoreClient

pub mod put;
pub mod query;
pub mod scan;

use dynoschema_model::number::validate_number;
use dynoschema_model::{AttributeValue, Item, StoreError, WireType};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::client::{StoreClient, StoreRequest, StoreResponse, dispatch_request};
use crate::config::BuilderConfig;
use crate::cursor::{CursorCodec, PaginationCursor};
use crate::error::{CursorError, Error, SchemaError};
use crate::expression::{Operator, Predicate};
use crate::marshal::Marshaler;
use crate::path::AttributePath;
use crate::schema::{ResolvedPath, SchemaDescriptor};

pub use put::PutBuilder;
pub use query::QueryBuilder;
pub use scan::ScanBuilder;

/// One page of results.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    /// Records on this page, in store order.
    pub items: Vec<T>,
    /// Where the next page starts; `None` on the last page.
    pub cursor: Option<PaginationCursor>,
    /// Items returned after filtering.
    pub count: u32,
    /// Items evaluated before filtering.
    pub scanned_count: u32,
}

impl<T> Page<T> {
    /// Returns `true` if another page follows.
    #[must_use]
    pub fn has_more(&self) -> bool {
        self.cursor.is_some()
    }

    /// The cursor as an opaque token, for handing to a client.
    pub fn next_token(&self, schema: &SchemaDescriptor) -> Result<Option<String>, CursorError> {
        self.cursor
            .as_ref()
            .map(|cursor| CursorCodec::new(schema).encode(cursor))
            .transpose()
    }
}

// ---------------------------------------------------------------------------
// Chained predicate methods
// ---------------------------------------------------------------------------

macro_rules! predicate_methods {
    (
        $push:ident,
        $eq:ident, $ne:ident, $lt:ident, $le:ident, $gt:ident, $ge:ident,
        $between:ident, $begins_with:ident, $contains:ident, $in_:ident,
        $exists:ident, $not_exists:ident $(,)?
    ) => {
        /// `path = value`.
        fn $eq(self, path: &str, value: impl Into<AttributeValue>) -> Result<Self, Error> {
            self.$push(path, Operator::Eq, vec![value.into()])
        }

        /// `path <> value`.
        fn $ne(self, path: &str, value: impl Into<AttributeValue>) -> Result<Self, Error> {
            self.$push(path, Operator::Ne, vec![value.into()])
        }

        /// `path < value`.
        fn $lt(self, path: &str, value: impl Into<AttributeValue>) -> Result<Self, Error> {
            self.$push(path, Operator::Lt, vec![value.into()])
        }

        /// `path <= value`.
        fn $le(self, path: &str, value: impl Into<AttributeValue>) -> Result<Self, Error> {
            self.$push(path, Operator::Le, vec![value.into()])
        }

        /// `path > value`.
        fn $gt(self, path: &str, value: impl Into<AttributeValue>) -> Result<Self, Error> {
            self.$push(path, Operator::Gt, vec![value.into()])
        }

        /// `path >= value`.
        fn $ge(self, path: &str, value: impl Into<AttributeValue>) -> Result<Self, Error> {
            self.$push(path, Operator::Ge, vec![value.into()])
        }

        /// `path BETWEEN low AND high`, both ends inclusive.
        fn $between(
            self,
            path: &str,
            low: impl Into<AttributeValue>,
            high: impl Into<AttributeValue>,
        ) -> Result<Self, Error> {
            self.$push(path, Operator::Between, vec![low.into(), high.into()])
        }

        /// `begins_with(path, prefix)`.
        fn $begins_with(
            self,
            path: &str,
            prefix: impl Into<AttributeValue>,
        ) -> Result<Self, Error> {
            self.$push(path, Operator::BeginsWith, vec![prefix.into()])
        }

        /// `contains(path, operand)`: a substring, or an element of a list.
        fn $contains(self, path: &str, operand: impl Into<AttributeValue>) -> Result<Self, Error> {
            self.$push(path, Operator::Contains, vec![operand.into()])
        }

        /// `path IN (v1, v2, ...)`. At least one value, at most the
        /// configured `max_in_operands`.
        fn $in_<I, V>(self, path: &str, values: I) -> Result<Self, Error>
        where
            I: IntoIterator<Item = V>,
            V: Into<AttributeValue>,
        {
            let operands = values.into_iter().map(Into::into).collect();
            self.$push(path, Operator::In, operands)
        }

        /// `attribute_exists(path)`.
        fn $exists(self, path: &str) -> Result<Self, Error> {
            self.$push(path, Operator::Exists, Vec::new())
        }

        /// `attribute_not_exists(path)`.
        fn $not_exists(self, path: &str) -> Result<Self, Error> {
            self.$push(path, Operator::NotExists, Vec::new())
        }
    };
}

/// Filter methods shared by scans and queries.
///
/// Paths are attribute names (`age`), dotted document paths
/// (`address.city`, `tags[0]`) or the logical name of a declared nested
/// attribute.
pub trait FilterChain: Sized {
    /// Validate and record one filter predicate. The named `filter_*`
    /// methods all funnel through here.
    fn filter(
        self,
        path: &str,
        operator: Operator,
        operands: Vec<AttributeValue>,
    ) -> Result<Self, Error>;

    predicate_methods!(
        filter,
        filter_eq,
        filter_ne,
        filter_lt,
        filter_le,
        filter_gt,
        filter_ge,
        filter_between,
        filter_begins_with,
        filter_contains,
        filter_in,
        filter_exists,
        filter_not_exists,
    );
}

/// Condition methods for guarded writes.
pub trait ConditionChain: Sized {
    /// Validate and record one condition predicate.
    fn condition(
        self,
        path: &str,
        operator: Operator,
        operands: Vec<AttributeValue>,
    ) -> Result<Self, Error>;

    predicate_methods!(
        condition,
        condition_eq,
        condition_ne,
        condition_lt,
        condition_le,
        condition_gt,
        condition_ge,
        condition_between,
        condition_begins_with,
        condition_contains,
        condition_in,
        condition_exists,
        condition_not_exists,
    );
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Resolve a user-supplied path string. Declared names, top-level or nested,
/// win over dotted parsing so names containing `.` still work.
pub(crate) fn attribute_path(
    schema: &SchemaDescriptor,
    path: &str,
) -> Result<AttributePath, SchemaError> {
    match schema.attribute(path) {
        Ok(spec) => Ok(spec.document_path()),
        Err(_) => AttributePath::parse(path),
    }
}

/// Build a predicate and check it against the schema and configuration.
pub(crate) fn checked_predicate(
    schema: &SchemaDescriptor,
    config: &BuilderConfig,
    path: &str,
    operator: Operator,
    operands: Vec<AttributeValue>,
) -> Result<Predicate, SchemaError> {
    let path = attribute_path(schema, path)?;
    let resolved = schema.attribute_by_path(&path)?;
    let predicate = Predicate::new(path, operator, operands)?;

    let count = predicate.operands().len();
    if operator == Operator::In && count > config.max_in_operands {
        return Err(SchemaError::TooManyOperands {
            path: predicate.path().to_string(),
            max: config.max_in_operands,
            actual: count,
        });
    }

    if let ResolvedPath::Declared(spec) = resolved {
        check_operand_types(&predicate, spec.wire_type)?;
    }
    check_numbers(&predicate)?;
    Ok(predicate)
}

fn check_operand_types(predicate: &Predicate, wire_type: WireType) -> Result<(), SchemaError> {
    let operator = predicate.operator();
    let supported = match operator {
        Operator::Eq | Operator::Ne | Operator::In | Operator::Exists | Operator::NotExists => {
            true
        }
        Operator::Lt | Operator::Le | Operator::Gt | Operator::Ge | Operator::Between => {
            wire_type.is_ordered()
        }
        Operator::BeginsWith => matches!(wire_type, WireType::String | WireType::Binary),
        Operator::Contains => matches!(
            wire_type,
            WireType::String | WireType::Binary | WireType::List
        ),
    };
    if !supported {
        return Err(SchemaError::UnsupportedOperator {
            operator: operator.to_string(),
            path: predicate.path().to_string(),
            wire_type,
        });
    }

    // List elements are untyped.
    if operator == Operator::Contains && wire_type == WireType::List {
        return Ok(());
    }
    for operand in predicate.operands() {
        if operand.wire_type() != wire_type {
            return Err(SchemaError::OperandType {
                path: predicate.path().to_string(),
                expected: wire_type,
                actual: operand.wire_type(),
            });
        }
    }
    Ok(())
}

fn check_numbers(predicate: &Predicate) -> Result<(), SchemaError> {
    for operand in predicate.operands() {
        if let AttributeValue::N(n) = operand {
            validate_number(n).map_err(|source| SchemaError::InvalidNumber {
                path: predicate.path().to_string(),
                source,
            })?;
        }
    }
    Ok(())
}

/// Human-readable name of a query or scan target.
pub(crate) fn describe_target(schema: &SchemaDescriptor, index: Option<&str>) -> String {
    match index {
        Some(index) => format!("index '{index}' of {schema}"),
        None => schema.to_string(),
    }
}

// ---------------------------------------------------------------------------
// Execution
// ---------------------------------------------------------------------------

/// Send a scan or query request and turn the response into a page.
pub(crate) async fn fetch_page<T, C>(
    marshaler: &Marshaler<T>,
    client: &C,
    request: StoreRequest,
) -> Result<Page<T>, Error>
where
    T: Serialize + DeserializeOwned,
    C: StoreClient + ?Sized,
{
    let (items, last_evaluated_key, count, scanned_count) =
        match dispatch_request(client, request).await? {
            StoreResponse::Scan(out) => {
                (out.items, out.last_evaluated_key, out.count, out.scanned_count)
            }
            StoreResponse::Query(out) => {
                (out.items, out.last_evaluated_key, out.count, out.scanned_count)
            }
            StoreResponse::Put(_) => {
                return Err(StoreError::serialization("read request answered with a put response").into());
            }
        };

    let page = page_from(marshaler, &items, last_evaluated_key, count, scanned_count)?;
    debug!(
        table = marshaler.schema().table_name(),
        items = page.items.len(),
        count = page.count,
        scanned_count = page.scanned_count,
        more = page.has_more(),
        "received page"
    );
    Ok(page)
}

fn page_from<T: Serialize + DeserializeOwned>(
    marshaler: &Marshaler<T>,
    items: &[Item],
    last_evaluated_key: Item,
    count: u32,
    scanned_count: u32,
) -> Result<Page<T>, Error> {
    let items = items
        .iter()
        .map(|item| marshaler.from_wire_item(item))
        .collect::<Result<Vec<_>, _>>()?;
    let cursor = PaginationCursor::from_last_evaluated_key(marshaler.schema(), last_evaluated_key);
    Ok(Page {
        items,
        cursor,
        count,
        scanned_count,
    })
}

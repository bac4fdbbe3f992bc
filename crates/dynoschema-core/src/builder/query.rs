//! Query builder.

use std::sync::Arc;

use dynoschema_model::{AttributeValue, QueryInput};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use super::{FilterChain, Page, checked_predicate, describe_target, fetch_page};
use crate::client::{StoreClient, StoreRequest};
use crate::config::BuilderConfig;
use crate::cursor::{CursorCodec, PaginationCursor};
use crate::error::{Error, SchemaError};
use crate::expression::{ExpressionCompiler, Operator, PlaceholderAllocator, Predicate};
use crate::marshal::{Marshaler, Record};
use crate::schema::{KeySchema, SchemaDescriptor};

/// Builds and executes a key-conditioned query over a table or secondary
/// index.
///
/// A query needs an equality condition on the partition key and may add one
/// condition on the sort key. Filters run after the key condition and may not
/// reference the target's key attributes.
#[derive(Debug, Clone)]
pub struct QueryBuilder<T> {
    marshaler: Marshaler<T>,
    config: BuilderConfig,
    index: Option<String>,
    keys: KeySchema,
    partition: Option<Predicate>,
    sort: Option<Predicate>,
    filter: ExpressionCompiler,
    limit: Option<u32>,
    descending: bool,
    consistent_read: bool,
}

impl<T: Record> QueryBuilder<T> {
    /// A query on the record's table with default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::with_schema(T::schema(), BuilderConfig::default())
    }
}

impl<T: Record> Default for QueryBuilder<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Serialize + DeserializeOwned> QueryBuilder<T> {
    /// A query on `schema`'s table.
    #[must_use]
    pub fn with_schema(schema: Arc<SchemaDescriptor>, config: BuilderConfig) -> Self {
        Self {
            keys: schema.keys().clone(),
            marshaler: Marshaler::with_schema(schema),
            consistent_read: config.consistent_read,
            config,
            index: None,
            partition: None,
            sort: None,
            filter: ExpressionCompiler::new(),
            limit: None,
            descending: false,
        }
    }

    /// The schema being queried.
    #[must_use]
    pub fn schema(&self) -> &Arc<SchemaDescriptor> {
        self.marshaler.schema()
    }

    fn target(&self) -> String {
        describe_target(self.schema(), self.index.as_deref())
    }

    /// Query a secondary index. Key conditions then refer to the index's keys.
    pub fn for_index(mut self, name: &str) -> Result<Self, Error> {
        let keys = self.schema().index(name)?.keys.clone();
        self.index = Some(name.to_owned());

        let roots = |p: &Option<Predicate>| p.as_ref().and_then(|p| p.path().root().map(str::to_owned));
        if let Some(root) = roots(&self.partition) {
            if root != keys.partition_key {
                return Err(SchemaError::NotAKey { path: root, target: self.target() }.into());
            }
        }
        if let Some(root) = roots(&self.sort) {
            if keys.sort_key.as_deref() != Some(root.as_str()) {
                return Err(SchemaError::NotAKey { path: root, target: self.target() }.into());
            }
        }
        for predicate in self.filter.predicates() {
            if let Some(root) = predicate.path().root() {
                if keys.contains(root) {
                    return Err(SchemaError::FilterOnKey { name: root.to_owned() }.into());
                }
            }
        }

        self.keys = keys;
        Ok(self)
    }

    /// Add a key condition on a named key attribute.
    ///
    /// The partition key accepts only `EQ`. The sort key accepts `EQ`, `LT`,
    /// `LE`, `GT`, `GE`, `BETWEEN` and `BEGINS_WITH`. Each key takes at most
    /// one condition.
    pub fn key_condition(
        mut self,
        name: &str,
        operator: Operator,
        operands: Vec<AttributeValue>,
    ) -> Result<Self, Error> {
        let is_partition = name == self.keys.partition_key;
        if !is_partition && self.keys.sort_key.as_deref() != Some(name) {
            return Err(SchemaError::NotAKey {
                path: name.to_owned(),
                target: self.target(),
            }
            .into());
        }

        let allowed = if is_partition {
            operator == Operator::Eq
        } else {
            matches!(
                operator,
                Operator::Eq
                    | Operator::Lt
                    | Operator::Le
                    | Operator::Gt
                    | Operator::Ge
                    | Operator::Between
                    | Operator::BeginsWith
            )
        };
        if !allowed {
            return Err(SchemaError::KeyOperator {
                operator: operator.to_string(),
                path: name.to_owned(),
            }
            .into());
        }

        let slot = if is_partition { &self.partition } else { &self.sort };
        if slot.is_some() {
            return Err(SchemaError::DuplicateKeyCondition {
                name: name.to_owned(),
            }
            .into());
        }

        let predicate = checked_predicate(self.schema(), &self.config, name, operator, operands)?;
        if is_partition {
            self.partition = Some(predicate);
        } else {
            self.sort = Some(predicate);
        }
        Ok(self)
    }

    /// `partition_key = value`.
    pub fn partition_key_eq(self, value: impl Into<AttributeValue>) -> Result<Self, Error> {
        let name = self.keys.partition_key.clone();
        self.key_condition(&name, Operator::Eq, vec![value.into()])
    }

    fn sort_key_condition(
        self,
        operator: Operator,
        operands: Vec<AttributeValue>,
    ) -> Result<Self, Error> {
        let Some(name) = self.keys.sort_key.clone() else {
            return Err(SchemaError::NotAKey {
                path: "(sort key)".to_owned(),
                target: self.target(),
            }
            .into());
        };
        self.key_condition(&name, operator, operands)
    }

    /// `sort_key = value`.
    pub fn sort_key_eq(self, value: impl Into<AttributeValue>) -> Result<Self, Error> {
        self.sort_key_condition(Operator::Eq, vec![value.into()])
    }

    /// `sort_key < value`.
    pub fn sort_key_lt(self, value: impl Into<AttributeValue>) -> Result<Self, Error> {
        self.sort_key_condition(Operator::Lt, vec![value.into()])
    }

    /// `sort_key <= value`.
    pub fn sort_key_le(self, value: impl Into<AttributeValue>) -> Result<Self, Error> {
        self.sort_key_condition(Operator::Le, vec![value.into()])
    }

    /// `sort_key > value`.
    pub fn sort_key_gt(self, value: impl Into<AttributeValue>) -> Result<Self, Error> {
        self.sort_key_condition(Operator::Gt, vec![value.into()])
    }

    /// `sort_key >= value`.
    pub fn sort_key_ge(self, value: impl Into<AttributeValue>) -> Result<Self, Error> {
        self.sort_key_condition(Operator::Ge, vec![value.into()])
    }

    /// `sort_key BETWEEN low AND high`.
    pub fn sort_key_between(
        self,
        low: impl Into<AttributeValue>,
        high: impl Into<AttributeValue>,
    ) -> Result<Self, Error> {
        self.sort_key_condition(Operator::Between, vec![low.into(), high.into()])
    }

    /// `begins_with(sort_key, prefix)`.
    pub fn sort_key_begins_with(self, prefix: impl Into<AttributeValue>) -> Result<Self, Error> {
        self.sort_key_condition(Operator::BeginsWith, vec![prefix.into()])
    }

    /// Evaluate at most `n` items per page.
    #[must_use]
    pub fn limit(mut self, n: u32) -> Self {
        self.limit = Some(n);
        self
    }

    /// Return items in descending sort-key order.
    #[must_use]
    pub fn descending(mut self) -> Self {
        self.descending = true;
        self
    }

    /// Request strongly consistent reads.
    #[must_use]
    pub fn consistent_read(mut self, consistent: bool) -> Self {
        self.consistent_read = consistent;
        self
    }

    /// Assemble the request for one page. Pure; may be called repeatedly.
    ///
    /// The key condition is rendered first and the filter continues its
    /// placeholder numbering, so both share one set of name and value maps.
    ///
    /// # Errors
    ///
    /// Returns `SchemaError::MissingPartitionKeyCondition` if no partition key
    /// condition was added.
    pub fn build_request(&self, cursor: Option<&PaginationCursor>) -> Result<StoreRequest, Error> {
        let Some(partition) = &self.partition else {
            return Err(SchemaError::MissingPartitionKeyCondition {
                target: self.target(),
            }
            .into());
        };

        let mut key = ExpressionCompiler::new();
        key.add_predicate(partition.clone());
        if let Some(sort) = &self.sort {
            key.add_predicate(sort.clone());
        }

        let mut alloc = PlaceholderAllocator::new(self.config.name_policy);
        let mut input = QueryInput {
            table_name: self.schema().table_name().to_owned(),
            index_name: self.index.clone(),
            scan_index_forward: self.descending.then_some(false),
            limit: self.limit.or(self.config.page_size),
            consistent_read: self.consistent_read.then_some(true),
            exclusive_start_key: cursor.map(|c| c.key().clone()).unwrap_or_default(),
            ..QueryInput::default()
        };
        input.key_condition_expression = key.render_with(&mut alloc).drain_into(
            &mut input.expression_attribute_names,
            &mut input.expression_attribute_values,
        );
        input.filter_expression = self.filter.render_with(&mut alloc).drain_into(
            &mut input.expression_attribute_names,
            &mut input.expression_attribute_values,
        );

        debug!(
            table = %input.table_name,
            index = ?input.index_name,
            key_conditions = key.len(),
            filters = self.filter.len(),
            limit = ?input.limit,
            descending = self.descending,
            cursor = cursor.is_some(),
            "built query request"
        );
        Ok(StoreRequest::Query(input))
    }

    /// Fetch one page, starting after `cursor` when given.
    pub async fn execute<C: StoreClient + ?Sized>(
        &self,
        client: &C,
        cursor: Option<&PaginationCursor>,
    ) -> Result<Page<T>, Error> {
        let request = self.build_request(cursor)?;
        fetch_page(&self.marshaler, client, request).await
    }

    /// Fetch one page, resuming from an encoded cursor token.
    pub async fn execute_token<C: StoreClient + ?Sized>(
        &self,
        client: &C,
        token: &str,
    ) -> Result<Page<T>, Error> {
        let cursor = CursorCodec::new(self.schema()).decode(token)?;
        self.execute(client, Some(&cursor)).await
    }

    /// Follow cursors until the query is exhausted and return every record.
    pub async fn execute_all<C: StoreClient + ?Sized>(&self, client: &C) -> Result<Vec<T>, Error> {
        let mut records = Vec::new();
        let mut cursor = None;
        loop {
            let page = self.execute(client, cursor.as_ref()).await?;
            records.extend(page.items);
            match page.cursor {
                Some(next) => cursor = Some(next),
                None => return Ok(records),
            }
        }
    }
}

impl<T: Serialize + DeserializeOwned> FilterChain for QueryBuilder<T> {
    fn filter(
        mut self,
        path: &str,
        operator: Operator,
        operands: Vec<AttributeValue>,
    ) -> Result<Self, Error> {
        let predicate = checked_predicate(self.schema(), &self.config, path, operator, operands)?;
        if let Some(root) = predicate.path().root() {
            if self.keys.contains(root) {
                return Err(SchemaError::FilterOnKey {
                    name: root.to_owned(),
                }
                .into());
            }
        }
        self.filter.add_predicate(predicate);
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::tests::user_profiles;

    type Row = std::collections::HashMap<String, serde_json::Value>;

    fn query() -> QueryBuilder<Row> {
        QueryBuilder::with_schema(Arc::new(user_profiles()), BuilderConfig::default())
    }

    fn query_input(request: StoreRequest) -> QueryInput {
        match request {
            StoreRequest::Query(input) => input,
            other => panic!("expected query, got {other:?}"),
        }
    }

    #[test]
    fn test_should_number_filter_after_key_condition() {
        let builder = query()
            .partition_key_eq("user123")
            .unwrap()
            .sort_key_gt(1_640_995_200_i64)
            .unwrap()
            .filter_eq("is_active", true)
            .unwrap();

        let input = query_input(builder.build_request(None).unwrap());
        assert_eq!(input.key_condition_expression.as_deref(), Some("#n0 = :v0 AND #n1 > :v1"));
        assert_eq!(input.filter_expression.as_deref(), Some("#n2 = :v2"));
        assert_eq!(input.expression_attribute_names.len(), 3);
        assert_eq!(input.expression_attribute_names["#n1"], "timestamp");
        assert_eq!(input.expression_attribute_values.len(), 3);
        assert_eq!(input.expression_attribute_values[":v0"], AttributeValue::from("user123"));
        assert!(input.scan_index_forward.is_none());
    }

    #[test]
    fn test_should_require_partition_key_condition() {
        let builder = query().sort_key_ge(10).unwrap();
        assert!(matches!(
            builder.build_request(None),
            Err(Error::Schema(SchemaError::MissingPartitionKeyCondition { .. }))
        ));
    }

    #[test]
    fn test_should_type_check_key_operands() {
        assert!(matches!(
            query().partition_key_eq(42),
            Err(Error::Schema(SchemaError::OperandType { .. }))
        ));
        assert!(matches!(
            query().sort_key_begins_with("16"),
            Err(Error::Schema(SchemaError::UnsupportedOperator { .. }))
        ));
    }

    #[test]
    fn test_should_reject_invalid_key_conditions() {
        assert!(matches!(
            query().partition_key_eq("a").unwrap().partition_key_eq("b"),
            Err(Error::Schema(SchemaError::DuplicateKeyCondition { .. }))
        ));
        assert!(matches!(
            query().key_condition("user_id", Operator::Gt, vec!["a".into()]),
            Err(Error::Schema(SchemaError::KeyOperator { .. }))
        ));
        assert!(matches!(
            query().key_condition("age", Operator::Eq, vec![3.into()]),
            Err(Error::Schema(SchemaError::NotAKey { .. }))
        ));
    }

    #[test]
    fn test_should_reject_filter_on_key() {
        assert!(matches!(
            query().filter_eq("user_id", "x"),
            Err(Error::Schema(SchemaError::FilterOnKey { ref name })) if name == "user_id"
        ));
        assert!(matches!(
            query().filter_gt("timestamp", 1),
            Err(Error::Schema(SchemaError::FilterOnKey { .. }))
        ));
        assert!(query().filter_gt("age", 1).is_ok());
    }

    #[test]
    fn test_should_query_secondary_index() {
        let builder = query()
            .for_index("email-index")
            .unwrap()
            .partition_key_eq("a@example.com")
            .unwrap()
            .sort_key_between(18, 30)
            .unwrap()
            .filter_eq("user_id", "u1")
            .unwrap()
            .descending()
            .limit(10);

        let input = query_input(builder.build_request(None).unwrap());
        assert_eq!(input.index_name.as_deref(), Some("email-index"));
        assert_eq!(
            input.key_condition_expression.as_deref(),
            Some("#n0 = :v0 AND #n1 BETWEEN :v1 AND :v2")
        );
        assert_eq!(input.expression_attribute_names["#n0"], "email");
        assert_eq!(input.expression_attribute_names["#n1"], "age");
        assert_eq!(input.filter_expression.as_deref(), Some("#n2 = :v3"));
        assert_eq!(input.scan_index_forward, Some(false));
        assert_eq!(input.limit, Some(10));
    }

    #[test]
    fn test_should_recheck_conditions_when_switching_index() {
        assert!(matches!(
            query().partition_key_eq("u1").unwrap().for_index("email-index"),
            Err(Error::Schema(SchemaError::NotAKey { .. }))
        ));
        assert!(matches!(
            query().filter_eq("email", "e").unwrap().for_index("email-index"),
            Err(Error::Schema(SchemaError::FilterOnKey { .. }))
        ));
    }

    #[test]
    fn test_should_reject_sort_condition_without_sort_key() {
        let schema = SchemaDescriptor::builder("sessions")
            .attribute(crate::schema::AttributeSpec::new(
                "session_id",
                dynoschema_model::WireType::String,
            ))
            .partition_key("session_id")
            .build()
            .unwrap();
        let builder = QueryBuilder::<Row>::with_schema(Arc::new(schema), BuilderConfig::default());
        assert!(matches!(
            builder.sort_key_eq("x"),
            Err(Error::Schema(SchemaError::NotAKey { .. }))
        ));
    }
}

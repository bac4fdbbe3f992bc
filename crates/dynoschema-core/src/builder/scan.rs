//! Scan builder.

use std::sync::Arc;

use dynoschema_model::{AttributeValue, ScanInput};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use super::{FilterChain, Page, checked_predicate, fetch_page};
use crate::client::{StoreClient, StoreRequest};
use crate::config::BuilderConfig;
use crate::cursor::{CursorCodec, PaginationCursor};
use crate::error::Error;
use crate::expression::{ExpressionCompiler, Operator, PlaceholderAllocator};
use crate::marshal::{Marshaler, Record};
use crate::schema::SchemaDescriptor;

/// Builds and executes a filtered scan over a table or secondary index.
///
/// # Examples
///
/// ```no_run
/// # use dynoschema_core::builder::{FilterChain, ScanBuilder};
/// # use dynoschema_core::client::StoreClient;
/// # use dynoschema_core::marshal::Record;
/// # async fn active_adults<T: Record, C: StoreClient>(client: &C) -> Result<Vec<T>, dynoschema_core::Error> {
/// let scan = ScanBuilder::<T>::new()
///     .filter_eq("is_active", true)?
///     .filter_between("age", 18, 65)?;
/// scan.execute_all(client).await
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct ScanBuilder<T> {
    marshaler: Marshaler<T>,
    config: BuilderConfig,
    index: Option<String>,
    filter: ExpressionCompiler,
    limit: Option<u32>,
    consistent_read: bool,
}

impl<T: Record> ScanBuilder<T> {
    /// A scan over the record's table with default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::with_schema(T::schema(), BuilderConfig::default())
    }
}

impl<T: Record> Default for ScanBuilder<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Serialize + DeserializeOwned> ScanBuilder<T> {
    /// A scan over `schema`'s table.
    #[must_use]
    pub fn with_schema(schema: Arc<SchemaDescriptor>, config: BuilderConfig) -> Self {
        Self {
            marshaler: Marshaler::with_schema(schema),
            consistent_read: config.consistent_read,
            config,
            index: None,
            filter: ExpressionCompiler::new(),
            limit: None,
        }
    }

    /// The schema being scanned.
    #[must_use]
    pub fn schema(&self) -> &Arc<SchemaDescriptor> {
        self.marshaler.schema()
    }

    /// Scan a secondary index instead of the base table.
    pub fn for_index(mut self, name: &str) -> Result<Self, Error> {
        self.schema().index(name)?;
        self.index = Some(name.to_owned());
        Ok(self)
    }

    /// Evaluate at most `n` items per page.
    #[must_use]
    pub fn limit(mut self, n: u32) -> Self {
        self.limit = Some(n);
        self
    }

    /// Request strongly consistent reads.
    #[must_use]
    pub fn consistent_read(mut self, consistent: bool) -> Self {
        self.consistent_read = consistent;
        self
    }

    /// Assemble the request for one page. Pure; may be called repeatedly.
    #[must_use]
    pub fn build_request(&self, cursor: Option<&PaginationCursor>) -> StoreRequest {
        let mut alloc = PlaceholderAllocator::new(self.config.name_policy);
        let mut input = ScanInput {
            table_name: self.schema().table_name().to_owned(),
            index_name: self.index.clone(),
            limit: self.limit.or(self.config.page_size),
            consistent_read: self.consistent_read.then_some(true),
            exclusive_start_key: cursor.map(|c| c.key().clone()).unwrap_or_default(),
            ..ScanInput::default()
        };
        input.filter_expression = self.filter.render_with(&mut alloc).drain_into(
            &mut input.expression_attribute_names,
            &mut input.expression_attribute_values,
        );

        debug!(
            table = %input.table_name,
            index = ?input.index_name,
            filters = self.filter.len(),
            limit = ?input.limit,
            cursor = cursor.is_some(),
            "built scan request"
        );
        StoreRequest::Scan(input)
    }

    /// Fetch one page, starting after `cursor` when given.
    pub async fn execute<C: StoreClient + ?Sized>(
        &self,
        client: &C,
        cursor: Option<&PaginationCursor>,
    ) -> Result<Page<T>, Error> {
        fetch_page(&self.marshaler, client, self.build_request(cursor)).await
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

    /// Follow cursors until the scan is exhausted and return every record.
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

impl<T: Serialize + DeserializeOwned> FilterChain for ScanBuilder<T> {
    fn filter(
        mut self,
        path: &str,
        operator: Operator,
        operands: Vec<AttributeValue>,
    ) -> Result<Self, Error> {
        let predicate = checked_predicate(self.schema(), &self.config, path, operator, operands)?;
        self.filter.add_predicate(predicate);
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::NamePolicy;
    use crate::error::SchemaError;
    use crate::schema::tests::user_profiles;

    type Row = std::collections::HashMap<String, serde_json::Value>;

    fn scan() -> ScanBuilder<Row> {
        ScanBuilder::with_schema(Arc::new(user_profiles()), BuilderConfig::default())
    }

    fn scan_input(request: StoreRequest) -> ScanInput {
        match request {
            StoreRequest::Scan(input) => input,
            other => panic!("expected scan, got {other:?}"),
        }
    }

    #[test]
    fn test_should_build_filtered_scan() {
        let builder = scan()
            .filter_eq("is_active", true)
            .unwrap()
            .filter_between("age", 18, 65)
            .unwrap();

        let input = scan_input(builder.build_request(None));
        assert_eq!(input.table_name, "user-profiles");
        assert_eq!(
            input.filter_expression.as_deref(),
            Some("#n0 = :v0 AND #n1 BETWEEN :v1 AND :v2")
        );
        assert_eq!(input.expression_attribute_names["#n0"], "is_active");
        assert_eq!(input.expression_attribute_names["#n1"], "age");
        assert_eq!(input.expression_attribute_values[":v0"], AttributeValue::Bool(true));
        assert_eq!(input.expression_attribute_values[":v1"], AttributeValue::N("18".to_owned()));
        assert_eq!(input.expression_attribute_values[":v2"], AttributeValue::N("65".to_owned()));
        assert!(input.exclusive_start_key.is_empty());
        assert!(input.limit.is_none());
        assert!(input.consistent_read.is_none());
    }

    #[test]
    fn test_should_build_unfiltered_scan() {
        let input = scan_input(scan().build_request(None));
        assert!(input.filter_expression.is_none());
        assert!(input.expression_attribute_names.is_empty());
        assert!(input.expression_attribute_values.is_empty());
    }

    #[test]
    fn test_should_fail_fast_on_invalid_filter() {
        let err = scan().filter_gt("age", "old").unwrap_err();
        assert!(matches!(err, Error::Schema(SchemaError::OperandType { .. })));

        let err = scan().filter_eq("nickname", "x").unwrap_err();
        assert!(matches!(err, Error::Schema(SchemaError::NotFound { .. })));
    }

    #[test]
    fn test_should_apply_config_and_options() {
        let config = BuilderConfig::builder()
            .page_size(Some(25))
            .consistent_read(true)
            .name_policy(NamePolicy::ReservedOnly)
            .build();
        let builder = ScanBuilder::<Row>::with_schema(Arc::new(user_profiles()), config)
            .filter_eq("status", "active")
            .unwrap()
            .filter_ge("age", 21)
            .unwrap();

        let input = scan_input(builder.build_request(None));
        assert_eq!(input.limit, Some(25));
        assert_eq!(input.consistent_read, Some(true));
        assert_eq!(input.filter_expression.as_deref(), Some("#n0 = :v0 AND age >= :v1"));
        assert_eq!(input.expression_attribute_names.len(), 1);

        let input = scan_input(builder.limit(5).consistent_read(false).build_request(None));
        assert_eq!(input.limit, Some(5));
        assert!(input.consistent_read.is_none());
    }

    #[test]
    fn test_should_scan_secondary_index() {
        let input = scan_input(scan().for_index("email-index").unwrap().build_request(None));
        assert_eq!(input.index_name.as_deref(), Some("email-index"));

        assert!(matches!(
            scan().for_index("missing"),
            Err(Error::Schema(SchemaError::IndexNotFound { .. }))
        ));
    }

    #[test]
    fn test_should_carry_cursor_as_start_key() {
        let schema = user_profiles();
        let key = dynoschema_model::Item::from([
            ("user_id".to_owned(), AttributeValue::from("u1")),
            ("timestamp".to_owned(), AttributeValue::from(7)),
        ]);
        let cursor = PaginationCursor::from_last_evaluated_key(&schema, key.clone()).unwrap();

        let builder = scan().filter_exists("email").unwrap();
        let first = scan_input(builder.build_request(Some(&cursor)));
        let second = scan_input(builder.build_request(Some(&cursor)));
        assert_eq!(first.exclusive_start_key, key);
        assert_eq!(first, second);
    }
}

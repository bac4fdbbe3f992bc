//! Put builder.

use std::sync::Arc;

use dynoschema_model::{AttributeValue, Item, PutItemInput, PutItemOutput, StoreError};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use super::{ConditionChain, checked_predicate};
use crate::client::{StoreClient, StoreRequest, StoreResponse, dispatch_request};
use crate::config::BuilderConfig;
use crate::error::Error;
use crate::expression::{ExpressionCompiler, Operator, PlaceholderAllocator};
use crate::marshal::{Marshaler, Record};
use crate::schema::SchemaDescriptor;

/// Writes one record, optionally guarded by a condition.
///
/// The record is marshaled when the builder is created, so marshaling errors
/// surface before any condition is added.
#[derive(Debug, Clone)]
pub struct PutBuilder<T> {
    marshaler: Marshaler<T>,
    config: BuilderConfig,
    item: Item,
    condition: ExpressionCompiler,
}

impl<T: Record> PutBuilder<T> {
    /// A put of `record` into its own table.
    pub fn new(record: &T) -> Result<Self, Error> {
        Self::with_schema(T::schema(), BuilderConfig::default(), record)
    }
}

impl<T: Serialize + DeserializeOwned> PutBuilder<T> {
    /// A put of `record` into `schema`'s table.
    pub fn with_schema(
        schema: Arc<SchemaDescriptor>,
        config: BuilderConfig,
        record: &T,
    ) -> Result<Self, Error> {
        let marshaler = Marshaler::with_schema(schema);
        let item = marshaler.to_wire_item(record)?;
        Ok(Self {
            marshaler,
            config,
            item,
            condition: ExpressionCompiler::new(),
        })
    }

    /// The schema being written to.
    #[must_use]
    pub fn schema(&self) -> &Arc<SchemaDescriptor> {
        self.marshaler.schema()
    }

    /// The marshaled item.
    #[must_use]
    pub fn item(&self) -> &Item {
        &self.item
    }

    /// Only write if no item with this primary key exists yet.
    pub fn if_not_exists(self) -> Result<Self, Error> {
        let partition_key = self.schema().keys().partition_key.clone();
        self.condition_not_exists(&partition_key)
    }

    /// Assemble the put request. Pure.
    #[must_use]
    pub fn build_request(&self) -> StoreRequest {
        let mut alloc = PlaceholderAllocator::new(self.config.name_policy);
        let mut input = PutItemInput {
            table_name: self.schema().table_name().to_owned(),
            item: self.item.clone(),
            ..PutItemInput::default()
        };
        input.condition_expression = self.condition.render_with(&mut alloc).drain_into(
            &mut input.expression_attribute_names,
            &mut input.expression_attribute_values,
        );

        debug!(
            table = %input.table_name,
            attributes = input.item.len(),
            conditions = self.condition.len(),
            "built put request"
        );
        StoreRequest::Put(input)
    }

    /// Send the put. A failed condition comes back as the store's
    /// `ConditionalCheckFailedException`.
    pub async fn execute<C: StoreClient + ?Sized>(&self, client: &C) -> Result<PutItemOutput, Error> {
        match dispatch_request(client, self.build_request()).await? {
            StoreResponse::Put(output) => Ok(output),
            _ => Err(StoreError::serialization("put request answered with a read response").into()),
        }
    }
}

impl<T: Serialize + DeserializeOwned> ConditionChain for PutBuilder<T> {
    fn condition(
        mut self,
        path: &str,
        operator: Operator,
        operands: Vec<AttributeValue>,
    ) -> Result<Self, Error> {
        let predicate = checked_predicate(self.schema(), &self.config, path, operator, operands)?;
        self.condition.add_predicate(predicate);
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use serde::Deserialize;

    use super::*;
    use crate::error::{MarshalError, SchemaError};
    use crate::schema::tests::user_profiles;

    #[derive(Debug, Clone, Serialize, Deserialize)]
    struct Profile {
        user_id: String,
        timestamp: i64,
        email: String,
        age: u32,
        is_active: bool,
    }

    fn profile() -> Profile {
        Profile {
            user_id: "user123".to_owned(),
            timestamp: 1_640_995_200,
            email: "user@example.com".to_owned(),
            age: 25,
            is_active: true,
        }
    }

    fn put() -> PutBuilder<Profile> {
        PutBuilder::with_schema(Arc::new(user_profiles()), BuilderConfig::default(), &profile())
            .unwrap()
    }

    fn put_input(request: StoreRequest) -> PutItemInput {
        match request {
            StoreRequest::Put(input) => input,
            other => panic!("expected put, got {other:?}"),
        }
    }

    #[test]
    fn test_should_build_unconditional_put() {
        let input = put_input(put().build_request());
        assert_eq!(input.table_name, "user-profiles");
        assert_eq!(input.item.len(), 5);
        assert!(input.condition_expression.is_none());
        assert!(input.expression_attribute_names.is_empty());
    }

    #[test]
    fn test_should_build_conditional_put() {
        let builder = put()
            .if_not_exists()
            .unwrap()
            .condition_lt("age", 30)
            .unwrap();
        let input = put_input(builder.build_request());
        assert_eq!(
            input.condition_expression.as_deref(),
            Some("attribute_not_exists(#n0) AND #n1 < :v0")
        );
        assert_eq!(input.expression_attribute_names["#n0"], "user_id");
        assert_eq!(input.expression_attribute_values[":v0"], AttributeValue::N("30".to_owned()));
    }

    #[test]
    fn test_should_validate_conditions() {
        assert!(matches!(
            put().condition_eq("age", "old"),
            Err(Error::Schema(SchemaError::OperandType { .. }))
        ));
        assert!(matches!(
            put().condition_in("age", Vec::<i32>::new()),
            Err(Error::Schema(SchemaError::Arity { .. }))
        ));
    }

    #[test]
    fn test_should_surface_marshal_errors_at_creation() {
        #[derive(Serialize, Deserialize)]
        struct Partial {
            user_id: String,
        }
        let result = PutBuilder::with_schema(
            Arc::new(user_profiles()),
            BuilderConfig::default(),
            &Partial {
                user_id: "u".to_owned(),
            },
        );
        assert!(matches!(
            result,
            Err(Error::Marshal(MarshalError::MissingField { .. }))
        ));
    }
}

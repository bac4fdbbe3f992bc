//! Request shapes sent to the store.
//!
//! All input structs use `PascalCase` JSON field naming to match the store's
//! wire protocol (`awsJson1_0`). Optional fields are omitted when `None`,
//! empty maps are omitted to produce minimal JSON payloads. Expression maps
//! are ordered so identical requests serialize byte-for-byte identically.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::attribute_value::AttributeValue;

/// Input for the `PutItem` operation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PutItemInput {
    /// The name of the table to write to.
    pub table_name: String,

    /// The full item, including key attributes.
    pub item: HashMap<String, AttributeValue>,

    /// A condition that must hold for the write to succeed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub condition_expression: Option<String>,

    /// Substitution tokens for attribute names in the condition.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub expression_attribute_names: BTreeMap<String, String>,

    /// Substitution tokens for attribute values in the condition.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub expression_attribute_values: BTreeMap<String, AttributeValue>,
}

/// Input for the `Query` operation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct QueryInput {
    /// The name of the table to query.
    pub table_name: String,

    /// The name of a secondary index to query instead of the base table.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index_name: Option<String>,

    /// The condition on the partition key (and optionally the sort key).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key_condition_expression: Option<String>,

    /// A filter applied after the key condition, before results are returned.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter_expression: Option<String>,

    /// Substitution tokens for attribute names in the expressions.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub expression_attribute_names: BTreeMap<String, String>,

    /// Substitution tokens for attribute values in the expressions.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub expression_attribute_values: BTreeMap<String, AttributeValue>,

    /// Whether to traverse the sort key in ascending (`true`, the default) or
    /// descending order.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scan_index_forward: Option<bool>,

    /// The maximum number of items to evaluate (not necessarily the number of
    /// matching items).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,

    /// The primary key of the first item that this operation will evaluate.
    /// Use the value returned in `LastEvaluatedKey` from a previous query.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub exclusive_start_key: HashMap<String, AttributeValue>,

    /// Whether to use strongly consistent reads.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub consistent_read: Option<bool>,
}

/// Input for the `Scan` operation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ScanInput {
    /// The name of the table to scan.
    pub table_name: String,

    /// The name of a secondary index to scan instead of the base table.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index_name: Option<String>,

    /// A filter applied to scanned items before results are returned.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter_expression: Option<String>,

    /// Substitution tokens for attribute names in the filter.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub expression_attribute_names: BTreeMap<String, String>,

    /// Substitution tokens for attribute values in the filter.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub expression_attribute_values: BTreeMap<String, AttributeValue>,

    /// The maximum number of items to evaluate.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,

    /// The primary key of the first item that this operation will evaluate.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub exclusive_start_key: HashMap<String, AttributeValue>,

    /// Whether to use strongly consistent reads.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub consistent_read: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_serialize_minimal_scan() {
        let input = ScanInput {
            table_name: "user-profiles".to_owned(),
            ..ScanInput::default()
        };
        let json = serde_json::to_string(&input).unwrap();
        assert_eq!(json, r#"{"TableName":"user-profiles"}"#);
    }

    #[test]
    fn test_should_serialize_query_with_expression_maps() {
        let mut names = BTreeMap::new();
        names.insert("#n0".to_owned(), "user_id".to_owned());
        let mut values = BTreeMap::new();
        values.insert(":v0".to_owned(), AttributeValue::from("user123"));
        let input = QueryInput {
            table_name: "user-profiles".to_owned(),
            key_condition_expression: Some("#n0 = :v0".to_owned()),
            expression_attribute_names: names,
            expression_attribute_values: values,
            limit: Some(10),
            ..QueryInput::default()
        };
        let json = serde_json::to_string(&input).unwrap();
        assert_eq!(
            json,
            concat!(
                r##"{"TableName":"user-profiles","KeyConditionExpression":"#n0 = :v0","##,
                r##""ExpressionAttributeNames":{"#n0":"user_id"},"##,
                r#""ExpressionAttributeValues":{":v0":{"S":"user123"}},"Limit":10}"#
            )
        );
    }
}

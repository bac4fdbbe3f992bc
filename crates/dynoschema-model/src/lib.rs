//! Wire types for dynoschema.
//!
//! This crate holds the attribute-value representation exchanged with a
//! DynamoDB-style document store, the request/response shapes the core
//! builds and consumes, and the error type of the external store client.
//! Everything here is plain data with serde derives; the JSON layout matches
//! the store's `awsJson1_0` protocol.
// "DynamoDB" appears in many doc comments in this crate.
#![allow(clippy::doc_markdown)]
#![allow(clippy::module_name_repetitions)]

pub mod attribute_value;
pub mod error;
pub mod input;
pub mod number;
pub mod output;

pub use attribute_value::{AttributeValue, Item, WireType};
pub use error::{StoreError, StoreErrorCode};
pub use input::{PutItemInput, QueryInput, ScanInput};
pub use output::{PutItemOutput, QueryOutput, ScanOutput};

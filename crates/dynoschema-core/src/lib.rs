//! Schema-driven item layer for DynamoDB-style document stores.
//!
//! A [`SchemaDescriptor`] declares a table once. From it this crate derives:
//!
//! - typed marshaling between records and wire items ([`marshal`]);
//! - scan, query and put builders that compile chained predicates into
//!   expressions with `#nN`/`:vN` placeholder maps ([`builder`],
//!   [`expression`]);
//! - pagination cursors that round-trip as opaque tokens ([`cursor`]).
//!
//! Network I/O stays outside: requests go through the [`StoreClient`] trait.
#![allow(clippy::doc_markdown, clippy::module_name_repetitions)]

pub mod builder;
pub mod client;
pub mod config;
pub mod cursor;
pub mod error;
pub mod expression;
pub mod marshal;
pub mod path;
pub mod schema;

pub use builder::{ConditionChain, FilterChain, Page, PutBuilder, QueryBuilder, ScanBuilder};
pub use client::{StoreClient, StoreRequest, StoreResponse};
pub use config::{BuilderConfig, NamePolicy};
pub use cursor::{CursorCodec, PaginationCursor};
pub use error::{CursorError, Error, MarshalError, SchemaError, UnmarshalError};
pub use marshal::{Marshaler, Record};
pub use schema::{AttributeSpec, SchemaDescriptor, SecondaryIndex};

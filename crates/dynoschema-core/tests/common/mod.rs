//! Shared fixtures for the integration tests: a user-profiles record type and
//! an in-memory store client.
#![allow(dead_code)]

use std::cmp::Ordering;
use std::sync::{Arc, LazyLock, Once};

use dynoschema_core::client::{StoreClient, StoreFuture, StoreRequest, StoreResponse};
use dynoschema_core::schema::{AttributeSpec, SchemaDescriptor, SecondaryIndex};
use dynoschema_core::Record;
use dynoschema_model::{
    AttributeValue, Item, PutItemInput, PutItemOutput, QueryInput, QueryOutput, ScanInput,
    ScanOutput, StoreError, WireType,
};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

static INIT: Once = Once::new();

/// Initialize tracing (once).
pub fn init_tracing() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
            )
            .with_test_writer()
            .init();
    });
}

// ---------------------------------------------------------------------------
// Record fixture
// ---------------------------------------------------------------------------

static USER_PROFILES: LazyLock<Arc<SchemaDescriptor>> = LazyLock::new(|| {
    Arc::new(
        SchemaDescriptor::builder("user-profiles")
            .attribute(AttributeSpec::new("user_id", WireType::String))
            .attribute(AttributeSpec::new("timestamp", WireType::Number))
            .attribute(AttributeSpec::new("email", WireType::String))
            .attribute(AttributeSpec::new("age", WireType::Number))
            .attribute(AttributeSpec::new("is_active", WireType::Bool))
            .attribute(AttributeSpec::new("status", WireType::String).nullable())
            .partition_key("user_id")
            .sort_key("timestamp")
            .index(SecondaryIndex::new("email-index", "email"))
            .build()
            .expect("user-profiles schema is valid"),
    )
});

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub user_id: String,
    pub timestamp: i64,
    pub email: String,
    pub age: u32,
    pub is_active: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

impl Record for UserProfile {
    fn schema() -> Arc<SchemaDescriptor> {
        Arc::clone(&USER_PROFILES)
    }
}

impl UserProfile {
    pub fn numbered(n: usize) -> Self {
        Self {
            user_id: format!("user{n:04}"),
            timestamp: 1_640_995_200 + i64::try_from(n).expect("small test index"),
            email: format!("user{n}@example.com"),
            age: 18 + u32::try_from(n % 60).expect("small test index"),
            is_active: n % 3 != 0,
            status: None,
        }
    }
}

// ---------------------------------------------------------------------------
// In-memory store client
// ---------------------------------------------------------------------------

/// An in-memory table honouring `Limit`, `ExclusiveStartKey` and
/// `ScanIndexForward`. Items are kept sorted by partition key, then sort key.
///
/// Filter expressions are not evaluated. A query matches the partition key
/// equality that leads its `KeyConditionExpression`, with the name either
/// inline or behind a `#n` placeholder.
#[derive(Debug)]
pub struct MemoryClient {
    partition_key: String,
    sort_key: Option<String>,
    items: Mutex<Vec<Item>>,
    requests: Mutex<Vec<StoreRequest>>,
    fail_next: Mutex<Option<StoreError>>,
}

impl MemoryClient {
    pub fn new(schema: &SchemaDescriptor) -> Self {
        Self {
            partition_key: schema.keys().partition_key.clone(),
            sort_key: schema.keys().sort_key.clone(),
            items: Mutex::new(Vec::new()),
            requests: Mutex::new(Vec::new()),
            fail_next: Mutex::new(None),
        }
    }

    pub fn insert(&self, item: Item) {
        let mut items = self.items.lock();
        items.retain(|existing| self.key_order(existing, &item) != Ordering::Equal);
        items.push(item);
        items.sort_by(|a, b| self.key_order(a, b));
    }

    pub fn len(&self) -> usize {
        self.items.lock().len()
    }

    /// Make the next request fail with `error`.
    pub fn fail_next(&self, error: StoreError) {
        *self.fail_next.lock() = Some(error);
    }

    pub fn last_request(&self) -> Option<StoreRequest> {
        self.requests.lock().last().cloned()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().len()
    }

    fn key_order(&self, a: &Item, b: &Item) -> Ordering {
        compare_attr(a.get(&self.partition_key), b.get(&self.partition_key)).then_with(|| {
            self.sort_key.as_ref().map_or(Ordering::Equal, |sk| {
                compare_attr(a.get(sk), b.get(sk))
            })
        })
    }

    fn key_of(&self, item: &Item) -> Item {
        item.iter()
            .filter(|(name, _)| {
                **name == self.partition_key || self.sort_key.as_ref() == Some(*name)
            })
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    fn page(
        &self,
        mut candidates: Vec<Item>,
        forward: bool,
        limit: Option<u32>,
        start: &Item,
    ) -> (Vec<Item>, Item) {
        if !forward {
            candidates.reverse();
        }

        // Skip items up to and including the start key.
        let start_idx = if start.is_empty() {
            0
        } else {
            candidates
                .iter()
                .position(|item| self.key_of(item) == *start)
                .map_or(0, |idx| idx + 1)
        };

        let limit = limit.map_or(usize::MAX, |l| l as usize);
        let selected: Vec<Item> = candidates.iter().skip(start_idx).take(limit).cloned().collect();
        let has_more = start_idx.saturating_add(limit) < candidates.len();
        let last_key = if has_more {
            selected.last().map(|item| self.key_of(item)).unwrap_or_default()
        } else {
            Item::new()
        };
        (selected, last_key)
    }

    fn scan(&self, input: &ScanInput) -> ScanOutput {
        let candidates = self.items.lock().clone();
        let (items, last_evaluated_key) =
            self.page(candidates, true, input.limit, &input.exclusive_start_key);
        let count = count(&items);
        ScanOutput {
            items,
            count,
            scanned_count: count,
            last_evaluated_key,
        }
    }

    fn query(&self, input: &QueryInput) -> Result<QueryOutput, StoreError> {
        let Some((name, value)) = partition_condition(input) else {
            return Err(StoreError::validation("query has no partition key condition"));
        };
        let candidates: Vec<Item> = self
            .items
            .lock()
            .iter()
            .filter(|item| item.get(name) == Some(value))
            .cloned()
            .collect();
        let forward = input.scan_index_forward.unwrap_or(true);
        let (items, last_evaluated_key) =
            self.page(candidates, forward, input.limit, &input.exclusive_start_key);
        let count = count(&items);
        Ok(QueryOutput {
            items,
            count,
            scanned_count: count,
            last_evaluated_key,
        })
    }

    fn put(&self, input: PutItemInput) -> Result<PutItemOutput, StoreError> {
        let only_if_absent = input
            .condition_expression
            .as_deref()
            .is_some_and(|c| c.starts_with("attribute_not_exists("));
        if only_if_absent {
            let key = self.key_of(&input.item);
            if self.items.lock().iter().any(|item| self.key_of(item) == key) {
                return Err(StoreError::conditional_check_failed(
                    "The conditional request failed",
                ));
            }
        }
        self.insert(input.item);
        Ok(PutItemOutput::default())
    }
}

impl StoreClient for MemoryClient {
    fn execute(&self, request: StoreRequest) -> StoreFuture<'_> {
        self.requests.lock().push(request.clone());
        let result = match self.fail_next.lock().take() {
            Some(error) => Err(error),
            None => match request {
                StoreRequest::Scan(input) => Ok(StoreResponse::Scan(self.scan(&input))),
                StoreRequest::Query(input) => self.query(&input).map(StoreResponse::Query),
                StoreRequest::Put(input) => self.put(input).map(StoreResponse::Put),
            },
        };
        Box::pin(async move { result })
    }
}

fn compare_attr(a: Option<&AttributeValue>, b: Option<&AttributeValue>) -> Ordering {
    match (a, b) {
        (Some(AttributeValue::N(x)), Some(AttributeValue::N(y))) => {
            let x: f64 = x.parse().unwrap_or(f64::NAN);
            let y: f64 = y.parse().unwrap_or(f64::NAN);
            x.total_cmp(&y)
        }
        (Some(x), Some(y)) => x.to_string().cmp(&y.to_string()),
        (a, b) => a.is_some().cmp(&b.is_some()),
    }
}

/// The `(name, value)` of the leading `name = :v` key condition.
fn partition_condition(input: &QueryInput) -> Option<(&str, &AttributeValue)> {
    let expression = input.key_condition_expression.as_deref()?;
    let first = expression.split(" AND ").next()?;
    let (name, value) = first.split_once(" = ")?;
    let name = if name.starts_with('#') {
        input.expression_attribute_names.get(name)?.as_str()
    } else {
        name
    };
    Some((name, input.expression_attribute_values.get(value)?))
}

fn count(items: &[Item]) -> u32 {
    u32::try_from(items.len()).unwrap_or(u32::MAX)
}

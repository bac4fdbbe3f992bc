//! The seam to the external store client.
//!
//! The core never performs I/O itself. Builders hand a [`StoreRequest`] to a
//! [`StoreClient`] implementation and await its [`StoreResponse`]. Errors the
//! client returns are passed back to the caller unchanged.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use dynoschema_model::{
    PutItemInput, PutItemOutput, QueryInput, QueryOutput, ScanInput, ScanOutput, StoreError,
};

/// Future returned by [`StoreClient::execute`].
pub type StoreFuture<'a> =
    Pin<Box<dyn Future<Output = Result<StoreResponse, StoreError>> + Send + 'a>>;

/// Store operations the builders issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOperation {
    /// `Scan`.
    Scan,
    /// `Query`.
    Query,
    /// `PutItem`.
    PutItem,
}

impl StoreOperation {
    /// The wire name of the operation.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Scan => "Scan",
            Self::Query => "Query",
            Self::PutItem => "PutItem",
        }
    }
}

impl fmt::Display for StoreOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A fully assembled request.
#[derive(Debug, Clone, PartialEq)]
pub enum StoreRequest {
    /// Scan a table or index.
    Scan(ScanInput),
    /// Query a table or index.
    Query(QueryInput),
    /// Write one item.
    Put(PutItemInput),
}

impl StoreRequest {
    /// The operation this request performs.
    #[must_use]
    pub fn operation(&self) -> StoreOperation {
        match self {
            Self::Scan(_) => StoreOperation::Scan,
            Self::Query(_) => StoreOperation::Query,
            Self::Put(_) => StoreOperation::PutItem,
        }
    }

    /// The target table.
    #[must_use]
    pub fn table_name(&self) -> &str {
        match self {
            Self::Scan(input) => &input.table_name,
            Self::Query(input) => &input.table_name,
            Self::Put(input) => &input.table_name,
        }
    }
}

/// The client's answer to a [`StoreRequest`].
#[derive(Debug, Clone, PartialEq)]
pub enum StoreResponse {
    /// Result of a scan.
    Scan(ScanOutput),
    /// Result of a query.
    Query(QueryOutput),
    /// Result of a put.
    Put(PutItemOutput),
}

impl StoreResponse {
    /// The operation this response answers.
    #[must_use]
    pub fn operation(&self) -> StoreOperation {
        match self {
            Self::Scan(_) => StoreOperation::Scan,
            Self::Query(_) => StoreOperation::Query,
            Self::Put(_) => StoreOperation::PutItem,
        }
    }
}

/// Trait the external store client must implement.
///
/// Implementations own transport, credentials, retries and timeouts.
/// Dropping the returned future cancels the request.
pub trait StoreClient: Send + Sync {
    /// Send one request and return the store's response.
    fn execute(&self, request: StoreRequest) -> StoreFuture<'_>;
}

impl<C: StoreClient + ?Sized> StoreClient for Arc<C> {
    fn execute(&self, request: StoreRequest) -> StoreFuture<'_> {
        (**self).execute(request)
    }
}

impl<C: StoreClient + ?Sized> StoreClient for &C {
    fn execute(&self, request: StoreRequest) -> StoreFuture<'_> {
        (**self).execute(request)
    }
}

/// Send `request` through `client` and check the response matches it.
pub async fn dispatch_request<C: StoreClient + ?Sized>(
    client: &C,
    request: StoreRequest,
) -> Result<StoreResponse, StoreError> {
    let operation = request.operation();
    tracing::debug!(%operation, table = request.table_name(), "dispatching store request");

    let response = client.execute(request).await?;
    if response.operation() != operation {
        return Err(StoreError::serialization(format!(
            "expected a {operation} response, got {}",
            response.operation()
        )));
    }
    Ok(response)
}

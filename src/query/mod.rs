use std::{
    fmt,
    future::{Future, IntoFuture},
    pin::Pin,
    sync::Arc,
    time::{Duration, Instant},
};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::OnceCell;

use crate::{
    Error, Result, metrics,
    response::{ErrorInfo, QueryResponse},
    transport::{Transport, error_message},
};

pub mod filter;
pub mod wire;

pub use filter::{FilterKind, Predicate};
use wire::{WireOptions, WireOrder, WireOrderOptions, WireRequest};

const SLOW_DISPATCH: Duration = Duration::from_millis(500);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Select,
    Insert,
    Update,
    Delete,
}

/// Expected shape of the result set.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Cardinality {
    #[default]
    Many,
    One,
    MaybeOne,
}

/// Row-count mode requested alongside a select.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CountMode {
    Exact,
    Planned,
    Estimated,
}

/// Direction for sorting results.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    fn is_ascending(self) -> bool {
        matches!(self, SortDirection::Asc)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SelectOptions {
    pub count: Option<CountMode>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Selection {
    columns: String,
    count: Option<CountMode>,
}

impl Default for Selection {
    fn default() -> Self {
        Self {
            columns: "*".to_string(),
            count: None,
        }
    }
}

impl Selection {
    pub fn columns(&self) -> &str {
        &self.columns
    }

    pub fn count(&self) -> Option<CountMode> {
        self.count
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SortSpec {
    column: String,
    direction: SortDirection,
}

impl SortSpec {
    pub fn column(&self) -> &str {
        &self.column
    }

    pub fn direction(&self) -> SortDirection {
        self.direction
    }
}

/// Accumulated, not yet executed description of a data operation.
#[derive(Clone, Debug, PartialEq)]
pub struct QuerySpec {
    collection: String,
    operation: Option<Operation>,
    selection: Selection,
    payload: Option<Value>,
    filters: Vec<Predicate>,
    ordering: Option<SortSpec>,
    limit: Option<i64>,
    cardinality: Cardinality,
}

impl QuerySpec {
    pub(crate) fn new(collection: String) -> Self {
        Self {
            collection,
            operation: None,
            selection: Selection::default(),
            payload: None,
            filters: Vec::new(),
            ordering: None,
            limit: None,
            cardinality: Cardinality::Many,
        }
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Operation selected so far; `None` means the dispatch default (`Select`).
    pub fn operation(&self) -> Option<Operation> {
        self.operation
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn payload(&self) -> Option<&Value> {
        self.payload.as_ref()
    }

    pub fn filters(&self) -> &[Predicate] {
        &self.filters
    }

    pub fn ordering(&self) -> Option<&SortSpec> {
        self.ordering.as_ref()
    }

    pub fn limit(&self) -> Option<i64> {
        self.limit
    }

    pub fn cardinality(&self) -> Cardinality {
        self.cardinality
    }

    fn set_operation(&mut self, operation: Operation) {
        if let Some(previous) = self.operation {
            if previous != operation {
                tracing::warn!(
                    target: "rillquery::query",
                    collection = %self.collection,
                    ?previous,
                    next = ?operation,
                    "operation replaced; the last call wins"
                );
            }
        }
        self.operation = Some(operation);
    }

    pub(crate) fn push_filter(&mut self, predicate: Predicate) {
        self.filters.push(predicate);
    }

    pub fn to_wire(&self) -> WireRequest {
        let operation = self.operation.unwrap_or(Operation::Select);
        let selection = self.selection.clone();
        WireRequest {
            collection: self.collection.clone(),
            operation,
            data: self.payload.clone(),
            filters: self.filters.clone(),
            options: WireOptions {
                columns: selection.columns,
                order: self.ordering.as_ref().map(|sort| WireOrder {
                    column: sort.column.clone(),
                    options: WireOrderOptions {
                        ascending: sort.direction.is_ascending(),
                    },
                }),
                limit: self.limit,
                single: self.cardinality == Cardinality::One,
                maybe_single: self.cardinality == Cardinality::MaybeOne,
                count: selection.count,
            },
        }
    }
}

/// Caller mistakes recorded while chaining and reported before dispatch.
#[derive(Clone, Debug)]
enum Misuse {
    MissingCollection,
    ConflictingCardinality,
    NegativeLimit(i64),
    AlreadyDispatched,
    NestedNegation,
    InvalidPayload(String),
}

impl From<Misuse> for Error {
    fn from(misuse: Misuse) -> Self {
        match misuse {
            Misuse::MissingCollection => Error::MissingCollection,
            Misuse::ConflictingCardinality => Error::ConflictingCardinality,
            Misuse::NegativeLimit(n) => Error::NegativeLimit(n),
            Misuse::AlreadyDispatched => Error::AlreadyDispatched,
            Misuse::NestedNegation => Error::NestedNegation,
            Misuse::InvalidPayload(msg) => Error::InvalidPayload(msg),
        }
    }
}

/// Chainable builder for one query against a collection.
///
/// Chain methods take the builder by value and hand it back. Nothing is sent
/// until the builder is consumed with [`execute`](Self::execute) or `.await`;
/// the request then goes out exactly once and the response is memoized, so
/// awaiting `&builder` again returns the same result without a second call.
///
/// There is no timeout or cancellation on the builder itself. Wrap the await
/// in `tokio::time::timeout` when a deadline is needed.
pub struct QueryBuilder {
    transport: Arc<dyn Transport>,
    spec: QuerySpec,
    misuse: Option<Misuse>,
    dispatched: OnceCell<QueryResponse>,
}

impl fmt::Debug for QueryBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryBuilder")
            .field("collection", &self.spec.collection())
            .field("operation", &self.spec.operation())
            .field("filters", &self.spec.filters())
            .field("ordering", &self.spec.ordering())
            .field("limit", &self.spec.limit())
            .field("cardinality", &self.spec.cardinality())
            .field("dispatched", &self.is_dispatched())
            .finish()
    }
}

impl QueryBuilder {
    pub(crate) fn new(transport: Arc<dyn Transport>, collection: String) -> Self {
        let misuse = collection
            .trim()
            .is_empty()
            .then_some(Misuse::MissingCollection);
        Self {
            transport,
            spec: QuerySpec::new(collection),
            misuse,
            dispatched: OnceCell::new(),
        }
    }

    fn record(&mut self, misuse: Misuse) {
        if self.misuse.is_none() {
            self.misuse = Some(misuse);
        }
    }

    fn touch(&mut self) {
        if self.dispatched.initialized() {
            self.record(Misuse::AlreadyDispatched);
        }
    }

    fn serialize_payload<T: Serialize + ?Sized>(&mut self, data: &T) -> Option<Value> {
        match serde_json::to_value(data) {
            Ok(value) => Some(value),
            Err(e) => {
                self.record(Misuse::InvalidPayload(e.to_string()));
                None
            }
        }
    }

    pub fn select(self, columns: impl Into<String>) -> Self {
        self.select_with(columns, SelectOptions::default())
    }

    pub fn select_with(mut self, columns: impl Into<String>, options: SelectOptions) -> Self {
        self.touch();
        self.spec.set_operation(Operation::Select);
        self.spec.selection = Selection {
            columns: columns.into(),
            count: options.count,
        };
        self.spec.payload = None;
        self
    }

    pub fn insert<T: Serialize + ?Sized>(mut self, data: &T) -> Self {
        self.touch();
        self.spec.set_operation(Operation::Insert);
        self.spec.payload = self.serialize_payload(data);
        self
    }

    pub fn update<T: Serialize + ?Sized>(mut self, data: &T) -> Self {
        self.touch();
        self.spec.set_operation(Operation::Update);
        self.spec.payload = self.serialize_payload(data);
        self
    }

    pub fn delete(mut self) -> Self {
        self.touch();
        self.spec.set_operation(Operation::Delete);
        self.spec.payload = None;
        self
    }

    pub fn filter(mut self, predicate: Predicate) -> Self {
        self.touch();
        self.spec.push_filter(predicate);
        self
    }

    pub fn filter_if(self, condition: bool, predicate: impl FnOnce() -> Predicate) -> Self {
        if condition {
            self.filter(predicate())
        } else {
            self
        }
    }

    pub fn eq(self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filter(Predicate::eq(column, value))
    }

    pub fn neq(self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filter(Predicate::neq(column, value))
    }

    pub fn gt(self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filter(Predicate::gt(column, value))
    }

    pub fn gte(self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filter(Predicate::gte(column, value))
    }

    pub fn lt(self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filter(Predicate::lt(column, value))
    }

    pub fn lte(self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filter(Predicate::lte(column, value))
    }

    pub fn is(self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filter(Predicate::is(column, value))
    }

    pub fn not(
        mut self,
        column: impl Into<String>,
        operator: FilterKind,
        value: impl Into<Value>,
    ) -> Self {
        match Predicate::not(column, operator, value) {
            Ok(predicate) => self.filter(predicate),
            Err(_) => {
                self.record(Misuse::NestedNegation);
                self
            }
        }
    }

    pub fn r#in<I, V>(self, column: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.filter(Predicate::r#in(column, values))
    }

    pub fn order(mut self, column: impl Into<String>, direction: SortDirection) -> Self {
        self.touch();
        self.spec.ordering = Some(SortSpec {
            column: column.into(),
            direction,
        });
        self
    }

    /// Negative values are reported as [`Error::NegativeLimit`] when the
    /// query is executed.
    pub fn limit(mut self, limit: i64) -> Self {
        self.touch();
        if limit < 0 {
            self.record(Misuse::NegativeLimit(limit));
        }
        self.spec.limit = Some(limit);
        self
    }

    /// Expect exactly one row. Zero or several rows produce an `error`.
    pub fn single(self) -> Self {
        self.with_cardinality(Cardinality::One)
    }

    /// Expect zero or one row. Zero rows yield `data: None, error: None`.
    pub fn maybe_single(self) -> Self {
        self.with_cardinality(Cardinality::MaybeOne)
    }

    fn with_cardinality(mut self, cardinality: Cardinality) -> Self {
        self.touch();
        match self.spec.cardinality {
            Cardinality::Many => self.spec.cardinality = cardinality,
            current if current == cardinality => {}
            _ => self.record(Misuse::ConflictingCardinality),
        }
        self
    }

    pub fn descriptor(&self) -> &QuerySpec {
        &self.spec
    }

    pub fn to_wire(&self) -> WireRequest {
        self.spec.to_wire()
    }

    pub fn is_dispatched(&self) -> bool {
        self.dispatched.initialized()
    }

    /// Send the query, or return the memoized response if it already went out.
    ///
    /// `Err` is reserved for caller mistakes caught before any I/O. Remote and
    /// transport failures come back as `Ok` with `error` set.
    pub async fn execute(&self) -> Result<QueryResponse> {
        if let Some(misuse) = &self.misuse {
            metrics::record_caller_error();
            return Err(misuse.clone().into());
        }
        let response = self.dispatched.get_or_init(|| self.dispatch()).await;
        Ok(response.clone())
    }

    async fn dispatch(&self) -> QueryResponse {
        let request = self.spec.to_wire();
        tracing::debug!(
            target: "rillquery::dispatch",
            collection = %request.collection,
            operation = ?request.operation,
            filters = request.filters.len(),
            "dispatching query"
        );

        let start = Instant::now();
        let outcome = self.transport.send(&request).await;
        let elapsed = start.elapsed();
        metrics::record_dispatch(elapsed);
        if elapsed > SLOW_DISPATCH {
            tracing::warn!(
                target: "rillquery::slow_query",
                elapsed_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
                collection = %request.collection,
                operation = ?request.operation,
                "slow query dispatch"
            );
        }

        let response = match outcome.and_then(parse_body) {
            Ok(response) => response,
            Err(err) => {
                metrics::record_transport_error();
                tracing::warn!(
                    target: "rillquery::dispatch",
                    collection = %request.collection,
                    error = %err,
                    "query dispatch failed"
                );
                return QueryResponse::failure(ErrorInfo::from(&err));
            }
        };

        apply_cardinality(self.spec.cardinality, response)
    }
}

/// Turn a successful response body into a [`QueryResponse`].
fn parse_body(mut body: Value) -> Result<QueryResponse> {
    if !body.is_object() {
        return Err(Error::MalformedBody(format!(
            "expected a JSON object, got {body}"
        )));
    }
    if let Some(error) = body.get_mut("error") {
        if let Some(message) = error.as_str().map(str::to_string) {
            *error = serde_json::to_value(ErrorInfo::new(message))?;
        } else if !error.is_null() && error_message(error).is_none() {
            return Err(Error::MalformedBody(format!("unrecognized error field: {error}")));
        }
    }
    let response: QueryResponse =
        serde_json::from_value(body).map_err(|e| Error::MalformedBody(e.to_string()))?;
    Ok(response.normalized())
}

fn apply_cardinality(cardinality: Cardinality, mut response: QueryResponse) -> QueryResponse {
    if cardinality == Cardinality::Many || response.is_error() {
        return response;
    }
    match response.data.take() {
        Some(Value::Array(mut rows)) => match rows.len() {
            1 => response.data = rows.pop(),
            0 if cardinality == Cardinality::MaybeOne => {}
            n => return cardinality_error(n, response.count),
        },
        None if cardinality == Cardinality::One => return cardinality_error(0, response.count),
        other => response.data = other,
    }
    response
}

fn cardinality_error(rows: usize, count: Option<i64>) -> QueryResponse {
    metrics::record_cardinality_error();
    let mut response = QueryResponse::failure(
        ErrorInfo::new(format!(
            "expected a single row but the query returned {rows}"
        ))
        .with_code("cardinality"),
    );
    response.count = count;
    response
}

impl IntoFuture for QueryBuilder {
    type Output = Result<QueryResponse>;
    type IntoFuture = Pin<Box<dyn Future<Output = Self::Output> + Send>>;

    fn into_future(self) -> Self::IntoFuture {
        Box::pin(async move { self.execute().await })
    }
}

impl<'a> IntoFuture for &'a QueryBuilder {
    type Output = Result<QueryResponse>;
    type IntoFuture = Pin<Box<dyn Future<Output = Self::Output> + Send + 'a>>;

    fn into_future(self) -> Self::IntoFuture {
        Box::pin(self.execute())
    }
}

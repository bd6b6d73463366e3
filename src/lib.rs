//! Rillquery — deferred, chainable query builder for a remote data service.
//!
//! A query is described through method chaining and compiled into a single
//! JSON request when it is awaited:
//!
//! ```no_run
//! use rillquery::{Client, query::SortDirection};
//!
//! # async fn run() -> rillquery::Result<()> {
//! let client = Client::builder("https://data.example.com/query")
//!     .api_key("secret")
//!     .build()?;
//!
//! let res = client
//!     .from("users")
//!     .select("id,email")
//!     .eq("active", true)
//!     .order("email", SortDirection::Asc)
//!     .limit(10)
//!     .await?;
//!
//! if let Some(err) = res.error {
//!     eprintln!("query failed: {}", err.message);
//! }
//! # Ok(())
//! # }
//! ```

pub mod client;
mod error;
pub mod metrics;
pub mod query;
pub mod response;
pub mod services;
pub mod testing;
pub mod transport;

pub use client::{Client, ClientBuilder, ClientConfig};
pub use error::{Error, Result, WithContext};
pub use query::{
    Cardinality, CountMode, FilterKind, Operation, Predicate, QueryBuilder, SelectOptions,
    SortDirection,
};
pub use response::{ErrorInfo, QueryResponse};
pub use transport::{HttpTransport, Transport};

pub mod prelude {
    pub use crate::{Client, FilterKind, QueryResponse, Result, SortDirection};
}

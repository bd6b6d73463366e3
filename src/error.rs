use thiserror::Error;

use crate::response::ErrorInfo;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error("collection name is required")]
    MissingCollection,
    #[error("single() and maybe_single() cannot both be requested on the same query")]
    ConflictingCardinality,
    #[error("limit must be a non-negative integer, got {0}")]
    NegativeLimit(i64),
    #[error("query has already been dispatched and can no longer be modified")]
    AlreadyDispatched,
    #[error("not() cannot wrap another negation")]
    NestedNegation,
    #[error("payload could not be serialized: {0}")]
    InvalidPayload(String),
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("remote responded with {status}: {message}")]
    Status { status: u16, message: String },
    #[error("malformed response body: {0}")]
    MalformedBody(String),
    #[error("remote error: {}", .0.message)]
    Remote(ErrorInfo),
    #[error("configuration error: {0}")]
    Config(String),
    #[error("{0} is not implemented")]
    NotImplemented(&'static str),
    #[error("{context}: {source}")]
    Context {
        context: String,
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    /// Caller mistakes detected before any I/O happens.
    pub fn is_caller_error(&self) -> bool {
        matches!(
            self,
            Error::MissingCollection
                | Error::ConflictingCardinality
                | Error::NegativeLimit(_)
                | Error::AlreadyDispatched
                | Error::NestedNegation
                | Error::InvalidPayload(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;

pub trait WithContext<T> {
    fn context(self, msg: impl Into<String>) -> Result<T>;
}

impl<T> WithContext<T> for Result<T> {
    fn context(self, msg: impl Into<String>) -> Result<T> {
        self.map_err(|e| Error::Context {
            context: msg.into(),
            source: Box::new(e),
        })
    }
}

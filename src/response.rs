use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::Value;

use crate::{Error, Result};

/// Error reported by the remote service or produced while talking to it.
///
/// Only `message` has a fixed type; `code`, `details` and `hint` are kept as
/// whatever JSON the remote sent.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ErrorInfo {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hint: Option<Value>,
}

impl ErrorInfo {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code: None,
            details: None,
            hint: None,
        }
    }

    pub fn with_code(mut self, code: impl Into<Value>) -> Self {
        self.code = Some(code.into());
        self
    }

    /// `code` as text, whether the remote sent a string or a number.
    pub fn code_str(&self) -> Option<String> {
        match self.code.as_ref()? {
            Value::String(code) => Some(code.clone()),
            Value::Null => None,
            other => Some(other.to_string()),
        }
    }
}

impl From<&Error> for ErrorInfo {
    fn from(err: &Error) -> Self {
        match err {
            Error::Remote(info) => info.clone(),
            Error::Status { status, message } => {
                ErrorInfo::new(message.clone()).with_code(status.to_string())
            }
            other => ErrorInfo::new(other.to_string()),
        }
    }
}

/// Uniform `{data, error, count}` result of a dispatched query.
///
/// `data` and `error` are never both set.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryResponse {
    #[serde(default)]
    pub data: Option<Value>,
    #[serde(default)]
    pub error: Option<ErrorInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<i64>,
}

impl QueryResponse {
    pub fn ok(data: Value) -> Self {
        Self {
            data: match data {
                Value::Null => None,
                other => Some(other),
            },
            error: None,
            count: None,
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn failure(error: ErrorInfo) -> Self {
        Self {
            data: None,
            error: Some(error),
            count: None,
        }
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }

    /// Number of rows carried in `data`: arrays count their items, a single
    /// object counts as one.
    pub fn row_count(&self) -> usize {
        match &self.data {
            None => 0,
            Some(Value::Array(rows)) => rows.len(),
            Some(_) => 1,
        }
    }

    /// Deserialize `data` into `T`, surfacing a remote error as [`Error::Remote`].
    pub fn decode<T: DeserializeOwned>(&self) -> Result<Option<T>> {
        if let Some(info) = &self.error {
            return Err(Error::Remote(info.clone()));
        }
        match &self.data {
            None => Ok(None),
            Some(value) => Ok(Some(serde_json::from_value(value.clone())?)),
        }
    }

    pub fn into_result(self) -> Result<Option<Value>> {
        match self.error {
            Some(info) => Err(Error::Remote(info)),
            None => Ok(self.data),
        }
    }

    /// Restore the `data`/`error` exclusivity for bodies that carry both.
    pub(crate) fn normalized(mut self) -> Self {
        if self.error.is_some() {
            self.data = None;
        }
        if matches!(self.data, Some(Value::Null)) {
            self.data = None;
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn body_with_both_fields_keeps_only_error() {
        let body: QueryResponse =
            serde_json::from_value(json!({"data": [1], "error": {"message": "boom"}})).unwrap();
        let resp = body.normalized();
        assert!(resp.data.is_none());
        assert_eq!(resp.error.unwrap().message, "boom");
    }

    #[test]
    fn decode_reports_remote_errors() {
        let resp = QueryResponse::failure(ErrorInfo::new("denied"));
        let err = resp.decode::<Value>().unwrap_err();
        assert!(matches!(err, Error::Remote(info) if info.message == "denied"));
    }

    #[test]
    fn decode_typed_rows() {
        #[derive(Deserialize)]
        struct User {
            id: i64,
        }
        let resp = QueryResponse::ok(json!([{"id": 1}, {"id": 2}]));
        let users: Vec<User> = resp.decode().unwrap().unwrap();
        assert_eq!(users.iter().map(|u| u.id).sum::<i64>(), 3);
        assert_eq!(resp.row_count(), 2);
    }

    #[test]
    fn into_result_splits_data_and_error() {
        assert_eq!(
            QueryResponse::ok(json!({"id": 1})).into_result().unwrap(),
            Some(json!({"id": 1}))
        );
        assert!(QueryResponse::failure(ErrorInfo::new("x")).into_result().is_err());
    }

    #[test]
    fn error_fields_accept_any_json() {
        let body: QueryResponse = serde_json::from_value(json!({
            "data": null,
            "error": {"message": "duplicate key", "code": 23505, "details": {"key": "id"}}
        }))
        .unwrap();
        let err = body.error.unwrap();
        assert_eq!(err.code_str().as_deref(), Some("23505"));
        assert_eq!(err.details, Some(json!({"key": "id"})));
    }
}

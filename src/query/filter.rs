use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::{Error, Result};

/// Closed vocabulary of filter operators understood by the remote service.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterKind {
    Eq,
    Neq,
    Gt,
    Gte,
    Lt,
    Lte,
    Is,
    Not,
    In,
}

impl FilterKind {
    pub fn as_str(self) -> &'static str {
        match self {
            FilterKind::Eq => "eq",
            FilterKind::Neq => "neq",
            FilterKind::Gt => "gt",
            FilterKind::Gte => "gte",
            FilterKind::Lt => "lt",
            FilterKind::Lte => "lte",
            FilterKind::Is => "is",
            FilterKind::Not => "not",
            FilterKind::In => "in",
        }
    }
}

impl fmt::Display for FilterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One filter condition. Every predicate on a query is AND-ed with the others.
///
/// Serializes as `{"type": .., "column": .., "value": ..}`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Predicate {
    #[serde(rename = "type")]
    kind: FilterKind,
    column: String,
    value: Value,
}

impl Predicate {
    fn new(kind: FilterKind, column: impl Into<String>, value: Value) -> Self {
        Self {
            kind,
            column: column.into(),
            value,
        }
    }

    pub fn eq(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(FilterKind::Eq, column, value.into())
    }

    pub fn neq(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(FilterKind::Neq, column, value.into())
    }

    pub fn gt(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(FilterKind::Gt, column, value.into())
    }

    pub fn gte(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(FilterKind::Gte, column, value.into())
    }

    pub fn lt(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(FilterKind::Lt, column, value.into())
    }

    pub fn lte(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(FilterKind::Lte, column, value.into())
    }

    /// Null-aware equality: `value` may be `Value::Null`.
    pub fn is(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(FilterKind::Is, column, value.into())
    }

    pub fn is_null(column: impl Into<String>) -> Self {
        Self::new(FilterKind::Is, column, Value::Null)
    }

    /// Negates the comparison `operator` against `value`.
    pub fn not(
        column: impl Into<String>,
        operator: FilterKind,
        value: impl Into<Value>,
    ) -> Result<Self> {
        if operator == FilterKind::Not {
            return Err(Error::NestedNegation);
        }
        Ok(Self::new(
            FilterKind::Not,
            column,
            json!({ "operator": operator, "value": value.into() }),
        ))
    }

    /// Set membership. An empty set is valid and matches no rows.
    pub fn r#in<I, V>(column: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Self::new(
            FilterKind::In,
            column,
            Value::Array(values.into_iter().map(Into::into).collect()),
        )
    }

    pub fn kind(&self) -> FilterKind {
        self.kind
    }

    pub fn column(&self) -> &str {
        &self.column
    }

    pub fn value(&self) -> &Value {
        &self.value
    }
}

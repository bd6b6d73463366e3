use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{CountMode, Operation, filter::Predicate};

/// Request body posted to the remote data service, one per dispatch.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WireRequest {
    pub collection: String,
    pub operation: Operation,
    pub data: Option<Value>,
    pub filters: Vec<Predicate>,
    pub options: WireOptions,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireOptions {
    pub columns: String,
    pub order: Option<WireOrder>,
    pub limit: Option<i64>,
    pub single: bool,
    pub maybe_single: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<CountMode>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WireOrder {
    pub column: String,
    pub options: WireOrderOptions,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireOrderOptions {
    pub ascending: bool,
}

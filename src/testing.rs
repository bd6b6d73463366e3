use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::{Value, json};

use crate::{Client, Error, Result, query::wire::WireRequest, transport::Transport};

/// Scripted reply handed back by [`MockTransport`].
#[derive(Debug)]
pub enum MockReply {
    Body(Value),
    Fail(Error),
}

/// In-memory [`Transport`] that records every request and replays scripted
/// replies in order. Once the script is exhausted it answers
/// `{"data": [], "error": null}`.
#[derive(Clone, Default)]
pub struct MockTransport {
    calls: Arc<AtomicUsize>,
    requests: Arc<Mutex<Vec<WireRequest>>>,
    replies: Arc<Mutex<VecDeque<MockReply>>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_body(self, body: Value) -> Self {
        self.push(MockReply::Body(body));
        self
    }

    pub fn with_rows(self, rows: Value) -> Self {
        self.with_body(json!({ "data": rows, "error": null }))
    }

    pub fn with_failure(self, error: Error) -> Self {
        self.push(MockReply::Fail(error));
        self
    }

    pub fn push(&self, reply: MockReply) {
        self.replies
            .lock()
            .expect("mock replies poisoned")
            .push_back(reply);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<WireRequest> {
        self.requests
            .lock()
            .expect("mock requests poisoned")
            .clone()
    }

    pub fn last_request(&self) -> Option<WireRequest> {
        self.requests().pop()
    }

    /// Client sharing this transport's counters.
    pub fn client(&self) -> Client {
        Client::new(self.clone())
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&self, request: &WireRequest) -> Result<Value> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests
            .lock()
            .expect("mock requests poisoned")
            .push(request.clone());
        let reply = self
            .replies
            .lock()
            .expect("mock replies poisoned")
            .pop_front();
        match reply {
            Some(MockReply::Body(body)) => Ok(body),
            Some(MockReply::Fail(err)) => Err(err),
            None => Ok(json!({ "data": [], "error": null })),
        }
    }
}

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One span as submitted by a tracer.
///
/// The agent stores spans verbatim and never interprets them. The accessors
/// below only exist so assertions can read the well-known keys without
/// poking at raw JSON.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Span(pub Map<String, Value>);

impl Span {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert, mostly for fixtures.
    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.0.insert(key.to_string(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn service(&self) -> Option<&str> {
        self.get_str("service")
    }

    pub fn name(&self) -> Option<&str> {
        self.get_str("name")
    }

    pub fn resource(&self) -> Option<&str> {
        self.get_str("resource")
    }

    pub fn span_id(&self) -> Option<u64> {
        self.get("span_id").and_then(Value::as_u64)
    }

    /// `None` both when the key is missing and for root spans (`parent_id: 0`).
    pub fn parent_id(&self) -> Option<u64> {
        self.get("parent_id")
            .and_then(Value::as_u64)
            .filter(|id| *id != 0)
    }

    /// String tags attached to the span.
    pub fn meta(&self) -> Option<&Map<String, Value>> {
        self.get("meta").and_then(Value::as_object)
    }

    pub fn meta_str(&self, key: &str) -> Option<&str> {
        self.meta()?.get(key)?.as_str()
    }

    fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_str)
    }
}

/// An ordered sequence of spans sharing one trace.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Trace(pub Vec<Span>);

impl Trace {
    pub fn new(spans: Vec<Span>) -> Self {
        Self(spans)
    }

    pub fn spans(&self) -> &[Span] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Spans without a parent.
    pub fn root_spans(&self) -> impl Iterator<Item = &Span> {
        self.0.iter().filter(|span| span.parent_id().is_none())
    }
}

impl From<Vec<Span>> for Trace {
    fn from(spans: Vec<Span>) -> Self {
        Self(spans)
    }
}

/// Body of a trace submission: either a batch of traces or a single trace.
///
/// `[[{..}], [{..}]]` is a batch, `[{..}, {..}]` is one trace. Spans must be
/// JSON objects, which keeps the two shapes unambiguous.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TracePayload {
    Batch(Vec<Trace>),
    Single(Trace),
}

impl TracePayload {
    pub fn into_traces(self) -> Vec<Trace> {
        match self {
            TracePayload::Batch(traces) => traces,
            TracePayload::Single(trace) => vec![trace],
        }
    }
}

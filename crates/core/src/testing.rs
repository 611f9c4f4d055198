use crate::{Span, Trace};

/// Root span of an httpd request, the shape the subject module emits.
pub fn request_span(span_id: u64) -> Span {
    Span::new()
        .with("service", "httpd")
        .with("name", "httpd.request")
        .with("resource", "GET /")
        .with("trace_id", span_id)
        .with("span_id", span_id)
        .with("parent_id", 0u64)
        .with("meta", serde_json::json!({"http.method": "GET"}))
}

/// Single-span trace.
pub fn single_span_trace() -> Trace {
    Trace::new(vec![request_span(next_id())])
}

fn next_id() -> u64 {
    use std::sync::atomic::{AtomicU64, Ordering};
    static COUNTER: AtomicU64 = AtomicU64::new(1);
    COUNTER.fetch_add(1, Ordering::Relaxed)
}

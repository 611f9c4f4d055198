use serde_json::{json, Value};
use tracebench_agent::{AgentConfig, AgentRuntime};

fn started_agent() -> (AgentRuntime, String) {
    let mut agent = AgentRuntime::new(AgentConfig::ephemeral());
    agent.start().expect("start agent");
    let base = agent.base_url().expect("running agent has a url");
    (agent, base)
}

async fn fetch_traces(client: &reqwest::Client, base: &str, token: &str) -> Vec<Value> {
    let resp = client
        .get(format!("{base}/session/traces?token={token}"))
        .send()
        .await
        .expect("get traces");
    assert_eq!(resp.status().as_u16(), 200);
    resp.json().await.expect("traces json")
}

#[tokio::test]
async fn health_reports_ok() {
    let (_agent, base) = started_agent();
    let body: Value = reqwest::get(format!("{base}/health"))
        .await
        .expect("health request")
        .json()
        .await
        .expect("health json");
    assert_eq!(body["status"], "ok");
    assert!(body["version"].is_string());
}

#[tokio::test]
async fn submitted_trace_is_returned_for_its_session_only() {
    let (_agent, base) = started_agent();
    let client = reqwest::Client::new();

    for token in ["tok1", "tok2"] {
        let resp = client
            .get(format!("{base}/session/start?token={token}"))
            .send()
            .await
            .expect("start session");
        assert_eq!(resp.status().as_u16(), 200);
    }

    let resp = client
        .post(format!("{base}/session/traces?token=tok1"))
        .json(&json!([{"span_id": 1, "service": "httpd"}]))
        .send()
        .await
        .expect("submit");
    assert_eq!(resp.status().as_u16(), 200);
    let ack: Value = resp.json().await.expect("ack json");
    assert_eq!(ack["accepted"], 1);
    assert_eq!(ack["total"], 1);

    let tok1 = fetch_traces(&client, &base, "tok1").await;
    assert_eq!(tok1, vec![json!([{"span_id": 1, "service": "httpd"}])]);
    assert!(fetch_traces(&client, &base, "tok2").await.is_empty());
}

#[tokio::test]
async fn restarting_session_does_not_clear_traces() {
    let (_agent, base) = started_agent();
    let client = reqwest::Client::new();

    let start = format!("{base}/session/start?token=again");
    client.get(&start).send().await.expect("first start");
    client
        .post(format!("{base}/session/traces?token=again"))
        .json(&json!([[{"span_id": 1}], [{"span_id": 2}]]))
        .send()
        .await
        .expect("submit batch");

    let ack: Value = client
        .get(&start)
        .send()
        .await
        .expect("second start")
        .json()
        .await
        .expect("ack");
    assert_eq!(ack["created"], false);
    assert_eq!(fetch_traces(&client, &base, "again").await.len(), 2);
}

#[tokio::test]
async fn unknown_session_reads_as_empty_array() {
    let (_agent, base) = started_agent();
    let client = reqwest::Client::new();
    assert!(fetch_traces(&client, &base, "nobody").await.is_empty());
}

#[tokio::test]
async fn missing_token_is_a_bad_request() {
    let (_agent, base) = started_agent();
    let resp = reqwest::get(format!("{base}/session/traces"))
        .await
        .expect("request");
    assert_eq!(resp.status().as_u16(), 400);
    let body: Value = resp.json().await.expect("error json");
    assert!(body["error"].as_str().unwrap_or_default().contains("token"));
}

#[tokio::test]
async fn malformed_payload_is_rejected() {
    let (_agent, base) = started_agent();
    let resp = reqwest::Client::new()
        .post(format!("{base}/session/traces?token=bad"))
        .json(&json!({"not": "a trace"}))
        .send()
        .await
        .expect("submit");
    assert_eq!(resp.status().as_u16(), 400);
}

#[tokio::test]
async fn legacy_routes_and_query_key_are_accepted() {
    let (_agent, base) = started_agent();
    let client = reqwest::Client::new();

    client
        .get(format!("{base}/test/session/start?test_session_token=old"))
        .send()
        .await
        .expect("legacy start");
    client
        .post(format!("{base}/test/session/traces?test_session_token=old"))
        .json(&json!([{"span_id": 9}]))
        .send()
        .await
        .expect("legacy submit");

    assert_eq!(fetch_traces(&client, &base, "old").await.len(), 1);
}

#[tokio::test]
async fn tracer_submissions_follow_latest_session() {
    let (_agent, base) = started_agent();
    let client = reqwest::Client::new();

    client
        .get(format!("{base}/session/start?token=first"))
        .send()
        .await
        .expect("start first");
    client
        .get(format!("{base}/session/start?token=second"))
        .send()
        .await
        .expect("start second");

    let resp = client
        .put(format!("{base}/v0.4/traces"))
        .json(&json!([[{"span_id": 5, "name": "httpd.request"}]]))
        .send()
        .await
        .expect("tracer put");
    assert_eq!(resp.status().as_u16(), 200);

    assert!(fetch_traces(&client, &base, "first").await.is_empty());
    assert_eq!(fetch_traces(&client, &base, "second").await.len(), 1);
}

#[tokio::test]
async fn tracer_session_header_wins_over_latest() {
    let (_agent, base) = started_agent();
    let client = reqwest::Client::new();

    client
        .get(format!("{base}/session/start?token=pinned"))
        .send()
        .await
        .expect("start pinned");
    client
        .get(format!("{base}/session/start?token=latest"))
        .send()
        .await
        .expect("start latest");

    client
        .post(format!("{base}/v0.4/traces"))
        .header("X-Datadog-Test-Session-Token", "pinned")
        .json(&json!([[{"span_id": 6}]]))
        .send()
        .await
        .expect("tracer post");

    assert_eq!(fetch_traces(&client, &base, "pinned").await.len(), 1);
    assert!(fetch_traces(&client, &base, "latest").await.is_empty());
}

#[tokio::test]
async fn tracer_msgpack_payload_is_decoded() {
    let (_agent, base) = started_agent();
    let client = reqwest::Client::new();

    client
        .get(format!("{base}/session/start?token=packed"))
        .send()
        .await
        .expect("start");

    let body = rmp_serde::to_vec_named(&json!([[{"span_id": 11, "service": "httpd"}]]))
        .expect("encode msgpack");
    let resp = client
        .put(format!("{base}/v0.4/traces"))
        .header("Content-Type", "application/msgpack")
        .body(body)
        .send()
        .await
        .expect("tracer msgpack put");
    assert_eq!(resp.status().as_u16(), 200);

    let traces = fetch_traces(&client, &base, "packed").await;
    assert_eq!(traces, vec![json!([{"span_id": 11, "service": "httpd"}])]);
}

#[tokio::test]
async fn tokens_are_kept_verbatim() {
    let (_agent, base) = started_agent();
    let client = reqwest::Client::new();

    let resp = client
        .post(format!("{base}/session/traces?token=%20tok1"))
        .json(&json!([{"span_id": 21}]))
        .send()
        .await
        .expect("submit under padded token");
    assert_eq!(resp.status().as_u16(), 200);

    assert!(fetch_traces(&client, &base, "tok1").await.is_empty());
    assert_eq!(fetch_traces(&client, &base, "%20tok1").await.len(), 1);
}

#[tokio::test]
async fn primary_query_key_wins_over_legacy_key() {
    let (_agent, base) = started_agent();
    let client = reqwest::Client::new();

    let resp = client
        .post(format!(
            "{base}/session/traces?token=current&test_session_token=legacy"
        ))
        .json(&json!([{"span_id": 22}]))
        .send()
        .await
        .expect("submit with both keys");
    assert_eq!(resp.status().as_u16(), 200);

    assert_eq!(fetch_traces(&client, &base, "current").await.len(), 1);
    assert!(fetch_traces(&client, &base, "legacy").await.is_empty());
}

#[tokio::test]
async fn session_msgpack_payload_is_decoded() {
    let (_agent, base) = started_agent();
    let client = reqwest::Client::new();

    let body = rmp_serde::to_vec_named(&json!([{"span_id": 23, "service": "httpd"}]))
        .expect("encode msgpack");
    let resp = client
        .post(format!("{base}/session/traces?token=packed-session"))
        .header("Content-Type", "application/msgpack")
        .body(body)
        .send()
        .await
        .expect("session msgpack post");
    assert_eq!(resp.status().as_u16(), 200);

    let traces = fetch_traces(&client, &base, "packed-session").await;
    assert_eq!(traces.len(), 1);
    assert_eq!(traces[0][0]["span_id"], 23);
}

//! Integration test: start the gateway on a free port against a mock GitHub, then drive the
//! webhook over HTTP. The server task is left running when each test ends.

use lib::config::{GitHubSettings, HtmlConverterKind, Settings};
use lib::gateway;
use lib::store::{decode_content, encode_content};
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const SECRET: &str = "hook-secret";

fn free_port() -> u16 {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind free port");
    listener.local_addr().expect("local_addr").port()
}

fn settings(port: u16, github: &MockServer, allowed: &[&str]) -> Settings {
    Settings {
        bind: "127.0.0.1".to_string(),
        port,
        webhook_token: SECRET.to_string(),
        github: GitHubSettings {
            owner: "me".to_string(),
            repo: "notes".to_string(),
            token: "pat".to_string(),
            default_branch: "main".to_string(),
            api_base: github.uri(),
            raw_base: github.uri(),
        },
        allowed_senders: allowed.iter().map(|s| s.to_string()).collect(),
        html_converter: HtmlConverterKind::Strip,
    }
}

/// Spawn the gateway and wait until /health answers. Returns the base URL.
async fn start_gateway(github: &MockServer, allowed: &[&str]) -> String {
    let port = free_port();
    let settings = settings(port, github, allowed);
    tokio::spawn(async move {
        let _ = gateway::run_gateway(settings).await;
    });

    let base = format!("http://127.0.0.1:{}", port);
    let client = reqwest::Client::new();
    for _ in 0..100 {
        if let Ok(resp) = client.get(format!("{}/health", base)).send().await {
            if resp.status().is_success() {
                return base;
            }
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    panic!("gateway on {} did not become healthy within 5s", base);
}

fn payload(subject: &str, body_plain: &str) -> serde_json::Value {
    serde_json::json!({
        "from": "Alice <alice@example.com>",
        "to": "notes@example.org",
        "subject": subject,
        "body_plain": body_plain,
        "body_html": "",
        "message_id": "<m1@mail.example.com>"
    })
}

async fn post_inbound(base: &str, token: Option<&str>, body: String) -> reqwest::Response {
    let mut req = reqwest::Client::new()
        .post(format!("{}/gmail/inbound", base))
        .header("Content-Type", "application/json")
        .body(body);
    if let Some(t) = token {
        req = req.header(gateway::WEBHOOK_TOKEN_HEADER, t);
    }
    req.send().await.expect("send inbound")
}

#[tokio::test]
async fn health_responds_ok() {
    let github = MockServer::start().await;
    let base = start_gateway(&github, &[]).await;
    let json: serde_json::Value = reqwest::get(format!("{}/health", base))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(json, serde_json::json!({"status": "ok"}));
}

#[tokio::test]
async fn missing_or_wrong_token_is_forbidden_without_touching_github() {
    let github = MockServer::start().await;
    let base = start_gateway(&github, &[]).await;

    let body = payload("a", "b").to_string();
    assert_eq!(post_inbound(&base, None, body.clone()).await.status(), 403);
    assert_eq!(post_inbound(&base, Some("wrong"), body).await.status(), 403);
    // token is checked before the body is parsed
    assert_eq!(post_inbound(&base, Some("wrong"), "{oops".into()).await.status(), 403);

    assert!(github.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn malformed_json_is_bad_request() {
    let github = MockServer::start().await;
    let base = start_gateway(&github, &[]).await;
    let resp = post_inbound(&base, Some(SECRET), "{not json".into()).await;
    assert_eq!(resp.status(), 400);
    let json: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(json["status"], "error");
}

#[tokio::test]
async fn disallowed_sender_is_forbidden() {
    let github = MockServer::start().await;
    let base = start_gateway(&github, &["someone@else.org"]).await;
    let resp = post_inbound(&base, Some(SECRET), payload("a", "b").to_string()).await;
    assert_eq!(resp.status(), 403);
    let json: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(json["detail"], "Sender not allowed: Alice <alice@example.com>");
    assert!(github.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn new_file_is_created() {
    let github = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/repos/me/notes/contents/docs/hello.md"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&github)
        .await;
    Mock::given(method("PUT"))
        .and(path("/repos/me/notes/contents/docs/hello.md"))
        .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({
            "commit": { "sha": "c0ffee" }
        })))
        .expect(1)
        .mount(&github)
        .await;

    let base = start_gateway(&github, &["example.com"]).await;
    let resp = post_inbound(&base, Some(SECRET), payload("docs/hello", "Hello\n\n").to_string()).await;
    assert_eq!(resp.status(), 200);
    let json: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(
        json,
        serde_json::json!({"status": "ok", "path": "docs/hello.md", "branch": "main", "commit": "c0ffee"})
    );

    let requests = github.received_requests().await.unwrap();
    let put = requests.iter().find(|r| r.method.as_str() == "PUT").unwrap();
    let body: serde_json::Value = serde_json::from_slice(&put.body).unwrap();
    assert!(body.get("sha").is_none());
    assert_eq!(body["branch"], "main");
    let text = decode_content(body["content"].as_str().unwrap());
    assert!(text.starts_with("Hello\n\n---\nReceived: "), "{text}");
    assert!(text.ends_with("\nFrom: Alice <alice@example.com>\n"), "{text}");
    let message = body["message"].as_str().unwrap();
    assert!(message.starts_with("PomeraHub: docs/hello.md @ "), "{message}");
    assert!(message.ends_with("\n\nMessage-Id: <m1@mail.example.com>"), "{message}");
}

#[tokio::test]
async fn append_uses_existing_text_and_sha_on_requested_branch() {
    let github = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/repos/me/notes/contents/journal.md"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "sha": "old-sha",
            "content": encode_content("Day 1\n"),
        })))
        .mount(&github)
        .await;
    Mock::given(method("PUT"))
        .and(path("/repos/me/notes/contents/journal.md"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "commit": { "sha": "c2" }
        })))
        .mount(&github)
        .await;

    let base = start_gateway(&github, &[]).await;
    let mut p = payload("[append] journal", "");
    p["body_html"] = serde_json::json!("<p>Day 2</p>");
    p["branch"] = serde_json::json!("inbox");
    let resp = post_inbound(&base, Some(SECRET), p.to_string()).await;
    assert_eq!(resp.status(), 200);
    let json: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(json["branch"], "inbox");

    let requests = github.received_requests().await.unwrap();
    let get = requests.iter().find(|r| r.method.as_str() == "GET").unwrap();
    assert_eq!(get.url.query(), Some("ref=inbox"));
    let put = requests.iter().find(|r| r.method.as_str() == "PUT").unwrap();
    let body: serde_json::Value = serde_json::from_slice(&put.body).unwrap();
    assert_eq!(body["sha"], "old-sha");
    assert_eq!(body["branch"], "inbox");
    let text = decode_content(body["content"].as_str().unwrap());
    assert!(text.starts_with("Day 1\n\nDay 2\n\n---\nReceived: "), "{text}");
    assert!(body["message"].as_str().unwrap().starts_with("PomeraHub(append): journal.md @ "));
}

#[tokio::test]
async fn stale_sha_conflict_is_passed_through() {
    let github = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "sha": "seen-sha",
            "content": encode_content("x"),
        })))
        .mount(&github)
        .await;
    Mock::given(method("PUT"))
        .respond_with(
            ResponseTemplate::new(409).set_body_string(r#"{"message":"a.md does not match seen-sha"}"#),
        )
        .expect(1)
        .mount(&github)
        .await;

    let base = start_gateway(&github, &[]).await;
    let resp = post_inbound(&base, Some(SECRET), payload("a", "mine").to_string()).await;
    assert_eq!(resp.status(), 409);
    let json: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(json["status"], "error");
    assert!(json["detail"].as_str().unwrap().contains("does not match seen-sha"));
}

#[tokio::test]
async fn read_failure_aborts_before_write() {
    let github = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&github)
        .await;
    Mock::given(method("PUT"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&github)
        .await;

    let base = start_gateway(&github, &[]).await;
    let resp = post_inbound(&base, Some(SECRET), payload("a", "b").to_string()).await;
    assert_eq!(resp.status(), 500);
    let json: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(json["detail"], "store returned 500: boom");
}

//! Integration tests for the built-in relay server

use std::sync::Arc;
use std::time::Duration;
use wetools_server::core::storage::MemoryKvStore;
use wetools_server::proxy::{RelayManager, ReqwestTransport};
use wetools_server::ProxyRouter;
use wiremock::matchers::{body_string, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn router() -> Arc<ProxyRouter> {
    Arc::new(ProxyRouter::new(
        Arc::new(MemoryKvStore::new()),
        Arc::new(ReqwestTransport::new(Duration::from_secs(5)).unwrap()),
    ))
}

fn client() -> reqwest::Client {
    reqwest::Client::builder().no_proxy().build().unwrap()
}

/// `?url=` form forwards method, headers and body
#[tokio::test]
async fn test_relay_forwards_query_target() {
    let upstream = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/convert"))
        .and(header("x-tool", "base64"))
        .and(body_string("hello"))
        .respond_with(
            ResponseTemplate::new(201)
                .insert_header("x-upstream", "yes")
                .set_body_string("converted"),
        )
        .expect(1)
        .mount(&upstream)
        .await;

    let relay = RelayManager::new(router());
    let status = relay.start(0).await.unwrap();
    assert!(status.running);

    let relay_url = relay
        .relay_url(&format!("{}/convert", upstream.uri()))
        .await
        .unwrap();
    let resp = client()
        .post(relay_url)
        .header("x-tool", "base64")
        .header("x-real-ip", "10.1.2.3")
        .body("hello")
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 201);
    assert_eq!(resp.headers()["x-upstream"], "yes");
    assert_eq!(resp.text().await.unwrap(), "converted");

    let received = upstream.received_requests().await.unwrap();
    assert!(received[0].headers.get("x-real-ip").is_none());

    relay.stop().await.unwrap();
}

/// Prefix form `/{target_url}` keeps the target's query string
#[tokio::test]
async fn test_relay_accepts_prefix_form() {
    let upstream = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/search"))
        .and(query_param("q", "rust"))
        .respond_with(ResponseTemplate::new(200).set_body_string("found"))
        .expect(1)
        .mount(&upstream)
        .await;

    let relay = RelayManager::new(router());
    let status = relay.start(0).await.unwrap();

    let resp = client()
        .get(format!("{}/{}/search?q=rust", status.base_url, upstream.uri()))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 200);
    assert_eq!(resp.text().await.unwrap(), "found");

    relay.stop().await.unwrap();
}

/// A `url=` parameter inside a prefix-form target belongs to the target
#[tokio::test]
async fn test_prefix_form_does_not_hijack_url_parameter() {
    let upstream = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/redirect"))
        .and(query_param("url", "http://other.example/"))
        .respond_with(ResponseTemplate::new(200).set_body_string("kept"))
        .expect(1)
        .mount(&upstream)
        .await;

    let relay = RelayManager::new(router());
    let status = relay.start(0).await.unwrap();

    let resp = client()
        .get(format!(
            "{}/{}/redirect?url=http%3A%2F%2Fother.example%2F",
            status.base_url,
            upstream.uri()
        ))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 200);
    assert_eq!(resp.text().await.unwrap(), "kept");

    relay.stop().await.unwrap();
}

/// Missing or invalid targets are rejected, unreachable upstream is a 502
#[tokio::test]
async fn test_relay_error_statuses() {
    let relay = RelayManager::new(router());
    let status = relay.start(0).await.unwrap();
    let client = client();

    let missing = client
        .get(format!("{}/proxy", status.base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(missing.status(), 400);

    let unsupported = client
        .get(format!("{}/proxy?url=ftp%3A%2F%2Fexample.com", status.base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(unsupported.status(), 400);

    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let closed = listener.local_addr().unwrap().port();
    drop(listener);

    let unreachable = client
        .get(format!(
            "{}/proxy?url=http%3A%2F%2F127.0.0.1%3A{}%2F",
            status.base_url, closed
        ))
        .send()
        .await
        .unwrap();
    assert_eq!(unreachable.status(), 502);

    relay.stop().await.unwrap();
}

/// start is idempotent and stop releases the port
#[tokio::test]
async fn test_relay_lifecycle() {
    let relay = RelayManager::new(router());
    assert!(!relay.status().await.running);
    assert!(relay.relay_url("http://example.com").await.is_err());

    let first = relay.start(0).await.unwrap();
    let second = relay.start(0).await.unwrap();
    assert_eq!(first.port, second.port);

    relay.stop().await.unwrap();
    assert!(!relay.status().await.running);
    relay.stop().await.unwrap();

    let restarted = relay.start(first.port).await.unwrap();
    assert_eq!(restarted.port, first.port);
    relay.stop().await.unwrap();
}

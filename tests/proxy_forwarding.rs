//! End-to-end forwarding through a running proxy.

use std::time::Duration;

use axum::http::StatusCode;
use rule_proxy::config::ProxyConfig;

mod common;

#[tokio::test]
async fn test_forwards_to_rewritten_path() {
    let backend = common::start_echo_backend().await;
    let proxy = common::start_proxy(vec![common::rule("a.com", "/api", backend, "/v2")]).await;

    let res = common::client()
        .get(format!("http://{}/api/users?x=1", proxy.addr))
        .header("host", "a.com")
        .send()
        .await
        .expect("Proxy unreachable");

    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.text().await.unwrap(), "/v2/users?x=1");

    proxy.shutdown.trigger();
}

#[tokio::test]
async fn test_empty_dest_path_strips_prefix() {
    let backend = common::start_echo_backend().await;
    let proxy = common::start_proxy(vec![common::rule("a.com", "/api", backend, "")]).await;

    let res = common::client()
        .get(format!("http://{}/api/users", proxy.addr))
        .header("host", "A.COM")
        .send()
        .await
        .unwrap();

    assert_eq!(res.text().await.unwrap(), "/users");
    proxy.shutdown.trigger();
}

#[tokio::test]
async fn test_unmatched_requests_get_404() {
    let backend = common::start_echo_backend().await;
    let proxy = common::start_proxy(vec![common::rule("a.com", "/api", backend, "/v2")]).await;
    let client = common::client();

    let res = client
        .get(format!("http://{}/other", proxy.addr))
        .header("host", "a.com")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    let res = client
        .get(format!("http://{}/apiary", proxy.addr))
        .header("host", "a.com")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    let res = client
        .get(format!("http://{}/api/users", proxy.addr))
        .header("host", "b.com")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    proxy.shutdown.trigger();
}

#[tokio::test]
async fn test_catch_all_passes_path_through() {
    let backend = common::start_echo_backend().await;
    let proxy = common::start_proxy(vec![
        common::rule("a.com", "/api", backend, "/v2"),
        common::rule("a.com", "", backend, "/ignored"),
    ])
    .await;

    let res = common::client()
        .get(format!("http://{}/static/app.js?v=3", proxy.addr))
        .header("host", "a.com")
        .send()
        .await
        .unwrap();

    assert_eq!(res.text().await.unwrap(), "/static/app.js?v=3");
    proxy.shutdown.trigger();
}

#[tokio::test]
async fn test_encoded_paths_match_decoded() {
    let backend = common::start_echo_backend().await;
    let mut cleaning = common::rule("a.com", "/api", backend, "/v2");
    cleaning.clean_request_path = true;
    let proxy = common::start_proxy(vec![cleaning]).await;
    let client = common::client();

    let res = client
        .get(format!("http://{}/%61pi/a%20b/%C3%BCber", proxy.addr))
        .header("host", "a.com")
        .send()
        .await
        .unwrap();
    assert_eq!(res.text().await.unwrap(), "/v2/a%20b/%C3%BCber");

    // An encoded slash hides the traversal from client-side normalization.
    let res = client
        .get(format!("http://{}/api/..%2Fadmin", proxy.addr))
        .header("host", "a.com")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    proxy.shutdown.trigger();
}

#[tokio::test]
async fn test_unreachable_destination_is_bad_gateway() {
    // Bind then drop to get a port nothing listens on.
    let closed = {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        listener.local_addr().unwrap()
    };
    let proxy = common::start_proxy(vec![common::rule("a.com", "/", closed, "")]).await;

    let res = common::client()
        .get(format!("http://{}/x", proxy.addr))
        .header("host", "a.com")
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::BAD_GATEWAY);
    proxy.shutdown.trigger();
}

#[tokio::test]
async fn test_response_carries_request_id() {
    let backend = common::start_echo_backend().await;
    let proxy = common::start_proxy(vec![common::rule("a.com", "/", backend, "")]).await;
    let client = common::client();

    let res = client
        .get(format!("http://{}/", proxy.addr))
        .header("host", "a.com")
        .send()
        .await
        .unwrap();
    assert!(res.headers().contains_key("x-request-id"));

    let res = client
        .get(format!("http://{}/", proxy.addr))
        .header("host", "a.com")
        .header("x-request-id", "trace-me")
        .send()
        .await
        .unwrap();
    assert_eq!(res.headers()["x-request-id"], "trace-me");

    proxy.shutdown.trigger();
}

#[tokio::test]
async fn test_reload_replaces_rules() {
    let backend = common::start_echo_backend().await;
    let proxy = common::start_proxy(vec![common::rule("a.com", "/api", backend, "/v1")]).await;
    let client = common::client();

    let url = format!("http://{}/api/users", proxy.addr);
    let res = client.get(&url).header("host", "a.com").send().await.unwrap();
    assert_eq!(res.text().await.unwrap(), "/v1/users");

    let mut next = ProxyConfig::default();
    next.rules.push(common::rule("a.com", "/api", backend, "/v2"));
    proxy.updates.send(next).unwrap();

    let mut body = String::new();
    for _ in 0..50 {
        tokio::time::sleep(Duration::from_millis(20)).await;
        let res = client.get(&url).header("host", "a.com").send().await.unwrap();
        body = res.text().await.unwrap();
        if body == "/v2/users" {
            break;
        }
    }
    assert_eq!(body, "/v2/users");

    proxy.shutdown.trigger();
}

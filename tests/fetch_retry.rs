//! Retry behaviour of the fetch client against a live mock upstream.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use pokedex_edge::resilience::RetryPolicy;
use pokedex_edge::upstream::{FetchClient, FetchError, RequestOptions};

mod common;

fn client(max_attempts: u32, base_ms: u64) -> FetchClient {
    let http = reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap();
    FetchClient::with_client(
        http,
        RetryPolicy {
            max_attempts,
            base_delay: Duration::from_millis(base_ms),
            max_delay: Duration::from_millis(1000),
            jitter: false,
        },
    )
}

#[tokio::test]
async fn test_retries_rate_limit_until_success() {
    let hits: Arc<Mutex<Vec<Instant>>> = Arc::new(Mutex::new(Vec::new()));
    let h = hits.clone();
    let addr = common::start_programmable_backend(move |req| {
        let h = h.clone();
        async move {
            let mut hits = h.lock().unwrap();
            hits.push(req.received_at);
            if hits.len() < 3 {
                (429, r#"{"detail":"Too Many Requests"}"#.into())
            } else {
                (200, r#"{"name":"pikachu"}"#.into())
            }
        }
    })
    .await;

    let res = client(3, 50)
        .fetch_with_retry(&format!("http://{}/api/v2/pokemon/25", addr), RequestOptions::get())
        .await
        .expect("upstream reachable");

    assert_eq!(res.status(), 200);
    let hits = hits.lock().unwrap().clone();
    assert_eq!(hits.len(), 3, "exactly three attempts");

    let first_gap = hits[1] - hits[0];
    let second_gap = hits[2] - hits[1];
    assert!(first_gap >= Duration::from_millis(50));
    assert!(second_gap >= first_gap, "delays must not shrink: {:?} then {:?}", first_gap, second_gap);
}

#[tokio::test]
async fn test_not_found_is_not_retried() {
    let calls = Arc::new(AtomicU32::new(0));
    let c = calls.clone();
    let addr = common::start_programmable_backend(move |_| {
        let c = c.clone();
        async move {
            c.fetch_add(1, Ordering::SeqCst);
            (404, "Not Found".into())
        }
    })
    .await;

    let res = client(3, 10)
        .fetch_with_retry(&format!("http://{}/api/v2/pokemon/missingno", addr), RequestOptions::get())
        .await
        .unwrap();

    assert_eq!(res.status(), 404);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_exhausted_retries_return_last_response() {
    let calls = Arc::new(AtomicU32::new(0));
    let c = calls.clone();
    let addr = common::start_programmable_backend(move |_| {
        let c = c.clone();
        async move {
            let n = c.fetch_add(1, Ordering::SeqCst) + 1;
            (503, format!("attempt {}", n))
        }
    })
    .await;

    let res = client(3, 10)
        .fetch_with_retry(&format!("http://{}/", addr), RequestOptions::get())
        .await
        .unwrap();

    assert_eq!(res.status(), 503);
    assert_eq!(res.text().await.unwrap(), "attempt 3");
    assert_eq!(calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_network_error_after_retries() {
    let addr = common::closed_port().await;
    let start = Instant::now();

    let err = client(3, 20)
        .fetch_with_retry(&format!("http://{}/", addr), RequestOptions::get())
        .await
        .unwrap_err();

    assert!(matches!(err, FetchError::Network(_)), "{:?}", err);
    assert!(err.is_connectivity());
    // Two backoff sleeps: 20ms + 40ms.
    assert!(start.elapsed() >= Duration::from_millis(60));
}

#[tokio::test]
async fn test_upstream_timeout_is_network_error() {
    let calls = Arc::new(AtomicU32::new(0));
    let c = calls.clone();
    let addr = common::start_programmable_backend(move |_| {
        let c = c.clone();
        async move {
            c.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(500)).await;
            (200, "{}".into())
        }
    })
    .await;

    let http = reqwest::Client::builder()
        .timeout(Duration::from_millis(50))
        .no_proxy()
        .build()
        .unwrap();
    let client = FetchClient::with_client(
        http,
        RetryPolicy {
            max_attempts: 2,
            base_delay: Duration::from_millis(10),
            max_delay: Duration::from_millis(10),
            jitter: false,
        },
    );

    let err = client
        .get_json::<serde_json::Value>(&format!("http://{}/slow", addr))
        .await
        .unwrap_err();

    assert!(matches!(err, FetchError::Network(_)), "{:?}", err);
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_post_body_is_resent_on_retry() {
    let bodies: Arc<Mutex<Vec<(String, String)>>> = Arc::new(Mutex::new(Vec::new()));
    let b = bodies.clone();
    let addr = common::start_programmable_backend(move |req| {
        let b = b.clone();
        async move {
            let mut bodies = b.lock().unwrap();
            bodies.push((req.method.clone(), req.body.clone()));
            if bodies.len() == 1 {
                (500, "boom".into())
            } else {
                (200, r#"{"data":{"ok":true}}"#.into())
            }
        }
    })
    .await;

    let value: serde_json::Value = client(3, 10)
        .post_json(&format!("http://{}/graphql", addr), &serde_json::json!({"query": "{ ok }"}))
        .await
        .unwrap();

    assert_eq!(value["data"]["ok"], true);
    let bodies = bodies.lock().unwrap().clone();
    assert_eq!(bodies.len(), 2);
    assert_eq!(bodies[0], bodies[1]);
    assert_eq!(bodies[0].0, "POST");
    assert_eq!(bodies[0].1, r#"{"query":"{ ok }"}"#);
}

#[tokio::test]
async fn test_get_json_maps_rate_limit_to_error() {
    let addr = common::start_mock_backend(429, r#"{"detail":"Too Many Requests"}"#).await;

    let err = client(2, 10)
        .get_json::<serde_json::Value>(&format!("http://{}/api/v2/pokemon/1", addr))
        .await
        .unwrap_err();

    assert!(err.is_rate_limited(), "{:?}", err);
    assert!(matches!(err, FetchError::Status { status: 429, .. }));
}

#[tokio::test]
async fn test_get_json_decode_error() {
    let addr = common::start_mock_backend(200, "not json").await;

    let err = client(1, 10)
        .get_json::<serde_json::Value>(&format!("http://{}/", addr))
        .await
        .unwrap_err();

    assert!(matches!(err, FetchError::Decode(_)), "{:?}", err);
}

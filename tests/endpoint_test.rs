//! The pixel endpoint always answers with the same image.

mod common;

use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use common::{FailingSink, PanicStep, RecordingSink, settle};
use pixel_beacon::pipeline::{Chain, EventPublisher, QueryStringDecoder};
use pixel_beacon::server::{AppState, PIXEL_CONTENT_TYPE, PIXEL_GIF, router};
use serde_json::json;
use tower::ServiceExt;

async fn get(chain: Chain, uri: &str) -> (StatusCode, Option<String>, Vec<u8>) {
    let response = router(AppState::new(chain))
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();

    let status = response.status();
    let content_type = response
        .headers()
        .get(header::CONTENT_TYPE)
        .map(|v| v.to_str().unwrap().to_string());
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap()
        .to_vec();
    (status, content_type, body)
}

fn assert_pixel((status, content_type, body): (StatusCode, Option<String>, Vec<u8>)) {
    assert_eq!(status, StatusCode::OK);
    assert_eq!(content_type.as_deref(), Some(PIXEL_CONTENT_TYPE));
    assert_eq!(body, PIXEL_GIF);
}

#[test]
fn pixel_is_a_43_byte_gif() {
    assert_eq!(PIXEL_GIF.len(), 43);
    assert!(PIXEL_GIF.starts_with(b"GIF89a"));
    assert_eq!(PIXEL_GIF.last(), Some(&0x3b));
}

#[tokio::test]
async fn well_formed_request_returns_pixel_and_publishes() {
    let sink = RecordingSink::new();

    assert_pixel(get(Chain::standard(sink.clone()), "/pixel?e=open&cid=c-17").await);

    sink.wait_for(1).await;
    assert_eq!(sink.events(), vec![json!({"e": "open", "cid": "c-17"})]);
}

#[tokio::test]
async fn missing_query_returns_pixel() {
    let sink = RecordingSink::new();

    assert_pixel(get(Chain::standard(sink.clone()), "/pixel").await);

    settle().await;
    assert_eq!(sink.count(), 0);
}

#[tokio::test]
async fn empty_query_returns_pixel() {
    let sink = RecordingSink::new();

    assert_pixel(get(Chain::standard(sink.clone()), "/pixel?").await);

    settle().await;
    assert_eq!(sink.count(), 0);
}

#[tokio::test]
async fn malformed_query_returns_pixel() {
    let sink = RecordingSink::new();

    assert_pixel(get(Chain::standard(sink.clone()), "/pixel?xyz&&=1&%zz").await);

    settle().await;
    assert_eq!(sink.count(), 0);
}

#[tokio::test]
async fn unavailable_sink_still_returns_pixel() {
    let sink = FailingSink::new();

    assert_pixel(get(Chain::standard(sink.clone()), "/pixel?a=1").await);

    sink.wait_for(1).await;
}

#[tokio::test]
async fn faulting_step_still_returns_pixel() {
    let sink = RecordingSink::new();
    let chain = Chain::builder()
        .step(QueryStringDecoder)
        .step(PanicStep)
        .step(EventPublisher::new(sink.clone()))
        .build();

    assert_pixel(get(chain, "/pixel?a=1").await);

    sink.wait_for(1).await;
    assert_eq!(sink.events()[0], json!({"a": "1", "half": "done"}));
}

#[tokio::test]
async fn pixel_is_not_cacheable() {
    let response = router(AppState::new(Chain::default()))
        .oneshot(Request::builder().uri("/pixel?a=1").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(
        response.headers().get(header::CACHE_CONTROL).unwrap(),
        "no-cache, no-store, must-revalidate"
    );
}

#[tokio::test]
async fn health_check_answers_ok() {
    let response = router(AppState::new(Chain::default()))
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    assert_eq!(&body[..], b"ok");
}

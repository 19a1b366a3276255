use super::handler;
use crate::entities::ResponsePayload;
use lambda_runtime::{Context, LambdaEvent};
use serde_json::{json, Value};

fn invoke(payload: Value) -> ResponsePayload {
    // lambda_runtime hands the handler the payload as parsed json
    let payload: Value = serde_json::from_str(&payload.to_string()).unwrap();
    tokio_test::block_on(handler(LambdaEvent::new(payload, Context::default()))).unwrap()
}

fn assert_fixed_response(response: &ResponsePayload) {
    assert_eq!(response.status_code, 200);
    assert_eq!(response.headers.get("ce-type").unwrap(), "com.example.fn");
    assert_eq!(
        response.headers.get("ce-source").unwrap(),
        "https://example.com/fn"
    );
    let body: Value = serde_json::from_str(&response.body).unwrap();
    assert_eq!(body, json!({ "message": "Howdy!" }));
}

#[test]
fn handler_test_end_to_end() {
    let response = invoke(json!({
        "request": {
            "method": "GET",
            "path": format!("/greet/{}", rand::random::<u32>()),
        }
    }));
    assert_fixed_response(&response);
}

#[test]
fn handler_test_any_request_shape() {
    let payloads = vec![
        json!({ "request": "x" }),
        json!({ "request": "GET /" }),
        json!({ "request": {} }),
        json!({ "request": { "url": "/" } }),
        json!({ "request": null }),
        json!({ "request": [1, 2, 3] }),
        json!({ "request": { "method": 7, "path": false, "body": { "k": 1 } } }),
        json!({ "request": { "headers": { "x-count": 3, "x-list": [1] }, "query": "a=b" } }),
        json!({ "request": { "headers": { "bad header": "x", "ce-specversion": "1.0" } } }),
        json!({}),
        json!("just a string"),
        json!(rand::random::<u32>()),
    ];
    for payload in payloads {
        assert_fixed_response(&invoke(payload));
    }
}

#[test]
fn handler_test_malformed_cloud_event() {
    let payloads = vec![
        json!({ "request": {}, "cloud_event": { "id": "x" } }),
        json!({ "request": {}, "cloud_event": "not an event" }),
        json!({
            "request": {},
            "cloud_event": { "specversion": "0.3", "id": "1", "source": "/a", "type": "b" }
        }),
    ];
    for payload in payloads {
        assert_fixed_response(&invoke(payload));
    }
}

#[test]
fn handler_test_runtime_payload_shape() {
    let response = invoke(json!({
        "request": { "method": "POST", "path": "/", "body": "anything" },
        "cloud_event": {
            "specversion": "1.0",
            "id": "upstream-7",
            "source": "/upstream",
            "type": "com.example.ping",
            "time": "2024-01-01T00:00:00Z"
        }
    }));
    assert_fixed_response(&response);
    let wire = serde_json::to_value(&response).unwrap();
    assert_eq!(wire["statusCode"], json!(200));
    assert_eq!(wire["headers"]["ce-type"], json!("com.example.fn"));
    assert!(wire["body"].is_string());
}

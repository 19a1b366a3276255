use super::{from_json_value, from_structured, to_structured};
use crate::encoding::EncodingError;
use crate::entities::CloudEvent;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use time::macros::datetime;

fn sample_event() -> CloudEvent {
    CloudEvent {
        specversion: String::from("1.0"),
        id: format!("id{}", rand::random::<u32>()),
        source: String::from("https://example.com/fn"),
        event_type: String::from("com.example.fn"),
        datacontenttype: Some(String::from("application/json")),
        dataschema: None,
        subject: None,
        time: Some(datetime!(2023-05-17 08:30:00 UTC)),
        data: Some(json!({ "message": "Howdy!" })),
        extensions: BTreeMap::new(),
    }
}

#[test]
fn to_structured_test_happy_path() {
    let event = sample_event();
    let (headers, body) = to_structured(&event).unwrap();
    assert_eq!(headers.len(), 1);
    assert_eq!(
        headers.get("content-type").unwrap(),
        "application/cloudevents+json"
    );
    let document: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(document["specversion"], json!("1.0"));
    assert_eq!(document["id"], json!(event.id));
    assert_eq!(document["type"], json!("com.example.fn"));
    assert_eq!(document["source"], json!("https://example.com/fn"));
    assert_eq!(document["time"], json!("2023-05-17T08:30:00Z"));
    assert_eq!(document["data"], json!({ "message": "Howdy!" }));
    assert!(document.get("subject").is_none());
}

#[test]
fn from_structured_test_reconstitutes_encoded_event() {
    let mut event = sample_event();
    event.subject = Some("greeting".to_string());
    event
        .extensions
        .insert("tenant".to_string(), json!("acme"));
    let (_headers, body) = to_structured(&event).unwrap();
    let output = from_structured(&body).unwrap();
    assert_eq!(output, event);
}

#[test]
fn from_structured_test_missing_id() {
    let body = br#"{"specversion": "1.0", "source": "/a", "type": "b"}"#;
    let output = from_structured(body);
    assert!(matches!(
        output,
        Err(EncodingError::DataDeserializationError(_))
    ));
}

#[test]
fn from_structured_test_unsupported_spec_version() {
    let body = br#"{"specversion": "0.3", "id": "1", "source": "/a", "type": "b"}"#;
    let output = from_structured(body);
    assert!(matches!(output, Err(EncodingError::UnsupportedSpecVersion(_))));
}

#[test]
fn from_structured_test_base64_data_rejected() {
    let body =
        br#"{"specversion": "1.0", "id": "1", "source": "/a", "type": "b", "data_base64": "SGk="}"#;
    let output = from_structured(body);
    assert!(matches!(output, Err(EncodingError::UnsupportedEncoding(_))));
}

#[test]
fn from_json_value_test_runtime_supplied_event() {
    let event = sample_event();
    let document = serde_json::to_value(&event).unwrap();
    assert_eq!(from_json_value(document).unwrap(), event);
    let output = from_json_value(json!({ "id": "x" }));
    assert!(matches!(
        output,
        Err(EncodingError::DataDeserializationError(_))
    ));
}

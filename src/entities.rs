use crate::encoding::EncodingError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use time::OffsetDateTime;

pub const SPEC_VERSION: &str = "1.0";

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct CloudEvent {
    pub specversion: String,
    pub id: String,
    pub source: String,
    #[serde(rename = "type")]
    pub event_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub datacontenttype: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dataschema: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "rfc3339_option")]
    pub time: Option<OffsetDateTime>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(flatten)]
    pub extensions: BTreeMap<String, Value>,
}

/// Attribute set an event is built from. `id` and `time` are stamped at
/// construction time.
#[derive(Debug, Clone, PartialEq)]
pub struct EventAttributes {
    pub event_type: String,
    pub source: String,
    pub subject: Option<String>,
    pub dataschema: Option<String>,
    pub datacontenttype: Option<String>,
    pub extensions: BTreeMap<String, Value>,
}

impl EventAttributes {
    pub fn new(event_type: &str, source: &str) -> EventAttributes {
        EventAttributes {
            event_type: event_type.to_string(),
            source: source.to_string(),
            subject: None,
            dataschema: None,
            datacontenttype: None,
            extensions: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct InboundRequest {
    pub method: String,
    pub path: String,
    pub headers: BTreeMap<String, String>,
    pub query: BTreeMap<String, String>,
    pub body: Option<String>,
}

impl InboundRequest {
    /// Reads whatever the runtime put under `request`. Missing or oddly typed
    /// fields fall back to empty values; nothing here fails.
    pub fn from_payload(payload: &Value) -> InboundRequest {
        InboundRequest {
            method: _text_field(payload, "method"),
            path: _text_field(payload, "path"),
            headers: _scalar_map(payload.get("headers")),
            query: _scalar_map(payload.get("query")),
            body: match payload.get("body") {
                None | Some(Value::Null) => None,
                Some(Value::String(text)) => Some(text.to_string()),
                Some(other) => Some(other.to_string()),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct InvocationContext {
    pub request: InboundRequest,
    pub cloud_event: Option<CloudEvent>,
}

fn _text_field(payload: &Value, name: &str) -> String {
    payload
        .get(name)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

fn _scalar_map(maybe_map: Option<&Value>) -> BTreeMap<String, String> {
    let mut map = BTreeMap::new();
    if let Some(Value::Object(entries)) = maybe_map {
        for (k, v) in entries.iter() {
            match v {
                Value::String(text) => {
                    map.insert(k.to_string(), text.to_string());
                }
                Value::Number(_) | Value::Bool(_) => {
                    map.insert(k.to_string(), v.to_string());
                }
                _ => {}
            }
        }
    }
    map
}

#[derive(Debug, Clone, PartialEq)]
pub struct EncodedResponse {
    pub body: Vec<u8>,
    pub status_code: u16,
    pub headers: BTreeMap<String, String>,
}

/// What the function hands back to the runtime.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ResponsePayload {
    pub status_code: u16,
    pub headers: BTreeMap<String, String>,
    pub body: String,
}

impl EncodedResponse {
    pub fn into_http_response(self) -> Result<http::Response<Vec<u8>>, EncodingError> {
        let mut response_builder = http::Response::builder().status(self.status_code);
        for (k, v) in self.headers.iter() {
            response_builder = response_builder.header::<&String, &String>(k, v);
        }
        response_builder.body(self.body).map_err(|e| {
            EncodingError::ResponseBuildingError(format!("Failed to build response.\n{:?}", e))
        })
    }
}

impl TryFrom<EncodedResponse> for ResponsePayload {
    type Error = EncodingError;

    fn try_from(response: EncodedResponse) -> Result<Self, Self::Error> {
        let body = String::from_utf8(response.body).map_err(|e| {
            EncodingError::BodyNotUtf8(format!("Response body is not utf-8:\n{:?}", e))
        })?;
        Ok(ResponsePayload {
            status_code: response.status_code,
            headers: response.headers,
            body,
        })
    }
}

pub mod rfc3339_option {
    use serde::{de, Deserialize, Deserializer, Serializer};
    use time::format_description::well_known::Rfc3339;
    use time::OffsetDateTime;

    pub fn serialize<S: Serializer>(
        value: &Option<OffsetDateTime>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(date_time) => {
                let formatted = date_time
                    .format(&Rfc3339)
                    .map_err(serde::ser::Error::custom)?;
                serializer.serialize_some(&formatted)
            }
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<OffsetDateTime>, D::Error> {
        match Option::<String>::deserialize(deserializer)? {
            Some(dt_str) => OffsetDateTime::parse(&dt_str, &Rfc3339)
                .map(Some)
                .map_err(de::Error::custom),
            None => Ok(None),
        }
    }
}


use super::{
    check_spec_version, is_json_content_type, percent_decode, percent_encode, EncodingError,
    Headers, CE_DATASCHEMA_HEADER, CE_HEADER_PREFIX, CE_ID_HEADER, CE_SOURCE_HEADER,
    CE_SPECVERSION_HEADER, CE_SUBJECT_HEADER, CE_TIME_HEADER, CE_TYPE_HEADER,
    CONTENT_TYPE_HEADER,
};
use crate::entities::CloudEvent;
use http::header::{HeaderMap, CONTENT_TYPE};
use serde_json::Value;
use std::collections::BTreeMap;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

pub fn to_binary(event: &CloudEvent) -> Result<(Headers, Vec<u8>), EncodingError> {
    let mut headers = Headers::new();
    _put(&mut headers, CE_SPECVERSION_HEADER, &event.specversion);
    _put(&mut headers, CE_ID_HEADER, &event.id);
    _put(&mut headers, CE_SOURCE_HEADER, &event.source);
    _put(&mut headers, CE_TYPE_HEADER, &event.event_type);
    if let Some(subject) = &event.subject {
        _put(&mut headers, CE_SUBJECT_HEADER, subject);
    }
    if let Some(dataschema) = &event.dataschema {
        _put(&mut headers, CE_DATASCHEMA_HEADER, dataschema);
    }
    if let Some(date_time) = &event.time {
        let formatted = date_time.format(&Rfc3339).map_err(|e| {
            EncodingError::InvalidTime(format!("Failed to format event time:\n{:?}", e))
        })?;
        _put(&mut headers, CE_TIME_HEADER, &formatted);
    }
    for (name, value) in event.extensions.iter() {
        let rendered = match value {
            Value::String(s) => s.to_string(),
            other => other.to_string(),
        };
        _put(&mut headers, &format!("{}{}", CE_HEADER_PREFIX, name), &rendered);
    }
    if let Some(content_type) = &event.datacontenttype {
        _put(&mut headers, CONTENT_TYPE_HEADER, content_type);
    }
    let body = _encode_data(event)?;
    Ok((headers, body))
}

pub fn from_binary(headers: &HeaderMap, body: &[u8]) -> Result<CloudEvent, EncodingError> {
    let mut attributes: BTreeMap<String, String> = BTreeMap::new();
    for (name, value) in headers.iter() {
        if let Some(attribute) = name.as_str().strip_prefix(CE_HEADER_PREFIX) {
            let raw = value.to_str().map_err(|e| {
                EncodingError::InvalidHeader(format!(
                    "Header {} is not visible ascii:\n{:?}",
                    name, e
                ))
            })?;
            attributes.insert(attribute.to_string(), percent_decode(raw)?);
        }
    }
    let specversion = _take_required(&mut attributes, "specversion")?;
    check_spec_version(&specversion)?;
    let id = _take_required(&mut attributes, "id")?;
    let source = _take_required(&mut attributes, "source")?;
    let event_type = _take_required(&mut attributes, "type")?;
    let time = match attributes.remove("time") {
        Some(dt_str) => Some(OffsetDateTime::parse(&dt_str, &Rfc3339).map_err(|e| {
            EncodingError::InvalidTime(format!("Failed to parse ce-time {}:\n{:?}", dt_str, e))
        })?),
        None => None,
    };
    let datacontenttype = match headers.get(CONTENT_TYPE) {
        Some(value) => Some(
            value
                .to_str()
                .map_err(|e| {
                    EncodingError::InvalidHeader(format!(
                        "Content-type is not visible ascii:\n{:?}",
                        e
                    ))
                })?
                .to_string(),
        ),
        None => None,
    };
    let data = _decode_data(datacontenttype.as_deref(), body)?;
    Ok(CloudEvent {
        specversion,
        id,
        source,
        event_type,
        datacontenttype,
        dataschema: attributes.remove("dataschema"),
        subject: attributes.remove("subject"),
        time,
        data,
        extensions: attributes
            .into_iter()
            .map(|(name, value)| (name, Value::String(value)))
            .collect(),
    })
}

fn _put(headers: &mut Headers, name: &str, value: &str) {
    headers.insert(name.to_string(), percent_encode(value));
}

fn _take_required(
    attributes: &mut BTreeMap<String, String>,
    name: &str,
) -> Result<String, EncodingError> {
    attributes.remove(name).ok_or_else(|| {
        EncodingError::MissingAttribute(format!("Required header ce-{} not found.", name))
    })
}

fn _encode_data(event: &CloudEvent) -> Result<Vec<u8>, EncodingError> {
    let is_json = event
        .datacontenttype
        .as_deref()
        .map_or(true, is_json_content_type);
    match &event.data {
        None => Ok(vec![]),
        // non-json payloads travel as their raw text
        Some(Value::String(text)) if !is_json => Ok(text.as_bytes().to_vec()),
        Some(data) => serde_json::to_vec(data).map_err(|e| {
            EncodingError::DataSerializationError(format!(
                "Failed to serialize event data:\n{:?}",
                e
            ))
        }),
    }
}

fn _decode_data(content_type: Option<&str>, body: &[u8]) -> Result<Option<Value>, EncodingError> {
    if body.is_empty() {
        return Ok(None);
    }
    if content_type.map_or(true, is_json_content_type) {
        serde_json::from_slice::<Value>(body).map(Some).map_err(|e| {
            EncodingError::DataDeserializationError(format!(
                "Failed to deserialize json event data:\n{:?}",
                e
            ))
        })
    } else {
        let text = std::str::from_utf8(body).map_err(|e| {
            EncodingError::BodyNotUtf8(format!("Event data is not utf-8 text:\n{:?}", e))
        })?;
        Ok(Some(Value::String(text.to_string())))
    }
}

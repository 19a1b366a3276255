#[cfg(test)]
mod test_structured;

use super::{check_spec_version, EncodingError, Headers, CE_JSON_CONTENT_TYPE, CONTENT_TYPE_HEADER};
use crate::entities::CloudEvent;
use serde_json::Value;

pub fn to_structured(event: &CloudEvent) -> Result<(Headers, Vec<u8>), EncodingError> {
    let body = serde_json::to_vec(event).map_err(|e| {
        EncodingError::DataSerializationError(format!("Failed to serialize event:\n{:?}", e))
    })?;
    let mut headers = Headers::new();
    headers.insert(
        CONTENT_TYPE_HEADER.to_string(),
        CE_JSON_CONTENT_TYPE.to_string(),
    );
    Ok((headers, body))
}

pub fn from_structured(body: &[u8]) -> Result<CloudEvent, EncodingError> {
    let document = serde_json::from_slice::<Value>(body).map_err(|e| {
        EncodingError::DataDeserializationError(format!(
            "Structured event body is not json:\n{:?}",
            e
        ))
    })?;
    from_json_value(document)
}

pub fn from_json_value(document: Value) -> Result<CloudEvent, EncodingError> {
    let event = serde_json::from_value::<CloudEvent>(document).map_err(|e| {
        EncodingError::DataDeserializationError(format!(
            "Failed to deserialize structured event:\n{:?}",
            e
        ))
    })?;
    check_spec_version(&event.specversion)?;
    if event.extensions.contains_key("data_base64") {
        return Err(EncodingError::UnsupportedEncoding(String::from(
            "Events carrying data_base64 are not supported.",
        )));
    }
    Ok(event)
}

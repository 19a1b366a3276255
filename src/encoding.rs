mod binary;
mod structured;

pub use binary::{from_binary, to_binary};
pub use structured::{from_json_value, from_structured, to_structured};

use crate::entities::{CloudEvent, SPEC_VERSION};
use http::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, CONTROLS};
use std::collections::BTreeMap;

pub const CE_HEADER_PREFIX: &str = "ce-";
pub const CE_ID_HEADER: &str = "ce-id";
pub const CE_TYPE_HEADER: &str = "ce-type";
pub const CE_SOURCE_HEADER: &str = "ce-source";
pub const CE_SPECVERSION_HEADER: &str = "ce-specversion";
pub const CE_SUBJECT_HEADER: &str = "ce-subject";
pub const CE_DATASCHEMA_HEADER: &str = "ce-dataschema";
pub const CE_TIME_HEADER: &str = "ce-time";
pub const CONTENT_TYPE_HEADER: &str = "content-type";

pub const JSON_CONTENT_TYPE: &str = "application/json";
pub const CE_JSON_CONTENT_TYPE: &str = "application/cloudevents+json";
pub const CE_BATCH_JSON_CONTENT_TYPE: &str = "application/cloudevents-batch+json";

pub type Headers = BTreeMap<String, String>;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Encoding {
    Binary,
    Structured,
    Batch,
}

#[derive(Debug)]
pub enum EncodingError {
    DataSerializationError(String),
    DataDeserializationError(String),
    MissingAttribute(String),
    UnsupportedSpecVersion(String),
    InvalidTime(String),
    InvalidHeader(String),
    UnsupportedEncoding(String),
    BodyNotUtf8(String),
    ResponseBuildingError(String),
}

pub fn encode(event: &CloudEvent, encoding: Encoding) -> Result<(Headers, Vec<u8>), EncodingError> {
    match encoding {
        Encoding::Binary => to_binary(event),
        Encoding::Structured => to_structured(event),
        Encoding::Batch => Err(EncodingError::UnsupportedEncoding(String::from(
            "Batch mode carries a list of events; cannot encode a single event as a batch.",
        ))),
    }
}

pub fn detect_encoding(headers: &HeaderMap) -> Option<Encoding> {
    let content_type = headers
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.trim().to_ascii_lowercase());
    match content_type {
        Some(ct) if ct.starts_with(CE_BATCH_JSON_CONTENT_TYPE) => Some(Encoding::Batch),
        Some(ct) if ct.starts_with(CE_JSON_CONTENT_TYPE) => Some(Encoding::Structured),
        _ if headers.contains_key(CE_SPECVERSION_HEADER) => Some(Encoding::Binary),
        _ => None,
    }
}

pub fn header_map(headers: &Headers) -> Result<HeaderMap, EncodingError> {
    let mut header_map = HeaderMap::new();
    for (k, v) in headers.iter() {
        let name = HeaderName::from_bytes(k.as_bytes()).map_err(|e| {
            EncodingError::InvalidHeader(format!("Invalid header name {}:\n{:?}", k, e))
        })?;
        let value = HeaderValue::from_str(v).map_err(|e| {
            EncodingError::InvalidHeader(format!("Invalid value for header {}:\n{:?}", k, e))
        })?;
        header_map.append(name, value);
    }
    Ok(header_map)
}

pub(crate) fn check_spec_version(specversion: &str) -> Result<(), EncodingError> {
    if specversion == SPEC_VERSION {
        Ok(())
    } else {
        Err(EncodingError::UnsupportedSpecVersion(format!(
            "Only CloudEvents {} is supported, got {}",
            SPEC_VERSION, specversion
        )))
    }
}

pub(crate) fn is_json_content_type(content_type: &str) -> bool {
    let media_type = content_type
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .to_ascii_lowercase();
    media_type == JSON_CONTENT_TYPE || media_type == "text/json" || media_type.ends_with("+json")
}

// controls, space, '"', '%' and every non-ascii byte get escaped
const HEADER_VALUE: &AsciiSet = &CONTROLS.add(b' ').add(b'"').add(b'%');

pub(crate) fn percent_encode(value: &str) -> String {
    utf8_percent_encode(value, HEADER_VALUE).to_string()
}

pub(crate) fn percent_decode(value: &str) -> Result<String, EncodingError> {
    let bytes = value.as_bytes();
    let well_formed = bytes.iter().enumerate().all(|(i, byte)| {
        *byte != b'%'
            || bytes
                .get(i + 1..i + 3)
                .map_or(false, |pair| pair.iter().all(u8::is_ascii_hexdigit))
    });
    if !well_formed {
        return Err(EncodingError::InvalidHeader(format!(
            "Malformed percent-encoding in header value {}",
            value
        )));
    }
    percent_decode_str(value)
        .decode_utf8()
        .map(|decoded| decoded.into_owned())
        .map_err(|e| {
            EncodingError::InvalidHeader(format!(
                "Percent-decoded header value is not utf-8:\n{:?}",
                e
            ))
        })
}

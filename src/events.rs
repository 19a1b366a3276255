
use crate::config::Config;
use crate::encoding::{
    self, detect_encoding, from_binary, from_json_value, from_structured, header_map, Encoding,
    EncodingError, JSON_CONTENT_TYPE,
};
use crate::entities::{
    CloudEvent, EncodedResponse, EventAttributes, InboundRequest, InvocationContext,
    ResponsePayload, SPEC_VERSION,
};
use lambda_runtime::{Error, LambdaEvent};
use serde_json::{json, Value};
use simple_error::simple_error;
use time::OffsetDateTime;
use tracing::{event, Level};
use url::Url;
use uuid::Uuid;

pub const RESPONSE_EVENT_TYPE: &str = "com.example.fn";
pub const RESPONSE_EVENT_SOURCE: &str = "https://example.com/fn";
pub const RESPONSE_STATUS_CODE: u16 = 200;

const MAX_EXTENSION_NAME_LEN: usize = 20;
const RESERVED_ATTRIBUTES: [&str; 10] = [
    "specversion",
    "id",
    "source",
    "type",
    "datacontenttype",
    "dataschema",
    "subject",
    "time",
    "data",
    "data_base64",
];

#[derive(Debug)]
pub enum EventProcessingError {
    AttributeValidationError(String),
    EncodingFailure(String),
}

pub fn response_attributes() -> EventAttributes {
    EventAttributes::new(RESPONSE_EVENT_TYPE, RESPONSE_EVENT_SOURCE)
}

pub fn response_data() -> Value {
    json!({ "message": "Howdy!" })
}

/// Assembles a CloudEvents 1.0 event from `attributes` and `data`, stamping
/// it with an id from `fn_generate_id` and a time from `fn_now`.
pub fn build_event<F, G>(
    attributes: EventAttributes,
    data: Option<Value>,
    fn_generate_id: F,
    fn_now: G,
) -> Result<CloudEvent, EventProcessingError>
where
    F: Fn() -> String,
    G: Fn() -> OffsetDateTime,
{
    _validate_attributes(&attributes)?;
    let id = fn_generate_id();
    if id.is_empty() {
        return Err(EventProcessingError::AttributeValidationError(String::from(
            "Generated event id is empty.",
        )));
    }
    let datacontenttype = match (&attributes.datacontenttype, &data) {
        (Some(content_type), _) => Some(content_type.to_string()),
        (None, Some(_)) => Some(JSON_CONTENT_TYPE.to_string()),
        (None, None) => None,
    };
    Ok(CloudEvent {
        specversion: SPEC_VERSION.to_string(),
        id,
        source: attributes.source,
        event_type: attributes.event_type,
        datacontenttype,
        dataschema: attributes.dataschema,
        subject: attributes.subject,
        time: Some(fn_now()),
        data,
        extensions: attributes.extensions,
    })
}

pub fn respond_with<F, G>(
    context: &InvocationContext,
    encoding: Encoding,
    fn_generate_id: F,
    fn_now: G,
) -> Result<EncodedResponse, EventProcessingError>
where
    F: Fn() -> String,
    G: Fn() -> OffsetDateTime,
{
    // the request does not shape the reply
    event!(
        Level::DEBUG,
        "Responding to {} {}",
        &context.request.method,
        &context.request.path
    );
    let cloud_event = build_event(
        response_attributes(),
        Some(response_data()),
        fn_generate_id,
        fn_now,
    )?;
    let (headers, body) = encoding::encode(&cloud_event, encoding).map_err(|e| {
        EventProcessingError::EncodingFailure(format!(
            "Failed to encode response event {}:\n{:?}",
            &cloud_event.id, e
        ))
    })?;
    Ok(EncodedResponse {
        body,
        status_code: RESPONSE_STATUS_CODE,
        headers,
    })
}

pub fn respond(
    context: &InvocationContext,
    encoding: Encoding,
) -> Result<EncodedResponse, EventProcessingError> {
    respond_with(
        context,
        encoding,
        || Uuid::new_v4().to_string(),
        OffsetDateTime::now_utc,
    )
}

pub fn decode_inbound_event(request: &InboundRequest) -> Result<Option<CloudEvent>, EncodingError> {
    let headers = header_map(&request.headers)?;
    let body = request.body.as_deref().unwrap_or("").as_bytes();
    match detect_encoding(&headers) {
        Some(Encoding::Binary) => from_binary(&headers, body).map(Some),
        Some(Encoding::Structured) => from_structured(body).map(Some),
        Some(Encoding::Batch) => Err(EncodingError::UnsupportedEncoding(String::from(
            "Batched inbound events are not supported.",
        ))),
        None => Ok(None),
    }
}

/// Builds the context from whatever the runtime delivered. The responder does
/// not validate its input, so a malformed `cloud_event` is logged and dropped.
pub fn context_from_payload(payload: Value) -> InvocationContext {
    let request = InboundRequest::from_payload(payload.get("request").unwrap_or(&Value::Null));
    let cloud_event = match payload.get("cloud_event") {
        None | Some(Value::Null) => None,
        Some(raw_event) => match from_json_value(raw_event.clone()) {
            Ok(cloud_event) => Some(cloud_event),
            Err(error) => {
                event!(Level::WARN, "Ignoring malformed cloud_event: {:?}", error);
                None
            }
        },
    };
    InvocationContext {
        request,
        cloud_event,
    }
}

/// Attaches the event carried by the request, unless the runtime already
/// supplied one. Undecodable events are logged and dropped.
pub fn enrich_context(context: InvocationContext) -> InvocationContext {
    if context.cloud_event.is_some() {
        return context;
    }
    match decode_inbound_event(&context.request) {
        Ok(cloud_event) => InvocationContext {
            cloud_event,
            ..context
        },
        Err(error) => {
            event!(Level::WARN, "Ignoring undecodable inbound event: {:?}", error);
            context
        }
    }
}

pub async fn process_lambda_event(
    event: LambdaEvent<Value>,
    config: &Config,
) -> Result<ResponsePayload, Error> {
    let (payload, lambda_context) = event.into_parts();
    event!(Level::INFO, "Handling invocation {}", &lambda_context.request_id);
    let context = enrich_context(context_from_payload(payload));
    if let Some(inbound) = &context.cloud_event {
        event!(
            Level::INFO,
            "Received event {} of type {} from {}",
            &inbound.id,
            &inbound.event_type,
            &inbound.source
        );
    }
    let response = respond(&context, config.response_encoding)
        .map_err(|e| Box::new(simple_error!(format!("{:?}", e))))?;
    let payload = ResponsePayload::try_from(response)
        .map_err(|e| Box::new(simple_error!(format!("{:?}", e))))?;
    Ok(payload)
}

fn _validate_attributes(attributes: &EventAttributes) -> Result<(), EventProcessingError> {
    if attributes.event_type.is_empty() {
        return Err(EventProcessingError::AttributeValidationError(String::from(
            "Event type must be a non-empty string.",
        )));
    }
    if !_is_uri_reference(&attributes.source) {
        return Err(EventProcessingError::AttributeValidationError(format!(
            "Event source {:?} is not a uri-reference.",
            &attributes.source
        )));
    }
    for (name, value) in attributes.extensions.iter() {
        _validate_extension(name, value)?;
    }
    Ok(())
}

fn _is_uri_reference(candidate: &str) -> bool {
    if candidate.is_empty() {
        return false;
    }
    if Url::parse(candidate).is_ok() {
        return true;
    }
    match Url::parse("http://localhost/") {
        Ok(base) => base.join(candidate).is_ok(),
        Err(_) => false,
    }
}

fn _validate_extension(name: &str, value: &Value) -> Result<(), EventProcessingError> {
    let well_formed = !name.is_empty()
        && name.len() <= MAX_EXTENSION_NAME_LEN
        && name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit());
    if !well_formed || RESERVED_ATTRIBUTES.contains(&name) {
        return Err(EventProcessingError::AttributeValidationError(format!(
            "Invalid extension attribute name {:?}",
            name
        )));
    }
    match value {
        Value::String(_) | Value::Number(_) | Value::Bool(_) => Ok(()),
        _ => Err(EventProcessingError::AttributeValidationError(format!(
            "Extension attribute {} must be a string, number or boolean.",
            name
        ))),
    }
}

//! Decoding of bridge responses into typed remote values.

use serde_json::Value;

use super::errors::DriverError;
use crate::bridge::handle::Handle;

/// What a bridge response stands for on the driver side.
#[derive(Debug, Clone, PartialEq)]
pub enum RemoteValue {
    /// The response was `null`.
    None,
    /// A live object to be addressed through its handle.
    Object(Handle),
    /// An array, its elements decoded one by one.
    Array(Vec<RemoteValue>),
    /// A variant-typed value, kept as data.
    Variant(Value),
    /// Any other value, as transmitted.
    Raw(Value),
}

impl RemoteValue {
    pub fn handle(&self) -> Option<&Handle> {
        match self {
            Self::Object(handle) => Some(handle),
            _ => None,
        }
    }

    pub fn as_raw(&self) -> Option<&Value> {
        match self {
            Self::Raw(value) | Self::Variant(value) => Some(value),
            _ => None,
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }
}

/// Decode one envelope, error outcome or `null`.
///
/// Decision order: error outcome, `QVariant` metatype, `QUrl` metatype,
/// object types, arrays, then raw values.
pub fn decode(response: &Value) -> Result<RemoteValue, DriverError> {
    let map = match response {
        Value::Null => return Ok(RemoteValue::None),
        Value::Object(map) => map,
        other => {
            return Err(DriverError::Malformed(format!(
                "expected an envelope, got {other}"
            )))
        }
    };

    if is_truthy(map.get("error")) {
        let error_string = map
            .get("errorString")
            .and_then(Value::as_str)
            .unwrap_or("Error");
        let diagnostic = match map.get("result") {
            Some(Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
            None => String::new(),
        };
        return Err(DriverError::outcome(error_string, &diagnostic));
    }

    let result = map.get("result").cloned().unwrap_or(Value::Null);
    match map.get("metatype").and_then(Value::as_str) {
        Some("QVariant") => return Ok(RemoteValue::Variant(result)),
        Some("QUrl") => return Ok(RemoteValue::Raw(result)),
        _ => {}
    }

    match map.get("type").and_then(Value::as_str) {
        Some("object") | Some("qobject") => {
            let id = map
                .get("id")
                .and_then(Value::as_str)
                .ok_or_else(|| DriverError::Malformed("object envelope without id".into()))?;
            Ok(RemoteValue::Object(Handle::from(id)))
        }
        Some("array") => match result {
            Value::Array(items) => Ok(RemoteValue::Array(
                items.iter().map(decode_element).collect::<Result<_, _>>()?,
            )),
            other => Err(DriverError::Malformed(format!(
                "array envelope with non-array result {other}"
            ))),
        },
        _ => Ok(RemoteValue::Raw(result)),
    }
}

/// Array elements are envelopes of their own. A self-containing array is
/// only expanded once; below that point its items arrive as plain data.
fn decode_element(item: &Value) -> Result<RemoteValue, DriverError> {
    match item {
        Value::Null => Ok(RemoteValue::None),
        Value::Object(map) if map.contains_key("type") || map.contains_key("error") => decode(item),
        other => Ok(RemoteValue::Raw(other.clone())),
    }
}

/// Decode a `locate-all` response.
pub fn decode_list(response: &Value) -> Result<Vec<RemoteValue>, DriverError> {
    response
        .as_array()
        .ok_or_else(|| DriverError::Malformed("expected a list of envelopes".into()))?
        .iter()
        .map(decode)
        .collect()
}

/// Decode a get-property or call-method response where `null` means the
/// member does not exist.
pub fn expect_member(
    response: &Value,
    kind: &'static str,
    owner: &Handle,
    name: &str,
) -> Result<RemoteValue, DriverError> {
    if response.is_null() || response.get("type").map_or(true, Value::is_null) {
        return Err(DriverError::AttributeNotFound {
            kind,
            name: name.to_string(),
            owner: owner.to_string(),
        });
    }
    decode(response)
}

/// Error flags are numeric on the wire; accept booleans and non-empty
/// strings too.
fn is_truthy(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().map_or(false, |n| n != 0.0),
        Some(Value::String(s)) => !s.is_empty(),
        Some(_) => true,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

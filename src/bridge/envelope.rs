//! Response envelopes: transmissible descriptors of registered values.
//!
//! Every object-valued result handed to the driver travels as an
//! [`Envelope`]: a freshly minted handle, the coarse runtime type at mint
//! time, the value itself and an optional metatype.

use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};

use super::handle::Handle;
use super::introspection::TypeDescriptor;
use super::registry::HandleRegistry;
use super::serializer;
use super::value::{HostValue, TypeTag};

/// Diagnostic string of an ambiguous locate.
pub const FOUND_SEVERAL: &str = "Found several elements";

/// Descriptor of one registered value.
///
/// On the wire: `{ "id", "type", "result", "metatype" }`. For arrays
/// `result` is the list of element envelopes, so every element stays
/// addressable; for anything else it is best-effort structural JSON.
#[derive(Debug, Clone)]
pub struct Envelope {
    pub id: Handle,
    pub kind: TypeTag,
    pub result: HostValue,
    pub metatype: Option<TypeDescriptor>,
    /// Envelopes of the elements of an array result. `None` for other
    /// shapes, and for an array already being expanded further up.
    pub elements: Option<Vec<Envelope>>,
}

impl Serialize for Envelope {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        let mut state = s.serialize_struct("Envelope", 4)?;
        state.serialize_field("id", &self.id)?;
        state.serialize_field("type", &self.kind)?;
        match &self.elements {
            Some(elements) => state.serialize_field("result", elements)?,
            None => state.serialize_field("result", &serializer::to_json_lossy(&self.result))?,
        }
        state.serialize_field("metatype", &self.metatype)?;
        state.end()
    }
}

/// Mint a handle for `value`, register it and describe it.
///
/// Never fails. Arrays are expanded: each element is wrapped in turn, so
/// the registry grows by one entry per value and per element. An array
/// that contains itself is expanded once.
pub fn wrap(
    registry: &mut HandleRegistry,
    value: HostValue,
    metatype: Option<TypeDescriptor>,
) -> Envelope {
    wrap_within(registry, value, metatype, &mut Vec::new())
}

fn wrap_within(
    registry: &mut HandleRegistry,
    value: HostValue,
    metatype: Option<TypeDescriptor>,
    path: &mut Vec<usize>,
) -> Envelope {
    let kind = value.type_tag();
    let id = registry.insert(value.clone());
    let elements = match &value {
        HostValue::Array(array) if !path.contains(&array.addr()) => {
            path.push(array.addr());
            let elements = array
                .snapshot()
                .into_iter()
                .map(|item| wrap_within(registry, item, None, path))
                .collect();
            path.pop();
            Some(elements)
        }
        _ => None,
    };
    Envelope {
        id,
        kind,
        result: value,
        metatype,
        elements,
    }
}

/// Typed, non-exceptional outcome of an unresolved ambiguity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorOutcome {
    pub error: u8,
    pub error_string: String,
    pub result: String,
}

impl ErrorOutcome {
    pub fn new(error_string: impl Into<String>, result: impl Into<String>) -> Self {
        Self {
            error: 1,
            error_string: error_string.into(),
            result: result.into(),
        }
    }

    /// Several matches and no way to pick one; `matches` is the structural
    /// serialization of the full match list.
    pub fn found_several(matches: impl Into<String>) -> Self {
        Self::new(FOUND_SEVERAL, matches)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

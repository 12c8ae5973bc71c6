//! Introspection adapter over the page's wrapping capability.
//!
//! The wrapping capability is an external adapter that, for an arbitrary
//! object, exposes per-member meta information and a set of fallback
//! invocable members. Everything asked of it here is optional metadata, so
//! every failure degrades to "no descriptor".

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use super::value::HostValue;

/// Fine-grained type descriptor. Its shape is owned by the capability, e.g.
/// `"QVariant"`, `"QUrl"` or a structured object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TypeDescriptor(pub Value);

impl TypeDescriptor {
    /// The descriptor as a plain type name, when it is one.
    pub fn as_str(&self) -> Option<&str> {
        self.0.as_str()
    }
}

impl From<&str> for TypeDescriptor {
    fn from(value: &str) -> Self {
        Self(Value::String(value.to_string()))
    }
}

/// Meta information the capability reports for one member name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetaInfo {
    /// Declared type of a property.
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<Value>,
    /// Declared return type of a method.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub return_type: Option<Value>,
    /// Anything else the capability reports.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl MetaInfo {
    pub fn property(kind: impl Into<Value>) -> Self {
        Self {
            kind: Some(kind.into()),
            ..Self::default()
        }
    }

    pub fn method(return_type: impl Into<Value>) -> Self {
        Self {
            return_type: Some(return_type.into()),
            ..Self::default()
        }
    }
}

/// Why a meta information lookup produced nothing.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IntrospectionError {
    /// The object cannot be wrapped (no capability for its shape).
    #[error("No wrapping capability: {0}")]
    Unavailable(String),

    /// The capability does not describe this member.
    #[error("Member not described: {0}")]
    NotDescribed(String),

    /// The capability raised while describing the member.
    #[error("Introspection failed: {0}")]
    Failed(String),
}

/// Capability proxy produced by wrapping one object.
pub trait CapabilityProxy {
    /// Meta information for `name`.
    fn meta_info(&self, name: &str) -> Result<MetaInfo, IntrospectionError>;

    /// Pass-through member `name`, used as a dispatch fallback.
    fn member(&self, name: &str) -> Option<HostValue>;
}

/// The external `wrap(object)` capability.
pub trait CapabilityWrapper: Send + Sync {
    fn wrap<'a>(&'a self, object: &HostValue)
        -> Result<Box<dyn CapabilityProxy + 'a>, IntrospectionError>;
}

/// Declared type of property `name` on `owner`, if the capability knows it.
pub fn type_of_property(
    wrapper: Option<&dyn CapabilityWrapper>,
    owner: &HostValue,
    name: &str,
) -> Option<TypeDescriptor> {
    describe(wrapper, owner, name, |info| info.kind)
}

/// Declared return type of method `name` on `owner`, if the capability
/// knows it.
pub fn type_of_method_return(
    wrapper: Option<&dyn CapabilityWrapper>,
    owner: &HostValue,
    name: &str,
) -> Option<TypeDescriptor> {
    describe(wrapper, owner, name, |info| info.return_type)
}

fn describe(
    wrapper: Option<&dyn CapabilityWrapper>,
    owner: &HostValue,
    name: &str,
    select: fn(MetaInfo) -> Option<Value>,
) -> Option<TypeDescriptor> {
    let wrapper = wrapper?;
    let lookup = wrapper
        .wrap(owner)
        .and_then(|proxy| proxy.meta_info(name));
    match lookup {
        Ok(info) => select(info).map(TypeDescriptor),
        Err(e) => {
            tracing::debug!(member = name, error = %e, "No metatype for member");
            None
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

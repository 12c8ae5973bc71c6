//! Host value model.
//!
//! Values living in the page are modelled as [`HostValue`]. Objects, arrays
//! and functions are shared references: cloning a `HostValue` clones the
//! reference, never the referenced object, so two handles can point at the
//! same live object and a mutation through one is visible through the other.

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::error::InvocationError;

// ---------------------------------------------------------------------------
// TypeTag
// ---------------------------------------------------------------------------

/// Coarse runtime classification of a value, captured at mint time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TypeTag {
    Undefined,
    Null,
    Boolean,
    Number,
    String,
    Array,
    Object,
    /// An object backed by a native class.
    Qobject,
    Function,
}

impl TypeTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Undefined => "undefined",
            Self::Null => "null",
            Self::Boolean => "boolean",
            Self::Number => "number",
            Self::String => "string",
            Self::Array => "array",
            Self::Object => "object",
            Self::Qobject => "qobject",
            Self::Function => "function",
        }
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// HostObject
// ---------------------------------------------------------------------------

/// A page object: an optional native class name plus members in insertion
/// order.
#[derive(Debug, Clone, Default)]
pub struct HostObject {
    class_name: Option<String>,
    members: IndexMap<String, HostValue>,
}

impl HostObject {
    /// Create an empty plain object.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty object backed by a native class.
    pub fn native(class_name: impl Into<String>) -> Self {
        Self {
            class_name: Some(class_name.into()),
            members: IndexMap::new(),
        }
    }

    /// Add a member (builder pattern).
    pub fn with_member(mut self, name: impl Into<String>, value: impl Into<HostValue>) -> Self {
        self.members.insert(name.into(), value.into());
        self
    }

    pub fn class_name(&self) -> Option<&str> {
        self.class_name.as_deref()
    }

    pub fn get(&self, name: &str) -> Option<&HostValue> {
        self.members.get(name)
    }

    /// Assign a member. Existing members keep their enumeration position.
    pub fn set(&mut self, name: impl Into<String>, value: HostValue) {
        self.members.insert(name.into(), value);
    }

    pub fn remove(&mut self, name: &str) -> Option<HostValue> {
        self.members.shift_remove(name)
    }

    pub fn members(&self) -> impl Iterator<Item = (&String, &HostValue)> {
        self.members.iter()
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Shared references
// ---------------------------------------------------------------------------

/// Shared reference to a [`HostObject`].
#[derive(Clone)]
pub struct ObjectRef(Arc<RwLock<HostObject>>);

impl ObjectRef {
    pub fn new(object: HostObject) -> Self {
        Self(Arc::new(RwLock::new(object)))
    }

    pub fn read(&self) -> RwLockReadGuard<'_, HostObject> {
        self.0.read()
    }

    pub fn write(&self) -> RwLockWriteGuard<'_, HostObject> {
        self.0.write()
    }

    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    /// Address of the shared allocation, used for cycle detection.
    pub(crate) fn addr(&self) -> usize {
        Arc::as_ptr(&self.0) as *const () as usize
    }

    /// Snapshot of the members, taken so no lock is held while the caller
    /// recurses or invokes host code.
    pub fn snapshot(&self) -> Vec<(String, HostValue)> {
        self.read()
            .members()
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect()
    }
}

impl fmt::Debug for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let object = self.read();
        f.debug_struct("ObjectRef")
            .field("class_name", &object.class_name())
            .field("members", &object.len())
            .finish()
    }
}

/// Shared reference to a host array.
#[derive(Clone)]
pub struct ArrayRef(Arc<RwLock<Vec<HostValue>>>);

impl ArrayRef {
    pub fn new(items: Vec<HostValue>) -> Self {
        Self(Arc::new(RwLock::new(items)))
    }

    pub fn read(&self) -> RwLockReadGuard<'_, Vec<HostValue>> {
        self.0.read()
    }

    pub fn write(&self) -> RwLockWriteGuard<'_, Vec<HostValue>> {
        self.0.write()
    }

    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    pub(crate) fn addr(&self) -> usize {
        Arc::as_ptr(&self.0) as *const () as usize
    }

    pub fn snapshot(&self) -> Vec<HostValue> {
        self.read().clone()
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }
}

impl fmt::Debug for ArrayRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArrayRef").field("len", &self.len()).finish()
    }
}

// ---------------------------------------------------------------------------
// Functions
// ---------------------------------------------------------------------------

/// An invocable page value.
///
/// `this` is the object the function was resolved against, either as an
/// own member or through the wrapping capability.
pub trait HostFunction: Send + Sync {
    fn call(&self, this: &HostValue, args: &[HostValue]) -> Result<HostValue, InvocationError>;
}

impl<F> HostFunction for F
where
    F: Fn(&HostValue, &[HostValue]) -> Result<HostValue, InvocationError> + Send + Sync,
{
    fn call(&self, this: &HostValue, args: &[HostValue]) -> Result<HostValue, InvocationError> {
        self(this, args)
    }
}

/// Shared reference to a [`HostFunction`].
#[derive(Clone)]
pub struct FunctionRef {
    name: Option<String>,
    inner: Arc<dyn HostFunction>,
}

impl FunctionRef {
    pub fn new<F>(function: F) -> Self
    where
        F: Fn(&HostValue, &[HostValue]) -> Result<HostValue, InvocationError> + Send + Sync + 'static,
    {
        Self::from_host(function)
    }

    pub fn named<F>(name: impl Into<String>, function: F) -> Self
    where
        F: Fn(&HostValue, &[HostValue]) -> Result<HostValue, InvocationError> + Send + Sync + 'static,
    {
        Self {
            name: Some(name.into()),
            inner: Arc::new(function),
        }
    }

    /// Wrap any [`HostFunction`] implementation.
    pub fn from_host(function: impl HostFunction + 'static) -> Self {
        Self {
            name: None,
            inner: Arc::new(function),
        }
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn call(&self, this: &HostValue, args: &[HostValue]) -> Result<HostValue, InvocationError> {
        self.inner.call(this, args)
    }

    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for FunctionRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FunctionRef({})", self.name.as_deref().unwrap_or("<anonymous>"))
    }
}

// ---------------------------------------------------------------------------
// HostValue
// ---------------------------------------------------------------------------

/// Any value reachable in the page.
#[derive(Debug, Clone, Default)]
pub enum HostValue {
    #[default]
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    Array(ArrayRef),
    Object(ObjectRef),
    Function(FunctionRef),
}

impl HostValue {
    /// Wrap a fresh object.
    pub fn object(object: HostObject) -> Self {
        Self::Object(ObjectRef::new(object))
    }

    /// Wrap a fresh array.
    pub fn array(items: Vec<HostValue>) -> Self {
        Self::Array(ArrayRef::new(items))
    }

    /// Wrap a host function.
    pub fn function<F>(function: F) -> Self
    where
        F: Fn(&HostValue, &[HostValue]) -> Result<HostValue, InvocationError> + Send + Sync + 'static,
    {
        Self::Function(FunctionRef::new(function))
    }

    pub fn type_tag(&self) -> TypeTag {
        match self {
            Self::Undefined => TypeTag::Undefined,
            Self::Null => TypeTag::Null,
            Self::Bool(_) => TypeTag::Boolean,
            Self::Number(_) => TypeTag::Number,
            Self::String(_) => TypeTag::String,
            Self::Array(_) => TypeTag::Array,
            Self::Object(object) => {
                if object.read().class_name().is_some() {
                    TypeTag::Qobject
                } else {
                    TypeTag::Object
                }
            }
            Self::Function(_) => TypeTag::Function,
        }
    }

    pub fn is_invocable(&self) -> bool {
        matches!(self, Self::Function(_))
    }

    pub fn is_undefined(&self) -> bool {
        matches!(self, Self::Undefined)
    }

    pub fn as_object(&self) -> Option<&ObjectRef> {
        match self {
            Self::Object(object) => Some(object),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&ArrayRef> {
        match self {
            Self::Array(array) => Some(array),
            _ => None,
        }
    }

    pub fn as_function(&self) -> Option<&FunctionRef> {
        match self {
            Self::Function(function) => Some(function),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Strict identity: reference equality for objects, arrays and
    /// functions, value equality for scalars (`NaN` is never identical).
    pub fn same_ref(&self, other: &HostValue) -> bool {
        match (self, other) {
            (Self::Undefined, Self::Undefined) | (Self::Null, Self::Null) => true,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Number(a), Self::Number(b)) => a == b,
            (Self::String(a), Self::String(b)) => a == b,
            (Self::Array(a), Self::Array(b)) => a.ptr_eq(b),
            (Self::Object(a), Self::Object(b)) => a.ptr_eq(b),
            (Self::Function(a), Self::Function(b)) => a.ptr_eq(b),
            _ => false,
        }
    }

    /// Own member of an object; `None` for every other shape.
    pub fn own_member(&self, name: &str) -> Option<HostValue> {
        self.as_object()
            .and_then(|object| object.read().get(name).cloned())
    }

    /// Property read: members of objects, `length` and indices of arrays
    /// and strings. Anything absent reads as `Undefined`.
    pub fn get_member(&self, name: &str) -> HostValue {
        match self {
            Self::Object(object) => object.read().get(name).cloned().unwrap_or_default(),
            Self::Array(array) => {
                let items = array.read();
                if name == "length" {
                    return Self::Number(items.len() as f64);
                }
                name.parse::<usize>()
                    .ok()
                    .and_then(|index| items.get(index).cloned())
                    .unwrap_or_default()
            }
            Self::String(s) => {
                if name == "length" {
                    return Self::Number(s.encode_utf16().count() as f64);
                }
                name.parse::<usize>()
                    .ok()
                    .and_then(|index| s.chars().nth(index))
                    .map(|c| Self::String(c.to_string()))
                    .unwrap_or_default()
            }
            _ => Self::Undefined,
        }
    }

    /// Property write. Objects take any name; arrays take indices, growing
    /// with `Undefined` holes. Writes to other shapes are silently dropped
    /// and report `false`.
    pub fn set_member(&self, name: &str, value: HostValue) -> bool {
        match self {
            Self::Object(object) => {
                object.write().set(name, value);
                true
            }
            Self::Array(array) => match name.parse::<usize>() {
                Ok(index) => {
                    let mut items = array.write();
                    if index >= items.len() {
                        items.resize(index + 1, HostValue::Undefined);
                    }
                    items[index] = value;
                    true
                }
                Err(_) => false,
            },
            _ => false,
        }
    }

    /// Build a fresh value tree from JSON. Every object and array in the
    /// result is a new allocation.
    pub fn from_json(value: &Value) -> Self {
        match value {
            Value::Null => Self::Null,
            Value::Bool(b) => Self::Bool(*b),
            Value::Number(n) => Self::Number(n.as_f64().unwrap_or(f64::NAN)),
            Value::String(s) => Self::String(s.clone()),
            Value::Array(items) => Self::array(items.iter().map(Self::from_json).collect()),
            Value::Object(map) => {
                let mut object = HostObject::new();
                for (key, item) in map {
                    object.set(key.clone(), Self::from_json(item));
                }
                Self::object(object)
            }
        }
    }
}

impl From<bool> for HostValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<f64> for HostValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<i32> for HostValue {
    fn from(value: i32) -> Self {
        Self::Number(f64::from(value))
    }
}

impl From<&str> for HostValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for HostValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<HostObject> for HostValue {
    fn from(value: HostObject) -> Self {
        Self::object(value)
    }
}

impl From<Vec<HostValue>> for HostValue {
    fn from(value: Vec<HostValue>) -> Self {
        Self::array(value)
    }
}

impl From<FunctionRef> for HostValue {
    fn from(value: FunctionRef) -> Self {
        Self::Function(value)
    }
}

impl From<ObjectRef> for HostValue {
    fn from(value: ObjectRef) -> Self {
        Self::Object(value)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

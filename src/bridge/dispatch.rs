//! Property and method dispatch against registered handles.
//!
//! Method lookup walks a short resolution chain: the object's own members
//! first, then the same-named member of the wrapping capability applied to
//! the object. The first invocable candidate wins.

use super::envelope::{self, Envelope};
use super::error::{BridgeError, BridgeResult};
use super::introspection::{self, CapabilityWrapper};
use super::registry::HandleRegistry;
use super::value::{FunctionRef, HostValue};

/// Where an invocable member was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemberSource {
    /// An own member of the referenced object.
    Own,
    /// A member of the wrapping capability applied to the object.
    Wrapped,
}

/// Read `name` from the value behind `handle`.
///
/// Invocable values have no addressable properties: the answer is `None`
/// whatever `name` is.
pub fn get_property(
    registry: &mut HandleRegistry,
    wrapper: Option<&dyn CapabilityWrapper>,
    handle: &str,
    name: &str,
) -> BridgeResult<Option<Envelope>> {
    let owner = registry.resolve(handle)?;
    if owner.is_invocable() {
        return Ok(None);
    }
    let value = owner.get_member(name);
    let metatype = introspection::type_of_property(wrapper, &owner, name);
    Ok(Some(envelope::wrap(registry, value, metatype)))
}

/// Assign `value` to `name` on the value behind `handle`. No type checks,
/// no notification.
pub fn set_property(
    registry: &HandleRegistry,
    handle: &str,
    name: &str,
    value: HostValue,
) -> BridgeResult<()> {
    let owner = registry.resolve(handle)?;
    if !owner.set_member(name, value) {
        tracing::debug!(
            handle,
            member = name,
            owner_type = %owner.type_tag(),
            "Assignment to a non-object value has no effect"
        );
    }
    Ok(())
}

/// Invoke `name` on the value behind `handle`.
///
/// `args`, when present, is passed as exactly one positional argument.
/// `None` means neither the object nor its wrapping capability has an
/// invocable member of that name.
pub fn call_method(
    registry: &mut HandleRegistry,
    wrapper: Option<&dyn CapabilityWrapper>,
    handle: &str,
    name: &str,
    args: Option<HostValue>,
) -> BridgeResult<Option<Envelope>> {
    let owner = registry.resolve(handle)?;
    let Some((source, function)) = resolve_invocable(wrapper, &owner, name) else {
        return Ok(None);
    };
    tracing::trace!(handle, member = name, ?source, "Dispatching method call");

    let args: Vec<HostValue> = args.into_iter().collect();
    let result = function
        .call(&owner, &args)
        .map_err(|e| BridgeError::Invocation {
            name: name.to_string(),
            message: e.to_string(),
        })?;

    let metatype = introspection::type_of_method_return(wrapper, &owner, name);
    Ok(Some(envelope::wrap(registry, result, metatype)))
}

/// Find the first invocable candidate for `name`.
pub fn resolve_invocable(
    wrapper: Option<&dyn CapabilityWrapper>,
    owner: &HostValue,
    name: &str,
) -> Option<(MemberSource, FunctionRef)> {
    if let Some(HostValue::Function(function)) = owner.own_member(name) {
        return Some((MemberSource::Own, function));
    }

    let proxy = match wrapper?.wrap(owner) {
        Ok(proxy) => proxy,
        Err(e) => {
            tracing::debug!(member = name, error = %e, "Object has no wrapping capability");
            return None;
        }
    };
    match proxy.member(name) {
        Some(HostValue::Function(function)) => Some((MemberSource::Wrapped, function)),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

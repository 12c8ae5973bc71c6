//! # TestKit Bridge
//!
//! A remote-object bridge embedded in a running page. An external automation
//! driver locates, inspects, mutates and invokes methods on live in-page
//! objects through opaque handles, without ever seeing the page's object
//! graph directly.
//!
//! The crate has two halves:
//!
//! - [`bridge`]: the in-page side, with the handle registry, response envelopes,
//!   locator resolution, member dispatch, structural dumps and the JSON
//!   command protocol.
//! - [`driver`]: the driver side, with request builders, locator preparation and
//!   decoding of bridge responses into typed remote values.

pub mod bridge;
pub mod driver;
pub mod telemetry;

#[cfg(test)]
pub(crate) mod testing;

pub use bridge::config::BridgeConfig;
pub use bridge::envelope::{Envelope, ErrorOutcome};
pub use bridge::error::{BridgeError, InvocationError};
pub use bridge::handle::Handle;
pub use bridge::introspection::{CapabilityProxy, CapabilityWrapper, MetaInfo, TypeDescriptor};
pub use bridge::locator::{LocateOutcome, Locator, ObjectFinder};
pub use bridge::protocol::Command;
pub use bridge::value::{HostFunction, HostObject, HostValue, TypeTag};
pub use bridge::Bridge;

/// Crate version reported by the `stats` command.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

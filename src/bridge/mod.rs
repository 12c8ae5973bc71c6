//! In-page side of the remote-object bridge.
//!
//! A [`Bridge`] is attached to a page with two external capabilities:
//!
//! - an [`ObjectFinder`] (the page's `find(locator)` query layer), and
//! - optionally a [`CapabilityWrapper`] (the page's `wrap(object)` adapter
//!   used for metatypes and as a method dispatch fallback).
//!
//! It owns the handle registry for the lifetime of the session. Commands run
//! synchronously, one at a time, in the order the driver issues them.
//! Handles are not invalidated when the page changes underneath them.
//!
//! # Modules
//!
//! - [`value`]: the host value model
//! - [`handle`] / [`registry`]: handle minting and the identity map
//! - [`envelope`]: response envelopes and ambiguity reports
//! - [`introspection`]: best-effort metatype lookup
//! - [`locator`]: locator resolution policy
//! - [`dispatch`]: property get/set and method calls
//! - [`serializer`]: structural JSON dumps
//! - [`protocol`]: JSON command messages

pub mod config;
pub mod dispatch;
pub mod envelope;
pub mod error;
pub mod handle;
pub mod introspection;
pub mod locator;
pub mod protocol;
pub mod registry;
pub mod serializer;
pub mod value;

use self::config::BridgeConfig;
use self::envelope::Envelope;
use self::error::BridgeResult;
use self::introspection::CapabilityWrapper;
use self::locator::{LocateOutcome, Locator, ObjectFinder};
use self::registry::HandleRegistry;
use self::serializer::DumpResult;
use self::value::HostValue;

/// The remote-object bridge of one attached session.
pub struct Bridge {
    config: BridgeConfig,
    registry: HandleRegistry,
    finder: Box<dyn ObjectFinder>,
    wrapper: Option<Box<dyn CapabilityWrapper>>,
}

impl Bridge {
    /// Attach a bridge with the default configuration.
    pub fn new(finder: impl ObjectFinder + 'static) -> Self {
        Self::with_config(BridgeConfig::default(), finder)
    }

    /// Attach a bridge with an explicit configuration.
    pub fn with_config(config: BridgeConfig, finder: impl ObjectFinder + 'static) -> Self {
        let registry = HandleRegistry::with_prefix(config.handle_prefix.clone())
            .with_soft_limit(config.registry_soft_limit);
        tracing::debug!(prefix = %config.handle_prefix, "Bridge attached");
        Self {
            config,
            registry,
            finder: Box::new(finder),
            wrapper: None,
        }
    }

    /// Install the page's wrapping capability (builder pattern).
    pub fn with_wrapper(mut self, wrapper: impl CapabilityWrapper + 'static) -> Self {
        self.wrapper = Some(Box::new(wrapper));
        self
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    pub fn registry(&self) -> &HandleRegistry {
        &self.registry
    }

    /// Look up the live value behind a handle.
    pub fn resolve(&self, handle: &str) -> BridgeResult<HostValue> {
        self.registry.resolve(handle)
    }

    /// `locate-all`: every match, each under its own fresh handle.
    pub fn locate_all(&mut self, locator: &Locator) -> Vec<Envelope> {
        locator::find_all(self.finder.as_ref(), &mut self.registry, locator)
    }

    /// `locate-one`: a single match, an ambiguity report or nothing.
    pub fn locate_one(&mut self, locator: Locator) -> BridgeResult<LocateOutcome> {
        locator::find_one(self.finder.as_ref(), &mut self.registry, locator)
    }

    /// `get-property`
    pub fn get_property(&mut self, handle: &str, name: &str) -> BridgeResult<Option<Envelope>> {
        dispatch::get_property(&mut self.registry, self.wrapper.as_deref(), handle, name)
    }

    /// `set-property`
    pub fn set_property(&mut self, handle: &str, name: &str, value: HostValue) -> BridgeResult<()> {
        dispatch::set_property(&self.registry, handle, name, value)
    }

    /// `call-method`
    pub fn call_method(
        &mut self,
        handle: &str,
        name: &str,
        args: Option<HostValue>,
    ) -> BridgeResult<Option<Envelope>> {
        dispatch::call_method(&mut self.registry, self.wrapper.as_deref(), handle, name, args)
    }

    /// `dump`: structural JSON text of the value behind `handle`.
    pub fn dump(&self, handle: &str) -> BridgeResult<DumpResult> {
        let value = self.registry.resolve(handle)?;
        serializer::dump(&value, self.config.pretty_dump)
    }

    /// `reset`: release every handle. Returns how many were released.
    pub fn reset(&mut self) -> usize {
        let released = self.registry.clear();
        tracing::info!(released, "Handle registry reset");
        released
    }
}

impl Drop for Bridge {
    fn drop(&mut self) {
        tracing::debug!(handles = self.registry.len(), "Bridge detached");
    }
}

impl std::fmt::Debug for Bridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bridge")
            .field("config", &self.config)
            .field("handles", &self.registry.len())
            .field("wrapper", &self.wrapper.as_ref().map(|_| "<wrapper>"))
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

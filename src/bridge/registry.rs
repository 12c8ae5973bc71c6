//! Handle registry: the identity map from handles to live values.
//!
//! The registry only ever grows while a session is attached: entries are
//! never evicted behind the driver's back. [`HandleRegistry::clear`] is the
//! explicit teardown used by the `reset` command and on detach.

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use super::error::{BridgeError, BridgeResult};
use super::handle::{Handle, DEFAULT_HANDLE_PREFIX};
use super::value::HostValue;

/// A registered value together with the time its handle was minted.
#[derive(Debug, Clone)]
pub struct RegistryEntry {
    pub value: HostValue,
    pub minted_at: DateTime<Utc>,
}

/// Process-wide mapping from [`Handle`] to live value.
#[derive(Debug)]
pub struct HandleRegistry {
    entries: HashMap<Handle, RegistryEntry>,
    prefix: String,
    soft_limit: Option<usize>,
    limit_reported: bool,
}

impl Default for HandleRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl HandleRegistry {
    /// Create an empty registry minting `obj-` handles.
    pub fn new() -> Self {
        Self::with_prefix(DEFAULT_HANDLE_PREFIX)
    }

    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            entries: HashMap::new(),
            prefix: prefix.into(),
            soft_limit: None,
            limit_reported: false,
        }
    }

    /// Log a warning once the registry grows past `limit` entries.
    pub fn with_soft_limit(mut self, limit: Option<usize>) -> Self {
        self.soft_limit = limit;
        self
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Generate a handle that is not yet registered.
    pub fn mint(&self) -> Handle {
        loop {
            let handle = Handle::generate(&self.prefix);
            if !self.entries.contains_key(&handle) {
                tracing::trace!(handle = %handle, "Minted handle");
                return handle;
            }
        }
    }

    /// Register `value` under `handle`. A handle is never reassigned: if it
    /// is already present the existing entry is kept and `false` returned.
    pub fn register(&mut self, handle: Handle, value: HostValue) -> bool {
        if self.entries.contains_key(&handle) {
            tracing::error!(handle = %handle, "Refusing to reassign an existing handle");
            return false;
        }
        self.entries.insert(
            handle,
            RegistryEntry {
                value,
                minted_at: Utc::now(),
            },
        );
        self.check_soft_limit();
        true
    }

    /// Mint a fresh handle and register `value` under it.
    pub fn insert(&mut self, value: HostValue) -> Handle {
        let handle = self.mint();
        self.register(handle.clone(), value);
        handle
    }

    /// Look up the value behind `handle`.
    pub fn resolve(&self, handle: &str) -> BridgeResult<HostValue> {
        self.entries
            .get(handle)
            .map(|entry| entry.value.clone())
            .ok_or_else(|| BridgeError::UnknownHandle(handle.to_string()))
    }

    pub fn entry(&self, handle: &str) -> Option<&RegistryEntry> {
        self.entries.get(handle)
    }

    pub fn contains(&self, handle: &str) -> bool {
        self.entries.contains_key(handle)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop every entry; returns how many were released.
    pub fn clear(&mut self) -> usize {
        let released = self.entries.len();
        self.entries.clear();
        self.limit_reported = false;
        released
    }

    fn check_soft_limit(&mut self) {
        if let Some(limit) = self.soft_limit {
            if !self.limit_reported && self.entries.len() > limit {
                self.limit_reported = true;
                tracing::warn!(
                    entries = self.entries.len(),
                    limit,
                    "Handle registry grew past its soft limit; consider resetting the session"
                );
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

//! Locator resolution.
//!
//! Matching itself belongs to the page's query layer (an [`ObjectFinder`]).
//! This module turns its zero/one/many answer into a single outcome:
//!
//! 1. exactly one match: that match;
//! 2. otherwise, with an `occurrence` selector: the match at that 1-based
//!    position (past the end is [`BridgeError::IndexOutOfRange`]);
//! 3. exactly two structurally identical matches: the first one (a ghost
//!    duplicate such as a row and its shadow clone);
//! 4. several matches: an [`ErrorOutcome`] carrying the serialized list;
//! 5. no match: nothing.

use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Value;

use super::envelope::{self, Envelope, ErrorOutcome};
use super::error::{BridgeError, BridgeResult};
use super::registry::HandleRegistry;
use super::serializer;
use super::value::HostValue;

/// Name of the 1-based selector key.
pub const OCCURRENCE_KEY: &str = "occurrence";

/// Match constraints, in the order the driver gave them. Values may be live
/// objects (resolved from handles) as well as plain data.
#[derive(Debug, Clone, Default)]
pub struct Locator {
    constraints: IndexMap<String, HostValue>,
}

impl Locator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a constraint (builder pattern).
    pub fn with(mut self, key: impl Into<String>, value: impl Into<HostValue>) -> Self {
        self.constraints.insert(key.into(), value.into());
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: HostValue) {
        self.constraints.insert(key.into(), value);
    }

    pub fn get(&self, key: &str) -> Option<&HostValue> {
        self.constraints.get(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &HostValue)> {
        self.constraints.iter()
    }

    pub fn len(&self) -> usize {
        self.constraints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.constraints.is_empty()
    }

    /// Remove the `occurrence` selector and return its parsed value.
    ///
    /// A missing, `null` or `undefined` selector is `None`. Positive
    /// integers are accepted as numbers or as decimal strings (`"2"`);
    /// anything else is [`BridgeError::InvalidOccurrence`].
    pub fn take_occurrence(&mut self) -> BridgeResult<Option<usize>> {
        let occurrence = match self.constraints.shift_remove(OCCURRENCE_KEY) {
            None | Some(HostValue::Undefined) | Some(HostValue::Null) => return Ok(None),
            Some(occurrence) => occurrence,
        };
        let position = match &occurrence {
            HostValue::Number(n) if n.fract() == 0.0 && *n >= 1.0 && *n <= usize::MAX as f64 => {
                Some(*n as usize)
            }
            HostValue::String(s) => s.trim().parse::<usize>().ok().filter(|n| *n >= 1),
            _ => None,
        };
        position
            .map(Some)
            .ok_or_else(|| BridgeError::InvalidOccurrence(serializer::to_json_lossy(&occurrence)))
    }

    /// Structural JSON of the constraints, for logging.
    pub fn to_json(&self) -> Value {
        let mut map = serde_json::Map::new();
        for (key, value) in &self.constraints {
            map.insert(key.clone(), serializer::to_json_lossy(value));
        }
        Value::Object(map)
    }
}

/// The page's `find(locator)` capability.
pub trait ObjectFinder: Send + Sync {
    /// Ordered matches for `locator`.
    fn find(&self, locator: &Locator) -> Vec<HostValue>;
}

impl<F> ObjectFinder for F
where
    F: Fn(&Locator) -> Vec<HostValue> + Send + Sync,
{
    fn find(&self, locator: &Locator) -> Vec<HostValue> {
        self(locator)
    }
}

/// Result of `locate-one`: exactly one of an envelope, an ambiguity report
/// or nothing (`null` on the wire).
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum LocateOutcome {
    Found(Envelope),
    Ambiguous(ErrorOutcome),
    NotFound,
}

impl LocateOutcome {
    pub fn envelope(&self) -> Option<&Envelope> {
        match self {
            Self::Found(envelope) => Some(envelope),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound)
    }
}

/// Wrap every match independently; the locator is passed through as is.
pub fn find_all(
    finder: &dyn ObjectFinder,
    registry: &mut HandleRegistry,
    locator: &Locator,
) -> Vec<Envelope> {
    finder
        .find(locator)
        .into_iter()
        .map(|value| envelope::wrap(registry, value, None))
        .collect()
}

/// Reduce the matches of `locator` to a single outcome.
pub fn find_one(
    finder: &dyn ObjectFinder,
    registry: &mut HandleRegistry,
    mut locator: Locator,
) -> BridgeResult<LocateOutcome> {
    let occurrence = locator.take_occurrence()?;
    let mut matches = finder.find(&locator);

    if matches.len() == 1 {
        let value = matches.remove(0);
        return Ok(LocateOutcome::Found(envelope::wrap(registry, value, None)));
    }

    if let Some(occurrence) = occurrence {
        let index = occurrence - 1;
        if index >= matches.len() {
            return Err(BridgeError::IndexOutOfRange {
                occurrence,
                matches: matches.len(),
            });
        }
        let value = matches.swap_remove(index);
        return Ok(LocateOutcome::Found(envelope::wrap(registry, value, None)));
    }

    if matches.len() == 2 && structurally_identical(&matches[0], &matches[1]) {
        tracing::debug!("Two identical matches, treating the second as a ghost duplicate");
        let value = matches.swap_remove(0);
        return Ok(LocateOutcome::Found(envelope::wrap(registry, value, None)));
    }

    if matches.len() > 1 {
        let listing = serializer::to_json_lossy(&HostValue::array(matches));
        let listing = serde_json::to_string(&listing)?;
        return Ok(LocateOutcome::Ambiguous(ErrorOutcome::found_several(listing)));
    }

    Ok(LocateOutcome::NotFound)
}

/// Deep, order-sensitive structural equality. Values that cannot be
/// serialized are never identical.
fn structurally_identical(a: &HostValue, b: &HostValue) -> bool {
    match (serializer::structural_string(a), serializer::structural_string(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

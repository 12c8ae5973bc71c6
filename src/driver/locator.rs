//! Locator preparation on the driver side.
//!
//! Pattern constraints travel as strings prefixed with `re:`; the page's
//! query layer only honours them on a handful of textual properties, so
//! anything else is rejected before it is sent.

use std::num::NonZeroU32;

use regex::Regex;
use serde_json::{Map, Value};

use super::errors::DriverError;
use super::request::Argument;
use crate::bridge::locator::OCCURRENCE_KEY;

/// Prefix marking a pattern constraint.
pub const PATTERN_PREFIX: &str = "re:";

/// Properties that accept `re:` pattern constraints.
pub const PATTERN_PROPERTIES: &[&str] = &["text", "title", "tooltip", "source", "labelText"];

/// Properties worth copying from a dump into a locator.
pub const SEARCHABLE_PROPERTIES: &[&str] = &[
    "visible",
    "enabled",
    "selected",
    "text",
    "name",
    "objectName",
    "title",
    "id",
    "unnamed",
    "toolTip",
    "labelText",
    "type",
    "window",
    "source",
    "column",
    "row",
    "x",
    "y",
    "z",
    "checkState",
];

/// Builder of locator maps.
///
/// ```
/// use std::num::NonZeroU32;
/// use testkit_bridge::driver::locator::LocatorBuilder;
///
/// let second = NonZeroU32::new(2).unwrap();
/// let locator = LocatorBuilder::new()
///     .exact("type", "Button")
///     .pattern("text", "^Sa(ve|ved)$")
///     .unwrap()
///     .occurrence(second)
///     .build();
/// assert_eq!(locator["text"], "re:^Sa(ve|ved)$");
/// ```
#[derive(Debug, Clone, Default)]
pub struct LocatorBuilder {
    constraints: Map<String, Value>,
}

impl LocatorBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Exact-value constraint.
    pub fn exact(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.constraints.insert(key.to_string(), value.into());
        self
    }

    /// Constraint on a live object, e.g. the parent a match must live in.
    pub fn object(mut self, key: &str, handle: &str) -> Self {
        self.constraints
            .insert(key.to_string(), Argument::handle(handle).into_json());
        self
    }

    /// Nested locator, e.g. a `container` constraint.
    pub fn nested(mut self, key: &str, locator: LocatorBuilder) -> Self {
        self.constraints
            .insert(key.to_string(), Value::Object(locator.constraints));
        self
    }

    /// Pattern constraint. Fails if `key` does not accept patterns or the
    /// pattern does not compile.
    pub fn pattern(mut self, key: &str, pattern: &str) -> Result<Self, DriverError> {
        if !PATTERN_PROPERTIES.contains(&key) {
            return Err(DriverError::InvalidPattern(format!(
                "patterns are only allowed for {PATTERN_PROPERTIES:?}, got property {key:?} with pattern {pattern:?}"
            )));
        }
        Regex::new(pattern)
            .map_err(|e| DriverError::InvalidPattern(format!("{key}: {e}")))?;
        self.constraints
            .insert(key.to_string(), Value::String(format!("{PATTERN_PREFIX}{pattern}")));
        Ok(self)
    }

    /// 1-based selector among several matches; there is no 0th match.
    pub fn occurrence(mut self, occurrence: NonZeroU32) -> Self {
        self.constraints
            .insert(OCCURRENCE_KEY.to_string(), Value::from(occurrence.get()));
        self
    }

    pub fn build(self) -> Map<String, Value> {
        self.constraints
    }
}

/// Check a hand-written locator: every `re:` string must sit on a pattern
/// property and compile. Nested locators are checked too.
pub fn validate_locator(locator: &Map<String, Value>) -> Result<(), DriverError> {
    for (key, value) in locator {
        match value {
            Value::String(s) => {
                if let Some(pattern) = s.strip_prefix(PATTERN_PREFIX) {
                    LocatorBuilder::new().pattern(key, pattern)?;
                }
            }
            Value::Object(nested) => validate_locator(nested)?,
            _ => {}
        }
    }
    Ok(())
}

/// Reduce the JSON text of a `dump` response to the searchable properties,
/// giving a locator that finds the dumped object again.
pub fn locator_from_dump(dump: Option<&str>) -> Result<Map<String, Value>, DriverError> {
    let Some(text) = dump else {
        return Ok(Map::new());
    };
    let value: Value = serde_json::from_str(text)
        .map_err(|e| DriverError::Malformed(format!("dump is not JSON: {e}")))?;
    let Value::Object(full) = value else {
        return Ok(Map::new());
    };
    Ok(SEARCHABLE_PROPERTIES
        .iter()
        .filter_map(|key| full.get(*key).map(|v| (key.to_string(), v.clone())))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_builder() {
        let locator = LocatorBuilder::new()
            .exact("type", "Button")
            .nested("container", LocatorBuilder::new().exact("type", "MainWindow"))
            .object("parent", "obj-1")
            .occurrence(NonZeroU32::new(3).unwrap())
            .build();
        assert_eq!(
            Value::Object(locator),
            json!({
                "type": "Button",
                "container": {"type": "MainWindow"},
                "parent": {"$handle": "obj-1"},
                "occurrence": 3
            })
        );
    }

    #[test]
    fn test_pattern_on_supported_property() {
        let locator = LocatorBuilder::new().pattern("title", "Sys.*").unwrap().build();
        assert_eq!(locator["title"], "re:Sys.*");
    }

    #[test]
    fn test_pattern_on_unsupported_property() {
        let err = LocatorBuilder::new().pattern("name", "Button|QButton").unwrap_err();
        assert!(matches!(err, DriverError::InvalidPattern(_)));
        assert!(err.to_string().contains("\"name\""));
    }

    #[test]
    fn test_pattern_must_compile() {
        assert!(LocatorBuilder::new().pattern("text", "(unclosed").is_err());
    }

    #[test]
    fn test_validate_locator() {
        let good = json!({"text": "re:^OK$", "container": {"title": "re:Dialog"}, "x": 3});
        assert!(validate_locator(good.as_object().unwrap()).is_ok());

        let bad = json!({"container": {"objectName": "re:login.*"}});
        assert!(validate_locator(bad.as_object().unwrap()).is_err());
    }

    #[test]
    fn test_locator_from_dump() {
        let dump = r#"{"text":"OK","width":80,"type":"Button","visible":true,"x":4}"#;
        let locator = locator_from_dump(Some(dump)).unwrap();
        assert_eq!(
            Value::Object(locator),
            json!({"visible": true, "text": "OK", "type": "Button", "x": 4})
        );
        assert!(locator_from_dump(None).unwrap().is_empty());
        assert!(locator_from_dump(Some("[1]")).unwrap().is_empty());
        assert!(locator_from_dump(Some("{")).is_err());
    }
}

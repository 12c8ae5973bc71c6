//! JSON command protocol between the driver and the bridge.
//!
//! # Requests
//!
//! ```json
//! {"command": "locate-all",   "locator": {...}}
//! {"command": "locate-one",   "locator": {"type": "Button", "occurrence": 2}}
//! {"command": "get-property", "handle": "obj-...", "name": "text"}
//! {"command": "set-property", "handle": "obj-...", "name": "text", "value": "admin"}
//! {"command": "call-method",  "handle": "obj-...", "name": "click", "args": [...]}
//! {"command": "dump",         "handle": "obj-..."}
//! {"command": "reset"}
//! {"command": "stats"}
//! ```
//!
//! Inside `locator`, `value` and `args`, an object of the exact form
//! `{"$handle": "obj-..."}` stands for the live value behind that handle.
//!
//! # Responses
//!
//! Envelope, error outcome, `null`, a list of envelopes or `{"result": ..}`
//! depending on the command. Fatal errors are returned to the transport as
//! [`BridgeError`] and never encoded as a response.

use std::time::Instant;

use serde::Deserialize;
use serde_json::{Map, Value};

use super::error::{BridgeError, BridgeResult};
use super::locator::Locator;
use super::registry::HandleRegistry;
use super::value::{HostObject, HostValue};
use super::Bridge;

/// Key of a handle reference inside a request value.
pub const HANDLE_REF_KEY: &str = "$handle";

/// A decoded driver command.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "command", rename_all = "kebab-case")]
pub enum Command {
    LocateAll {
        #[serde(default)]
        locator: Map<String, Value>,
    },
    LocateOne {
        #[serde(default)]
        locator: Map<String, Value>,
    },
    GetProperty {
        handle: String,
        name: String,
    },
    SetProperty {
        handle: String,
        name: String,
        #[serde(default)]
        value: Value,
    },
    CallMethod {
        handle: String,
        name: String,
        #[serde(default)]
        args: Option<Value>,
    },
    Dump {
        handle: String,
    },
    Reset,
    Stats,
}

impl Command {
    /// Parse a JSON text message.
    pub fn parse(message: &str) -> BridgeResult<Self> {
        let value: Value = serde_json::from_str(message)?;
        if value.get("command").and_then(Value::as_str).is_none() {
            return Err(BridgeError::Protocol(
                "message has no \"command\" field".to_string(),
            ));
        }
        serde_json::from_value(value).map_err(|e| BridgeError::Protocol(e.to_string()))
    }

    /// Wire name of the command.
    pub fn name(&self) -> &'static str {
        match self {
            Self::LocateAll { .. } => "locate-all",
            Self::LocateOne { .. } => "locate-one",
            Self::GetProperty { .. } => "get-property",
            Self::SetProperty { .. } => "set-property",
            Self::CallMethod { .. } => "call-method",
            Self::Dump { .. } => "dump",
            Self::Reset => "reset",
            Self::Stats => "stats",
        }
    }
}

/// Convert request JSON into a host value, resolving `{"$handle": id}`
/// references through the registry.
pub fn decode_value(registry: &HandleRegistry, value: &Value) -> BridgeResult<HostValue> {
    match value {
        Value::Array(items) => {
            let items = items
                .iter()
                .map(|item| decode_value(registry, item))
                .collect::<BridgeResult<Vec<_>>>()?;
            Ok(HostValue::array(items))
        }
        Value::Object(map) => {
            if let Some(handle) = handle_ref(map) {
                return registry.resolve(handle);
            }
            let mut object = HostObject::new();
            for (key, item) in map {
                object.set(key.clone(), decode_value(registry, item)?);
            }
            Ok(HostValue::object(object))
        }
        scalar => Ok(HostValue::from_json(scalar)),
    }
}

/// Convert a request locator, resolving handle references in its values.
pub fn decode_locator(registry: &HandleRegistry, map: &Map<String, Value>) -> BridgeResult<Locator> {
    let mut locator = Locator::new();
    for (key, value) in map {
        locator.insert(key.clone(), decode_value(registry, value)?);
    }
    Ok(locator)
}

fn handle_ref(map: &Map<String, Value>) -> Option<&str> {
    if map.len() != 1 {
        return None;
    }
    map.get(HANDLE_REF_KEY).and_then(Value::as_str)
}

impl Bridge {
    /// Handle one JSON text message and produce the JSON text response.
    pub fn handle_message(&mut self, message: &str) -> BridgeResult<String> {
        tracing::debug!(request = message, "Bridge request");
        let command = Command::parse(message)?;
        let response = self.execute(command)?;
        let text = serde_json::to_string(&response)?;
        tracing::debug!(response = %text, "Bridge response");
        Ok(text)
    }

    /// Execute a decoded command and produce its JSON response value.
    pub fn execute(&mut self, command: Command) -> BridgeResult<Value> {
        let name = command.name();
        let started_at = Instant::now();
        let result = self.run(command);
        if self.config().log_metrics {
            let state = if result.is_ok() { "success" } else { "fail" };
            tracing::info!(
                command = name,
                state,
                execution_time_sec = started_at.elapsed().as_secs_f64(),
                "Bridge metric"
            );
        }
        if let Err(e) = &result {
            tracing::warn!(command = name, code = e.code(), error = %e, "Bridge command failed");
        }
        result
    }

    fn run(&mut self, command: Command) -> BridgeResult<Value> {
        match command {
            Command::LocateAll { locator } => {
                let locator = decode_locator(self.registry(), &locator)?;
                Ok(serde_json::to_value(self.locate_all(&locator))?)
            }
            Command::LocateOne { locator } => {
                let locator = decode_locator(self.registry(), &locator)?;
                Ok(serde_json::to_value(self.locate_one(locator)?)?)
            }
            Command::GetProperty { handle, name } => {
                Ok(serde_json::to_value(self.get_property(&handle, &name)?)?)
            }
            Command::SetProperty { handle, name, value } => {
                let value = decode_value(self.registry(), &value)?;
                self.set_property(&handle, &name, value)?;
                Ok(Value::Null)
            }
            Command::CallMethod { handle, name, args } => {
                let args = args
                    .map(|args| decode_value(self.registry(), &args))
                    .transpose()?;
                Ok(serde_json::to_value(self.call_method(&handle, &name, args)?)?)
            }
            Command::Dump { handle } => Ok(serde_json::to_value(self.dump(&handle)?)?),
            Command::Reset => {
                self.reset();
                Ok(Value::Null)
            }
            Command::Stats => Ok(serde_json::json!({
                "handles": self.registry().len(),
                "version": crate::VERSION,
            })),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::introspection::MetaInfo;
    use crate::testing::{FakePage, FakeWrapper};
    use serde_json::json;

    fn page() -> FakePage {
        FakePage::new()
            .with(
                HostObject::native("Row")
                    .with_member("type", "Row")
                    .with_member("index", 0)
                    .with_member(
                        "select",
                        HostValue::function(|this: &HostValue, args: &[HostValue]| {
                            let flag = args.first().cloned().unwrap_or(HostValue::Bool(true));
                            this.set_member("selected", flag.clone());
                            Ok(flag)
                        }),
                    ),
            )
            .with(HostObject::native("Row").with_member("type", "Row").with_member("index", 1))
            .with(HostObject::native("Row").with_member("type", "Row").with_member("index", 2))
    }

    fn bridge() -> Bridge {
        let wrapper = FakeWrapper::new().describe("index", MetaInfo::property("int"));
        Bridge::new(page().finder()).with_wrapper(wrapper)
    }

    fn send(bridge: &mut Bridge, request: Value) -> Value {
        let response = bridge.handle_message(&request.to_string()).unwrap();
        serde_json::from_str(&response).unwrap()
    }

    fn locate(bridge: &mut Bridge, index: i32) -> String {
        let response = send(
            bridge,
            json!({"command": "locate-one", "locator": {"type": "Row", "index": index}}),
        );
        response["id"].as_str().unwrap().to_string()
    }

    #[test]
    fn test_parse_commands() {
        assert_eq!(
            Command::parse(r#"{"command": "dump", "handle": "obj-1"}"#).unwrap(),
            Command::Dump { handle: "obj-1".into() }
        );
        assert_eq!(
            Command::parse(r#"{"command": "call-method", "handle": "obj-1", "name": "f", "args": null}"#)
                .unwrap(),
            Command::CallMethod {
                handle: "obj-1".into(),
                name: "f".into(),
                args: None
            }
        );
        assert_eq!(Command::parse(r#"{"command": "reset"}"#).unwrap().name(), "reset");
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(Command::parse("not json"), Err(BridgeError::Json(_))));
        assert!(matches!(
            Command::parse(r#"{"handle": "obj-1"}"#),
            Err(BridgeError::Protocol(_))
        ));
        assert!(matches!(
            Command::parse(r#"{"command": "teleport"}"#),
            Err(BridgeError::Protocol(_))
        ));
        assert!(matches!(
            Command::parse(r#"{"command": "get-property", "handle": "obj-1"}"#),
            Err(BridgeError::Protocol(_))
        ));
    }

    #[test]
    fn test_locate_one_envelope() {
        let mut bridge = bridge();
        let response = send(
            &mut bridge,
            json!({"command": "locate-one", "locator": {"type": "Row", "index": 1}}),
        );
        assert!(response["id"].as_str().unwrap().starts_with("obj-"));
        assert_eq!(response["type"], "qobject");
        assert_eq!(response["result"], json!({"type": "Row", "index": 1}));
        assert!(response["metatype"].is_null());
    }

    #[test]
    fn test_locate_one_ambiguous_and_missing() {
        let mut bridge = bridge();
        let response = send(&mut bridge, json!({"command": "locate-one", "locator": {"type": "Row"}}));
        assert_eq!(response["error"], 1);
        assert_eq!(response["errorString"], "Found several elements");
        let listed: Value = serde_json::from_str(response["result"].as_str().unwrap()).unwrap();
        assert_eq!(listed.as_array().unwrap().len(), 3);

        let response = send(&mut bridge, json!({"command": "locate-one", "locator": {"type": "Cell"}}));
        assert!(response.is_null());
    }

    #[test]
    fn test_locate_one_occurrence() {
        let mut bridge = bridge();
        let response = send(
            &mut bridge,
            json!({"command": "locate-one", "locator": {"type": "Row", "occurrence": 3}}),
        );
        assert_eq!(response["result"]["index"], 2);

        let err = bridge
            .handle_message(
                &json!({"command": "locate-one", "locator": {"type": "Row", "occurrence": 7}})
                    .to_string(),
            )
            .unwrap_err();
        assert!(matches!(err, BridgeError::IndexOutOfRange { .. }));
    }

    #[test]
    fn test_locate_one_occurrence_as_string() {
        let mut bridge = bridge();
        let response = send(
            &mut bridge,
            json!({"command": "locate-one", "locator": {"type": "Row", "occurrence": "2"}}),
        );
        assert_eq!(response["result"]["index"], 1);
    }

    #[test]
    fn test_get_property_array_of_objects() {
        let mut bridge = bridge();
        let id = locate(&mut bridge, 0);
        let children: Vec<HostValue> = ["a", "b"]
            .into_iter()
            .map(|name| HostValue::object(HostObject::native("Item").with_member("name", name)))
            .collect();
        bridge
            .resolve(&id)
            .unwrap()
            .set_member("items", HostValue::array(children.clone()));

        let response = send(&mut bridge, json!({"command": "get-property", "handle": id, "name": "items"}));
        assert_eq!(response["type"], "array");
        let items = response["result"].as_array().unwrap();
        assert_eq!(items.len(), 2);
        for (item, child) in items.iter().zip(&children) {
            assert_eq!(item["type"], "qobject");
            let element = bridge.resolve(item["id"].as_str().unwrap()).unwrap();
            assert!(element.same_ref(child));
        }
        assert_eq!(items[1]["result"], json!({"name": "b"}));
    }

    #[test]
    fn test_locate_all_list() {
        let mut bridge = bridge();
        let response = send(&mut bridge, json!({"command": "locate-all", "locator": {"type": "Row"}}));
        let list = response.as_array().unwrap();
        assert_eq!(list.len(), 3);
        assert_eq!(bridge.registry().len(), 3);
    }

    #[test]
    fn test_get_set_round_trip() {
        let mut bridge = bridge();
        let id = locate(&mut bridge, 0);

        let response = send(
            &mut bridge,
            json!({"command": "set-property", "handle": id, "name": "label", "value": {"k": [1, 2]}}),
        );
        assert!(response.is_null());

        let response = send(&mut bridge, json!({"command": "get-property", "handle": id, "name": "label"}));
        assert_eq!(response["type"], "object");
        assert_eq!(response["result"], json!({"k": [1, 2]}));

        let response = send(&mut bridge, json!({"command": "get-property", "handle": id, "name": "index"}));
        assert_eq!(response["result"], 0);
        assert_eq!(response["metatype"], "int");
    }

    #[test]
    fn test_set_property_with_handle_reference() {
        let mut bridge = bridge();
        let first = locate(&mut bridge, 0);
        let second = locate(&mut bridge, 1);

        send(
            &mut bridge,
            json!({"command": "set-property", "handle": first, "name": "next", "value": {"$handle": second}}),
        );
        let next = bridge.get_property(&first, "next").unwrap().unwrap();
        assert!(next.result.same_ref(&bridge.resolve(&second).unwrap()));
    }

    #[test]
    fn test_call_method() {
        let mut bridge = bridge();
        let id = locate(&mut bridge, 0);

        let response = send(
            &mut bridge,
            json!({"command": "call-method", "handle": id, "name": "select", "args": false}),
        );
        assert_eq!(response["type"], "boolean");
        assert_eq!(response["result"], false);

        let response = send(&mut bridge, json!({"command": "call-method", "handle": id, "name": "select"}));
        assert_eq!(response["result"], true);

        let response = send(
            &mut bridge,
            json!({"command": "call-method", "handle": id, "name": "nonexistentMember"}),
        );
        assert!(response.is_null());
    }

    #[test]
    fn test_dump_and_stats() {
        let mut bridge = bridge();
        let id = locate(&mut bridge, 2);
        let response = send(&mut bridge, json!({"command": "dump", "handle": id}));
        assert_eq!(response, json!({"result": "{\"type\":\"Row\",\"index\":2}"}));

        let response = send(&mut bridge, json!({"command": "stats"}));
        assert_eq!(response["handles"], 1);
    }

    #[test]
    fn test_unknown_handle_is_surfaced_to_transport() {
        let mut bridge = bridge();
        for request in [
            json!({"command": "dump", "handle": "obj-missing"}),
            json!({"command": "get-property", "handle": "obj-missing", "name": "x"}),
            json!({"command": "locate-one", "locator": {"parent": {"$handle": "obj-missing"}}}),
        ] {
            let err = bridge.handle_message(&request.to_string()).unwrap_err();
            assert!(matches!(err, BridgeError::UnknownHandle(_)), "{request}");
        }
    }

    #[test]
    fn test_cyclic_dump_is_fatal() {
        let mut bridge = bridge();
        let id = locate(&mut bridge, 1);
        send(
            &mut bridge,
            json!({"command": "set-property", "handle": id, "name": "me", "value": {"$handle": id}}),
        );
        let err = bridge
            .handle_message(&json!({"command": "dump", "handle": id}).to_string())
            .unwrap_err();
        assert!(matches!(err, BridgeError::Serialization(_)));

        // The envelope encoding cuts the cycle instead of failing.
        let response = send(&mut bridge, json!({"command": "get-property", "handle": id, "name": "me"}));
        assert!(response["result"]["me"].is_null());

        bridge.resolve(&id).unwrap().as_object().unwrap().write().remove("me");
    }

    #[test]
    fn test_reset_command() {
        let mut bridge = bridge();
        let id = locate(&mut bridge, 0);
        assert!(send(&mut bridge, json!({"command": "reset"})).is_null());
        assert!(bridge
            .handle_message(&json!({"command": "dump", "handle": id}).to_string())
            .is_err());
    }

    #[test]
    fn test_decode_value_plain_object_with_handle_key_and_more() {
        let registry = HandleRegistry::new();
        let value = decode_value(&registry, &json!({"$handle": "obj-1", "other": 2})).unwrap();
        assert_eq!(value.get_member("$handle").as_str(), Some("obj-1"));
    }
}

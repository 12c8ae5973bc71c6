//! Builders for bridge command messages.

use serde_json::{json, Map, Value};

use crate::bridge::protocol::HANDLE_REF_KEY;

/// An argument or assigned value: plain data, or a live object addressed by
/// handle.
#[derive(Debug, Clone, PartialEq)]
pub enum Argument {
    Json(Value),
    Handle(String),
}

impl Argument {
    pub fn handle(handle: impl Into<String>) -> Self {
        Self::Handle(handle.into())
    }

    /// Wire form: the JSON itself, or `{"$handle": id}`.
    pub fn into_json(self) -> Value {
        match self {
            Self::Json(value) => value,
            Self::Handle(handle) => {
                let mut map = Map::new();
                map.insert(HANDLE_REF_KEY.to_string(), Value::String(handle));
                Value::Object(map)
            }
        }
    }
}

impl From<Value> for Argument {
    fn from(value: Value) -> Self {
        Self::Json(value)
    }
}

pub fn locate_all(locator: Map<String, Value>) -> Value {
    json!({"command": "locate-all", "locator": locator})
}

pub fn locate_one(locator: Map<String, Value>) -> Value {
    json!({"command": "locate-one", "locator": locator})
}

pub fn get_property(handle: &str, name: &str) -> Value {
    json!({"command": "get-property", "handle": handle, "name": name})
}

pub fn set_property(handle: &str, name: &str, value: impl Into<Argument>) -> Value {
    json!({
        "command": "set-property",
        "handle": handle,
        "name": name,
        "value": value.into().into_json(),
    })
}

/// A method call. Several arguments travel as one array argument; no
/// arguments means no `args` field at all.
pub fn call_method(handle: &str, name: &str, args: Vec<Argument>) -> Value {
    let mut request = json!({"command": "call-method", "handle": handle, "name": name});
    if !args.is_empty() {
        let args: Vec<Value> = args.into_iter().map(Argument::into_json).collect();
        request["args"] = Value::Array(args);
    }
    request
}

pub fn dump(handle: &str) -> Value {
    json!({"command": "dump", "handle": handle})
}

pub fn reset() -> Value {
    json!({"command": "reset"})
}

pub fn stats() -> Value {
    json!({"command": "stats"})
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::protocol::Command;

    fn parse(request: Value) -> Command {
        Command::parse(&request.to_string()).unwrap()
    }

    #[test]
    fn test_requests_parse_on_the_bridge_side() {
        let mut locator = Map::new();
        locator.insert("type".into(), json!("Button"));
        assert_eq!(parse(locate_one(locator.clone())).name(), "locate-one");
        assert_eq!(parse(locate_all(locator)).name(), "locate-all");
        assert_eq!(parse(get_property("obj-1", "text")).name(), "get-property");
        assert_eq!(parse(dump("obj-1")).name(), "dump");
        assert_eq!(parse(reset()), Command::Reset);
        assert_eq!(parse(stats()), Command::Stats);
    }

    #[test]
    fn test_set_property_with_handle() {
        let request = set_property("obj-1", "parent", Argument::handle("obj-2"));
        assert_eq!(request["value"], json!({"$handle": "obj-2"}));
        assert_eq!(
            parse(request),
            Command::SetProperty {
                handle: "obj-1".into(),
                name: "parent".into(),
                value: json!({"$handle": "obj-2"}),
            }
        );
    }

    #[test]
    fn test_call_method_args() {
        let request = call_method("obj-1", "click", vec![]);
        assert!(request.get("args").is_none());

        let request = call_method(
            "obj-1",
            "move",
            vec![Argument::from(json!({"x": 1})), Argument::handle("obj-7")],
        );
        assert_eq!(request["args"], json!([{"x": 1}, {"$handle": "obj-7"}]));
    }
}

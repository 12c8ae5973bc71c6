//! Structural JSON serialization of host values.
//!
//! Follows standard JSON encoding rules: object members in enumeration
//! order, functions and `undefined` omitted from objects (and written as
//! `null` inside arrays), non-finite numbers written as `null`. A cycle on
//! the current path is fatal in strict mode; shared but acyclic references
//! are serialized once per occurrence.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};

use super::error::{BridgeError, BridgeResult};
use super::value::HostValue;

/// Response of the `dump` command. `result` is `None` when the value has no
/// JSON representation (a bare function or `undefined`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DumpResult {
    pub result: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    /// Cycles are an error.
    Strict,
    /// Cycles are cut and written as `null`.
    Lossy,
}

/// Strict structural JSON of `value`. `None` for values JSON cannot
/// represent at top level.
pub fn to_json(value: &HostValue) -> BridgeResult<Option<Value>> {
    encode(value, &mut Vec::new(), Mode::Strict)
}

/// Best-effort structural JSON: never fails, cycles become `null`.
pub fn to_json_lossy(value: &HostValue) -> Value {
    encode(value, &mut Vec::new(), Mode::Lossy)
        .ok()
        .flatten()
        .unwrap_or(Value::Null)
}

/// Strict structural JSON text, as compared during duplicate-match
/// detection.
pub fn structural_string(value: &HostValue) -> BridgeResult<String> {
    let json = to_json(value)?.unwrap_or(Value::Null);
    Ok(serde_json::to_string(&json)?)
}

/// Serialize the value referenced by a handle for diagnostic dumping.
pub fn dump(value: &HostValue, pretty: bool) -> BridgeResult<DumpResult> {
    let result = match to_json(value)? {
        Some(json) if pretty => Some(serde_json::to_string_pretty(&json)?),
        Some(json) => Some(serde_json::to_string(&json)?),
        None => None,
    };
    Ok(DumpResult { result })
}

fn encode(value: &HostValue, path: &mut Vec<usize>, mode: Mode) -> BridgeResult<Option<Value>> {
    match value {
        HostValue::Undefined | HostValue::Function(_) => Ok(None),
        HostValue::Null => Ok(Some(Value::Null)),
        HostValue::Bool(b) => Ok(Some(Value::Bool(*b))),
        HostValue::Number(n) => Ok(Some(encode_number(*n))),
        HostValue::String(s) => Ok(Some(Value::String(s.clone()))),
        HostValue::Array(array) => {
            let addr = array.addr();
            if path.contains(&addr) {
                return on_cycle(mode);
            }
            path.push(addr);
            let mut items = Vec::new();
            for item in array.snapshot() {
                items.push(encode(&item, path, mode)?.unwrap_or(Value::Null));
            }
            path.pop();
            Ok(Some(Value::Array(items)))
        }
        HostValue::Object(object) => {
            let addr = object.addr();
            if path.contains(&addr) {
                return on_cycle(mode);
            }
            path.push(addr);
            let mut map = Map::new();
            for (name, member) in object.snapshot() {
                if let Some(json) = encode(&member, path, mode)? {
                    map.insert(name, json);
                }
            }
            path.pop();
            Ok(Some(Value::Object(map)))
        }
    }
}

fn on_cycle(mode: Mode) -> BridgeResult<Option<Value>> {
    match mode {
        Mode::Strict => Err(BridgeError::Serialization(
            "converting circular structure to JSON".to_string(),
        )),
        Mode::Lossy => Ok(Some(Value::Null)),
    }
}

/// Integral values print in full digits, like the page's own encoder,
/// across the whole `i64`/`u64` range. Past that range the page switches to
/// exponent form at 1e21 (`1e+21`), while serde_json writes `1e21` and
/// starts earlier; structural strings of such values are only comparable
/// among themselves.
fn encode_number(n: f64) -> Value {
    const TWO_POW_63: f64 = 9_223_372_036_854_775_808.0;
    const TWO_POW_64: f64 = 18_446_744_073_709_551_616.0;
    if n.fract() == 0.0 {
        if n == 0.0 {
            return Value::from(0);
        }
        if n.abs() < TWO_POW_63 {
            return Value::from(n as i64);
        }
        if n > 0.0 && n < TWO_POW_64 {
            return Value::from(n as u64);
        }
    }
    Number::from_f64(n).map(Value::Number).unwrap_or(Value::Null)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

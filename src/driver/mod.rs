//! Driver side of the bridge protocol.
//!
//! The automation driver never touches page objects directly. It builds
//! command messages ([`request`]), prepares locators ([`locator`]) and turns
//! responses into [`RemoteValue`]s ([`decode`]). How messages reach the page
//! is up to the caller's transport.
//!
//! ```
//! use serde_json::json;
//! use testkit_bridge::driver::{decode, request, locator::LocatorBuilder};
//!
//! let locator = LocatorBuilder::new().exact("type", "Button").build();
//! let message = request::locate_one(locator);
//! assert_eq!(message["command"], "locate-one");
//!
//! let response = json!({"id": "obj-1", "type": "qobject", "result": {}, "metatype": null});
//! let value = decode::decode(&response).unwrap();
//! assert_eq!(value.handle().unwrap().as_str(), "obj-1");
//! ```

pub mod decode;
pub mod errors;
pub mod locator;
pub mod request;

pub use decode::{decode as decode_response, decode_list, expect_member, RemoteValue};
pub use errors::DriverError;
pub use locator::LocatorBuilder;
pub use request::Argument;

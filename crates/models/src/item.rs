//! Store item representation.
//!
//! Items are schemaless attribute maps, the same shape a document store
//! returns. Records convert to and from them through serde.

use serde_json::{Map, Value};

/// A single stored document: attribute name -> value.
pub type Item = Map<String, Value>;

/// Read a string attribute; `None` when absent or not a string.
pub fn string_attr<'a>(item: &'a Item, name: &str) -> Option<&'a str> {
    item.get(name).and_then(Value::as_str)
}

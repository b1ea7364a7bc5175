//! Update expressions in the `SET ... REMOVE ...` form.

use std::collections::BTreeMap;
use std::fmt;

use models::Item;
use serde_json::Value;

/// Attribute names that cannot appear literally in an expression.
const RESERVED_WORDS: &[&str] = &["location", "name", "status", "key", "type", "token", "data"];

#[derive(Debug, Clone, PartialEq)]
struct SetClause {
    attribute: String,
    value: Value,
}

/// Ordered SET and REMOVE clauses against one item.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct UpdateExpression {
    set: Vec<SetClause>,
    remove: Vec<String>,
}

impl UpdateExpression {
    pub fn new() -> Self { Self::default() }

    /// Assign `value` to `attribute`, replacing an earlier clause for it.
    pub fn set(mut self, attribute: impl Into<String>, value: impl Into<Value>) -> Self {
        let attribute = attribute.into();
        self.remove.retain(|a| a != &attribute);
        self.set.retain(|c| c.attribute != attribute);
        self.set.push(SetClause { attribute, value: value.into() });
        self
    }

    /// Drop `attribute` from the item, replacing an earlier SET for it.
    pub fn remove(mut self, attribute: impl Into<String>) -> Self {
        let attribute = attribute.into();
        self.set.retain(|c| c.attribute != attribute);
        if !self.remove.contains(&attribute) {
            self.remove.push(attribute);
        }
        self
    }

    /// `Some(value)` sets the attribute, `None` removes it.
    pub fn set_or_remove(self, attribute: &str, value: Option<&str>) -> Self {
        match value {
            Some(v) => self.set(attribute, v),
            None => self.remove(attribute),
        }
    }

    pub fn is_empty(&self) -> bool { self.set.is_empty() && self.remove.is_empty() }

    pub fn removed(&self) -> &[String] { &self.remove }

    /// Placeholders for reserved attribute names, e.g. `#loc -> location`.
    pub fn attribute_names(&self) -> BTreeMap<String, String> {
        self.set
            .iter()
            .map(|c| c.attribute.as_str())
            .chain(self.remove.iter().map(String::as_str))
            .filter_map(|a| name_placeholder(a).map(|p| (p, a.to_string())))
            .collect()
    }

    /// Value placeholders, one per SET clause: `:attribute -> value`.
    pub fn attribute_values(&self) -> BTreeMap<String, Value> {
        self.set.iter().map(|c| (format!(":{}", c.attribute), c.value.clone())).collect()
    }

    /// Apply the clauses in place and return the attributes written (UPDATED_NEW).
    pub fn apply(&self, item: &mut Item) -> Item {
        let mut updated = Item::new();
        for clause in &self.set {
            item.insert(clause.attribute.clone(), clause.value.clone());
            updated.insert(clause.attribute.clone(), clause.value.clone());
        }
        for attribute in &self.remove {
            item.remove(attribute);
        }
        updated
    }
}

fn name_placeholder(attribute: &str) -> Option<String> {
    if RESERVED_WORDS.contains(&attribute) {
        Some(format!("#{}", &attribute[..attribute.len().min(3)]))
    } else {
        None
    }
}

fn expression_name(attribute: &str) -> String {
    name_placeholder(attribute).unwrap_or_else(|| attribute.to_string())
}

impl fmt::Display for UpdateExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.set.is_empty() {
            let clauses: Vec<String> = self
                .set
                .iter()
                .map(|c| format!("{} = :{}", expression_name(&c.attribute), c.attribute))
                .collect();
            write!(f, "SET {}", clauses.join(", "))?;
        }
        if !self.remove.is_empty() {
            if !self.set.is_empty() {
                f.write_str(" ")?;
            }
            let names: Vec<String> = self.remove.iter().map(|a| expression_name(a)).collect();
            write!(f, "REMOVE {}", names.join(", "))?;
        }
        Ok(())
    }
}

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

use crate::core::identity::create_anonymous_user_key;

/// Flag values exactly as the evaluation service returns them, keyed by the
/// service's own flag names.
pub type RawFlags = HashMap<String, serde_json::Value>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FlagValue {
    Bool(bool),
    String(String),
    Number(f64),
}

impl FlagValue {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            FlagValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_string(&self) -> Option<&str> {
        match self {
            FlagValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            FlagValue::Number(n) => Some(*n),
            _ => None,
        }
    }

}

impl From<bool> for FlagValue {
    fn from(value: bool) -> Self {
        FlagValue::Bool(value)
    }
}

impl From<String> for FlagValue {
    fn from(value: String) -> Self {
        FlagValue::String(value)
    }
}

impl From<&str> for FlagValue {
    fn from(value: &str) -> Self {
        FlagValue::String(value.to_string())
    }
}

impl From<f64> for FlagValue {
    fn from(value: f64) -> Self {
        FlagValue::Number(value)
    }
}

impl From<i64> for FlagValue {
    fn from(value: i64) -> Self {
        FlagValue::Number(value as f64)
    }
}

impl From<i32> for FlagValue {
    fn from(value: i32) -> Self {
        FlagValue::Number(value as f64)
    }
}

impl From<FlagValue> for serde_json::Value {
    fn from(value: FlagValue) -> Self {
        match value {
            FlagValue::Bool(b) => serde_json::Value::Bool(b),
            FlagValue::String(s) => serde_json::Value::String(s),
            FlagValue::Number(n) => serde_json::Number::from_f64(n)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
        }
    }
}

/// Normalized flags for one user, keyed by camel-cased flag name.
///
/// A flag set is always replaced as a whole; there is no partial merge.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FlagSet(BTreeMap<String, FlagValue>);

impl FlagSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&FlagValue> {
        self.0.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    /// Inserts a value, returning the one it replaced.
    pub fn insert(
        &mut self,
        name: impl Into<String>,
        value: impl Into<FlagValue>,
    ) -> Option<FlagValue> {
        self.0.insert(name.into(), value.into())
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<FlagValue>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FlagValue)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl FromIterator<(String, FlagValue)> for FlagSet {
    fn from_iter<I: IntoIterator<Item = (String, FlagValue)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl IntoIterator for FlagSet {
    type Item = (String, FlagValue);
    type IntoIter = std::collections::btree_map::IntoIter<String, FlagValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdapterStatus {
    pub is_ready: bool,
    pub is_configured: bool,
}

impl AdapterStatus {
    pub fn ready() -> Self {
        Self {
            is_ready: true,
            is_configured: true,
        }
    }
}

/// The identity flags are evaluated for.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct User {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    #[serde(flatten)]
    pub attributes: HashMap<String, serde_json::Value>,
}

impl User {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_key(key: impl Into<String>) -> Self {
        Self {
            key: Some(key.into()),
            attributes: HashMap::new(),
        }
    }

    pub fn attribute(
        mut self,
        name: impl Into<String>,
        value: impl Into<serde_json::Value>,
    ) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    pub fn get(&self, name: &str) -> Option<&serde_json::Value> {
        self.attributes.get(name)
    }

    pub fn is_anonymous(&self) -> bool {
        self.key.as_deref().map_or(true, str::is_empty)
    }

    /// Returns the user with an anonymous key assigned if it had none.
    pub fn with_resolved_key(mut self) -> Self {
        if self.is_anonymous() {
            self.key = Some(create_anonymous_user_key());
        }
        self
    }

    pub fn key_or_empty(&self) -> &str {
        self.key.as_deref().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolved_key_keeps_existing() {
        let user = User::with_key("foo-user").with_resolved_key();
        assert_eq!(user.key.as_deref(), Some("foo-user"));
    }

    #[test]
    fn test_resolved_key_replaces_empty() {
        let user = User {
            key: Some(String::new()),
            attributes: HashMap::new(),
        };
        let resolved = user.with_resolved_key();
        assert!(!resolved.is_anonymous());
    }

    #[test]
    fn test_user_attributes_flatten() {
        let user = User::with_key("foo-user").attribute("group", "foo-group");
        let json = serde_json::to_value(&user).unwrap();

        assert_eq!(json["key"], "foo-user");
        assert_eq!(json["group"], "foo-group");
    }

    #[test]
    fn test_status_serializes_camel_case() {
        let json = serde_json::to_value(AdapterStatus::ready()).unwrap();
        assert_eq!(json, serde_json::json!({"isReady": true, "isConfigured": true}));
    }
}

//! Flag normalization.
//!
//! Evaluation services return flag names in whatever casing their operators
//! chose (`new-checkout`, `New Checkout`, `new_checkout`) and values in a
//! loosely typed form (`"on"`, `"off"`, `null`, numbers). Everything handed
//! to hosts and subscribers goes through this module first so that consumers
//! only ever see lower-camel-case names and typed values.
//!
//! All functions are pure and idempotent: normalizing an already normalized
//! name or value returns it unchanged.

use crate::types::{FlagSet, FlagValue, RawFlags};

const TREATMENT_ON: &str = "on";
const TREATMENT_OFF: &str = "off";

/// Converts a raw flag name to lower camel case.
///
/// The name is split on every non-alphanumeric character. The first segment
/// gets a lower-case first letter, each following segment an upper-case
/// first letter; all other characters are kept as they are.
///
/// ```
/// use flagcast::normalizer::camel_case_name;
///
/// assert_eq!(camel_case_name("flag-b-c"), "flagBC");
/// assert_eq!(camel_case_name("a flag"), "aFlag");
/// assert_eq!(camel_case_name("aFlag"), "aFlag");
/// ```
pub fn camel_case_name(raw: &str) -> String {
    let mut name = String::with_capacity(raw.len());

    for (index, segment) in raw
        .split(|c: char| !c.is_alphanumeric())
        .filter(|segment| !segment.is_empty())
        .enumerate()
    {
        let mut chars = segment.chars();
        if let Some(first) = chars.next() {
            if index == 0 {
                name.extend(first.to_lowercase());
            } else {
                name.extend(first.to_uppercase());
            }
            name.push_str(chars.as_str());
        }
    }

    name
}

/// Maps a raw treatment to a typed flag value.
///
/// `null` becomes `false`, the treatments `"on"`/`"off"` become `true`/`false`.
/// Any other string, number or boolean passes through. Arrays and objects
/// have no flag representation and are kept as their JSON text.
pub fn normalize_value(raw: &serde_json::Value) -> FlagValue {
    match raw {
        serde_json::Value::Null => FlagValue::Bool(false),
        serde_json::Value::Bool(b) => FlagValue::Bool(*b),
        serde_json::Value::String(s) if s == TREATMENT_ON => FlagValue::Bool(true),
        serde_json::Value::String(s) if s == TREATMENT_OFF => FlagValue::Bool(false),
        serde_json::Value::String(s) => FlagValue::String(s.clone()),
        serde_json::Value::Number(n) => match n.as_f64() {
            Some(n) => FlagValue::Number(n),
            None => FlagValue::String(n.to_string()),
        },
        other => FlagValue::String(other.to_string()),
    }
}

/// Normalizes a single (name, value) pair.
pub fn normalize_flag(raw_name: &str, raw_value: &serde_json::Value) -> (String, FlagValue) {
    (camel_case_name(raw_name), normalize_value(raw_value))
}

/// Camel-cases every name of a raw flag map. Values are only converted to
/// their typed form; treatment mapping is left to [`normalize_flags`].
pub fn camel_case_flags(raw: &RawFlags) -> FlagSet {
    collect_sorted(raw, |name, value| {
        let value = match value {
            serde_json::Value::Null => FlagValue::Bool(false),
            serde_json::Value::Bool(b) => FlagValue::Bool(*b),
            serde_json::Value::String(s) => FlagValue::String(s.clone()),
            serde_json::Value::Number(n) => FlagValue::Number(n.as_f64().unwrap_or_default()),
            other => FlagValue::String(other.to_string()),
        };
        (camel_case_name(name), value)
    })
}

/// Fully normalizes names and values of a raw flag map.
pub fn normalize_flags(raw: &RawFlags) -> FlagSet {
    collect_sorted(raw, |name, value| normalize_flag(name, value))
}

// Raw names are visited in sorted order so that names colliding after
// normalization resolve the same way every time: the later raw name wins.
fn collect_sorted<F>(raw: &RawFlags, mut normalize: F) -> FlagSet
where
    F: FnMut(&str, &serde_json::Value) -> (String, FlagValue),
{
    let mut names: Vec<&String> = raw.keys().collect();
    names.sort();

    let mut flags = FlagSet::new();
    for raw_name in names {
        let (name, value) = normalize(raw_name, &raw[raw_name]);
        if flags.insert(name.clone(), value).is_some() {
            tracing::debug!(
                flag = %name,
                raw = %raw_name,
                "Flag name collision after normalization"
            );
        }
    }
    flags
}

//! Lenient field deserializers used by the SIRI model.
//!
//! Servers disagree on scalar encodings (XML carries everything as text, JSON
//! producers mix numbers and numeric strings) and on whether a one-element
//! list is written as a list at all.

use std::fmt::Display;
use std::str::FromStr;

use serde::Deserialize;
use serde::de::{self, DeserializeOwned, Deserializer};
use serde_json::Value;

/// Accepts a single value in place of a one-element array. Absent or null
/// yields an empty list.
pub fn one_or_many<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(items @ Value::Array(_)) => {
            Vec::<T>::deserialize(items).map_err(de::Error::custom)
        }
        Some(item) => T::deserialize(item)
            .map(|item| vec![item])
            .map_err(de::Error::custom),
    }
}

/// Accepts either the native JSON scalar or its textual form.
pub fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + FromStr,
    T::Err: Display,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(text)) => text
            .trim()
            .parse()
            .map(Some)
            .map_err(|e| de::Error::custom(format!("invalid value '{text}': {e}"))),
        Some(native) => T::deserialize(native)
            .map(Some)
            .map_err(de::Error::custom),
    }
}

/// Accepts strings, numbers and booleans as text.
pub fn text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(
        match Option::<Value>::deserialize(deserializer)? {
            Some(Value::String(s)) => Some(s),
            Some(Value::Number(n)) => Some(n.to_string()),
            Some(Value::Bool(b)) => Some(b.to_string()),
            Some(Value::Null) | None => None,
            Some(other) => {
                return Err(de::Error::custom(format!(
                    "expected a scalar, found {other}"
                )));
            }
        },
    )
}

//! Tracking parameters attached to a short link.

use indexmap::IndexMap;
use serde::de::{self, MapAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Upper bound on the number of parameters a link may carry.
pub const MAX_TRACKING_PARAMS: usize = 64;

/// Ordered name → value mapping appended to the destination on redirect
/// (e.g. `utm_source=newsletter`).
///
/// Keys are unique and insertion order is preserved, so the composed query
/// string is stable across requests. Serializes as a JSON object.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(transparent)]
pub struct TrackingParams(IndexMap<String, String>);

impl TrackingParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a parameter, keeping the position of an existing key and
    /// replacing its value.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.0.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Order matters: the same pairs in a different order compose a different
/// query string.
impl PartialEq for TrackingParams {
    fn eq(&self, other: &Self) -> bool {
        self.0.iter().eq(other.0.iter())
    }
}

impl Eq for TrackingParams {}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for TrackingParams {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut params = Self::new();
        for (k, v) in iter {
            params.insert(k, v);
        }
        params
    }
}

impl<'de> Deserialize<'de> for TrackingParams {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct ParamsVisitor;

        impl<'de> Visitor<'de> for ParamsVisitor {
            type Value = TrackingParams;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                write!(
                    f,
                    "an object of at most {MAX_TRACKING_PARAMS} string parameter names to string values"
                )
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let capacity = access.size_hint().unwrap_or(0).min(MAX_TRACKING_PARAMS);
                let mut entries = IndexMap::with_capacity(capacity);

                while let Some((key, value)) = access.next_entry::<String, String>()? {
                    if key.is_empty() {
                        return Err(de::Error::custom("tracking parameter names must not be empty"));
                    }
                    if entries.contains_key(&key) {
                        return Err(de::Error::custom(format!(
                            "duplicate tracking parameter `{key}`"
                        )));
                    }
                    if entries.len() == MAX_TRACKING_PARAMS {
                        return Err(de::Error::custom(format!(
                            "at most {MAX_TRACKING_PARAMS} tracking parameters are allowed"
                        )));
                    }
                    entries.insert(key, value);
                }

                Ok(TrackingParams(entries))
            }
        }

        deserializer.deserialize_map(ParamsVisitor)
    }
}

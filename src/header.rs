//! Case-insensitive, multi-valued request/response headers.

use http::header::{AsHeaderName, GetAll, IntoHeaderName, Iter};
use http::{HeaderMap, HeaderValue};

/// An ordered mapping from case-insensitive field names to value sequences.
///
/// [`Header::set`] replaces every existing value for a key; use
/// [`Header::append`] to add to an existing sequence. Invalid names or
/// values are dropped silently, mirroring outbound header handling.
#[derive(Debug, Clone, Default)]
pub struct Header(HeaderMap);

impl Header {
    pub fn new() -> Self {
        Self(HeaderMap::new())
    }

    /// Set a field, replacing all previously set values for the key.
    pub fn set<K, V>(&mut self, key: K, value: V)
    where
        K: IntoHeaderName,
        V: TryInto<HeaderValue>,
    {
        if let Ok(val) = value.try_into() {
            self.0.insert(key, val);
        }
    }

    /// Append a value to the key's sequence without disturbing prior values.
    pub fn append<K, V>(&mut self, key: K, value: V)
    where
        K: IntoHeaderName,
        V: TryInto<HeaderValue>,
    {
        if let Ok(val) = value.try_into() {
            self.0.append(key, val);
        }
    }

    /// First value for the key, if any.
    pub fn get<K: AsHeaderName>(&self, key: K) -> Option<&HeaderValue> {
        self.0.get(key)
    }

    /// All values for the key, in insertion order.
    pub fn get_all<K: AsHeaderName>(&self, key: K) -> GetAll<'_, HeaderValue> {
        self.0.get_all(key)
    }

    pub fn contains_key<K: AsHeaderName>(&self, key: K) -> bool {
        self.0.contains_key(key)
    }

    pub fn iter(&self) -> Iter<'_, HeaderValue> {
        self.0.iter()
    }

    /// Number of stored values (not distinct keys).
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_map(&self) -> &HeaderMap {
        &self.0
    }

    pub fn into_inner(self) -> HeaderMap {
        self.0
    }
}

impl From<HeaderMap> for Header {
    fn from(map: HeaderMap) -> Self {
        Self(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_replaces_all_values() {
        let mut h = Header::new();
        h.append("x-token", "first");
        h.append("x-token", "second");
        assert_eq!(h.get_all("x-token").iter().count(), 2);

        h.set("x-token", "final");
        let values: Vec<_> = h.get_all("x-token").iter().collect();
        assert_eq!(values, vec!["final"]);
    }

    #[test]
    fn test_case_insensitive_lookup() {
        let mut h = Header::new();
        h.set("User-Agent", "webpool");
        assert_eq!(h.get("user-agent").unwrap(), "webpool");
    }

    #[test]
    fn test_invalid_value_dropped() {
        let mut h = Header::new();
        h.set("x-bad", "line\nbreak");
        assert!(h.get("x-bad").is_none());
    }
}

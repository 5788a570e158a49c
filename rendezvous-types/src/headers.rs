//! Declared header contracts.

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::btree_map::{self, BTreeMap};

/// An immutable mapping of header name to header value.
///
/// A session carries two of these: the headers a future sink should be sent
/// and the headers the source's response should carry. The set is a contract
/// only; nothing here checks that names or values are valid HTTP.
///
/// Keys are kept sorted so serialized output is stable. A JSON `null` is
/// accepted and treated as an empty set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct HeaderSet(BTreeMap<String, String>);

impl HeaderSet {
    /// Create an empty header set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a header value by exact name.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    /// Whether a header with this exact name is declared.
    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    /// Iterate over `(name, value)` pairs in name order.
    pub fn iter(&self) -> Iter<'_> {
        Iter(self.0.iter())
    }

    /// Number of declared headers.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether no headers are declared.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<BTreeMap<String, String>> for HeaderSet {
    fn from(map: BTreeMap<String, String>) -> Self {
        Self(map)
    }
}

impl<K, V> FromIterator<(K, V)> for HeaderSet
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

impl<'de> Deserialize<'de> for HeaderSet {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let map = Option::<BTreeMap<String, String>>::deserialize(deserializer)?;
        Ok(Self(map.unwrap_or_default()))
    }
}

/// Iterator over the entries of a [`HeaderSet`].
#[derive(Debug, Clone)]
pub struct Iter<'a>(btree_map::Iter<'a, String, String>);

impl<'a> Iterator for Iter<'a> {
    type Item = (&'a str, &'a str);

    fn next(&mut self) -> Option<Self::Item> {
        self.0.next().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.0.size_hint()
    }
}

impl<'a> IntoIterator for &'a HeaderSet {
    type Item = (&'a str, &'a str);
    type IntoIter = Iter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

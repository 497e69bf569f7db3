use crate::errors::*;
use serde::de::{self, Deserialize, Deserializer, IgnoredAny, MapAccess, SeqAccess, Visitor};
use serde_json::Value;
use std::fmt;
use std::marker::PhantomData;
use std::slice;

/// Vulnerability report as returned by the service in json format.
///
/// The document is kept as-is, in the order the service sent it. The typed
/// view used for rendering is only built on request.
#[derive(Debug, Clone, PartialEq)]
pub struct Vulnerabilities(Value);

impl Default for Vulnerabilities {
    fn default() -> Self {
        Vulnerabilities(Value::Array(Vec::new()))
    }
}

impl Vulnerabilities {
    pub fn from_json(body: &str) -> Result<Vulnerabilities> {
        serde_json::from_str(body)
            .map(Vulnerabilities)
            .map_err(|err| Error::runtime(format!("Failed to parse vulnerability report: {}", err)))
    }

    pub fn raw(&self) -> &Value {
        &self.0
    }

    pub fn dependencies(&self) -> Result<Entries<Dependency>> {
        Entries::deserialize(&self.0)
            .map_err(|err| Error::runtime(format!("Unexpected vulnerability report: {}", err)))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize)]
pub struct Dependency {
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub advisories: Entries<Advisory>,
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize)]
pub struct Advisory {
    #[serde(default)]
    pub cve: Option<String>,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub link: String,
}

/// Keyed entries in document order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entries<V>(Vec<(String, V)>);

impl<V> Default for Entries<V> {
    fn default() -> Self {
        Entries(Vec::new())
    }
}

impl<V> Entries<V> {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> slice::Iter<'_, (String, V)> {
        self.0.iter()
    }

    pub fn values(&self) -> impl Iterator<Item = &V> {
        self.0.iter().map(|(_, value)| value)
    }
}

impl<'de, V: Deserialize<'de>> Deserialize<'de> for Entries<V> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(EntriesVisitor(PhantomData))
    }
}

struct EntriesVisitor<V>(PhantomData<V>);

impl<'de, V: Deserialize<'de>> Visitor<'de> for EntriesVisitor<V> {
    type Value = Entries<V>;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a map or an empty list")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
        let mut entries = Vec::new();
        while let Some(entry) = map.next_entry::<String, V>()? {
            entries.push(entry);
        }
        Ok(Entries(entries))
    }

    // empty maps show up as `[]` in the service output
    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Self::Value, A::Error> {
        if seq.next_element::<IgnoredAny>()?.is_some() {
            return Err(de::Error::invalid_length(1, &self));
        }
        Ok(Entries::default())
    }
}

//! Bound named parameters for `{name:Type}` placeholders.

use crate::schema::NativeValue;

/// Ordered set of named parameters. Re-binding a name replaces its value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BoundParams {
    entries: Vec<(String, NativeValue)>,
}

impl BoundParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bind(&mut self, name: impl Into<String>, value: impl Into<NativeValue>) {
        let name = name.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = value,
            None => self.entries.push((name, value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&NativeValue> {
        self.entries.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &NativeValue)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v))
    }
}

impl FromIterator<(String, NativeValue)> for BoundParams {
    fn from_iter<I: IntoIterator<Item = (String, NativeValue)>>(iter: I) -> Self {
        let mut params = BoundParams::new();
        for (name, value) in iter {
            params.bind(name, value);
        }
        params
    }
}

impl From<serde_json::Map<String, serde_json::Value>> for BoundParams {
    fn from(map: serde_json::Map<String, serde_json::Value>) -> Self {
        map.into_iter()
            .map(|(k, v)| (k, NativeValue::Json(v)))
            .collect()
    }
}

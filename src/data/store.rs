use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// A resolved literal kept between steps
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DataValue {
    Number(i64),
    Text(String),
}

impl DataValue {
    pub fn as_text(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for DataValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataValue::Number(n) => write!(f, "{}", n),
            DataValue::Text(s) => f.write_str(s),
        }
    }
}

impl From<&str> for DataValue {
    fn from(s: &str) -> Self {
        DataValue::Text(s.to_string())
    }
}

impl From<String> for DataValue {
    fn from(s: String) -> Self {
        DataValue::Text(s)
    }
}

impl From<i64> for DataValue {
    fn from(n: i64) -> Self {
        DataValue::Number(n)
    }
}

/// Named values generated or extracted during one scenario.
///
/// Each scenario gets its own store, so two scenarios that pick the same key
/// never see each other's values.
#[derive(Debug, Default, Clone)]
pub struct TestData {
    fields: HashMap<String, DataValue>,
}

impl TestData {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite
    pub fn set_field(&mut self, key: impl Into<String>, value: impl Into<DataValue>) {
        let key = key.into();
        let value = value.into();
        if let Some(previous) = self.fields.insert(key.clone(), value.clone()) {
            if previous != value {
                log::debug!("Test data '{}' overwritten: {} -> {}", key, previous, value);
            }
        }
    }

    /// `None` means "not a stored reference", not an error
    pub fn get_field(&self, key: &str) -> Option<&DataValue> {
        self.fields.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    pub fn remove(&mut self, key: &str) -> Option<DataValue> {
        self.fields.remove(key)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn clear(&mut self) {
        self.fields.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &DataValue)> {
        self.fields.iter()
    }

    /// Load string pairs (data rows, header env) without overwriting logs
    pub fn extend<I, K, V>(&mut self, entries: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<DataValue>,
    {
        for (k, v) in entries {
            self.fields.insert(k.into(), v.into());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_then_get() {
        let mut data = TestData::new();
        data.set_field("k", "v");
        assert_eq!(data.get_field("k"), Some(&DataValue::from("v")));
    }

    #[test]
    fn test_overwrite() {
        let mut data = TestData::new();
        data.set_field("k", "v");
        data.set_field("k", "v2");
        assert_eq!(data.get_field("k").map(|v| v.to_string()).as_deref(), Some("v2"));
        assert_eq!(data.len(), 1);
    }

    #[test]
    fn test_missing_key_is_none() {
        let data = TestData::new();
        assert!(data.get_field("nope").is_none());
        assert!(data.is_empty());
    }

    #[test]
    fn test_numbers_display_as_text() {
        let mut data = TestData::new();
        data.set_field("count", 42i64);
        assert_eq!(data.get_field("count").map(DataValue::as_text).as_deref(), Some("42"));
    }

    #[test]
    fn test_stores_are_independent() {
        let mut first = TestData::new();
        let second = TestData::new();
        first.set_field("orderId", "123");
        assert!(second.get_field("orderId").is_none());
    }
}

//! Value types for cells
//!
//! Cells hold opaque byte strings. Typed encodings are the caller's concern;
//! the store never interprets a value.

use serde::{Deserialize, Serialize};

/// Cell value
///
/// An opaque byte string. An empty value is a valid, present value and is
/// distinct from an absent cell.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Value(Vec<u8>);

impl Value {
    /// Create a value from raw bytes
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Value(bytes.into())
    }

    /// The empty (but present) value
    pub fn empty() -> Self {
        Value(Vec::new())
    }

    /// Get raw bytes
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Consume the value, returning its bytes
    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }

    /// Try to view the value as UTF-8
    pub fn as_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.0).ok()
    }

    /// Length in bytes
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check if the value has zero bytes
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value(s.as_bytes().to_vec())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value(s.into_bytes())
    }
}

impl From<Vec<u8>> for Value {
    fn from(bytes: Vec<u8>) -> Self {
        Value(bytes)
    }
}

impl From<&[u8]> for Value {
    fn from(bytes: &[u8]) -> Self {
        Value(bytes.to_vec())
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", String::from_utf8_lossy(&self.0))
    }
}

/// A value together with the commit version that produced it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionedValue {
    /// The stored value
    pub value: Value,
    /// Commit version that wrote this value
    pub version: u64,
    /// Wall-clock time (unix seconds) when the value was applied
    pub timestamp: i64,
}

impl VersionedValue {
    /// Create a new versioned value
    pub fn new(value: Value, version: u64, timestamp: i64) -> Self {
        Self {
            value,
            version,
            timestamp,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_value_is_present() {
        let v = Value::empty();
        assert!(v.is_empty());
        assert_eq!(v, Value::from(""));
        assert_eq!(Some(v), Some(Value::default()));
    }

    #[test]
    fn test_as_str() {
        assert_eq!(Value::from("42").as_str(), Some("42"));
        assert_eq!(Value::new(vec![0xff, 0xfe]).as_str(), None);
    }

    #[test]
    fn test_bytes_and_string_agree() {
        assert_eq!(Value::from("abc"), Value::from(b"abc".to_vec()));
        assert_eq!(Value::from("abc").len(), 3);
    }
}

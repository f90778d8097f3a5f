//! Core types for the cell store
//!
//! This module defines the fundamental addressing types used throughout the system:
//! - [`Row`]: Row identifier (arbitrary bytes)
//! - [`Column`]: Column family + qualifier
//! - [`KeySpace`]: Reserved namespaces inside the store
//! - [`Key`]: Fully-qualified storage key

use serde::{Deserialize, Serialize};

/// Row identifier
///
/// Rows are arbitrary byte sequences. They order lexicographically by byte.
///
/// # Examples
///
/// ```
/// use cascade_core::types::Row;
///
/// let row = Row::from("r1");
/// assert_eq!(row.as_bytes(), b"r1");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Row(Vec<u8>);

impl Row {
    /// Create a row from raw bytes
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Row(bytes.into())
    }

    /// Get raw bytes representation
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Consume the row, returning its bytes
    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }
}

impl From<&str> for Row {
    fn from(s: &str) -> Self {
        Row(s.as_bytes().to_vec())
    }
}

impl From<String> for Row {
    fn from(s: String) -> Self {
        Row(s.into_bytes())
    }
}

impl From<Vec<u8>> for Row {
    fn from(bytes: Vec<u8>) -> Self {
        Row(bytes)
    }
}

impl From<&[u8]> for Row {
    fn from(bytes: &[u8]) -> Self {
        Row(bytes.to_vec())
    }
}

impl From<&Row> for Row {
    fn from(row: &Row) -> Self {
        row.clone()
    }
}

impl std::fmt::Display for Row {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", String::from_utf8_lossy(&self.0))
    }
}

/// Column identifier: a (family, qualifier) pair
///
/// Columns are ordered by family, then qualifier.
///
/// # Examples
///
/// ```
/// use cascade_core::types::Column;
///
/// let col = Column::new("stat", "count");
/// assert_eq!(col.to_string(), "stat:count");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Column {
    /// Column family
    pub family: Vec<u8>,
    /// Column qualifier within the family
    pub qualifier: Vec<u8>,
}

impl Column {
    /// Create a new column
    pub fn new(family: impl AsRef<[u8]>, qualifier: impl AsRef<[u8]>) -> Self {
        Self {
            family: family.as_ref().to_vec(),
            qualifier: qualifier.as_ref().to_vec(),
        }
    }
}

impl std::fmt::Display for Column {
    /// Display column in the format: family:qualifier
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}:{}",
            String::from_utf8_lossy(&self.family),
            String::from_utf8_lossy(&self.qualifier)
        )
    }
}

/// Reserved namespaces inside the store
///
/// Application cells live in [`KeySpace::Data`]. Pending-work markers live in
/// [`KeySpace::Notification`], which application code never addresses directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum KeySpace {
    /// Application data cells
    Data = 0,
    /// Notification entries, one per pending (row, observed column)
    Notification = 1,
}

impl KeySpace {
    /// Short name used in logs and debug output
    pub fn as_str(&self) -> &'static str {
        match self {
            KeySpace::Data => "data",
            KeySpace::Notification => "ntfy",
        }
    }
}

/// Fully-qualified storage key
///
/// Keys are ordered by space, then row, then column. All notification
/// entries therefore sort after all data cells.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Key {
    /// Namespace of this key
    pub space: KeySpace,
    /// Row component
    pub row: Row,
    /// Column component
    pub column: Column,
}

impl Key {
    /// Create a key in an explicit space
    pub fn new(space: KeySpace, row: Row, column: Column) -> Self {
        Self { space, row, column }
    }

    /// Create a data-cell key
    pub fn data(row: Row, column: Column) -> Self {
        Self::new(KeySpace::Data, row, column)
    }

    /// Create a notification-entry key for (row, column)
    pub fn notification(row: Row, column: Column) -> Self {
        Self::new(KeySpace::Notification, row, column)
    }

    /// Check whether this key addresses an application cell
    pub fn is_data(&self) -> bool {
        self.space == KeySpace::Data
    }

    /// Check whether this key lies in `space` and `row`
    pub fn in_row(&self, space: KeySpace, row: &Row) -> bool {
        self.space == space && &self.row == row
    }
}

impl std::fmt::Display for Key {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}/{}", self.space.as_str(), self.row, self.column)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_from_variants() {
        let a = Row::from("r1");
        let b = Row::from(String::from("r1"));
        let c = Row::from(b"r1".to_vec());
        let d = Row::from(&b"r1"[..]);
        assert_eq!(a, b);
        assert_eq!(b, c);
        assert_eq!(c, d);
    }

    #[test]
    fn test_row_ordering_is_bytewise() {
        assert!(Row::from("a") < Row::from("b"));
        assert!(Row::from("a") < Row::from("aa"));
        assert!(Row::new(vec![0x00]) < Row::new(vec![0xff]));
    }

    #[test]
    fn test_column_display() {
        let col = Column::new("export", "count");
        assert_eq!(col.to_string(), "export:count");
    }

    #[test]
    fn test_column_ordering() {
        let a = Column::new("export", "check");
        let b = Column::new("export", "count");
        let c = Column::new("stat", "count");
        assert!(a < b, "qualifier breaks ties within a family");
        assert!(b < c, "family orders first");
    }

    #[test]
    fn test_notification_space_sorts_after_data() {
        let row = Row::from("zzz");
        let col = Column::new("z", "z");
        let data = Key::data(row.clone(), col.clone());
        let ntfy = Key::notification(Row::from("a"), Column::new("a", "a"));
        assert!(data < ntfy);
    }

    #[test]
    fn test_key_helpers() {
        let row = Row::from("r1");
        let key = Key::data(row.clone(), Column::new("f", "q"));
        assert!(key.is_data());
        assert!(key.in_row(KeySpace::Data, &row));
        assert!(!key.in_row(KeySpace::Notification, &row));
        assert_eq!(key.to_string(), "data/r1/f:q");
    }
}

//! Observed-column declarations
//!
//! An observer binds to exactly one column with a delivery strength.

use crate::types::Column;
use serde::{Deserialize, Serialize};

/// Notification delivery guarantee
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NotificationType {
    /// Best-effort single trigger; overlapping writes collapse into the latest
    Weak,
    /// The observer commits before the notification is retired
    Strong,
}

impl NotificationType {
    /// Check for [`NotificationType::Strong`]
    pub fn is_strong(&self) -> bool {
        matches!(self, NotificationType::Strong)
    }
}

impl std::fmt::Display for NotificationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NotificationType::Weak => write!(f, "WEAK"),
            NotificationType::Strong => write!(f, "STRONG"),
        }
    }
}

/// A column watched by an observer, with its notification strength
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ObservedColumn {
    /// The watched column
    pub column: Column,
    /// Delivery guarantee for writes to `column`
    pub notification: NotificationType,
}

impl ObservedColumn {
    /// Create a new observed column
    pub fn new(column: Column, notification: NotificationType) -> Self {
        Self {
            column,
            notification,
        }
    }

    /// Observe `column` with STRONG notifications
    pub fn strong(column: Column) -> Self {
        Self::new(column, NotificationType::Strong)
    }

    /// Observe `column` with WEAK notifications
    pub fn weak(column: Column) -> Self {
        Self::new(column, NotificationType::Weak)
    }
}

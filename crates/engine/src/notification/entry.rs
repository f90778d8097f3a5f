//! Encoded notification entry value

use cascade_core::error::{Error, Result};
use cascade_core::observed::NotificationType;
use cascade_core::value::Value;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Value stored under a notification key
///
/// The entry's version (the commit that last marked it) lives in the store,
/// not in the value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationEntry {
    /// Strength of the binding when the entry was marked
    pub strength: NotificationType,
}

impl NotificationEntry {
    /// Create an entry
    pub fn new(strength: NotificationType) -> Self {
        Self { strength }
    }

    /// Encode as MessagePack
    pub fn encode(&self) -> Result<Value> {
        rmp_serde::to_vec(self)
            .map(Value::from)
            .map_err(|e| Error::Serialization(e.to_string()))
    }

    /// Decode from MessagePack
    pub fn decode(value: &Value) -> Result<Self> {
        rmp_serde::from_slice(value.as_bytes()).map_err(|e| Error::Serialization(e.to_string()))
    }

    /// Decode, treating an unreadable value as a STRONG entry
    pub fn decode_or_strong(value: &Value) -> Self {
        match Self::decode(value) {
            Ok(entry) => entry,
            Err(e) => {
                warn!(error = %e, "Undecodable notification entry, treating as STRONG");
                Self::new(NotificationType::Strong)
            }
        }
    }
}

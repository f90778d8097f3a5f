//! Column → observer dispatch table
//!
//! Built once at startup and immutable afterwards, so lookups take no locks.

use super::Observer;
use cascade_core::error::{Error, Result};
use cascade_core::observed::{NotificationType, ObservedColumn};
use cascade_core::types::Column;
use std::collections::HashMap;
use std::sync::Arc;

/// An observer bound to a column
#[derive(Clone)]
pub struct Binding {
    observer: Arc<dyn Observer>,
    strength: NotificationType,
}

impl Binding {
    /// The bound observer
    pub fn observer(&self) -> &Arc<dyn Observer> {
        &self.observer
    }

    /// Notification strength of the binding
    pub fn strength(&self) -> NotificationType {
        self.strength
    }
}

impl std::fmt::Debug for Binding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Binding")
            .field("observer", &self.observer.name())
            .field("strength", &self.strength)
            .finish()
    }
}

/// Immutable map from watched column to observer
#[derive(Clone, Default)]
pub struct ObserverRegistry {
    bindings: HashMap<Column, Binding>,
}

impl ObserverRegistry {
    /// Start building a registry
    pub fn builder() -> ObserverRegistryBuilder {
        ObserverRegistryBuilder::default()
    }

    /// A registry with no observers
    pub fn empty() -> Self {
        Self::default()
    }

    /// Find the observer bound to `column`
    #[inline]
    pub fn lookup(&self, column: &Column) -> Option<&Binding> {
        self.bindings.get(column)
    }

    /// Check whether `column` has an observer
    #[inline]
    pub fn is_observed(&self, column: &Column) -> bool {
        self.bindings.contains_key(column)
    }

    /// Every bound column with its strength, sorted by column
    pub fn observed_columns(&self) -> Vec<ObservedColumn> {
        let mut columns: Vec<_> = self
            .bindings
            .iter()
            .map(|(column, binding)| ObservedColumn::new(column.clone(), binding.strength))
            .collect();
        columns.sort_by(|a, b| a.column.cmp(&b.column));
        columns
    }

    /// Number of bound observers
    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    /// Check if no observers are bound
    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

impl std::fmt::Debug for ObserverRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_map()
            .entries(self.bindings.iter().map(|(c, b)| (c.to_string(), b)))
            .finish()
    }
}

/// Collects bindings and rejects duplicates at [`build`](Self::build)
#[derive(Default)]
pub struct ObserverRegistryBuilder {
    pending: Vec<(ObservedColumn, Arc<dyn Observer>)>,
}

impl ObserverRegistryBuilder {
    /// Bind `observer` to the column it declares
    pub fn register(self, observer: impl Observer + 'static) -> Self {
        self.register_arc(Arc::new(observer))
    }

    /// Bind a shared observer to the column it declares
    pub fn register_arc(mut self, observer: Arc<dyn Observer>) -> Self {
        let declared = observer.observed_column();
        self.pending.push((declared, observer));
        self
    }

    /// Bind `observer` to `column` with `strength`, ignoring its declaration
    pub fn register_as(
        mut self,
        column: Column,
        strength: NotificationType,
        observer: impl Observer + 'static,
    ) -> Self {
        self.pending
            .push((ObservedColumn::new(column, strength), Arc::new(observer)));
        self
    }

    /// Build the registry
    ///
    /// Fails with [`Error::Configuration`] if two observers claim one column.
    pub fn build(self) -> Result<ObserverRegistry> {
        let mut bindings: HashMap<Column, Binding> = HashMap::with_capacity(self.pending.len());
        for (declared, observer) in self.pending {
            if let Some(existing) = bindings.get(&declared.column) {
                return Err(Error::Configuration(format!(
                    "column {} is observed by both {} and {}",
                    declared.column,
                    existing.observer.name(),
                    observer.name()
                )));
            }
            bindings.insert(
                declared.column,
                Binding {
                    observer,
                    strength: declared.notification,
                },
            );
        }
        Ok(ObserverRegistry { bindings })
    }
}

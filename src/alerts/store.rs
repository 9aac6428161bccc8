//! In-memory alert history

use chrono::Utc;
use parking_lot::RwLock;

use super::model::Alert;

/// Append-only alert history for the lifetime of the process.
///
/// Alerts are never removed except by [`AlertStore::clear`]; only their
/// lifecycle state changes.
#[derive(Debug, Default)]
pub struct AlertStore {
    alerts: RwLock<Vec<Alert>>,
}

impl AlertStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&self, alert: Alert) {
        self.alerts.write().push(alert);
    }

    pub fn get(&self, id: &str) -> Option<Alert> {
        self.alerts.read().iter().find(|a| a.id == id).cloned()
    }

    /// Every alert, oldest first
    pub fn history(&self) -> Vec<Alert> {
        self.alerts.read().clone()
    }

    /// Alerts still in the active state
    pub fn active(&self) -> Vec<Alert> {
        self.alerts
            .read()
            .iter()
            .filter(|a| a.is_active())
            .cloned()
            .collect()
    }

    /// Acknowledge an active alert. False if unknown or not active.
    pub fn acknowledge(&self, id: &str) -> bool {
        let mut alerts = self.alerts.write();
        match alerts.iter_mut().find(|a| a.id == id) {
            Some(alert) => alert.acknowledge(),
            None => false,
        }
    }

    /// Resolve an active or acknowledged alert. False if unknown or already resolved.
    pub fn resolve(&self, id: &str) -> bool {
        let mut alerts = self.alerts.write();
        match alerts.iter_mut().find(|a| a.id == id) {
            Some(alert) => alert.resolve(Utc::now()),
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.alerts.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.alerts.read().is_empty()
    }

    /// Drop all history
    pub fn clear(&self) {
        self.alerts.write().clear();
    }
}

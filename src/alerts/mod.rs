//! Threshold-based alerting
//!
//! Health check results are evaluated against trigger rules; every alert that
//! fires is kept in an in-memory history and delivered concurrently to each
//! enabled channel.

pub mod channels;
pub mod config;
pub mod engine;
pub mod model;
pub mod notifier;
pub mod rules;
pub mod store;

pub use channels::{build_channels, AlertChannel, ChannelError, ChannelKind, SystemInfo};
pub use config::{AlertConfig, AlertThresholds, ChannelSpec};
pub use engine::{AlertEngine, AlertError, DispatchReport};
pub use model::{Alert, AlertSeverity, AlertStatus, AlertType};
pub use notifier::{DeliveryOutcome, Notifier};
pub use rules::TriggerRule;
pub use store::AlertStore;

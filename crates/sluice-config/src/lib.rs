//! Sluice Config
//!
//! This crate contains the serializable trigger configuration types for sluice.
//! These types represent polling trigger definitions as a workflow author writes
//! them, before the host resolves their templated parameters and registers them
//! with the scheduler.
//!
//! Definitions are loaded from JSON:
//!
//! ```json
//! {
//!   "trigger_id": "watch",
//!   "namespace": "io.sluice.tests",
//!   "flow_id": "table-listen",
//!   "interval_ms": 300000,
//!   "sql": "SELECT * FROM `{{ namespace }}.events`",
//!   "fetch_mode": "fetch_all"
//! }
//! ```

mod enums;
mod error;
mod template;
mod trigger;

pub use enums::{FetchMode, RetryBackoff};
pub use error::ConfigError;
pub use template::resolve_parameters;
pub use trigger::{
  DEFAULT_INTERVAL_MS, DEFAULT_SCOPE, Parameters, RetryDef, TriggerDef, param_keys,
};

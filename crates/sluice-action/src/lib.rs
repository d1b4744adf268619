//! Sluice Action
//!
//! An action executes one parameterized request against an external tabular
//! data source and returns an [`ActionResult`]: the number of matched records
//! and, depending on the [`FetchMode`], the records themselves or a reference
//! to a stored copy.
//!
//! # Layers
//!
//! ```text
//! RetryingAction<A>      retries TransientIo with backoff (optional, host policy)
//!        │
//!        ▼
//! QueryAction<S>         applies the fetch mode: truncate / inline / store
//!        │
//!        ▼
//! RowSource              one request to the data source, all matched rows
//! ```
//!
//! Actions never retry on their own; [`RetryingAction`] is an explicit
//! decorator the host wraps around an action when its policy asks for it.

mod action;
mod error;
mod query;
mod result;
mod retry;
mod source;

pub use action::{Action, ActionParameters};
pub use error::{ActionError, ActionErrorKind};
pub use query::QueryAction;
pub use result::{ActionResult, QueryData};
pub use retry::{RetryPolicy, RetryingAction};
pub use source::{JsonFileSource, RowSource, SOURCE_PARAM};

pub use sluice_config::FetchMode;

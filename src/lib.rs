//! Signpost: agreement on named JSON registers.
//!
//! Independent clients agree on the current value of a small set of named,
//! JSON-valued registers using compare-and-swap writes and long-poll reads
//! instead of busy-polling: read the current value, swap only if it still
//! matches what you last saw, wait until it changes.
//!
//! The core is the concurrency-control and notification layer:
//!
//! - [`store::RegisterStore`] - file-per-name persistence of register values
//! - [`registry::WaitRegistry`] - one lock+condition pair per register name
//! - [`coordinator::Coordinator`] - read / CAS-write / wait-for-change,
//!   composed under the per-name lock
//!
//! The [`server`] module is the HTTP dispatcher around that core. A single
//! serving process owns the state directory; multi-process coordination is
//! out of scope.

pub mod config;
pub mod coordinator;
pub mod error;
pub mod registry;
pub mod server;
pub mod store;

pub use coordinator::{CasOutcome, Coordinator};
pub use error::RegisterError;
pub use registry::{WaitEntry, WaitRegistry};
pub use store::{is_valid_register_name, RegisterStore};

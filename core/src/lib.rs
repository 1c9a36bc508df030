//! Core state machine of the Cadence console.
//!
//! - [`ConfigController`]: loads a scope's schema and versions and mediates
//!   save, activate and delete against the registry
//! - [`ScopeState`]: the immutable snapshot the controller exposes
//! - [`Console`]: one operator session tying the controller and the live log
//!   client to the selected scope
//! - [`errors`]: scoped errors and their operator-facing rendering

mod console;
mod controller;
pub mod errors;
mod store;
#[cfg(test)]
mod testing;

pub use console::Console;
pub use controller::{ConfigController, Outcome};
pub use errors::{ErrorKind, ScopedError};
pub use store::ScopeState;

//! Pub/sub transport abstraction consumed by the `tasks` scheduling core.
//!
//! This crate is deliberately the "boring" half of the workspace: it defines
//! the [`Provider`] contract a task scheduler needs from a message broker
//! (register a handler for a topic, publish a message to a topic) and ships
//! one in-process implementation, [`InMemoryProvider`], good enough for
//! tests and examples. A real deployment depends on this crate only through
//! the trait and plugs in its own broker client.

mod envelope;
mod error;
mod memory;
mod provider;

pub use envelope::Envelope;
pub use error::TransportError;
pub use memory::InMemoryProvider;
pub use provider::{Handler, HandlerNamingFn, Provider};

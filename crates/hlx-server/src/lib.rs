//! Server side of the HLX control protocol: the amplifier simulator's
//! moving parts.
//!
//! The [`listener`] accepts TCP clients and hands them to the
//! [`dispatcher`], the single task that owns the authoritative
//! [`hlx_model::AmplifierModel`]. Each connection runs a [`session`] task
//! that tokenizes inbound request frames and forwards them, typed, onto
//! the dispatcher's bus; the dispatcher answers the requester and
//! broadcasts resulting-state notifications to every other client. State
//! survives restarts through the [`store`], a single JSON document.

pub mod dispatcher;
pub mod listener;
pub mod session;
pub mod store;

pub use dispatcher::{Dispatcher, DispatcherMsg};
pub use listener::Listener;
pub use store::{Store, StoreError};

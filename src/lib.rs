//! HLX control suite.
//!
//! A bidirectional control system for the HLX multi-zone amplifier: a
//! client library that drives a physical amplifier over its telnet
//! control protocol, and a server simulator that faithfully emulates one
//! for development and testing. This facade re-exports the pieces; see
//! the member crates for the substance:
//!
//! - `hlx-proto` — frame codec, pattern registries, typed frames
//! - `hlx-model` — the amplifier data model
//! - `hlx-client` — connection, exchange pipeline, object controllers,
//!   application controller
//! - `hlx-server` — listener, sessions, request dispatcher, store
//! - `services/simulator` — the `hlxsimd` binary

pub use hlx_client::{
    ApplicationController, ClientEvent, ClientOptions, ConnectionEvent, ConnectionState,
    ControllerKind, HlxClient, StateChange,
};
pub use hlx_model::{AmplifierModel, SetOutcome};
pub use hlx_proto::{
    ControlUrl, Error, Identifier, Kind, Request, Response, VersionSet, DEFAULT_PORT,
};
pub use hlx_server::{Dispatcher, Listener, Store};

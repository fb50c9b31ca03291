//! Client library for driving an HLX amplifier over the network.
//!
//! The centerpiece is [`ApplicationController`]: a single engine task that
//! owns the TCP connection, correlates request/response exchanges, routes
//! unsolicited notifications into the local model through per-aspect
//! object controllers, and orchestrates bulk refresh. Callers hold an
//! [`HlxClient`] handle for typed mutators and observers, and drain a
//! [`ClientEvent`] stream for connection lifecycle, refresh progress, and
//! state-change notifications.
//!
//! ```no_run
//! # async fn demo() -> Result<(), hlx_proto::Error> {
//! use std::time::Duration;
//! use hlx_client::{ApplicationController, ClientOptions};
//!
//! let (engine, client, mut events) = ApplicationController::new(ClientOptions::default());
//! tokio::spawn(engine.run());
//!
//! client.connect("telnet://amp.local", Duration::from_secs(5)).await?;
//! client.refresh(Duration::from_secs(5)).await?;
//! client.set_zone_volume(3, -20).await?;
//! while let Some(event) = events.recv().await {
//!     println!("{event:?}");
//! }
//! # Ok(())
//! # }
//! ```

mod app;
mod connection;
mod controller;
mod event;
mod exchange;
mod handle;

pub use app::{ApplicationController, ClientOptions};
pub use connection::ConnectionState;
pub use controller::ControllerKind;
pub use event::{ClientEvent, ConnectionEvent, StateChange};
pub use handle::HlxClient;

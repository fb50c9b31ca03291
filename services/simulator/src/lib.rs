//! `hlxsimd`: the amplifier simulator service.
//!
//! Wires the configuration store, the dispatcher, and the listener
//! together and runs them until a termination signal arrives. The store
//! path and bind address come from the CLI; state mutations are persisted
//! as they happen, so a restarted simulator resumes where it left off.

use std::path::PathBuf;

use tracing::info;

use hlx_proto::{ControlUrl, Error, VersionSet};
use hlx_server::{Dispatcher, Listener, Store};

/// Default configuration backing store path.
pub const DEFAULT_CONFIG_PATH: &str = "/etc/hlxsimd/hlxsimd.json";

#[derive(Debug, Clone)]
pub struct SimulatorOptions {
    /// Address families to bind.
    pub versions: VersionSet,
    /// Optional URL or `host[:port]` to listen at; the wildcard address
    /// on the default port otherwise.
    pub bind: Option<String>,
    /// Configuration backing store.
    pub configuration_file: PathBuf,
}

impl Default for SimulatorOptions {
    fn default() -> Self {
        SimulatorOptions {
            versions: VersionSet::ANY,
            bind: None,
            configuration_file: PathBuf::from(DEFAULT_CONFIG_PATH),
        }
    }
}

pub async fn signal_handler() {
    let _ = tokio::signal::ctrl_c().await;
}

/// Run the simulator until a termination signal or a fatal error.
pub async fn run(options: SimulatorOptions) -> Result<(), Error> {
    let store = Store::new(&options.configuration_file);
    let model = store
        .load()
        .map_err(|error| Error::InitializationFailed(error.to_string()))?;

    let url = match &options.bind {
        Some(bind) => Some(ControlUrl::parse(bind)?),
        None => None,
    };
    let listener = Listener::bind(url.as_ref(), options.versions).await?;
    let (dispatcher, bus) = Dispatcher::new(model, Some(store));

    info!(version = env!("CARGO_PKG_VERSION"), "hlxsimd running");
    tokio::select! {
        () = listener.begin(bus) => {}
        () = dispatcher.begin() => {}
        () = signal_handler() => {
            info!("termination signal received, shutting down");
        }
    }
    Ok(())
}

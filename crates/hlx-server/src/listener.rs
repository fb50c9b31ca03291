//! Accepting socket for the simulator.
//!
//! Binds to the configured address (or the wildcard for the allowed
//! address families) and feeds accepted connections onto the dispatcher
//! bus. The accept loop runs until the bus goes away.

use std::net::{IpAddr, SocketAddr};

use tokio::net::{lookup_host, TcpListener};
use tokio::sync::mpsc::Sender;
use tracing::{info, warn};

use hlx_proto::{ControlUrl, Error, VersionSet, DEFAULT_PORT};

use crate::dispatcher::DispatcherMsg;

pub struct Listener {
    listener: TcpListener,
}

impl Listener {
    /// Bind to `url`, or to the wildcard address of the preferred family
    /// when no URL was given.
    pub async fn bind(url: Option<&ControlUrl>, versions: VersionSet) -> Result<Listener, Error> {
        let addr = match url {
            Some(url) => resolve_bind_addr(url, versions).await?,
            None => {
                let host: IpAddr = if versions.ipv6 {
                    "::".parse().map_err(|_| Error::InitializationFailed("wildcard".into()))?
                } else {
                    "0.0.0.0".parse().map_err(|_| Error::InitializationFailed("wildcard".into()))?
                };
                SocketAddr::new(host, DEFAULT_PORT)
            }
        };
        let listener = TcpListener::bind(addr).await?;
        info!(addr = %listener.local_addr()?, "listening");
        Ok(Listener { listener })
    }

    /// Bind to an ephemeral loopback port, for tests and ad-hoc runs.
    pub async fn bind_ephemeral() -> Result<Listener, Error> {
        let listener = TcpListener::bind(("127.0.0.1", 0)).await?;
        info!(addr = %listener.local_addr()?, "listening");
        Ok(Listener { listener })
    }

    pub fn local_addr(&self) -> Result<SocketAddr, Error> {
        Ok(self.listener.local_addr()?)
    }

    /// Accept connections until the dispatcher bus closes.
    pub async fn begin(self, bus: Sender<DispatcherMsg>) {
        loop {
            match self.listener.accept().await {
                Ok((stream, addr)) => {
                    if bus
                        .send(DispatcherMsg::Accepted { stream, addr })
                        .await
                        .is_err()
                    {
                        info!("dispatcher bus closed, stopping listener");
                        return;
                    }
                }
                Err(error) => {
                    warn!(%error, "failed to accept connection");
                }
            }
        }
    }
}

async fn resolve_bind_addr(url: &ControlUrl, versions: VersionSet) -> Result<SocketAddr, Error> {
    if let Some(ip) = url.host_addr() {
        if !versions.allows(ip) {
            return Err(Error::HostNameResolution(url.host.clone()));
        }
        return Ok(SocketAddr::new(ip, url.port));
    }
    lookup_host((url.host.as_str(), url.port))
        .await?
        .find(|addr| versions.allows(addr.ip()))
        .ok_or_else(|| Error::HostNameResolution(url.host.clone()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpStream;
    use tokio::sync::mpsc;
    use tokio::time::{timeout, Duration};

    #[tokio::test]
    async fn accepted_connections_reach_the_bus() {
        let listener = Listener::bind_ephemeral().await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (bus, mut rx) = mpsc::channel(4);
        let task = tokio::spawn(listener.begin(bus));

        let _stream = TcpStream::connect(addr).await.unwrap();
        let msg = timeout(Duration::from_secs(1), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert!(matches!(msg, DispatcherMsg::Accepted { .. }));
        task.abort();
    }

    #[tokio::test]
    async fn listener_stops_when_bus_closes() {
        let listener = Listener::bind_ephemeral().await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (bus, rx) = mpsc::channel(1);
        drop(rx);
        let task = tokio::spawn(listener.begin(bus));
        let _stream = TcpStream::connect(addr).await.unwrap();
        timeout(Duration::from_secs(1), task)
            .await
            .expect("listener should stop")
            .expect("join");
    }

    #[tokio::test]
    async fn version_mismatched_bind_url_is_rejected() {
        let url = ControlUrl::parse("127.0.0.1:0").unwrap();
        let err = Listener::bind(Some(&url), VersionSet::IPV6_ONLY)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::HostNameResolution(_)));
    }
}

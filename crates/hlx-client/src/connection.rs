//! One TCP control connection with its lifecycle state machine.
//!
//! States move `Ready -> Connecting -> Connected -> Disconnecting ->
//! Disconnected`, and `Disconnected` is equivalent to `Ready` for a
//! subsequent connect. Illegal transitions are refused without touching
//! the socket: connecting while connected reports `Already`, connecting
//! while a connect is in flight reports `InProgress`, and disconnect is
//! idempotent once disconnected.

use std::net::SocketAddr;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{lookup_host, TcpStream};
use tokio::time::timeout;
use tracing::{debug, warn};

use hlx_proto::{
    response_matcher, ControlUrl, Error, FrameBuffer, FrameMatch, ResponsePattern, VersionSet,
};

use crate::event::{ConnectionEvent, EventSink};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    #[default]
    Unknown,
    Ready,
    Connecting,
    Connected,
    Disconnecting,
    Disconnected,
}

pub(crate) struct Connection {
    state: ConnectionState,
    versions: VersionSet,
    url: Option<ControlUrl>,
    stream: Option<TcpStream>,
    rx: FrameBuffer,
    events: EventSink,
}

impl Connection {
    pub(crate) fn new(versions: VersionSet, events: EventSink) -> Connection {
        Connection {
            state: ConnectionState::Ready,
            versions,
            url: None,
            stream: None,
            rx: FrameBuffer::new(),
            events,
        }
    }

    pub(crate) fn state(&self) -> ConnectionState {
        self.state
    }

    pub(crate) fn is_connected(&self) -> bool {
        self.state == ConnectionState::Connected
    }

    /// Scheme, host, and port of the configured peer.
    pub(crate) fn url(&self) -> Option<&ControlUrl> {
        self.url.as_ref()
    }

    /// Connect to `url` within `deadline`. Emits the resolve and connect
    /// delegate events along the way; on failure the connection returns to
    /// `Disconnected` and is eligible for another attempt.
    pub(crate) async fn connect(&mut self, url: &str, deadline: Duration) -> Result<(), Error> {
        match self.state {
            ConnectionState::Connected => return Err(Error::Already),
            ConnectionState::Connecting | ConnectionState::Disconnecting => {
                return Err(Error::InProgress);
            }
            _ => {}
        }
        let url = ControlUrl::parse(url)?;
        self.state = ConnectionState::Connecting;

        let addr = match self.resolve(&url).await {
            Ok(addr) => addr,
            Err(error) => {
                self.state = ConnectionState::Disconnected;
                return Err(error);
            }
        };

        self.events.connection(ConnectionEvent::WillConnect { url: url.clone() });
        self.events.connection(ConnectionEvent::IsConnecting { url: url.clone() });
        let connected = match timeout(deadline, TcpStream::connect(addr)).await {
            Ok(Ok(stream)) => stream,
            Ok(Err(error)) => {
                let error = Error::from(error);
                self.events.connection(ConnectionEvent::DidNotConnect {
                    url: url.clone(),
                    error: error.clone(),
                });
                self.state = ConnectionState::Disconnected;
                return Err(error);
            }
            Err(_) => {
                self.events.connection(ConnectionEvent::DidNotConnect {
                    url: url.clone(),
                    error: Error::Timeout,
                });
                self.state = ConnectionState::Disconnected;
                return Err(Error::Timeout);
            }
        };

        debug!(peer = %url, %addr, "connected");
        self.events.connection(ConnectionEvent::DidConnect { url: url.clone() });
        self.url = Some(url);
        self.stream = Some(connected);
        self.rx = FrameBuffer::new();
        self.state = ConnectionState::Connected;
        Ok(())
    }

    async fn resolve(&mut self, url: &ControlUrl) -> Result<SocketAddr, Error> {
        self.events.connection(ConnectionEvent::WillResolve {
            host: url.host.clone(),
        });
        if let Some(ip) = url.host_addr() {
            if !self.versions.allows(ip) {
                let error = Error::HostNameResolution(url.host.clone());
                self.events.connection(ConnectionEvent::DidNotResolve {
                    host: url.host.clone(),
                    error: error.clone(),
                });
                return Err(error);
            }
            self.events.connection(ConnectionEvent::DidResolve {
                host: url.host.clone(),
                addr: ip,
            });
            return Ok(SocketAddr::new(ip, url.port));
        }
        self.events.connection(ConnectionEvent::IsResolving {
            host: url.host.clone(),
        });
        let versions = self.versions;
        let resolved = lookup_host((url.host.as_str(), url.port))
            .await
            .map_err(Error::from)
            .map(|mut addrs| addrs.find(|a| versions.allows(a.ip())));
        match resolved {
            Ok(Some(addr)) => {
                self.events.connection(ConnectionEvent::DidResolve {
                    host: url.host.clone(),
                    addr: addr.ip(),
                });
                Ok(addr)
            }
            Ok(None) => {
                let error = Error::HostNameResolution(url.host.clone());
                self.events.connection(ConnectionEvent::DidNotResolve {
                    host: url.host.clone(),
                    error: error.clone(),
                });
                Err(error)
            }
            Err(error) => {
                self.events.connection(ConnectionEvent::DidNotResolve {
                    host: url.host.clone(),
                    error: error.clone(),
                });
                Err(error)
            }
        }
    }

    /// Tear the connection down. Idempotent once disconnected; the error,
    /// if any, is carried on the `DidDisconnect` event.
    pub(crate) fn disconnect(&mut self, error: Option<Error>) -> Result<(), Error> {
        match self.state {
            ConnectionState::Ready | ConnectionState::Disconnected => return Ok(()),
            _ => {}
        }
        self.state = ConnectionState::Disconnecting;
        if let Some(url) = &self.url {
            self.events.connection(ConnectionEvent::WillDisconnect { url: url.clone() });
        }
        self.stream = None;
        self.rx = FrameBuffer::new();
        self.state = ConnectionState::Disconnected;
        if let Some(url) = &self.url {
            self.events.connection(ConnectionEvent::DidDisconnect {
                url: url.clone(),
                error,
            });
        }
        Ok(())
    }

    /// Write one request frame, with a trailing CR as wire courtesy; the
    /// tokenizer on the far side skips it.
    pub(crate) async fn send(&mut self, frame: &str) -> Result<(), Error> {
        let Some(stream) = self.stream.as_mut() else {
            return Err(Error::NotInitialized);
        };
        debug!(%frame, "send");
        stream.write_all(frame.as_bytes()).await?;
        stream.write_all(b"\r").await?;
        Ok(())
    }

    /// Read more bytes into the frame buffer. `Ok(0)` means the peer
    /// closed the stream.
    pub(crate) async fn read_chunk(&mut self) -> Result<usize, Error> {
        let Some(stream) = self.stream.as_mut() else {
            return Err(Error::NotInitialized);
        };
        let n = stream.read_buf(self.rx.buf_mut()).await?;
        Ok(n)
    }

    /// Tokenize the next inbound frame, if one is complete.
    pub(crate) fn extract(&mut self) -> Result<Option<FrameMatch<ResponsePattern>>, Error> {
        match self.rx.extract(response_matcher()) {
            Ok(hit) => Ok(hit),
            Err(error) => {
                warn!(buffered = self.rx.len(), "inbound buffer overflow");
                Err(error)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::ClientEvent;
    use tokio::net::TcpListener;

    fn connection() -> (Connection, tokio::sync::mpsc::UnboundedReceiver<ClientEvent>) {
        let (events, rx) = EventSink::new();
        (Connection::new(VersionSet::ANY, events), rx)
    }

    #[tokio::test]
    async fn connect_twice_reports_already() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let (mut conn, _events) = connection();
        conn.connect(&format!("127.0.0.1:{port}"), Duration::from_secs(1))
            .await
            .unwrap();
        assert_eq!(conn.state(), ConnectionState::Connected);
        let err = conn
            .connect(&format!("127.0.0.1:{port}"), Duration::from_secs(1))
            .await
            .unwrap_err();
        assert_eq!(err, Error::Already);
        assert_eq!(err.errno(), -114);
    }

    #[tokio::test]
    async fn refused_connect_returns_to_disconnected_and_can_retry() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);
        let (mut conn, _events) = connection();
        let err = conn
            .connect(&format!("127.0.0.1:{port}"), Duration::from_secs(1))
            .await
            .unwrap_err();
        assert_eq!(err, Error::ConnectionRefused);
        assert_eq!(conn.state(), ConnectionState::Disconnected);

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        conn.connect(&format!("127.0.0.1:{port}"), Duration::from_secs(1))
            .await
            .unwrap();
        assert_eq!(conn.state(), ConnectionState::Connected);
    }

    #[tokio::test]
    async fn disconnect_is_idempotent() {
        let (mut conn, _events) = connection();
        assert_eq!(conn.state(), ConnectionState::Ready);
        conn.disconnect(None).unwrap();
        conn.disconnect(None).unwrap();
        assert_eq!(conn.state(), ConnectionState::Ready);
    }

    #[tokio::test]
    async fn version_filter_rejects_mismatched_literal() {
        let (events, _rx) = EventSink::new();
        let mut conn = Connection::new(VersionSet::IPV6_ONLY, events);
        let err = conn
            .connect("127.0.0.1:2300", Duration::from_secs(1))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::HostNameResolution(_)));
    }
}

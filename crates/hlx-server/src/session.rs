//! One connected client.
//!
//! The session task owns the socket: it drains the dispatcher-fed
//! outbound queue, tokenizes inbound bytes against the request registry,
//! and forwards decoded requests onto the bus. Undecodable frames are
//! logged and dropped; unmatched input past the buffer ceiling is a
//! protocol error that closes this connection (and only this connection).
//! A peer reset likewise ends the session without disturbing the program.

use std::io;
use std::net::SocketAddr;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc::{Sender, UnboundedReceiver};
use tracing::{debug, info, warn};

use hlx_proto::{request_matcher, FrameBuffer, Request};

use crate::dispatcher::{ClientId, DispatcherMsg};

pub async fn run_session(
    client: ClientId,
    stream: TcpStream,
    addr: SocketAddr,
    bus: Sender<DispatcherMsg>,
    mut outbound: UnboundedReceiver<String>,
) {
    let mut buffer = FrameBuffer::new();
    let (mut reader, mut writer) = stream.into_split();
    loop {
        tokio::select! {
            frame = outbound.recv() => {
                match frame {
                    None => break,
                    Some(frame) => {
                        debug!(client, %frame, "send");
                        if writer.write_all(frame.as_bytes()).await.is_err()
                            || writer.write_all(b"\r\n").await.is_err()
                        {
                            break;
                        }
                    }
                }
            }
            result = reader.read_buf(buffer.buf_mut()) => {
                match result {
                    Ok(0) => {
                        info!(client, %addr, "client closed connection");
                        break;
                    }
                    Ok(_) => {
                        if !drain_frames(client, &mut buffer, &bus).await {
                            break;
                        }
                    }
                    Err(error) if error.kind() == io::ErrorKind::ConnectionReset => {
                        // Non-fatal: this client is gone, the simulator
                        // carries on.
                        info!(client, %addr, "connection reset by peer");
                        break;
                    }
                    Err(error) => {
                        warn!(client, %addr, %error, "read failed");
                        break;
                    }
                }
            }
        }
    }
    let _ = bus.send(DispatcherMsg::Closed { client }).await;
}

/// Tokenize and forward everything currently decodable. Returns `false`
/// when the session must close.
async fn drain_frames(
    client: ClientId,
    buffer: &mut FrameBuffer,
    bus: &Sender<DispatcherMsg>,
) -> bool {
    loop {
        match buffer.extract(request_matcher()) {
            Ok(Some(matched)) => match Request::decode(&matched) {
                Ok(request) => {
                    debug!(client, %request, "request");
                    if bus
                        .send(DispatcherMsg::Request { client, request })
                        .await
                        .is_err()
                    {
                        return false;
                    }
                }
                Err(error) => {
                    warn!(client, %error, "rejected request frame");
                }
            },
            Ok(None) => return true,
            Err(error) => {
                warn!(client, %error, "closing connection on protocol error");
                return false;
            }
        }
    }
}

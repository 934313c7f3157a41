//! ArtNet UDP transport.
//!
//! One `UdpTransport` per destination, shared by every request handler.
//! The sequence counter lives behind the same lock as the send, so packets
//! leave the socket in sequence order.

use std::future::Future;
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};

use socket2::{Domain, Protocol, Socket, Type};
use thiserror::Error;
use tokio::net::UdpSocket;
use tokio::sync::Mutex;
use tracing::{debug, info};

use dmx_protocol::error::EncodingError;
use dmx_protocol::packets::ChannelWrite;
use dmx_protocol::sequence::SequenceCounter;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("socket error: {0}")]
    SocketError(#[from] std::io::Error),
    #[error("encoding error: {0}")]
    Encoding(#[from] EncodingError),
}

/// Sends channel writes to an ArtNet node.
pub trait DmxTransport: Send + Sync + 'static {
    /// Send `write` as a single ArtDmx datagram and return the sequence
    /// number it carried.
    fn send(&self, write: &ChannelWrite)
        -> impl Future<Output = Result<u8, TransportError>> + Send;
}

/// Create a UDP socket on an ephemeral port of the destination's family.
/// Broadcast is permitted since ArtNet nodes are often addressed by subnet
/// broadcast (e.g. `2.255.255.255`).
fn create_sender_socket(destination: &SocketAddr) -> std::io::Result<std::net::UdpSocket> {
    let socket = Socket::new(Domain::for_address(*destination), Type::DGRAM, Some(Protocol::UDP))?;

    let local: SocketAddr = match destination {
        SocketAddr::V4(_) => {
            socket.set_broadcast(true)?;
            (Ipv4Addr::UNSPECIFIED, 0).into()
        }
        SocketAddr::V6(_) => (Ipv6Addr::UNSPECIFIED, 0).into(),
    };
    socket.bind(&local.into())?;
    socket.set_nonblocking(true)?;

    Ok(socket.into())
}

pub struct UdpTransport {
    destination: SocketAddr,
    socket: UdpSocket,
    sequence: Mutex<SequenceCounter>,
}

impl UdpTransport {
    /// Resolve `host` and open a socket aimed at `host:port`.
    pub async fn connect(host: &str, port: u16) -> anyhow::Result<Self> {
        let destination = tokio::net::lookup_host((host, port))
            .await?
            .next()
            .ok_or_else(|| anyhow::anyhow!("ArtNet host {host} did not resolve to any address"))?;

        if destination.ip().to_string() != host {
            info!(host = %host, resolved = %destination, "Resolved ArtNet host");
        }

        Ok(Self::bind(destination)?)
    }

    /// Open a socket aimed at an already resolved destination.
    /// Must be called from within a tokio runtime.
    pub fn bind(destination: SocketAddr) -> std::io::Result<Self> {
        let socket = UdpSocket::from_std(create_sender_socket(&destination)?)?;

        Ok(Self {
            destination,
            socket,
            sequence: Mutex::new(SequenceCounter::new()),
        })
    }

    pub fn destination(&self) -> SocketAddr {
        self.destination
    }

    /// Sequence number of the last packet that went out, if any.
    pub async fn last_sequence(&self) -> Option<u8> {
        self.sequence.lock().await.last()
    }
}

impl DmxTransport for UdpTransport {
    async fn send(&self, write: &ChannelWrite) -> Result<u8, TransportError> {
        // Held until the datagram is handed to the kernel.
        let mut counter = self.sequence.lock().await;
        let sequence = counter.peek();

        let packet = write.encode(sequence)?;
        let sent = self.socket.send_to(&packet, self.destination).await?;
        if sent != packet.len() {
            return Err(TransportError::SocketError(std::io::Error::new(
                std::io::ErrorKind::WriteZero,
                format!("short datagram: {sent} of {} bytes", packet.len()),
            )));
        }

        counter.commit(sequence);
        debug!(
            seq = sequence,
            universe = write.universe,
            len = packet.len(),
            dest = %self.destination,
            "Sent ArtDmx packet"
        );

        Ok(sequence)
    }
}

use std::{
    io,
    net::{
        Ipv4Addr,
        SocketAddr,
    },
};

use bytes::Bytes;
use tokio::{
    net::UdpSocket,
    sync::mpsc,
};

/// Binding for relay sockets. Multicast addresses join their group on every interface.
#[async_trait::async_trait]
pub trait DatagramBind: Sized {
    async fn bind_group(address: SocketAddr) -> io::Result<Self>;
}

/// Outbound half of a datagram transport addressed per packet.
#[async_trait::async_trait]
pub trait DatagramSender: Send + Sync {
    async fn send_to(&self, packet: &[u8], target: SocketAddr) -> io::Result<usize>;
}

#[async_trait::async_trait]
impl DatagramBind for UdpSocket {
    #[tracing::instrument(err, skip_all, fields(%address))]
    async fn bind_group(address: SocketAddr) -> io::Result<Self> {
        let sock = UdpSocket::bind(address).await?;

        if let SocketAddr::V4(v4) = address {
            if v4.ip().is_multicast() {
                sock.join_multicast_v4(*v4.ip(), Ipv4Addr::UNSPECIFIED)?;
                tracing::debug!(group = %v4.ip(), "joined multicast group");
            }
        }

        Ok(sock)
    }
}

#[async_trait::async_trait]
impl DatagramSender for UdpSocket {
    #[tracing::instrument(err, skip_all, fields(packet.len = packet.len(), %target), level = "trace")]
    async fn send_to(&self, packet: &[u8], target: SocketAddr) -> io::Result<usize> {
        UdpSocket::send_to(self, packet, target).await
    }
}

/// Captures outbound datagrams, for driving a relay without sockets.
#[async_trait::async_trait]
impl DatagramSender for mpsc::UnboundedSender<(Bytes, SocketAddr)> {
    async fn send_to(&self, packet: &[u8], target: SocketAddr) -> io::Result<usize> {
        self.send((Bytes::copy_from_slice(packet), target))
            .map_err(|e| io::Error::new(io::ErrorKind::ConnectionAborted, e.to_string()))?;

        Ok(packet.len())
    }
}

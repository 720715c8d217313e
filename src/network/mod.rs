//! UDP transport for codec-framed audio
//!
//! One datagram carries exactly one compressed frame; the payload is the
//! raw Opus packet with no additional header. Frame boundary equals
//! datagram boundary, so loss and reordering are tolerated by the fixed
//! decode granularity rather than reconstructed ordering.

pub mod receiver;
pub mod sender;

pub use receiver::{FrameReceiver, ReceiverHandle};
pub use sender::{FrameSender, SenderStats};

use bytes::Bytes;
use socket2::{Domain, Protocol, Socket, Type};
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr, UdpSocket};

use crate::error::NetworkError;

/// One inbound datagram, as received.
#[derive(Debug, Clone)]
pub struct EncodedPacket {
    pub payload: Bytes,
    pub source: SocketAddr,
}

/// Bind a UDP socket with enlarged kernel buffers.
pub fn bind_socket(addr: SocketAddr, buffer_bytes: usize) -> Result<UdpSocket, NetworkError> {
    let socket = Socket::new(Domain::for_address(addr), Type::DGRAM, Some(Protocol::UDP))
        .map_err(NetworkError::BindFailed)?;
    socket
        .set_recv_buffer_size(buffer_bytes)
        .map_err(NetworkError::BindFailed)?;
    socket
        .set_send_buffer_size(buffer_bytes)
        .map_err(NetworkError::BindFailed)?;
    socket.bind(&addr.into()).map_err(NetworkError::BindFailed)?;
    Ok(socket.into())
}

/// Build a socket for sending to a fixed destination.
pub fn connect_socket(target: SocketAddr, buffer_bytes: usize) -> Result<UdpSocket, NetworkError> {
    let bind_addr = match target {
        SocketAddr::V4(_) => SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), 0),
        SocketAddr::V6(_) => SocketAddr::new(IpAddr::V6(Ipv6Addr::UNSPECIFIED), 0),
    };
    let socket = bind_socket(bind_addr, buffer_bytes)?;
    socket
        .connect(target)
        .map_err(NetworkError::ConnectFailed)?;
    Ok(socket)
}

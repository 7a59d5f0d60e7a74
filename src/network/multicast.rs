//! Multicast receive socket
//!
//! One socket per relay session. The group membership lives exactly as long
//! as the [`MulticastSocket`]: dropping it closes the descriptor, which makes
//! the kernel leave the group.

use async_trait::async_trait;
use socket2::{Domain, Protocol, Socket, Type};
use std::io;
use std::net::{Ipv4Addr, SocketAddrV4};
use tokio::net::UdpSocket;

use crate::error::RelayError;
use crate::network::Interface;

/// Anything a relay session can read datagrams from
#[async_trait]
pub trait DatagramSource: Send {
    /// Receive one datagram into `buf`, returning its length
    async fn recv(&mut self, buf: &mut [u8]) -> io::Result<usize>;
}

/// Opens a datagram source for a resolved group
pub trait SourceOpener: Send + Sync + 'static {
    type Source: DatagramSource + 'static;

    fn open(&self, group: SocketAddrV4) -> Result<Self::Source, RelayError>;
}

/// UDP socket joined to one multicast group
pub struct MulticastSocket {
    socket: UdpSocket,
    group: SocketAddrV4,
}

impl MulticastSocket {
    /// Bind to the group port and join the group on `interface`.
    ///
    /// Must be called from within a tokio runtime.
    pub fn open(group: SocketAddrV4, interface: &Interface) -> io::Result<Self> {
        let socket = Socket::new(Domain::IPV4, Type::DGRAM, Some(Protocol::UDP))?;

        // Several sessions may watch the same group at once
        socket.set_reuse_address(true)?;
        #[cfg(unix)]
        socket.set_reuse_port(true)?;

        socket.bind(&bind_address(group).into())?;
        socket.join_multicast_v4_n(group.ip(), &interface.to_socket2())?;
        socket.set_nonblocking(true)?;

        let socket = UdpSocket::from_std(socket.into())?;

        tracing::debug!("Joined multicast group {} on {}", group, interface);

        Ok(Self { socket, group })
    }
}

/// Binding to the group address filters out other groups sharing the port.
/// Windows only accepts the wildcard address.
fn bind_address(group: SocketAddrV4) -> SocketAddrV4 {
    if cfg!(windows) {
        SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, group.port())
    } else {
        group
    }
}

#[async_trait]
impl DatagramSource for MulticastSocket {
    async fn recv(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.socket.recv(buf).await
    }
}

impl Drop for MulticastSocket {
    fn drop(&mut self) {
        tracing::debug!("Leaving multicast group {}", self.group);
    }
}

/// Opens real multicast sockets on a provisioned interface
#[derive(Debug, Clone)]
pub struct MulticastOpener {
    interface: Interface,
}

impl MulticastOpener {
    pub fn new(interface: Interface) -> Self {
        Self { interface }
    }

    pub fn interface(&self) -> &Interface {
        &self.interface
    }
}

impl SourceOpener for MulticastOpener {
    type Source = MulticastSocket;

    fn open(&self, group: SocketAddrV4) -> Result<MulticastSocket, RelayError> {
        MulticastSocket::open(group, &self.interface).map_err(|source| RelayError::Join { group, source })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bind_address() {
        let group = SocketAddrV4::new(Ipv4Addr::new(239, 1, 1, 1), 1234);
        let bound = bind_address(group);
        assert_eq!(bound.port(), 1234);
        if cfg!(windows) {
            assert_eq!(*bound.ip(), Ipv4Addr::UNSPECIFIED);
        } else {
            assert_eq!(bound, group);
        }
    }

    #[tokio::test]
    async fn test_join_failure_reported() {
        // 127.0.0.1 is not a multicast group, so the membership request fails
        let opener = MulticastOpener::new(Interface::Address(Ipv4Addr::LOCALHOST));
        let group = SocketAddrV4::new(Ipv4Addr::LOCALHOST, 0);
        match opener.open(group) {
            Err(RelayError::Join { group: failed, .. }) => assert_eq!(failed, group),
            Err(other) => panic!("unexpected error {other}"),
            Ok(_) => panic!("joined a unicast address"),
        }
    }
}

//! Network interface resolution
//!
//! Interfaces are resolved once at provisioning time, never per request.

use std::fmt;
use std::net::Ipv4Addr;

use socket2::InterfaceIndexOrAddress;

use crate::error::ConfigError;

/// A local interface multicast groups are joined on
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Interface {
    /// Named interface resolved to its OS index
    Index { name: String, index: u32 },
    /// Interface identified by one of its IPv4 addresses
    Address(Ipv4Addr),
}

impl Interface {
    /// Resolve an interface name or IPv4 address literal
    pub fn resolve(value: &str) -> Result<Self, ConfigError> {
        let value = value.trim();
        if value.is_empty() {
            return Err(ConfigError::MissingInterface);
        }

        if let Ok(address) = value.parse::<Ipv4Addr>() {
            ensure_local_address(address)?;
            return Ok(Interface::Address(address));
        }

        let index = index_by_name(value)?;
        tracing::debug!("Resolved interface {} to index {}", value, index);

        Ok(Interface::Index {
            name: value.to_string(),
            index,
        })
    }

    /// Convert to the form socket2 expects for group membership
    pub fn to_socket2(&self) -> InterfaceIndexOrAddress {
        match self {
            Interface::Index { index, .. } => InterfaceIndexOrAddress::Index(*index),
            Interface::Address(address) => InterfaceIndexOrAddress::Address(*address),
        }
    }
}

impl fmt::Display for Interface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Interface::Index { name, index } => write!(f, "{} (#{})", name, index),
            Interface::Address(address) => write!(f, "{}", address),
        }
    }
}

#[cfg(unix)]
fn index_by_name(name: &str) -> Result<u32, ConfigError> {
    nix::net::if_::if_nametoindex(name).map_err(|e| ConfigError::InterfaceNotFound {
        name: name.to_string(),
        reason: e.desc().to_string(),
    })
}

#[cfg(not(unix))]
fn index_by_name(name: &str) -> Result<u32, ConfigError> {
    Err(ConfigError::InterfaceNotFound {
        name: name.to_string(),
        reason: "use the interface's IPv4 address on this platform".to_string(),
    })
}

/// The address must belong to one of this host's interfaces, otherwise
/// every group join on it would fail.
#[cfg(unix)]
fn ensure_local_address(address: Ipv4Addr) -> Result<(), ConfigError> {
    let not_found = |reason: String| ConfigError::InterfaceNotFound {
        name: address.to_string(),
        reason,
    };

    let mut addrs = nix::ifaddrs::getifaddrs().map_err(|e| not_found(e.desc().to_string()))?;
    let found = addrs.any(|ifaddr| {
        ifaddr
            .address
            .as_ref()
            .and_then(|storage| storage.as_sockaddr_in())
            .map(|sin| Ipv4Addr::from(sin.ip()) == address)
            .unwrap_or(false)
    });

    if found {
        Ok(())
    } else {
        Err(not_found("address is not assigned to any local interface".to_string()))
    }
}

#[cfg(not(unix))]
fn ensure_local_address(_address: Ipv4Addr) -> Result<(), ConfigError> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_interface() {
        assert!(matches!(Interface::resolve(""), Err(ConfigError::MissingInterface)));
        assert!(matches!(Interface::resolve("  "), Err(ConfigError::MissingInterface)));
    }

    #[test]
    fn test_address_literal() {
        let interface = Interface::resolve("127.0.0.1").unwrap();
        assert_eq!(interface, Interface::Address(Ipv4Addr::LOCALHOST));
        assert_eq!(interface.to_string(), "127.0.0.1");
    }

    #[cfg(unix)]
    #[test]
    fn test_unassigned_address_literal() {
        let err = Interface::resolve("203.0.113.77").unwrap_err();
        assert!(matches!(err, ConfigError::InterfaceNotFound { ref name, .. } if name == "203.0.113.77"));
    }

    #[test]
    fn test_unknown_interface() {
        let err = Interface::resolve("no-such-iface0").unwrap_err();
        assert!(matches!(err, ConfigError::InterfaceNotFound { ref name, .. } if name == "no-such-iface0"));
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_loopback_by_name() {
        match Interface::resolve("lo").unwrap() {
            Interface::Index { name, index } => {
                assert_eq!(name, "lo");
                assert!(index > 0);
            }
            other => panic!("unexpected {:?}", other),
        }
    }
}

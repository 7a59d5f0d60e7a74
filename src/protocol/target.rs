//! Request path to multicast group resolution
//!
//! Paths have the form `/<prefix>/<group>:<port>`. The prefix is ignored,
//! anything after the address segment is ignored too.

use std::net::SocketAddrV4;

use crate::error::RelayError;

/// Resolve the multicast group addressed by a request path
pub fn resolve_target(path: &str) -> Result<SocketAddrV4, RelayError> {
    let address = path
        .split('/')
        .filter(|segment| !segment.is_empty())
        .nth(1)
        .ok_or(RelayError::MissingAddress)?;

    let group: SocketAddrV4 = address
        .parse()
        .map_err(|e: std::net::AddrParseError| RelayError::InvalidAddress {
            address: address.to_string(),
            reason: e.to_string(),
        })?;

    if !group.ip().is_multicast() {
        return Err(RelayError::NotMulticast(group));
    }

    Ok(group)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::net::Ipv4Addr;

    #[test]
    fn test_resolves_group_and_port() {
        let group = resolve_target("/udp/239.1.1.1:1234").unwrap();
        assert_eq!(group, SocketAddrV4::new(Ipv4Addr::new(239, 1, 1, 1), 1234));
    }

    #[test]
    fn test_ignores_empty_and_trailing_segments() {
        let group = resolve_target("//rtp//239.0.0.10:5000/extra").unwrap();
        assert_eq!(group, SocketAddrV4::new(Ipv4Addr::new(239, 0, 0, 10), 5000));
    }

    #[test]
    fn test_missing_address() {
        for path in ["", "/", "/udp", "/udp/", "//udp//"] {
            assert!(matches!(resolve_target(path), Err(RelayError::MissingAddress)), "{path}");
        }
    }

    #[test]
    fn test_unparsable_address() {
        for path in [
            "/udp/239.1.1.1",
            "/udp/239.1.1.1:port",
            "/udp/239.1.1.1:70000",
            "/udp/not-an-address:1234",
            "/udp/[ff02::1]:1234",
        ] {
            assert!(
                matches!(resolve_target(path), Err(RelayError::InvalidAddress { .. })),
                "{path}"
            );
        }
    }

    #[test]
    fn test_percent_encoded_address_not_decoded() {
        let err = resolve_target("/udp/239.1.1.1%3A1234").unwrap_err();
        assert!(matches!(err, RelayError::InvalidAddress { ref address, .. } if address == "239.1.1.1%3A1234"));
    }

    #[test]
    fn test_unicast_rejected() {
        let err = resolve_target("/udp/10.0.0.1:1234").unwrap_err();
        assert!(matches!(err, RelayError::NotMulticast(_)));
    }

    proptest! {
        #[test]
        fn prop_single_segment_is_missing_address(segment in "[a-z0-9.:]{0,16}", slashes in 0usize..4) {
            let path = format!("{}{}{}", "/".repeat(slashes), segment, "/".repeat(slashes));
            prop_assert!(matches!(resolve_target(&path), Err(RelayError::MissingAddress)));
        }

        #[test]
        fn prop_multicast_groups_resolve(
            a in 224u8..=239,
            b in any::<u8>(),
            c in any::<u8>(),
            d in any::<u8>(),
            port in any::<u16>()
        ) {
            let path = format!("/udp/{a}.{b}.{c}.{d}:{port}");
            let group = resolve_target(&path).unwrap();
            prop_assert_eq!(group, SocketAddrV4::new(Ipv4Addr::new(a, b, c, d), port));
        }
    }
}

//! IPv4 CIDR blocks

pub use ipnetwork::Ipv4Network;
use ipnetwork::IpNetworkError;

/// Why a CIDR string was rejected
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CidrError {
    /// No `/prefix` part
    #[error("expected a.b.c.d/prefix, got '{0}'")]
    Malformed(String),
    /// Address or prefix rejected by the parser
    #[error("'{input}' is not a valid network: {reason}")]
    Invalid {
        /// Input as given
        input: String,
        /// Parser message
        reason: String,
    },
    /// Address has bits set beyond the prefix
    #[error("host bits set in '{0}'")]
    HostBitsSet(String),
}

/// Parse `a.b.c.d/n`, rejecting a bare address and any host bits
pub fn parse_ipv4_cidr(value: &str) -> Result<Ipv4Network, CidrError> {
    let value = value.trim();
    if !value.contains('/') {
        return Err(CidrError::Malformed(value.to_string()));
    }
    let network: Ipv4Network = value.parse().map_err(|e: IpNetworkError| CidrError::Invalid {
        input: value.to_string(),
        reason: e.to_string(),
    })?;
    if network.network() != network.ip() {
        return Err(CidrError::HostBitsSet(value.to_string()));
    }
    Ok(network)
}

/// Number of addresses in a network of this prefix length
#[must_use]
pub fn block_size(prefix: u8) -> u64 {
    1u64 << (32 - u32::from(prefix.min(32)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    #[test]
    fn parses_and_displays() {
        let cidr = parse_ipv4_cidr("10.0.0.0/16").unwrap();
        assert_eq!(cidr.prefix(), 16);
        assert_eq!(cidr.to_string(), "10.0.0.0/16");
        assert!(cidr.contains(Ipv4Addr::new(10, 0, 200, 1)));
        assert!(!cidr.contains(Ipv4Addr::new(10, 1, 0, 1)));
    }

    #[test]
    fn any_address() {
        let cidr = parse_ipv4_cidr(" 0.0.0.0/0 ").unwrap();
        assert!(cidr.contains(Ipv4Addr::new(203, 0, 113, 9)));
    }

    #[test]
    fn rejects_bad_input() {
        assert!(matches!(parse_ipv4_cidr("10.0.0.0"), Err(CidrError::Malformed(_))));
        assert!(matches!(parse_ipv4_cidr("10.0.0.0/33"), Err(CidrError::Invalid { .. })));
        assert!(matches!(parse_ipv4_cidr("ten/8"), Err(CidrError::Invalid { .. })));
        assert_eq!(
            parse_ipv4_cidr("10.0.0.1/16"),
            Err(CidrError::HostBitsSet("10.0.0.1/16".into()))
        );
    }

    #[test]
    fn host_route() {
        let cidr = Ipv4Network::from(Ipv4Addr::new(10, 0, 3, 14));
        assert_eq!(cidr.prefix(), 32);
        assert_eq!(cidr.to_string(), "10.0.3.14/32");
    }

    #[test]
    fn block_sizes() {
        assert_eq!(block_size(32), 1);
        assert_eq!(block_size(24), 256);
        assert_eq!(block_size(0), 1 << 32);
    }
}

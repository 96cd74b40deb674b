//! Network helpers used by probe drivers.
//!
//! - [`PortAllocator`]: picks a local port for a helper server.
//! - [`ProxyResolver`]: maps a binding to the address clients should use.
//! - [`resolve_ipv4`]: numeric address for a probe host.

use crate::error::{ProbeError, ProbeResult};
use crate::resource::ProbeBinding;
use std::net::{Ipv4Addr, SocketAddr, TcpListener};

/// Address some distributions assign to the machine's own hostname in
/// `/etc/hosts`. Nothing listens on it, so it is replaced by
/// [`Ipv4Addr::LOCALHOST`].
pub const LOOPBACK_ALIAS: Ipv4Addr = Ipv4Addr::new(127, 0, 1, 1);

/// Source of free local ports.
pub trait PortAllocator: Send + Sync {
    /// Return a port that is currently unbound on this host.
    ///
    /// The port is not reserved; another process may take it before the
    /// caller binds it.
    fn allocate(&self) -> ProbeResult<u16>;
}

/// Lets the kernel pick an ephemeral port.
#[derive(Debug, Default, Clone, Copy)]
pub struct EphemeralPortAllocator;

impl PortAllocator for EphemeralPortAllocator {
    fn allocate(&self) -> ProbeResult<u16> {
        let listener =
            TcpListener::bind((Ipv4Addr::UNSPECIFIED, 0)).map_err(ProbeError::PortAllocation)?;
        let port = listener
            .local_addr()
            .map_err(ProbeError::PortAllocation)?
            .port();
        tracing::trace!(port, "Allocated free port");
        Ok(port)
    }
}

/// Maps a probe binding to the `(host, port)` clients should connect to.
pub trait ProxyResolver: Send + Sync {
    /// Resolve the client-visible endpoint for `binding`, where
    /// `default_port` is the port the helper listens on locally.
    fn host_and_port(&self, binding: &ProbeBinding, default_port: u16)
        -> ProbeResult<(String, u16)>;
}

/// Uses the binding's own proxy settings, if any.
///
/// Without a proxy the binding's host and the local port are returned
/// unchanged.
#[derive(Debug, Default, Clone, Copy)]
pub struct DirectResolver;

impl ProxyResolver for DirectResolver {
    fn host_and_port(
        &self,
        binding: &ProbeBinding,
        default_port: u16,
    ) -> ProbeResult<(String, u16)> {
        match &binding.proxy {
            Some(proxy) if proxy.host.trim().is_empty() => {
                Err(ProbeError::Proxy("proxy host is empty".into()))
            }
            Some(proxy) => Ok((proxy.host.clone(), proxy.port.unwrap_or(default_port))),
            None => Ok((binding.host.clone(), default_port)),
        }
    }
}

/// Replace [`LOOPBACK_ALIAS`] with `127.0.0.1`; other addresses pass through.
pub fn normalize_loopback_alias(addr: Ipv4Addr) -> Ipv4Addr {
    if addr == LOOPBACK_ALIAS {
        Ipv4Addr::LOCALHOST
    } else {
        addr
    }
}

/// Resolve `host` to its first IPv4 address using the system resolver.
///
/// The loopback alias is normalized with [`normalize_loopback_alias`].
pub async fn resolve_ipv4(host: &str) -> ProbeResult<Ipv4Addr> {
    let addrs = tokio::net::lookup_host((host, 0))
        .await
        .map_err(|source| ProbeError::NameResolution {
            host: host.to_string(),
            source,
        })?;

    for addr in addrs {
        if let SocketAddr::V4(v4) = addr {
            let ip = normalize_loopback_alias(*v4.ip());
            tracing::trace!(host, %ip, "Resolved host");
            return Ok(ip);
        }
    }

    Err(ProbeError::NoIpv4Address {
        host: host.to_string(),
    })
}

/// Join an address and port as `"<ipv4>:<port>"`.
pub fn format_address(ip: Ipv4Addr, port: u16) -> String {
    format!("{}:{}", ip, port)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::ProxyEndpoint;

    #[test]
    fn test_normalize_loopback_alias() {
        assert_eq!(normalize_loopback_alias(LOOPBACK_ALIAS), Ipv4Addr::LOCALHOST);
        let lan = Ipv4Addr::new(192, 168, 1, 20);
        assert_eq!(normalize_loopback_alias(lan), lan);
        assert_eq!(
            normalize_loopback_alias(Ipv4Addr::new(127, 0, 0, 1)),
            Ipv4Addr::LOCALHOST
        );
    }

    #[test]
    fn test_ephemeral_port_is_bindable() {
        let port = EphemeralPortAllocator.allocate().unwrap();
        assert_ne!(port, 0);
        // Accepted race: the port is normally still free right after allocation.
        assert!(TcpListener::bind((Ipv4Addr::LOCALHOST, port)).is_ok());
    }

    #[test]
    fn test_direct_resolver_without_proxy() {
        let binding = ProbeBinding::usb("000000123456");
        let (host, port) = DirectResolver.host_and_port(&binding, 19020).unwrap();
        assert_eq!(host, "localhost");
        assert_eq!(port, 19020);
    }

    #[test]
    fn test_direct_resolver_with_proxy() {
        let binding = ProbeBinding::network("exporter", "1").with_proxy(ProxyEndpoint {
            host: "gateway".to_string(),
            port: Some(40000),
        });
        assert_eq!(
            DirectResolver.host_and_port(&binding, 19020).unwrap(),
            ("gateway".to_string(), 40000)
        );

        let binding = ProbeBinding::network("exporter", "1").with_proxy(ProxyEndpoint {
            host: "gateway".to_string(),
            port: None,
        });
        assert_eq!(
            DirectResolver.host_and_port(&binding, 19020).unwrap(),
            ("gateway".to_string(), 19020)
        );
    }

    #[test]
    fn test_format_address() {
        assert_eq!(
            format_address(Ipv4Addr::new(10, 0, 0, 7), 19020),
            "10.0.0.7:19020"
        );
    }

    #[tokio::test]
    async fn test_resolve_literal_alias() {
        let ip = resolve_ipv4("127.0.1.1").await.unwrap();
        assert_eq!(ip, Ipv4Addr::LOCALHOST);
    }

    #[tokio::test]
    async fn test_resolve_literal_address() {
        let ip = resolve_ipv4("192.0.2.10").await.unwrap();
        assert_eq!(ip, Ipv4Addr::new(192, 0, 2, 10));
    }

    #[tokio::test]
    async fn test_resolve_ipv6_literal_has_no_ipv4() {
        assert!(matches!(
            resolve_ipv4("::1").await,
            Err(ProbeError::NoIpv4Address { .. })
        ));
    }

    #[tokio::test]
    async fn test_resolve_unknown_host_fails() {
        assert!(resolve_ipv4("does-not-exist.invalid").await.is_err());
    }
}

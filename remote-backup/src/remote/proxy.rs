//! Transport settings for SSH connections.

use crate::config::ProxyConfig;
use crate::utils::errors::{BackupError, Result};
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;

const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Socks5Proxy {
    pub host: String,
    pub port: u16,
}

/// How TCP connections to hosts are established. Built once per run and
/// handed to the connector.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    pub proxy: Option<Socks5Proxy>,
    pub connect_timeout: Duration,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            proxy: None,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }
}

impl TransportConfig {
    pub fn from_config(proxy: &ProxyConfig) -> Self {
        let proxy = match (&proxy.socks5, proxy.enabled) {
            (Some(socks5), true) => Some(Socks5Proxy {
                host: socks5.host.clone(),
                port: socks5.port,
            }),
            _ => None,
        };

        Self {
            proxy,
            ..Default::default()
        }
    }

    /// Open a TCP stream to `host:port`, through the SOCKS5 proxy if one is set.
    pub fn open_stream(&self, host: &str, port: u16) -> Result<TcpStream> {
        let stream = match &self.proxy {
            Some(proxy) => socks::Socks5Stream::connect((proxy.host.as_str(), proxy.port), (host, port))
                .map_err(|e| {
                    BackupError::Proxy(format!(
                        "SOCKS5 {}:{} could not reach {host}:{port}: {e}",
                        proxy.host, proxy.port
                    ))
                })?
                .into_inner(),
            None => {
                let mut last_err = None;
                let mut connected = None;
                for addr in (host, port).to_socket_addrs()? {
                    match TcpStream::connect_timeout(&addr, self.connect_timeout) {
                        Ok(stream) => {
                            connected = Some(stream);
                            break;
                        }
                        Err(e) => last_err = Some(e),
                    }
                }
                match (connected, last_err) {
                    (Some(stream), _) => stream,
                    (None, Some(e)) => return Err(e.into()),
                    (None, None) => {
                        return Err(BackupError::Io(std::io::Error::new(
                            std::io::ErrorKind::NotFound,
                            format!("{host} did not resolve to any address"),
                        )))
                    }
                }
            }
        };

        Ok(stream)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Socks5Config;

    #[test]
    fn test_disabled_proxy_is_ignored() {
        let cfg = ProxyConfig {
            enabled: false,
            socks5: Some(Socks5Config {
                host: "127.0.0.1".into(),
                port: 1080,
            }),
        };
        assert!(TransportConfig::from_config(&cfg).proxy.is_none());
    }

    #[test]
    fn test_enabled_proxy_is_used() {
        let cfg = ProxyConfig {
            enabled: true,
            socks5: Some(Socks5Config {
                host: "gw.internal".into(),
                port: 1081,
            }),
        };
        let transport = TransportConfig::from_config(&cfg);
        assert_eq!(
            transport.proxy,
            Some(Socks5Proxy {
                host: "gw.internal".into(),
                port: 1081
            })
        );
    }

    #[test]
    fn test_direct_connect_reaches_local_listener() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        let transport = TransportConfig::default();
        assert!(transport.open_stream("127.0.0.1", port).is_ok());
    }
}

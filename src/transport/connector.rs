use std::io;
use std::net::{IpAddr, SocketAddr};

use futures_util::future::BoxFuture;
use tokio::net::{lookup_host, TcpSocket, TcpStream};
use tracing::debug;

use crate::config::Config;
use crate::error::ConnectionError;

use super::Transport;

pub type BoxConnect<'a> = BoxFuture<'a, Result<Transport, ConnectionError>>;

/// Opens the stream a session talks over.
///
/// The session calls this once per connection attempt. Implementations own
/// everything below the line codec: name resolution, socket options, TLS.
pub trait Connector: Send + Sync {
    fn connect<'a>(&'a self, config: &'a Config) -> BoxConnect<'a>;
}

/// Plain TCP. Refuses configurations asking for TLS.
#[derive(Clone, Copy, Debug, Default)]
pub struct TcpConnector;

impl Connector for TcpConnector {
    fn connect<'a>(&'a self, config: &'a Config) -> BoxConnect<'a> {
        Box::pin(async move {
            if config.server.use_ssl {
                return Err(ConnectionError::TlsUnsupported);
            }
            let stream = open_tcp(config).await?;
            Ok(Transport::tcp(stream, &config.server.encoding)?)
        })
    }
}

/// TLS over TCP, verifying the server against the platform's trust roots.
#[cfg(feature = "tls")]
#[derive(Clone)]
pub struct TlsConnector {
    inner: tokio_rustls::TlsConnector,
}

#[cfg(feature = "tls")]
impl TlsConnector {
    pub fn new() -> Self {
        use std::sync::Arc;
        use tokio_rustls::rustls::{ClientConfig, RootCertStore};

        let mut roots = RootCertStore::empty();
        let native = rustls_native_certs::load_native_certs();
        for err in &native.errors {
            tracing::warn!("failed to load root certificates: {}", err);
        }
        for cert in native.certs {
            if let Err(e) = roots.add(cert) {
                tracing::warn!("failed to add root certificate: {}", e);
            }
        }
        let config = ClientConfig::builder()
            .with_root_certificates(roots)
            .with_no_client_auth();
        Self::from_config(Arc::new(config))
    }

    pub fn from_config(config: std::sync::Arc<tokio_rustls::rustls::ClientConfig>) -> Self {
        TlsConnector {
            inner: tokio_rustls::TlsConnector::from(config),
        }
    }
}

#[cfg(feature = "tls")]
impl Default for TlsConnector {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(feature = "tls")]
impl Connector for TlsConnector {
    fn connect<'a>(&'a self, config: &'a Config) -> BoxConnect<'a> {
        use tokio_rustls::rustls::pki_types::ServerName;

        Box::pin(async move {
            let stream = open_tcp(config).await?;
            if !config.server.use_ssl {
                return Ok(Transport::tcp(stream, &config.server.encoding)?);
            }
            let host = config.connect_host();
            let name = ServerName::try_from(host.to_owned())
                .map_err(|_| ConnectionError::InvalidHost(host.to_owned()))?;
            let stream = self.inner.connect(name, stream).await?;
            Ok(Transport::tls(stream, &config.server.encoding)?)
        })
    }
}

/// Resolve the server and try each address in turn, binding the local end
/// when a bind address is configured.
async fn open_tcp(config: &Config) -> Result<TcpStream, ConnectionError> {
    let host = config.connect_host();
    let port = config.server.port;
    let bind = match config.bind_address() {
        Some(addr) => Some(
            addr.parse::<IpAddr>()
                .map_err(|_| ConnectionError::InvalidHost(addr.to_owned()))?,
        ),
        None => None,
    };

    let mut last_err = None;
    for addr in lookup_host((host, port)).await? {
        match connect_one(addr, bind).await {
            Ok(stream) => {
                debug!(%addr, "connected");
                return Ok(stream);
            }
            Err(e) => {
                debug!(%addr, error = %e, "connect attempt failed");
                last_err = Some(e);
            }
        }
    }
    match last_err {
        Some(e) => Err(e.into()),
        None => Err(ConnectionError::InvalidHost(host.to_owned())),
    }
}

async fn connect_one(addr: SocketAddr, bind: Option<IpAddr>) -> io::Result<TcpStream> {
    let socket = if addr.is_ipv4() {
        TcpSocket::new_v4()?
    } else {
        TcpSocket::new_v6()?
    };
    if let Some(ip) = bind.filter(|ip| ip.is_ipv4() == addr.is_ipv4()) {
        socket.bind(SocketAddr::new(ip, 0))?;
    }
    socket.connect(addr).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_tcp_connector_refuses_tls() {
        let mut config = Config::new("irc.example.net", &["bones"]);
        config.server.use_ssl = true;
        let err = TcpConnector.connect(&config).await.unwrap_err();
        assert!(matches!(err, ConnectionError::TlsUnsupported));
    }

    #[tokio::test]
    async fn test_bad_bind_address() {
        let mut config = Config::new("127.0.0.1", &["bones"]);
        config.bot.bind_address = Some("not-an-address".into());
        let err = TcpConnector.connect(&config).await.unwrap_err();
        assert!(matches!(err, ConnectionError::InvalidHost(_)));
    }

    #[tokio::test]
    async fn test_tcp_connector_reaches_listener() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let mut config = Config::new("127.0.0.1", &["bones"]);
        config.server.port = port;

        let (transport, accepted) = tokio::join!(TcpConnector.connect(&config), listener.accept());
        let transport = transport.unwrap();
        assert!(!transport.is_tls());
        assert!(accepted.is_ok());
    }
}

//! Framed socket transports and the connectors that open them.

mod codec;
mod connector;

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_util::codec::Framed;
use tracing::warn;

#[cfg(feature = "tls")]
use tokio_rustls::client::TlsStream;

use crate::error::{ConnectionError, ProtocolError};
use crate::message::Message;

pub use self::codec::IrcCodec;
pub use self::connector::{BoxConnect, Connector, TcpConnector};
#[cfg(feature = "tls")]
pub use self::connector::TlsConnector;

#[allow(clippy::large_enum_variant)]
pub enum Transport {
    Tcp {
        framed: Framed<TcpStream, IrcCodec>,
    },
    #[cfg(feature = "tls")]
    Tls {
        framed: Framed<TlsStream<TcpStream>, IrcCodec>,
    },
}

impl Transport {
    pub fn tcp(stream: TcpStream, encoding: &str) -> Result<Self, ProtocolError> {
        if let Err(e) = enable_keepalive(&stream) {
            warn!("failed to enable TCP keepalive: {}", e);
        }
        Ok(Self::Tcp {
            framed: Framed::new(stream, IrcCodec::new(encoding)?),
        })
    }

    #[cfg(feature = "tls")]
    pub fn tls(stream: TlsStream<TcpStream>, encoding: &str) -> Result<Self, ProtocolError> {
        if let Err(e) = enable_keepalive(stream.get_ref().0) {
            warn!("failed to enable TCP keepalive: {}", e);
        }
        Ok(Self::Tls {
            framed: Framed::new(stream, IrcCodec::new(encoding)?),
        })
    }

    pub fn is_tls(&self) -> bool {
        #[cfg(feature = "tls")]
        {
            matches!(self, Self::Tls { .. })
        }
        #[cfg(not(feature = "tls"))]
        {
            false
        }
    }

    /// Next inbound line, or `None` once the peer has closed the stream.
    pub async fn read_line(&mut self) -> Result<Option<String>, ConnectionError> {
        macro_rules! read_framed {
            ($framed:expr) => {
                match $framed.next().await {
                    Some(Ok(line)) => Ok(Some(line)),
                    Some(Err(e)) => Err(ConnectionError::from(e)),
                    None => Ok(None),
                }
            };
        }

        match self {
            Transport::Tcp { framed } => read_framed!(framed),
            #[cfg(feature = "tls")]
            Transport::Tls { framed } => read_framed!(framed),
        }
    }

    pub async fn write_message(&mut self, message: Message) -> Result<(), ConnectionError> {
        match self {
            Transport::Tcp { framed } => framed.send(message).await?,
            #[cfg(feature = "tls")]
            Transport::Tls { framed } => framed.send(message).await?,
        }
        Ok(())
    }
}

impl std::fmt::Debug for Transport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transport")
            .field("tls", &self.is_tls())
            .finish_non_exhaustive()
    }
}

fn enable_keepalive(stream: &TcpStream) -> std::io::Result<()> {
    use socket2::{SockRef, TcpKeepalive};

    let sock = SockRef::from(stream);
    let keepalive = TcpKeepalive::new()
        .with_time(Duration::from_secs(120))
        .with_interval(Duration::from_secs(30));
    sock.set_tcp_keepalive(&keepalive)
}

use std::io::{self, Write};
use std::net::{Shutdown, SocketAddr, TcpStream, ToSocketAddrs, UdpSocket};
use std::time::Duration;

use tracing::debug;

use crate::endpoint::{Endpoint, Scheme};
use crate::error::{Result, TransportError};

/// A connected GELF transport implementing `Write`.
///
/// On UDP every `write` call is sent as exactly one datagram, so callers that
/// frame their output (the chunk writer) must hand over one frame per call.
/// On TCP the bytes form a continuous stream.
pub struct GelfConn {
    inner: GelfConnInner,
}

enum GelfConnInner {
    Udp(UdpSocket),
    Tcp(TcpStream),
}

impl GelfConn {
    /// Connect to the endpoint using the transport named by its scheme.
    ///
    /// Every resolved address is tried in order; the last error is returned
    /// if none of them accepts the connection.
    pub fn dial(endpoint: &Endpoint) -> Result<Self> {
        let authority = endpoint.authority();
        let connect_err = |source: io::Error| TransportError::Connect {
            addr: authority.clone(),
            source,
        };

        let addrs: Vec<SocketAddr> = (endpoint.host(), endpoint.port())
            .to_socket_addrs()
            .map_err(connect_err)?
            .collect();

        let mut last_err =
            io::Error::new(io::ErrorKind::NotFound, "host resolved to no addresses");
        for addr in addrs {
            let attempt = match endpoint.scheme() {
                Scheme::Udp => connect_udp(addr).map(GelfConnInner::Udp),
                Scheme::Tcp => TcpStream::connect(addr).map(GelfConnInner::Tcp),
            };
            match attempt {
                Ok(inner) => {
                    debug!(%addr, scheme = %endpoint.scheme(), "connected to gelf endpoint");
                    return Ok(Self { inner });
                }
                Err(err) => {
                    debug!(%addr, error = %err, "connect attempt failed");
                    last_err = err;
                }
            }
        }

        Err(connect_err(last_err))
    }

    /// Wrap an already connected UDP socket.
    pub fn from_udp(socket: UdpSocket) -> Self {
        Self {
            inner: GelfConnInner::Udp(socket),
        }
    }

    /// Wrap an already connected TCP stream.
    pub fn from_tcp(stream: TcpStream) -> Self {
        Self {
            inner: GelfConnInner::Tcp(stream),
        }
    }

    /// Transport kind backing this connection.
    pub fn scheme(&self) -> Scheme {
        match &self.inner {
            GelfConnInner::Udp(_) => Scheme::Udp,
            GelfConnInner::Tcp(_) => Scheme::Tcp,
        }
    }

    /// Address of the remote endpoint.
    pub fn peer_addr(&self) -> Result<SocketAddr> {
        match &self.inner {
            GelfConnInner::Udp(socket) => socket.peer_addr().map_err(Into::into),
            GelfConnInner::Tcp(stream) => stream.peer_addr().map_err(Into::into),
        }
    }

    /// Set write timeout on the underlying socket.
    pub fn set_write_timeout(&self, timeout: Option<Duration>) -> Result<()> {
        match &self.inner {
            GelfConnInner::Udp(socket) => socket.set_write_timeout(timeout).map_err(Into::into),
            GelfConnInner::Tcp(stream) => stream.set_write_timeout(timeout).map_err(Into::into),
        }
    }

    /// Close the connection.
    ///
    /// TCP streams are shut down in both directions; a peer that already went
    /// away is not treated as an error. UDP sockets are simply released.
    pub fn close(self) -> Result<()> {
        match self.inner {
            GelfConnInner::Udp(_) => Ok(()),
            GelfConnInner::Tcp(stream) => match stream.shutdown(Shutdown::Both) {
                Ok(()) => Ok(()),
                Err(err) if err.kind() == io::ErrorKind::NotConnected => Ok(()),
                Err(err) => Err(TransportError::Io(err)),
            },
        }
    }
}

fn connect_udp(addr: SocketAddr) -> io::Result<UdpSocket> {
    let local: SocketAddr = if addr.is_ipv4() {
        ([0, 0, 0, 0], 0).into()
    } else {
        ([0u16; 8], 0).into()
    };
    let socket = UdpSocket::bind(local)?;
    socket.connect(addr)?;
    Ok(socket)
}

impl Write for GelfConn {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match &mut self.inner {
            GelfConnInner::Udp(socket) => socket.send(buf),
            GelfConnInner::Tcp(stream) => stream.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match &mut self.inner {
            GelfConnInner::Udp(_) => Ok(()),
            GelfConnInner::Tcp(stream) => stream.flush(),
        }
    }
}

impl std::fmt::Debug for GelfConn {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GelfConn")
            .field("type", &self.scheme().as_str())
            .finish()
    }
}

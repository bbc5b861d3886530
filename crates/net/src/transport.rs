//! Connected byte stream: plain TCP or TLS over TCP.

use std::io::{self, Read, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;

use rustls::{ClientConnection, StreamOwned};
use tracing::debug;

use crate::NetError;
use crate::tls::{self, TlsOptions};

#[derive(Debug)]
pub enum Transport {
    Plain(TcpStream),
    Tls(Box<StreamOwned<ClientConnection, TcpStream>>),
}

impl Transport {
    /// Connect to `host:port`, optionally running a TLS handshake.
    pub fn connect(
        host: &str,
        port: u16,
        tls_options: Option<&TlsOptions>,
        connect_timeout: Duration,
        read_timeout: Duration,
    ) -> Result<Self, NetError> {
        let tcp = connect_tcp(host, port, connect_timeout)?;
        tcp.set_read_timeout(Some(read_timeout))?;

        match tls_options {
            None => Ok(Transport::Plain(tcp)),
            Some(options) => {
                let config = tls::client_config(options)?;
                let stream = tls::connect(host, tcp, config)?;
                Ok(Transport::Tls(Box::new(stream)))
            }
        }
    }

    /// The protocol the peer selected via ALPN, if any.
    pub fn alpn_protocol(&self) -> Option<&[u8]> {
        match self {
            Transport::Plain(_) => None,
            Transport::Tls(stream) => stream.conn.alpn_protocol(),
        }
    }

    pub fn is_tls(&self) -> bool {
        matches!(self, Transport::Tls(_))
    }
}

impl Read for Transport {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            Transport::Plain(s) => s.read(buf),
            Transport::Tls(s) => s.read(buf),
        }
    }
}

impl Write for Transport {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Transport::Plain(s) => s.write(buf),
            Transport::Tls(s) => s.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Transport::Plain(s) => s.flush(),
            Transport::Tls(s) => s.flush(),
        }
    }
}

/// Resolve `host` and try each address in order.
fn connect_tcp(host: &str, port: u16, timeout: Duration) -> Result<TcpStream, NetError> {
    let addrs = (host, port)
        .to_socket_addrs()
        .map_err(|e| NetError::Resolve(format!("{host}: {e}")))?;

    let mut last_err = None;
    for addr in addrs {
        match TcpStream::connect_timeout(&addr, timeout) {
            Ok(stream) => {
                debug!(%addr, "connected");
                stream.set_nodelay(true)?;
                return Ok(stream);
            }
            Err(e) => {
                debug!(%addr, error = %e, "connect failed");
                last_err = Some(e);
            }
        }
    }

    Err(match last_err {
        Some(e) => NetError::Io(e),
        None => NetError::Resolve(format!("no addresses found for {host}")),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::TcpListener;
    use std::thread;

    #[test]
    fn test_plain_connect_round_trip() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        let server = thread::spawn(move || {
            let (mut sock, _) = listener.accept().unwrap();
            let mut buf = [0u8; 4];
            sock.read_exact(&mut buf).unwrap();
            sock.write_all(&buf).unwrap();
        });

        let timeout = Duration::from_secs(5);
        let mut transport = Transport::connect("127.0.0.1", port, None, timeout, timeout).unwrap();
        assert!(!transport.is_tls());
        assert_eq!(transport.alpn_protocol(), None);

        transport.write_all(b"ping").unwrap();
        let mut echo = [0u8; 4];
        transport.read_exact(&mut echo).unwrap();
        assert_eq!(&echo, b"ping");
        server.join().unwrap();
    }

    #[test]
    fn test_connect_refused() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let timeout = Duration::from_secs(1);
        let result = Transport::connect("127.0.0.1", port, None, timeout, timeout);
        assert!(matches!(result, Err(NetError::Io(_))));
    }

    #[test]
    fn test_resolve_failure() {
        let timeout = Duration::from_secs(1);
        let result = Transport::connect("no-such-host.invalid", 80, None, timeout, timeout);
        assert!(matches!(result, Err(NetError::Resolve(_))));
    }
}

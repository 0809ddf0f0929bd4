use std::io::{self, BufRead, BufReader, Write};
use std::net::{Shutdown, SocketAddr, TcpStream, ToSocketAddrs};
use std::time::Duration;

use log::{debug, warn};

use super::interface::{InstrumentBus, InstrumentLink};
use crate::error::ScopeError;

/// Raw-socket SCPI bus.
///
/// Plain TCP has no broadcast discovery mechanism, so the known endpoints
/// come from configuration and `list_resources` simply reports them.
pub struct SocketBus {
    resources: Vec<String>,
    connect_timeout: Duration,
}

impl SocketBus {
    pub fn new(resources: Vec<String>, connect_timeout: Duration) -> Self {
        Self {
            resources,
            connect_timeout,
        }
    }
}

impl InstrumentBus for SocketBus {
    fn list_resources(&self) -> Result<Vec<String>, ScopeError> {
        Ok(self.resources.clone())
    }

    fn open(&self, locator: &str) -> Result<Box<dyn InstrumentLink>, ScopeError> {
        let link = SocketLink::open(locator, self.connect_timeout)?;
        Ok(Box::new(link))
    }
}

/// Parse a resource locator into host and port.
///
/// Accepts the VISA raw-socket form `TCPIP[n]::<host>::<port>::SOCKET`
/// as well as plain `host:port`.
pub fn parse_locator(locator: &str) -> Result<(String, u16), ScopeError> {
    let invalid = || ScopeError::InvalidAddress(locator.to_string());

    if locator.contains("::") {
        let parts: Vec<&str> = locator.split("::").collect();
        match parts.as_slice() {
            [iface, host, port, kind]
                if iface.starts_with("TCPIP")
                    && kind.eq_ignore_ascii_case("SOCKET")
                    && !host.is_empty() =>
            {
                let port = port.parse::<u16>().map_err(|_| invalid())?;
                Ok((host.to_string(), port))
            }
            _ => Err(invalid()),
        }
    } else {
        let (host, port) = locator.rsplit_once(':').ok_or_else(invalid)?;
        if host.is_empty() {
            return Err(invalid());
        }
        let port = port.parse::<u16>().map_err(|_| invalid())?;
        Ok((host.to_string(), port))
    }
}

/// One raw-socket link to an SCPI instrument, newline-delimited in both
/// directions.
pub struct SocketLink {
    stream: TcpStream,
    reader: BufReader<TcpStream>,
    peer: String,
}

impl SocketLink {
    pub fn open(locator: &str, connect_timeout: Duration) -> Result<Self, ScopeError> {
        let (host, port) = parse_locator(locator)?;
        let peer = format!("{host}:{port}");

        let addr: SocketAddr = peer
            .to_socket_addrs()
            .map_err(|_| ScopeError::InvalidAddress(locator.to_string()))?
            .next()
            .ok_or_else(|| ScopeError::InvalidAddress(locator.to_string()))?;

        debug!("Opening raw-socket link to {peer}");

        let stream = TcpStream::connect_timeout(&addr, connect_timeout).map_err(|e| {
            warn!("Failed to connect to {peer}: {e}");
            map_io(e, format!("Failed to connect to {peer}"))
        })?;
        stream
            .set_nodelay(true)
            .map_err(|e| map_io(e, format!("Failed to set nodelay on {peer}")))?;

        let reader = BufReader::new(
            stream
                .try_clone()
                .map_err(|e| map_io(e, format!("Failed to clone stream for {peer}")))?,
        );

        debug!("Raw-socket link to {peer} open");

        Ok(Self {
            stream,
            reader,
            peer,
        })
    }
}

fn map_io(e: io::Error, context: String) -> ScopeError {
    match e.kind() {
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => ScopeError::Timeout,
        _ => ScopeError::Io { source: e, context },
    }
}

impl InstrumentLink for SocketLink {
    fn write(&mut self, command: &str) -> Result<(), ScopeError> {
        debug!("-> {command}");
        self.stream
            .write_all(command.as_bytes())
            .and_then(|_| self.stream.write_all(b"\n"))
            .and_then(|_| self.stream.flush())
            .map_err(|e| map_io(e, format!("Write to {} failed", self.peer)))
    }

    fn query(&mut self, command: &str) -> Result<String, ScopeError> {
        self.write(command)?;
        let mut response = String::new();
        let n = self
            .reader
            .read_line(&mut response)
            .map_err(|e| map_io(e, format!("Read from {} failed", self.peer)))?;
        if n == 0 {
            return Err(ScopeError::Protocol(format!(
                "Connection closed by {}",
                self.peer
            )));
        }
        debug!("<- {}", response.trim_end());
        Ok(response)
    }

    fn set_timeout(&mut self, timeout: Duration) -> Result<(), ScopeError> {
        self.stream
            .set_read_timeout(Some(timeout))
            .and_then(|_| self.stream.set_write_timeout(Some(timeout)))
            .map_err(|e| map_io(e, format!("Failed to set timeout on {}", self.peer)))
    }

    fn close(&mut self) -> Result<(), ScopeError> {
        debug!("Closing link to {}", self.peer);
        match self.stream.shutdown(Shutdown::Both) {
            Ok(()) => Ok(()),
            // Already torn down by the peer; nothing left to release
            Err(e) if e.kind() == io::ErrorKind::NotConnected => Ok(()),
            Err(e) => Err(map_io(e, format!("Failed to close link to {}", self.peer))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_visa_socket_locator() {
        let (host, port) = parse_locator("TCPIP0::192.168.1.5::5025::SOCKET").unwrap();
        assert_eq!(host, "192.168.1.5");
        assert_eq!(port, 5025);

        let (host, port) = parse_locator("TCPIP::scope.lab.local::5555::socket").unwrap();
        assert_eq!(host, "scope.lab.local");
        assert_eq!(port, 5555);
    }

    #[test]
    fn test_parse_plain_host_port() {
        let (host, port) = parse_locator("127.0.0.1:5025").unwrap();
        assert_eq!(host, "127.0.0.1");
        assert_eq!(port, 5025);
    }

    #[test]
    fn test_parse_rejects_malformed_locators() {
        for bad in [
            "",
            "no-port",
            ":5025",
            "TCPIP0::192.168.1.5::SOCKET",
            "TCPIP0::192.168.1.5::notaport::SOCKET",
            "USB0::0x1AB1::0x04CE::INSTR",
            "host:notaport",
        ] {
            assert!(
                matches!(parse_locator(bad), Err(ScopeError::InvalidAddress(_))),
                "expected InvalidAddress for {bad:?}"
            );
        }
    }
}

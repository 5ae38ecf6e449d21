//! The raw byte transport between the two parties.
//!
//! The protocol engine only ever talks to a [`Link`]: a blocking,
//! ordered, reliable byte pipe. Any reordering or loss underneath is a
//! fatal protocol violation, so the implementations here simply bubble
//! I/O errors up as [`ProtocolError::TransportFailure`].

use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::mpsc::{channel, Receiver, Sender};

use crate::ProtocolError;

/// A blocking, ordered byte transport.
pub trait Link {
    /// Sends all of `bytes`.
    fn send(&mut self, bytes: &[u8]) -> Result<(), ProtocolError>;

    /// Fills all of `bytes` from the peer.
    fn recv(&mut self, bytes: &mut [u8]) -> Result<(), ProtocolError>;

    /// Pushes any buffered bytes onto the wire.
    fn flush(&mut self) -> Result<(), ProtocolError>;
}

/// TCP-backed link.
pub struct NetLink {
    stream: TcpStream,
}

impl NetLink {
    /// Connects to a listening peer (the prover side).
    pub fn connect(address: &str, port: u16) -> Result<NetLink, ProtocolError> {
        let stream = TcpStream::connect((address, port))?;
        stream.set_nodelay(true)?;
        Ok(NetLink { stream })
    }

    /// Accepts one connection (the verifier side).
    pub fn listen(port: u16) -> Result<NetLink, ProtocolError> {
        let listener = TcpListener::bind(("0.0.0.0", port))?;
        let (stream, _) = listener.accept()?;
        stream.set_nodelay(true)?;
        Ok(NetLink { stream })
    }
}

impl Link for NetLink {
    fn send(&mut self, bytes: &[u8]) -> Result<(), ProtocolError> {
        self.stream.write_all(bytes)?;
        Ok(())
    }

    fn recv(&mut self, bytes: &mut [u8]) -> Result<(), ProtocolError> {
        self.stream.read_exact(bytes)?;
        Ok(())
    }

    fn flush(&mut self) -> Result<(), ProtocolError> {
        self.stream.flush()?;
        Ok(())
    }
}

/// Decorator that tracks cumulative bytes transferred in both
/// directions.
pub struct MeasureLink<'a> {
    inner: &'a mut dyn Link,
    traffic: u64,
}

impl<'a> MeasureLink<'a> {
    pub fn new(inner: &'a mut dyn Link) -> MeasureLink<'a> {
        MeasureLink { inner, traffic: 0 }
    }

    /// Total bytes sent plus received through this decorator.
    #[must_use]
    pub fn traffic(&self) -> u64 {
        self.traffic
    }
}

impl Link for MeasureLink<'_> {
    fn send(&mut self, bytes: &[u8]) -> Result<(), ProtocolError> {
        self.traffic += bytes.len() as u64;
        self.inner.send(bytes)
    }

    fn recv(&mut self, bytes: &mut [u8]) -> Result<(), ProtocolError> {
        self.traffic += bytes.len() as u64;
        self.inner.recv(bytes)
    }

    fn flush(&mut self) -> Result<(), ProtocolError> {
        self.inner.flush()
    }
}

/// In-process link pair for tests: two cross-wired byte channels.
pub struct PipeLink {
    outgoing: Sender<Vec<u8>>,
    incoming: Receiver<Vec<u8>>,
    pending: Vec<u8>,
}

impl PipeLink {
    /// Creates both endpoints of a connected pair.
    #[must_use]
    pub fn pair() -> (PipeLink, PipeLink) {
        let (left_sender, left_receiver) = channel();
        let (right_sender, right_receiver) = channel();
        (
            PipeLink {
                outgoing: left_sender,
                incoming: right_receiver,
                pending: Vec::new(),
            },
            PipeLink {
                outgoing: right_sender,
                incoming: left_receiver,
                pending: Vec::new(),
            },
        )
    }
}

impl Link for PipeLink {
    fn send(&mut self, bytes: &[u8]) -> Result<(), ProtocolError> {
        self.outgoing
            .send(bytes.to_vec())
            .map_err(|_| ProtocolError::ProtocolViolation(String::from("peer hung up")))
    }

    fn recv(&mut self, bytes: &mut [u8]) -> Result<(), ProtocolError> {
        while self.pending.len() < bytes.len() {
            let chunk = self.incoming.recv().map_err(|_| {
                ProtocolError::ProtocolViolation(String::from("peer hung up mid-message"))
            })?;
            self.pending.extend_from_slice(&chunk);
        }
        bytes.copy_from_slice(&self.pending[..bytes.len()]);
        self.pending.drain(..bytes.len());
        Ok(())
    }

    fn flush(&mut self) -> Result<(), ProtocolError> {
        Ok(())
    }
}

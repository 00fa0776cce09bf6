// SPDX-License-Identifier: Apache-2.0

//! Transport multiplexing (spec §1 Non-goals, "socket multiplexer"):
//! the reactor/poller internals are out of scope, but the dispatcher
//! still needs something behind [`EventMultiplexer`] to accept
//! connections and move frames. [`StdMultiplexer`] is the reference
//! implementation, a direct, blocking stand-in built on
//! `std::net`/`std::os::unix::net` rather than a real non-blocking
//! reactor, since the spec's single-threaded event loop (§5) is
//! modeled here as one poll-and-dispatch call per tick rather than as
//! genuine async I/O.

use std::io::{self, Read, Write};
use std::net::{TcpListener, TcpStream};
#[cfg(unix)]
use std::os::unix::net::{UnixListener, UnixStream};

use amplify::{Display, Error, From};

use crate::datastore::SessionId;

/// What the event loop consumes from a multiplexer each tick.
pub enum Incoming {
    Connected(SessionId, String),
    Frame(SessionId, Vec<u8>),
    Disconnected(SessionId),
}

pub trait EventMultiplexer {
    fn poll(&mut self) -> Result<Vec<Incoming>, MultiplexerError>;
    fn send(&mut self, session: SessionId, frame: &[u8]) -> Result<(), MultiplexerError>;
    fn disconnect(&mut self, session: SessionId);
}

#[derive(Debug, Display, Error, From)]
#[display(doc_comments)]
pub enum MultiplexerError {
    #[from]
    Io(io::Error),
    /// no connection is registered for session {0:?}
    UnknownSession(SessionId),
}

enum Peer {
    Tcp(TcpStream),
    #[cfg(unix)]
    Unix(UnixStream),
}

impl Peer {
    fn write_frame(&mut self, frame: &[u8]) -> io::Result<()> {
        let len = (frame.len() as u32).to_be_bytes();
        match self {
            Peer::Tcp(s) => {
                s.write_all(&len)?;
                s.write_all(frame)
            }
            #[cfg(unix)]
            Peer::Unix(s) => {
                s.write_all(&len)?;
                s.write_all(frame)
            }
        }
    }

    /// Reads one length-prefixed frame, returning `Ok(None)` on a
    /// clean peer shutdown. The frame format itself is this crate's
    /// placeholder for whatever the real transport encoding is (spec
    /// §1 Non-goals, "low-level serialization format").
    fn read_frame(&mut self) -> io::Result<Option<Vec<u8>>> {
        let mut len_buf = [0u8; 4];
        let read = match self {
            Peer::Tcp(s) => read_exact_or_eof(s, &mut len_buf)?,
            #[cfg(unix)]
            Peer::Unix(s) => read_exact_or_eof(s, &mut len_buf)?,
        };
        if !read {
            return Ok(None);
        }
        let len = u32::from_be_bytes(len_buf) as usize;
        let mut buf = vec![0u8; len];
        match self {
            Peer::Tcp(s) => s.read_exact(&mut buf)?,
            #[cfg(unix)]
            Peer::Unix(s) => s.read_exact(&mut buf)?,
        }
        Ok(Some(buf))
    }

    /// Best-effort peer identity string used to seed `Session::identity`
    /// (spec §6 "peer credential lookup"). The `rustix` call resolves a
    /// Unix-socket peer's uid; TCP peers fall back to their address.
    fn identity(&self) -> String {
        match self {
            Peer::Tcp(s) => s.peer_addr().map(|a| a.to_string()).unwrap_or_else(|_| "tcp-peer".into()),
            #[cfg(unix)]
            Peer::Unix(s) => unix_peer_identity(s),
        }
    }
}

fn read_exact_or_eof(mut r: impl Read, buf: &mut [u8]) -> io::Result<bool> {
    let mut total = 0;
    while total < buf.len() {
        match r.read(&mut buf[total..]) {
            Ok(0) if total == 0 => return Ok(false),
            Ok(0) => return Err(io::ErrorKind::UnexpectedEof.into()),
            Ok(n) => total += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(true)
}

#[cfg(unix)]
fn unix_peer_identity(stream: &UnixStream) -> String {
    use std::os::fd::AsFd;
    match rustix::net::sockopt::socket_peercred(stream.as_fd()) {
        Ok(cred) => format!("uid={}", cred.uid.as_raw()),
        Err(_) => "unix-peer".into(),
    }
}

/// Blocking, single-listener reference multiplexer. Kept intentionally
/// simple: one `accept`/read pass per [`poll`](EventMultiplexer::poll)
/// call, matching the "no internal threads" requirement by never
/// spawning a thread of its own; a production deployment replaces this
/// with a real non-blocking reactor behind the same trait.
pub struct StdMultiplexer {
    listener: TcpListener,
    #[cfg(unix)]
    unix_listener: Option<UnixListener>,
    peers: std::collections::BTreeMap<SessionId, Peer>,
    next_id: u64,
}

impl StdMultiplexer {
    pub fn bind_tcp(addr: &str) -> Result<Self, MultiplexerError> {
        let listener = TcpListener::bind(addr)?;
        listener.set_nonblocking(true)?;
        Ok(Self {
            listener,
            #[cfg(unix)]
            unix_listener: None,
            peers: Default::default(),
            next_id: 1,
        })
    }

    #[cfg(unix)]
    pub fn with_unix_socket(mut self, path: &str) -> Result<Self, MultiplexerError> {
        let listener = UnixListener::bind(path)?;
        listener.set_nonblocking(true)?;
        self.unix_listener = Some(listener);
        Ok(self)
    }

    fn register(&mut self, peer: Peer) -> SessionId {
        let id = SessionId(self.next_id);
        self.next_id += 1;
        self.peers.insert(id, peer);
        id
    }
}

impl EventMultiplexer for StdMultiplexer {
    fn poll(&mut self) -> Result<Vec<Incoming>, MultiplexerError> {
        let mut out = Vec::new();

        loop {
            match self.listener.accept() {
                Ok((stream, _addr)) => {
                    stream.set_nonblocking(true)?;
                    let peer = Peer::Tcp(stream);
                    let identity = peer.identity();
                    let id = self.register(peer);
                    out.push(Incoming::Connected(id, identity));
                }
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => break,
                Err(e) => return Err(e.into()),
            }
        }

        #[cfg(unix)]
        if let Some(listener) = self.unix_listener.take() {
            loop {
                match listener.accept() {
                    Ok((stream, _addr)) => {
                        stream.set_nonblocking(true)?;
                        let peer = Peer::Unix(stream);
                        let identity = peer.identity();
                        let id = self.register(peer);
                        out.push(Incoming::Connected(id, identity));
                    }
                    Err(e) if e.kind() == io::ErrorKind::WouldBlock => break,
                    Err(e) => {
                        self.unix_listener = Some(listener);
                        return Err(e.into());
                    }
                }
            }
            self.unix_listener = Some(listener);
        }

        let mut disconnected = Vec::new();
        for (&id, peer) in self.peers.iter_mut() {
            loop {
                match peer.read_frame() {
                    Ok(Some(frame)) => out.push(Incoming::Frame(id, frame)),
                    Ok(None) => {
                        disconnected.push(id);
                        break;
                    }
                    Err(e) if e.kind() == io::ErrorKind::WouldBlock => break,
                    Err(_) => {
                        disconnected.push(id);
                        break;
                    }
                }
            }
        }
        for id in disconnected {
            self.peers.remove(&id);
            out.push(Incoming::Disconnected(id));
        }

        Ok(out)
    }

    fn send(&mut self, session: SessionId, frame: &[u8]) -> Result<(), MultiplexerError> {
        let peer = self.peers.get_mut(&session).ok_or(MultiplexerError::UnknownSession(session))?;
        peer.write_frame(frame)?;
        Ok(())
    }

    fn disconnect(&mut self, session: SessionId) { self.peers.remove(&session); }
}

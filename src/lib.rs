//! Blocking TCP sockets over raw libc calls.
//!
//! One [`Socket`] owns one file descriptor. Operations map one-to-one onto
//! syscalls, except [`Socket::write`], which keeps sending until the whole
//! buffer is out. Every failure is a [`SystemError`] carrying errno.
//!
//! ```ignore
//! let listener = sockline::tcp_listening(7000, Some("127.0.0.1"), None)?;
//! let conn = listener.accept()?;
//! let mut buf = [0u8; 512];
//! let n = conn.read(&mut buf)?;
//! conn.write(&buf[..n])?;
//! ```

pub mod socket;
mod addr;
mod error;

pub use self::error::{SystemError, Result, errno};
pub use self::addr::{RawAddress, SocketAddrV4, ToSockAddr, FromSockAddr};
pub use self::socket::{Socket, Family, SockType, Protocol, Shutdown, tcp_listening, drain};
pub use self::socket::{SockOpt, OptionValue, ValueKind, Encoded, Linger,
					   REUSE_ADDR, REUSE_PORT, KEEPALIVE, TCP_NODELAY,
					   RECV_BUFFER, SEND_BUFFER, KEEPALIVE_IDLE, KEEPALIVE_INTERVAL, KEEPALIVE_COUNT,
					   RECV_TIMEOUT, SEND_TIMEOUT, LINGER};
pub use self::socket::{ListenerBuilder, ConnectorBuilder,
					   BufferConfig, ReuseConfig, TcpConfig, KeepaliveConfig, TimeoutConfig};

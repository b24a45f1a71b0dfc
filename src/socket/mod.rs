mod raw;
mod stream;
mod listener;
mod options;
mod builder;

pub use self::raw::Socket;
pub use self::stream::{Shutdown, drain};
pub use self::listener::tcp_listening;
pub use self::options::{SockOpt, OptionValue, ValueKind, Encoded, Linger};
pub use self::options::{
	REUSE_ADDR, REUSE_PORT, KEEPALIVE, TCP_NODELAY,
	RECV_BUFFER, SEND_BUFFER, KEEPALIVE_IDLE, KEEPALIVE_INTERVAL, KEEPALIVE_COUNT,
	RECV_TIMEOUT, SEND_TIMEOUT, LINGER,
};
pub use self::builder::{ListenerBuilder, ConnectorBuilder,
						BufferConfig, ReuseConfig, TcpConfig, KeepaliveConfig, TimeoutConfig};

/// Address family passed as the first argument of `socket()`.
///
/// Only `Inet` has an address builder; the others exist so callers can
/// create handles they bind through other means.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Family {
	Inet,
	Inet6,
	Unix,
}

impl Family {
	#[inline]
	pub fn raw(self) -> libc::c_int {
		match self {
			Family::Inet => libc::AF_INET,
			Family::Inet6 => libc::AF_INET6,
			Family::Unix => libc::AF_UNIX,
		}
	}
}

/// Socket type marker.
///
/// - `Stream` — reliable, ordered byte stream (TCP-like)
/// - `Datagram` — unreliable, unordered packets (UDP-like)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SockType {
	#[default]
	Stream,
	Datagram,
}

impl SockType {
	#[inline]
	pub fn raw(self) -> libc::c_int {
		match self {
			SockType::Stream => libc::SOCK_STREAM,
			SockType::Datagram => libc::SOCK_DGRAM,
		}
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Protocol {
	/// Let the kernel pick the default for the family/type pair.
	Unspecified,
	#[default]
	Tcp,
	Udp,
}

impl Protocol {
	#[inline]
	pub fn raw(self) -> libc::c_int {
		match self {
			Protocol::Unspecified => 0,
			Protocol::Tcp => libc::IPPROTO_TCP,
			Protocol::Udp => libc::IPPROTO_UDP,
		}
	}
}

/*
  ┌──────────┬─────────────┬───────────────┐
  │  Marker  │  Constant   │ Value (Linux) │
  ├──────────┼─────────────┼───────────────┤
  │ Inet     │ AF_INET     │ 2             │
  │ Stream   │ SOCK_STREAM │ 1             │
  │ Tcp      │ IPPROTO_TCP │ 6             │
  └──────────┴─────────────┴───────────────┘
*/

/// Number of descriptors this process has open.
#[cfg(test)]
pub(crate) fn open_fds() -> usize {
	std::fs::read_dir("/proc/self/fd").map(|dir| dir.count()).unwrap_or(0)
}

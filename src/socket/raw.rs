use std::cell::Cell;
use std::marker::PhantomData;
use std::os::fd::{AsFd, AsRawFd, BorrowedFd, FromRawFd, IntoRawFd, OwnedFd, RawFd};
use tracing::{debug, trace};
use crate::addr::{self, RawAddress, SocketAddrV4, ToSockAddr};
use crate::error::{Result, check};
use super::{Family, SockType, Protocol};
use super::options::{SockOpt, OptionValue};

/// A blocking socket that owns exactly one OS handle.
///
/// The handle is released when the Socket is closed or dropped, whichever
/// comes first. `close` consumes `self`, so a closed Socket can't be used.
///
/// # Threading
///
/// `Socket` is `Send` but not `Sync`: it can be moved to another thread
/// (one thread per accepted connection is the intended shape), but it can't
/// be shared between threads. Nothing inside is locked. If several threads
/// need to drive one connection, give the Socket to a single owner thread and
/// send it work over a channel.
pub struct Socket {
	fd: OwnedFd,
	_not_sync: PhantomData<Cell<()>>,
}

impl Socket {
	/// Creates a new socket.
	///
	/// Calls `socket()` with `SOCK_CLOEXEC`. A Socket only exists if this
	/// succeeded, so every Socket holds a live handle.
	pub fn create(family: Family, ty: SockType, protocol: Protocol) -> Result<Self> {
		let fd = check("socket", unsafe {
			libc::socket(family.raw(), ty.raw() | libc::SOCK_CLOEXEC, protocol.raw())
		})?;
		let fd = unsafe { OwnedFd::from_raw_fd(fd) };
		trace!(fd = fd.as_raw_fd(), ?family, ?ty, ?protocol, "socket created");

		Ok(Self::wrap(fd))
	}

	/// IPv4 TCP stream socket.
	pub fn tcp() -> Result<Self> {
		Self::create(Family::Inet, SockType::Stream, Protocol::Tcp)
	}

	/// Takes ownership of a handle obtained elsewhere.
	///
	/// No checks are made that `fd` is actually a socket.
	pub fn wrap(fd: OwnedFd) -> Self {
		Self {
			fd,
			_not_sync: PhantomData,
		}
	}

	/// Returns the raw file descriptor.
	///
	/// Used internally for syscalls. Does not transfer ownership.
	#[inline]
	pub fn as_raw_fd(&self) -> libc::c_int {
		self.fd.as_raw_fd()
	}

	/// Binds to `port` on `address`, or on `0.0.0.0` if the address is
	/// missing or not a dotted-decimal IPv4 literal.
	pub fn bind(&self, port: u16, address: Option<&str>) -> Result<()> {
		let addr = RawAddress::new(port, address);
		addr.with_raw(|ptr, len| check("bind", unsafe {
			libc::bind(self.as_raw_fd(), ptr, len)
		}))?;
		debug!(fd = self.as_raw_fd(), addr = ?addr, "bound");
		Ok(())
	}

	/// Connects to `port` on `address`. Blocks until the handshake finishes
	/// or fails.
	///
	/// A missing or unparsable address connects to `0.0.0.0`, which Linux
	/// treats as the local host.
	pub fn connect(&self, port: u16, address: Option<&str>) -> Result<()> {
		let addr = RawAddress::new(port, address);
		addr.with_raw(|ptr, len| check("connect", unsafe {
			libc::connect(self.as_raw_fd(), ptr, len)
		}))?;
		debug!(fd = self.as_raw_fd(), addr = ?addr, "connected");
		Ok(())
	}

	/// Sets a socket option.
	///
	/// The value is encoded according to its `ValueKind`; booleans always go
	/// down as a 4-byte int.
	pub fn set_option<T: OptionValue>(&self, option: SockOpt<T>, value: T) -> Result<()> {
		let encoded = value.encode();
		let bytes = encoded.as_bytes();
		check(option.label(), unsafe {
			libc::setsockopt(
				self.as_raw_fd(),
				option.level(),
				option.name(),
				bytes.as_ptr() as *const libc::c_void,
				bytes.len() as libc::socklen_t,
			)
		})?;
		trace!(fd = self.as_raw_fd(), option = option.label(), ?encoded, "option set");
		Ok(())
	}

	/// Returns the local address, e.g. the port the kernel picked for `bind(0)`.
	///
	/// `None` if the socket isn't IPv4.
	pub fn local_addr(&self) -> Result<Option<SocketAddrV4>> {
		addr::query("getsockname", |ptr, len| unsafe {
			libc::getsockname(self.as_raw_fd(), ptr, len)
		})
	}

	/// Returns the remote address of a connected socket.
	pub fn peer_addr(&self) -> Result<Option<SocketAddrV4>> {
		addr::query("getpeername", |ptr, len| unsafe {
			libc::getpeername(self.as_raw_fd(), ptr, len)
		})
	}

	/// Closes the handle.
	///
	/// The result of close(2) is ignored. On Linux the descriptor is released
	/// even when close reports an error, and retrying could close a
	/// descriptor some other thread has just been handed.
	pub fn close(self) {
		let fd = self.fd.into_raw_fd();
		let result = unsafe { libc::close(fd) };
		if result == -1 {
			debug!(fd, errno = crate::error::errno(), "close reported an error; ignored");
		} else {
			trace!(fd, "closed");
		}
	}
}

impl std::fmt::Debug for Socket {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Socket").field("fd", &self.as_raw_fd()).finish()
	}
}

impl AsRawFd for Socket {
	fn as_raw_fd(&self) -> RawFd {
		self.fd.as_raw_fd()
	}
}

impl AsFd for Socket {
	fn as_fd(&self) -> BorrowedFd<'_> {
		self.fd.as_fd()
	}
}

impl FromRawFd for Socket {
	unsafe fn from_raw_fd(fd: RawFd) -> Self {
		unsafe { Self::wrap(OwnedFd::from_raw_fd(fd)) }
	}
}

impl IntoRawFd for Socket {
	fn into_raw_fd(self) -> RawFd {
		self.fd.into_raw_fd()
	}
}

impl From<OwnedFd> for Socket {
	fn from(fd: OwnedFd) -> Self {
		Self::wrap(fd)
	}
}

impl From<Socket> for OwnedFd {
	fn from(socket: Socket) -> Self {
		socket.fd
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::socket::{REUSE_ADDR, RECV_TIMEOUT};

	#[test]
	fn test_create_tcp() {
		let socket = Socket::tcp().unwrap();
		assert!(socket.as_raw_fd() >= 0);
	}

	#[test]
	fn test_create_rejects_bad_combination() {
		let err = Socket::create(Family::Unix, SockType::Stream, Protocol::Tcp).unwrap_err();
		assert_eq!(err.op(), "socket");
		assert_ne!(err.errno(), 0);
	}

	#[test]
	fn test_bind_reports_kernel_port() {
		let socket = Socket::tcp().unwrap();
		socket.bind(0, Some("127.0.0.1")).unwrap();
		let local = socket.local_addr().unwrap().unwrap();
		assert_eq!(local.ip(), [127, 0, 0, 1]);
		assert_ne!(local.port(), 0);
	}

	#[test]
	fn test_set_option() {
		let socket = Socket::tcp().unwrap();
		socket.set_option(REUSE_ADDR, true).unwrap();
		socket.set_option(RECV_TIMEOUT, Some(std::time::Duration::from_millis(250))).unwrap();
	}

	#[test]
	fn test_set_option_failure_names_option() {
		let socket = Socket::create(Family::Inet, SockType::Datagram, Protocol::Udp).unwrap();
		let err = socket.set_option(crate::socket::TCP_NODELAY, true).unwrap_err();
		assert_eq!(err.op(), "TCP_NODELAY");
	}

	#[test]
	fn test_peer_addr_unconnected() {
		let socket = Socket::tcp().unwrap();
		let err = socket.peer_addr().unwrap_err();
		assert_eq!(err.errno(), libc::ENOTCONN);
	}
}

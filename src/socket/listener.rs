use std::os::fd::{FromRawFd, OwnedFd};
use tracing::debug;
use crate::addr::{FromSockAddr, SocketAddrV4};
use crate::error::{Result, check};
use super::raw::Socket;
use super::options::REUSE_ADDR;

impl Socket {
	/// Marks the socket as passive.
	///
	/// `backlog` — maximum pending connections queue size. The kernel caps it
	/// at `net.core.somaxconn`.
	pub fn listen(&self, backlog: i32) -> Result<()> {
		check("listen", unsafe { libc::listen(self.as_raw_fd(), backlog) })?;
		debug!(fd = self.as_raw_fd(), backlog, "listening");
		Ok(())
	}

	/// `listen` with the platform maximum backlog.
	pub fn listen_default(&self) -> Result<()> {
		self.listen(libc::SOMAXCONN)
	}

	/// Accepts an incoming connection.
	///
	/// Blocks until a client connects. The returned Socket owns a new handle;
	/// the listener keeps its own and can accept again.
	pub fn accept(&self) -> Result<Socket> {
		let fd = check("accept", unsafe {
			libc::accept4(
				self.as_raw_fd(),
				std::ptr::null_mut(),    // We don't need client address
				std::ptr::null_mut(),    // No address length
				libc::SOCK_CLOEXEC,      // Close on exec
			)
		})?;

		debug!(listener = self.as_raw_fd(), fd, "accepted");
		Ok(Socket::wrap(unsafe { OwnedFd::from_raw_fd(fd) }))
	}

	/// Accepts a connection, returning the client's address.
	///
	/// The address is `None` when the peer isn't IPv4.
	pub fn accept_with_addr(&self) -> Result<(Socket, Option<SocketAddrV4>)> {
		let mut storage: libc::sockaddr_storage = unsafe { std::mem::zeroed() };
		let mut len = std::mem::size_of::<libc::sockaddr_storage>() as libc::socklen_t;

		let fd = check("accept", unsafe {
			libc::accept4(
				self.as_raw_fd(),
				&mut storage as *mut _ as *mut libc::sockaddr,
				&mut len,
				libc::SOCK_CLOEXEC,
			)
		})?;
		let socket = Socket::wrap(unsafe { OwnedFd::from_raw_fd(fd) });

		let peer = unsafe {
			SocketAddrV4::from_sockaddr(&storage as *const _ as *const libc::sockaddr, len)
		};
		debug!(listener = self.as_raw_fd(), fd, peer = ?peer, "accepted");

		Ok((socket, peer))
	}
}

/// Creates an IPv4 TCP socket with `SO_REUSEADDR`, binds it and starts
/// listening.
///
/// `backlog` defaults to `SOMAXCONN`. If any step fails the error is
/// returned as is and the half-built socket is closed on the way out.
pub fn tcp_listening(port: u16, address: Option<&str>, backlog: Option<i32>) -> Result<Socket> {
	let socket = Socket::tcp()?;
	socket.set_option(REUSE_ADDR, true)?;
	socket.bind(port, address)?;
	socket.listen(backlog.unwrap_or(libc::SOMAXCONN))?;
	Ok(socket)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_tcp_listening_ephemeral() {
		let listener = tcp_listening(0, Some("127.0.0.1"), None).unwrap();
		let addr = listener.local_addr().unwrap().unwrap();
		assert_ne!(addr.port(), 0);
	}

	#[test]
	fn test_tcp_listening_port_in_use() {
		let first = Socket::tcp().unwrap();
		first.bind(0, Some("127.0.0.1")).unwrap();
		first.listen(1).unwrap();
		let port = first.local_addr().unwrap().unwrap().port();

		let err = tcp_listening(port, Some("127.0.0.1"), Some(1)).unwrap_err();
		assert_eq!(err.op(), "bind");
		assert_eq!(err.errno(), libc::EADDRINUSE);
	}

	#[test]
	fn test_failed_tcp_listening_releases_handle() {
		let first = Socket::tcp().unwrap();
		first.bind(0, Some("127.0.0.1")).unwrap();
		first.listen(1).unwrap();
		let port = first.local_addr().unwrap().unwrap().port();

		let before = crate::socket::open_fds();
		for _ in 0..200 {
			tcp_listening(port, Some("127.0.0.1"), Some(1)).unwrap_err();
		}
		let after = crate::socket::open_fds();

		// other tests open sockets concurrently; a leak would add 200
		assert!(after < before + 50, "fds grew from {} to {}", before, after);
	}

	#[test]
	fn test_accept_with_addr_reports_peer() {
		let listener = tcp_listening(0, Some("127.0.0.1"), Some(4)).unwrap();
		let port = listener.local_addr().unwrap().unwrap().port();

		let client = Socket::tcp().unwrap();
		client.connect(port, Some("127.0.0.1")).unwrap();

		let (accepted, peer) = listener.accept_with_addr().unwrap();
		let peer = peer.unwrap();
		assert_eq!(peer.ip(), [127, 0, 0, 1]);
		assert_eq!(Some(peer), client.local_addr().unwrap());
		assert_eq!(accepted.peer_addr().unwrap(), Some(peer));
	}
}

use tracing::trace;
use crate::error::{Result, SystemError, check};
use super::raw::Socket;

impl Socket {
	/// Reads a single byte.
	///
	/// Blocks until a byte arrives or the peer shuts down its side.
	/// Returns `None` on orderly shutdown.
	pub fn read_byte(&self) -> Result<Option<u8>> {
		let mut byte = 0u8;
		let n = self.read(std::slice::from_mut(&mut byte))?;
		Ok((n == 1).then_some(byte))
	}

	/// One recv(2) into `buf`.
	///
	/// Returns how many bytes arrived, which may be fewer than `buf.len()`.
	/// Zero means the peer shut down (or `buf` was empty); it is not an error.
	pub fn read(&self, buf: &mut [u8]) -> Result<usize> {
		let n = check("recv", unsafe {
			libc::recv(
				self.as_raw_fd(),
				buf.as_mut_ptr() as *mut libc::c_void,
				buf.len(),
				0,
			)
		})?;
		Ok(n as usize)
	}

	/// One send(2) from `buf`; may send only part of it.
	///
	/// Most callers want [`Socket::write`].
	pub fn send(&self, buf: &[u8]) -> Result<usize> {
		let n = check("send", self.send_raw(buf))?;
		Ok(n as usize)
	}

	/// Writes all of `buf`, looping over partial sends.
	///
	/// Either every byte is handed to the kernel or an error is returned.
	/// If an error comes back part way through, an unknown prefix of `buf`
	/// has already been sent.
	pub fn write(&self, buf: &[u8]) -> Result<()> {
		drain("send", buf, |chunk| self.send_raw(chunk))
	}

	// MSG_NOSIGNAL: a closed peer gives EPIPE instead of killing the process
	fn send_raw(&self, buf: &[u8]) -> libc::ssize_t {
		unsafe {
			libc::send(
				self.as_raw_fd(),
				buf.as_ptr() as *const libc::c_void,
				buf.len(),
				libc::MSG_NOSIGNAL,
			)
		}
	}

	/// Shuts down one or both halves of the connection.
	pub fn shutdown(&self, how: Shutdown) -> Result<()> {
		let how = match how {
			Shutdown::Read => libc::SHUT_RD,
			Shutdown::Write => libc::SHUT_WR,
			Shutdown::ReadWrite => libc::SHUT_RDWR,
		};
		check("shutdown", unsafe { libc::shutdown(self.as_raw_fd(), how) })?;
		Ok(())
	}
}

/// Feeds `buf` to `send` until it is empty.
///
/// `send` gets the unsent tail and returns what the syscall returned. Any
/// result of zero or less ends the loop with an error built from the errno
/// at that moment; there is no retry, not even on `EINTR`.
pub fn drain<F>(op: &'static str, mut buf: &[u8], mut send: F) -> Result<()>
where
	F: FnMut(&[u8]) -> libc::ssize_t,
{
	while !buf.is_empty() {
		let n = send(buf);
		if n <= 0 {
			return Err(SystemError::last(op));
		}
		let n = (n as usize).min(buf.len());
		buf = &buf[n..];
		trace!(sent = n, remaining = buf.len(), "write progress");
	}
	Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shutdown {
	Read,   // SHUT_RD
	Write,  // SHUT_WR
	ReadWrite,   // SHUT_RDWR
}

impl std::io::Read for Socket {
	fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
		Ok(Socket::read(self, buf)?)
	}
}

impl std::io::Write for Socket {
	fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
		Ok(Socket::send(self, buf)?)
	}

	fn write_all(&mut self, buf: &[u8]) -> std::io::Result<()> {
		Ok(Socket::write(self, buf)?)
	}

	fn flush(&mut self) -> std::io::Result<()> {
		Ok(())  // nothing buffered at this level
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::error::set_errno;

	#[test]
	fn test_drain_partial_writes() {
		let buf: Vec<u8> = (0..10).collect();
		let mut results = vec![3isize, 4, 3].into_iter();
		let mut seen = Vec::new();

		drain("send", &buf, |chunk| {
			seen.push(chunk.to_vec());
			results.next().unwrap()
		}).unwrap();

		assert_eq!(seen.len(), 3);
		assert_eq!(seen[0], buf);
		assert_eq!(seen[1], &buf[3..]);
		assert_eq!(seen[2], &buf[7..]);
		assert!(results.next().is_none());
	}

	#[test]
	fn test_drain_single_call() {
		let mut calls = 0;
		drain("send", b"hello", |chunk| {
			calls += 1;
			chunk.len() as isize
		}).unwrap();
		assert_eq!(calls, 1);
	}

	#[test]
	fn test_drain_empty_never_calls() {
		drain("send", &[], |_| panic!("send called for empty buffer")).unwrap();
	}

	#[test]
	fn test_drain_negative_result_fails_with_its_errno() {
		let mut calls = 0;
		let err = drain("send", b"0123456789", |_| {
			calls += 1;
			if calls == 1 {
				4
			} else {
				set_errno(libc::EPIPE);
				-1
			}
		}).unwrap_err();

		assert_eq!(calls, 2);
		assert_eq!(err.errno(), libc::EPIPE);
		assert_eq!(err.op(), "send");
	}

	#[test]
	fn test_drain_zero_result_is_failure() {
		let mut calls = 0;
		let err = drain("send", b"abc", |_| {
			calls += 1;
			set_errno(libc::ECONNRESET);
			0
		}).unwrap_err();

		assert_eq!(calls, 1);
		assert_eq!(err.errno(), libc::ECONNRESET);
	}
}

/// A failed syscall, tagged with the operation that failed.
///
/// `errno` is captured the moment the failure is observed, before anything
/// else can touch it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("{op}() failed: {}", errno_to_str(*.errno))]
pub struct SystemError {
	errno: i32,
	op: &'static str,
}

pub type Result<T> = std::result::Result<T, SystemError>;

impl SystemError {
	pub fn new(op: &'static str, errno: i32) -> Self {
		Self { errno, op }
	}

	/// Builds an error from the calling thread's current errno.
	#[inline]
	pub fn last(op: &'static str) -> Self {
		Self::new(op, errno())
	}

	/// The raw OS error code.
	pub fn errno(&self) -> i32 {
		self.errno
	}

	/// Name of the syscall (or option) that failed.
	pub fn op(&self) -> &'static str {
		self.op
	}

	pub fn kind(&self) -> std::io::ErrorKind {
		errno_to_kind(self.errno)
	}
}

/// Returns current errno value.
#[inline]
pub fn errno() -> i32 {
	unsafe { *libc::__errno_location() }
}

#[cfg(test)]
pub(crate) fn set_errno(value: i32) {
	unsafe { *libc::__errno_location() = value }
}

/// Syscall return types whose failure is signalled by a negative value.
pub(crate) trait SyscallResult: Copy {
	fn is_failure(self) -> bool;
}

impl SyscallResult for libc::c_int {
	#[inline]
	fn is_failure(self) -> bool {
		self < 0
	}
}

impl SyscallResult for libc::ssize_t {
	#[inline]
	fn is_failure(self) -> bool {
		self < 0
	}
}

/// Turns a raw syscall result into `Result`.
///
/// Every syscall-backed operation goes through here so the error shape stays
/// uniform. Non-failing values are handed back untouched.
#[inline]
pub(crate) fn check<T: SyscallResult>(op: &'static str, result: T) -> Result<T> {
	if result.is_failure() {
		Err(SystemError::last(op))
	} else {
		Ok(result)
	}
}

/// Converts errno to human-readable string.
fn errno_to_str(errno: i32) -> String {
	match errno {
		libc::EACCES => "permission denied".into(),
		libc::EADDRINUSE => "address already in use".into(),
		libc::EADDRNOTAVAIL => "address not available".into(),
		libc::EAFNOSUPPORT => "address family not supported".into(),
		libc::EAGAIN => "resource temporarily unavailable".into(),
		libc::EBADF => "bad file descriptor".into(),
		libc::ECONNREFUSED => "connection refused".into(),
		libc::ECONNRESET => "connection reset by peer".into(),
		libc::EINTR => "interrupted by signal".into(),
		libc::EINVAL => "invalid argument".into(),
		libc::EMFILE => "too many open files".into(),
		libc::ENETUNREACH => "network unreachable".into(),
		libc::ENOBUFS => "no buffer space available".into(),
		libc::ENOPROTOOPT => "protocol option not available".into(),
		libc::ENOTCONN => "not connected".into(),
		libc::EPIPE => "broken pipe".into(),
		libc::EPROTONOSUPPORT => "protocol not supported".into(),
		libc::ETIMEDOUT => "connection timed out".into(),
		_ => format!("errno {}", errno),
	}
}

/// Maps errno to std::io::ErrorKind.
fn errno_to_kind(errno: i32) -> std::io::ErrorKind {
	match errno {
		libc::EACCES | libc::EPERM => std::io::ErrorKind::PermissionDenied,
		libc::EADDRINUSE => std::io::ErrorKind::AddrInUse,
		libc::EADDRNOTAVAIL => std::io::ErrorKind::AddrNotAvailable,
		libc::EAGAIN => std::io::ErrorKind::WouldBlock,
		libc::ECONNREFUSED => std::io::ErrorKind::ConnectionRefused,
		libc::ECONNRESET => std::io::ErrorKind::ConnectionReset,
		libc::EINTR => std::io::ErrorKind::Interrupted,
		libc::EINVAL => std::io::ErrorKind::InvalidInput,
		libc::ENOTCONN => std::io::ErrorKind::NotConnected,
		libc::EPIPE => std::io::ErrorKind::BrokenPipe,
		libc::ETIMEDOUT => std::io::ErrorKind::TimedOut,
		_ => std::io::ErrorKind::Other,
	}
}

impl From<SystemError> for std::io::Error {
	fn from(err: SystemError) -> Self {
		std::io::Error::new(err.kind(), err)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_check_passes_through_success() {
		assert_eq!(check("bind", 0 as libc::c_int), Ok(0));
		assert_eq!(check("recv", 17 as libc::ssize_t), Ok(17));
	}

	#[test]
	fn test_check_captures_errno() {
		set_errno(libc::EADDRINUSE);
		let err = check("bind", -1 as libc::c_int).unwrap_err();
		assert_eq!(err.errno(), libc::EADDRINUSE);
		assert_eq!(err.op(), "bind");
		assert_eq!(err.kind(), std::io::ErrorKind::AddrInUse);
	}

	#[test]
	fn test_display() {
		let err = SystemError::new("connect", libc::ECONNREFUSED);
		assert_eq!(err.to_string(), "connect() failed: connection refused");

		let err = SystemError::new("listen", 4242);
		assert_eq!(err.to_string(), "listen() failed: errno 4242");
	}

	#[test]
	fn test_into_io_error() {
		let io: std::io::Error = SystemError::new("send", libc::EPIPE).into();
		assert_eq!(io.kind(), std::io::ErrorKind::BrokenPipe);
	}
}

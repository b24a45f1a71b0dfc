use std::marker::PhantomData;
use std::time::Duration;

/// A socket option: protocol level, option code, and the type of its value.
///
/// ```ignore
/// socket.set_option(REUSE_ADDR, true)?;
/// socket.set_option(RECV_BUFFER, 64 * 1024)?;
/// ```
pub struct SockOpt<T> {
	level: libc::c_int,
	name: libc::c_int,
	label: &'static str,
	_value: PhantomData<fn(T)>,
}

impl<T> SockOpt<T> {
	/// Describes an option not covered by the constants below.
	pub const fn new(level: libc::c_int, name: libc::c_int, label: &'static str) -> Self {
		Self {
			level,
			name,
			label,
			_value: PhantomData,
		}
	}

	pub fn level(&self) -> libc::c_int {
		self.level
	}

	pub fn name(&self) -> libc::c_int {
		self.name
	}

	pub fn label(&self) -> &'static str {
		self.label
	}
}

impl<T> Clone for SockOpt<T> {
	fn clone(&self) -> Self {
		*self
	}
}

impl<T> Copy for SockOpt<T> {}

impl<T> std::fmt::Debug for SockOpt<T> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.write_str(self.label)
	}
}

/// Allows binding to an address that's in TIME_WAIT state.
/// Essential for server restarts.
pub const REUSE_ADDR: SockOpt<bool> = SockOpt::new(libc::SOL_SOCKET, libc::SO_REUSEADDR, "SO_REUSEADDR");

/// Allows multiple sockets to bind the same port.
pub const REUSE_PORT: SockOpt<bool> = SockOpt::new(libc::SOL_SOCKET, libc::SO_REUSEPORT, "SO_REUSEPORT");

/// Kernel probes idle connections to detect dead peers.
/// Tune with `KEEPALIVE_IDLE`, `KEEPALIVE_INTERVAL`, `KEEPALIVE_COUNT`.
pub const KEEPALIVE: SockOpt<bool> = SockOpt::new(libc::SOL_SOCKET, libc::SO_KEEPALIVE, "SO_KEEPALIVE");

/// Disables Nagle's algorithm.
pub const TCP_NODELAY: SockOpt<bool> = SockOpt::new(libc::IPPROTO_TCP, libc::TCP_NODELAY, "TCP_NODELAY");

/// Receive buffer size in bytes. The kernel doubles it internally.
pub const RECV_BUFFER: SockOpt<i32> = SockOpt::new(libc::SOL_SOCKET, libc::SO_RCVBUF, "SO_RCVBUF");

/// Send buffer size in bytes. The kernel doubles it internally.
pub const SEND_BUFFER: SockOpt<i32> = SockOpt::new(libc::SOL_SOCKET, libc::SO_SNDBUF, "SO_SNDBUF");

/// Idle seconds before the first keep-alive probe.
pub const KEEPALIVE_IDLE: SockOpt<i32> = SockOpt::new(libc::IPPROTO_TCP, libc::TCP_KEEPIDLE, "TCP_KEEPIDLE");

/// Seconds between unanswered keep-alive probes.
pub const KEEPALIVE_INTERVAL: SockOpt<i32> = SockOpt::new(libc::IPPROTO_TCP, libc::TCP_KEEPINTVL, "TCP_KEEPINTVL");

/// Unanswered probes before the connection is dropped.
pub const KEEPALIVE_COUNT: SockOpt<i32> = SockOpt::new(libc::IPPROTO_TCP, libc::TCP_KEEPCNT, "TCP_KEEPCNT");

/// Blocking reads give up with `EAGAIN` after this long. `None` waits forever.
pub const RECV_TIMEOUT: SockOpt<Option<Duration>> = SockOpt::new(libc::SOL_SOCKET, libc::SO_RCVTIMEO, "SO_RCVTIMEO");

/// Blocking writes give up with `EAGAIN` after this long. `None` waits forever.
pub const SEND_TIMEOUT: SockOpt<Option<Duration>> = SockOpt::new(libc::SOL_SOCKET, libc::SO_SNDTIMEO, "SO_SNDTIMEO");

/// Behaviour of close() with unsent data.
pub const LINGER: SockOpt<Linger> = SockOpt::new(libc::SOL_SOCKET, libc::SO_LINGER, "SO_LINGER");

/// `SO_LINGER` value.
///
/// - `Linger(None)` — close returns immediately, kernel sends remaining data
/// - `Linger(Some(0))` — close resets the connection (RST)
/// - `Linger(Some(n))` — close blocks up to n seconds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Linger(pub Option<u32>);

/// How a value is laid out for setsockopt(2).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
	/// Always a 4-byte `c_int`, 1 or 0.
	Boolean,
	/// A `c_int` at its natural width.
	Integer,
	/// A `struct timeval`.
	Duration,
	/// A `struct linger`.
	Linger,
}

/// An option value in the exact layout the kernel reads.
///
/// One variant per `ValueKind`. Booleans get their own variant even though
/// the payload is the same as `Integer`: the kernel reads a full `int` for
/// boolean options, so a one-byte bool would leave the other three bytes
/// undefined.
#[derive(Clone, Copy)]
pub enum Encoded {
	Flag(libc::c_int),
	Int(libc::c_int),
	Timeval(libc::timeval),
	Linger(libc::linger),
}

impl Encoded {
	pub fn kind(&self) -> ValueKind {
		match self {
			Encoded::Flag(_) => ValueKind::Boolean,
			Encoded::Int(_) => ValueKind::Integer,
			Encoded::Timeval(_) => ValueKind::Duration,
			Encoded::Linger(_) => ValueKind::Linger,
		}
	}

	/// The byte region passed as `optval`; its length is `optlen`.
	pub fn as_bytes(&self) -> &[u8] {
		match self {
			Encoded::Flag(v) | Encoded::Int(v) => bytes_of(v),
			Encoded::Timeval(v) => bytes_of(v),
			Encoded::Linger(v) => bytes_of(v),
		}
	}
}

impl std::fmt::Debug for Encoded {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			Encoded::Flag(v) => write!(f, "Flag({})", v),
			Encoded::Int(v) => write!(f, "Int({})", v),
			Encoded::Timeval(v) => write!(f, "Timeval({}s {}us)", v.tv_sec, v.tv_usec),
			Encoded::Linger(v) => write!(f, "Linger(onoff={} secs={})", v.l_onoff, v.l_linger),
		}
	}
}

fn bytes_of<T: Copy>(value: &T) -> &[u8] {
	unsafe { std::slice::from_raw_parts(value as *const T as *const u8, std::mem::size_of::<T>()) }
}

/// Values that can be written with setsockopt(2).
pub trait OptionValue: Copy {
	const KIND: ValueKind;

	fn encode(self) -> Encoded;
}

impl OptionValue for bool {
	const KIND: ValueKind = ValueKind::Boolean;

	fn encode(self) -> Encoded {
		Encoded::Flag(if self { 1 } else { 0 })
	}
}

impl OptionValue for i32 {
	const KIND: ValueKind = ValueKind::Integer;

	fn encode(self) -> Encoded {
		Encoded::Int(self)
	}
}

impl OptionValue for Option<Duration> {
	const KIND: ValueKind = ValueKind::Duration;

	fn encode(self) -> Encoded {
		// a zero timeval means "no timeout"; round sub-microsecond durations up
		// so Some(tiny) doesn't silently turn into None
		let tv = match self {
			None => libc::timeval { tv_sec: 0, tv_usec: 0 },
			Some(d) => {
				let mut tv = libc::timeval {
					tv_sec: d.as_secs().min(libc::time_t::MAX as u64) as libc::time_t,
					tv_usec: d.subsec_micros() as libc::suseconds_t,
				};
				if tv.tv_sec == 0 && tv.tv_usec == 0 && !d.is_zero() {
					tv.tv_usec = 1;
				}
				tv
			}
		};
		Encoded::Timeval(tv)
	}
}

impl OptionValue for Linger {
	const KIND: ValueKind = ValueKind::Linger;

	fn encode(self) -> Encoded {
		let linger = match self.0 {
			Some(secs) => libc::linger {
				l_onoff: 1,
				l_linger: secs.min(libc::c_int::MAX as u32) as libc::c_int,
			},
			None => libc::linger { l_onoff: 0, l_linger: 0 },
		};
		Encoded::Linger(linger)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_bool_is_four_bytes() {
		for (value, expected) in [(true, 1i32), (false, 0i32)] {
			let encoded = value.encode();
			assert_eq!(encoded.kind(), ValueKind::Boolean);
			assert_eq!(encoded.as_bytes().len(), 4);
			let bytes: [u8; 4] = encoded.as_bytes().try_into().unwrap();
			assert_eq!(i32::from_ne_bytes(bytes), expected);
		}
		assert_eq!(<bool as OptionValue>::KIND, ValueKind::Boolean);
	}

	#[test]
	fn test_int_natural_width() {
		let encoded = 65536i32.encode();
		assert_eq!(encoded.kind(), ValueKind::Integer);
		assert_eq!(encoded.as_bytes(), &65536i32.to_ne_bytes());
	}

	#[test]
	fn test_duration_encoding() {
		let encoded = Some(Duration::from_millis(1500)).encode();
		assert_eq!(encoded.kind(), ValueKind::Duration);
		assert_eq!(encoded.as_bytes().len(), std::mem::size_of::<libc::timeval>());
		match encoded {
			Encoded::Timeval(tv) => {
				assert_eq!(tv.tv_sec, 1);
				assert_eq!(tv.tv_usec, 500_000);
			}
			other => panic!("unexpected {:?}", other),
		}

		match None::<Duration>.encode() {
			Encoded::Timeval(tv) => assert_eq!((tv.tv_sec, tv.tv_usec), (0, 0)),
			other => panic!("unexpected {:?}", other),
		}

		match Some(Duration::from_nanos(10)).encode() {
			Encoded::Timeval(tv) => assert_eq!((tv.tv_sec, tv.tv_usec), (0, 1)),
			other => panic!("unexpected {:?}", other),
		}
	}

	#[test]
	fn test_linger_encoding() {
		match Linger(Some(5)).encode() {
			Encoded::Linger(l) => assert_eq!((l.l_onoff, l.l_linger), (1, 5)),
			other => panic!("unexpected {:?}", other),
		}
		match Linger(None).encode() {
			Encoded::Linger(l) => assert_eq!(l.l_onoff, 0),
			other => panic!("unexpected {:?}", other),
		}
		assert_eq!(Linger(None).encode().as_bytes().len(), std::mem::size_of::<libc::linger>());
	}

	#[test]
	fn test_descriptor_codes() {
		assert_eq!(REUSE_ADDR.level(), libc::SOL_SOCKET);
		assert_eq!(REUSE_ADDR.name(), libc::SO_REUSEADDR);
		assert_eq!(TCP_NODELAY.level(), libc::IPPROTO_TCP);
		assert_eq!(format!("{:?}", LINGER), "SO_LINGER");
	}
}

use std::net::Ipv4Addr;
use crate::addr::ToSockAddr;

/// IPv4 socket address (IP + port).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SocketAddrV4 {
	ip: [u8; 4],
	port: u16,
}

impl SocketAddrV4 {
	/// Creates a new IPv4 address.
	pub fn new(ip: [u8; 4], port: u16) -> Self {
		Self { ip, port }
	}

	/// Creates from raw sockaddr_in.
	pub(crate) fn from_raw(raw: &libc::sockaddr_in) -> Self {
		Self {
			ip: raw.sin_addr.s_addr.to_ne_bytes(),
			port: u16::from_be(raw.sin_port),
		}
	}

	/// Returns the IP bytes.
	pub fn ip(&self) -> [u8; 4] {
		self.ip
	}

	/// Returns the port.
	pub fn port(&self) -> u16 {
		self.port
	}
}

impl std::fmt::Display for SocketAddrV4 {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		let [a, b, c, d] = self.ip;
		write!(f, "{}.{}.{}.{}:{}", a, b, c, d, self.port)
	}
}

/// The `sockaddr_in` handed to bind(2) and connect(2).
///
/// Built from a port and an optional dotted-decimal string. A missing string,
/// or one that isn't four dotted decimal octets, becomes `0.0.0.0`.
/// No error is raised for a malformed string; callers that care should
/// check `is_unspecified()`.
#[derive(Clone, Copy)]
pub struct RawAddress {
	raw: libc::sockaddr_in,
}

impl RawAddress {
	/// Size the kernel expects for this structure.
	pub const LEN: libc::socklen_t = std::mem::size_of::<libc::sockaddr_in>() as libc::socklen_t;

	pub fn new(port: u16, address: Option<&str>) -> Self {
		let sin_addr = address
			.and_then(parse_literal)
			.unwrap_or(libc::in_addr { s_addr: libc::INADDR_ANY.to_be() });

		// zeroed so that sin_zero (and any platform padding) is all zeros
		let mut raw: libc::sockaddr_in = unsafe { std::mem::zeroed() };
		raw.sin_family = libc::AF_INET as libc::sa_family_t;
		raw.sin_port = port.to_be();
		raw.sin_addr = sin_addr;

		Self { raw }
	}

	pub fn family(&self) -> libc::sa_family_t {
		self.raw.sin_family
	}

	/// Host-order port.
	pub fn port(&self) -> u16 {
		u16::from_be(self.raw.sin_port)
	}

	/// Address octets in network order (`[127, 0, 0, 1]` for loopback).
	pub fn ip(&self) -> [u8; 4] {
		self.raw.sin_addr.s_addr.to_ne_bytes()
	}

	pub fn is_unspecified(&self) -> bool {
		self.raw.sin_addr.s_addr == 0
	}

	/// The structure exactly as it is passed to the kernel.
	pub fn as_bytes(&self) -> &[u8] {
		unsafe {
			std::slice::from_raw_parts(
				&self.raw as *const libc::sockaddr_in as *const u8,
				Self::LEN as usize,
			)
		}
	}
}

impl From<SocketAddrV4> for RawAddress {
	fn from(addr: SocketAddrV4) -> Self {
		let mut raw: libc::sockaddr_in = unsafe { std::mem::zeroed() };
		raw.sin_family = libc::AF_INET as libc::sa_family_t;
		raw.sin_port = addr.port.to_be();
		raw.sin_addr = libc::in_addr { s_addr: u32::from_ne_bytes(addr.ip) };
		Self { raw }
	}
}

impl From<RawAddress> for SocketAddrV4 {
	fn from(addr: RawAddress) -> Self {
		SocketAddrV4::from_raw(&addr.raw)
	}
}

impl std::fmt::Debug for RawAddress {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "RawAddress({})", SocketAddrV4::from(*self))
	}
}

impl ToSockAddr for RawAddress {
	fn with_raw<F, R>(&self, f: F) -> R
	where
		F: FnOnce(*const libc::sockaddr, libc::socklen_t) -> R,
	{
		let ptr = &self.raw as *const libc::sockaddr_in as *const libc::sockaddr;
		f(ptr, Self::LEN)
	}
}

/// Dotted-decimal only; no name resolution.
fn parse_literal(text: &str) -> Option<libc::in_addr> {
	let ip: Ipv4Addr = text.parse().ok()?;
	Some(libc::in_addr { s_addr: u32::from_ne_bytes(ip.octets()) })
}

//! IPv4 addressing.
//!
//! `RawAddress` is what goes into bind/connect. `SocketAddrV4` is what comes
//! back out of getsockname/getpeername/accept.

mod ipv4;
pub use self::ipv4::{RawAddress, SocketAddrV4};

/// Address types that can be handed to a syscall as `*const sockaddr`.
pub trait ToSockAddr {
	/// Calls the provided closure with a pointer to the raw sockaddr and its size.
	///
	/// The pointer is only valid for the duration of the call.
	fn with_raw<F, R>(&self, f: F) -> R
	where
		F: FnOnce(*const libc::sockaddr, libc::socklen_t) -> R;
}

/// Trait for address types that can be created from raw sockaddr.
pub trait FromSockAddr: Sized {
	/// Creates address from raw sockaddr storage.
	///
	/// # Safety
	/// `addr` must point to at least `len` initialized bytes.
	unsafe fn from_sockaddr(addr: *const libc::sockaddr, len: libc::socklen_t) -> Option<Self>;
}

impl FromSockAddr for SocketAddrV4 {
	unsafe fn from_sockaddr(addr: *const libc::sockaddr, len: libc::socklen_t) -> Option<Self> {
		if len < std::mem::size_of::<libc::sockaddr_in>() as libc::socklen_t {
			return None;
		}
		let raw = unsafe { &*(addr as *const libc::sockaddr_in) };
		if raw.sin_family != libc::AF_INET as libc::sa_family_t {
			return None;
		}
		Some(Self::from_raw(raw))
	}
}

/// Reads an address out via getsockname(2)/getpeername(2) style calls.
pub(crate) fn query<A, F>(op: &'static str, call: F) -> crate::Result<Option<A>>
where
	A: FromSockAddr,
	F: FnOnce(*mut libc::sockaddr, *mut libc::socklen_t) -> libc::c_int,
{
	let mut storage: libc::sockaddr_storage = unsafe { std::mem::zeroed() };
	let mut len = std::mem::size_of::<libc::sockaddr_storage>() as libc::socklen_t;

	crate::error::check(op, call(&mut storage as *mut _ as *mut libc::sockaddr, &mut len as *mut libc::socklen_t))?;

	Ok(unsafe { A::from_sockaddr(&storage as *const _ as *const libc::sockaddr, len) })
}

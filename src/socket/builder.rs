use std::time::Duration;
use super::raw::Socket;
use super::options::{
	Linger,
	REUSE_ADDR, REUSE_PORT, TCP_NODELAY, KEEPALIVE, KEEPALIVE_IDLE, KEEPALIVE_INTERVAL,
	KEEPALIVE_COUNT, RECV_BUFFER, SEND_BUFFER, RECV_TIMEOUT, SEND_TIMEOUT, LINGER,
};
use crate::error::Result;

// ============================================================================
// Shared Configuration Structs
// ============================================================================

/// Buffer size configuration.
#[derive(Debug, Clone, Copy, Default)]
pub struct BufferConfig {
	pub recv: Option<i32>,
	pub send: Option<i32>,
}

impl BufferConfig {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn recv(mut self, size: i32) -> Self {
		self.recv = Some(size);
		self
	}

	pub fn send(mut self, size: i32) -> Self {
		self.send = Some(size);
		self
	}

	pub fn both(mut self, size: i32) -> Self {
		self.recv = Some(size);
		self.send = Some(size);
		self
	}

	fn apply(&self, socket: &Socket) -> Result<()> {
		if let Some(size) = self.recv {
			socket.set_option(RECV_BUFFER, size)?;
		}
		if let Some(size) = self.send {
			socket.set_option(SEND_BUFFER, size)?;
		}
		Ok(())
	}
}

/// Address reuse configuration.
#[derive(Debug, Clone, Copy)]
pub struct ReuseConfig {
	pub addr: bool,
	pub port: bool,
}

impl Default for ReuseConfig {
	fn default() -> Self {
		Self {
			addr: true,  // Almost always want this for servers
			port: false,
		}
	}
}

impl ReuseConfig {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn addr(mut self, enable: bool) -> Self {
		self.addr = enable;
		self
	}

	pub fn port(mut self, enable: bool) -> Self {
		self.port = enable;
		self
	}

	fn apply(&self, socket: &Socket) -> Result<()> {
		if self.addr {
			socket.set_option(REUSE_ADDR, true)?;
		}
		if self.port {
			socket.set_option(REUSE_PORT, true)?;
		}
		Ok(())
	}
}

/// TCP-specific configuration.
#[derive(Debug, Clone, Copy, Default)]
pub struct TcpConfig {
	pub nodelay: bool,
	pub keepalive: Option<KeepaliveConfig>,
	pub linger: Option<Linger>,
}

impl TcpConfig {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn nodelay(mut self, enable: bool) -> Self {
		self.nodelay = enable;
		self
	}

	pub fn keepalive(mut self, config: KeepaliveConfig) -> Self {
		self.keepalive = Some(config);
		self
	}

	pub fn linger(mut self, seconds: Option<u32>) -> Self {
		self.linger = Some(Linger(seconds));
		self
	}

	fn apply(&self, socket: &Socket) -> Result<()> {
		if self.nodelay {
			socket.set_option(TCP_NODELAY, true)?;
		}
		if let Some(config) = self.keepalive {
			socket.set_option(KEEPALIVE, true)?;
			socket.set_option(KEEPALIVE_IDLE, config.idle_secs)?;
			socket.set_option(KEEPALIVE_INTERVAL, config.interval_secs)?;
			socket.set_option(KEEPALIVE_COUNT, config.count)?;
		}
		if let Some(linger) = self.linger {
			socket.set_option(LINGER, linger)?;
		}
		Ok(())
	}
}

/// Keep-alive timing configuration.
///
/// Total detection time = idle + interval × count.
#[derive(Debug, Clone, Copy)]
pub struct KeepaliveConfig {
	pub idle_secs: i32,
	pub interval_secs: i32,
	pub count: i32,
}

impl Default for KeepaliveConfig {
	fn default() -> Self {
		Self {
			idle_secs: 60,
			interval_secs: 10,
			count: 5,
		}
	}
}

impl KeepaliveConfig {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn idle(mut self, secs: i32) -> Self {
		self.idle_secs = secs;
		self
	}

	pub fn interval(mut self, secs: i32) -> Self {
		self.interval_secs = secs;
		self
	}

	pub fn count(mut self, count: i32) -> Self {
		self.count = count;
		self
	}
}

/// Blocking read/write timeouts. Unset means wait forever.
#[derive(Debug, Clone, Copy, Default)]
pub struct TimeoutConfig {
	pub read: Option<Duration>,
	pub write: Option<Duration>,
}

impl TimeoutConfig {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn read(mut self, timeout: Duration) -> Self {
		self.read = Some(timeout);
		self
	}

	pub fn write(mut self, timeout: Duration) -> Self {
		self.write = Some(timeout);
		self
	}

	fn apply(&self, socket: &Socket) -> Result<()> {
		if self.read.is_some() {
			socket.set_option(RECV_TIMEOUT, self.read)?;
		}
		if self.write.is_some() {
			socket.set_option(SEND_TIMEOUT, self.write)?;
		}
		Ok(())
	}
}

// ============================================================================
// Listener Builder
// ============================================================================

/// Builder for TCP listeners.
///
/// # Example
/// ```ignore
/// use sockline::{ListenerBuilder, ReuseConfig, TcpConfig, KeepaliveConfig};
///
/// let listener = ListenerBuilder::new()
///     .reuse(ReuseConfig::new().port(true))
///     .tcp(TcpConfig::new()
///         .nodelay(true)
///         .keepalive(KeepaliveConfig::new().idle(60).interval(10).count(5)))
///     .backlog(4096)
///     .bind(8080, Some("0.0.0.0"))?;
/// ```
#[derive(Debug, Clone, Copy)]
pub struct ListenerBuilder {
	reuse: ReuseConfig,
	tcp: TcpConfig,
	buffers: BufferConfig,
	timeouts: TimeoutConfig,
	backlog: i32,
}

impl Default for ListenerBuilder {
	fn default() -> Self {
		Self::new()
	}
}

impl ListenerBuilder {
	pub fn new() -> Self {
		Self {
			reuse: ReuseConfig::default(),
			tcp: TcpConfig::default(),
			buffers: BufferConfig::default(),
			timeouts: TimeoutConfig::default(),
			backlog: libc::SOMAXCONN,
		}
	}

	/// Set address reuse options.
	pub fn reuse(mut self, config: ReuseConfig) -> Self {
		self.reuse = config;
		self
	}

	/// Set TCP options. Accepted sockets inherit them.
	pub fn tcp(mut self, config: TcpConfig) -> Self {
		self.tcp = config;
		self
	}

	/// Set buffer sizes.
	pub fn buffers(mut self, config: BufferConfig) -> Self {
		self.buffers = config;
		self
	}

	/// Set accept/read/write timeouts.
	pub fn timeouts(mut self, config: TimeoutConfig) -> Self {
		self.timeouts = config;
		self
	}

	/// Set listen backlog. Default: `SOMAXCONN`.
	pub fn backlog(mut self, backlog: i32) -> Self {
		self.backlog = backlog;
		self
	}

	/// Binds and starts listening.
	///
	/// The socket is closed again if any option, the bind, or the listen fails.
	pub fn bind(self, port: u16, address: Option<&str>) -> Result<Socket> {
		let socket = Socket::tcp()?;

		self.reuse.apply(&socket)?;
		self.tcp.apply(&socket)?;
		self.buffers.apply(&socket)?;
		self.timeouts.apply(&socket)?;

		socket.bind(port, address)?;
		socket.listen(self.backlog)?;
		Ok(socket)
	}
}

// ============================================================================
// Connector Builder
// ============================================================================

/// Builder for TCP client connections.
///
/// # Example
/// ```ignore
/// use sockline::{ConnectorBuilder, TcpConfig, BufferConfig};
///
/// let conn = ConnectorBuilder::new()
///     .tcp(TcpConfig::new().nodelay(true).linger(Some(5)))
///     .buffers(BufferConfig::new().both(65536))
///     .connect(8080, Some("127.0.0.1"))?;
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct ConnectorBuilder {
	tcp: TcpConfig,
	buffers: BufferConfig,
	timeouts: TimeoutConfig,
}

impl ConnectorBuilder {
	pub fn new() -> Self {
		Self::default()
	}

	/// Set TCP options.
	pub fn tcp(mut self, config: TcpConfig) -> Self {
		self.tcp = config;
		self
	}

	/// Set buffer sizes.
	pub fn buffers(mut self, config: BufferConfig) -> Self {
		self.buffers = config;
		self
	}

	/// Set read/write timeouts.
	pub fn timeouts(mut self, config: TimeoutConfig) -> Self {
		self.timeouts = config;
		self
	}

	/// Connects to the remote address.
	pub fn connect(self, port: u16, address: Option<&str>) -> Result<Socket> {
		let socket = Socket::tcp()?;

		self.tcp.apply(&socket)?;
		self.buffers.apply(&socket)?;
		self.timeouts.apply(&socket)?;

		socket.connect(port, address)?;
		Ok(socket)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_defaults() {
		let reuse = ReuseConfig::default();
		assert!(reuse.addr);
		assert!(!reuse.port);

		let keepalive = KeepaliveConfig::new().idle(30);
		assert_eq!((keepalive.idle_secs, keepalive.interval_secs, keepalive.count), (30, 10, 5));

		let buffers = BufferConfig::new().both(8192);
		assert_eq!((buffers.recv, buffers.send), (Some(8192), Some(8192)));
	}

	#[test]
	fn test_listener_and_connector() {
		let listener = ListenerBuilder::new()
			.tcp(TcpConfig::new()
				.nodelay(true)
				.keepalive(KeepaliveConfig::new().idle(30).interval(5).count(3)))
			.buffers(BufferConfig::new().recv(16 * 1024))
			.backlog(8)
			.bind(0, Some("127.0.0.1"))
			.unwrap();
		let port = listener.local_addr().unwrap().unwrap().port();

		let client = ConnectorBuilder::new()
			.tcp(TcpConfig::new().nodelay(true).linger(Some(1)))
			.timeouts(TimeoutConfig::new().read(Duration::from_secs(5)))
			.connect(port, Some("127.0.0.1"))
			.unwrap();

		let server = listener.accept().unwrap();
		client.write(b"ping").unwrap();
		let mut buf = [0u8; 4];
		assert_eq!(server.read(&mut buf).unwrap(), 4);
		assert_eq!(&buf, b"ping");
	}

	#[test]
	fn test_read_timeout_expires() {
		let listener = ListenerBuilder::new().bind(0, Some("127.0.0.1")).unwrap();
		let port = listener.local_addr().unwrap().unwrap().port();

		let client = ConnectorBuilder::new()
			.timeouts(TimeoutConfig::new().read(Duration::from_millis(50)))
			.connect(port, Some("127.0.0.1"))
			.unwrap();
		let _server = listener.accept().unwrap();

		let err = client.read_byte().unwrap_err();
		assert_eq!(err.errno(), libc::EAGAIN);
	}

	#[test]
	fn test_failed_bind_releases_handle() {
		let first = ListenerBuilder::new().backlog(1).bind(0, Some("127.0.0.1")).unwrap();
		let port = first.local_addr().unwrap().unwrap().port();
		let builder = ListenerBuilder::new()
			.tcp(TcpConfig::new().nodelay(true))
			.backlog(1);

		let before = crate::socket::open_fds();
		for _ in 0..200 {
			let err = builder.bind(port, Some("127.0.0.1")).unwrap_err();
			assert_eq!(err.errno(), libc::EADDRINUSE);
		}
		let after = crate::socket::open_fds();

		// other tests open sockets concurrently; a leak would add 200
		assert!(after < before + 50, "fds grew from {} to {}", before, after);
	}

	#[test]
	fn test_connect_refused() {
		let probe = Socket::tcp().unwrap();
		probe.bind(0, Some("127.0.0.1")).unwrap();
		// bound but not listening: the port is reserved and refuses connections
		let port = probe.local_addr().unwrap().unwrap().port();

		let err = ConnectorBuilder::new().connect(port, Some("127.0.0.1")).unwrap_err();
		assert_eq!(err.op(), "connect");
		assert_eq!(err.errno(), libc::ECONNREFUSED);
	}
}

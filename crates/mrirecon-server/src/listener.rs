use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use mrirecon_frame::{ChannelConfig, FrameChannel};
use mrirecon_transport::{Connection, TcpSocket};
use tracing::{debug, info, warn};

use crate::config::ServerConfig;
use crate::error::{Result, ServerError};
use crate::session::{ServerContext, Session, SessionReport};

/// Pause after a failed accept so a persistent error does not spin.
const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

/// Accepts connections and runs one session per connection.
///
/// With `fork_per_connection` each connection is handled in a child
/// process, so a crashing plugin cannot take the server down. Otherwise
/// connections are handled one after another in the calling thread.
pub struct ReconServer {
    socket: TcpSocket,
    context: ServerContext,
    channel: ChannelConfig,
    fork_per_connection: bool,
    running: Arc<AtomicBool>,
    #[cfg(unix)]
    children: Vec<libc::pid_t>,
}

impl ReconServer {
    /// Bind the listening socket described by `config`.
    pub fn bind(config: &ServerConfig, context: ServerContext) -> Result<Self> {
        let socket = TcpSocket::bind(config.socket_addr())?;
        let fork_per_connection = config.fork_per_connection && cfg!(unix);
        if config.fork_per_connection && !fork_per_connection {
            warn!("fork_per_connection is not supported on this platform, handling inline");
        }
        if fork_per_connection {
            install_child_reaper().map_err(ServerError::Signal)?;
        }
        info!(
            addr = %socket.local_addr(),
            pipeline_dir = %context.pipeline_dir.display(),
            fork_per_connection,
            "server listening"
        );
        Ok(Self {
            socket,
            context,
            channel: config.channel.clone(),
            fork_per_connection,
            running: Arc::new(AtomicBool::new(true)),
            #[cfg(unix)]
            children: Vec::new(),
        })
    }

    /// Share a flag that stops the accept loop once cleared.
    ///
    /// The flag is checked around each accept. A connection that arrives
    /// after it is cleared is dropped unserved, so connecting to the server
    /// wakes a blocked accept for shutdown.
    pub fn with_shutdown_flag(mut self, running: Arc<AtomicBool>) -> Self {
        self.running = running;
        self
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.socket.local_addr()
    }

    pub fn context(&self) -> &ServerContext {
        &self.context
    }

    /// Serve until the shutdown flag is cleared.
    pub fn serve(&mut self) -> Result<()> {
        self.serve_connections(None).map(|_| ())
    }

    /// Serve at most `limit` connections (or until shutdown). Returns the
    /// number of connections accepted.
    pub fn serve_connections(&mut self, limit: Option<usize>) -> Result<usize> {
        let mut accepted = 0usize;
        while self.running.load(Ordering::SeqCst) && limit.map_or(true, |max| accepted < max) {
            let connection = match self.socket.accept() {
                Ok(connection) => connection,
                Err(err) => {
                    if !self.running.load(Ordering::SeqCst) {
                        break;
                    }
                    warn!(error = %err, "accept failed");
                    std::thread::sleep(ACCEPT_BACKOFF);
                    continue;
                }
            };
            if !self.running.load(Ordering::SeqCst) {
                debug!(peer = %connection.peer_label(), "dropping connection during shutdown");
                break;
            }
            accepted = accepted.saturating_add(1);
            info!(peer = %connection.peer_label(), "connection accepted");

            if self.fork_per_connection {
                if let Err(err) = self.spawn(connection) {
                    warn!(error = %err, "dropping connection");
                }
            } else {
                self.handle(connection);
            }
            self.reap(false);
        }

        self.reap(true);
        info!(accepted, "server stopped");
        Ok(accepted)
    }

    /// Run one session on `connection` in the current process.
    pub fn handle(&self, connection: Connection) -> SessionReport {
        let peer = connection.peer_label();
        let channel = FrameChannel::with_config(connection, self.channel.clone());
        let mut session = Session::new(channel, &self.context);
        let report = session.run();
        if let Err(err) = session.into_channel().get_ref().shutdown() {
            debug!(peer = %peer, error = %err, "shutdown after session failed");
        }
        report
    }

    #[cfg(unix)]
    fn spawn(&mut self, connection: Connection) -> Result<()> {
        // SAFETY: other threads (a signal handler thread, for one) are not
        // duplicated. The child touches only its own connection and the
        // read-only context, then leaves with `_exit` without returning into
        // the accept loop.
        let pid = unsafe { libc::fork() };
        match pid {
            -1 => Err(ServerError::Fork(std::io::Error::last_os_error())),
            0 => {
                // SAFETY: the child never accepts, and the parent keeps its
                // own descriptor for the listener.
                unsafe {
                    libc::close(self.socket.as_raw_fd());
                }
                let report = self.handle(connection);
                let code = if report.ack.success { 0 } else { 1 };
                // SAFETY: terminates the child without running the parent's
                // destructors or atexit handlers.
                unsafe { libc::_exit(code) }
            }
            child => {
                debug!(pid = child, "forked connection handler");
                self.children.push(child);
                Ok(())
            }
        }
    }

    #[cfg(not(unix))]
    fn spawn(&mut self, connection: Connection) -> Result<()> {
        self.handle(connection);
        Ok(())
    }

    /// Forget finished children. With `wait` set, block until all exit.
    ///
    /// Exited children are normally collected by the `SIGCHLD` handler, so
    /// `waitpid` here mostly reports `ECHILD`.
    #[cfg(unix)]
    fn reap(&mut self, wait: bool) {
        let flags = if wait { 0 } else { libc::WNOHANG };
        self.children.retain(|&pid| {
            let mut status: libc::c_int = 0;
            // SAFETY: `pid` is a child of this process and `status` is a
            // valid out pointer.
            let ret = unsafe { libc::waitpid(pid, &mut status, flags) };
            match ret {
                0 => true,
                -1 => false,
                _ => {
                    debug!(pid, status, "connection handler exited");
                    false
                }
            }
        });
    }

    #[cfg(not(unix))]
    fn reap(&mut self, _wait: bool) {}
}

/// Reap every exited child. Runs in signal context, so it only calls
/// `waitpid`.
#[cfg(unix)]
extern "C" fn reap_children(_signal: libc::c_int) {
    // SAFETY: `waitpid` is async-signal-safe and a null status pointer is
    // allowed.
    unsafe { while libc::waitpid(-1, std::ptr::null_mut(), libc::WNOHANG) > 0 {} }
}

/// Collect connection handlers as they exit, even while the listener is
/// blocked in accept.
#[cfg(unix)]
fn install_child_reaper() -> std::io::Result<()> {
    let handler: extern "C" fn(libc::c_int) = reap_children;
    // SAFETY: `action` is fully initialised before it is passed to
    // `sigaction`, and the handler only calls async-signal-safe functions.
    let ret = unsafe {
        let mut action: libc::sigaction = std::mem::zeroed();
        action.sa_sigaction = handler as libc::sighandler_t;
        action.sa_flags = libc::SA_RESTART | libc::SA_NOCLDSTOP;
        libc::sigemptyset(&mut action.sa_mask);
        libc::sigaction(libc::SIGCHLD, &action, std::ptr::null_mut())
    };
    if ret != 0 {
        return Err(std::io::Error::last_os_error());
    }
    debug!("SIGCHLD handler installed");
    Ok(())
}

#[cfg(not(unix))]
fn install_child_reaper() -> std::io::Result<()> {
    Ok(())
}

impl std::fmt::Debug for ReconServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReconServer")
            .field("addr", &self.socket.local_addr())
            .field("fork_per_connection", &self.fork_per_connection)
            .finish_non_exhaustive()
    }
}

//! Readiness notifications for the X connection.
//!
//! A blocking task polls the connection's socket with mio and wakes the
//! main loop through a [`Notify`]. Events themselves are still read by
//! [`XConnection::next_event`](super::XConnection::next_event).

use std::os::unix::io::AsRawFd;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::sync::{oneshot, Notify};
use x11rb::rust_connection::RustConnection;

const POLL_TIMEOUT: Duration = Duration::from_millis(100);

pub struct X11EventStream {
    // Keeps the socket open for the poller.
    _conn: Arc<RustConnection>,
    notify: Arc<Notify>,
    _task_guard: oneshot::Receiver<()>,
}

impl X11EventStream {
    /// Start polling the socket of `conn`. The poller stops once the
    /// stream is dropped.
    pub fn new(conn: Arc<RustConnection>) -> Result<Self> {
        let fd = conn.stream().as_raw_fd();
        let notify = Arc::new(Notify::new());
        let task_notify = notify.clone();

        let (guard, task_guard) = oneshot::channel::<()>();
        let mut poll = mio::Poll::new().context("Failed to create mio Poll")?;
        let mut events = mio::Events::with_capacity(1);
        poll.registry()
            .register(&mut mio::unix::SourceFd(&fd), mio::Token(0), mio::Interest::READABLE)
            .context("Failed to register X11 socket with mio")?;

        tokio::task::spawn_blocking(move || loop {
            if guard.is_closed() {
                tracing::debug!("X11 socket poller stopping");
                return;
            }
            if let Err(err) = poll.poll(&mut events, Some(POLL_TIMEOUT)) {
                tracing::warn!("X11 socket poll failed: {:?}", err);
                continue;
            }
            if events.iter().any(|event| event.token() == mio::Token(0)) {
                task_notify.notify_one();
            }
        });

        Ok(Self {
            _conn: conn,
            notify,
            _task_guard: task_guard,
        })
    }

    /// Wait until the socket has become readable.
    pub async fn wait_readable(&self) {
        self.notify.notified().await;
    }
}

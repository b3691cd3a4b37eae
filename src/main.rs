//! boxwm
//!
//! Blackbox-style reparenting window manager for X11.

use anyhow::Result;
use tracing::{debug, error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use x11rb::protocol::Event;

use boxwm::config::Config;
use boxwm::wm::{Style, WindowManager, WindowingSystem, WmEvent, Workspaces};
use boxwm::x11::{PixmapRenderer, X11EventStream, XConnection};

/// Main application state
struct BoxApp {
    wm: WindowManager<XConnection, PixmapRenderer, Workspaces>,
    stream: X11EventStream,
}

impl BoxApp {
    /// Take over the display and adopt the windows already on it.
    fn new(replace: bool, config: &Config) -> Result<Self> {
        let conn = XConnection::connect(replace, &config.style)?;
        let stream = X11EventStream::new(conn.raw())?;
        let renderer = PixmapRenderer::new(conn.raw(), conn.root(), conn.root_depth())?;
        let host = Workspaces::new(
            config.behavior.workspaces,
            conn.screen_size(),
            config.behavior.reserved_height,
        );
        let style = Style::new(&config.style, &config.behavior, conn.font_metrics());
        let mut wm = WindowManager::new(conn, renderer, host, style);

        let existing = wm.conn_mut().existing_clients()?;
        info!("Adopting {} existing windows", existing.len());
        for window in existing {
            wm.handle_event(WmEvent::MapRequest { window });
        }
        wm.host_mut().finish_startup();

        Ok(Self { wm, stream })
    }

    /// Hand everything queued on the connection to the window manager.
    fn drain_events(&mut self) -> Result<()> {
        while let Some(event) = self.wm.conn_mut().next_event()? {
            if let Event::Error(err) = &event {
                debug!("X11 error: {:?}", err);
                continue;
            }
            if let Some(event) = self.wm.conn().translate(&event) {
                self.wm.handle_event(event);
            }
        }
        Ok(())
    }

    async fn run(&mut self, shutdown: &mut tokio::sync::mpsc::Receiver<()>) -> Result<()> {
        info!("Starting main event loop");
        loop {
            self.wm.conn().flush()?;
            self.drain_events()?;
            self.wm.conn().flush()?;

            tokio::select! {
                () = self.stream.wait_readable() => {}
                _ = shutdown.recv() => {
                    info!("Shutdown signal received, releasing windows");
                    return Ok(());
                }
            }
        }
    }

    fn shutdown(&mut self) {
        self.wm.shutdown();
        if let Err(e) = self.wm.conn().flush() {
            warn!("Failed to flush on shutdown: {}", e);
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "boxwm=debug,info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting boxwm");

    let args: Vec<String> = std::env::args().collect();
    let replace = args.iter().any(|arg| arg == "--replace" || arg == "-r");
    if replace {
        info!("--replace flag detected: will attempt to replace existing WM");
    }

    let config = Config::load().unwrap_or_else(|e| {
        warn!("Failed to load config, using defaults: {:#}", e);
        Config::default()
    });

    let (shutdown_tx, mut shutdown_rx) = tokio::sync::mpsc::channel::<()>(1);

    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut sigterm = signal(SignalKind::terminate())?;
        let mut sigint = signal(SignalKind::interrupt())?;
        let tx = shutdown_tx.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = sigterm.recv() => info!("Received SIGTERM, shutting down gracefully"),
                _ = sigint.recv() => info!("Received SIGINT, shutting down gracefully"),
            }
            let _ = tx.send(()).await;
        });
    }

    let mut app = BoxApp::new(replace, &config)?;
    let result = app.run(&mut shutdown_rx).await;
    if let Err(e) = &result {
        error!("Application error: {:#}", e);
    }
    app.shutdown();
    result
}

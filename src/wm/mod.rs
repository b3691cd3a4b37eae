//! Window Manager Module
//!
//! The window core: [`ManagedWindow`] instances plus the
//! [`WindowManager`] driver that owns them, routes events to them and
//! carries out the cross-window follow-ups they request.

pub mod client;
pub mod client_flags;
pub mod connection;
pub mod decorations;
pub mod directory;
pub mod events;
pub mod focus;
pub mod hints;
pub mod layout;
pub mod lifecycle;
pub mod moveresize;
pub mod placement;
pub mod render;
pub mod session;
pub mod style;
pub mod transients;
pub mod workspace;

#[cfg(test)]
pub(crate) mod testing;

use std::collections::{HashMap, HashSet, VecDeque};
use thiserror::Error;
use tracing::{debug, info, warn};

pub use client::ManagedWindow;
pub use connection::{Window, WindowingSystem};
pub use directory::{ClientId, WindowDirectory};
pub use events::WmEvent;
pub use render::DecorationRenderer;
pub use style::Style;
pub use workspace::{WorkspaceHost, Workspaces};

use crate::wm::client_flags::LifecycleState;
use crate::wm::decorations::Part;
use crate::wm::focus::FocusOutcome;
use crate::wm::placement::Cascade;
use crate::wm::transients::Peers;

/// Upper bound on follow-ups processed for one incoming event.
const MAX_FOLLOWUPS: usize = 64;

#[derive(Debug, Error)]
pub enum WindowError {
    /// The client window was destroyed behind our back.
    #[error("client window {0:#x} no longer exists")]
    InvalidClient(Window),
    #[error(transparent)]
    Protocol(#[from] anyhow::Error),
}

pub type WindowResult<T> = std::result::Result<T, WindowError>;

/// Work one window asks the driver to do on another (or on itself once
/// the current operation has finished).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Followup {
    Iconify(ClientId),
    Deiconify(ClientId),
    Focus(ClientId),
    Stick(ClientId, bool),
    Release(ClientId),
}

/// Everything a window operation may touch besides the window itself.
pub struct Ctx<'a> {
    pub conn: &'a mut dyn WindowingSystem,
    pub renderer: &'a mut dyn DecorationRenderer,
    pub host: &'a mut dyn WorkspaceHost,
    pub directory: &'a mut WindowDirectory,
    pub style: &'a Style,
    pub peers: &'a dyn Peers,
    pub followups: &'a mut Vec<Followup>,
}

impl Ctx<'_> {
    /// Fail with [`WindowError::InvalidClient`] when a destroy notification
    /// for `client` is already queued.
    pub fn validate(&mut self, client: Window) -> WindowResult<()> {
        if self.conn.pending_destroy(client)? {
            return Err(WindowError::InvalidClient(client));
        }
        Ok(())
    }
}

/// Owns every managed window and the collaborators they share.
pub struct WindowManager<X, R, H> {
    conn: X,
    renderer: R,
    host: H,
    directory: WindowDirectory,
    style: Style,
    cascade: Cascade,
    clients: HashMap<ClientId, ManagedWindow>,
    pending: VecDeque<Followup>,
}

impl<X, R, H> WindowManager<X, R, H>
where
    X: WindowingSystem,
    R: DecorationRenderer,
    H: WorkspaceHost,
{
    pub fn new(conn: X, renderer: R, host: H, style: Style) -> Self {
        Self {
            conn,
            renderer,
            host,
            directory: WindowDirectory::new(),
            style,
            cascade: Cascade::default(),
            clients: HashMap::new(),
            pending: VecDeque::new(),
        }
    }

    pub fn conn(&self) -> &X {
        &self.conn
    }

    pub fn conn_mut(&mut self) -> &mut X {
        &mut self.conn
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    pub fn style(&self) -> &Style {
        &self.style
    }

    pub fn window(&self, id: ClientId) -> Option<&ManagedWindow> {
        self.clients.get(&id)
    }

    pub fn windows(&self) -> impl Iterator<Item = &ManagedWindow> {
        self.clients.values()
    }

    pub fn directory(&self) -> &WindowDirectory {
        &self.directory
    }

    /// Take a window under management. Returns its id, or `None` when the
    /// window is not manageable.
    pub fn manage(&mut self, window: Window) -> Option<ClientId> {
        let id = ClientId(window);
        if self.clients.contains_key(&id) {
            return Some(id);
        }

        let mut followups = Vec::new();
        let result = {
            let mut ctx = Ctx {
                conn: &mut self.conn,
                renderer: &mut self.renderer,
                host: &mut self.host,
                directory: &mut self.directory,
                style: &self.style,
                peers: &self.clients,
                followups: &mut followups,
            };
            ManagedWindow::manage(&mut ctx, &mut self.cascade, window)
        };
        self.pending.extend(followups);

        let managed = match result {
            Ok(Some(managed)) => managed,
            Ok(None) => return None,
            Err(WindowError::InvalidClient(window)) => {
                info!("Window {:#x} vanished while being managed", window);
                return None;
            }
            Err(WindowError::Protocol(err)) => {
                warn!("Failed to manage {:#x}: {:#}", window, err);
                return None;
            }
        };

        let owner = managed.transient_owner;
        self.clients.insert(id, managed);
        if let Some(owner) = owner {
            transients::link(&mut self.clients, id, owner);
        }
        self.drain_followups();
        Some(id)
    }

    /// Run one operation on one window with a fresh context.
    ///
    /// An invalid client releases the window; protocol errors abandon the
    /// operation.
    pub fn run<T>(
        &mut self,
        id: ClientId,
        op: impl FnOnce(&mut ManagedWindow, &mut Ctx<'_>) -> WindowResult<T>,
    ) -> Option<T> {
        let mut window = self.clients.remove(&id)?;
        let mut followups = Vec::new();
        let result = {
            let mut ctx = Ctx {
                conn: &mut self.conn,
                renderer: &mut self.renderer,
                host: &mut self.host,
                directory: &mut self.directory,
                style: &self.style,
                peers: &self.clients,
                followups: &mut followups,
            };
            op(&mut window, &mut ctx)
        };
        self.clients.insert(id, window);
        self.pending.extend(followups);

        match result {
            Ok(value) => Some(value),
            Err(WindowError::InvalidClient(client)) => {
                info!("Client {:#x} is gone, releasing it", client);
                if let Some(window) = self.clients.get_mut(&id) {
                    window.client_gone = true;
                }
                self.release(id);
                None
            }
            Err(WindowError::Protocol(err)) => {
                warn!("Operation on {:#x} failed: {:#}", id.window(), err);
                None
            }
        }
    }

    /// Stop managing a window and clear every reference to it.
    pub fn release(&mut self, id: ClientId) {
        let Some(mut window) = self.clients.remove(&id) else {
            return;
        };
        transients::unlink(&mut self.clients, id, window.transient_owner, window.transient_child);

        let mut followups = Vec::new();
        let mut ctx = Ctx {
            conn: &mut self.conn,
            renderer: &mut self.renderer,
            host: &mut self.host,
            directory: &mut self.directory,
            style: &self.style,
            peers: &self.clients,
            followups: &mut followups,
        };
        if let Err(err) = window.release(&mut ctx) {
            warn!("Releasing {:#x} failed: {:#}", id.window(), err);
        }
        info!("Stopped managing {:#x}", id.window());
    }

    /// Give a window keyboard focus, following transient delegation.
    pub fn focus(&mut self, id: ClientId) -> bool {
        let granted = self.focus_chain(id);
        self.drain_followups();
        granted
    }

    fn focus_chain(&mut self, id: ClientId) -> bool {
        let mut visited = HashSet::new();
        let mut current = id;
        loop {
            if !visited.insert(current) {
                warn!("Transient cycle while focusing {:#x}", id.window());
                return false;
            }
            match self.run(current, |window, ctx| window.request_focus(ctx)) {
                Some(FocusOutcome::Granted(granted)) => return granted,
                Some(FocusOutcome::Delegate(owner)) => {
                    debug!("Focus for {:#x} goes to owner {:#x}", current.window(), owner.window());
                    current = owner;
                }
                None => return false,
            }
        }
    }

    /// Route one event to the window it belongs to.
    pub fn handle_event(&mut self, event: WmEvent) {
        let target = event.window();
        let Some(id) = self.directory.lookup(target) else {
            self.handle_unmanaged(event);
            self.drain_followups();
            return;
        };
        let Some(part) = self.clients.get(&id).and_then(|window| window.part_of(target)) else {
            return;
        };

        match event {
            WmEvent::MapRequest { .. } => {
                self.run(id, |window, ctx| window.map_request(ctx));
            }
            WmEvent::MapNotify { override_redirect, .. } => {
                self.run(id, |window, ctx| window.map_notify(ctx, override_redirect));
            }
            WmEvent::UnmapNotify { .. } if part == Part::Client => {
                self.run(id, |window, ctx| window.unmap_notify(ctx));
            }
            WmEvent::DestroyNotify { .. } if part == Part::Client => {
                self.run(id, |window, ctx| window.destroy_notify(ctx));
            }
            WmEvent::ConfigureRequest { changes, .. } => {
                self.run(id, |window, ctx| window.configure_request(ctx, &changes));
            }
            WmEvent::PropertyNotify { property, .. } => {
                self.run(id, |window, ctx| window.property_notify(ctx, property));
            }
            WmEvent::ButtonPress(event) => {
                self.run(id, |window, ctx| window.button_press(ctx, part, &event));
            }
            WmEvent::ButtonRelease(event) => {
                self.run(id, |window, ctx| window.button_release(ctx, part, &event));
            }
            WmEvent::Motion(event) => {
                self.run(id, |window, ctx| window.pointer_motion(ctx, part, &event));
            }
            WmEvent::Expose { .. } => {
                self.run(id, |window, ctx| window.expose(ctx, part));
            }
            WmEvent::ShapeNotify { shaped, .. } => {
                self.run(id, |window, ctx| window.shape_notify(ctx, shaped));
            }
            WmEvent::FocusIn { .. } => {
                self.run(id, |window, ctx| window.focus_in(ctx));
            }
            WmEvent::FocusOut { .. } => {
                self.run(id, |window, ctx| window.focus_out(ctx));
            }
            WmEvent::GrabLost { .. } => {
                self.run(id, |window, ctx| window.grab_lost(ctx));
            }
            WmEvent::UnmapNotify { .. } | WmEvent::DestroyNotify { .. } => {}
        }
        self.drain_followups();
    }

    fn handle_unmanaged(&mut self, event: WmEvent) {
        match event {
            WmEvent::MapRequest { window } => {
                if let Some(id) = self.manage(window) {
                    self.run(id, |window, ctx| window.map_request(ctx));
                } else if let Err(err) = self.conn.map_window(window) {
                    warn!("Failed to map unmanaged {:#x}: {:#}", window, err);
                }
            }
            WmEvent::ConfigureRequest { window, changes } => {
                if let Err(err) = self.conn.configure_window(window, &changes) {
                    warn!("Failed to forward configure request for {:#x}: {:#}", window, err);
                }
            }
            _ => {}
        }
    }

    fn drain_followups(&mut self) {
        let mut steps = 0;
        while let Some(followup) = self.pending.pop_front() {
            steps += 1;
            if steps > MAX_FOLLOWUPS {
                warn!("Dropping {} follow-ups after {} steps", self.pending.len() + 1, MAX_FOLLOWUPS);
                self.pending.clear();
                break;
            }

            match followup {
                Followup::Iconify(id) => {
                    if self.lifecycle_of(id).is_some_and(|state| state != LifecycleState::Iconic) {
                        self.run(id, |window, ctx| window.iconify(ctx));
                    }
                }
                Followup::Deiconify(id) => {
                    let shown = self.clients.get(&id).map(|window| {
                        window.is_visible() && window.lifecycle() == LifecycleState::Normal
                    });
                    if shown == Some(false) {
                        self.run(id, |window, ctx| window.deiconify(ctx));
                    }
                }
                Followup::Focus(id) => {
                    self.focus_chain(id);
                }
                Followup::Stick(id, stuck) => {
                    if self.clients.get(&id).is_some_and(|window| window.is_stuck() != stuck) {
                        self.run(id, |window, ctx| window.toggle_stick(ctx));
                    }
                }
                Followup::Release(id) => self.release(id),
            }
        }
    }

    fn lifecycle_of(&self, id: ClientId) -> Option<LifecycleState> {
        self.clients.get(&id).map(ManagedWindow::lifecycle)
    }

    /// Release every window, handing clients back to the root.
    pub fn shutdown(&mut self) {
        let ids: Vec<ClientId> = self.clients.keys().copied().collect();
        info!("Releasing {} managed windows", ids.len());
        for id in ids {
            self.release(id);
        }
        self.pending.clear();
    }
}

#[cfg(test)]
mod tests {
    use crate::wm::client_flags::Modifiers;
    use crate::wm::testing::{Call, Harness};
    use crate::wm::{ClientId, WmEvent};

    #[test]
    fn test_operation_on_vanished_client_releases_it() {
        let mut harness = Harness::new();
        let client = harness.map_client(400, 300);
        let root = harness.root();
        harness.server().destroy(client.window());

        let outcome = harness.with_window(client, |window, ctx| window.iconify(ctx));
        assert_eq!(outcome, None);
        assert!(!harness.is_managed(client));
        assert!(harness.directory_is_empty());
        assert_eq!(harness.live_pixmaps(), 0);
        assert!(!harness.server().calls.contains(&Call::Reparent(client.window(), root)));
        assert!(harness.host().icons().next().is_none());
    }

    #[test]
    fn test_button_press_on_vanished_client_does_not_restack() {
        let mut harness = Harness::new();
        let client = harness.map_client(400, 300);
        let title = harness.window(client).windows().title.unwrap();
        harness.server().destroy(client.window());
        harness.server().calls.clear();

        harness.press(title, 1, Modifiers::empty());
        assert!(!harness.is_managed(client));
        assert!(!harness
            .server()
            .calls
            .iter()
            .any(|call| matches!(call, Call::Restack(_))));
    }

    #[test]
    fn test_override_redirect_window_is_not_managed() {
        let mut harness = Harness::new();
        let window = harness.server().next_client(200, 100);
        harness.server().override_redirect(window);

        harness.event(WmEvent::MapRequest { window });
        assert!(!harness.is_managed(ClientId(window)));
        assert!(harness.directory_is_empty());
    }

    #[test]
    fn test_window_gone_before_manage_is_skipped() {
        let mut harness = Harness::new();
        let window = harness.server().next_client(200, 100);
        harness.server().destroy(window);
        harness.event(WmEvent::MapRequest { window });
        assert!(!harness.is_managed(ClientId(window)));

        // No attributes at all: the window never existed as far as the
        // server is concerned.
        harness.event(WmEvent::MapRequest { window: 0x7777 });
        assert!(!harness.is_managed(ClientId(0x7777)));
        assert!(harness.directory_is_empty());
        assert_eq!(harness.live_pixmaps(), 0);
    }
}

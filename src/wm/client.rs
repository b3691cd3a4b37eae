//! Managed Window
//!
//! One [`ManagedWindow`] wraps one client window in a decoration frame. The
//! frame geometry is authoritative; the client geometry is always derived
//! from it through the decoration metrics.

use anyhow::Result;
use tracing::{debug, info, warn};

use crate::shared::{Geometry, Size};
use crate::wm::client_flags::{Decorations, FocusMode, Functions, LifecycleState};
use crate::wm::connection::{EventInterest, HintProperty, Protocol, Window, WindowChanges};
use crate::wm::decorations::{FrameWindows, Surfaces};
use crate::wm::directory::ClientId;
use crate::wm::hints::{negotiate, MwmHints, Negotiation, SizeHints, WmHints};
use crate::wm::layout::DecorationMetrics;
use crate::wm::moveresize::Interaction;
use crate::wm::placement::{Cascade, PlacementMode, PlacementRequest};
use crate::wm::session::{StateRecord, StoredState};
use crate::wm::{transients, Ctx, WindowError, WindowResult};

/// Title used when the client has none.
pub const UNNAMED: &str = "Unnamed";

/// WM_PROTOCOLS entries found on the client.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClientProtocols {
    pub delete: bool,
    pub take_focus: bool,
    pub window_state: bool,
    pub colormap: bool,
}

impl ClientProtocols {
    pub fn from_list(list: &[Protocol]) -> Self {
        let mut protocols = Self::default();
        for protocol in list {
            match protocol {
                Protocol::Delete => protocols.delete = true,
                Protocol::TakeFocus => protocols.take_focus = true,
                Protocol::WindowState => protocols.window_state = true,
                Protocol::Colormap => protocols.colormap = true,
            }
        }
        protocols
    }
}

/// A client window under management.
#[derive(Debug)]
pub struct ManagedWindow {
    pub(crate) id: ClientId,
    pub(crate) client: Window,
    pub(crate) windows: FrameWindows,
    pub(crate) surfaces: Surfaces,
    pub(crate) metrics: DecorationMetrics,

    pub(crate) frame_geometry: Geometry,
    pub(crate) client_geometry: Geometry,
    /// Frame geometry before maximizing.
    pub(crate) saved_geometry: Option<Geometry>,

    pub(crate) size_hints: SizeHints,
    pub(crate) wm_hints: Option<WmHints>,
    pub(crate) mwm_hints: Option<MwmHints>,
    pub(crate) protocols: ClientProtocols,
    pub(crate) functions: Functions,
    pub(crate) focus_mode: FocusMode,

    pub(crate) lifecycle: LifecycleState,
    pub(crate) interaction: Interaction,

    pub(crate) visible: bool,
    pub(crate) focused: bool,
    pub(crate) shaded: bool,
    pub(crate) maximized: bool,
    pub(crate) stuck: bool,
    pub(crate) urgent: bool,
    pub(crate) shaped: bool,
    /// An icon entry exists in the host.
    pub(crate) iconified: bool,
    pub(crate) transient: bool,
    /// The client currently sits inside our frame.
    pub(crate) reparented: bool,
    /// The client window no longer exists on the server.
    pub(crate) client_gone: bool,

    pub(crate) transient_owner: Option<ClientId>,
    pub(crate) transient_child: Option<ClientId>,
    pub(crate) group: Option<Window>,
    pub(crate) workspace: usize,

    pub(crate) title: String,
    pub(crate) title_width: u32,
}

impl ManagedWindow {
    fn new(client: Window, geometry: Geometry, ctx: &Ctx<'_>) -> Self {
        let geometry = Geometry::new(geometry.x, geometry.y, geometry.width.max(1), geometry.height.max(1));
        Self {
            id: ClientId(client),
            client,
            windows: FrameWindows::default(),
            surfaces: Surfaces::default(),
            metrics: DecorationMetrics::for_style(Decorations::default(), ctx.style),
            frame_geometry: Geometry::default(),
            client_geometry: geometry,
            saved_geometry: None,
            size_hints: SizeHints::defaults(ctx.host.screen_size()),
            wm_hints: None,
            mwm_hints: None,
            protocols: ClientProtocols::default(),
            functions: Functions::default(),
            focus_mode: FocusMode::Passive,
            lifecycle: LifecycleState::Withdrawn,
            interaction: Interaction::Idle,
            visible: false,
            focused: false,
            shaded: false,
            maximized: false,
            stuck: false,
            urgent: false,
            shaped: false,
            iconified: false,
            transient: false,
            reparented: false,
            client_gone: false,
            transient_owner: None,
            transient_child: None,
            group: None,
            workspace: 0,
            title: UNNAMED.to_string(),
            title_width: 0,
        }
    }

    /// Take `window` under management.
    ///
    /// Returns `Ok(None)` for windows that must not be managed
    /// (override-redirect or already gone). A failure part way through
    /// releases everything created so far.
    pub fn manage(ctx: &mut Ctx<'_>, cascade: &mut Cascade, window: Window) -> WindowResult<Option<Self>> {
        ctx.validate(window)?;

        let Some(attributes) = ctx.conn.client_attributes(window)? else {
            debug!("Window {:#x} vanished before it could be managed", window);
            return Ok(None);
        };
        if attributes.override_redirect {
            debug!("Skipping override-redirect window {:#x}", window);
            return Ok(None);
        }

        let mut managed = Self::new(window, attributes.geometry, ctx);
        match managed.build(ctx, cascade) {
            Ok(()) => {
                info!(
                    "Managing {:#x} '{}' in frame {:#x} at {:?}",
                    window, managed.title, managed.windows.frame, managed.frame_geometry
                );
                Ok(Some(managed))
            }
            Err(err) => {
                managed.client_gone |= matches!(err, WindowError::InvalidClient(_));
                if let Err(cleanup) = managed.release(ctx) {
                    warn!("Cleanup after failed manage of {:#x} failed: {:#}", window, cleanup);
                }
                Err(err)
            }
        }
    }

    fn build(&mut self, ctx: &mut Ctx<'_>, cascade: &mut Cascade) -> WindowResult<()> {
        let screen = ctx.host.screen_size();
        ctx.directory.register(self.client, self.id);

        self.read_wm_hints(ctx)?;
        if let Some(group) = self.group {
            ctx.directory.register_group(group, self.id);
        }
        self.size_hints = SizeHints::from_words(
            ctx.conn.property_words(self.client, HintProperty::NormalHints)?.as_deref(),
            screen,
        );

        self.transient_owner = transients::resolve_owner(ctx, self.client, self.group, self.id)?;
        self.transient = self.transient_owner.is_some();
        if let Some(owner) = self.transient_owner {
            self.stuck = ctx.peers.is_stuck(owner).unwrap_or(false);
        }

        self.read_protocols(ctx)?;
        self.mwm_hints =
            MwmHints::from_words(ctx.conn.property_words(self.client, HintProperty::MotifHints)?.as_deref());
        let (decorations, functions) = self.negotiate();
        self.functions = functions;
        self.metrics = DecorationMetrics::for_style(decorations, ctx.style);

        let layout = self.metrics.layout(self.client_geometry.size());
        let mode = if ctx.host.starting_up() {
            PlacementMode::Startup
        } else if self.transient || self.size_hints.positioned {
            PlacementMode::Positioned(self.size_hints.gravity)
        } else {
            PlacementMode::Free
        };
        let (x, y) = cascade.place(
            &PlacementRequest {
                client: self.client_geometry,
                frame: layout.frame,
                client_offset: self.metrics.client_offset(),
                title_height: self.metrics.title_height,
                mode,
            },
            screen,
        );
        let target = Geometry::new(x, y, layout.frame.width, layout.frame.height);

        self.windows.frame = ctx.conn.create_frame(target, ctx.style.border_color)?;
        ctx.directory.register(self.windows.frame, self.id);
        self.frame_geometry = target;
        self.client_geometry = self.metrics.client_geometry(target);

        self.create_decoration_windows(ctx, &layout)?;
        self.associate_client(ctx)?;
        self.sync_buttons(ctx)?;
        if let Some(title) = self.windows.title {
            ctx.conn.map_subwindows(title)?;
        }
        ctx.conn.map_subwindows(self.windows.frame)?;
        self.position_buttons(ctx)?;
        self.render_surfaces(ctx)?;

        let workspace = if self.stuck { 0 } else { ctx.host.current_workspace() };
        self.workspace = ctx.host.join(workspace, self.id, self.windows.frame);
        ctx.host.set_sticky(self.id, self.stuck);

        self.set_focus_flag(ctx, false)?;
        ctx.conn.send_configure_notify(self.client, self.client_geometry, self.windows.frame)?;

        if self.protocols.window_state {
            self.restore_window_state(ctx)?;
        }
        Ok(())
    }

    /// Reparent the client into its frame and start listening to it.
    fn associate_client(&mut self, ctx: &mut Ctx<'_>) -> WindowResult<()> {
        ctx.conn.configure_window(self.client, &WindowChanges::default().border_width(0))?;
        self.read_title(ctx)?;
        ctx.conn.change_save_set(self.client, true)?;
        self.adopt_client(ctx)?;

        if ctx.conn.shape_supported() {
            self.shaped = ctx.conn.query_shaped(self.client)?;
            self.apply_shape(ctx)?;
        }
        Ok(())
    }

    /// Move the client under its decoration parent at the layout position.
    fn adopt_client(&mut self, ctx: &mut Ctx<'_>) -> Result<()> {
        let parent = self.windows.border.unwrap_or(self.windows.frame);
        let (x, y) = self.metrics.layout(self.client_geometry.size()).client_in_parent;
        ctx.conn.select_input(self.client, EventInterest::Nothing)?;
        ctx.conn.reparent_window(self.client, parent, x, y)?;
        ctx.conn.select_input(parent, EventInterest::FrameContainer)?;
        ctx.conn.select_input(self.client, EventInterest::Client)?;
        self.reparented = true;
        Ok(())
    }

    /// Apply the state stored on the client by a previous manager.
    fn restore_window_state(&mut self, ctx: &mut Ctx<'_>) -> WindowResult<()> {
        let words = ctx.conn.property_words(self.client, HintProperty::WmState)?;
        let Some(stored) = words.as_deref().and_then(StoredState::from_words) else {
            return Ok(());
        };
        match LifecycleState::from_icccm(stored.state) {
            LifecycleState::Withdrawn => {
                self.withdraw(ctx)?;
                self.set_focus_flag(ctx, false)?;
            }
            LifecycleState::Iconic => self.iconify(ctx)?,
            LifecycleState::Normal => {
                self.deiconify(ctx)?;
                self.set_focus_flag(ctx, false)?;
            }
        }
        Ok(())
    }

    pub(crate) fn read_wm_hints(&mut self, ctx: &mut Ctx<'_>) -> Result<()> {
        let words = ctx.conn.property_words(self.client, HintProperty::WmHints)?;
        self.wm_hints = WmHints::from_words(words.as_deref());
        if let Some(hints) = self.wm_hints {
            self.urgent = hints.urgent;
            if self.group.is_none() {
                self.group = hints.group;
            }
        }
        self.focus_mode = FocusMode::derive(self.wm_hints.and_then(|h| h.input), self.protocols.take_focus);
        Ok(())
    }

    pub(crate) fn read_protocols(&mut self, ctx: &mut Ctx<'_>) -> Result<()> {
        self.protocols = ClientProtocols::from_list(&ctx.conn.protocols(self.client)?);
        self.focus_mode = FocusMode::derive(self.wm_hints.and_then(|h| h.input), self.protocols.take_focus);
        Ok(())
    }

    pub(crate) fn read_title(&mut self, ctx: &mut Ctx<'_>) -> Result<()> {
        self.title = ctx
            .conn
            .window_name(self.client)?
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| UNNAMED.to_string());
        self.title_width = ctx.conn.text_width(&self.title)?;
        Ok(())
    }

    pub(crate) fn icon_label(&self, ctx: &mut Ctx<'_>) -> Result<String> {
        Ok(ctx
            .conn
            .icon_name(self.client)?
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| self.title.clone()))
    }

    pub(crate) fn negotiate(&self) -> (Decorations, Functions) {
        negotiate(Negotiation {
            transient: self.transient,
            size_hints: &self.size_hints,
            mwm: self.mwm_hints,
            close_protocol: self.protocols.delete,
        })
    }

    /// Adopt freshly negotiated capabilities, rebuilding decoration windows
    /// when the structural flags changed. The client keeps its size.
    pub(crate) fn apply_capabilities(
        &mut self,
        ctx: &mut Ctx<'_>,
        decorations: Decorations,
        functions: Functions,
    ) -> WindowResult<()> {
        self.functions = functions;
        let old = self.metrics.decorations;
        if decorations == old {
            return Ok(());
        }
        ctx.validate(self.client)?;
        debug!("Decorations of {:#x} change {:?} -> {:?}", self.client, old, decorations);

        let client_size = self.client_geometry.size();
        self.metrics = DecorationMetrics::for_style(decorations, ctx.style);
        if !decorations.contains(Decorations::TITLEBAR) {
            self.shaded = false;
        }

        let structural = Decorations::TITLEBAR | Decorations::BORDER | Decorations::HANDLE;
        if (old ^ decorations).intersects(structural) {
            ctx.conn.select_input(self.client, EventInterest::Nothing)?;
            ctx.conn.reparent_window(self.client, self.windows.frame, 0, 0)?;
            self.destroy_decoration_windows(ctx)?;

            let layout = self.metrics.layout(client_size);
            self.create_decoration_windows(ctx, &layout)?;
            self.adopt_client(ctx)?;
            self.sync_buttons(ctx)?;
            if let Some(title) = self.windows.title {
                ctx.conn.map_subwindows(title)?;
            }
            ctx.conn.map_subwindows(self.windows.frame)?;

            let frame = self.metrics.frame_size(client_size);
            self.frame_geometry = Geometry::new(self.frame_geometry.x, self.frame_geometry.y, frame.width, frame.height);
            self.client_geometry = self.metrics.client_geometry(self.frame_geometry);
            self.refresh_frame(ctx)?;
        } else {
            self.sync_buttons(ctx)?;
            self.position_buttons(ctx)?;
            self.paint_decorations(ctx)?;
        }
        Ok(())
    }

    /// Commit a new frame geometry.
    ///
    /// The size is clamped to the decorated maximum and normalized through
    /// the client size; a frame pushed completely off the top or left edge
    /// is pulled back to 0. A pure move tells the client where it now is.
    pub fn configure_frame(&mut self, ctx: &mut Ctx<'_>, target: Geometry) -> WindowResult<()> {
        ctx.validate(self.client)?;

        let max = self
            .metrics
            .frame_size(Size::new(self.size_hints.max_width, self.size_hints.max_height));
        let clamped = Size::new(target.width.min(max.width), target.height.min(max.height));
        let size = self.metrics.frame_size(self.metrics.client_size(clamped));

        let mut x = target.x;
        let mut y = target.y;
        if x + (size.width as i32) < 0 {
            x = 0;
        }
        if y + (size.height as i32) < 0 {
            y = 0;
        }

        let resized = size != self.frame_geometry.size();
        self.frame_geometry = Geometry::new(x, y, size.width, size.height);
        self.client_geometry = self.metrics.client_geometry(self.frame_geometry);

        if resized {
            self.refresh_frame(ctx)?;
        } else {
            ctx.conn.configure_window(self.windows.frame, &WindowChanges::position(x, y))?;
            ctx.conn
                .send_configure_notify(self.client, self.client_geometry, self.windows.frame)?;
        }
        Ok(())
    }

    /// Push the current frame geometry to the server and redo everything
    /// that depends on the frame size.
    pub(crate) fn refresh_frame(&mut self, ctx: &mut Ctx<'_>) -> Result<()> {
        let mut frame = self.frame_geometry;
        if self.shaded {
            frame.height = self.metrics.title_height;
        }
        ctx.conn.configure_window(self.windows.frame, &WindowChanges::geometry(frame))?;
        self.layout_subwindows(ctx)?;
        self.position_buttons(ctx)?;
        self.render_surfaces(ctx)?;
        self.paint_decorations(ctx)?;
        self.apply_shape(ctx)
    }

    pub(crate) fn persist_state(&self, ctx: &mut Ctx<'_>, state: LifecycleState) -> Result<()> {
        ctx.conn.set_wm_state(self.client, &StateRecord::new(state, self.workspace))
    }

    /// Undo everything management did: leave the host, hand the client back
    /// to the root window, destroy decoration windows and surfaces.
    pub fn release(&mut self, ctx: &mut Ctx<'_>) -> Result<()> {
        if !self.interaction.is_idle() {
            self.erase_feedback(ctx)?;
            ctx.conn.ungrab_pointer()?;
            self.interaction = Interaction::Idle;
        }

        ctx.host.leave(self.id);
        if self.iconified {
            ctx.host.remove_icon(self.id);
            self.iconified = false;
        }
        if let Some(group) = self.group {
            ctx.directory.remove_group(group, self.id);
        }

        if self.reparented && !self.client_gone {
            let root = ctx.conn.root();
            let (x, y) = self.client_geometry.origin();
            ctx.conn.reparent_window(self.client, root, x, y)?;
            ctx.conn.change_save_set(self.client, false)?;
        }
        self.reparented = false;

        self.destroy_decoration_windows(ctx)?;
        self.release_surfaces(ctx)?;
        ctx.directory.unregister(self.client);

        if self.windows.frame != x11rb::NONE {
            ctx.directory.unregister(self.windows.frame);
            ctx.conn.destroy_window(self.windows.frame)?;
            self.windows.frame = x11rb::NONE;
        }
        debug!("Released {:#x}", self.client);
        Ok(())
    }

    pub fn id(&self) -> ClientId {
        self.id
    }

    pub fn client(&self) -> Window {
        self.client
    }

    pub fn frame(&self) -> Window {
        self.windows.frame
    }

    pub fn windows(&self) -> &FrameWindows {
        &self.windows
    }

    pub fn frame_geometry(&self) -> Geometry {
        self.frame_geometry
    }

    pub fn client_geometry(&self) -> Geometry {
        self.client_geometry
    }

    pub fn decorations(&self) -> Decorations {
        self.metrics.decorations
    }

    pub fn has_decoration(&self, flag: Decorations) -> bool {
        self.metrics.has(flag)
    }

    pub fn functions(&self) -> Functions {
        self.functions
    }

    pub fn focus_mode(&self) -> FocusMode {
        self.focus_mode
    }

    pub fn size_hints(&self) -> &SizeHints {
        &self.size_hints
    }

    pub fn lifecycle(&self) -> LifecycleState {
        self.lifecycle
    }

    pub fn interaction(&self) -> &Interaction {
        &self.interaction
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn is_focused(&self) -> bool {
        self.focused
    }

    pub fn is_shaded(&self) -> bool {
        self.shaded
    }

    pub fn is_maximized(&self) -> bool {
        self.maximized
    }

    pub fn is_stuck(&self) -> bool {
        self.stuck
    }

    pub fn is_urgent(&self) -> bool {
        self.urgent
    }

    pub fn is_transient(&self) -> bool {
        self.transient
    }

    pub fn transient_owner(&self) -> Option<ClientId> {
        self.transient_owner
    }

    pub fn transient_child(&self) -> Option<ClientId> {
        self.transient_child
    }

    pub fn workspace(&self) -> usize {
        self.workspace
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn live_surfaces(&self) -> usize {
        self.surfaces.live()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_protocol_list() {
        let protocols = ClientProtocols::from_list(&[Protocol::TakeFocus, Protocol::Delete]);
        assert!(protocols.delete && protocols.take_focus);
        assert!(!protocols.window_state && !protocols.colormap);
        assert_eq!(ClientProtocols::from_list(&[]), ClientProtocols::default());
    }
}

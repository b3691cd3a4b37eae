//! Events Module
//!
//! Backend-neutral event payloads and the per-event entry points of a
//! managed window. The x11 backend translates protocol events into
//! [`WmEvent`]; the [`WindowManager`](crate::wm::WindowManager) routes them.

use tracing::{debug, info};

use crate::shared::{Geometry, Size};
use crate::wm::client::ManagedWindow;
use crate::wm::client_flags::{LifecycleState, Modifiers};
use crate::wm::connection::{EventInterest, HintProperty, Window, WindowChanges};
use crate::wm::decorations::{ButtonType, Part};
use crate::wm::hints::{MwmHints, SizeHints};
use crate::wm::layout::FRAME_BORDER;
use crate::wm::session::StoredState;
use crate::wm::{Ctx, Followup, WindowResult};

/// Properties whose changes the core reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropertyKind {
    WmHints,
    NormalHints,
    Name,
    IconName,
    Protocols,
    MotifHints,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ButtonEvent {
    pub window: Window,
    pub button: u8,
    /// Position relative to `window`.
    pub x: i32,
    pub y: i32,
    pub root_x: i32,
    pub root_y: i32,
    pub state: Modifiers,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MotionEvent {
    pub window: Window,
    pub x: i32,
    pub y: i32,
    pub root_x: i32,
    pub root_y: i32,
    pub state: Modifiers,
}

/// Window manager event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WmEvent {
    MapRequest { window: Window },
    MapNotify { window: Window, override_redirect: bool },
    UnmapNotify { window: Window },
    DestroyNotify { window: Window },
    ConfigureRequest { window: Window, changes: WindowChanges },
    PropertyNotify { window: Window, property: PropertyKind },
    ButtonPress(ButtonEvent),
    ButtonRelease(ButtonEvent),
    Motion(MotionEvent),
    Expose { window: Window },
    ShapeNotify { window: Window, shaped: bool },
    FocusIn { window: Window },
    FocusOut { window: Window },
    /// The pointer grab held on `window` ended without a button release.
    GrabLost { window: Window },
}

impl WmEvent {
    /// The window the event is about.
    pub fn window(&self) -> Window {
        match *self {
            WmEvent::MapRequest { window }
            | WmEvent::MapNotify { window, .. }
            | WmEvent::UnmapNotify { window }
            | WmEvent::DestroyNotify { window }
            | WmEvent::ConfigureRequest { window, .. }
            | WmEvent::PropertyNotify { window, .. }
            | WmEvent::Expose { window }
            | WmEvent::ShapeNotify { window, .. }
            | WmEvent::FocusIn { window }
            | WmEvent::FocusOut { window }
            | WmEvent::GrabLost { window } => window,
            WmEvent::ButtonPress(event) | WmEvent::ButtonRelease(event) => event.window,
            WmEvent::Motion(event) => event.window,
        }
    }
}

impl ManagedWindow {
    /// Which part of this window `window` is.
    pub fn part_of(&self, window: Window) -> Option<Part> {
        if window == self.client {
            Some(Part::Client)
        } else {
            self.windows.part(window)
        }
    }

    /// The client asked to be mapped.
    ///
    /// A client carrying an initial-state hint gets that state, or at
    /// startup the state a previous manager stored. A stored workspace other
    /// than the current one moves the window there, withdrawn.
    pub fn map_request(&mut self, ctx: &mut Ctx<'_>) -> WindowResult<()> {
        let hinted = self.wm_hints.and_then(|hints| hints.initial_state);
        let Some(initial) = hinted.filter(|_| self.lifecycle != LifecycleState::Iconic) else {
            return self.deiconify(ctx);
        };
        ctx.validate(self.client)?;

        let words = ctx.conn.property_words(self.client, HintProperty::WmState)?;
        let stored = words.as_deref().and_then(StoredState::from_words);
        let mut state = stored
            .and_then(|stored| stored.restorable())
            .filter(|_| ctx.host.starting_up())
            .unwrap_or(initial);

        let target = stored
            .and_then(|stored| stored.workspace)
            .map_or(self.workspace, |workspace| workspace as usize);
        if target != ctx.host.current_workspace()
            && target < ctx.host.workspace_count()
            && !(self.stuck && target == 0)
        {
            ctx.host.leave(self.id);
            self.workspace = ctx.host.join(target, self.id, self.windows.frame);
            state = LifecycleState::Withdrawn;
            debug!("{:#x} restored onto workspace {}", self.client, self.workspace);
        }

        match state {
            LifecycleState::Iconic => self.iconify(ctx),
            LifecycleState::Withdrawn => self.withdraw(ctx),
            LifecycleState::Normal => self.show(ctx),
        }
    }

    /// Map in Normal state without touching workspace membership.
    fn show(&mut self, ctx: &mut Ctx<'_>) -> WindowResult<()> {
        self.position_buttons(ctx)?;
        ctx.conn.map_window(self.client)?;
        ctx.conn.map_subwindows(self.windows.frame)?;
        ctx.conn.map_window(self.windows.frame)?;
        self.set_focus_flag(ctx, false)?;
        self.visible = true;
        self.lifecycle = LifecycleState::Normal;
        self.persist_state(ctx, LifecycleState::Normal)?;
        Ok(())
    }

    /// The client became viewable. Transients ask for focus.
    pub fn map_notify(&mut self, ctx: &mut Ctx<'_>, override_redirect: bool) -> WindowResult<()> {
        if override_redirect || self.lifecycle == LifecycleState::Iconic || !self.visible {
            return Ok(());
        }
        ctx.validate(self.client)?;

        self.position_buttons(ctx)?;
        self.persist_state(ctx, LifecycleState::Normal)?;
        ctx.conn.map_subwindows(self.windows.frame)?;
        ctx.conn.map_window(self.windows.frame)?;
        if self.transient {
            ctx.followups.push(Followup::Focus(self.id));
        } else {
            self.set_focus_flag(ctx, false)?;
        }
        self.visible = true;
        self.lifecycle = LifecycleState::Normal;
        Ok(())
    }

    /// The client unmapped itself: hand it back to the root and stop
    /// managing it.
    pub fn unmap_notify(&mut self, ctx: &mut Ctx<'_>) -> WindowResult<()> {
        if !self.visible && self.lifecycle != LifecycleState::Iconic {
            return Ok(());
        }
        ctx.validate(self.client)?;

        self.visible = false;
        self.lifecycle = LifecycleState::Withdrawn;
        ctx.conn.unmap_window(self.windows.frame)?;
        self.persist_state(ctx, LifecycleState::Withdrawn)?;

        if !ctx.conn.pending_reparent(self.client)? {
            let root = ctx.conn.root();
            let (x, y) = self.client_geometry.origin();
            ctx.conn.reparent_window(self.client, root, x, y)?;
        }
        ctx.conn.change_save_set(self.client, false)?;
        ctx.conn.select_input(self.client, EventInterest::Nothing)?;
        self.reparented = false;

        info!("{:#x} withdrew itself", self.client);
        ctx.followups.push(Followup::Release(self.id));
        Ok(())
    }

    /// The client window is gone.
    pub fn destroy_notify(&mut self, ctx: &mut Ctx<'_>) -> WindowResult<()> {
        ctx.conn.unmap_window(self.windows.frame)?;
        self.client_gone = true;
        info!("{:#x} destroyed", self.client);
        ctx.followups.push(Followup::Release(self.id));
        Ok(())
    }

    /// Translate a client configure request into frame geometry. Missing
    /// fields keep their current value; the client size obeys the hints.
    pub fn configure_request(&mut self, ctx: &mut Ctx<'_>, changes: &WindowChanges) -> WindowResult<()> {
        ctx.validate(self.client)?;

        let (dx, dy) = self.metrics.client_offset();
        let border = FRAME_BORDER as i32;
        let frame = self.frame_geometry;
        let x = changes.x.map_or(frame.x, |x| x - border - dx);
        let y = changes.y.map_or(frame.y, |y| y - border - dy);

        let wanted = Size::new(
            changes.width.unwrap_or(self.client_geometry.width),
            changes.height.unwrap_or(self.client_geometry.height),
        );
        let client = self.size_hints.constrain(wanted.width, wanted.height).size;
        let size = self.metrics.frame_size(client);
        self.configure_frame(ctx, Geometry::new(x, y, size.width, size.height))
    }

    /// Re-read the property that changed.
    pub fn property_notify(&mut self, ctx: &mut Ctx<'_>, property: PropertyKind) -> WindowResult<()> {
        ctx.validate(self.client)?;

        match property {
            PropertyKind::WmHints => {
                let was_urgent = self.urgent;
                self.read_wm_hints(ctx)?;
                if self.urgent != was_urgent {
                    info!("{:#x} urgency: {}", self.client, self.urgent);
                }
            }
            PropertyKind::NormalHints => {
                let words = ctx.conn.property_words(self.client, HintProperty::NormalHints)?;
                self.size_hints = SizeHints::from_words(words.as_deref(), ctx.host.screen_size());
                self.renegotiate(ctx)?;
            }
            PropertyKind::Protocols => {
                self.read_protocols(ctx)?;
                self.renegotiate(ctx)?;
            }
            PropertyKind::MotifHints => {
                let words = ctx.conn.property_words(self.client, HintProperty::MotifHints)?;
                self.mwm_hints = MwmHints::from_words(words.as_deref());
                self.renegotiate(ctx)?;
            }
            PropertyKind::Name => {
                self.read_title(ctx)?;
                if let Some(title) = self.windows.title {
                    ctx.conn.clear_window(title)?;
                }
                self.draw_title(ctx)?;
                ctx.host.window_renamed(self.id, &self.title);
            }
            PropertyKind::IconName => {
                if self.iconified {
                    let label = self.icon_label(ctx)?;
                    ctx.host.relabel_icon(self.id, &label);
                }
            }
            PropertyKind::Other => {}
        }
        Ok(())
    }

    fn renegotiate(&mut self, ctx: &mut Ctx<'_>) -> WindowResult<()> {
        let (decorations, functions) = self.negotiate();
        self.apply_capabilities(ctx, decorations, functions)
    }

    /// Button 1 focuses and raises (or presses a title button), button 2
    /// lowers.
    pub fn button_press(&mut self, ctx: &mut Ctx<'_>, part: Part, event: &ButtonEvent) -> WindowResult<()> {
        ctx.validate(self.client)?;
        let frame_part = matches!(part, Part::Title | Part::Border | Part::Handle | Part::Grip);
        match event.button {
            1 => {
                if !self.focused {
                    ctx.followups.push(Followup::Focus(self.id));
                }
                if frame_part {
                    let order = ctx.host.raise(self.id);
                    ctx.conn.restack(&order)?;
                } else if let Part::Button(button) = part {
                    self.draw_button(ctx, button, true)?;
                }
            }
            2 if frame_part => {
                let order = ctx.host.lower(self.id);
                ctx.conn.restack(&order)?;
            }
            _ => {}
        }
        Ok(())
    }

    /// Finish a drag, shade on control-click, or run a title button whose
    /// release landed inside it.
    pub fn button_release(&mut self, ctx: &mut Ctx<'_>, part: Part, event: &ButtonEvent) -> WindowResult<()> {
        if event.button != 1 || self.finish_interaction(ctx)? {
            return Ok(());
        }

        match part {
            part if part.is_grabbable() => {
                if event.state.contains(Modifiers::CONTROL) {
                    self.toggle_shade(ctx)?;
                }
            }
            Part::Button(button) => {
                self.draw_button(ctx, button, false)?;
                let size = self.metrics.button_size as i32;
                let inside = (0..=size).contains(&event.x) && (0..=size).contains(&event.y);
                if inside {
                    match button {
                        ButtonType::Iconify => self.iconify(ctx)?,
                        ButtonType::Maximize => self.toggle_maximize(ctx)?,
                        ButtonType::Close => self.close(ctx)?,
                    }
                }
            }
            _ => {}
        }
        Ok(())
    }

    pub fn expose(&mut self, ctx: &mut Ctx<'_>, part: Part) -> WindowResult<()> {
        match part {
            Part::Title => self.draw_title(ctx)?,
            Part::Button(button) => self.draw_button(ctx, button, false)?,
            _ => {}
        }
        Ok(())
    }

    pub fn shape_notify(&mut self, ctx: &mut Ctx<'_>, shaped: bool) -> WindowResult<()> {
        ctx.validate(self.client)?;
        self.shaped = shaped;
        self.apply_shape(ctx)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wm::client_flags::{Decorations, Functions};
    use crate::wm::testing::{Call, Harness};

    #[test]
    fn test_simple_map_scenario() {
        let mut harness = Harness::new();
        let client = harness.map_client(400, 300);
        let window = harness.window(client);
        let style = harness.style();

        assert_eq!(window.lifecycle(), LifecycleState::Normal);
        assert!(window.is_visible());
        assert_eq!(window.metrics.title_height, style.font.height() + 2 * style.bevel_width);
        assert_eq!(
            window.frame_geometry().width,
            400 + 2 * style.bevel_width + style.handle_width + 1
        );
        assert_eq!(window.client_geometry().size(), Size::new(400, 300));
        assert!(harness.server().calls.contains(&Call::MapWindow(client.window())));
    }

    #[test]
    fn test_fixed_size_scenario() {
        let mut harness = Harness::new();
        harness.server().fixed_size(400, 300);
        let client = harness.map_client(400, 300);
        let window = harness.window(client);

        assert!(!window.has_decoration(Decorations::MAXIMIZE));
        assert!(!window.has_decoration(Decorations::HANDLE));
        assert!(!window.functions().contains(Functions::RESIZE));
        assert!(window.windows().grip.is_none() && window.windows().handle.is_none());
    }

    #[test]
    fn test_unmap_releases_window() {
        let mut harness = Harness::new();
        let client = harness.map_client(400, 300);
        let frame = harness.window(client).frame();

        let root = harness.root();
        harness.event(WmEvent::UnmapNotify { window: client.window() });

        assert!(!harness.is_managed(client));
        let calls = &harness.server().calls;
        assert!(calls.contains(&Call::DestroyWindow(frame)));
        assert!(calls.contains(&Call::Reparent(client.window(), root)));
        assert_eq!(harness.last_state(client).map(|record| record.state), Some(LifecycleState::Withdrawn));
        assert_eq!(harness.live_pixmaps(), 0);
        assert!(harness.directory_is_empty());
    }

    #[test]
    fn test_unmap_while_withdrawn_is_ignored() {
        let mut harness = Harness::new();
        let client = harness.map_client(400, 300);
        harness.with_window(client, |window, ctx| window.withdraw(ctx));

        harness.event(WmEvent::UnmapNotify { window: client.window() });
        assert!(harness.is_managed(client));
    }

    #[test]
    fn test_destroy_skips_reparent() {
        let mut harness = Harness::new();
        let client = harness.map_client(400, 300);
        let root = harness.root();

        harness.event(WmEvent::DestroyNotify { window: client.window() });

        assert!(!harness.is_managed(client));
        assert!(!harness.server().calls.contains(&Call::Reparent(client.window(), root)));
    }

    #[test]
    fn test_configure_request_keeps_client_position() {
        let mut harness = Harness::new();
        let client = harness.map_client(400, 300);
        let changes = WindowChanges {
            x: Some(100),
            y: Some(120),
            width: Some(333),
            ..WindowChanges::default()
        };

        harness.event(WmEvent::ConfigureRequest { window: client.window(), changes });

        let geometry = harness.window(client).client_geometry();
        assert_eq!((geometry.x, geometry.y), (100, 120));
        assert_eq!(geometry.size(), Size::new(333, 300));
    }

    #[test]
    fn test_delete_protocol_adds_close_button() {
        let mut harness = Harness::new();
        let client = harness.map_client(400, 300);
        assert!(harness.window(client).windows().close_button.is_none());

        harness.server().delete_protocol(client.window());
        harness.event(WmEvent::PropertyNotify {
            window: client.window(),
            property: PropertyKind::Protocols,
        });

        let window = harness.window(client);
        assert!(window.has_decoration(Decorations::CLOSE));
        assert!(window.functions().contains(Functions::CLOSE));
        assert!(window.windows().close_button.is_some());
    }

    #[test]
    fn test_close_button_without_protocol_does_nothing() {
        let mut harness = Harness::new();
        let client = harness.map_client(400, 300);
        harness.with_window(client, |window, ctx| window.close(ctx));
        assert!(!harness.server().calls.iter().any(|call| matches!(call, Call::DeleteRequest(_))));
        assert!(harness.is_managed(client));
    }

    #[test]
    fn test_name_change_updates_title() {
        let mut harness = Harness::new();
        let client = harness.map_client(400, 300);
        assert_eq!(harness.window(client).title(), "Unnamed");

        harness.server().names.insert(client.window(), "xterm".to_string());
        harness.event(WmEvent::PropertyNotify { window: client.window(), property: PropertyKind::Name });
        assert_eq!(harness.window(client).title(), "xterm");
    }

    #[test]
    fn test_urgency_is_tracked() {
        let mut harness = Harness::new();
        let client = harness.map_client(400, 300);
        assert!(!harness.window(client).is_urgent());

        harness.server().urgent(client.window());
        harness.event(WmEvent::PropertyNotify { window: client.window(), property: PropertyKind::WmHints });
        assert!(harness.window(client).is_urgent());
    }

    #[test]
    fn test_control_click_shades() {
        let mut harness = Harness::new();
        let client = harness.map_client(400, 300);
        let title = harness.window(client).windows().title.unwrap();

        harness.release(title, 1, Modifiers::CONTROL);
        assert!(harness.window(client).is_shaded());
        harness.release(title, 1, Modifiers::CONTROL);
        assert!(!harness.window(client).is_shaded());
    }

    #[test]
    fn test_iconify_button_release_inside() {
        let mut harness = Harness::new();
        let client = harness.map_client(400, 300);
        let button = harness.window(client).windows().iconify_button.unwrap();

        harness.release(button, 1, Modifiers::empty());
        assert_eq!(harness.window(client).lifecycle(), LifecycleState::Iconic);
    }

    #[test]
    fn test_stored_state_restores_iconic_at_startup() {
        let mut harness = Harness::starting_up();
        let window = harness.server().next_client(200, 100);
        harness.server().initial_state(window, LifecycleState::Normal);
        harness.server().stored_state(window, &[3, 0, 0]);

        harness.event(WmEvent::MapRequest { window });
        let client = crate::wm::directory::ClientId(window);
        assert_eq!(harness.window(client).lifecycle(), LifecycleState::Iconic);
    }

    #[test]
    fn test_stored_workspace_moves_and_withdraws() {
        let mut harness = Harness::new();
        let window = harness.server().next_client(200, 100);
        harness.server().initial_state(window, LifecycleState::Normal);
        harness.server().stored_state(window, &[1, 0, 2]);

        harness.event(WmEvent::MapRequest { window });
        let client = crate::wm::directory::ClientId(window);
        assert_eq!(harness.window(client).lifecycle(), LifecycleState::Withdrawn);
        assert_eq!(harness.window(client).workspace(), 2);
    }
}

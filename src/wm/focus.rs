//! Focus Module
//!
//! Input focus requests, the focus flag that selects focused or unfocused
//! decoration surfaces, and client colormap installation.

use anyhow::Result;
use tracing::debug;

use crate::shared::Geometry;
use crate::wm::client::ManagedWindow;
use crate::wm::client_flags::FocusMode;
use crate::wm::directory::ClientId;
use crate::wm::{Ctx, WindowResult};

/// Result of asking a window to take focus.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusOutcome {
    /// Whether the server granted focus to this window.
    Granted(bool),
    /// The request belongs to this window's transient owner.
    Delegate(ClientId),
}

impl ManagedWindow {
    /// Ask for keyboard focus.
    ///
    /// A frame that sits entirely off screen is pulled back first. Windows
    /// that take focus themselves only get their title redrawn; transients
    /// hand the request to their owner.
    pub fn request_focus(&mut self, ctx: &mut Ctx<'_>) -> WindowResult<FocusOutcome> {
        ctx.validate(self.client)?;

        if let Some(target) = self.on_screen_position(ctx) {
            self.configure_frame(ctx, target)?;
        }

        match self.focus_mode {
            FocusMode::NoInput | FocusMode::GloballyActive => {
                self.draw_title(ctx)?;
                Ok(FocusOutcome::Granted(false))
            }
            FocusMode::Passive | FocusMode::LocallyActive => {
                if let Some(owner) = self.transient_owner {
                    return Ok(FocusOutcome::Delegate(owner));
                }
                if self.focused {
                    return Ok(FocusOutcome::Granted(true));
                }
                let granted = ctx.conn.set_input_focus(self.client)?;
                debug!("Focus request for {:#x} granted: {}", self.client, granted);
                Ok(FocusOutcome::Granted(granted))
            }
        }
    }

    /// Frame geometry that brings a fully off-screen frame back into view.
    fn on_screen_position(&self, ctx: &Ctx<'_>) -> Option<Geometry> {
        let screen = ctx.host.screen_size();
        let frame = self.frame_geometry;
        let height = if self.shaded { self.metrics.title_height } else { frame.height };
        let (sw, sh) = (screen.width as i32, screen.height as i32);

        let mut x = frame.x;
        let mut y = frame.y;
        if frame.x > sw {
            x = sw - frame.width as i32;
        } else if frame.x + (frame.width as i32) < 0 {
            x = 0;
        }
        if frame.y > sh {
            y = sh - height as i32;
        } else if frame.y + (height as i32) < 0 {
            y = 0;
        }

        ((x, y) != frame.origin()).then(|| Geometry::new(x, y, frame.width, frame.height))
    }

    /// Record focus and repaint decorations to match.
    pub fn set_focus_flag(&mut self, ctx: &mut Ctx<'_>, focused: bool) -> Result<()> {
        self.focused = focused;
        self.paint_decorations(ctx)
    }

    /// The server moved focus to this client.
    pub fn focus_in(&mut self, ctx: &mut Ctx<'_>) -> WindowResult<()> {
        ctx.validate(self.client)?;
        self.set_focus_flag(ctx, true)?;
        self.install_colormap(ctx, true)?;
        Ok(())
    }

    /// Focus left this client.
    pub fn focus_out(&mut self, ctx: &mut Ctx<'_>) -> WindowResult<()> {
        ctx.validate(self.client)?;
        self.set_focus_flag(ctx, false)?;
        self.install_colormap(ctx, false)?;
        Ok(())
    }

    /// Install the client colormap, or remove it when it is installed and
    /// the client lost focus.
    fn install_colormap(&mut self, ctx: &mut Ctx<'_>, install: bool) -> Result<()> {
        let Some(colormap) = ctx.conn.client_colormap(self.client)? else {
            return Ok(());
        };
        let installed = ctx.conn.installed_colormaps(self.client)?.contains(&colormap);
        match (install, installed) {
            (true, false) => ctx.conn.install_colormap(colormap),
            (false, true) => ctx.conn.uninstall_colormap(colormap),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::wm::testing::{Call, Harness};

    #[test]
    fn test_passive_window_takes_focus() {
        let mut harness = Harness::new();
        let client = harness.map_client(300, 200);
        assert!(harness.focus(client));
        assert!(harness.server().calls.contains(&Call::SetInputFocus(client.window())));
    }

    #[test]
    fn test_transient_delegates_to_owner() {
        let mut harness = Harness::new();
        let owner = harness.map_client(300, 200);
        harness.server().next_transient_for = Some(owner.window());
        let dialog = harness.map_client(100, 80);

        assert!(harness.focus(dialog));
        let focused: Vec<_> = harness
            .server()
            .calls
            .iter()
            .filter_map(|call| match call {
                Call::SetInputFocus(window) => Some(*window),
                _ => None,
            })
            .collect();
        assert_eq!(focused, vec![owner.window()]);
    }

    #[test]
    fn test_no_input_window_is_not_focused() {
        let mut harness = Harness::new();
        harness.server().wm_hints_input(false);
        let client = harness.map_client(300, 200);
        assert!(!harness.focus(client));
        assert!(!harness
            .server()
            .calls
            .iter()
            .any(|call| matches!(call, Call::SetInputFocus(_))));
    }

    #[test]
    fn test_off_screen_frame_is_pulled_back() {
        let mut harness = Harness::new();
        let client = harness.map_client(300, 200);
        harness.move_frame(client, 5000, 50);
        harness.focus(client);
        let frame = harness.window(client).frame_geometry();
        assert_eq!(frame.x, 1280 - frame.width as i32);
        assert_eq!(frame.y, 50);
    }

    #[test]
    fn test_frame_moved_past_top_left_snaps_to_origin() {
        let mut harness = Harness::new();
        let client = harness.map_client(300, 200);
        harness.move_frame(client, -5000, -4000);
        harness.focus(client);
        let frame = harness.window(client).frame_geometry();
        assert_eq!(frame.origin(), (0, 0));

        harness.move_frame(client, -100, -20);
        assert_eq!(harness.window(client).frame_geometry().origin(), (-100, -20));
    }
}

//! Lifecycle Module
//!
//! Normal / Iconic / Withdrawn transitions plus the user-level state
//! toggles (close, maximize, shade, stick). Every transition persists the
//! workspace-tagged state record on the client.

use tracing::{debug, info};

use crate::shared::Geometry;
use crate::wm::client::ManagedWindow;
use crate::wm::client_flags::{Decorations, LifecycleState};
use crate::wm::connection::WindowChanges;
use crate::wm::Followup;
use crate::wm::{Ctx, WindowResult};

impl ManagedWindow {
    /// Hide the window behind an icon. A transient hands the request to its
    /// owner instead of getting an icon of its own.
    pub fn iconify(&mut self, ctx: &mut Ctx<'_>) -> WindowResult<()> {
        ctx.validate(self.client)?;

        ctx.conn.unmap_window(self.windows.frame)?;
        self.visible = false;
        self.focused = false;
        self.lifecycle = LifecycleState::Iconic;

        match self.transient_owner {
            Some(owner) => {
                if ctx.peers.lifecycle(owner) != Some(LifecycleState::Iconic) {
                    ctx.followups.push(Followup::Iconify(owner));
                }
            }
            None if !self.iconified => {
                let label = self.icon_label(ctx)?;
                ctx.host.add_icon(self.id, &label);
                self.iconified = true;
            }
            None => {}
        }
        if let Some(child) = self.transient_child {
            ctx.followups.push(Followup::Iconify(child));
        }

        self.persist_state(ctx, LifecycleState::Iconic)?;
        info!("Iconified {:#x}", self.client);
        Ok(())
    }

    /// Show the window on its workspace again.
    pub fn deiconify(&mut self, ctx: &mut Ctx<'_>) -> WindowResult<()> {
        ctx.validate(self.client)?;

        self.workspace = ctx.host.reassociate(self.id, self.workspace, self.stuck);
        self.position_buttons(ctx)?;
        ctx.conn.map_window(self.client)?;
        ctx.conn.map_subwindows(self.windows.frame)?;
        ctx.conn.map_window(self.windows.frame)?;

        self.visible = true;
        self.lifecycle = LifecycleState::Normal;

        if let Some(child) = self.transient_child {
            ctx.followups.push(Followup::Deiconify(child));
        }

        self.persist_state(ctx, LifecycleState::Normal)?;
        if self.iconified {
            ctx.host.remove_icon(self.id);
            self.iconified = false;
        }
        info!("Deiconified {:#x} on workspace {}", self.client, self.workspace);
        Ok(())
    }

    /// Take the window off screen without an icon.
    ///
    /// The persisted record says Normal so a restarted manager maps the
    /// window again.
    pub fn withdraw(&mut self, ctx: &mut Ctx<'_>) -> WindowResult<()> {
        ctx.validate(self.client)?;

        self.focused = false;
        self.visible = false;
        self.lifecycle = LifecycleState::Withdrawn;
        ctx.conn.unmap_window(self.windows.frame)?;
        self.persist_state(ctx, LifecycleState::Normal)?;
        debug!("Withdrew {:#x}", self.client);
        Ok(())
    }

    /// Ask the client to close. Clients without the delete protocol are
    /// left alone.
    pub fn close(&mut self, ctx: &mut Ctx<'_>) -> WindowResult<()> {
        if !self.protocols.delete {
            debug!("{:#x} does not take delete requests", self.client);
            return Ok(());
        }
        ctx.validate(self.client)?;
        ctx.conn.send_delete_request(self.client)?;
        Ok(())
    }

    /// Toggle between the largest size the hints allow, centred on the
    /// screen above the reserved area, and the geometry saved before.
    pub fn toggle_maximize(&mut self, ctx: &mut Ctx<'_>) -> WindowResult<()> {
        ctx.validate(self.client)?;

        if self.maximized {
            self.maximized = false;
            let restore = self.saved_geometry.take().unwrap_or(self.frame_geometry);
            self.configure_frame(ctx, restore)?;
            self.draw_all_buttons(ctx)?;
            return Ok(());
        }

        let screen = ctx.host.screen_size();
        let usable_height = screen.height.saturating_sub(ctx.host.reserved_height());
        let wanted = self.size_hints.constrain(
            screen.width.saturating_sub(self.metrics.extra_width()),
            usable_height.saturating_sub(self.metrics.extra_height()),
        );
        let frame = self.metrics.frame_size(wanted.size);
        let x = (screen.width as i32 - frame.width as i32) / 2 - 1;
        let y = (usable_height as i32 - frame.height as i32) / 2;

        self.saved_geometry = Some(self.frame_geometry);
        self.maximized = true;
        let was_shaded = std::mem::replace(&mut self.shaded, false);
        self.configure_frame(ctx, Geometry::new(x, y, frame.width, frame.height))?;
        if was_shaded {
            self.refresh_frame(ctx)?;
        }
        let order = ctx.host.raise(self.id);
        ctx.conn.restack(&order)?;
        self.draw_all_buttons(ctx)?;
        info!("Maximized {:#x} to {}x{}", self.client, wanted.size.width, wanted.size.height);
        Ok(())
    }

    /// Roll the frame up to its title bar, or back down.
    pub fn toggle_shade(&mut self, ctx: &mut Ctx<'_>) -> WindowResult<()> {
        if !self.metrics.has(Decorations::TITLEBAR) {
            return Ok(());
        }
        ctx.validate(self.client)?;

        self.shaded = !self.shaded;
        let height = if self.shaded {
            self.metrics.title_height
        } else {
            self.frame_geometry.height
        };
        ctx.conn.configure_window(
            self.windows.frame,
            &WindowChanges::size(self.frame_geometry.width, height),
        )?;
        debug!("{:#x} shaded: {}", self.client, self.shaded);
        Ok(())
    }

    /// Toggle whether the window ignores workspace switches. The transient
    /// child follows.
    pub fn toggle_stick(&mut self, ctx: &mut Ctx<'_>) -> WindowResult<()> {
        ctx.validate(self.client)?;

        self.stuck = !self.stuck;
        ctx.host.set_sticky(self.id, self.stuck);
        if let Some(child) = self.transient_child {
            ctx.followups.push(Followup::Stick(child, self.stuck));
        }
        debug!("{:#x} stuck: {}", self.client, self.stuck);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wm::testing::{Call, Harness};

    #[test]
    fn test_iconify_adds_icon_and_persists() {
        let mut harness = Harness::new();
        let client = harness.map_client(400, 300);
        let workspace = harness.window(client).workspace() as u32;

        harness.with_window(client, |window, ctx| window.iconify(ctx));
        let window = harness.window(client);
        assert_eq!(window.lifecycle(), LifecycleState::Iconic);
        assert!(!window.is_visible());
        assert!(harness.host().icons().any(|(id, _)| id == client));
        assert_eq!(harness.last_state(client).map(|record| record.state), Some(LifecycleState::Iconic));
        assert_eq!(harness.last_state(client).map(|record| record.workspace), Some(workspace));

        harness.with_window(client, |window, ctx| window.deiconify(ctx));
        assert_eq!(harness.window(client).lifecycle(), LifecycleState::Normal);
        assert!(harness.host().icons().next().is_none());
        assert_eq!(harness.last_state(client).map(|record| record.state), Some(LifecycleState::Normal));
        assert_eq!(harness.last_state(client).map(|record| record.workspace), Some(workspace));
    }

    #[test]
    fn test_iconify_carries_transient_child() {
        let mut harness = Harness::new();
        let owner = harness.map_client(400, 300);
        harness.server().next_transient_for = Some(owner.window());
        let child = harness.map_client(200, 100);
        assert_eq!(harness.window(child).transient_owner(), Some(owner));
        assert_eq!(harness.window(owner).transient_child(), Some(child));

        harness.with_window(owner, |window, ctx| window.iconify(ctx));
        assert_eq!(harness.window(child).lifecycle(), LifecycleState::Iconic);
        let icons: Vec<crate::wm::ClientId> = harness.host().icons().map(|(id, _)| id).collect();
        assert_eq!(icons, vec![owner]);

        harness.with_window(owner, |window, ctx| window.deiconify(ctx));
        assert_eq!(harness.window(child).lifecycle(), LifecycleState::Normal);
    }

    #[test]
    fn test_withdraw_persists_normal() {
        let mut harness = Harness::new();
        let client = harness.map_client(400, 300);

        harness.with_window(client, |window, ctx| window.withdraw(ctx));
        assert_eq!(harness.window(client).lifecycle(), LifecycleState::Withdrawn);
        assert_eq!(harness.last_state(client).map(|record| record.state), Some(LifecycleState::Normal));
    }

    #[test]
    fn test_maximize_round_trip_restores_geometry() {
        let mut harness = Harness::new();
        let client = harness.map_client(400, 300);
        let before = harness.window(client).frame_geometry();

        harness.with_window(client, |window, ctx| window.toggle_maximize(ctx));
        let maximized = harness.window(client).frame_geometry();
        assert!(harness.window(client).is_maximized());
        assert!(maximized.width > before.width && maximized.width <= 1280);
        assert!(maximized.height > before.height && maximized.height <= 1024);

        harness.with_window(client, |window, ctx| window.toggle_maximize(ctx));
        assert!(!harness.window(client).is_maximized());
        assert_eq!(harness.window(client).frame_geometry(), before);
    }

    #[test]
    fn test_shade_rolls_frame_to_title() {
        let mut harness = Harness::new();
        let client = harness.map_client(400, 300);
        let (frame, width, title) = {
            let window = harness.window(client);
            (window.frame(), window.frame_geometry().width, window.metrics.title_height)
        };

        harness.with_window(client, |window, ctx| window.toggle_shade(ctx));
        assert!(harness.window(client).is_shaded());
        assert!(harness
            .server()
            .calls
            .contains(&Call::Configure(frame, WindowChanges::size(width, title))));
    }

    #[test]
    fn test_stick_follows_to_transient_child() {
        let mut harness = Harness::new();
        let owner = harness.map_client(400, 300);
        harness.server().next_transient_for = Some(owner.window());
        let child = harness.map_client(200, 100);

        harness.with_window(owner, |window, ctx| window.toggle_stick(ctx));
        assert!(harness.window(owner).is_stuck());
        assert!(harness.window(child).is_stuck());
        assert!(harness.host().is_sticky(child));
    }

    #[test]
    fn test_close_sends_delete_when_supported() {
        let mut harness = Harness::new();
        let window = harness.server().next_client(300, 200);
        harness.server().delete_protocol(window);
        harness.event(crate::wm::WmEvent::MapRequest { window });
        let client = crate::wm::ClientId(window);

        harness.with_window(client, |window, ctx| window.close(ctx));
        assert!(harness.server().calls.contains(&Call::DeleteRequest(window)));
    }
}

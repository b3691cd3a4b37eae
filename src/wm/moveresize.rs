//! MoveResize Module
//!
//! Interactive move and resize driven by pointer motion on the decoration
//! windows. Both operations hold a pointer grab for their whole duration.
//! In outline mode the candidate geometry is xor-drawn on the root window
//! and committed on release; opaque moves commit on every motion sample.

use anyhow::Result;
use tracing::debug;

use crate::shared::{Geometry, Size};
use crate::wm::client::ManagedWindow;
use crate::wm::client_flags::{Functions, Modifiers};
use crate::wm::connection::PointerCursor;
use crate::wm::decorations::Part;
use crate::wm::events::MotionEvent;
use crate::wm::layout::FRAME_BORDER;
use crate::wm::{Ctx, WindowResult};

/// Move operation state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MoveState {
    /// Pointer offset from the frame interior origin at grab time.
    pub grab: (i32, i32),
    /// Frame origin when the move started.
    pub start: (i32, i32),
    /// Current candidate frame origin.
    pub origin: (i32, i32),
}

/// Resize operation state
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResizeState {
    /// Candidate frame size, already snapped to the size hints.
    pub frame: Size,
    /// "W x H" in resize units.
    pub label: String,
    pub label_width: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Interaction {
    #[default]
    Idle,
    Moving(MoveState),
    Resizing(ResizeState),
}

impl Interaction {
    pub fn is_idle(&self) -> bool {
        matches!(self, Interaction::Idle)
    }
}

impl ManagedWindow {
    /// Handle pointer motion over one of the decoration windows.
    pub fn pointer_motion(&mut self, ctx: &mut Ctx<'_>, part: Part, event: &MotionEvent) -> WindowResult<()> {
        let dragging = event.state.contains(Modifiers::BUTTON1);
        match self.interaction.clone() {
            Interaction::Idle if dragging && part.is_grabbable() && self.functions.contains(Functions::MOVE) => {
                self.begin_move(ctx, part, event)
            }
            Interaction::Idle if dragging && part == Part::Grip && self.functions.contains(Functions::RESIZE) => {
                self.begin_resize(ctx, event)
            }
            Interaction::Moving(state) => self.continue_move(ctx, state, event),
            Interaction::Resizing(state) => self.continue_resize(ctx, state, event),
            Interaction::Idle => Ok(()),
        }
    }

    fn begin_move(&mut self, ctx: &mut Ctx<'_>, part: Part, event: &MotionEvent) -> WindowResult<()> {
        ctx.validate(self.client)?;
        if !ctx.conn.grab_pointer(event.window, PointerCursor::Move)? {
            debug!("Pointer grab for moving {:#x} failed", self.client);
            return Ok(());
        }

        let layout = self.metrics.layout(self.client_geometry.size());
        let (sx, sy) = self.windows.origin_of(part, &layout);
        let origin = self.frame_geometry.origin();
        self.interaction = Interaction::Moving(MoveState {
            grab: (event.x + sx, event.y + sy),
            start: origin,
            origin,
        });
        if !ctx.style.opaque_move {
            self.draw_move_outline(ctx, origin)?;
        }
        debug!("Moving {:#x} from {:?}", self.client, origin);
        Ok(())
    }

    fn continue_move(&mut self, ctx: &mut Ctx<'_>, state: MoveState, event: &MotionEvent) -> WindowResult<()> {
        let border = FRAME_BORDER as i32;
        let origin = (event.root_x - state.grab.0 - border, event.root_y - state.grab.1 - border);
        if origin == state.origin {
            return Ok(());
        }

        if ctx.style.opaque_move {
            let frame = self.frame_geometry;
            self.configure_frame(ctx, Geometry::new(origin.0, origin.1, frame.width, frame.height))?;
        } else {
            self.draw_move_outline(ctx, state.origin)?;
            self.draw_move_outline(ctx, origin)?;
        }
        self.interaction = Interaction::Moving(MoveState { origin, ..state });
        Ok(())
    }

    fn begin_resize(&mut self, ctx: &mut Ctx<'_>, event: &MotionEvent) -> WindowResult<()> {
        ctx.validate(self.client)?;
        if !ctx.conn.grab_pointer(event.window, PointerCursor::Default)? {
            debug!("Pointer grab for resizing {:#x} failed", self.client);
            return Ok(());
        }

        let state = self.resize_state(ctx, self.frame_geometry.size())?;
        self.draw_resize_feedback(ctx, &state)?;
        debug!("Resizing {:#x} from {:?}", self.client, state.frame);
        self.interaction = Interaction::Resizing(state);
        Ok(())
    }

    fn continue_resize(&mut self, ctx: &mut Ctx<'_>, state: ResizeState, event: &MotionEvent) -> WindowResult<()> {
        let frame = self.frame_geometry;
        let candidate = Size::new(
            (event.root_x - frame.x).max(1) as u32,
            (event.root_y - frame.y).max(1) as u32,
        );
        let next = self.resize_state(ctx, candidate)?;
        if next == state {
            return Ok(());
        }
        self.draw_resize_feedback(ctx, &state)?;
        self.draw_resize_feedback(ctx, &next)?;
        self.interaction = Interaction::Resizing(next);
        Ok(())
    }

    /// Snap a candidate frame size through the client size hints.
    pub(crate) fn snap_frame(&self, frame: Size) -> (Size, (u32, u32)) {
        let client = self.metrics.client_size(frame);
        let constrained = self.size_hints.constrain(client.width, client.height);
        (self.metrics.frame_size(constrained.size), constrained.units)
    }

    fn resize_state(&self, ctx: &mut Ctx<'_>, candidate: Size) -> Result<ResizeState> {
        let (frame, (w, h)) = self.snap_frame(candidate);
        let label = format!("{} x {}", w, h);
        let label_width = ctx.conn.text_width(&label)? + 2 * self.metrics.bevel;
        Ok(ResizeState { frame, label, label_width })
    }

    /// Commit the operation in progress and drop the grab. Returns whether
    /// an operation was in progress.
    pub(crate) fn finish_interaction(&mut self, ctx: &mut Ctx<'_>) -> WindowResult<bool> {
        self.erase_feedback(ctx)?;
        let frame = self.frame_geometry;
        match std::mem::take(&mut self.interaction) {
            Interaction::Idle => Ok(false),
            Interaction::Moving(state) => {
                ctx.conn.ungrab_pointer()?;
                self.configure_frame(ctx, Geometry::new(state.origin.0, state.origin.1, frame.width, frame.height))?;
                debug!("Moved {:#x} to {:?}", self.client, state.origin);
                Ok(true)
            }
            Interaction::Resizing(state) => {
                ctx.conn.ungrab_pointer()?;
                self.configure_frame(ctx, Geometry::new(frame.x, frame.y, state.frame.width, state.frame.height))?;
                debug!("Resized {:#x} to {}", self.client, state.label);
                Ok(true)
            }
        }
    }

    /// The grab went away under us: drop the operation without committing.
    pub fn grab_lost(&mut self, ctx: &mut Ctx<'_>) -> WindowResult<()> {
        if self.interaction.is_idle() {
            return Ok(());
        }
        self.erase_feedback(ctx)?;
        self.interaction = Interaction::Idle;
        debug!("Pointer grab lost, {:#x} back to idle", self.client);
        Ok(())
    }

    /// Remove whatever outline or label is currently drawn on the root.
    pub(crate) fn erase_feedback(&mut self, ctx: &mut Ctx<'_>) -> Result<()> {
        match self.interaction.clone() {
            Interaction::Moving(state) if !ctx.style.opaque_move => self.draw_move_outline(ctx, state.origin),
            Interaction::Resizing(state) => self.draw_resize_feedback(ctx, &state),
            _ => Ok(()),
        }
    }

    fn draw_move_outline(&self, ctx: &mut Ctx<'_>, (x, y): (i32, i32)) -> Result<()> {
        let frame = self.frame_geometry;
        if self.shaded {
            return ctx.conn.draw_outline(Geometry::new(x, y, frame.width, self.metrics.title_height));
        }
        ctx.conn.draw_outline(Geometry::new(x, y, frame.width, frame.height))?;
        let (cx, cy) = self.metrics.client_offset();
        let border = FRAME_BORDER as i32;
        ctx.conn.draw_outline(Geometry::new(
            x + border + cx,
            y + border + cy,
            self.client_geometry.width,
            self.client_geometry.height,
        ))
    }

    fn draw_resize_feedback(&self, ctx: &mut Ctx<'_>, state: &ResizeState) -> Result<()> {
        let frame = self.frame_geometry;
        let bevel = self.metrics.bevel as i32;
        ctx.conn.draw_outline_text(
            frame.x + state.frame.width as i32 - state.label_width as i32,
            frame.y + state.frame.height as i32 - 2 * bevel,
            &state.label,
        )?;
        ctx.conn
            .draw_outline(Geometry::new(frame.x, frame.y, state.frame.width, state.frame.height))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wm::connection::Window;
    use crate::wm::testing::{Call, Harness};

    fn motion(window: Window, x: i32, y: i32, root_x: i32, root_y: i32) -> MotionEvent {
        MotionEvent {
            window,
            x,
            y,
            root_x,
            root_y,
            state: Modifiers::BUTTON1,
        }
    }

    #[test]
    fn test_outline_move_commits_on_release() {
        let mut harness = Harness::new();
        let client = harness.map_client(400, 300);
        let title = harness.window(client).windows().title.unwrap();
        let start = harness.window(client).frame_geometry();

        harness.motion(motion(title, 10, 5, start.x + 11, start.y + 6));
        assert!(matches!(harness.window(client).interaction(), Interaction::Moving(_)));
        harness.motion(motion(title, 10, 5, start.x + 111, start.y + 56));
        assert_eq!(harness.window(client).frame_geometry(), start);

        harness.release(title, 1, Modifiers::empty());
        assert!(harness.window(client).interaction().is_idle());
        let moved = harness.window(client).frame_geometry();
        assert_eq!((moved.x, moved.y), (start.x + 100, start.y + 50));
        assert_eq!(moved.size(), start.size());
        assert_eq!(harness.outlines_drawn() % 2, 0);
    }

    #[test]
    fn test_failed_grab_stays_idle() {
        let mut harness = Harness::new();
        let client = harness.map_client(400, 300);
        let title = harness.window(client).windows().title.unwrap();
        harness.server().grab_succeeds = false;

        harness.motion(motion(title, 10, 5, 100, 100));
        assert!(harness.window(client).interaction().is_idle());
        assert_eq!(harness.outlines_drawn(), 0);
    }

    #[test]
    fn test_resize_snaps_to_minimum() {
        let mut harness = Harness::new();
        harness.server().normal_hints(50, 50, 10, 10);
        let client = harness.map_client(200, 200);
        let grip = harness.window(client).windows().grip.unwrap();
        let frame = harness.window(client).frame_geometry();
        let metrics = harness.window(client).metrics;
        let tiny = metrics.frame_size(Size::new(5, 5));

        harness.motion(motion(grip, 1, 1, frame.x + 1, frame.y + 1));
        harness.motion(motion(grip, 1, 1, frame.x + tiny.width as i32, frame.y + tiny.height as i32));
        match harness.window(client).interaction() {
            Interaction::Resizing(state) => assert_eq!(state.label, "5 x 5"),
            other => panic!("unexpected {other:?}"),
        }

        harness.release(grip, 1, Modifiers::empty());
        assert_eq!(harness.window(client).client_geometry().size(), Size::new(50, 50));
    }

    #[test]
    fn test_grab_loss_cancels_without_commit() {
        let mut harness = Harness::new();
        let client = harness.map_client(400, 300);
        let grip = harness.window(client).windows().grip.unwrap();
        let frame = harness.window(client).frame_geometry();

        harness.motion(motion(grip, 1, 1, frame.x + 10, frame.y + 10));
        harness.motion(motion(grip, 1, 1, frame.x + 600, frame.y + 500));
        harness.grab_lost(grip);

        assert!(harness.window(client).interaction().is_idle());
        assert_eq!(harness.window(client).frame_geometry(), frame);
        assert_eq!(harness.outlines_drawn() % 2, 0);
        assert!(!harness.server().calls.contains(&Call::Ungrab));
    }
}

//! Layout Module
//!
//! Derives every decoration dimension from the decoration flags, the bevel
//! width, the title font height and the handle width. The frame size and the
//! client size are exact inverses of each other for a fixed set of flags.

use crate::shared::{Geometry, Size};
use crate::wm::client_flags::Decorations;
use crate::wm::style::Style;

/// Width of the X border drawn around every frame.
pub const FRAME_BORDER: u32 = 1;

/// Fixed per-window decoration measurements.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecorationMetrics {
    pub decorations: Decorations,
    pub bevel: u32,
    pub title_height: u32,
    pub button_size: u32,
    pub handle_width: u32,
    pub grip_height: u32,
    /// Vertical offset of everything below the title bar.
    pub y_border: u32,
}

/// Placement of every decoration sub-window, relative to the frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameLayout {
    pub frame: Size,
    pub title: Option<Geometry>,
    pub border: Option<Geometry>,
    pub handle: Option<Geometry>,
    pub grip: Option<Geometry>,
    /// Client rectangle relative to the frame.
    pub client: Geometry,
    /// Client position inside its direct parent (border window or frame).
    pub client_in_parent: (i32, i32),
}

impl DecorationMetrics {
    pub fn new(decorations: Decorations, bevel: u32, font_height: u32, handle_width: u32) -> Self {
        let title_height = if decorations.contains(Decorations::TITLEBAR) {
            font_height + 2 * bevel
        } else {
            0
        };
        let button_size = title_height.saturating_sub(6);
        let has_handle = decorations.contains(Decorations::HANDLE);

        Self {
            decorations,
            bevel,
            title_height,
            button_size,
            handle_width: if has_handle { handle_width } else { 0 },
            grip_height: if has_handle { button_size } else { 0 },
            y_border: if title_height > 0 { title_height + 1 } else { 0 },
        }
    }

    pub fn for_style(decorations: Decorations, style: &Style) -> Self {
        Self::new(decorations, style.bevel_width, style.font.height(), style.handle_width)
    }

    pub fn has(&self, flag: Decorations) -> bool {
        self.decorations.contains(flag)
    }

    /// Horizontal space the decorations add around the client.
    pub fn extra_width(&self) -> u32 {
        let border = if self.has(Decorations::BORDER) { 2 * self.bevel } else { 0 };
        let handle = if self.has(Decorations::HANDLE) { self.handle_width + 1 } else { 0 };
        border + handle
    }

    /// Vertical space the decorations add around the client.
    pub fn extra_height(&self) -> u32 {
        let border = if self.has(Decorations::BORDER) { 2 * self.bevel } else { 0 };
        border + self.y_border
    }

    pub fn frame_size(&self, client: Size) -> Size {
        Size::new(client.width + self.extra_width(), client.height + self.extra_height())
    }

    /// Inverse of [`frame_size`](Self::frame_size). Never yields a zero
    /// dimension.
    pub fn client_size(&self, frame: Size) -> Size {
        Size::new(
            frame.width.saturating_sub(self.extra_width()).max(1),
            frame.height.saturating_sub(self.extra_height()).max(1),
        )
    }

    /// Offset of the client's top-left corner from the frame's interior
    /// origin.
    pub fn client_offset(&self) -> (i32, i32) {
        if self.has(Decorations::BORDER) {
            (self.bevel as i32, (self.y_border + self.bevel) as i32)
        } else {
            (0, self.y_border as i32)
        }
    }

    /// Root-relative client rectangle for a frame at `frame`.
    pub fn client_geometry(&self, frame: Geometry) -> Geometry {
        let (dx, dy) = self.client_offset();
        let size = self.client_size(frame.size());
        Geometry::new(
            frame.x + FRAME_BORDER as i32 + dx,
            frame.y + FRAME_BORDER as i32 + dy,
            size.width,
            size.height,
        )
    }

    pub fn layout(&self, client: Size) -> FrameLayout {
        let bordered = self.has(Decorations::BORDER);
        let frame = self.frame_size(client);
        let y_border = self.y_border as i32;

        let border_w = if bordered { client.width + 2 * self.bevel } else { 0 };
        let border_h = if bordered { client.height + 2 * self.bevel } else { 0 };
        let x_handle = if bordered { border_w + 1 } else { client.width + 1 } as i32;
        let handle_h = if bordered { border_h } else { client.height }
            .saturating_sub(self.grip_height + 1);

        let title = (self.title_height > 0).then(|| Geometry::new(0, 0, frame.width, self.title_height));
        let border = bordered.then(|| Geometry::new(0, y_border, border_w, border_h));
        let (handle, grip) = if self.has(Decorations::HANDLE) {
            (
                Some(Geometry::new(x_handle, y_border, self.handle_width, handle_h)),
                Some(Geometry::new(
                    x_handle,
                    y_border + handle_h as i32 + 1,
                    self.handle_width,
                    self.grip_height,
                )),
            )
        } else {
            (None, None)
        };

        let (cx, cy) = self.client_offset();
        FrameLayout {
            frame,
            title,
            border,
            handle,
            grip,
            client: Geometry::new(cx, cy, client.width, client.height),
            client_in_parent: if bordered {
                (self.bevel as i32, self.bevel as i32)
            } else {
                (0, y_border)
            },
        }
    }
}

//! Placement Module
//!
//! Initial frame placement: keep adopted windows where they are, honour
//! client positions through window gravity, otherwise cascade.

use tracing::debug;

use crate::shared::{Geometry, Size};
use crate::wm::hints::Gravity;
use crate::wm::layout::FRAME_BORDER;

const CASCADE_ORIGIN: i32 = 32;

/// How the initial position should be chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlacementMode {
    /// Adopting a window that was mapped before the manager started.
    Startup,
    /// The client (or its transient status) asks for a specific spot.
    Positioned(Gravity),
    Free,
}

/// Cascade cursor shared by all new windows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cascade {
    x: i32,
    y: i32,
}

impl Default for Cascade {
    fn default() -> Self {
        Self {
            x: CASCADE_ORIGIN,
            y: CASCADE_ORIGIN,
        }
    }
}

/// Everything placement needs to know about a new frame.
#[derive(Debug, Clone, Copy)]
pub struct PlacementRequest {
    /// Client geometry as requested, root-relative.
    pub client: Geometry,
    pub frame: Size,
    /// Client offset inside the frame interior.
    pub client_offset: (i32, i32),
    pub title_height: u32,
    pub mode: PlacementMode,
}

impl Cascade {
    /// Pick the frame origin. Frames that overflow the screen are centred.
    pub fn place(&mut self, request: &PlacementRequest, screen: Size) -> (i32, i32) {
        let c = request.client;
        let (fw, fh) = (request.frame.width as i32, request.frame.height as i32);
        // Distance from the frame's outer corner to the client's corner.
        let decor_x = FRAME_BORDER as i32 + request.client_offset.0;
        let decor_y = FRAME_BORDER as i32 + request.client_offset.1;

        let candidate = match request.mode {
            PlacementMode::Startup => Some((c.x - decor_x, c.y - decor_y)),
            PlacementMode::Positioned(gravity) => Some(match gravity {
                Gravity::Static => (c.x - decor_x, c.y - decor_y),
                Gravity::North => (c.x - decor_x, c.y),
                Gravity::NorthEast => (c.right() - fw, c.y),
                Gravity::West => (c.x, c.y - decor_y),
                Gravity::East => (c.right() - fw, c.y - decor_y),
                Gravity::SouthWest => (c.x, c.bottom() - fh),
                Gravity::South => (c.x - decor_x, c.bottom() - fh),
                Gravity::SouthEast => (c.right() - fw, c.bottom() - fh),
                Gravity::Center => (c.x + (c.width as i32 - fw) / 2, c.y + (c.height as i32 - fh) / 2),
                Gravity::NorthWest => (c.x, c.y),
            }),
            PlacementMode::Free => None,
        };

        let (mut x, mut y) = match candidate {
            Some((x, y)) if x >= 0 && y >= 0 => (x, y),
            _ => self.next(request.title_height, screen),
        };

        let (sw, sh) = (screen.width as i32, screen.height as i32);
        if x + fw > sw {
            x = (sw - fw) / 2;
        }
        if y + fh > sh {
            y = (sh - fh) / 2;
        }
        debug!("Placed {}x{} frame at {},{} ({:?})", fw, fh, x, y, request.mode);
        (x, y)
    }

    fn next(&mut self, step: u32, screen: Size) -> (i32, i32) {
        if self.x > screen.width as i32 / 2 || self.y > screen.height as i32 / 2 {
            *self = Self::default();
        }
        let origin = (self.x, self.y);
        self.x += step as i32;
        self.y += step as i32;
        origin
    }
}

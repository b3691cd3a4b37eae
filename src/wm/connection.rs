//! Windowing System Interface
//!
//! Everything the window core asks of the display server. The production
//! implementation lives in [`crate::x11`]; tests use a recording fake.

use anyhow::Result;

use crate::shared::Geometry;
use crate::wm::session::StateRecord;

pub use x11rb::protocol::xproto::{Colormap, Pixmap, Window};

/// Attributes of a prospective client, read once at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientAttributes {
    pub geometry: Geometry,
    pub override_redirect: bool,
    pub viewable: bool,
}

/// Partial configure request. `None` leaves the value untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WindowChanges {
    pub x: Option<i32>,
    pub y: Option<i32>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub border_width: Option<u32>,
}

impl WindowChanges {
    pub fn position(x: i32, y: i32) -> Self {
        Self {
            x: Some(x),
            y: Some(y),
            ..Self::default()
        }
    }

    pub fn size(width: u32, height: u32) -> Self {
        Self {
            width: Some(width),
            height: Some(height),
            ..Self::default()
        }
    }

    pub fn geometry(geometry: Geometry) -> Self {
        Self {
            x: Some(geometry.x),
            y: Some(geometry.y),
            width: Some(geometry.width),
            height: Some(geometry.height),
            border_width: None,
        }
    }

    pub fn border_width(mut self, width: u32) -> Self {
        self.border_width = Some(width);
        self
    }
}

/// Event selections the core installs on windows it touches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventInterest {
    /// Property, focus and structure changes of a client.
    Client,
    /// Pointer input plus substructure redirection for the client's parent.
    FrameContainer,
    Nothing,
}

/// Raw hint properties read as 32-bit words.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HintProperty {
    WmHints,
    NormalHints,
    MotifHints,
    WmState,
}

/// Entries of WM_PROTOCOLS the core understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Protocol {
    Delete,
    TakeFocus,
    WindowState,
    Colormap,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerCursor {
    Move,
    Default,
}

/// Display server operations used by managed windows.
///
/// Geometry is passed as signed positions and unsigned sizes; implementations
/// convert to the wire types.
pub trait WindowingSystem {
    fn root(&self) -> Window;

    /// `None` when the window no longer exists.
    fn client_attributes(&mut self, window: Window) -> Result<Option<ClientAttributes>>;

    /// Create a top-level, override-redirect frame window.
    fn create_frame(&mut self, geometry: Geometry, border_pixel: u32) -> Result<Window>;

    /// Create a decoration child window.
    fn create_child(&mut self, parent: Window, geometry: Geometry, border_width: u32, border_pixel: u32) -> Result<Window>;

    fn destroy_window(&mut self, window: Window) -> Result<()>;

    fn map_window(&mut self, window: Window) -> Result<()>;

    fn map_subwindows(&mut self, window: Window) -> Result<()>;

    fn unmap_window(&mut self, window: Window) -> Result<()>;

    fn reparent_window(&mut self, window: Window, parent: Window, x: i32, y: i32) -> Result<()>;

    fn configure_window(&mut self, window: Window, changes: &WindowChanges) -> Result<()>;

    /// Restack `windows` so the first is on top and each following one sits
    /// directly below its predecessor.
    fn restack(&mut self, windows: &[Window]) -> Result<()>;

    fn set_border_color(&mut self, window: Window, pixel: u32) -> Result<()>;

    /// `None` clears the background pixmap.
    fn set_background_pixmap(&mut self, window: Window, pixmap: Option<Pixmap>) -> Result<()>;

    fn clear_window(&mut self, window: Window) -> Result<()>;

    fn select_input(&mut self, window: Window, interest: EventInterest) -> Result<()>;

    fn change_save_set(&mut self, window: Window, insert: bool) -> Result<()>;

    fn window_name(&mut self, window: Window) -> Result<Option<String>>;

    fn icon_name(&mut self, window: Window) -> Result<Option<String>>;

    /// Raw 32-bit words of a hint property, `None` if absent.
    fn property_words(&mut self, window: Window, property: HintProperty) -> Result<Option<Vec<u32>>>;

    fn protocols(&mut self, window: Window) -> Result<Vec<Protocol>>;

    fn transient_for(&mut self, window: Window) -> Result<Option<Window>>;

    fn set_wm_state(&mut self, window: Window, record: &StateRecord) -> Result<()>;

    /// Returns whether the server accepted the request.
    fn set_input_focus(&mut self, window: Window) -> Result<bool>;

    /// Returns whether the grab succeeded.
    fn grab_pointer(&mut self, window: Window, cursor: PointerCursor) -> Result<bool>;

    fn ungrab_pointer(&mut self) -> Result<()>;

    fn send_delete_request(&mut self, window: Window) -> Result<()>;

    /// Synthetic ConfigureNotify telling the client where it really is.
    fn send_configure_notify(&mut self, window: Window, geometry: Geometry, above: Window) -> Result<()>;

    /// Whether a DestroyNotify for `window` is already queued. A queued
    /// notification is consumed.
    fn pending_destroy(&mut self, window: Window) -> Result<bool>;

    /// Whether a ReparentNotify for `window` is already queued. A queued
    /// notification is consumed.
    fn pending_reparent(&mut self, window: Window) -> Result<bool>;

    /// Invert a rectangle outline on the root window. Drawing the same
    /// outline twice erases it.
    fn draw_outline(&mut self, rect: Geometry) -> Result<()>;

    /// Invert text on the root window, same erase rule as outlines.
    fn draw_outline_text(&mut self, x: i32, y: i32, text: &str) -> Result<()>;

    fn draw_text(&mut self, window: Window, x: i32, y: i32, text: &str, focused: bool) -> Result<()>;

    fn draw_rectangle(&mut self, window: Window, rect: Geometry, focused: bool) -> Result<()>;

    fn draw_line(&mut self, window: Window, from: (i32, i32), to: (i32, i32), focused: bool) -> Result<()>;

    /// Width of `text` in the title font.
    fn text_width(&mut self, text: &str) -> Result<u32>;

    fn shape_supported(&self) -> bool;

    fn query_shaped(&mut self, window: Window) -> Result<bool>;

    /// Set the frame's bounding shape to the client's shape at `offset`,
    /// then union `rects`.
    fn shape_frame(&mut self, frame: Window, client: Window, offset: (i32, i32), rects: &[Geometry]) -> Result<()>;

    fn client_colormap(&mut self, window: Window) -> Result<Option<Colormap>>;

    fn installed_colormaps(&mut self, window: Window) -> Result<Vec<Colormap>>;

    fn install_colormap(&mut self, colormap: Colormap) -> Result<()>;

    fn uninstall_colormap(&mut self, colormap: Colormap) -> Result<()>;
}

//! X11 Connection
//!
//! [`XConnection`] implements [`WindowingSystem`] on top of an x11rb
//! `RustConnection`. It also owns the manager selection, the title font and
//! graphics contexts, and a small backlog of events read ahead while
//! looking for pending destroy or reparent notifications.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{bail, Context, Result};
use tracing::{debug, info, warn};
use x11rb::connection::{Connection, RequestConnection};
use x11rb::errors::ReplyError;
use x11rb::protocol::shape::{self, ConnectionExt as ShapeExt, SK, SO};
use x11rb::protocol::xproto::{
    AtomEnum, ChangeWindowAttributesAux, Char2b, ClientMessageEvent, ClipOrdering, ConfigureNotifyEvent,
    ConfigureWindowAux, ConnectionExt, CoordMode, CreateGCAux, CreateWindowAux, Cursor, EventMask, Font, Gcontext, GrabMode,
    GrabStatus, InputFocus, MapState, Point, PropMode, Rectangle, SetMode, StackMode, SubwindowMode, WindowClass,
    CONFIGURE_NOTIFY_EVENT, GX,
};
use x11rb::protocol::Event;
use x11rb::rust_connection::RustConnection;
use x11rb::wrapper::ConnectionExt as WrapperExt;
use x11rb::{CURRENT_TIME, NONE};

use crate::config::StyleConfig;
use crate::shared::{Geometry, Size};
use crate::wm::connection::{
    ClientAttributes, Colormap, EventInterest, HintProperty, Pixmap, PointerCursor, Protocol, Window,
    WindowChanges, WindowingSystem,
};
use crate::wm::events::WmEvent;
use crate::wm::hints::{MWM_HINTS_WORDS, SIZE_HINTS_WORDS, WM_HINTS_WORDS};
use crate::wm::layout::FRAME_BORDER;
use crate::wm::session::StateRecord;
use crate::wm::style::FontMetrics;
use crate::x11::atoms::Atoms;
use crate::x11::translate;

// Glyphs of the standard cursor font.
const XC_FLEUR: u16 = 52;
const XC_LEFT_PTR: u16 = 68;

const FALLBACK_FONT: &str = "fixed";

/// Events wanted on frame and decoration windows.
fn decoration_mask() -> EventMask {
    EventMask::BUTTON_PRESS
        | EventMask::BUTTON_RELEASE
        | EventMask::BUTTON_MOTION
        | EventMask::EXPOSURE
        | EventMask::LEAVE_WINDOW
}

pub struct XConnection {
    conn: Arc<RustConnection>,
    root: Window,
    root_depth: u8,
    screen_size: Size,
    atoms: Atoms,
    /// Holds the WM_Sn selection.
    owner: Window,
    font: Font,
    font_metrics: FontMetrics,
    focus_gc: Gcontext,
    unfocus_gc: Gcontext,
    outline_gc: Gcontext,
    move_cursor: Cursor,
    default_cursor: Cursor,
    shape: bool,
    backlog: VecDeque<Event>,
}

impl XConnection {
    /// Connect to the display named by `DISPLAY` and take over window
    /// management on its default screen.
    pub fn connect(replace: bool, style: &StyleConfig) -> Result<Self> {
        let (conn, screen_num) = x11rb::connect(None).context("Failed to connect to X server")?;
        let conn = Arc::new(conn);

        let screen = &conn.setup().roots[screen_num];
        let root = screen.root;
        let root_depth = screen.root_depth;
        let screen_size = Size::new(u32::from(screen.width_in_pixels), u32::from(screen.height_in_pixels));
        info!("Screen {}: {}x{}, root 0x{:x}", screen_num, screen_size.width, screen_size.height, root);

        let atoms = Atoms::new(conn.as_ref()).context("Failed to intern atoms")?;
        let owner = become_wm(conn.as_ref(), screen_num, root, root_depth, replace)?;
        announce(conn.as_ref(), &atoms, root, owner)?;

        let font = open_font(conn.as_ref(), &style.font)?;
        let reply = conn.query_font(font)?.reply().context("Failed to query title font")?;
        let font_metrics = FontMetrics {
            ascent: reply.font_ascent.max(0) as u32,
            descent: reply.font_descent.max(0) as u32,
        };
        debug!("Title font metrics: {:?}", font_metrics);

        let text_gc = |color: u32| -> Result<Gcontext> {
            let gc = conn.generate_id()?;
            conn.create_gc(
                gc,
                root,
                &CreateGCAux::new().foreground(color).font(font).graphics_exposures(0u32),
            )?;
            Ok(gc)
        };
        let focus_gc = text_gc(style.focus_text_color)?;
        let unfocus_gc = text_gc(style.unfocus_text_color)?;

        let outline_gc = conn.generate_id()?;
        conn.create_gc(
            outline_gc,
            root,
            &CreateGCAux::new()
                .function(GX::XOR)
                .foreground(0x00ff_ffffu32)
                .subwindow_mode(SubwindowMode::INCLUDE_INFERIORS)
                .line_width(2u32)
                .font(font),
        )?;

        let cursor_font = conn.generate_id()?;
        conn.open_font(cursor_font, b"cursor")?;
        let create_cursor = |glyph: u16| -> Result<Cursor> {
            let cursor = conn.generate_id()?;
            conn.create_glyph_cursor(cursor, cursor_font, cursor_font, glyph, glyph + 1, 0, 0, 0, 0xffff, 0xffff, 0xffff)?;
            Ok(cursor)
        };
        let move_cursor = create_cursor(XC_FLEUR)?;
        let default_cursor = create_cursor(XC_LEFT_PTR)?;
        conn.close_font(cursor_font)?;
        conn.change_window_attributes(root, &ChangeWindowAttributesAux::new().cursor(default_cursor))?;

        let shape = conn.extension_information(shape::X11_EXTENSION_NAME)?.is_some();
        if shape {
            debug!("Shape extension available");
        }
        conn.flush()?;

        Ok(Self {
            conn,
            root,
            root_depth,
            screen_size,
            atoms,
            owner,
            font,
            font_metrics,
            focus_gc,
            unfocus_gc,
            outline_gc,
            move_cursor,
            default_cursor,
            shape,
            backlog: VecDeque::new(),
        })
    }

    /// Shared handle for the event stream and the renderer.
    pub fn raw(&self) -> Arc<RustConnection> {
        self.conn.clone()
    }

    pub fn root_depth(&self) -> u8 {
        self.root_depth
    }

    pub fn screen_size(&self) -> Size {
        self.screen_size
    }

    pub fn font_metrics(&self) -> FontMetrics {
        self.font_metrics
    }

    pub fn flush(&self) -> Result<()> {
        self.conn.flush()?;
        Ok(())
    }

    /// Next event, read-ahead backlog first. Never blocks.
    pub fn next_event(&mut self) -> Result<Option<Event>> {
        if let Some(event) = self.backlog.pop_front() {
            return Ok(Some(event));
        }
        Ok(self.conn.poll_for_event()?)
    }

    pub fn translate(&self, event: &Event) -> Option<WmEvent> {
        translate::translate(event, &self.atoms)
    }

    /// Top-level windows that were already there when we started: mapped
    /// ones, and unmapped ones a previous manager left iconic.
    pub fn existing_clients(&mut self) -> Result<Vec<Window>> {
        let tree = self.conn.query_tree(self.root)?.reply().context("Failed to query window tree")?;
        let mut clients = Vec::new();
        for window in tree.children {
            if window == self.owner {
                continue;
            }
            let Ok(attributes) = self.conn.get_window_attributes(window)?.reply() else {
                continue;
            };
            if attributes.override_redirect {
                continue;
            }
            let iconic = self
                .property_words(window, HintProperty::WmState)?
                .is_some_and(|words| words.first() == Some(&3));
            if attributes.map_state == MapState::VIEWABLE || iconic {
                clients.push(window);
            }
        }
        debug!("Found {} pre-existing client windows", clients.len());
        Ok(clients)
    }

    /// Read everything the server has sent so far into the backlog.
    fn fill_backlog(&mut self) -> Result<()> {
        while let Some(event) = self.conn.poll_for_event()? {
            self.backlog.push_back(event);
        }
        Ok(())
    }

    /// Remove the first backlog event matching `pred`.
    fn take_from_backlog(&mut self, pred: impl Fn(&Event) -> bool) -> Result<bool> {
        self.fill_backlog()?;
        match self.backlog.iter().position(pred) {
            Some(index) => {
                self.backlog.remove(index);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn text_gc(&self, focused: bool) -> Gcontext {
        if focused {
            self.focus_gc
        } else {
            self.unfocus_gc
        }
    }

    fn text(&self, drawable: Window, gc: Gcontext, x: i32, y: i32, text: &str) -> Result<()> {
        let bytes = latin1(text);
        self.conn
            .poly_text8(drawable, gc, x as i16, y as i16, &text_items(&bytes))?;
        Ok(())
    }
}

impl Drop for XConnection {
    fn drop(&mut self) {
        let _ = self.conn.free_gc(self.focus_gc);
        let _ = self.conn.free_gc(self.unfocus_gc);
        let _ = self.conn.free_gc(self.outline_gc);
        let _ = self.conn.close_font(self.font);
        let _ = self.conn.destroy_window(self.owner);
        let _ = self.conn.flush();
    }
}

/// Take the WM_Sn selection and substructure redirection on the root.
///
/// With `replace`, an existing owner is asked to go away by taking its
/// selection; we then wait for its selection window to disappear.
fn become_wm(conn: &RustConnection, screen_num: usize, root: Window, depth: u8, replace: bool) -> Result<Window> {
    let selection_name = format!("WM_S{}", screen_num);
    let selection = conn
        .intern_atom(false, selection_name.as_bytes())?
        .reply()
        .context("Failed to intern WM selection atom")?
        .atom;

    let previous = conn
        .get_selection_owner(selection)?
        .reply()
        .context("Failed to get current WM selection owner")?
        .owner;
    if previous != NONE {
        if !replace {
            bail!(
                "Another window manager is already running (window 0x{:x}). Use --replace to replace it.",
                previous
            );
        }
        info!("Existing WM detected (window 0x{:x}), replacing it", previous);
        let _ = conn.change_window_attributes(
            previous,
            &ChangeWindowAttributesAux::new().event_mask(EventMask::STRUCTURE_NOTIFY),
        );
    }

    let owner = conn.generate_id()?;
    conn.create_window(
        depth,
        owner,
        root,
        -100,
        -100,
        1,
        1,
        0,
        WindowClass::INPUT_OUTPUT,
        x11rb::COPY_FROM_PARENT,
        &CreateWindowAux::new().override_redirect(1u32).event_mask(EventMask::STRUCTURE_NOTIFY),
    )?;
    conn.set_selection_owner(owner, selection, CURRENT_TIME)?
        .check()
        .context("Failed to set WM selection owner")?;
    let acquired = conn.get_selection_owner(selection)?.reply()?.owner;
    if acquired != owner {
        bail!("Failed to acquire WM selection (expected 0x{:x}, got 0x{:x})", owner, acquired);
    }

    if previous != NONE {
        let timeout = Duration::from_secs(15);
        let start = Instant::now();
        loop {
            if conn.get_window_attributes(previous)?.reply().is_err() {
                info!("Previous WM exited");
                break;
            }
            if start.elapsed() >= timeout {
                warn!("Timeout waiting for previous WM to exit, proceeding anyway");
                break;
            }
            std::thread::sleep(Duration::from_millis(100));
        }
    }

    let mask = EventMask::SUBSTRUCTURE_REDIRECT
        | EventMask::SUBSTRUCTURE_NOTIFY
        | EventMask::PROPERTY_CHANGE
        | EventMask::COLOR_MAP_CHANGE
        | EventMask::FOCUS_CHANGE;
    conn.change_window_attributes(root, &ChangeWindowAttributesAux::new().event_mask(mask))?
        .check()
        .context("Failed to select substructure redirect on the root window - is another WM running?")?;
    info!("Acquired window management on screen {}", screen_num);
    Ok(owner)
}

/// Point _NET_SUPPORTING_WM_CHECK at the selection window and name it.
fn announce(conn: &RustConnection, atoms: &Atoms, root: Window, owner: Window) -> Result<()> {
    for window in [root, owner] {
        conn.change_property32(PropMode::REPLACE, window, atoms.net_supporting_wm_check, AtomEnum::WINDOW, &[owner])?;
    }
    conn.change_property8(PropMode::REPLACE, owner, atoms.net_wm_name, atoms.utf8_string, b"boxwm")?;
    Ok(())
}

fn open_font(conn: &RustConnection, name: &str) -> Result<Font> {
    let font = conn.generate_id()?;
    if conn.open_font(font, name.as_bytes())?.check().is_ok() {
        return Ok(font);
    }
    warn!("Font {:?} not available, falling back to {:?}", name, FALLBACK_FONT);
    let font = conn.generate_id()?;
    conn.open_font(font, FALLBACK_FONT.as_bytes())?
        .check()
        .context("Failed to open fallback font")?;
    Ok(font)
}

/// Core fonts take 8-bit text; anything outside Latin-1 becomes '?'.
fn latin1(text: &str) -> Vec<u8> {
    text.chars().map(|c| u8::try_from(u32::from(c)).unwrap_or(b'?')).collect()
}

/// Encode PolyText8 items, at most 254 bytes each.
fn text_items(bytes: &[u8]) -> Vec<u8> {
    let mut items = Vec::with_capacity(bytes.len() + 2 * (bytes.len() / 254 + 1));
    for chunk in bytes.chunks(254) {
        items.push(chunk.len() as u8);
        items.push(0);
        items.extend_from_slice(chunk);
    }
    items
}

fn rectangle(rect: Geometry) -> Rectangle {
    Rectangle {
        x: rect.x as i16,
        y: rect.y as i16,
        width: rect.width.min(u32::from(u16::MAX)) as u16,
        height: rect.height.min(u32::from(u16::MAX)) as u16,
    }
}

/// Treat BadWindow and friends as "the window is gone".
fn existing<T>(reply: std::result::Result<T, ReplyError>) -> Result<Option<T>> {
    match reply {
        Ok(value) => Ok(Some(value)),
        Err(ReplyError::X11Error(err)) => {
            debug!("Request failed: {:?}", err.error_kind);
            Ok(None)
        }
        Err(err) => Err(err.into()),
    }
}

impl WindowingSystem for XConnection {
    fn root(&self) -> Window {
        self.root
    }

    fn client_attributes(&mut self, window: Window) -> Result<Option<ClientAttributes>> {
        let Some(attributes) = existing(self.conn.get_window_attributes(window)?.reply())? else {
            return Ok(None);
        };
        let Some(geometry) = existing(self.conn.get_geometry(window)?.reply())? else {
            return Ok(None);
        };
        Ok(Some(ClientAttributes {
            geometry: Geometry::new(
                i32::from(geometry.x),
                i32::from(geometry.y),
                u32::from(geometry.width),
                u32::from(geometry.height),
            ),
            override_redirect: attributes.override_redirect,
            viewable: attributes.map_state == MapState::VIEWABLE,
        }))
    }

    fn create_frame(&mut self, geometry: Geometry, border_pixel: u32) -> Result<Window> {
        let frame = self.conn.generate_id()?;
        let rect = rectangle(geometry);
        self.conn.create_window(
            x11rb::COPY_DEPTH_FROM_PARENT,
            frame,
            self.root,
            rect.x,
            rect.y,
            rect.width.max(1),
            rect.height.max(1),
            FRAME_BORDER as u16,
            WindowClass::INPUT_OUTPUT,
            x11rb::COPY_FROM_PARENT,
            &CreateWindowAux::new()
                .override_redirect(1u32)
                .border_pixel(border_pixel)
                .event_mask(decoration_mask() | EventMask::SUBSTRUCTURE_REDIRECT)
                .cursor(self.default_cursor),
        )?;
        Ok(frame)
    }

    fn create_child(&mut self, parent: Window, geometry: Geometry, border_width: u32, border_pixel: u32) -> Result<Window> {
        let window = self.conn.generate_id()?;
        let rect = rectangle(geometry);
        self.conn.create_window(
            x11rb::COPY_DEPTH_FROM_PARENT,
            window,
            parent,
            rect.x,
            rect.y,
            rect.width.max(1),
            rect.height.max(1),
            border_width as u16,
            WindowClass::INPUT_OUTPUT,
            x11rb::COPY_FROM_PARENT,
            &CreateWindowAux::new()
                .border_pixel(border_pixel)
                .event_mask(decoration_mask()),
        )?;
        Ok(window)
    }

    fn destroy_window(&mut self, window: Window) -> Result<()> {
        self.conn.destroy_window(window)?;
        Ok(())
    }

    fn map_window(&mut self, window: Window) -> Result<()> {
        self.conn.map_window(window)?;
        Ok(())
    }

    fn map_subwindows(&mut self, window: Window) -> Result<()> {
        self.conn.map_subwindows(window)?;
        Ok(())
    }

    fn unmap_window(&mut self, window: Window) -> Result<()> {
        self.conn.unmap_window(window)?;
        Ok(())
    }

    fn reparent_window(&mut self, window: Window, parent: Window, x: i32, y: i32) -> Result<()> {
        self.conn.reparent_window(window, parent, x as i16, y as i16)?;
        Ok(())
    }

    fn configure_window(&mut self, window: Window, changes: &WindowChanges) -> Result<()> {
        let aux = ConfigureWindowAux::new()
            .x(changes.x)
            .y(changes.y)
            .width(changes.width.map(|w| w.max(1)))
            .height(changes.height.map(|h| h.max(1)))
            .border_width(changes.border_width);
        self.conn.configure_window(window, &aux)?;
        Ok(())
    }

    fn restack(&mut self, windows: &[Window]) -> Result<()> {
        let Some((&top, rest)) = windows.split_first() else {
            return Ok(());
        };
        self.conn
            .configure_window(top, &ConfigureWindowAux::new().stack_mode(StackMode::ABOVE))?;
        let mut above = top;
        for &window in rest {
            self.conn.configure_window(
                window,
                &ConfigureWindowAux::new().sibling(above).stack_mode(StackMode::BELOW),
            )?;
            above = window;
        }
        Ok(())
    }

    fn set_border_color(&mut self, window: Window, pixel: u32) -> Result<()> {
        self.conn
            .change_window_attributes(window, &ChangeWindowAttributesAux::new().border_pixel(pixel))?;
        Ok(())
    }

    fn set_background_pixmap(&mut self, window: Window, pixmap: Option<Pixmap>) -> Result<()> {
        self.conn.change_window_attributes(
            window,
            &ChangeWindowAttributesAux::new().background_pixmap(pixmap.unwrap_or(NONE)),
        )?;
        Ok(())
    }

    fn clear_window(&mut self, window: Window) -> Result<()> {
        self.conn.clear_area(false, window, 0, 0, 0, 0)?;
        Ok(())
    }

    fn select_input(&mut self, window: Window, interest: EventInterest) -> Result<()> {
        let mask = match interest {
            EventInterest::Client => {
                EventMask::PROPERTY_CHANGE | EventMask::STRUCTURE_NOTIFY | EventMask::FOCUS_CHANGE
            }
            EventInterest::FrameContainer => decoration_mask() | EventMask::SUBSTRUCTURE_REDIRECT,
            EventInterest::Nothing => EventMask::NO_EVENT,
        };
        self.conn
            .change_window_attributes(window, &ChangeWindowAttributesAux::new().event_mask(mask))?;
        if self.shape && interest != EventInterest::FrameContainer {
            self.conn.shape_select_input(window, interest == EventInterest::Client)?;
        }
        Ok(())
    }

    fn change_save_set(&mut self, window: Window, insert: bool) -> Result<()> {
        let mode = if insert { SetMode::INSERT } else { SetMode::DELETE };
        self.conn.change_save_set(mode, window)?;
        Ok(())
    }

    fn window_name(&mut self, window: Window) -> Result<Option<String>> {
        let utf8 = self
            .conn
            .get_property(false, window, self.atoms.net_wm_name, self.atoms.utf8_string, 0, 1024)?
            .reply()?;
        if !utf8.value.is_empty() {
            return Ok(Some(String::from_utf8_lossy(&utf8.value).into_owned()));
        }
        let reply = self
            .conn
            .get_property(false, window, AtomEnum::WM_NAME, AtomEnum::ANY, 0, 1024)?
            .reply()?;
        Ok((!reply.value.is_empty()).then(|| String::from_utf8_lossy(&reply.value).into_owned()))
    }

    fn icon_name(&mut self, window: Window) -> Result<Option<String>> {
        let reply = self
            .conn
            .get_property(false, window, AtomEnum::WM_ICON_NAME, AtomEnum::ANY, 0, 1024)?
            .reply()?;
        Ok((!reply.value.is_empty()).then(|| String::from_utf8_lossy(&reply.value).into_owned()))
    }

    fn property_words(&mut self, window: Window, property: HintProperty) -> Result<Option<Vec<u32>>> {
        let (atom, kind, length): (u32, u32, u32) = match property {
            HintProperty::WmHints => (AtomEnum::WM_HINTS.into(), AtomEnum::WM_HINTS.into(), WM_HINTS_WORDS),
            HintProperty::NormalHints => (
                AtomEnum::WM_NORMAL_HINTS.into(),
                AtomEnum::WM_SIZE_HINTS.into(),
                SIZE_HINTS_WORDS,
            ),
            HintProperty::MotifHints => (self.atoms.motif_wm_hints, AtomEnum::ANY.into(), MWM_HINTS_WORDS),
            HintProperty::WmState => (self.atoms.wm_state, self.atoms.wm_state, 3),
        };
        let reply = self.conn.get_property(false, window, atom, kind, 0, length)?.reply()?;
        if reply.type_ == NONE {
            return Ok(None);
        }
        Ok(reply.value32().map(|words| words.collect()))
    }

    fn protocols(&mut self, window: Window) -> Result<Vec<Protocol>> {
        let reply = self
            .conn
            .get_property(false, window, self.atoms.wm_protocols, AtomEnum::ATOM, 0, 32)?
            .reply()?;
        Ok(reply
            .value32()
            .map(|atoms| atoms.filter_map(|atom| self.atoms.protocol(atom)).collect())
            .unwrap_or_default())
    }

    fn transient_for(&mut self, window: Window) -> Result<Option<Window>> {
        let reply = self
            .conn
            .get_property(false, window, AtomEnum::WM_TRANSIENT_FOR, AtomEnum::WINDOW, 0, 1)?
            .reply()?;
        Ok(reply
            .value32()
            .and_then(|mut words| words.next())
            .filter(|&owner| owner != NONE))
    }

    fn set_wm_state(&mut self, window: Window, record: &StateRecord) -> Result<()> {
        self.conn.change_property32(
            PropMode::REPLACE,
            window,
            self.atoms.wm_state,
            self.atoms.wm_state,
            &record.to_words(),
        )?;
        Ok(())
    }

    fn set_input_focus(&mut self, window: Window) -> Result<bool> {
        match self.conn.set_input_focus(InputFocus::PARENT, window, CURRENT_TIME)?.check() {
            Ok(()) => Ok(true),
            Err(ReplyError::X11Error(err)) => {
                debug!("Focus request for 0x{:x} refused: {:?}", window, err.error_kind);
                Ok(false)
            }
            Err(err) => Err(err.into()),
        }
    }

    fn grab_pointer(&mut self, window: Window, cursor: PointerCursor) -> Result<bool> {
        let cursor = match cursor {
            PointerCursor::Move => self.move_cursor,
            PointerCursor::Default => self.default_cursor,
        };
        let reply = self
            .conn
            .grab_pointer(
                false,
                window,
                EventMask::BUTTON_PRESS
                    | EventMask::BUTTON_RELEASE
                    | EventMask::BUTTON_MOTION
                    | EventMask::POINTER_MOTION
                    | EventMask::LEAVE_WINDOW,
                GrabMode::ASYNC,
                GrabMode::ASYNC,
                NONE,
                cursor,
                CURRENT_TIME,
            )?
            .reply()
            .context("Failed to grab pointer")?;
        if reply.status != GrabStatus::SUCCESS {
            warn!("Pointer grab on 0x{:x} failed: {:?}", window, reply.status);
        }
        Ok(reply.status == GrabStatus::SUCCESS)
    }

    fn ungrab_pointer(&mut self) -> Result<()> {
        self.conn.ungrab_pointer(CURRENT_TIME)?;
        Ok(())
    }

    fn send_delete_request(&mut self, window: Window) -> Result<()> {
        let event = ClientMessageEvent::new(
            32,
            window,
            self.atoms.wm_protocols,
            [self.atoms.wm_delete_window, CURRENT_TIME, 0, 0, 0],
        );
        self.conn.send_event(false, window, EventMask::NO_EVENT, event)?;
        Ok(())
    }

    fn send_configure_notify(&mut self, window: Window, geometry: Geometry, above: Window) -> Result<()> {
        let rect = rectangle(geometry);
        let event = ConfigureNotifyEvent {
            response_type: CONFIGURE_NOTIFY_EVENT,
            sequence: 0,
            event: window,
            window,
            above_sibling: above,
            x: rect.x,
            y: rect.y,
            width: rect.width,
            height: rect.height,
            border_width: 0,
            override_redirect: false,
        };
        self.conn.send_event(false, window, EventMask::STRUCTURE_NOTIFY, event)?;
        Ok(())
    }

    fn pending_destroy(&mut self, window: Window) -> Result<bool> {
        self.take_from_backlog(|event| matches!(event, Event::DestroyNotify(e) if e.window == window))
    }

    fn pending_reparent(&mut self, window: Window) -> Result<bool> {
        self.take_from_backlog(|event| matches!(event, Event::ReparentNotify(e) if e.window == window))
    }

    fn draw_outline(&mut self, rect: Geometry) -> Result<()> {
        self.conn.poly_rectangle(self.root, self.outline_gc, &[rectangle(rect)])?;
        Ok(())
    }

    fn draw_outline_text(&mut self, x: i32, y: i32, text: &str) -> Result<()> {
        self.text(self.root, self.outline_gc, x, y, text)
    }

    fn draw_text(&mut self, window: Window, x: i32, y: i32, text: &str, focused: bool) -> Result<()> {
        self.text(window, self.text_gc(focused), x, y, text)
    }

    fn draw_rectangle(&mut self, window: Window, rect: Geometry, focused: bool) -> Result<()> {
        self.conn.poly_rectangle(window, self.text_gc(focused), &[rectangle(rect)])?;
        Ok(())
    }

    fn draw_line(&mut self, window: Window, from: (i32, i32), to: (i32, i32), focused: bool) -> Result<()> {
        let points = [
            Point { x: from.0 as i16, y: from.1 as i16 },
            Point { x: to.0 as i16, y: to.1 as i16 },
        ];
        self.conn.poly_line(CoordMode::ORIGIN, window, self.text_gc(focused), &points)?;
        Ok(())
    }

    fn text_width(&mut self, text: &str) -> Result<u32> {
        if text.is_empty() {
            return Ok(0);
        }
        let chars: Vec<Char2b> = latin1(text).into_iter().map(|byte| Char2b { byte1: 0, byte2: byte }).collect();
        let reply = self.conn.query_text_extents(self.font, &chars)?.reply()?;
        Ok(reply.overall_width.max(0) as u32)
    }

    fn shape_supported(&self) -> bool {
        self.shape
    }

    fn query_shaped(&mut self, window: Window) -> Result<bool> {
        Ok(self.conn.shape_query_extents(window)?.reply()?.bounding_shaped)
    }

    fn shape_frame(&mut self, frame: Window, client: Window, offset: (i32, i32), rects: &[Geometry]) -> Result<()> {
        self.conn.shape_combine(
            SO::SET,
            SK::BOUNDING,
            SK::BOUNDING,
            frame,
            offset.0 as i16,
            offset.1 as i16,
            client,
        )?;
        let rects: Vec<Rectangle> = rects.iter().copied().map(rectangle).collect();
        self.conn
            .shape_rectangles(SO::UNION, SK::BOUNDING, ClipOrdering::UNSORTED, frame, 0, 0, &rects)?;
        Ok(())
    }

    fn client_colormap(&mut self, window: Window) -> Result<Option<Colormap>> {
        let attributes = self.conn.get_window_attributes(window)?.reply()?;
        Ok((attributes.colormap != NONE).then_some(attributes.colormap))
    }

    fn installed_colormaps(&mut self, window: Window) -> Result<Vec<Colormap>> {
        Ok(self.conn.list_installed_colormaps(window)?.reply()?.cmaps)
    }

    fn install_colormap(&mut self, colormap: Colormap) -> Result<()> {
        self.conn.install_colormap(colormap)?;
        Ok(())
    }

    fn uninstall_colormap(&mut self, colormap: Colormap) -> Result<()> {
        self.conn.uninstall_colormap(colormap)?;
        Ok(())
    }
}

//! In-memory display server and harness for window core tests.

use std::collections::{HashMap, HashSet};

use anyhow::{bail, Result};

use crate::config::Config;
use crate::shared::{Geometry, Size};
use crate::wm::client::ManagedWindow;
use crate::wm::client_flags::{LifecycleState, Modifiers};
use crate::wm::connection::{
    ClientAttributes, Colormap, EventInterest, HintProperty, Pixmap, PointerCursor, Protocol, Window,
    WindowChanges, WindowingSystem,
};
use crate::wm::directory::ClientId;
use crate::wm::events::{ButtonEvent, MotionEvent, WmEvent};
use crate::wm::hints::{
    INPUT_HINT, P_MAX_SIZE, P_MIN_SIZE, P_RESIZE_INC, SIZE_HINTS_WORDS, STATE_HINT, URGENCY_HINT, WM_HINTS_WORDS,
};
use crate::wm::render::{DecorationRenderer, Texture};
use crate::wm::session::StateRecord;
use crate::wm::style::{FontMetrics, Style};
use crate::wm::workspace::Workspaces;
use crate::wm::{Ctx, WindowManager, WindowResult};

const ROOT: Window = 1;
const CHAR_WIDTH: u32 = 6;

/// Requests worth asserting on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Call {
    MapWindow(Window),
    MapSubwindows(Window),
    UnmapWindow(Window),
    DestroyWindow(Window),
    Reparent(Window, Window),
    Configure(Window, WindowChanges),
    Restack(Vec<Window>),
    SetInputFocus(Window),
    Grab(Window),
    Ungrab,
    DeleteRequest(Window),
    Outline(Geometry),
}

pub(crate) struct FakeServer {
    pub calls: Vec<Call>,
    pub grab_succeeds: bool,
    /// Transient-for reference given to the next client created.
    pub next_transient_for: Option<Window>,
    pub names: HashMap<Window, String>,
    next_id: Window,
    next_normal_hints: Option<Vec<u32>>,
    next_input: Option<bool>,
    attributes: HashMap<Window, ClientAttributes>,
    properties: HashMap<(Window, HintProperty), Vec<u32>>,
    protocols: HashMap<Window, Vec<Protocol>>,
    transient_for: HashMap<Window, Window>,
    states: HashMap<Window, StateRecord>,
    destroyed: HashSet<Window>,
}

impl FakeServer {
    pub fn new() -> Self {
        Self {
            calls: Vec::new(),
            grab_succeeds: true,
            next_transient_for: None,
            names: HashMap::new(),
            next_id: 0x1000,
            next_normal_hints: None,
            next_input: None,
            attributes: HashMap::new(),
            properties: HashMap::new(),
            protocols: HashMap::new(),
            transient_for: HashMap::new(),
            states: HashMap::new(),
            destroyed: HashSet::new(),
        }
    }

    fn alloc(&mut self) -> Window {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Create an unmapped client window carrying whatever hints were queued.
    pub fn next_client(&mut self, width: u32, height: u32) -> Window {
        let window = self.alloc();
        self.attributes.insert(
            window,
            ClientAttributes {
                geometry: Geometry::new(0, 0, width, height),
                override_redirect: false,
                viewable: false,
            },
        );
        if let Some(words) = self.next_normal_hints.take() {
            self.properties.insert((window, HintProperty::NormalHints), words);
        }
        if let Some(input) = self.next_input.take() {
            let hints = self.wm_hints_mut(window);
            hints[0] |= INPUT_HINT;
            hints[1] = input as u32;
        }
        if let Some(owner) = self.next_transient_for.take() {
            self.transient_for.insert(window, owner);
        }
        window
    }

    /// Next client has min and max size both set to `width` x `height`.
    pub fn fixed_size(&mut self, width: u32, height: u32) {
        let mut words = vec![0; SIZE_HINTS_WORDS as usize];
        words[0] = P_MIN_SIZE | P_MAX_SIZE;
        words[5] = width;
        words[6] = height;
        words[7] = width;
        words[8] = height;
        self.next_normal_hints = Some(words);
    }

    /// Next client has a minimum size and resize increments.
    pub fn normal_hints(&mut self, min_width: u32, min_height: u32, width_inc: u32, height_inc: u32) {
        let mut words = vec![0; SIZE_HINTS_WORDS as usize];
        words[0] = P_MIN_SIZE | P_RESIZE_INC;
        words[5] = min_width;
        words[6] = min_height;
        words[9] = width_inc;
        words[10] = height_inc;
        self.next_normal_hints = Some(words);
    }

    /// Next client sets the WM_HINTS input field.
    pub fn wm_hints_input(&mut self, input: bool) {
        self.next_input = Some(input);
    }

    pub fn delete_protocol(&mut self, window: Window) {
        self.protocols.entry(window).or_default().push(Protocol::Delete);
    }

    pub fn urgent(&mut self, window: Window) {
        self.wm_hints_mut(window)[0] |= URGENCY_HINT;
    }

    pub fn initial_state(&mut self, window: Window, state: LifecycleState) {
        let hints = self.wm_hints_mut(window);
        hints[0] |= STATE_HINT;
        hints[2] = state.to_icccm();
    }

    /// WM_STATE words left behind by a previous manager.
    pub fn stored_state(&mut self, window: Window, words: &[u32]) {
        self.properties.insert((window, HintProperty::WmState), words.to_vec());
    }

    /// The client goes away; its destroy notification is now pending.
    pub fn destroy(&mut self, window: Window) {
        self.destroyed.insert(window);
    }

    pub fn override_redirect(&mut self, window: Window) {
        if let Some(attributes) = self.attributes.get_mut(&window) {
            attributes.override_redirect = true;
        }
    }

    fn wm_hints_mut(&mut self, window: Window) -> &mut Vec<u32> {
        self.properties
            .entry((window, HintProperty::WmHints))
            .or_insert_with(|| vec![0; WM_HINTS_WORDS as usize])
    }
}

impl WindowingSystem for FakeServer {
    fn root(&self) -> Window {
        ROOT
    }

    fn client_attributes(&mut self, window: Window) -> Result<Option<ClientAttributes>> {
        Ok(self.attributes.get(&window).copied())
    }

    fn create_frame(&mut self, _geometry: Geometry, _border_pixel: u32) -> Result<Window> {
        Ok(self.alloc())
    }

    fn create_child(&mut self, _parent: Window, _geometry: Geometry, _border_width: u32, _border_pixel: u32) -> Result<Window> {
        Ok(self.alloc())
    }

    fn destroy_window(&mut self, window: Window) -> Result<()> {
        self.calls.push(Call::DestroyWindow(window));
        Ok(())
    }

    fn map_window(&mut self, window: Window) -> Result<()> {
        self.calls.push(Call::MapWindow(window));
        Ok(())
    }

    fn map_subwindows(&mut self, window: Window) -> Result<()> {
        self.calls.push(Call::MapSubwindows(window));
        Ok(())
    }

    fn unmap_window(&mut self, window: Window) -> Result<()> {
        self.calls.push(Call::UnmapWindow(window));
        Ok(())
    }

    fn reparent_window(&mut self, window: Window, parent: Window, _x: i32, _y: i32) -> Result<()> {
        self.calls.push(Call::Reparent(window, parent));
        Ok(())
    }

    fn configure_window(&mut self, window: Window, changes: &WindowChanges) -> Result<()> {
        self.calls.push(Call::Configure(window, *changes));
        Ok(())
    }

    fn restack(&mut self, windows: &[Window]) -> Result<()> {
        self.calls.push(Call::Restack(windows.to_vec()));
        Ok(())
    }

    fn set_border_color(&mut self, _window: Window, _pixel: u32) -> Result<()> {
        Ok(())
    }

    fn set_background_pixmap(&mut self, _window: Window, _pixmap: Option<Pixmap>) -> Result<()> {
        Ok(())
    }

    fn clear_window(&mut self, _window: Window) -> Result<()> {
        Ok(())
    }

    fn select_input(&mut self, _window: Window, _interest: EventInterest) -> Result<()> {
        Ok(())
    }

    fn change_save_set(&mut self, _window: Window, _insert: bool) -> Result<()> {
        Ok(())
    }

    fn window_name(&mut self, window: Window) -> Result<Option<String>> {
        Ok(self.names.get(&window).cloned())
    }

    fn icon_name(&mut self, _window: Window) -> Result<Option<String>> {
        Ok(None)
    }

    fn property_words(&mut self, window: Window, property: HintProperty) -> Result<Option<Vec<u32>>> {
        Ok(self.properties.get(&(window, property)).cloned())
    }

    fn protocols(&mut self, window: Window) -> Result<Vec<Protocol>> {
        Ok(self.protocols.get(&window).cloned().unwrap_or_default())
    }

    fn transient_for(&mut self, window: Window) -> Result<Option<Window>> {
        Ok(self.transient_for.get(&window).copied())
    }

    fn set_wm_state(&mut self, window: Window, record: &StateRecord) -> Result<()> {
        self.states.insert(window, *record);
        self.properties
            .insert((window, HintProperty::WmState), record.to_words().to_vec());
        Ok(())
    }

    fn set_input_focus(&mut self, window: Window) -> Result<bool> {
        self.calls.push(Call::SetInputFocus(window));
        Ok(true)
    }

    fn grab_pointer(&mut self, window: Window, _cursor: PointerCursor) -> Result<bool> {
        if self.grab_succeeds {
            self.calls.push(Call::Grab(window));
        }
        Ok(self.grab_succeeds)
    }

    fn ungrab_pointer(&mut self) -> Result<()> {
        self.calls.push(Call::Ungrab);
        Ok(())
    }

    fn send_delete_request(&mut self, window: Window) -> Result<()> {
        self.calls.push(Call::DeleteRequest(window));
        Ok(())
    }

    fn send_configure_notify(&mut self, _window: Window, _geometry: Geometry, _above: Window) -> Result<()> {
        Ok(())
    }

    fn pending_destroy(&mut self, window: Window) -> Result<bool> {
        Ok(self.destroyed.contains(&window))
    }

    fn pending_reparent(&mut self, _window: Window) -> Result<bool> {
        Ok(false)
    }

    fn draw_outline(&mut self, rect: Geometry) -> Result<()> {
        self.calls.push(Call::Outline(rect));
        Ok(())
    }

    fn draw_outline_text(&mut self, _x: i32, _y: i32, _text: &str) -> Result<()> {
        Ok(())
    }

    fn draw_text(&mut self, _window: Window, _x: i32, _y: i32, _text: &str, _focused: bool) -> Result<()> {
        Ok(())
    }

    fn draw_rectangle(&mut self, _window: Window, _rect: Geometry, _focused: bool) -> Result<()> {
        Ok(())
    }

    fn draw_line(&mut self, _window: Window, _from: (i32, i32), _to: (i32, i32), _focused: bool) -> Result<()> {
        Ok(())
    }

    fn text_width(&mut self, text: &str) -> Result<u32> {
        Ok(text.chars().count() as u32 * CHAR_WIDTH)
    }

    fn shape_supported(&self) -> bool {
        false
    }

    fn query_shaped(&mut self, _window: Window) -> Result<bool> {
        Ok(false)
    }

    fn shape_frame(&mut self, _frame: Window, _client: Window, _offset: (i32, i32), _rects: &[Geometry]) -> Result<()> {
        Ok(())
    }

    fn client_colormap(&mut self, _window: Window) -> Result<Option<Colormap>> {
        Ok(None)
    }

    fn installed_colormaps(&mut self, _window: Window) -> Result<Vec<Colormap>> {
        Ok(Vec::new())
    }

    fn install_colormap(&mut self, _colormap: Colormap) -> Result<()> {
        Ok(())
    }

    fn uninstall_colormap(&mut self, _colormap: Colormap) -> Result<()> {
        Ok(())
    }
}

/// Hands out pixmap ids and tracks which are still live.
#[derive(Debug, Default)]
pub(crate) struct FakeRenderer {
    next: Pixmap,
    live: HashSet<Pixmap>,
    /// Releases of ids that were not live.
    pub double_frees: usize,
    /// Renders left before the next one fails.
    pub fail_after: Option<usize>,
}

impl DecorationRenderer for FakeRenderer {
    fn render(&mut self, _size: Size, _texture: &Texture) -> Result<Pixmap> {
        if let Some(left) = self.fail_after.as_mut() {
            if *left == 0 {
                bail!("render refused");
            }
            *left -= 1;
        }
        self.next += 1;
        let pixmap = 0x9000 + self.next;
        self.live.insert(pixmap);
        Ok(pixmap)
    }

    fn release(&mut self, pixmap: Pixmap) -> Result<()> {
        if !self.live.remove(&pixmap) {
            self.double_frees += 1;
        }
        Ok(())
    }
}

/// A window manager over the fake server, a 1280x1024 screen and four
/// workspaces.
pub(crate) struct Harness {
    wm: WindowManager<FakeServer, FakeRenderer, Workspaces>,
}

impl Harness {
    pub fn new() -> Self {
        let mut harness = Self::starting_up();
        harness.wm.host_mut().finish_startup();
        harness
    }

    /// Harness still adopting pre-existing windows.
    pub fn starting_up() -> Self {
        let config = Config::default();
        let style = Style::new(&config.style, &config.behavior, FontMetrics { ascent: 10, descent: 3 });
        let host = Workspaces::new(4, Size::new(1280, 1024), 0);
        Self {
            wm: WindowManager::new(FakeServer::new(), FakeRenderer::default(), host, style),
        }
    }

    pub fn server(&mut self) -> &mut FakeServer {
        self.wm.conn_mut()
    }

    pub fn style(&self) -> &Style {
        self.wm.style()
    }

    pub fn host(&self) -> &Workspaces {
        self.wm.host()
    }

    pub fn root(&self) -> Window {
        ROOT
    }

    /// Create a client of the given size and ask for it to be mapped.
    pub fn map_client(&mut self, width: u32, height: u32) -> ClientId {
        let window = self.server().next_client(width, height);
        self.event(WmEvent::MapRequest { window });
        ClientId(window)
    }

    pub fn window(&self, id: ClientId) -> &ManagedWindow {
        self.wm.window(id).expect("window is managed")
    }

    pub fn is_managed(&self, id: ClientId) -> bool {
        self.wm.window(id).is_some()
    }

    pub fn with_window<T>(
        &mut self,
        id: ClientId,
        op: impl FnOnce(&mut ManagedWindow, &mut Ctx<'_>) -> WindowResult<T>,
    ) -> Option<T> {
        let value = self.wm.run(id, op);
        self.wm.drain_followups();
        value
    }

    pub fn event(&mut self, event: WmEvent) {
        self.wm.handle_event(event);
    }

    pub fn focus(&mut self, id: ClientId) -> bool {
        self.wm.focus(id)
    }

    pub fn move_frame(&mut self, id: ClientId, x: i32, y: i32) {
        self.with_window(id, |window, ctx| {
            let frame = window.frame_geometry();
            window.configure_frame(ctx, Geometry::new(x, y, frame.width, frame.height))
        });
    }

    pub fn motion(&mut self, event: MotionEvent) {
        self.event(WmEvent::Motion(event));
    }

    /// Button press one pixel inside `window`.
    pub fn press(&mut self, window: Window, button: u8, state: Modifiers) {
        self.event(WmEvent::ButtonPress(ButtonEvent {
            window,
            button,
            x: 1,
            y: 1,
            root_x: 0,
            root_y: 0,
            state,
        }));
    }

    /// Button release one pixel inside `window`.
    pub fn release(&mut self, window: Window, button: u8, state: Modifiers) {
        self.event(WmEvent::ButtonRelease(ButtonEvent {
            window,
            button,
            x: 1,
            y: 1,
            root_x: 0,
            root_y: 0,
            state,
        }));
    }

    pub fn grab_lost(&mut self, window: Window) {
        self.event(WmEvent::GrabLost { window });
    }

    pub fn outlines_drawn(&mut self) -> usize {
        self.server()
            .calls
            .iter()
            .filter(|call| matches!(call, Call::Outline(_)))
            .count()
    }

    pub fn last_state(&mut self, id: ClientId) -> Option<StateRecord> {
        self.server().states.get(&id.window()).copied()
    }

    pub fn live_pixmaps(&self) -> usize {
        self.wm.renderer().live.len()
    }

    pub fn renderer(&mut self) -> &mut FakeRenderer {
        &mut self.wm.renderer
    }

    pub fn directory_is_empty(&self) -> bool {
        self.wm.directory().is_empty()
    }
}

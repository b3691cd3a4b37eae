//! Window decorations: the frame's sub-windows, their background surfaces,
//! the title bar buttons and title text.

use anyhow::Result;
use tracing::debug;

use crate::config::Justify;
use crate::shared::{Geometry, Size};
use crate::wm::client::ManagedWindow;
use crate::wm::client_flags::Decorations;
use crate::wm::connection::{Pixmap, Window, WindowChanges};
use crate::wm::layout::FrameLayout;
use crate::wm::render::Texture;
use crate::wm::Ctx;

/// Space around each title bar button.
const BUTTON_PAD: u32 = 4;

/// Handles of the manager-created windows around one client.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameWindows {
    pub frame: Window,
    pub title: Option<Window>,
    pub border: Option<Window>,
    pub handle: Option<Window>,
    pub grip: Option<Window>,
    pub iconify_button: Option<Window>,
    pub maximize_button: Option<Window>,
    pub close_button: Option<Window>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonType {
    Iconify,
    Maximize,
    Close,
}

/// Which part of a managed window an event landed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Part {
    Client,
    Frame,
    Title,
    Border,
    Handle,
    Grip,
    Button(ButtonType),
}

impl Part {
    /// Parts that start a move and raise on click.
    pub fn is_grabbable(self) -> bool {
        matches!(self, Part::Title | Part::Border | Part::Handle)
    }
}

impl FrameWindows {
    /// Check if a window ID belongs to this frame
    pub fn contains(&self, window: Window) -> bool {
        self.part(window).is_some()
    }

    pub fn part(&self, window: Window) -> Option<Part> {
        if window == self.frame {
            return Some(Part::Frame);
        }
        let candidates = [
            (self.title, Part::Title),
            (self.border, Part::Border),
            (self.handle, Part::Handle),
            (self.grip, Part::Grip),
            (self.iconify_button, Part::Button(ButtonType::Iconify)),
            (self.maximize_button, Part::Button(ButtonType::Maximize)),
            (self.close_button, Part::Button(ButtonType::Close)),
        ];
        candidates
            .into_iter()
            .find_map(|(handle, part)| (handle == Some(window)).then_some(part))
    }

    pub fn button(&self, button: ButtonType) -> Option<Window> {
        match button {
            ButtonType::Iconify => self.iconify_button,
            ButtonType::Maximize => self.maximize_button,
            ButtonType::Close => self.close_button,
        }
    }

    fn button_slot(&mut self, button: ButtonType) -> &mut Option<Window> {
        match button {
            ButtonType::Iconify => &mut self.iconify_button,
            ButtonType::Maximize => &mut self.maximize_button,
            ButtonType::Close => &mut self.close_button,
        }
    }

    /// Position of a sub-window relative to the frame interior.
    pub fn origin_of(&self, part: Part, layout: &FrameLayout) -> (i32, i32) {
        let geometry = match part {
            Part::Title => layout.title,
            Part::Border => layout.border,
            Part::Handle => layout.handle,
            Part::Grip => layout.grip,
            _ => None,
        };
        geometry.map(|g| (g.x, g.y)).unwrap_or((0, 0))
    }
}

/// Background pixmaps owned by one managed window.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Surfaces {
    pub title_focus: Option<Pixmap>,
    pub title_unfocus: Option<Pixmap>,
    pub frame: Option<Pixmap>,
    pub handle_focus: Option<Pixmap>,
    pub handle_unfocus: Option<Pixmap>,
    pub grip_focus: Option<Pixmap>,
    pub grip_unfocus: Option<Pixmap>,
    pub button_focus: Option<Pixmap>,
    pub button_unfocus: Option<Pixmap>,
    pub button_pressed: Option<Pixmap>,
}

impl Surfaces {
    fn slots(&mut self) -> [&mut Option<Pixmap>; 10] {
        [
            &mut self.title_focus,
            &mut self.title_unfocus,
            &mut self.frame,
            &mut self.handle_focus,
            &mut self.handle_unfocus,
            &mut self.grip_focus,
            &mut self.grip_unfocus,
            &mut self.button_focus,
            &mut self.button_unfocus,
            &mut self.button_pressed,
        ]
    }

    pub fn live(&self) -> usize {
        let mut copy = *self;
        copy.slots().iter().filter(|slot| slot.is_some()).count()
    }
}

/// Render a replacement surface, then release the old one.
fn replace(ctx: &mut Ctx<'_>, slot: &mut Option<Pixmap>, size: Option<Size>, texture: &Texture) -> Result<()> {
    let fresh = match size {
        Some(size) if size.width > 0 && size.height > 0 => Some(ctx.renderer.render(size, texture)?),
        _ => None,
    };
    if let Some(old) = std::mem::replace(slot, fresh) {
        ctx.renderer.release(old)?;
    }
    Ok(())
}

/// Where the title text starts and how much of it fits.
pub fn title_placement(
    justify: Justify,
    title_width: u32,
    button: u32,
    text_width: u32,
    title: &str,
    measure: &mut dyn FnMut(&str) -> Result<u32>,
) -> Result<(i32, usize)> {
    let (tw, bw, text) = (title_width as i32, button as i32, text_width as i32);
    let pad = BUTTON_PAD as i32;

    let mut x = match justify {
        Justify::Left => bw + 6,
        Justify::Right => tw - (text + (bw + pad) * 2 + pad),
        Justify::Center => (tw - (text + bw + 6)) / 2,
    };

    let crowded = if tw > (bw + pad) * 6 {
        text + pad + ((bw + pad) * 3 + 2) > tw
    } else {
        text + 8 > tw
    };
    if !crowded {
        return Ok((x, title.len()));
    }

    x = 4;
    let mut cut = title.len();
    loop {
        if measure(&title[..cut])? + 8 < title_width || cut == 0 {
            return Ok((x, cut));
        }
        cut = title[..cut].char_indices().last().map(|(i, _)| i).unwrap_or(0);
    }
}

impl ManagedWindow {
    /// Create title, border, handle and grip windows for the current flags.
    pub(crate) fn create_decoration_windows(&mut self, ctx: &mut Ctx<'_>, layout: &FrameLayout) -> Result<()> {
        let (frame, id) = (self.windows.frame, self.id);
        let pixel = ctx.style.border_color;
        let create = |ctx: &mut Ctx<'_>, geometry: Option<Geometry>| -> Result<Option<Window>> {
            match geometry {
                Some(g) => {
                    let window = ctx.conn.create_child(frame, g, 0, pixel)?;
                    ctx.directory.register(window, id);
                    Ok(Some(window))
                }
                None => Ok(None),
            }
        };
        self.windows.title = create(ctx, layout.title)?;
        self.windows.border = create(ctx, layout.border)?;
        self.windows.handle = create(ctx, layout.handle)?;
        self.windows.grip = create(ctx, layout.grip)?;
        Ok(())
    }

    /// Bring the set of button windows in line with the decoration flags.
    pub(crate) fn sync_buttons(&mut self, ctx: &mut Ctx<'_>) -> Result<()> {
        for (button, flag) in [
            (ButtonType::Iconify, Decorations::ICONIFY),
            (ButtonType::Maximize, Decorations::MAXIMIZE),
            (ButtonType::Close, Decorations::CLOSE),
        ] {
            let wanted = self.metrics.has(flag) && self.windows.title.is_some();
            let existing = self.windows.button(button);
            match (wanted, existing, self.windows.title) {
                (true, None, Some(title)) => {
                    let size = self.metrics.button_size;
                    let window = ctx.conn.create_child(
                        title,
                        Geometry::new(0, 0, size, size),
                        1,
                        ctx.style.border_color,
                    )?;
                    ctx.directory.register(window, self.id);
                    *self.windows.button_slot(button) = Some(window);
                    debug!("Created {:?} button for {:#x}", button, self.client);
                }
                (false, Some(window), _) => {
                    ctx.directory.unregister(window);
                    ctx.conn.destroy_window(window)?;
                    *self.windows.button_slot(button) = None;
                }
                _ => {}
            }
        }
        Ok(())
    }

    /// Destroy every decoration window except the frame itself.
    pub(crate) fn destroy_decoration_windows(&mut self, ctx: &mut Ctx<'_>) -> Result<()> {
        let windows = [
            self.windows.close_button.take(),
            self.windows.iconify_button.take(),
            self.windows.maximize_button.take(),
            self.windows.title.take(),
            self.windows.grip.take(),
            self.windows.handle.take(),
            self.windows.border.take(),
        ];
        for window in windows.into_iter().flatten() {
            ctx.directory.unregister(window);
            ctx.conn.destroy_window(window)?;
        }
        Ok(())
    }

    /// Move and resize sub-windows and the client after a frame resize.
    pub(crate) fn layout_subwindows(&mut self, ctx: &mut Ctx<'_>) -> Result<()> {
        let layout = self.metrics.layout(self.client_geometry.size());
        let pairs = [
            (self.windows.title, layout.title),
            (self.windows.border, layout.border),
            (self.windows.handle, layout.handle),
            (self.windows.grip, layout.grip),
        ];
        for (window, geometry) in pairs {
            if let (Some(window), Some(geometry)) = (window, geometry) {
                ctx.conn.configure_window(window, &WindowChanges::geometry(geometry))?;
            }
        }
        let (x, y) = layout.client_in_parent;
        ctx.conn.configure_window(
            self.client,
            &WindowChanges::geometry(Geometry::new(x, y, layout.client.width, layout.client.height)),
        )?;
        Ok(())
    }

    /// Show the buttons when the title has room for them and the text.
    pub(crate) fn position_buttons(&mut self, ctx: &mut Ctx<'_>) -> Result<()> {
        let title_w = self.frame_geometry.width;
        let size = self.metrics.button_size;
        let slot = size + BUTTON_PAD;
        let fits = title_w > slot * 6 && self.title_width + BUTTON_PAD + (slot * 3 + 2) < title_w;

        if !fits {
            for button in [ButtonType::Iconify, ButtonType::Maximize, ButtonType::Close] {
                if let Some(window) = self.windows.button(button) {
                    ctx.conn.unmap_window(window)?;
                }
            }
            return Ok(());
        }

        let place = |ctx: &mut Ctx<'_>, window: Window, x: i32| -> Result<()> {
            ctx.conn.configure_window(window, &WindowChanges::geometry(Geometry::new(x, 2, size, size)))?;
            ctx.conn.map_window(window)?;
            ctx.conn.clear_window(window)
        };

        if let Some(window) = self.windows.iconify_button {
            place(ctx, window, 2)?;
        }
        let mut bx = title_w as i32 - slot as i32;
        if let Some(window) = self.windows.close_button {
            place(ctx, window, bx)?;
            bx -= slot as i32;
        }
        if let Some(window) = self.windows.maximize_button {
            place(ctx, window, bx)?;
        }
        Ok(())
    }

    /// Re-render every surface for the current geometry.
    pub(crate) fn render_surfaces(&mut self, ctx: &mut Ctx<'_>) -> Result<()> {
        let layout = self.metrics.layout(self.client_geometry.size());
        let style = ctx.style;
        let size_of = |g: Option<Geometry>| g.map(|g| g.size());
        let button = self.metrics.has(Decorations::TITLEBAR).then(|| {
            Size::new(self.metrics.button_size, self.metrics.button_size)
        });

        // Slots are updated in place: a failed render leaves no released id behind.
        let s = &mut self.surfaces;
        replace(ctx, &mut s.title_focus, size_of(layout.title), &style.title_focus)?;
        replace(ctx, &mut s.title_unfocus, size_of(layout.title), &style.title_unfocus)?;
        replace(ctx, &mut s.frame, size_of(layout.border), &style.frame)?;
        replace(ctx, &mut s.handle_focus, size_of(layout.handle), &style.handle_focus)?;
        replace(ctx, &mut s.handle_unfocus, size_of(layout.handle), &style.handle_unfocus)?;
        replace(ctx, &mut s.grip_focus, size_of(layout.grip), &style.button_focus)?;
        replace(ctx, &mut s.grip_unfocus, size_of(layout.grip), &style.button_unfocus)?;
        replace(ctx, &mut s.button_focus, button, &style.button_focus)?;
        replace(ctx, &mut s.button_unfocus, button, &style.button_unfocus)?;
        replace(ctx, &mut s.button_pressed, button, &style.button_pressed)?;

        if let Some(border) = self.windows.border {
            ctx.conn.set_background_pixmap(border, self.surfaces.frame)?;
            ctx.conn.clear_window(border)?;
        }
        Ok(())
    }

    pub(crate) fn release_surfaces(&mut self, ctx: &mut Ctx<'_>) -> Result<()> {
        for slot in self.surfaces.slots() {
            if let Some(pixmap) = slot.take() {
                ctx.renderer.release(pixmap)?;
            }
        }
        Ok(())
    }

    /// Apply focused or unfocused surfaces and redraw text and buttons.
    pub(crate) fn paint_decorations(&mut self, ctx: &mut Ctx<'_>) -> Result<()> {
        let s = self.surfaces;
        let focused = self.focused;
        let pick = |f: Option<Pixmap>, u: Option<Pixmap>| if focused { f } else { u };

        if let Some(title) = self.windows.title {
            ctx.conn.set_background_pixmap(title, pick(s.title_focus, s.title_unfocus))?;
            ctx.conn.clear_window(title)?;
        }
        if let (Some(handle), Some(grip)) = (self.windows.handle, self.windows.grip) {
            ctx.conn.set_background_pixmap(handle, pick(s.handle_focus, s.handle_unfocus))?;
            ctx.conn.set_background_pixmap(grip, pick(s.grip_focus, s.grip_unfocus))?;
            ctx.conn.clear_window(handle)?;
            ctx.conn.clear_window(grip)?;
        }
        self.draw_title(ctx)?;
        self.draw_all_buttons(ctx)
    }

    pub(crate) fn draw_title(&mut self, ctx: &mut Ctx<'_>) -> Result<()> {
        let Some(title) = self.windows.title else {
            return Ok(());
        };
        let conn = &mut *ctx.conn;
        let (x, len) = title_placement(
            ctx.style.justify,
            self.frame_geometry.width,
            self.metrics.button_size,
            self.title_width,
            &self.title,
            &mut |text| conn.text_width(text),
        )?;
        let y = (ctx.style.font.ascent + self.metrics.bevel) as i32;
        ctx.conn.draw_text(title, x, y, &self.title[..len], self.focused)?;
        Ok(())
    }

    pub(crate) fn draw_all_buttons(&mut self, ctx: &mut Ctx<'_>) -> Result<()> {
        for button in [ButtonType::Iconify, ButtonType::Maximize, ButtonType::Close] {
            self.draw_button(ctx, button, false)?;
        }
        Ok(())
    }

    pub(crate) fn draw_button(&mut self, ctx: &mut Ctx<'_>, button: ButtonType, pressed: bool) -> Result<()> {
        let Some(window) = self.windows.button(button) else {
            return Ok(());
        };
        let s = self.surfaces;
        let background = match (pressed, self.focused) {
            (true, _) => s.button_pressed,
            (false, true) => s.button_focus,
            (false, false) => s.button_unfocus,
        };
        ctx.conn.set_background_pixmap(window, background)?;
        ctx.conn.clear_window(window)?;

        let b = self.metrics.button_size as i32;
        let focused = self.focused;
        match button {
            ButtonType::Iconify => {
                ctx.conn.draw_rectangle(window, glyph_rect(2, b - 5, b - 5, 2), focused)?;
            }
            ButtonType::Maximize => {
                ctx.conn.draw_rectangle(window, glyph_rect(2, 2, b - 5, b - 5), focused)?;
                ctx.conn.draw_line(window, (2, 3), (b - 3, 3), focused)?;
            }
            ButtonType::Close => {
                ctx.conn.draw_line(window, (2, 2), (b - 3, b - 3), focused)?;
                ctx.conn.draw_line(window, (2, b - 3), (b - 3, 2), focused)?;
            }
        }
        Ok(())
    }

    /// Combine the client's shape with the title and handle areas.
    pub(crate) fn apply_shape(&mut self, ctx: &mut Ctx<'_>) -> Result<()> {
        if !self.shaped || !ctx.conn.shape_supported() {
            return Ok(());
        }
        let layout = self.metrics.layout(self.client_geometry.size());
        let mut rects = vec![Geometry::new(0, 0, layout.frame.width, self.metrics.y_border)];
        if let (Some(handle), Some(grip)) = (layout.handle, layout.grip) {
            rects.push(Geometry::new(handle.x, handle.y, handle.width, handle.height + grip.height + 1));
        }
        ctx.conn.shape_frame(self.windows.frame, self.client, layout.client.origin(), &rects)
    }
}

fn glyph_rect(x: i32, y: i32, w: i32, h: i32) -> Geometry {
    Geometry::new(x, y, w.max(0) as u32, h.max(0) as u32)
}

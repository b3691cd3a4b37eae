//! Server-side pixmap rendering of decoration textures.

use std::sync::Arc;

use anyhow::Result;
use x11rb::connection::Connection;
use x11rb::protocol::xproto::{ChangeGCAux, ConnectionExt, CoordMode, CreateGCAux, Gcontext, Point, Rectangle};
use x11rb::rust_connection::RustConnection;

use crate::shared::Size;
use crate::wm::connection::{Pixmap, Window};
use crate::wm::render::{Bevel, DecorationRenderer, Fill, Texture};

/// Renders textures with core drawing requests into pixmaps of the root
/// depth. Colours are used as TrueColor pixel values.
pub struct PixmapRenderer {
    conn: Arc<RustConnection>,
    root: Window,
    depth: u8,
    gc: Gcontext,
}

impl PixmapRenderer {
    pub fn new(conn: Arc<RustConnection>, root: Window, depth: u8) -> Result<Self> {
        let gc = conn.generate_id()?;
        conn.create_gc(gc, root, &CreateGCAux::new().graphics_exposures(0u32))?;
        Ok(Self { conn, root, depth, gc })
    }

    fn foreground(&self, pixel: u32) -> Result<()> {
        self.conn.change_gc(self.gc, &ChangeGCAux::new().foreground(pixel))?;
        Ok(())
    }

    fn fill(&self, pixmap: Pixmap, size: Size, texture: &Texture) -> Result<()> {
        match texture.fill {
            Fill::Solid => {
                self.foreground(texture.color)?;
                self.conn.poly_fill_rectangle(
                    pixmap,
                    self.gc,
                    &[Rectangle {
                        x: 0,
                        y: 0,
                        width: size.width as u16,
                        height: size.height as u16,
                    }],
                )?;
            }
            Fill::Gradient => {
                let right = (size.width - 1) as i16;
                for row in 0..size.height {
                    self.foreground(blend(texture.color, texture.color_to, row, size.height))?;
                    let y = row as i16;
                    self.conn.poly_line(
                        CoordMode::ORIGIN,
                        pixmap,
                        self.gc,
                        &[Point { x: 0, y }, Point { x: right, y }],
                    )?;
                }
            }
        }
        Ok(())
    }

    fn bevel(&self, pixmap: Pixmap, size: Size, texture: &Texture) -> Result<()> {
        let (top_left, bottom_right) = match texture.bevel {
            Bevel::Flat => return Ok(()),
            Bevel::Raised => (lighter(texture.color), darker(texture.color_to)),
            Bevel::Sunken => (darker(texture.color), lighter(texture.color_to)),
        };
        let right = (size.width - 1) as i16;
        let bottom = (size.height - 1) as i16;
        let origin = CoordMode::ORIGIN;

        self.foreground(top_left)?;
        self.conn.poly_line(
            origin,
            pixmap,
            self.gc,
            &[Point { x: 0, y: bottom }, Point { x: 0, y: 0 }, Point { x: right, y: 0 }],
        )?;
        self.foreground(bottom_right)?;
        self.conn.poly_line(
            origin,
            pixmap,
            self.gc,
            &[Point { x: right, y: 1 }, Point { x: right, y: bottom }, Point { x: 1, y: bottom }],
        )?;
        Ok(())
    }
}

impl DecorationRenderer for PixmapRenderer {
    fn render(&mut self, size: Size, texture: &Texture) -> Result<Pixmap> {
        let size = Size {
            width: size.width.clamp(1, u32::from(u16::MAX)),
            height: size.height.clamp(1, u32::from(u16::MAX)),
        };
        let pixmap = self.conn.generate_id()?;
        self.conn
            .create_pixmap(self.depth, pixmap, self.root, size.width as u16, size.height as u16)?;
        self.fill(pixmap, size, texture)?;
        self.bevel(pixmap, size, texture)?;
        Ok(pixmap)
    }

    fn release(&mut self, pixmap: Pixmap) -> Result<()> {
        self.conn.free_pixmap(pixmap)?;
        Ok(())
    }
}

impl Drop for PixmapRenderer {
    fn drop(&mut self) {
        let _ = self.conn.free_gc(self.gc);
    }
}

fn channels(color: u32) -> [u32; 3] {
    [(color >> 16) & 0xff, (color >> 8) & 0xff, color & 0xff]
}

fn pack([r, g, b]: [u32; 3]) -> u32 {
    (r.min(0xff) << 16) | (g.min(0xff) << 8) | b.min(0xff)
}

/// Colour of `row` out of `rows` on a vertical blend from `from` to `to`.
fn blend(from: u32, to: u32, row: u32, rows: u32) -> u32 {
    if rows <= 1 {
        return from;
    }
    let span = rows - 1;
    let [a, b] = [channels(from), channels(to)];
    let mix = |i: usize| (a[i] * (span - row) + b[i] * row) / span;
    pack([mix(0), mix(1), mix(2)])
}

fn lighter(color: u32) -> u32 {
    let [r, g, b] = channels(color);
    pack([r + (r >> 1), g + (g >> 1), b + (b >> 1)])
}

fn darker(color: u32) -> u32 {
    let [r, g, b] = channels(color);
    pack([(r >> 2) + (r >> 1), (g >> 2) + (g >> 1), (b >> 2) + (b >> 1)])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blend_endpoints() {
        assert_eq!(blend(0x000000, 0xffffff, 0, 11), 0x000000);
        assert_eq!(blend(0x000000, 0xffffff, 10, 11), 0xffffff);
        assert_eq!(blend(0x102030, 0x405060, 0, 1), 0x102030);
    }

    #[test]
    fn test_blend_midpoint() {
        assert_eq!(blend(0x000000, 0x00c864, 1, 3), 0x006432);
    }

    #[test]
    fn test_bevel_shades_saturate() {
        assert_eq!(lighter(0x808080), 0xc0c0c0);
        assert_eq!(lighter(0xf0f0f0), 0xffffff);
        assert_eq!(darker(0x808080), 0x606060);
    }
}

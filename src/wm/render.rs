//! Decoration surfaces.
//!
//! A [`DecorationRenderer`] turns a size and a [`Texture`] into a pixmap that
//! decoration windows use as background. It holds no window state.

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::shared::Size;
use crate::wm::connection::Pixmap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Fill {
    Solid,
    /// Vertical blend from `color` to `color_to`.
    Gradient,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Bevel {
    Flat,
    Raised,
    Sunken,
}

/// Texture descriptor, colours as 0xRRGGBB.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Texture {
    pub fill: Fill,
    pub bevel: Bevel,
    pub color: u32,
    pub color_to: u32,
}

impl Texture {
    pub const fn solid(color: u32) -> Self {
        Self {
            fill: Fill::Solid,
            bevel: Bevel::Flat,
            color,
            color_to: color,
        }
    }

    pub const fn gradient(color: u32, color_to: u32, bevel: Bevel) -> Self {
        Self {
            fill: Fill::Gradient,
            bevel,
            color,
            color_to,
        }
    }
}

pub trait DecorationRenderer {
    fn render(&mut self, size: Size, texture: &Texture) -> Result<Pixmap>;

    fn release(&mut self, pixmap: Pixmap) -> Result<()>;
}

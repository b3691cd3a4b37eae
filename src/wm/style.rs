//! Resolved decoration style: configuration plus server font metrics.

use crate::config::{BehaviorConfig, Justify, StyleConfig};
use crate::wm::render::Texture;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FontMetrics {
    pub ascent: u32,
    pub descent: u32,
}

impl FontMetrics {
    pub fn height(&self) -> u32 {
        self.ascent + self.descent
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Style {
    pub font: FontMetrics,
    pub bevel_width: u32,
    pub handle_width: u32,
    pub justify: Justify,
    pub border_color: u32,
    pub title_focus: Texture,
    pub title_unfocus: Texture,
    pub handle_focus: Texture,
    pub handle_unfocus: Texture,
    pub button_focus: Texture,
    pub button_unfocus: Texture,
    pub button_pressed: Texture,
    pub frame: Texture,
    pub opaque_move: bool,
}

impl Style {
    pub fn new(style: &StyleConfig, behavior: &BehaviorConfig, font: FontMetrics) -> Self {
        Self {
            font,
            bevel_width: style.bevel_width,
            handle_width: style.handle_width,
            justify: style.justify,
            border_color: style.border_color,
            title_focus: style.title_focus,
            title_unfocus: style.title_unfocus,
            handle_focus: style.handle_focus,
            handle_unfocus: style.handle_unfocus,
            button_focus: style.button_focus,
            button_unfocus: style.button_unfocus,
            button_pressed: style.button_pressed,
            frame: style.frame,
            opaque_move: behavior.opaque_move,
        }
    }
}

//! Configuration system for boxwm
//!
//! Loads configuration from TOML file at `~/.config/boxwm/config.toml`
//! Auto-generates default config file on first run if missing.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::wm::render::{Bevel, Texture};

/// Main configuration structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub style: StyleConfig,
    pub behavior: BehaviorConfig,
}

impl Config {
    /// Load configuration from file, or use defaults if file doesn't exist
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        if !config_path.exists() {
            info!("Config file not found at {:?}, using defaults", config_path);
            // Auto-generate default config file
            if let Err(e) = Self::save_default(&config_path) {
                warn!("Failed to create default config file: {}", e);
            }
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&config_path)
            .context("Failed to read config file")?;

        let config = Self::parse(&content)?;

        info!("Configuration loaded from {:?}", config_path);
        debug!("Config: {:?}", config);

        Ok(config)
    }

    /// Parse a configuration document; missing keys take their defaults.
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse config file")
    }

    /// Get the path to the config file
    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Failed to get config directory")?
            .join("boxwm");

        Ok(config_dir.join("config.toml"))
    }

    /// Save default configuration to file
    fn save_default(path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .context("Failed to create config directory")?;
        }

        let toml_string = toml::to_string_pretty(&Self::default())
            .context("Failed to serialize default config")?;

        fs::write(path, toml_string)
            .context("Failed to write default config file")?;

        info!("Created default config file at {:?}", path);
        Ok(())
    }
}

/// Title text placement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Justify {
    #[default]
    Left,
    Center,
    Right,
}

/// Decoration style
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StyleConfig {
    /// Core X font used for titles and the resize label
    pub font: String,
    pub bevel_width: u32,
    pub handle_width: u32,
    pub justify: Justify,
    /// Frame border colour (hex: 0xRRGGBB)
    pub border_color: u32,
    pub focus_text_color: u32,
    pub unfocus_text_color: u32,
    pub title_focus: Texture,
    pub title_unfocus: Texture,
    pub handle_focus: Texture,
    pub handle_unfocus: Texture,
    pub button_focus: Texture,
    pub button_unfocus: Texture,
    pub button_pressed: Texture,
    pub frame: Texture,
}

impl Default for StyleConfig {
    fn default() -> Self {
        Self {
            font: "fixed".to_string(),
            bevel_width: 4,
            handle_width: 8,
            justify: Justify::Left,
            border_color: 0x000000,
            focus_text_color: 0xffffff,
            unfocus_text_color: 0xc0c0c0,
            title_focus: Texture::gradient(0x5e81ac, 0x2e3440, Bevel::Raised),
            title_unfocus: Texture::gradient(0x4c566a, 0x3b4252, Bevel::Raised),
            handle_focus: Texture::gradient(0x5e81ac, 0x2e3440, Bevel::Raised),
            handle_unfocus: Texture::gradient(0x4c566a, 0x3b4252, Bevel::Raised),
            button_focus: Texture::gradient(0x81a1c1, 0x5e81ac, Bevel::Raised),
            button_unfocus: Texture::gradient(0x616e88, 0x4c566a, Bevel::Raised),
            button_pressed: Texture::gradient(0x2e3440, 0x5e81ac, Bevel::Sunken),
            frame: Texture::solid(0x3b4252),
        }
    }
}

/// Window behaviour
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BehaviorConfig {
    /// Move windows live instead of dragging an outline
    pub opaque_move: bool,
    pub workspaces: usize,
    /// Height kept free at the bottom of the screen when maximizing
    pub reserved_height: u32,
}

impl Default for BehaviorConfig {
    fn default() -> Self {
        Self {
            opaque_move: false,
            workspaces: 4,
            reserved_height: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_document_keeps_defaults() {
        let config = Config::parse(
            r#"
            [style]
            bevel_width = 2
            justify = "center"

            [behavior]
            opaque_move = true
            "#,
        )
        .unwrap();
        assert_eq!(config.style.bevel_width, 2);
        assert_eq!(config.style.justify, Justify::Center);
        assert_eq!(config.style.handle_width, StyleConfig::default().handle_width);
        assert!(config.behavior.opaque_move);
        assert_eq!(config.behavior.workspaces, 4);
    }

    #[test]
    fn test_default_document_parses_back() {
        let text = toml::to_string_pretty(&Config::default()).unwrap();
        assert_eq!(Config::parse(&text).unwrap(), Config::default());
    }

    #[test]
    fn test_texture_syntax() {
        let config = Config::parse(
            r#"
            [style.frame]
            fill = "gradient"
            bevel = "sunken"
            color = 0x102030
            color_to = 0x405060
            "#,
        )
        .unwrap();
        assert_eq!(config.style.frame, Texture::gradient(0x102030, 0x405060, Bevel::Sunken));
    }
}

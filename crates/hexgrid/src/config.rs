use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::geometry::{GridTopology, HexLayout};
use crate::light::LightParams;

pub const DEFAULT_MAX_FIND_PATH: u32 = 600;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error(transparent)]
    Json(#[from] JsonError),
    #[error("invalid settings: {0}")]
    Invalid(String),
}

#[derive(Debug, Error)]
#[error("{}", render_json_error(.origin, .json_path, .message))]
pub struct JsonError {
    pub origin: PathBuf,
    pub json_path: String,
    pub message: String,
}

fn render_json_error(origin: &Path, json_path: &str, message: &str) -> String {
    if json_path.is_empty() || json_path == "." {
        format!("parse {} json: {message}", origin.display())
    } else {
        format!("parse {} json at {json_path}: {message}", origin.display())
    }
}

pub(crate) fn decode_json<T: DeserializeOwned>(raw: &str, origin: &Path) -> Result<T, JsonError> {
    let mut deserializer = serde_json::Deserializer::from_str(raw);
    serde_path_to_error::deserialize::<_, T>(&mut deserializer).map_err(|error| {
        let json_path = error.path().to_string();
        JsonError {
            origin: origin.to_path_buf(),
            json_path,
            message: error.into_inner().to_string(),
        }
    })
}

/// Runtime switches that used to be separate client and editor builds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Capabilities {
    pub editing_features: bool,
    pub show_hidden_by_default: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HexSettings {
    pub topology: GridTopology,
    pub hex_width: i32,
    pub hex_height: i32,
    pub hex_line_height: i32,
    pub tile_offset_x: i32,
    pub tile_offset_y: i32,
    pub roof_offset_x: i32,
    pub roof_offset_y: i32,
    pub roof_skip_size: u16,
    pub roof_alpha: u8,
    pub screen_width: i32,
    pub screen_height: i32,
    pub sprites_zoom: f32,
    pub min_zoom: f32,
    pub max_zoom: f32,
    pub scroll_step: i32,
    pub scroll_check: bool,
    pub smooth_path: bool,
    pub max_find_path: u32,
    pub chosen_light: LightParams,
    pub light_soft_length: Option<u32>,
    pub show_tiles: bool,
    pub show_roofs: bool,
    pub show_items: bool,
    pub show_scenery: bool,
    pub show_walls: bool,
    pub show_critters: bool,
    pub show_fast: bool,
    pub hide_cursor_roof: bool,
}

impl Default for HexSettings {
    fn default() -> Self {
        Self {
            topology: GridTopology::Hexagonal,
            hex_width: 32,
            hex_height: 16,
            hex_line_height: 12,
            tile_offset_x: -8,
            tile_offset_y: 32,
            roof_offset_x: -8,
            roof_offset_y: -66,
            roof_skip_size: 2,
            roof_alpha: 200,
            screen_width: 800,
            screen_height: 600,
            sprites_zoom: 1.0,
            min_zoom: 0.2,
            max_zoom: 10.0,
            scroll_step: 12,
            scroll_check: true,
            smooth_path: true,
            max_find_path: DEFAULT_MAX_FIND_PATH,
            chosen_light: LightParams {
                color: 0,
                distance: 4,
                intensity: 2500,
                flags: 0,
            },
            light_soft_length: None,
            show_tiles: true,
            show_roofs: true,
            show_items: true,
            show_scenery: true,
            show_walls: true,
            show_critters: true,
            show_fast: true,
            hide_cursor_roof: true,
        }
    }
}

impl HexSettings {
    pub fn from_json_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&raw, path)
    }

    pub fn from_json_str(raw: &str, origin: &Path) -> Result<Self, ConfigError> {
        let settings = decode_json::<Self>(raw, origin)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.hex_width <= 0 || self.hex_height <= 0 || self.hex_line_height <= 0 {
            return Err(ConfigError::Invalid(format!(
                "hex dimensions must be positive, got {}x{} line {}",
                self.hex_width, self.hex_height, self.hex_line_height
            )));
        }
        if self.screen_width <= 0 || self.screen_height <= 0 {
            return Err(ConfigError::Invalid(format!(
                "screen size must be positive, got {}x{}",
                self.screen_width, self.screen_height
            )));
        }
        if !(self.min_zoom > 0.0 && self.min_zoom <= self.max_zoom) {
            return Err(ConfigError::Invalid(format!(
                "zoom limits must satisfy 0 < min <= max, got {}..{}",
                self.min_zoom, self.max_zoom
            )));
        }
        if !(self.min_zoom..=self.max_zoom).contains(&self.sprites_zoom) {
            return Err(ConfigError::Invalid(format!(
                "sprites_zoom {} outside {}..{}",
                self.sprites_zoom, self.min_zoom, self.max_zoom
            )));
        }
        if self.max_find_path == 0 {
            return Err(ConfigError::Invalid("max_find_path must be positive".to_string()));
        }
        if self.roof_skip_size == 0 {
            return Err(ConfigError::Invalid("roof_skip_size must be positive".to_string()));
        }
        Ok(())
    }

    pub fn layout(&self) -> HexLayout {
        HexLayout {
            topology: self.topology,
            hex_width: self.hex_width,
            hex_height: self.hex_height,
            line_height: self.hex_line_height,
        }
    }

    pub fn soft_light_length(&self) -> u32 {
        self.light_soft_length
            .unwrap_or(self.hex_width.max(0) as u32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let settings = HexSettings::default();
        settings.validate().expect("defaults valid");
        assert_eq!(settings.soft_light_length(), 32);
        assert_eq!(settings.layout(), HexLayout::default());
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let settings = HexSettings::from_json_str(
            r#"{ "topology": "square", "screen_width": 1024 }"#,
            Path::new("settings.json"),
        )
        .expect("parse settings");
        assert_eq!(settings.topology, GridTopology::Square);
        assert_eq!(settings.screen_width, 1024);
        assert_eq!(settings.hex_width, 32);
    }

    #[test]
    fn json_error_reports_field_path() {
        let error = HexSettings::from_json_str(
            r#"{ "chosen_light": { "distance": "far" } }"#,
            Path::new("settings.json"),
        )
        .expect_err("bad type");
        let message = error.to_string();
        assert!(message.contains("chosen_light.distance"), "{message}");
    }

    #[test]
    fn inverted_zoom_limits_are_rejected() {
        let settings = HexSettings {
            min_zoom: 2.0,
            max_zoom: 1.0,
            ..HexSettings::default()
        };
        assert!(matches!(settings.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn reads_settings_from_disk() {
        let temp = tempfile::TempDir::new().expect("tempdir");
        let path = temp.path().join("hex.json");
        fs::write(&path, r#"{ "hex_width": 48 }"#).expect("write settings");
        let settings = HexSettings::from_json_file(&path).expect("load settings");
        assert_eq!(settings.hex_width, 48);
        assert!(matches!(
            HexSettings::from_json_file(&temp.path().join("missing.json")),
            Err(ConfigError::Io { .. })
        ));
    }
}

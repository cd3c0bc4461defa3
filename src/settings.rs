use std::path::{Path, PathBuf};

use image::Rgba;

use crate::canvas::{BLACK, WHITE, color_to_str, str_to_color};
use crate::components::history::MAX_UNDO;
use crate::ops::ai::DEFAULT_SERVER_URL;

/// Application settings that persist across sessions
#[derive(Clone, Debug, PartialEq)]
pub struct AppSettings {
    /// Size of a new canvas
    pub canvas_width: u32,
    pub canvas_height: u32,
    /// Maximum number of undo steps
    pub max_undo_steps: usize,
    /// Initial stroke width
    pub pen_width: u32,
    /// Drawing color
    pub primary_color: Rgba<u8>,
    /// Eraser / background color
    pub secondary_color: Rgba<u8>,

    // AI completion
    /// Base URL of the inpainting service (trailing slash included)
    pub server_url: String,
    /// Model preselected for processing. Empty = first model the server reports.
    pub default_model: String,
    /// Extra post-processing passes requested from the service
    pub postprocess_value: u32,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            canvas_width: 256,
            canvas_height: 256,
            max_undo_steps: MAX_UNDO,
            pen_width: 3,
            primary_color: BLACK,
            secondary_color: WHITE,
            server_url: DEFAULT_SERVER_URL.to_string(),
            default_model: String::new(),
            postprocess_value: 0,
        }
    }
}

impl AppSettings {
    /// Path to the settings file.
    /// On Linux:   ~/.config/pixinpainter/pixinpainter_settings.cfg  (XDG_CONFIG_HOME respected)
    /// On Windows: %APPDATA%\PixInpainter\pixinpainter_settings.cfg
    /// On macOS:   ~/Library/Application Support/PixInpainter/pixinpainter_settings.cfg
    /// Fallback:   same directory as the executable.
    pub fn settings_path() -> Option<PathBuf> {
        #[cfg(target_os = "linux")]
        {
            let config_dir = std::env::var("XDG_CONFIG_HOME")
                .map(PathBuf::from)
                .unwrap_or_else(|_| {
                    let home = std::env::var("HOME").unwrap_or_else(|_| "~".to_string());
                    PathBuf::from(home).join(".config")
                })
                .join("pixinpainter");
            return Some(config_dir.join("pixinpainter_settings.cfg"));
        }
        #[cfg(target_os = "windows")]
        {
            let appdata = std::env::var("APPDATA")
                .or_else(|_| std::env::var("USERPROFILE"))
                .ok()?;
            return Some(
                PathBuf::from(appdata)
                    .join("PixInpainter")
                    .join("pixinpainter_settings.cfg"),
            );
        }
        #[cfg(target_os = "macos")]
        {
            let home = std::env::var("HOME").unwrap_or_else(|_| "~".to_string());
            return Some(
                PathBuf::from(home)
                    .join("Library")
                    .join("Application Support")
                    .join("PixInpainter")
                    .join("pixinpainter_settings.cfg"),
            );
        }
        #[cfg(not(any(target_os = "linux", target_os = "windows", target_os = "macos")))]
        {
            std::env::current_exe()
                .ok()
                .and_then(|p| p.parent().map(|d| d.join("pixinpainter_settings.cfg")))
        }
    }

    /// Render as `key=value` lines.
    pub fn to_config_string(&self) -> String {
        format!(
            "canvas_width={}\n\
             canvas_height={}\n\
             max_undo_steps={}\n\
             pen_width={}\n\
             primary_color={}\n\
             secondary_color={}\n\
             server_url={}\n\
             default_model={}\n\
             postprocess_value={}\n",
            self.canvas_width,
            self.canvas_height,
            self.max_undo_steps,
            self.pen_width,
            color_to_str(self.primary_color),
            color_to_str(self.secondary_color),
            self.server_url,
            self.default_model,
            self.postprocess_value,
        )
    }

    /// Parse `key=value` lines. Unknown keys, comments and malformed values
    /// are skipped, leaving the default in place.
    pub fn from_config_str(content: &str) -> Self {
        let mut s = Self::default();
        for line in content.lines() {
            let line = line.trim();
            if line.starts_with('#') {
                continue;
            }
            let Some((key, val)) = line.split_once('=') else { continue };
            let key = key.trim();
            let val = val.trim();
            match key {
                "canvas_width" => {
                    if let Ok(v) = val.parse::<u32>() && v > 0 { s.canvas_width = v; }
                }
                "canvas_height" => {
                    if let Ok(v) = val.parse::<u32>() && v > 0 { s.canvas_height = v; }
                }
                "max_undo_steps" => {
                    s.max_undo_steps = val.parse().unwrap_or(MAX_UNDO).max(1);
                }
                "pen_width" => {
                    s.pen_width = val.parse().unwrap_or(3).max(1);
                }
                "primary_color" => {
                    if let Some(c) = str_to_color(val) { s.primary_color = c; }
                }
                "secondary_color" => {
                    if let Some(c) = str_to_color(val) { s.secondary_color = c; }
                }
                "server_url" => {
                    if !val.is_empty() {
                        s.server_url = val.to_string();
                    }
                }
                "default_model" => {
                    s.default_model = val.to_string();
                }
                "postprocess_value" => {
                    s.postprocess_value = val.parse().unwrap_or(0);
                }
                _ => {}
            }
        }
        s
    }

    pub fn save_to(&self, path: &Path) -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, self.to_config_string())
    }

    /// Returns defaults if the file is missing or unreadable.
    pub fn load_from(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(content) => Self::from_config_str(&content),
            Err(_) => Self::default(),
        }
    }

    /// Save settings to the platform location
    pub fn save(&self) {
        let Some(path) = Self::settings_path() else { return };
        if let Err(e) = self.save_to(&path) {
            crate::log_warn!("Failed to save settings to {}: {}", path.display(), e);
        }
    }

    /// Load settings from the platform location (returns default if file missing or corrupt)
    pub fn load() -> Self {
        let Some(path) = Self::settings_path() else { return Self::default() };
        Self::load_from(&path)
    }
}

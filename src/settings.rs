use std::path::{Path, PathBuf};

use crate::color::Color;
use crate::components::grid::DEFAULT_GRID_GAP;
use crate::components::history::DEFAULT_HISTORY_SIZE;
use crate::components::tools::{DEFAULT_BRUSH_SIZE, ToolProperties, clamp_brush_size};

/// Persistent user preferences, stored as one `key=value` pair per line.
/// Unknown keys are ignored and unparsable values keep their defaults.
#[derive(Clone, Debug, PartialEq)]
pub struct AppSettings {
    pub max_undo_steps: usize,
    pub canvas_width: u32,
    pub canvas_height: u32,
    pub brush_size: f32,
    pub brush_color: Color,
    pub background: Color,
    pub smoothing: bool,
    pub grid_gap: u32,
    /// Font used for text insertion; empty means "probe system fonts".
    pub font_path: String,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            max_undo_steps: DEFAULT_HISTORY_SIZE,
            canvas_width: 800,
            canvas_height: 600,
            brush_size: DEFAULT_BRUSH_SIZE,
            brush_color: Color::BLACK,
            background: Color::WHITE,
            smoothing: true,
            grid_gap: DEFAULT_GRID_GAP,
            font_path: String::new(),
        }
    }
}

impl AppSettings {
    /// Path to the settings file.
    /// On Linux:   ~/.config/scribble/scribble_settings.cfg  (XDG_CONFIG_HOME respected)
    /// On Windows: %APPDATA%\Scribble\scribble_settings.cfg
    /// On macOS:   ~/Library/Application Support/Scribble/scribble_settings.cfg
    pub fn settings_path() -> Option<PathBuf> {
        #[cfg(target_os = "windows")]
        {
            let appdata = std::env::var("APPDATA")
                .or_else(|_| std::env::var("USERPROFILE"))
                .ok()?;
            return Some(PathBuf::from(appdata).join("Scribble").join("scribble_settings.cfg"));
        }
        #[cfg(target_os = "macos")]
        {
            let home = std::env::var("HOME").ok()?;
            return Some(
                PathBuf::from(home)
                    .join("Library")
                    .join("Application Support")
                    .join("Scribble")
                    .join("scribble_settings.cfg"),
            );
        }
        #[cfg(not(any(target_os = "windows", target_os = "macos")))]
        {
            let config_dir = std::env::var("XDG_CONFIG_HOME")
                .map(PathBuf::from)
                .or_else(|_| std::env::var("HOME").map(|h| PathBuf::from(h).join(".config")))
                .ok()?;
            Some(config_dir.join("scribble").join("scribble_settings.cfg"))
        }
    }

    /// Load from the default location (defaults if missing or unreadable).
    pub fn load() -> Self {
        match Self::settings_path() {
            Some(path) => Self::load_from(&path),
            None => Self::default(),
        }
    }

    pub fn load_from(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(content) => {
                log_info!("Settings loaded from {}", path.display());
                Self::parse(&content)
            }
            Err(_) => Self::default(),
        }
    }

    pub fn parse(content: &str) -> Self {
        let mut s = Self::default();
        for line in content.lines() {
            let Some((key, val)) = line.split_once('=') else { continue };
            let key = key.trim();
            let val = val.trim();
            match key {
                "max_undo_steps" => {
                    if let Ok(v) = val.parse::<usize>() && v > 0 {
                        s.max_undo_steps = v;
                    }
                }
                "canvas_width" => {
                    if let Ok(v) = val.parse::<u32>() && v > 0 {
                        s.canvas_width = v;
                    }
                }
                "canvas_height" => {
                    if let Ok(v) = val.parse::<u32>() && v > 0 {
                        s.canvas_height = v;
                    }
                }
                "brush_size" => {
                    s.brush_size = clamp_brush_size(val.parse().unwrap_or(DEFAULT_BRUSH_SIZE));
                }
                "brush_color" => {
                    if let Ok(c) = val.parse() { s.brush_color = c; }
                }
                "background" => {
                    if let Ok(c) = val.parse() { s.background = c; }
                }
                "smoothing" => {
                    s.smoothing = val == "true";
                }
                "grid_gap" => {
                    if let Ok(v) = val.parse::<u32>() && v >= 2 {
                        s.grid_gap = v;
                    }
                }
                "font_path" => {
                    s.font_path = val.to_string();
                }
                _ => {}
            }
        }
        s
    }

    pub fn to_config_string(&self) -> String {
        format!(
            "max_undo_steps={}\n\
             canvas_width={}\n\
             canvas_height={}\n\
             brush_size={}\n\
             brush_color={}\n\
             background={}\n\
             smoothing={}\n\
             grid_gap={}\n\
             font_path={}\n",
            self.max_undo_steps,
            self.canvas_width,
            self.canvas_height,
            self.brush_size,
            self.brush_color,
            self.background,
            self.smoothing,
            self.grid_gap,
            self.font_path,
        )
    }

    /// Save to the default location.
    pub fn save(&self) -> std::io::Result<()> {
        let path = Self::settings_path()
            .ok_or_else(|| std::io::Error::new(std::io::ErrorKind::NotFound, "no config directory"))?;
        self.save_to(&path)
    }

    pub fn save_to(&self, path: &Path) -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, self.to_config_string())
    }

    pub fn font_path(&self) -> Option<PathBuf> {
        (!self.font_path.is_empty()).then(|| PathBuf::from(&self.font_path))
    }

    /// Initial tool configuration derived from these settings.
    pub fn tool_properties(&self) -> ToolProperties {
        ToolProperties {
            size: clamp_brush_size(self.brush_size),
            color: self.brush_color,
            background: self.background,
            smoothing: self.smoothing,
            ..ToolProperties::default()
        }
    }
}

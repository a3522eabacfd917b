//! Startup configuration.
//!
//! All tunable options live in a single immutable [`Config`] struct that is
//! resolved once at startup (optionally from a TOML file) and passed by
//! reference into every component that needs it. Nothing re-reads
//! configuration after initialization.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::{info, warn};

use crate::error::{Error, Result};

/// RGBA clear color for the color attachment.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq)]
pub struct ClearColor(pub [f32; 4]);

impl Default for ClearColor {
    fn default() -> Self {
        Self([0.0, 0.0, 0.0, 1.0])
    }
}

/// Immutable startup configuration.
///
/// Deserialized from `viewer.toml` when present; every field has a default
/// so a missing or partial file is not an error. The struct is treated as
/// read-only for the process lifetime.
#[derive(Clone, Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Initial window width in logical pixels.
    pub window_width: u32,
    /// Initial window height in logical pixels.
    pub window_height: u32,
    /// Window title.
    pub window_title: String,
    /// When true the window is created non-resizable.
    pub lock_window_size: bool,
    /// Enable anisotropic texture filtering. When set, devices without the
    /// feature are disqualified during selection.
    pub anisotropic_filter: bool,
    /// Power-saving override: always present with strict FIFO instead of
    /// preferring the low-latency mailbox mode.
    pub save_energy: bool,
    /// Number of frames the CPU may record ahead of the GPU.
    pub frames_in_flight: usize,
    /// List suitable GPUs on startup and read a selection from stdin,
    /// falling back to automatic scoring on invalid input.
    pub choose_gpu_on_startup: bool,
    /// Enable the Khronos validation layer and debug messenger.
    pub validation: bool,
    /// Draw with the wireframe pipeline instead of the filled one.
    pub wireframe: bool,
    /// Issue indexed draws; when false the vertex buffer is drawn directly.
    pub use_indexed_vertices: bool,
    /// Clear color for the color attachment.
    pub clear_color: ClearColor,
    /// Path to the OBJ model to display.
    pub model_path: PathBuf,
    /// Path to the RGBA texture applied to the model.
    pub texture_path: PathBuf,
    /// Path to the GLSL vertex shader source.
    pub vertex_shader_path: PathBuf,
    /// Path to the GLSL fragment shader source.
    pub fragment_shader_path: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            window_width: 800,
            window_height: 600,
            window_title: "Model Viewer".to_string(),
            lock_window_size: false,
            anisotropic_filter: true,
            save_energy: false,
            frames_in_flight: 2,
            choose_gpu_on_startup: false,
            validation: cfg!(debug_assertions),
            wireframe: false,
            use_indexed_vertices: true,
            clear_color: ClearColor::default(),
            model_path: PathBuf::from("assets/models/viking_room.obj"),
            texture_path: PathBuf::from("assets/textures/viking_room.png"),
            vertex_shader_path: PathBuf::from("shaders/model.vert"),
            fragment_shader_path: PathBuf::from("shaders/model.frag"),
        }
    }
}

impl Config {
    /// Loads the configuration from a TOML file, falling back to defaults
    /// when the file does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        let config = if path.exists() {
            let text = std::fs::read_to_string(path)?;
            let config: Config = toml::from_str(&text)
                .map_err(|e| Error::Config(format!("failed to parse {}: {}", path.display(), e)))?;
            info!("Loaded configuration from {}", path.display());
            config
        } else {
            info!(
                "No configuration file at {}, using defaults",
                path.display()
            );
            Config::default()
        };

        Ok(config.normalized())
    }

    /// Clamps values that have hard bounds.
    ///
    /// The frame ring needs at least two slots for the CPU to prepare one
    /// frame while the GPU renders another; more than four buys nothing but
    /// latency.
    fn normalized(mut self) -> Self {
        let clamped = self.frames_in_flight.clamp(2, 4);
        if clamped != self.frames_in_flight {
            warn!(
                "frames_in_flight {} out of range, clamped to {}",
                self.frames_in_flight, clamped
            );
            self.frames_in_flight = clamped;
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.window_width, 800);
        assert_eq!(config.window_height, 600);
        assert_eq!(config.frames_in_flight, 2);
        assert!(!config.save_energy);
        assert!(!config.choose_gpu_on_startup);
    }

    #[test]
    fn test_frames_in_flight_clamped() {
        let config = Config {
            frames_in_flight: 1,
            ..Config::default()
        }
        .normalized();
        assert_eq!(config.frames_in_flight, 2);

        let config = Config {
            frames_in_flight: 16,
            ..Config::default()
        }
        .normalized();
        assert_eq!(config.frames_in_flight, 4);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: Config = toml::from_str("window_width = 1920\nsave_energy = true\n").unwrap();
        assert_eq!(config.window_width, 1920);
        assert!(config.save_energy);
        assert_eq!(config.window_height, 600);
        assert_eq!(config.frames_in_flight, 2);
    }

    #[test]
    fn test_unknown_field_rejected() {
        let result: std::result::Result<Config, _> = toml::from_str("no_such_option = 3\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_clear_color_parses() {
        let config: Config = toml::from_str("clear_color = [0.1, 0.2, 0.3, 1.0]\n").unwrap();
        assert_eq!(config.clear_color, ClearColor([0.1, 0.2, 0.3, 1.0]));
    }

    #[test]
    fn test_load_missing_file_is_default() {
        let config = Config::load(Path::new("/nonexistent/viewer.toml")).unwrap();
        assert_eq!(config.window_width, Config::default().window_width);
    }
}

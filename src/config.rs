//! Viewer configuration, optionally read from a TOML file.
//!
//! ```toml
//! [window]
//! title = "Umbra"
//! width = 1600
//! height = 900
//!
//! [render]
//! pipeline = "forward"
//! display = "final"
//!
//! [render.bloom]
//! iterations = 6
//! ```
//!
//! Every key is optional; missing ones keep their defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::settings::RenderSettings;

/// Environment variable naming a config file when no argument is given.
pub const CONFIG_ENV: &str = "UMBRA_CONFIG";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: "Umbra".to_string(),
            width: 1280,
            height: 720,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    pub window: WindowConfig,
    pub render: RenderSettings,
}

impl ViewerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.window.title = title.into();
        self
    }

    pub fn size(mut self, width: u32, height: u32) -> Self {
        self.window.width = width;
        self.window.height = height;
        self
    }

    pub fn render(mut self, render: RenderSettings) -> Self {
        self.render = render;
        self
    }

    /// Parses `text`, clamping render settings into their usable ranges.
    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        Ok(Self {
            render: config.render.sanitized(),
            ..config
        })
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml(&text)
    }

    /// Loads the file named by `arg` or [`CONFIG_ENV`], or the defaults when
    /// neither is set.
    pub fn from_args_or_env(arg: Option<String>) -> Result<Self, ConfigError> {
        match config_path(arg, std::env::var(CONFIG_ENV).ok()) {
            Some(path) => {
                log::info!("Loading config from {}", path.display());
                Self::load(path)
            }
            None => Ok(Self::default()),
        }
    }
}

/// The argument wins over the environment; empty values are ignored.
fn config_path(arg: Option<String>, env: Option<String>) -> Option<PathBuf> {
    arg.into_iter()
        .chain(env)
        .find(|value| !value.is_empty())
        .map(PathBuf::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::{DisplayTarget, MAX_RELIEF_LAYERS, PipelineKind};

    #[test]
    fn empty_file_gives_defaults() {
        assert_eq!(ViewerConfig::from_toml("").unwrap(), ViewerConfig::default());
    }

    #[test]
    fn partial_tables_keep_other_defaults() {
        let config = ViewerConfig::from_toml(
            r#"
            [window]
            width = 1600

            [render]
            pipeline = "forward"
            display = "g_normals"

            [render.bloom]
            iterations = 6
            "#,
        )
        .unwrap();
        assert_eq!(config.window.width, 1600);
        assert_eq!(config.window.height, 720);
        assert_eq!(config.render.pipeline, PipelineKind::Forward);
        assert_eq!(config.render.display, DisplayTarget::GNormals);
        assert_eq!(config.render.bloom.iterations, 6);
        assert!(config.render.bloom.enabled);
    }

    #[test]
    fn relief_layers_from_file_are_clamped() {
        let config = ViewerConfig::from_toml(
            r#"
            [render.relief]
            min_layers = 0.0
            max_layers = 200.0
            "#,
        )
        .unwrap();
        assert_eq!(config.render.relief.min_layers, 1.0);
        assert_eq!(config.render.relief.max_layers, MAX_RELIEF_LAYERS);
    }

    #[test]
    fn bad_values_are_parse_errors() {
        let err = ViewerConfig::from_toml("[render]\npipeline = \"raytraced\"").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = ViewerConfig::load("/nonexistent/umbra.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }

    #[test]
    fn argument_wins_over_environment() {
        assert_eq!(
            config_path(Some("a.toml".into()), Some("b.toml".into())),
            Some(PathBuf::from("a.toml"))
        );
        assert_eq!(
            config_path(Some(String::new()), Some("b.toml".into())),
            Some(PathBuf::from("b.toml"))
        );
        assert_eq!(config_path(None, None), None);
    }

    #[test]
    fn builder_sets_window() {
        let config = ViewerConfig::new().title("Test").size(320, 200);
        assert_eq!(config.window.title, "Test");
        assert_eq!((config.window.width, config.window.height), (320, 200));
    }
}

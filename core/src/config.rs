use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::errors::ThemeError;

const DEFAULT_THEME_ROOT: &str = "/data/system/theme";
const DEFAULT_CUSTOMIZED_ICONS_DIR: &str = "/data/system/customized_icons";
const DEFAULT_ICON_CACHE_BYTES: usize = 8 * 1024 * 1024;

/// Baseline density all dp values are relative to
pub const DENSITY_DEFAULT: u16 = 160;

/// Display properties needed to turn dimensions into pixels
#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct DisplayMetrics {
    pub density_dpi: u16,
    /// Font scale on top of `density`, defaults to `density`
    pub scaled_density: Option<f32>,
    /// Physical pixels per inch along x, defaults to `density_dpi`
    pub xdpi: Option<f32>,
}

impl DisplayMetrics {
    pub fn new(density_dpi: u16) -> DisplayMetrics {
        DisplayMetrics {
            density_dpi,
            scaled_density: None,
            xdpi: None,
        }
    }

    #[inline]
    pub fn density(&self) -> f32 {
        self.density_dpi as f32 / DENSITY_DEFAULT as f32
    }

    #[inline]
    pub fn scaled_density(&self) -> f32 {
        self.scaled_density.unwrap_or_else(|| self.density())
    }

    #[inline]
    pub fn xdpi(&self) -> f32 {
        self.xdpi.unwrap_or(self.density_dpi as f32)
    }
}

impl Default for DisplayMetrics {
    fn default() -> Self {
        DisplayMetrics::new(320)
    }
}

/// Engine configuration
///
/// Every field has a default, so an empty json object is a valid config.
#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct ThemeConfig {
    /// Directory holding one archive per theme component
    pub theme_root: PathBuf,

    /// Directory with per-activity icon overrides placed by the user
    pub customized_icons_dir: PathBuf,

    pub display: DisplayMetrics,

    /// Byte budget of the composed icon cache
    pub icon_cache_bytes: usize,
}

impl Default for ThemeConfig {
    fn default() -> Self {
        ThemeConfig {
            theme_root: PathBuf::from(DEFAULT_THEME_ROOT),
            customized_icons_dir: PathBuf::from(DEFAULT_CUSTOMIZED_ICONS_DIR),
            display: DisplayMetrics::default(),
            icon_cache_bytes: DEFAULT_ICON_CACHE_BYTES,
        }
    }
}

impl ThemeConfig {
    pub fn from_file(path: &Path) -> Result<ThemeConfig, ThemeError> {
        let data = fs::read(path)?;
        Self::from_slice(&data)
    }

    pub fn from_slice(data: &[u8]) -> Result<ThemeConfig, ThemeError> {
        serde_json::from_slice(data).map_err(ThemeError::ConfigError)
    }

    /// Config rooted at `theme_root` with everything else defaulted
    pub fn with_root(theme_root: impl Into<PathBuf>) -> ThemeConfig {
        ThemeConfig {
            theme_root: theme_root.into(),
            ..ThemeConfig::default()
        }
    }
}

use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use crate::error::ConfigError;

/// Adapter preference forwarded to the device request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PowerPreference {
    #[default]
    HighPerformance,
    LowPower,
}

impl std::fmt::Display for PowerPreference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PowerPreference::HighPerformance => f.write_str("high-performance"),
            PowerPreference::LowPower => f.write_str("low-power"),
        }
    }
}

impl std::str::FromStr for PowerPreference {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "high-performance" | "high" => Ok(Self::HighPerformance),
            "low-power" | "low" => Ok(Self::LowPower),
            other => Err(ConfigError::Invalid(format!(
                "unknown power preference '{other}' (expected high-performance or low-power)"
            ))),
        }
    }
}

/// Construction options for a canvas session.
///
/// Every field is optional in TOML; missing keys fall back to [`Default`].
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct CanvasOptions {
    /// Logical (CSS-facing) width.
    pub width: u32,
    /// Logical (CSS-facing) height.
    pub height: u32,
    /// Backing-store scale; `None` asks the host for its device pixel ratio.
    pub pixel_ratio: Option<f64>,
    /// Follow host resize notifications.
    pub auto_resize: bool,
    /// Composite the surface with pre-multiplied alpha instead of opaque.
    pub premultiplied_alpha: bool,
    /// Advisory only; frames are always cleared before drawing.
    pub preserve_drawing_buffer: bool,
    pub power_preference: PowerPreference,
}

const DEFAULT_WIDTH: u32 = 800;
const DEFAULT_HEIGHT: u32 = 600;

impl Default for CanvasOptions {
    fn default() -> Self {
        Self {
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
            pixel_ratio: None,
            auto_resize: true,
            premultiplied_alpha: true,
            preserve_drawing_buffer: false,
            power_preference: PowerPreference::default(),
        }
    }
}

impl CanvasOptions {
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        let options: Self = toml::from_str(input)?;
        options.validate()?;
        Ok(options)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.width == 0 || self.height == 0 {
            return Err(ConfigError::Invalid(format!(
                "canvas size must be positive, got {}x{}",
                self.width, self.height
            )));
        }
        if let Some(ratio) = self.pixel_ratio {
            if !ratio.is_finite() || ratio <= 0.0 {
                return Err(ConfigError::Invalid(format!(
                    "pixel ratio must be a positive number, got {ratio}"
                )));
            }
        }
        Ok(())
    }

    /// Logical size to start with. A zero dimension falls back to its default.
    pub fn resolve_size(&self) -> (u32, u32) {
        let pick = |value: u32, fallback: u32| if value == 0 { fallback } else { value };
        (
            pick(self.width, DEFAULT_WIDTH),
            pick(self.height, DEFAULT_HEIGHT),
        )
    }

    /// Resolves the effective pixel ratio: explicit, then host, then 1.0.
    /// Unusable values at either step fall through to the next.
    pub fn resolve_pixel_ratio(&self, host_ratio: Option<f64>) -> f64 {
        let usable = |ratio: &f64| ratio.is_finite() && *ratio > 0.0;
        self.pixel_ratio
            .filter(usable)
            .or(host_ratio.filter(usable))
            .unwrap_or(1.0)
    }
}

/// Where the viewer takes its fragment shader from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FragmentSource {
    /// WGSL held in memory (built-in presets).
    Inline { label: String, code: String },
    /// WGSL read from disk; reloadable.
    File(PathBuf),
}

impl FragmentSource {
    pub fn describe(&self) -> String {
        match self {
            FragmentSource::Inline { label, .. } => format!("preset:{label}"),
            FragmentSource::File(path) => path.display().to_string(),
        }
    }

    pub fn path(&self) -> Option<&std::path::Path> {
        match self {
            FragmentSource::File(path) => Some(path.as_path()),
            FragmentSource::Inline { .. } => None,
        }
    }

    pub fn read(&self) -> std::io::Result<String> {
        match self {
            FragmentSource::Inline { code, .. } => Ok(code.clone()),
            FragmentSource::File(path) => std::fs::read_to_string(path),
        }
    }
}

/// Fully resolved settings for the interactive viewer window.
#[derive(Debug, Clone)]
pub struct ViewerConfig {
    pub canvas: CanvasOptions,
    pub fragment: FragmentSource,
    /// Optional replacement for the built-in vertex stage.
    pub vertex: Option<PathBuf>,
    /// Start the frame loop as soon as the first program is installed.
    pub autoplay: bool,
    /// Poll the fragment file and reload it when it changes.
    pub watch: bool,
    /// How long a changed file must stay untouched before it is recompiled.
    pub reload_debounce: Duration,
    pub title: String,
}

impl ViewerConfig {
    pub fn new(fragment: FragmentSource) -> Self {
        Self {
            canvas: CanvasOptions::default(),
            fragment,
            vertex: None,
            autoplay: true,
            watch: false,
            reload_debounce: Duration::from_millis(300),
            title: "WGSL Canvas".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let options = CanvasOptions::default();
        assert_eq!(options.width, 800);
        assert_eq!(options.height, 600);
        assert_eq!(options.pixel_ratio, None);
        assert!(options.auto_resize);
        assert!(options.premultiplied_alpha);
        assert!(!options.preserve_drawing_buffer);
        assert_eq!(options.power_preference, PowerPreference::HighPerformance);
    }

    #[test]
    fn parses_partial_toml() {
        let options = CanvasOptions::from_toml_str(
            r#"
width = 400
height = 300
pixel-ratio = 2.0
power-preference = "low-power"
"#,
        )
        .unwrap();
        assert_eq!(options.width, 400);
        assert_eq!(options.height, 300);
        assert_eq!(options.pixel_ratio, Some(2.0));
        assert_eq!(options.power_preference, PowerPreference::LowPower);
        assert!(options.auto_resize, "unspecified keys keep their defaults");
    }

    #[test]
    fn rejects_zero_size_and_bad_ratio() {
        assert!(matches!(
            CanvasOptions::from_toml_str("width = 0"),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            CanvasOptions::from_toml_str("pixel-ratio = -1.0"),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            CanvasOptions::from_toml_str("power-preference = \"turbo\""),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn pixel_ratio_prefers_explicit_then_host_then_one() {
        let mut options = CanvasOptions::default();
        assert_eq!(options.resolve_pixel_ratio(None), 1.0);
        assert_eq!(options.resolve_pixel_ratio(Some(1.5)), 1.5);
        options.pixel_ratio = Some(2.0);
        assert_eq!(options.resolve_pixel_ratio(Some(1.5)), 2.0);
    }

    #[test]
    fn unusable_values_fall_back_instead_of_clamping() {
        let options = CanvasOptions {
            width: 0,
            height: 0,
            pixel_ratio: Some(0.0),
            ..CanvasOptions::default()
        };
        assert_eq!(options.resolve_size(), (800, 600));
        assert_eq!(options.resolve_pixel_ratio(Some(2.0)), 2.0);
        assert_eq!(options.resolve_pixel_ratio(Some(f64::NAN)), 1.0);

        let options = CanvasOptions {
            height: 0,
            pixel_ratio: Some(f64::INFINITY),
            ..CanvasOptions::default()
        };
        assert_eq!(options.resolve_size(), (800, 600));
        assert_eq!(options.resolve_pixel_ratio(None), 1.0);
    }

    #[test]
    fn power_preference_parses_short_names() {
        assert_eq!(
            "high".parse::<PowerPreference>().unwrap(),
            PowerPreference::HighPerformance
        );
        assert_eq!(
            "Low-Power".parse::<PowerPreference>().unwrap(),
            PowerPreference::LowPower
        );
        assert!("fast".parse::<PowerPreference>().is_err());
    }
}

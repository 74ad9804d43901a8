use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use serde::de::{self, Deserializer};
use serde::Deserialize;
use wgsl_canvas::{presets, CanvasOptions, ConfigError, FragmentSource, ViewerConfig};

use crate::cli::Cli;

/// Preset shown when neither the command line nor the file names a shader.
const FALLBACK_PRESET: &str = "gradient";

/// On-disk viewer configuration. Every key is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct ViewerFile {
    pub canvas: CanvasOptions,
    pub shader: Option<PathBuf>,
    pub vertex: Option<PathBuf>,
    pub preset: Option<String>,
    pub autoplay: Option<bool>,
    pub watch: Option<bool>,
    #[serde(deserialize_with = "deserialize_debounce")]
    pub reload_debounce: Option<Duration>,
    pub title: Option<String>,
}

impl ViewerFile {
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        let file: Self = toml::from_str(input)?;
        file.canvas.validate()?;
        Ok(file)
    }

    /// Makes relative shader paths relative to the file's directory.
    fn rebase(mut self, base: &Path) -> Self {
        let join = |path: PathBuf| {
            if path.is_relative() {
                base.join(path)
            } else {
                path
            }
        };
        self.shader = self.shader.map(join);
        self.vertex = self.vertex.map(join);
        self
    }
}

pub fn load(path: &Path) -> Result<ViewerFile> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    let file = ViewerFile::from_toml_str(&contents)
        .with_context(|| format!("failed to load config {}", path.display()))?;
    let base = path.parent().unwrap_or_else(|| Path::new("."));
    tracing::debug!(path = %path.display(), "loaded viewer config");
    Ok(file.rebase(base))
}

/// Layers command-line flags over the file and fills in defaults.
pub fn resolve(cli: &Cli, file: ViewerFile) -> Result<ViewerConfig> {
    let fragment = resolve_fragment(cli, &file)?;
    let mut config = ViewerConfig::new(fragment);

    let mut canvas = file.canvas;
    if let Some(width) = cli.width {
        canvas.width = width;
    }
    if let Some(height) = cli.height {
        canvas.height = height;
    }
    if let Some(ratio) = cli.pixel_ratio {
        canvas.pixel_ratio = Some(ratio);
    }
    if cli.no_auto_resize {
        canvas.auto_resize = false;
    }
    if cli.opaque {
        canvas.premultiplied_alpha = false;
    }
    if let Some(power) = cli.power {
        canvas.power_preference = power;
    }
    canvas.validate().context("invalid canvas options")?;
    config.canvas = canvas;

    config.vertex = cli.vertex.clone().or(file.vertex);
    config.autoplay = !cli.paused && file.autoplay.unwrap_or(true);
    config.watch = cli.watch || file.watch.unwrap_or(false);
    if let Some(debounce) = cli
        .reload_debounce_ms
        .map(Duration::from_millis)
        .or(file.reload_debounce)
    {
        config.reload_debounce = debounce;
    }
    if let Some(title) = file.title {
        config.title = title;
    } else {
        config.title = format!("{} - {}", config.title, config.fragment.describe());
    }
    Ok(config)
}

fn resolve_fragment(cli: &Cli, file: &ViewerFile) -> Result<FragmentSource> {
    if let Some(path) = &cli.shader {
        return Ok(FragmentSource::File(path.clone()));
    }
    if let Some(name) = &cli.preset {
        return preset_source(name);
    }
    if let Some(path) = &file.shader {
        return Ok(FragmentSource::File(path.clone()));
    }
    if let Some(name) = &file.preset {
        return preset_source(name);
    }
    tracing::info!(preset = FALLBACK_PRESET, "no shader given; showing a built-in preset");
    preset_source(FALLBACK_PRESET)
}

fn preset_source(name: &str) -> Result<FragmentSource> {
    let preset = presets::find(name).ok_or_else(|| {
        anyhow!(
            "unknown preset '{name}' (available: {})",
            presets::names()
        )
    })?;
    Ok(FragmentSource::Inline {
        label: preset.name.to_string(),
        code: preset.source.to_string(),
    })
}

fn deserialize_debounce<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
where
    D: Deserializer<'de>,
{
    struct Visitor;
    impl<'de> de::Visitor<'de> for Visitor {
        type Value = Option<Duration>;

        fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
            formatter.write_str("a duration as milliseconds or a human-readable string")
        }

        fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            humantime::parse_duration(v)
                .map(Some)
                .map_err(|err| E::custom(format!("invalid duration '{v}': {err}")))
        }

        fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(Some(Duration::from_millis(v)))
        }

        fn visit_i64<E>(self, v: i64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            if v < 0 {
                return Err(E::custom("duration must be non-negative"));
            }
            Ok(Some(Duration::from_millis(v as u64)))
        }
    }

    deserializer.deserialize_any(Visitor)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    use tempfile::{tempdir, NamedTempFile};
    use wgsl_canvas::PowerPreference;

    fn write_config(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn empty_file_uses_defaults() {
        let file = ViewerFile::from_toml_str("").unwrap();
        let config = resolve(&Cli::default(), file).unwrap();
        assert_eq!(config.canvas, CanvasOptions::default());
        assert!(config.autoplay);
        assert!(!config.watch);
        assert_eq!(config.reload_debounce, Duration::from_millis(300));
        assert_eq!(config.fragment.describe(), "preset:gradient");
    }

    #[test]
    fn debounce_accepts_humantime_and_milliseconds() {
        let file = ViewerFile::from_toml_str("reload-debounce = \"1s 500ms\"").unwrap();
        assert_eq!(file.reload_debounce, Some(Duration::from_millis(1500)));
        let file = ViewerFile::from_toml_str("reload-debounce = 120").unwrap();
        assert_eq!(file.reload_debounce, Some(Duration::from_millis(120)));
        assert!(ViewerFile::from_toml_str("reload-debounce = -5").is_err());
        assert!(ViewerFile::from_toml_str("reload-debounce = \"soon\"").is_err());
    }

    #[test]
    fn rejects_unknown_keys_and_invalid_canvas() {
        assert!(matches!(
            ViewerFile::from_toml_str("shaders = \"a.wgsl\""),
            Err(ConfigError::Parse(_))
        ));
        assert!(matches!(
            ViewerFile::from_toml_str("[canvas]\nheight = 0"),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn loads_file_and_rebases_shader_paths() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("viewer.toml");
        fs::write(
            &path,
            r#"
shader = "shaders/plasma.wgsl"
watch = true
autoplay = false

[canvas]
width = 400
height = 300
power-preference = "low-power"
"#,
        )
        .unwrap();

        let file = load(&path).unwrap();
        assert_eq!(file.shader, Some(dir.path().join("shaders/plasma.wgsl")));

        let config = resolve(&Cli::default(), file).unwrap();
        assert_eq!(
            config.fragment,
            FragmentSource::File(dir.path().join("shaders/plasma.wgsl"))
        );
        assert!(config.watch);
        assert!(!config.autoplay);
        assert_eq!(config.canvas.width, 400);
        assert_eq!(config.canvas.power_preference, PowerPreference::LowPower);
    }

    #[test]
    fn command_line_overrides_file() {
        let fixture = write_config(
            r#"
preset = "waves"
reload-debounce = "2s"

[canvas]
width = 400
auto-resize = true
"#,
        );
        let file = load(fixture.path()).unwrap();
        let cli = Cli {
            shader: Some(PathBuf::from("/tmp/mine.wgsl")),
            width: Some(640),
            no_auto_resize: true,
            opaque: true,
            paused: true,
            reload_debounce_ms: Some(50),
            ..Cli::default()
        };
        let config = resolve(&cli, file).unwrap();
        assert_eq!(config.fragment, FragmentSource::File(PathBuf::from("/tmp/mine.wgsl")));
        assert_eq!(config.canvas.width, 640);
        assert!(!config.canvas.auto_resize);
        assert!(!config.canvas.premultiplied_alpha);
        assert!(!config.autoplay);
        assert_eq!(config.reload_debounce, Duration::from_millis(50));
    }

    #[test]
    fn unknown_preset_lists_alternatives() {
        let cli = Cli {
            preset: Some("lava".into()),
            ..Cli::default()
        };
        let err = resolve(&cli, ViewerFile::default()).unwrap_err();
        assert!(err.to_string().contains("solid, gradient"));
    }

    #[test]
    fn invalid_cli_size_is_rejected() {
        let cli = Cli {
            height: Some(0),
            ..Cli::default()
        };
        assert!(resolve(&cli, ViewerFile::default()).is_err());
    }
}

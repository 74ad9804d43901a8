use std::path::PathBuf;

use clap::Parser;
use wgsl_canvas::PowerPreference;

#[derive(Parser, Debug, Default)]
#[command(
    name = "wgslview",
    author,
    version,
    about = "Interactive WGSL fragment shader viewer",
    arg_required_else_help = false
)]
pub struct Cli {
    /// Fragment shader file (WGSL exporting `fn main`).
    #[arg(value_name = "SHADER")]
    pub shader: Option<PathBuf>,

    /// Render a built-in shader instead of a file (see `--list-presets`).
    #[arg(long, value_name = "NAME", conflicts_with = "shader")]
    pub preset: Option<String>,

    /// Replace the built-in full-screen vertex stage.
    #[arg(long, value_name = "FILE")]
    pub vertex: Option<PathBuf>,

    /// Viewer configuration file (TOML).
    #[arg(long, value_name = "FILE", env = "WGSLVIEW_CONFIG")]
    pub config: Option<PathBuf>,

    /// Logical canvas width.
    #[arg(long, value_name = "PIXELS")]
    pub width: Option<u32>,

    /// Logical canvas height.
    #[arg(long, value_name = "PIXELS")]
    pub height: Option<u32>,

    /// Backing-store scale; defaults to the monitor's scale factor.
    #[arg(long, value_name = "RATIO")]
    pub pixel_ratio: Option<f64>,

    /// Keep the canvas size fixed when the window is resized.
    #[arg(long)]
    pub no_auto_resize: bool,

    /// Present opaquely instead of with pre-multiplied alpha.
    #[arg(long)]
    pub opaque: bool,

    /// GPU power preference: `high-performance` or `low-power`.
    #[arg(long, value_name = "PREFERENCE", value_parser = parse_power)]
    pub power: Option<PowerPreference>,

    /// Load the shader but wait for Space before animating.
    #[arg(long)]
    pub paused: bool,

    /// Reload the shader file whenever it changes on disk.
    #[arg(long)]
    pub watch: bool,

    /// Quiet period after a file change before recompiling.
    #[arg(long, value_name = "MILLISECONDS")]
    pub reload_debounce_ms: Option<u64>,

    /// Print the built-in shaders and exit.
    #[arg(long)]
    pub list_presets: bool,
}

pub fn parse() -> Cli {
    Cli::parse()
}

pub fn parse_power(value: &str) -> Result<PowerPreference, String> {
    value.parse().map_err(|err: wgsl_canvas::ConfigError| err.to_string())
}

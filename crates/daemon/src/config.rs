//! Configuration management for the Tessellate daemon.
//!
//! Configuration is loaded from TOML files in the following locations (in order):
//! 1. The platform config directory (`$XDG_CONFIG_HOME/tessellate/config.toml` on Linux)
//! 2. `~/.config/tessellate/config.toml`
//! 3. `./config.toml` (current directory, for development)

use anyhow::{Context, Result};
use directories::ProjectDirs;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tessellate_controller::{ControllerConfig, EngineSettings, EngineType};
use tessellate_layout::CenteringMode;
use tracing::warn;

/// Main configuration structure for Tessellate.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Tiling controller configuration.
    pub tiling: TilingConfig,
    /// Layout engine configuration.
    pub layout: LayoutConfig,
    /// Behavior configuration.
    pub behavior: BehaviorConfig,
    /// Rules deciding which new windows are tiled.
    #[serde(default)]
    pub window_rules: Vec<WindowRule>,
}

/// Controller configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TilingConfig {
    /// Engine used by newly created drivers.
    #[serde(default)]
    pub engine_type: EngineType,

    /// Delay before a tile change is evaluated, in milliseconds.
    #[serde(default = "default_timer_delay")]
    pub timer_delay_ms: u64,

    /// Whether windows are tiled when they appear.
    #[serde(default = "default_true")]
    pub tile_new_windows: bool,
}

impl Default for TilingConfig {
    fn default() -> Self {
        Self {
            engine_type: EngineType::default(),
            timer_delay_ms: default_timer_delay(),
            tile_new_windows: default_true(),
        }
    }
}

/// Layout-related configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    /// Gap between columns in pixels.
    #[serde(default = "default_gap")]
    pub gap: i32,

    /// Gap at the edges of the screen in pixels.
    #[serde(default = "default_outer_gap")]
    pub outer_gap: i32,

    /// Default width for new columns in pixels.
    #[serde(default = "default_column_width")]
    pub default_column_width: i32,

    /// Centering mode for the scrolling engine.
    #[serde(default)]
    pub centering_mode: CenteringModeConfig,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            gap: default_gap(),
            outer_gap: default_outer_gap(),
            default_column_width: default_column_width(),
            centering_mode: CenteringModeConfig::default(),
        }
    }
}

/// Centering mode configuration (wrapper for serialization).
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CenteringModeConfig {
    /// Center the focused column on the screen.
    #[default]
    Center,
    /// Only scroll if the focused column would leave the screen.
    JustInView,
}

impl From<CenteringModeConfig> for CenteringMode {
    fn from(config: CenteringModeConfig) -> Self {
        match config {
            CenteringModeConfig::Center => CenteringMode::Center,
            CenteringModeConfig::JustInView => CenteringMode::JustInView,
        }
    }
}

/// Behavior configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BehaviorConfig {
    /// Log level: trace, debug, info, warn, error.
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Bridge socket path. Defaults to the runtime directory.
    #[serde(default)]
    pub socket_path: Option<PathBuf>,
}

impl Default for BehaviorConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            socket_path: None,
        }
    }
}

fn default_timer_delay() -> u64 {
    10
}

fn default_true() -> bool {
    true
}

fn default_gap() -> i32 {
    10
}

fn default_outer_gap() -> i32 {
    10
}

fn default_column_width() -> i32 {
    800
}

fn default_log_level() -> String {
    "info".to_string()
}

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];
const MIN_COLUMN_WIDTH: i32 = 100;
const MAX_TIMER_DELAY_MS: u64 = 1000;

// ============================================================================
// Window Rules
// ============================================================================

/// A rule deciding whether a new window is tiled.
///
/// Window rules are evaluated in order; the first matching rule wins.
/// Windows no rule matches follow `tiling.tile_new_windows`.
///
/// # Example Config
///
/// ```toml
/// [[window_rules]]
/// match_class = "^org\\.kde\\.krunner$"
/// action = "float"
///
/// [[window_rules]]
/// match_class = "firefox"
/// match_caption = ".*Picture-in-Picture.*"
/// action = "float"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WindowRule {
    /// Regex pattern to match the window's resource class.
    #[serde(default)]
    pub match_class: Option<String>,

    /// Regex pattern to match the window caption.
    #[serde(default)]
    pub match_caption: Option<String>,

    /// Action to take when the rule matches.
    #[serde(default)]
    pub action: WindowAction,
}

/// Action to take for a matching window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WindowAction {
    /// Tile the window.
    #[default]
    Tile,
    /// Leave the window floating.
    Float,
}

/// A window rule with its patterns compiled.
#[derive(Debug, Clone)]
pub struct CompiledWindowRule {
    class: Option<Regex>,
    caption: Option<Regex>,
    pub action: WindowAction,
}

impl CompiledWindowRule {
    /// Compile a rule. Returns `None` for rules without criteria or with an
    /// invalid pattern.
    pub fn compile(rule: &WindowRule) -> Option<Self> {
        if rule.match_class.is_none() && rule.match_caption.is_none() {
            warn!("Window rule without match criteria ignored");
            return None;
        }
        let class = compile_pattern(rule.match_class.as_deref(), "match_class")?;
        let caption = compile_pattern(rule.match_caption.as_deref(), "match_caption")?;
        Some(Self {
            class,
            caption,
            action: rule.action,
        })
    }

    /// All specified criteria must match.
    pub fn matches(&self, class: &str, caption: &str) -> bool {
        self.class.as_ref().map_or(true, |re| re.is_match(class))
            && self.caption.as_ref().map_or(true, |re| re.is_match(caption))
    }
}

/// `Some(None)` when there is no pattern, `None` when it does not compile.
fn compile_pattern(pattern: Option<&str>, field: &str) -> Option<Option<Regex>> {
    match pattern {
        None => Some(None),
        Some(pattern) => match Regex::new(pattern) {
            Ok(re) => Some(Some(re)),
            Err(e) => {
                warn!("Invalid regex in window rule {}: {} ({})", field, pattern, e);
                None
            }
        },
    }
}

/// Whether a new window should be tiled: the action of the first matching
/// rule, or `default` when none matches.
pub fn should_tile(rules: &[CompiledWindowRule], class: &str, caption: &str, default: bool) -> bool {
    rules
        .iter()
        .find(|rule| rule.matches(class, caption))
        .map_or(default, |rule| rule.action == WindowAction::Tile)
}

/// A value `validate` had to change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigWarning {
    pub field: &'static str,
    pub message: String,
}

impl Config {
    /// Load configuration from standard locations.
    ///
    /// Returns default config if no file is found.
    pub fn load() -> Result<Self> {
        let paths = config_paths();

        for path in &paths {
            if path.exists() {
                tracing::info!("Loading config from: {}", path.display());
                return Self::load_from_path(path);
            }
        }

        tracing::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    /// Load configuration from a specific path.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Clamp out-of-range values, returning one warning per change.
    pub fn validate(&mut self) -> Vec<ConfigWarning> {
        let mut warnings = Vec::new();

        if self.layout.gap < 0 {
            warnings.push(ConfigWarning {
                field: "layout.gap",
                message: format!("{} is negative, using 0", self.layout.gap),
            });
            self.layout.gap = 0;
        }
        if self.layout.outer_gap < 0 {
            warnings.push(ConfigWarning {
                field: "layout.outer_gap",
                message: format!("{} is negative, using 0", self.layout.outer_gap),
            });
            self.layout.outer_gap = 0;
        }
        if self.layout.default_column_width < MIN_COLUMN_WIDTH {
            warnings.push(ConfigWarning {
                field: "layout.default_column_width",
                message: format!(
                    "{} is below {}, using {}",
                    self.layout.default_column_width, MIN_COLUMN_WIDTH, MIN_COLUMN_WIDTH
                ),
            });
            self.layout.default_column_width = MIN_COLUMN_WIDTH;
        }
        if self.tiling.timer_delay_ms > MAX_TIMER_DELAY_MS {
            warnings.push(ConfigWarning {
                field: "tiling.timer_delay_ms",
                message: format!(
                    "{} exceeds {}, using {}",
                    self.tiling.timer_delay_ms, MAX_TIMER_DELAY_MS, MAX_TIMER_DELAY_MS
                ),
            });
            self.tiling.timer_delay_ms = MAX_TIMER_DELAY_MS;
        }

        let level = self.behavior.log_level.to_lowercase();
        if LOG_LEVELS.contains(&level.as_str()) {
            self.behavior.log_level = level;
        } else {
            warnings.push(ConfigWarning {
                field: "behavior.log_level",
                message: format!("unknown level {:?}, using info", self.behavior.log_level),
            });
            self.behavior.log_level = default_log_level();
        }

        warnings
    }

    /// Settings for the controller.
    pub fn controller_config(&self) -> ControllerConfig {
        ControllerConfig {
            engine_type: self.tiling.engine_type,
            tile_check_delay: Duration::from_millis(self.tiling.timer_delay_ms),
        }
    }

    /// Settings for the layout engines.
    pub fn engine_settings(&self) -> EngineSettings {
        EngineSettings {
            gap: self.layout.gap,
            outer_gap: self.layout.outer_gap,
            default_column_width: self.layout.default_column_width,
            centering_mode: self.layout.centering_mode.into(),
        }
    }

    /// Compile the window rules, dropping invalid ones.
    pub fn compile_rules(&self) -> Vec<CompiledWindowRule> {
        self.window_rules
            .iter()
            .filter_map(CompiledWindowRule::compile)
            .collect()
    }
}

/// Get all possible config file paths in priority order.
pub fn config_paths() -> Vec<PathBuf> {
    let mut paths = Vec::new();

    if let Some(proj_dirs) = ProjectDirs::from("org", "tessellate", "tessellate") {
        paths.push(proj_dirs.config_dir().join("config.toml"));
    }

    if let Some(home) = dirs_home() {
        let path = home.join(".config").join("tessellate").join("config.toml");
        if !paths.contains(&path) {
            paths.push(path);
        }
    }

    paths.push(PathBuf::from("config.toml"));

    paths
}

/// Get the user's home directory.
fn dirs_home() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|d| d.home_dir().to_path_buf())
}

// Configuration loading and parsing (pennant.toml).

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::info;

use pennant_baseball::season::SHORTENED_SEASON;
use pennant_baseball::SeasonRange;
use pennant_core::http::HttpSettings;
use pennant_core::RateLimiter;

pub const CONFIG_FILE: &str = "pennant.toml";

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("validation error for field `{field}`: {message}")]
    ValidationError { field: String, message: String },

    #[error("cannot seed config from defaults: {message}")]
    DefaultsCopyError { message: String },
}

// ---------------------------------------------------------------------------
// pennant.toml structs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub source: SourceConfig,
    pub seasons: SeasonsConfig,
    #[serde(default)]
    pub throttle: ThrottleConfig,
    #[serde(default)]
    pub data: DataConfig,
    #[serde(default)]
    pub analysis: AnalysisConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SourceConfig {
    pub base_url: String,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SeasonsConfig {
    pub start_year: i32,
    pub end_year: i32,
    #[serde(default = "default_excluded_years")]
    pub excluded_years: Vec<i32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ThrottleConfig {
    pub standings_delay_secs: f64,
    pub table_delay_min_secs: f64,
    pub table_delay_max_secs: f64,
}

impl Default for ThrottleConfig {
    fn default() -> Self {
        Self {
            standings_delay_secs: 2.0,
            table_delay_min_secs: 1.0,
            table_delay_max_secs: 3.0,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DataConfig {
    #[serde(default)]
    pub baseline_csv: Option<String>,
    #[serde(default = "default_output_dir")]
    pub output_dir: String,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            baseline_csv: None,
            output_dir: default_output_dir(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AnalysisConfig {
    #[serde(default = "default_month")]
    pub month: u32,
    #[serde(default = "default_threshold")]
    pub win_pct_threshold: f64,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            month: default_month(),
            win_pct_threshold: default_threshold(),
        }
    }
}

fn default_user_agent() -> String {
    HttpSettings::default().user_agent
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_excluded_years() -> Vec<i32> {
    vec![SHORTENED_SEASON]
}

fn default_output_dir() -> String {
    "output".into()
}

fn default_month() -> u32 {
    pennant_baseball::aggregate::APRIL
}

fn default_threshold() -> f64 {
    pennant_baseball::aggregate::DEFAULT_WIN_PCT_THRESHOLD
}

impl Config {
    pub fn season_range(&self) -> SeasonRange {
        SeasonRange::new(self.seasons.start_year, self.seasons.end_year)
            .with_excluded(self.seasons.excluded_years.iter().copied())
    }

    pub fn http_settings(&self) -> HttpSettings {
        HttpSettings {
            user_agent: self.source.user_agent.clone(),
            timeout: Duration::from_secs(self.source.timeout_secs),
        }
    }

    pub fn rate_limiter(&self) -> RateLimiter {
        RateLimiter::from_secs(
            self.throttle.standings_delay_secs,
            self.throttle.table_delay_min_secs,
            self.throttle.table_delay_max_secs,
        )
    }
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

/// Load `config/pennant.toml` relative to `base_dir` without copying defaults.
pub(crate) fn load_config_from(base_dir: &Path) -> Result<Config, ConfigError> {
    let path = base_dir.join("config").join(CONFIG_FILE);
    let text = read_config_text(&path)?;
    let config: Config = toml::from_str(&text).map_err(|e| ConfigError::ParseError {
        path: path.clone(),
        source: e,
    })?;

    validate(&config)?;

    Ok(config)
}

/// Seed `config/` from the shipped `defaults/` directory.
///
/// Files already present in `config/` are left untouched and `.example`
/// templates are never installed. Returns the paths that were written.
pub fn seed_config_dir(base_dir: &Path) -> Result<Vec<PathBuf>, ConfigError> {
    let defaults_dir = base_dir.join("defaults");
    let config_dir = base_dir.join("config");

    if !defaults_dir.is_dir() {
        if config_dir.is_dir() {
            return Ok(Vec::new());
        }
        return Err(seed_error(format!(
            "{} has no defaults/ to seed config/{} from; start pennant inside crates/pennant-app",
            base_dir.display(),
            CONFIG_FILE
        )));
    }

    std::fs::create_dir_all(&config_dir)
        .map_err(|e| seed_error(format!("cannot create {}: {e}", config_dir.display())))?;

    let mut shipped: Vec<PathBuf> = std::fs::read_dir(&defaults_dir)
        .map_err(|e| seed_error(format!("cannot list {}: {e}", defaults_dir.display())))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.is_file() && !is_template(path))
        .collect();
    shipped.sort();

    let mut written = Vec::new();
    for source in shipped {
        let Some(file_name) = source.file_name() else {
            continue;
        };
        let target = config_dir.join(file_name);
        if install_default(&source, &target)? {
            info!("installed default {}", target.display());
            written.push(target);
        }
    }
    Ok(written)
}

fn is_template(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == "example")
}

/// Copy `source` to `target` unless `target` exists. Returns whether a file
/// was written.
fn install_default(source: &Path, target: &Path) -> Result<bool, ConfigError> {
    let mut dest = match std::fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(target)
    {
        Ok(dest) => dest,
        Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => return Ok(false),
        Err(e) => return Err(seed_error(format!("cannot create {}: {e}", target.display()))),
    };
    let mut src = std::fs::File::open(source)
        .map_err(|e| seed_error(format!("cannot open {}: {e}", source.display())))?;
    std::io::copy(&mut src, &mut dest)
        .map_err(|e| seed_error(format!("cannot copy to {}: {e}", target.display())))?;
    Ok(true)
}

/// Seed `config/` in the working directory, then load it.
pub fn load_config() -> Result<Config, ConfigError> {
    let cwd = std::env::current_dir().map_err(|_| ConfigError::FileNotFound {
        path: PathBuf::from("."),
    })?;
    seed_config_dir(&cwd)?;
    load_config_from(&cwd)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn read_config_text(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
        path: path.to_path_buf(),
    })
}

fn seed_error(message: String) -> ConfigError {
    ConfigError::DefaultsCopyError { message }
}

fn invalid(field: &str, message: String) -> ConfigError {
    ConfigError::ValidationError {
        field: field.into(),
        message,
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn validate(config: &Config) -> Result<(), ConfigError> {
    if config.source.base_url.trim().is_empty() {
        return Err(invalid("source.base_url", "must not be empty".into()));
    }
    if config.source.timeout_secs == 0 {
        return Err(invalid("source.timeout_secs", "must be greater than 0".into()));
    }

    let seasons = &config.seasons;
    if seasons.start_year > seasons.end_year {
        return Err(invalid(
            "seasons.start_year",
            format!(
                "must not be after end_year ({} > {})",
                seasons.start_year, seasons.end_year
            ),
        ));
    }

    let t = &config.throttle;
    let delays: &[(&str, f64)] = &[
        ("throttle.standings_delay_secs", t.standings_delay_secs),
        ("throttle.table_delay_min_secs", t.table_delay_min_secs),
        ("throttle.table_delay_max_secs", t.table_delay_max_secs),
    ];
    for (name, val) in delays {
        if !val.is_finite() || *val < 0.0 {
            return Err(invalid(name, format!("must be >= 0, got {val}")));
        }
    }
    if t.table_delay_min_secs > t.table_delay_max_secs {
        return Err(invalid(
            "throttle.table_delay_min_secs",
            format!(
                "must not exceed table_delay_max_secs ({} > {})",
                t.table_delay_min_secs, t.table_delay_max_secs
            ),
        ));
    }

    if config.data.output_dir.trim().is_empty() {
        return Err(invalid("data.output_dir", "must not be empty".into()));
    }

    let a = &config.analysis;
    if !(1..=12).contains(&a.month) {
        return Err(invalid(
            "analysis.month",
            format!("must be between 1 and 12, got {}", a.month),
        ));
    }
    if !(0.0..=1.0).contains(&a.win_pct_threshold) {
        return Err(invalid(
            "analysis.win_pct_threshold",
            format!(
                "must be between 0.0 and 1.0 inclusive, got {}",
                a.win_pct_threshold
            ),
        ));
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

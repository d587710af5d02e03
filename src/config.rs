//! Configuration management and validation.
//!
//! Provides the layered configuration for a processing run: built-in
//! defaults, an optional TOML file, `CSB_PROCESSOR_*` environment variables
//! and finally command-line overrides applied by the CLI.

use crate::app::models::DepthMessageKind;
use crate::app::services::loaders::LoaderKind;
use crate::app::services::writers::WriterKind;
use crate::constants::{
    CONFIG_DIR_NAME, CONFIG_FILE_NAME, DEFAULT_ASCII_ELAPSED_WRAP, DEFAULT_FAULT_LIMIT,
    DEFAULT_MAX_DROP_FRACTION, DEFAULT_MAX_GAP_SECONDS, ENV_PREFIX, MAX_PARALLEL_WORKERS,
};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

/// What to do when too many depths lack a nearby position fix
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CoveragePolicy {
    /// Fail the file with `InsufficientPositionCoverage`
    #[default]
    Fail,
    /// Log a warning and keep the surviving observations
    Warn,
}

/// Input/output selection for a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessingConfig {
    /// Folder of raw logger files
    pub input_path: PathBuf,

    /// Folder receiving converted outputs
    pub output_path: PathBuf,

    /// Loader label, e.g. "YDVR" or "WIBL"
    pub loader: String,

    /// Writer label, e.g. "DCDB GeoJSON"
    pub writer: String,

    /// Depth message label, e.g. "DBT (NMEA0183)"
    pub depth_source: String,

    /// Submission metadata shared by every file
    pub metadata_file: Option<PathBuf>,

    /// Override for the loader's default input suffix
    pub input_suffix: Option<String>,

    /// Descend into sub-folders of the input path
    pub recursive: bool,

    /// List what would be processed without writing
    pub dry_run: bool,

    /// Reprocess inputs whose outputs already exist
    pub force_overwrite: bool,
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            input_path: PathBuf::from("."),
            output_path: PathBuf::from("./output"),
            loader: LoaderKind::Wibl.label().to_string(),
            writer: WriterKind::DcdbGeoJson.label().to_string(),
            depth_source: DepthMessageKind::Nmea2000Depth.label().to_string(),
            metadata_file: None,
            input_suffix: None,
            recursive: false,
            dry_run: false,
            force_overwrite: false,
        }
    }
}

/// Pairing of depths with position fixes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeoreferenceConfig {
    /// Largest allowed time to the fix used for a depth, seconds
    pub max_gap_seconds: f64,

    /// Largest fraction of depths that may be dropped, 0.0 to 1.0
    pub max_drop_fraction: f64,

    pub coverage_policy: CoveragePolicy,

    /// Add the instrument offset to DPT / NMEA2000 depths
    pub apply_transducer_offset: bool,
}

impl Default for GeoreferenceConfig {
    fn default() -> Self {
        Self {
            max_gap_seconds: DEFAULT_MAX_GAP_SECONDS,
            max_drop_fraction: DEFAULT_MAX_DROP_FRACTION,
            coverage_policy: CoveragePolicy::Fail,
            apply_transducer_offset: false,
        }
    }
}

/// Loader tolerances
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecodingConfig {
    /// Fault notes retained per file
    pub fault_limit: usize,

    /// Counter wrap for generic ASCII elapsed times, milliseconds
    pub ascii_elapsed_wrap: u64,
}

impl Default for DecodingConfig {
    fn default() -> Self {
        Self {
            fault_limit: DEFAULT_FAULT_LIMIT,
            ascii_elapsed_wrap: DEFAULT_ASCII_ELAPSED_WRAP,
        }
    }
}

/// Concurrency settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PerformanceConfig {
    /// Files processed concurrently
    pub parallel_workers: usize,

    /// Optional wall-clock budget per file, seconds
    pub file_timeout_seconds: Option<f64>,
}

impl Default for PerformanceConfig {
    fn default() -> Self {
        Self {
            parallel_workers: num_cpus::get().clamp(1, MAX_PARALLEL_WORKERS),
            file_timeout_seconds: None,
        }
    }
}

/// Complete configuration for a processing run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub processing: ProcessingConfig,
    pub georeference: GeoreferenceConfig,
    pub decoding: DecodingConfig,
    pub performance: PerformanceConfig,
}

impl Config {
    /// Default location of the configuration file
    pub fn default_config_path() -> Result<PathBuf> {
        dirs::config_dir()
            .map(|dir| dir.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
            .ok_or_else(|| Error::configuration("Could not determine user config directory"))
    }

    /// Parse a TOML configuration file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::io(
                format!("Failed to read config file {}", path.display()),
                e,
            )
        })?;
        let config: Config = toml::from_str(&content)?;
        debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Build configuration from file, then environment, then explicit paths
    pub fn load_layered(
        input_path: Option<PathBuf>,
        output_path: Option<PathBuf>,
        config_file: Option<&Path>,
    ) -> Result<Self> {
        let mut config = match config_file {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };

        config.apply_overrides_from(|key| std::env::var(key).ok())?;

        if let Some(input_path) = input_path {
            config.processing.input_path = input_path;
        }
        if let Some(output_path) = output_path {
            config.processing.output_path = output_path;
        }

        Ok(config)
    }

    /// Apply `CSB_PROCESSOR_*` overrides using the given variable lookup
    pub fn apply_overrides_from<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(&format!("{}{}", ENV_PREFIX, name));

        if let Some(value) = var("LOADER") {
            self.processing.loader = value;
        }
        if let Some(value) = var("WRITER") {
            self.processing.writer = value;
        }
        if let Some(value) = var("DEPTH_SOURCE") {
            self.processing.depth_source = value;
        }
        if let Some(value) = var("METADATA") {
            self.processing.metadata_file = Some(PathBuf::from(value));
        }
        if let Some(value) = var("MAX_GAP_SECONDS") {
            self.georeference.max_gap_seconds = parse_env("MAX_GAP_SECONDS", &value)?;
        }
        if let Some(value) = var("MAX_DROP_FRACTION") {
            self.georeference.max_drop_fraction = parse_env("MAX_DROP_FRACTION", &value)?;
        }
        if let Some(value) = var("WORKERS") {
            self.performance.parallel_workers = parse_env("WORKERS", &value)?;
        }
        if let Some(value) = var("FILE_TIMEOUT_SECONDS") {
            self.performance.file_timeout_seconds = Some(parse_env("FILE_TIMEOUT_SECONDS", &value)?);
        }

        Ok(())
    }

    /// Check values and registry labels before a run starts
    pub fn validate(&self) -> Result<()> {
        let geo = &self.georeference;
        if !geo.max_gap_seconds.is_finite() || geo.max_gap_seconds <= 0.0 {
            return Err(Error::configuration(format!(
                "max_gap_seconds must be positive, got {}",
                geo.max_gap_seconds
            )));
        }
        if !(0.0..=1.0).contains(&geo.max_drop_fraction) {
            return Err(Error::configuration(format!(
                "max_drop_fraction must be between 0 and 1, got {}",
                geo.max_drop_fraction
            )));
        }

        let workers = self.performance.parallel_workers;
        if workers == 0 || workers > MAX_PARALLEL_WORKERS {
            return Err(Error::configuration(format!(
                "parallel_workers must be between 1 and {}, got {}",
                MAX_PARALLEL_WORKERS, workers
            )));
        }
        if let Some(seconds) = self.performance.file_timeout_seconds {
            if !seconds.is_finite() || seconds <= 0.0 {
                return Err(Error::configuration(format!(
                    "file_timeout_seconds must be positive, got {}",
                    seconds
                )));
            }
        }

        // Labels must resolve in the registries
        self.loader_kind()?;
        self.writer_kind()?;
        self.depth_kind()?;

        Ok(())
    }

    pub fn loader_kind(&self) -> Result<LoaderKind> {
        LoaderKind::from_name(&self.processing.loader)
    }

    pub fn writer_kind(&self) -> Result<WriterKind> {
        WriterKind::from_name(&self.processing.writer)
    }

    pub fn depth_kind(&self) -> Result<DepthMessageKind> {
        DepthMessageKind::from_name(&self.processing.depth_source)
    }

    /// Input suffix to scan for: explicit override or the loader's default
    pub fn input_suffix(&self) -> Result<String> {
        match &self.processing.input_suffix {
            Some(suffix) => Ok(suffix.clone()),
            None => Ok(self.loader_kind()?.suffix().to_string()),
        }
    }

    pub fn file_timeout(&self) -> Option<Duration> {
        self.performance
            .file_timeout_seconds
            .map(Duration::from_secs_f64)
    }

    /// Create the output directory if it does not exist
    pub fn ensure_output_directory(&self) -> Result<()> {
        let path = &self.processing.output_path;
        std::fs::create_dir_all(path).map_err(|e| {
            Error::io(
                format!("Failed to create output directory {}", path.display()),
                e,
            )
        })
    }

    /// Set the loader label
    pub fn with_loader(mut self, loader: LoaderKind) -> Self {
        self.processing.loader = loader.label().to_string();
        self
    }

    /// Set the writer label
    pub fn with_writer(mut self, writer: WriterKind) -> Self {
        self.processing.writer = writer.label().to_string();
        self
    }

    /// Set the depth message kind
    pub fn with_depth_source(mut self, kind: DepthMessageKind) -> Self {
        self.processing.depth_source = kind.label().to_string();
        self
    }

    /// Set the largest allowed depth-to-fix gap
    pub fn with_max_gap_seconds(mut self, seconds: f64) -> Self {
        self.georeference.max_gap_seconds = seconds;
        self
    }

    /// Set the coverage threshold and policy
    pub fn with_coverage(mut self, max_drop_fraction: f64, policy: CoveragePolicy) -> Self {
        self.georeference.max_drop_fraction = max_drop_fraction;
        self.georeference.coverage_policy = policy;
        self
    }

    /// Apply instrument offsets to depths that carry one
    pub fn with_transducer_offset(mut self) -> Self {
        self.georeference.apply_transducer_offset = true;
        self
    }

    /// Set worker count
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.performance.parallel_workers = workers;
        self
    }

    /// Set a per-file processing budget
    pub fn with_file_timeout(mut self, timeout: Duration) -> Self {
        self.performance.file_timeout_seconds = Some(timeout.as_secs_f64());
        self
    }
}

fn parse_env<T: std::str::FromStr>(name: &str, value: &str) -> Result<T> {
    value.trim().parse().map_err(|_| {
        Error::configuration(format!(
            "Invalid value '{}' for {}{}",
            value, ENV_PREFIX, name
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.georeference.coverage_policy, CoveragePolicy::Fail);
        assert!(!config.georeference.apply_transducer_offset);
    }

    #[test]
    fn test_from_file_with_partial_sections() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[processing]
loader = "YDVR"
depth_source = "DBT (NMEA0183)"

[georeference]
max_gap_seconds = 2.5
coverage_policy = "warn"
"#
        )
        .unwrap();

        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.processing.loader, "YDVR");
        assert_eq!(config.georeference.max_gap_seconds, 2.5);
        assert_eq!(config.georeference.coverage_policy, CoveragePolicy::Warn);
        // Untouched sections keep defaults
        assert_eq!(config.decoding.fault_limit, DEFAULT_FAULT_LIMIT);
        assert_eq!(config.depth_kind().unwrap(), DepthMessageKind::Dbt);
    }

    #[test]
    fn test_environment_overrides() {
        let vars: HashMap<String, String> = [
            ("CSB_PROCESSOR_WRITER", "DCDB CSV"),
            ("CSB_PROCESSOR_MAX_GAP_SECONDS", "4"),
            ("CSB_PROCESSOR_WORKERS", "3"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        let mut config = Config::default();
        config
            .apply_overrides_from(|key| vars.get(key).cloned())
            .unwrap();

        assert_eq!(config.writer_kind().unwrap(), WriterKind::DcdbCsv);
        assert_eq!(config.georeference.max_gap_seconds, 4.0);
        assert_eq!(config.performance.parallel_workers, 3);
    }

    #[test]
    fn test_environment_override_rejects_garbage() {
        let mut config = Config::default();
        let result = config.apply_overrides_from(|key| {
            (key == "CSB_PROCESSOR_WORKERS").then(|| "many".to_string())
        });
        assert!(matches!(result, Err(Error::Configuration { .. })));
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        assert!(Config::default().with_max_gap_seconds(0.0).validate().is_err());
        assert!(
            Config::default()
                .with_coverage(1.5, CoveragePolicy::Fail)
                .validate()
                .is_err()
        );
        assert!(Config::default().with_workers(0).validate().is_err());

        let mut config = Config::default();
        config.processing.loader = "Garmin".to_string();
        assert!(matches!(
            config.validate(),
            Err(Error::UnknownLoader { .. })
        ));
    }

    #[test]
    fn test_input_suffix_defaults_to_loader() {
        let config = Config::default().with_loader(LoaderKind::Ydvr);
        assert_eq!(config.input_suffix().unwrap(), ".DAT");

        let mut config = config;
        config.processing.input_suffix = Some(".ydvr".to_string());
        assert_eq!(config.input_suffix().unwrap(), ".ydvr");
    }
}

//! Configuration and parameter presets.
//!
//! Presets are YAML files holding one parameter record each, so lesson plans
//! can ship ready-made setups without recompiling.
//!
//! ## Directory Structure
//!
//! ```text
//! presets/
//! ├── lab.yaml
//! ├── pendulum/
//! │   ├── default.yaml
//! │   └── long_swing.yaml
//! ├── projectile/
//! │   └── max_range.yaml
//! ├── free-fall/
//! ├── ohms-law/
//! └── waves/
//! ```

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs;
use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::free_fall::FreeFallParams;
use crate::lab::{Experiment, ExperimentParams};
use crate::ohms_law::OhmsLawParams;
use crate::pendulum::PendulumParams;
use crate::projectile::ProjectileParams;
use crate::types::constants;
use crate::waves::WaveParams;

/// Error type for configuration and preset loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("Preset not found: {0}")]
    NotFound(String),

    #[error("Unknown experiment: {0}")]
    UnknownExperiment(String),

    #[error("Invalid parameter {field}: {value}")]
    InvalidParameter { field: &'static str, value: f64 },
}

pub type Result<T> = std::result::Result<T, ConfigError>;

/// Fails with `InvalidParameter` if `value` is non-finite or outside `range`.
pub fn check_range(field: &'static str, value: f64, range: &RangeInclusive<f64>) -> Result<()> {
    if value.is_finite() && range.contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::InvalidParameter { field, value })
    }
}

/// Force `value` into `range`. Non-finite values map to the lower bound.
pub fn clamp_to(value: f64, range: &RangeInclusive<f64>) -> f64 {
    if value.is_finite() {
        value.clamp(*range.start(), *range.end())
    } else {
        *range.start()
    }
}

/// Host timing settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LabConfig {
    /// Integration step (s)
    pub fixed_dt: f64,
    /// Largest wall-clock delta a single frame may contribute (s)
    pub max_frame_delta: f64,
    /// Fixed steps released per frame at most
    pub max_steps_per_frame: usize,
    /// Measurements kept by `MeasurementLog`
    pub measurement_log_capacity: usize,
}

impl Default for LabConfig {
    fn default() -> Self {
        Self {
            fixed_dt: constants::FIXED_DT,
            max_frame_delta: constants::MAX_FRAME_DELTA,
            max_steps_per_frame: 8,
            measurement_log_capacity: 120,
        }
    }
}

impl LabConfig {
    pub fn from_yaml_str(contents: &str) -> Result<Self> {
        let config: LabConfig = serde_yaml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Self::from_yaml_str(&contents)
    }

    pub fn validate(&self) -> Result<()> {
        check_range("fixed_dt", self.fixed_dt, &(1e-4..=0.1))?;
        check_range("max_frame_delta", self.max_frame_delta, &(self.fixed_dt..=1.0))?;
        if self.max_steps_per_frame == 0 {
            return Err(ConfigError::InvalidParameter {
                field: "max_steps_per_frame",
                value: 0.0,
            });
        }
        Ok(())
    }
}

/// Preset loader with configurable base directory.
pub struct PresetLoader {
    base_path: PathBuf,
}

impl PresetLoader {
    /// Create a new loader with the given base path.
    ///
    /// The base path should contain one subdirectory per experiment id.
    pub fn new<P: AsRef<Path>>(base_path: P) -> Self {
        Self {
            base_path: base_path.as_ref().to_path_buf(),
        }
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Load `lab.yaml` from the base directory, or defaults if it is absent.
    pub fn load_lab_config(&self) -> Result<LabConfig> {
        let path = self.base_path.join("lab.yaml");
        if !path.exists() {
            return Ok(LabConfig::default());
        }
        LabConfig::load(path)
    }

    /// Load a pendulum preset by name (without .yaml extension).
    ///
    /// # Example
    /// ```ignore
    /// let loader = PresetLoader::new("presets");
    /// let params = loader.load_pendulum("long_swing")?;
    /// ```
    pub fn load_pendulum(&self, name: &str) -> Result<PendulumParams> {
        let params: PendulumParams = self.load(Experiment::Pendulum, name)?;
        params.validate()?;
        Ok(params)
    }

    pub fn load_projectile(&self, name: &str) -> Result<ProjectileParams> {
        let params: ProjectileParams = self.load(Experiment::Projectile, name)?;
        params.validate()?;
        Ok(params)
    }

    pub fn load_free_fall(&self, name: &str) -> Result<FreeFallParams> {
        let params: FreeFallParams = self.load(Experiment::FreeFall, name)?;
        params.validate()?;
        Ok(params)
    }

    pub fn load_ohms_law(&self, name: &str) -> Result<OhmsLawParams> {
        let params: OhmsLawParams = self.load(Experiment::OhmsLaw, name)?;
        params.validate()?;
        Ok(params)
    }

    pub fn load_waves(&self, name: &str) -> Result<WaveParams> {
        let params: WaveParams = self.load(Experiment::Waves, name)?;
        params.validate()?;
        Ok(params)
    }

    /// Load a preset for whichever experiment is named.
    pub fn load_params(&self, experiment: Experiment, name: &str) -> Result<ExperimentParams> {
        Ok(match experiment {
            Experiment::Pendulum => ExperimentParams::Pendulum(self.load_pendulum(name)?),
            Experiment::Projectile => ExperimentParams::Projectile(self.load_projectile(name)?),
            Experiment::FreeFall => ExperimentParams::FreeFall(self.load_free_fall(name)?),
            Experiment::OhmsLaw => ExperimentParams::OhmsLaw(self.load_ohms_law(name)?),
            Experiment::Waves => ExperimentParams::Waves(self.load_waves(name)?),
        })
    }

    /// List the presets available for an experiment, sorted by name.
    pub fn list_presets(&self, experiment: Experiment) -> Result<Vec<String>> {
        let path = self.base_path.join(experiment.id());
        if !path.exists() {
            return Ok(vec![]);
        }

        let mut names = Vec::new();
        for entry in fs::read_dir(&path)? {
            let entry = entry?;
            let file_name = entry.file_name();
            let name = file_name.to_string_lossy();
            if name.ends_with(".yaml") {
                names.push(name.trim_end_matches(".yaml").to_string());
            }
        }
        names.sort();
        Ok(names)
    }

    fn load<T: DeserializeOwned>(&self, experiment: Experiment, name: &str) -> Result<T> {
        let path = self
            .base_path
            .join(experiment.id())
            .join(format!("{}.yaml", name));
        if !path.exists() {
            return Err(ConfigError::NotFound(format!("{}/{}", experiment.id(), name)));
        }
        let contents = fs::read_to_string(&path)?;
        let params: T = serde_yaml::from_str(&contents)?;
        log::debug!("loaded preset {}/{} from {}", experiment.id(), name, path.display());
        Ok(params)
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;

    fn presets_path() -> PathBuf {
        let manifest_dir = env::var("CARGO_MANIFEST_DIR").unwrap_or_else(|_| ".".to_string());
        PathBuf::from(manifest_dir).join("..").join("presets")
    }

    fn write_preset(dir: &Path, experiment: &str, name: &str, contents: &str) {
        let sub = dir.join(experiment);
        fs::create_dir_all(&sub).unwrap();
        fs::write(sub.join(format!("{}.yaml", name)), contents).unwrap();
    }

    #[test]
    fn test_load_bundled_pendulum_preset() {
        let loader = PresetLoader::new(presets_path());
        let result = loader.load_pendulum("default");

        assert!(result.is_ok(), "Should load pendulum/default: {:?}", result.err());
        assert_eq!(result.unwrap(), PendulumParams::default());
    }

    #[test]
    fn test_every_bundled_preset_is_valid() {
        let loader = PresetLoader::new(presets_path());
        for experiment in Experiment::ALL {
            let names = loader.list_presets(experiment).unwrap();
            assert!(!names.is_empty(), "no presets for {}", experiment.id());
            for name in names {
                let result = loader.load_params(experiment, &name);
                assert!(
                    result.is_ok(),
                    "{}/{} failed: {:?}",
                    experiment.id(),
                    name,
                    result.err()
                );
            }
        }
    }

    #[test]
    fn test_bundled_lab_config() {
        let loader = PresetLoader::new(presets_path());
        let config = loader.load_lab_config().unwrap();
        assert_eq!(config, LabConfig::default());
    }

    #[test]
    fn test_load_nonexistent_preset() {
        let dir = tempfile::tempdir().unwrap();
        let loader = PresetLoader::new(dir.path());
        let result = loader.load_projectile("nonexistent_xyz");

        match result {
            Err(ConfigError::NotFound(name)) => {
                assert_eq!(name, "projectile/nonexistent_xyz");
            }
            other => panic!("Expected NotFound error, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_fields_take_defaults() {
        let dir = tempfile::tempdir().unwrap();
        write_preset(dir.path(), "free-fall", "moon", "gravity: 1.62\n");

        let loader = PresetLoader::new(dir.path());
        let params = loader.load_free_fall("moon").unwrap();
        assert_eq!(params.gravity, 1.62);
        assert_eq!(params.height, FreeFallParams::default().height);
    }

    #[test]
    fn test_out_of_range_preset_rejected() {
        let dir = tempfile::tempdir().unwrap();
        write_preset(dir.path(), "ohms-law", "short", "voltage: 5\nresistance: 0\n");

        let loader = PresetLoader::new(dir.path());
        match loader.load_ohms_law("short") {
            Err(ConfigError::InvalidParameter { field, value }) => {
                assert_eq!(field, "resistance");
                assert_eq!(value, 0.0);
            }
            other => panic!("Expected InvalidParameter, got {:?}", other),
        }
    }

    #[test]
    fn test_malformed_yaml() {
        let dir = tempfile::tempdir().unwrap();
        write_preset(dir.path(), "waves", "broken", "freq1: [not, a, number\n");

        let loader = PresetLoader::new(dir.path());
        assert!(matches!(loader.load_waves("broken"), Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_list_presets_sorted_and_filtered() {
        let dir = tempfile::tempdir().unwrap();
        write_preset(dir.path(), "pendulum", "zeta", "length: 100\n");
        write_preset(dir.path(), "pendulum", "alpha", "length: 120\n");
        fs::write(dir.path().join("pendulum").join("notes.txt"), "ignored").unwrap();

        let loader = PresetLoader::new(dir.path());
        let names = loader.list_presets(Experiment::Pendulum).unwrap();
        assert_eq!(names, vec!["alpha".to_string(), "zeta".to_string()]);
        assert!(loader.list_presets(Experiment::Waves).unwrap().is_empty());
    }

    #[test]
    fn test_lab_config_validation() {
        assert!(LabConfig::from_yaml_str("fixed_dt: 0.01\n").is_ok());
        assert!(LabConfig::from_yaml_str("max_steps_per_frame: 0\n").is_err());
        assert!(LabConfig::from_yaml_str("fixed_dt: 2.0\n").is_err());
    }

    #[test]
    fn test_clamp_to_handles_non_finite() {
        let range = 1.0..=20.0;
        assert_eq!(clamp_to(f64::NAN, &range), 1.0);
        assert_eq!(clamp_to(f64::INFINITY, &range), 1.0);
        assert_eq!(clamp_to(25.0, &range), 20.0);
        assert!(check_range("g", f64::NAN, &range).is_err());
    }
}

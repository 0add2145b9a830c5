//! Run configuration, from command-line arguments or a JSON file.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{IoError, Result};
use crate::rules::{ChangeMaterialProperty, Isotropy};

/// Where injected orientations come from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OrientationSource {
    /// Estimate from the mesh.
    #[default]
    Estimate,
    /// Angles from a `;`-delimited table, one row per fiber.
    Table { path: PathBuf },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaterialPropertyChange {
    pub material: String,
    pub property: String,
    pub isotropy: Isotropy,
    pub values: Vec<f64>,
}

impl MaterialPropertyChange {
    pub fn rule(&self) -> Result<ChangeMaterialProperty> {
        ChangeMaterialProperty::new(
            self.material.clone(),
            self.property.clone(),
            self.isotropy,
            self.values.clone(),
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub input: PathBuf,
    /// Rewritten deck; no deck is written when unset.
    pub output: Option<PathBuf>,
    pub family_candidates: Vec<String>,
    /// Material of the injected sections; defaults to the one on the replaced section.
    pub material: Option<String>,
    pub source: OrientationSource,
    pub compare: bool,
    pub break_point: Option<String>,
    pub material_property: Option<MaterialPropertyChange>,
    pub report: Option<PathBuf>,
    pub debug_dump: Option<PathBuf>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            input: PathBuf::new(),
            output: None,
            family_candidates: vec!["Fiber".to_string()],
            material: None,
            source: OrientationSource::Estimate,
            compare: true,
            break_point: None,
            material_property: None,
            report: None,
            debug_dump: None,
        }
    }
}

impl RunConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = fs::read(path)?;
        let config: Self = serde_json::from_slice(&bytes)?;
        log::debug!("loaded run configuration from {}", path.display());
        Ok(config)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serde_json::to_vec_pretty(self)?)?;
        Ok(())
    }

    /// Reject configurations that would fail halfway through a run.
    pub fn validate(&self) -> Result<()> {
        if self.input.as_os_str().is_empty() {
            return Err(IoError::Config("no input deck given".into()));
        }
        if self.family_candidates.iter().all(|c| c.trim().is_empty()) {
            return Err(IoError::Config("no fiber family candidates given".into()));
        }
        if self.output.as_deref() == Some(self.input.as_path()) {
            return Err(IoError::Config(format!(
                "output would overwrite the input deck {}",
                self.input.display()
            )));
        }
        if let Some(change) = &self.material_property {
            change.rule()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_uses_defaults() {
        let config: RunConfig = serde_json::from_str(
            r#"{
                "input": "coupon.inp",
                "source": { "kind": "table", "path": "orientation.txt" },
                "material_property": {
                    "material": "Carbon_Fiber",
                    "property": "Conductivity",
                    "isotropy": "Orthotropic",
                    "values": [6.83e-3, 2.18e-3, 2.18e-3]
                }
            }"#,
        )
        .expect("config should parse");

        assert_eq!(config.family_candidates, vec!["Fiber"]);
        assert!(config.compare);
        assert_eq!(
            config.source,
            OrientationSource::Table {
                path: PathBuf::from("orientation.txt")
            }
        );
        config.validate().expect("config should be valid");
    }

    #[test]
    fn save_and_load_round_trip() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("nested").join("run.json");
        let config = RunConfig {
            input: "a.inp".into(),
            output: Some("out/a.inp".into()),
            break_point: Some("*Step".into()),
            ..RunConfig::default()
        };
        config.save(&path).unwrap();
        assert_eq!(RunConfig::load(&path).unwrap(), config);
    }

    #[test]
    fn invalid_configs_are_rejected() {
        assert!(RunConfig::default().validate().is_err());

        let same = RunConfig {
            input: "a.inp".into(),
            output: Some("a.inp".into()),
            ..RunConfig::default()
        };
        assert!(matches!(same.validate(), Err(IoError::Config(_))));

        let bad_values = RunConfig {
            input: "a.inp".into(),
            material_property: Some(MaterialPropertyChange {
                material: "CF".into(),
                property: "Conductivity".into(),
                isotropy: Isotropy::Orthotropic,
                values: vec![1.0],
            }),
            ..RunConfig::default()
        };
        assert!(bad_values.validate().is_err());
    }
}

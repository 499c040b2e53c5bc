//! # Settings Module
//!
//! ## Purpose
//! JSON configuration of a simulation session: which process model to build, with which
//! component options, parameter profile and overrides, where to cache the compiled
//! component registry and how verbose the log is.
//!
//! ## Usage Pattern
//! ```rust,ignore
//! use KiSan::settings::ModelSettings;
//!
//! let settings = ModelSettings::load(Path::new("model.json"))?;
//! settings.init_logging()?;
//! let collection = settings.build_processes()?;
//! ```
//!
//! ## File layout
//! | Field                | Default | Meaning                                      |
//! |----------------------|---------|----------------------------------------------|
//! | `model`              | ASM1    | ASM1, CANDO, CANDO3 or SHARON                |
//! | `profile`            | none    | named parameter profile applied after compile |
//! | `parameter_overrides`| empty   | name -> value, applied after the profile     |
//! | `component_cache`    | none    | path of the registry snapshot                |
//! | `log_level`          | info    | off, error, warn, info, debug, trace         |
//! | `asm1`, `cando`, ... | model defaults | component options of each model      |
use crate::Components::component_errors::ComponentError;
use crate::Components::registry::ComponentRegistry;
use crate::Kinetics::kinetics_errors::KineticsError;
use crate::Kinetics::processes::ProcessCollection;
use crate::Models::asm1::{Asm1Options, asm1, asm1_components};
use crate::Models::cando::{CandoOptions, cando, cando_components};
use crate::Models::cando3::{Cando3Options, cando3, cando3_components};
use crate::Models::sharon::{SharonOptions, sharon, sharon_components};
use crate::Utils::logger::{LoggerError, init_logger, parse_level};
use log::info;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("Invalid settings: {0}")]
    Invalid(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error(transparent)]
    Logger(#[from] LoggerError),
    #[error(transparent)]
    Component(#[from] ComponentError),
    #[error(transparent)]
    Kinetics(#[from] KineticsError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ModelKind {
    ASM1,
    CANDO,
    CANDO3,
    SHARON,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelSettings {
    pub model: ModelKind,
    pub profile: Option<String>,
    pub parameter_overrides: BTreeMap<String, f64>,
    pub component_cache: Option<PathBuf>,
    pub log_level: String,
    pub asm1: Asm1Options,
    pub cando: CandoOptions,
    pub cando3: Cando3Options,
    pub sharon: SharonOptions,
}

impl Default for ModelSettings {
    fn default() -> Self {
        ModelSettings {
            model: ModelKind::ASM1,
            profile: None,
            parameter_overrides: BTreeMap::new(),
            component_cache: None,
            log_level: "info".to_string(),
            asm1: Asm1Options::default(),
            cando: CandoOptions::default(),
            cando3: Cando3Options::default(),
            sharon: SharonOptions::default(),
        }
    }
}

impl ModelSettings {
    pub fn validate(&self) -> Result<(), SettingsError> {
        parse_level(&self.log_level)?;
        if let Some((name, value)) = self
            .parameter_overrides
            .iter()
            .find(|(_, v)| !v.is_finite())
        {
            return Err(SettingsError::Invalid(format!(
                "override of '{}' is not finite: {}",
                name, value
            )));
        }
        if let Some(profile) = &self.profile {
            if profile.trim().is_empty() {
                return Err(SettingsError::Invalid("empty profile name".to_string()));
            }
        }
        Ok(())
    }

    pub fn from_json(json: &str) -> Result<Self, SettingsError> {
        let settings: ModelSettings = serde_json::from_str(json)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        let content = fs::read_to_string(path)?;
        let settings = Self::from_json(&content)?;
        info!("model settings loaded from {}", path.display());
        Ok(settings)
    }

    pub fn save(&self, path: &Path) -> Result<(), SettingsError> {
        self.validate()?;
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Installs the terminal logger at `log_level`.
    pub fn init_logging(&self) -> Result<(), SettingsError> {
        init_logger(parse_level(&self.log_level)?)?;
        Ok(())
    }

    /// identifies the component set in the cache: model plus its options
    fn cache_key(&self) -> Result<String, SettingsError> {
        let options = match self.model {
            ModelKind::ASM1 => serde_json::to_string(&self.asm1)?,
            ModelKind::CANDO => serde_json::to_string(&self.cando)?,
            ModelKind::CANDO3 => serde_json::to_string(&self.cando3)?,
            ModelKind::SHARON => serde_json::to_string(&self.sharon)?,
        };
        Ok(format!("{:?}:{}", self.model, options))
    }

    fn build_components(&self) -> Result<ComponentRegistry, ComponentError> {
        match self.model {
            ModelKind::ASM1 => asm1_components(&self.asm1),
            ModelKind::CANDO => cando_components(&self.cando),
            ModelKind::CANDO3 => cando3_components(&self.cando3),
            ModelKind::SHARON => sharon_components(&self.sharon),
        }
    }

    /// Compiled component registry of the model, read from the cache when configured.
    pub fn build_registry(&self) -> Result<Arc<ComponentRegistry>, SettingsError> {
        let registry = match &self.component_cache {
            Some(path) => {
                ComponentRegistry::load_or_build(path, &self.cache_key()?, || self.build_components())?
            }
            None => self.build_components()?,
        };
        Ok(Arc::new(registry))
    }

    /// model + profile + overrides -> compiled process collection
    pub fn build_processes(&self) -> Result<ProcessCollection, SettingsError> {
        self.validate()?;
        let registry = self.build_registry()?;
        let mut collection = match self.model {
            ModelKind::ASM1 => asm1(&registry)?,
            ModelKind::CANDO => cando(&registry)?,
            ModelKind::CANDO3 => cando3(&registry)?,
            ModelKind::SHARON => sharon(&registry)?,
        };
        if let Some(profile) = &self.profile {
            collection.apply_profile(profile)?;
        }
        if !self.parameter_overrides.is_empty() {
            let updates: Vec<(&str, f64)> = self
                .parameter_overrides
                .iter()
                .map(|(name, value)| (name.as_str(), *value))
                .collect();
            collection.set_parameters(&updates)?;
        }
        info!(
            "{:?}: {} processes over {} components",
            self.model,
            collection.len(),
            registry.len()
        );
        Ok(collection)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use tempfile::{NamedTempFile, tempdir};

    #[test]
    fn test_defaults_from_empty_json() {
        let settings = ModelSettings::from_json("{}").unwrap();
        assert_eq!(settings, ModelSettings::default());
        assert_eq!(settings.model, ModelKind::ASM1);
    }

    #[test]
    fn test_rejects_unknown_model_and_level() {
        assert!(matches!(
            ModelSettings::from_json(r#"{"model": "ASM2d"}"#),
            Err(SettingsError::Serialization(_))
        ));
        assert!(matches!(
            ModelSettings::from_json(r#"{"log_level": "loud"}"#),
            Err(SettingsError::Logger(LoggerError::UnknownLevel(_)))
        ));
    }

    #[test]
    fn test_save_load_round_trip() {
        let settings = ModelSettings {
            model: ModelKind::SHARON,
            parameter_overrides: BTreeMap::from([("mu_AOB".to_string(), 2.0)]),
            log_level: "debug".to_string(),
            ..ModelSettings::default()
        };
        let file = NamedTempFile::new().unwrap();
        settings.save(file.path()).unwrap();
        assert_eq!(ModelSettings::load(file.path()).unwrap(), settings);
    }

    #[test]
    fn test_build_with_profile_and_overrides() {
        let settings = ModelSettings {
            profile: Some("10C".to_string()),
            parameter_overrides: BTreeMap::from([("K_S".to_string(), 15.0)]),
            ..ModelSettings::default()
        };
        let collection = settings.build_processes().unwrap();
        assert_eq!(collection.len(), 8);
        assert_relative_eq!(collection.parameter("mu_H").unwrap(), 3.0);
        assert_relative_eq!(collection.parameter("K_S").unwrap(), 15.0);
    }

    #[test]
    fn test_unknown_override_is_an_error() {
        let settings = ModelSettings {
            parameter_overrides: BTreeMap::from([("mu_X".to_string(), 1.0)]),
            ..ModelSettings::default()
        };
        assert!(matches!(
            settings.build_processes(),
            Err(SettingsError::Kinetics(KineticsError::UnknownParameter(_)))
        ));
        let settings = ModelSettings {
            profile: Some("35C".to_string()),
            ..ModelSettings::default()
        };
        assert!(matches!(
            settings.build_processes(),
            Err(SettingsError::Kinetics(KineticsError::UnknownProfile(_)))
        ));
    }

    #[test]
    fn test_every_model_builds() {
        for model in [ModelKind::ASM1, ModelKind::CANDO, ModelKind::CANDO3, ModelKind::SHARON] {
            let settings = ModelSettings {
                model,
                ..ModelSettings::default()
            };
            let collection = settings.build_processes().unwrap();
            assert!(!collection.is_empty());
        }
    }

    #[test]
    fn test_component_cache_is_reused() {
        let dir = tempdir().unwrap();
        let cache = dir.path().join("components.json");
        let settings = ModelSettings {
            model: ModelKind::CANDO,
            component_cache: Some(cache.clone()),
            ..ModelSettings::default()
        };
        let fresh = settings.build_processes().unwrap();
        assert!(cache.exists());
        let cached = settings.build_processes().unwrap();
        assert_eq!(fresh.registry().ids(), cached.registry().ids());
        assert_eq!(fresh.stoichiometry(), cached.stoichiometry());

        // other options invalidate the snapshot
        let other = ModelSettings {
            cando: CandoOptions {
                i_P_BM: 0.03,
                ..CandoOptions::default()
            },
            ..settings
        };
        let rebuilt = other.build_registry().unwrap();
        assert_relative_eq!(rebuilt.get("X_DPAO").unwrap().i_P, 0.03);
    }
}

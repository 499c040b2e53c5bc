//! Named kinetic/stoichiometric parameters of a process model.
//!
//! `ParameterTable` is the single post-compile mutation point of a `ProcessCollection`.
//! Updates are all-or-nothing: every name and value of a batch is checked before any of
//! them is written.
use crate::Kinetics::kinetics_errors::KineticsError;
use log::{info, warn};
use prettytable::{Table, row};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterSpec {
    pub name: String,
    pub default: f64,
    #[serde(default)]
    pub unit: String,
    #[serde(default)]
    pub description: String,
}

impl ParameterSpec {
    pub fn new(name: &str, default: f64) -> Self {
        ParameterSpec {
            name: name.to_string(),
            default,
            unit: String::new(),
            description: String::new(),
        }
    }

    pub fn with_unit(mut self, unit: &str) -> Self {
        self.unit = unit.to_string();
        self
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.description = description.to_string();
        self
    }
}

/// shorthand for model tables: (name, default, unit, description)
pub fn specs(table: &[(&str, f64, &str, &str)]) -> Vec<ParameterSpec> {
    table
        .iter()
        .map(|(name, default, unit, description)| {
            ParameterSpec::new(name, *default)
                .with_unit(unit)
                .with_description(description)
        })
        .collect()
}

/// A named set of parameter values, e.g. rate constants at 10 °C.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterProfile {
    pub name: String,
    pub values: Vec<(String, f64)>,
}

impl ParameterProfile {
    pub fn new(name: &str, values: &[(&str, f64)]) -> Self {
        ParameterProfile {
            name: name.to_string(),
            values: values.iter().map(|(n, v)| (n.to_string(), *v)).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ParameterTable {
    specs: Vec<ParameterSpec>,
    values: Vec<f64>,
    index: HashMap<String, usize>,
}

impl ParameterTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Table at default values. A repeated name keeps its first definition.
    pub fn from_specs(specs: &[ParameterSpec]) -> Result<Self, KineticsError> {
        let mut table = ParameterTable::new();
        for spec in specs {
            table.insert(spec.clone())?;
        }
        Ok(table)
    }

    /// Adds a parameter unless its name is already present; returns its index.
    pub fn insert(&mut self, spec: ParameterSpec) -> Result<usize, KineticsError> {
        if let Some(&i) = self.index.get(&spec.name) {
            if self.specs[i].default != spec.default {
                warn!(
                    "parameter {} declared twice with defaults {} and {}, keeping the first",
                    spec.name, self.specs[i].default, spec.default
                );
            }
            return Ok(i);
        }
        if !spec.default.is_finite() {
            return Err(KineticsError::InvalidParameterValue {
                name: spec.name,
                value: spec.default,
            });
        }
        let i = self.specs.len();
        self.index.insert(spec.name.clone(), i);
        self.values.push(spec.default);
        self.specs.push(spec);
        Ok(i)
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn index(&self, name: &str) -> Result<usize, KineticsError> {
        self.index
            .get(name)
            .copied()
            .ok_or_else(|| KineticsError::UnknownParameter(name.to_string()))
    }

    pub fn get(&self, name: &str) -> Result<f64, KineticsError> {
        Ok(self.values[self.index(name)?])
    }

    pub fn spec(&self, name: &str) -> Result<&ParameterSpec, KineticsError> {
        Ok(&self.specs[self.index(name)?])
    }

    pub fn specs(&self) -> &[ParameterSpec] {
        &self.specs
    }

    pub fn names(&self) -> Vec<&str> {
        self.specs.iter().map(|s| s.name.as_str()).collect()
    }

    /// current values, in declaration order
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn as_pairs(&self) -> Vec<(String, f64)> {
        self.specs
            .iter()
            .zip(&self.values)
            .map(|(s, v)| (s.name.clone(), *v))
            .collect()
    }

    /// Checks a batch of updates without applying it; returns the target slots.
    pub fn validate_updates(&self, updates: &[(&str, f64)]) -> Result<Vec<usize>, KineticsError> {
        updates
            .iter()
            .map(|(name, value)| {
                let i = self.index(name)?;
                if !value.is_finite() {
                    return Err(KineticsError::InvalidParameterValue {
                        name: name.to_string(),
                        value: *value,
                    });
                }
                Ok(i)
            })
            .collect()
    }

    /// Applies all updates or none of them.
    pub fn set_parameters(&mut self, updates: &[(&str, f64)]) -> Result<(), KineticsError> {
        let slots = self.validate_updates(updates)?;
        for (slot, (name, value)) in slots.into_iter().zip(updates) {
            info!("parameter {} = {}", name, value);
            self.values[slot] = *value;
        }
        Ok(())
    }

    pub fn reset_defaults(&mut self) {
        self.values = self.specs.iter().map(|s| s.default).collect();
    }

    pub fn show(&self) {
        let mut table = Table::new();
        table.add_row(row!["parameter", "value", "default", "unit", "description"]);
        for (spec, value) in self.specs.iter().zip(&self.values) {
            table.add_row(row![
                spec.name,
                format!("{:.4}", value),
                format!("{:.4}", spec.default),
                spec.unit,
                spec.description
            ]);
        }
        table.printstd();
    }
}

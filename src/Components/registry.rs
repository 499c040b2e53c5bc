//! # Component registry
//!
//! ## Aim
//! Ordered, name-indexed collection of `Component`s shared read-only by every process
//! and unit operation of a model. A registry is assembled with `add`/`extend`, then
//! `compile`d: compilation validates every record and freezes the order, after which
//! `add` and `remove` fail with `ComponentError::ImmutableRegistry`.
//!
//! ## Key Methods
//! - `compile()`: validation and freezing, idempotent.
//! - `index()`, `indices()`, `subgroup()`: column lookups used by process matrices.
//! - `conversion_factors()`, `conversion_matrix()`: per-quantity factor vectors.
//! - group queries (`gases`, `solids`, `substrates`, `active_biomass`, ...).
//! - `save_cache()`, `load_cache()`, `load_or_build()`: JSON snapshot of a compiled
//!   registry. A loaded snapshot compares equal to the freshly built registry.
use crate::Components::component::{Component, ConservedQuantity, ParticleSize};
use crate::Components::component_errors::ComponentError;
use log::{info, warn};
use nalgebra::{DMatrix, DVector};
use prettytable::{Cell, Row, Table};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;

const SNAPSHOT_FORMAT: u32 = 1;

#[derive(Debug, Clone, Default)]
pub struct ComponentRegistry {
    components: Vec<Component>,
    index: HashMap<String, usize>,
    compiled: bool,
}

impl PartialEq for ComponentRegistry {
    fn eq(&self, other: &Self) -> bool {
        self.compiled == other.compiled && self.components == other.components
    }
}

/// Two handles name the same component set: the same allocation, or equal content
/// (a registry reloaded from its cache is interchangeable with the original).
pub fn same_registry(a: &Arc<ComponentRegistry>, b: &Arc<ComponentRegistry>) -> bool {
    Arc::ptr_eq(a, b) || **a == **b
}

#[derive(Serialize, Deserialize)]
struct RegistrySnapshot {
    format: u32,
    key: String,
    components: Vec<Component>,
}

impl ComponentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// uncompiled registry holding `components` in the given order
    pub fn from_components(components: Vec<Component>) -> Result<Self, ComponentError> {
        let mut registry = Self::new();
        registry.extend(components)?;
        Ok(registry)
    }

    pub fn add(&mut self, component: Component) -> Result<(), ComponentError> {
        if self.compiled {
            return Err(ComponentError::ImmutableRegistry {
                operation: "add",
                id: component.id,
            });
        }
        if self.index.contains_key(&component.id) {
            return Err(ComponentError::DuplicateComponent(component.id));
        }
        self.index.insert(component.id.clone(), self.components.len());
        self.components.push(component);
        Ok(())
    }

    pub fn extend<I>(&mut self, components: I) -> Result<(), ComponentError>
    where
        I: IntoIterator<Item = Component>,
    {
        for component in components {
            self.add(component)?;
        }
        Ok(())
    }

    pub fn remove(&mut self, id: &str) -> Result<Component, ComponentError> {
        if self.compiled {
            return Err(ComponentError::ImmutableRegistry {
                operation: "remove",
                id: id.to_string(),
            });
        }
        let position = self.index(id)?;
        let removed = self.components.remove(position);
        self.rebuild_index();
        Ok(removed)
    }

    fn rebuild_index(&mut self) {
        self.index = self
            .components
            .iter()
            .enumerate()
            .map(|(i, c)| (c.id.clone(), i))
            .collect();
    }

    /// Validates every component and freezes the registry. Compiling twice is a no-op.
    pub fn compile(&mut self) -> Result<(), ComponentError> {
        if self.compiled {
            return Ok(());
        }
        for component in &self.components {
            component.validate()?;
        }
        self.rebuild_index();
        self.compiled = true;
        info!(
            "compiled component registry with {} components",
            self.components.len()
        );
        Ok(())
    }

    /// consuming form of `compile` for builder chains
    pub fn compiled(mut self) -> Result<Self, ComponentError> {
        self.compile()?;
        Ok(self)
    }

    pub fn is_compiled(&self) -> bool {
        self.compiled
    }

    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    pub fn components(&self) -> &[Component] {
        &self.components
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Component> {
        self.components.iter()
    }

    pub fn ids(&self) -> Vec<&str> {
        self.components.iter().map(|c| c.id.as_str()).collect()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    pub fn get(&self, id: &str) -> Result<&Component, ComponentError> {
        let i = self.index(id)?;
        Ok(&self.components[i])
    }

    pub fn index(&self, id: &str) -> Result<usize, ComponentError> {
        self.index
            .get(id)
            .copied()
            .ok_or_else(|| ComponentError::UndefinedComponent(id.to_string()))
    }

    pub fn indices(&self, ids: &[&str]) -> Result<Vec<usize>, ComponentError> {
        ids.iter().map(|id| self.index(id)).collect()
    }

    /// Deep copy of component `id` under `new_id`. The registry itself is unchanged.
    pub fn copy(&self, id: &str, new_id: &str) -> Result<Component, ComponentError> {
        Ok(self.get(id)?.copy(new_id))
    }

    /// New compiled registry made of the listed components, in the listed order.
    pub fn subgroup(&self, ids: &[&str]) -> Result<ComponentRegistry, ComponentError> {
        let mut sub = ComponentRegistry::new();
        for id in ids {
            sub.add(self.get(id)?.clone())?;
        }
        sub.compiled()
    }

    /// factor of every component for one conserved quantity, in registry order
    pub fn conversion_factors(&self, quantity: ConservedQuantity) -> DVector<f64> {
        DVector::from_iterator(
            self.components.len(),
            self.components.iter().map(|c| c.factor(quantity)),
        )
    }

    /// quantities x components
    pub fn conversion_matrix(&self, quantities: &[ConservedQuantity]) -> DMatrix<f64> {
        DMatrix::from_fn(quantities.len(), self.components.len(), |q, j| {
            self.components[j].factor(quantities[q])
        })
    }

    ////////////////////////////GROUPS////////////////////////////////////

    fn filter_ids<F: Fn(&Component) -> bool>(&self, predicate: F) -> Vec<String> {
        self.components
            .iter()
            .filter(|c| predicate(c))
            .map(|c| c.id.clone())
            .collect()
    }

    pub fn gases(&self) -> Vec<String> {
        self.filter_ids(|c| c.particle_size == ParticleSize::DissolvedGas)
    }

    pub fn solubles(&self) -> Vec<String> {
        self.filter_ids(|c| c.particle_size == ParticleSize::Soluble)
    }

    pub fn colloids(&self) -> Vec<String> {
        self.filter_ids(|c| c.particle_size == ParticleSize::Colloidal)
    }

    pub fn solids(&self) -> Vec<String> {
        self.filter_ids(|c| c.particle_size == ParticleSize::Particulate)
    }

    pub fn organics(&self) -> Vec<String> {
        self.filter_ids(|c| c.organic)
    }

    pub fn inorganics(&self) -> Vec<String> {
        self.filter_ids(|c| !c.organic)
    }

    /// degradable organics that are not biomass
    pub fn substrates(&self) -> Vec<String> {
        self.filter_ids(|c| c.organic && c.degradability.is_degradable() && !c.biomass)
    }

    pub fn biomass(&self) -> Vec<String> {
        self.filter_ids(|c| c.biomass)
    }

    pub fn active_biomass(&self) -> Vec<String> {
        self.filter_ids(|c| c.biomass && c.degradability.is_degradable())
    }

    /// particulate organics that do not degrade
    pub fn inert_biomass(&self) -> Vec<String> {
        self.filter_ids(|c| {
            c.organic && c.is_particulate() && !c.degradability.is_degradable()
        })
    }

    pub fn show(&self) {
        let mut table = Table::new();
        table.add_row(Row::new(
            [
                "id", "measured as", "size", "degradability", "organic", "i_COD", "i_N", "i_P",
                "i_charge", "i_mass",
            ]
            .iter()
            .map(|h| Cell::new(h))
            .collect(),
        ));
        for c in &self.components {
            table.add_row(Row::new(vec![
                Cell::new(&c.id),
                Cell::new(&c.measured_as.to_string()),
                Cell::new(&c.particle_size.to_string()),
                Cell::new(&c.degradability.to_string()),
                Cell::new(if c.organic { "yes" } else { "no" }),
                Cell::new(&format!("{:.4}", c.i_COD)),
                Cell::new(&format!("{:.4}", c.i_N)),
                Cell::new(&format!("{:.4}", c.i_P)),
                Cell::new(&format!("{:.5}", c.i_charge)),
                Cell::new(&format!("{:.4}", c.i_mass)),
            ]));
        }
        table.printstd();
    }

    ////////////////////////////CACHE////////////////////////////////////

    /// JSON snapshot of a compiled registry; `key` identifies what the snapshot was built from
    pub fn to_json(&self, key: &str) -> Result<String, ComponentError> {
        if !self.compiled {
            return Err(ComponentError::NotCompiled("serialization"));
        }
        let snapshot = RegistrySnapshot {
            format: SNAPSHOT_FORMAT,
            key: key.to_string(),
            components: self.components.clone(),
        };
        Ok(serde_json::to_string_pretty(&snapshot)?)
    }

    /// Rebuilds and recompiles a registry from a snapshot, returning it with its key.
    pub fn from_json(json: &str) -> Result<(ComponentRegistry, String), ComponentError> {
        let snapshot: RegistrySnapshot = serde_json::from_str(json)?;
        if snapshot.format != SNAPSHOT_FORMAT {
            return Err(ComponentError::InvalidProperty {
                id: snapshot.key,
                reason: format!("unsupported snapshot format {}", snapshot.format),
            });
        }
        let registry = ComponentRegistry::from_components(snapshot.components)?.compiled()?;
        Ok((registry, snapshot.key))
    }

    pub fn save_cache(&self, path: &Path, key: &str) -> Result<(), ComponentError> {
        fs::write(path, self.to_json(key)?)?;
        info!("component registry cached to {}", path.display());
        Ok(())
    }

    pub fn load_cache(path: &Path) -> Result<(ComponentRegistry, String), ComponentError> {
        let json = fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Loads the snapshot at `path` when it was written for `key`, otherwise runs
    /// `builder` and refreshes the snapshot.
    pub fn load_or_build<F>(path: &Path, key: &str, builder: F) -> Result<Self, ComponentError>
    where
        F: FnOnce() -> Result<ComponentRegistry, ComponentError>,
    {
        if path.exists() {
            match Self::load_cache(path) {
                Ok((registry, cached_key)) if cached_key == key => {
                    info!("component registry '{}' loaded from cache", key);
                    return Ok(registry);
                }
                Ok((_, cached_key)) => warn!(
                    "cache {} holds '{}', rebuilding '{}'",
                    path.display(),
                    cached_key,
                    key
                ),
                Err(e) => warn!("cannot read cache {}: {}", path.display(), e),
            }
        }
        let registry = builder()?.compiled()?;
        registry.save_cache(path, key)?;
        Ok(registry)
    }
}

//! # Waste stream
//!
//! Multi-component stream over a shared compiled `ComponentRegistry`. Component flows
//! are kept in kg/hr of each component's measured unit (kg COD/hr for COD-based
//! organics, kg N/hr for nitrogen species, ...), the volumetric flow in m3/hr.
//! Concentrations and composite measures (COD, BOD5, TN, TP, TC, TSS) are in g/m3.
//!
//! A stream with zero volumetric flow (e.g. a gas outlet) has zero concentrations.
use crate::Components::component::{ConservedQuantity, ParticleSize};
use crate::Components::component_errors::ComponentError;
use crate::Components::registry::{ComponentRegistry, same_registry};
use crate::Units::unit_errors::UnitError;
use log::debug;
use nalgebra::DVector;
use prettytable::{Cell, Row, Table};
use std::sync::Arc;

/// kg/hr * 1000 / (m3/hr) = g/m3
const G_PER_KG: f64 = 1e3;

#[derive(Debug, Clone)]
pub struct WasteStream {
    pub id: String,
    registry: Arc<ComponentRegistry>,
    mass: DVector<f64>,
    F_vol: f64,
}

impl WasteStream {
    pub fn empty(id: &str, registry: &Arc<ComponentRegistry>) -> Result<Self, UnitError> {
        if !registry.is_compiled() {
            return Err(ComponentError::NotCompiled("waste stream").into());
        }
        Ok(WasteStream {
            id: id.to_string(),
            registry: Arc::clone(registry),
            mass: DVector::zeros(registry.len()),
            F_vol: 0.0,
        })
    }

    /// Stream from component mass flows (kg/hr) and a volumetric flow (m3/hr).
    pub fn new(
        id: &str,
        registry: &Arc<ComponentRegistry>,
        masses: &[(&str, f64)],
        F_vol: f64,
    ) -> Result<Self, UnitError> {
        let mut stream = WasteStream::empty(id, registry)?;
        stream.set_F_vol(F_vol)?;
        for (component, value) in masses {
            stream.set_mass(component, *value)?;
        }
        Ok(stream)
    }

    /// Stream from concentrations (g/m3) at a volumetric flow (m3/hr).
    pub fn from_concentrations(
        id: &str,
        registry: &Arc<ComponentRegistry>,
        concentrations: &[(&str, f64)],
        F_vol: f64,
    ) -> Result<Self, UnitError> {
        let masses: Vec<(&str, f64)> = concentrations
            .iter()
            .map(|(component, c)| (*component, c * F_vol / G_PER_KG))
            .collect();
        WasteStream::new(id, registry, &masses, F_vol)
    }

    fn invalid(&self, reason: String) -> UnitError {
        UnitError::InvalidFlow {
            stream: self.id.clone(),
            reason,
        }
    }

    fn check_registry(&self, other: &WasteStream, context: &str) -> Result<(), UnitError> {
        if same_registry(&self.registry, &other.registry) {
            Ok(())
        } else {
            Err(UnitError::RegistryMismatch {
                context: format!("{} '{}' with '{}'", context, self.id, other.id),
            })
        }
    }

    pub fn registry(&self) -> &Arc<ComponentRegistry> {
        &self.registry
    }

    pub fn F_vol(&self) -> f64 {
        self.F_vol
    }

    pub fn set_F_vol(&mut self, F_vol: f64) -> Result<(), UnitError> {
        if !(F_vol >= 0.0 && F_vol.is_finite()) {
            return Err(self.invalid(format!("volumetric flow must be non-negative, got {}", F_vol)));
        }
        self.F_vol = F_vol;
        Ok(())
    }

    pub fn mass(&self, id: &str) -> Result<f64, UnitError> {
        Ok(self.mass[self.registry.index(id)?])
    }

    /// kg/hr per component, registry order
    pub fn masses(&self) -> &DVector<f64> {
        &self.mass
    }

    pub fn set_mass(&mut self, id: &str, value: f64) -> Result<(), UnitError> {
        let i = self.registry.index(id)?;
        if !(value >= 0.0 && value.is_finite()) {
            return Err(self.invalid(format!("mass flow of {} must be non-negative, got {}", id, value)));
        }
        self.mass[i] = value;
        Ok(())
    }

    /// Replaces every component flow at once.
    pub fn set_masses(&mut self, masses: DVector<f64>) -> Result<(), UnitError> {
        if masses.len() != self.registry.len() {
            return Err(self.invalid(format!(
                "expected {} component flows, got {}",
                self.registry.len(),
                masses.len()
            )));
        }
        if let Some((i, value)) = masses
            .iter()
            .enumerate()
            .find(|(_, v)| !(**v >= 0.0 && v.is_finite()))
        {
            let id = self.registry.components()[i].id.clone();
            return Err(self.invalid(format!("mass flow of {} must be non-negative, got {}", id, value)));
        }
        self.mass = masses;
        Ok(())
    }

    /// Sets all flows to zero.
    pub fn clear(&mut self) {
        self.mass.fill(0.0);
        self.F_vol = 0.0;
    }

    pub fn is_empty(&self) -> bool {
        self.F_vol == 0.0 && self.mass.iter().all(|m| *m == 0.0)
    }

    /// g/m3 in the measured unit of component `id`
    pub fn concentration(&self, id: &str) -> Result<f64, UnitError> {
        Ok(self.per_volume(self.mass(id)?))
    }

    /// g/m3 per component, registry order
    pub fn concentrations(&self) -> DVector<f64> {
        self.mass.map(|m| self.per_volume(m))
    }

    fn per_volume(&self, kg_per_hr: f64) -> f64 {
        if self.F_vol > 0.0 {
            kg_per_hr * G_PER_KG / self.F_vol
        } else {
            0.0
        }
    }

    /// kg/hr of a conserved quantity carried by the stream
    pub fn quantity_flow(&self, quantity: ConservedQuantity) -> f64 {
        self.registry.conversion_factors(quantity).dot(&self.mass)
    }

    /// kg COD/hr
    pub fn COD_flow(&self) -> f64 {
        self.quantity_flow(ConservedQuantity::COD)
    }

    /// total mass flow of the actual species, kg/hr
    pub fn F_mass(&self) -> f64 {
        self.quantity_flow(ConservedQuantity::Mass)
    }

    pub fn COD(&self) -> f64 {
        self.per_volume(self.COD_flow())
    }

    pub fn BOD5(&self) -> f64 {
        let flow: f64 = self
            .registry
            .iter()
            .zip(self.mass.iter())
            .map(|(c, m)| c.i_COD * c.f_BOD5_COD * m)
            .sum();
        self.per_volume(flow)
    }

    pub fn TN(&self) -> f64 {
        self.per_volume(self.quantity_flow(ConservedQuantity::N))
    }

    pub fn TP(&self) -> f64 {
        self.per_volume(self.quantity_flow(ConservedQuantity::P))
    }

    pub fn TC(&self) -> f64 {
        self.per_volume(self.quantity_flow(ConservedQuantity::C))
    }

    /// Total suspended solids: particulate and colloidal matter, g/m3.
    pub fn TSS(&self) -> f64 {
        let flow: f64 = self
            .registry
            .iter()
            .zip(self.mass.iter())
            .filter(|(c, _)| {
                matches!(
                    c.particle_size,
                    ParticleSize::Particulate | ParticleSize::Colloidal
                )
            })
            .map(|(c, m)| c.i_mass * m)
            .sum();
        self.per_volume(flow)
    }

    /// Overwrites this stream with the sum of `streams`.
    pub fn mix_from(&mut self, streams: &[&WasteStream]) -> Result<(), UnitError> {
        for stream in streams {
            self.check_registry(stream, "mixing")?;
        }
        let mut mass = DVector::zeros(self.registry.len());
        let mut F_vol = 0.0;
        for stream in streams {
            mass += &stream.mass;
            F_vol += stream.F_vol;
        }
        self.mass = mass;
        self.F_vol = F_vol;
        Ok(())
    }

    /// Copies flows and volumetric flow of `other`, keeping this stream's id.
    pub fn copy_like(&mut self, other: &WasteStream) -> Result<(), UnitError> {
        self.check_registry(other, "copying")?;
        self.mass.copy_from(&other.mass);
        self.F_vol = other.F_vol;
        Ok(())
    }

    /// Splits the stream into `ids.len()` streams by flow fractions summing to 1.
    pub fn split(&self, ids: &[&str], fractions: &[f64]) -> Result<Vec<WasteStream>, UnitError> {
        if ids.len() != fractions.len() {
            return Err(self.invalid(format!(
                "{} outlet ids for {} split fractions",
                ids.len(),
                fractions.len()
            )));
        }
        if fractions.iter().any(|f| !(0.0..=1.0).contains(f)) {
            return Err(self.invalid(format!("split fractions must lie in [0, 1]: {:?}", fractions)));
        }
        let total: f64 = fractions.iter().sum();
        if (total - 1.0).abs() > 1e-9 {
            return Err(self.invalid(format!("split fractions sum to {}, not 1", total)));
        }
        Ok(ids
            .iter()
            .zip(fractions)
            .map(|(id, f)| WasteStream {
                id: id.to_string(),
                registry: Arc::clone(&self.registry),
                mass: &self.mass * *f,
                F_vol: self.F_vol * f,
            })
            .collect())
    }

    /// Moves every dissolved gas into `gas`.
    pub fn degassing(&mut self, gas: &mut WasteStream) -> Result<(), UnitError> {
        self.check_registry(gas, "degassing")?;
        for (i, component) in self.registry.iter().enumerate() {
            if component.is_gas() && self.mass[i] > 0.0 {
                debug!("{}: {} kg/hr of {} to {}", self.id, self.mass[i], component.id, gas.id);
                gas.mass[i] += self.mass[i];
                self.mass[i] = 0.0;
            }
        }
        Ok(())
    }

    /// Multiplies the flows of the listed components by `factor`.
    pub fn scale_components(&mut self, ids: &[&str], factor: f64) -> Result<(), UnitError> {
        if !(factor >= 0.0 && factor.is_finite()) {
            return Err(self.invalid(format!("scale factor must be non-negative, got {}", factor)));
        }
        let indices = self.registry.indices(ids)?;
        for i in indices {
            self.mass[i] *= factor;
        }
        Ok(())
    }

    pub fn show(&self) {
        let mut table = Table::new();
        table.add_row(Row::new(vec![
            Cell::new(&format!("{} ({:.4} m3/hr)", self.id, self.F_vol)),
            Cell::new("kg/hr"),
            Cell::new("g/m3"),
        ]));
        for (component, m) in self.registry.iter().zip(self.mass.iter()) {
            if *m != 0.0 {
                table.add_row(Row::new(vec![
                    Cell::new(&component.id),
                    Cell::new(&format!("{:.6}", m)),
                    Cell::new(&format!("{:.3}", self.per_volume(*m))),
                ]));
            }
        }
        for (name, value) in [
            ("COD", self.COD()),
            ("BOD5", self.BOD5()),
            ("TN", self.TN()),
            ("TP", self.TP()),
            ("TSS", self.TSS()),
        ] {
            table.add_row(Row::new(vec![
                Cell::new(name),
                Cell::new(""),
                Cell::new(&format!("{:.3}", value)),
            ]));
        }
        table.printstd();
    }
}

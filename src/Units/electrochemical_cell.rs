//! # Electrochemical cell
//!
//! Nutrient recovery cell. The influent and the cleaning agent are mixed; per component,
//! a `recovery` fraction goes to the recovered outlet and a `removal` fraction to the
//! removed outlet. Everything else, and the whole volumetric flow, leaves as residual.
use crate::Units::unit_api::{UnitConfig, UnitOperation, check_fraction, check_streams};
use crate::Units::unit_errors::UnitError;
use crate::Units::waste_stream::WasteStream;
use log::info;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

const N_INS: usize = 2;
const N_OUTS: usize = 3;
const UNIT: &str = "electrochemical cell";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ElectroChemCellConfig {
    pub recovery: BTreeMap<String, f64>,
    pub removal: BTreeMap<String, f64>,
}

impl Default for ElectroChemCellConfig {
    fn default() -> Self {
        ElectroChemCellConfig {
            recovery: BTreeMap::from([("S_NH4".to_string(), 0.6)]),
            removal: BTreeMap::from([("S_NH4".to_string(), 0.2)]),
        }
    }
}

impl UnitConfig for ElectroChemCellConfig {
    fn validate(&self) -> Result<(), UnitError> {
        for (id, fraction) in &self.recovery {
            check_fraction(UNIT, &format!("recovery of {}", id), *fraction)?;
        }
        for (id, fraction) in &self.removal {
            check_fraction(UNIT, &format!("removal of {}", id), *fraction)?;
            let total = fraction + self.recovery.get(id).copied().unwrap_or(0.0);
            if total > 1.0 + 1e-12 {
                return Err(UnitError::InvalidConfig {
                    unit: UNIT.to_string(),
                    reason: format!("recovery and removal of {} sum to {} > 1", id, total),
                });
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct ElectroChemCell {
    id: String,
    config: ElectroChemCellConfig,
    /// (registry index, recovery, removal)
    splits: Vec<(usize, f64, f64)>,
    ins: Vec<WasteStream>,
    outs: Vec<WasteStream>,
}

impl ElectroChemCell {
    /// Inlets: influent, cleaning agent. Outlets: recovered, removed, residual.
    pub fn new(
        id: &str,
        ins: Vec<WasteStream>,
        outs: Vec<WasteStream>,
        config: ElectroChemCellConfig,
    ) -> Result<Self, UnitError> {
        check_streams(id, &ins, &outs, N_INS, N_OUTS)?;
        config.validate()?;
        let splits = Self::resolve(id, &ins[0], &config)?;
        Ok(ElectroChemCell {
            id: id.to_string(),
            config,
            splits,
            ins,
            outs,
        })
    }

    pub fn from_inlets(
        id: &str,
        influent: WasteStream,
        cleaner: WasteStream,
        config: ElectroChemCellConfig,
    ) -> Result<Self, UnitError> {
        let registry = influent.registry().clone();
        let outs = ["recovered", "removed", "residual"]
            .iter()
            .map(|suffix| WasteStream::empty(&format!("{}_{}", id, suffix), &registry))
            .collect::<Result<Vec<_>, _>>()?;
        ElectroChemCell::new(id, vec![influent, cleaner], outs, config)
    }

    fn resolve(
        unit: &str,
        stream: &WasteStream,
        config: &ElectroChemCellConfig,
    ) -> Result<Vec<(usize, f64, f64)>, UnitError> {
        let mut ids: Vec<&String> = config.recovery.keys().chain(config.removal.keys()).collect();
        ids.sort();
        ids.dedup();
        ids.into_iter()
            .map(|id| {
                let i = stream
                    .registry()
                    .index(id)
                    .map_err(|_| UnitError::MissingComponent {
                        unit: unit.to_string(),
                        component: id.clone(),
                    })?;
                Ok((
                    i,
                    config.recovery.get(id).copied().unwrap_or(0.0),
                    config.removal.get(id).copied().unwrap_or(0.0),
                ))
            })
            .collect()
    }

    pub fn config(&self) -> &ElectroChemCellConfig {
        &self.config
    }

    pub fn recovered(&self) -> &WasteStream {
        &self.outs[0]
    }

    pub fn removed(&self) -> &WasteStream {
        &self.outs[1]
    }

    pub fn residual(&self) -> &WasteStream {
        &self.outs[2]
    }
}

impl UnitOperation for ElectroChemCell {
    fn id(&self) -> &str {
        &self.id
    }

    fn n_ins(&self) -> usize {
        N_INS
    }

    fn n_outs(&self) -> usize {
        N_OUTS
    }

    fn ins(&self) -> &[WasteStream] {
        &self.ins
    }

    fn ins_mut(&mut self) -> &mut [WasteStream] {
        &mut self.ins
    }

    fn outs(&self) -> &[WasteStream] {
        &self.outs
    }

    fn run(&mut self) -> Result<(), UnitError> {
        check_streams(&self.id, &self.ins, &self.outs, N_INS, N_OUTS)?;
        let mut mixture = WasteStream::empty(&format!("{}_mixture", self.id), self.ins[0].registry())?;
        mixture.mix_from(&[&self.ins[0], &self.ins[1]])?;
        let total = mixture.masses();
        let mut recovered = total.map(|_| 0.0);
        let mut removed = recovered.clone();
        let mut residual = total.clone();
        for &(i, recovery, removal) in &self.splits {
            recovered[i] = total[i] * recovery;
            removed[i] = total[i] * removal;
            residual[i] = (total[i] - recovered[i] - removed[i]).max(0.0);
        }
        self.outs[0].set_masses(recovered)?;
        self.outs[0].set_F_vol(0.0)?;
        self.outs[1].set_masses(removed)?;
        self.outs[1].set_F_vol(0.0)?;
        self.outs[2].set_masses(residual)?;
        self.outs[2].set_F_vol(mixture.F_vol())?;
        info!(
            "{}: {:.4} kg/hr recovered, {:.4} kg/hr removed",
            self.id,
            self.outs[0].masses().sum(),
            self.outs[1].masses().sum()
        );
        Ok(())
    }
}

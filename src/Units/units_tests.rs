#[cfg(test)]
mod tests {
    use crate::Components::component::ConservedQuantity;
    use crate::Components::registry::ComponentRegistry;
    use crate::Units::anaerobic_reactor::{AnaerobicReactor, AnaerobicReactorConfig};
    use crate::Units::electrochemical_cell::{ElectroChemCell, ElectroChemCellConfig};
    use crate::Units::unit_api::{SanUnit, UnitConfig, UnitOperation, quantity_residual};
    use crate::Units::unit_errors::UnitError;
    use crate::Units::waste_stream::WasteStream;
    use approx::assert_relative_eq;
    use std::io::Write;
    use std::sync::Arc;
    use tempfile::NamedTempFile;

    const IDS: [&str; 12] = [
        "S_F", "X_B_Subst", "X_U_Inf", "S_NH4", "S_NO3", "S_CH4", "S_CO2", "S_N2O", "S_N2",
        "S_PO4", "S_K", "H2O",
    ];

    fn registry() -> Arc<ComponentRegistry> {
        Arc::new(ComponentRegistry::load_default().unwrap().subgroup(&IDS).unwrap())
    }

    fn waste(registry: &Arc<ComponentRegistry>) -> WasteStream {
        WasteStream::from_concentrations(
            "waste",
            registry,
            &[
                ("S_F", 300.0),
                ("X_B_Subst", 700.0),
                ("X_U_Inf", 50.0),
                ("S_NH4", 40.0),
                ("S_PO4", 8.0),
                ("H2O", 1e6),
            ],
            10.0,
        )
        .unwrap()
    }

    #[test]
    fn test_waste_stream_composites() {
        let registry = registry();
        let stream = waste(&registry);
        assert_relative_eq!(stream.COD(), 1050.0, epsilon = 1e-9);
        assert_relative_eq!(stream.COD_flow(), 10.5, epsilon = 1e-12);
        let expected_TN = 40.0 + 300.0 * 0.03 + 700.0 * 0.04 + 50.0 * 0.06;
        assert_relative_eq!(stream.TN(), expected_TN, epsilon = 1e-9);
        let expected_TSS = 700.0 * 0.75 + 50.0 * 0.75;
        assert_relative_eq!(stream.TSS(), expected_TSS, epsilon = 1e-9);
        let empty = WasteStream::empty("gas", &registry).unwrap();
        assert!(empty.is_empty());
        assert_eq!(empty.COD(), 0.0);
    }

    #[test]
    fn test_waste_stream_split_and_mix() {
        let registry = registry();
        let stream = waste(&registry);
        let parts = stream.split(&["a", "b"], &[0.25, 0.75]).unwrap();
        assert_relative_eq!(parts[0].F_vol(), 2.5);
        assert_relative_eq!(parts[1].COD(), stream.COD(), epsilon = 1e-9);
        let mut mixed = WasteStream::empty("mixed", &registry).unwrap();
        mixed.mix_from(&[&parts[0], &parts[1]]).unwrap();
        assert_relative_eq!(mixed.F_vol(), 10.0);
        assert_relative_eq!(mixed.COD_flow(), stream.COD_flow(), epsilon = 1e-12);
        assert!(stream.split(&["a", "b"], &[0.5, 0.6]).is_err());
    }

    #[test]
    fn test_mixing_across_registries_fails() {
        let stream = waste(&registry());
        let other = Arc::new(
            ComponentRegistry::load_default()
                .unwrap()
                .subgroup(&["S_NH4", "H2O"])
                .unwrap(),
        );
        let mut mixed = WasteStream::empty("mixed", &other).unwrap();
        assert!(matches!(
            mixed.mix_from(&[&stream]),
            Err(UnitError::RegistryMismatch { .. })
        ));
    }

    #[test]
    fn test_degassing() {
        let registry = registry();
        let mut liquid =
            WasteStream::new("liquid", &registry, &[("S_CH4", 1.0), ("S_NH4", 2.0)], 1.0).unwrap();
        let mut gas = WasteStream::empty("gas", &registry).unwrap();
        liquid.degassing(&mut gas).unwrap();
        assert_eq!(liquid.mass("S_CH4").unwrap(), 0.0);
        assert_eq!(gas.mass("S_CH4").unwrap(), 1.0);
        assert_eq!(liquid.mass("S_NH4").unwrap(), 2.0);
    }

    #[test]
    fn test_units_dispatch_through_san_unit() {
        let registry = registry();
        let reactor = AnaerobicReactor::from_inlet(
            "ABR",
            waste(&registry),
            AnaerobicReactorConfig {
                N_removal: 0.2,
                ..AnaerobicReactorConfig::default()
            },
        )
        .unwrap();
        let cleaner = WasteStream::new("cleaner", &registry, &[("S_K", 1.0)], 0.1).unwrap();
        let cell = ElectroChemCell::from_inlets(
            "EC",
            waste(&registry),
            cleaner,
            ElectroChemCellConfig::default(),
        )
        .unwrap();
        let mut units: Vec<SanUnit> = vec![reactor.into(), cell.into()];
        for unit in units.iter_mut() {
            unit.run().unwrap();
            assert_eq!(unit.ins().len(), unit.n_ins());
            assert_eq!(unit.outs().len(), unit.n_outs());
            for quantity in [ConservedQuantity::N, ConservedQuantity::P] {
                assert_relative_eq!(quantity_residual(&*unit, quantity), 0.0, epsilon = 1e-9);
            }
        }
        assert_eq!(units[0].id(), "ABR");
        assert_eq!(units[1].n_outs(), 3);
    }

    #[test]
    fn test_rerun_after_inlet_change() {
        let registry = registry();
        let mut reactor = AnaerobicReactor::from_inlet(
            "ABR",
            waste(&registry),
            AnaerobicReactorConfig::default(),
        )
        .unwrap();
        reactor.run().unwrap();
        let first = reactor.results().CH4_produced;
        reactor.ins_mut()[0].scale_components(&["S_F", "X_B_Subst"], 2.0).unwrap();
        reactor.run().unwrap();
        assert_relative_eq!(reactor.results().CH4_produced, 2.0 * first, epsilon = 1e-9);
    }

    #[test]
    fn test_config_loaded_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"{{"COD_removal": 0.6, "CH4_capture": 0.9, "degraded_components": ["X_B_Subst"]}}"#
        )
        .unwrap();
        let config = AnaerobicReactorConfig::load(file.path()).unwrap();
        assert_eq!(config.COD_removal, 0.6);
        assert_eq!(config.MCF_decay, 0.8);
        assert_eq!(config.degraded_components, vec!["X_B_Subst".to_string()]);

        let mut bad = NamedTempFile::new().unwrap();
        writeln!(bad, r#"{{"COD_removal": 1.6}}"#).unwrap();
        assert!(matches!(
            AnaerobicReactorConfig::load(bad.path()),
            Err(UnitError::InvalidConfig { .. })
        ));
        let mut broken = NamedTempFile::new().unwrap();
        writeln!(broken, "COD_removal = 0.6").unwrap();
        assert!(matches!(
            AnaerobicReactorConfig::load(broken.path()),
            Err(UnitError::Serialization(_))
        ));
    }
}

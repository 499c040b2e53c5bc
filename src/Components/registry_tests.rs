#[cfg(test)]
mod tests {
    use crate::Components::component::{
        Component, ConservedQuantity, Degradability, MeasuredAs, ParticleSize,
    };
    use crate::Components::component_errors::ComponentError;
    use crate::Components::registry::ComponentRegistry;
    use approx::assert_relative_eq;
    use tempfile::tempdir;

    fn small_registry() -> ComponentRegistry {
        let default = ComponentRegistry::load_default().unwrap();
        default
            .subgroup(&["S_NH4", "S_NO3", "S_N2", "X_OHO", "S_F", "H2O"])
            .unwrap()
    }

    #[test]
    fn test_load_default() {
        let registry = ComponentRegistry::load_default().unwrap();
        assert!(registry.is_compiled());
        assert!(registry.contains("S_NO3"));
        assert!(registry.contains("X_PAO_PP"));
        assert_eq!(registry.index("S_H2").unwrap(), 0);
        let water = registry.get("H2O").unwrap();
        assert_relative_eq!(water.molar_mass.unwrap(), 18.015, epsilon = 1e-3);
    }

    #[test]
    fn test_immutable_after_compile() {
        let mut registry = small_registry();
        let extra = registry.copy("S_NO3", "S_NOx").unwrap();
        let added = registry.add(extra);
        assert!(matches!(
            added,
            Err(ComponentError::ImmutableRegistry {
                operation: "add",
                ..
            })
        ));
        let removed = registry.remove("S_NO3");
        assert!(matches!(
            removed,
            Err(ComponentError::ImmutableRegistry {
                operation: "remove",
                ..
            })
        ));
        assert_eq!(registry.len(), 6);
    }

    #[test]
    fn test_add_remove_before_compile() {
        let mut registry = ComponentRegistry::new();
        let c = Component::new(
            "X_1",
            MeasuredAs::COD,
            ParticleSize::Particulate,
            Degradability::Slowly,
            true,
        );
        registry.add(c.clone()).unwrap();
        assert!(matches!(
            registry.add(c.copy("X_1")),
            Err(ComponentError::DuplicateComponent(_))
        ));
        registry.add(c.copy("X_2")).unwrap();
        registry.add(c.copy("X_3")).unwrap();
        registry.remove("X_2").unwrap();
        assert_eq!(registry.ids(), vec!["X_1", "X_3"]);
        assert_eq!(registry.index("X_3").unwrap(), 1);
        registry.compile().unwrap();
        // second compile is a no-op
        registry.compile().unwrap();
        assert!(registry.is_compiled());
    }

    #[test]
    fn test_compile_rejects_invalid_component() {
        let mut registry = ComponentRegistry::new();
        let bad = Component::new(
            "S_bad",
            MeasuredAs::Itself,
            ParticleSize::Soluble,
            Degradability::Readily,
            false,
        );
        registry.add(bad).unwrap();
        assert!(matches!(
            registry.compile(),
            Err(ComponentError::InvalidProperty { .. })
        ));
        assert!(!registry.is_compiled());
    }

    #[test]
    fn test_groups() {
        let registry = ComponentRegistry::load_default().unwrap();
        let gases = registry.gases();
        assert!(gases.contains(&"S_N2".to_string()));
        assert!(gases.contains(&"S_CH4".to_string()));
        assert!(registry.active_biomass().contains(&"X_PAO".to_string()));
        assert_eq!(registry.inert_biomass(), vec!["X_U_Inf".to_string()]);
        let substrates = registry.substrates();
        assert!(substrates.contains(&"S_F".to_string()));
        assert!(!substrates.contains(&"X_OHO".to_string()));
        assert!(registry.inorganics().contains(&"S_PO4".to_string()));
        assert!(registry.solids().contains(&"X_PAO_PP".to_string()));
    }

    #[test]
    fn test_conversion_matrix() {
        let registry = small_registry();
        let m = registry.conversion_matrix(&[ConservedQuantity::N, ConservedQuantity::COD]);
        assert_eq!(m.shape(), (2, 6));
        assert_relative_eq!(m[(0, 0)], 1.0, epsilon = 1e-12);
        assert_relative_eq!(m[(0, 3)], 0.07, epsilon = 1e-12);
        assert_relative_eq!(m[(1, 3)], 1.0, epsilon = 1e-12);
        let charge = registry.conversion_factors(ConservedQuantity::Charge);
        assert!(charge[0] > 0.0 && charge[1] < 0.0);
    }

    #[test]
    fn test_oxygen_carries_exactly_minus_one_cod() {
        let registry = ComponentRegistry::load_default().unwrap();
        let o2 = registry.get("S_O2").unwrap();
        assert_eq!(o2.factor(ConservedQuantity::COD), -1.0);
    }

    #[test]
    fn test_cache_roundtrip_is_interchangeable() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("components.json");
        let fresh = small_registry();
        fresh.save_cache(&path, "small").unwrap();
        let (loaded, key) = ComponentRegistry::load_cache(&path).unwrap();
        assert_eq!(key, "small");
        assert_eq!(loaded, fresh);
        assert_eq!(loaded.ids(), fresh.ids());
        assert_eq!(
            loaded.conversion_matrix(&ConservedQuantity::ALL),
            fresh.conversion_matrix(&ConservedQuantity::ALL)
        );
    }

    #[test]
    fn test_load_or_build_uses_key() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("cache.json");
        let mut builds = 0;
        let first = ComponentRegistry::load_or_build(&path, "v1", || {
            builds += 1;
            Ok(small_registry())
        })
        .unwrap();
        let second = ComponentRegistry::load_or_build(&path, "v1", || {
            builds += 1;
            Ok(small_registry())
        })
        .unwrap();
        assert_eq!(builds, 1);
        assert_eq!(first, second);
        let _third = ComponentRegistry::load_or_build(&path, "v2", || {
            builds += 1;
            Ok(small_registry())
        })
        .unwrap();
        assert_eq!(builds, 2);
    }

    #[test]
    fn test_uncompiled_registry_is_not_serialized() {
        let registry = ComponentRegistry::new();
        assert!(matches!(
            registry.to_json("x"),
            Err(ComponentError::NotCompiled(_))
        ));
    }
}

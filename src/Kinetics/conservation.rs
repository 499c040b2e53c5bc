//! # Conservation resolver
//!
//! ## Aim
//! Finds the `[?]` coefficients of a reaction template so that every conserved quantity
//! (COD, N, P, charge, ...) sums to zero over the signed coefficients.
//!
//! ## Method
//! One linear equation per conserved quantity `q`:
//!
//! ```text
//! sum_unknown(x_u * f_qu) = -sum_known(c_k * f_qk)
//! ```
//!
//! where `f` are the registry conversion factors (numbers) and `c_k` the known signed
//! coefficients (numbers or parameter expressions). The left-hand side matrix is numeric,
//! the right-hand side is kept as a `LinearForm`, so Gauss-Jordan elimination with partial
//! pivoting produces the unknowns as exact symbolic combinations of the known ones.
//! Rows are scaled by their largest single contribution before rank decisions.
//!
//! - rank < number of unknowns: `UnderdeterminedStoichiometry`
//! - a zero row of the eliminated matrix with a non-zero right-hand side:
//!   `OverdeterminedStoichiometry`, naming the quantity of that row. A right-hand side
//!   whose atoms cancel for every parameter value (see `LinearForm::sampled_constant`)
//!   counts as zero, so fully specified balanced rows compile.
//!
//! Finally all coefficients are divided by the magnitude of the reference component's
//! coefficient.
use crate::Components::component::ConservedQuantity;
use crate::Components::component_errors::ComponentError;
use crate::Components::registry::ComponentRegistry;
use crate::Kinetics::kinetics_errors::KineticsError;
use crate::Kinetics::linear_form::LinearForm;
use crate::Kinetics::reaction_template::{Coefficient, ReactionTemplate};
use crate::Kinetics::symbolic::Expr;
use log::debug;
use nalgebra::DMatrix;

/// relative tolerance of rank and residual tests
pub const RELATIVE_TOLERANCE: f64 = 1e-9;

pub struct ConservationResolver<'a> {
    registry: &'a ComponentRegistry,
    quantities: Vec<ConservedQuantity>,
    tolerance: f64,
}

impl<'a> ConservationResolver<'a> {
    /// `quantities` is the default set, a template's own `conserved_for` overrides it
    pub fn new(
        registry: &'a ComponentRegistry,
        quantities: &[ConservedQuantity],
    ) -> Result<Self, KineticsError> {
        if !registry.is_compiled() {
            return Err(ComponentError::NotCompiled("conservation solving").into());
        }
        Ok(ConservationResolver {
            registry,
            quantities: quantities.to_vec(),
            tolerance: RELATIVE_TOLERANCE,
        })
    }

    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    pub fn quantities_for<'t>(&'t self, template: &'t ReactionTemplate) -> &'t [ConservedQuantity] {
        match &template.conserved_for {
            Some(q) => q,
            None => &self.quantities,
        }
    }

    /// Signed, unnormalized coefficients in the order of `template.terms`.
    pub fn solve(&self, template: &ReactionTemplate) -> Result<Vec<LinearForm>, KineticsError> {
        let quantities = self.quantities_for(template);
        let mut components = Vec::with_capacity(template.terms.len());
        for term in &template.terms {
            components.push(self.registry.get(&term.component)?);
        }
        let unknowns: Vec<usize> = (0..template.terms.len())
            .filter(|&i| template.terms[i].coefficient == Coefficient::Unknown)
            .collect();
        let known: Vec<(usize, LinearForm)> = template
            .terms
            .iter()
            .enumerate()
            .filter_map(|(i, term)| {
                term.coefficient
                    .as_expr()
                    .map(|e| (i, LinearForm::from_expr(&e).scale(term.side.sign())))
            })
            .collect();

        let (m, n) = (quantities.len(), unknowns.len());
        let mut a = DMatrix::<f64>::zeros(m, n);
        let mut b: Vec<LinearForm> = Vec::with_capacity(m);
        for (row, q) in quantities.iter().enumerate() {
            let mut scale: f64 = 0.0;
            for (col, &u) in unknowns.iter().enumerate() {
                a[(row, col)] = components[u].factor(*q);
                scale = scale.max(a[(row, col)].abs());
            }
            let mut rhs = LinearForm::constant(0.0);
            for (k, coefficient) in &known {
                let contribution = coefficient.scale(components[*k].factor(*q));
                scale = scale.max(contribution.magnitude());
                rhs = rhs.sub(&contribution);
            }
            // an all-zero row stays zero, any scale will do
            let scale = if scale > 0.0 { scale } else { 1.0 };
            for col in 0..n {
                a[(row, col)] /= scale;
            }
            b.push(rhs.scale(1.0 / scale));
        }

        // original row of every position, kept through the swaps
        let mut row_of: Vec<usize> = (0..m).collect();
        let mut pivots: Vec<usize> = Vec::new();
        let mut r = 0;
        for col in 0..n {
            if r == m {
                break;
            }
            let (best, best_abs) = (r..m)
                .map(|i| (i, a[(i, col)].abs()))
                .fold((r, -1.0), |acc, x| if x.1 > acc.1 { x } else { acc });
            if best_abs <= self.tolerance {
                continue;
            }
            a.swap_rows(r, best);
            b.swap(r, best);
            row_of.swap(r, best);
            let p = a[(r, col)];
            for i in 0..m {
                if i == r {
                    continue;
                }
                let f = a[(i, col)] / p;
                if f == 0.0 {
                    continue;
                }
                for j in 0..n {
                    a[(i, j)] -= f * a[(r, j)];
                }
                a[(i, col)] = 0.0;
                b[i] = b[i].sub(&b[r].scale(f));
            }
            pivots.push(col);
            r += 1;
        }

        if r < n {
            return Err(KineticsError::UnderdeterminedStoichiometry {
                process: template.id.clone(),
                unknowns: unknowns
                    .iter()
                    .map(|&u| template.terms[u].component.clone())
                    .collect(),
                independent: r,
            });
        }
        for i in r..m {
            if !b[i].is_zero(self.tolerance) && b[i].sampled_constant(self.tolerance) != Some(0.0) {
                return Err(KineticsError::OverdeterminedStoichiometry {
                    process: template.id.clone(),
                    quantity: quantities[row_of[i]].to_string(),
                });
            }
        }

        let mut solution: Vec<LinearForm> = vec![LinearForm::constant(0.0); template.terms.len()];
        for (k, coefficient) in known {
            solution[k] = coefficient;
        }
        for (i, &col) in pivots.iter().enumerate() {
            let value = b[i].scale(1.0 / a[(i, col)]).cleaned(self.tolerance * 1e-3);
            let value = match value.sampled_constant(self.tolerance) {
                Some(c) if value.as_constant().is_none() => LinearForm::constant(c),
                _ => value,
            };
            debug!(
                "{}: {} = {}",
                template.id,
                template.terms[unknowns[col]].component,
                value.to_expr()
            );
            solution[unknowns[col]] = value;
        }
        Ok(solution)
    }

    /// Normalized stoichiometric row, one expression per registry component.
    pub fn resolve(&self, template: &ReactionTemplate) -> Result<Vec<Expr>, KineticsError> {
        let solution = self.solve(template)?;
        let exprs = normalize(template, &solution, self.tolerance)?;
        let mut row = vec![Expr::Const(0.0); self.registry.len()];
        for (term, expr) in template.terms.iter().zip(exprs) {
            row[self.registry.index(&term.component)?] = expr;
        }
        Ok(row)
    }
}

fn normalize(
    template: &ReactionTemplate,
    solution: &[LinearForm],
    tolerance: f64,
) -> Result<Vec<Expr>, KineticsError> {
    let Some(reference) = &template.reference else {
        return Ok(solution.iter().map(|lf| lf.to_expr()).collect());
    };
    let invalid = |reason: &str| KineticsError::InvalidReference {
        process: template.id.clone(),
        component: reference.clone(),
        reason: reason.to_string(),
    };
    let position = template
        .terms
        .iter()
        .position(|t| &t.component == reference)
        .ok_or_else(|| invalid("not part of the reaction"))?;
    let reference_value = &solution[position];
    match reference_value.as_constant() {
        Some(k) if k.abs() <= tolerance => Err(invalid("coefficient resolves to zero")),
        Some(k) => Ok(solution
            .iter()
            .map(|lf| lf.scale(1.0 / k.abs()).to_expr())
            .collect()),
        None => {
            let sign = template.terms[position].side.sign();
            let denominator = reference_value.scale(sign).to_expr();
            Ok(solution
                .iter()
                .enumerate()
                .map(|(i, lf)| {
                    if i == position {
                        Expr::Const(sign)
                    } else if lf.as_constant() == Some(0.0) {
                        Expr::Const(0.0)
                    } else {
                        (lf.to_expr() / denominator.clone()).symplify()
                    }
                })
                .collect())
        }
    }
}

/// Numeric re-check of a stoichiometric row (registry order) against `quantities`.
/// The residual of each quantity is compared with its largest single term.
pub fn check_conservation(
    process: &str,
    registry: &ComponentRegistry,
    row: &[f64],
    quantities: &[ConservedQuantity],
    tolerance: f64,
) -> Result<(), KineticsError> {
    if row.len() != registry.len() {
        return Err(KineticsError::DimensionMismatch {
            expected: registry.len(),
            found: row.len(),
        });
    }
    for q in quantities {
        let mut residual = 0.0;
        let mut largest: f64 = 0.0;
        for (coefficient, component) in row.iter().zip(registry.iter()) {
            let term = coefficient * component.factor(*q);
            residual += term;
            largest = largest.max(term.abs());
        }
        if residual.abs() > tolerance * largest.max(1.0) {
            return Err(KineticsError::ConservationViolated {
                process: process.to_string(),
                quantity: q.to_string(),
                residual,
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Components::component::ConservedQuantity::*;
    use crate::Kinetics::symbolic::{BoundExpr, Slot, as_const, variables};
    use approx::assert_relative_eq;

    fn registry() -> ComponentRegistry {
        ComponentRegistry::load_default()
            .unwrap()
            .subgroup(&[
                "S_F", "S_NH4", "S_NO2", "S_NO3", "S_N2", "S_PO4", "S_O2", "X_OHO", "S_CO3", "H2O",
            ])
            .unwrap()
    }

    fn eval(expr: &Expr, names: &[&str], values: &[f64]) -> f64 {
        let bound =
            BoundExpr::bind(expr, &|v: &str| names.iter().position(|n| *n == v).map(Slot::Parameter))
                .unwrap();
        bound.eval(&[], values).unwrap()
    }

    #[test]
    fn test_nitrate_to_nitrogen_gas_is_exactly_one() {
        let registry = registry();
        let resolver = ConservationResolver::new(&registry, &[N]).unwrap();
        let template = ReactionTemplate::new("denit", "S_NO3 -> [?]S_N2").unwrap();
        let row = resolver.resolve(&template).unwrap();
        assert_eq!(row[registry.index("S_NO3").unwrap()], Expr::Const(-1.0));
        assert_eq!(row[registry.index("S_N2").unwrap()], Expr::Const(1.0));
    }

    #[test]
    fn test_symbolic_growth_row() {
        let registry = registry();
        let resolver = ConservationResolver::new(&registry, &[COD, N, P]).unwrap();
        let template = ReactionTemplate::new(
            "aero_growth",
            "[1/Y_H]S_F + [?]S_O2 + [?]S_NH4 + [?]S_PO4 -> X_OHO",
        )
        .unwrap()
        .with_reference("X_OHO");
        let row = resolver.resolve(&template).unwrap();
        let o2 = &row[registry.index("S_O2").unwrap()];
        assert!(variables(o2).contains("Y_H"));
        // COD: -1/Y + x_O2 * i_COD(O2) + 1 = 0
        let y = 0.6;
        let f_o2 = registry.get("S_O2").unwrap().factor(COD);
        assert_relative_eq!(eval(o2, &["Y_H"], &[y]), (1.0 / y - 1.0) / f_o2, epsilon = 1e-9);
        let nh4 = eval(&row[registry.index("S_NH4").unwrap()], &["Y_H"], &[y]);
        assert_relative_eq!(nh4, -(0.07 - 0.03 / y), epsilon = 1e-9);
        let numeric: Vec<f64> = row.iter().map(|e| eval(e, &["Y_H"], &[y])).collect();
        check_conservation("aero_growth", &registry, &numeric, &[COD, N, P], 1e-9).unwrap();
    }

    #[test]
    fn test_numeric_reference_normalization() {
        let registry = registry();
        let resolver = ConservationResolver::new(&registry, &[N]).unwrap();
        let template = ReactionTemplate::new("p", "[2]S_NO3 -> [?]S_N2")
            .unwrap()
            .with_reference("S_N2");
        let row = resolver.resolve(&template).unwrap();
        assert_relative_eq!(as_const(&row[registry.index("S_N2").unwrap()]).unwrap(), 1.0);
        assert_relative_eq!(as_const(&row[registry.index("S_NO3").unwrap()]).unwrap(), -1.0);
    }

    #[test]
    fn test_symbolic_reference_normalization() {
        let registry = registry();
        let resolver = ConservationResolver::new(&registry, &[N]).unwrap();
        let template = ReactionTemplate::new("p", "[a]S_NO3 -> [?]S_N2")
            .unwrap()
            .with_reference("S_NO3");
        let row = resolver.resolve(&template).unwrap();
        assert_eq!(row[registry.index("S_NO3").unwrap()], Expr::Const(-1.0));
        assert_relative_eq!(
            eval(&row[registry.index("S_N2").unwrap()], &["a"], &[3.0]),
            1.0,
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_underdetermined() {
        let registry = registry();
        let resolver = ConservationResolver::new(&registry, &[N]).unwrap();
        let template = ReactionTemplate::new("p", "S_NO3 -> [?]S_N2 + [?]S_NH4").unwrap();
        match resolver.solve(&template) {
            Err(KineticsError::UnderdeterminedStoichiometry {
                unknowns,
                independent,
                ..
            }) => {
                assert_eq!(unknowns, vec!["S_N2".to_string(), "S_NH4".to_string()]);
                assert_eq!(independent, 1);
            }
            other => panic!("expected underdetermined, got {:?}", other),
        }
    }

    #[test]
    fn test_overdetermined_names_quantity() {
        let registry = registry();
        // the N balance fixes S_N2, the COD balance is then left unmet
        let resolver = ConservationResolver::new(&registry, &[N, COD]).unwrap();
        let template = ReactionTemplate::new("p", "S_NH4 -> [?]S_N2").unwrap();
        match resolver.solve(&template) {
            Err(KineticsError::OverdeterminedStoichiometry { quantity, .. }) => {
                assert_eq!(quantity, "COD")
            }
            other => panic!("expected overdetermined, got {:?}", other),
        }
    }

    #[test]
    fn test_redundant_equation_is_accepted() {
        let registry = registry();
        // no term carries P, the P row is all zeros
        let resolver = ConservationResolver::new(&registry, &[N, P]).unwrap();
        let template = ReactionTemplate::new("p", "S_NO3 -> [?]S_N2").unwrap();
        let solution = resolver.solve(&template).unwrap();
        assert_eq!(solution[1].as_constant(), Some(1.0));
    }

    #[test]
    fn test_square_system_with_three_unknowns() {
        let registry = registry();
        let resolver = ConservationResolver::new(&registry, &[COD, N, P]).unwrap();
        let template = ReactionTemplate::new("p", "X_OHO -> [?]S_F + [?]S_NH4 + [?]S_PO4").unwrap();
        let solution = resolver.solve(&template).unwrap();
        assert_relative_eq!(solution[1].as_constant().unwrap(), 1.0, epsilon = 1e-12);
        assert_relative_eq!(solution[2].as_constant().unwrap(), 0.07 - 0.03, epsilon = 1e-12);
        assert_relative_eq!(solution[3].as_constant().unwrap(), 0.02 - 0.01, epsilon = 1e-12);
    }

    #[test]
    fn test_fully_specified_balanced_row_compiles() {
        let registry = registry();
        let resolver = ConservationResolver::new(&registry, &[COD]).unwrap();
        // COD: -1/Y_H * 1 - (1 - Y_H)/Y_H * (-1) + 1 = 0 for every Y_H
        let template = ReactionTemplate::new("growth", "[1/Y_H]S_F + [(1-Y_H)/Y_H]S_O2 -> X_OHO")
            .unwrap()
            .with_reference("X_OHO");
        let row = resolver.resolve(&template).unwrap();
        let y = 0.67;
        let numeric: Vec<f64> = row.iter().map(|e| eval(e, &["Y_H"], &[y])).collect();
        check_conservation("growth", &registry, &numeric, &[COD], 1e-9).unwrap();
        assert_relative_eq!(numeric[registry.index("S_O2").unwrap()], -(1.0 - y) / y, epsilon = 1e-12);
    }

    #[test]
    fn test_unknown_left_at_zero_by_a_balanced_row() {
        let registry = registry();
        let resolver = ConservationResolver::new(&registry, &[COD]).unwrap();
        let template = ReactionTemplate::new(
            "growth",
            "[1/Y_H]S_F + [(1-Y_H)/Y_H]S_O2 -> X_OHO + [?]S_N2",
        )
        .unwrap();
        let solution = resolver.solve(&template).unwrap();
        assert_eq!(solution[3].as_constant(), Some(0.0));
    }

    #[test]
    fn test_unbalanced_parameter_row_is_still_overdetermined() {
        let registry = registry();
        let resolver = ConservationResolver::new(&registry, &[COD]).unwrap();
        let template = ReactionTemplate::new("p", "[1/Y_H]S_F + [Y_H]S_O2 -> X_OHO").unwrap();
        assert!(matches!(
            resolver.solve(&template),
            Err(KineticsError::OverdeterminedStoichiometry { quantity, .. }) if quantity == "COD"
        ));
    }

    #[test]
    fn test_invalid_reference() {
        let registry = registry();
        let resolver = ConservationResolver::new(&registry, &[N]).unwrap();
        let template = ReactionTemplate::new("p", "S_NO3 -> [?]S_N2")
            .unwrap()
            .with_reference("X_OHO");
        assert!(matches!(
            resolver.resolve(&template),
            Err(KineticsError::InvalidReference { .. })
        ));
        let zero = ReactionTemplate::new("p", "S_O2 -> [?]S_N2")
            .unwrap()
            .with_reference("S_N2");
        assert!(matches!(
            resolver.resolve(&zero),
            Err(KineticsError::InvalidReference { .. })
        ));
    }

    #[test]
    fn test_undefined_component() {
        let registry = registry();
        let resolver = ConservationResolver::new(&registry, &[N]).unwrap();
        let template = ReactionTemplate::new("p", "S_XYZ -> [?]S_N2").unwrap();
        assert!(matches!(
            resolver.solve(&template),
            Err(KineticsError::Component(ComponentError::UndefinedComponent(_)))
        ));
    }

    #[test]
    fn test_check_conservation_detects_violation() {
        let registry = registry();
        let mut row = vec![0.0; registry.len()];
        row[registry.index("S_NO3").unwrap()] = -1.0;
        row[registry.index("S_N2").unwrap()] = 0.9;
        let err = check_conservation("p", &registry, &row, &[N], 1e-9).unwrap_err();
        assert!(matches!(err, KineticsError::ConservationViolated { .. }));
        row[registry.index("S_N2").unwrap()] = 1.0;
        check_conservation("p", &registry, &row, &[N], 1e-9).unwrap();
    }
}

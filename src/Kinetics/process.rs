//! # Process
//!
//! One compiled row of a Gujer matrix: the stoichiometric coefficient of every registry
//! component (solved and normalized by the conservation resolver) and the rate law.
//!
//! Parameters of a process are *local*: coefficients and rate laws read them from a slice
//! ordered like `Process::parameters()`. A `ProcessCollection` maps them onto its merged
//! parameter table.
use crate::Components::component::ConservedQuantity;
use crate::Components::registry::ComponentRegistry;
use crate::Kinetics::conservation::{ConservationResolver, check_conservation};
use crate::Kinetics::kinetics_errors::{KineticsError, NumericDomainError};
use crate::Kinetics::parameters::ParameterSpec;
use crate::Kinetics::reaction_template::ReactionTemplate;
use crate::Kinetics::symbolic::{BoundExpr, Expr, Slot, substitute, variables};
use enum_dispatch::enum_dispatch;
use log::{info, warn};
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

/// tolerance of the numeric re-check done after solving
const CHECK_TOLERANCE: f64 = 1e-8;

#[enum_dispatch]
pub trait RateFunction {
    /// rate from concentrations (registry order) and the process' own parameters
    fn evaluate(&self, concentrations: &[f64], parameters: &[f64]) -> Result<f64, NumericDomainError>;
    fn describe(&self) -> String;
}

/// Rate law parsed from a template and bound to concentration/parameter slots.
#[derive(Debug, Clone, PartialEq)]
pub struct SymbolicRate {
    pub expression: Expr,
    bound: BoundExpr,
}

impl SymbolicRate {
    pub fn expression(&self) -> &Expr {
        &self.expression
    }
}

impl RateFunction for SymbolicRate {
    fn evaluate(&self, concentrations: &[f64], parameters: &[f64]) -> Result<f64, NumericDomainError> {
        self.bound.eval(concentrations, parameters)
    }

    fn describe(&self) -> String {
        self.expression.to_string()
    }
}

pub type RateClosure =
    dyn Fn(&[f64], &[f64]) -> Result<f64, NumericDomainError> + Send + Sync;

/// Hand-written rate law for kinetics that templates cannot express.
#[derive(Clone)]
pub struct CustomRate {
    pub name: String,
    function: Arc<RateClosure>,
}

impl CustomRate {
    pub fn new<F>(name: &str, function: F) -> Self
    where
        F: Fn(&[f64], &[f64]) -> Result<f64, NumericDomainError> + Send + Sync + 'static,
    {
        CustomRate {
            name: name.to_string(),
            function: Arc::new(function),
        }
    }
}

impl fmt::Debug for CustomRate {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "CustomRate({})", self.name)
    }
}

impl RateFunction for CustomRate {
    fn evaluate(&self, concentrations: &[f64], parameters: &[f64]) -> Result<f64, NumericDomainError> {
        let value = (self.function)(concentrations, parameters)?;
        if value.is_finite() {
            Ok(value)
        } else {
            Err(NumericDomainError::NonFinite { value })
        }
    }

    fn describe(&self) -> String {
        format!("<custom: {}>", self.name)
    }
}

#[derive(Debug, Clone)]
#[enum_dispatch(RateFunction)]
pub enum RateLaw {
    Symbolic(SymbolicRate),
    Custom(CustomRate),
}

#[derive(Debug, Clone)]
pub struct Process {
    pub id: String,
    pub reference: Option<String>,
    stoichiometry: Vec<Expr>,
    bound_stoichiometry: Vec<BoundExpr>,
    rate: RateLaw,
    parameters: Vec<ParameterSpec>,
    conserved_for: Vec<ConservedQuantity>,
    registry: Arc<ComponentRegistry>,
    template: Option<ReactionTemplate>,
}

impl Process {
    /// Compiles one template against `registry`.
    ///
    /// `available` are the parameter definitions the template may use. When the template
    /// lists its parameters only those are visible to it, otherwise every parameter
    /// symbol it mentions is looked up in `available`. `conserved_for` applies unless the
    /// template names its own quantities.
    pub fn build(
        template: &ReactionTemplate,
        registry: &Arc<ComponentRegistry>,
        available: &[ParameterSpec],
        conserved_for: &[ConservedQuantity],
    ) -> Result<Process, KineticsError> {
        Process::compile(template, registry, available, conserved_for, None)
    }

    /// A template whose rate law is the hand-written `rate`; a rate equation in the
    /// template is ignored. `parameters` are the process' own parameters, in the order
    /// `rate` reads them.
    pub fn custom(
        template: &ReactionTemplate,
        registry: &Arc<ComponentRegistry>,
        parameters: &[ParameterSpec],
        conserved_for: &[ConservedQuantity],
        rate: CustomRate,
    ) -> Result<Process, KineticsError> {
        let mut template = template.clone();
        template.rate_equation = None;
        template.parameters = parameters.iter().map(|p| p.name.clone()).collect();
        Process::compile(&template, registry, parameters, conserved_for, Some(rate))
    }

    fn compile(
        template: &ReactionTemplate,
        registry: &Arc<ComponentRegistry>,
        available: &[ParameterSpec],
        conserved_for: &[ConservedQuantity],
        custom: Option<CustomRate>,
    ) -> Result<Process, KineticsError> {
        let resolver = ConservationResolver::new(registry, conserved_for)?;
        let stoichiometry = resolver.resolve(template)?;
        let quantities = resolver.quantities_for(template).to_vec();

        let mut coefficient_symbols = BTreeSet::new();
        for term in &template.terms {
            if let Some(expr) = term.coefficient.as_expr() {
                coefficient_symbols.extend(variables(&expr));
            }
        }
        let rate_symbols = template
            .rate_equation
            .as_ref()
            .map(|e| variables(e.expr()))
            .unwrap_or_default();

        let unknown_symbol = |symbol: &str| KineticsError::UnknownSymbol {
            process: template.id.clone(),
            symbol: symbol.to_string(),
        };
        let names: Vec<String> = if template.parameters.is_empty() {
            coefficient_symbols
                .iter()
                .chain(rate_symbols.iter().filter(|s| !registry.contains(s)))
                .cloned()
                .collect::<BTreeSet<_>>()
                .into_iter()
                .collect()
        } else {
            template.parameters.clone()
        };
        let mut parameters = Vec::with_capacity(names.len());
        for name in &names {
            let spec = available
                .iter()
                .find(|s| &s.name == name)
                .ok_or_else(|| KineticsError::UnknownParameter(name.clone()))?;
            parameters.push(spec.clone());
        }
        for symbol in coefficient_symbols.iter().chain(rate_symbols.iter()) {
            let is_parameter = parameters.iter().any(|p| &p.name == symbol);
            let is_component = rate_symbols.contains(symbol) && registry.contains(symbol);
            if !is_parameter && !is_component {
                return Err(unknown_symbol(symbol));
            }
        }

        let rate = match (custom, &template.rate_equation) {
            (Some(custom), _) => RateLaw::Custom(custom),
            (None, Some(expression)) => {
                let bound = bind_rate(expression.expr(), registry, &parameters)
                    .map_err(|symbol| unknown_symbol(&symbol))?;
                RateLaw::Symbolic(SymbolicRate {
                    expression: expression.expr().clone(),
                    bound,
                })
            }
            (None, None) => {
                warn!("process {} has no rate equation, its rate is 0", template.id);
                RateLaw::Symbolic(SymbolicRate {
                    expression: Expr::Const(0.0),
                    bound: BoundExpr::constant(0.0),
                })
            }
        };

        let process = Process::assemble(
            &template.id,
            template.reference.clone(),
            stoichiometry,
            rate,
            parameters,
            quantities,
            registry,
            Some(template.clone()),
        )?;
        info!(
            "process {} compiled over {:?}",
            process.id,
            process
                .conserved_for
                .iter()
                .map(|q| q.to_string())
                .collect::<Vec<_>>()
        );
        Ok(process)
    }

    pub fn with_custom_rate(mut self, rate: CustomRate) -> Self {
        self.rate = RateLaw::Custom(rate);
        if let Some(t) = self.template.as_mut() {
            t.rate_equation = None;
        }
        self
    }

    #[allow(clippy::too_many_arguments)]
    fn assemble(
        id: &str,
        reference: Option<String>,
        stoichiometry: Vec<Expr>,
        rate: RateLaw,
        parameters: Vec<ParameterSpec>,
        conserved_for: Vec<ConservedQuantity>,
        registry: &Arc<ComponentRegistry>,
        template: Option<ReactionTemplate>,
    ) -> Result<Process, KineticsError> {
        let mut bound_stoichiometry = Vec::with_capacity(stoichiometry.len());
        for coefficient in &stoichiometry {
            let bound = BoundExpr::bind(coefficient, &|name: &str| {
                parameters
                    .iter()
                    .position(|p| p.name == name)
                    .map(Slot::Parameter)
            })
                .map_err(|symbol| KineticsError::UnknownSymbol {
                    process: id.to_string(),
                    symbol,
                })?;
            bound_stoichiometry.push(bound);
        }
        let process = Process {
            id: id.to_string(),
            reference,
            stoichiometry,
            bound_stoichiometry,
            rate,
            parameters,
            conserved_for,
            registry: Arc::clone(registry),
            template,
        };
        // coefficients must be defined at the default parameter values
        let defaults: Vec<f64> = process.parameters.iter().map(|p| p.default).collect();
        let row = process.numeric_stoichiometry(&defaults)?;
        check_conservation(
            &process.id,
            &process.registry,
            &row,
            &process.conserved_for,
            CHECK_TOLERANCE,
        )?;
        Ok(process)
    }

    pub fn registry(&self) -> &Arc<ComponentRegistry> {
        &self.registry
    }

    pub fn stoichiometry(&self) -> &[Expr] {
        &self.stoichiometry
    }

    /// coefficient of one component
    pub fn coefficient(&self, component: &str) -> Result<&Expr, KineticsError> {
        Ok(&self.stoichiometry[self.registry.index(component)?])
    }

    pub fn rate(&self) -> &RateLaw {
        &self.rate
    }

    pub fn parameters(&self) -> &[ParameterSpec] {
        &self.parameters
    }

    pub fn parameter_names(&self) -> Vec<&str> {
        self.parameters.iter().map(|p| p.name.as_str()).collect()
    }

    pub fn conserved_for(&self) -> &[ConservedQuantity] {
        &self.conserved_for
    }

    /// source template (rate equation cleared for custom rates)
    pub fn template(&self) -> Option<&ReactionTemplate> {
        self.template.as_ref()
    }

    /// Coefficients at the given local parameter values, registry order.
    pub fn numeric_stoichiometry(&self, parameters: &[f64]) -> Result<Vec<f64>, KineticsError> {
        if parameters.len() != self.parameters.len() {
            return Err(KineticsError::DimensionMismatch {
                expected: self.parameters.len(),
                found: parameters.len(),
            });
        }
        self.bound_stoichiometry
            .iter()
            .map(|c| {
                c.eval(&[], parameters)
                    .map_err(|source| KineticsError::NumericDomain {
                        process: self.id.clone(),
                        source,
                    })
            })
            .collect()
    }

    pub fn evaluate_rate(&self, concentrations: &[f64], parameters: &[f64]) -> Result<f64, KineticsError> {
        self.rate
            .evaluate(concentrations, parameters)
            .map_err(|source| KineticsError::NumericDomain {
                process: self.id.clone(),
                source,
            })
    }

    /// The rate law with the given local parameter values substituted; only
    /// concentrations (component ids) remain as symbols.
    pub fn symbolic_rate(&self, parameters: &[f64]) -> Result<Expr, KineticsError> {
        if parameters.len() != self.parameters.len() {
            return Err(KineticsError::DimensionMismatch {
                expected: self.parameters.len(),
                found: parameters.len(),
            });
        }
        match &self.rate {
            RateLaw::Symbolic(rate) => {
                let values: Vec<(&str, f64)> = self
                    .parameters
                    .iter()
                    .zip(parameters)
                    .map(|(spec, value)| (spec.name.as_str(), *value))
                    .collect();
                Ok(substitute(&rate.expression, &values))
            }
            RateLaw::Custom(_) => Err(KineticsError::NotSymbolic {
                process: self.id.clone(),
            }),
        }
    }

    /// Re-verifies the row at the given local parameter values.
    pub fn check_conservation(
        &self,
        quantities: &[ConservedQuantity],
        parameters: &[f64],
        tolerance: f64,
    ) -> Result<(), KineticsError> {
        let row = self.numeric_stoichiometry(parameters)?;
        check_conservation(&self.id, &self.registry, &row, quantities, tolerance)
    }
}

fn bind_rate(
    expression: &Expr,
    registry: &ComponentRegistry,
    parameters: &[ParameterSpec],
) -> Result<BoundExpr, String> {
    BoundExpr::bind(expression, &|name: &str| {
        // a parameter shadows a component of the same name
        if let Some(i) = parameters.iter().position(|p| p.name == name) {
            return Some(Slot::Parameter(i));
        }
        registry.index(name).ok().map(Slot::Concentration)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Components::component::ConservedQuantity::*;
    use crate::Kinetics::parameters::specs;
    use approx::assert_relative_eq;

    fn registry() -> Arc<ComponentRegistry> {
        Arc::new(
            ComponentRegistry::load_default()
                .unwrap()
                .subgroup(&["S_F", "S_NH4", "S_PO4", "S_O2", "X_OHO", "H2O"])
                .unwrap(),
        )
    }

    fn available() -> Vec<ParameterSpec> {
        specs(&[
            ("Y_H", 0.6, "", "yield"),
            ("mu_H", 4.0, "d-1", ""),
            ("K_F", 5.0, "g COD/m3", ""),
            ("unused", 1.0, "", ""),
        ])
    }

    fn growth() -> ReactionTemplate {
        ReactionTemplate::new(
            "growth",
            "[1/Y_H]S_F + [?]S_O2 + [?]S_NH4 + [?]S_PO4 -> X_OHO",
        )
        .unwrap()
        .with_reference("X_OHO")
        .with_rate("mu_H*S_F/(K_F + S_F)*X_OHO")
        .unwrap()
    }

    #[test]
    fn test_build_infers_parameters() {
        let process = Process::build(&growth(), &registry(), &available(), &[COD, N, P]).unwrap();
        assert_eq!(process.parameter_names(), vec!["K_F", "Y_H", "mu_H"]);
        assert_eq!(process.stoichiometry().len(), 6);
        assert_eq!(process.coefficient("X_OHO").unwrap(), &Expr::Const(1.0));
        assert_eq!(process.coefficient("H2O").unwrap(), &Expr::Const(0.0));
        let row = process.numeric_stoichiometry(&[5.0, 0.6, 4.0]).unwrap();
        assert_relative_eq!(row[0], -1.0 / 0.6, epsilon = 1e-12);
    }

    #[test]
    fn test_rate_is_bound_to_slots() {
        let process = Process::build(&growth(), &registry(), &available(), &[COD, N, P]).unwrap();
        let conc = [5.0, 1.0, 1.0, 2.0, 100.0, 0.0];
        let r = process.evaluate_rate(&conc, &[5.0, 0.6, 4.0]).unwrap();
        assert_relative_eq!(r, 4.0 * 0.5 * 100.0, epsilon = 1e-12);
        let zero = process.evaluate_rate(&[0.0, 1.0, 1.0, 2.0, 100.0, 0.0], &[5.0, 0.6, 4.0]);
        assert_eq!(zero.unwrap(), 0.0);
        assert!(matches!(
            process.evaluate_rate(&[0.0; 6], &[0.0, 0.6, 4.0]),
            Err(KineticsError::NumericDomain { .. })
        ));
    }

    #[test]
    fn test_unknown_parameter_and_symbol() {
        let template = growth().with_parameters(&["Y_H", "mu_H"]);
        assert!(matches!(
            Process::build(&template, &registry(), &available(), &[COD, N, P]),
            Err(KineticsError::UnknownSymbol { symbol, .. }) if symbol == "K_F"
        ));
        let template = growth().with_parameters(&["Y_H", "mu_H", "K_F", "k_missing"]);
        assert!(matches!(
            Process::build(&template, &registry(), &available(), &[COD, N, P]),
            Err(KineticsError::UnknownParameter(name)) if name == "k_missing"
        ));
    }

    #[test]
    fn test_custom_rate() {
        let rate = CustomRate::new("double_monod", |c, p| Ok(p[0] * c[0] / (p[1] + c[0])));
        let template = ReactionTemplate::new("custom", "S_F + [?]S_O2 + [?]S_NH4 -> [0.5]X_OHO")
            .unwrap();
        let parameters = specs(&[("q", 2.0, "", ""), ("K", 1.0, "", "")]);
        let process =
            Process::custom(&template, &registry(), &parameters, &[COD, N], rate).unwrap();
        assert!(matches!(process.rate(), RateLaw::Custom(_)));
        assert_eq!(process.rate().describe(), "<custom: double_monod>");
        let r = process.evaluate_rate(&[1.0, 0.0, 0.0, 0.0, 0.0, 0.0], &[2.0, 1.0]).unwrap();
        assert_relative_eq!(r, 1.0);
        let bad = CustomRate::new("nan", |_, _| Ok(f64::NAN));
        let process = process.with_custom_rate(bad);
        assert!(process.evaluate_rate(&[0.0; 6], &[2.0, 1.0]).is_err());
    }

    #[test]
    fn test_symbolic_rate_substitutes_parameters() {
        let process = Process::build(&growth(), &registry(), &available(), &[COD, N, P]).unwrap();
        let rate = process.symbolic_rate(&[5.0, 0.6, 4.0]).unwrap();
        let symbols: Vec<String> = variables(&rate).into_iter().collect();
        assert_eq!(symbols, vec!["S_F", "X_OHO"]);
        let conc = [5.0, 1.0, 1.0, 2.0, 100.0, 0.0];
        let direct = process.evaluate_rate(&conc, &[5.0, 0.6, 4.0]).unwrap();
        let registry = registry();
        let value = crate::Kinetics::symbolic::evaluate(&rate, &|name: &str| {
            registry.index(name).ok().map(|i| conc[i])
        })
        .unwrap();
        assert_relative_eq!(value, direct, epsilon = 1e-9);
        let custom = process.with_custom_rate(CustomRate::new("c", |_, _| Ok(1.0)));
        assert!(matches!(
            custom.symbolic_rate(&[5.0, 0.6, 4.0]),
            Err(KineticsError::NotSymbolic { .. })
        ));
    }

    #[test]
    fn test_check_conservation_other_quantity() {
        let process = Process::build(&growth(), &registry(), &available(), &[COD, N, P]).unwrap();
        process
            .check_conservation(&[COD, N, P], &[5.0, 0.2, 4.0], 1e-9)
            .unwrap();
        // nothing balances carbon in this row
        assert!(matches!(
            process.check_conservation(&[C], &[5.0, 0.6, 4.0], 1e-9),
            Err(KineticsError::ConservationViolated { .. })
        ));
    }
}

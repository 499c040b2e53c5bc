//! Affine combinations of symbolic atoms: `c0 + w1*atom1 + w2*atom2 + ...`.
//!
//! Conservation equations are linear in the stoichiometric coefficients with numeric
//! factors, so eliminating them only ever scales and adds right-hand sides. Writing every
//! known coefficient as a `LinearForm` over its non-linear parameter sub-expressions
//! ("atoms", e.g. `1/Y_H` or `(1 - Y_H)/(2.86*Y_H)`) keeps that elimination exact.
//!
//! Distinct atoms can still be dependent (`(1 - Y)/Y` is `1/Y - 1`), so a form whose
//! weights do not vanish may nevertheless be constant. `sampled_constant` detects that by
//! evaluating the form at a fixed set of parameter points.
use crate::Kinetics::symbolic::{Expr, as_const, evaluate, variables};
use std::collections::{BTreeMap, BTreeSet};

/// parameter points used by `sampled_constant`
const SAMPLES: usize = 5;

#[derive(Debug, Clone, PartialEq, Default)]
pub struct LinearForm {
    pub constant: f64,
    /// keyed by the printed form of the atom
    pub terms: BTreeMap<String, (f64, Expr)>,
}

/// Value of variable `j` at sample `k`, spread over `[0.5, 1.5)`.
fn sample_value(j: usize, k: usize) -> f64 {
    let x = (j + 1) as f64 * 0.618_034 + (k + 1) as f64 * 0.414_214;
    0.5 + x.fract()
}

impl LinearForm {
    pub fn constant(value: f64) -> Self {
        LinearForm {
            constant: value,
            terms: BTreeMap::new(),
        }
    }

    pub fn atom(expr: Expr) -> Self {
        let mut terms = BTreeMap::new();
        terms.insert(expr.to_string(), (1.0, expr));
        LinearForm {
            constant: 0.0,
            terms,
        }
    }

    /// atom, or constant when `expr` has no variables
    fn atom_or_constant(expr: &Expr) -> Self {
        match as_const(expr) {
            Some(c) => LinearForm::constant(c),
            None => LinearForm::atom(expr.clone()),
        }
    }

    pub fn from_expr(expr: &Expr) -> Self {
        match expr {
            Expr::Const(c) => LinearForm::constant(*c),
            Expr::Var(_) => LinearForm::atom(expr.clone()),
            Expr::Add(a, b) => LinearForm::from_expr(a).add(&LinearForm::from_expr(b)),
            Expr::Sub(a, b) => LinearForm::from_expr(a).sub(&LinearForm::from_expr(b)),
            Expr::Mul(a, b) => {
                let (la, lb) = (LinearForm::from_expr(a), LinearForm::from_expr(b));
                match (la.as_constant(), lb.as_constant()) {
                    (Some(k), _) => lb.scale(k),
                    (_, Some(k)) => la.scale(k),
                    _ => LinearForm::atom(expr.clone()),
                }
            }
            Expr::Div(a, b) => {
                let la = LinearForm::from_expr(a);
                match (la.as_constant(), LinearForm::from_expr(b).as_constant()) {
                    (_, Some(k)) if k != 0.0 => la.scale(1.0 / k),
                    // c/x is kept as c * (1/x) so that 1/Y and 2/Y share an atom
                    (Some(c), None) => {
                        LinearForm::atom(Expr::Const(1.0) / b.as_ref().clone()).scale(c)
                    }
                    _ => LinearForm::atom(expr.clone()),
                }
            }
            other => LinearForm::atom_or_constant(other),
        }
    }

    /// Some(value) when no atom carries a weight
    pub fn as_constant(&self) -> Option<f64> {
        if self.terms.values().all(|(w, _)| *w == 0.0) {
            Some(self.constant)
        } else {
            None
        }
    }

    pub fn add(&self, other: &LinearForm) -> LinearForm {
        let mut out = self.clone();
        out.constant += other.constant;
        for (key, (w, atom)) in &other.terms {
            out.terms
                .entry(key.clone())
                .and_modify(|(existing, _)| *existing += *w)
                .or_insert((*w, atom.clone()));
        }
        out
    }

    pub fn sub(&self, other: &LinearForm) -> LinearForm {
        self.add(&other.scale(-1.0))
    }

    pub fn scale(&self, k: f64) -> LinearForm {
        LinearForm {
            constant: self.constant * k,
            terms: self
                .terms
                .iter()
                .map(|(key, (w, atom))| (key.clone(), (w * k, atom.clone())))
                .collect(),
        }
    }

    /// largest absolute weight, constant included
    pub fn magnitude(&self) -> f64 {
        self.terms
            .values()
            .map(|(w, _)| w.abs())
            .fold(self.constant.abs(), f64::max)
    }

    pub fn is_zero(&self, tolerance: f64) -> bool {
        self.magnitude() <= tolerance
    }

    /// The constant value of the form when its atoms cancel for every parameter
    /// value. Exact when no atom carries a weight; otherwise the form is evaluated at
    /// `SAMPLES` fixed parameter points and must agree at all defined ones within
    /// `tolerance` relative to the size of its terms.
    pub fn sampled_constant(&self, tolerance: f64) -> Option<f64> {
        if let Some(c) = self.as_constant() {
            return Some(c);
        }
        let names: Vec<String> = self
            .terms
            .values()
            .flat_map(|(_, atom)| variables(atom))
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let mut values = Vec::with_capacity(SAMPLES);
        for k in 0..SAMPLES {
            let lookup = |name: &str| {
                names
                    .iter()
                    .position(|n| n == name)
                    .map(|j| sample_value(j, k))
            };
            let mut value = self.constant;
            let mut size = self.constant.abs();
            let mut defined = true;
            for (w, atom) in self.terms.values() {
                match evaluate(atom, &lookup) {
                    Ok(a) => {
                        value += w * a;
                        size = size.max((w * a).abs());
                    }
                    Err(_) => {
                        defined = false;
                        break;
                    }
                }
            }
            if defined {
                values.push((value, size));
            }
        }
        if values.len() < 2 {
            return None;
        }
        let (first, _) = values[0];
        let constant = values
            .iter()
            .all(|(v, size)| (v - first).abs() <= tolerance * size.max(1.0));
        if !constant {
            return None;
        }
        let largest = values.iter().map(|(_, s)| *s).fold(0.0, f64::max);
        Some(if first.abs() <= tolerance * largest.max(1.0) {
            0.0
        } else {
            first
        })
    }

    /// Drops weights below `tolerance` (round-off left by elimination).
    pub fn cleaned(&self, tolerance: f64) -> LinearForm {
        LinearForm {
            constant: if self.constant.abs() <= tolerance {
                0.0
            } else {
                self.constant
            },
            terms: self
                .terms
                .iter()
                .filter(|(_, (w, _))| w.abs() > tolerance)
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        }
    }

    pub fn to_expr(&self) -> Expr {
        let mut expr: Option<Expr> = None;
        for (w, atom) in self.terms.values() {
            if *w == 0.0 {
                continue;
            }
            let term = if *w == 1.0 {
                atom.clone()
            } else {
                Expr::Const(*w) * atom.clone()
            };
            expr = Some(match expr {
                None => term,
                Some(acc) => acc + term,
            });
        }
        match expr {
            None => Expr::Const(self.constant),
            Some(acc) if self.constant != 0.0 => (acc + Expr::Const(self.constant)).symplify(),
            Some(acc) => acc.symplify(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Kinetics::symbolic::parse_expression;
    use approx::assert_relative_eq;

    fn lf(text: &str) -> LinearForm {
        LinearForm::from_expr(&parse_expression(text).unwrap())
    }

    #[test]
    fn distributes_constants() {
        let f = lf("2*(1 - f_P) + 3*f_P/2");
        assert_eq!(f.constant, 2.0);
        assert_eq!(f.terms["f_P"].0, -0.5);
        assert!(f.as_constant().is_none());
    }

    #[test]
    fn cancellation_is_exact() {
        let f = lf("-1 + (1 - f_P) + f_P");
        assert!(f.is_zero(1e-12));
        assert_eq!(f.cleaned(1e-12).as_constant(), Some(0.0));
    }

    #[test]
    fn shared_reciprocal_atoms_merge() {
        let f = lf("1/Y_H + 2/Y_H");
        assert_eq!(f.terms.len(), 1);
        let (w, _) = f.terms.values().next().unwrap();
        assert_eq!(*w, 3.0);
    }

    #[test]
    fn dependent_atoms_are_found_constant_by_sampling() {
        // (1 - Y)/Y - 1/Y + 1 == 0 although the atoms differ
        let f = lf("(1 - Y_H)/Y_H - 1/Y_H + 1");
        assert!(f.as_constant().is_none());
        assert_eq!(f.sampled_constant(1e-9), Some(0.0));
        let g = lf("(1 - Y_H)/Y_H - 1/Y_H");
        assert_relative_eq!(g.sampled_constant(1e-9).unwrap(), -1.0, epsilon = 1e-12);
        assert_eq!(lf("Y_H/K + 1").sampled_constant(1e-9), None);
    }

    #[test]
    fn to_expr_keeps_the_value() {
        let f = lf("0.5*Y_H + 1");
        let e = f.to_expr();
        assert_relative_eq!(
            evaluate(&e, &|_: &str| Some(3.0)).unwrap(),
            2.5,
            epsilon = 1e-12
        );
        assert_eq!(LinearForm::constant(-2.0).to_expr(), Expr::Const(-2.0));
    }
}
